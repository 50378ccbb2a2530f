use anyhow::Result;
use ingest::Chunk;
use tracing::debug;

use crate::llm::{ChatCompletion, DEFAULT_MODEL};
use crate::message::ConversationLog;
use crate::retry::RetryPolicy;
use crate::template::ChatTemplate;

pub const KNOWLEDGE_PREAMBLE: &str =
    "You are a helpful chat bot that answers using the knowledge below.\nKnowledge:\n";

/// One conversation with one model. The session owns its log; every
/// completion call sees the full log so far.
pub struct ChatSession<C: ChatCompletion> {
    client: C,
    model: String,
    log: ConversationLog,
    retry: RetryPolicy,
}

impl<C: ChatCompletion> ChatSession<C> {
    pub fn new(client: C, model: impl Into<String>, log: ConversationLog) -> Self {
        Self {
            client,
            model: model.into(),
            log,
            retry: RetryPolicy::default(),
        }
    }

    /// Seed the session from a rendered template. A template without a model
    /// falls back to [`DEFAULT_MODEL`].
    pub fn from_template(client: C, mut template: ChatTemplate) -> Self {
        let model = template
            .model
            .take()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        Self::new(client, model, template.into_log())
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    /// Append the chunks as one system message. Does nothing for an empty
    /// slice.
    pub fn add_knowledge(&mut self, chunks: &[Chunk]) {
        if chunks.is_empty() {
            return;
        }

        let mut prompt = String::from(KNOWLEDGE_PREAMBLE);
        for chunk in chunks {
            prompt.push('-');
            prompt.push_str(&chunk.content);
            prompt.push('\n');
        }

        debug!(chunks = chunks.len(), "Adding knowledge to conversation");
        self.log.push_system(prompt);
    }

    /// Record `input`, ask the model, record and return its reply. If the
    /// completion fails the user message stays in the log and no reply is
    /// recorded.
    pub async fn generate_response(&mut self, input: &str) -> Result<String> {
        self.log.push_user(input);

        let client = &self.client;
        let model = self.model.as_str();
        let log = &self.log;
        let reply = self
            .retry
            .retry("chat completion", move || client.complete(model, log))
            .await?;

        self.log.push_assistant(reply.clone());
        Ok(reply)
    }
}
