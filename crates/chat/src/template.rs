use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::message::{ChatMessage, ConversationLog};

/// Chat setup read from a JSON template file.
///
/// ```json
/// {
///   "model": "llama3.2:3b",
///   "embed_model": "nomic-embed-text:latest",
///   "content_files": ["data/steel.txt"],
///   "messages": [
///     {"role": "system", "content": "You teach material science."},
///     {"role": "system", "content": "The student is looking at {{material}}."}
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTemplate {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub embed_model: Option<String>,
    /// Knowledge files, chunked and added to the conversation when a chat
    /// starts. Relative paths resolve against the working directory.
    #[serde(default)]
    pub content_files: Vec<PathBuf>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl ChatTemplate {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse chat template")
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path)
            .await
            .context(format!("Failed to read chat template: {:?}", path))?;
        Self::from_json(&json).context(format!("Invalid chat template: {:?}", path))
    }

    /// Replace `{{name}}` placeholders in every message. Placeholders with no
    /// matching variable are left untouched. Substituted values are never
    /// rescanned, so a value containing `{{other}}` is inserted literally.
    pub fn render(mut self, vars: &HashMap<String, String>) -> Self {
        for message in &mut self.messages {
            message.content = substitute(&message.content, vars);
        }
        self
    }

    pub fn into_log(self) -> ConversationLog {
        self.messages.into_iter().collect()
    }
}

fn substitute(text: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];

        match after.find("}}") {
            // An inner "{{" means this opener has no name of its own
            Some(close) if !after[..close].contains("{{") => {
                let name = &after[..close];
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => out.push_str(&rest[open..open + close + 4]),
                }
                rest = &after[close + 2..];
            }
            _ => {
                out.push_str("{{");
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
