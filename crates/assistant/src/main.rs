//! Local RAG assistant.
//!
//! ```bash
//! # Chunk every .txt/.md file in ./data and write the chunks as JSON Lines
//! assistant ingest --data-dir data --out chunks.jsonl
//!
//! # Chat with the model named in a template, filling its {{placeholders}}
//! assistant chat --template chat_template.json --var material=steel --var "parameter=200 MPa"
//! ```

mod config;

use anyhow::{Context, Result};
use chat::{ChatSession, ChatTemplate, ConversationLog, OllamaChatClient, RetryPolicy};
use clap::{Args, Parser, Subcommand};
use ingest::{Chunk, IngestOutput, UnreadablePolicy};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "assistant", version, about)]
struct Cli {
    /// JSON config file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load and chunk a directory of text documents
    Ingest(IngestArgs),
    /// Start an interactive conversation
    Chat(ChatArgs),
}

/// Where documents come from and how they are chunked. Unset flags keep the
/// config file value.
#[derive(Args, Default)]
struct SourceArgs {
    /// Directory holding the source documents
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Characters per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Characters shared by consecutive chunks
    #[arg(long)]
    chunk_overlap: Option<usize>,

    /// Skip unreadable files instead of aborting
    #[arg(long)]
    skip_unreadable: bool,
}

#[derive(Args)]
struct IngestArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Write chunks here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args)]
struct ChatArgs {
    /// Chat template (model, seed messages)
    #[arg(long)]
    template: PathBuf,

    /// Template variable, e.g. --var material=steel
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Override the model named in the template
    #[arg(long)]
    model: Option<String>,

    /// Also ingest the data directory and add every chunk to the conversation
    #[arg(long)]
    knowledge: bool,

    /// Save the conversation as JSON here when the session ends
    #[arg(long)]
    history: Option<PathBuf>,

    #[command(flatten)]
    source: SourceArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = AppConfig::load(cli.config.as_deref()).await?;

    match cli.command {
        Command::Ingest(args) => {
            apply_source_args(&mut config, &args.source);
            run_ingest(&config, args.out).await
        }
        Command::Chat(args) => {
            apply_source_args(&mut config, &args.source);
            run_chat(&config, args).await
        }
    }
}

fn apply_source_args(config: &mut AppConfig, args: &SourceArgs) {
    if let Some(dir) = &args.data_dir {
        config.ingest.data_directory = dir.clone();
    }
    if let Some(size) = args.chunk_size {
        config.ingest.chunk_size = size;
    }
    if let Some(overlap) = args.chunk_overlap {
        config.ingest.chunk_overlap = overlap;
    }
    if args.skip_unreadable {
        config.ingest.on_unreadable = UnreadablePolicy::Skip;
    }
}

async fn ingest_corpus(config: &AppConfig) -> Result<IngestOutput> {
    let output = ingest::ingest_directory(&config.ingest)
        .await
        .context(format!("Failed to ingest {:?}", config.ingest.data_directory))?;

    warn_skipped(&output);
    Ok(output)
}

fn warn_skipped(output: &IngestOutput) {
    for skipped in &output.skipped {
        warn!(error = %skipped, "Document skipped");
    }
}

/// Chunks to seed the conversation with: the template's content files, then
/// the data directory when asked for.
async fn knowledge_chunks(
    config: &AppConfig,
    content_files: &[PathBuf],
    include_data_dir: bool,
) -> Result<Vec<Chunk>> {
    let mut chunks = Vec::new();

    if !content_files.is_empty() {
        let output = ingest::ingest_files(content_files, &config.ingest)
            .await
            .context("Failed to load the template's content files")?;
        warn_skipped(&output);
        chunks.extend(output.chunks);
    }

    if include_data_dir {
        chunks.extend(ingest_corpus(config).await?.chunks);
    }

    Ok(chunks)
}

async fn run_ingest(config: &AppConfig, out: Option<PathBuf>) -> Result<()> {
    let output = ingest_corpus(config).await?;

    match &out {
        Some(path) => {
            let file = std::fs::File::create(path)
                .context(format!("Failed to create output file: {:?}", path))?;
            write_jsonl(&output.chunks, std::io::BufWriter::new(file))?;
        }
        None => write_jsonl(&output.chunks, std::io::stdout().lock())?,
    }

    let tokens: usize = output.chunks.iter().map(Chunk::estimated_tokens).sum();
    eprintln!(
        "Ingested {} documents into {} chunks (~{} tokens), {} skipped",
        output.documents,
        output.chunks.len(),
        tokens,
        output.skipped.len()
    );
    Ok(())
}

fn write_jsonl<W: Write>(chunks: &[Chunk], mut writer: W) -> Result<()> {
    for chunk in chunks {
        serde_json::to_writer(&mut writer, chunk).context("Failed to serialize chunk")?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

async fn run_chat(config: &AppConfig, args: ChatArgs) -> Result<()> {
    let vars: HashMap<String, String> = args.vars.into_iter().collect();
    let template = ChatTemplate::load(&args.template).await?.render(&vars);
    let content_files = template.content_files.clone();

    let client = OllamaChatClient::with_timeout(
        config.llm.base_url.clone(),
        Duration::from_secs(config.llm.request_timeout_secs),
    )?;
    let model = args
        .model
        .or_else(|| template.model.clone())
        .unwrap_or_else(|| config.llm.model.clone());
    let mut session = ChatSession::from_template(client, template)
        .with_model(model)
        .with_retry(RetryPolicy::from(&config.retry));

    let knowledge = knowledge_chunks(config, &content_files, args.knowledge).await?;
    if !knowledge.is_empty() {
        info!(chunks = knowledge.len(), "Adding ingested chunks to the conversation");
        session.add_knowledge(&knowledge);
    }

    info!(model = session.model(), "Chat session started");
    eprintln!("Type a message and press Enter. 'exit' or Ctrl-D quits.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("exit") {
            break;
        }

        match session.generate_response(input).await {
            Ok(reply) => println!("AI: {}", reply),
            Err(e) => eprintln!("Error: {:#}", e),
        }
    }

    if let Some(path) = &args.history {
        let file = std::fs::File::create(path)
            .context(format!("Failed to create history file: {:?}", path))?;
        write_history(session.log(), std::io::BufWriter::new(file))?;
        info!(path = %path.display(), messages = session.log().len(), "Saved conversation");
    }

    Ok(())
}

fn write_history<W: Write>(log: &ConversationLog, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, log).context("Failed to serialize conversation")?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("parameter=200 MPa").unwrap(),
            ("parameter".to_string(), "200 MPa".to_string())
        );
        assert_eq!(
            parse_var("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert!(parse_var("no-equals").is_err());
        assert!(parse_var("=value").is_err());
    }

    #[test]
    fn test_cli_parses_ingest_flags() {
        let cli = Cli::try_parse_from([
            "assistant",
            "ingest",
            "--data-dir",
            "corpus",
            "--chunk-size",
            "300",
            "--chunk-overlap",
            "30",
            "--skip-unreadable",
        ])
        .unwrap();

        let Command::Ingest(args) = cli.command else {
            panic!("expected ingest command");
        };
        let mut config = AppConfig::default();
        apply_source_args(&mut config, &args.source);
        assert!(args.out.is_none());

        assert_eq!(config.ingest.data_directory, PathBuf::from("corpus"));
        assert_eq!(config.ingest.chunk_size, 300);
        assert_eq!(config.ingest.chunk_overlap, 30);
        assert_eq!(config.ingest.on_unreadable, UnreadablePolicy::Skip);
    }

    #[test]
    fn test_cli_parses_chat_vars() {
        let cli = Cli::try_parse_from([
            "assistant",
            "chat",
            "--template",
            "chat_template.json",
            "--var",
            "material=steel",
            "--var",
            "parameter=200 MPa",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Command::Chat(args) = cli.command else {
            panic!("expected chat command");
        };
        assert_eq!(
            args.vars,
            vec![
                ("material".to_string(), "steel".to_string()),
                ("parameter".to_string(), "200 MPa".to_string()),
            ]
        );
        assert!(!args.knowledge);
        assert!(args.history.is_none());
        assert!(args.source.data_dir.is_none());
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let mut config = AppConfig::default();
        apply_source_args(&mut config, &SourceArgs::default());

        assert_eq!(config.ingest.chunk_size, 500);
        assert_eq!(config.ingest.on_unreadable, UnreadablePolicy::Abort);
    }

    #[test]
    fn test_write_jsonl_one_chunk_per_line() {
        let chunks = ingest::chunk_document("a.txt", &"x".repeat(12), 5, 1).unwrap();
        let mut buffer = Vec::new();

        write_jsonl(&chunks, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let parsed: Vec<Chunk> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(parsed, chunks);
    }

    #[test]
    fn test_write_history_round_trips() {
        let mut log = ConversationLog::new();
        log.push_system("You teach material science.");
        log.push_user("What is steel?");
        log.push_assistant("An alloy of iron and carbon.");
        let mut buffer = Vec::new();

        write_history(&log, &mut buffer).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value[1]["role"], "user");
        assert_eq!(value[2]["content"], "An alloy of iron and carbon.");
        let parsed: ConversationLog = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(parsed, log);
    }

    #[tokio::test]
    async fn test_knowledge_comes_from_template_content_files() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let data = temp_dir.path().join("data");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(data.join("corpus.txt"), "from the data directory").unwrap();
        let listed = temp_dir.path().join("steel.txt");
        std::fs::write(&listed, "Steel is iron and carbon.").unwrap();

        let mut config = AppConfig::default();
        config.ingest.data_directory = data;
        let content_files = vec![listed];

        let only_template = knowledge_chunks(&config, &content_files, false).await.unwrap();
        let ids: Vec<&str> = only_template.iter().map(|c| c.document_id.as_str()).collect();
        assert_eq!(ids, vec!["steel.txt"]);
        assert_eq!(only_template[0].content, "Steel is iron and carbon.");

        let both = knowledge_chunks(&config, &content_files, true).await.unwrap();
        let ids: Vec<&str> = both.iter().map(|c| c.document_id.as_str()).collect();
        assert_eq!(ids, vec!["steel.txt", "corpus.txt"]);

        assert!(knowledge_chunks(&config, &[], false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_content_file_is_an_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let missing = vec![temp_dir.path().join("gone.txt")];

        let err = knowledge_chunks(&AppConfig::default(), &missing, false)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("gone.txt"));
    }

    #[tokio::test]
    async fn test_run_ingest_writes_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let data = temp_dir.path().join("data");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(data.join("a.txt"), "hello world").unwrap();
        let out = temp_dir.path().join("chunks.jsonl");

        let mut config = AppConfig::default();
        config.ingest.data_directory = data;
        run_ingest(&config, Some(out.clone())).await.unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(written.contains("\"document_id\":\"a.txt\""));
    }
}
