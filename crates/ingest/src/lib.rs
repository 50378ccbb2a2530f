//! Document ingestion: load text files from a directory and split them into
//! overlapping, addressable character chunks.

pub mod chunk;
pub mod chunker;
pub mod config;
pub mod error;
pub mod reader;

pub use chunk::Chunk;
pub use chunker::{Chunker, ChunkerConfig, chunk_document, chunk_documents};
pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use reader::{DocumentLoader, DocumentMap, LoadReport, UnreadablePolicy, load_documents};

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::info;

#[derive(Debug)]
pub struct IngestOutput {
    /// Grouped by document (ascending id), in sequence order within each.
    pub chunks: Vec<Chunk>,
    pub documents: usize,
    pub skipped: Vec<IngestError>,
}

/// Main ingestion pipeline over `config.data_directory`. The chunk config is
/// checked before any file is touched; `load_timeout_secs` bounds the loading
/// step only.
pub async fn ingest_directory(config: &IngestConfig) -> Result<IngestOutput> {
    let dir = config.data_directory.as_path();
    let chunker = Chunker::new(config.chunker_config())?;
    let loader = config.loader();

    run(dir, config, chunker, loader.load(dir)).await
}

/// Same pipeline over an explicit list of files, e.g. the `content_files` of
/// a chat template.
pub async fn ingest_files(paths: &[PathBuf], config: &IngestConfig) -> Result<IngestOutput> {
    let chunker = Chunker::new(config.chunker_config())?;
    let Some(first) = paths.first() else {
        return Ok(IngestOutput {
            chunks: Vec::new(),
            documents: 0,
            skipped: Vec::new(),
        });
    };
    let loader = config.loader();

    run(first, config, chunker, loader.load_files(paths)).await
}

async fn run(
    source: &Path,
    config: &IngestConfig,
    chunker: Chunker,
    load: impl Future<Output = Result<LoadReport>>,
) -> Result<IngestOutput> {
    let start = Instant::now();
    let report = load_within(source, config.load_timeout_secs, load).await?;
    let chunks = chunker.chunk_documents_parallel(&report.documents);

    info!(
        source = %source.display(),
        documents = report.documents.len(),
        chunks = chunks.len(),
        skipped = report.skipped.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Ingestion complete"
    );

    Ok(IngestOutput {
        chunks,
        documents: report.documents.len(),
        skipped: report.skipped,
    })
}

async fn load_within(
    source: &Path,
    timeout_secs: Option<u64>,
    load: impl Future<Output = Result<LoadReport>>,
) -> Result<LoadReport> {
    match timeout_secs {
        Some(secs) => timeout(Duration::from_secs(secs), load)
            .await
            .map_err(|_| IngestError::LoadTimeout {
                path: source.to_path_buf(),
                timeout_secs: secs,
            })?,
        None => load.await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_stalled_load_times_out() {
        let dir = Path::new("slow-share");
        let stalled = std::future::pending::<Result<LoadReport>>();

        let err = load_within(dir, Some(30), stalled).await.unwrap_err();

        match err {
            IngestError::LoadTimeout { path, timeout_secs } => {
                assert_eq!(path, dir);
                assert_eq!(timeout_secs, 30);
            }
            other => panic!("expected LoadTimeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_finishing_in_time_is_kept() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(29)).await;
            Ok(LoadReport::default())
        };

        let report = load_within(Path::new("data"), Some(30), slow).await.unwrap();
        assert!(report.documents.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_timeout_waits_for_load() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(LoadReport::default())
        };

        assert!(load_within(Path::new("data"), None, slow).await.is_ok());
    }

    #[tokio::test]
    async fn test_empty_file_list_still_validates_config() {
        let config = IngestConfig {
            chunk_size: 0,
            ..IngestConfig::default()
        };
        assert!(matches!(
            ingest_files(&[], &config).await,
            Err(IngestError::InvalidChunkConfig { .. })
        ));

        let output = ingest_files(&[], &IngestConfig::default()).await.unwrap();
        assert!(output.chunks.is_empty());
    }
}
