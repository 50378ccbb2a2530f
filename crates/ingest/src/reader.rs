use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};

/// Document id -> full text. Iteration order carries no meaning.
pub type DocumentMap = HashMap<String, String>;

pub const DEFAULT_EXTENSIONS: &[&str] = &["txt", "md"];

/// What to do when a listed file cannot be read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnreadablePolicy {
    /// Fail the whole load on the first unreadable file.
    #[default]
    Abort,
    /// Keep going and report the failures alongside the loaded documents.
    Skip,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: DocumentMap,
    /// Only populated under [`UnreadablePolicy::Skip`].
    pub skipped: Vec<IngestError>,
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    extensions: Vec<String>,
    policy: UnreadablePolicy,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()), UnreadablePolicy::Abort)
    }
}

impl DocumentLoader {
    pub fn new(extensions: impl IntoIterator<Item = String>, policy: UnreadablePolicy) -> Self {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            policy,
        }
    }

    pub fn with_policy(mut self, policy: UnreadablePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> UnreadablePolicy {
        self.policy
    }

    pub fn is_text_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|known| known.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    /// Load every text file directly inside `dir`. Subdirectories are not
    /// descended into.
    pub async fn load(&self, dir: &Path) -> Result<LoadReport> {
        let not_found = |source: std::io::Error| IngestError::DirectoryNotFound {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = fs::read_dir(dir).await.map_err(not_found)?;
        let mut report = LoadReport::default();

        while let Some(entry) = entries.next_entry().await.map_err(not_found)? {
            let path = entry.path();
            if !self.is_text_file(&path) {
                continue;
            }

            self.record(&mut report, &path, read_document(&path).await)?;
        }

        info!(
            dir = %dir.display(),
            documents = report.documents.len(),
            skipped = report.skipped.len(),
            "Loaded documents"
        );

        Ok(report)
    }

    /// Load an explicit list of files. The extension filter does not apply;
    /// a missing file is unreadable and handled by the policy.
    pub async fn load_files(&self, paths: &[PathBuf]) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        for path in paths {
            self.record(&mut report, path, read_document(path).await)?;
        }

        info!(
            files = paths.len(),
            documents = report.documents.len(),
            skipped = report.skipped.len(),
            "Loaded listed documents"
        );

        Ok(report)
    }

    fn record(
        &self,
        report: &mut LoadReport,
        path: &Path,
        read: Result<Option<(String, String)>>,
    ) -> Result<()> {
        match read {
            Ok(Some((id, text))) => {
                debug!(document_id = %id, chars = text.chars().count(), "Loaded document");
                if report.documents.insert(id, text).is_some() {
                    warn!(path = %path.display(), "Duplicate document id, keeping the later file");
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => match self.policy {
                UnreadablePolicy::Abort => Err(e),
                UnreadablePolicy::Skip => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                    report.skipped.push(e);
                    Ok(())
                }
            },
        }
    }
}

/// Returns `None` for entries that match a text extension but are not
/// regular files (e.g. a directory named `notes.txt`).
async fn read_document(path: &Path) -> Result<Option<(String, String)>> {
    let unreadable = |source: std::io::Error| IngestError::UnreadableDocument {
        path: path.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(path).await.map_err(unreadable)?;
    if !metadata.is_file() {
        return Ok(None);
    }

    let Some(id) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Ok(None);
    };
    let text = fs::read_to_string(path).await.map_err(unreadable)?;

    Ok(Some((id, text)))
}

/// Load `dir` with the default extensions, aborting on the first unreadable file.
pub async fn load_documents(dir: &Path) -> Result<DocumentMap> {
    let report = DocumentLoader::default().load(dir).await?;
    Ok(report.documents)
}
