//! Document sources

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use walkdir::WalkDir;

use crate::search::{SearchError, SearchResult};

/// Where raw documents come from.
///
/// Identifiers are opaque to the engine; they are handed back to
/// [`Corpus::read_document`] and to the parser, which derives the
/// document path from them.
#[async_trait]
pub trait Corpus: Send + Sync {
    async fn list_documents(&self) -> SearchResult<Vec<String>>;

    async fn read_document(&self, id: &str) -> SearchResult<String>;

    /// Drop any cached listing. Called at the start of every rebuild.
    fn invalidate(&self) {}
}

/// A directory tree of markdown files
pub struct FsCorpus {
    root: PathBuf,
    extensions: Vec<String>,
    listing: Mutex<Option<Vec<String>>>,
}

impl FsCorpus {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into(),
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            listing: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }

    fn scan(&self) -> SearchResult<Vec<String>> {
        if !self.root.is_dir() {
            return Err(SearchError::Corpus(format!(
                "Corpus root is not a directory: {}",
                self.root.display()
            )));
        }

        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("[FsCorpus] Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.matches_extension(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let id = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            ids.push(id);
        }

        ids.sort();
        log::debug!("[FsCorpus] Listed {} documents under {}", ids.len(), self.root.display());
        Ok(ids)
    }

    /// Resolve an identifier to a file inside the root
    fn resolve(&self, id: &str) -> SearchResult<PathBuf> {
        let relative = Path::new(id);
        let escapes = relative.components().any(|c| {
            !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir)
        });
        if escapes {
            return Err(SearchError::Corpus(format!(
                "Document id escapes the corpus root: {}",
                id
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Corpus for FsCorpus {
    async fn list_documents(&self) -> SearchResult<Vec<String>> {
        if let Some(cached) = self.listing.lock().as_ref() {
            return Ok(cached.clone());
        }
        let ids = self.scan()?;
        *self.listing.lock() = Some(ids.clone());
        Ok(ids)
    }

    async fn read_document(&self, id: &str) -> SearchResult<String> {
        let path = self.resolve(id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                let bytes = tokio::fs::read(&path).await?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn invalidate(&self) {
        *self.listing.lock() = None;
    }
}
