//! Directory browsing: pick a directory, list its immediate children.

use std::future::Future;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::CoreError;

/// Something that can ask the user for a directory.
///
/// Returns `Ok(None)` when the user cancels.
pub trait DirectoryPicker: Send {
    fn select_directory(
        &mut self,
    ) -> impl Future<Output = Result<Option<PathBuf>, CoreError>> + Send;
}

/// A picker that reads one path per prompt from a line-oriented input.
///
/// An empty line or end of input counts as cancel. Relative paths are
/// resolved against `base_dir`.
pub struct PromptPicker<R> {
    reader: R,
    base_dir: PathBuf,
}

impl<R> PromptPicker<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(reader: R, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            base_dir: base_dir.into(),
        }
    }
}

impl<R> DirectoryPicker for PromptPicker<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn select_directory(&mut self) -> Result<Option<PathBuf>, CoreError> {
        let mut input = String::new();
        let read = self
            .reader
            .read_line(&mut input)
            .await
            .map_err(CoreError::Prompt)?;

        let trimmed = input.trim();
        if read == 0 || trimmed.is_empty() {
            tracing::debug!("Directory selection cancelled");
            return Ok(None);
        }

        let candidate = self.base_dir.join(trimmed);
        let metadata =
            tokio::fs::metadata(&candidate)
                .await
                .map_err(|source| CoreError::DirectoryRead {
                    path: candidate.clone(),
                    source,
                })?;
        if !metadata.is_dir() {
            return Err(CoreError::NotADirectory(candidate));
        }

        let absolute = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|source| CoreError::DirectoryRead {
                path: candidate.clone(),
                source,
            })?;

        tracing::info!(path = %absolute.display(), "Directory selected");
        Ok(Some(absolute))
    }
}

/// List the names of the immediate children of `path`, sorted by name.
///
/// Not recursive. Non UTF-8 names are converted lossily.
pub async fn list_entries(path: impl AsRef<Path>) -> Result<Vec<String>, CoreError> {
    let path = path.as_ref();
    let read_err = |source| CoreError::DirectoryRead {
        path: path.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(path).await.map_err(read_err)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();

    tracing::debug!(path = %path.display(), count = names.len(), "Listed directory");
    Ok(names)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
