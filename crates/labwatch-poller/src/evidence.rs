//! Evidence persistence.

use crate::error::{PollError, Result};
use std::path::PathBuf;

/// Writes the final page capture to a fixed path, replacing any previous file.
#[derive(Debug, Clone)]
pub struct EvidenceWriter {
    path: PathBuf,
}

impl EvidenceWriter {
    /// Writer targeting `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Persist `png`, creating missing parent directories.
    pub async fn write(&self, png: &[u8]) -> Result<PathBuf> {
        let to_error = |source| PollError::Evidence {
            path: self.path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(to_error)?;
        }
        tokio::fs::write(&self.path, png).await.map_err(to_error)?;

        tracing::info!(bytes = png.len(), "evidence written to {}", self.path.display());
        Ok(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let writer = EvidenceWriter::new(tmp.path().join("result.png"));

        let path = writer.write(b"first").await.unwrap();

        assert_eq!(path, tmp.path().join("result.png"));
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_write_overwrites_existing() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("result.png");
        std::fs::write(&path, b"stale capture from an earlier run").unwrap();

        EvidenceWriter::new(&path).write(b"new").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("captures").join("abc").join("result.png");

        EvidenceWriter::new(&path).write(b"png").await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_write_failure_is_reported() {
        let tmp = TempDir::new().expect("create temp dir");
        // The destination is an existing directory
        let result = EvidenceWriter::new(tmp.path()).write(b"png").await;
        assert!(matches!(result, Err(PollError::Evidence { .. })));
    }
}
