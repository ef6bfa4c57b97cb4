//! Loading and clearing the worker's result artifact.

use std::io::ErrorKind;
use std::path::Path;

use runwatch_core::{Artifact, Viewport};
use tracing::{debug, info};

use crate::error::MonitorError;

/// Content type of the run-history animation browser agents write.
pub const DEFAULT_CONTENT_TYPE: &str = "image/gif";

/// Reads the optional artifact file a worker leaves behind.
///
/// A missing file is a normal outcome, not an error.
#[derive(Debug, Clone)]
pub struct ArtifactLoader {
    content_type: String,
    viewport: Viewport,
}

impl ArtifactLoader {
    pub fn new(content_type: impl Into<String>, viewport: Viewport) -> Self {
        Self {
            content_type: content_type.into(),
            viewport,
        }
    }

    /// Load the artifact at `path`, or `None` if there is no such file.
    pub async fn load(&self, path: &Path) -> Result<Option<Artifact>, MonitorError> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                debug!(path = %path.display(), len = bytes.len(), "Loaded artifact");
                Ok(Some(Artifact {
                    bytes,
                    content_type: self.content_type.clone(),
                    viewport: self.viewport,
                }))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No artifact produced");
                Ok(None)
            }
            Err(source) => Err(MonitorError::Artifact {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Delete the artifact at `path` if it exists.
    ///
    /// Returns whether a file was removed; a missing file is not an error.
    pub async fn clear(path: &Path) -> Result<bool, MonitorError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                info!(path = %path.display(), "Cleared artifact");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(MonitorError::Artifact {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_TYPE, Viewport::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_present_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent_history.gif");
        let bytes = vec![0x47u8; 1234];
        std::fs::write(&path, &bytes).unwrap();

        let viewport = Viewport::new(800, 600).unwrap();
        let loader = ArtifactLoader::new("image/gif", viewport);
        let artifact = loader.load(&path).await.unwrap().expect("artifact present");

        assert_eq!(artifact.len(), 1234);
        assert_eq!(artifact.content_type, "image/gif");
        assert_eq!(artifact.viewport, viewport);
        assert_eq!(artifact.bytes, bytes);
    }

    #[tokio::test]
    async fn test_load_missing_is_empty() {
        let dir = TempDir::new().unwrap();
        let loaded = ArtifactLoader::default()
            .load(&dir.path().join("missing.gif"))
            .await
            .unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_load_directory_is_error() {
        let dir = TempDir::new().unwrap();
        let result = ArtifactLoader::default().load(dir.path()).await;
        assert!(matches!(result, Err(MonitorError::Artifact { .. })));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("agent_history.gif");
        std::fs::write(&path, b"GIF89a").unwrap();

        assert!(ArtifactLoader::clear(&path).await.unwrap());
        assert!(!path.exists());
        assert!(!ArtifactLoader::clear(&path).await.unwrap());
        assert!(!path.exists());
    }
}
