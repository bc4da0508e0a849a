// ABOUTME: Resolution of file artifact references into their stored content
// ABOUTME: Reads artifacts in full from under a root directory with containment checks

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::engine::result::ArtifactRef;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Final report file '{filename}' not found at expected location: {}", path.display())]
    NotFound { filename: String, path: PathBuf },

    #[error("Final report file '{filename}' is outside the artifact directory")]
    OutsideRoot { filename: String },

    #[error("Error reading final report file '{filename}': {source}")]
    Io {
        filename: String,
        #[source]
        source: std::io::Error,
    },
}

/// Turns an artifact reference into displayable text
#[async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve(&self, artifact: &ArtifactRef) -> Result<String, ArtifactError>;
}

/// Resolves artifacts as files relative to a root directory.
///
/// Content is returned whole; the final result must match the file exactly.
#[derive(Debug, Clone)]
pub struct FsArtifactResolver {
    root: PathBuf,
}

impl FsArtifactResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, filename: &str) -> Result<PathBuf, ArtifactError> {
        let relative = Path::new(filename);
        let contained = !filename.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

        if !contained {
            return Err(ArtifactError::OutsideRoot {
                filename: filename.to_string(),
            });
        }
        Ok(self.root.join(relative))
    }

    /// Symlinks inside the root may still point elsewhere
    async fn check_canonical(&self, filename: &str, path: &Path) -> Result<(), ArtifactError> {
        let io_error = |source| ArtifactError::Io {
            filename: filename.to_string(),
            source,
        };
        let root = fs::canonicalize(&self.root).await.map_err(io_error)?;
        let target = fs::canonicalize(path).await.map_err(io_error)?;

        if target.starts_with(&root) {
            Ok(())
        } else {
            Err(ArtifactError::OutsideRoot {
                filename: filename.to_string(),
            })
        }
    }
}

#[async_trait]
impl ArtifactResolver for FsArtifactResolver {
    async fn resolve(&self, artifact: &ArtifactRef) -> Result<String, ArtifactError> {
        let filename = artifact.filename.as_str();
        let path = self.artifact_path(filename)?;

        let exists = fs::try_exists(&path)
            .await
            .map_err(|source| ArtifactError::Io {
                filename: filename.to_string(),
                source,
            })?;
        if !exists {
            return Err(ArtifactError::NotFound {
                filename: filename.to_string(),
                path,
            });
        }
        self.check_canonical(filename, &path).await?;

        info!("Reading artifact content from {}", path.display());
        let bytes = fs::read(&path).await.map_err(|source| ArtifactError::Io {
            filename: filename.to_string(),
            source,
        })?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
