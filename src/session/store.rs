// ABOUTME: Persistence abstraction for session execution state
// ABOUTME: Provides the StateStore trait with in-memory and JSON-file implementations

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::debug;

use super::error::{Result, StoreError};
use super::state::SessionState;

/// Load/save of session state keyed by session id.
///
/// `save` must be atomic from the caller's point of view and a `load` that
/// follows a successful `save` must observe the saved values.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<SessionState>;

    async fn save(&self, state: &SessionState) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self, session_id: &str) -> Result<SessionState> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                session_id: session_id.to_string(),
            })
    }

    async fn save(&self, state: &SessionState) -> Result<()> {
        self.sessions
            .write()
            .await
            .insert(state.session_id.clone(), state.clone());
        Ok(())
    }
}

/// One pretty-printed JSON document per session under a root directory.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        validate_session_id(session_id)?;
        Ok(self.root.join(format!("{}.json", session_id)))
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self, session_id: &str) -> Result<SessionState> {
        let path = self.session_path(session_id)?;

        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    session_id: session_id.to_string(),
                })
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, state: &SessionState) -> Result<()> {
        let path = self.session_path(&state.session_id)?;
        let json = serde_json::to_string_pretty(state)?;

        fs::create_dir_all(&self.root).await?;

        // Write to a temp file, then rename over the target
        let tmp_path = self.root.join(format!(".{}.json.tmp", state.session_id));
        fs::write(&tmp_path, json.as_bytes()).await?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(e));
        }

        debug!(
            "Saved session {} ({} bytes) to {}",
            state.session_id,
            json.len(),
            path.display()
        );
        Ok(())
    }
}

fn validate_session_id(session_id: &str) -> Result<()> {
    let valid = !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSessionId {
            session_id: session_id.to_string(),
        })
    }
}
