//! Durable persistence for the project context.
//!
//! The persisted file is overwritten wholesale on each save (last writer
//! wins); the write goes through a temp file and an atomic rename so a
//! crash never leaves a half-written context behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use forge_core::ProjectContext;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::Result;

const CONTEXT_FILE: &str = "project_context.json";

#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Load the persisted context, `None` if nothing usable is stored.
    async fn load(&self) -> Result<Option<ProjectContext>>;

    /// Persist a snapshot, replacing any previous one.
    async fn save(&self, context: &ProjectContext) -> Result<()>;
}

/// Context store backed by a single JSON file in the project directory.
pub struct FileContextStore {
    path: PathBuf,
}

impl FileContextStore {
    pub fn new(project_dir: &Path) -> Self {
        Self {
            path: project_dir.join(CONTEXT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ContextStore for FileContextStore {
    async fn load(&self) -> Result<Option<ProjectContext>> {
        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str(&raw) {
            Ok(context) => {
                debug!(path = %self.path.display(), "Loaded existing context");
                Ok(Some(context))
            }
            Err(e) => {
                // A corrupt snapshot is treated as absent; the run starts fresh
                // rather than refusing to start at all.
                warn!(path = %self.path.display(), error = %e, "Could not load existing context");
                Ok(None)
            }
        }
    }

    async fn save(&self, context: &ProjectContext) -> Result<()> {
        let json = serde_json::to_string_pretty(context)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).await?;
        fs::rename(&tmp_path, &self.path).await?;

        debug!(path = %self.path.display(), stage = context.current_stage.as_str(), "Saved context");
        Ok(())
    }
}
