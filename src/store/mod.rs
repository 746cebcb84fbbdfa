//! JSON-file agent store.
//!
//! The whole agent list lives in one pretty-printed JSON array
//! (`agents.json`).  Reads never fail: a missing or malformed file is
//! treated as an empty list.  When the list is empty and a seed file
//! (`example_agents.json`) parses, its contents are adopted and written
//! back as the primary file.

pub mod record;
pub mod seed;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tokio::fs;
use tracing::{debug, info, warn};

pub use record::{AgentDraft, AgentRecord};

/// Outcome of reading an agent file.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    /// The file parsed as an array (possibly empty).
    Records(Vec<AgentRecord>),
    /// The file is missing, unreadable or not a valid array.
    Empty,
}

impl Loaded {
    pub fn into_records(self) -> Vec<AgentRecord> {
        match self {
            Loaded::Records(r) => r,
            Loaded::Empty => Vec::new(),
        }
    }
}

/// Handle on the primary store file and optional seed file.
///
/// Carries no cached state: every call goes to disk.
#[derive(Debug, Clone)]
pub struct AgentStore {
    primary: PathBuf,
    seed: Option<PathBuf>,
}

impl AgentStore {
    /// Create a store handle (does NOT touch the filesystem).
    pub fn new(primary: impl Into<PathBuf>, seed: Option<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            seed,
        }
    }

    /// Store using the paths from the storage config.
    pub fn from_config(cfg: &crate::config::StorageConfig) -> Self {
        Self::new(cfg.agents_path(), Some(cfg.seed_path()))
    }

    /// Path of the primary `agents.json`.
    pub fn path(&self) -> &Path {
        &self.primary
    }

    /// Path of the seed file, if any.
    pub fn seed_path(&self) -> Option<&Path> {
        self.seed.as_deref()
    }

    /// Create the storage directory and, if the primary file is missing,
    /// an empty array.  Safe to call on every startup.
    pub async fn ensure_initialized(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.primary.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("create data dir {}", dir.display()))?;
            }
        }
        if !fs::try_exists(&self.primary).await.unwrap_or(false) {
            fs::write(&self.primary, "[]")
                .await
                .with_context(|| format!("write {}", self.primary.display()))?;
            info!(path = %self.primary.display(), "initialized empty agent store");
        }
        Ok(())
    }

    /// Read and parse `path` without any fallback.
    pub async fn read_file(path: &Path) -> Loaded {
        let content = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "agent file missing");
                return Loaded::Empty;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "agent file unreadable, treating as empty");
                return Loaded::Empty;
            }
        };
        match serde_json::from_str::<Vec<AgentRecord>>(&content) {
            Ok(records) => Loaded::Records(records),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "agent file malformed, treating as empty");
                Loaded::Empty
            }
        }
    }

    /// Load every record, seeding from the example set when empty.
    pub async fn load_all(&self) -> Vec<AgentRecord> {
        let records = Self::read_file(&self.primary).await.into_records();
        if !records.is_empty() {
            return records;
        }

        let Some(seed) = self.seed.as_deref() else {
            return records;
        };
        match Self::read_file(seed).await {
            Loaded::Records(seeded) => {
                if let Err(e) = self.save_all(&seeded).await {
                    warn!(error = %e, "failed to persist seeded agents");
                } else {
                    info!(count = seeded.len(), seed = %seed.display(), "seeded agent store");
                }
                seeded
            }
            Loaded::Empty => records,
        }
    }

    /// Overwrite the primary file with `records` (pretty-printed).
    ///
    /// Not atomic: a crash mid-write can leave a truncated file, which
    /// the next load treats as empty.
    pub async fn save_all(&self, records: &[AgentRecord]) -> anyhow::Result<()> {
        if let Some(dir) = self.primary.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("create data dir {}", dir.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(records).context("serialize agents")?;
        fs::write(&self.primary, json)
            .await
            .with_context(|| format!("write {}", self.primary.display()))?;
        debug!(path = %self.primary.display(), count = records.len(), "agents saved");
        Ok(())
    }
}
