//! Bundled example agents embedded at compile time.
//!
//! On first run the embedded set is written to the seed file, which
//! [`AgentStore::load_all`](super::AgentStore::load_all) adopts while
//! the primary store is empty.

use std::path::Path;

use anyhow::Context as _;
use tracing::{debug, info};

/// Example agent set shipped with the binary.
pub static BUNDLED_EXAMPLES: &str = include_str!("example_agents.json");

/// Write the bundled examples to `seed_path` unless a seed file exists.
///
/// Existing seed files are never overwritten so user edits survive.
/// Returns `true` when a file was written.
pub fn install_bundled_seed(seed_path: &Path) -> anyhow::Result<bool> {
    if seed_path.exists() {
        debug!(path = %seed_path.display(), "seed file already present, skipping");
        return Ok(false);
    }
    if let Some(dir) = seed_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create seed dir {}", dir.display()))?;
    }
    std::fs::write(seed_path, BUNDLED_EXAMPLES)
        .with_context(|| format!("write seed file {}", seed_path.display()))?;
    info!(path = %seed_path.display(), "installed bundled example agents");
    Ok(true)
}
