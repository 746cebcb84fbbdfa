//! agent_market — local marketplace for configuration-defined AI agents.
//!
//! This library crate re-exports modules so integration tests
//! (under `tests/`) can access them.

pub mod chat;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod models;
pub mod registry;
pub mod runner;
pub mod store;
pub mod tools;
pub mod utils;

/// Return the agent-market home directory.
///
/// Resolution order:
/// 1. `AGENT_MARKET_HOME` environment variable
/// 2. `$HOME/.agent-market`
pub fn market_home() -> std::path::PathBuf {
    if let Ok(p) = std::env::var("AGENT_MARKET_HOME") {
        std::path::PathBuf::from(p)
    } else {
        dirs::home_dir()
            .unwrap_or_else(|| std::path::PathBuf::from("."))
            .join(".agent-market")
    }
}
