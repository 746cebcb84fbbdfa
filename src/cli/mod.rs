//! CLI subcommand implementations.
//!
//! Each command takes the already-loaded [`Config`] and prints to stdout.
//! Rendering is split into pure functions so it can be tested without
//! capturing output.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::chat::{ChatLogWriter, TranscriptMessage};
use crate::config::Config;
use crate::models::AVAILABLE_MODELS;
use crate::registry::{AgentRegistry, SearchFilters, SortOrder};
use crate::runner::AgentRunner;
use crate::store::{seed, AgentDraft, AgentRecord, AgentStore};
use crate::tools::calc;

/// Install the bundled seed (first run only), create the data and chats
/// directories and return a registry over the configured store.
pub async fn init_storage(cfg: &Config) -> anyhow::Result<AgentRegistry> {
    seed::install_bundled_seed(&cfg.storage.seed_path())?;
    let store = AgentStore::from_config(&cfg.storage);
    store.ensure_initialized().await?;
    let chats = cfg.storage.chats_path();
    tokio::fs::create_dir_all(&chats)
        .await
        .with_context(|| format!("create chats dir {}", chats.display()))?;
    Ok(AgentRegistry::new(store))
}

// ── Rendering ────────────────────────────────────────────────

/// Fixed-width table of agents.
pub fn render_agent_table(records: &[AgentRecord]) -> String {
    if records.is_empty() {
        return "No agents found.\n".to_string();
    }
    let mut out = format!(
        "{:<10} {:<24} {:<16} {:<26} {}\n",
        "ID", "NAME", "AUTHOR", "MODEL", "TOOLS"
    );
    out.push_str(&"─".repeat(96));
    out.push('\n');
    for r in records {
        let tools = if r.tools.is_empty() {
            "-".to_string()
        } else {
            r.tools.join(",")
        };
        out.push_str(&format!(
            "{:<10} {:<24} {:<16} {:<26} {}\n",
            r.id,
            crate::utils::truncate_str(&r.name, 24),
            crate::utils::truncate_str(&r.author, 16),
            r.model,
            tools
        ));
    }
    out.push_str(&format!("\n{} agent(s).\n", records.len()));
    out
}

/// Parse an import file: either one draft object or an array of them.
/// Every draft must carry the required fields.
pub fn parse_import(json: &str) -> anyhow::Result<Vec<AgentDraft>> {
    let value: serde_json::Value = serde_json::from_str(json).context("import file is not valid JSON")?;
    let drafts: Vec<AgentDraft> = if value.is_array() {
        serde_json::from_value(value).context("import array must contain agent objects")?
    } else {
        vec![serde_json::from_value(value).context("import object is not an agent")?]
    };
    for (i, draft) in drafts.iter().enumerate() {
        draft
            .validate()
            .with_context(|| format!("agent #{} ({:?})", i + 1, draft.name))?;
    }
    Ok(drafts)
}

// ── Agent commands ───────────────────────────────────────────

pub async fn list_agents(
    cfg: &Config,
    query: &str,
    filters: &SearchFilters,
    order: SortOrder,
) -> anyhow::Result<()> {
    let registry = init_storage(cfg).await?;
    let records = registry.browse(query, Some(filters), order).await;
    print!("{}", render_agent_table(&records));
    Ok(())
}

/// Print the agent summary followed by its raw record.
pub async fn show_agent(cfg: &Config, id: &str) -> anyhow::Result<()> {
    let registry = init_storage(cfg).await?;
    let record = registry
        .get_by_id(id)
        .await
        .with_context(|| format!("agent not found: {id}"))?;

    let runner = AgentRunner::new(&record, &cfg.provider, cfg.storage.workspace_path());
    let sep = "─".repeat(50);
    println!("{}", runner.info());
    println!("{sep}");
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

pub async fn import_agents(cfg: &Config, file: &Path) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("read {}", file.display()))?;
    let drafts = parse_import(&text)?;

    let registry = init_storage(cfg).await?;
    for draft in drafts {
        let record = registry.create(draft).await?;
        println!("Created {} ({})", record.id, record.name);
    }
    Ok(())
}

pub async fn export_agent(cfg: &Config, id: &str, output: Option<&Path>) -> anyhow::Result<()> {
    let registry = init_storage(cfg).await?;
    let record = registry
        .get_by_id(id)
        .await
        .with_context(|| format!("agent not found: {id}"))?;
    let json = serde_json::to_string_pretty(&record)?;
    match output {
        Some(path) => {
            tokio::fs::write(path, &json)
                .await
                .with_context(|| format!("write {}", path.display()))?;
            println!("Exported {id} to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

pub async fn delete_agent(cfg: &Config, id: &str) -> anyhow::Result<()> {
    let registry = init_storage(cfg).await?;
    if registry.delete(id).await? {
        println!("Deleted {id}.");
    } else {
        println!("No agent with id {id}.");
    }
    Ok(())
}

// ── Other commands ───────────────────────────────────────────

pub fn calc(expression: &str) {
    println!("{}", calc::calculator(expression));
}

pub fn list_models(cfg: &Config) {
    println!("{:<26} {:<22} {:<10} DESCRIPTION", "ID", "NAME", "PROVIDER");
    println!("{}", "─".repeat(96));
    for m in AVAILABLE_MODELS {
        let marker = if m.id == cfg.provider.default_model { " (default)" } else { "" };
        println!(
            "{:<26} {:<22} {:<10} {}{marker}",
            m.id, m.name, m.provider, m.description
        );
    }
    println!("\n{}", cfg.provider.api_key_status());
}

pub fn list_tools() {
    for t in crate::tools::list_tools() {
        let callable = if t.callable { "" } else { " (model capability)" };
        println!("{} {:<14} {}{callable}\n   {}", t.icon, t.id, t.name, t.description);
    }
}

/// Chat with an agent.  With `message`, answer once; otherwise read
/// lines from stdin until EOF or `exit`.  When `save` is set the
/// transcript is written to the chats directory afterwards.
pub async fn chat(cfg: &Config, id: &str, message: Option<String>, save: bool) -> anyhow::Result<()> {
    let registry = init_storage(cfg).await?;
    let record = registry
        .get_by_id(id)
        .await
        .with_context(|| format!("agent not found: {id}"))?;
    let runner = AgentRunner::new(&record, &cfg.provider, cfg.storage.workspace_path());
    if !runner.is_live() {
        info!("{}", cfg.provider.api_key_status());
    }

    let mut transcript: Vec<TranscriptMessage> = Vec::new();
    match message {
        Some(msg) => {
            let reply = runner.run(&msg, &transcript).await;
            println!("{reply}");
            transcript.push(TranscriptMessage::user(msg));
            transcript.push(TranscriptMessage::assistant(reply));
        }
        None => {
            println!("Chatting with {} ({}). Type 'exit' to quit.", record.name, runner.model());
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Some(line) = lines.next_line().await? {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    break;
                }
                let reply = runner.run(&line, &transcript).await;
                println!("\n{reply}\n");
                transcript.push(TranscriptMessage::user(line));
                transcript.push(TranscriptMessage::assistant(reply));
            }
        }
    }

    if save && !transcript.is_empty() {
        let writer = ChatLogWriter::from_config(&cfg.storage);
        let path: PathBuf = writer.save_chat(&record.name, &transcript).await?;
        println!("Chat saved to {}", path.display());
    }
    Ok(())
}
