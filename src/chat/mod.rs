//! Chat transcripts and the chat log writer.
//!
//! A transcript belongs to the calling session; [`ChatLogWriter`] only
//! serializes a snapshot into a new timestamped file under the chats
//! directory.  Saved files are never read back or merged.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

// ── Transcript ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: Role,
    pub content: String,
    /// Optional reasoning trace supplied by the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

impl TranscriptMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            reasoning: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            reasoning: None,
        }
    }
}

/// On-disk shape of a saved chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedChat {
    pub agent: String,
    /// `YYYYMMDD_HHMMSS`, local time.
    pub timestamp: String,
    pub messages: Vec<TranscriptMessage>,
}

/// Render messages as plain text: `ROLE:\ncontent\n` blocks separated
/// by blank lines.
pub fn export_text(messages: &[TranscriptMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}:\n{}\n", m.role.as_str().to_uppercase(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// File-name stem for an agent: spaces (and path separators) become `_`.
pub fn file_stem(agent_name: &str) -> String {
    agent_name.replace([' ', '/', '\\'], "_")
}

// ── Writer ───────────────────────────────────────────────────

/// Writes transcripts to `<dir>/<agent>_<YYYYMMDD_HHMMSS>.json`.
#[derive(Debug, Clone)]
pub struct ChatLogWriter {
    dir: PathBuf,
}

impl ChatLogWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(cfg: &crate::config::StorageConfig) -> Self {
        Self::new(cfg.chats_path())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a snapshot of `messages` and return the written path.
    pub async fn save_chat(
        &self,
        agent_name: &str,
        messages: &[TranscriptMessage],
    ) -> anyhow::Result<PathBuf> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        self.save_chat_at(agent_name, messages, &timestamp).await
    }

    /// Like [`save_chat`](Self::save_chat) with an explicit timestamp.
    ///
    /// Never overwrites: if the name is taken (two saves within one
    /// second) a `_2`, `_3`, … suffix is appended.
    pub async fn save_chat_at(
        &self,
        agent_name: &str,
        messages: &[TranscriptMessage],
        timestamp: &str,
    ) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create chats dir {}", self.dir.display()))?;

        let chat = SavedChat {
            agent: agent_name.to_string(),
            timestamp: timestamp.to_string(),
            messages: messages.to_vec(),
        };
        let json = serde_json::to_string_pretty(&chat).context("serialize chat")?;

        let stem = format!("{}_{timestamp}", file_stem(agent_name));
        let mut attempt = 1u32;
        loop {
            let name = if attempt == 1 {
                format!("{stem}.json")
            } else {
                format!("{stem}_{attempt}.json")
            };
            let path = self.dir.join(name);
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(json.as_bytes())
                        .await
                        .with_context(|| format!("write chat file {}", path.display()))?;
                    file.flush().await?;
                    debug!(path = %path.display(), messages = messages.len(), "chat saved");
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => {
                    return Err(e)
                        .with_context(|| format!("create chat file {}", path.display()));
                }
            }
        }
    }
}
