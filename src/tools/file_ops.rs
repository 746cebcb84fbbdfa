//! `FileOpsTool` handler: read, write and list files inside a workspace.
//!
//! Commands are plain strings so a model can pass them as one argument:
//!
//! * `read:<path>`
//! * `write:<path>:<content>` (content may itself contain `:`)
//! * `list` or `list:<dir>`
//!
//! Every path is resolved against the workspace and must stay inside it.
//! Failures are reported as text, never as errors.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

/// A parsed file command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCommand<'a> {
    Read(&'a str),
    Write { path: &'a str, content: &'a str },
    List(&'a str),
}

/// Parse a command string; the error is the text shown to the caller.
pub fn parse_command(command: &str) -> Result<FileCommand<'_>, String> {
    let mut parts = command.splitn(3, ':');
    let op = parts.next().unwrap_or_default().trim().to_lowercase();
    let path = parts.next().map(str::trim);
    let rest = parts.next();

    match op.as_str() {
        "read" => match path {
            Some(p) if !p.is_empty() => Ok(FileCommand::Read(p)),
            _ => Err("Error: Please specify a file path. Format: 'read:filepath'".into()),
        },
        "write" => match (path, rest) {
            (Some(p), Some(content)) if !p.is_empty() => Ok(FileCommand::Write { path: p, content }),
            _ => Err("Error: Format: 'write:filepath:content'".into()),
        },
        "list" => Ok(FileCommand::List(path.filter(|p| !p.is_empty()).unwrap_or("."))),
        other => Err(format!(
            "Error: Unknown operation '{other}'. Use 'read', 'write', or 'list'."
        )),
    }
}

/// Execute `command` against `workspace` and return display text.
pub async fn file_operations(workspace: &Path, command: &str) -> String {
    let cmd = match parse_command(command) {
        Ok(c) => c,
        Err(msg) => return msg,
    };
    if let Err(e) = fs::create_dir_all(workspace).await {
        return format!("Error: workspace unavailable: {e}");
    }
    debug!(workspace = %workspace.display(), ?cmd, "file operation");

    match cmd {
        FileCommand::Read(raw) => {
            let Ok(path) = sandbox_path(workspace, raw) else {
                return "Error: Access denied. Only files in the current workspace are accessible."
                    .into();
            };
            if !path.is_file() {
                return format!("Error: File '{raw}' not found.");
            }
            match fs::read_to_string(&path).await {
                Ok(content) => format!("📄 Contents of {raw}:\n\n{content}"),
                Err(e) => format!("Error reading file: {e}"),
            }
        }
        FileCommand::Write { path: raw, content } => {
            let Ok(path) = sandbox_path(workspace, raw) else {
                return "Error: Access denied.".into();
            };
            if let Some(parent) = path.parent() {
                if let Err(e) = fs::create_dir_all(parent).await {
                    return format!("Error writing file: {e}");
                }
            }
            match fs::write(&path, content).await {
                Ok(()) => format!("✅ Successfully wrote to {raw}"),
                Err(e) => format!("Error writing file: {e}"),
            }
        }
        FileCommand::List(raw) => {
            let Ok(dir) = sandbox_path(workspace, raw) else {
                return "Error: Access denied.".into();
            };
            if !dir.is_dir() {
                return format!("Error: Directory '{raw}' not found.");
            }
            match list_dir(&dir).await {
                Ok((dirs, files)) => render_listing(raw, &dirs, &files),
                Err(e) => format!("Error listing directory: {e}"),
            }
        }
    }
}

async fn list_dir(dir: &Path) -> std::io::Result<(Vec<String>, Vec<String>)> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        let ft = entry.file_type().await?;
        if ft.is_dir() {
            dirs.push(name);
        } else if ft.is_file() {
            files.push(name);
        }
    }
    dirs.sort();
    files.sort();
    Ok((dirs, files))
}

fn render_listing(raw: &str, dirs: &[String], files: &[String]) -> String {
    if dirs.is_empty() && files.is_empty() {
        return "Directory is empty.".into();
    }
    let mut out = format!("📁 Contents of {raw}:\n\n");
    if !dirs.is_empty() {
        out.push_str("Directories:\n");
        out.push_str(
            &dirs.iter().map(|d| format!("  📁 {d}")).collect::<Vec<_>>().join("\n"),
        );
        out.push_str("\n\n");
    }
    if !files.is_empty() {
        out.push_str("Files:\n");
        out.push_str(
            &files.iter().map(|f| format!("  📄 {f}")).collect::<Vec<_>>().join("\n"),
        );
    }
    out
}

// ── Workspace sandboxing ─────────────────────────────────────

/// Resolve `raw` against `workspace` and ensure the result lives inside
/// it.  Absolute paths and anything containing `..` are rejected before
/// touching the filesystem.
pub(crate) fn sandbox_path(workspace: &Path, raw: &str) -> anyhow::Result<PathBuf> {
    if Path::new(raw).is_absolute() {
        anyhow::bail!("absolute paths are not allowed: {raw}");
    }
    if raw.contains("..") {
        anyhow::bail!("path traversal ('..') is not allowed: {raw}");
    }

    let ws_canon = workspace
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("workspace canonicalize failed: {e}"))?;
    let resolved = canon_or_resolve(&workspace.join(raw))?;

    if !resolved.starts_with(&ws_canon) {
        anyhow::bail!(
            "path escapes workspace: {} is not under {}",
            resolved.display(),
            ws_canon.display()
        );
    }
    Ok(resolved)
}

/// Canonicalize the longest existing prefix of `p` and re-append the
/// missing tail (for files about to be created).
fn canon_or_resolve(p: &Path) -> anyhow::Result<PathBuf> {
    if p.exists() {
        return Ok(p.canonicalize()?);
    }
    let mut existing = p.to_path_buf();
    let mut tail = Vec::new();
    while !existing.exists() {
        let Some(file) = existing.file_name() else {
            anyhow::bail!("cannot resolve path: {}", p.display());
        };
        tail.push(file.to_os_string());
        existing = existing
            .parent()
            .ok_or_else(|| anyhow::anyhow!("cannot resolve path: {}", p.display()))?
            .to_path_buf();
    }
    let mut resolved = existing.canonicalize()?;
    resolved.extend(tail.into_iter().rev());
    Ok(resolved)
}
