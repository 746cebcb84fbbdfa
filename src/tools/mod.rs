//! Tool catalogue and dispatch.
//!
//! Agents reference tools by id (`"MathTool"`, `"FileOpsTool"`, …).  The
//! set is closed: [`ToolKind`] names every known tool and keeps anything
//! else as an inert [`ToolKind::Unknown`] so stored records round-trip.
//!
//! Two tools have local handlers the model can call as functions:
//! `calculator` (MathTool) and `file_operations` (FileOpsTool).  The rest
//! are descriptive capabilities only.

pub mod calc;
pub mod file_ops;

use std::fmt;
use std::path::Path;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

pub use calc::{calculator, CalcError};
pub use file_ops::file_operations;

/// Function name offered to the model for the calculator.
pub const CALCULATOR_FN: &str = "calculator";
/// Function name offered to the model for file operations.
pub const FILE_OPERATIONS_FN: &str = "file_operations";

/// Every tool an agent may list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToolKind {
    WebSearch,
    Summarize,
    FileOps,
    Math,
    YFinance,
    /// An id outside the catalogue.  Kept on the record, never executed.
    Unknown(String),
}

impl ToolKind {
    /// Tools in catalogue order.
    pub const KNOWN: [ToolKind; 5] = [
        ToolKind::WebSearch,
        ToolKind::Summarize,
        ToolKind::FileOps,
        ToolKind::Math,
        ToolKind::YFinance,
    ];

    pub fn from_id(id: &str) -> Self {
        match id {
            "WebSearchTool" => ToolKind::WebSearch,
            "SummarizeTool" => ToolKind::Summarize,
            "FileOpsTool" => ToolKind::FileOps,
            "MathTool" => ToolKind::Math,
            "YFinanceTool" => ToolKind::YFinance,
            other => ToolKind::Unknown(other.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ToolKind::WebSearch => "WebSearchTool",
            ToolKind::Summarize => "SummarizeTool",
            ToolKind::FileOps => "FileOpsTool",
            ToolKind::Math => "MathTool",
            ToolKind::YFinance => "YFinanceTool",
            ToolKind::Unknown(id) => id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ToolKind::WebSearch => "Web Search",
            ToolKind::Summarize => "Summarize",
            ToolKind::FileOps => "File Operations",
            ToolKind::Math => "Calculator",
            ToolKind::YFinance => "Stock Market Data",
            ToolKind::Unknown(id) => id,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "🔍",
            ToolKind::Summarize => "📝",
            ToolKind::FileOps => "📁",
            ToolKind::Math => "🧮",
            ToolKind::YFinance => "💰",
            ToolKind::Unknown(_) => "❔",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::WebSearch => "Search the web for current information, news, and data",
            ToolKind::Summarize => "Summarize long texts, articles, and documents",
            ToolKind::FileOps => "Read, write, and manage files",
            ToolKind::Math => "Perform mathematical calculations and evaluate expressions",
            ToolKind::YFinance => "Get real-time stock prices, company info, and financial data",
            ToolKind::Unknown(_) => "Unrecognized tool",
        }
    }

    /// Markdown bullet used in demo replies; `None` for unknown ids.
    pub fn capability_line(&self) -> Option<&'static str> {
        Some(match self {
            ToolKind::WebSearch => "🔍 **Web Search**: Search DuckDuckGo for current information",
            ToolKind::Summarize => "📝 **Summarize**: Condense long texts into key points",
            ToolKind::FileOps => "📁 **File Operations**: Read and write files safely",
            ToolKind::Math => "🧮 **Calculator**: Perform complex mathematical calculations",
            ToolKind::YFinance => "💰 **Finance Data**: Get stock prices and market analysis",
            ToolKind::Unknown(_) => return None,
        })
    }

    /// OpenAI-style function definition for tools with a local handler.
    pub fn function_definition(&self) -> Option<Value> {
        let (name, description, param, param_desc) = match self {
            ToolKind::Math => (
                CALCULATOR_FN,
                "Evaluate a mathematical expression such as '2 + 2', 'sqrt(16)' or 'sin(pi/2)'.",
                "expression",
                "The expression to evaluate.",
            ),
            ToolKind::FileOps => (
                FILE_OPERATIONS_FN,
                "Read, write or list files in the agent workspace.",
                "command",
                "One of 'read:filepath', 'write:filepath:content' or 'list:directory'.",
            ),
            _ => return None,
        };
        Some(json!({
            "type": "function",
            "function": {
                "name": name,
                "description": description,
                "parameters": {
                    "type": "object",
                    "properties": {
                        param: { "type": "string", "description": param_desc }
                    },
                    "required": [param],
                    "additionalProperties": false
                }
            }
        }))
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

// ── Catalogue ────────────────────────────────────────────────

/// Catalogue entry as exposed by the CLI and HTTP API.
#[derive(Debug, Clone, Serialize)]
pub struct ToolMeta {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    /// Whether the tool runs locally when the model calls it.
    pub callable: bool,
}

impl From<&ToolKind> for ToolMeta {
    fn from(kind: &ToolKind) -> Self {
        Self {
            id: kind.id().to_string(),
            name: kind.label().to_string(),
            icon: kind.icon().to_string(),
            description: kind.description().to_string(),
            callable: kind.function_definition().is_some(),
        }
    }
}

/// The full catalogue in display order.
pub fn list_tools() -> Vec<ToolMeta> {
    ToolKind::KNOWN.iter().map(ToolMeta::from).collect()
}

/// Function definitions for the callable tools among `tool_ids`,
/// deduplicated and in the order given.
pub fn function_definitions(tool_ids: &[String]) -> Vec<Value> {
    let mut seen = Vec::new();
    tool_ids
        .iter()
        .map(|id| ToolKind::from_id(id))
        .filter(|kind| {
            if seen.contains(kind) {
                return false;
            }
            seen.push(kind.clone());
            true
        })
        .filter_map(|kind| kind.function_definition())
        .collect()
}

// ── Dispatcher ───────────────────────────────────────────────

/// Run a model-requested function by name.
///
/// `arguments` is the raw JSON argument string from the model.  Handler
/// failures come back as display text; only an unknown function name or
/// unusable arguments are errors.
pub async fn call_tool(name: &str, arguments: &str, workspace: &Path) -> anyhow::Result<String> {
    let args: Value = if arguments.trim().is_empty() {
        json!({})
    } else {
        serde_json::from_str(arguments)
            .map_err(|e| anyhow::anyhow!("{name}: arguments are not valid JSON: {e}"))?
    };
    debug!(tool = name, "calling tool");

    match name {
        CALCULATOR_FN => {
            let expr = string_arg(&args, "expression")
                .ok_or_else(|| anyhow::anyhow!("{name}: missing `expression` argument"))?;
            Ok(calc::calculator(expr))
        }
        FILE_OPERATIONS_FN => {
            let command = string_arg(&args, "command")
                .ok_or_else(|| anyhow::anyhow!("{name}: missing `command` argument"))?;
            Ok(file_ops::file_operations(workspace, command).await)
        }
        other => anyhow::bail!("unknown tool: {other}"),
    }
}

fn string_arg<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str)
}
