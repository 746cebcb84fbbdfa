//! Model catalogue and provider abstractions.
//!
//! Holds the fixed set of supported model identifiers, the
//! [`ModelProvider`] trait, the [`ChatMessage`] type, and the
//! OpenAI-compatible [`GroqProvider`].

pub mod groq;

use async_trait::async_trait;
use serde::Serialize;

pub use groq::GroqProvider;

// ---------------------------------------------------------------------------
// Model catalogue
// ---------------------------------------------------------------------------

/// Model used when an agent names an unsupported one.
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

/// Catalogue entry for a supported model.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub provider: &'static str,
}

pub static AVAILABLE_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "llama-3.3-70b-versatile",
        name: "Llama 3.3 70B",
        description: "Most capable Llama model, versatile for various tasks",
        provider: "Meta",
    },
    ModelInfo {
        id: "llama-3.1-70b-versatile",
        name: "Llama 3.1 70B",
        description: "Previous generation Llama, still very capable",
        provider: "Meta",
    },
    ModelInfo {
        id: "llama-3.1-8b-instant",
        name: "Llama 3.1 8B Instant",
        description: "Fast and efficient smaller model",
        provider: "Meta",
    },
    ModelInfo {
        id: "mixtral-8x7b-32768",
        name: "Mixtral 8x7B",
        description: "Mixture of experts model with 32k context",
        provider: "Mistral",
    },
    ModelInfo {
        id: "gemma2-9b-it",
        name: "Gemma 2 9B",
        description: "Google's efficient instruction-tuned model",
        provider: "Google",
    },
];

/// True when `id` is one of the supported model identifiers.
pub fn is_supported(id: &str) -> bool {
    AVAILABLE_MODELS.iter().any(|m| m.id == id)
}

/// Catalogue entry for `id`, if supported.
pub fn info(id: &str) -> Option<&'static ModelInfo> {
    AVAILABLE_MODELS.iter().find(|m| m.id == id)
}

/// Return `id` when supported, otherwise `fallback`.
pub fn resolve_or<'a>(id: &'a str, fallback: &'a str) -> &'a str {
    if is_supported(id) {
        id
    } else {
        fallback
    }
}

/// Return `id` when supported, otherwise [`DEFAULT_MODEL`].
pub fn resolve_or_default(id: &str) -> &str {
    resolve_or(id, DEFAULT_MODEL)
}

// ---------------------------------------------------------------------------
// ChatMessage – shared message representation
// ---------------------------------------------------------------------------

/// A single chat message sent to the provider.
///
/// Optionally carries OpenAI tool-calling metadata so that `tool`
/// role messages and assistant `tool_calls` are serialised correctly.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// For assistant messages that invoke tools: the raw `tool_calls` array.
    pub tool_calls: Option<Vec<serde_json::Value>>,
    /// For `role: "tool"` messages: the id of the originating call.
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Convenience constructor for a plain message (no tool metadata).
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Serialise messages into the OpenAI-compatible JSON array format.
pub fn serialize_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
    messages
        .iter()
        .map(|m| {
            let mut msg = serde_json::json!({ "role": m.role });
            if let Some(ref tcs) = m.tool_calls {
                msg["tool_calls"] = serde_json::json!(tcs);
                // Content must be null on assistant messages that only carry tool_calls.
                if m.content.is_empty() {
                    msg["content"] = serde_json::Value::Null;
                } else {
                    msg["content"] = serde_json::json!(m.content);
                }
            } else {
                msg["content"] = serde_json::json!(m.content);
            }
            if let Some(ref tcid) = m.tool_call_id {
                msg["tool_call_id"] = serde_json::json!(tcid);
            }
            msg
        })
        .collect()
}

// ---------------------------------------------------------------------------
// ProviderResponse – function-calling aware response
// ---------------------------------------------------------------------------

/// A single function call requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCallItem {
    /// Tool-call id assigned by the API (may be empty).
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Response from a model: a final text reply or one or more function calls.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderResponse {
    Final(String),
    FunctionCalls(Vec<FunctionCallItem>),
}

/// Parse `tool_calls` (or the legacy `function_call`) from a chat
/// completion response.  Returns `None` for plain text replies.
pub fn parse_tool_calls(json: &serde_json::Value) -> Option<ProviderResponse> {
    let message = json.get("choices")?.get(0)?.get("message")?;

    if let Some(tool_calls) = message.get("tool_calls").and_then(|v| v.as_array()) {
        let items: Vec<FunctionCallItem> = tool_calls
            .iter()
            .filter_map(|tc| {
                let func = tc.get("function")?;
                let name = func.get("name")?.as_str()?.to_string();
                let arguments = func
                    .get("arguments")
                    .and_then(|a| a.as_str())
                    .unwrap_or("{}")
                    .to_string();
                let id = tc
                    .get("id")
                    .and_then(|i| i.as_str())
                    .unwrap_or("")
                    .to_string();
                Some(FunctionCallItem { id, name, arguments })
            })
            .collect();
        if !items.is_empty() {
            return Some(ProviderResponse::FunctionCalls(items));
        }
    }

    if let Some(fc) = message.get("function_call").and_then(|v| v.as_object()) {
        let name = fc
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let arguments = fc
            .get("arguments")
            .and_then(|v| v.as_str())
            .unwrap_or("{}")
            .to_string();
        return Some(ProviderResponse::FunctionCalls(vec![FunctionCallItem {
            id: String::new(),
            name,
            arguments,
        }]));
    }

    None
}

// ---------------------------------------------------------------------------
// ModelProvider trait
// ---------------------------------------------------------------------------

/// Trait implemented by every LLM backend.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send a sequence of chat messages and return the assistant's reply.
    async fn send_chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String>;

    /// Send chat messages with tool definitions.  The model may answer
    /// with text or with function calls.
    async fn send_chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
    ) -> anyhow::Result<ProviderResponse>;
}
