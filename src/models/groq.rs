//! OpenAI-compatible chat provider, defaulting to GroqCloud.
//!
//! Config example:
//! ```yaml
//! provider:
//!   endpoint: https://api.groq.com/openai/v1/chat/completions
//!   api_key: $GROQ_API_KEY
//!   default_model: llama-3.3-70b-versatile
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{ChatMessage, ModelProvider, ProviderResponse};

/// Provider that talks to an OpenAI-compatible chat completions API.
pub struct GroqProvider {
    api_key: String,
    endpoint: String,
    model: String,
    client: Client,
}

impl GroqProvider {
    /// Create a provider with explicit configuration.
    ///
    /// `api_key` may be empty for local servers that don't require auth.
    pub fn new(endpoint: String, api_key: String, model: String) -> Self {
        Self {
            api_key,
            endpoint,
            model,
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(90))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Build a provider from the configured endpoint/key for `model`.
    pub fn from_config(cfg: &crate::config::ProviderConfig, model: &str) -> Self {
        Self::new(cfg.endpoint.clone(), cfg.resolved_api_key(), model.to_string())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn post(&self, body: &serde_json::Value) -> anyhow::Result<serde_json::Value> {
        let mut req = self.client.post(&self.endpoint).json(body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        let resp = req.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::UNAUTHORIZED {
                anyhow::bail!("authentication failed (invalid api_key?): {status}: {text}");
            }
            anyhow::bail!("chat completions API returned {status}: {text}");
        }

        Ok(resp.json().await?)
    }
}

fn message_content(json: &serde_json::Value) -> String {
    json["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string()
}

#[async_trait]
impl ModelProvider for GroqProvider {
    async fn send_chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "messages": super::serialize_messages(messages),
        });
        let json = self.post(&body).await?;
        Ok(message_content(&json))
    }

    async fn send_chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[serde_json::Value],
    ) -> anyhow::Result<ProviderResponse> {
        let mut body = json!({
            "model": self.model,
            "messages": super::serialize_messages(messages),
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::Value::Array(tools.to_vec());
            body["tool_choice"] = json!("auto");
        }

        let json = self.post(&body).await?;
        if let Some(pr) = super::parse_tool_calls(&json) {
            return Ok(pr);
        }
        Ok(ProviderResponse::Final(message_content(&json)))
    }
}
