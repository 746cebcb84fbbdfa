//! Agent runner: turns an [`AgentRecord`] into chat replies.
//!
//! With a configured API key the runner talks to the model provider and
//! lets the model call the local tool handlers (calculator, file
//! operations) for up to `max_tool_iterations` rounds.  Without a key it
//! answers in demo mode with a description of the agent.  Failures never
//! escape [`AgentRunner::run`]; they are rendered into the reply text.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::chat::TranscriptMessage;
use crate::config::ProviderConfig;
use crate::models::{self, ChatMessage, GroqProvider, ModelProvider, ProviderResponse};
use crate::store::AgentRecord;
use crate::tools::{self, ToolKind};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";
pub const SUMMARIZE_INSTRUCTION: &str =
    "When asked to summarize, provide concise summaries of key points.";
pub const EMPTY_REPLY: &str =
    "I apologize, but I couldn't generate a response. Please try again.";

/// Short pseudo-random id for tool calls the API returned without one.
fn synthetic_call_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("call_{nanos:016x}")
}

pub struct AgentRunner {
    name: String,
    description: String,
    model: String,
    system_prompt: String,
    tools: Vec<String>,
    workspace: PathBuf,
    max_tool_iterations: usize,
    provider: Option<Box<dyn ModelProvider>>,
}

impl AgentRunner {
    /// Build a runner for `record`.  The provider is only created when
    /// `cfg` carries an API key; otherwise the runner stays in demo mode.
    pub fn new(record: &AgentRecord, cfg: &ProviderConfig, workspace: impl Into<PathBuf>) -> Self {
        let model = models::resolve_or(&record.model, &cfg.default_model).to_string();
        let provider: Option<Box<dyn ModelProvider>> = if cfg.is_configured() {
            Some(Box::new(GroqProvider::from_config(cfg, &model)))
        } else {
            None
        };
        let system_prompt = if record.prompt.trim().is_empty() {
            DEFAULT_SYSTEM_PROMPT.to_string()
        } else {
            record.prompt.clone()
        };

        Self {
            name: record.name.clone(),
            description: record.description.clone(),
            model,
            system_prompt,
            tools: record.tools.clone(),
            workspace: workspace.into(),
            max_tool_iterations: cfg.max_tool_iterations.max(1),
            provider,
        }
    }

    /// Replace the provider (used to plug in alternative backends).
    pub fn with_provider(mut self, provider: Box<dyn ModelProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn is_live(&self) -> bool {
        self.provider.is_some()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn has_tool(&self, kind: &ToolKind) -> bool {
        self.tools.iter().any(|t| ToolKind::from_id(t) == *kind)
    }

    fn tools_display(&self) -> String {
        if self.tools.is_empty() {
            "None".to_string()
        } else {
            self.tools.join(", ")
        }
    }

    /// System message content: the agent prompt plus tool-specific
    /// instructions.
    pub fn instructions(&self) -> String {
        let mut out = self.system_prompt.clone();
        if self.has_tool(&ToolKind::Summarize) {
            out.push_str("\n\n");
            out.push_str(SUMMARIZE_INSTRUCTION);
        }
        out
    }

    /// Markdown summary of the agent.
    pub fn info(&self) -> String {
        format!(
            "**{name}**\n\n{desc}\n\n**Model**: {model}\n**Tools**: {tools}\n**Provider**: GroqCloud\n\n**System Instructions:**\n{prompt}\n",
            name = self.name,
            desc = self.description,
            model = self.model,
            tools = self.tools_display(),
            prompt = self.system_prompt,
        )
    }

    /// Reply used when no API key is configured.
    pub fn demo_response(&self, user_input: &str) -> String {
        let mut out = format!(
            "🤖 **{name}** (Demo Mode)\n\n\
             **Agent Profile:**\n{desc}\n\n\
             **System Instructions:**\n{prompt}\n\n\
             ---\n\n\
             📝 **Your message:**\n> {input}\n\n\
             ---\n\n\
             ⚠️ **Demo Mode Active - No Real AI Response**\n\n\
             To get actual AI responses powered by GroqCloud:\n\n\
             1. **Get API Key**: Visit [console.groq.com](https://console.groq.com)\n\
             2. **Set API Key**: export `GROQ_API_KEY=your_key_here` or set `provider.api_key` in config.yaml\n\
             3. **Restart**: the agent picks up the key on its next run\n\n\
             **Current Configuration:**\n\
             - **Model**: {model}\n\
             - **Tools**: {tools}\n\
             - **Provider**: GroqCloud\n\n\
             ---\n\n\
             ### What This Agent Can Do (With API Key):\n",
            name = self.name,
            desc = self.description,
            prompt = self.system_prompt,
            input = user_input,
            model = self.model,
            tools = self.tools_display(),
        );
        for kind in ToolKind::KNOWN {
            if self.has_tool(&kind) {
                if let Some(line) = kind.capability_line() {
                    out.push('\n');
                    out.push_str(line);
                }
            }
        }
        out.push_str(
            "\n\n*This is a simulated response. With a real API key, the agent would provide an intelligent, context-aware answer to your query.*",
        );
        out
    }

    /// Answer `user_input` given the prior conversation.
    pub async fn run(&self, user_input: &str, history: &[TranscriptMessage]) -> String {
        let Some(provider) = self.provider.as_deref() else {
            debug!(agent = %self.name, "no api key, replying in demo mode");
            return self.demo_response(user_input);
        };

        info!(agent = %self.name, model = %self.model, "running agent");
        match self.run_live(provider, user_input, history).await {
            Ok(text) if text.trim().is_empty() => EMPTY_REPLY.to_string(),
            Ok(text) => text,
            Err(e) => {
                warn!(agent = %self.name, error = %e, "agent run failed");
                error_reply(&e)
            }
        }
    }

    async fn run_live(
        &self,
        provider: &dyn ModelProvider,
        user_input: &str,
        history: &[TranscriptMessage],
    ) -> anyhow::Result<String> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::new("system", self.instructions()));
        messages.extend(
            history
                .iter()
                .map(|m| ChatMessage::new(m.role.as_str(), m.content.clone())),
        );
        messages.push(ChatMessage::new("user", user_input));

        let function_defs = tools::function_definitions(&self.tools);
        if function_defs.is_empty() {
            return provider.send_chat(&messages).await;
        }

        let mut response = provider.send_chat_with_tools(&messages, &function_defs).await?;
        for _iter in 0..self.max_tool_iterations {
            let calls = match response {
                ProviderResponse::Final(text) => return Ok(text),
                ProviderResponse::FunctionCalls(calls) => calls,
            };

            let entries: Vec<(String, String, String)> = calls
                .into_iter()
                .map(|c| {
                    let id = if c.id.is_empty() { synthetic_call_id() } else { c.id };
                    (id, c.name, c.arguments)
                })
                .collect();

            messages.push(ChatMessage {
                role: "assistant".into(),
                content: String::new(),
                tool_calls: Some(
                    entries
                        .iter()
                        .map(|(id, name, args)| {
                            serde_json::json!({
                                "id": id,
                                "type": "function",
                                "function": { "name": name, "arguments": args }
                            })
                        })
                        .collect(),
                ),
                tool_call_id: None,
            });

            for (id, name, args) in entries {
                debug!(
                    agent = %self.name,
                    tool = %name,
                    args = %crate::utils::truncate_str(&args, 200),
                    "tool call"
                );
                let result = match tools::call_tool(&name, &args, &self.workspace).await {
                    Ok(text) => text,
                    Err(e) => format!("Error: {e}"),
                };
                messages.push(ChatMessage {
                    role: "tool".into(),
                    content: result,
                    tool_calls: None,
                    tool_call_id: Some(id),
                });
            }

            response = provider.send_chat_with_tools(&messages, &function_defs).await?;
        }

        match response {
            ProviderResponse::Final(text) => Ok(text),
            ProviderResponse::FunctionCalls(_) => {
                debug!(agent = %self.name, "tool budget exhausted, requesting plain answer");
                provider.send_chat(&messages).await
            }
        }
    }
}

/// Render a provider failure as reply text.
pub fn error_reply(err: &anyhow::Error) -> String {
    let msg = format!("{err:#}");
    let lower = msg.to_lowercase();
    let auth = ["api_key", "api key", "authentication", "401"]
        .iter()
        .any(|needle| lower.contains(needle));
    if auth {
        format!("❌ **API Key Error**\n\nPlease check your GroqCloud API key.\n\nError: {msg}")
    } else {
        format!("❌ **Error**: {msg}\n\n💡 Make sure your GROQ_API_KEY is valid.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FunctionCallItem;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Provider that replays scripted responses and records what it saw.
    #[derive(Default)]
    struct Scripted {
        replies: Mutex<VecDeque<anyhow::Result<ProviderResponse>>>,
        seen: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl Scripted {
        fn new(replies: Vec<anyhow::Result<ProviderResponse>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                seen: Arc::default(),
            }
        }

        fn next(&self, messages: &[ChatMessage]) -> anyhow::Result<ProviderResponse> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ProviderResponse::Final("fallback".into())))
        }
    }

    #[async_trait]
    impl ModelProvider for Scripted {
        async fn send_chat(&self, messages: &[ChatMessage]) -> anyhow::Result<String> {
            match self.next(messages)? {
                ProviderResponse::Final(t) => Ok(t),
                ProviderResponse::FunctionCalls(_) => Ok("plain".into()),
            }
        }

        async fn send_chat_with_tools(
            &self,
            messages: &[ChatMessage],
            _tools: &[serde_json::Value],
        ) -> anyhow::Result<ProviderResponse> {
            self.next(messages)
        }
    }

    fn record(tools: &[&str]) -> AgentRecord {
        AgentRecord {
            id: "agent_001".into(),
            name: "Helper".into(),
            author: "Tester".into(),
            description: "Helps out".into(),
            model: "not-a-model".into(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            prompt: String::new(),
            created_at: "2024-01-01".into(),
        }
    }

    fn no_key() -> ProviderConfig {
        ProviderConfig {
            api_key: String::new(),
            ..Default::default()
        }
    }

    fn calc_call(expr: &str) -> ProviderResponse {
        ProviderResponse::FunctionCalls(vec![FunctionCallItem {
            id: String::new(),
            name: tools::CALCULATOR_FN.into(),
            arguments: serde_json::json!({ "expression": expr }).to_string(),
        }])
    }

    #[test]
    fn defaults_for_blank_prompt_and_unknown_model() {
        let r = AgentRunner::new(&record(&[]), &no_key(), "ws");
        assert_eq!(r.model(), crate::models::DEFAULT_MODEL);
        assert_eq!(r.instructions(), DEFAULT_SYSTEM_PROMPT);
        assert!(!r.is_live());
    }

    #[test]
    fn summarize_adds_instruction() {
        let r = AgentRunner::new(&record(&["SummarizeTool"]), &no_key(), "ws");
        assert!(r.instructions().ends_with(SUMMARIZE_INSTRUCTION));
    }

    #[tokio::test]
    async fn demo_mode_lists_known_capabilities() {
        let r = AgentRunner::new(&record(&["MathTool", "Bogus", "WebSearchTool"]), &no_key(), "ws");
        let reply = r.run("hello there", &[]).await;
        assert!(reply.contains("**Helper** (Demo Mode)"));
        assert!(reply.contains("> hello there"));
        assert!(reply.contains("MathTool, Bogus, WebSearchTool"));
        let search = reply.find("**Web Search**").unwrap();
        let calc = reply.find("**Calculator**").unwrap();
        assert!(search < calc, "capabilities follow catalogue order");
    }

    #[test]
    fn info_mentions_model_and_tools() {
        let r = AgentRunner::new(&record(&[]), &no_key(), "ws");
        let info = r.info();
        assert!(info.starts_with("**Helper**"));
        assert!(info.contains("**Tools**: None"));
    }

    #[tokio::test]
    async fn plain_chat_without_callable_tools() {
        let provider = Scripted::new(vec![Ok(ProviderResponse::Final("hi!".into()))]);
        let seen = provider.seen.clone();
        let r = AgentRunner::new(&record(&["WebSearchTool"]), &no_key(), "ws")
            .with_provider(Box::new(provider));
        let history = vec![
            TranscriptMessage::user("earlier"),
            TranscriptMessage::assistant("reply"),
        ];
        assert_eq!(r.run("now", &history).await, "hi!");

        let sent = &seen.lock().unwrap()[0];
        let roles: Vec<&str> = sent.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(sent[3].content, "now");
    }

    #[tokio::test]
    async fn tool_loop_feeds_results_back() {
        let provider = Scripted::new(vec![
            Ok(calc_call("6*7")),
            Ok(ProviderResponse::Final("The answer is 42.".into())),
        ]);
        let seen = provider.seen.clone();
        let ws = TempDir::new().unwrap();
        let r = AgentRunner::new(&record(&["MathTool"]), &no_key(), ws.path())
            .with_provider(Box::new(provider));

        assert_eq!(r.run("what is 6*7?", &[]).await, "The answer is 42.");

        let second = &seen.lock().unwrap()[1];
        let tool_msg = second.last().unwrap();
        assert_eq!(tool_msg.role, "tool");
        assert_eq!(tool_msg.content, "🧮 Result: 6*7 = 42");
        let assistant = &second[second.len() - 2];
        let call_id = assistant.tool_calls.as_ref().unwrap()[0]["id"].as_str().unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some(call_id));
    }

    #[tokio::test]
    async fn tool_loop_is_bounded() {
        let provider = Scripted::new(vec![
            Ok(calc_call("1+1")),
            Ok(calc_call("1+1")),
            Ok(calc_call("1+1")),
            Ok(ProviderResponse::Final("done".into())),
        ]);
        let seen = provider.seen.clone();
        let cfg = ProviderConfig {
            max_tool_iterations: 2,
            ..no_key()
        };
        let ws = TempDir::new().unwrap();
        let r = AgentRunner::new(&record(&["MathTool"]), &cfg, ws.path())
            .with_provider(Box::new(provider));

        // Two tool rounds, then one plain request.
        assert_eq!(r.run("loop", &[]).await, "done");
        assert_eq!(seen.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn empty_reply_becomes_apology() {
        let provider = Scripted::new(vec![Ok(ProviderResponse::Final("  ".into()))]);
        let r = AgentRunner::new(&record(&[]), &no_key(), "ws").with_provider(Box::new(provider));
        assert_eq!(r.run("hi", &[]).await, EMPTY_REPLY);
    }

    #[tokio::test]
    async fn errors_become_reply_text() {
        let provider = Scripted::new(vec![Err(anyhow::anyhow!(
            "authentication failed (invalid api_key?): 401"
        ))]);
        let r = AgentRunner::new(&record(&[]), &no_key(), "ws").with_provider(Box::new(provider));
        assert!(r.run("hi", &[]).await.contains("**API Key Error**"));

        let provider = Scripted::new(vec![Err(anyhow::anyhow!("connection refused"))]);
        let r = AgentRunner::new(&record(&[]), &no_key(), "ws").with_provider(Box::new(provider));
        let reply = r.run("hi", &[]).await;
        assert!(reply.starts_with("❌ **Error**: connection refused"));
    }
}
