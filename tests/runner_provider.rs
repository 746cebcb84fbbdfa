//! Integration test: the agent runner against a wiremock server that
//! speaks the OpenAI-compatible chat completions protocol.

use agent_market::chat::TranscriptMessage;
use agent_market::config::ProviderConfig;
use agent_market::runner::{AgentRunner, EMPTY_REPLY};
use agent_market::store::AgentRecord;
use serde_json::json;
use wiremock::{matchers, Mock, MockServer, ResponseTemplate};

fn provider_cfg(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        endpoint: format!("{}/openai/v1/chat/completions", server.uri()),
        api_key: "test-key".into(),
        ..Default::default()
    }
}

fn tutor() -> AgentRecord {
    AgentRecord {
        id: "agent_001".into(),
        name: "Math Tutor".into(),
        author: "Tester".into(),
        description: "Checks arithmetic".into(),
        model: "llama-3.1-8b-instant".into(),
        tools: vec!["MathTool".into(), "WebSearchTool".into()],
        prompt: "You are a patient math tutor.".into(),
        created_at: "2024-01-01".into(),
    }
}

fn final_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": text } }]
    }))
}

#[tokio::test]
async fn calculator_call_is_executed_and_fed_back() {
    let server = MockServer::start().await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/openai/v1/chat/completions"))
        .and(matchers::header("authorization", "Bearer test-key"))
        .and(matchers::body_string_contains("\"calculator\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "calculator",
                            "arguments": "{\"expression\": \"12 * 12\"}"
                        }
                    }]
                }
            }]
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(matchers::method("POST"))
        .and(matchers::path("/openai/v1/chat/completions"))
        .and(matchers::body_string_contains("12 * 12 = 144"))
        .and(matchers::body_string_contains("\"tool_call_id\":\"call_1\""))
        .respond_with(final_reply("12 × 12 is 144."))
        .expect(1)
        .mount(&server)
        .await;

    let ws = tempfile::tempdir().unwrap();
    let runner = AgentRunner::new(&tutor(), &provider_cfg(&server), ws.path());
    assert!(runner.is_live());
    assert_eq!(runner.model(), "llama-3.1-8b-instant");

    let history = vec![TranscriptMessage::user("hi"), TranscriptMessage::assistant("hello")];
    let reply = runner.run("What is 12 squared?", &history).await;
    assert_eq!(reply, "12 × 12 is 144.");
}

#[tokio::test]
async fn request_carries_model_and_system_prompt() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .and(matchers::body_partial_json(json!({ "model": "llama-3.1-8b-instant" })))
        .and(matchers::body_string_contains("You are a patient math tutor."))
        .respond_with(final_reply("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let runner = AgentRunner::new(&tutor(), &provider_cfg(&server), "ws");
    assert_eq!(runner.run("hello", &[]).await, "ok");
}

#[tokio::test]
async fn unauthorized_becomes_api_key_error() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let runner = AgentRunner::new(&tutor(), &provider_cfg(&server), "ws");
    let reply = runner.run("hello", &[]).await;
    assert!(reply.starts_with("❌ **API Key Error**"), "{reply}");
}

#[tokio::test]
async fn server_error_becomes_generic_error() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let runner = AgentRunner::new(&tutor(), &provider_cfg(&server), "ws");
    let reply = runner.run("hello", &[]).await;
    assert!(reply.starts_with("❌ **Error**"), "{reply}");
    assert!(reply.contains("503"));
}

#[tokio::test]
async fn empty_content_becomes_apology() {
    let server = MockServer::start().await;
    Mock::given(matchers::method("POST"))
        .respond_with(final_reply(""))
        .mount(&server)
        .await;

    let runner = AgentRunner::new(&tutor(), &provider_cfg(&server), "ws");
    assert_eq!(runner.run("hello", &[]).await, EMPTY_REPLY);
}
