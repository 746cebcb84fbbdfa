//! Integration tests for the HTTP API, run against a live gateway bound
//! to a free local port with storage in a temp dir and no API key.

use std::net::SocketAddr;

use agent_market::config::Config;
use agent_market::gateway::{start_gateway_with_config, Gateway};
use serde_json::{json, Value};
use tempfile::TempDir;

/// Find a free port by binding to :0 and reading the assigned address.
async fn free_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn start(tmp: &TempDir) -> Gateway {
    let mut cfg = Config::default();
    cfg.storage.data_dir = tmp.path().join("data").to_string_lossy().into_owned();
    cfg.provider.api_key = String::new();
    start_gateway_with_config(free_addr().await, &cfg).await.unwrap()
}

fn url(gw: &Gateway, path: &str) -> String {
    format!("http://{}/api{path}", gw.addr)
}

fn draft(name: &str, author: &str, tools: &[&str]) -> Value {
    json!({
        "name": name,
        "author": author,
        "description": format!("{name} description"),
        "model": "llama-3.1-8b-instant",
        "tools": tools,
        "prompt": "Be brief.",
    })
}

async fn create(client: &reqwest::Client, gw: &Gateway, body: Value) -> Value {
    let resp = client.post(url(gw, "/agents")).json(&body).send().await.unwrap();
    assert_eq!(resp.status(), 201);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn status_and_health() {
    let tmp = TempDir::new().unwrap();
    let gw = start(&tmp).await;

    let body: Value = reqwest::get(url(&gw, "/status")).await.unwrap().json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let body: Value = reqwest::get(url(&gw, "/health")).await.unwrap().json().await.unwrap();
    assert_eq!(body["agents"], 0);
    assert_eq!(body["provider_configured"], false);

    gw.handle.abort();
}

#[tokio::test]
async fn agent_crud_round_trip() {
    let tmp = TempDir::new().unwrap();
    let gw = start(&tmp).await;
    let client = reqwest::Client::new();

    let a = create(&client, &gw, draft("Alpha", "Ann", &["MathTool"])).await;
    let b = create(&client, &gw, draft("Beta", "Ben", &[])).await;
    assert_eq!(a["id"], "agent_001");
    assert_eq!(b["id"], "agent_002");

    let got: Value = reqwest::get(url(&gw, "/agents/agent_001")).await.unwrap().json().await.unwrap();
    assert_eq!(got["name"], "Alpha");

    let mut edited = got.clone();
    edited["name"] = json!("Alpha Prime");
    edited["created_at"] = json!("1970-01-01");
    let resp = client.put(url(&gw, "/agents/agent_001")).json(&edited).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["name"], "Alpha Prime");
    assert_eq!(updated["created_at"], got["created_at"]);

    let resp = client.delete(url(&gw, "/agents/agent_001")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let resp = client.delete(url(&gw, "/agents/agent_001")).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let list: Value = reqwest::get(url(&gw, "/agents")).await.unwrap().json().await.unwrap();
    let agents = list["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0]["id"], "agent_002");

    gw.handle.abort();
}

#[tokio::test]
async fn create_rejects_missing_fields() {
    let tmp = TempDir::new().unwrap();
    let gw = start(&tmp).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(url(&gw, "/agents"))
        .json(&json!({ "name": "Nameless", "prompt": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["missing"], json!(["author", "description", "model", "prompt"]));

    let resp = client
        .put(url(&gw, "/agents/agent_001"))
        .json(&draft("Ghost", "Ann", &[]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    gw.handle.abort();
}

#[tokio::test]
async fn list_supports_query_filters_and_sort() {
    let tmp = TempDir::new().unwrap();
    let gw = start(&tmp).await;
    let client = reqwest::Client::new();
    create(&client, &gw, draft("Zed", "Ann", &["MathTool"])).await;
    create(&client, &gw, draft("Amy", "Bob", &["WebSearchTool"])).await;
    create(&client, &gw, draft("Max", "Ann", &["FileOpsTool"])).await;

    let names = |v: &Value| -> Vec<String> {
        v["agents"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["name"].as_str().unwrap().to_string())
            .collect()
    };

    let v: Value = reqwest::get(url(&gw, "/agents?q=zed")).await.unwrap().json().await.unwrap();
    assert_eq!(names(&v), ["Zed"]);

    let v: Value = reqwest::get(url(&gw, "/agents?author=Ann&sort=name"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names(&v), ["Max", "Zed"]);

    let v: Value = reqwest::get(url(&gw, "/agents?tools=WebSearchTool,FileOpsTool"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(names(&v), ["Amy", "Max"]);

    let resp = reqwest::get(url(&gw, "/agents?sort=sideways")).await.unwrap();
    assert_eq!(resp.status(), 400);

    let v: Value = reqwest::get(url(&gw, "/authors")).await.unwrap().json().await.unwrap();
    assert_eq!(v["authors"], json!(["Ann", "Bob"]));

    let v: Value = reqwest::get(url(&gw, "/stats")).await.unwrap().json().await.unwrap();
    assert_eq!(v["total"], 3);

    let v: Value = reqwest::get(url(&gw, "/agents/by-name/Amy")).await.unwrap().json().await.unwrap();
    assert_eq!(v["author"], "Bob");

    let v: Value = reqwest::get(url(&gw, "/agents/agent_001/clone")).await.unwrap().json().await.unwrap();
    assert_eq!(v["name"], "Zed");
    assert!(v.get("id").is_none());

    gw.handle.abort();
}

#[tokio::test]
async fn chat_in_demo_mode_and_save() {
    let tmp = TempDir::new().unwrap();
    let gw = start(&tmp).await;
    let client = reqwest::Client::new();
    create(&client, &gw, draft("Tutor", "Ann", &["MathTool"])).await;

    let resp = client
        .post(url(&gw, "/agents/agent_001/chat"))
        .json(&json!({ "message": "What is 2+2?", "history": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["demo"], true);
    let reply = body["reply"].as_str().unwrap();
    assert!(reply.contains("Demo Mode"));
    assert!(reply.contains("**Calculator**"));

    let resp = client
        .post(url(&gw, "/agents/agent_404/chat"))
        .json(&json!({ "message": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .post(url(&gw, "/chats"))
        .json(&json!({
            "agent": "Tutor",
            "messages": [
                { "role": "user", "content": "What is 2+2?" },
                { "role": "assistant", "content": reply }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let path = std::path::PathBuf::from(body["path"].as_str().unwrap());
    assert!(path.starts_with(tmp.path().join("data/chats")));
    assert!(path.exists());

    let resp = client
        .post(url(&gw, "/chats/export"))
        .json(&json!({
            "agent": "Tutor Bot",
            "messages": [
                { "role": "user", "content": "hi" },
                { "role": "assistant", "content": "hello" }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let disposition = resp.headers()["content-disposition"].to_str().unwrap().to_string();
    assert_eq!(disposition, "attachment; filename=\"Tutor_Bot.txt\"");
    assert_eq!(resp.text().await.unwrap(), "USER:\nhi\n\nASSISTANT:\nhello\n");

    gw.handle.abort();
}

#[tokio::test]
async fn calc_models_and_tools() {
    let tmp = TempDir::new().unwrap();
    let gw = start(&tmp).await;
    let client = reqwest::Client::new();

    let body: Value = client
        .post(url(&gw, "/calc"))
        .json(&json!({ "expression": "2 ** 10" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["result"], "🧮 Result: 2 ** 10 = 1024");
    assert_eq!(body["value"], "1024");

    let body: Value = client
        .post(url(&gw, "/calc"))
        .json(&json!({ "expression": "1/0" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["result"], "❌ Error: Division by zero");
    assert!(body["value"].is_null());

    let body: Value = client
        .post(url(&gw, "/calc"))
        .json(&json!({ "expression": vec!["1"; 50_000].join("+") }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["value"], "50000");

    let body: Value = reqwest::get(url(&gw, "/models")).await.unwrap().json().await.unwrap();
    assert_eq!(body["default"], "llama-3.3-70b-versatile");
    assert_eq!(body["models"].as_array().unwrap().len(), 5);

    let body: Value = reqwest::get(url(&gw, "/tools")).await.unwrap().json().await.unwrap();
    assert_eq!(body["tools"][3]["id"], "MathTool");

    gw.handle.abort();
}
