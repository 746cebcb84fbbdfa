//! Integration tests for the chat log writer.

use agent_market::chat::{export_text, ChatLogWriter, Role, SavedChat, TranscriptMessage};

#[tokio::test]
async fn saved_chat_round_trips_through_json() {
    let tmp = tempfile::tempdir().unwrap();
    let writer = ChatLogWriter::new(tmp.path().join("data/chats"));

    let messages = vec![
        TranscriptMessage::user("Summarize Rust ownership"),
        TranscriptMessage {
            role: Role::Assistant,
            content: "Each value has one owner.".into(),
            reasoning: Some("short answer requested".into()),
        },
    ];
    let path = writer.save_chat("Research Assistant", &messages).await.unwrap();

    assert_eq!(path.parent().unwrap(), writer.dir());
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("Research_Assistant_"), "{name}");
    assert!(name.ends_with(".json"));

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["agent"], "Research Assistant");
    assert_eq!(raw["messages"][0]["role"], "user");
    assert!(raw["messages"][0].get("reasoning").is_none());
    assert_eq!(raw["messages"][1]["reasoning"], "short answer requested");

    let saved: SavedChat = serde_json::from_value(raw).unwrap();
    assert_eq!(saved.messages, messages);
    assert!(name.contains(&saved.timestamp));
}

#[tokio::test]
async fn each_save_creates_a_new_file() {
    let tmp = tempfile::tempdir().unwrap();
    let writer = ChatLogWriter::new(tmp.path());
    let msgs = vec![TranscriptMessage::user("hi")];

    let first = writer.save_chat("Bot", &msgs).await.unwrap();
    let second = writer.save_chat("Bot", &msgs).await.unwrap();
    assert_ne!(first, second);
    assert!(first.exists() && second.exists());
}

#[test]
fn export_text_renders_role_blocks() {
    let text = export_text(&[
        TranscriptMessage::user("a"),
        TranscriptMessage::assistant("b"),
    ]);
    assert_eq!(text, "USER:\na\n\nASSISTANT:\nb\n");
}
