//! End-to-end submit flow against a mock server

use ollachat::prelude::*;
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_body(fragments: &[&str]) -> String {
    let mut body: String = fragments
        .iter()
        .map(|content| {
            format!(
                "{}\n",
                json!({"model": "deepseek-r1", "message": {"role": "assistant", "content": content}, "done": false})
            )
        })
        .collect();
    body.push_str(&format!(
        "{}\n",
        json!({"model": "deepseek-r1", "message": {"role": "assistant", "content": ""}, "done": true, "done_reason": "stop"})
    ));
    body
}

async fn mount_title(server: &MockServer, title: &str) {
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "deepseek-r1",
            "response": title,
            "done": true
        })))
        .mount(server)
        .await;
}

fn session_for(server: &MockServer, store: ConversationStore) -> ChatSession<OllamaClient> {
    let config = ClientConfig::builder()
        .base_url(server.uri())
        .build()
        .unwrap();
    ChatSession::from_client(OllamaClient::new(config).unwrap(), store)
}

#[tokio::test]
async fn test_submit_persists_reply_and_title() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "deepseek-r1",
            "stream": true,
            "messages": [{"role": "user", "content": "Why is the sky blue?"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string(chat_body(&[
            "<thi",
            "nk>Blue light scatters more.</th",
            "ink>Because of Rayleigh",
            " scattering.",
        ])))
        .mount(&server)
        .await;
    mount_title(&server, "<think>easy</think> \"Sky Color Physics\"\n").await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("conversations.json");
    let mut session = session_for(&server, ConversationStore::open(&file).unwrap());

    let mut reasoning = Vec::new();
    let outcome = session
        .submit_with("Why is the sky blue?", "deepseek-r1", |event| {
            if event.is_reasoning() {
                reasoning.push(event.text().to_string());
            }
        })
        .await
        .unwrap();

    assert!(outcome.completed);
    assert_eq!(reasoning, vec!["Blue light scatters more."]);
    assert_eq!(outcome.narrative, "Because of Rayleigh scattering.");
    assert_eq!(outcome.title.as_deref(), Some("Sky Color Physics"));

    let reopened = ConversationStore::open(&file).unwrap();
    let conversation = reopened.get(&outcome.conversation_id).unwrap();
    assert_eq!(conversation.title, "Sky Color Physics");
    assert_eq!(
        conversation.messages[1].content,
        "<think>Blue light scatters more.</think>Because of Rayleigh scattering."
    );

    let segments = split_segments(&conversation.messages[1].content);
    assert_eq!(
        segments,
        vec![
            Segment::reasoning("Blue light scatters more."),
            Segment::narrative("Because of Rayleigh scattering."),
        ]
    );
}

#[tokio::test]
async fn test_unknown_model_leaves_empty_assistant_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "model 'nope' not found, try pulling it first"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "model 'nope' not found, try pulling it first"
        })))
        .mount(&server)
        .await;

    let mut session = session_for(&server, ConversationStore::in_memory());
    let err = session.submit("hello", "nope").await.unwrap_err();

    assert!(matches!(err, ChatError::ApiError { code: 404, .. }));
    let conversation = session.store().current().unwrap();
    assert_eq!(conversation.messages.len(), 2);
    assert_eq!(conversation.messages[1].content, "");
    assert_eq!(conversation.title, ollachat::types::DEFAULT_CONVERSATION_TITLE);
}

#[tokio::test]
async fn test_unterminated_reasoning_is_flushed_at_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(chat_body(&["<think>still going"])),
        )
        .mount(&server)
        .await;

    let mut session = session_for(&server, ConversationStore::in_memory())
        .with_title_generation(false);
    let outcome = session.submit("hello", "deepseek-r1").await.unwrap();

    assert_eq!(outcome.reasoning, vec!["still going".to_string()]);
    assert_eq!(outcome.narrative, "");
}

#[tokio::test]
async fn test_cancelled_submit_does_not_wait_for_slow_server() {
    let server = MockServer::start().await;
    for endpoint in ["/api/chat", "/api/generate"] {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(chat_body(&["late"]))
                    .set_delay(Duration::from_secs(30)),
            )
            .mount(&server)
            .await;
    }

    let token = CancellationToken::new();
    token.cancel();
    let mut session =
        session_for(&server, ConversationStore::in_memory()).with_cancellation(token);

    let result = tokio::time::timeout(Duration::from_secs(3), session.submit("hello", "m"))
        .await
        .expect("a cancelled submit returns without waiting on the server");

    assert!(matches!(result, Err(ChatError::Cancelled)));
    let conversation = session.store().current().unwrap();
    assert_eq!(conversation.messages[1].content, "");
}
