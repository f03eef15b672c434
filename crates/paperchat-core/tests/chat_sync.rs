//! Chat synchronizer behavior against a mock backend.

use std::sync::Arc;

use paperchat_core::chat::NO_DOCUMENT_SELECTED;
use paperchat_core::{
    ApiClient, ChatRole, ChatSynchronizer, DocumentScope, ExchangeOutcome, MemoryTokenStore, Submission,
};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "meta-llama/llama-3-8b-instruct";

fn unhydrated(server: &MockServer) -> ChatSynchronizer {
    let api = ApiClient::new(&server.uri(), Arc::new(MemoryTokenStore::with_token("tok")));
    ChatSynchronizer::new(api.chat())
}

/// Synchronizer for an account with no stored history.
fn synchronizer(server: &MockServer) -> ChatSynchronizer {
    let mut chat = unhydrated(server);
    chat.skip_hydration();
    chat
}

async fn mount_history(server: &MockServer, history: Value) {
    Mock::given(method("GET"))
        .and(path("/qa/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "history": history })))
        .mount(server)
        .await;
}

async fn mount_history_sink(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/qa/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "saved"})))
        .mount(server)
        .await;
}

/// Bodies of every `POST /qa/history`, oldest first.
async fn saved_histories(server: &MockServer) -> Vec<Vec<Value>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == "POST" && r.url.path() == "/qa/history")
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            body["messages"].as_array().cloned().unwrap_or_default()
        })
        .collect()
}

#[tokio::test]
async fn test_all_documents_scope_is_rejected_locally() {
    let server = MockServer::start().await;
    mount_history_sink(&server).await;
    Mock::given(method("POST"))
        .and(path("/qa/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let mut chat = synchronizer(&server);
    let submission = chat.begin_submit("Summarize everything", &DocumentScope::All, MODEL, "concise");
    assert!(matches!(submission, Submission::Rejected));

    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, ChatRole::User);
    assert_eq!(messages[0].content, "Summarize everything");
    assert_eq!(messages[1].role, ChatRole::Assistant);
    assert_eq!(messages[1].content, NO_DOCUMENT_SELECTED);
    assert!(!chat.is_pending());

    chat.flush().await;
    let saved = saved_histories(&server).await;
    assert_eq!(saved.last().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_successful_exchange_appends_reply_and_persists() {
    let server = MockServer::start().await;
    mount_history_sink(&server).await;
    Mock::given(method("POST"))
        .and(path("/qa/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "It uses self-attention."})))
        .expect(1)
        .mount(&server)
        .await;

    let mut chat = synchronizer(&server);
    chat.submit("How does it work?", &DocumentScope::Document("4".into()), MODEL, "technical")
        .await;

    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].document_id.as_deref(), Some("4"));
    assert_eq!(messages[1].content, "It uses self-attention.");
    assert_eq!(messages[1].model_id.as_deref(), Some(MODEL));
    assert_eq!(chat.question_count(), 1);

    chat.flush().await;
    let saved = saved_histories(&server).await;
    // One save for the question, one for the reply; last write has both.
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[1][0]["type"], "user");
    assert_eq!(saved[1][1]["type"], "assistant");
    assert_eq!(saved[1][1]["content"], "It uses self-attention.");
}

#[tokio::test]
async fn test_exchanges_alternate_in_submission_order() {
    let server = MockServer::start().await;
    mount_history_sink(&server).await;
    let exchanges = [
        ("What dataset was used?", "ImageNet."),
        ("How many parameters?", "About 60 million."),
        ("What is the baseline?", "A plain ResNet."),
        ("Is the code public?", "Yes, on GitHub."),
    ];
    for (question, answer) in exchanges {
        Mock::given(method("POST"))
            .and(path("/qa/ask"))
            .and(body_partial_json(json!({ "question": question })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": answer })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut chat = synchronizer(&server);
    let scope = DocumentScope::Document("3".into());
    for (question, _) in exchanges {
        chat.submit(question, &scope, MODEL, "concise").await;
    }

    let messages = chat.messages();
    assert_eq!(messages.len(), 2 * exchanges.len());
    for (i, (question, answer)) in exchanges.iter().enumerate() {
        assert_eq!(messages[2 * i].role, ChatRole::User);
        assert_eq!(messages[2 * i].content, *question);
        assert_eq!(messages[2 * i + 1].role, ChatRole::Assistant);
        assert_eq!(messages[2 * i + 1].content, *answer);
    }
    assert_eq!(chat.question_count(), exchanges.len());

    chat.flush().await;
    let saved = saved_histories(&server).await;
    let last = saved.last().expect("history was saved");
    let saved_contents: Vec<&str> = last.iter().filter_map(|m| m["content"].as_str()).collect();
    let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(saved_contents, contents);
}

#[tokio::test]
async fn test_backend_failure_becomes_assistant_entry() {
    let server = MockServer::start().await;
    mount_history_sink(&server).await;
    Mock::given(method("POST"))
        .and(path("/qa/ask"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "LLM provider unavailable"})))
        .mount(&server)
        .await;

    let mut chat = synchronizer(&server);
    chat.submit("Anything?", &DocumentScope::Document("1".into()), MODEL, "casual")
        .await;

    let messages = chat.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].role, ChatRole::Assistant);
    assert_eq!(messages[1].content, "LLM provider unavailable");
    assert!(messages[1].model_id.is_none());
}

#[tokio::test]
async fn test_blank_and_double_submissions_are_ignored() {
    let server = MockServer::start().await;
    mount_history_sink(&server).await;

    let mut chat = synchronizer(&server);
    let scope = DocumentScope::Document("1".into());
    assert!(matches!(chat.begin_submit("   ", &scope, MODEL, "concise"), Submission::Ignored));
    assert!(chat.messages().is_empty());

    let first = chat.begin_submit("first", &scope, MODEL, "concise");
    assert!(matches!(first, Submission::Pending(_)));
    assert!(matches!(chat.begin_submit("second", &scope, MODEL, "concise"), Submission::Ignored));
    assert_eq!(chat.messages().len(), 1);
}

#[tokio::test]
async fn test_stale_and_cancelled_replies_are_discarded() {
    let server = MockServer::start().await;
    mount_history_sink(&server).await;
    Mock::given(method("POST"))
        .and(path("/qa/ask"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "fresh answer"})))
        .mount(&server)
        .await;

    let mut chat = synchronizer(&server);
    let scope = DocumentScope::Document("2".into());

    let Submission::Pending(first) = chat.begin_submit("old question", &scope, MODEL, "concise") else {
        panic!("expected a pending exchange");
    };
    let old_epoch = first.epoch();

    // Leaving the view cancels the in-flight request.
    chat.cancel_pending();
    let cancelled = first.send().await;
    assert!(cancelled.result.as_ref().unwrap_err().is_cancelled());
    assert!(!chat.complete(cancelled));

    let Submission::Pending(second) = chat.begin_submit("new question", &scope, MODEL, "concise") else {
        panic!("expected a pending exchange");
    };

    // A late success for the superseded epoch is dropped too.
    let late = ExchangeOutcome {
        epoch: old_epoch,
        model: MODEL.to_string(),
        result: Ok("late answer".to_string()),
    };
    assert!(!chat.complete(late));

    let outcome = second.send().await;
    assert!(chat.complete(outcome));

    let contents: Vec<&str> = chat.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["old question", "new question", "fresh answer"]);
}

#[tokio::test]
async fn test_hydrate_normalizes_timestamps() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/qa/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "history": [
                {"id": "1", "type": "user", "content": "Q", "timestamp": "2024-05-06T07:08:09"},
                {"id": "2", "type": "assistant", "content": "A", "timestamp": "2024-05-06T09:08:09+02:00", "model": MODEL},
                {"id": "3", "type": "assistant", "content": "no time"},
                {"unexpected": true}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut chat = synchronizer(&server);
    let count = chat.hydrate().await.unwrap();
    assert_eq!(count, 3);

    let messages = chat.messages();
    assert_eq!(messages[0].timestamp, "2024-05-06T07:08:09.000Z");
    assert_eq!(messages[1].timestamp, "2024-05-06T07:08:09.000Z");
    assert!(messages[2].timestamp.ends_with('Z'));
    assert_eq!(messages[1].model_id.as_deref(), Some(MODEL));
}

#[tokio::test]
async fn test_nothing_is_saved_before_history_is_loaded() {
    let server = MockServer::start().await;
    mount_history_sink(&server).await;
    mount_history(
        &server,
        json!([
            {"id": "1", "type": "user", "content": "old question", "timestamp": "2024-05-06T07:08:09Z"},
            {"id": "2", "type": "assistant", "content": "old answer", "timestamp": "2024-05-06T07:08:10Z"}
        ]),
    )
    .await;

    let mut chat = unhydrated(&server);
    assert!(!chat.is_hydrated());

    // Leaving the chat view while the fetch is in flight cancels it.
    chat.cancel_token().cancel();
    let err = chat.hydrate().await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(!chat.is_hydrated());
    chat.cancel_pending();

    chat.begin_submit("new question", &DocumentScope::All, MODEL, "concise");
    chat.flush().await;
    assert!(saved_histories(&server).await.is_empty());

    assert_eq!(chat.hydrate().await.unwrap(), 4);
    assert!(chat.is_hydrated());
    let contents: Vec<&str> = chat.messages().iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["old question", "old answer", "new question", NO_DOCUMENT_SELECTED]);

    chat.flush().await;
    let saved = saved_histories(&server).await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].len(), 4);
    assert_eq!(saved[0][0]["content"], "old question");
}

#[tokio::test]
async fn test_reset_requires_hydration_again() {
    let server = MockServer::start().await;
    mount_history_sink(&server).await;

    let mut chat = synchronizer(&server);
    assert!(chat.is_hydrated());
    chat.reset();
    assert!(!chat.is_hydrated());

    chat.begin_submit("after logout", &DocumentScope::All, MODEL, "concise");
    chat.flush().await;
    assert!(saved_histories(&server).await.is_empty());
}

#[tokio::test]
async fn test_clear_deletes_history() {
    let server = MockServer::start().await;
    mount_history_sink(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/qa/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"msg": "deleted"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut chat = synchronizer(&server);
    chat.begin_submit("question", &DocumentScope::All, MODEL, "concise");
    assert_eq!(chat.messages().len(), 2);

    chat.clear().await.unwrap();
    assert!(chat.messages().is_empty());
    assert_eq!(chat.question_count(), 0);
    assert!(chat.is_hydrated());

    // Queued saves went out before the delete, so none can restore the log.
    let requests = server.received_requests().await.unwrap_or_default();
    let history_methods: Vec<&str> = requests
        .iter()
        .filter(|r| r.url.path() == "/qa/history")
        .map(|r| r.method.as_str())
        .collect();
    assert_eq!(history_methods, vec!["POST", "POST", "DELETE"]);
}
