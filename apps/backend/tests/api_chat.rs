//! Coach chat transcript API tests.

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use uuid::Uuid;

use common::TestContext;

fn chat_url(user_id: Uuid) -> String {
    format!("/api/users/{}/chat-messages", user_id)
}

async fn say(server: &TestServer, user_id: Uuid, body: Value) -> Value {
    let response = server.post(&chat_url(user_id)).json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json()
}

/// Test appended messages come back oldest first.
#[tokio::test]
async fn test_chat_roundtrip() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let user_id = ctx.create_user(&server).await;

    let question = say(
        &server,
        user_id,
        json!({ "role": "user", "content": "  Why not thrombolysis?  ", "related_case_id": "card-1" }),
    )
    .await;
    assert_eq!(question["content"], "Why not thrombolysis?");
    assert_eq!(question["model_used"], "unspecified");

    say(
        &server,
        user_id,
        json!({
            "role": "assistant",
            "content": "PCI is available within 120 minutes.",
            "model_used": "gpt-4o-mini",
            "token_count": 42
        }),
    )
    .await;

    let response = server.get(&chat_url(user_id)).await;
    response.assert_status_ok();
    let messages: Vec<Value> = response.json();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["related_case_id"], "card-1");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["token_count"], 42);
}

/// Test the limit keeps the newest messages and the session filter applies.
#[tokio::test]
async fn test_chat_limit_and_session() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let user_id = ctx.create_user(&server).await;
    let session_id = Uuid::new_v4();

    say(&server, user_id, json!({ "role": "user", "content": "first" })).await;
    say(
        &server,
        user_id,
        json!({ "role": "user", "content": "second", "session_id": session_id }),
    )
    .await;
    say(
        &server,
        user_id,
        json!({ "role": "assistant", "content": "third", "session_id": session_id }),
    )
    .await;

    let latest: Vec<Value> = server
        .get(&chat_url(user_id))
        .add_query_param("limit", 2)
        .await
        .json();
    let contents: Vec<&str> = latest.iter().map(|m| m["content"].as_str().unwrap()).collect();
    assert_eq!(contents, vec!["second", "third"]);

    let session: Vec<Value> = server
        .get(&chat_url(user_id))
        .add_query_param("session_id", session_id)
        .await
        .json();
    assert_eq!(session.len(), 2);
    assert!(session.iter().all(|m| m["session_id"] == session_id.to_string()));
}

/// Test blank content is rejected.
#[tokio::test]
async fn test_chat_blank_content() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let user_id = ctx.create_user(&server).await;

    let response = server
        .post(&chat_url(user_id))
        .json(&json!({ "role": "user", "content": "   " }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"], "bad_request");
}

/// Test a message about an unknown case.
#[tokio::test]
async fn test_chat_unknown_case() {
    let ctx = TestContext::new().await;
    let server = ctx.server();
    let user_id = ctx.create_user(&server).await;

    let response = server
        .post(&chat_url(user_id))
        .json(&json!({ "role": "user", "content": "hi", "related_case_id": "missing" }))
        .await;

    response.assert_status_not_found();
}

/// Test chat for an unknown user.
#[tokio::test]
async fn test_chat_unknown_user() {
    let ctx = TestContext::new().await;
    let server = ctx.server();

    server
        .get(&chat_url(Uuid::new_v4()))
        .await
        .assert_status_not_found();
    server
        .post(&chat_url(Uuid::new_v4()))
        .json(&json!({ "role": "user", "content": "hi" }))
        .await
        .assert_status_not_found();
}

/// Test the transcript against PostgreSQL.
#[tokio::test]
#[ignore = "requires database"]
async fn test_chat_postgres() {
    let ctx = TestContext::postgres().await;
    let server = ctx.server();
    let user_id = ctx.create_user(&server).await;

    say(&server, user_id, json!({ "role": "user", "content": "one" })).await;
    say(&server, user_id, json!({ "role": "assistant", "content": "two" })).await;

    let messages: Vec<Value> = server.get(&chat_url(user_id)).await.json();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["content"], "two");
}
