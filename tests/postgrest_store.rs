//! Wire-level tests for the PostgREST store backend

use serde_json::{json, Value};

use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chatbook::config::PostgrestConfig;
use chatbook::storage::{PostgrestStore, Sender, SessionStore, UserStore};
use chatbook::ChatbookError;

fn store_for(server: &MockServer) -> PostgrestStore {
    PostgrestStore::new(PostgrestConfig {
        url: Some(server.uri()),
        api_key: Some("anon-key".to_string()),
        timeout_seconds: 5,
    })
    .unwrap()
}

fn session_row(id: &str, name: &str, updated_at: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "created_at": "2024-05-01T10:00:00+00:00",
        "updated_at": updated_at
    })
}

fn message_row(id: &str, session_id: &str, text: &str, sender: &str) -> Value {
    json!({
        "id": id,
        "session_id": session_id,
        "message": text,
        "sender": sender,
        "created_at": "2024-05-01T10:05:00.123456+00:00"
    })
}

#[tokio::test]
async fn test_list_sessions_orders_by_updated_at() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/chat_sessions"))
        .and(query_param("order", "updated_at.desc"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            session_row("b", "Newer", "2024-05-02T10:00:00+00:00"),
            session_row("a", "Older", "2024-05-01T10:00:00+00:00"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = store_for(&server).list_sessions().await.unwrap();
    let names: Vec<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Newer", "Older"]);
}

#[tokio::test]
async fn test_create_session_returns_representation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/chat_sessions"))
        .and(header("prefer", "return=representation"))
        .and(body_json(json!([{ "name": "New Chat" }])))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([session_row(
            "s-1",
            "New Chat",
            "2024-05-01T10:00:00+00:00"
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let session = store_for(&server).create_session("New Chat").await.unwrap();
    assert_eq!(session.id, "s-1");
    assert_eq!(session.name, "New Chat");
}

#[tokio::test]
async fn test_rename_missing_session_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/chat_sessions"))
        .and(query_param("id", "eq.missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = store_for(&server)
        .rename_session("missing", "Name")
        .await
        .unwrap_err();
    assert!(ChatbookError::is_not_found(&err));
}

#[tokio::test]
async fn test_delete_session_removes_messages_first() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/messages"))
        .and(query_param("session_id", "eq.s-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/rest/v1/chat_sessions"))
        .and(query_param("id", "eq.s-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store_for(&server).delete_session("s-1").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url.path(), "/rest/v1/messages");
    assert_eq!(requests[1].url.path(), "/rest/v1/chat_sessions");
}

#[tokio::test]
async fn test_list_messages_filters_and_orders() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/messages"))
        .and(query_param("session_id", "eq.s-1"))
        .and(query_param("order", "created_at.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            message_row("m-1", "s-1", "hi", "user"),
            message_row("m-2", "s-1", "hello", "bot"),
        ])))
        .mount(&server)
        .await;

    let messages = store_for(&server).list_messages("s-1").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].sender, Sender::User);
    assert_eq!(messages[1].sender, Sender::Bot);
}

#[tokio::test]
async fn test_append_message_touches_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/messages"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([message_row("m-1", "s-1", "hi", "user")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/chat_sessions"))
        .and(query_param("id", "eq.s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([session_row(
            "s-1",
            "Chat",
            "2024-05-01T10:05:00+00:00"
        )])))
        .expect(1)
        .mount(&server)
        .await;

    let message = store_for(&server)
        .append_message("s-1", "hi", Sender::User)
        .await
        .unwrap();
    assert_eq!(message.id, "m-1");
    assert_eq!(message.message, "hi");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body[0]["session_id"], "s-1");
    assert_eq!(body[0]["sender"], "user");
}

#[tokio::test]
async fn test_append_message_survives_failed_touch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/messages"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!([message_row("m-9", "s-1", "reply", "bot")])),
        )
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/chat_sessions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let message = store_for(&server)
        .append_message("s-1", "reply", Sender::Bot)
        .await
        .unwrap();
    assert_eq!(message.id, "m-9");
}

#[tokio::test]
async fn test_append_to_missing_session_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/messages"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23503",
            "message": "insert or update on table \"messages\" violates foreign key constraint"
        })))
        .mount(&server)
        .await;

    let err = store_for(&server)
        .append_message("gone", "hi", Sender::User)
        .await
        .unwrap_err();
    assert!(ChatbookError::is_not_found(&err));
}

#[tokio::test]
async fn test_error_body_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/chat_sessions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "PGRST301",
            "message": "JWT expired"
        })))
        .mount(&server)
        .await;

    let err = store_for(&server).list_sessions().await.unwrap_err();
    assert!(!ChatbookError::is_not_found(&err));
    assert!(err.to_string().contains("JWT expired"));
}

#[tokio::test]
async fn test_find_user_by_username() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("username", "eq.ada"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "u-1",
            "username": "ada",
            "password_hash": "$2b$04$abcdefghijklmnopqrstuuJ8dn5n0mAgUpFOm3wYGVvRY3h7J5iSu"
        }])))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .and(query_param("username", "eq.nobody"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let user = store.find_user("ada").await.unwrap().unwrap();
    assert_eq!(user.id, "u-1");
    assert!(store.find_user("nobody").await.unwrap().is_none());
}
