//! Langfuse ingestion against a mock HTTP server.

use chrono::Utc;
use mockito::Matcher;
use serde_json::json;
use tracegate_core::sink::{FeedbackScore, Metadata, TraceBody, TraceUpdate};
use tracegate_core::{GatewayError, LangfuseConfig, LangfuseSink, TraceSink};

const INGESTION_PATH: &str = "/api/public/ingestion";
// base64("pk-test:sk-test")
const AUTH_HEADER: &str = "Basic cGstdGVzdDpzay10ZXN0";

fn sink_for(server: &mockito::ServerGuard) -> LangfuseSink {
    LangfuseSink::new(LangfuseConfig::new(server.url(), "pk-test", "sk-test")).unwrap()
}

fn trace(id: &str) -> TraceBody {
    TraceBody {
        id: id.to_string(),
        name: "chat-session".to_string(),
        user_id: "alice@example.com".to_string(),
        session_id: "chat-1".to_string(),
        tags: vec!["external-api".to_string()],
        input: Some("hello".to_string()),
        output: None,
        metadata: Metadata::new(),
        timestamp: Utc::now(),
    }
}

#[tokio::test]
async fn test_flush_posts_batch_with_basic_auth() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", INGESTION_PATH)
        .match_header("authorization", AUTH_HEADER)
        .match_header("content-type", "application/json")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""type":"trace-create""#.to_string()),
            Matcher::Regex(r#""type":"score-create""#.to_string()),
            Matcher::Regex(r#""traceId":"trace-1""#.to_string()),
        ]))
        .with_status(207)
        .with_header("content-type", "application/json")
        .with_body(json!({ "successes": [{ "id": "a", "status": 201 }], "errors": [] }).to_string())
        .expect(1)
        .create_async()
        .await;

    let sink = sink_for(&server);
    sink.open_trace(trace("trace-1")).unwrap();
    sink.add_score(FeedbackScore {
        id: "score-1".to_string(),
        trace_id: "trace-1".to_string(),
        name: "user-feedback".to_string(),
        value: 1.0,
        comment: None,
    })
    .unwrap();
    assert_eq!(sink.pending(), 2);

    sink.flush().await.unwrap();

    mock.assert_async().await;
    assert_eq!(sink.pending(), 0);
}

#[tokio::test]
async fn test_trace_update_is_sent_as_upsert() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", INGESTION_PATH)
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""type":"trace-create""#.to_string()),
            Matcher::Regex(r#""id":"trace-9""#.to_string()),
            Matcher::Regex(r#""output":"done""#.to_string()),
        ]))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let sink = sink_for(&server);
    sink.update_trace(
        "trace-9",
        TraceUpdate {
            output: Some("done".to_string()),
            ..TraceUpdate::default()
        },
    )
    .unwrap();
    sink.flush().await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_partial_rejection_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", INGESTION_PATH)
        .with_status(207)
        .with_body(
            json!({
                "successes": [],
                "errors": [{ "id": "evt-1", "status": 400, "message": "invalid body" }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let sink = sink_for(&server);
    sink.open_trace(trace("trace-1")).unwrap();
    let err = sink.flush().await.unwrap_err();

    assert!(matches!(err, GatewayError::Sink(ref msg) if msg.contains("rejected 1 of 1")));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_drops_batch() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", INGESTION_PATH)
        .with_status(500)
        .with_body("boom")
        .expect(1)
        .create_async()
        .await;

    let sink = sink_for(&server);
    sink.open_trace(trace("trace-1")).unwrap();

    let err = sink.flush().await.unwrap_err();
    assert!(matches!(err, GatewayError::Sink(_)));
    assert_eq!(sink.pending(), 0);

    // Nothing left to send, so no second request.
    sink.flush().await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_empty_flush_sends_nothing() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", INGESTION_PATH)
        .expect(0)
        .create_async()
        .await;

    let sink = sink_for(&server);
    sink.flush().await.unwrap();
    sink.shutdown().await.unwrap();

    mock.assert_async().await;
}

#[test]
fn test_empty_keys_are_rejected() {
    let result = LangfuseSink::new(LangfuseConfig::new("http://localhost", "", "sk"));
    assert!(matches!(result, Err(GatewayError::Config(_))));
}
