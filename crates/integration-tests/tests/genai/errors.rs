use std::time::Duration;

use integration_tests::*;
use serde_json::json;

#[tokio::test]
async fn invalid_temperature() {
    let openai = TestOpenAIServer::start().await;
    let server = TestServer::start(&openai, "").await;

    let (status, body) = server.chat(json!({"message": "Hello", "temperature": 2.5})).await;

    assert_eq!(status, 400);

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "code": 400,
        "message": "Invalid request: temperature must be between 0 and 2, got 2.5",
        "type": "ValidationError"
      }
    }
    "#);

    assert_eq!(openai.requests(), 0);
}

#[tokio::test]
async fn provider_server_error() {
    let openai = TestOpenAIServer::start_with(TestOpenAIBehavior {
        error_status: Some(500),
        ..Default::default()
    })
    .await;

    let server = TestServer::start(&openai, "").await;

    let (status, body) = server.chat(json!({"message": "Hello"})).await;

    assert_eq!(status, 502);
    assert_eq!(body["error"]["type"], "InternalServerError");
}

#[tokio::test]
async fn provider_rate_limit() {
    let openai = TestOpenAIServer::start_with(TestOpenAIBehavior {
        error_status: Some(429),
        ..Default::default()
    })
    .await;

    let server = TestServer::start(&openai, "").await;

    let (status, body) = server.embed(json!({"texts": ["hello"]})).await;

    assert_eq!(status, 429);
    assert_eq!(body["error"]["type"], "RateLimitError");
}

#[tokio::test]
async fn provider_timeout() {
    let openai = TestOpenAIServer::start_with(TestOpenAIBehavior {
        delay: Some(Duration::from_secs(3)),
        ..Default::default()
    })
    .await;

    let server = TestServer::start(&openai, "").await;

    let (status, body) = server.chat(json!({"message": "Hello"})).await;

    assert_eq!(status, 504);
    assert_eq!(body["error"]["type"], "TimeoutError");
}

#[tokio::test]
async fn embeddings_timeout_is_recorded_without_cost() {
    let openai = TestOpenAIServer::start_with(TestOpenAIBehavior {
        delay: Some(Duration::from_secs(3)),
        ..Default::default()
    })
    .await;

    let server = TestServer::start(&openai, "").await;

    let (status, body) = server.embed(json!({"texts": ["hello world"]})).await;

    assert_eq!(status, 504);
    assert_eq!(body["error"]["type"], "TimeoutError");

    let body = server.metrics().await;

    let count = metric_lines(&body, "gen_ai_client_operation_count_total{");
    assert_eq!(count.len(), 1, "{body}");
    assert!(count[0].contains(r#"gen_ai_operation_name="embeddings""#), "{body}");
    assert!(count[0].contains(r#"error_type="TimeoutError""#), "{body}");

    assert!(!body.contains("gen_ai_client_operation_cost"), "{body}");
    assert!(!body.contains("gen_ai_usage_cost"), "{body}");
}
