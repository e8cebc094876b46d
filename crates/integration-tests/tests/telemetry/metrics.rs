use indoc::indoc;
use integration_tests::*;
use serde_json::json;

#[tokio::test]
async fn chat_metrics_are_exposed() {
    let openai = TestOpenAIServer::start().await;
    let server = TestServer::start(&openai, "").await;

    let (status, _) = server.chat(json!({"message": "What is Rust?", "user_id": "user-1"})).await;
    assert_eq!(status, 200);

    let body = server.metrics().await;

    let response = server.client.get("/metrics").await;
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; version=0.0.4"
    );

    let count = metric_lines(&body, "gen_ai_client_operation_count_total{");
    assert_eq!(count.len(), 1, "{body}");
    assert!(count[0].ends_with(" 1"), "{body}");

    for label in [
        r#"gen_ai_system="openai""#,
        r#"gen_ai_operation_name="chat""#,
        r#"gen_ai_request_model="gpt-4-turbo-preview""#,
        r#"gen_ai_response_model="gpt-4-turbo-preview""#,
        r#"server_address="127.0.0.1""#,
        r#"status="success""#,
        r#"user_id="user-1""#,
        r#"telemetry_sdk_name="opentelemetry""#,
    ] {
        assert!(count[0].contains(label), "missing {label} in {}", count[0]);
    }

    let token_usage = metric_lines(&body, "gen_ai_client_token_usage_count{");
    assert_eq!(token_usage.len(), 2, "{body}");
    assert!(token_usage.iter().any(|line| line.contains(r#"gen_ai_token_type="input""#)));
    assert!(token_usage.iter().any(|line| line.contains(r#"gen_ai_token_type="output""#)));

    let duration = metric_lines(&body, "gen_ai_client_operation_duration_seconds_bucket{");
    assert!(duration.iter().any(|line| line.contains(r#"le="0.01""#)), "{body}");
    assert!(duration.iter().any(|line| line.contains(r#"le="+Inf""#)), "{body}");

    assert!(body.contains("gen_ai_client_operation_cost_total{"), "{body}");
    assert!(body.contains("gen_ai_total_requests_total{"), "{body}");
    assert!(body.contains("gen_ai_eval_score_bucket{"), "{body}");
    assert!(body.contains("gen_ai_eval_passed_total{"), "{body}");

    assert!(!body.contains("llm_"), "{body}");
}

#[tokio::test]
async fn failed_operations_are_counted_without_usage() {
    let openai = TestOpenAIServer::start_with(TestOpenAIBehavior {
        error_status: Some(503),
        ..Default::default()
    })
    .await;

    let server = TestServer::start(&openai, "").await;

    let (status, _) = server.chat(json!({"message": "Hello"})).await;
    assert_eq!(status, 502);

    let body = server.metrics().await;

    let count = metric_lines(&body, "gen_ai_client_operation_count_total{");
    assert_eq!(count.len(), 1, "{body}");
    assert!(count[0].contains(r#"status="error""#), "{body}");
    assert!(count[0].contains(r#"error_type="InternalServerError""#), "{body}");

    assert!(body.contains("gen_ai_client_operation_duration_seconds_count{"), "{body}");
    assert!(!body.contains("gen_ai_client_token_usage"), "{body}");
    assert!(!body.contains("gen_ai_client_operation_cost"), "{body}");
    assert!(!body.contains("gen_ai_total_requests"), "{body}");
}

#[tokio::test]
async fn dual_instrumentation_exposes_both_paths() {
    let openai = TestOpenAIServer::start().await;

    let server = TestServer::start(
        &openai,
        indoc! {r#"
            [instrumentation.legacy]
            enabled = true
        "#},
    )
    .await;

    let (status, _) = server.embed(json!({"texts": ["hello world"]})).await;
    assert_eq!(status, 200);

    let body = server.metrics().await;

    let semconv = metric_lines(&body, "gen_ai_client_operation_count_total{");
    let legacy = metric_lines(&body, "llm_client_operation_count_total{");

    assert_eq!(semconv.len(), 1, "{body}");
    assert_eq!(legacy.len(), 1, "{body}");

    assert!(semconv[0].contains(r#"telemetry_sdk_name="opentelemetry""#), "{body}");
    assert!(legacy[0].contains(r#"telemetry_sdk_name="openlit""#), "{body}");
    assert!(legacy[0].contains(r#"llm_request_type="embeddings""#), "{body}");

    // Embeddings produce no output tokens on either path.
    assert!(!body.contains(r#"gen_ai_token_type="output""#), "{body}");
    assert!(!body.contains(r#"llm_token_type="output""#), "{body}");
}

#[tokio::test]
async fn concurrent_operations_are_all_counted() {
    let openai = TestOpenAIServer::start().await;
    let server = TestServer::start(&openai, "").await;

    let requests = (0..10).map(|_| server.chat(json!({"message": "What is Rust?"})));
    let results = futures::future::join_all(requests).await;

    assert!(results.iter().all(|(status, _)| *status == 200));

    let body = server.metrics().await;

    let count = metric_lines(&body, "gen_ai_client_operation_count_total{");
    assert_eq!(count.len(), 1, "{body}");
    assert!(count[0].ends_with(" 10"), "{body}");

    let input_tokens = metric_lines(&body, "gen_ai_usage_input_tokens_total{");
    assert!(input_tokens[0].ends_with(" 500"), "{body}");

    assert_eq!(openai.requests(), 10);
}

#[tokio::test]
async fn prometheus_can_be_disabled() {
    let openai = TestOpenAIServer::start().await;

    let config = indoc::formatdoc! {r#"
        [openai]
        base_url = "{}"

        [telemetry.exporters.prometheus]
        enabled = false
    "#, openai.base_url()};

    let server = TestServer::start_with_config(&config).await;

    let response = server.client.get("/metrics").await;
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn served_requests_are_measured_by_route() {
    let openai = TestOpenAIServer::start().await;
    let server = TestServer::start(&openai, "").await;

    let (status, _) = server.chat(json!({"message": "Hello"})).await;
    assert_eq!(status, 200);

    let body = server.metrics().await;

    let chat: Vec<&str> = metric_lines(&body, "http_server_request_count_total{")
        .into_iter()
        .filter(|line| line.contains(r#"http_route="/chat""#))
        .collect();

    assert_eq!(chat.len(), 1, "{body}");
    assert!(chat[0].contains(r#"http_request_method="POST""#), "{body}");
    assert!(chat[0].contains(r#"http_response_status_code="200""#), "{body}");
    assert!(chat[0].ends_with(" 1"), "{body}");

    let duration = metric_lines(&body, "http_server_request_duration_seconds_count{");
    assert!(duration.iter().any(|line| line.contains(r#"http_route="/chat""#)), "{body}");

    let active = metric_lines(&body, "http_server_active_requests{");
    assert!(
        active
            .iter()
            .any(|line| line.contains(r#"http_route="/chat""#) && line.ends_with(" 0")),
        "{body}"
    );
}
