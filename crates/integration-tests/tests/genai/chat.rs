use indoc::indoc;
use integration_tests::*;
use serde_json::json;

#[tokio::test]
async fn chat_completion_with_evaluation() {
    let openai = TestOpenAIServer::start().await;
    let server = TestServer::start(&openai, "").await;

    let (status, body) = server
        .chat(json!({
            "message": "What is Rust?",
            "user_id": "user-1",
            "session_id": "session-1",
        }))
        .await;

    assert_eq!(status, 200);

    let cost = body["metadata"]["cost_usd"].as_f64().unwrap();
    assert!((cost - 0.0041).abs() < 1e-9, "{cost}");

    insta::assert_json_snapshot!(body, {
        ".metadata.cost_usd" => "[cost]",
        ".metadata.duration_seconds" => "[duration]",
        ".eval.duration" => "[duration]",
    }, @r#"
    {
      "eval": {
        "criteria": {
          "has_content": true,
          "has_spaces": true,
          "not_gibberish": true,
          "not_just_input": true,
          "reasonable_length": true
        },
        "duration": "[duration]",
        "passed": true,
        "score": 1.0
      },
      "metadata": {
        "cost_usd": "[cost]",
        "duration_seconds": "[duration]",
        "finish_reason": "stop",
        "model": "gpt-4-turbo-preview",
        "usage": {
          "completion_tokens": 120,
          "prompt_tokens": 50,
          "total_tokens": 170
        }
      },
      "response": "Rust is a systems programming language focused on safety."
    }
    "#);

    assert_eq!(openai.requests(), 1);
}

#[tokio::test]
async fn requested_model_is_forwarded() {
    let openai = TestOpenAIServer::start().await;
    let server = TestServer::start(&openai, "").await;

    let (status, body) = server
        .chat(json!({"message": "Hello there", "model": "gpt-3.5-turbo", "max_tokens": 64}))
        .await;

    assert_eq!(status, 200);
    assert_eq!(body["metadata"]["model"], "gpt-3.5-turbo");

    // 50 * 0.001 / 1000 + 120 * 0.002 / 1000
    let cost = body["metadata"]["cost_usd"].as_f64().unwrap();
    assert!((cost - 0.00029).abs() < 1e-9, "{cost}");
}

#[tokio::test]
async fn unpriced_model_has_no_cost() {
    let openai = TestOpenAIServer::start().await;
    let server = TestServer::start(&openai, "").await;

    let (status, body) = server.chat(json!({"message": "Hello", "model": "my-finetune"})).await;

    assert_eq!(status, 200);
    assert!(body["metadata"]["cost_usd"].is_null());
}

#[tokio::test]
async fn configured_default_model_and_prices() {
    let openai = TestOpenAIServer::start().await;

    let server = TestServer::start(
        &openai,
        indoc! {r#"
            [pricing.models.gpt-4o]
            input = 0.005
            output = 0.015
        "#},
    )
    .await;

    let (status, body) = server.chat(json!({"message": "Hello", "model": "gpt-4o"})).await;
    assert_eq!(status, 200);

    // 50 * 0.005 / 1000 + 120 * 0.015 / 1000
    let cost = body["metadata"]["cost_usd"].as_f64().unwrap();
    assert!((cost - 0.00205).abs() < 1e-9, "{cost}");

    // Configured prices replace the built-in table.
    let (_, body) = server.chat(json!({"message": "Hello"})).await;
    assert!(body["metadata"]["cost_usd"].is_null());
}

#[tokio::test]
async fn evaluation_can_be_disabled() {
    let openai = TestOpenAIServer::start().await;

    let server = TestServer::start(
        &openai,
        indoc! {r#"
            [evaluation]
            enabled = false
        "#},
    )
    .await;

    let (status, body) = server.chat(json!({"message": "Hello"})).await;

    assert_eq!(status, 200);
    assert!(body.get("eval").is_none());
}
