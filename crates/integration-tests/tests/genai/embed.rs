use integration_tests::*;
use serde_json::json;

#[tokio::test]
async fn embeddings_for_every_text() {
    let openai = TestOpenAIServer::start().await;
    let server = TestServer::start(&openai, "").await;

    let (status, body) = server
        .embed(json!({"texts": ["hello world", "the quick brown fox"], "user_id": "user-1"}))
        .await;

    assert_eq!(status, 200);

    insta::assert_json_snapshot!(body, {
        ".metadata.cost_usd" => "[cost]",
        ".metadata.duration_seconds" => "[duration]",
    }, @r#"
    {
      "embeddings": [
        [
          0.1,
          0.2,
          0.3
        ],
        [
          0.1,
          0.2,
          0.3
        ]
      ],
      "embeddings_created": 2,
      "metadata": {
        "cost_usd": "[cost]",
        "duration_seconds": "[duration]",
        "model": "text-embedding-ada-002",
        "usage": {
          "completion_tokens": 0,
          "prompt_tokens": 6,
          "total_tokens": 6
        }
      }
    }
    "#);

    // 6 * 0.0001 / 1000
    let cost = body["metadata"]["cost_usd"].as_f64().unwrap();
    assert!((cost - 0.0000006).abs() < 1e-12, "{cost}");
}

#[tokio::test]
async fn empty_texts_are_rejected() {
    let openai = TestOpenAIServer::start().await;
    let server = TestServer::start(&openai, "").await;

    let (status, body) = server.embed(json!({"texts": []})).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"]["type"], "ValidationError");
    assert_eq!(openai.requests(), 0);
}
