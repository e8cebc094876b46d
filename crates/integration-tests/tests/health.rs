use indoc::indoc;
use integration_tests::*;

#[tokio::test]
async fn default_path() {
    let openai = TestOpenAIServer::start().await;
    let server = TestServer::start(&openai, "").await;

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @r#"{"status":"healthy"}"#);
}

#[tokio::test]
async fn custom_path() {
    let openai = TestOpenAIServer::start().await;

    let server = TestServer::start(
        &openai,
        indoc! {r#"
            [server.health]
            path = "/healthz"
        "#},
    )
    .await;

    let response = server.client.get("/healthz").await;
    assert_eq!(response.status(), 200);

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 404);
}
