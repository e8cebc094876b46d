pub mod llms;

use std::{net::SocketAddr, time::Duration};

use config::Config;
use server::ServeConfig;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use llms::{TestOpenAIBehavior, TestOpenAIServer};

/// Test client for making HTTP requests to the test server
#[derive(Clone)]
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Send a POST request to the given path with JSON body
    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await
            .unwrap()
    }

    /// POST and return the status with the decoded JSON body.
    pub async fn post_json<T: serde::Serialize>(&self, path: &str, body: &T) -> (u16, serde_json::Value) {
        let response = self.post(path, body).await;
        let status = response.status().as_u16();

        (status, response.json().await.unwrap())
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .unwrap()
    }

    pub async fn try_get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client.get(format!("{}{}", self.base_url, path)).send().await
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    pub config: Config,
    _server_task_handle: tokio::task::JoinHandle<()>,
    shutdown_signal: CancellationToken,
}

impl TestServer {
    /// Start a server pointing at `openai` with the extra TOML configuration appended.
    pub async fn start(openai: &TestOpenAIServer, extra_config: &str) -> Self {
        let config = indoc::formatdoc! {r#"
            [openai]
            api_key = "test-key"
            base_url = "{base_url}"
            timeout = "1s"

            {extra_config}
        "#, base_url = openai.base_url()};

        Self::start_with_config(&config).await
    }

    /// Start a server with the given TOML configuration
    pub async fn start_with_config(config_toml: &str) -> Self {
        // Write config to a temporary file and use the proper loader to ensure validation
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("lantern.toml");
        std::fs::write(&config_path, config_toml).unwrap();

        let config = Config::load(&config_path).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let shutdown_signal = CancellationToken::new();

        let serve_config = ServeConfig {
            listen_address: address,
            config: config.clone(),
            shutdown_signal: shutdown_signal.clone(),
            log_filter: "server=debug,telemetry=debug,genai=debug,config=debug".to_string(),
        };

        let (tx, mut rx) = tokio::sync::oneshot::channel();

        let server_task_handle = tokio::spawn(async move {
            // Drop the listener so the server can bind to the address
            drop(listener);

            let _ = tx.send(server::serve(serve_config).await);
        });

        let client = TestClient::new(format!("http://{address}"));
        let health_path = config.server.health.path.clone();

        let mut retries = 30;

        loop {
            #[allow(clippy::panic)]
            if let Ok(Err(e)) = rx.try_recv() {
                panic!("Server failed to start: {e}");
            }

            if client.try_get(&health_path).await.is_ok() {
                break;
            }

            retries -= 1;

            #[allow(clippy::panic)]
            if retries == 0 {
                panic!("Server failed to become ready after 30 retries");
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        TestServer {
            client,
            address,
            config,
            _server_task_handle: server_task_handle,
            shutdown_signal,
        }
    }

    pub async fn chat(&self, body: serde_json::Value) -> (u16, serde_json::Value) {
        self.client.post_json("/chat", &body).await
    }

    pub async fn embed(&self, body: serde_json::Value) -> (u16, serde_json::Value) {
        self.client.post_json("/embed", &body).await
    }

    /// Scrape `/metrics`. Everything recorded before the scrape is included.
    pub async fn metrics(&self) -> String {
        self.client.get("/metrics").await.text().await.unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown_signal.cancel();
    }
}

/// Lines of a Prometheus exposition body with the given metric name prefix.
pub fn metric_lines<'a>(body: &'a str, prefix: &str) -> Vec<&'a str> {
    body.lines()
        .filter(|line| !line.starts_with('#') && line.starts_with(prefix))
        .collect()
}
