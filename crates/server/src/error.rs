#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to bind to address: {0}")]
    Bind(#[source] std::io::Error),

    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("Failed to initialize telemetry: {0}")]
    Telemetry(#[source] anyhow::Error),

    #[error("Failed to initialize the GenAI client: {0}")]
    GenAi(#[from] genai::GenAiError),
}
