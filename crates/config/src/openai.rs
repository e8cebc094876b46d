//! OpenAI provider settings.

use std::time::Duration;

use duration_str::deserialize_duration;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenAiConfig {
    /// API key sent as a bearer token. Usually `{{ env.OPENAI_API_KEY }}`.
    pub api_key: Option<SecretString>,
    /// Base URL of the API, without the operation path.
    pub base_url: Url,
    /// Model used for chat completions when the request does not name one.
    pub chat_model: String,
    /// Model used for embeddings when the request does not name one.
    pub embedding_model: String,
    /// Upper bound for a single upstream call.
    #[serde(deserialize_with = "deserialize_duration")]
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Url::parse("https://api.openai.com/v1").expect("default URL should be valid"),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}
