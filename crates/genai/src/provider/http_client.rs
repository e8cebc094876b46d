use std::time::Duration;

use http::{HeaderMap, HeaderValue, header::CONNECTION};
use reqwest::Client;

pub(crate) fn default_http_client_builder(timeout: Duration) -> reqwest::ClientBuilder {
    let mut headers = HeaderMap::new();
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

    Client::builder()
        .timeout(timeout)
        // Short idle timeout so DNS changes of the upstream are picked up.
        .pool_idle_timeout(Some(Duration::from_secs(5)))
        .tcp_nodelay(true)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .default_headers(headers)
}
