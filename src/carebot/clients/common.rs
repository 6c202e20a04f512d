//! Shared HTTP plumbing for model clients and HTTP-backed tools.
//!
//! One `reqwest::Client` is built lazily and cloned out to every caller, so connections to
//! the model provider, the search API and the reminder service are pooled.

use lazy_static::lazy_static;
use std::time::Duration;

lazy_static! {
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::Client::builder()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .build()
        .unwrap_or_else(|err| {
            log::warn!("falling back to default HTTP client: {}", err);
            reqwest::Client::new()
        });
}

/// Cheap clone of the process-wide pooled client.
pub fn shared_http_client() -> reqwest::Client {
    SHARED_HTTP_CLIENT.clone()
}

/// Trim trailing slashes so endpoint paths can be appended with `/`.
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        assert_eq!(
            normalize_base_url("https://api.openai.com/v1/"),
            "https://api.openai.com/v1"
        );
        assert_eq!(normalize_base_url("http://127.0.0.1:9"), "http://127.0.0.1:9");
    }
}
