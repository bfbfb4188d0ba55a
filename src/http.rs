//! Short-lived HTTP sessions. Every lookup builds its own client so no
//! cookie or header state is shared between unrelated requests or jobs.

use reqwest::{Client, ClientBuilder, Proxy};
use std::time::Duration;
use crate::errors::Result;

pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub fn fresh_client(timeout: Duration, user_agent: &str, proxy: Option<&str>) -> Result<Client> {
    let mut builder = ClientBuilder::new()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(15)))
        .user_agent(user_agent)
        .gzip(true)
        .brotli(true)
        .pool_max_idle_per_host(0);

    if let Some(proxy_url) = proxy {
        builder = builder.proxy(Proxy::all(proxy_url)?);
    }

    Ok(builder.build()?)
}

/// Plain byte fetch with its own session and timeout.
pub async fn fetch_bytes(url: &str, timeout: Duration, proxy: Option<&str>) -> Result<Vec<u8>> {
    let client = fresh_client(timeout, BROWSER_USER_AGENT, proxy)?;
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn fetch_returns_body_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cover.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF]))
            .mount(&server)
            .await;

        let bytes = fetch_bytes(&format!("{}/cover.jpg", server.uri()), Duration::from_secs(5), None)
            .await
            .unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(fetch_bytes(&format!("{}/missing", server.uri()), Duration::from_secs(5), None)
            .await
            .is_err());
    }
}
