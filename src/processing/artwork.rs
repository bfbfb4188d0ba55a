use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use crate::http::fetch_bytes;

fn size_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d+x\d+bb").ok()).as_ref()
}

/// Rewrites the catalog's `NNNxNNNbb` size token to the requested square size.
/// Addresses without the token are returned unchanged.
pub fn upgrade_artwork_url(url: &str, size: u32) -> String {
    match size_pattern() {
        Some(pattern) => pattern.replace(url, format!("{size}x{size}bb").as_str()).into_owned(),
        None => url.to_string(),
    }
}

/// MIME type from the image's magic bytes; JPEG when unrecognized.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        "image/png"
    } else {
        "image/jpeg"
    }
}

/// Downloads cover art. Any failure is logged and yields `None`.
pub async fn fetch_artwork(url: &str, size: u32, timeout: Duration, proxy: Option<&str>) -> Option<Vec<u8>> {
    let url = upgrade_artwork_url(url, size);
    log::debug!("🖼️ [ARTWORK] Fetching {}", url);

    match fetch_bytes(&url, timeout, proxy).await {
        Ok(bytes) if !bytes.is_empty() => Some(bytes),
        Ok(_) => {
            log::warn!("⚠️ [ARTWORK] Empty response from {}", url);
            None
        }
        Err(e) => {
            log::warn!("⚠️ [ARTWORK] Failed to fetch {}: {}", url, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn upgrades_size_token() {
        assert_eq!(
            upgrade_artwork_url("https://is1.example/image/thumb/abc/100x100bb.jpg", 600),
            "https://is1.example/image/thumb/abc/600x600bb.jpg"
        );
        assert_eq!(upgrade_artwork_url("https://img.example/cover.jpg", 600), "https://img.example/cover.jpg");
    }

    #[test]
    fn sniffs_png() {
        assert_eq!(sniff_mime(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0]), "image/png");
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), "image/jpeg");
    }

    #[tokio::test]
    async fn fetches_upgraded_address() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/art/600x600bb.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]))
            .mount(&server)
            .await;

        let bytes = fetch_artwork(
            &format!("{}/art/100x100bb.jpg", server.uri()),
            600,
            Duration::from_secs(5),
            None,
        )
        .await;
        assert_eq!(bytes, Some(vec![0xFF, 0xD8, 0xFF, 0xE0]));
    }

    #[tokio::test]
    async fn missing_artwork_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(fetch_artwork(&format!("{}/x.jpg", server.uri()), 600, Duration::from_secs(5), None)
            .await
            .is_none());
    }
}
