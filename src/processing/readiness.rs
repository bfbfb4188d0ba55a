use log::{debug, warn};
use std::path::Path;
use std::time::Duration;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// True when the file probes as audio and yields at least one packet.
pub fn is_decodable(path: &Path) -> bool {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(_) => return false,
    };
    let media_source = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = match symphonia::default::get_probe().format(
        &hint,
        media_source,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) {
        Ok(probed) => probed,
        Err(e) => {
            debug!("[TAG] Probe failed for {:?}: {}", path, e);
            return false;
        }
    };

    let mut format = probed.format;
    if format.default_track().is_none() {
        return false;
    }
    format.next_packet().is_ok()
}

/// Polls until the file decodes or `attempts` checks have failed.
pub async fn wait_until_ready(path: &Path, attempts: u32, interval: Duration) -> bool {
    let attempts = attempts.max(1);

    for attempt in 1..=attempts {
        let candidate = path.to_path_buf();
        let ready = tokio::task::spawn_blocking(move || is_decodable(&candidate))
            .await
            .unwrap_or(false);
        if ready {
            return true;
        }

        if attempt < attempts {
            debug!("⏳ [TAG] {:?} not ready yet (attempt {}/{})", path, attempt, attempts);
            tokio::time::sleep(interval).await;
        }
    }

    warn!("⚠️ [TAG] {:?} never became a readable audio file, leaving it untagged", path);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::synthetic_mp3;
    use tempfile::TempDir;

    #[test]
    fn synthetic_frames_decode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ok.mp3");
        std::fs::write(&path, synthetic_mp3(20)).unwrap();
        assert!(is_decodable(&path));
    }

    #[test]
    fn garbage_and_missing_files_do_not() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();
        assert!(!is_decodable(&path));
        assert!(!is_decodable(&dir.path().join("missing.mp3")));
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("never.mp3");
        let started = std::time::Instant::now();
        assert!(!wait_until_ready(&path, 3, Duration::from_millis(10)).await);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn picks_up_file_that_appears_later() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.mp3");
        let writer_path = path.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            tokio::fs::write(&writer_path, synthetic_mp3(20)).await.unwrap();
        });

        assert!(wait_until_ready(&path, 50, Duration::from_millis(10)).await);
    }
}
