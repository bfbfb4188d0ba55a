use log::{debug, info, warn};
use std::path::Path;
use std::time::Duration;

use super::artwork::fetch_artwork;
use super::readiness::wait_until_ready;
use super::TagSet;
use crate::config::AppConfig;
use crate::downloader::registry::JobIsolationRegistry;
use crate::metadata::CandidateTrack;

pub struct TagWriter {
    encoder_name: String,
    artwork_size: u32,
    artwork_timeout: Duration,
    readiness_attempts: u32,
    readiness_interval: Duration,
    proxy: Option<String>,
}

impl TagWriter {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            encoder_name: config.tagging.encoder_name.clone(),
            artwork_size: config.tagging.artwork_size,
            artwork_timeout: config.tagging.artwork_timeout(),
            readiness_attempts: config.tagging.readiness_attempts,
            readiness_interval: config.tagging.readiness_interval(),
            proxy: config.proxy.clone(),
        }
    }

    pub fn with_readiness(mut self, attempts: u32, interval: Duration) -> Self {
        self.readiness_attempts = attempts;
        self.readiness_interval = interval;
        self
    }

    /// Tags `path` once per registry. Returns whether a tag was written;
    /// readiness, artwork and write failures are all logged and non-fatal.
    pub async fn apply(
        &self,
        path: &Path,
        track: &CandidateTrack,
        source_id: &str,
        registry: &mut JobIsolationRegistry,
    ) -> bool {
        if registry.contains(path) {
            debug!("⏭️ [TAG] {:?} already tagged in this attempt", path);
            return false;
        }

        if !wait_until_ready(path, self.readiness_attempts, self.readiness_interval).await {
            return false;
        }

        let cover = match track.artwork_url.as_deref() {
            Some(url) => fetch_artwork(url, self.artwork_size, self.artwork_timeout, self.proxy.as_deref()).await,
            None => None,
        };
        let has_cover = cover.is_some();

        let tags = TagSet::from_track(track, source_id, &self.encoder_name).with_cover(cover);
        let target = path.to_path_buf();
        let written = tokio::task::spawn_blocking(move || tags.write_to(&target)).await;

        match written {
            Ok(Ok(())) => {
                registry.mark(path);
                info!(
                    "🏷️ [TAG] Tagged {:?}: {} - {}{}",
                    path.file_name().unwrap_or_default(),
                    track.artist,
                    track.title,
                    if has_cover { " (with cover)" } else { "" }
                );
                true
            }
            Ok(Err(e)) => {
                warn!("⚠️ [TAG] Failed to write tags to {:?}: {}", path, e);
                false
            }
            Err(e) => {
                warn!("⚠️ [TAG] Tag writer task failed for {:?}: {}", path, e);
                false
            }
        }
    }
}
