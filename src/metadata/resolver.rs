use log::{info, warn};

use super::clean::{clean_title, normalize_text};
use super::providers::{ItunesProvider, MusicBrainzProvider};
use super::{is_placeholder_album, is_placeholder_artist, CandidateTrack, MetadataProvider, UNKNOWN_ARTIST};
use crate::config::AppConfig;
use crate::downloader::PlaylistInfo;

/// Runs the provider chain for one downloaded item and post-processes the winner.
pub struct MetadataResolver {
    providers: Vec<Box<dyn MetadataProvider>>,
}

impl MetadataResolver {
    pub fn new(providers: Vec<Box<dyn MetadataProvider>>) -> Self {
        Self { providers }
    }

    /// iTunes first, MusicBrainz second.
    pub fn from_config(config: &AppConfig) -> Self {
        let timeout = config.provider_timeout();
        let providers: Vec<Box<dyn MetadataProvider>> = vec![
            Box::new(ItunesProvider::new(
                config.providers.itunes_base_url.clone(),
                timeout,
                config.proxy.clone(),
            )),
            Box::new(MusicBrainzProvider::new(
                config.providers.musicbrainz_base_url.clone(),
                timeout,
                config.providers.musicbrainz_user_agent.clone(),
                config.proxy.clone(),
            )),
        ];
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Returns `None` only when no provider produced a titled candidate.
    pub async fn resolve(
        &self,
        raw_title: &str,
        uploader_hint: Option<&str>,
        playlist: Option<&PlaylistInfo>,
    ) -> Option<CandidateTrack> {
        let query = clean_title(raw_title);
        info!("🔎 [METADATA] Looking up '{}'", query);

        let mut track = self.lookup_chain(&query).await?;
        correct_placeholder_artist(&mut track, uploader_hint);
        apply_playlist_context(&mut track, playlist);
        Some(track)
    }

    /// Like [`resolve`](Self::resolve), but never empty-handed.
    pub async fn resolve_or_fallback(
        &self,
        raw_title: &str,
        uploader_hint: Option<&str>,
        playlist: Option<&PlaylistInfo>,
    ) -> CandidateTrack {
        match self.resolve(raw_title, uploader_hint, playlist).await {
            Some(track) => track,
            None => {
                warn!("⚠️ [METADATA] No provider matched '{}', using source info", raw_title);
                fallback_track(raw_title, uploader_hint, playlist)
            }
        }
    }

    async fn lookup_chain(&self, query: &str) -> Option<CandidateTrack> {
        if query.is_empty() {
            return None;
        }

        for provider in &self.providers {
            match provider.lookup(query).await {
                Ok(Some(track)) if !track.title.trim().is_empty() => {
                    info!(
                        "✅ [METADATA] {} matched: {} - {} (score {:.2})",
                        provider.name(),
                        track.artist,
                        track.title,
                        track.match_score()
                    );
                    return Some(track);
                }
                Ok(_) => info!("➡️ [METADATA] {} had no match", provider.name()),
                Err(e) => warn!("⚠️ [METADATA] {} lookup failed: {}", provider.name(), e),
            }
        }

        None
    }
}

/// Minimal metadata from what the source itself reported.
pub fn fallback_track(
    raw_title: &str,
    uploader_hint: Option<&str>,
    playlist: Option<&PlaylistInfo>,
) -> CandidateTrack {
    let artist = uploader_hint
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .unwrap_or(UNKNOWN_ARTIST)
        .to_string();

    let mut track = CandidateTrack {
        title: normalize_text(raw_title),
        album_artist: artist.clone(),
        artist,
        provider: "source".to_string(),
        ..Default::default()
    };
    apply_playlist_context(&mut track, playlist);
    track
}

pub fn correct_placeholder_artist(track: &mut CandidateTrack, uploader_hint: Option<&str>) {
    if !is_placeholder_artist(&track.artist) {
        return;
    }
    let Some(uploader) = uploader_hint.map(str::trim).filter(|u| !u.is_empty() && !is_placeholder_artist(u)) else {
        return;
    };

    info!("🔁 [METADATA] Replacing '{}' with uploader '{}'", track.artist, uploader);
    track.artist = uploader.to_string();
    track.album_artist = uploader.to_string();
}

pub fn apply_playlist_context(track: &mut CandidateTrack, playlist: Option<&PlaylistInfo>) {
    let Some(playlist) = playlist else { return };
    let Some(title) = playlist.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
        return;
    };
    if !is_placeholder_album(&track.album) {
        return;
    }

    info!("📁 [METADATA] Using collection title '{}' as album", title);
    track.album = title.to_string();
    if let Some(index) = playlist.index {
        track.track_number = Some(index);
    }
}
