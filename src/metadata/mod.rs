pub mod clean;
pub mod providers;
pub mod resolver;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Generic compilation credit treated as low-information.
pub const PLACEHOLDER_ARTIST: &str = "Various Artists";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
const PLACEHOLDER_ALBUMS: &[&str] = &["various artists", "unknown album"];

pub fn is_placeholder_artist(artist: &str) -> bool {
    artist.trim().eq_ignore_ascii_case(PLACEHOLDER_ARTIST)
}

/// Empty or generic album names that playlist context may replace.
pub fn is_placeholder_album(album: &str) -> bool {
    let album = album.trim();
    album.is_empty() || PLACEHOLDER_ALBUMS.iter().any(|p| album.eq_ignore_ascii_case(p))
}

/// One provider's idea of what a track is.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CandidateTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub album_artist: String,
    pub genre: String,
    pub year: Option<i32>,
    pub track_number: Option<u32>,
    pub artwork_url: Option<String>,
    match_score: f64,
    pub provider: String,
}

impl CandidateTrack {
    /// Title and artist only; the artist doubles as album artist.
    pub fn new(title: impl Into<String>, artist: impl Into<String>) -> Self {
        let artist = artist.into();
        Self {
            title: title.into(),
            album_artist: artist.clone(),
            artist,
            ..Default::default()
        }
    }

    pub fn match_score(&self) -> f64 {
        self.match_score
    }

    /// Always stored within [0, 1].
    pub fn set_match_score(&mut self, score: f64) {
        self.match_score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
    }

    pub fn with_match_score(mut self, score: f64) -> Self {
        self.set_match_score(score);
        self
    }
}

/// Why a provider produced nothing usable. Every variant means "try the next one".
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider timed out")]
    Timeout,
    #[error("provider answered with status {0}")]
    Status(u16),
    #[error("provider returned malformed data: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ProviderError::Timeout
        } else if let Some(status) = error.status() {
            ProviderError::Status(status.as_u16())
        } else if error.is_decode() {
            ProviderError::Malformed(error.to_string())
        } else {
            ProviderError::Unavailable(error.to_string())
        }
    }
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// An external track/artist/album lookup service.
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, query: &str) -> ProviderResult<Option<CandidateTrack>>;
}
