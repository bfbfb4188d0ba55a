use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

use super::{
    is_placeholder_artist, CandidateTrack, MetadataProvider, ProviderError, ProviderResult,
};
use crate::http::{fresh_client, BROWSER_USER_AGENT};

pub const ITUNES_RESULT_LIMIT: usize = 5;
pub const MUSICBRAINZ_RESULT_LIMIT: usize = 5;
/// Minimum token overlap for a scored candidate to win outright.
pub const MATCH_THRESHOLD: f64 = 0.3;

fn year_from_date(date: &str) -> Option<i32> {
    date.get(..4).and_then(|year| year.parse::<i32>().ok())
}

fn non_empty(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Share of query words that also appear in the candidate's track or artist name.
pub fn token_overlap(query: &str, track: &str, artist: &str) -> f64 {
    let query = query.to_lowercase();
    let query_words: HashSet<&str> = query.split_whitespace().collect();
    if query_words.is_empty() {
        return 0.0;
    }

    let track = track.to_lowercase();
    let artist = artist.to_lowercase();
    let candidate_words: HashSet<&str> = track
        .split_whitespace()
        .chain(artist.split_whitespace())
        .collect();

    let common = query_words.intersection(&candidate_words).count();
    common as f64 / query_words.len() as f64
}

// ---------- iTunes Search ----------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItunesResponse {
    #[serde(default)]
    results: Vec<ItunesTrack>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItunesTrack {
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub collection_name: Option<String>,
    pub primary_genre_name: Option<String>,
    pub release_date: Option<String>,
    pub track_number: Option<u32>,
    pub artwork_url100: Option<String>,
}

impl ItunesTrack {
    fn artist(&self) -> &str {
        self.artist_name.as_deref().unwrap_or("")
    }

    fn track(&self) -> &str {
        self.track_name.as_deref().unwrap_or("")
    }

    fn into_candidate(self, score: f64) -> CandidateTrack {
        let artist = non_empty(self.artist_name);
        CandidateTrack {
            title: non_empty(self.track_name),
            album_artist: artist.clone(),
            artist,
            album: non_empty(self.collection_name),
            genre: non_empty(self.primary_genre_name),
            year: self.release_date.as_deref().and_then(year_from_date),
            track_number: self.track_number.filter(|n| *n > 0),
            artwork_url: self.artwork_url100.filter(|u| !u.is_empty()),
            provider: "itunes".to_string(),
            ..Default::default()
        }
        .with_match_score(score)
    }
}

/// Picks the best-scoring non-placeholder candidate above the threshold;
/// otherwise the first non-placeholder; otherwise the first result.
pub fn select_itunes_candidate(query: &str, results: &[ItunesTrack]) -> Option<(usize, f64)> {
    let scores: Vec<f64> = results
        .iter()
        .map(|r| token_overlap(query, r.track(), r.artist()))
        .collect();

    let mut best: Option<(usize, f64)> = None;
    for (index, result) in results.iter().enumerate() {
        if is_placeholder_artist(result.artist()) {
            continue;
        }
        let score = scores[index];
        if score > MATCH_THRESHOLD && best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((index, score));
        }
    }

    best.or_else(|| {
        results
            .iter()
            .position(|r| !is_placeholder_artist(r.artist()))
            .map(|index| (index, scores[index]))
    })
    .or_else(|| (!results.is_empty()).then(|| (0, scores[0])))
}

/// Provider A: Apple's iTunes Search API.
pub struct ItunesProvider {
    base_url: String,
    timeout: Duration,
    proxy: Option<String>,
}

impl ItunesProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration, proxy: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            proxy,
        }
    }
}

#[async_trait::async_trait]
impl MetadataProvider for ItunesProvider {
    fn name(&self) -> &str {
        "iTunes"
    }

    async fn lookup(&self, query: &str) -> ProviderResult<Option<CandidateTrack>> {
        let client = fresh_client(self.timeout, BROWSER_USER_AGENT, self.proxy.as_deref())
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let limit = ITUNES_RESULT_LIMIT.to_string();

        let response = client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("term", query),
                ("media", "music"),
                ("entity", "song"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: ItunesResponse = response.json().await?;
        log::debug!("🍎 [ITUNES] {} result(s) for '{}'", body.results.len(), query);

        let Some((index, score)) = select_itunes_candidate(query, &body.results) else {
            return Ok(None);
        };
        let chosen = body.results.into_iter().nth(index).unwrap_or_default();
        Ok(Some(chosen.into_candidate(score)))
    }
}

// ---------- MusicBrainz ----------

#[derive(Debug, Deserialize)]
struct MusicBrainzResponse {
    #[serde(default)]
    recordings: Vec<Recording>,
}

#[derive(Debug, Clone, Deserialize)]
struct Recording {
    #[serde(default)]
    title: String,
    score: Option<f64>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    releases: Vec<Release>,
    #[serde(default)]
    tags: Vec<RecordingTag>,
}

#[derive(Debug, Clone, Deserialize)]
struct ArtistCredit {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Release {
    #[serde(default)]
    title: String,
    date: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RecordingTag {
    #[serde(default)]
    name: String,
    #[serde(default)]
    count: i64,
}

impl Recording {
    fn artist_names(&self) -> String {
        self.artist_credit
            .iter()
            .map(|credit| credit.name.trim())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn into_candidate(self) -> CandidateTrack {
        let artist = self.artist_names();
        let release = self.releases.first();
        let genre = self
            .tags
            .iter()
            .filter(|t| !t.name.trim().is_empty())
            .max_by_key(|t| t.count)
            .map(|t| t.name.trim().to_string())
            .unwrap_or_default();

        CandidateTrack {
            title: self.title.trim().to_string(),
            album_artist: artist.clone(),
            artist,
            album: release.map(|r| r.title.trim().to_string()).unwrap_or_default(),
            genre,
            year: release.and_then(|r| r.date.as_deref()).and_then(year_from_date),
            track_number: None,
            artwork_url: None,
            provider: "musicbrainz".to_string(),
            ..Default::default()
        }
        .with_match_score(self.score.unwrap_or(0.0) / 100.0)
    }
}

/// First recording, unless it is credited to the placeholder artist and an
/// alternate with a concrete artist exists.
fn select_recording(recordings: Vec<Recording>) -> Option<Recording> {
    let first = recordings.first()?;
    if is_placeholder_artist(&first.artist_names()) && recordings.len() > 1 {
        if let Some(alternate) = recordings[1..].iter().find(|r| {
            !r.artist_credit.is_empty() && !is_placeholder_artist(&r.artist_names())
        }) {
            return Some(alternate.clone());
        }
    }
    recordings.into_iter().next()
}

/// Provider B: MusicBrainz recording search.
pub struct MusicBrainzProvider {
    base_url: String,
    timeout: Duration,
    user_agent: String,
    proxy: Option<String>,
}

impl MusicBrainzProvider {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: impl Into<String>,
        proxy: Option<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            user_agent: user_agent.into(),
            proxy,
        }
    }
}

#[async_trait::async_trait]
impl MetadataProvider for MusicBrainzProvider {
    fn name(&self) -> &str {
        "MusicBrainz"
    }

    async fn lookup(&self, query: &str) -> ProviderResult<Option<CandidateTrack>> {
        let client = fresh_client(self.timeout, &self.user_agent, self.proxy.as_deref())
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        let limit = MUSICBRAINZ_RESULT_LIMIT.to_string();

        let response = client
            .get(format!("{}/ws/2/recording", self.base_url))
            .query(&[("query", query), ("fmt", "json"), ("limit", limit.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body: MusicBrainzResponse = response.json().await?;
        log::debug!("🎼 [MUSICBRAINZ] {} recording(s) for '{}'", body.recordings.len(), query);

        let candidate = select_recording(body.recordings).map(Recording::into_candidate);
        Ok(candidate.filter(|c| !c.title.is_empty() && !c.artist.is_empty()))
    }
}
