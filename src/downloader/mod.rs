pub mod manager;
pub mod orchestrator;
pub mod registry;
pub mod retry;
pub mod strategies;
pub mod ytdlp;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::input::normalize;
use crate::utils::generate_job_id;

/// One input line's full download-and-tag run.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadJob {
    pub id: String,
    pub source_url: String,
    pub normalized_url: String,
    pub output_dir: PathBuf,
    pub bitrate_kbps: u32,
    pub allow_playlist: bool,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Succeeded,
    Failed,
}

impl DownloadJob {
    pub fn new(source_url: &str, output_dir: PathBuf, bitrate_kbps: u32, allow_playlist: bool) -> Self {
        Self {
            id: generate_job_id(),
            source_url: source_url.to_string(),
            normalized_url: normalize(source_url, allow_playlist),
            output_dir,
            bitrate_kbps,
            allow_playlist,
            status: JobStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum StrategyKind {
    Primary,
    FormatFallback(usize),
    ManualProbe,
    AlternateExtractor,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Primary => write!(f, "primary"),
            StrategyKind::FormatFallback(i) => write!(f, "format-fallback[{}]", i),
            StrategyKind::ManualProbe => write!(f, "manual-probe"),
            StrategyKind::AlternateExtractor => write!(f, "alternate-extractor"),
        }
    }
}

/// Stable failure classification reported by an extraction backend.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum FailureKind {
    FormatUnavailable,
    EmptyFile,
    /// Transfer broke off midway; worth another try inside the same attempt.
    PartialTransfer,
    Timeout,
    Cancelled,
    Other(i32),
}

impl FailureKind {
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureKind::PartialTransfer)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::FormatUnavailable => write!(f, "format unavailable"),
            FailureKind::EmptyFile => write!(f, "empty file"),
            FailureKind::PartialTransfer => write!(f, "partial transfer"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Cancelled => write!(f, "cancelled"),
            FailureKind::Other(code) => write!(f, "other (code {})", code),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: FailureKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success,
    Failure { kind: FailureKind, message: String },
}

/// One time-bounded execution of a strategy.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyAttempt {
    pub kind: StrategyKind,
    pub format_spec: Option<String>,
    pub timeout: Duration,
    pub outcome: AttemptOutcome,
    pub transfer_retries: u32,
    pub elapsed: Duration,
}

impl StrategyAttempt {
    pub fn succeeded(&self) -> bool {
        self.outcome == AttemptOutcome::Success
    }
}

/// Client identity handed to the extraction tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientProfile {
    /// No hints at all; the tool picks its defaults.
    Unconstrained,
    /// A single lightweight client hint.
    Minimal,
    /// Alternate clients, explicit headers and large transfer chunks.
    Alternate,
}

#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: String,
    pub output_dir: PathBuf,
    pub bitrate_kbps: u32,
    pub allow_playlist: bool,
    pub format: Option<String>,
    pub client: ClientProfile,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlaylistInfo {
    pub title: Option<String>,
    pub id: Option<String>,
    pub index: Option<u32>,
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormatInfo {
    pub format_id: String,
    pub ext: Option<String>,
    pub acodec: Option<String>,
    pub vcodec: Option<String>,
    pub abr: Option<f64>,
    pub asr: Option<u32>,
    pub tbr: Option<f64>,
    pub filesize: Option<u64>,
    pub filesize_approx: Option<u64>,
    pub format_note: Option<String>,
}

fn codec_present(codec: &Option<String>) -> bool {
    codec.as_deref().map(|c| c != "none").unwrap_or(false)
}

impl FormatInfo {
    pub fn has_audio(&self) -> bool {
        codec_present(&self.acodec)
    }

    pub fn has_video(&self) -> bool {
        codec_present(&self.vcodec)
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    pub fn size(&self) -> u64 {
        self.filesize.or(self.filesize_approx).unwrap_or(0)
    }
}

/// What the extraction tool knows about one resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VideoInfo {
    pub source_id: String,
    pub title: String,
    pub uploader: Option<String>,
    pub artist: Option<String>,
    pub playlist: Option<PlaylistInfo>,
    pub formats: Vec<FormatInfo>,
}

impl VideoInfo {
    /// Artist credit reported by the source, else the uploader.
    pub fn uploader_hint(&self) -> Option<&str> {
        [self.artist.as_deref(), self.uploader.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// A finished audio file and the info it was produced from.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadedItem {
    pub path: PathBuf,
    pub info: VideoInfo,
}

/// Media-extraction/transcoding collaborator.
#[async_trait::async_trait]
pub trait MediaBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Metadata-only probe; nothing is transferred.
    async fn probe(
        &self,
        url: &str,
        allow_playlist: bool,
        cancel: &CancellationToken,
    ) -> BackendResult<VideoInfo>;

    async fn download(
        &self,
        request: &DownloadRequest,
        cancel: &CancellationToken,
    ) -> BackendResult<Vec<DownloadedItem>>;
}
