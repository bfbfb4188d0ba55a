//! Shared fixtures: an in-memory extraction backend that replays a script.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use yt_audio_dl::config::TransferRetryConfig;
use yt_audio_dl::downloader::orchestrator::StrategyOrchestrator;
use yt_audio_dl::downloader::strategies::StrategyPlan;
use yt_audio_dl::downloader::{
    BackendError, BackendResult, ClientProfile, DownloadJob, DownloadRequest, DownloadedItem,
    FailureKind, FormatInfo, MediaBackend, PlaylistInfo, VideoInfo,
};
use yt_audio_dl::utils::expected_output_name;

/// What one `download` call does.
#[derive(Debug, Clone)]
pub enum Step {
    Fail(FailureKind),
    /// Write a decodable MP3 into the output dir and report it.
    Succeed,
    /// Never finish on its own; only cancellation or the deadline ends it.
    Hang,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub format: Option<String>,
    pub client: ClientProfile,
}

pub struct ScriptedBackend {
    steps: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<Call>>,
    probes: AtomicUsize,
    info: VideoInfo,
}

impl ScriptedBackend {
    pub fn new(steps: Vec<Step>, info: VideoInfo) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
            probes: AtomicUsize::new(0),
            info,
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn formats_requested(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.format.unwrap_or_default()).collect()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MediaBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn probe(&self, _url: &str, _allow_playlist: bool, _cancel: &CancellationToken) -> BackendResult<VideoInfo> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.info.clone())
    }

    async fn download(&self, request: &DownloadRequest, cancel: &CancellationToken) -> BackendResult<Vec<DownloadedItem>> {
        self.calls.lock().unwrap().push(Call {
            format: request.format.clone(),
            client: request.client,
        });
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Step::Fail(FailureKind::Other(1)));

        match step {
            Step::Fail(kind) => Err(BackendError::new(kind, format!("scripted {:?}", kind))),
            Step::Succeed => {
                let path = request
                    .output_dir
                    .join(expected_output_name(&self.info.title, &self.info.source_id));
                std::fs::write(&path, synthetic_mp3(20)).map_err(|e| BackendError::new(FailureKind::Other(2), e.to_string()))?;
                Ok(vec![DownloadedItem { path, info: self.info.clone() }])
            }
            Step::Hang => {
                tokio::select! {
                    _ = cancel.cancelled() => Err(BackendError::new(FailureKind::Cancelled, "cancelled")),
                    _ = tokio::time::sleep(Duration::from_secs(3600)) => Err(BackendError::new(FailureKind::Timeout, "slept")),
                }
            }
        }
    }
}

/// Silent MPEG-1 Layer III frames (128 kbps, 44.1 kHz).
pub fn synthetic_mp3(frames: usize) -> Vec<u8> {
    let mut frame = vec![0u8; 417];
    frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    frame.repeat(frames)
}

pub fn format(id: &str, acodec: &str, vcodec: &str, abr: Option<f64>) -> FormatInfo {
    FormatInfo {
        format_id: id.to_string(),
        acodec: Some(acodec.to_string()),
        vcodec: Some(vcodec.to_string()),
        abr,
        ..Default::default()
    }
}

pub fn video_info(title: &str, uploader: &str) -> VideoInfo {
    VideoInfo {
        source_id: "dQw4w9WgXcQ".to_string(),
        title: title.to_string(),
        uploader: Some(uploader.to_string()),
        artist: None,
        playlist: None,
        formats: vec![
            format("18", "mp4a.40.2", "avc1", Some(96.0)),
            format("140", "mp4a.40.2", "none", Some(129.0)),
            format("251", "opus", "none", Some(160.0)),
        ],
    }
}

pub fn playlist(title: &str, index: u32) -> PlaylistInfo {
    PlaylistInfo {
        title: Some(title.to_string()),
        id: Some("PLtest".to_string()),
        index: Some(index),
        count: Some(12),
    }
}

pub fn job(output_dir: &Path) -> DownloadJob {
    DownloadJob::new("https://youtu.be/dQw4w9WgXcQ?list=PLx&t=42", output_dir.to_path_buf(), 192, false)
}

pub fn fast_retries() -> TransferRetryConfig {
    TransferRetryConfig {
        max_retries: 2,
        initial_delay_ms: 1,
        backoff_multiplier: 2.0,
        max_delay_ms: 4,
    }
}

pub fn fallback_formats() -> Vec<String> {
    vec!["bestaudio".to_string(), "best[height<=720]".to_string(), "best".to_string()]
}

pub fn orchestrator(backend: Arc<ScriptedBackend>, attempt_timeout: Duration) -> StrategyOrchestrator {
    StrategyOrchestrator::new(backend, StrategyPlan::new(fallback_formats()), attempt_timeout, fast_retries())
}
