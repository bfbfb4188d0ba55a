use std::path::{Path, PathBuf};
use std::process::Stdio;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use async_trait::async_trait;

use super::{
    BackendError, BackendResult, ClientProfile, DownloadRequest, DownloadedItem, FailureKind,
    FormatInfo, MediaBackend, PlaylistInfo, VideoInfo,
};
use crate::utils::expected_output_name;

pub const OUTPUT_TEMPLATE: &str = "%(title).200B [%(id)s].%(ext)s";
const ALTERNATE_USER_AGENT: &str = "Mozilla/5.0";
const ALTERNATE_CHUNK_SIZE: &str = "10M";

/// Extraction backend driving the `yt-dlp` executable.
pub struct YtDlpBackend {
    ytdlp_path: String,
    ffmpeg_location: Option<PathBuf>,
    proxy: Option<String>,
    socket_timeout_secs: u64,
    in_tool_retries: u32,
}

impl YtDlpBackend {
    pub fn new(ytdlp_path: impl Into<String>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            ffmpeg_location: None,
            proxy: None,
            socket_timeout_secs: 30,
            in_tool_retries: 3,
        }
    }

    pub fn with_ffmpeg_location(mut self, path: Option<PathBuf>) -> Self {
        self.ffmpeg_location = path;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    fn common_args(&self, args: &mut Vec<String>) {
        args.extend(["--no-warnings".to_string(), "--socket-timeout".to_string(), self.socket_timeout_secs.to_string()]);
        if let Some(location) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".to_string());
            args.push(location.to_string_lossy().into_owned());
        }
        if let Some(proxy) = &self.proxy {
            args.push("--proxy".to_string());
            args.push(proxy.clone());
        }
    }

    pub fn probe_args(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = ["--dump-single-json", "--skip-download", "--no-playlist"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        self.common_args(&mut args);
        args.push("--".to_string());
        args.push(url.to_string());
        args
    }

    pub fn download_args(&self, request: &DownloadRequest) -> Vec<String> {
        let mut args: Vec<String> = Vec::new();
        if let Some(format) = &request.format {
            args.push("--format".to_string());
            args.push(format.clone());
        }

        args.extend([
            "--extract-audio".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            format!("{}K", request.bitrate_kbps),
            "--paths".to_string(),
            request.output_dir.to_string_lossy().into_owned(),
            "--output".to_string(),
            OUTPUT_TEMPLATE.to_string(),
            (if request.allow_playlist { "--yes-playlist" } else { "--no-playlist" }).to_string(),
            "--retries".to_string(),
            self.in_tool_retries.to_string(),
            "--fragment-retries".to_string(),
            self.in_tool_retries.to_string(),
            "--retry-sleep".to_string(),
            "exp=1:8".to_string(),
            "--concurrent-fragments".to_string(),
            "1".to_string(),
            "--no-part".to_string(),
            "--geo-bypass".to_string(),
            "--print".to_string(),
            "after_move:%()j".to_string(),
            "--no-simulate".to_string(),
        ]);

        match request.client {
            ClientProfile::Unconstrained => {}
            ClientProfile::Minimal => {
                args.push("--extractor-args".to_string());
                args.push("youtube:player_client=android".to_string());
            }
            ClientProfile::Alternate => {
                args.extend([
                    "--extractor-args".to_string(),
                    "youtube:player_client=android,tv".to_string(),
                    "--http-chunk-size".to_string(),
                    ALTERNATE_CHUNK_SIZE.to_string(),
                    "--user-agent".to_string(),
                    ALTERNATE_USER_AGENT.to_string(),
                    "--add-header".to_string(),
                    "Accept-Language:en-US,en;q=0.9".to_string(),
                ]);
            }
        }

        self.common_args(&mut args);
        args.push("--".to_string());
        args.push(request.url.clone());
        args
    }

    async fn run(&self, args: &[String], cancel: &CancellationToken) -> BackendResult<std::process::Output> {
        log::debug!("🎵 [YTDLP] Running {} {:?}", self.ytdlp_path, args);
        let child = tokio::process::Command::new(&self.ytdlp_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BackendError::new(FailureKind::Other(-1), format!("failed to start {}: {}", self.ytdlp_path, e)))?;

        tokio::select! {
            output = child.wait_with_output() => output
                .map_err(|e| BackendError::new(FailureKind::Other(-1), format!("failed to wait for {}: {}", self.ytdlp_path, e))),
            _ = cancel.cancelled() => {
                log::warn!("⏹️ [YTDLP] Cancelled, killing {}", self.ytdlp_path);
                Err(BackendError::new(FailureKind::Cancelled, "extraction cancelled"))
            }
        }
    }
}

#[async_trait]
impl MediaBackend for YtDlpBackend {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn probe(&self, url: &str, _allow_playlist: bool, cancel: &CancellationToken) -> BackendResult<VideoInfo> {
        log::info!("🔍 [PROBE] Extracting info for {}", url);
        let output = self.run(&self.probe_args(url), cancel).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(output.status.code(), &stderr));
        }

        let raw: RawInfo = serde_json::from_slice(&output.stdout)
            .map_err(|e| BackendError::new(FailureKind::Other(-2), format!("unreadable probe output: {}", e)))?;
        let info = raw.into_probe_result();
        log::info!("✅ [PROBE] {} ({} formats)", info.title, info.formats.len());
        Ok(info)
    }

    async fn download(&self, request: &DownloadRequest, cancel: &CancellationToken) -> BackendResult<Vec<DownloadedItem>> {
        let output = self.run(&self.download_args(request), cancel).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(output.status.code(), &stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let items = parse_finished_items(&stdout, &request.output_dir);
        if items.is_empty() {
            return Err(BackendError::new(
                FailureKind::EmptyFile,
                "extraction finished without producing an audio file",
            ));
        }
        Ok(items)
    }
}

/// Maps the tool's error text onto a stable failure kind. Nothing outside
/// this adapter looks at error text.
pub fn classify_failure(exit_code: Option<i32>, stderr: &str) -> BackendError {
    let message = stderr
        .lines()
        .rev()
        .find(|line| line.contains("ERROR"))
        .unwrap_or_else(|| stderr.trim())
        .trim()
        .to_string();
    let lower = stderr.to_lowercase();

    let kind = if lower.contains("downloaded file is empty") || lower.contains("empty file") {
        FailureKind::EmptyFile
    } else if lower.contains("requested format")
        || lower.contains("format is not available")
        || lower.contains("no video formats")
        || lower.contains("not available")
    {
        FailureKind::FormatUnavailable
    } else if lower.contains("did not get any data blocks")
        || lower.contains("incomplete")
        || lower.contains("connection reset")
        || lower.contains("read timed out")
        || lower.contains("timed out")
    {
        FailureKind::PartialTransfer
    } else {
        FailureKind::Other(exit_code.unwrap_or(-1))
    };

    BackendError::new(kind, message)
}

/// One JSON line per finished item, printed after the file was moved into place.
pub fn parse_finished_items(stdout: &str, output_dir: &Path) -> Vec<DownloadedItem> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .filter_map(|line| match serde_json::from_str::<RawInfo>(line) {
            Ok(raw) => Some(raw),
            Err(e) => {
                log::warn!("⚠️ [YTDLP] Skipping unparseable item line: {}", e);
                None
            }
        })
        .filter_map(|raw| {
            let path = raw.final_path(output_dir)?;
            Some(DownloadedItem { path, info: raw.into_video_info() })
        })
        .collect()
}

#[derive(Debug, Deserialize, Default)]
struct RawInfo {
    #[serde(default)]
    id: String,
    #[serde(default)]
    title: String,
    uploader: Option<String>,
    artist: Option<String>,
    playlist: Option<String>,
    playlist_title: Option<String>,
    playlist_id: Option<String>,
    playlist_index: Option<u32>,
    playlist_count: Option<u32>,
    #[serde(default)]
    formats: Vec<FormatInfo>,
    #[serde(default)]
    entries: Vec<RawInfo>,
    filepath: Option<String>,
    #[serde(rename = "_filename")]
    filename: Option<String>,
    #[serde(default)]
    requested_downloads: Vec<RequestedDownload>,
}

#[derive(Debug, Deserialize, Default)]
struct RequestedDownload {
    filepath: Option<String>,
}

impl RawInfo {
    /// A collection probe carries no formats itself; use its first entry.
    fn into_probe_result(mut self) -> VideoInfo {
        if self.formats.is_empty() && !self.entries.is_empty() {
            let first = self.entries.remove(0);
            return first.into_video_info();
        }
        self.into_video_info()
    }

    fn into_video_info(self) -> VideoInfo {
        let playlist = if self.playlist.is_some() || self.playlist_title.is_some() {
            Some(PlaylistInfo {
                title: self.playlist_title.or(self.playlist),
                id: self.playlist_id,
                index: self.playlist_index,
                count: self.playlist_count,
            })
        } else {
            None
        };

        VideoInfo {
            source_id: self.id,
            title: self.title,
            uploader: self.uploader,
            artist: self.artist,
            playlist,
            formats: self.formats,
        }
    }

    fn final_path(&self, output_dir: &Path) -> Option<PathBuf> {
        let reported = self
            .filepath
            .clone()
            .or_else(|| self.requested_downloads.iter().find_map(|d| d.filepath.clone()))
            .or_else(|| self.filename.clone())
            .map(PathBuf::from);

        let candidate = match reported {
            Some(path) => path,
            None if !self.id.is_empty() && !self.title.is_empty() => {
                output_dir.join(expected_output_name(&self.title, &self.id))
            }
            None => return None,
        };

        let is_mp3 = candidate
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("mp3"))
            .unwrap_or(false);
        let mp3 = if is_mp3 { candidate } else { candidate.with_extension("mp3") };

        if mp3.exists() {
            Some(mp3)
        } else {
            log::warn!("⚠️ [YTDLP] Reported output is not an existing mp3: {:?}", mp3);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request(client: ClientProfile, allow_playlist: bool) -> DownloadRequest {
        DownloadRequest {
            url: "https://www.youtube.com/watch?v=abc".to_string(),
            output_dir: PathBuf::from("/music"),
            bitrate_kbps: 192,
            allow_playlist,
            format: Some("bestaudio".to_string()),
            client,
        }
    }

    fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
        args.windows(2).any(|w| w[0] == flag && w[1] == value)
    }

    #[test]
    fn download_args_follow_request() {
        let backend = YtDlpBackend::new("yt-dlp");
        let args = backend.download_args(&request(ClientProfile::Minimal, false));

        assert!(has_pair(&args, "--format", "bestaudio"));
        assert!(has_pair(&args, "--audio-quality", "192K"));
        assert!(has_pair(&args, "--output", OUTPUT_TEMPLATE));
        assert!(has_pair(&args, "--extractor-args", "youtube:player_client=android"));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("https://www.youtube.com/watch?v=abc"));
    }

    #[test]
    fn alternate_profile_changes_identity_and_chunking() {
        let backend = YtDlpBackend::new("yt-dlp").with_proxy(Some("socks5://127.0.0.1:1080".into()));
        let args = backend.download_args(&request(ClientProfile::Alternate, true));

        assert!(has_pair(&args, "--extractor-args", "youtube:player_client=android,tv"));
        assert!(has_pair(&args, "--http-chunk-size", "10M"));
        assert!(has_pair(&args, "--user-agent", "Mozilla/5.0"));
        assert!(has_pair(&args, "--proxy", "socks5://127.0.0.1:1080"));
        assert!(args.contains(&"--yes-playlist".to_string()));
    }

    #[test]
    fn unconstrained_profile_has_no_client_hints() {
        let args = YtDlpBackend::new("yt-dlp").download_args(&request(ClientProfile::Unconstrained, false));
        assert!(!args.contains(&"--extractor-args".to_string()));
    }

    #[test]
    fn failure_text_maps_to_kinds() {
        let cases = [
            ("ERROR: Requested format is not available. Use --list-formats", FailureKind::FormatUnavailable),
            ("ERROR: The downloaded file is empty", FailureKind::EmptyFile),
            ("ERROR: Did not get any data blocks", FailureKind::PartialTransfer),
            ("ERROR: [youtube] abc: Sign in to confirm your age", FailureKind::Other(1)),
        ];
        for (stderr, kind) in cases {
            assert_eq!(classify_failure(Some(1), stderr).kind, kind, "{stderr}");
        }
    }

    #[test]
    fn failure_message_is_last_error_line() {
        let err = classify_failure(Some(1), "[youtube] abc: Downloading\nERROR: unable to download video data\n");
        assert_eq!(err.message, "ERROR: unable to download video data");
    }

    #[test]
    fn finished_items_resolve_to_existing_mp3() {
        let dir = TempDir::new().unwrap();
        let mp3 = dir.path().join("Song [abc].mp3");
        std::fs::write(&mp3, b"data").unwrap();

        let line = serde_json::json!({
            "id": "abc",
            "title": "Song",
            "uploader": "Channel",
            "playlist_title": "Mix",
            "playlist_index": 2,
            "playlist_count": 9,
            "filepath": dir.path().join("Song [abc].webm"),
        })
        .to_string();
        let stdout = format!("[download] noise\n{}\n", line);

        let items = parse_finished_items(&stdout, dir.path());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].path, mp3);
        assert_eq!(items[0].info.source_id, "abc");
        let playlist = items[0].info.playlist.as_ref().unwrap();
        assert_eq!(playlist.title.as_deref(), Some("Mix"));
        assert_eq!(playlist.index, Some(2));
    }

    #[test]
    fn missing_path_is_derived_from_title_and_id() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Other Song [xyz].mp3"), b"data").unwrap();

        let line = r#"{"id": "xyz", "title": "Other Song"}"#;
        let items = parse_finished_items(line, dir.path());
        assert_eq!(items.len(), 1);

        let gone = r#"{"id": "nope", "title": "Missing"}"#;
        assert!(parse_finished_items(gone, dir.path()).is_empty());
    }

    #[test]
    fn collection_probe_uses_first_entry() {
        let raw: RawInfo = serde_json::from_str(
            r#"{"id": "PL1", "title": "Mix", "entries": [{"id": "a", "title": "First", "formats": [{"format_id": "140", "acodec": "mp4a", "vcodec": "none", "abr": 129.5}]}]}"#,
        )
        .unwrap();
        let info = raw.into_probe_result();
        assert_eq!(info.source_id, "a");
        assert_eq!(info.formats.len(), 1);
        assert_eq!(info.formats[0].abr, Some(129.5));
    }
}
