use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use yt_audio_dl::config::AppConfig;
use yt_audio_dl::downloader::manager::BatchManager;
use yt_audio_dl::downloader::ytdlp::YtDlpBackend;
use yt_audio_dl::downloader::{DownloadJob, MediaBackend, VideoInfo};
use yt_audio_dl::input::{build_jobs, load_sources};
use yt_audio_dl::metadata::resolver::MetadataResolver;
use yt_audio_dl::utils::{ensure_dir_exists, find_tool};

/// Download online videos as tagged MP3 files.
#[derive(Parser, Debug)]
#[command(name = "yt-audio-dl", version, about)]
struct Cli {
    /// Single source link (overrides the list file)
    url: Option<String>,

    /// Output directory
    #[arg(short = 'o', long)]
    outdir: Option<PathBuf>,

    /// Target MP3 bitrate in kbps
    #[arg(long)]
    bitrate: Option<u32>,

    /// Allow playlist/collection downloads
    #[arg(long)]
    allow_playlist: bool,

    /// Newline-delimited list of links
    #[arg(long)]
    file: Option<PathBuf>,

    /// Probe each link and print its available formats, then exit
    #[arg(long)]
    list_formats: bool,

    /// Probe each link and print the resolved metadata, then exit
    #[arg(long)]
    test_metadata: bool,

    /// Download without metadata lookup or tagging
    #[arg(long)]
    skip_tagging: bool,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn apply_to(&self, config: &mut AppConfig) {
        if let Some(outdir) = &self.outdir {
            config.download_path = outdir.clone();
        }
        if let Some(bitrate) = self.bitrate {
            config.bitrate_kbps = bitrate;
        }
        if let Some(file) = &self.file {
            config.list_file = file.clone();
        }
        if self.allow_playlist {
            config.allow_playlist = true;
        }
        if self.skip_tagging {
            config.tagging.skip_tagging = true;
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            error!("💥 {:#}", e);
            ExitCode::from(2)
        }
    }
}

/// `Ok(false)` means at least one job failed; `Err` is a fatal startup problem.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = AppConfig::load().context("failed to load configuration")?;
    cli.apply_to(&mut config);

    ensure_dir_exists(&config.download_path)
        .await
        .with_context(|| format!("cannot create output directory {}", config.download_path.display()))?;

    let ffmpeg = find_tool("ffmpeg", config.ffmpeg_path.as_deref())
        .context("ffmpeg is required for audio conversion; install it and make sure it is on PATH")?;
    let ytdlp = locate_extractor(&config.ytdlp_path).context("the yt-dlp extractor is required")?;
    info!("🔧 [STARTUP] ffmpeg: {}, yt-dlp: {}", ffmpeg.display(), ytdlp.display());

    let sources = load_sources(cli.url.as_deref(), &config.list_file).context("nothing to download")?;
    let jobs = build_jobs(&sources, &config);

    if std::env::var_os("YTMP3_SKIP_TAG").is_some() {
        warn!("⚠️ [STARTUP] YTMP3_SKIP_TAG is set, tagging disabled");
        config.tagging.skip_tagging = true;
    }

    let backend: Arc<dyn MediaBackend> = Arc::new(
        YtDlpBackend::new(ytdlp.to_string_lossy().into_owned())
            .with_ffmpeg_location(Some(ffmpeg))
            .with_proxy(config.proxy.clone()),
    );

    if cli.list_formats {
        return Ok(list_formats(backend.as_ref(), &jobs, config.attempt_timeout()).await);
    }
    if cli.test_metadata {
        let resolver = MetadataResolver::from_config(&config);
        return Ok(test_metadata(backend.as_ref(), &resolver, &jobs, config.attempt_timeout()).await);
    }

    info!("🎵 [BATCH] Starting {} job(s) into {}", jobs.len(), config.download_path.display());
    let manager = BatchManager::from_config(&config, backend);
    let report = manager.run(jobs).await;
    report.log_summary();

    Ok(report.all_succeeded())
}

/// Bare names go through `PATH`; anything that looks like a path must exist.
fn locate_extractor(configured: &str) -> yt_audio_dl::Result<PathBuf> {
    let path = Path::new(configured);
    if path.components().count() > 1 {
        find_tool("yt-dlp", Some(path))
    } else {
        find_tool(configured, None)
    }
}

async fn probe_bounded(
    backend: &dyn MediaBackend,
    job: &DownloadJob,
    timeout: Duration,
) -> Option<VideoInfo> {
    let cancel = CancellationToken::new();
    match tokio::time::timeout(timeout, backend.probe(&job.normalized_url, job.allow_playlist, &cancel)).await {
        Ok(Ok(info)) => Some(info),
        Ok(Err(e)) => {
            error!("❌ [PROBE] {}: {}", job.normalized_url, e);
            None
        }
        Err(_) => {
            cancel.cancel();
            error!("❌ [PROBE] {}: timed out after {}s", job.normalized_url, timeout.as_secs());
            None
        }
    }
}

fn show<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

async fn list_formats(backend: &dyn MediaBackend, jobs: &[DownloadJob], timeout: Duration) -> bool {
    let mut all_ok = true;

    for job in jobs {
        let Some(info) = probe_bounded(backend, job, timeout).await else {
            all_ok = false;
            continue;
        };

        println!("\n{} [{}]", info.title, info.source_id);
        println!(
            "{:<12} {:<6} {:<16} {:<16} {:>8} {:>8}  {}",
            "ID", "EXT", "ACODEC", "VCODEC", "ABR", "TBR", "NOTE"
        );
        for format in &info.formats {
            println!(
                "{:<12} {:<6} {:<16} {:<16} {:>8} {:>8}  {}",
                format.format_id,
                show(format.ext.as_deref()),
                show(format.acodec.as_deref()),
                show(format.vcodec.as_deref()),
                show(format.abr.map(|v| format!("{:.0}k", v))),
                show(format.tbr.map(|v| format!("{:.0}k", v))),
                format.format_note.as_deref().unwrap_or(""),
            );
        }
    }

    all_ok
}

async fn test_metadata(
    backend: &dyn MediaBackend,
    resolver: &MetadataResolver,
    jobs: &[DownloadJob],
    timeout: Duration,
) -> bool {
    let mut all_ok = true;

    for job in jobs {
        let Some(info) = probe_bounded(backend, job, timeout).await else {
            all_ok = false;
            continue;
        };

        let track = resolver
            .resolve_or_fallback(&info.title, info.uploader_hint(), info.playlist.as_ref())
            .await;

        println!("\n{}", job.normalized_url);
        println!("  Source title : {}", info.title);
        println!("  Uploader     : {}", show(info.uploader_hint()));
        println!("  Title        : {}", track.title);
        println!("  Artist       : {}", track.artist);
        println!("  Album        : {}", track.album);
        println!("  Album artist : {}", track.album_artist);
        println!("  Genre        : {}", track.genre);
        println!("  Year         : {}", show(track.year));
        println!("  Track        : {}", show(track.track_number));
        println!("  Artwork      : {}", show(track.artwork_url.as_deref()));
        println!("  Provider     : {} (score {:.2})", track.provider, track.match_score());
    }

    all_ok
}
