use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::errors::Result;

pub const ENV_PREFIX: &str = "YTAD";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub download_path: PathBuf,
    pub list_file: PathBuf,
    pub bitrate_kbps: u32,
    pub allow_playlist: bool,
    pub ytdlp_path: String,
    pub ffmpeg_path: Option<PathBuf>,
    pub attempt_timeout_secs: u64,
    pub fallback_formats: Vec<String>,
    pub transfer_retries: TransferRetryConfig,
    pub providers: ProviderConfig,
    pub tagging: TaggingConfig,
    pub proxy: Option<String>,
}

/// Retry budget for transient partial transfers inside one strategy attempt.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TransferRetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProviderConfig {
    pub timeout_secs: u64,
    pub itunes_base_url: String,
    pub musicbrainz_base_url: String,
    pub musicbrainz_user_agent: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TaggingConfig {
    pub skip_tagging: bool,
    pub encoder_name: String,
    pub artwork_timeout_secs: u64,
    pub artwork_size: u32,
    pub readiness_attempts: u32,
    pub readiness_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_path: PathBuf::from("./downloads"),
            list_file: PathBuf::from("./download.txt"),
            bitrate_kbps: 192,
            allow_playlist: false,
            ytdlp_path: "yt-dlp".to_string(),
            ffmpeg_path: None,
            attempt_timeout_secs: 120,
            fallback_formats: vec![
                "bestaudio".to_string(),
                "best[height<=720]".to_string(),
                "best".to_string(),
            ],
            transfer_retries: TransferRetryConfig::default(),
            providers: ProviderConfig::default(),
            tagging: TaggingConfig::default(),
            proxy: None,
        }
    }
}

impl Default for TransferRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 8000,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            itunes_base_url: "https://itunes.apple.com".to_string(),
            musicbrainz_base_url: "https://musicbrainz.org".to_string(),
            musicbrainz_user_agent: format!(
                "yt-audio-dl/{} ( https://github.com/ZantonV2/yt-audio-dl )",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            skip_tagging: false,
            encoder_name: "yt-audio-dl".to_string(),
            artwork_timeout_secs: 10,
            artwork_size: 600,
            readiness_attempts: 10,
            readiness_interval_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the optional user config file, then `YTAD_*` env vars.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(base) = Self::get_config_base() {
            builder = builder.add_source(config::File::from(base).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("fallback_formats")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// `<config_dir>/yt-audio-dl/config`; the `config` crate picks the extension.
    fn get_config_base() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("yt-audio-dl").join("config"))
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.providers.timeout_secs)
    }
}

impl TransferRetryConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl TaggingConfig {
    pub fn artwork_timeout(&self) -> Duration {
        Duration::from_secs(self.artwork_timeout_secs)
    }

    pub fn readiness_interval(&self) -> Duration {
        Duration::from_millis(self.readiness_interval_ms)
    }
}
