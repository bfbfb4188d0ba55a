use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Input error: {0}")]
    Input(String),

    #[error("Required tool not found: {0}")]
    MissingTool(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Tagging error: {0}")]
    Tagging(String),

    #[error("Tag frame error: {0}")]
    Id3(#[from] id3::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
