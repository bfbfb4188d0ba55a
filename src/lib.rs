pub mod config;
pub mod downloader;
pub mod errors;
pub mod http;
pub mod input;
pub mod metadata;
pub mod processing;
pub mod utils;

pub use config::AppConfig;
pub use errors::{AppError, Result};
