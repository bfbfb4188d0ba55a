use std::path::{Path, PathBuf};
use crate::errors::{AppError, Result};
use log::info;

/// Sanitizes a filename by removing invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Output name the extraction tool is told to use: `"{title} [{id}].mp3"`.
pub fn expected_output_name(title: &str, source_id: &str) -> String {
    format!("{} [{}].mp3", sanitize_filename(title), source_id)
}

/// Creates a directory if it doesn't exist
pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        tokio::fs::create_dir_all(path).await?;
        info!("Created directory: {:?}", path);
    }
    Ok(())
}

/// Generates a unique ID for a job
pub fn generate_job_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Locates an executable, preferring an explicit path over `PATH` lookup.
pub fn find_tool(name: &str, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(AppError::MissingTool(format!("{} (configured at {:?})", name, path)));
    }

    which::which(name).map_err(|_| AppError::MissingTool(name.to_string()))
}
