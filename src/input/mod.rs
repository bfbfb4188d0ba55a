pub mod normalize;

use std::path::Path;
use log::{info, warn};
use crate::config::AppConfig;
use crate::downloader::DownloadJob;
use crate::errors::{AppError, Result};

pub use normalize::normalize;

/// Source links from a newline-delimited list. Blank lines and `#` comments are skipped.
pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// A single positional link wins; otherwise the list file is read.
pub fn load_sources(url: Option<&str>, list_file: &Path) -> Result<Vec<String>> {
    if let Some(url) = url {
        return Ok(vec![url.trim().to_string()]);
    }

    if !list_file.exists() {
        return Err(AppError::Input(format!(
            "No URL provided and list file not found: {}",
            list_file.display()
        )));
    }

    let content = std::fs::read_to_string(list_file).map_err(|e| {
        AppError::Input(format!("Could not read list file {}: {}", list_file.display(), e))
    })?;
    let sources = parse_url_list(&content);
    if sources.is_empty() {
        return Err(AppError::Input(format!(
            "No valid URLs found in {}",
            list_file.display()
        )));
    }

    info!("📄 [INPUT] Loaded {} link(s) from {}", sources.len(), list_file.display());
    Ok(sources)
}

pub fn build_jobs(sources: &[String], config: &AppConfig) -> Vec<DownloadJob> {
    sources
        .iter()
        .map(|source| {
            let job = DownloadJob::new(
                source,
                config.download_path.clone(),
                config.bitrate_kbps,
                config.allow_playlist,
            );
            if job.normalized_url != job.source_url {
                info!("🔗 [INPUT] Using (normalized): {}", job.normalized_url);
            } else if url::Url::parse(&job.source_url).is_err() {
                warn!("⚠️ [INPUT] Not a parseable URL, passing through as-is: {}", job.source_url);
            }
            job
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let content = "https://youtu.be/one\n\n# skip me\n   https://youtu.be/two  \n";
        assert_eq!(
            parse_url_list(content),
            vec!["https://youtu.be/one".to_string(), "https://youtu.be/two".to_string()]
        );
    }

    #[test]
    fn list_with_comment_yields_two_jobs() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "https://youtu.be/abc123?list=PL1").unwrap();
        writeln!(file, "# https://youtu.be/commented").unwrap();
        writeln!(file, "https://www.youtube.com/watch?v=def456").unwrap();

        let sources = load_sources(None, file.path()).unwrap();
        let jobs = build_jobs(&sources, &AppConfig::default());

        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].normalized_url, "https://www.youtube.com/watch?v=abc123");
        assert_eq!(jobs[1].normalized_url, "https://www.youtube.com/watch?v=def456");
    }

    #[test]
    fn positional_url_skips_the_list_file() {
        let sources = load_sources(Some(" https://youtu.be/x "), Path::new("/missing/list.txt")).unwrap();
        assert_eq!(sources, vec!["https://youtu.be/x".to_string()]);
    }

    #[test]
    fn missing_or_empty_list_is_fatal() {
        assert!(matches!(
            load_sources(None, Path::new("/missing/list.txt")),
            Err(AppError::Input(_))
        ));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# only comments").unwrap();
        assert!(matches!(load_sources(None, file.path()), Err(AppError::Input(_))));
    }
}
