use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::orchestrator::{StrategyOrchestrator, SuccessfulAttempt};
use super::strategies::StrategyPlan;
use super::{DownloadJob, DownloadedItem, JobStatus, MediaBackend, StrategyAttempt, StrategyKind};
use crate::config::AppConfig;
use crate::metadata::resolver::MetadataResolver;
use crate::processing::TagWriter;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum MetadataSource {
    /// A catalog provider matched.
    Provider,
    /// No provider matched; title and uploader from the source were used.
    Fallback,
    /// Tagging disabled for this run.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemReport {
    pub path: PathBuf,
    pub source_id: String,
    pub title: String,
    pub artist: String,
    pub metadata_source: MetadataSource,
    pub tagged: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub job: DownloadJob,
    pub attempts: Vec<StrategyAttempt>,
    pub winning_strategy: Option<StrategyKind>,
    pub items: Vec<ItemReport>,
    pub status: JobStatus,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub jobs: Vec<JobReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.jobs.iter().filter(|j| j.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.jobs.len() - self.succeeded()
    }

    pub fn all_succeeded(&self) -> bool {
        self.jobs.iter().all(JobReport::succeeded)
    }

    pub fn failed_urls(&self) -> Vec<&str> {
        self.jobs
            .iter()
            .filter(|j| !j.succeeded())
            .map(|j| j.job.source_url.as_str())
            .collect()
    }

    pub fn log_summary(&self) {
        info!(
            "📊 [BATCH] {} job(s): {} succeeded, {} failed",
            self.jobs.len(),
            self.succeeded(),
            self.failed()
        );
        for url in self.failed_urls() {
            error!("   ❌ {}", url);
        }
    }
}

/// Runs jobs one at a time: download ladder, then resolve and tag each file.
pub struct BatchManager {
    orchestrator: StrategyOrchestrator,
    resolver: MetadataResolver,
    tagger: TagWriter,
    skip_tagging: bool,
}

impl BatchManager {
    pub fn new(
        orchestrator: StrategyOrchestrator,
        resolver: MetadataResolver,
        tagger: TagWriter,
        skip_tagging: bool,
    ) -> Self {
        Self { orchestrator, resolver, tagger, skip_tagging }
    }

    pub fn from_config(config: &AppConfig, backend: Arc<dyn MediaBackend>) -> Self {
        let orchestrator = StrategyOrchestrator::new(
            backend,
            StrategyPlan::new(config.fallback_formats.clone()),
            config.attempt_timeout(),
            config.transfer_retries.clone(),
        );
        Self::new(
            orchestrator,
            MetadataResolver::from_config(config),
            TagWriter::from_config(config),
            config.tagging.skip_tagging,
        )
    }

    pub async fn run(&self, jobs: Vec<DownloadJob>) -> BatchReport {
        let total = jobs.len();
        let mut report = BatchReport::default();

        for (index, job) in jobs.into_iter().enumerate() {
            info!("🎬 [JOB] {}/{}: {}", index + 1, total, job.normalized_url);
            report.jobs.push(self.run_job(job).await);
        }

        report
    }

    pub async fn run_job(&self, mut job: DownloadJob) -> JobReport {
        let started_at = Utc::now();
        let run = self.orchestrator.run(&job).await;

        let Some(success) = run.success else {
            let error = run
                .last_failure()
                .map(|(kind, message)| format!("{}: {}", kind, message))
                .unwrap_or_else(|| "no strategy attempted".to_string());
            job.status = JobStatus::Failed;
            warn!("❌ [JOB] Failed {}: {}", job.source_url, error);
            return JobReport {
                job,
                attempts: run.attempts,
                winning_strategy: None,
                items: Vec::new(),
                status: JobStatus::Failed,
                error: Some(error),
                started_at,
                finished_at: Utc::now(),
            };
        };

        let winning_strategy = Some(success.kind);
        let items = self.finish_items(success).await;
        job.status = JobStatus::Succeeded;
        info!("✅ [JOB] Completed {} ({} file(s))", job.source_url, items.len());

        JobReport {
            job,
            attempts: run.attempts,
            winning_strategy,
            items,
            status: JobStatus::Succeeded,
            error: None,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Resolve then tag every file of the winning attempt, against that
    /// attempt's registry.
    async fn finish_items(&self, success: SuccessfulAttempt) -> Vec<ItemReport> {
        let SuccessfulAttempt { items, mut registry, .. } = success;
        let mut reports = Vec::with_capacity(items.len());

        for DownloadedItem { path, info } in items {
            if self.skip_tagging {
                info!("⏭️ [TAG] Tagging disabled, leaving {:?} as downloaded", path);
                let artist = info.uploader_hint().unwrap_or_default().to_string();
                reports.push(ItemReport {
                    path,
                    source_id: info.source_id,
                    title: info.title,
                    artist,
                    metadata_source: MetadataSource::Skipped,
                    tagged: false,
                });
                continue;
            }

            let uploader = info.uploader_hint();
            let playlist = info.playlist.as_ref();
            let (track, metadata_source) = match self.resolver.resolve(&info.title, uploader, playlist).await {
                Some(track) => (track, MetadataSource::Provider),
                None => {
                    warn!("⚠️ [METADATA] No provider matched '{}', using source info", info.title);
                    (
                        crate::metadata::resolver::fallback_track(&info.title, uploader, playlist),
                        MetadataSource::Fallback,
                    )
                }
            };

            let tagged = self.tagger.apply(&path, &track, &info.source_id, &mut registry).await;
            reports.push(ItemReport {
                path,
                source_id: info.source_id.clone(),
                title: track.title,
                artist: track.artist,
                metadata_source,
                tagged,
            });
        }

        reports
    }
}
