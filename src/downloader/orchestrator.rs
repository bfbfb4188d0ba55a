use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::registry::JobIsolationRegistry;
use super::retry::{self, Retried};
use super::strategies::{pick_manual_format, StrategyPlan};
use super::{
    AttemptOutcome, BackendError, BackendResult, DownloadJob, DownloadedItem, FailureKind,
    MediaBackend, StrategyAttempt, StrategyKind,
};
use crate::config::TransferRetryConfig;

/// The attempt that finished the job, with the registry scoped to it.
#[derive(Debug)]
pub struct SuccessfulAttempt {
    pub kind: StrategyKind,
    pub items: Vec<DownloadedItem>,
    pub registry: JobIsolationRegistry,
}

/// Synchronous result of driving one job through the strategy ladder.
#[derive(Debug)]
pub struct StrategyRun {
    pub attempts: Vec<StrategyAttempt>,
    pub success: Option<SuccessfulAttempt>,
}

impl StrategyRun {
    pub fn last_failure(&self) -> Option<(&FailureKind, &str)> {
        self.attempts.iter().rev().find_map(|attempt| match &attempt.outcome {
            AttemptOutcome::Failure { kind, message } => Some((kind, message.as_str())),
            AttemptOutcome::Success => None,
        })
    }
}

struct AttemptResult {
    result: BackendResult<Vec<DownloadedItem>>,
    retries: u32,
    format_spec: Option<String>,
}

/// Drives a job through Primary → FormatFallback(0..n) → ManualProbe →
/// AlternateExtractor, stopping at the first success.
pub struct StrategyOrchestrator {
    backend: Arc<dyn MediaBackend>,
    plan: StrategyPlan,
    attempt_timeout: Duration,
    transfer_retries: TransferRetryConfig,
}

impl StrategyOrchestrator {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        plan: StrategyPlan,
        attempt_timeout: Duration,
        transfer_retries: TransferRetryConfig,
    ) -> Self {
        Self { backend, plan, attempt_timeout, transfer_retries }
    }

    pub fn backend(&self) -> &Arc<dyn MediaBackend> {
        &self.backend
    }

    pub async fn run(&self, job: &DownloadJob) -> StrategyRun {
        let mut attempts = Vec::new();

        for kind in self.plan.sequence() {
            // Each attempt gets its own registry; an abandoned attempt's
            // bookkeeping is dropped with it.
            let registry = JobIsolationRegistry::new();
            let started = Instant::now();
            log::info!("🚀 [STRATEGY] {} attempt for {}", kind, job.normalized_url);

            let attempt = self.execute(kind, job).await;
            let elapsed = started.elapsed();

            match attempt.result {
                Ok(items) => {
                    log::info!(
                        "✅ [STRATEGY] {} succeeded with {} file(s) in {:.1}s",
                        kind,
                        items.len(),
                        elapsed.as_secs_f64()
                    );
                    attempts.push(StrategyAttempt {
                        kind,
                        format_spec: attempt.format_spec,
                        timeout: self.attempt_timeout,
                        outcome: AttemptOutcome::Success,
                        transfer_retries: attempt.retries,
                        elapsed,
                    });
                    return StrategyRun {
                        attempts,
                        success: Some(SuccessfulAttempt { kind, items, registry }),
                    };
                }
                Err(e) => {
                    log::warn!("❌ [STRATEGY] {} failed ({}): {}", kind, e.kind, e.message);
                    attempts.push(StrategyAttempt {
                        kind,
                        format_spec: attempt.format_spec,
                        timeout: self.attempt_timeout,
                        outcome: AttemptOutcome::Failure { kind: e.kind, message: e.message },
                        transfer_retries: attempt.retries,
                        elapsed,
                    });
                }
            }
        }

        log::error!("💥 [STRATEGY] All strategies exhausted for {}", job.normalized_url);
        StrategyRun { attempts, success: None }
    }

    /// Runs one attempt under the wall-clock bound. Expiry is an ordinary
    /// attempt failure.
    async fn execute(&self, kind: StrategyKind, job: &DownloadJob) -> AttemptResult {
        let cancel = CancellationToken::new();
        let planned_format = self
            .plan
            .request_for(kind, job)
            .and_then(|request| request.format);

        match tokio::time::timeout(self.attempt_timeout, self.attempt(kind, job, &cancel)).await {
            Ok(result) => result,
            Err(_) => {
                cancel.cancel();
                AttemptResult {
                    result: Err(BackendError::new(
                        FailureKind::Timeout,
                        format!("attempt exceeded {}s", self.attempt_timeout.as_secs()),
                    )),
                    retries: 0,
                    format_spec: planned_format,
                }
            }
        }
    }

    async fn attempt(&self, kind: StrategyKind, job: &DownloadJob, cancel: &CancellationToken) -> AttemptResult {
        let request = match kind {
            StrategyKind::ManualProbe => {
                let info = match self.backend.probe(&job.normalized_url, job.allow_playlist, cancel).await {
                    Ok(info) => info,
                    Err(e) => {
                        return AttemptResult { result: Err(e), retries: 0, format_spec: None };
                    }
                };
                let Some(chosen) = pick_manual_format(&info.formats) else {
                    return AttemptResult {
                        result: Err(BackendError::new(FailureKind::FormatUnavailable, "probe returned no formats")),
                        retries: 0,
                        format_spec: None,
                    };
                };
                log::info!(
                    "🎯 [PROBE] Chosen format {} (acodec {:?}, abr {:?})",
                    chosen.format_id,
                    chosen.acodec,
                    chosen.abr
                );
                self.plan.manual_request(job, &chosen.format_id)
            }
            other => match self.plan.request_for(other, job) {
                Some(request) => request,
                None => {
                    return AttemptResult {
                        result: Err(BackendError::new(FailureKind::Other(-1), format!("no request for {}", other))),
                        retries: 0,
                        format_spec: None,
                    };
                }
            },
        };

        let format_spec = request.format.clone();
        let backend = self.backend.as_ref();
        let request = &request;
        let Retried { result, retries } =
            retry::with_backoff(&self.transfer_retries, move || backend.download(request, cancel)).await;

        AttemptResult { result, retries, format_spec }
    }
}
