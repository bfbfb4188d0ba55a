//! Retry budget for transient transfer failures inside a single strategy
//! attempt. Escalation between strategies is the orchestrator's job; this
//! only absorbs broken-off transfers before an attempt is declared failed.

use std::future::Future;
use std::time::Duration;

use crate::config::TransferRetryConfig;
use super::BackendResult;

/// Result of a retried operation together with how many retries it took.
pub struct Retried<T> {
    pub result: BackendResult<T>,
    pub retries: u32,
}

pub async fn with_backoff<F, Fut, T>(config: &TransferRetryConfig, mut operation: F) -> Retried<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BackendResult<T>>,
{
    let mut retries = 0;
    let mut delay = config.initial_delay();

    loop {
        match operation().await {
            Ok(value) => {
                if retries > 0 {
                    log::info!("🔄 [RETRY] Transfer succeeded after {} retr{}", retries, if retries == 1 { "y" } else { "ies" });
                }
                return Retried { result: Ok(value), retries };
            }
            Err(e) if e.kind.is_transient() && retries < config.max_retries => {
                retries += 1;
                log::warn!(
                    "⚠️ [RETRY] {} (retry {}/{} in {:?})",
                    e, retries, config.max_retries, delay
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, config);
            }
            Err(e) => {
                if e.kind.is_transient() {
                    log::error!("❌ [RETRY] Giving up after {} retries: {}", retries, e);
                }
                return Retried { result: Err(e), retries };
            }
        }
    }
}

fn next_delay(current: Duration, config: &TransferRetryConfig) -> Duration {
    Duration::from_secs_f64(current.as_secs_f64() * config.backoff_multiplier).min(config.max_delay())
}
