//! Guards for calls that leave the process: every call gets a deadline, and
//! callers without their own retry loop can ask for bounded exponential backoff.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use crate::config::ScreeningConfig;
use crate::errors::AppError;

const BASE_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy)]
pub struct CallPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl CallPolicy {
    pub fn new(timeout: Duration, max_attempts: u32) -> Self {
        Self {
            timeout,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &ScreeningConfig) -> Self {
        Self::new(config.external_call_timeout, config.external_call_max_attempts)
    }

    /// Runs one call under the deadline. A timeout becomes `ExternalService`.
    pub async fn timed<F, T>(&self, label: &str, call: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(AppError::ExternalService(format!(
                "{label} timed out after {:?}",
                self.timeout
            ))),
        }
    }

    /// Runs the call up to `max_attempts` times, backing off between retryable
    /// failures. Non-retryable errors are returned immediately.
    pub async fn retrying<F, Fut, T>(&self, label: &str, mut make_call: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let mut attempt = 1;
        loop {
            match self.timed(label, make_call()).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    let delay = backoff(attempt);
                    warn!(
                        call = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "External call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn backoff(attempt: u32) -> Duration {
    let factor = 1u32 << attempt.saturating_sub(1).min(8);
    (BASE_BACKOFF * factor).min(MAX_BACKOFF)
}
