//! Bounded exponential backoff for registry calls

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::config::{MAX_RETRY_AFTER_SECS, RetryPolicy};
use crate::error::RegistryError;

/// Run `operation`, retrying transient failures according to `policy`.
///
/// Non-transient errors are returned as-is on first occurrence. Once the
/// attempts are exhausted the last transient error is wrapped in
/// [`RegistryError::Unavailable`].
pub async fn with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    description: &str,
    mut operation: F,
) -> Result<T, RegistryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RegistryError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                if attempt >= attempts {
                    return Err(RegistryError::Unavailable {
                        attempts,
                        message: format!("{}: {}", description, e),
                    });
                }

                let delay = retry_delay(policy, attempt, &e);
                warn!(
                    "{} failed (attempt {}/{}): {}; retrying in {:?}",
                    description, attempt, attempts, e, delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn retry_delay(policy: &RetryPolicy, attempt: u32, error: &RegistryError) -> Duration {
    let backoff = policy.delay_for(attempt);
    match error {
        RegistryError::RateLimited {
            retry_after_secs: Some(secs),
        } => backoff.max(Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS))),
        _ => backoff,
    }
}
