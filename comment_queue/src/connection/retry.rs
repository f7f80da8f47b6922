use crate::error::ConnectionError;
use getset::Getters;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Getters, Copy, Clone, Eq, PartialEq)]
#[getset(get = "pub")]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the first try; zero is treated as one.
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// Runs `attempt` until it succeeds or the policy is exhausted, sleeping
/// `backoff` between consecutive failures. The closure receives the
/// 1-based attempt number.
pub async fn connect_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut attempt: F,
) -> Result<T, ConnectionError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, anyhow::Error>>,
{
    let mut attempt_number = 1;
    loop {
        debug!(
            "Connecting to broker, attempt {}/{}",
            attempt_number, policy.max_attempts
        );

        match attempt(attempt_number).await {
            Ok(connection) => {
                if attempt_number > 1 {
                    info!("Connected to broker after {} attempts", attempt_number);
                }
                return Ok(connection);
            }
            Err(source) if attempt_number >= policy.max_attempts => {
                return Err(ConnectionError::Exhausted {
                    attempts: attempt_number,
                    source,
                });
            }
            Err(e) => {
                warn!(
                    "Connection attempt {}/{} failed, retrying in {:?}: {:#}",
                    attempt_number, policy.max_attempts, policy.backoff, e
                );
                sleep(policy.backoff).await;
                attempt_number += 1;
            }
        }
    }
}
