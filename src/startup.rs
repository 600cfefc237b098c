use std::future::Future;
use std::time::Duration;

use teloxide::{ApiError, RequestError};
use tracing::{error, info, warn};

use crate::config::StartupConfig;

/// Why connecting to Telegram at startup failed.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("connection timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("rate limited by Telegram: {0}")]
    RateLimited(String),
    #[error("bot token was rejected")]
    InvalidToken,
    #[error("Telegram API error: {0}")]
    Api(String),
}

impl StartupError {
    /// Transient errors are worth another attempt, the rest stop the process.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StartupError::Timeout(_) | StartupError::Network(_) | StartupError::RateLimited(_)
        )
    }
}

impl From<RequestError> for StartupError {
    fn from(err: RequestError) -> Self {
        match &err {
            RequestError::Network(e) if e.is_timeout() => StartupError::Timeout(err.to_string()),
            RequestError::Network(_) | RequestError::Io(_) => {
                StartupError::Network(err.to_string())
            }
            RequestError::RetryAfter(_) => StartupError::RateLimited(err.to_string()),
            RequestError::Api(ApiError::InvalidToken) => StartupError::InvalidToken,
            _ => StartupError::Api(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl From<&StartupConfig> for RetryPolicy {
    fn from(config: &StartupConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            delay: config.retry_delay(),
        }
    }
}

/// Run `connect` until it succeeds, a fatal error occurs, or attempts run out.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut connect: F) -> Result<T, StartupError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StartupError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        info!("Connecting to Telegram (attempt {}/{})", attempt, max_attempts);
        match connect().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                warn!("{}. Retrying in {:?}...", e, policy.delay);
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    error!(
                        "Failed to connect after {} attempts. Check the network connection and bot token.",
                        max_attempts
                    );
                }
                return Err(e);
            }
        }
    }
}
