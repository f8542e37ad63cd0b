//! Flood wait handling for Telegram RPC calls.
//!
//! Telegram answers too-frequent requests with `FLOOD_WAIT_<n>`, telling
//! the client how many seconds to back off. The policy here waits that
//! long plus a small margin and tries again.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use super::TelegramError;

/// Retry policy for flood wait errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FloodWaitPolicy {
    /// Added on top of the server-advised wait.
    pub extra_delay: Duration,

    /// Total attempts allowed. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for FloodWaitPolicy {
    fn default() -> Self {
        Self::unbounded(Duration::from_secs(3))
    }
}

impl FloodWaitPolicy {
    /// Retries for as long as the server keeps asking to wait.
    #[must_use]
    pub const fn unbounded(extra_delay: Duration) -> Self {
        Self {
            extra_delay,
            max_attempts: None,
        }
    }

    /// Gives up after `max_attempts` calls.
    #[must_use]
    pub const fn bounded(extra_delay: Duration, max_attempts: u32) -> Self {
        Self {
            extra_delay,
            max_attempts: Some(max_attempts),
        }
    }

    /// Delay to apply after a `FLOOD_WAIT_<seconds>`.
    #[must_use]
    pub fn delay_for(&self, seconds: u32) -> Duration {
        Duration::from_secs(u64::from(seconds)) + self.extra_delay
    }

    /// Whether another attempt is allowed after `attempts` calls.
    #[must_use]
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempts < max)
    }

    /// Runs `op`, retrying it while it fails with a flood wait.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, TelegramError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TelegramError>>,
    {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match op().await {
                Err(TelegramError::FloodWait(seconds)) if self.allows_retry(attempts) => {
                    let delay = self.delay_for(seconds);
                    warn!("FloodWait on {}: {} seconds", label, seconds);
                    info!("Sleep {}s", delay.as_secs());
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }
}
