//! Best-effort execution of individual loop steps.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::error;

/// Awaits `fut`, turning a failure into a logged `None`.
///
/// After a failure the caller is paused for `pause` before control returns,
/// so a failing step never turns into a tight request loop.
pub async fn suppress<T, E, Fut>(step: &str, pause: Duration, fut: Fut) -> Option<T>
where
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            error!("{} failed: {}", step, e);
            tokio::time::sleep(pause).await;
            None
        }
    }
}
