use loadfence_core::TrackerError;
use std::time::Duration;

use crate::tracker::LoadTracker;

impl LoadTracker {
    /// Waits until the tracker reports the load finished.
    ///
    /// Returns immediately when no navigation is in flight. A navigation that
    /// is superseded while waiting keeps the wait going until the newer one
    /// finishes.
    pub async fn wait_for_load_finish(&self, timeout: Duration) -> Result<(), TrackerError> {
        let mut finished = self.subscribe_finished();
        let waited = tokio::time::timeout(timeout, async move {
            finished.wait_for(|done| *done).await.map(|_| ())
        })
        .await;

        match waited {
            Ok(Ok(())) => Ok(()),
            // The sender lives as long as `self`, so only the timeout can end the wait early.
            Ok(Err(_)) | Err(_) => {
                tracing::debug!(view = %self.view(), ?timeout, "gave up waiting for load finish");
                Err(TrackerError::LoadTimeout { timeout })
            }
        }
    }
}
