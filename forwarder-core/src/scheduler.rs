use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::Result;
use crate::buffer::BatchBuffer;
use crate::error::Error;

/// Periodically asks the [BatchBuffer] whether its batch interval has elapsed. It never looks at
/// the buffer size; that is handled by `append`.
pub(crate) struct FlushScheduler {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl FlushScheduler {
    pub(crate) fn start(
        buffer: Arc<BatchBuffer>,
        period: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                let mut ticker = tokio::time::interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => match buffer.flush_if_due() {
                            Ok(true) => debug!("Timer flush handed off"),
                            Ok(false) => {}
                            Err(e) => {
                                error!(?e, "Timer flush failed, stopping flush scheduler");
                                break;
                            }
                        },
                    }
                }
                info!("Flush scheduler stopped");
            }
        });

        Self { cancel, handle }
    }

    /// Cancels the timer and waits for the task to exit. No tick fires after this returns.
    pub(crate) async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        self.handle
            .await
            .map_err(|e| Error::Forwarder(format!("flush scheduler task failed: {e}")))
    }
}
