use std::collections::HashMap;

use backoff::strategy::exponential::Exponential;
use tracing::{error, warn};

use crate::Result;
use crate::config::{RetryConfig, TransportFailurePolicy};
use crate::error::Error;
use crate::message::Batch;
use crate::sinker::reconcile::reconcile;
use crate::sinker::submit::Submitter;

/// Summary of one successfully delivered flush.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    pub records: usize,
    pub submissions: usize,
}

/// Items still waiting to be accepted, and the backoff that governs when they go out again.
struct RetryState {
    pending: Batch,
    backoff: Exponential,
}

/// Delivers a batch by submitting it and resubmitting only its rejected items until none remain.
///
/// ```no_rust
///  Submitting --> Reconciling --(none rejected)--> Done
///      ^               |
///      |          (rejected)
///      |               v
///      +---------- Backoff
/// ```
/// The rejected subset of one attempt is the whole batch of the next one. With no attempt cap the
/// loop only ends once every item is accepted or a fatal error occurs.
pub struct RetryController<S> {
    submitter: S,
    stream_name: String,
    retry_config: RetryConfig,
}

impl<S> RetryController<S>
where
    S: Submitter,
{
    pub fn new(submitter: S, stream_name: impl Into<String>, retry_config: RetryConfig) -> Self {
        Self {
            submitter,
            stream_name: stream_name.into(),
            retry_config,
        }
    }

    /// Runs the delivery loop for `batch`.
    ///
    /// Fails with the submitter's error when the call itself fails under
    /// [`TransportFailurePolicy::Abort`], with [`Error::OutcomeMismatch`] when the outcomes do not
    /// line up with the submission, and with [`Error::RetriesExhausted`] when an attempt cap is
    /// configured and reached.
    pub async fn deliver(&mut self, batch: Batch) -> Result<DeliveryStats> {
        if batch.is_empty() {
            return Ok(DeliveryStats::default());
        }

        let mut stats = DeliveryStats {
            records: batch.len(),
            submissions: 0,
        };
        let mut state = RetryState {
            pending: batch,
            backoff: self.retry_config.backoff(),
        };

        loop {
            // Submitting
            stats.submissions += 1;
            let submitted = self
                .submitter
                .submit(&self.stream_name, &state.pending)
                .await;

            // Reconciling
            let errors = match submitted {
                Ok(pages) => {
                    let reconciliation = reconcile(std::mem::take(&mut state.pending), pages)?;
                    if reconciliation.is_complete() {
                        return Ok(stats);
                    }
                    state.pending = reconciliation.rejected;
                    reconciliation.errors
                }
                Err(Error::Transport(reason))
                    if self.retry_config.transport_failure == TransportFailurePolicy::Retry =>
                {
                    HashMap::from([(reason, state.pending.len())])
                }
                Err(e) => {
                    error!(?e, records = state.pending.len(), "Submit call failed, aborting flush");
                    return Err(e);
                }
            };

            // Backoff
            let Some(delay) = state.backoff.next() else {
                error!(
                    remaining = state.pending.len(),
                    attempts = stats.submissions,
                    ?errors,
                    "Retries exhausted"
                );
                return Err(Error::RetriesExhausted {
                    remaining: state.pending.len(),
                });
            };
            warn!(
                failed = state.pending.len(),
                ?delay,
                retry_attempt = state.backoff.current_attempt(),
                ?errors,
                stream = %self.stream_name,
                "Records rejected, retrying after backoff"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
