use std::collections::HashMap;

use crate::Result;
use crate::error::Error;
use crate::message::Batch;
use crate::sinker::submit::{OutcomePage, SubmitOutcome};

/// Split of one submitted batch into accepted and rejected items.
#[derive(Debug, Default, PartialEq)]
pub struct Reconciliation {
    /// Rejected items, in the order they were submitted.
    pub rejected: Batch,
    pub accepted: usize,
    /// Rejections per error code, for logging.
    pub errors: HashMap<String, usize>,
}

/// Lines `pages` up with the `batch` they were returned for and keeps the items that were
/// rejected.
///
/// `batch` must be exactly the sequence that was submitted in this attempt (on a retry that is the
/// previous attempt's rejected subset, not the original batch). The outcome at position `i` of the
/// flattened pages describes the item at position `i`; any difference in length is returned as
/// [`Error::OutcomeMismatch`] since nothing sensible can be said about which item failed.
pub fn reconcile(batch: Batch, pages: Vec<OutcomePage>) -> Result<Reconciliation> {
    let outcomes: Vec<SubmitOutcome> = pages.into_iter().flatten().collect();
    if outcomes.len() != batch.len() {
        return Err(Error::OutcomeMismatch {
            items: batch.len(),
            outcomes: outcomes.len(),
        });
    }

    let mut reconciliation = Reconciliation::default();
    for (item, outcome) in batch.into_iter().zip(outcomes) {
        match outcome {
            SubmitOutcome::Accepted => reconciliation.accepted += 1,
            SubmitOutcome::Rejected { error_code, .. } => {
                *reconciliation.errors.entry(error_code).or_insert(0) += 1;
                reconciliation.rejected.push(item);
            }
        }
    }
    Ok(reconciliation)
}

impl Reconciliation {
    pub fn is_complete(&self) -> bool {
        self.rejected.is_empty()
    }
}
