use crate::Result;
use crate::message::OutgoingItem;

/// Kinesis `PutRecords` as a [Submitter].
#[path = "submit/kinesis.rs"]
mod kinesis;

/// Per-record result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected {
        error_code: String,
        error_message: String,
    },
}

impl SubmitOutcome {
    pub fn rejected(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        SubmitOutcome::Rejected {
            error_code: error_code.into(),
            error_message: error_message.into(),
        }
    }
}

/// One page of outcomes. Services that do not paginate return a single page; otherwise the pages
/// concatenated in order line up with the submitted items.
pub type OutcomePage = Vec<SubmitOutcome>;

/// A remote append-only stream that accepts multi-record writes.
#[trait_variant::make(Submitter: Send)]
#[allow(dead_code)]
pub trait LocalSubmitter {
    /// Writes `items` to `stream_name` in a single call.
    ///
    /// Returns [`crate::Error::Transport`] when the call itself fails. Implementations never
    /// retry; that is up to the caller.
    async fn submit(&mut self, stream_name: &str, items: &[OutgoingItem])
    -> Result<Vec<OutcomePage>>;
}
