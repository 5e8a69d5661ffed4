//! Batching-and-retry engine that forwards records to an append-only stream.
//!
//! Records come in through [Forwarder::receive] and pile up in a buffer until either the batch
//! size or the batch interval is reached. The batch then goes out as a single multi-record write.
//! Records the service rejects are resubmitted, and only those, with exponential backoff until the
//! whole batch is accepted.
pub use self::error::{Error, Result};

mod error;

pub mod config;
pub use config::Settings;

mod buffer;
mod forwarder;
pub use forwarder::{Forwarder, ForwarderHandle};

pub mod message;
pub use message::{Batch, OutgoingItem, Record};

pub mod partition;
mod scheduler;

pub mod sinker;
pub use sinker::retry::DeliveryStats;
pub use sinker::submit::{OutcomePage, SubmitOutcome, Submitter};
