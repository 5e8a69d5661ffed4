//! The flush pipeline: everything that happens to a batch after it leaves the [BatchBuffer].
//!
//! A batch is handed to the [FlushActor], which owns the [Submitter] and runs one
//! [RetryController] delivery at a time:
//!   - the [Submitter] performs one multi-record write and returns per-record outcomes
//!   - [reconcile] lines the outcomes up with the submitted items and isolates the rejected ones
//!   - the [RetryController] backs off and resubmits only the rejected subset until none remain
//!
//! [BatchBuffer]: crate::buffer::BatchBuffer
//! [FlushActor]: actor::FlushActor
//! [Submitter]: submit::Submitter
//! [RetryController]: retry::RetryController
//! [reconcile]: reconcile::reconcile
pub(crate) mod actor;
pub mod reconcile;
pub mod retry;
pub mod submit;

#[cfg(test)]
pub(crate) mod test_utils;
