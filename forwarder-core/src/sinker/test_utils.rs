use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Result;
use crate::message::{Batch, OutgoingItem};
use crate::sinker::submit::{OutcomePage, SubmitOutcome, Submitter};

/// What a [ScriptedSubmitter] does on one call.
pub(crate) enum Step {
    /// Reject the items at these positions of the submitted slice, accept the rest.
    Reject(Vec<usize>),
    /// Fail the call itself.
    Fail(crate::Error),
    /// Return exactly these pages, whatever was submitted.
    Pages(Vec<OutcomePage>),
}

/// Submitter that follows a script and records every submitted slice. Once the script runs out
/// every item is accepted.
#[derive(Clone, Default)]
pub(crate) struct ScriptedSubmitter {
    script: Arc<Mutex<VecDeque<Step>>>,
    submissions: Arc<Mutex<Vec<(String, Batch)>>>,
}

impl ScriptedSubmitter {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into_iter().collect())),
            submissions: Arc::default(),
        }
    }

    pub(crate) fn submissions(&self) -> Vec<Batch> {
        self.submissions
            .lock()
            .iter()
            .map(|(_, batch)| batch.clone())
            .collect()
    }

    pub(crate) fn streams(&self) -> Vec<String> {
        self.submissions
            .lock()
            .iter()
            .map(|(stream, _)| stream.clone())
            .collect()
    }
}

impl Submitter for ScriptedSubmitter {
    async fn submit(
        &mut self,
        stream_name: &str,
        items: &[OutgoingItem],
    ) -> Result<Vec<OutcomePage>> {
        self.submissions
            .lock()
            .push((stream_name.to_string(), items.to_vec()));

        let step = self.script.lock().pop_front();
        match step {
            None => Ok(vec![vec![SubmitOutcome::Accepted; items.len()]]),
            Some(Step::Reject(positions)) => Ok(vec![
                (0..items.len())
                    .map(|i| {
                        if positions.contains(&i) {
                            SubmitOutcome::rejected(
                                "ProvisionedThroughputExceededException",
                                "Rate exceeded",
                            )
                        } else {
                            SubmitOutcome::Accepted
                        }
                    })
                    .collect(),
            ]),
            Some(Step::Fail(e)) => Err(e),
            Some(Step::Pages(pages)) => Ok(pages),
        }
    }
}

pub(crate) fn items(n: usize) -> Batch {
    (0..n)
        .map(|i| OutgoingItem::new(format!("payload-{i}"), format!("key-{i}")))
        .collect()
}
