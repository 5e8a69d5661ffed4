use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::Result;
use crate::message::Batch;
use crate::sinker::retry::{DeliveryStats, RetryController};
use crate::sinker::submit::Submitter;

/// FlushMessage is a message that is sent to the FlushActor.
pub(crate) enum FlushMessage {
    /// A batch released by the size threshold or the timer. Nobody waits for its outcome.
    Flush { batch: Batch },
    /// The final batch at shutdown; the sender waits for the delivery to finish.
    Drain {
        batch: Batch,
        respond_to: oneshot::Sender<Result<DeliveryStats>>,
    },
}

/// FlushActor owns the submitter and delivers handed-off batches strictly one after another, so
/// a new flush never starts while a previous flush is still retrying.
pub(crate) struct FlushActor<S> {
    messages: UnboundedReceiver<FlushMessage>,
    controller: RetryController<S>,
    final_result: Result<()>,
}

impl<S> FlushActor<S>
where
    S: Submitter,
{
    pub(crate) fn new(
        messages: UnboundedReceiver<FlushMessage>,
        controller: RetryController<S>,
    ) -> Self {
        Self {
            messages,
            controller,
            final_result: Ok(()),
        }
    }

    async fn deliver(&mut self, batch: Batch) -> Result<DeliveryStats> {
        let result = self.controller.deliver(batch).await;
        match &result {
            Ok(stats) => debug!(
                records = stats.records,
                submissions = stats.submissions,
                "Flush delivered"
            ),
            Err(e) => {
                error!(?e, "Flush failed, records of this batch were not delivered");
                // keep the first failure, later ones are usually consequences of it
                if self.final_result.is_ok() {
                    self.final_result = Err(e.clone());
                }
            }
        }
        result
    }

    async fn handle_message(&mut self, msg: FlushMessage) {
        match msg {
            FlushMessage::Flush { batch } => {
                let _ = self.deliver(batch).await;
            }
            FlushMessage::Drain { batch, respond_to } => {
                let result = self.deliver(batch).await;
                let _ = respond_to.send(result);
            }
        }
    }

    /// Runs until every sender is dropped and the channel is empty. Returns the first flush
    /// failure, if any.
    pub(crate) async fn run(mut self) -> Result<()> {
        while let Some(msg) = self.messages.recv().await {
            self.handle_message(msg).await;
        }
        info!("Flush actor stopped");
        self.final_result
    }
}
