use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::Result;
use crate::buffer::BatchBuffer;
use crate::config::Settings;
use crate::error::Error;
use crate::message::{OutgoingItem, Record};
use crate::scheduler::FlushScheduler;
use crate::sinker::actor::FlushActor;
use crate::sinker::retry::RetryController;
use crate::sinker::submit::Submitter;

/// Batches records and delivers them to a stream through a [Submitter].
///
/// Owns three pieces: the [BatchBuffer] that producers append to, the [FlushScheduler] that
/// releases batches on time, and the [FlushActor] task that delivers them one at a time.
pub struct Forwarder {
    handle: ForwarderHandle,
    scheduler: FlushScheduler,
    actor_handle: JoinHandle<Result<()>>,
    shutdown_timeout: Option<Duration>,
}

/// Cheap, cloneable ingestion side of a [Forwarder] for concurrent producers.
#[derive(Clone)]
pub struct ForwarderHandle {
    buffer: Arc<BatchBuffer>,
    partition_key_fields: Arc<[String]>,
}

impl ForwarderHandle {
    /// Turns `record` into an [OutgoingItem] and buffers it. Only waits for the buffer lock, never
    /// for delivery; rejected records are retried in the background and never reported here.
    pub fn receive(&self, record: Record) -> Result<()> {
        let item = OutgoingItem::from_record(&record, &self.partition_key_fields)?;
        self.buffer.append(item)
    }

    /// Number of records waiting for the next flush.
    pub fn buffered(&self) -> usize {
        self.buffer.pending()
    }
}

impl Forwarder {
    /// Validates `settings` and starts the flush actor and the flush scheduler. Nothing is spawned
    /// when the settings are invalid.
    pub fn start<S>(settings: &Settings, submitter: S) -> Result<Self>
    where
        S: Submitter + 'static,
    {
        settings.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let controller =
            RetryController::new(submitter, settings.stream_name.as_str(), settings.retry.clone());
        let actor_handle = tokio::spawn(FlushActor::new(rx, controller).run());

        let buffer = Arc::new(BatchBuffer::new(
            tx,
            settings.batch.max_batch_size,
            settings.batch.max_batch_interval,
        ));
        let scheduler = FlushScheduler::start(
            Arc::clone(&buffer),
            settings.batch.max_batch_interval,
            CancellationToken::new(),
        );

        info!(
            stream = %settings.stream_name,
            max_batch_size = settings.batch.max_batch_size,
            max_batch_interval = ?settings.batch.max_batch_interval,
            partition_key_fields = ?settings.partition_key_fields,
            transport_failure = %settings.retry.transport_failure,
            "Forwarder started"
        );

        Ok(Self {
            handle: ForwarderHandle {
                buffer,
                partition_key_fields: settings.partition_key_fields.clone().into(),
            },
            scheduler,
            actor_handle,
            shutdown_timeout: settings.shutdown_timeout,
        })
    }

    pub fn receive(&self, record: Record) -> Result<()> {
        self.handle.receive(record)
    }

    pub fn handle(&self) -> ForwarderHandle {
        self.handle.clone()
    }

    pub fn buffered(&self) -> usize {
        self.handle.buffered()
    }

    /// Stops the timer, delivers whatever is still buffered (retries included) and waits for the
    /// flush actor to finish. Returns the first delivery failure of the forwarder's lifetime, if
    /// any.
    ///
    /// Without a shutdown timeout this waits as long as the retries take. With one, the actor is
    /// aborted when the deadline passes and the undelivered records are lost.
    pub async fn shutdown(self) -> Result<()> {
        let Forwarder {
            handle,
            scheduler,
            actor_handle,
            shutdown_timeout,
        } = self;
        let abort_handle = actor_handle.abort_handle();

        let drain = async move {
            scheduler.stop().await?;
            let drained = handle.buffer.drain_all().await;
            let actor_result = actor_handle
                .await
                .map_err(|e| Error::Forwarder(format!("flush actor task failed: {e}")))?;
            // the actor keeps the first failure, which may predate the drain
            actor_result?;
            let stats = drained?;
            info!(
                records = stats.records,
                submissions = stats.submissions,
                "Forwarder drained"
            );
            Ok::<_, Error>(())
        };

        let Some(timeout) = shutdown_timeout else {
            return drain.await;
        };
        match tokio::time::timeout(timeout, drain).await {
            Ok(result) => result,
            Err(_) => {
                abort_handle.abort();
                error!(?timeout, "Shutdown timed out, undelivered records are dropped");
                Err(Error::ShutdownTimeout(timeout))
            }
        }
    }
}
