//! Accumulates [OutgoingItem]s until the size or time threshold is hit and hands the batch to the
//! flush actor.
//!
//! All three operations swap the pending sequence out under one lock, so an item is either in the
//! pending sequence or in exactly one handed-off batch. The hand-off itself is an unbounded send,
//! also done under the lock, which keeps batches reaching the actor in the order they were cut.
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::error::SendError;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::Result;
use crate::error::Error;
use crate::message::{Batch, OutgoingItem};
use crate::sinker::actor::FlushMessage;
use crate::sinker::retry::DeliveryStats;

struct PendingState {
    items: Batch,
    last_flush: Instant,
    /// None once the buffer has been drained.
    tx: Option<UnboundedSender<FlushMessage>>,
}

pub(crate) struct BatchBuffer {
    state: Mutex<PendingState>,
    max_batch_size: usize,
    max_batch_interval: Duration,
}

impl BatchBuffer {
    pub(crate) fn new(
        tx: UnboundedSender<FlushMessage>,
        max_batch_size: usize,
        max_batch_interval: Duration,
    ) -> Self {
        Self {
            state: Mutex::new(PendingState {
                items: Vec::with_capacity(max_batch_size),
                last_flush: Instant::now(),
                tx: Some(tx),
            }),
            max_batch_size,
            max_batch_interval,
        }
    }

    /// Adds `item` to the pending sequence and hands the sequence off once it is full. Never waits
    /// for delivery.
    pub(crate) fn append(&self, item: OutgoingItem) -> Result<()> {
        let mut state = self.state.lock();
        if state.tx.is_none() {
            return Err(Error::Forwarder(
                "buffer is drained, no more records are accepted".to_string(),
            ));
        }

        state.items.push(item);
        if state.items.len() >= self.max_batch_size {
            let batch = self.cut(&mut state);
            debug!(records = batch.len(), "Batch size reached, flushing");
            Self::hand_off(&mut state, batch)?;
        }
        Ok(())
    }

    /// Hands off the pending sequence if it is non-empty and the batch interval has elapsed since
    /// the last flush. Returns whether a batch was handed off.
    pub(crate) fn flush_if_due(&self) -> Result<bool> {
        let mut state = self.state.lock();
        if state.tx.is_none()
            || state.items.is_empty()
            || state.last_flush.elapsed() < self.max_batch_interval
        {
            return Ok(false);
        }

        let batch = self.cut(&mut state);
        debug!(records = batch.len(), "Batch interval elapsed, flushing");
        Self::hand_off(&mut state, batch)?;
        Ok(true)
    }

    /// Hands off whatever is pending, closes the buffer and waits until the flush actor has
    /// delivered it. Since the actor works through batches in order, every batch handed off before
    /// has been dealt with by then too. An empty remainder is not submitted.
    pub(crate) async fn drain_all(&self) -> Result<DeliveryStats> {
        let (respond_to, rx) = oneshot::channel();
        {
            let mut state = self.state.lock();
            let batch = self.cut(&mut state);
            let tx = state
                .tx
                .take()
                .ok_or_else(|| Error::Forwarder("buffer is already drained".to_string()))?;
            debug!(records = batch.len(), "Draining buffer");
            if let Err(SendError(msg)) = tx.send(FlushMessage::Drain { batch, respond_to }) {
                let (FlushMessage::Drain { batch, .. } | FlushMessage::Flush { batch }) = msg;
                error!(
                    records = batch.len(),
                    "Flush actor is not running, remaining records are dropped"
                );
                return Err(Error::Forwarder("flush actor is not running".to_string()));
            }
        }

        rx.await
            .map_err(|e| Error::ActorPatternRecv(format!("failed to receive drain result: {e}")))?
    }

    /// Number of items waiting for the next flush.
    pub(crate) fn pending(&self) -> usize {
        self.state.lock().items.len()
    }

    fn cut(&self, state: &mut PendingState) -> Batch {
        state.last_flush = Instant::now();
        std::mem::replace(&mut state.items, Vec::with_capacity(self.max_batch_size))
    }

    /// Sends `batch` to the flush actor. When the actor is gone the batch goes back into the
    /// pending sequence, which is empty right after a cut, so no record is lost.
    fn hand_off(state: &mut PendingState, batch: Batch) -> Result<()> {
        let Some(tx) = state.tx.as_ref() else {
            state.items = batch;
            return Err(Error::Forwarder("buffer is drained".to_string()));
        };
        let Err(SendError(msg)) = tx.send(FlushMessage::Flush { batch }) else {
            return Ok(());
        };
        let (FlushMessage::Flush { batch } | FlushMessage::Drain { batch, .. }) = msg;
        error!(records = batch.len(), "Flush actor is not running, keeping batch buffered");
        state.items = batch;
        Err(Error::Forwarder("flush actor is not running".to_string()))
    }
}
