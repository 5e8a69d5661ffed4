//! Newline-delimited JSON input. Every non-blank line must be a JSON object and becomes one
//! [Record]; lines that are not are logged and skipped.
use forwarder_core::{Error, ForwarderHandle, Record, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SourceStats {
    pub(crate) records: usize,
    pub(crate) skipped: usize,
}

/// Reads `reader` line by line into the forwarder until end of input or cancellation.
pub(crate) async fn forward_lines<R>(
    reader: R,
    handle: ForwarderHandle,
    cancel: CancellationToken,
) -> Result<SourceStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = SourceStats::default();

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Stopped reading input");
                break;
            }
            line = lines.next_line() => line
                .map_err(|e| Error::Forwarder(format!("failed to read input: {e}")))?,
        };
        let Some(line) = line else {
            info!("End of input");
            break;
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Record::try_from(line.as_bytes()) {
            Ok(record) => {
                handle.receive(record)?;
                stats.records += 1;
            }
            Err(e) => {
                warn!(?e, line_len = line.len(), "Skipping malformed input line");
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use forwarder_core::{Forwarder, OutcomePage, OutgoingItem, Settings, SubmitOutcome, Submitter};
    use parking_lot::Mutex;
    use test_log::test;
    use tokio::io::BufReader;

    use super::*;

    #[derive(Clone, Default)]
    struct CollectingStream {
        items: Arc<Mutex<Vec<OutgoingItem>>>,
    }

    impl Submitter for CollectingStream {
        async fn submit(
            &mut self,
            _stream_name: &str,
            items: &[OutgoingItem],
        ) -> Result<Vec<OutcomePage>> {
            self.items.lock().extend_from_slice(items);
            Ok(vec![vec![SubmitOutcome::Accepted; items.len()]])
        }
    }

    fn start(stream: CollectingStream) -> Forwarder {
        let mut settings = Settings::new("events");
        settings.batch.max_batch_size = 2;
        settings.batch.max_batch_interval = Duration::from_secs(60);
        Forwarder::start(&settings, stream).unwrap()
    }

    #[test(tokio::test)]
    async fn test_forward_lines_skips_malformed_input() {
        let input = concat!(
            "{\"id\": 1, \"v\": \"a\"}\n",
            "\n",
            "not json\n",
            "[1, 2]\n",
            "  {\"partition_key\": \"p\", \"id\": 2}  \n",
            "{\"id\": 3}",
        );
        let stream = CollectingStream::default();
        let forwarder = start(stream.clone());

        let stats = forward_lines(
            BufReader::new(input.as_bytes()),
            forwarder.handle(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
        forwarder.shutdown().await.unwrap();

        assert_eq!(
            stats,
            SourceStats {
                records: 3,
                skipped: 2
            }
        );
        let keys: Vec<String> = stream
            .items
            .lock()
            .iter()
            .map(|item| item.partition_key.clone())
            .collect();
        assert_eq!(keys, vec!["1", "p", "3"]);
    }

    #[test(tokio::test)]
    async fn test_forward_lines_stops_on_cancel() {
        let stream = CollectingStream::default();
        let forwarder = start(stream.clone());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stats = forward_lines(
            BufReader::new("{\"id\": 1}\n".as_bytes()),
            forwarder.handle(),
            cancel,
        )
        .await
        .unwrap();
        forwarder.shutdown().await.unwrap();

        assert_eq!(stats, SourceStats::default());
        assert!(stream.items.lock().is_empty());
    }
}
