use forwarder_kinesis::sink::{KinesisPutResponse, KinesisRecord, KinesisSink};

use crate::Result;
use crate::message::OutgoingItem;
use crate::sinker::submit::{OutcomePage, SubmitOutcome, Submitter};

impl From<&OutgoingItem> for KinesisRecord {
    fn from(item: &OutgoingItem) -> Self {
        KinesisRecord {
            data: item.payload.clone(),
            partition_key: item.partition_key.clone(),
        }
    }
}

impl From<KinesisPutResponse> for SubmitOutcome {
    fn from(response: KinesisPutResponse) -> Self {
        match response.error_code {
            None => SubmitOutcome::Accepted,
            Some(error_code) => SubmitOutcome::Rejected {
                error_code,
                error_message: response.error_message.unwrap_or_default(),
            },
        }
    }
}

impl Submitter for KinesisSink {
    async fn submit(
        &mut self,
        stream_name: &str,
        items: &[OutgoingItem],
    ) -> Result<Vec<OutcomePage>> {
        let records = items.iter().map(KinesisRecord::from).collect();
        let responses = self.put_records(stream_name, records).await?;
        // PutRecords does not paginate, the whole response is a single page.
        Ok(vec![responses.into_iter().map(SubmitOutcome::from).collect()])
    }
}
