//! Writes batches of records to a Kinesis Data Stream.
//!
//! Every call maps to exactly one `PutRecords` request. The service answers with one result entry
//! per request entry, in the same order, so [`KinesisSink::put_records`] returns its responses
//! positionally aligned with its input.
use aws_sdk_kinesis::Client;
use aws_sdk_kinesis::primitives::Blob;
use aws_sdk_kinesis::types::{PutRecordsRequestEntry, PutRecordsResultEntry};
use bytes::Bytes;
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::{Error, KINESIS_MAX_PARTITION_KEY_LEN, Result, extract_aws_error};

const GENERATED_PARTITION_KEY_LEN: usize = 16;

/// Configuration for the Kinesis sink.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct KinesisSinkConfig {
    /// Name of the destination stream.
    pub stream_name: String,
    /// AWS region of the stream; resolved through the default provider chain when unset.
    pub region: Option<String>,
    /// Endpoint override, e.g. for localstack.
    pub endpoint_url: Option<String>,
}

/// A single record to be written.
#[derive(Clone, Debug, PartialEq)]
pub struct KinesisRecord {
    pub data: Bytes,
    pub partition_key: String,
}

/// Result of writing a single [`KinesisRecord`].
#[derive(Clone, Debug, PartialEq, Default)]
pub struct KinesisPutResponse {
    pub sequence_number: Option<String>,
    pub shard_id: Option<String>,
    /// Set when the service rejected this record, e.g. `ProvisionedThroughputExceededException`.
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl KinesisPutResponse {
    pub fn is_success(&self) -> bool {
        self.error_code.is_none()
    }
}

impl From<PutRecordsResultEntry> for KinesisPutResponse {
    fn from(entry: PutRecordsResultEntry) -> Self {
        Self {
            sequence_number: entry.sequence_number,
            shard_id: entry.shard_id,
            error_code: entry.error_code,
            error_message: entry.error_message,
        }
    }
}

/// Kinesis sink client, cheap to clone. The destination stream is chosen per call.
#[derive(Clone)]
pub struct KinesisSink {
    client: Client,
}

#[derive(Clone)]
pub struct KinesisSinkBuilder {
    config: KinesisSinkConfig,
    client: Option<Client>,
}

impl KinesisSinkBuilder {
    pub fn new(config: KinesisSinkConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    /// Use a pre-built client instead of creating one from the config.
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    pub async fn build(self) -> Result<KinesisSink> {
        self.config.validate()?;
        let client = match self.client {
            Some(client) => client,
            None => crate::create_kinesis_client(&self.config).await?,
        };

        Ok(KinesisSink { client })
    }
}

impl KinesisSink {
    /// Writes the records with a single `PutRecords` call to `stream_name`.
    ///
    /// Per-record rejections are not errors; they come back as responses carrying an
    /// `error_code`. An `Err` means the call as a whole failed and nothing can be assumed about
    /// which records were written.
    pub async fn put_records(
        &self,
        stream_name: &str,
        records: Vec<KinesisRecord>,
    ) -> Result<Vec<KinesisPutResponse>> {
        let entries = records
            .into_iter()
            .map(|record| {
                PutRecordsRequestEntry::builder()
                    .data(Blob::new(record.data.to_vec()))
                    .partition_key(normalize_partition_key(record.partition_key))
                    .build()
                    .map_err(|e| Error::Other(format!("Failed to build entry: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;
        let sent = entries.len();

        let output = self
            .client
            .put_records()
            .stream_name(stream_name)
            .set_records(Some(entries))
            .send()
            .await
            .map_err(|e| Error::Kinesis(extract_aws_error(&e)))?;

        let failed = output.failed_record_count().unwrap_or_default();
        if failed > 0 {
            tracing::debug!(sent, failed, stream = stream_name, "PutRecords partially failed");
        }

        Ok(output
            .records
            .into_iter()
            .map(KinesisPutResponse::from)
            .collect())
    }
}

/// The service refuses the whole request when any partition key is empty or longer than
/// [`KINESIS_MAX_PARTITION_KEY_LEN`], so empty keys get a random one and long keys are truncated.
fn normalize_partition_key(mut key: String) -> String {
    if key.is_empty() {
        return rand::rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_PARTITION_KEY_LEN)
            .map(char::from)
            .collect();
    }
    if let Some((idx, _)) = key.char_indices().nth(KINESIS_MAX_PARTITION_KEY_LEN) {
        key.truncate(idx);
    }
    key
}

#[cfg(test)]
mod tests {
    use aws_sdk_kinesis::config::{BehaviorVersion, Credentials, Region};
    use aws_sdk_kinesis::operation::put_records::{PutRecordsError, PutRecordsOutput};
    use aws_sdk_kinesis::types::PutRecordsResultEntry;
    use aws_sdk_kinesis::{Client, Config};
    use aws_smithy_mocks::{MockResponseInterceptor, Rule, RuleMode, create_mock_http_client, mock};
    use aws_smithy_types::error::ErrorMetadata;
    use bytes::Bytes;
    use test_log::test;

    use super::*;

    const TEST_STREAM: &str = "test-stream";

    fn records(n: usize) -> Vec<KinesisRecord> {
        (0..n)
            .map(|i| KinesisRecord {
                data: Bytes::from(format!("record-{i}")),
                partition_key: format!("key-{i}"),
            })
            .collect()
    }

    async fn sink_with_rules(rules: &[&Rule]) -> KinesisSink {
        let mut interceptor = MockResponseInterceptor::new().rule_mode(RuleMode::MatchAny);
        for rule in rules {
            interceptor = interceptor.with_rule(rule);
        }
        KinesisSinkBuilder::new(KinesisSinkConfig {
            stream_name: TEST_STREAM.to_string(),
            region: Some("us-west-2".to_string()),
            endpoint_url: None,
        })
        .client(Client::from_conf(test_config(interceptor)))
        .build()
        .await
        .unwrap()
    }

    #[test(tokio::test)]
    async fn test_builder_rejects_empty_stream() {
        let result = KinesisSinkBuilder::new(KinesisSinkConfig::default())
            .build()
            .await;
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test(tokio::test)]
    async fn test_put_records_all_accepted() {
        let rule = mock!(aws_sdk_kinesis::Client::put_records)
            .match_requests(|inp| {
                inp.stream_name() == Some(TEST_STREAM)
                    && inp.records().len() == 2
                    && inp.records()[0].partition_key() == Some("key-0")
                    && inp.records()[1].partition_key() == Some("key-1")
            })
            .then_output(|| {
                PutRecordsOutput::builder()
                    .failed_record_count(0)
                    .set_records(Some(vec![
                        PutRecordsResultEntry::builder()
                            .sequence_number("1")
                            .shard_id("shardId-000000000000")
                            .build(),
                        PutRecordsResultEntry::builder()
                            .sequence_number("2")
                            .shard_id("shardId-000000000000")
                            .build(),
                    ]))
                    .build()
                    .unwrap()
            });

        let sink = sink_with_rules(&[&rule]).await;
        let responses = sink.put_records(TEST_STREAM, records(2)).await.unwrap();

        assert_eq!(responses.len(), 2);
        assert!(responses.iter().all(KinesisPutResponse::is_success));
        assert_eq!(responses[1].sequence_number.as_deref(), Some("2"));
    }

    #[test(tokio::test)]
    async fn test_put_records_targets_stream_of_the_call() {
        let rule = mock!(aws_sdk_kinesis::Client::put_records)
            .match_requests(|inp| inp.stream_name() == Some("audit-stream"))
            .then_output(|| {
                PutRecordsOutput::builder()
                    .set_records(Some(vec![
                        PutRecordsResultEntry::builder()
                            .sequence_number("7")
                            .shard_id("shardId-000000000000")
                            .build(),
                    ]))
                    .build()
                    .unwrap()
            });

        // built for TEST_STREAM, written to another stream; only a matching request gets output
        let sink = sink_with_rules(&[&rule]).await;
        let responses = sink.put_records("audit-stream", records(1)).await.unwrap();

        assert_eq!(responses[0].sequence_number.as_deref(), Some("7"));
    }

    #[test(tokio::test)]
    async fn test_put_records_partial_failure_keeps_order() {
        let rule = mock!(aws_sdk_kinesis::Client::put_records).then_output(|| {
            PutRecordsOutput::builder()
                .failed_record_count(1)
                .set_records(Some(vec![
                    PutRecordsResultEntry::builder()
                        .sequence_number("1")
                        .shard_id("shardId-000000000000")
                        .build(),
                    PutRecordsResultEntry::builder()
                        .error_code("ProvisionedThroughputExceededException")
                        .error_message("Rate exceeded for shard shardId-000000000000")
                        .build(),
                    PutRecordsResultEntry::builder()
                        .sequence_number("3")
                        .shard_id("shardId-000000000001")
                        .build(),
                ]))
                .build()
                .unwrap()
        });

        let sink = sink_with_rules(&[&rule]).await;
        let responses = sink.put_records(TEST_STREAM, records(3)).await.unwrap();

        assert_eq!(responses.len(), 3);
        assert!(responses[0].is_success());
        assert!(!responses[1].is_success());
        assert_eq!(
            responses[1].error_code.as_deref(),
            Some("ProvisionedThroughputExceededException")
        );
        assert!(responses[2].is_success());
    }

    #[test(tokio::test)]
    async fn test_put_records_call_failure() {
        let rule = mock!(aws_sdk_kinesis::Client::put_records).then_error(|| {
            PutRecordsError::generic(
                ErrorMetadata::builder()
                    .code("ResourceNotFoundException")
                    .message("Stream test-stream not found")
                    .build(),
            )
        });

        let sink = sink_with_rules(&[&rule]).await;
        let err = sink.put_records(TEST_STREAM, records(1)).await.unwrap_err();

        assert!(matches!(err, Error::Kinesis(_)));
        assert!(err.to_string().contains("ResourceNotFoundException"));
    }

    #[test]
    fn test_normalize_partition_key() {
        assert_eq!(normalize_partition_key("user-1".to_string()), "user-1");

        let generated = normalize_partition_key(String::new());
        assert_eq!(generated.len(), GENERATED_PARTITION_KEY_LEN);
        assert!(generated.chars().all(|c| c.is_ascii_alphanumeric()));

        let long = "é".repeat(300);
        let truncated = normalize_partition_key(long);
        assert_eq!(truncated.chars().count(), KINESIS_MAX_PARTITION_KEY_LEN);
    }

    fn test_config(interceptor: MockResponseInterceptor) -> Config {
        aws_sdk_kinesis::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .credentials_provider(Credentials::new(
                "ATESTCLIENT",
                "astestsecretkey",
                Some("atestsessiontoken".to_string()),
                None,
                "",
            ))
            .region(Region::new("us-west-2"))
            .interceptor(interceptor)
            .http_client(create_mock_http_client())
            .build()
    }
}
