//! Thin client for writing record batches to an AWS Kinesis Data Stream with `PutRecords`.
//!
//! The crate only speaks the wire call. It performs no retrying of its own; per-record
//! rejections are returned to the caller next to the accepted ones, in request order, and a
//! failure of the call itself is returned as an [`Error`].
use aws_sdk_kinesis::error::{ProvideErrorMetadata, SdkError};

pub mod client;
pub mod sink;

pub use client::create_kinesis_client;

/// Hard cap on records per `PutRecords` request imposed by the service.
pub const KINESIS_MAX_BATCH_SIZE: usize = 500;

/// Maximum partition key length, in unicode scalar values, accepted by the service.
pub const KINESIS_MAX_PARTITION_KEY_LEN: usize = 256;

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("Failed with Kinesis error - {0}")]
    Kinesis(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = core::result::Result<T, Error>;

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

/// Flattens an SDK error into `code: message`, falling back to the error's display form when the
/// service did not send any metadata (timeouts, dispatch failures).
pub(crate) fn extract_aws_error<E, R>(err: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata,
{
    match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        (None, Some(message)) => message.to_string(),
        (None, None) => err.to_string(),
    }
}
