use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;
use crate::error::Error;
use crate::partition::select_partition_key;

/// An upstream event: an opaque mapping of field names to values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: Map<String, Value>,
}

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// The payload written to the stream, the record encoded as JSON.
    pub fn to_payload(&self) -> Result<Bytes> {
        serde_json::to_vec(&self.fields)
            .map(Bytes::from)
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self::new(fields)
    }
}

impl TryFrom<&[u8]> for Record {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        serde_json::from_slice(value).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// What actually goes over the wire for one [`Record`]. Never mutated once created.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingItem {
    pub payload: Bytes,
    pub partition_key: String,
}

impl OutgoingItem {
    pub fn new(payload: impl Into<Bytes>, partition_key: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            partition_key: partition_key.into(),
        }
    }

    pub fn from_record(record: &Record, partition_key_fields: &[String]) -> Result<Self> {
        Ok(Self {
            payload: record.to_payload()?,
            partition_key: select_partition_key(record, partition_key_fields),
        })
    }
}

/// Ordered group of items submitted together. Position `i` of a batch lines up with position `i`
/// of the outcomes returned for it.
pub type Batch = Vec<OutgoingItem>;
