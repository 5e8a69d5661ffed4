use serde_json::Value;
use tracing::debug;

use crate::message::Record;

/// Picks the partition key for a record: the value of the first field in `candidates` that is
/// present and non-empty once coerced to a string. Returns an empty string when nothing matches.
pub fn select_partition_key(record: &Record, candidates: &[String]) -> String {
    for field in candidates {
        let Some(value) = record.get(field) else {
            continue;
        };
        let key = coerce_to_string(value);
        if !key.is_empty() {
            debug!(field = %field, "Selected partition key field");
            return key;
        }
    }
    debug!(?candidates, "No partition key field matched");
    String::new()
}

fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // compact JSON for arrays and objects
        other => other.to_string(),
    }
}
