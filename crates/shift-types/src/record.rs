//! In-flight data records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::catalog::StreamDescriptor;

/// One data item moving between a connector and the runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub stream: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Milliseconds since the Unix epoch at which the record was produced.
    pub emitted_at: i64,
    pub data: Map<String, Value>,
}

impl Record {
    /// Build a record for `stream`, stamped with the current time.
    #[must_use]
    pub fn new(stream: &StreamDescriptor, data: Map<String, Value>) -> Self {
        Self {
            stream: stream.name.clone(),
            namespace: stream.namespace.clone(),
            emitted_at: chrono::Utc::now().timestamp_millis(),
            data,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> StreamDescriptor {
        StreamDescriptor {
            name: self.stream.clone(),
            namespace: self.namespace.clone(),
        }
    }

    /// Top-level field of the payload.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_stamps_stream_and_time() {
        let descriptor = StreamDescriptor::new("users").with_namespace("public");
        let data = json!({"id": 1}).as_object().cloned().unwrap();
        let before = chrono::Utc::now().timestamp_millis();
        let record = Record::new(&descriptor, data);
        assert_eq!(record.descriptor(), descriptor);
        assert!(record.emitted_at >= before);
        assert_eq!(record.field("id"), Some(&json!(1)));
        assert_eq!(record.field("missing"), None);
    }

    #[test]
    fn nested_payload_survives_serde() {
        let raw = r#"{"stream":"events","emitted_at":1,"data":{"z":1,"a":{"deep":[1,{"x":null}]},"m":"s"}}"#;
        let record: Record = serde_json::from_str(raw).unwrap();
        assert!(record.namespace.is_none());
        // Key order is preserved, so re-encoding is byte-identical.
        assert_eq!(serde_json::to_string(&record).unwrap(), raw);
    }
}
