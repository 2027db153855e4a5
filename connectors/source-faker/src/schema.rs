//! Streams exposed by the faker and their JSON schemas.

use serde_json::json;
use shift_sdk::prelude::{Stream, SyncMode};

pub const USERS: &str = "users";
pub const PURCHASES: &str = "purchases";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakerStream {
    Users,
    Purchases,
}

impl FakerStream {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            USERS => Some(Self::Users),
            PURCHASES => Some(Self::Purchases),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Users => USERS,
            Self::Purchases => PURCHASES,
        }
    }

    pub fn stream(self) -> Stream {
        let json_schema = match self {
            Self::Users => json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer"},
                    "name": {"type": "string"},
                    "email": {"type": "string"},
                    "age": {"type": "integer"},
                    "created_at": {"type": "string", "format": "date-time"},
                    "updated_at": {"type": "string", "format": "date-time"}
                }
            }),
            Self::Purchases => json!({
                "type": "object",
                "properties": {
                    "id": {"type": "integer"},
                    "user_id": {"type": "integer"},
                    "product": {"type": "string"},
                    "amount_cents": {"type": "integer"},
                    "purchased_at": {"type": "string", "format": "date-time"}
                }
            }),
        };
        let mut stream = Stream::new(self.name(), json_schema);
        stream.supported_sync_modes.push(SyncMode::Incremental);
        stream.source_defined_cursor = true;
        stream.default_cursor_field = Some(self.default_cursor().to_string());
        stream.source_defined_primary_key = Some(vec!["id".to_string()]);
        stream
    }

    /// Cursor used when a caller does not pick one. Both fields grow with `id`.
    pub fn default_cursor(self) -> &'static str {
        match self {
            Self::Users => "updated_at",
            Self::Purchases => "id",
        }
    }
}

pub fn all_streams() -> Vec<Stream> {
    vec![FakerStream::Users.stream(), FakerStream::Purchases.stream()]
}
