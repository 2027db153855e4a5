//! Resumable per-stream cursor state.
//!
//! [`State`] maps a [`StreamDescriptor`] to the last position that has been
//! durably processed. Cursors are opaque JSON values; [`State::advance`]
//! only ever moves a cursor forward.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::StreamDescriptor;

/// Order two cursor values.
///
/// Numbers compare numerically, strings lexicographically (so ISO-8601
/// timestamps order correctly), booleans `false < true`, and `null` precedes
/// every other value. Arrays and objects are only comparable for equality.
#[must_use]
pub fn compare_cursors(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                Some(x.cmp(&y))
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                Some(x.cmp(&y))
            } else {
                x.as_f64()?.partial_cmp(&y.as_f64()?)
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ if a == b => Some(Ordering::Equal),
        _ => None,
    }
}

fn same_kind(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

/// A cursor update that would move a stream backwards.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cursor for stream '{stream}' would regress from {held} to {proposed}")]
pub struct StateRegression {
    pub stream: StreamDescriptor,
    pub held: Value,
    pub proposed: Value,
}

/// Outcome of a successful [`State::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The cursor moved (or the stream had no cursor yet).
    Advanced,
    /// The proposed cursor equals the held one.
    Unchanged,
}

/// Cursor position for one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamState {
    pub stream: StreamDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor_field: Option<String>,
    pub cursor: Value,
}

/// Per-stream cursor positions, in first-seen stream order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(default)]
    pub streams: Vec<StreamState>,
}

impl State {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    #[must_use]
    pub fn get(&self, stream: &StreamDescriptor) -> Option<&StreamState> {
        self.streams.iter().find(|s| s.stream == *stream)
    }

    #[must_use]
    pub fn cursor(&self, stream: &StreamDescriptor) -> Option<&Value> {
        self.get(stream).map(|s| &s.cursor)
    }

    /// Move the cursor for `stream` to `cursor`, refusing to go backwards.
    ///
    /// A cursor that is incomparable with the held one (e.g. an opaque
    /// object) replaces it only when both are the same JSON kind.
    ///
    /// # Errors
    ///
    /// Returns [`StateRegression`] when `cursor` orders before the held
    /// cursor, or is incomparable and of a different kind.
    pub fn advance(
        &mut self,
        stream: &StreamDescriptor,
        cursor_field: Option<&str>,
        cursor: Value,
    ) -> Result<Advance, StateRegression> {
        let Some(index) = self.streams.iter().position(|s| s.stream == *stream) else {
            self.streams.push(StreamState {
                stream: stream.clone(),
                cursor_field: cursor_field.map(str::to_string),
                cursor,
            });
            return Ok(Advance::Advanced);
        };
        let entry = &mut self.streams[index];

        let forward = match compare_cursors(&entry.cursor, &cursor) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => return Ok(Advance::Unchanged),
            Some(Ordering::Greater) => false,
            None => same_kind(&entry.cursor, &cursor),
        };
        if !forward {
            return Err(StateRegression {
                stream: stream.clone(),
                held: entry.cursor.clone(),
                proposed: cursor,
            });
        }

        entry.cursor = cursor;
        if let Some(field) = cursor_field {
            entry.cursor_field = Some(field.to_string());
        }
        Ok(Advance::Advanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> StreamDescriptor {
        StreamDescriptor::new("users")
    }

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(compare_cursors(&json!(9), &json!(10)), Some(Ordering::Less));
        assert_eq!(
            compare_cursors(&json!(1.5), &json!(1)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            compare_cursors(&json!(u64::MAX), &json!(1)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn timestamps_compare_lexicographically() {
        assert_eq!(
            compare_cursors(&json!("2026-01-15T10:00:00Z"), &json!("2026-02-01T00:00:00Z")),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn null_precedes_everything() {
        assert_eq!(compare_cursors(&Value::Null, &json!(0)), Some(Ordering::Less));
        assert_eq!(compare_cursors(&json!("a"), &Value::Null), Some(Ordering::Greater));
    }

    #[test]
    fn mixed_kinds_are_incomparable() {
        assert_eq!(compare_cursors(&json!(1), &json!("1")), None);
        assert_eq!(compare_cursors(&json!({"a": 1}), &json!({"a": 2})), None);
        assert_eq!(
            compare_cursors(&json!({"a": 1}), &json!({"a": 1})),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn advance_inserts_then_moves_forward() {
        let mut state = State::default();
        assert_eq!(
            state.advance(&users(), Some("id"), json!(5)),
            Ok(Advance::Advanced)
        );
        assert_eq!(state.advance(&users(), None, json!(5)), Ok(Advance::Unchanged));
        assert_eq!(state.advance(&users(), None, json!(7)), Ok(Advance::Advanced));
        let entry = state.get(&users()).unwrap();
        assert_eq!(entry.cursor, json!(7));
        assert_eq!(entry.cursor_field.as_deref(), Some("id"));
    }

    #[test]
    fn advance_rejects_regression() {
        let mut state = State::default();
        state.advance(&users(), Some("id"), json!(10)).unwrap();
        let err = state.advance(&users(), None, json!(3)).unwrap_err();
        assert_eq!(err.held, json!(10));
        assert_eq!(err.proposed, json!(3));
        assert_eq!(state.cursor(&users()), Some(&json!(10)));
    }

    #[test]
    fn opaque_cursors_replace_when_kinds_match() {
        let mut state = State::default();
        state.advance(&users(), None, json!({"lsn": "0/1"})).unwrap();
        assert_eq!(
            state.advance(&users(), None, json!({"lsn": "0/2"})),
            Ok(Advance::Advanced)
        );
        assert!(state.advance(&users(), None, json!(["x"])).is_err());
    }

    #[test]
    fn wire_shape() {
        let mut state = State::default();
        state
            .advance(
                &StreamDescriptor::new("orders").with_namespace("shop"),
                Some("updated_at"),
                json!("2026-01-01"),
            )
            .unwrap();
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(
            value,
            json!({"streams": [{
                "stream": {"name": "orders", "namespace": "shop"},
                "cursor_field": "updated_at",
                "cursor": "2026-01-01"
            }]})
        );
        let empty: State = serde_json::from_str("{}").unwrap();
        assert!(empty.is_empty());
    }
}
