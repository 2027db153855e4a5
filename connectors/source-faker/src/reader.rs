//! Stream reads: full refresh and cursor-resumed incremental.

use std::cmp::Ordering;

use shift_sdk::prelude::*;
use shift_sdk::types::state::compare_cursors;

use crate::config::Config;
use crate::generator::Generator;
use crate::schema::FakerStream;

/// Emit every row of `configured` past the resume cursor held in `state`.
/// Returns the number of records emitted.
pub async fn read_stream(
    config: &Config,
    configured: &ConfiguredStream,
    state: &State,
    emitter: &ReadEmitter,
) -> Result<u64, ConnectorError> {
    let descriptor = configured.descriptor();
    let kind = FakerStream::from_name(&descriptor.name)
        .filter(|_| descriptor.namespace.is_none())
        .ok_or_else(|| {
            ConnectorError::config(
                "UNKNOWN_STREAM",
                format!("Stream '{descriptor}' is not provided by source-faker"),
            )
        })?;

    // Both cursors grow with the row number, so the last row's value is
    // also the largest seen.
    let cursor_field = configured.incremental_cursor();
    if let Some(field) = cursor_field {
        if field != kind.default_cursor() {
            return Err(ConnectorError::config(
                "INVALID_CURSOR",
                format!(
                    "Stream '{descriptor}' uses the source-defined cursor '{}', not '{field}'",
                    kind.default_cursor()
                ),
            ));
        }
    }
    let resume = cursor_field
        .and_then(|_| state.cursor(&descriptor))
        .filter(|cursor| !cursor.is_null());

    let total = match kind {
        FakerStream::Users => config.count,
        FakerStream::Purchases => config.purchase_count(),
    };
    let generator = Generator::new(config.seed, config.count);
    let mut emitted = 0u64;
    let mut last_cursor = None;

    for n in 0..total {
        let row = generator.row(kind, n);
        if let (Some(field), Some(after)) = (cursor_field, resume) {
            let past_resume = row
                .get(field)
                .and_then(|value| compare_cursors(value, after))
                == Some(Ordering::Greater);
            if !past_resume {
                continue;
            }
        }
        if let Some(field) = cursor_field {
            last_cursor = row.get(field).cloned();
        }

        emitter.record(Record::new(&descriptor, row)).await?;
        emitted += 1;

        if emitted % config.records_per_state == 0 {
            if let (Some(field), Some(cursor)) = (cursor_field, &last_cursor) {
                emitter
                    .state(descriptor.clone(), Some(field), cursor.clone())
                    .await?;
            }
        }
    }

    if let (Some(field), Some(cursor)) = (cursor_field, last_cursor) {
        emitter.state(descriptor, Some(field), cursor).await?;
    }
    Ok(emitted)
}
