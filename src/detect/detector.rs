//! Primary-key column selection.

use crate::detect::scorer::score_column;
use crate::error::{Error, Result};
use crate::ingest::ParsedRecord;
use tracing::debug;

/// Header names tried, in priority order, when an upload has no data rows.
pub const FALLBACK_KEY_NAMES: &[&str] = &["id", "row_id", "pk", "primary_key"];

/// Penalty per column position, favoring earlier columns on close scores.
const POSITION_PENALTY: f64 = 0.1;

/// Pick the primary-key column of an upload.
///
/// With no records, the first header matching (case-insensitively)
/// `id`, `row_id`, `pk`, `primary_key` wins, else the first header.
/// Otherwise every column is scored and the first to reach the maximum
/// wins; equal scores never displace an earlier column.
///
/// # Errors
///
/// Returns `InvalidFormat` if `headers` is empty.
#[allow(clippy::cast_precision_loss)]
pub fn detect_primary_key(headers: &[String], records: &[ParsedRecord]) -> Result<String> {
    let Some(first) = headers.first() else {
        return Err(Error::InvalidFormat("missing header row".to_string()));
    };

    if records.is_empty() {
        let by_name = FALLBACK_KEY_NAMES.iter().find_map(|candidate| {
            headers
                .iter()
                .find(|h| h.trim().eq_ignore_ascii_case(candidate))
        });
        return Ok(by_name.unwrap_or(first).clone());
    }

    let mut best: Option<(&String, f64)> = None;
    for (index, column) in headers.iter().enumerate() {
        let values = records.iter().map(|r| r.get(column));
        let score = score_column(column, values, records.len()) - index as f64 * POSITION_PENALTY;
        debug!(column = %column, score, "Scored key candidate");

        if best.is_none_or(|(_, top)| score > top) {
            best = Some((column, score));
        }
    }

    Ok(best.map_or(first, |(column, _)| column).clone())
}
