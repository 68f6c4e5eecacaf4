//! Column scoring for primary-key suitability.
//!
//! A column's score combines a name hint, value coverage, uniqueness and a
//! small length tie-break. Pure and deterministic.

use std::collections::{HashMap, HashSet};

/// Exact-match name hints (lower-cased, trimmed) and their base scores.
const NAME_HINTS: &[(&str, f64)] = &[
    ("id", 5.0),
    ("row_id", 4.0),
    ("primary_key", 4.0),
    ("primarykey", 4.0),
    ("pk", 3.0),
    ("record_id", 3.0),
    ("uuid", 3.0),
    ("key", 2.0),
];

const COVERAGE_WEIGHT: f64 = 3.0;
const UNIQUE_BONUS: f64 = 5.0;
const MAX_DUPLICATE_PENALTY: usize = 5;
const MAX_LENGTH_BONUS: f64 = 2.0;

fn name_hint(normalized: &str) -> f64 {
    NAME_HINTS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map_or(0.0, |(_, score)| *score)
}

/// Score a column for use as the primary key.
///
/// `values` are the raw cells of the column across every record, `None`
/// standing for a missing cell. Returns negative infinity for a blank
/// column name.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn score_column<'a, I>(column_name: &str, values: I, total_rows: usize) -> f64
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let normalized = column_name.trim().to_lowercase();
    if normalized.is_empty() {
        return f64::NEG_INFINITY;
    }

    let mut score = name_hint(&normalized);

    let mut non_empty = 0usize;
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut has_duplicates = false;
    for value in values.into_iter().flatten() {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            continue;
        }
        non_empty += 1;
        let count = counts.entry(trimmed).or_insert(0);
        *count += 1;
        if *count > 1 {
            has_duplicates = true;
        }
    }

    if total_rows > 0 && non_empty > 0 {
        score += (non_empty as f64 / total_rows as f64) * COVERAGE_WEIGHT;
    } else if non_empty > 0 {
        score += 1.0;
    }

    if has_duplicates {
        let excess: usize = counts.values().filter(|c| **c > 1).map(|c| c - 1).sum();
        score -= excess.min(MAX_DUPLICATE_PENALTY) as f64;
    } else {
        score += UNIQUE_BONUS;
    }

    let distinct: HashSet<&str> = counts.keys().copied().collect();
    if !distinct.is_empty() {
        let total_len: usize = distinct.iter().map(|v| v.chars().count()).sum();
        let average = total_len as f64 / distinct.len() as f64;
        score += (average / 10.0).min(MAX_LENGTH_BONUS);
    }

    score
}
