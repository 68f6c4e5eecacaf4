//! Input validation for note annotations.
//!
//! Status values are normalized by trimming and title-casing each word,
//! then checked against the four canonical statuses. Tags are trimmed and
//! deduplicated case-insensitively.

use crate::error::{Error, Result};
use crate::model::NoteStatus;
use std::collections::HashSet;

/// Title-case every whitespace-separated word and collapse inner runs of
/// whitespace to a single space.
fn title_case(input: &str) -> String {
    input
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a status string to its canonical form.
///
/// `"  resolved "` becomes `Resolved`; anything that does not name one of
/// the canonical statuses fails with `InvalidStatus`, carrying the closest
/// canonical value when one is within edit distance 3.
pub fn normalize_status(input: &str) -> Result<NoteStatus> {
    let candidate = title_case(input);

    if let Some(status) = NoteStatus::ALL.into_iter().find(|s| s.as_str() == candidate) {
        return Ok(status);
    }

    let suggestion = find_closest_status(&candidate);
    Err(Error::InvalidStatus {
        value: input.to_string(),
        suggestion,
    })
}

fn find_closest_status(input: &str) -> Option<String> {
    let lower = input.to_lowercase();
    NoteStatus::ALL
        .into_iter()
        .map(|s| (levenshtein_distance(&lower, &s.as_str().to_lowercase()), s))
        .filter(|(dist, _)| *dist <= 3)
        .min_by_key(|(dist, _)| *dist)
        .map(|(_, s)| s.as_str().to_string())
}

/// Trim tag names, drop blanks, and deduplicate case-insensitively.
///
/// The first spelling of each tag wins and input order is preserved.
#[must_use]
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .map(ToString::to_string)
        .collect()
}

/// Reject note text that is empty after trimming.
pub fn require_text(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(Error::InvalidArgument("note text must not be empty".to_string()));
    }
    Ok(())
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
#[must_use]
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let a_len = a.len();
    let b_len = b.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    // Use single-row optimization (O(min(m,n)) space)
    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for i in 1..=a_len {
        curr[0] = i;
        for j in 1..=b_len {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}
