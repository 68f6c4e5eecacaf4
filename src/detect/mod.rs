//! Primary-key detection for previously unseen CSV files.
//!
//! - [`scorer`] - Scores one column's name and values for key suitability
//! - [`detector`] - Picks the winning column across a parsed upload

pub mod detector;
pub mod scorer;

pub use detector::{detect_primary_key, FALLBACK_KEY_NAMES};
pub use scorer::score_column;
