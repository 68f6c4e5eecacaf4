//! Note and tag models.
//!
//! Notes annotate a persistent row independently of any import. Their
//! text, status and tags are mutable; deletion only flips `is_deleted`.

use serde::{Deserialize, Serialize};

/// Note status values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteStatus {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Resolved,
    Closed,
}

impl NoteStatus {
    /// Every canonical status, in workflow order.
    pub const ALL: [Self; 4] = [Self::Open, Self::InProgress, Self::Resolved, Self::Closed];

    /// Get the string representation for storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In Progress",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
        }
    }

    /// Parse a stored value. Unknown values read back as `Open`.
    #[must_use]
    pub fn from_stored(s: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .unwrap_or_default()
    }
}

impl std::fmt::Display for NoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A note attached to a persistent row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    /// Internal note id
    pub id: i64,

    /// Row the note is attached to
    pub row_id: i64,

    /// Primary-key value of that row, for display
    pub primary_key_value: String,

    pub text: String,

    pub status: NoteStatus,

    /// Tag names, alphabetical
    pub tags: Vec<String>,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,

    pub is_deleted: bool,
}

/// A shared tag. Names are unique case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub created_at: i64,
}

/// Partial update for a note. `None` leaves a field untouched;
/// `tags: Some(vec![])` clears every tag link.
#[derive(Debug, Clone, Default)]
pub struct NoteUpdate {
    pub text: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NoteUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.status.is_none() && self.tags.is_none()
    }
}
