//! Error types for the csvn CLI.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=db, 3=not_found, 4=validation, etc.)
//! - HTTP status mapping for an outer API layer (400/404/500)
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for csvn operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string, a category-based
/// exit code and an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    ImportNotFound,
    RowNotFound,
    NoteNotFound,

    // Validation (exit 4)
    InvalidFormat,
    InvalidStatus,
    InvalidArgument,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
    CsvError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ImportNotFound => "IMPORT_NOT_FOUND",
            Self::RowNotFound => "ROW_NOT_FOUND",
            Self::NoteNotFound => "NOTE_NOT_FOUND",
            Self::InvalidFormat => "INVALID_FORMAT",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::CsvError => "CSV_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::ImportNotFound | Self::RowNotFound | Self::NoteNotFound => 3,
            Self::InvalidFormat | Self::InvalidStatus | Self::InvalidArgument => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::CsvError => 8,
        }
    }

    /// HTTP status an API layer should answer with.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidFormat | Self::InvalidStatus | Self::InvalidArgument => 400,
            Self::ImportNotFound | Self::RowNotFound | Self::NoteNotFound => 404,
            Self::NotInitialized
            | Self::AlreadyInitialized
            | Self::DatabaseError
            | Self::ConfigError
            | Self::IoError
            | Self::JsonError
            | Self::CsvError
            | Self::InternalError => 500,
        }
    }

    /// Whether the caller should retry with corrected input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::InvalidFormat | Self::InvalidStatus | Self::InvalidArgument | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in csvn operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `csvn init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Import not found: {id}")]
    ImportNotFound { id: i64 },

    #[error("Row not found: {id}")]
    RowNotFound { id: String },

    #[error("Note not found: {id}")]
    NoteNotFound { id: i64 },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Invalid status: {value}")]
    InvalidStatus {
        value: String,
        /// Closest canonical status, if any is near enough to suggest.
        suggestion: Option<String>,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::ImportNotFound { .. } => ErrorCode::ImportNotFound,
            Self::RowNotFound { .. } => ErrorCode::RowNotFound,
            Self::NoteNotFound { .. } => ErrorCode::NoteNotFound,
            Self::InvalidFormat(_) => ErrorCode::InvalidFormat,
            Self::InvalidStatus { .. } => ErrorCode::InvalidStatus,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Csv(_) => ErrorCode::CsvError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// HTTP status, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.error_code().http_status()
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => {
                Some("Run `csvn init` to initialize the database".to_string())
            }

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::ImportNotFound { id } => Some(format!(
                "No import with ID {id}. Use `csvn imports list` to see available imports."
            )),

            Self::RowNotFound { id } => Some(format!(
                "No row with internal ID or primary key '{id}'. \
                 Use `csvn imports rows <import-id>` to browse imported rows."
            )),

            Self::NoteNotFound { id } => Some(format!(
                "No active note with ID {id}. Use `csvn note list` to see notes."
            )),

            Self::InvalidStatus { suggestion, .. } => {
                let valid = "Valid statuses: Open, In Progress, Resolved, Closed";
                Some(match suggestion {
                    Some(s) => format!("Did you mean: {s}? {valid}"),
                    None => valid.to_string(),
                })
            }

            Self::InvalidFormat(msg) => {
                if msg.contains("header") {
                    Some("The first line of the file must name the columns".to_string())
                } else {
                    None
                }
            }

            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Csv(_)
            | Self::Config(_)
            | Self::InvalidArgument(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, HTTP status
    /// and optional recovery hint.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "success": false,
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
                "status": code.http_status(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
