//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// csvn - Track CSV imports over time and annotate rows with notes
#[derive(Parser, Debug)]
#[command(name = "csvn", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.csvnotes/data/csvnotes.db)
    #[arg(long, global = true, env = "CSVN_DB")]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "CSVN_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Output only the ID (for scripting)
    #[arg(long, global = true)]
    pub silent: bool,

    /// Preview changes without writing to the database
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the csvn database
    Init {
        /// Overwrite existing database
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Import a CSV file
    Import(ImportArgs),

    /// Browse the import ledger
    Imports {
        #[command(subcommand)]
        command: ImportsCommands,
    },

    /// Notes on rows
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },

    /// Tags shared by notes
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },

    /// Persistent row identities
    Row {
        #[command(subcommand)]
        command: RowCommands,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Import Commands
// ============================================================================

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// CSV file to import (`-` reads stdin)
    pub file: PathBuf,

    /// Filename recorded in the ledger (default: the file's name)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ImportsCommands {
    /// List imports, newest first
    List,

    /// Show the rows of one import with their notes
    Rows {
        /// Import ID
        id: i64,
    },
}

// ============================================================================
// Note Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum NoteCommands {
    /// Attach a note to a row
    Create(NoteCreateArgs),

    /// List all notes, newest first
    List,

    /// List the notes on one row
    ByRow {
        /// Row ID or primary-key value
        row: String,
    },

    /// Update a note
    Update(NoteUpdateArgs),

    /// Delete a note (soft delete)
    Delete {
        /// Note ID
        id: i64,
    },

    /// Show the audit trail of a note
    History {
        /// Note ID
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct NoteCreateArgs {
    /// Row ID or primary-key value (unknown keys create an orphan row)
    pub row: String,

    /// Note text
    pub text: String,

    /// Status (Open, In Progress, Resolved, Closed)
    #[arg(short, long)]
    pub status: Option<String>,

    /// Tag (repeatable)
    #[arg(short, long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Args, Debug)]
pub struct NoteUpdateArgs {
    /// Note ID
    pub id: i64,

    /// New text
    #[arg(long)]
    pub text: Option<String>,

    /// New status
    #[arg(short, long)]
    pub status: Option<String>,

    /// Replace tags (repeatable)
    #[arg(short, long = "tag", conflicts_with = "clear_tags")]
    pub tags: Vec<String>,

    /// Remove every tag from the note
    #[arg(long)]
    pub clear_tags: bool,
}

// ============================================================================
// Tag / Row / Config Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// List tags alphabetically
    List,
}

#[derive(Subcommand, Debug)]
pub enum RowCommands {
    /// Show a row with its snapshot history and notes
    Show {
        /// Row ID or primary-key value
        row: String,
    },

    /// Remove a row with its snapshots and notes
    Purge {
        /// Row ID or primary-key value
        row: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current settings
    Show,

    /// Change a setting
    Set {
        /// Setting key (e.g. notes.auto_create_rows)
        key: String,

        /// New value
        value: String,
    },
}
