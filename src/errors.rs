/*!
 * Error types for the mythvideo catalog store.
 *
 * Store operations return `anyhow::Result`; the typed causes below are
 * wrapped inside it and can be recovered with `downcast_ref::<StoreError>()`.
 * Raw SQLite faults are passed through untouched.
 */

use thiserror::Error;

use crate::database::schema::ColumnType;

/// Errors raised by the catalog store itself, as opposed to the backing database
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A table the store needs is not present in the database
    #[error("Table not found: {0}")]
    MissingTable(String),

    /// The video table exists but lacks columns every known layout has
    #[error("Unsupported videometadata layout, missing columns: {}", missing.join(", "))]
    UnsupportedSchema {
        /// Core columns absent from the live table
        missing: Vec<String>,
    },

    /// A field name that is not a column of the deployed video table
    #[error("Unknown videometadata column: {0}")]
    UnknownColumn(String),

    /// A value whose type the video column cannot store
    #[error("Column {column} expects {expected} values")]
    TypeMismatch {
        /// Column the value was written to
        column: String,
        /// Affinity declared for the column
        expected: ColumnType,
    },

    /// A link was requested for a video id that has no row
    #[error("Video not found: {0}")]
    VideoNotFound(i64),

    /// An attribute name made only of whitespace
    #[error("Invalid attribute name: {0:?}")]
    InvalidName(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Find a `StoreError` anywhere in an anyhow error chain
    pub fn find(error: &anyhow::Error) -> Option<&StoreError> {
        error.chain().find_map(|cause| cause.downcast_ref::<StoreError>())
    }
}
