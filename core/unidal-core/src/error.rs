//! Error types for the UniDAL data-access layer.
//!
//! All public APIs return `DalResult<T>` — no panics in library code.
//! Expected local conditions (zero-match delete, single-item lookup miss,
//! duplicate-key create) are normalized to ordinary return values at the
//! contract boundary; everything in this enum crosses it as a typed failure.

use thiserror::Error;

/// Unified error type for all UniDAL operations.
#[derive(Debug, Error)]
pub enum DalError {
    /// Backend unreachable or authentication failure at connect time
    #[error("connection error: {0}")]
    Connection(String),

    /// Connection string could not be parsed
    #[error("invalid connection url: {0}")]
    UrlParse(String),

    /// Connection string names a backend no driver is registered for
    #[error("unsupported scheme '{0}'")]
    UnsupportedScheme(String),

    /// Row lookup by a name absent from the field list
    #[error("row contains no '{0}' field")]
    MissingField(String),

    /// Row lookup by a name that occurs more than once among the fields
    #[error("row contains multiple '{0}' fields")]
    AmbiguousField(String),

    /// Row constructed with mismatched key/value lengths
    #[error("row has {values} values for {keys} fields")]
    RowShape { keys: usize, values: usize },

    /// Positional row access past the end of the result set
    #[error("row index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    /// `findone` matched more than one row
    #[error("multiple records found in '{target}', expected at most one")]
    MultipleRecordsFound { target: String },

    /// Target document/index absent — adapters raise this internally,
    /// the contract normalizes it (delete → 0, lookup → None)
    #[error("'{target}' not found")]
    NotFound { target: String },

    /// Duplicate-key create attempt — normalized to "not created" by insert
    #[error("conflict in '{target}': id {id} already exists")]
    Conflict { target: String, id: String },

    /// Caller violated an operation precondition; raised before any I/O
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// Operation issued on a closed connection
    #[error("connection is closed")]
    ConnectionClosed,

    /// Operation issued on a closed database, or acquire after dispose
    #[error("database is closed")]
    DatabaseClosed,

    /// Connection acquisition exceeded its timeout
    #[error("timed out acquiring a connection after {waited_ms}ms")]
    AcquireTimeout { waited_ms: u64 },

    /// Transaction control misuse (begin while active, commit without begin)
    #[error("transaction error: {0}")]
    Transaction(String),

    /// Any other backend-originating failure, wrapped with operation context
    #[error("driver error during {op} on '{target}': {message}")]
    Driver {
        op: String,
        target: String,
        message: String,
    },

    /// Record/value serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl DalError {
    /// Wrap a backend failure with operation context.
    pub fn driver(op: &str, target: &str, message: impl Into<String>) -> Self {
        DalError::Driver {
            op: op.to_string(),
            target: target.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for all UniDAL operations.
pub type DalResult<T> = Result<T, DalError>;

impl From<serde_json::Error> for DalError {
    fn from(err: serde_json::Error) -> Self {
        DalError::Serialization(err.to_string())
    }
}
