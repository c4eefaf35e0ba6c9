use vitals_common::metric::MetricKind;

/// Errors surfaced by the storage layer.
///
/// # Examples
///
/// ```
/// use vitals_common::metric::MetricKind;
/// use vitals_storage::StorageError;
///
/// let err = StorageError::NotFound {
///     kind: MetricKind::Counter,
///     name: "PollCount".to_string(),
/// };
/// assert!(err.to_string().contains("PollCount"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No stored value exists for this id and kind. Every backend reports
    /// absence this way, including gauge reads.
    #[error("storage: {kind} '{name}' not found")]
    NotFound { kind: MetricKind, name: String },

    /// A batch metric did not carry the payload field its kind requires
    /// (gauge without `value`, counter without `delta`).
    #[error("storage: {kind} '{name}' is missing its payload field")]
    MissingPayload { kind: MetricKind, name: String },

    /// A stored row carries neither a gauge nor a counter value.
    #[error("storage: row for '{name}' holds no value")]
    InvalidRow { name: String },

    /// An underlying SQLite error.
    #[error("storage: SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Snapshot (de)serialization failure in the file backend.
    #[error("storage: JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot file I/O failure.
    #[error("storage: I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience `Result` alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
