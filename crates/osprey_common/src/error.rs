use thiserror::Error;

/// Convenience alias for `Result<T, OspreyError>`.
pub type OspreyResult<T> = Result<T, OspreyError>;

/// Error classification for the block-processing pipeline.
///
/// - `TxInvalid` — the offending transaction is marked invalid and skipped;
///   the rest of the block commits normally
/// - `Fatal`     — the state database is unusable or an internal invariant
///   broke; the enclosing block-processing task must abort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    TxInvalid,
    Fatal,
}

/// Top-level error type that all layer-specific errors convert into.
#[derive(Error, Debug)]
pub enum OspreyError {
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("State database error: {0}")]
    StateDb(#[from] StateDbError),

    /// Internal bug — should never occur in production.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Metadata-entry codec errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("metadata entry has an empty name")]
    EmptyName,

    #[error("duplicate metadata entry name: {0}")]
    DuplicateEntry(String),

    #[error("metadata blob truncated at byte {offset}")]
    Truncated { offset: usize },

    #[error("metadata entry name is not valid UTF-8")]
    InvalidName,
}

/// State database lookup errors.
#[derive(Error, Debug)]
pub enum StateDbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state database backend failure: {0}")]
    Backend(String),
}

impl OspreyError {
    /// Classify this error for the commit pipeline's skip-vs-abort decision.
    pub fn kind(&self) -> ErrorKind {
        match self {
            // A transaction produced metadata its serializer rejects, or its
            // merge needed a state lookup that failed: reject the transaction.
            OspreyError::Metadata(_) => ErrorKind::TxInvalid,
            OspreyError::StateDb(_) => ErrorKind::TxInvalid,

            OspreyError::Internal(_) => ErrorKind::Fatal,
        }
    }

    /// Returns true if the enclosing transaction should be rejected.
    pub fn is_tx_invalid(&self) -> bool {
        matches!(self.kind(), ErrorKind::TxInvalid)
    }

    /// Returns true if block processing must abort.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Fatal)
    }

    /// Construct an internal-bug error.
    pub fn internal(message: impl Into<String>) -> Self {
        OspreyError::Internal(message.into())
    }
}
