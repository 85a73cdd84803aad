//! Error types for the canvas store
//!
//! Store operations that only validate user input return `bool` or
//! `Option`; the errors here cover storage, decoding and bulk replacement.

use canvas_model::NodeId;

/// Main store error type
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Durable storage failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Document could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored document could not be brought to the current schema
    #[error("migration error: {0}")]
    Migration(#[from] MigrationError),

    /// Bulk replacement repeats a node id
    #[error("duplicate node id: {0}")]
    DuplicateId(NodeId),

    /// Bulk replacement repeats an alias
    #[error("duplicate alias: '{0}'")]
    DuplicateAlias(String),

    /// Configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// Saving is disabled because the stored document was unreadable
    #[error("stored canvas '{0}' could not be loaded; saving is disabled until it is replaced")]
    Quarantined(String),

    /// A timer needs a tokio runtime and none is running
    #[error("no tokio runtime available: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

/// Key-value port errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Key contains characters that cannot name a file
    #[error("invalid storage key: '{0}'")]
    InvalidKey(String),
}

/// Schema migration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MigrationError {
    /// Blob was written by a newer schema
    #[error("unsupported schema version {found} (newest supported is {supported})")]
    UnsupportedVersion {
        /// Version found in the blob
        found: u64,
        /// Newest version this build reads
        supported: u32,
    },

    /// Blob does not have the expected shape
    #[error("malformed document: {0}")]
    Malformed(String),
}
