//! Error types for the canvas gateway

use canvas_model::NodeId;

/// JSON file endpoint errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Path tries to leave the data root
    #[error("path escapes the data root: {0}")]
    PathTraversal(String),

    /// Path is empty, absolute or otherwise unusable
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Path does not end in `.json`
    #[error("not a json file: {0}")]
    NotJson(String),

    /// Nothing to write
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Filesystem failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Generation errors
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Transport failure
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status
    #[error("generation failed with status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body, if readable
        body: String,
    },

    /// Service URL could not be used
    #[error("invalid service url: {0}")]
    InvalidUrl(String),

    /// Service returned something other than what was asked for
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Node is not a generator, is unknown, or is already running
    #[error("generation cannot start for node {0}")]
    NotStartable(NodeId),

    /// Run was cancelled
    #[error("generation cancelled")]
    Cancelled,
}

/// Data2UI export errors
///
/// These are reported on the exporting node and never cross the store
/// boundary as failures of a store operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    /// Node is not a data2ui box
    #[error("node {0} is not a data2ui box")]
    NotExporter(NodeId),

    /// Source alias or output path is missing
    #[error("select a source and an output file")]
    MissingSelection,

    /// Source alias does not resolve
    #[error("source alias not found: {0}")]
    SourceNotFound(String),

    /// Source value is blank
    #[error("source has no value")]
    EmptySource,

    /// Extracted text is not JSON
    #[error("invalid json: {0}")]
    InvalidJson(String),

    /// JSON does not match the target schema
    #[error("invalid recent memories format: {0}")]
    SchemaMismatch(String),

    /// Writing the output file failed
    #[error("failed to write json file: {0}")]
    Write(String),
}

impl From<GatewayError> for ExportError {
    fn from(err: GatewayError) -> Self {
        ExportError::Write(err.to_string())
    }
}
