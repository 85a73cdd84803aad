//! Error types for the canvas model

/// Errors raised while interpreting model values from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// Node type name is not one of the known kinds
    #[error("unknown node kind: '{0}'")]
    UnknownKind(String),

    /// View mode name is not `mobile` or `laptop`
    #[error("unknown view mode: '{0}'")]
    UnknownViewMode(String),

    /// Folder colour name is not one of the presets
    #[error("unknown folder color: '{0}'")]
    UnknownColor(String),
}
