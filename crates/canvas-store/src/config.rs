//! Store configuration

use crate::error::StoreError;
use canvas_model::{NodeKind, Position};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Timing, storage keys and policy for a [`CanvasStore`](crate::CanvasStore)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Exit animation time before a deleted node is removed
    pub deletion_grace_ms: u64,
    /// How long the last deleted node can be restored
    pub undo_window_ms: u64,
    /// Quiet period before an automatic save
    pub autosave_delay_ms: u64,
    /// Lifetime of the duplicate-alias notice
    pub notice_duration_ms: u64,
    /// Lifetime of a pulse
    pub pulse_duration_ms: u64,
    /// Pulses kept alive at once; the oldest is dropped first
    pub max_pulses: usize,
    /// Key of the canvas document
    pub storage_key: String,
    /// Key of the dark-mode flag
    pub dark_mode_key: String,
    /// Node types that may be placed in a folder
    pub containable_kinds: Vec<NodeKind>,
    /// Where nodes land when no position is given
    pub default_position: Position,
}

impl StoreConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML; missing fields keep their defaults
    ///
    /// # Errors
    /// Returns [`StoreError::Config`] if the text is not valid TOML for this shape
    pub fn from_toml_str(text: &str) -> Result<Self, StoreError> {
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path.as_ref())
            .map_err(|e| StoreError::Config(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_toml_str(&text)
    }

    /// With deletion grace period
    #[inline]
    #[must_use]
    pub fn with_deletion_grace(mut self, grace: Duration) -> Self {
        self.deletion_grace_ms = duration_ms(grace);
        self
    }

    /// With undo window
    #[inline]
    #[must_use]
    pub fn with_undo_window(mut self, window: Duration) -> Self {
        self.undo_window_ms = duration_ms(window);
        self
    }

    /// With autosave quiet period
    #[inline]
    #[must_use]
    pub fn with_autosave_delay(mut self, delay: Duration) -> Self {
        self.autosave_delay_ms = duration_ms(delay);
        self
    }

    /// With storage key of the canvas document
    #[inline]
    #[must_use]
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    /// With containable node types
    #[inline]
    #[must_use]
    pub fn with_containable_kinds(mut self, kinds: impl IntoIterator<Item = NodeKind>) -> Self {
        self.containable_kinds = kinds.into_iter().collect();
        self
    }

    /// Deletion grace period
    #[inline]
    #[must_use]
    pub fn deletion_grace(&self) -> Duration {
        Duration::from_millis(self.deletion_grace_ms)
    }

    /// Undo window
    #[inline]
    #[must_use]
    pub fn undo_window(&self) -> Duration {
        Duration::from_millis(self.undo_window_ms)
    }

    /// Autosave quiet period
    #[inline]
    #[must_use]
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Notice lifetime
    #[inline]
    #[must_use]
    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_duration_ms)
    }

    /// Pulse lifetime
    #[inline]
    #[must_use]
    pub fn pulse_duration(&self) -> Duration {
        Duration::from_millis(self.pulse_duration_ms)
    }

    /// Check if nodes of `kind` may be placed in a folder
    #[inline]
    #[must_use]
    pub fn is_containable(&self, kind: NodeKind) -> bool {
        !kind.is_folder() && self.containable_kinds.contains(&kind)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            deletion_grace_ms: 300,
            undo_window_ms: 5_000,
            autosave_delay_ms: 1_000,
            notice_duration_ms: 2_500,
            pulse_duration_ms: 2_000,
            max_pulses: 16,
            storage_key: "canvas-storage".to_string(),
            dark_mode_key: "canvas-dark-mode".to_string(),
            containable_kinds: vec![NodeKind::Content],
            default_position: Position::new(100.0, 100.0),
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = StoreConfig::from_toml_str(
            r#"
            undo_window_ms = 8000
            containable_kinds = ["content", "generator"]
            "#,
        )
        .unwrap();
        assert_eq!(config.undo_window(), Duration::from_secs(8));
        assert_eq!(config.deletion_grace(), Duration::from_millis(300));
        assert!(config.is_containable(NodeKind::Generator));
        assert_eq!(config.storage_key, "canvas-storage");
    }

    #[test]
    fn folders_are_never_containable() {
        let config = StoreConfig::new().with_containable_kinds(NodeKind::ALL);
        assert!(!config.is_containable(NodeKind::Folder));
        assert!(config.is_containable(NodeKind::Iframe));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = StoreConfig::from_toml_str("undo_window_ms = 'soon'").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }
}
