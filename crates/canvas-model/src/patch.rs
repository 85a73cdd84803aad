//! Partial updates for node payloads
//!
//! Outer `Option` means "leave unchanged"; for nullable fields the inner
//! `Option` is the new value, so `Some(None)` clears the field.

use crate::id::NodeId;
use crate::node::{AiProvider, FileData, FolderColor, ViewMode};
use crate::output::GeneratorOutput;

/// Shallow partial update of a node payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    /// New alias
    pub alias: Option<String>,
    /// New width
    pub width: Option<f64>,
    /// New height
    pub height: Option<f64>,
    /// Type-specific fields
    pub variant: Option<VariantPatch>,
}

impl NodePatch {
    /// Patch carrying only type-specific fields
    #[inline]
    #[must_use]
    pub fn variant(variant: VariantPatch) -> Self {
        Self {
            variant: Some(variant),
            ..Self::default()
        }
    }

    /// Patch resizing the box
    #[inline]
    #[must_use]
    pub fn resize(width: f64, height: f64) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Set the alias
    #[inline]
    #[must_use]
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the type-specific fields
    #[inline]
    #[must_use]
    pub fn with_variant(mut self, variant: VariantPatch) -> Self {
        self.variant = Some(variant);
        self
    }

    /// Check if the patch changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alias.is_none() && self.width.is_none() && self.height.is_none() && self.variant.is_none()
    }

    /// Folder children carried by this patch, if any
    #[must_use]
    pub fn folder_children(&self) -> Option<&[NodeId]> {
        match &self.variant {
            Some(VariantPatch::Folder(FolderPatch {
                child_node_ids: Some(children),
                ..
            })) => Some(children),
            _ => None,
        }
    }
}

/// Type-specific part of a [`NodePatch`]
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum VariantPatch {
    Generator(GeneratorPatch),
    Content(ContentPatch),
    Component(ComponentPatch),
    Data2Ui(Data2UiPatch),
    Iframe(IframePatch),
    Folder(FolderPatch),
}

/// Generator fields
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct GeneratorPatch {
    pub input: Option<String>,
    pub output: Option<Option<GeneratorOutput>>,
    pub is_running: Option<bool>,
    pub error: Option<Option<String>>,
    pub provider: Option<Option<AiProvider>>,
    pub model: Option<Option<String>>,
}

/// Content fields
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct ContentPatch {
    pub content: Option<Option<String>>,
    pub file_data: Option<Option<FileData>>,
}

/// Component fields
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct ComponentPatch {
    pub component_key: Option<String>,
    pub view_mode: Option<ViewMode>,
}

/// Data2UI fields
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct Data2UiPatch {
    pub source_alias: Option<String>,
    pub output_path: Option<String>,
}

/// Iframe fields
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct IframePatch {
    pub url: Option<String>,
    pub view_mode: Option<ViewMode>,
}

/// Folder fields
#[derive(Debug, Clone, Default, PartialEq)]
#[allow(missing_docs)]
pub struct FolderPatch {
    pub child_node_ids: Option<Vec<NodeId>>,
    pub is_expanded: Option<bool>,
    pub label: Option<String>,
    pub color: Option<FolderColor>,
}
