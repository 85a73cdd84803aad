//! Canvas nodes and their typed payloads

use crate::defaults::{BoxSize, DEFAULT_FOLDER_LABEL};
use crate::error::ModelError;
use crate::id::NodeId;
use crate::kind::NodeKind;
use crate::output::GeneratorOutput;
use crate::patch::{NodePatch, VariantPatch};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a node on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset
    pub x: f64,
    /// Vertical offset
    pub y: f64,
}

impl Position {
    /// Create a position
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A file dropped onto a content box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    /// Original file name
    pub file_name: String,
    /// MIME type
    pub file_type: String,
    /// Size in bytes
    pub file_size: u64,
    /// Base64 payload
    pub data: String,
}

/// Frame size of component and iframe boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Phone-sized frame
    #[default]
    Mobile,
    /// Laptop-sized frame
    Laptop,
}

impl FromStr for ViewMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mobile" => Ok(Self::Mobile),
            "laptop" => Ok(Self::Laptop),
            _ => Err(ModelError::UnknownViewMode(s.to_string())),
        }
    }
}

/// Preset folder colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum FolderColor {
    Green,
    #[default]
    Blue,
    Red,
    Yellow,
    Purple,
    Pink,
    Orange,
    Gray,
}

impl FolderColor {
    /// Every preset, in palette order
    pub const ALL: [FolderColor; 8] = [
        FolderColor::Green,
        FolderColor::Blue,
        FolderColor::Red,
        FolderColor::Yellow,
        FolderColor::Purple,
        FolderColor::Pink,
        FolderColor::Orange,
        FolderColor::Gray,
    ];

    /// Lower-case preset name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FolderColor::Green => "green",
            FolderColor::Blue => "blue",
            FolderColor::Red => "red",
            FolderColor::Yellow => "yellow",
            FolderColor::Purple => "purple",
            FolderColor::Pink => "pink",
            FolderColor::Orange => "orange",
            FolderColor::Gray => "gray",
        }
    }
}

impl FromStr for FolderColor {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FolderColor::ALL
            .into_iter()
            .find(|color| color.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ModelError::UnknownColor(s.to_string()))
    }
}

/// AI provider a generator box talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    /// OpenAI
    OpenAi,
    /// Anthropic
    Anthropic,
    /// Google
    Google,
}

impl AiProvider {
    /// All providers
    pub const ALL: [AiProvider; 3] = [AiProvider::OpenAi, AiProvider::Anthropic, AiProvider::Google];

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AiProvider::OpenAi => "openai",
            AiProvider::Anthropic => "anthropic",
            AiProvider::Google => "google",
        }
    }

    /// Human-readable name
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            AiProvider::OpenAi => "OpenAI",
            AiProvider::Anthropic => "Anthropic",
            AiProvider::Google => "Google",
        }
    }
}

impl fmt::Display for AiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a generator box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorData {
    /// Unique alias
    pub alias: String,
    /// Prompt text, may contain `@alias` references
    #[serde(default)]
    pub input: String,
    /// Last output, `None` until something was generated
    #[serde(default)]
    pub output: Option<GeneratorOutput>,
    /// Whether a generation is in flight
    #[serde(default)]
    pub is_running: bool,
    /// Error of the last run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Selected provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<AiProvider>,
    /// Selected model id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

/// Payload of a content box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentData {
    /// Unique alias
    pub alias: String,
    /// Text content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Attached file, takes precedence over `content`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_data: Option<FileData>,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

/// Payload of a component box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentData {
    /// Unique alias
    pub alias: String,
    /// Key of the rendered component
    #[serde(default)]
    pub component_key: String,
    /// Frame size
    #[serde(default)]
    pub view_mode: ViewMode,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

/// Payload of a data exporter box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Data2UiData {
    /// Unique alias
    pub alias: String,
    /// Alias of the generator or content box to export
    #[serde(default)]
    pub source_alias: String,
    /// Target JSON file, relative to the data root
    #[serde(default)]
    pub output_path: String,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

/// Payload of an embedded URL box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IframeData {
    /// Unique alias
    pub alias: String,
    /// Embedded URL
    #[serde(default)]
    pub url: String,
    /// Frame size
    #[serde(default)]
    pub view_mode: ViewMode,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

/// Payload of a folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderData {
    /// Unique alias
    pub alias: String,
    /// Ordered children
    #[serde(default)]
    pub child_node_ids: Vec<NodeId>,
    /// Whether children are shown on the canvas
    #[serde(default = "default_expanded")]
    pub is_expanded: bool,
    /// Display name
    #[serde(default = "default_folder_label")]
    pub label: String,
    /// Preset colour
    #[serde(default)]
    pub color: FolderColor,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

fn default_expanded() -> bool {
    true
}

fn default_folder_label() -> String {
    DEFAULT_FOLDER_LABEL.to_string()
}

/// Typed node payload, tagged by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum NodeData {
    Generator(GeneratorData),
    Content(ContentData),
    Component(ComponentData),
    #[serde(rename = "data2ui")]
    Data2Ui(Data2UiData),
    Iframe(IframeData),
    Folder(FolderData),
}

impl NodeData {
    /// Fresh payload for a node of `kind` with default size and fields
    #[must_use]
    pub fn new_default(kind: NodeKind, alias: String) -> Self {
        let BoxSize { width, height } = BoxSize::for_kind(kind);
        match kind {
            NodeKind::Generator => NodeData::Generator(GeneratorData {
                alias,
                input: String::new(),
                output: None,
                is_running: false,
                error: None,
                provider: None,
                model: None,
                width,
                height,
            }),
            NodeKind::Content => NodeData::Content(ContentData {
                alias,
                content: Some(String::new()),
                file_data: None,
                width,
                height,
            }),
            NodeKind::Component => NodeData::Component(ComponentData {
                alias,
                component_key: String::new(),
                view_mode: ViewMode::Mobile,
                width,
                height,
            }),
            NodeKind::Data2Ui => NodeData::Data2Ui(Data2UiData {
                alias,
                source_alias: String::new(),
                output_path: String::new(),
                width,
                height,
            }),
            NodeKind::Iframe => NodeData::Iframe(IframeData {
                alias,
                url: String::new(),
                view_mode: ViewMode::Mobile,
                width,
                height,
            }),
            NodeKind::Folder => NodeData::Folder(FolderData {
                alias,
                child_node_ids: Vec::new(),
                is_expanded: true,
                label: DEFAULT_FOLDER_LABEL.to_string(),
                color: FolderColor::default(),
                width,
                height,
            }),
        }
    }

    /// Discriminant of this payload
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Generator(_) => NodeKind::Generator,
            NodeData::Content(_) => NodeKind::Content,
            NodeData::Component(_) => NodeKind::Component,
            NodeData::Data2Ui(_) => NodeKind::Data2Ui,
            NodeData::Iframe(_) => NodeKind::Iframe,
            NodeData::Folder(_) => NodeKind::Folder,
        }
    }

    /// Alias of this node
    #[must_use]
    pub fn alias(&self) -> &str {
        match self {
            NodeData::Generator(d) => &d.alias,
            NodeData::Content(d) => &d.alias,
            NodeData::Component(d) => &d.alias,
            NodeData::Data2Ui(d) => &d.alias,
            NodeData::Iframe(d) => &d.alias,
            NodeData::Folder(d) => &d.alias,
        }
    }

    /// Replace the alias
    pub fn set_alias(&mut self, alias: String) {
        *self.alias_mut() = alias;
    }

    fn alias_mut(&mut self) -> &mut String {
        match self {
            NodeData::Generator(d) => &mut d.alias,
            NodeData::Content(d) => &mut d.alias,
            NodeData::Component(d) => &mut d.alias,
            NodeData::Data2Ui(d) => &mut d.alias,
            NodeData::Iframe(d) => &mut d.alias,
            NodeData::Folder(d) => &mut d.alias,
        }
    }

    /// Current box size
    #[must_use]
    pub fn size(&self) -> BoxSize {
        let (width, height) = match self {
            NodeData::Generator(d) => (d.width, d.height),
            NodeData::Content(d) => (d.width, d.height),
            NodeData::Component(d) => (d.width, d.height),
            NodeData::Data2Ui(d) => (d.width, d.height),
            NodeData::Iframe(d) => (d.width, d.height),
            NodeData::Folder(d) => (d.width, d.height),
        };
        BoxSize::new(width, height)
    }

    fn size_mut(&mut self) -> (&mut f64, &mut f64) {
        match self {
            NodeData::Generator(d) => (&mut d.width, &mut d.height),
            NodeData::Content(d) => (&mut d.width, &mut d.height),
            NodeData::Component(d) => (&mut d.width, &mut d.height),
            NodeData::Data2Ui(d) => (&mut d.width, &mut d.height),
            NodeData::Iframe(d) => (&mut d.width, &mut d.height),
            NodeData::Folder(d) => (&mut d.width, &mut d.height),
        }
    }

    /// Folder payload, if this is a folder
    #[inline]
    #[must_use]
    pub fn as_folder(&self) -> Option<&FolderData> {
        match self {
            NodeData::Folder(d) => Some(d),
            _ => None,
        }
    }

    /// Mutable folder payload, if this is a folder
    #[inline]
    pub fn as_folder_mut(&mut self) -> Option<&mut FolderData> {
        match self {
            NodeData::Folder(d) => Some(d),
            _ => None,
        }
    }

    /// Generator payload, if this is a generator
    #[inline]
    #[must_use]
    pub fn as_generator(&self) -> Option<&GeneratorData> {
        match self {
            NodeData::Generator(d) => Some(d),
            _ => None,
        }
    }

    /// Mutable generator payload, if this is a generator
    #[inline]
    pub fn as_generator_mut(&mut self) -> Option<&mut GeneratorData> {
        match self {
            NodeData::Generator(d) => Some(d),
            _ => None,
        }
    }

    /// Shallow-merge `patch` into this payload
    ///
    /// The discriminant never changes. Returns `false` when the patch carried
    /// variant fields for a different node type; those fields are skipped
    /// while alias and size are still applied.
    pub fn apply(&mut self, patch: NodePatch) -> bool {
        let NodePatch {
            alias,
            width,
            height,
            variant,
        } = patch;

        if let Some(alias) = alias {
            self.set_alias(alias);
        }
        let (w, h) = self.size_mut();
        if let Some(width) = width {
            *w = width;
        }
        if let Some(height) = height {
            *h = height;
        }

        let Some(variant) = variant else {
            return true;
        };

        match (self, variant) {
            (NodeData::Generator(d), VariantPatch::Generator(p)) => {
                if let Some(input) = p.input {
                    d.input = input;
                }
                if let Some(output) = p.output {
                    d.output = output;
                }
                if let Some(is_running) = p.is_running {
                    d.is_running = is_running;
                }
                if let Some(error) = p.error {
                    d.error = error;
                }
                if let Some(provider) = p.provider {
                    d.provider = provider;
                }
                if let Some(model) = p.model {
                    d.model = model;
                }
            }
            (NodeData::Content(d), VariantPatch::Content(p)) => {
                if let Some(content) = p.content {
                    d.content = content;
                }
                if let Some(file_data) = p.file_data {
                    d.file_data = file_data;
                }
            }
            (NodeData::Component(d), VariantPatch::Component(p)) => {
                if let Some(key) = p.component_key {
                    d.component_key = key;
                }
                if let Some(mode) = p.view_mode {
                    d.view_mode = mode;
                }
            }
            (NodeData::Data2Ui(d), VariantPatch::Data2Ui(p)) => {
                if let Some(source) = p.source_alias {
                    d.source_alias = source;
                }
                if let Some(path) = p.output_path {
                    d.output_path = path;
                }
            }
            (NodeData::Iframe(d), VariantPatch::Iframe(p)) => {
                if let Some(url) = p.url {
                    d.url = url;
                }
                if let Some(mode) = p.view_mode {
                    d.view_mode = mode;
                }
            }
            (NodeData::Folder(d), VariantPatch::Folder(p)) => {
                if let Some(children) = p.child_node_ids {
                    d.child_node_ids = children;
                }
                if let Some(expanded) = p.is_expanded {
                    d.is_expanded = expanded;
                }
                if let Some(label) = p.label {
                    d.label = label;
                }
                if let Some(color) = p.color {
                    d.color = color;
                }
            }
            _ => return false,
        }
        true
    }
}

/// A node on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasNode {
    /// Immutable identity
    pub id: NodeId,
    /// Canvas position
    pub position: Position,
    /// Typed payload
    pub data: NodeData,
}

impl CanvasNode {
    /// Create a node
    #[inline]
    #[must_use]
    pub fn new(id: NodeId, position: Position, data: NodeData) -> Self {
        Self { id, position, data }
    }

    /// Alias of this node
    #[inline]
    #[must_use]
    pub fn alias(&self) -> &str {
        self.data.alias()
    }

    /// Type of this node
    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::{ContentPatch, FolderPatch, GeneratorPatch};
    use serde_json::json;

    #[test]
    fn node_data_uses_type_tag() {
        let data = NodeData::new_default(NodeKind::Data2Ui, "data2ui-1".into());
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["type"], "data2ui");
        assert_eq!(value["alias"], "data2ui-1");
        assert_eq!(value["sourceAlias"], "");
    }

    #[test]
    fn folder_parses_with_defaults() {
        let data: NodeData = serde_json::from_value(json!({
            "type": "folder",
            "alias": "folder-1",
            "width": 320.0,
            "height": 240.0
        }))
        .unwrap();
        let folder = data.as_folder().unwrap();
        assert!(folder.is_expanded);
        assert_eq!(folder.label, "Folder");
        assert_eq!(folder.color, FolderColor::Blue);
        assert!(folder.child_node_ids.is_empty());
    }

    #[test]
    fn apply_merges_matching_variant() {
        let mut data = NodeData::new_default(NodeKind::Generator, "output-1".into());
        let applied = data.apply(NodePatch::variant(VariantPatch::Generator(GeneratorPatch {
            input: Some("hello @con-1".into()),
            is_running: Some(true),
            ..GeneratorPatch::default()
        })));
        assert!(applied);
        let generator = data.as_generator().unwrap();
        assert_eq!(generator.input, "hello @con-1");
        assert!(generator.is_running);
        assert_eq!(generator.alias, "output-1");
    }

    #[test]
    fn apply_skips_mismatched_variant_but_keeps_size() {
        let mut data = NodeData::new_default(NodeKind::Content, "con-1".into());
        let patch = NodePatch::resize(500.0, 300.0).with_variant(VariantPatch::Folder(FolderPatch {
            label: Some("nope".into()),
            ..FolderPatch::default()
        }));
        assert!(!data.apply(patch));
        assert_eq!(data.kind(), NodeKind::Content);
        assert_eq!(data.size(), BoxSize::new(500.0, 300.0));
    }

    #[test]
    fn apply_can_clear_nullable_fields() {
        let mut data = NodeData::new_default(NodeKind::Content, "con-1".into());
        data.apply(NodePatch::variant(VariantPatch::Content(ContentPatch {
            content: Some(None),
            ..ContentPatch::default()
        })));
        let NodeData::Content(content) = &data else {
            panic!("expected content");
        };
        assert_eq!(content.content, None);
    }

    #[test]
    fn color_and_view_mode_parse_case_insensitively() {
        assert_eq!("Purple".parse::<FolderColor>().unwrap(), FolderColor::Purple);
        assert_eq!("LAPTOP".parse::<ViewMode>().unwrap(), ViewMode::Laptop);
        assert!("teal".parse::<FolderColor>().is_err());
    }

    #[test]
    fn node_round_trips_through_json() {
        let node = CanvasNode::new(
            NodeId::new("node-1"),
            Position::new(1.5, -2.0),
            NodeData::new_default(NodeKind::Iframe, "iframe-1".into()),
        );
        let text = serde_json::to_string(&node).unwrap();
        let back: CanvasNode = serde_json::from_str(&text).unwrap();
        assert_eq!(back, node);
    }
}
