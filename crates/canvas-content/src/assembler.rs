//! Expansion of free text into typed message parts

use crate::mime::{classify, FileClass};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use canvas_alias::{segments, Segment};
use canvas_model::{CanvasNode, FileData, FolderData, MessageContentPart, NodeData, NodeId};
use indexmap::IndexMap;

/// Read access to the nodes an assembly resolves against
pub trait NodeSource {
    /// First node carrying `alias`
    fn node_by_alias(&self, alias: &str) -> Option<&CanvasNode>;

    /// Node with identity `id`
    fn node_by_id(&self, id: &NodeId) -> Option<&CanvasNode>;
}

impl NodeSource for [CanvasNode] {
    fn node_by_alias(&self, alias: &str) -> Option<&CanvasNode> {
        self.iter().find(|node| node.alias() == alias)
    }

    fn node_by_id(&self, id: &NodeId) -> Option<&CanvasNode> {
        self.iter().find(|node| &node.id == id)
    }
}

impl NodeSource for Vec<CanvasNode> {
    fn node_by_alias(&self, alias: &str) -> Option<&CanvasNode> {
        self.as_slice().node_by_alias(alias)
    }

    fn node_by_id(&self, id: &NodeId) -> Option<&CanvasNode> {
        self.as_slice().node_by_id(id)
    }
}

impl NodeSource for IndexMap<NodeId, CanvasNode> {
    fn node_by_alias(&self, alias: &str) -> Option<&CanvasNode> {
        self.values().find(|node| node.alias() == alias)
    }

    fn node_by_id(&self, id: &NodeId) -> Option<&CanvasNode> {
        self.get(id)
    }
}

/// Turn `text` into an ordered list of message parts
///
/// Literal runs between references are kept verbatim but only emitted when
/// they contain something other than whitespace. Unknown references stay as
/// `@alias` text. Folders expand one level, bracketed by begin and end
/// markers. The function is total: non-blank input never yields an empty
/// list.
pub fn build_message_content<S>(text: &str, source: &S) -> Vec<MessageContentPart>
where
    S: NodeSource + ?Sized,
{
    let mut parts = Vec::new();

    for segment in segments(text) {
        match segment {
            Segment::Literal(literal) => {
                if !literal.trim().is_empty() {
                    parts.push(MessageContentPart::text(literal));
                }
            }
            Segment::Token(token) => match source.node_by_alias(token.alias) {
                None => parts.push(MessageContentPart::text(format!("@{}", token.alias))),
                Some(node) => match &node.data {
                    NodeData::Folder(folder) => expand_folder(folder, source, &mut parts),
                    _ => parts.push(leaf_part(node)),
                },
            },
        }
    }

    if parts.is_empty() && !text.trim().is_empty() {
        parts.push(MessageContentPart::text(text));
    }
    parts
}

fn expand_folder<S>(folder: &FolderData, source: &S, parts: &mut Vec<MessageContentPart>)
where
    S: NodeSource + ?Sized,
{
    parts.push(MessageContentPart::text(format!("[Folder: {}]", folder.label)));
    for child in folder
        .child_node_ids
        .iter()
        .filter_map(|id| source.node_by_id(id))
    {
        // nested folders are not expanded, they fall through to a placeholder
        parts.push(leaf_part(child));
    }
    parts.push(MessageContentPart::text(format!("[End Folder: {}]", folder.label)));
}

fn leaf_part(node: &CanvasNode) -> MessageContentPart {
    match &node.data {
        NodeData::Generator(d) => MessageContentPart::text(
            d.output
                .as_ref()
                .map(|output| output.as_plain_text().into_owned())
                .unwrap_or_default(),
        ),
        NodeData::Content(d) => match &d.file_data {
            Some(file) => file_part(file),
            None => MessageContentPart::text(d.content.clone().unwrap_or_default()),
        },
        NodeData::Component(_) | NodeData::Data2Ui(_) | NodeData::Iframe(_) | NodeData::Folder(_) => {
            MessageContentPart::text(format!("@{}", node.alias()))
        }
    }
}

fn file_part(file: &FileData) -> MessageContentPart {
    match classify(&file.file_type) {
        FileClass::Image => MessageContentPart::image(&file.data, &file.file_type),
        FileClass::Pdf | FileClass::Binary => MessageContentPart::file(&file.data, &file.file_type),
        FileClass::Text => match decode_text(&file.data) {
            Some(decoded) => MessageContentPart::text(format!("[File: {}]\n{decoded}", file.file_name)),
            None => {
                tracing::debug!("could not decode attached file: {}", file.file_name);
                MessageContentPart::text(format!("[File: {} - unable to decode]", file.file_name))
            }
        },
        FileClass::Unsupported => MessageContentPart::text(format!(
            "[Attached file: {} ({})]",
            file.file_name, file.file_type
        )),
    }
}

fn decode_text(data: &str) -> Option<String> {
    let bytes = STANDARD.decode(data.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

/// Check if any part is an image or file
///
/// Requests with media go out as structured messages, the rest as a plain
/// prompt.
#[must_use]
pub fn has_media_parts(parts: &[MessageContentPart]) -> bool {
    parts.iter().any(MessageContentPart::is_media)
}

/// Concatenate the text parts, dropping media
#[must_use]
pub fn concat_text(parts: &[MessageContentPart]) -> String {
    parts.iter().filter_map(MessageContentPart::as_text).collect()
}
