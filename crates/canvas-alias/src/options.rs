//! Autocomplete entries for alias pickers

use canvas_model::{CanvasNode, NodeData, NodeId, NodeKind};
use serde::Serialize;

const IFRAME_URL_PREVIEW: usize = 30;

/// One selectable alias
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasOption {
    /// The alias
    pub alias: String,
    /// Type of the node carrying it
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Node carrying it
    pub node_id: NodeId,
    /// Display label, e.g. `con-1 (Content)`
    pub label: String,
}

/// Build an option for every node, in node order
pub fn alias_options<'a>(nodes: impl IntoIterator<Item = &'a CanvasNode>) -> Vec<AliasOption> {
    nodes
        .into_iter()
        .map(|node| AliasOption {
            alias: node.alias().to_string(),
            kind: node.kind(),
            node_id: node.id.clone(),
            label: option_label(&node.data),
        })
        .collect()
}

fn option_label(data: &NodeData) -> String {
    let alias = data.alias();
    match data {
        NodeData::Generator(_) | NodeData::Content(_) => {
            format!("{alias} ({})", data.kind().display_name())
        }
        NodeData::Component(d) => format!("{alias} (Component: {})", or_none(&d.component_key)),
        NodeData::Data2Ui(d) => format!("{alias} (Data2UI: {})", or_none(&d.output_path)),
        NodeData::Iframe(d) if d.url.is_empty() => format!("{alias} (Iframe)"),
        NodeData::Iframe(d) => {
            let url = if d.url.chars().count() > IFRAME_URL_PREVIEW {
                let head: String = d.url.chars().take(IFRAME_URL_PREVIEW).collect();
                format!("{head}…")
            } else {
                d.url.clone()
            };
            format!("{alias} (Iframe: {url})")
        }
        NodeData::Folder(d) => format!("{alias} (Folder: {} items)", d.child_node_ids.len()),
    }
}

fn or_none(value: &str) -> &str {
    if value.is_empty() {
        "none"
    } else {
        value
    }
}

/// Options whose alias or label contains `query`, ignoring case
///
/// An empty query matches everything.
#[must_use]
pub fn filter_aliases<'a>(options: &'a [AliasOption], query: &str) -> Vec<&'a AliasOption> {
    if query.is_empty() {
        return options.iter().collect();
    }
    let needle = query.to_lowercase();
    options
        .iter()
        .filter(|option| {
            option.alias.to_lowercase().contains(&needle)
                || option.label.to_lowercase().contains(&needle)
        })
        .collect()
}
