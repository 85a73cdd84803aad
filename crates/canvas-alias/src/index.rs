//! Derived alias index
//!
//! [`AliasMap`] is rebuilt from the node collection on every call and never
//! cached, so it always reflects the latest state.

use crate::token::ALIAS_TOKEN;
use canvas_model::{CanvasNode, NodeData, NodeId, NodeKind};
use indexmap::IndexMap;
use regex::Captures;
use serde::Serialize;
use std::borrow::Cow;

/// What an alias points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasEntry {
    /// Node carrying the alias
    pub node_id: NodeId,
    /// Type of that node
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Flattened current value
    pub value: String,
}

/// Mapping from alias to node identity, type and value
///
/// Entries keep node order. If a malformed collection repeats an alias the
/// first node wins, matching how content assembly looks nodes up.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AliasMap {
    entries: IndexMap<String, AliasEntry>,
}

impl AliasMap {
    /// Build the map from the current nodes
    pub fn build<'a>(nodes: impl IntoIterator<Item = &'a CanvasNode>) -> Self {
        let mut entries = IndexMap::new();
        for node in nodes {
            entries
                .entry(node.alias().to_string())
                .or_insert_with(|| AliasEntry {
                    node_id: node.id.clone(),
                    kind: node.kind(),
                    value: alias_value(&node.data),
                });
        }
        Self { entries }
    }

    /// Entry for `alias`
    #[inline]
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&AliasEntry> {
        self.entries.get(alias)
    }

    /// Check if `alias` is mapped
    #[inline]
    #[must_use]
    pub fn contains(&self, alias: &str) -> bool {
        self.entries.contains_key(alias)
    }

    /// Number of aliases
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(alias, entry)` pairs in node order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AliasEntry)> {
        self.entries.iter().map(|(alias, entry)| (alias.as_str(), entry))
    }

    /// Value of `alias`, or the literal `@alias` when nothing carries it
    #[must_use]
    pub fn resolve_alias<'a>(&'a self, alias: &str) -> Cow<'a, str> {
        match self.entries.get(alias) {
            Some(entry) => Cow::Borrowed(&entry.value),
            None => Cow::Owned(format!("@{alias}")),
        }
    }

    /// Substitute every `@alias` token in `text`
    ///
    /// Unknown tokens are left byte-for-byte unchanged.
    #[must_use]
    pub fn resolve_all_aliases(&self, text: &str) -> String {
        ALIAS_TOKEN
            .replace_all(text, |caps: &Captures<'_>| {
                self.resolve_alias(&caps[1]).into_owned()
            })
            .into_owned()
    }
}

/// Flattened value of a node, as seen through its alias
#[must_use]
pub fn alias_value(data: &NodeData) -> String {
    match data {
        NodeData::Generator(d) => d
            .output
            .as_ref()
            .map(|output| output.as_plain_text().into_owned())
            .unwrap_or_default(),
        NodeData::Content(d) => match &d.file_data {
            Some(file) => format!("[File: {}]", file.file_name),
            None => d.content.clone().unwrap_or_default(),
        },
        NodeData::Component(d) => format!("[Component: {}]", d.component_key),
        NodeData::Data2Ui(d) => format!("[Data2UI: {}]", d.output_path),
        NodeData::Iframe(d) => format!("[Iframe: {}]", d.url),
        NodeData::Folder(d) => format!("[Folder: {} ({} items)]", d.label, d.child_node_ids.len()),
    }
}
