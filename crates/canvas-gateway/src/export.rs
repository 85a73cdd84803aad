//! Data2UI export: generator output to a JSON file
//!
//! Preparation is synchronous and reads one store snapshot; writing is a
//! separate async step so no store lock is held across I/O.

use crate::error::ExportError;
use crate::json_files::JsonFileRoot;
use canvas_alias::AliasMap;
use canvas_model::{Data2UiData, NodeData, NodeId, NodeKind};
use canvas_store::{CanvasState, CompletionWatcher, SharedStore};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

static FENCED: Lazy<Regex> = Lazy::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("fence pattern is valid"));
static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[\s\S]*\]|\{[\s\S]*\}").expect("bracket pattern is valid"));

/// Pull the JSON payload out of model output
///
/// Tries the first fenced code block, then the widest bracketed span,
/// then falls back to the trimmed text.
#[must_use]
pub fn extract_json(text: &str) -> &str {
    if let Some(inner) = FENCED.captures(text).and_then(|c| c.get(1)) {
        return inner.as_str().trim();
    }
    if let Some(span) = BRACKETED.find(text) {
        return span.as_str();
    }
    text.trim()
}

/// Check the recent-memories list shape
///
/// # Errors
/// Returns a message naming the first offending item
pub fn validate_recent_memories(data: &Value) -> Result<(), String> {
    let Some(items) = data.as_array() else {
        return Err("expected an array of memory objects".to_string());
    };
    for (i, item) in items.iter().enumerate() {
        let Some(item) = item.as_object() else {
            return Err(format!("item at index {i} is not an object"));
        };
        if !item.get("id").is_some_and(Value::is_string) {
            return Err(format!("item at index {i} is missing required field \"id\" (string)"));
        }
        if !item.get("text").is_some_and(Value::is_string) {
            return Err(format!("item at index {i} is missing required field \"text\" (string)"));
        }
        if item.get("colorScheme").is_some_and(|v| !v.is_string()) {
            return Err(format!("item at index {i} has invalid \"colorScheme\" (must be string)"));
        }
        if let Some(action) = item.get("action") {
            let Some(action) = action.as_object() else {
                return Err(format!("item at index {i} has invalid \"action\" (must be object)"));
            };
            if !action.get("label").is_some_and(Value::is_string) {
                return Err(format!("item at index {i} action is missing required field \"label\" (string)"));
            }
            if !action.get("target").is_some_and(Value::is_string) {
                return Err(format!("item at index {i} action is missing required field \"target\" (string)"));
            }
            if action.get("icon").is_some_and(|v| !v.is_string()) {
                return Err(format!("item at index {i} action has invalid \"icon\" (must be string)"));
            }
        }
    }
    Ok(())
}

/// A validated export waiting to be written
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedExport {
    /// Output path relative to the data root
    pub path: String,
    /// Parsed payload
    pub data: Value,
}

/// Validate an exporter's selection against the current aliases
///
/// # Errors
/// Returns the first failed check; see [`ExportError`]
pub fn prepare_export(exporter: &Data2UiData, aliases: &AliasMap) -> Result<PreparedExport, ExportError> {
    if exporter.source_alias.is_empty() || exporter.output_path.is_empty() {
        return Err(ExportError::MissingSelection);
    }
    let source = aliases
        .get(&exporter.source_alias)
        .ok_or_else(|| ExportError::SourceNotFound(exporter.source_alias.clone()))?;
    if source.value.trim().is_empty() {
        return Err(ExportError::EmptySource);
    }

    let data: Value =
        serde_json::from_str(extract_json(&source.value)).map_err(|e| ExportError::InvalidJson(e.to_string()))?;
    if exporter.output_path.contains("recent-memories") {
        validate_recent_memories(&data).map_err(ExportError::SchemaMismatch)?;
    }
    Ok(PreparedExport {
        path: exporter.output_path.clone(),
        data,
    })
}

/// Prepare the export of data2ui node `node_id` from a state snapshot
///
/// # Errors
/// Returns [`ExportError::NotExporter`] if the node is missing or of another
/// type, else whatever [`prepare_export`] reports
pub fn prepare_node_export(state: &CanvasState, node_id: &NodeId) -> Result<PreparedExport, ExportError> {
    let Some(NodeData::Data2Ui(exporter)) = state.node(node_id).map(|n| &n.data) else {
        return Err(ExportError::NotExporter(node_id.clone()));
    };
    prepare_export(exporter, &AliasMap::build(state.nodes()))
}

/// Write a prepared export
///
/// # Errors
/// Returns [`ExportError::Write`] if the path is rejected or the write fails
pub async fn write_export(root: &JsonFileRoot, export: &PreparedExport) -> Result<String, ExportError> {
    Ok(root.write_json(&export.path, &export.data).await?)
}

/// Prepare and write the export of one node
///
/// # Errors
/// Returns the validation or write failure
pub async fn export_node(store: &SharedStore, root: &JsonFileRoot, node_id: &NodeId) -> Result<String, ExportError> {
    let prepared = {
        let store = store.lock();
        prepare_node_export(store.state(), node_id)?
    };
    write_export(root, &prepared).await
}

/// Last export result of a data2ui node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ExportStatus {
    /// Nothing exported yet
    #[default]
    Idle,
    /// Last export was written
    Success,
    /// Last export failed with this message
    Error(String),
}

/// Triggers exports when a source generator finishes
///
/// Keeps one [`CompletionWatcher`] per data2ui node, fed with the running
/// state of the generator its `source_alias` names. A source that is
/// missing or not a generator resets the watcher.
#[derive(Debug, Default)]
pub struct AutoExporter {
    watchers: HashMap<NodeId, CompletionWatcher>,
    statuses: HashMap<NodeId, ExportStatus>,
}

impl AutoExporter {
    /// Create an exporter with no history
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe a state snapshot
    ///
    /// Returns the data2ui nodes whose source just completed, each with its
    /// prepared export or the validation failure. Failures are also recorded
    /// as the node's status.
    pub fn observe(&mut self, state: &CanvasState) -> Vec<(NodeId, Result<PreparedExport, ExportError>)> {
        let mut due = Vec::new();
        let mut aliases: Option<AliasMap> = None;

        for node in state.nodes() {
            let NodeData::Data2Ui(exporter) = &node.data else {
                continue;
            };
            let running = state
                .node_by_alias(&exporter.source_alias)
                .and_then(|source| source.data.as_generator())
                .map(|generator| generator.is_running);

            let watcher = self.watchers.entry(node.id.clone()).or_default();
            if watcher.observe(running) {
                let aliases = aliases.get_or_insert_with(|| AliasMap::build(state.nodes()));
                let prepared = prepare_export(exporter, aliases);
                if let Err(e) = &prepared {
                    tracing::warn!("auto export for {} failed: {}", node.id, e);
                    self.statuses.insert(node.id.clone(), ExportStatus::Error(e.to_string()));
                }
                due.push((node.id.clone(), prepared));
            }
        }

        self.watchers
            .retain(|id, _| state.node(id).is_some_and(|n| n.kind() == NodeKind::Data2Ui));
        self.statuses.retain(|id, _| state.node(id).is_some());
        due
    }

    /// Record the outcome of an export
    pub fn record(&mut self, node_id: &NodeId, result: &Result<String, ExportError>) {
        let status = match result {
            Ok(_) => ExportStatus::Success,
            Err(e) => ExportStatus::Error(e.to_string()),
        };
        self.statuses.insert(node_id.clone(), status);
    }

    /// Status of a data2ui node
    #[must_use]
    pub fn status(&self, node_id: &NodeId) -> ExportStatus {
        self.statuses.get(node_id).cloned().unwrap_or_default()
    }

    /// Observe the store, then write every export that became due
    ///
    /// Returns the nodes that were exported successfully.
    pub async fn run_once(&mut self, store: &SharedStore, root: &JsonFileRoot) -> Vec<NodeId> {
        let due = {
            let store = store.lock();
            self.observe(store.state())
        };
        let mut written = Vec::new();
        for (node_id, prepared) in due {
            let Ok(prepared) = prepared else {
                continue;
            };
            let result = write_export(root, &prepared).await;
            self.record(&node_id, &result);
            if result.is_ok() {
                written.push(node_id);
            }
        }
        written
    }
}
