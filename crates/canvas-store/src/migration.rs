//! Schema migration of stored canvas documents
//!
//! Version 1 blobs have no `version` field. Their generator `output` may be
//! a plain string and their counters may be partial or missing.

use crate::error::MigrationError;
use canvas_model::{CanvasDocument, CURRENT_SCHEMA_VERSION};
use serde_json::{json, Map, Value};

/// A document brought up to the current schema
#[derive(Debug, Clone, PartialEq)]
pub struct Migrated {
    /// The document at [`CURRENT_SCHEMA_VERSION`]
    pub document: CanvasDocument,
    /// Version the blob was stored with
    pub from_version: u64,
}

impl Migrated {
    /// Check if any upgrade step ran
    #[inline]
    #[must_use]
    pub fn was_upgraded(&self) -> bool {
        self.from_version < u64::from(CURRENT_SCHEMA_VERSION)
    }
}

/// Parse and upgrade a stored blob
///
/// # Errors
/// - [`MigrationError::UnsupportedVersion`] for blobs from a newer schema
/// - [`MigrationError::Malformed`] if the blob is not a canvas document
pub fn migrate(mut value: Value) -> Result<Migrated, MigrationError> {
    let root = value
        .as_object_mut()
        .ok_or_else(|| MigrationError::Malformed("expected a JSON object".to_string()))?;

    let from_version = match root.get("version") {
        None | Some(Value::Null) => 1,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| MigrationError::Malformed(format!("invalid version: {v}")))?,
    };
    if from_version > u64::from(CURRENT_SCHEMA_VERSION) {
        return Err(MigrationError::UnsupportedVersion {
            found: from_version,
            supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if from_version < 2 {
        upgrade_v1(root);
        tracing::info!("migrated canvas document from version {}", from_version);
    }
    root.insert("version".to_string(), json!(CURRENT_SCHEMA_VERSION));

    let document: CanvasDocument =
        serde_json::from_value(value).map_err(|e| MigrationError::Malformed(e.to_string()))?;
    Ok(Migrated {
        document,
        from_version,
    })
}

fn upgrade_v1(root: &mut Map<String, Value>) {
    match root.get_mut("nodes") {
        Some(Value::Array(nodes)) => {
            for node in nodes.iter_mut() {
                upgrade_v1_node(node);
            }
        }
        _ => {
            root.insert("nodes".to_string(), json!([]));
        }
    }
    if !matches!(root.get("counters"), Some(Value::Object(_))) {
        root.insert("counters".to_string(), json!({}));
    }
}

fn upgrade_v1_node(node: &mut Value) {
    let Some(data) = node.get_mut("data").and_then(Value::as_object_mut) else {
        return;
    };
    if data.get("type").and_then(Value::as_str) != Some("generator") {
        return;
    }
    let upgraded = match data.get("output") {
        Some(Value::String(text)) if text.is_empty() => Value::Null,
        Some(Value::String(text)) => json!({ "mode": "text", "text": text }),
        _ => return,
    };
    data.insert("output".to_string(), upgraded);
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_model::{GeneratorOutput, NodeData, NodeKind};
    use pretty_assertions::assert_eq;

    fn v1_blob() -> Value {
        json!({
            "nodes": [
                {
                    "id": "node-1",
                    "type": "generator",
                    "position": {"x": 0.0, "y": 0.0},
                    "data": {
                        "type": "generator", "alias": "output-1", "input": "hi",
                        "output": "hello there", "isRunning": false,
                        "width": 320.0, "height": 400.0
                    }
                },
                {
                    "id": "node-2",
                    "position": {"x": 10.0, "y": 0.0},
                    "data": {
                        "type": "generator", "alias": "output-2", "input": "",
                        "output": "", "isRunning": false,
                        "width": 320.0, "height": 400.0
                    }
                }
            ],
            "counters": {"generator": 2, "content": 0, "component": 0}
        })
    }

    #[test]
    fn v1_string_outputs_are_upgraded() {
        let migrated = migrate(v1_blob()).unwrap();
        assert_eq!(migrated.from_version, 1);
        assert!(migrated.was_upgraded());

        let doc = migrated.document;
        assert_eq!(doc.version, CURRENT_SCHEMA_VERSION);
        let outputs: Vec<_> = doc
            .nodes
            .iter()
            .map(|n| match &n.data {
                NodeData::Generator(g) => g.output.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(outputs, vec![Some(GeneratorOutput::text("hello there")), None]);
        assert_eq!(doc.counters.get(NodeKind::Generator), 2);
        assert_eq!(doc.counters.get(NodeKind::Folder), 0);
    }

    #[test]
    fn v1_without_counters_or_nodes_is_accepted() {
        let migrated = migrate(json!({})).unwrap();
        assert!(migrated.document.nodes.is_empty());
        assert_eq!(migrated.document.counters, canvas_model::Counters::default());
    }

    #[test]
    fn current_version_passes_through() {
        let doc = CanvasDocument::default();
        let migrated = migrate(serde_json::to_value(&doc).unwrap()).unwrap();
        assert!(!migrated.was_upgraded());
        assert_eq!(migrated.document, doc);
    }

    #[test]
    fn newer_version_is_refused() {
        let err = migrate(json!({"version": 9, "nodes": []})).unwrap_err();
        assert_eq!(
            err,
            MigrationError::UnsupportedVersion {
                found: 9,
                supported: CURRENT_SCHEMA_VERSION
            }
        );
    }

    #[test]
    fn non_object_is_malformed() {
        assert!(matches!(migrate(json!([1, 2])), Err(MigrationError::Malformed(_))));
        assert!(matches!(
            migrate(json!({"version": "two"})),
            Err(MigrationError::Malformed(_))
        ));
    }
}
