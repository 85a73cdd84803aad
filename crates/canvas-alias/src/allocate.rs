//! Alias uniqueness and allocation

use crate::error::AliasError;
use canvas_model::{CanvasNode, NodeId, NodeKind};
use std::collections::HashSet;

/// An alias chosen for a new node, with the suffix the counter advances to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedAlias {
    /// `<prefix>-<suffix>`
    pub alias: String,
    /// Numeric suffix
    pub suffix: u64,
}

/// Check if no node other than `excluding` uses `candidate`
///
/// Comparison is exact and case-sensitive.
pub fn is_alias_unique<'a>(
    nodes: impl IntoIterator<Item = &'a CanvasNode>,
    candidate: &str,
    excluding: Option<&NodeId>,
) -> bool {
    !nodes
        .into_iter()
        .any(|node| node.alias() == candidate && Some(&node.id) != excluding)
}

/// Trim `candidate` and check it can be given to `excluding`
///
/// # Errors
/// - [`AliasError::Empty`] if nothing is left after trimming
/// - [`AliasError::Duplicate`] if another node already uses it
pub fn validate_alias<'a>(
    nodes: impl IntoIterator<Item = &'a CanvasNode>,
    candidate: &str,
    excluding: Option<&NodeId>,
) -> Result<String, AliasError> {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return Err(AliasError::Empty);
    }
    if !is_alias_unique(nodes, trimmed, excluding) {
        return Err(AliasError::Duplicate(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Next free alias for `kind`
///
/// Starts at `counter + 1` and increments past any alias already used by a
/// node of any type.
///
/// # Arguments
/// * `nodes` - current node collection
/// * `kind` - type of the node being created
/// * `counter` - last suffix handed out for `kind`
pub fn next_alias<'a>(
    nodes: impl IntoIterator<Item = &'a CanvasNode>,
    kind: NodeKind,
    counter: u64,
) -> AllocatedAlias {
    let used: HashSet<&str> = nodes.into_iter().map(CanvasNode::alias).collect();
    let prefix = kind.alias_prefix();
    let mut suffix = counter.saturating_add(1);
    loop {
        let alias = format!("{prefix}-{suffix}");
        if !used.contains(alias.as_str()) {
            return AllocatedAlias { alias, suffix };
        }
        suffix = suffix.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvas_model::{NodeData, Position};

    fn node(id: &str, kind: NodeKind, alias: &str) -> CanvasNode {
        CanvasNode::new(
            NodeId::new(id),
            Position::default(),
            NodeData::new_default(kind, alias.to_string()),
        )
    }

    #[test]
    fn next_alias_starts_after_counter() {
        let allocated = next_alias(std::iter::empty(), NodeKind::Content, 4);
        assert_eq!(allocated.alias, "con-5");
        assert_eq!(allocated.suffix, 5);
    }

    #[test]
    fn next_alias_skips_aliases_of_other_types() {
        // a generator renamed into the content namespace still blocks it
        let nodes = vec![
            node("a", NodeKind::Generator, "con-1"),
            node("b", NodeKind::Content, "con-2"),
        ];
        let allocated = next_alias(&nodes, NodeKind::Content, 0);
        assert_eq!(allocated.alias, "con-3");
    }

    #[test]
    fn uniqueness_ignores_excluded_node() {
        let nodes = vec![node("a", NodeKind::Content, "con-1")];
        assert!(is_alias_unique(&nodes, "con-1", Some(&NodeId::new("a"))));
        assert!(!is_alias_unique(&nodes, "con-1", Some(&NodeId::new("b"))));
        assert!(!is_alias_unique(&nodes, "con-1", None));
        assert!(is_alias_unique(&nodes, "Con-1", None));
    }

    #[test]
    fn validate_trims_and_rejects() {
        let nodes = vec![node("a", NodeKind::Content, "con-1")];
        assert_eq!(validate_alias(&nodes, "  notes ", None), Ok("notes".to_string()));
        assert_eq!(validate_alias(&nodes, "   ", None), Err(AliasError::Empty));
        assert_eq!(
            validate_alias(&nodes, " con-1", None),
            Err(AliasError::Duplicate("con-1".to_string()))
        );
    }
}
