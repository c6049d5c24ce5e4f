//! Set-based diffing of two CNL documents.
//!
//! Both texts compile independently to operation streams, each stream is
//! indexed by [`OperationIdentity`], and the diff is the set difference:
//! identities present only in the old stream become delete operations,
//! identities present only in the new stream are emitted verbatim, and
//! update operations present in both streams are re-emitted from the new
//! stream. Order within the streams never influences which operations the
//! diff contains, only the order they are emitted in.

use std::collections::HashMap;

use crate::{
    codec::{parse_cnl_with_mode, CompileMode, CompileResult},
    operation::{Operation, OperationIdentity},
    schema::SchemaRegistry,
};

/// Compute the operation delta between two operation streams.
///
/// Deletes come first, in reverse old-stream order so dependents fall
/// before the nodes they hang off. Additions and re-emitted updates follow
/// in new-stream order.
pub fn diff(old_ops: &[Operation], new_ops: &[Operation]) -> Vec<Operation> {
    let old_index: HashMap<OperationIdentity, &Operation> =
        old_ops.iter().map(|op| (op.identity(), op)).collect();
    let new_index: HashMap<OperationIdentity, &Operation> =
        new_ops.iter().map(|op| (op.identity(), op)).collect();

    let mut delta = Vec::new();

    for op in old_ops.iter().rev() {
        if !new_index.contains_key(&op.identity()) {
            // Updates have no delete counterpart; when the statement that
            // produced one disappears, the update simply stops firing.
            if let Some(delete) = op.delete_counterpart() {
                delta.push(delete);
            }
        }
    }

    for op in new_ops.iter() {
        match old_index.get(&op.identity()) {
            None => delta.push(op.clone()),
            // Identity carries no payload for updates, so a surviving
            // update is re-applied with its current payload.
            Some(_) if op.is_update() => delta.push(op.clone()),
            Some(_) => {}
        }
    }

    tracing::debug!(
        "[diff] {} old, {} new, {} delta operations",
        old_ops.len(),
        new_ops.len(),
        delta.len()
    );
    delta
}

/// Diff two CNL texts in the given compile mode.
///
/// Errors and diagnostics on the result describe the new text; the old
/// text only contributes the baseline operation set.
pub fn diff_cnl(
    old_text: &str,
    new_text: &str,
    registry: &SchemaRegistry,
    mode: CompileMode,
) -> CompileResult {
    let old = parse_cnl_with_mode(old_text, registry, mode);
    let new = parse_cnl_with_mode(new_text, registry, mode);
    CompileResult {
        operations: diff(&old.operations, &new.operations),
        errors: new.errors,
        diagnostics: new.diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::value_hash;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::create()
    }

    fn ops(text: &str) -> Vec<Operation> {
        parse_cnl_with_mode(text, &registry(), CompileMode::RichGraph).operations
    }

    #[test]
    fn test_identical_texts_reemit_only_updates() {
        let text = "# Water\n```description\nPure water.\n```\nhas mass: 18;\n";
        let delta = diff(&ops(text), &ops(text));
        // The description update survives both streams and re-fires; the
        // node and attribute additions do not.
        assert_eq!(delta.len(), 1);
        assert!(matches!(&delta[0], Operation::UpdateNode(p) if p.id == "water"));
    }

    #[test]
    fn test_added_statement_emits_only_the_addition() {
        let old = "# Water\n";
        let new = "# Water\nhas mass: 18;\n";
        let delta = diff(&ops(old), &ops(new));
        assert_eq!(delta.len(), 1);
        match &delta[0] {
            Operation::AddAttribute(p) => {
                assert_eq!(p.source, "water");
                assert_eq!(p.name, "mass");
            }
            other => panic!("expected addAttribute, got {other:?}"),
        }
    }

    #[test]
    fn test_removed_statement_emits_delete() {
        let old = "# Water\nhas mass: 18;\n";
        let new = "# Water\n";
        let delta = diff(&ops(old), &ops(new));
        assert_eq!(delta.len(), 1);
        match &delta[0] {
            Operation::DeleteAttribute {
                source,
                name,
                value_hash: hash,
            } => {
                assert_eq!(source, "water");
                assert_eq!(name, "mass");
                assert_eq!(hash, &value_hash("18"));
            }
            other => panic!("expected deleteAttribute, got {other:?}"),
        }
    }

    #[test]
    fn test_changed_attribute_value_is_delete_then_add() {
        let old = "# Water\nhas mass: 18;\n";
        let new = "# Water\nhas mass: 20;\n";
        let delta = diff(&ops(old), &ops(new));
        // Content-addressed identity: a new value is a different attribute.
        assert_eq!(delta.len(), 2);
        assert!(matches!(&delta[0], Operation::DeleteAttribute { .. }));
        assert!(matches!(&delta[1], Operation::AddAttribute(p) if p.value == "20"));
    }

    #[test]
    fn test_deletes_precede_adds_in_reverse_old_order() {
        let old = "# Water\nhas mass: 18;\n<is a> Liquid;\n";
        let new = "# Steam\n";
        let delta = diff(&ops(old), &ops(new));
        // Old stream order: addNode water, addAttribute, implicit
        // addNode liquid, addRelation. Deletes come out reversed.
        let kinds: Vec<&str> = delta
            .iter()
            .map(|op| match op {
                Operation::DeleteRelation { .. } => "deleteRelation",
                Operation::DeleteNode { id } if id == "liquid" => "deleteLiquid",
                Operation::DeleteAttribute { .. } => "deleteAttribute",
                Operation::DeleteNode { id } if id == "water" => "deleteWater",
                Operation::AddNode(p) if p.id == "steam" => "addSteam",
                other => panic!("unexpected op {other:?}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                "deleteRelation",
                "deleteLiquid",
                "deleteAttribute",
                "deleteWater",
                "addSteam",
            ]
        );
    }

    #[test]
    fn test_renamed_node_is_full_replacement() {
        let old = "# Water\n";
        let new = "# Ice\n";
        let delta = diff(&ops(old), &ops(new));
        assert!(delta
            .iter()
            .any(|op| matches!(op, Operation::DeleteNode { id } if id == "water")));
        assert!(delta
            .iter()
            .any(|op| matches!(op, Operation::AddNode(p) if p.id == "ice")));
    }

    #[test]
    fn test_morph_scoped_attribute_changes_only_touch_that_morph() {
        let old = "# Water\n## Frozen\nhas state: solid;\n";
        let new = "# Water\n## Frozen\nhas state: crystalline;\n";
        let delta = diff(&ops(old), &ops(new));
        assert_eq!(delta.len(), 2);
        for op in delta.iter() {
            match op {
                Operation::DeleteAttribute { .. } => {}
                Operation::AddAttribute(p) => assert_eq!(p.morph, "Frozen"),
                other => panic!("unexpected op {other:?}"),
            }
        }
    }

    #[test]
    fn test_diff_cnl_carries_new_side_errors() {
        let registry = registry();
        let result = diff_cnl(
            "# Water\n",
            "# Water\n<made of> Hydrogen;\n",
            &registry,
            CompileMode::RichGraph,
        );
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("made of"));
        assert!(result
            .operations
            .iter()
            .any(|op| matches!(op, Operation::AddRelation(p) if p.name == "made of")));
    }

    #[test]
    fn test_mindmap_diff_reparents_subtree() {
        let registry = registry();
        let old = "# Root\n## Child\n";
        let new = "# Root\n## Middle\n### Child\n";
        let result = diff_cnl(old, new, &registry, CompileMode::MindMap);
        assert!(result
            .operations
            .iter()
            .any(|op| matches!(op, Operation::DeleteRelation { source, target, .. }
                if source == "root" && target == "child")));
        assert!(result
            .operations
            .iter()
            .any(|op| matches!(op, Operation::AddRelation(p)
                if p.source == "middle" && p.target == "child")));
    }
}
