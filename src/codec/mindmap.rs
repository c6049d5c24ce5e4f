//! MindMap grammar: a restricted pipeline in which headings form a strict
//! tree by `#` depth and every parent→child pair compiles to a single
//! relation of a caller-supplied type.
//!
//! Shares only the structural primitives with the rich-graph pipeline; there
//! are no morphs and no statements beyond descriptions here, which keeps the
//! two grammars from contaminating each other.

use crate::{
    codec::{
        diagnostic::ParseDiagnostic,
        heading,
        structure::StructuralTree,
    },
    operation::{
        GraphDescriptionPayload, NodePayload, NodeUpdatePayload, Operation, RelationPayload,
        DEFAULT_MORPH,
    },
    schema::SchemaRegistry,
    codec::stream::StreamOutput,
};
use std::collections::HashSet;

/// Relation type used when the text carries no `<! MindMap Mode: ...>`
/// directive.
pub const DEFAULT_MINDMAP_RELATION: &str = "contains";

/// Build the mindmap operation stream from a flat outline tree.
pub fn build(registry: &SchemaRegistry, tree: &StructuralTree) -> StreamOutput {
    let mut output = StreamOutput {
        operations: Vec::new(),
        diagnostics: tree.diagnostics.clone(),
    };

    let relation_name = match tree.mindmap_relation.as_ref() {
        Some(declared) => registry
            .relation_type(declared)
            .map(|def| def.name.clone())
            .unwrap_or_else(|| declared.clone()),
        None => {
            output.diagnostics.push(ParseDiagnostic::warning(format!(
                "No '<! MindMap Mode: ...>' directive; defaulting relation type to '{DEFAULT_MINDMAP_RELATION}'"
            )));
            DEFAULT_MINDMAP_RELATION.to_string()
        }
    };

    // (depth, id) ancestry of the node most recently emitted
    let mut stack: Vec<(usize, String)> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut seen_edges: HashSet<(String, String)> = HashSet::new();

    for block in tree.blocks.iter() {
        let Some(identity) = heading::resolve(&block.heading) else {
            continue;
        };
        let id = identity.id.clone();

        if seen.insert(id.clone()) {
            output.operations.push(Operation::AddNode(NodePayload {
                id: id.clone(),
                base_name: identity.base_name,
                adjective: identity.adjective,
                quantifier: identity.quantifier,
                role: identity.role,
                parent_types: identity.parent_types,
                explicit_role: identity.explicit_role,
            }));
        }

        if let Some(description) = block.description.as_ref() {
            output.operations.push(Operation::UpdateNode(NodeUpdatePayload {
                id: id.clone(),
                description: Some(description.clone()),
                role: None,
            }));
        }

        for content in block.content.iter() {
            output.diagnostics.push(ParseDiagnostic::skipped(
                content.line,
                content.text.clone(),
                "mindmap mode carries no statements",
            ));
        }

        while stack
            .last()
            .map(|(depth, _)| *depth >= block.depth)
            .unwrap_or(false)
        {
            stack.pop();
        }
        if let Some((_, parent_id)) = stack.last() {
            if seen_edges.insert((parent_id.clone(), id.clone())) {
                output.operations.push(Operation::AddRelation(RelationPayload {
                    source: parent_id.clone(),
                    name: relation_name.clone(),
                    target: id.clone(),
                    adverb: None,
                    modality: None,
                    morph: DEFAULT_MORPH.to_string(),
                    target_morph: None,
                }));
            }
        }
        stack.push((block.depth, id));
    }

    if let Some(description) = tree.graph_description.as_ref() {
        output
            .operations
            .push(Operation::UpdateGraphDescription(GraphDescriptionPayload {
                description: description.clone(),
            }));
    }

    output
}
