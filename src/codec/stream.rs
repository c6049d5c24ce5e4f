//! Operation stream assembly for the rich-graph grammar.
//!
//! Two-pass construction over the structural tree: pass 1 emits every
//! `addNode` and `addMorph`, pass 2 emits attribute/relation/function
//! operations plus description updates. A consumer applying the stream in
//! order never references an id that has not yet been created; relation
//! targets without an explicit heading are the one exception, created inline
//! immediately before the relation that needs them.

use std::collections::{HashMap, HashSet};

use crate::{
    codec::{
        diagnostic::ParseDiagnostic,
        heading,
        neighborhood::{self, NeighborhoodStatement},
        structure::{StructuralBlock, StructuralTree},
    },
    operation::{
        GraphDescriptionPayload, MorphPayload, NodePayload, NodeUpdatePayload, Operation,
        OperationIdentity, DEFAULT_MORPH, DEFAULT_ROLE,
    },
    schema::SchemaRegistry,
};

/// A flat, ordered operation stream plus the low-severity diagnostics
/// gathered while building it.
#[derive(Debug, Clone, Default)]
pub struct StreamOutput {
    pub operations: Vec<Operation>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

struct StreamBuilder<'a> {
    registry: &'a SchemaRegistry,
    operations: Vec<Operation>,
    diagnostics: Vec<ParseDiagnostic>,
    /// node id -> index of its addNode operation, for role patching
    node_index: HashMap<String, usize>,
    /// Identities already in the stream. Duplicated headings resolve their
    /// bodies more than once; morph names stay unique per node and repeated
    /// statements collapse to one operation.
    emitted: HashSet<OperationIdentity>,
}

impl<'a> StreamBuilder<'a> {
    fn new(registry: &'a SchemaRegistry) -> Self {
        StreamBuilder {
            registry,
            operations: Vec::new(),
            diagnostics: Vec::new(),
            node_index: HashMap::new(),
            emitted: HashSet::new(),
        }
    }

    fn push_unique(&mut self, op: Operation) {
        if self.emitted.insert(op.identity()) {
            self.operations.push(op);
        } else {
            tracing::debug!("[stream] dropping duplicate operation {}", op.identity());
        }
    }

    /// Pass 1: node and morph creations, in textual order.
    fn emit_creations(&mut self, tree: &StructuralTree) {
        for block in tree.blocks.iter() {
            let Some(identity) = heading::resolve(&block.heading) else {
                continue;
            };
            if self.node_index.contains_key(&identity.id) {
                tracing::debug!(
                    "[stream] duplicate heading for id {}, keeping first declaration",
                    identity.id
                );
            } else {
                self.node_index
                    .insert(identity.id.clone(), self.operations.len());
                self.operations.push(Operation::AddNode(NodePayload {
                    id: identity.id.clone(),
                    base_name: identity.base_name,
                    adjective: identity.adjective,
                    quantifier: identity.quantifier,
                    role: identity.role,
                    parent_types: identity.parent_types,
                    explicit_role: identity.explicit_role,
                }));
            }

            for morph in block.morphs.iter() {
                let name = morph_name(morph);
                if name.is_empty() {
                    continue;
                }
                self.push_unique(Operation::AddMorph(MorphPayload {
                    node_id: identity.id.clone(),
                    name,
                }));
            }
        }
    }

    /// Pass 2: neighborhood statements and description updates.
    fn emit_neighborhoods(&mut self, tree: &StructuralTree) {
        for block in tree.blocks.iter() {
            let Some(identity) = heading::resolve(&block.heading) else {
                continue;
            };
            let id = identity.id;

            if let Some(description) = block.description.as_ref() {
                self.operations.push(Operation::UpdateNode(NodeUpdatePayload {
                    id: id.clone(),
                    description: Some(description.clone()),
                    role: None,
                }));
            }

            self.emit_body(&id, DEFAULT_MORPH, block);
            for morph in block.morphs.iter() {
                let name = morph_name(morph);
                if name.is_empty() {
                    continue;
                }
                if morph.description.is_some() {
                    // Morphs have no description slot of their own, and
                    // writing through to the node would overwrite the node's
                    // own description at apply time.
                    self.diagnostics.push(ParseDiagnostic::info(format!(
                        "Description fence under morph '{name}' of node '{id}' is not applied"
                    )));
                }
                self.emit_body(&id, &name, morph);
            }
        }

        if let Some(description) = tree.graph_description.as_ref() {
            self.operations
                .push(Operation::UpdateGraphDescription(GraphDescriptionPayload {
                    description: description.clone(),
                }));
        }
    }

    fn emit_body(&mut self, owner_id: &str, morph: &str, block: &StructuralBlock) {
        let resolution = neighborhood::resolve(self.registry, owner_id, morph, &block.content);
        self.diagnostics.extend(resolution.diagnostics);

        for statement in resolution.statements {
            match statement {
                NeighborhoodStatement::Attribute(payload) => {
                    self.push_unique(Operation::AddAttribute(payload));
                }
                NeighborhoodStatement::Function(payload) => {
                    self.push_unique(Operation::ApplyFunction(payload));
                }
                NeighborhoodStatement::Relation {
                    forced_source_role,
                    targets,
                } => {
                    if let Some(role) = forced_source_role {
                        self.force_role(owner_id, &role);
                    }
                    for target in targets {
                        self.ensure_target(
                            &target.payload.target,
                            &target.base_name,
                            target.adjective.clone(),
                            target.quantifier.clone(),
                            target.inferred_role.clone(),
                        );
                        self.push_unique(Operation::AddRelation(target.payload));
                    }
                }
            }
        }
    }

    /// Overwrite a node's role from relation domain inference, but never a
    /// role the author wrote out.
    fn force_role(&mut self, id: &str, role: &str) {
        let Some(&idx) = self.node_index.get(id) else {
            return;
        };
        if let Operation::AddNode(payload) = &mut self.operations[idx] {
            if !payload.explicit_role && payload.role != role {
                tracing::debug!("[stream] forcing role of {id} to {role} via relation domain");
                payload.role = role.to_string();
            }
        }
    }

    /// Create a relation target inline when no heading anywhere in the text
    /// declares it.
    fn ensure_target(
        &mut self,
        id: &str,
        base_name: &str,
        adjective: Option<String>,
        quantifier: Option<String>,
        inferred_role: Option<String>,
    ) {
        if self.node_index.contains_key(id) {
            return;
        }
        self.node_index.insert(id.to_string(), self.operations.len());
        self.operations.push(Operation::AddNode(NodePayload {
            id: id.to_string(),
            base_name: base_name.to_string(),
            adjective,
            quantifier,
            role: inferred_role.unwrap_or_else(|| DEFAULT_ROLE.to_string()),
            parent_types: vec![],
            explicit_role: false,
        }));
    }
}

fn morph_name(block: &StructuralBlock) -> String {
    block.heading.trim_start_matches('#').trim().to_string()
}

/// Build the rich-graph operation stream for a structural tree.
pub fn build(registry: &SchemaRegistry, tree: &StructuralTree) -> StreamOutput {
    let mut builder = StreamBuilder::new(registry);
    builder.diagnostics.extend(tree.diagnostics.iter().cloned());
    builder.emit_creations(tree);
    builder.emit_neighborhoods(tree);
    StreamOutput {
        operations: builder.operations,
        diagnostics: builder.diagnostics,
    }
}
