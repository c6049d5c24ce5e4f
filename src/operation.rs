//! Graph-mutation operations and their diff-time identities.
//!
//! The compiler's entire output surface is the [`Operation`] enum: a flat,
//! ordered stream of tagged mutations handed to an external graph mutation
//! applier. Operations are ephemeral. They are rebuilt from text on every
//! compile call and their [`OperationIdentity`] exists only for diff-time set
//! comparison, never for persistence.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};

use crate::error::CnlError;

/// Morph every node owns implicitly; statements outside any `##` sub-heading
/// attach here.
pub const DEFAULT_MORPH: &str = "basic";

/// Role assigned to nodes that never declare one.
pub const DEFAULT_ROLE: &str = "individual";

/// Identity key of the single graph-description slot.
pub const GRAPH_DESCRIPTION_KEY: &str = "graph_description";

/// Content-address a value string.
///
/// Attribute identities embed this hash so a value edit produces a different
/// identity, which the diff engine sees as delete-old plus add-new.
pub fn value_hash(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    hex::encode(&digest[..6])
}

/// Payload of `addNode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePayload {
    pub id: String,
    pub base_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantifier: Option<String>,
    pub role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_types: Vec<String>,
    /// Whether the role was written in the source text rather than defaulted
    /// or inferred. Strict-mode validation consults this.
    #[serde(default)]
    pub explicit_role: bool,
}

/// Payload of `addMorph`. Morph names are unique per node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphPayload {
    pub node_id: String,
    pub name: String,
}

/// Payload of `addAttribute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributePayload {
    pub source: String,
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adverb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
    /// Owning morph on the source node.
    pub morph: String,
}

/// Payload of `addRelation`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationPayload {
    pub source: String,
    pub name: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adverb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
    /// Owning morph on the source node.
    pub morph: String,
    /// Morph of the target the relation attaches to, when the target was
    /// written as `name:morph`. `None` means the target's `basic` morph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_morph: Option<String>,
}

/// Payload of `applyFunction`. Evaluation is deferred to the collaborator
/// that owns attribute values; this is an instruction, not a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionPayload {
    pub source: String,
    pub name: String,
    pub morph: String,
}

/// Payload of `updateNode`. Only the fields present are overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeUpdatePayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Payload of `updateGraphDescription`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphDescriptionPayload {
    pub description: String,
}

/// One graph mutation. Serialized with the wire tags the external applier
/// expects (`addNode`, `deleteAttribute`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Operation {
    AddNode(NodePayload),
    AddMorph(MorphPayload),
    AddAttribute(AttributePayload),
    AddRelation(RelationPayload),
    ApplyFunction(FunctionPayload),
    UpdateNode(NodeUpdatePayload),
    UpdateGraphDescription(GraphDescriptionPayload),
    DeleteNode {
        id: String,
    },
    DeleteMorph {
        node_id: String,
        name: String,
    },
    DeleteAttribute {
        source: String,
        name: String,
        value_hash: String,
    },
    DeleteRelation {
        source: String,
        name: String,
        target: String,
    },
    DeleteFunction {
        source: String,
        name: String,
    },
}

/// Which identity family an operation belongs to.
///
/// `addNode` and `updateNode` share a key (the node id) but must never
/// collide in the diff index, so identity is the (kind, key) pair rather
/// than the bare string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Node,
    Morph,
    Attribute,
    Relation,
    Function,
    NodeUpdate,
    GraphDescription,
}

/// Deterministic diff key: identical text always produces identical
/// identities, and a content change to an attribute value produces a
/// different one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationIdentity {
    pub kind: OpKind,
    pub key: String,
}

impl Display for OperationIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key)
    }
}

impl Operation {
    /// The identity used for diff-time set comparison.
    pub fn identity(&self) -> OperationIdentity {
        let (kind, key) = match self {
            Operation::AddNode(p) => (OpKind::Node, p.id.clone()),
            Operation::DeleteNode { id } => (OpKind::Node, id.clone()),
            Operation::AddMorph(p) => (OpKind::Morph, format!("morph_{}_{}", p.node_id, p.name)),
            Operation::DeleteMorph { node_id, name } => {
                (OpKind::Morph, format!("morph_{node_id}_{name}"))
            }
            Operation::AddAttribute(p) => (
                OpKind::Attribute,
                format!("attr_{}_{}_{}", p.source, p.name, value_hash(&p.value)),
            ),
            Operation::DeleteAttribute {
                source,
                name,
                value_hash,
            } => (
                OpKind::Attribute,
                format!("attr_{source}_{name}_{value_hash}"),
            ),
            Operation::AddRelation(p) => (
                OpKind::Relation,
                format!("rel_{}_{}_{}", p.source, p.name, p.target),
            ),
            Operation::DeleteRelation {
                source,
                name,
                target,
            } => (OpKind::Relation, format!("rel_{source}_{name}_{target}")),
            Operation::ApplyFunction(p) => {
                (OpKind::Function, format!("func_{}_{}", p.source, p.name))
            }
            Operation::DeleteFunction { source, name } => {
                (OpKind::Function, format!("func_{source}_{name}"))
            }
            Operation::UpdateNode(p) => (OpKind::NodeUpdate, p.id.clone()),
            Operation::UpdateGraphDescription(_) => {
                (OpKind::GraphDescription, GRAPH_DESCRIPTION_KEY.to_string())
            }
        };
        OperationIdentity { kind, key }
    }

    /// Whether this operation is a blind overwrite that the diff engine
    /// re-emits unconditionally rather than comparing by content.
    pub fn is_update(&self) -> bool {
        matches!(
            self,
            Operation::UpdateNode(_) | Operation::UpdateGraphDescription(_)
        )
    }

    /// Whether this operation creates graph state (as opposed to updating or
    /// deleting it).
    pub fn is_creation(&self) -> bool {
        matches!(
            self,
            Operation::AddNode(_)
                | Operation::AddMorph(_)
                | Operation::AddAttribute(_)
                | Operation::AddRelation(_)
                | Operation::ApplyFunction(_)
        )
    }

    /// Synthesize the `delete*` operation retracting this creation, carrying
    /// only the identity fields. Update operations have no delete
    /// counterpart; dropping one simply stops re-emitting it.
    pub fn delete_counterpart(&self) -> Option<Operation> {
        match self {
            Operation::AddNode(p) => Some(Operation::DeleteNode { id: p.id.clone() }),
            Operation::AddMorph(p) => Some(Operation::DeleteMorph {
                node_id: p.node_id.clone(),
                name: p.name.clone(),
            }),
            Operation::AddAttribute(p) => Some(Operation::DeleteAttribute {
                source: p.source.clone(),
                name: p.name.clone(),
                value_hash: value_hash(&p.value),
            }),
            Operation::AddRelation(p) => Some(Operation::DeleteRelation {
                source: p.source.clone(),
                name: p.name.clone(),
                target: p.target.clone(),
            }),
            Operation::ApplyFunction(p) => Some(Operation::DeleteFunction {
                source: p.source.clone(),
                name: p.name.clone(),
            }),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String, CnlError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Operation, CnlError> {
        Ok(serde_json::from_str(json)?)
    }
}
