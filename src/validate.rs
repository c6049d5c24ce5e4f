//! Schema validation of finished operation streams.
//!
//! Validation is a pure cross-check and never throws: every violation is
//! accumulated into an [`ErrorRecord`] list so callers see the complete
//! error set for a parse or diff call. The caller decides whether a
//! non-empty list blocks applying the operations or is merely advisory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{
    operation::{Operation, DEFAULT_ROLE},
    schema::SchemaRegistry,
};

/// A human-readable schema violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
}

impl ErrorRecord {
    fn new(message: impl Into<String>) -> Self {
        ErrorRecord {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

#[derive(Debug, Clone)]
struct DeclaredRole {
    role: String,
    explicit: bool,
}

/// Map node id -> declared role by scanning node creations and updates;
/// last writer for a given id wins.
fn role_map(operations: &[Operation]) -> HashMap<String, DeclaredRole> {
    let mut roles = HashMap::new();
    for op in operations {
        match op {
            Operation::AddNode(p) => {
                roles.insert(
                    p.id.clone(),
                    DeclaredRole {
                        role: p.role.clone(),
                        explicit: p.explicit_role,
                    },
                );
            }
            Operation::UpdateNode(p) => {
                if let Some(role) = p.role.as_ref() {
                    roles.insert(
                        p.id.clone(),
                        DeclaredRole {
                            role: role.clone(),
                            explicit: true,
                        },
                    );
                }
            }
            _ => {}
        }
    }
    roles
}

/// Validate an operation stream against the schema registry.
///
/// `strict` additionally flags every node whose role defaulted to
/// `individual` without an explicit declaration.
pub fn validate_operations(
    operations: &[Operation],
    registry: &SchemaRegistry,
    strict: bool,
) -> Vec<ErrorRecord> {
    let roles = role_map(operations);
    let role_of = |id: &str| -> String {
        roles
            .get(id)
            .map(|r| r.role.clone())
            .unwrap_or_else(|| DEFAULT_ROLE.to_string())
    };

    let mut errors = Vec::new();
    for op in operations {
        match op {
            Operation::AddNode(p) => {
                if registry.node_type(&p.role).is_none() {
                    errors.push(ErrorRecord::new(format!(
                        "Unknown role '{}' on node '{}'",
                        p.role, p.id
                    )));
                }
                for parent in p.parent_types.iter() {
                    if registry.node_type(parent).is_none() {
                        errors.push(ErrorRecord::new(format!(
                            "Unknown parent type '{}' on node '{}'",
                            parent, p.id
                        )));
                    }
                }
                if strict && !p.explicit_role && p.role == DEFAULT_ROLE {
                    errors.push(ErrorRecord::new(format!(
                        "Node '{}' has no declared type (strict mode)",
                        p.id
                    )));
                }
            }
            Operation::AddRelation(p) => {
                let Some(def) = registry.relation_type(&p.name) else {
                    errors.push(ErrorRecord::new(format!(
                        "Unknown relation type '{}' between '{}' and '{}'",
                        p.name, p.source, p.target
                    )));
                    continue;
                };
                if !def.domain.is_empty() {
                    let source_role = role_of(&p.source);
                    if !def.domain.contains(&source_role) {
                        errors.push(ErrorRecord::new(format!(
                            "Relation '{}' does not allow source role '{}' (domain: {:?})",
                            def.name, source_role, def.domain
                        )));
                    }
                }
                if !def.range.is_empty() {
                    let target_role = role_of(&p.target);
                    if !def.range.contains(&target_role) {
                        errors.push(ErrorRecord::new(format!(
                            "Relation '{}' does not allow target role '{}' (range: {:?})",
                            def.name, target_role, def.range
                        )));
                    }
                }
            }
            Operation::AddAttribute(p) => {
                let Some(def) = registry.attribute_type(&p.name) else {
                    errors.push(ErrorRecord::new(format!(
                        "Unknown attribute type '{}' on node '{}'",
                        p.name, p.source
                    )));
                    continue;
                };
                if !def.scope.is_empty() {
                    let source_role = role_of(&p.source);
                    if !def.scope.contains(&source_role) {
                        errors.push(ErrorRecord::new(format!(
                            "Attribute '{}' is out of scope for role '{}' (scope: {:?})",
                            def.name, source_role, def.scope
                        )));
                    }
                }
            }
            Operation::ApplyFunction(p) => {
                if registry.function_type(&p.name).is_none() {
                    errors.push(ErrorRecord::new(format!(
                        "Unknown function '{}' on node '{}'",
                        p.name, p.source
                    )));
                }
            }
            _ => {}
        }
    }

    if !errors.is_empty() {
        tracing::debug!("[validate] {} schema violation(s)", errors.len());
    }
    errors
}
