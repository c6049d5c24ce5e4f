//! Neighborhood resolution: attribute, relation, and function statements in
//! the body of a node block or morph.
//!
//! Three statement grammars are recognized per line (or per fenced block,
//! which the structural stage collapses to one content entry):
//!
//! ```text
//! has AttributeName: [++adverb++] value [*unit*] [[modality]];
//! [++adverb++]<RelationName>[ [modality]] Target1[:morph]; Target2;
//! has function "FunctionName";
//! ```
//!
//! Relation names are resolved against the schema registry (canonical name
//! or alias). A resolved relation's domain forces the source node's role and
//! its range infers the target's role; the canonical `is_a` always forces
//! the target role to `class`. Unknown relation names pass through literally
//! with no inference; the validator reports them later.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    codec::{diagnostic::ParseDiagnostic, heading::node_id, structure::ContentLine},
    operation::{AttributePayload, FunctionPayload, RelationPayload},
    schema::SchemaRegistry,
};

static FUNCTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^has\s+function\s+"([^"]+)"\s*;?\s*$"#).expect("function grammar regex is valid")
});

static ATTRIBUTE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^has\s+([^:;]+?)\s*:\s*([^;]*?)\s*;?\s*$").expect("attribute grammar regex is valid")
});

static RELATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\+\+([^+]+)\+\+\s*)?<([^<>]+)>\s*(?:\[([^\[\]]+)\]\s*)?(.+?)\s*;?\s*$")
        .expect("relation grammar regex is valid")
});

static ADVERB_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+\+([^+]+)\+\+\s*(.*)$").expect("adverb regex is valid"));

static MODALITY_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*\[([^\[\]]+)\]$").expect("modality regex is valid"));

static UNIT_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*\*([^*]+)\*$").expect("unit regex is valid"));

/// Target string grammar: `[**adjective**] [*quantifier*] baseName[:morphName]`.
static TARGET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\*\*([^*]+)\*\*\s*)?(?:\*([^*]+)\*\s*)?([^:]+?)\s*(?::\s*(\S[^:]*?))?\s*$")
        .expect("target grammar regex is valid")
});

/// One resolved relation target, ready for the stream builder to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelationTarget {
    pub payload: RelationPayload,
    pub base_name: String,
    pub adjective: Option<String>,
    pub quantifier: Option<String>,
    /// Role the target should be created with if it has no explicit heading
    /// anywhere in the text: `class` for `is_a`, otherwise `range[0]`.
    pub inferred_role: Option<String>,
}

/// One statement recognized in a block or morph body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeighborhoodStatement {
    Attribute(AttributePayload),
    Function(FunctionPayload),
    Relation {
        /// `domain[0]` of a registry-resolved relation, forcing the source
        /// node's role when it was never explicitly declared.
        forced_source_role: Option<String>,
        targets: Vec<ResolvedRelationTarget>,
    },
}

/// Output of resolving one body.
#[derive(Debug, Clone, Default)]
pub struct NeighborhoodResolution {
    pub statements: Vec<NeighborhoodStatement>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Strip `++adverb++`, `[modality]`, and `*unit*` modifiers off an attribute
/// value expression, in that order.
fn split_value_modifiers(raw: &str) -> (String, Option<String>, Option<String>, Option<String>) {
    let mut rest = raw.trim().to_string();

    let mut adverb = None;
    let adverb_caps = ADVERB_PREFIX_RE
        .captures(&rest)
        .map(|c| (c[1].trim().to_string(), c[2].trim().to_string()));
    if let Some((found, remainder)) = adverb_caps {
        adverb = Some(found);
        rest = remainder;
    }

    let mut modality = None;
    let modality_caps = MODALITY_SUFFIX_RE
        .captures(&rest)
        .map(|c| (c[1].trim().to_string(), c[2].trim().to_string()));
    if let Some((remainder, found)) = modality_caps {
        modality = Some(found);
        rest = remainder;
    }

    let mut unit = None;
    let unit_caps = UNIT_SUFFIX_RE
        .captures(&rest)
        .map(|c| (c[1].trim().to_string(), c[2].trim().to_string()));
    if let Some((remainder, found)) = unit_caps {
        unit = Some(found);
        rest = remainder;
    }

    (rest, adverb, unit, modality)
}

/// Resolve the body of a block or morph into typed statements.
///
/// `owner_id` is the node the body belongs to and `morph` the context its
/// statements attach to (`basic` for the default context). Unrecognized
/// lines are skipped with a diagnostic, never an error.
pub fn resolve(
    registry: &SchemaRegistry,
    owner_id: &str,
    morph: &str,
    lines: &[ContentLine],
) -> NeighborhoodResolution {
    let mut resolution = NeighborhoodResolution::default();

    for content in lines {
        let line = content.text.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(captures) = FUNCTION_RE.captures(line) {
            resolution
                .statements
                .push(NeighborhoodStatement::Function(FunctionPayload {
                    source: owner_id.to_string(),
                    name: captures[1].trim().to_string(),
                    morph: morph.to_string(),
                }));
            continue;
        }

        if let Some(captures) = ATTRIBUTE_RE.captures(line) {
            let name = captures[1].trim().to_string();
            let (value, adverb, unit, modality) = split_value_modifiers(&captures[2]);
            if !value.is_empty() {
                resolution
                    .statements
                    .push(NeighborhoodStatement::Attribute(AttributePayload {
                        source: owner_id.to_string(),
                        name,
                        value,
                        adverb,
                        unit,
                        modality,
                        morph: morph.to_string(),
                    }));
                continue;
            }
            resolution.diagnostics.push(ParseDiagnostic::skipped(
                content.line,
                line,
                "attribute statement with empty value",
            ));
            continue;
        }

        if let Some(captures) = RELATION_RE.captures(line) {
            if let Some(statement) = resolve_relation(registry, owner_id, morph, &captures) {
                resolution.statements.push(statement);
                continue;
            }
        }

        tracing::debug!("[neighborhood] skipping line {}: {line}", content.line);
        resolution.diagnostics.push(ParseDiagnostic::skipped(
            content.line,
            line,
            "no statement grammar matched",
        ));
    }

    resolution
}

fn resolve_relation(
    registry: &SchemaRegistry,
    owner_id: &str,
    morph: &str,
    captures: &regex::Captures<'_>,
) -> Option<NeighborhoodStatement> {
    let adverb = captures.get(1).map(|m| m.as_str().trim().to_string());
    let typed_name = captures[2].trim().to_string();
    let modality = captures.get(3).map(|m| m.as_str().trim().to_string());
    let targets_blob = captures[4].trim();

    let maybe_def = registry.relation_type(&typed_name);
    let (name, forced_source_role, range) = match maybe_def.as_deref() {
        Some(def) => (
            def.name.clone(),
            def.domain.first().cloned(),
            def.range.clone(),
        ),
        None => {
            tracing::debug!(
                "[neighborhood] relation '{typed_name}' not in registry; using literal name"
            );
            (typed_name.clone(), None, Vec::new())
        }
    };

    let mut targets = Vec::new();
    for target_str in targets_blob.split(';').map(str::trim).filter(|t| !t.is_empty()) {
        let Some(target_captures) = TARGET_RE.captures(target_str) else {
            continue;
        };
        let adjective = target_captures.get(1).map(|m| m.as_str().trim().to_string());
        let quantifier = target_captures.get(2).map(|m| m.as_str().trim().to_string());
        let base_name = target_captures.get(3)?.as_str().trim().to_string();
        if base_name.is_empty() {
            continue;
        }
        let target_morph = target_captures.get(4).map(|m| m.as_str().trim().to_string());
        let target_id = node_id(&base_name, adjective.as_deref());

        let inferred_role = if maybe_def.is_some() {
            if name == "is_a" {
                Some("class".to_string())
            } else {
                range.first().cloned()
            }
        } else {
            None
        };

        targets.push(ResolvedRelationTarget {
            payload: RelationPayload {
                source: owner_id.to_string(),
                name: name.clone(),
                target: target_id,
                adverb: adverb.clone(),
                modality: modality.clone(),
                morph: morph.to_string(),
                target_morph,
            },
            base_name,
            adjective,
            quantifier,
            inferred_role,
        });
    }

    if targets.is_empty() {
        return None;
    }

    Some(NeighborhoodStatement::Relation {
        forced_source_role,
        targets,
    })
}
