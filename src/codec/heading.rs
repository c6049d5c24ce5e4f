//! Heading resolution: canonical node identity from a `#` heading line.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::operation::DEFAULT_ROLE;

/// Grammar of a heading line: `#+ [**adjective**] [*quantifier*] Name [Role1; Role2]`.
pub(crate) static HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(#+)\s*(?:\*\*([^*]+)\*\*\s*)?(?:\*([^*]+)\*\s*)?([^\[\]]+?)\s*(?:\[([^\]]*)\])?\s*$",
    )
    .expect("heading grammar regex is valid")
});

/// Canonical identity of a node, derived deterministically from its heading.
///
/// Two headings with the same base name and adjective always yield the same
/// `id`; this is the invariant that makes re-parsing and diffing idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeIdentity {
    pub id: String,
    pub base_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantifier: Option<String>,
    pub role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_types: Vec<String>,
    /// Whether a role was written in the heading rather than defaulted.
    #[serde(default)]
    pub explicit_role: bool,
}

/// Normalize one name part for id derivation: NFKD, lowercase, whitespace
/// runs to `_`, every other non-alphanumeric character stripped.
fn slug_part(text: &str) -> String {
    let normalized: String = text.nfkd().collect();
    normalized
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}

/// Derive the deterministic node id for a base name and optional adjective.
pub fn node_id(base_name: &str, adjective: Option<&str>) -> String {
    let base = slug_part(base_name);
    match adjective.map(slug_part).filter(|a| !a.is_empty()) {
        Some(adjective) => format!("{adjective}_{base}"),
        None => base,
    }
}

/// Depth (number of `#`s) of a heading line, if it matches the heading
/// grammar at all.
pub(crate) fn heading_depth(line: &str) -> Option<usize> {
    let captures = HEADING_RE.captures(line)?;
    let name = captures.get(4).map(|m| m.as_str().trim()).unwrap_or("");
    if name.is_empty() {
        return None;
    }
    Some(captures[1].len())
}

/// Resolve a heading line into a [`NodeIdentity`].
///
/// Returns `None` when the line does not satisfy the heading grammar; the
/// structural tree builder then treats it as plain content rather than
/// raising an error.
pub fn resolve(heading_line: &str) -> Option<NodeIdentity> {
    let captures = HEADING_RE.captures(heading_line.trim_end())?;

    let adjective = captures.get(2).map(|m| m.as_str().trim().to_string());
    let quantifier = captures.get(3).map(|m| m.as_str().trim().to_string());
    let base_name = captures.get(4)?.as_str().trim().to_string();
    if base_name.is_empty() {
        return None;
    }

    let mut roles: Vec<String> = captures
        .get(5)
        .map(|m| {
            m.as_str()
                .split(';')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let explicit_role = !roles.is_empty();
    let role = if explicit_role {
        roles.remove(0)
    } else {
        DEFAULT_ROLE.to_string()
    };

    let id = node_id(&base_name, adjective.as_deref());
    tracing::debug!("[heading] '{heading_line}' -> id={id}, role={role}");

    Some(NodeIdentity {
        id,
        base_name,
        adjective,
        quantifier,
        role,
        parent_types: roles,
        explicit_role,
    })
}
