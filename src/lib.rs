//! Compiler from controlled-natural-language (CNL) documents to ordered
//! graph operation streams.
//!
//! A CNL document is a markdown-flavored outline: `#` headings declare
//! nodes, `##` headings declare morphs (named contexts on the node above),
//! and body lines declare attributes (`has name: value;`), relations
//! (`<relation> Target;`) and functions (`has function "name";`). Parsing
//! a document yields a deterministic stream of `add*`/`update*` operations
//! ([`parse_cnl`]), and two documents can be diffed into the minimal
//! delete/add delta needed to migrate a graph from one to the other
//! ([`diff_cnl`]). All node and statement identities are derived purely
//! from the text, so re-parsing the same document always yields the same
//! stream.
//!
//! Schema knowledge (node roles, relation types with domain and range,
//! attribute and function definitions) lives in the process-wide
//! [`schema::SCHEMAS`] registry, or in a caller-supplied
//! [`schema::SchemaRegistry`] for isolated use. Validation against the
//! schema is advisory: violations are collected as [`validate::ErrorRecord`]
//! values on the compile result, never raised as hard errors.

pub mod codec;
pub mod diff;
pub mod error;
pub mod operation;
pub mod schema;
pub mod validate;

pub use codec::{node_order_from_cnl, parse_cnl, CompileMode, CompileResult, ParseDiagnostic};
pub use diff::diff_cnl;
pub use error::CnlError;
pub use operation::Operation;
pub use schema::{SchemaRegistry, SCHEMAS};
pub use validate::{validate_operations, ErrorRecord};
