//! Compilation pipeline from controlled-natural-language text to graph
//! operation streams.
//!
//! The pipeline runs in fixed stages: [`structure`] scans raw text into a
//! structural tree, [`heading`] derives stable node identities, and
//! [`stream`] (or [`mindmap`] when mindmap mode is active) lowers the tree
//! into an ordered operation stream. Malformed lines never abort a compile;
//! they surface as [`ParseDiagnostic`] entries on the result.

pub mod diagnostic;
pub mod heading;
pub mod mindmap;
pub mod neighborhood;
pub mod stream;
pub mod structure;

use serde::{Deserialize, Serialize};

pub use diagnostic::ParseDiagnostic;
pub use heading::NodeIdentity;
pub use structure::StructuralTree;

use crate::{
    error::CnlError,
    operation::Operation,
    schema::SchemaRegistry,
    validate::{validate_operations, ErrorRecord},
};

/// Which lowering the compiler applies to the structural tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileMode {
    /// Full grammar: morphs, attributes, relations, functions.
    RichGraph,
    /// Headings only, joined by a single hierarchy relation.
    MindMap,
}

/// The complete outcome of one compile: the operation stream, schema
/// violations found in it, and per-line diagnostics from parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileResult {
    pub operations: Vec<Operation>,
    pub errors: Vec<ErrorRecord>,
    #[serde(skip)]
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl CompileResult {
    pub fn to_json(&self) -> Result<String, CnlError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Lines the parser could not interpret and silently skipped.
    pub fn skipped_lines(&self) -> impl Iterator<Item = &ParseDiagnostic> {
        self.diagnostics.iter().filter(|d| d.is_skipped_line())
    }
}

fn compile(text: &str, registry: &SchemaRegistry, mode: CompileMode) -> CompileResult {
    let output = match mode {
        CompileMode::RichGraph => stream::build(registry, &StructuralTree::parse(text)),
        CompileMode::MindMap => mindmap::build(registry, &StructuralTree::parse_outline(text)),
    };
    let errors = validate_operations(&output.operations, registry, false);
    CompileResult {
        operations: output.operations,
        errors,
        diagnostics: output.diagnostics,
    }
}

/// Parse CNL text into an ordered operation stream.
///
/// A `<! MindMap Mode: relation>` directive in the text switches the
/// compile to mindmap lowering; otherwise the full rich-graph grammar
/// applies. Parsing is total: malformed input yields diagnostics and
/// schema violations, never an error return.
pub fn parse_cnl(text: &str, registry: &SchemaRegistry) -> CompileResult {
    let mode = if StructuralTree::parse(text).mindmap_relation.is_some() {
        CompileMode::MindMap
    } else {
        CompileMode::RichGraph
    };
    tracing::debug!("[parse_cnl] compiling in {mode:?} mode");
    compile(text, registry, mode)
}

/// Compile with an explicit mode, ignoring any mode directive mismatch.
pub fn parse_cnl_with_mode(
    text: &str,
    registry: &SchemaRegistry,
    mode: CompileMode,
) -> CompileResult {
    compile(text, registry, mode)
}

/// Node ids in document appearance order, one per distinct heading.
///
/// Useful for callers that render graph nodes in source order without
/// materializing the full operation stream.
pub fn node_order_from_cnl(text: &str) -> Vec<String> {
    // Mindmap mode treats every heading depth as a node; rich-graph mode
    // nests depth-two headings into morphs of the node above.
    let tree = StructuralTree::parse(text);
    let blocks = if tree.mindmap_relation.is_some() {
        StructuralTree::parse_outline(text).blocks
    } else {
        tree.blocks
    };
    let mut order = Vec::new();
    for block in blocks.iter() {
        if let Some(identity) = heading::resolve(&block.heading) {
            if !order.contains(&identity.id) {
                order.push(identity.id);
            }
        }
    }
    order
}
