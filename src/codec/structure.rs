//! Structural tree building: splitting raw CNL text into ordered node
//! blocks, morph sub-blocks, fenced descriptions, and directives.
//!
//! This stage is purely structural. It never interprets statement grammars
//! and never fails: a line that looks like a heading but does not satisfy
//! the heading grammar is demoted to plain content of whatever block is
//! open, per the silent-skip policy.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::codec::{
    diagnostic::ParseDiagnostic,
    heading::heading_depth,
};

static FENCE_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```\s*([A-Za-z0-9_-]*)\s*$").expect("fence regex is valid"));

static MINDMAP_DIRECTIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^<!\s*mindmap mode:\s*([^>]+)>\s*$").expect("directive regex is valid")
});

/// One content line with its 1-based position in the source text, kept so
/// later stages can report skipped lines precisely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentLine {
    pub line: usize,
    pub text: String,
}

/// One `#`-level unit of the structural tree. Morphs are `##`-level
/// sub-blocks nested under their parent node; a morph has no further
/// nesting.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StructuralBlock {
    /// The raw heading line, hashes included.
    pub heading: String,
    /// Number of leading `#`s. Always 1 for node blocks, 2 for morphs in
    /// the rich-graph pipeline; the outline (mindmap) pipeline keeps deeper
    /// levels.
    pub depth: usize,
    pub description: Option<String>,
    pub content: Vec<ContentLine>,
    pub morphs: Vec<StructuralBlock>,
}

/// The fully split source text.
#[derive(Debug, Clone, Default)]
pub struct StructuralTree {
    pub blocks: Vec<StructuralBlock>,
    /// Contents of a top-level ```graph-description``` fence, if any.
    pub graph_description: Option<String>,
    /// Relation type named by a `<! MindMap Mode: ...>` directive, if any.
    pub mindmap_relation: Option<String>,
    pub diagnostics: Vec<ParseDiagnostic>,
}

/// Scan lines into a flat, ordered block list (every heading depth starts a
/// block). Shared by both grammar pipelines.
fn scan(text: &str) -> StructuralTree {
    let mut tree = StructuralTree::default();
    let mut blocks: Vec<StructuralBlock> = Vec::new();

    let mut lines = text.lines().enumerate();
    while let Some((idx, raw)) = lines.next() {
        let line_no = idx + 1;
        let line = raw.trim_end();

        if let Some(captures) = FENCE_OPEN_RE.captures(line.trim_start()) {
            let label = captures[1].to_lowercase();
            let mut body: Vec<&str> = Vec::new();
            let mut closed = false;
            for (_, fence_line) in lines.by_ref() {
                if fence_line.trim() == "```" {
                    closed = true;
                    break;
                }
                body.push(fence_line);
            }
            if !closed {
                tree.diagnostics.push(ParseDiagnostic::warning(format!(
                    "Unterminated ``` fence opened on line {line_no}"
                )));
            }
            let body = body.join("\n").trim().to_string();
            match label.as_str() {
                "description" => {
                    if let Some(block) = blocks.last_mut() {
                        block.description = Some(body);
                    } else {
                        tree.diagnostics.push(ParseDiagnostic::skipped(
                            line_no,
                            line,
                            "description fence outside any node block",
                        ));
                    }
                }
                "graph-description" => {
                    tree.graph_description = Some(body);
                }
                _ => {
                    // Any other fence is a single opaque statement for the
                    // neighborhood resolver.
                    if let Some(block) = blocks.last_mut() {
                        block.content.push(ContentLine {
                            line: line_no,
                            text: body,
                        });
                    } else if !body.is_empty() {
                        tree.diagnostics.push(ParseDiagnostic::skipped(
                            line_no,
                            line,
                            "fenced content outside any node block",
                        ));
                    }
                }
            }
            continue;
        }

        if let Some(captures) = MINDMAP_DIRECTIVE_RE.captures(line) {
            tree.mindmap_relation = Some(captures[1].trim().to_string());
            continue;
        }

        if let Some(depth) = heading_depth(line) {
            blocks.push(StructuralBlock {
                heading: line.to_string(),
                depth,
                ..Default::default()
            });
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        if let Some(block) = blocks.last_mut() {
            block.content.push(ContentLine {
                line: line_no,
                text: line.trim().to_string(),
            });
        } else {
            tree.diagnostics.push(ParseDiagnostic::skipped(
                line_no,
                line.trim(),
                "content outside any node block",
            ));
        }
    }

    tree.blocks = blocks;
    tree
}

impl StructuralTree {
    /// Build the rich-graph tree: `#` blocks with `##` morphs nested under
    /// them. Headings deeper than `##` are demoted to content of the open
    /// block or morph, since morphs have no further nesting.
    pub fn parse(text: &str) -> StructuralTree {
        let mut tree = scan(text);
        let flat = std::mem::take(&mut tree.blocks);
        let mut nested: Vec<StructuralBlock> = Vec::new();

        for mut block in flat {
            match block.depth {
                1 => nested.push(block),
                2 => {
                    if let Some(node) = nested.last_mut() {
                        node.morphs.push(block);
                    } else {
                        tracing::debug!(
                            "[structure] morph heading before any node block: {}",
                            block.heading
                        );
                        tree.diagnostics.push(ParseDiagnostic::skipped(
                            0,
                            block.heading.clone(),
                            "morph heading before any node block",
                        ));
                    }
                }
                _ => {
                    // Demote the whole sub-block into the innermost open body.
                    let Some(node) = nested.last_mut() else {
                        tree.diagnostics.push(ParseDiagnostic::skipped(
                            0,
                            block.heading.clone(),
                            "deep heading before any node block",
                        ));
                        continue;
                    };
                    let body = if node.morphs.is_empty() {
                        node
                    } else {
                        node.morphs.last_mut().expect("non-empty morph list")
                    };
                    body.content.push(ContentLine {
                        line: 0,
                        text: block.heading.clone(),
                    });
                    body.content.append(&mut block.content);
                }
            }
        }

        tree.blocks = nested;
        tree
    }

    /// Build the flat outline used by the mindmap pipeline: every heading
    /// depth is its own block, with no morph nesting.
    pub fn parse_outline(text: &str) -> StructuralTree {
        scan(text)
    }
}
