//! Source locations attached to AST nodes.
use std::fmt;

/// A byte-offset range in some source text, plus a human-facing line/column
/// pair for diagnostics. The lexer/parser (out of scope for this crate)
/// produces these; sanitizer and back end errors carry them through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}
impl Span {
    pub fn new(line: u32, column: u32) -> Self {
        Span { line, column }
    }

    /// A span standing in for "no source location available", used by nodes
    /// synthesized during sanitization (hoisted stage inputs, folded
    /// constants) that have no single origin in the original source.
    pub fn synthetic() -> Self {
        Span { line: 0, column: 0 }
    }

    pub fn is_synthetic(&self) -> bool {
        self.line == 0 && self.column == 0
    }
}
impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_synthetic() {
            f.write_str("<synthetic>")
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}
