use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

/// An expected literal token or delimiter was absent at the cursor.
pub const ERR_PARSE: &str = "FGX-ERR-PARSE";
/// The script engine rejected an embedded script or bound expression.
pub const ERR_SYNTAX: &str = "FGX-ERR-SYNTAX";
/// More than one `<script>` block in a single component.
pub const ERR_SCRIPT_DUP: &str = "FGX-ERR-SCRIPT-DUP";
/// A template binding was not a bare identifier.
pub const ERR_BINDING: &str = "FGX-ERR-BINDING";

fn get_guarantee(code: &str) -> &'static str {
    match code {
        ERR_PARSE => "Every delimiter the parser consumes is present in the source.",
        ERR_SYNTAX => "Embedded scripts and bound expressions are valid JavaScript.",
        ERR_SCRIPT_DUP => "A component carries exactly one script block.",
        ERR_BINDING => "Template bindings reference a single bare identifier.",
        _ => "Unknown invariant.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// Fatal compile error. Compilation is fail-fast: the first error aborts the
/// pipeline and no partial output is produced.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{code}: {message} (line {line}, column {column})")]
pub struct CompilerError {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub line: u32,
    pub column: u32,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, line: u32, column: u32) -> Self {
        CompilerError {
            code: code.to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            line,
            column,
        }
    }

    /// Error positioned at a byte offset of the component source.
    pub fn at_offset(code: &str, message: &str, source: &str, offset: usize) -> Self {
        let (line, column) = position(source, offset);
        Self::new(code, message, line, column)
    }
}

/// 1-based line/column of a byte offset in `source`.
pub(crate) fn position(source: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.bytes().filter(|&b| b == b'\n').count() as u32 + 1;
    let column = before.rfind('\n').map_or(offset, |nl| offset - nl - 1) as u32 + 1;
    (line, column)
}
