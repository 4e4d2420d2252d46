//! # FGX Compiler
//!
//! Compiles a single-file component — markup interleaved with one embedded
//! `<script>` block and inline `{identifier}` bindings — into a standalone
//! JavaScript module whose default export builds and selectively refreshes
//! a DOM subtree, with no virtual-DOM diffing.
//!
//! ## Pipeline Invariants
//!
//! 1. **Strictly sequential stages**: Parser → Analyser → Generator. Each
//!    stage returns an explicit value; no stage observes a later stage's
//!    mutations.
//! 2. **Fail-fast**: the first [`CompilerError`] aborts the compile. No
//!    partial AST or partial module text is ever produced.
//! 3. **Single instrumentation**: the Generator consumes the `Document` by
//!    value, so the script AST is instrumented exactly once.
//! 4. **Selective updates**: only root-scope bindings that are both mutated
//!    by increment/decrement and read by the template drive `update`
//!    branches; everything else is created once and left alone.
//!
//! The generated module's factory returns the lifecycle triple
//! `{ create(target), update(changed), destroy() }`.

use oxc_allocator::Allocator;

mod analyse;
mod ast;
mod error;
mod generate;
mod parse;
mod scope;

#[cfg(test)]
mod pipeline_tests;

pub use analyse::{analyse, Analysis};
pub use ast::{Attribute, Document, Fragment};
pub use error::{CompilerError, ERR_BINDING, ERR_PARSE, ERR_SCRIPT_DUP, ERR_SYNTAX};
pub use generate::generate;
pub use parse::parse;
pub use scope::{build_scope_tree, ScopeCursor, ScopeId, ScopeTree};

/// Compile one component source to module text.
pub fn compile(source: &str) -> Result<String, CompilerError> {
    let allocator = Allocator::default();
    let document = parse(&allocator, source)?;
    let analysis = analyse(&document)?;
    Ok(generate(document, &analysis, &allocator))
}
