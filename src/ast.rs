//! Template IR for parsed components.
//!
//! The markup side of a component is an ordered sequence of [`Fragment`]s;
//! the script side is one oxc [`Program`]. Both borrow from the
//! `oxc_allocator::Allocator` the caller hands to the parser.

use oxc_ast::ast::{Expression, Program};

/// One parsed component: markup fragments plus at most one script block.
#[derive(Debug)]
pub struct Document<'a> {
    pub fragments: Vec<Fragment<'a>>,
    pub script: Option<Program<'a>>,
}

/// One parsed unit of template syntax.
#[derive(Debug)]
pub enum Fragment<'a> {
    Element {
        name: String,
        attributes: Vec<Attribute<'a>>,
        children: Vec<Fragment<'a>>,
    },
    /// Literal text run. Never empty or whitespace-only.
    Text { value: String },
    /// An inline `{expression}` binding. `line`/`column` locate the opening
    /// brace in the component source, 1-based.
    Binding {
        expression: Expression<'a>,
        line: u32,
        column: u32,
    },
}

/// A `name={expression}` attribute on an element.
#[derive(Debug)]
pub struct Attribute<'a> {
    pub name: String,
    pub value: Expression<'a>,
    /// Position of the value's opening brace, 1-based.
    pub line: u32,
    pub column: u32,
}

impl<'a> Fragment<'a> {
    /// The bound identifier name, when this fragment's expression is a bare
    /// identifier reference.
    pub fn binding_name(&self) -> Option<&str> {
        match self {
            Fragment::Binding { expression, .. } => identifier_name(expression),
            _ => None,
        }
    }
}

/// Bare identifier name of an expression, if it is one.
pub fn identifier_name<'e, 'a>(expression: &'e Expression<'a>) -> Option<&'e str> {
    match expression {
        Expression::Identifier(ident) => Some(ident.name.as_str()),
        _ => None,
    }
}
