//! Reactivity analysis.
//!
//! Two independent passes over an already-built [`Document`], merged into
//! one immutable [`Analysis`]: a script pass that finds which root-scope
//! bindings are mutated by increment/decrement, and a template pass that
//! collects the identifiers the template reads. Mutations inside nested
//! functions whose target resolves to a non-root scope do not count as
//! reactive drivers.

use oxc_ast::ast::{
    ArrowFunctionExpression, BlockStatement, CatchClause, Expression, ForInStatement,
    ForOfStatement, ForStatement, Function, SimpleAssignmentTarget, UpdateExpression,
};
use oxc_ast_visit::{walk, Visit};
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;
use tracing::debug;

use crate::ast::{identifier_name, Document, Fragment};
use crate::error::{CompilerError, ERR_BINDING};
use crate::scope::{build_scope_tree, ScopeCursor, ScopeId, ScopeTree};

/// Produced once per compile, never mutated afterwards.
#[derive(Debug)]
pub struct Analysis {
    /// Names declared in the script's root scope.
    pub variables: HashSet<String>,
    /// Root-scope names mutated by top-level increment/decrement.
    pub will_change: HashSet<String>,
    /// Identifiers referenced by template bindings. Not constrained to
    /// `variables`; free identifiers land here too.
    pub will_use_in_template: HashSet<String>,
    pub scopes: ScopeTree,
}

pub fn analyse(document: &Document<'_>) -> Result<Analysis, CompilerError> {
    let scopes = match &document.script {
        Some(program) => build_scope_tree(program),
        None => ScopeTree::empty(),
    };
    let variables = scopes.declarations(scopes.root()).clone();

    let mut will_change = HashSet::new();
    if let Some(program) = &document.script {
        let mut scanner = MutationScanner {
            cursor: ScopeCursor::new(&scopes),
            root: scopes.root(),
            will_change: &mut will_change,
        };
        scanner.visit_program(program);
    }

    let mut will_use_in_template = HashSet::new();
    for fragment in &document.fragments {
        collect_template_identifiers(fragment, &mut will_use_in_template)?;
    }

    debug!(
        variables = variables.len(),
        will_change = will_change.len(),
        will_use_in_template = will_use_in_template.len(),
        "analysed component"
    );
    Ok(Analysis {
        variables,
        will_change,
        will_use_in_template,
        scopes,
    })
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCRIPT PASS
// ═══════════════════════════════════════════════════════════════════════════════

struct MutationScanner<'t, 's> {
    cursor: ScopeCursor<'t>,
    root: ScopeId,
    will_change: &'s mut HashSet<String>,
}

impl<'a> Visit<'a> for MutationScanner<'_, '_> {
    fn visit_update_expression(&mut self, expr: &UpdateExpression<'a>) {
        if let SimpleAssignmentTarget::AssignmentTargetIdentifier(id) = &expr.argument {
            if self.cursor.owner(id.name.as_str()) == Some(self.root) {
                self.will_change.insert(id.name.to_string());
            }
        }
        walk::walk_update_expression(self, expr);
    }

    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        let entered = self.cursor.enter(func.span);
        walk::walk_function(self, func, flags);
        self.cursor.leave(entered);
    }

    fn visit_arrow_function_expression(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        let entered = self.cursor.enter(arrow.span);
        walk::walk_arrow_function_expression(self, arrow);
        self.cursor.leave(entered);
    }

    fn visit_block_statement(&mut self, block: &BlockStatement<'a>) {
        let entered = self.cursor.enter(block.span);
        walk::walk_block_statement(self, block);
        self.cursor.leave(entered);
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement<'a>) {
        let entered = self.cursor.enter(stmt.span);
        walk::walk_for_statement(self, stmt);
        self.cursor.leave(entered);
    }

    fn visit_for_in_statement(&mut self, stmt: &ForInStatement<'a>) {
        let entered = self.cursor.enter(stmt.span);
        walk::walk_for_in_statement(self, stmt);
        self.cursor.leave(entered);
    }

    fn visit_for_of_statement(&mut self, stmt: &ForOfStatement<'a>) {
        let entered = self.cursor.enter(stmt.span);
        walk::walk_for_of_statement(self, stmt);
        self.cursor.leave(entered);
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause<'a>) {
        let entered = self.cursor.enter(clause.span);
        walk::walk_catch_clause(self, clause);
        self.cursor.leave(entered);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE PASS
// ═══════════════════════════════════════════════════════════════════════════════

fn collect_template_identifiers(
    fragment: &Fragment<'_>,
    out: &mut HashSet<String>,
) -> Result<(), CompilerError> {
    match fragment {
        Fragment::Element {
            attributes,
            children,
            ..
        } => {
            for attribute in attributes {
                let context = format!("attribute \"{}\"", attribute.name);
                out.insert(bound_identifier(
                    &attribute.value,
                    &context,
                    attribute.line,
                    attribute.column,
                )?);
            }
            for child in children {
                collect_template_identifiers(child, out)?;
            }
        }
        Fragment::Binding {
            expression,
            line,
            column,
        } => {
            out.insert(bound_identifier(expression, "template position", *line, *column)?);
        }
        Fragment::Text { .. } => {}
    }
    Ok(())
}

fn bound_identifier(
    expression: &Expression<'_>,
    context: &str,
    line: u32,
    column: u32,
) -> Result<String, CompilerError> {
    identifier_name(expression)
        .map(str::to_string)
        .ok_or_else(|| {
            CompilerError::new(
                ERR_BINDING,
                &format!("binding in {} must be a bare identifier", context),
                line,
                column,
            )
        })
}
