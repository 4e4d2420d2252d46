//! Code generation.
//!
//! Walks the template fragments once, allocating a synthetic DOM-handle
//! variable per node and filling three ordered statement lists (create,
//! update, destroy). The script AST is instrumented in the same pass's
//! tail: every reactive increment/decrement gains a trailing
//! `lifecycle.update([...])` notification. Everything is then assembled
//! into the exported factory module.
//!
//! The generator trusts the [`Analysis`] invariants and raises no errors
//! of its own.

use oxc_allocator::{Allocator, Box as OxcBox, TakeIn};
use oxc_ast::ast::{
    Argument, ArrayExpressionElement, ArrowFunctionExpression, BlockStatement, CatchClause,
    Expression, ForInStatement, ForOfStatement, ForStatement, Function, SimpleAssignmentTarget,
    TSTypeParameterInstantiation,
};
use oxc_ast::AstBuilder;
use oxc_ast_visit::{walk_mut, VisitMut};
use oxc_codegen::Codegen;
use oxc_span::SPAN;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;
use tracing::debug;

use crate::analyse::Analysis;
use crate::ast::{identifier_name, Attribute, Document, Fragment};
use crate::scope::{ScopeCursor, ScopeId};

/// Attribute-name prefix marking an event binding.
const EVENT_PREFIX: &str = "on:";

/// Consumes the document: instrumentation is applied exactly once, and no
/// later stage can observe the mutated script tree.
pub fn generate<'a>(
    mut document: Document<'a>,
    analysis: &Analysis,
    allocator: &'a Allocator,
) -> String {
    let mut generator = Generator {
        analysis,
        counter: 1,
        declarations: Vec::new(),
        create: Vec::new(),
        update: Vec::new(),
        destroy: Vec::new(),
    };
    for fragment in &document.fragments {
        generator.visit(fragment, "target");
    }

    let script_code = match &mut document.script {
        Some(program) => {
            let mut instrumenter = Instrumenter {
                ast: AstBuilder::new(allocator),
                cursor: ScopeCursor::new(&analysis.scopes),
                root: analysis.scopes.root(),
                will_use_in_template: &analysis.will_use_in_template,
            };
            instrumenter.visit_program(program);
            Codegen::new().build(&*program).code
        }
        None => String::new(),
    };

    debug!(
        handles = generator.declarations.len(),
        create = generator.create.len(),
        update = generator.update.len(),
        destroy = generator.destroy.len(),
        "generated lifecycle statements"
    );
    generator.assemble(&script_code)
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOM STATEMENT LISTS
// ═══════════════════════════════════════════════════════════════════════════════

struct Generator<'g> {
    analysis: &'g Analysis,
    counter: usize,
    declarations: Vec<String>,
    create: Vec<String>,
    update: Vec<String>,
    destroy: Vec<String>,
}

impl Generator<'_> {
    /// Fresh handle name. The counter only ever grows, so handle names are
    /// pairwise distinct within one compile.
    fn unique_name(&mut self, prefix: &str) -> String {
        let name = format!("{}_{}", prefix, self.counter);
        self.counter += 1;
        name
    }

    fn visit(&mut self, fragment: &Fragment<'_>, parent: &str) {
        match fragment {
            Fragment::Element {
                name,
                attributes,
                children,
            } => self.visit_element(name, attributes, children, parent),
            Fragment::Text { value } => self.visit_text(value, parent),
            Fragment::Binding { expression, .. } => self.visit_binding(expression, parent),
        }
    }

    fn visit_element(
        &mut self,
        name: &str,
        attributes: &[Attribute<'_>],
        children: &[Fragment<'_>],
        parent: &str,
    ) {
        let handle = self.unique_name(name);
        self.declarations.push(handle.clone());
        self.create
            .push(format!("{} = document.createElement('{}');", handle, name));
        for attribute in attributes {
            self.visit_attribute(attribute, &handle);
        }
        for child in children {
            self.visit(child, &handle);
        }
        self.create
            .push(format!("{}.appendChild({});", parent, handle));
        self.destroy
            .push(format!("{}.removeChild({});", parent, handle));
    }

    /// Static text never changes for the component's lifetime; create only.
    fn visit_text(&mut self, value: &str, parent: &str) {
        let handle = self.unique_name("txt");
        self.declarations.push(handle.clone());
        self.create.push(format!(
            "{} = document.createTextNode('{}');",
            handle,
            escape_js_string(value)
        ));
        self.create
            .push(format!("{}.appendChild({});", parent, handle));
    }

    /// Only `on:`-marked attributes produce code; the rest are dropped.
    fn visit_attribute(&mut self, attribute: &Attribute<'_>, parent: &str) {
        let Some(event) = attribute.name.strip_prefix(EVENT_PREFIX) else {
            return;
        };
        let Some(handler) = identifier_name(&attribute.value) else {
            return;
        };
        self.create.push(format!(
            "{}.addEventListener('{}', {});",
            parent, event, handler
        ));
        self.destroy.push(format!(
            "{}.removeEventListener('{}', {});",
            parent, event, handler
        ));
    }

    fn visit_binding(&mut self, expression: &Expression<'_>, parent: &str) {
        let Some(name) = identifier_name(expression) else {
            return;
        };
        let handle = self.unique_name("txt");
        self.declarations.push(handle.clone());
        self.create
            .push(format!("{} = document.createTextNode({});", handle, name));
        self.create
            .push(format!("{}.appendChild({});", parent, handle));
        if self.analysis.will_change.contains(name) {
            self.update.push(format!(
                "if (changed.includes('{}')) {{ {}.data = {}; }}",
                name, handle, name
            ));
        }
    }

    fn assemble(self, script: &str) -> String {
        let mut out = String::new();
        out.push_str("export default function() {\n");
        out.push_str(&indent_block(script, 2));
        for handle in &self.declarations {
            out.push_str(&format!("  let {};\n", handle));
        }
        out.push_str("  const lifecycle = {\n");
        out.push_str("    create(target) {\n");
        out.push_str(&statement_block(&self.create));
        out.push_str("    },\n");
        out.push_str("    update(changed) {\n");
        out.push_str(&statement_block(&self.update));
        out.push_str("    },\n");
        out.push_str("    destroy() {\n");
        out.push_str(&statement_block(&self.destroy));
        out.push_str("    },\n");
        out.push_str("  };\n");
        out.push_str("  return lifecycle;\n");
        out.push_str("}\n");
        out
    }
}

fn statement_block(statements: &[String]) -> String {
    let mut out = String::new();
    for statement in statements {
        out.push_str("      ");
        out.push_str(statement);
        out.push('\n');
    }
    out
}

fn indent_block(code: &str, width: usize) -> String {
    if code.is_empty() {
        return String::new();
    }
    let pad = " ".repeat(width);
    let mut out = String::new();
    for line in code.lines() {
        out.push_str(&pad);
        out.push_str(line);
        out.push('\n');
    }
    out
}

fn escape_js_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace('\n', "\\n")
        .replace('\r', "")
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCRIPT INSTRUMENTATION
// ═══════════════════════════════════════════════════════════════════════════════

struct Instrumenter<'a, 't> {
    ast: AstBuilder<'a>,
    cursor: ScopeCursor<'t>,
    root: ScopeId,
    will_use_in_template: &'t HashSet<String>,
}

impl<'a> Instrumenter<'a, '_> {
    /// The mutated name, when `expr` is an increment/decrement of a
    /// root-scope binding the template reads.
    fn reactive_update_target(&self, expr: &Expression<'a>) -> Option<String> {
        let Expression::UpdateExpression(update) = expr else {
            return None;
        };
        let SimpleAssignmentTarget::AssignmentTargetIdentifier(id) = &update.argument else {
            return None;
        };
        let name = id.name.as_str();
        let reactive = self.cursor.owner(name) == Some(self.root)
            && self.will_use_in_template.contains(name);
        reactive.then(|| name.to_string())
    }

    /// `lifecycle.update(['<name>'])`
    fn notify_call(&self, name: &str) -> Expression<'a> {
        let name_str: &'a str = self.ast.allocator.alloc_str(name);
        let mut elements = self.ast.vec();
        elements.push(ArrayExpressionElement::from(
            self.ast.expression_string_literal(SPAN, name_str, None),
        ));
        let changed = self.ast.expression_array(SPAN, elements);

        let callee = Expression::from(self.ast.member_expression_static(
            SPAN,
            self.ast.expression_identifier(SPAN, "lifecycle"),
            self.ast.identifier_name(SPAN, "update"),
            false,
        ));
        let mut args = self.ast.vec();
        args.push(Argument::from(changed));
        self.ast.expression_call(
            SPAN,
            callee,
            None::<OxcBox<TSTypeParameterInstantiation>>,
            args,
            false,
        )
    }
}

impl<'a> VisitMut<'a> for Instrumenter<'a, '_> {
    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        if let Some(name) = self.reactive_update_target(expr) {
            let original = expr.take_in(self.ast);
            let mut expressions = self.ast.vec();
            expressions.push(original);
            expressions.push(self.notify_call(&name));
            *expr = self.ast.expression_sequence(SPAN, expressions);
            // The replaced subtree is fully transformed already.
            return;
        }
        walk_mut::walk_expression(self, expr);
    }

    fn visit_function(&mut self, func: &mut Function<'a>, flags: ScopeFlags) {
        let entered = self.cursor.enter(func.span);
        walk_mut::walk_function(self, func, flags);
        self.cursor.leave(entered);
    }

    fn visit_arrow_function_expression(&mut self, arrow: &mut ArrowFunctionExpression<'a>) {
        let entered = self.cursor.enter(arrow.span);
        walk_mut::walk_arrow_function_expression(self, arrow);
        self.cursor.leave(entered);
    }

    fn visit_block_statement(&mut self, block: &mut BlockStatement<'a>) {
        let entered = self.cursor.enter(block.span);
        walk_mut::walk_block_statement(self, block);
        self.cursor.leave(entered);
    }

    fn visit_for_statement(&mut self, stmt: &mut ForStatement<'a>) {
        let entered = self.cursor.enter(stmt.span);
        walk_mut::walk_for_statement(self, stmt);
        self.cursor.leave(entered);
    }

    fn visit_for_in_statement(&mut self, stmt: &mut ForInStatement<'a>) {
        let entered = self.cursor.enter(stmt.span);
        walk_mut::walk_for_in_statement(self, stmt);
        self.cursor.leave(entered);
    }

    fn visit_for_of_statement(&mut self, stmt: &mut ForOfStatement<'a>) {
        let entered = self.cursor.enter(stmt.span);
        walk_mut::walk_for_of_statement(self, stmt);
        self.cursor.leave(entered);
    }

    fn visit_catch_clause(&mut self, clause: &mut CatchClause<'a>) {
        let entered = self.cursor.enter(clause.span);
        walk_mut::walk_catch_clause(self, clause);
        self.cursor.leave(entered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyse::analyse;
    use crate::parse::parse;
    use oxc_allocator::Allocator;

    fn compile_source(source: &str) -> String {
        let allocator = Allocator::default();
        let document = parse(&allocator, source).unwrap();
        let analysis = analyse(&document).unwrap();
        generate(document, &analysis, &allocator)
    }

    #[test]
    fn test_handles_are_distinct() {
        let code = compile_source("<div><span>a</span><span>b</span></div>");
        assert!(code.contains("let div_1;"));
        assert!(code.contains("let span_2;"));
        assert!(code.contains("let txt_3;"));
        assert!(code.contains("let span_4;"));
        assert!(code.contains("let txt_5;"));
    }

    #[test]
    fn test_event_attribute_roundtrip() {
        let code = compile_source(
            "<script>function inc() {}</script><button on:click={inc}>go</button>",
        );
        assert!(code.contains("button_1.addEventListener('click', inc);"));
        assert!(code.contains("button_1.removeEventListener('click', inc);"));
    }

    #[test]
    fn test_non_event_attribute_dropped() {
        let code = compile_source("<script>let cls = 'x';</script><div class={cls}>hi</div>");
        assert!(!code.contains("class"));
    }

    #[test]
    fn test_text_literal_is_escaped() {
        let code = compile_source("<p>it's here</p>");
        assert!(code.contains("document.createTextNode('it\\'s here');"));
    }

    #[test]
    fn test_static_component_has_no_update() {
        let code = compile_source("<div>hello</div>");
        assert!(code.contains("update(changed) {\n    }"));
        assert!(code.contains("target.removeChild(div_1);"));
    }
}
