//! Lexical scope resolution for the embedded script.
//!
//! Builds an arena of scope frames over an oxc [`Program`]: every
//! scope-opening node (function, arrow, block, for, catch) gets a frame
//! addressed by a stable [`ScopeId`], keyed by the node's source span.
//! Traversals that need scope context drive their own [`ScopeCursor`] stack
//! against this tree.

use oxc_ast::ast::{
    ArrowFunctionExpression, BindingPattern, BlockStatement, CatchClause, Class, ForInStatement,
    ForOfStatement, ForStatement, Function, Program, VariableDeclaration,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::Span;
use oxc_syntax::scope::ScopeFlags;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

#[derive(Debug)]
struct Frame {
    parent: Option<ScopeId>,
    declarations: HashSet<String>,
    /// `var` and function declarations hoist to the nearest frame with this set.
    function_boundary: bool,
}

/// Immutable after construction; built once per script by [`build_scope_tree`].
#[derive(Debug)]
pub struct ScopeTree {
    frames: Vec<Frame>,
    node_scopes: HashMap<(u32, u32), ScopeId>,
}

impl ScopeTree {
    /// A tree holding only the root frame, for components with no script.
    pub fn empty() -> Self {
        ScopeTree {
            frames: vec![Frame {
                parent: None,
                declarations: HashSet::new(),
                function_boundary: true,
            }],
            node_scopes: HashMap::new(),
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn declarations(&self, id: ScopeId) -> &HashSet<String> {
        &self.frames[id.0].declarations
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.frames[id.0].parent
    }

    /// The scope opened by the node at `span`, if any.
    pub fn scope_at(&self, span: Span) -> Option<ScopeId> {
        self.node_scopes.get(&(span.start, span.end)).copied()
    }

    /// The scope that declares `name`, walking outward from `from`.
    pub fn find_owner(&self, from: ScopeId, name: &str) -> Option<ScopeId> {
        let mut cursor = Some(from);
        while let Some(id) = cursor {
            if self.frames[id.0].declarations.contains(name) {
                return Some(id);
            }
            cursor = self.frames[id.0].parent;
        }
        None
    }

    fn add_frame(&mut self, parent: ScopeId, function_boundary: bool, span: Span) -> ScopeId {
        let id = ScopeId(self.frames.len());
        self.frames.push(Frame {
            parent: Some(parent),
            declarations: HashSet::new(),
            function_boundary,
        });
        self.node_scopes.insert((span.start, span.end), id);
        id
    }

    fn declare(&mut self, id: ScopeId, name: &str) {
        self.frames[id.0].declarations.insert(name.to_string());
    }

    fn declare_hoisted(&mut self, from: ScopeId, name: &str) {
        let mut id = from;
        while !self.frames[id.0].function_boundary {
            // The root frame is a function boundary, so the walk terminates.
            id = self.frames[id.0].parent.expect("non-root frame has a parent");
        }
        self.declare(id, name);
    }
}

/// Scope-handle stack for traversals over the script AST. The traversal
/// driver calls `enter`/`leave` around every node it knows opens a scope;
/// `enter` is a no-op for nodes absent from the tree's node mapping.
pub struct ScopeCursor<'t> {
    tree: &'t ScopeTree,
    stack: Vec<ScopeId>,
}

impl<'t> ScopeCursor<'t> {
    pub fn new(tree: &'t ScopeTree) -> Self {
        let root = tree.root();
        ScopeCursor {
            tree,
            stack: vec![root],
        }
    }

    pub fn current(&self) -> ScopeId {
        *self.stack.last().expect("scope stack never empties")
    }

    #[must_use]
    pub fn enter(&mut self, span: Span) -> bool {
        match self.tree.scope_at(span) {
            Some(id) => {
                self.stack.push(id);
                true
            }
            None => false,
        }
    }

    pub fn leave(&mut self, entered: bool) {
        if entered {
            self.stack.pop();
        }
    }

    /// Owner scope of `name` resolved from the current scope.
    pub fn owner(&self, name: &str) -> Option<ScopeId> {
        self.tree.find_owner(self.current(), name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

pub fn build_scope_tree(program: &Program<'_>) -> ScopeTree {
    let mut builder = ScopeBuilder {
        tree: ScopeTree::empty(),
        stack: Vec::new(),
    };
    builder.stack.push(builder.tree.root());
    builder.visit_program(program);
    builder.tree
}

struct ScopeBuilder {
    tree: ScopeTree,
    stack: Vec<ScopeId>,
}

impl ScopeBuilder {
    fn current(&self) -> ScopeId {
        *self.stack.last().expect("scope stack never empties")
    }

    fn push(&mut self, span: Span, function_boundary: bool) {
        let id = self.tree.add_frame(self.current(), function_boundary, span);
        self.stack.push(id);
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    fn declare_pattern(&mut self, pattern: &BindingPattern<'_>, hoist: bool) {
        let mut names = Vec::new();
        collect_binding_names(pattern, &mut names);
        let current = self.current();
        for name in names {
            if hoist {
                self.tree.declare_hoisted(current, &name);
            } else {
                self.tree.declare(current, &name);
            }
        }
    }
}

fn collect_binding_names(pattern: &BindingPattern<'_>, out: &mut Vec<String>) {
    match pattern {
        BindingPattern::BindingIdentifier(id) => {
            out.push(id.name.to_string());
        }
        BindingPattern::ObjectPattern(obj) => {
            for prop in &obj.properties {
                collect_binding_names(&prop.value, out);
            }
            if let Some(rest) = &obj.rest {
                collect_binding_names(&rest.argument, out);
            }
        }
        BindingPattern::ArrayPattern(arr) => {
            for elem in arr.elements.iter().flatten() {
                collect_binding_names(elem, out);
            }
            if let Some(rest) = &arr.rest {
                collect_binding_names(&rest.argument, out);
            }
        }
        _ => {}
    }
}

impl<'a> Visit<'a> for ScopeBuilder {
    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'a>) {
        let hoist = decl.kind.is_var();
        for declarator in &decl.declarations {
            self.declare_pattern(&declarator.id, hoist);
        }
        // Initializers may contain functions with scopes of their own.
        walk::walk_variable_declaration(self, decl);
    }

    fn visit_function(&mut self, func: &Function<'a>, _flags: ScopeFlags) {
        if func.is_declaration() {
            if let Some(id) = &func.id {
                let current = self.current();
                self.tree.declare_hoisted(current, id.name.as_str());
            }
        }
        self.push(func.span, true);
        for param in &func.params.items {
            self.declare_pattern(&param.pattern, false);
        }
        if let Some(body) = &func.body {
            for stmt in &body.statements {
                self.visit_statement(stmt);
            }
        }
        self.pop();
    }

    fn visit_arrow_function_expression(&mut self, arrow: &ArrowFunctionExpression<'a>) {
        self.push(arrow.span, true);
        for param in &arrow.params.items {
            self.declare_pattern(&param.pattern, false);
        }
        for stmt in &arrow.body.statements {
            self.visit_statement(stmt);
        }
        self.pop();
    }

    fn visit_block_statement(&mut self, block: &BlockStatement<'a>) {
        self.push(block.span, false);
        walk::walk_block_statement(self, block);
        self.pop();
    }

    fn visit_for_statement(&mut self, stmt: &ForStatement<'a>) {
        self.push(stmt.span, false);
        walk::walk_for_statement(self, stmt);
        self.pop();
    }

    fn visit_for_in_statement(&mut self, stmt: &ForInStatement<'a>) {
        self.push(stmt.span, false);
        walk::walk_for_in_statement(self, stmt);
        self.pop();
    }

    fn visit_for_of_statement(&mut self, stmt: &ForOfStatement<'a>) {
        self.push(stmt.span, false);
        walk::walk_for_of_statement(self, stmt);
        self.pop();
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause<'a>) {
        self.push(clause.span, false);
        if let Some(param) = &clause.param {
            self.declare_pattern(&param.pattern, false);
        }
        for stmt in &clause.body.body {
            self.visit_statement(stmt);
        }
        self.pop();
    }

    fn visit_class(&mut self, class: &Class<'a>) {
        if class.is_declaration() {
            if let Some(id) = &class.id {
                let current = self.current();
                self.tree.declare(current, id.name.as_str());
            }
        }
        walk::walk_class(self, class);
    }
}
