//! Stage two of type resolution: function bodies and initializers.
//!
//! Every expression gets a [`ResolvedType`] and every name reference a
//! [`Binding`], both kept in side tables indexed by [`NodeId`]. Locals live
//! in nested lexical scopes; a name is looked up innermost scope first and
//! then through [`Globals::lookup`]. A local becomes visible after its own
//! declaration, may shadow an outer one, and may not be redeclared in the
//! same scope. Function parameters share the body's outermost scope.
//!
//! Expression checks return `None` once a diagnostic has been reported for
//! the expression, so one mistake does not cascade through its parents.

use crate::ast::{
    ArrayElement, AssignOp, BinaryOp, DirectiveKind, FieldInit, Literal, Node, NodeId, NodeKind,
    TemplatePart, UnaryOp, VarDecl, find_directive,
};
use crate::builtins::Scalar;
use crate::diagnostic::Diagnostic;
use crate::name_resolve::{Found, Globals, Symbol, SymbolKind, parse_int, resolve_globals};
use crate::package::{PackageId, PackageTable};
use crate::span::Span;
use crate::types::{ResolvedType, resolved_type_cast_to, resolved_type_implict_to, type_name};

/// Dense side table indexed by node identity.
#[derive(Debug, Clone)]
pub struct NodeTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> Default for NodeTable<T> {
    fn default() -> Self {
        NodeTable { slots: Vec::new() }
    }
}

impl<T> NodeTable<T> {
    pub fn new(len: usize) -> Self {
        NodeTable {
            slots: (0..len).map(|_| None).collect(),
        }
    }

    pub fn insert(&mut self, id: NodeId, value: T) {
        let index = id.index();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        self.slots[index] = Some(value);
    }

    pub fn get(&self, id: NodeId) -> Option<&T> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a name reference resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Local,
    Global { package: PackageId, name: String },
    Function { package: PackageId, name: String },
    /// Declared `@extern` or in a `@c_header` package; spelled as written.
    Foreign { name: String },
}

/// Everything the code generator needs from type resolution.
#[derive(Debug, Default)]
pub struct Resolution<'a> {
    pub globals: Globals<'a>,
    pub types: NodeTable<ResolvedType>,
    pub bindings: NodeTable<Binding>,
    /// Types written inside expressions: the operand of `sizeof(T)`.
    pub written: NodeTable<ResolvedType>,
    /// Packages in dependency order, leaves first.
    pub order: Vec<PackageId>,
}

impl Resolution<'_> {
    pub fn type_of(&self, id: NodeId) -> Option<&ResolvedType> {
        self.types.get(id)
    }

    pub fn binding(&self, id: NodeId) -> Option<&Binding> {
        self.bindings.get(id)
    }

    pub fn type_name(&self, ty: &ResolvedType) -> String {
        type_name(&self.globals.structs, ty)
    }
}

#[derive(Debug, Default)]
pub struct ResolveResult<'a> {
    pub resolution: Resolution<'a>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolveResult<'_> {
    pub fn has_errors(&self) -> bool {
        crate::diagnostic::has_errors(&self.diagnostics)
    }
}

/// Resolve declarations (stage one) and then every body (stage two).
///
/// `order` must list packages dependencies first; `node_count` sizes the
/// side tables.
pub fn resolve<'a>(table: &PackageTable<'a>, order: &[PackageId], node_count: usize) -> ResolveResult<'a> {
    let (globals, mut diagnostics) = resolve_globals(table, order);
    let mut checker = Checker {
        globals,
        types: NodeTable::new(node_count),
        bindings: NodeTable::new(node_count),
        written: NodeTable::new(node_count),
        diagnostics: Vec::new(),
        package: PackageId(0),
        scopes: Vec::new(),
        ret: ResolvedType::Void,
    };
    for &id in order {
        let package = table.get(id);
        let Some(ast) = package.ast else { continue };
        checker.package = id;
        checker.package_decls(ast);
        if package.is_entry {
            checker.entry_main(ast);
        }
        tracing::trace!(package = %package.path, "checked package bodies");
    }
    diagnostics.append(&mut checker.diagnostics);
    tracing::debug!(
        typed = checker.types.len(),
        bindings = checker.bindings.len(),
        diagnostics = diagnostics.len(),
        "resolved function bodies"
    );
    ResolveResult {
        resolution: Resolution {
            globals: checker.globals,
            types: checker.types,
            bindings: checker.bindings,
            written: checker.written,
            order: order.to_vec(),
        },
        diagnostics,
    }
}

#[derive(Debug)]
struct Local<'a> {
    name: &'a str,
    /// `None` when the declared type failed to resolve.
    ty: Option<ResolvedType>,
    mutable: bool,
    span: Span,
    used: bool,
    /// Never reported as unused.
    quiet: bool,
}

struct Checker<'a> {
    globals: Globals<'a>,
    types: NodeTable<ResolvedType>,
    bindings: NodeTable<Binding>,
    written: NodeTable<ResolvedType>,
    diagnostics: Vec<Diagnostic>,
    package: PackageId,
    scopes: Vec<Vec<Local<'a>>>,
    /// Return type of the function being checked.
    ret: ResolvedType,
}

fn bool_type() -> ResolvedType {
    ResolvedType::Scalar(Scalar::Bool)
}

fn char_ptr() -> ResolvedType {
    ResolvedType::pointer(ResolvedType::Scalar(Scalar::Char))
}

fn size_type() -> ResolvedType {
    ResolvedType::Scalar(Scalar::Uptr)
}

/// Integer and float literals take their type from the context.
fn is_untyped(node: &Node<'_>) -> bool {
    match &node.kind {
        NodeKind::Literal(Literal::Int(_) | Literal::Float(_)) => true,
        NodeKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => is_untyped(operand),
        _ => false,
    }
}

impl<'a> Checker<'a> {
    fn error(&mut self, code: &'static str, span: Span, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(message, span).with_code(code));
    }

    fn name(&self, ty: &ResolvedType) -> String {
        type_name(&self.globals.structs, ty)
    }

    fn implicit(&self, from: &ResolvedType, to: &ResolvedType) -> bool {
        resolved_type_implict_to(&self.globals.structs, from, to)
    }

    /// The common type of two operands, if one converts to the other.
    fn unify(&self, l: &ResolvedType, r: &ResolvedType) -> Option<ResolvedType> {
        if self.implicit(r, l) {
            Some(l.clone())
        } else if self.implicit(l, r) {
            Some(r.clone())
        } else {
            None
        }
    }

    fn own_symbol(&self, name: &str) -> Option<(SymbolKind, NodeId)> {
        self.globals
            .scope(self.package)
            .symbols
            .get(name)
            .map(|symbol| (symbol.kind.clone(), symbol.node))
    }

    // -----------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------

    fn package_decls(&mut self, ast: &Node<'a>) {
        for decl in ast.decls() {
            match &decl.kind {
                NodeKind::Function { sig, body } => {
                    // Duplicate definitions were reported in stage one.
                    let Some((SymbolKind::Function(fn_ty), node)) = self.own_symbol(sig.name) else {
                        continue;
                    };
                    if node != decl.id {
                        continue;
                    }
                    self.types.insert(decl.id, fn_ty.clone());
                    let ResolvedType::Function { params, ret } = fn_ty else {
                        continue;
                    };
                    self.ret = *ret;
                    self.scopes.push(Vec::new());
                    for (param, ty) in sig.params.iter().zip(params) {
                        self.declare_local(param.name, Some(ty), param.mutable, param.span, true);
                    }
                    if let NodeKind::Block { stmts } = &body.kind {
                        for stmt in stmts {
                            self.stmt(stmt);
                        }
                    }
                    self.pop_scope();
                }
                NodeKind::FunctionHeader(sig) => {
                    if let Some((SymbolKind::Function(fn_ty), _)) = self.own_symbol(sig.name) {
                        self.types.insert(decl.id, fn_ty);
                    }
                }
                NodeKind::VarDecl(var) => {
                    let Some((SymbolKind::Var { ty, .. }, node)) = self.own_symbol(var.name) else {
                        continue;
                    };
                    if node != decl.id {
                        continue;
                    }
                    self.types.insert(decl.id, ty.clone());
                    if let Some(init) = &var.init {
                        self.expect_value(init, &ty);
                    }
                }
                NodeKind::StructDecl(info) => {
                    if let Some((SymbolKind::Struct(id), node)) = self.own_symbol(info.name) {
                        if node == decl.id {
                            self.types.insert(decl.id, ResolvedType::StructDecl(id));
                        }
                    }
                }
                NodeKind::Typedef { name, .. } => {
                    if let Some((SymbolKind::Typedef(ty), node)) = self.own_symbol(name) {
                        if node == decl.id {
                            self.types.insert(decl.id, ty);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn entry_main(&mut self, ast: &Node<'a>) {
        let main = self
            .globals
            .scope(self.package)
            .symbols
            .get("main")
            .map(|symbol| (symbol.kind.clone(), symbol.span));
        match main {
            Some((SymbolKind::Function(ResolvedType::Function { params, .. }), _)) if params.is_empty() => {}
            Some((_, span)) => {
                self.error("E0402", span, "'main' must be a function without parameters");
            }
            None => self.error("E0400", ast.span, "the entry package has no 'main' function"),
        }
    }

    // -----------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------

    fn declare_local(
        &mut self,
        name: &'a str,
        ty: Option<ResolvedType>,
        mutable: bool,
        span: Span,
        quiet: bool,
    ) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.iter().any(|local| local.name == name) {
            self.error("E0405", span, format!("'{name}' is already declared in this scope"));
            return;
        }
        scope.push(Local {
            name,
            ty,
            mutable,
            span,
            used: false,
            quiet,
        });
    }

    fn find_local(&mut self, name: &str) -> Option<&mut Local<'a>> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.iter_mut().rev().find(|local| local.name == name))
    }

    /// Whether `name` refers to a local, global or function rather than a type.
    fn names_value(&mut self, name: &str) -> bool {
        if self.find_local(name).is_some() {
            return true;
        }
        matches!(
            self.globals.lookup(self.package, &[name]),
            Ok(Found::Symbol(Symbol {
                kind: SymbolKind::Var { .. } | SymbolKind::Function(_),
                ..
            }))
        )
    }

    fn pop_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        for local in scope {
            if !local.used && !local.quiet {
                self.diagnostics.push(
                    Diagnostic::warning(format!("unused variable '{}'", local.name), local.span)
                        .with_code("W0001"),
                );
            }
        }
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn stmt(&mut self, node: &Node<'a>) {
        match &node.kind {
            NodeKind::Block { stmts } => {
                self.scopes.push(Vec::new());
                for stmt in stmts {
                    self.stmt(stmt);
                }
                self.pop_scope();
            }
            NodeKind::VarDecl(var) => self.local_var(node, var),
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.expect_value(cond, &bool_type());
                self.stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.stmt(else_branch);
                }
            }
            NodeKind::While { cond, body } => {
                self.expect_value(cond, &bool_type());
                self.stmt(body);
            }
            NodeKind::Foreach {
                binding,
                iterable,
                body,
            } => self.foreach(node, *binding, iterable, body),
            NodeKind::Return { value } => self.return_stmt(node, value.as_deref()),
            NodeKind::Defer { stmt } => {
                let mut escapes = false;
                stmt.walk(&mut |n| {
                    escapes |= matches!(n.kind, NodeKind::Return { .. } | NodeKind::Defer { .. });
                });
                if escapes {
                    self.error("E0407", node.span, "a deferred statement cannot return or defer");
                }
                self.stmt(stmt);
            }
            NodeKind::Crash { message } => {
                if let Some(message) = message {
                    self.crash_message(message);
                }
            }
            NodeKind::ExprStmt { expr } => {
                self.expr(expr, None);
            }
            NodeKind::Assign { op, target, value } => self.assign(*op, target, value),
            NodeKind::Switch { .. } => {
                self.error("E0407", node.span, "switch statements are not supported yet");
            }
            other => {
                let what = other.name();
                self.error("E0407", node.span, format!("a {what} is not allowed in a function body"));
            }
        }
    }

    fn local_var(&mut self, node: &Node<'a>, var: &VarDecl<'a>) {
        let ty = match (&var.ty, &var.init) {
            (Some(written), init) => {
                let ty = self
                    .globals
                    .resolve_type(self.package, None, written, &mut self.diagnostics);
                match (&ty, init) {
                    (Some(ty), Some(init)) => {
                        self.expect_value(init, ty);
                    }
                    (None, Some(init)) => {
                        self.expr(init, None);
                    }
                    _ => {}
                }
                ty
            }
            (None, Some(init)) => {
                let ty = self.expr(init, None);
                if ty.as_ref().is_some_and(ResolvedType::is_void) {
                    self.error("E0401", init.span, format!("'{}' cannot hold a void value", var.name));
                    None
                } else {
                    ty
                }
            }
            (None, None) => {
                self.error(
                    "E0408",
                    node.span,
                    format!("cannot infer the type of '{}' without an initializer", var.name),
                );
                None
            }
        };
        if let Some(ty) = &ty {
            self.types.insert(node.id, ty.clone());
        }
        let quiet = find_directive(&node.directives, DirectiveKind::Unused).is_some()
            || var.name.starts_with('_');
        self.declare_local(var.name, ty, var.mutable, node.span, quiet);
    }

    fn foreach(&mut self, node: &Node<'a>, binding: &'a str, iterable: &Node<'a>, body: &Node<'a>) {
        let elem = match &iterable.kind {
            NodeKind::Range { start, end, .. } => {
                let counter = if find_directive(&iterable.directives, DirectiveKind::RangeUsize).is_some() {
                    let start = self.expect_value(start, &size_type());
                    let end = self.expect_value(end, &size_type());
                    start.and(end).map(|_| size_type())
                } else {
                    self.range_bounds(iterable, start, end)
                };
                if let Some(counter) = &counter {
                    self.types.insert(iterable.id, counter.clone());
                }
                counter
            }
            _ => match self.expr(iterable, None) {
                Some(ResolvedType::Array {
                    elem,
                    len: Some(_),
                }) => Some(*elem),
                Some(other) => {
                    let name = self.name(&other);
                    self.error(
                        "E0407",
                        iterable.span,
                        format!("cannot iterate over {name}; expected a range or an array of known length"),
                    );
                    None
                }
                None => None,
            },
        };
        if let Some(elem) = &elem {
            self.types.insert(node.id, elem.clone());
        }
        self.scopes.push(Vec::new());
        self.declare_local(binding, elem, false, node.span, true);
        self.stmt(body);
        self.pop_scope();
    }

    fn range_bounds(&mut self, range: &Node<'a>, start: &Node<'a>, end: &Node<'a>) -> Option<ResolvedType> {
        let (start, end) = if is_untyped(start) && !is_untyped(end) {
            let end = self.expr(end, None);
            (self.expr(start, end.as_ref()), end)
        } else {
            let start = self.expr(start, None);
            let end = self.expr(end, start.as_ref());
            (start, end)
        };
        let (start, end) = (start?, end?);
        match self.unify(&start, &end) {
            Some(counter) if counter.is_integer() => Some(counter),
            _ => {
                let (s, e) = (self.name(&start), self.name(&end));
                self.error(
                    "E0401",
                    range.span,
                    format!("range bounds must be integers of one type, found {s} and {e}"),
                );
                None
            }
        }
    }

    fn return_stmt(&mut self, node: &Node<'a>, value: Option<&Node<'a>>) {
        let ret = self.ret.clone();
        match value {
            None if !ret.is_void() => {
                let name = self.name(&ret);
                self.error("E0401", node.span, format!("missing return value of type {name}"));
            }
            Some(value) if ret.is_void() => {
                self.expr(value, None);
                self.error("E0401", value.span, "a void function cannot return a value");
            }
            Some(value) => {
                self.expect_value(value, &ret);
            }
            None => {}
        }
    }

    fn crash_message(&mut self, message: &Node<'a>) {
        let NodeKind::TemplateString { parts } = &message.kind else {
            self.expect_value(message, &char_ptr());
            return;
        };
        for part in parts {
            let TemplatePart::Expr(expr) = part else {
                continue;
            };
            match self.expr(expr, None) {
                Some(ResolvedType::Scalar(_) | ResolvedType::Pointer(_) | ResolvedType::MutPointer(_))
                | None => {}
                Some(other) => {
                    let name = self.name(&other);
                    self.error("E0401", expr.span, format!("cannot format a value of type {name}"));
                }
            }
        }
        self.types.insert(message.id, char_ptr());
    }

    fn assign(&mut self, op: AssignOp, target: &Node<'a>, value: &Node<'a>) {
        let Some(target_ty) = self.expr(target, None) else {
            self.expr(value, None);
            return;
        };
        if let Err(message) = self.place_mutable(target) {
            self.error("E0404", target.span, message);
            self.expr(value, None);
            return;
        }
        let operand_ok = match op {
            AssignOp::Assign => true,
            AssignOp::Add | AssignOp::Sub if target_ty.is_pointer() => {
                if let Some(step) = self.expr(value, None) {
                    if !step.is_integer() {
                        let name = self.name(&step);
                        self.error("E0401", value.span, format!("cannot offset a pointer by {name}"));
                    }
                }
                return;
            }
            AssignOp::Add | AssignOp::Sub | AssignOp::Mul | AssignOp::Div => target_ty.is_numeric(),
            AssignOp::Rem
            | AssignOp::BitAnd
            | AssignOp::BitOr
            | AssignOp::BitXor
            | AssignOp::Shl
            | AssignOp::Shr => target_ty.is_integer(),
        };
        if !operand_ok {
            let name = self.name(&target_ty);
            self.error(
                "E0401",
                target.span,
                format!("cannot apply '{}' to {name}", op.symbol()),
            );
            self.expr(value, None);
            return;
        }
        self.expect_value(value, &target_ty);
    }

    /// Whether `node` names storage that may be written.
    fn place_mutable(&mut self, node: &Node<'a>) -> Result<(), String> {
        match &node.kind {
            NodeKind::VarRef { path } => {
                if let [name] = path.as_slice() {
                    if let Some(local) = self.find_local(name) {
                        return if local.mutable {
                            Ok(())
                        } else {
                            Err(format!("cannot assign to immutable variable '{name}'"))
                        };
                    }
                }
                match self.globals.lookup(self.package, path) {
                    Ok(Found::Symbol(symbol)) => match symbol.kind {
                        SymbolKind::Var { mutable: true, .. } => Ok(()),
                        SymbolKind::Var { .. } => {
                            Err(format!("cannot assign to immutable global '{}'", symbol.name))
                        }
                        _ => Err(format!("cannot assign to '{}'", symbol.name)),
                    },
                    _ => Err(format!("cannot assign to '{}'", path.join("::"))),
                }
            }
            NodeKind::GetField {
                target,
                arrow: false,
                ..
            } => self.place_mutable(target),
            NodeKind::GetField {
                target,
                arrow: true,
                ..
            }
            | NodeKind::Unary {
                op: UnaryOp::Deref,
                operand: target,
            } => match self.types.get(target.id) {
                Some(ResolvedType::MutPointer(_)) => Ok(()),
                _ => Err("cannot assign through an immutable pointer".to_string()),
            },
            NodeKind::Index { target, .. } => match self.types.get(target.id) {
                Some(ResolvedType::Array { .. }) => self.place_mutable(target),
                Some(ResolvedType::MutPointer(_)) => Ok(()),
                _ => Err("cannot assign through an immutable pointer".to_string()),
            },
            other => Err(format!("cannot assign to a {}", other.name())),
        }
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    /// Check `node` against `expected`, reporting a mismatch.
    fn expect_value(&mut self, node: &Node<'a>, expected: &ResolvedType) -> Option<ResolvedType> {
        let actual = self.expr(node, Some(expected))?;
        if !self.implicit(&actual, expected) {
            let (want, found) = (self.name(expected), self.name(&actual));
            self.error("E0401", node.span, format!("expected {want}, found {found}"));
            return None;
        }
        Some(actual)
    }

    fn expr(&mut self, node: &Node<'a>, expected: Option<&ResolvedType>) -> Option<ResolvedType> {
        let ty = self.expr_kind(node, expected)?;
        self.types.insert(node.id, ty.clone());
        Some(ty)
    }

    fn expr_kind(&mut self, node: &Node<'a>, expected: Option<&ResolvedType>) -> Option<ResolvedType> {
        match &node.kind {
            NodeKind::Literal(literal) => Some(literal_type(*literal, expected)),
            NodeKind::VarRef { path } => self.var_ref(node, path),
            NodeKind::Binary { op, lhs, rhs } => self.binary(node, *op, lhs, rhs, expected),
            NodeKind::Unary { op, operand } => self.unary(node, *op, operand, expected),
            NodeKind::Postfix { operand, .. } => self.step(operand),
            NodeKind::Call { callee, args } => self.call(node, callee, args),
            NodeKind::GetField {
                target,
                field,
                arrow,
            } => self.field(node, target, field, *arrow),
            NodeKind::Index { target, index } => self.index(target, index),
            NodeKind::StructInit { fields } => self.struct_init(node, fields, expected),
            NodeKind::ArrayInit { len, elements } => {
                self.array_init(node, len.as_deref(), elements, expected)
            }
            NodeKind::SizeofType {
                ty,
                operand: Some(operand),
            } if ty.value_name().is_some_and(|name| self.names_value(name)) => {
                self.expr(operand, None)?;
                Some(size_type())
            }
            NodeKind::SizeofType { ty, .. } => {
                let operand = self
                    .globals
                    .resolve_type(self.package, None, ty, &mut self.diagnostics)?;
                self.written.insert(node.id, operand);
                Some(size_type())
            }
            NodeKind::SizeofExpr { expr } => {
                self.expr(expr, None)?;
                Some(size_type())
            }
            NodeKind::Cast { ty, expr } => {
                let target = self
                    .globals
                    .resolve_type(self.package, None, ty, &mut self.diagnostics);
                let hint = target.clone().filter(ResolvedType::is_numeric);
                let source = self.expr(expr, hint.as_ref());
                let (target, source) = (target?, source?);
                if !resolved_type_cast_to(&self.globals.structs, &source, &target) {
                    let (from, to) = (self.name(&source), self.name(&target));
                    self.error("E0406", node.span, format!("cannot cast {from} to {to}"));
                    return None;
                }
                Some(target)
            }
            NodeKind::Range { .. } => {
                self.error("E0407", node.span, "ranges are only supported as foreach iterables");
                None
            }
            NodeKind::TemplateString { .. } => {
                self.error(
                    "E0407",
                    node.span,
                    "template strings are only supported as crash messages",
                );
                None
            }
            NodeKind::Tuple { .. } => {
                self.error("E0407", node.span, "tuples are not supported yet");
                None
            }
            other => {
                let what = other.name();
                self.error("E0407", node.span, format!("a {what} is not an expression"));
                None
            }
        }
    }

    fn var_ref(&mut self, node: &Node<'a>, path: &[&'a str]) -> Option<ResolvedType> {
        if let [name] = path {
            if let Some(local) = self.find_local(name) {
                local.used = true;
                let ty = local.ty.clone();
                self.bindings.insert(node.id, Binding::Local);
                return ty;
            }
        }
        let (kind, package, name, foreign) = match self.globals.lookup(self.package, path) {
            Ok(Found::Symbol(symbol)) => (symbol.kind.clone(), symbol.package, symbol.name, symbol.foreign),
            Ok(Found::Namespace(_)) => {
                let written = path.join("::");
                self.error("E0400", node.span, format!("'{written}' is a package, not a value"));
                return None;
            }
            Err(message) => {
                self.error("E0400", node.span, message);
                return None;
            }
        };
        let (binding, ty) = match kind {
            SymbolKind::Var { ty, .. } if foreign => (Binding::Foreign { name: name.to_string() }, ty),
            SymbolKind::Var { ty, .. } => (
                Binding::Global {
                    package,
                    name: name.to_string(),
                },
                ty,
            ),
            SymbolKind::Function(ty) if foreign => (Binding::Foreign { name: name.to_string() }, ty),
            SymbolKind::Function(ty) => (
                Binding::Function {
                    package,
                    name: name.to_string(),
                },
                ty,
            ),
            SymbolKind::Struct(_) | SymbolKind::Typedef(_) => {
                let written = path.join("::");
                self.error("E0400", node.span, format!("'{written}' is a type, not a value"));
                return None;
            }
        };
        self.bindings.insert(node.id, binding);
        Some(ty)
    }

    fn binary(
        &mut self,
        node: &Node<'a>,
        op: BinaryOp,
        lhs: &Node<'a>,
        rhs: &Node<'a>,
        expected: Option<&ResolvedType>,
    ) -> Option<ResolvedType> {
        if op.is_logical() {
            let l = self.expect_value(lhs, &bool_type());
            let r = self.expect_value(rhs, &bool_type());
            return l.and(r).map(|_| bool_type());
        }
        let hint = if op.is_comparison() {
            None
        } else {
            expected.filter(|ty| ty.is_numeric())
        };
        // Type the literal side from the other operand.
        let (l, r) = if is_untyped(lhs) && !is_untyped(rhs) {
            let r = self.expr(rhs, hint);
            (self.expr(lhs, r.as_ref().or(hint)), r)
        } else {
            let l = self.expr(lhs, hint);
            let r = self.expr(rhs, l.as_ref().or(hint));
            (l, r)
        };
        let (l, r) = (l?, r?);
        let result = match op {
            _ if op.is_comparison() => {
                let comparable =
                    self.unify(&l, &r).is_some() || (l.is_pointer() && r.is_pointer());
                comparable.then(bool_type)
            }
            BinaryOp::Add | BinaryOp::Sub if l.is_pointer() && r.is_integer() => Some(l.clone()),
            BinaryOp::Add if l.is_integer() && r.is_pointer() => Some(r.clone()),
            BinaryOp::Sub if l.is_pointer() && r.is_pointer() => {
                Some(ResolvedType::Scalar(Scalar::Iptr))
            }
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                if l.is_numeric() && r.is_numeric() {
                    self.unify(&l, &r)
                } else {
                    None
                }
            }
            BinaryOp::Rem | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                if l.is_integer() && r.is_integer() {
                    self.unify(&l, &r)
                } else {
                    None
                }
            }
            BinaryOp::Shl | BinaryOp::Shr => (l.is_integer() && r.is_integer()).then(|| l.clone()),
            _ => None,
        };
        if result.is_none() {
            let (left, right) = (self.name(&l), self.name(&r));
            self.error(
                "E0401",
                node.span,
                format!("cannot apply '{}' to {left} and {right}", op.symbol()),
            );
        }
        result
    }

    fn unary(
        &mut self,
        node: &Node<'a>,
        op: UnaryOp,
        operand: &Node<'a>,
        expected: Option<&ResolvedType>,
    ) -> Option<ResolvedType> {
        match op {
            UnaryOp::Not => self.expect_value(operand, &bool_type()).map(|_| bool_type()),
            UnaryOp::Neg | UnaryOp::BitNot => {
                let ty = self.expr(operand, expected.filter(|ty| ty.is_numeric()))?;
                let ok = if op == UnaryOp::Neg {
                    ty.is_numeric()
                } else {
                    ty.is_integer()
                };
                if !ok {
                    let name = self.name(&ty);
                    self.error("E0401", node.span, format!("cannot apply '{}' to {name}", op.symbol()));
                    return None;
                }
                Some(ty)
            }
            UnaryOp::AddrOf => {
                let ty = self.expr(operand, None)?;
                if !matches!(
                    operand.kind,
                    NodeKind::VarRef { .. }
                        | NodeKind::GetField { .. }
                        | NodeKind::Index { .. }
                        | NodeKind::Unary {
                            op: UnaryOp::Deref,
                            ..
                        }
                ) {
                    self.error("E0401", node.span, "cannot take the address of a temporary value");
                    return None;
                }
                if self.place_mutable(operand).is_ok() {
                    Some(ResolvedType::mut_pointer(ty))
                } else {
                    Some(ResolvedType::pointer(ty))
                }
            }
            UnaryOp::Deref => {
                let ty = self.expr(operand, None)?;
                match ty {
                    ResolvedType::Pointer(inner) | ResolvedType::MutPointer(inner) => Some(*inner),
                    other => {
                        let name = self.name(&other);
                        self.error("E0401", node.span, format!("cannot dereference {name}"));
                        None
                    }
                }
            }
            UnaryOp::PreInc | UnaryOp::PreDec => self.step(operand),
        }
    }

    /// `++`/`--` in either position.
    fn step(&mut self, operand: &Node<'a>) -> Option<ResolvedType> {
        let ty = self.expr(operand, None)?;
        if !ty.is_integer() && !ty.is_pointer() {
            let name = self.name(&ty);
            self.error("E0401", operand.span, format!("cannot increment or decrement {name}"));
            return None;
        }
        if let Err(message) = self.place_mutable(operand) {
            self.error("E0404", operand.span, message);
            return None;
        }
        Some(ty)
    }

    fn call(&mut self, node: &Node<'a>, callee: &Node<'a>, args: &[Node<'a>]) -> Option<ResolvedType> {
        let (params, ret) = match self.expr(callee, None) {
            Some(ResolvedType::Function { params, ret }) => (params, *ret),
            Some(other) => {
                let name = self.name(&other);
                self.error("E0402", callee.span, format!("{name} is not a function"));
                for arg in args {
                    self.expr(arg, None);
                }
                return None;
            }
            None => {
                for arg in args {
                    self.expr(arg, None);
                }
                return None;
            }
        };
        if args.len() != params.len() {
            self.error(
                "E0402",
                node.span,
                format!(
                    "expected {} argument(s), found {}",
                    params.len(),
                    args.len()
                ),
            );
            for arg in args {
                self.expr(arg, None);
            }
            return Some(ret);
        }
        for (arg, param) in args.iter().zip(&params) {
            self.expect_value(arg, param);
        }
        Some(ret)
    }

    fn field(&mut self, node: &Node<'a>, target: &Node<'a>, field: &str, arrow: bool) -> Option<ResolvedType> {
        let ty = self.expr(target, None)?;
        let base = match (&ty, arrow) {
            (ResolvedType::Pointer(inner) | ResolvedType::MutPointer(inner), true) => (**inner).clone(),
            (_, true) => {
                let name = self.name(&ty);
                self.error("E0403", node.span, format!("'->' needs a pointer to a struct, found {name}"));
                return None;
            }
            (ResolvedType::Pointer(_) | ResolvedType::MutPointer(_), false) => {
                self.error("E0403", node.span, "use '->' to reach a field through a pointer");
                return None;
            }
            (_, false) => ty.clone(),
        };
        match self.globals.structs.field_type(&base, field) {
            Some(field_ty) => Some(field_ty),
            None => {
                let name = self.name(&base);
                self.error("E0403", node.span, format!("{name} has no field '{field}'"));
                None
            }
        }
    }

    fn index(&mut self, target: &Node<'a>, index: &Node<'a>) -> Option<ResolvedType> {
        let ty = self.expr(target, None);
        let at = self.expr(index, None);
        let (ty, at) = (ty?, at?);
        if !at.is_integer() {
            let name = self.name(&at);
            self.error("E0401", index.span, format!("an index must be an integer, found {name}"));
            return None;
        }
        match ty {
            ResolvedType::Array { elem, .. }
            | ResolvedType::Pointer(elem)
            | ResolvedType::MutPointer(elem) => Some(*elem),
            other => {
                let name = self.name(&other);
                self.error("E0401", target.span, format!("cannot index into {name}"));
                None
            }
        }
    }

    fn struct_init(
        &mut self,
        node: &Node<'a>,
        fields: &[FieldInit<'a>],
        expected: Option<&ResolvedType>,
    ) -> Option<ResolvedType> {
        let Some(expected) = expected.filter(|ty| ty.is_struct()).cloned() else {
            for init in fields {
                self.expr(&init.value, None);
            }
            self.error("E0408", node.span, "cannot infer the struct type of this initializer");
            return None;
        };
        let mut seen: Vec<&str> = Vec::new();
        for init in fields {
            if seen.contains(&init.name) {
                self.error("E0405", init.span, format!("field '{}' is initialized twice", init.name));
                continue;
            }
            seen.push(init.name);
            match self.globals.structs.field_type(&expected, init.name) {
                Some(field_ty) => {
                    self.expect_value(&init.value, &field_ty);
                }
                None => {
                    let name = self.name(&expected);
                    self.error("E0403", init.span, format!("{name} has no field '{}'", init.name));
                    self.expr(&init.value, None);
                }
            }
        }
        Some(expected)
    }

    fn array_init(
        &mut self,
        node: &Node<'a>,
        len: Option<&Node<'a>>,
        elements: &[ArrayElement<'a>],
        expected: Option<&ResolvedType>,
    ) -> Option<ResolvedType> {
        let Some(ResolvedType::Array {
            elem,
            len: declared,
        }) = expected.cloned()
        else {
            for element in elements {
                self.expr(&element.value, None);
            }
            self.error("E0408", node.span, "cannot infer the element type of this array initializer");
            return None;
        };
        let written = match len {
            Some(len) => {
                self.expect_value(len, &size_type());
                match len.kind {
                    NodeKind::Literal(Literal::Int(text)) => parse_int(text),
                    _ => None,
                }
            }
            None => None,
        };
        for element in elements {
            if let Some(index) = &element.index {
                if let Some(ty) = self.expr(index, Some(&size_type())) {
                    if !ty.is_integer() {
                        let name = self.name(&ty);
                        self.error("E0401", index.span, format!("an index must be an integer, found {name}"));
                    }
                }
            }
            self.expect_value(&element.value, &elem);
        }
        Some(ResolvedType::Array {
            elem,
            len: declared.or(written).or(Some(elements.len() as u64)),
        })
    }
}

fn literal_type(literal: Literal<'_>, expected: Option<&ResolvedType>) -> ResolvedType {
    match (literal, expected) {
        (Literal::Bool(_), _) => bool_type(),
        (Literal::Int(_), Some(ResolvedType::Scalar(scalar))) if *scalar != Scalar::Bool => {
            ResolvedType::Scalar(*scalar)
        }
        (Literal::Int(_), _) => ResolvedType::Scalar(Scalar::Int),
        (Literal::Float(_), Some(ResolvedType::Scalar(scalar))) if scalar.is_float() => {
            ResolvedType::Scalar(*scalar)
        }
        (Literal::Float(_), _) => ResolvedType::Scalar(Scalar::Float),
        (Literal::Char(_), _) => ResolvedType::Scalar(Scalar::Char),
        (Literal::String(_) | Literal::Chars(_), _) => char_ptr(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::ast::IdGen;
    use crate::package::{build_dependencies, topological_order};
    use crate::parser::parse_sources;
    use crate::source::SourceMap;
    use crate::span::FileId;

    fn with_resolution(sources: &[&str], check: impl FnOnce(&Node<'_>, &ResolveResult<'_>)) {
        let mut map = SourceMap::new();
        for (i, text) in sources.iter().enumerate() {
            map.add(format!("file{i}.ql"), *text);
        }
        let mut ids = IdGen::new();
        let parsed = parse_sources(&map, &mut ids);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        let mut table = PackageTable::new();
        assert!(table.register_files(&parsed.root, FileId(0)).is_empty());
        let (graph, diagnostics) = build_dependencies(&mut table);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let all: Vec<_> = table.iter().map(|p| p.id).collect();
        let order = topological_order(&graph, &all).expect("acyclic");
        let result = resolve(&table, &order, ids.node_count());
        check(&parsed.root, &result);
    }

    fn error_codes(sources: &[&str]) -> Vec<&'static str> {
        let mut codes = Vec::new();
        with_resolution(sources, |_, result| {
            codes = result
                .diagnostics
                .iter()
                .filter(|d| d.is_error())
                .filter_map(|d| d.code)
                .collect();
        });
        codes
    }

    fn find<'n, 's>(root: &'n Node<'s>, pred: impl Fn(&Node<'s>) -> bool) -> &'n Node<'s> {
        let mut found = None;
        root.walk(&mut |node| {
            if found.is_none() && pred(node) {
                found = Some(node);
            }
        });
        found.expect("node present")
    }

    #[test]
    fn well_typed_program_is_clean() {
        with_resolution(
            &["struct Point { int x, int y }\n\
               int add(int a, int b) { return a + b; }\n\
               void main() {\n\
                   Point mut p = .{ .x = 1, .y = 2 };\n\
                   p.x = add(p.x, 3);\n\
                   u8 small = 4;\n\
                   int mut wide = small;\n\
                   int[3] xs = [3]{ 1, 2, 3 };\n\
                   foreach v in xs { wide += v; }\n\
                   foreach i in 0..3 { wide += i; }\n\
                   let q = &p;\n\
                   q->y = 5;\n\
                   if wide > 2 && small != 0 { crash `wide is {wide}`; }\n\
               }"],
            |_, result| assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics),
        );
    }

    #[test]
    fn type_errors_are_reported_once_each() {
        let codes = error_codes(&["void main() {\n\
                 int x = 1;\n\
                 x = 2;\n\
                 bool b = \"s\";\n\
                 undefined();\n\
                 x(1);\n\
                 let _p = .{ .a = 1 };\n\
                 char* _s = cast<char*>(b);\n\
             }"]);
        assert_eq!(codes, vec!["E0404", "E0401", "E0400", "E0402", "E0408", "E0406"]);
    }

    #[test]
    fn unused_locals_warn_unless_marked() {
        with_resolution(
            &["void main() { int a = 1; @unused int b = 2; int _c = 3; }"],
            |_, result| {
                assert!(!result.has_errors());
                let warnings: Vec<_> = result.diagnostics.iter().filter_map(|d| d.code).collect();
                assert_eq!(warnings, vec!["W0001"]);
                assert!(result.diagnostics[0].message.contains("'a'"));
            },
        );
    }

    #[test]
    fn scopes_shadow_but_do_not_redeclare() {
        let codes = error_codes(&["void main() {\n\
                 int a = 1;\n\
                 { int a = 2; a; }\n\
                 int a = 3;\n\
                 int z = z;\n\
             }"]);
        assert_eq!(codes, vec!["E0405", "E0400"]);
    }

    #[test]
    fn parameters_share_the_body_scope() {
        let codes = error_codes(&["int f(int a) { int a = 2; return a; }\nvoid main() {}"]);
        assert_eq!(codes, vec!["E0405"]);
    }

    #[test]
    fn return_values_match_the_signature() {
        let codes = error_codes(&["int f() { return; }\nvoid g() { return 1; }\nvoid main() {}"]);
        assert_eq!(codes, vec!["E0401", "E0401"]);
    }

    #[test]
    fn bindings_distinguish_locals_globals_functions_and_foreign() {
        with_resolution(
            &[
                "import libc/stdio;\nint counter;\n\
                 void main() { int local = counter; stdio::puts(\"hi\"); tick(); local; }\n\
                 void tick() {}",
                "@c_header(\"stdio.h\") package libc/stdio;\nint puts(char* s);",
            ],
            |root, result| {
                assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
                let mut bindings = HashMap::new();
                root.walk(&mut |node| {
                    if let NodeKind::VarRef { path } = &node.kind {
                        bindings.insert(path.join("::"), result.resolution.binding(node.id).cloned());
                    }
                });
                assert_eq!(bindings["local"], Some(Binding::Local));
                assert!(matches!(&bindings["counter"], Some(Binding::Global { name, .. }) if name == "counter"));
                assert!(matches!(&bindings["tick"], Some(Binding::Function { name, .. }) if name == "tick"));
                assert_eq!(
                    bindings["stdio::puts"],
                    Some(Binding::Foreign {
                        name: "puts".to_string()
                    })
                );
            },
        );
    }

    #[test]
    fn foreach_needs_integer_ranges_or_sized_arrays() {
        with_resolution(
            &["void main() {\n\
                 foreach i in @range_usize 0..4 { uptr j = i; j; }\n\
                 foreach k in 1.5..3.0 { }\n\
                 foreach x in 5 { }\n\
                 let r = 0..3;\n\
             }"],
            |root, result| {
                let codes: Vec<_> = result
                    .diagnostics
                    .iter()
                    .filter(|d| d.is_error())
                    .filter_map(|d| d.code)
                    .collect();
                assert_eq!(codes, vec!["E0401", "E0407", "E0407"]);
                let first = find(root, |n| matches!(n.kind, NodeKind::Foreach { .. }));
                assert_eq!(
                    result.resolution.type_of(first.id),
                    Some(&ResolvedType::Scalar(Scalar::Uptr))
                );
            },
        );
    }

    #[test]
    fn generic_fields_are_substituted() {
        with_resolution(
            &["struct Box<T> { T value }\n\
               void main() { Box<u8> mut b = .{ .value = 1 }; u8 v = b.value; v; }"],
            |root, result| {
                assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
                let access = find(root, |n| matches!(n.kind, NodeKind::GetField { .. }));
                assert_eq!(
                    result.resolution.type_of(access.id),
                    Some(&ResolvedType::Scalar(Scalar::U8))
                );
            },
        );
    }

    #[test]
    fn literals_take_the_expected_type() {
        with_resolution(
            &["void main() { i64 big = 1 + 2; f32 ratio = 0.5; big; ratio; }"],
            |root, result| {
                assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
                let sum = find(root, |n| matches!(n.kind, NodeKind::Binary { .. }));
                assert_eq!(
                    result.resolution.type_of(sum.id),
                    Some(&ResolvedType::Scalar(Scalar::I64))
                );
            },
        );
    }

    #[test]
    fn template_strings_only_in_crash() {
        assert_eq!(error_codes(&["void main() { let _s = `x`; }"]), vec!["E0407"]);
    }

    #[test]
    fn entry_package_needs_main() {
        assert_eq!(error_codes(&["int x;"]), vec!["E0400"]);
    }

    #[test]
    fn pointer_mutability_is_enforced() {
        let codes = error_codes(&["void set(int* p, int mut* q) { *q = 1; *p = 2; }\nvoid main() {}"]);
        assert_eq!(codes, vec!["E0404"]);
    }

    #[test]
    fn sizeof_of_a_variable_measures_the_value() {
        with_resolution(
            &["int[3] table;
               void main() { int x = 1; int[3] a; uptr s = sizeof(x); uptr t = sizeof(a[0]);                uptr u = sizeof(table); s; t; u; }"],
            |root, result| {
                assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
                let mut operands = Vec::new();
                root.walk(&mut |node| {
                    if let NodeKind::SizeofType {
                        operand: Some(operand),
                        ..
                    } = &node.kind
                    {
                        assert!(result.resolution.written.get(node.id).is_none());
                        operands.push(operand);
                    }
                });
                assert_eq!(operands.len(), 3);
                assert_eq!(result.resolution.binding(operands[0].id), Some(&Binding::Local));
                assert_eq!(
                    result.resolution.type_of(operands[1].id),
                    Some(&ResolvedType::Scalar(Scalar::Int))
                );
                assert!(matches!(
                    result.resolution.binding(operands[2].id),
                    Some(Binding::Global { name, .. }) if name == "table"
                ));
            },
        );
    }

    #[test]
    fn sizeof_of_a_type_name_still_measures_the_type() {
        with_resolution(
            &["struct Point { int x, int y }
void main() { uptr s = sizeof(Point); s; }"],
            |root, result| {
                assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
                let node = find(root, |n| matches!(n.kind, NodeKind::SizeofType { .. }));
                assert!(result.resolution.written.get(node.id).is_some());
            },
        );
    }

    #[test]
    fn generic_instances_with_different_arguments_do_not_mix() {
        let codes = error_codes(&["struct Box<T> { T value }
             void main() { Box<int> a = .{ .value = 1 }; Box<u8> b = a; b; }"]);
        assert_eq!(codes, vec!["E0401"]);
    }
}
