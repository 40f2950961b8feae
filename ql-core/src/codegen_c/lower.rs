//! AST to C lowering.
//!
//! A package is lowered into [`Stages`], one list of items per section of
//! the output file: includes, type definitions, variable declarations and
//! definitions, prototypes, and function bodies. The caller decides how the
//! stages are split between a header and a source file.

use crate::ast::{
    ArrayElement, DirectiveKind, FieldInit, FunctionSig, Literal, Node, NodeKind, TemplatePart,
    VarDecl, find_directive,
};
use crate::builtins::Scalar;
use crate::diagnostic::Diagnostic;
use crate::package::{Package, PackageId, PackageTable, import_target};
use crate::span::Span;
use crate::typecheck::{Binding, Resolution};
use crate::types::{Instances, ResolvedType, StructId};

use super::ir::{CExpr, CItem, CParam, CStmt, CType, CVar, Storage};
use super::{c_ident, file_stem, mangle};

/// Upper bound on generic instances one package may pull in, so a struct
/// that nests ever larger instances of itself is reported instead of
/// looping.
const MAX_INSTANCES: usize = 1024;

/// Buffer size for `@stack_buf` crash messages.
const STACK_BUF_LEN: usize = 256;

#[derive(Debug, Default)]
pub struct Stages {
    pub includes: Vec<CItem>,
    pub types: Vec<CItem>,
    /// `extern` declarations of the package's globals.
    pub var_decls: Vec<CItem>,
    pub var_defs: Vec<CItem>,
    pub prototypes: Vec<CItem>,
    pub bodies: Vec<CItem>,
}

/// A struct definition waiting to be ordered.
struct TypeDef {
    name: String,
    fields: Vec<(String, ResolvedType)>,
    instance: bool,
    span: Span,
}

pub struct Lowering<'r, 'a> {
    table: &'r PackageTable<'a>,
    resolution: &'r Resolution<'a>,
    /// Starts as the resolver's instances and grows when an instance's
    /// fields name instances no package used directly.
    instances: Instances,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'r, 'a> Lowering<'r, 'a> {
    pub fn new(table: &'r PackageTable<'a>, resolution: &'r Resolution<'a>) -> Self {
        Lowering {
            table,
            resolution,
            instances: resolution.globals.instances.clone(),
            diagnostics: Vec::new(),
        }
    }

    fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::error(message, span).with_code("E0500"));
    }

    pub fn mangle(&self, package: PackageId, name: &str) -> String {
        mangle(&self.table.get(package).path, name)
    }

    fn instance_name(&mut self, decl: StructId, args: &[ResolvedType]) -> String {
        let version = self.instances.instantiate(decl, args.to_vec());
        let resolution = self.resolution;
        let info = resolution.globals.structs.get(decl);
        format!("{}__{version}", self.mangle(info.package, &info.name))
    }

    /// The C spelling of `ty`, if it has one.
    fn c_type(&mut self, ty: &ResolvedType) -> Option<CType> {
        match ty {
            ResolvedType::Void => Some(CType::named("void")),
            ResolvedType::Scalar(scalar) => Some(CType::named(scalar.c_name())),
            ResolvedType::Pointer(inner) | ResolvedType::MutPointer(inner) => {
                let inner = self.c_type(inner)?;
                if inner.is_array() {
                    return None;
                }
                Some(CType::named(format!("{}*", inner.base)))
            }
            ResolvedType::Array { elem, len } => {
                let inner = self.c_type(elem)?;
                let len = len.map(|n| n.to_string()).unwrap_or_default();
                Some(CType {
                    base: inner.base,
                    suffix: format!("[{len}]{}", inner.suffix),
                })
            }
            ResolvedType::StructDecl(id) => {
                let resolution = self.resolution;
                let info = resolution.globals.structs.get(*id);
                if !info.generics.is_empty() {
                    return None;
                }
                Some(CType::named(self.mangle(info.package, &info.name)))
            }
            ResolvedType::StructRef { decl, args, .. } => {
                if args.iter().any(ResolvedType::has_generics) {
                    return None;
                }
                Some(CType::named(self.instance_name(*decl, args)))
            }
            ResolvedType::Opaque { name, native: true, .. } => Some(CType::named(name.clone())),
            ResolvedType::Opaque { name, package, .. } => Some(CType::named(self.mangle(*package, name))),
            ResolvedType::Generic { .. } | ResolvedType::Function { .. } | ResolvedType::Namespace(_) => {
                None
            }
        }
    }

    /// Like [`Self::c_type`], reporting types C cannot spell.
    fn c_type_at(&mut self, ty: &ResolvedType, span: Span) -> CType {
        match self.c_type(ty) {
            Some(c) => c,
            None => {
                let name = self.resolution.type_name(ty);
                self.error(span, format!("type {name} cannot be expressed in C"));
                CType::named("int")
            }
        }
    }

    pub fn lower_package(&mut self, package: &Package<'a>, ast: &'a Node<'a>) -> Stages {
        let mut stages = Stages::default();
        self.includes(package, ast, &mut stages.includes);
        self.types(package.id, ast, &mut stages.types);
        let mut declared: Vec<&str> = Vec::new();
        for decl in ast.decls() {
            match &decl.kind {
                NodeKind::VarDecl(var) => self.global(package, decl, var, &mut stages),
                NodeKind::FunctionHeader(sig) => {
                    if !declared.contains(&sig.name) {
                        declared.push(sig.name);
                        if let Some(item) = self.prototype(package.id, decl, sig) {
                            stages.prototypes.push(item);
                        }
                    }
                }
                NodeKind::Function { sig, body } => {
                    // Only the definition type resolution kept has a type.
                    let Some(CItem::FunctionHeader { ret, name, params }) =
                        self.prototype(package.id, decl, sig)
                    else {
                        continue;
                    };
                    if !declared.contains(&sig.name) {
                        declared.push(sig.name);
                        stages.prototypes.push(CItem::FunctionHeader {
                            ret: ret.clone(),
                            name: name.clone(),
                            params: params.clone(),
                        });
                    }
                    let Some(ResolvedType::Function { ret: ret_ty, .. }) =
                        self.resolution.type_of(decl.id).cloned()
                    else {
                        continue;
                    };
                    let NodeKind::Block { stmts } = &body.kind else {
                        continue;
                    };
                    let mut lowering = FnLowering::new(self, package.id, *ret_ty);
                    let body = lowering.block(stmts);
                    stages.bodies.push(CItem::Function {
                        ret,
                        name,
                        params,
                        body,
                    });
                }
                _ => {}
            }
        }
        tracing::trace!(
            package = %package.path,
            types = stages.types.len(),
            functions = stages.bodies.len(),
            "lowered package"
        );
        stages
    }

    // -----------------------------------------------------------------
    // Includes
    // -----------------------------------------------------------------

    fn includes(&mut self, package: &Package<'a>, ast: &Node<'a>, out: &mut Vec<CItem>) {
        let mut crashes = false;
        ast.walk(&mut |node| crashes |= matches!(node.kind, NodeKind::Crash { .. }));
        let mut seen: Vec<String> = Vec::new();
        let mut include = |path: String, system: bool| {
            if !seen.contains(&path) {
                seen.push(path.clone());
                out.push(CItem::Include { path, system });
            }
        };
        include("stdint.h".into(), true);
        include("stdbool.h".into(), true);
        if crashes {
            include("stdio.h".into(), true);
            include("stdlib.h".into(), true);
        }
        for decl in ast.decls() {
            let NodeKind::Import(import) = &decl.kind else {
                continue;
            };
            let target = import_target(&package.path, import.kind, &import.segments);
            let Some(id) = self.table.lookup(&target) else {
                continue;
            };
            let target = self.table.get(id);
            match target.foreign_header {
                Some(header) => {
                    let local = header.starts_with("./") || header.starts_with("../");
                    include(header.to_string(), !local);
                }
                None if target.ast.is_some() && !target.is_entry => {
                    include(format!("{}.h", file_stem(&target.path)), false);
                }
                None => {}
            }
        }
    }

    // -----------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------

    fn types(&mut self, package: PackageId, ast: &Node<'a>, out: &mut Vec<CItem>) {
        let resolution = self.resolution;
        let structs = &resolution.globals.structs;
        let mut defs: Vec<TypeDef> = Vec::new();
        let mut pending: Vec<(StructId, Vec<ResolvedType>)> = Vec::new();
        for decl in ast.decls() {
            match (&decl.kind, resolution.type_of(decl.id)) {
                (NodeKind::StructDecl(_), Some(ResolvedType::StructDecl(id))) => {
                    let info = structs.get(*id);
                    if !info.generics.is_empty() {
                        continue;
                    }
                    for (_, ty) in &info.fields {
                        collect_instances(ty, &mut pending);
                    }
                    defs.push(TypeDef {
                        name: self.mangle(package, &info.name),
                        fields: info.fields.clone(),
                        instance: false,
                        span: decl.span,
                    });
                }
                (
                    NodeKind::Typedef { .. },
                    Some(ResolvedType::Opaque {
                        name,
                        package: owner,
                        native: false,
                    }),
                ) => out.push(CItem::ForwardStruct(self.mangle(*owner, name))),
                _ => {}
            }
        }

        pending.extend(
            resolution
                .globals
                .scope(package)
                .instances
                .iter()
                .filter_map(|(decl, version)| resolution.globals.instances.get(*decl, *version))
                .map(|instance| (instance.decl, instance.args.clone())),
        );
        let mut next = 0;
        while next < pending.len() {
            if defs.len() > MAX_INSTANCES {
                self.error(ast.span, "generic struct instances nest without end");
                return;
            }
            let (decl, args) = pending[next].clone();
            next += 1;
            let name = self.instance_name(decl, &args);
            if defs.iter().any(|def| def.name == name) {
                continue;
            }
            let info = structs.get(decl);
            let fields: Vec<(String, ResolvedType)> = info
                .fields
                .iter()
                .map(|(field, ty)| (field.clone(), ty.substitute(info.node, &args)))
                .collect();
            for (_, ty) in &fields {
                collect_instances(ty, &mut pending);
            }
            defs.push(TypeDef {
                name,
                fields,
                instance: true,
                span: ast.span,
            });
        }

        let mut lowered = Vec::with_capacity(defs.len());
        let mut deps = Vec::with_capacity(defs.len());
        for def in &defs {
            let mut fields = Vec::with_capacity(def.fields.len());
            let mut needs = Vec::new();
            for (field, ty) in &def.fields {
                fields.push((self.c_type_at(ty, def.span), c_ident(field)));
                if let Some(dep) = self.value_dependency(ty) {
                    if let Some(index) = defs.iter().position(|d| d.name == dep) {
                        needs.push(index);
                    }
                }
            }
            lowered.push(fields);
            deps.push(needs);
        }
        let order = match value_order(&deps) {
            Ok(order) => order,
            Err(index) => {
                let def = &defs[index];
                let (name, span) = (def.name.clone(), def.span);
                self.error(span, format!("struct {name} contains itself by value"));
                return;
            }
        };

        for def in &defs {
            if def.instance {
                out.extend(guarded(
                    format!("QL_FORWARD_{}", def.name),
                    CItem::ForwardStruct(def.name.clone()),
                ));
            } else {
                out.push(CItem::ForwardStruct(def.name.clone()));
            }
        }
        for index in order {
            let def = &defs[index];
            let item = CItem::Struct {
                name: def.name.clone(),
                fields: lowered[index].clone(),
            };
            if def.instance {
                out.extend(guarded(format!("QL_INSTANCE_{}", def.name), item));
            } else {
                out.push(item);
            }
        }
    }

    /// The struct a field of type `ty` embeds by value.
    fn value_dependency(&mut self, ty: &ResolvedType) -> Option<String> {
        match ty {
            ResolvedType::Array { elem, .. } => self.value_dependency(elem),
            ResolvedType::StructDecl(_) | ResolvedType::StructRef { .. } => self.c_type(ty).map(|c| c.base),
            _ => None,
        }
    }

    // -----------------------------------------------------------------
    // Globals and prototypes
    // -----------------------------------------------------------------

    fn global(&mut self, package: &Package<'a>, decl: &Node<'a>, var: &VarDecl<'a>, stages: &mut Stages) {
        let Some(ty) = self.resolution.type_of(decl.id).cloned() else {
            return;
        };
        let c_ty = self.c_type_at(&ty, decl.span);
        if find_directive(&decl.directives, DirectiveKind::Extern).is_some() {
            let item = CItem::Var {
                var: CVar::new(c_ty, var.name, None),
                storage: Storage::Extern,
            };
            if package.is_entry {
                stages.var_defs.push(item);
            } else {
                stages.var_decls.push(item);
            }
            return;
        }
        let name = self.mangle(package.id, var.name);
        let init = var.init.as_deref().map(|init| {
            let mut lowering = FnLowering::new(self, package.id, ResolvedType::Void);
            lowering.initializer(init)
        });
        if !var.is_static {
            stages.var_decls.push(CItem::Var {
                var: CVar::new(c_ty.clone(), name.clone(), None),
                storage: Storage::Extern,
            });
        }
        let mut definition = CVar::new(c_ty, name, init);
        definition.is_static = var.is_static;
        stages.var_defs.push(CItem::Var {
            var: definition,
            storage: Storage::Definition,
        });
    }

    fn prototype(&mut self, package: PackageId, decl: &Node<'a>, sig: &FunctionSig<'a>) -> Option<CItem> {
        let Some(ResolvedType::Function { params, ret }) = self.resolution.type_of(decl.id).cloned() else {
            return None;
        };
        let foreign = self
            .resolution
            .globals
            .scope(package)
            .symbols
            .get(sig.name)
            .is_some_and(|symbol| symbol.foreign);
        let name = if foreign {
            sig.name.to_string()
        } else {
            self.mangle(package, sig.name)
        };
        let ret = self.c_type_at(&ret, decl.span);
        if ret.is_array() {
            self.error(decl.span, format!("'{}' cannot return an array in C", sig.name));
        }
        let params = sig
            .params
            .iter()
            .zip(&params)
            .map(|(param, ty)| CParam {
                ty: self.c_type_at(ty, param.span),
                name: c_ident(param.name),
                restrict: find_directive(&param.ty.directives, DirectiveKind::Restrict).is_some(),
            })
            .collect();
        Some(CItem::FunctionHeader { ret, name, params })
    }
}

fn collect_instances(ty: &ResolvedType, out: &mut Vec<(StructId, Vec<ResolvedType>)>) {
    match ty {
        ResolvedType::StructRef { decl, args, .. } if !args.iter().any(ResolvedType::has_generics) => {
            for arg in args {
                collect_instances(arg, out);
            }
            out.push((*decl, args.clone()));
        }
        ResolvedType::Pointer(inner) | ResolvedType::MutPointer(inner) => collect_instances(inner, out),
        ResolvedType::Array { elem, .. } => collect_instances(elem, out),
        _ => {}
    }
}

/// Definitions ordered so every struct follows those it embeds by value.
/// On a cycle, returns a definition on it.
fn value_order(deps: &[Vec<usize>]) -> Result<Vec<usize>, usize> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(at: usize, deps: &[Vec<usize>], marks: &mut [Mark], out: &mut Vec<usize>) -> Result<(), usize> {
        match marks[at] {
            Mark::Done => return Ok(()),
            Mark::Active => return Err(at),
            Mark::New => {}
        }
        marks[at] = Mark::Active;
        for &dep in &deps[at] {
            visit(dep, deps, marks, out)?;
        }
        marks[at] = Mark::Done;
        out.push(at);
        Ok(())
    }

    let mut marks = vec![Mark::New; deps.len()];
    let mut out = Vec::with_capacity(deps.len());
    for at in 0..deps.len() {
        visit(at, deps, &mut marks, &mut out)?;
    }
    Ok(out)
}

fn guarded(guard: String, item: CItem) -> [CItem; 4] {
    [CItem::IfNotDef(guard.clone()), CItem::Define(guard), item, CItem::EndIf]
}

/// Lowers one function body (or a global initializer).
struct FnLowering<'l, 'r, 'a> {
    cx: &'l mut Lowering<'r, 'a>,
    package: PackageId,
    ret: ResolvedType,
    /// Deferred statements per open block, innermost last.
    defers: Vec<Vec<&'a Node<'a>>>,
    temps: u32,
}

impl<'l, 'r, 'a> FnLowering<'l, 'r, 'a> {
    fn new(cx: &'l mut Lowering<'r, 'a>, package: PackageId, ret: ResolvedType) -> Self {
        FnLowering {
            cx,
            package,
            ret,
            defers: Vec::new(),
            temps: 0,
        }
    }

    fn temp(&mut self, what: &str) -> String {
        let name = format!("__ql_{what}_{}", self.temps);
        self.temps += 1;
        name
    }

    fn type_of(&mut self, node: &Node<'a>) -> CType {
        match self.cx.resolution.type_of(node.id).cloned() {
            Some(ty) => self.cx.c_type_at(&ty, node.span),
            None => {
                self.cx.error(node.span, "expression has no resolved type");
                CType::named("int")
            }
        }
    }

    // -----------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------

    fn block(&mut self, stmts: &'a [Node<'a>]) -> Vec<CStmt> {
        self.defers.push(Vec::new());
        let mut out = Vec::new();
        for stmt in stmts {
            self.stmt(stmt, &mut out);
        }
        let deferred = self.defers.pop().unwrap_or_default();
        if !matches!(out.last(), Some(CStmt::Return(_))) && !returns(stmts.last()) {
            for stmt in deferred.into_iter().rev() {
                self.stmt(stmt, &mut out);
            }
        }
        out
    }

    /// A branch or loop body as a statement list.
    fn branch(&mut self, node: &'a Node<'a>) -> Vec<CStmt> {
        match &node.kind {
            NodeKind::Block { stmts } => self.block(stmts),
            _ => {
                let mut out = Vec::new();
                self.stmt(node, &mut out);
                out
            }
        }
    }

    fn stmt(&mut self, node: &'a Node<'a>, out: &mut Vec<CStmt>) {
        match &node.kind {
            NodeKind::Block { stmts } => {
                let body = self.block(stmts);
                out.push(CStmt::Block(body));
            }
            NodeKind::VarDecl(var) => {
                let ty = self.type_of(node);
                let init = var.init.as_deref().map(|init| self.initializer(init));
                let mut local = CVar::new(ty, c_ident(var.name), init);
                local.is_static = var.is_static;
                out.push(CStmt::Var(local));
            }
            NodeKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = self.expr(cond);
                let then_branch = self.branch(then_branch);
                let else_branch = else_branch.as_deref().map(|e| self.branch(e));
                out.push(CStmt::If {
                    cond,
                    then_branch,
                    else_branch,
                });
            }
            NodeKind::While { cond, body } => {
                let cond = self.expr(cond);
                let body = self.branch(body);
                out.push(CStmt::While { cond, body });
            }
            NodeKind::Foreach {
                binding,
                iterable,
                body,
            } => self.foreach(node, binding, iterable, body, out),
            NodeKind::Return { value } => self.return_stmt(value.as_deref(), out),
            NodeKind::Defer { stmt } => {
                if let Some(frame) = self.defers.last_mut() {
                    frame.push(&**stmt);
                }
            }
            NodeKind::Crash { message } => self.crash(node, message.as_deref(), out),
            NodeKind::ExprStmt { expr } => {
                let expr = self.expr(expr);
                out.push(CStmt::Expr(expr));
            }
            NodeKind::Assign { op, target, value } => {
                let target = self.expr(target);
                let value = self.expr(value);
                out.push(CStmt::Assign {
                    op: op.symbol(),
                    target,
                    value,
                });
            }
            other => {
                let what = other.name();
                self.cx.error(node.span, format!("cannot generate C for a {what}"));
            }
        }
    }

    /// Returns run every pending deferred statement, innermost first. A
    /// returned value is computed before they run.
    fn return_stmt(&mut self, value: Option<&Node<'a>>, out: &mut Vec<CStmt>) {
        let pending: Vec<&'a Node<'a>> = self
            .defers
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev().copied())
            .collect();
        if pending.is_empty() {
            let value = value.map(|v| self.expr(v));
            out.push(CStmt::Return(value));
            return;
        }
        let mut body = Vec::new();
        let result = match value {
            Some(value) => {
                let ret = self.ret.clone();
                let ty = self.cx.c_type_at(&ret, value.span);
                let init = self.expr(value);
                let name = self.temp("ret");
                body.push(CStmt::Var(CVar::new(ty, name.clone(), Some(init))));
                Some(CExpr::Var(name))
            }
            None => None,
        };
        for stmt in pending {
            self.stmt(stmt, &mut body);
        }
        body.push(CStmt::Return(result));
        out.push(CStmt::Block(body));
    }

    fn foreach(
        &mut self,
        node: &'a Node<'a>,
        binding: &str,
        iterable: &'a Node<'a>,
        body: &'a Node<'a>,
        out: &mut Vec<CStmt>,
    ) {
        let name = c_ident(binding);
        if let NodeKind::Range {
            start,
            end,
            inclusive,
        } = &iterable.kind
        {
            let counter = self.type_of(iterable);
            let end_name = self.temp("end");
            let end = self.expr(end);
            let start = self.expr(start);
            let cmp = if *inclusive { "<=" } else { "<" };
            let body = self.branch(body);
            out.push(CStmt::Block(vec![
                CStmt::Var(CVar::new(counter.clone(), end_name.clone(), Some(end))),
                CStmt::For {
                    init: CVar::new(counter, name.clone(), Some(start)),
                    cond: CExpr::binary(cmp, CExpr::var(name.clone()), CExpr::Var(end_name)),
                    step: CExpr::postfix("++", CExpr::Var(name)),
                    body,
                },
            ]));
            return;
        }
        let len = match self.cx.resolution.type_of(iterable.id) {
            Some(ResolvedType::Array { len: Some(len), .. }) => *len,
            _ => {
                self.cx.error(iterable.span, "foreach needs an array of known length");
                return;
            }
        };
        let elem = self.type_of(node);
        let index = self.temp("i");
        let target = self.expr(iterable);
        let mut inner = vec![CStmt::Var(CVar::new(
            elem,
            name,
            Some(CExpr::Index {
                target: Box::new(target),
                index: Box::new(CExpr::var(index.clone())),
            }),
        ))];
        inner.extend(self.branch(body));
        out.push(CStmt::For {
            init: CVar::new(
                CType::named(Scalar::Uptr.c_name()),
                index.clone(),
                Some(CExpr::literal("0")),
            ),
            cond: CExpr::binary("<", CExpr::var(index.clone()), CExpr::literal(len.to_string())),
            step: CExpr::postfix("++", CExpr::Var(index)),
            body: inner,
        });
    }

    fn crash(&mut self, node: &Node<'a>, message: Option<&Node<'a>>, out: &mut Vec<CStmt>) {
        let stderr = CExpr::var("stderr");
        match message.map(|m| (m, &m.kind)) {
            None => {}
            Some((message, NodeKind::TemplateString { parts })) => {
                let (format, mut args) = self.template(parts);
                if find_directive(&message.directives, DirectiveKind::StackBuf).is_some() {
                    let buf = self.temp("buf");
                    let ty = CType {
                        base: "char".into(),
                        suffix: format!("[{STACK_BUF_LEN}]"),
                    };
                    let mut call_args = vec![
                        CExpr::var(buf.clone()),
                        CExpr::SizeofExpr(Box::new(CExpr::var(buf.clone()))),
                        CExpr::Literal(format),
                    ];
                    call_args.append(&mut args);
                    out.push(CStmt::Block(vec![
                        CStmt::Var(CVar::new(ty, buf.clone(), None)),
                        CStmt::Expr(CExpr::call("snprintf", call_args)),
                        CStmt::Expr(CExpr::call("fputs", vec![CExpr::Var(buf), stderr])),
                    ]));
                } else {
                    let mut call_args = vec![stderr, CExpr::Literal(format)];
                    call_args.append(&mut args);
                    out.push(CStmt::Expr(CExpr::call("fprintf", call_args)));
                }
            }
            Some((_, NodeKind::Literal(Literal::String(text) | Literal::Chars(text)))) => {
                let format = format!("\"{}\\n\"", text.replace('%', "%%"));
                out.push(CStmt::Expr(CExpr::call(
                    "fprintf",
                    vec![stderr, CExpr::Literal(format)],
                )));
            }
            Some((message, _)) => {
                let value = self.expr(message);
                out.push(CStmt::Expr(CExpr::call(
                    "fprintf",
                    vec![stderr, CExpr::literal("\"%s\\n\""), value],
                )));
            }
        }
        tracing::trace!(line = node.span.line, "lowered crash");
        out.push(CStmt::Expr(CExpr::call("abort", Vec::new())));
    }

    /// A printf format literal (with trailing newline) and its arguments.
    fn template(&mut self, parts: &[TemplatePart<'a>]) -> (String, Vec<CExpr>) {
        let mut format = String::from("\"");
        let mut args = Vec::new();
        for part in parts {
            match part {
                TemplatePart::Text(text) => format.push_str(&format_text(text)),
                TemplatePart::Expr(expr) => {
                    let value = self.expr(expr);
                    let (conversion, arg) = match self.cx.resolution.type_of(expr.id) {
                        Some(ResolvedType::Scalar(scalar)) => {
                            let conversion = scalar.descriptor().printf;
                            let arg = match scalar.printf_type() {
                                reads if reads == scalar.c_name() => value,
                                reads => CExpr::cast(CType::named(reads), value),
                            };
                            (conversion, arg)
                        }
                        Some(ResolvedType::Pointer(inner) | ResolvedType::MutPointer(inner))
                            if **inner == ResolvedType::Scalar(Scalar::Char) =>
                        {
                            ("%s", value)
                        }
                        _ => ("%p", CExpr::cast(CType::named("void*"), value)),
                    };
                    format.push_str(conversion);
                    args.push(arg);
                }
            }
        }
        format.push_str("\\n\"");
        (format, args)
    }

    // -----------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------

    /// A declaration's initializer, where array initializer lists are legal.
    fn initializer(&mut self, node: &Node<'a>) -> CExpr {
        match &node.kind {
            NodeKind::ArrayInit { elements, .. } => self.init_list(elements),
            _ => self.expr(node),
        }
    }

    fn init_list(&mut self, elements: &[ArrayElement<'a>]) -> CExpr {
        let elements = elements
            .iter()
            .map(|element| {
                let index = element.index.as_ref().map(|index| self.expr(index));
                (index, self.expr(&element.value))
            })
            .collect();
        CExpr::InitList(elements)
    }

    fn expr(&mut self, node: &Node<'a>) -> CExpr {
        match &node.kind {
            NodeKind::Literal(literal) => CExpr::Literal(literal_text(*literal)),
            NodeKind::VarRef { path } => self.var_ref(node, path),
            NodeKind::Binary { op, lhs, rhs } => {
                let lhs = self.expr(lhs);
                let rhs = self.expr(rhs);
                CExpr::binary(op.symbol(), lhs, rhs)
            }
            NodeKind::Unary { op, operand } => CExpr::Unary {
                op: op.symbol(),
                operand: Box::new(self.expr(operand)),
            },
            NodeKind::Postfix { op, operand } => {
                let operand = self.expr(operand);
                CExpr::postfix(op.symbol(), operand)
            }
            NodeKind::Call { callee, args } => {
                let callee = self.expr(callee);
                let args = args.iter().map(|arg| self.expr(arg)).collect();
                CExpr::Call {
                    callee: Box::new(callee),
                    args,
                }
            }
            NodeKind::GetField {
                target,
                field,
                arrow,
            } => CExpr::Field {
                target: Box::new(self.expr(target)),
                field: c_ident(field),
                arrow: *arrow,
            },
            NodeKind::Index { target, index } => {
                let target = self.expr(target);
                let index = self.expr(index);
                CExpr::Index {
                    target: Box::new(target),
                    index: Box::new(index),
                }
            }
            NodeKind::StructInit { fields } => self.struct_init(node, fields),
            NodeKind::ArrayInit { .. } => {
                self.cx.error(node.span, "array initializers are only supported in declarations");
                CExpr::literal("0")
            }
            NodeKind::SizeofType { operand, .. } => match (
                self.cx.resolution.written.get(node.id).cloned(),
                operand.as_deref(),
            ) {
                (Some(ty), _) => CExpr::SizeofType(self.cx.c_type_at(&ty, node.span)),
                (None, Some(operand)) => CExpr::SizeofExpr(Box::new(self.expr(operand))),
                (None, None) => {
                    self.cx.error(node.span, "sizeof operand has no resolved type");
                    CExpr::literal("0")
                }
            },
            NodeKind::SizeofExpr { expr } => CExpr::SizeofExpr(Box::new(self.expr(expr))),
            NodeKind::Cast { expr, .. } => {
                let ty = self.type_of(node);
                let value = self.expr(expr);
                CExpr::cast(ty, value)
            }
            other => {
                let what = other.name();
                self.cx.error(node.span, format!("cannot generate C for a {what}"));
                CExpr::literal("0")
            }
        }
    }

    fn var_ref(&mut self, node: &Node<'a>, path: &[&'a str]) -> CExpr {
        match self.cx.resolution.binding(node.id) {
            Some(Binding::Local) => CExpr::Var(c_ident(path.last().copied().unwrap_or_default())),
            Some(Binding::Global { package, name } | Binding::Function { package, name }) => {
                CExpr::Var(self.cx.mangle(*package, name))
            }
            Some(Binding::Foreign { name }) => CExpr::Var(name.clone()),
            None => {
                let written = path.join("::");
                self.cx.error(node.span, format!("'{written}' was not resolved"));
                CExpr::literal("0")
            }
        }
    }

    fn struct_init(&mut self, node: &Node<'a>, fields: &[FieldInit<'a>]) -> CExpr {
        let ty = self.type_of(node);
        let fields = fields
            .iter()
            .map(|init| (c_ident(init.name), self.expr(&init.value)))
            .collect();
        CExpr::Compound { ty, fields }
    }
}

/// Whether the last statement of a block already left it.
fn returns(last: Option<&Node<'_>>) -> bool {
    matches!(last.map(|n| &n.kind), Some(NodeKind::Return { .. } | NodeKind::Crash { .. }))
}

/// Template text as the inside of a C format string.
fn format_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut escaped = false;
    for c in text.chars() {
        match c {
            '%' => out.push_str("%%"),
            '"' if !escaped => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
        escaped = c == '\\' && !escaped;
    }
    out
}

fn literal_text(literal: Literal<'_>) -> String {
    match literal {
        Literal::Bool(true) => "true".into(),
        Literal::Bool(false) => "false".into(),
        Literal::Int(text) => int_literal(text),
        Literal::Float(text) => text.to_string(),
        Literal::String(text) | Literal::Chars(text) => format!("\"{text}\""),
        Literal::Char(text) => format!("'{text}'"),
    }
}

/// Leading zeros would make C read the digits as octal.
fn int_literal(text: &str) -> String {
    match text.trim_start_matches('0') {
        "" => "0".into(),
        digits => digits.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_literals_use_c_spellings() {
        assert_eq!(int_literal("42"), "42");
        assert_eq!(int_literal("017"), "17");
        assert_eq!(int_literal("0"), "0");
        assert_eq!(int_literal("000"), "0");
    }

    #[test]
    fn format_text_escapes_percent_and_quotes() {
        assert_eq!(format_text("100% \"done\""), "100%% \\\"done\\\"");
        assert_eq!(format_text("keep \\\" as is"), "keep \\\" as is");
    }

    #[test]
    fn struct_order_follows_value_embedding() {
        let deps = vec![vec![1], vec![], vec![0, 1]];
        assert_eq!(value_order(&deps), Ok(vec![1, 0, 2]));
        assert_eq!(value_order(&[vec![1], vec![0]]), Err(0));
    }
}
