//! Stage one of type resolution: package-level declarations.
//!
//! Packages are visited in dependency order, so by the time a package is
//! processed every package it imports already has its symbols. Within a
//! package, struct names and typedefs are registered first and struct
//! fields, function signatures and global variables second, so declarations
//! may refer to each other regardless of source order.

use std::collections::HashMap;

use crate::ast::{DirectiveKind, Node, NodeId, NodeKind, Type, TypeKind, find_directive};
use crate::diagnostic::Diagnostic;
use crate::package::{PackageId, PackageTable, import_target};
use crate::span::Span;
use crate::types::{Instances, ResolvedType, StructId, StructInfo, StructTable};

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    Struct(StructId),
    /// A typedef stands for the type it names; opaque ones for themselves.
    Typedef(ResolvedType),
    /// Always a `ResolvedType::Function`.
    Function(ResolvedType),
    Var { ty: ResolvedType, mutable: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol<'a> {
    pub name: &'a str,
    pub package: PackageId,
    pub node: NodeId,
    pub span: Span,
    pub kind: SymbolKind,
    /// Defined outside the generated code (`@extern` or a `@c_header`
    /// package); referenced by its plain C name.
    pub foreign: bool,
}

/// Everything a package declares or imports.
#[derive(Debug, Default)]
pub struct PackageScope<'a> {
    pub symbols: HashMap<&'a str, Symbol<'a>>,
    /// `import std/io;` binds `io`.
    pub namespaces: HashMap<&'a str, PackageId>,
    /// `import std/io::print;` binds `print` to a symbol of `std/io`.
    pub explicit: HashMap<&'a str, PackageId>,
    /// `import std/io::*;`, in import order.
    pub wildcards: Vec<PackageId>,
    /// Generic struct instances this package uses, in first-use order.
    pub instances: Vec<(StructId, u32)>,
}

/// What a global name refers to.
#[derive(Debug, Clone, Copy)]
pub enum Found<'g, 'a> {
    Symbol(&'g Symbol<'a>),
    Namespace(PackageId),
}

/// Generic parameters in scope while resolving a struct's field types.
#[derive(Debug, Clone, Copy)]
pub struct GenericParams<'x> {
    pub owner: NodeId,
    pub names: &'x [&'x str],
}

/// Package scopes plus the tables shared by all packages.
#[derive(Debug, Default)]
pub struct Globals<'a> {
    pub scopes: Vec<PackageScope<'a>>,
    pub structs: StructTable,
    pub instances: Instances,
}

impl<'a> Globals<'a> {
    pub fn new(package_count: usize) -> Self {
        Globals {
            scopes: (0..package_count).map(|_| PackageScope::default()).collect(),
            structs: StructTable::new(),
            instances: Instances::new(),
        }
    }

    pub fn scope(&self, package: PackageId) -> &PackageScope<'a> {
        &self.scopes[package.index()]
    }

    /// Look up a global name or a `namespace::name` path as seen from
    /// `from`: the package's own declarations, then explicitly imported
    /// symbols, then wildcard imports in order, then namespaces.
    pub fn lookup(&self, from: PackageId, path: &[&str]) -> Result<Found<'_, 'a>, String> {
        let scope = self.scope(from);
        match path {
            [name] => {
                if let Some(symbol) = scope.symbols.get(*name) {
                    return Ok(Found::Symbol(symbol));
                }
                if let Some(package) = scope.explicit.get(*name) {
                    return self
                        .scope(*package)
                        .symbols
                        .get(*name)
                        .map(Found::Symbol)
                        .ok_or_else(|| format!("imported name '{name}' is not declared"));
                }
                for package in &scope.wildcards {
                    if let Some(symbol) = self.scope(*package).symbols.get(*name) {
                        return Ok(Found::Symbol(symbol));
                    }
                }
                if let Some(package) = scope.namespaces.get(*name) {
                    return Ok(Found::Namespace(*package));
                }
                Err(format!("cannot find '{name}' in this scope"))
            }
            [namespace, name] => {
                let Some(package) = scope.namespaces.get(*namespace) else {
                    return Err(format!("'{namespace}' is not an imported package"));
                };
                self.scope(*package)
                    .symbols
                    .get(*name)
                    .map(Found::Symbol)
                    .ok_or_else(|| format!("package '{namespace}' has no member '{name}'"))
            }
            _ => Err(format!("cannot resolve path '{}'", path.join("::"))),
        }
    }

    /// Resolve a written type as seen from `package`.
    ///
    /// Reports a diagnostic and returns `None` when the type cannot be
    /// resolved. Concrete generic instances are recorded for `package`.
    pub fn resolve_type(
        &mut self,
        package: PackageId,
        generics: Option<GenericParams<'_>>,
        ty: &Type<'_>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedType> {
        let unsupported = |what: &str| {
            Diagnostic::error(format!("{what} types are not supported yet"), ty.span)
                .with_code("E0407")
        };
        match &ty.kind {
            TypeKind::Void => Some(ResolvedType::Void),
            TypeKind::Scalar(scalar) => Some(ResolvedType::Scalar(*scalar)),
            TypeKind::Pointer(inner) => self
                .resolve_type(package, generics, inner, diagnostics)
                .map(ResolvedType::pointer),
            TypeKind::MutPointer(inner) => self
                .resolve_type(package, generics, inner, diagnostics)
                .map(ResolvedType::mut_pointer),
            TypeKind::Array { elem, len } => {
                let elem = self.resolve_type(package, generics, elem, diagnostics)?;
                let len = match len {
                    None => None,
                    Some(text) => match parse_int(text) {
                        Some(len) => Some(len),
                        None => {
                            diagnostics.push(
                                Diagnostic::error(
                                    format!("array length '{text}' must be an integer literal"),
                                    ty.span,
                                )
                                .with_code("E0407"),
                            );
                            return None;
                        }
                    },
                };
                Some(ResolvedType::Array {
                    elem: Box::new(elem),
                    len,
                })
            }
            TypeKind::Named { path, generics: args } => {
                self.resolve_named(package, generics, ty, path, args, diagnostics)
            }
            TypeKind::Slice(_) => {
                diagnostics.push(unsupported("slice"));
                None
            }
            TypeKind::Optional(_) => {
                diagnostics.push(unsupported("optional"));
                None
            }
            TypeKind::Result { .. } => {
                diagnostics.push(unsupported("result"));
                None
            }
            TypeKind::Tuple(_) => {
                diagnostics.push(unsupported("tuple"));
                None
            }
        }
    }

    fn resolve_named(
        &mut self,
        package: PackageId,
        generics: Option<GenericParams<'_>>,
        ty: &Type<'_>,
        path: &[&str],
        args: &[Type<'_>],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<ResolvedType> {
        if let (Some(params), [name]) = (generics, path) {
            if let Some(index) = params.names.iter().position(|p| p == name) {
                return Some(ResolvedType::Generic {
                    name: (*name).to_string(),
                    index: index as u32,
                    owner: params.owner,
                });
            }
        }
        let kind = match self.lookup(package, path) {
            Ok(Found::Symbol(symbol)) => symbol.kind.clone(),
            Ok(Found::Namespace(_)) => {
                diagnostics.push(
                    Diagnostic::error(format!("'{}' is a package, not a type", path.join("::")), ty.span)
                        .with_code("E0400"),
                );
                return None;
            }
            Err(message) => {
                diagnostics.push(Diagnostic::error(message, ty.span).with_code("E0400"));
                return None;
            }
        };
        match kind {
            SymbolKind::Typedef(resolved) if args.is_empty() => Some(resolved),
            SymbolKind::Struct(id) => {
                let expected = self.structs.get(id).generics.len();
                if args.len() != expected {
                    let name = self.structs.get(id).name.clone();
                    diagnostics.push(
                        Diagnostic::error(
                            format!(
                                "struct '{name}' takes {expected} type argument(s) but {} were given",
                                args.len()
                            ),
                            ty.span,
                        )
                        .with_code("E0401"),
                    );
                    return None;
                }
                if args.is_empty() {
                    return Some(ResolvedType::StructDecl(id));
                }
                let mut resolved = Vec::with_capacity(args.len());
                for arg in args {
                    resolved.push(self.resolve_type(package, generics, arg, diagnostics)?);
                }
                let impl_version = if resolved.iter().any(ResolvedType::has_generics) {
                    0
                } else {
                    let version = self.instances.instantiate(id, resolved.clone());
                    let used = &mut self.scopes[package.index()].instances;
                    if !used.contains(&(id, version)) {
                        used.push((id, version));
                    }
                    version
                };
                Some(ResolvedType::StructRef {
                    decl: id,
                    args: resolved,
                    impl_version,
                })
            }
            _ => {
                diagnostics.push(
                    Diagnostic::error(format!("'{}' is not a type", path.join("::")), ty.span)
                        .with_code("E0400"),
                );
                None
            }
        }
    }

    fn declare(&mut self, symbol: Symbol<'a>, diagnostics: &mut Vec<Diagnostic>) -> bool {
        let scope = &mut self.scopes[symbol.package.index()];
        if scope.symbols.contains_key(symbol.name) {
            diagnostics.push(
                Diagnostic::error(format!("'{}' is already declared in this package", symbol.name), symbol.span)
                    .with_code("E0405"),
            );
            return false;
        }
        scope.symbols.insert(symbol.name, symbol);
        true
    }
}

/// Integer literal text; the lexer only produces decimal digits.
pub fn parse_int(text: &str) -> Option<u64> {
    text.parse().ok()
}

/// Run stage one over `order` (dependencies first).
pub fn resolve_globals<'a>(table: &PackageTable<'a>, order: &[PackageId]) -> (Globals<'a>, Vec<Diagnostic>) {
    let mut globals = Globals::new(table.len());
    let mut diagnostics = Vec::new();
    for &id in order {
        let package = table.get(id);
        let Some(ast) = package.ast else { continue };
        let foreign = package.is_foreign();
        collect_imports(&mut globals, table, id, ast, &mut diagnostics);
        declare_types(&mut globals, id, ast, foreign, &mut diagnostics);
        declare_values(&mut globals, id, ast, foreign, &mut diagnostics);
        reject_value_cycles(&mut globals, id, ast, &mut diagnostics);
        tracing::trace!(
            package = %package.path,
            symbols = globals.scope(id).symbols.len(),
            "declared package symbols"
        );
    }
    tracing::debug!(
        structs = globals.structs.len(),
        instances = globals.instances.len(),
        "resolved package declarations"
    );
    (globals, diagnostics)
}

/// Drop and report fields that hold their own struct by value through
/// other structs, arrays or generic instances.
fn reject_value_cycles<'a>(
    globals: &mut Globals<'a>,
    id: PackageId,
    ast: &'a Node<'a>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for decl in ast.decls() {
        let NodeKind::StructDecl(info) = &decl.kind else {
            continue;
        };
        let Some(SymbolKind::Struct(struct_id)) =
            globals.scope(id).symbols.get(info.name).map(|s| s.kind.clone())
        else {
            continue;
        };
        if globals.structs.get(struct_id).node != decl.id {
            continue;
        }
        let fields = globals.structs.get(struct_id).fields.clone();
        let mut kept = Vec::with_capacity(fields.len());
        for (name, ty) in fields {
            if embeds(&globals.structs, &ty, struct_id, &mut Vec::new()) {
                let span = info
                    .fields
                    .iter()
                    .find(|field| field.name == name)
                    .map_or(decl.span, |field| field.span);
                diagnostics.push(
                    Diagnostic::error(
                        format!("struct '{}' contains itself by value through field '{name}'", info.name),
                        span,
                    )
                    .with_code("E0407"),
                );
                continue;
            }
            kept.push((name, ty));
        }
        globals.structs.get_mut(struct_id).fields = kept;
    }
}

/// Whether a value of `ty` stores `target` inline. `path` holds the
/// declarations being expanded; a repeat there is some other struct's cycle.
fn embeds(structs: &StructTable, ty: &ResolvedType, target: StructId, path: &mut Vec<StructId>) -> bool {
    let (decl, args) = match ty {
        ResolvedType::Array { elem, .. } => return embeds(structs, elem, target, path),
        ResolvedType::StructDecl(decl) => (*decl, &[][..]),
        ResolvedType::StructRef { decl, args, .. } => (*decl, args.as_slice()),
        _ => return false,
    };
    if decl == target {
        return true;
    }
    if path.contains(&decl) {
        return false;
    }
    path.push(decl);
    let info = structs.get(decl);
    let found = info
        .fields
        .iter()
        .any(|(_, field)| embeds(structs, &field.substitute(info.node, args), target, path));
    path.pop();
    found
}

fn collect_imports<'a>(
    globals: &mut Globals<'a>,
    table: &PackageTable<'a>,
    id: PackageId,
    ast: &'a Node<'a>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let path = &table.get(id).path;
    for decl in ast.decls() {
        let NodeKind::Import(import) = &decl.kind else {
            continue;
        };
        let target = import_target(path, import.kind, &import.segments);
        // Missing targets were already reported while building the graph.
        let Some(target) = table.lookup(&target) else {
            continue;
        };
        let scope = &mut globals.scopes[id.index()];
        match (import.symbols.as_slice(), import.wildcard) {
            (_, true) if import.symbols.is_empty() => scope.wildcards.push(target),
            ([], false) => {
                if let Some(leaf) = import.segments.last() {
                    scope.namespaces.insert(*leaf, target);
                }
            }
            ([symbol], false) => {
                scope.explicit.insert(*symbol, target);
            }
            _ => diagnostics.push(
                Diagnostic::error("nested symbol imports are not supported yet", decl.span)
                    .with_code("E0407"),
            ),
        }
    }
}

/// Struct shells and typedefs.
fn declare_types<'a>(
    globals: &mut Globals<'a>,
    id: PackageId,
    ast: &'a Node<'a>,
    foreign: bool,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for decl in ast.decls() {
        match &decl.kind {
            NodeKind::StructDecl(info) => {
                let struct_id = globals.structs.add(StructInfo {
                    name: info.name.to_string(),
                    package: id,
                    node: decl.id,
                    generics: info.generics.iter().map(|g| g.to_string()).collect(),
                    fields: Vec::new(),
                });
                globals.declare(
                    Symbol {
                        name: info.name,
                        package: id,
                        node: decl.id,
                        span: decl.span,
                        kind: SymbolKind::Struct(struct_id),
                        foreign,
                    },
                    diagnostics,
                );
            }
            NodeKind::Typedef { name, ty: None } => {
                let c_file = find_directive(&decl.directives, DirectiveKind::CFile).is_some();
                let resolved = ResolvedType::Opaque {
                    name: if c_file { "FILE".to_string() } else { name.to_string() },
                    package: id,
                    native: foreign || c_file,
                };
                globals.declare(
                    Symbol {
                        name: *name,
                        package: id,
                        node: decl.id,
                        span: decl.span,
                        kind: SymbolKind::Typedef(resolved),
                        foreign,
                    },
                    diagnostics,
                );
            }
            _ => {}
        }
    }
    // Aliases in source order, so an alias may name an earlier one.
    for decl in ast.decls() {
        let NodeKind::Typedef { name, ty: Some(ty) } = &decl.kind else {
            continue;
        };
        let Some(resolved) = globals.resolve_type(id, None, ty, diagnostics) else {
            continue;
        };
        globals.declare(
            Symbol {
                name: *name,
                package: id,
                node: decl.id,
                span: decl.span,
                kind: SymbolKind::Typedef(resolved),
                foreign,
            },
            diagnostics,
        );
    }
}

/// Struct fields, function signatures and global variables.
fn declare_values<'a>(
    globals: &mut Globals<'a>,
    id: PackageId,
    ast: &'a Node<'a>,
    foreign: bool,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for decl in ast.decls() {
        match &decl.kind {
            NodeKind::StructDecl(info) => {
                let Some(SymbolKind::Struct(struct_id)) =
                    globals.scope(id).symbols.get(info.name).map(|s| s.kind.clone())
                else {
                    continue;
                };
                if globals.structs.get(struct_id).node != decl.id {
                    continue;
                }
                let params = GenericParams {
                    owner: decl.id,
                    names: &info.generics,
                };
                let mut fields: Vec<(String, ResolvedType)> = Vec::new();
                for field in &info.fields {
                    if fields.iter().any(|(n, _)| n == field.name) {
                        diagnostics.push(
                            Diagnostic::error(format!("duplicate field '{}'", field.name), field.span)
                                .with_code("E0405"),
                        );
                        continue;
                    }
                    if let Some(ty) = globals.resolve_type(id, Some(params), &field.ty, diagnostics) {
                        if matches!(ty, ResolvedType::StructDecl(inner) if inner == struct_id) {
                            diagnostics.push(
                                Diagnostic::error(
                                    format!("struct '{}' cannot contain itself by value", info.name),
                                    field.span,
                                )
                                .with_code("E0407"),
                            );
                            continue;
                        }
                        fields.push((field.name.to_string(), ty));
                    }
                }
                globals.structs.get_mut(struct_id).fields = fields;
            }
            NodeKind::FunctionHeader(sig) | NodeKind::Function { sig, .. } => {
                let mut params = Vec::with_capacity(sig.params.len());
                let mut complete = true;
                for param in &sig.params {
                    match globals.resolve_type(id, None, &param.ty, diagnostics) {
                        Some(ty) => params.push(ty),
                        None => complete = false,
                    }
                }
                let ret = globals.resolve_type(id, None, &sig.ret, diagnostics);
                let (Some(ret), true) = (ret, complete) else {
                    continue;
                };
                let fn_ty = ResolvedType::Function {
                    params,
                    ret: Box::new(ret),
                };
                let is_extern = find_directive(&decl.directives, DirectiveKind::Extern).is_some();
                let is_body = matches!(decl.kind, NodeKind::Function { .. });
                if let Some(existing) = globals.scopes[id.index()].symbols.get_mut(sig.name) {
                    // A prototype and its definition share one symbol.
                    let matches_prototype = existing.kind == SymbolKind::Function(fn_ty.clone());
                    let existing_is_header = existing_is_header(ast, existing.node);
                    if matches_prototype && (existing_is_header || !is_body) {
                        if is_body {
                            existing.node = decl.id;
                            existing.span = decl.span;
                        }
                        continue;
                    }
                    diagnostics.push(
                        Diagnostic::error(format!("'{}' is already declared in this package", sig.name), decl.span)
                            .with_code("E0405"),
                    );
                    continue;
                }
                globals.declare(
                    Symbol {
                        name: sig.name,
                        package: id,
                        node: decl.id,
                        span: decl.span,
                        kind: SymbolKind::Function(fn_ty),
                        foreign: foreign || is_extern,
                    },
                    diagnostics,
                );
            }
            NodeKind::VarDecl(var) => {
                let Some(written) = &var.ty else {
                    diagnostics.push(
                        Diagnostic::error(
                            format!("global '{}' needs an explicit type", var.name),
                            decl.span,
                        )
                        .with_code("E0408"),
                    );
                    continue;
                };
                let Some(ty) = globals.resolve_type(id, None, written, diagnostics) else {
                    continue;
                };
                let is_extern = find_directive(&decl.directives, DirectiveKind::Extern).is_some();
                globals.declare(
                    Symbol {
                        name: var.name,
                        package: id,
                        node: decl.id,
                        span: decl.span,
                        kind: SymbolKind::Var {
                            ty,
                            mutable: var.mutable,
                        },
                        foreign: foreign || is_extern,
                    },
                    diagnostics,
                );
            }
            _ => {}
        }
    }
}

fn existing_is_header(ast: &Node<'_>, node: NodeId) -> bool {
    ast.decls()
        .iter()
        .any(|d| d.id == node && matches!(d.kind, NodeKind::FunctionHeader(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IdGen;
    use crate::package::{build_dependencies, topological_order};
    use crate::parser::parse_sources;
    use crate::source::SourceMap;
    use crate::span::FileId;

    fn with_globals(sources: &[&str], check: impl FnOnce(&PackageTable<'_>, &Globals<'_>, &[Diagnostic])) {
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
        let (globals, diagnostics) = resolve_globals(&table, &order);
        check(&table, &globals, &diagnostics);
    }

    fn entry(table: &PackageTable<'_>) -> PackageId {
        table.entry().expect("entry").id
    }

    #[test]
    fn declarations_may_refer_forward() {
        with_globals(
            &["Node* head;\nstruct Node { int value, Node* next }\ntypedef Link = Node*;\nLink first(Link l);"],
            |table, globals, diagnostics| {
                assert!(diagnostics.is_empty(), "{diagnostics:?}");
                let Ok(Found::Symbol(symbol)) = globals.lookup(entry(table), &["first"]) else {
                    panic!("first is declared");
                };
                let SymbolKind::Function(ResolvedType::Function { params, .. }) = &symbol.kind else {
                    panic!("first is a function");
                };
                assert!(matches!(&params[0], ResolvedType::Pointer(inner) if inner.is_struct()));
            },
        );
    }

    #[test]
    fn imports_bind_namespaces_symbols_and_wildcards() {
        with_globals(
            &[
                "import std/io;\nimport std/mem::copy;\nimport std/str::*;\nvoid main() {}",
                "package std/io;\nvoid print(char* s);",
                "package std/mem;\nvoid copy(u8* d, u8* s, uptr n);",
                "package std/str;\nuptr len(char* s);",
            ],
            |table, globals, diagnostics| {
                assert!(diagnostics.is_empty(), "{diagnostics:?}");
                let main = entry(table);
                assert!(matches!(globals.lookup(main, &["io", "print"]), Ok(Found::Symbol(_))));
                assert!(matches!(globals.lookup(main, &["copy"]), Ok(Found::Symbol(_))));
                assert!(matches!(globals.lookup(main, &["len"]), Ok(Found::Symbol(_))));
                assert!(matches!(globals.lookup(main, &["io"]), Ok(Found::Namespace(_))));
                assert!(globals.lookup(main, &["print"]).is_err());
            },
        );
    }

    #[test]
    fn generic_instances_are_recorded_for_the_user() {
        with_globals(
            &[
                "import box;\nbox::Box<int> a;\nbox::Box<u8> b;\nbox::Box<int> c;\nvoid main() {}",
                "package box;\nstruct Box<T> { T value, Box<T>* next }",
            ],
            |table, globals, diagnostics| {
                assert!(diagnostics.is_empty(), "{diagnostics:?}");
                let used = &globals.scope(entry(table)).instances;
                assert_eq!(used.len(), 2);
                let box_pkg = table.lookup(&["box"]).expect("box");
                assert!(globals.scope(box_pkg).instances.is_empty());
                let (_, info) = globals.structs.iter().next().expect("struct");
                assert!(matches!(info.fields[0].1, ResolvedType::Generic { index: 0, .. }));
            },
        );
    }

    #[test]
    fn resolution_errors_are_reported() {
        with_globals(
            &["Missing m;\nint? maybe;\nstruct S { int a, int a }\nint dup;\nint dup;\nint[n] arr;"],
            |_, _, diagnostics| {
                let codes: Vec<_> = diagnostics.iter().filter_map(|d| d.code).collect();
                assert_eq!(codes, vec!["E0400", "E0407", "E0405", "E0405", "E0407"]);
            },
        );
    }

    #[test]
    fn structs_cannot_hold_each_other_by_value() {
        with_globals(
            &["struct A { int n, B b }
struct B { A[2] pair }
               struct Wrap<T> { T inner }
struct C { Wrap<C> w }
               struct List { int n, List* next, Wrap<List*> boxed }
void main() {}"],
            |table, globals, diagnostics| {
                let messages: Vec<_> = diagnostics.iter().map(|d| (d.code, d.message.as_str())).collect();
                assert_eq!(
                    messages,
                    vec![
                        (Some("E0407"), "struct 'A' contains itself by value through field 'b'"),
                        (Some("E0407"), "struct 'C' contains itself by value through field 'w'"),
                    ]
                );
                let Ok(Found::Symbol(symbol)) = globals.lookup(entry(table), &["A"]) else {
                    panic!("A is declared");
                };
                let SymbolKind::Struct(a) = symbol.kind else {
                    panic!("A is a struct");
                };
                assert_eq!(globals.structs.get(a).fields.len(), 1);
            },
        );
    }

    #[test]
    fn prototype_and_definition_share_a_symbol() {
        with_globals(
            &["int add(int a, int b);\nint add(int a, int b) { return a + b; }\nvoid main() {}"],
            |table, globals, diagnostics| {
                assert!(diagnostics.is_empty(), "{diagnostics:?}");
                let Ok(Found::Symbol(symbol)) = globals.lookup(entry(table), &["add"]) else {
                    panic!("add is declared");
                };
                let ast = table.entry().and_then(|p| p.ast).expect("ast");
                assert_eq!(symbol.node, ast.decls()[1].id);
            },
        );
    }

    #[test]
    fn integer_literals_are_decimal() {
        assert_eq!(parse_int("42"), Some(42));
        assert_eq!(parse_int("007"), Some(7));
        assert_eq!(parse_int("n"), None);
    }
}
