//! Package table and import ordering.
//!
//! A package is named by a slash-delimited path (`std/io`). Packages live in
//! a hash table with a fixed number of buckets; bucket 0 holds the anonymous
//! package (the entry file when it declares no package) and every other path
//! hashes into buckets `1..n`. Looking a path up creates an empty placeholder
//! when it is missing, so imports may name packages whose source has not
//! been attached yet.
//!
//! Imports form a graph between packages. [`topological_order`] visits it
//! depth first and returns dependencies before their dependents, or the
//! offending cycle.

use std::fmt;

use crate::ast::{DirectiveKind, ImportKind, Node, NodeKind, find_directive};
use crate::diagnostic::Diagnostic;
use crate::span::FileId;

pub const DEFAULT_BUCKET_COUNT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageId(pub u32);

impl PackageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PackagePath<'a> {
    pub segments: Vec<&'a str>,
}

impl<'a> PackagePath<'a> {
    pub fn new(segments: Vec<&'a str>) -> Self {
        PackagePath { segments }
    }

    pub fn is_anonymous(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path without its last segment.
    pub fn parent(&self) -> &[&'a str] {
        self.segments.split_last().map_or(&[][..], |(_, parent)| parent)
    }

    /// Last segment, which is also the name an import binds.
    pub fn leaf(&self) -> Option<&'a str> {
        self.segments.last().copied()
    }
}

impl fmt::Display for PackagePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            f.write_str("<main>")
        } else {
            f.write_str(&self.segments.join("/"))
        }
    }
}

/// FNV-1a over the bytes of every segment, root to leaf.
pub fn path_hash(segments: &[&str]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for segment in segments {
        for byte in segment.bytes() {
            hash ^= u64::from(byte);
            hash = hash.wrapping_mul(PRIME);
        }
    }
    hash
}

/// Compare the leaf segment, then the parent chain.
pub fn name_eq(a: &[&str], b: &[&str]) -> bool {
    match (a.split_last(), b.split_last()) {
        (None, None) => true,
        (Some((leaf_a, parent_a)), Some((leaf_b, parent_b))) => {
            leaf_a == leaf_b && name_eq(parent_a, parent_b)
        }
        _ => false,
    }
}

#[derive(Debug, Clone)]
pub struct Package<'a> {
    pub id: PackageId,
    pub path: PackagePath<'a>,
    /// The `File` node holding the package's source, once attached.
    pub ast: Option<&'a Node<'a>>,
    pub is_entry: bool,
    /// Header named by `@c_header`; such packages only bind existing C code.
    pub foreign_header: Option<&'a str>,
}

impl Package<'_> {
    pub fn is_foreign(&self) -> bool {
        self.foreign_header.is_some()
    }
}

#[derive(Debug)]
pub struct PackageTable<'a> {
    packages: Vec<Package<'a>>,
    buckets: Vec<Vec<PackageId>>,
}

impl Default for PackageTable<'_> {
    fn default() -> Self {
        PackageTable::new()
    }
}

impl<'a> PackageTable<'a> {
    pub fn new() -> Self {
        PackageTable::with_buckets(DEFAULT_BUCKET_COUNT)
    }

    /// A table with `count` buckets; at least two so named paths have a home.
    pub fn with_buckets(count: usize) -> Self {
        PackageTable {
            packages: Vec::new(),
            buckets: vec![Vec::new(); count.max(2)],
        }
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn bucket_of(&self, segments: &[&str]) -> usize {
        if segments.is_empty() {
            return 0;
        }
        let spread = (self.buckets.len() - 1) as u64;
        1 + (path_hash(segments) % spread) as usize
    }

    pub fn lookup(&self, segments: &[&str]) -> Option<PackageId> {
        self.buckets[self.bucket_of(segments)]
            .iter()
            .copied()
            .find(|id| name_eq(&self.packages[id.index()].path.segments, segments))
    }

    /// Fetch the package for `segments`, creating an empty one if needed.
    pub fn resolve(&mut self, segments: &[&'a str]) -> PackageId {
        if let Some(id) = self.lookup(segments) {
            return id;
        }
        let id = PackageId(self.packages.len() as u32);
        let bucket = self.bucket_of(segments);
        self.packages.push(Package {
            id,
            path: PackagePath::new(segments.to_vec()),
            ast: None,
            is_entry: false,
            foreign_header: None,
        });
        self.buckets[bucket].push(id);
        tracing::trace!(package = %self.packages[id.index()].path, bucket, "created package");
        id
    }

    pub fn get(&self, id: PackageId) -> &Package<'a> {
        &self.packages[id.index()]
    }

    pub fn get_mut(&mut self, id: PackageId) -> &mut Package<'a> {
        &mut self.packages[id.index()]
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Package<'a>> {
        self.packages.iter()
    }

    pub fn entry(&self) -> Option<&Package<'a>> {
        self.packages.iter().find(|p| p.is_entry)
    }

    /// Attach every `File` of a parsed root to its package.
    ///
    /// The first logical file of `entry` becomes the entry package and is the
    /// only one allowed to omit its package declaration.
    pub fn register_files(&mut self, root: &'a Node<'a>, entry: FileId) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let NodeKind::Root { files } = &root.kind else {
            return diagnostics;
        };
        let mut entry_seen = false;
        for file in files {
            let NodeKind::File { file: file_id, .. } = file.kind else {
                continue;
            };
            let is_entry = file_id == entry && !entry_seen;
            if is_entry {
                entry_seen = true;
            }
            let path = file.package_path().unwrap_or(&[]);
            if path.is_empty() && !is_entry {
                diagnostics.push(
                    Diagnostic::error("only the entry file may omit its package declaration", file.span)
                        .with_code("E0303"),
                );
                continue;
            }
            let id = self.resolve(path);
            let package = self.get_mut(id);
            if package.ast.is_some() {
                let message = format!("package '{}' is declared by more than one file", package.path);
                diagnostics.push(Diagnostic::error(message, file.span).with_code("E0300"));
                continue;
            }
            package.ast = Some(file);
            package.is_entry = is_entry;
            package.foreign_header = find_directive(file.package_directives(), DirectiveKind::CHeader)
                .and_then(|d| d.arg);
        }
        tracing::debug!(packages = self.len(), "registered package sources");
        diagnostics
    }
}

/// Package path an import refers to, given the importing package.
pub fn import_target<'a>(importer: &PackagePath<'a>, kind: ImportKind, segments: &[&'a str]) -> Vec<&'a str> {
    match kind {
        ImportKind::Plain | ImportKind::Root => segments.to_vec(),
        ImportKind::Local => {
            let mut path = importer.parent().to_vec();
            path.extend_from_slice(segments);
            path
        }
    }
}

/// Import edges: `edges[p]` lists the packages `p` depends on.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    edges: Vec<Vec<PackageId>>,
}

impl DependencyGraph {
    pub fn new(count: usize) -> Self {
        DependencyGraph {
            edges: vec![Vec::new(); count],
        }
    }

    pub fn add_edge(&mut self, dependent: PackageId, dependee: PackageId) {
        let index = dependent.index().max(dependee.index());
        if self.edges.len() <= index {
            self.edges.resize(index + 1, Vec::new());
        }
        let deps = &mut self.edges[dependent.index()];
        if !deps.contains(&dependee) {
            deps.push(dependee);
        }
    }

    pub fn dependencies(&self, id: PackageId) -> &[PackageId] {
        self.edges.get(id.index()).map_or(&[][..], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}

/// Build the import graph of every package that has source attached.
///
/// An import whose target has no source is reported and left out.
pub fn build_dependencies(table: &mut PackageTable<'_>) -> (DependencyGraph, Vec<Diagnostic>) {
    let mut graph = DependencyGraph::new(table.len());
    let mut diagnostics = Vec::new();
    let sourced: Vec<PackageId> = table.iter().filter(|p| p.ast.is_some()).map(|p| p.id).collect();
    for id in sourced {
        let (path, ast) = {
            let package = table.get(id);
            (package.path.clone(), package.ast)
        };
        let Some(ast) = ast else { continue };
        for decl in ast.decls() {
            let NodeKind::Import(import) = &decl.kind else {
                continue;
            };
            let target = import_target(&path, import.kind, &import.segments);
            let target_id = table.resolve(&target);
            if table.get(target_id).ast.is_none() {
                let message = format!("cannot find package '{}'", PackagePath::new(target));
                diagnostics.push(Diagnostic::error(message, decl.span).with_code("E0301"));
                continue;
            }
            tracing::trace!(from = %path, to = %table.get(target_id).path, "import edge");
            graph.add_edge(id, target_id);
        }
    }
    (graph, diagnostics)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    Unvisited,
    Visiting,
    Visited,
}

/// Order `packages` so every package follows the packages it imports.
///
/// Fails with the packages forming a cycle, first to last, when the graph is
/// not acyclic; no partial order is returned in that case.
pub fn topological_order(
    graph: &DependencyGraph,
    packages: &[PackageId],
) -> Result<Vec<PackageId>, Vec<PackageId>> {
    let count = packages
        .iter()
        .map(|id| id.index() + 1)
        .max()
        .unwrap_or(0)
        .max(graph.len());
    let mut state = vec![Visit::Unvisited; count];
    let mut order = Vec::with_capacity(packages.len());
    let mut stack = Vec::new();
    for &id in packages {
        if state[id.index()] == Visit::Unvisited {
            visit(graph, id, &mut state, &mut stack, &mut order)?;
        }
    }
    Ok(order)
}

fn visit(
    graph: &DependencyGraph,
    id: PackageId,
    state: &mut [Visit],
    stack: &mut Vec<PackageId>,
    order: &mut Vec<PackageId>,
) -> Result<(), Vec<PackageId>> {
    state[id.index()] = Visit::Visiting;
    stack.push(id);
    for &dep in graph.dependencies(id) {
        match state[dep.index()] {
            Visit::Visiting => {
                let start = stack.iter().position(|&p| p == dep).unwrap_or(0);
                return Err(stack[start..].to_vec());
            }
            Visit::Unvisited => visit(graph, dep, state, stack, order)?,
            Visit::Visited => {}
        }
    }
    stack.pop();
    state[id.index()] = Visit::Visited;
    order.push(id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IdGen;
    use crate::parser::parse_sources;
    use crate::source::SourceMap;

    fn ids(table: &PackageTable<'_>, names: &[&str]) -> Vec<PackageId> {
        names
            .iter()
            .map(|name| {
                let segments: Vec<&str> = name.split('/').collect();
                table.lookup(&segments).expect("package exists")
            })
            .collect()
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut table = PackageTable::new();
        let a = table.resolve(&["std", "io"]);
        let b = table.resolve(&["std", "io"]);
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
        assert!(table.get(a).ast.is_none());
    }

    #[test]
    fn anonymous_path_lives_in_bucket_zero() {
        let table = PackageTable::with_buckets(8);
        assert_eq!(table.bucket_of(&[]), 0);
        for path in [&["a"][..], &["a", "b"][..], &["zz", "top"][..]] {
            assert!((1..8).contains(&table.bucket_of(path)));
        }
    }

    #[test]
    fn shared_bucket_does_not_imply_equality() {
        let mut table = PackageTable::with_buckets(2);
        let ab = table.resolve(&["a", "b"]);
        let ba = table.resolve(&["b", "a"]);
        assert_eq!(table.bucket_of(&["a", "b"]), table.bucket_of(&["b", "a"]));
        assert_ne!(ab, ba);
        assert!(!name_eq(&["a", "b"], &["b", "a"]));
        assert!(!name_eq(&["a"], &["x", "a"]));
        assert!(name_eq(&["x", "a"], &["x", "a"]));
    }

    #[test]
    fn local_imports_are_relative_to_the_importer_directory() {
        let importer = PackagePath::new(vec!["app", "net", "http"]);
        assert_eq!(import_target(&importer, ImportKind::Local, &["tls"]), vec!["app", "net", "tls"]);
        assert_eq!(import_target(&importer, ImportKind::Root, &["std", "io"]), vec!["std", "io"]);
    }

    fn build(sources: &[&str]) -> (SourceMap, IdGen) {
        let mut map = SourceMap::new();
        for (i, text) in sources.iter().enumerate() {
            map.add(format!("file{i}.ql"), *text);
        }
        (map, IdGen::new())
    }

    #[test]
    fn import_cycle_is_reported() {
        let (map, mut id_gen) = build(&["package a;\nimport b;", "package b;\nimport a;"]);
        let parsed = parse_sources(&map, &mut id_gen);
        let mut table = PackageTable::new();
        assert!(table.register_files(&parsed.root, FileId(9)).is_empty());
        let (graph, diagnostics) = build_dependencies(&mut table);
        assert!(diagnostics.is_empty());
        let all: Vec<_> = table.iter().map(|p| p.id).collect();
        let cycle = topological_order(&graph, &all).expect_err("cycle");
        assert_eq!(cycle.len(), 2);
    }

    #[test]
    fn dependencies_come_first() {
        let (map, mut id_gen) = build(&[
            "import app/util;\nimport std/io;\nvoid main() {}",
            "package app/util;\nimport ./log;\nimport std/io;",
            "package app/log;\nimport std/io;",
            "package std/io;",
        ]);
        let parsed = parse_sources(&map, &mut id_gen);
        let mut table = PackageTable::new();
        assert!(table.register_files(&parsed.root, FileId(0)).is_empty());
        let (graph, diagnostics) = build_dependencies(&mut table);
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let all: Vec<_> = table.iter().map(|p| p.id).collect();
        let order = topological_order(&graph, &all).expect("acyclic");
        let expected = ids(&table, &["std/io", "app/log", "app/util"]);
        assert_eq!(&order[..3], &expected[..]);
        assert!(table.get(order[3]).is_entry);
    }

    #[test]
    fn missing_import_target_is_an_error() {
        let (map, mut id_gen) = build(&["import nowhere;\nvoid main() {}"]);
        let parsed = parse_sources(&map, &mut id_gen);
        let mut table = PackageTable::new();
        table.register_files(&parsed.root, FileId(0));
        let (_, diagnostics) = build_dependencies(&mut table);
        assert_eq!(diagnostics[0].code, Some("E0301"));
    }

    #[test]
    fn duplicate_package_sources_are_rejected() {
        let (map, mut id_gen) = build(&["package a;", "package a;", "int x;"]);
        let parsed = parse_sources(&map, &mut id_gen);
        let mut table = PackageTable::new();
        let diagnostics = table.register_files(&parsed.root, FileId(0));
        let codes: Vec<_> = diagnostics.iter().filter_map(|d| d.code).collect();
        assert_eq!(codes, vec!["E0300", "E0303"]);
    }

    #[test]
    fn foreign_header_is_recorded() {
        let (map, mut id_gen) = build(&["@c_header(\"stdio.h\") package libc/stdio;"]);
        let parsed = parse_sources(&map, &mut id_gen);
        let mut table = PackageTable::new();
        table.register_files(&parsed.root, FileId(7));
        let id = table.lookup(&["libc", "stdio"]).expect("registered");
        assert_eq!(table.get(id).foreign_header, Some("stdio.h"));
    }
}
