//! Structural verifier.
//!
//! Checks the invariants the grammar cannot express: where package
//! declarations and file separators may appear, and which directives are
//! legal on which node or type. Every violation becomes a diagnostic; the
//! walk always covers the whole tree.

use std::collections::HashSet;

use crate::ast::{Directive, DirectiveKind, Literal, Node, NodeKind, Type, TypeKind};
use crate::diagnostic::Diagnostic;

#[derive(Debug, Default)]
pub struct AnalysisResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl AnalysisResult {
    pub fn has_errors(&self) -> bool {
        crate::diagnostic::has_errors(&self.diagnostics)
    }
}

/// Verify a `Root` (or a single `File`) node.
pub fn analyze(root: &Node<'_>) -> AnalysisResult {
    let mut analyzer = Analyzer::default();
    match &root.kind {
        NodeKind::Root { files } => {
            for file in files {
                analyzer.file(file);
            }
        }
        NodeKind::File { .. } => analyzer.file(root),
        _ => analyzer.node(root),
    }
    tracing::debug!(errors = analyzer.diagnostics.len(), "analyzed tree");
    AnalysisResult {
        diagnostics: analyzer.diagnostics,
    }
}

#[derive(Default)]
struct Analyzer {
    diagnostics: Vec<Diagnostic>,
}

impl Analyzer {
    fn error(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    fn file(&mut self, file: &Node<'_>) {
        let mut seen_package = false;
        let mut seen_separator = false;
        let decls = file.decls();
        for (index, decl) in decls.iter().enumerate() {
            match decl.kind {
                NodeKind::FileSeparator => {
                    if seen_separator {
                        self.error(
                            Diagnostic::error("a file may contain only one file separator", decl.span)
                                .with_code("E0202"),
                        );
                    } else if index != 0 {
                        self.error(
                            Diagnostic::error("a file separator must start a file", decl.span)
                                .with_code("E0202"),
                        );
                    }
                    seen_separator = true;
                }
                NodeKind::PackageDecl { .. } => {
                    if seen_package {
                        self.error(
                            Diagnostic::error("a file may declare only one package", decl.span)
                                .with_code("E0201"),
                        );
                    } else {
                        let after_separator =
                            index == 1 && matches!(decls[0].kind, NodeKind::FileSeparator);
                        if index != 0 && !after_separator {
                            self.error(
                                Diagnostic::error(
                                    "the package declaration must be the first declaration of a file",
                                    decl.span,
                                )
                                .with_code("E0200"),
                            );
                        }
                    }
                    seen_package = true;
                }
                _ => {}
            }
            self.node(decl);
        }
    }

    /// Check directives on `node`, its written types and every descendant.
    fn node(&mut self, node: &Node<'_>) {
        node.walk(&mut |n| {
            self.directives(&n.directives, |kind| node_allows(kind, n), n.kind.name());
            for ty in n.types() {
                self.ty(ty);
            }
        });
    }

    fn ty(&mut self, ty: &Type<'_>) {
        self.directives(&ty.directives, |kind| type_allows(kind, ty), "type");
        for child in ty.children() {
            self.ty(child);
        }
    }

    fn directives(
        &mut self,
        directives: &[Directive<'_>],
        allowed: impl Fn(DirectiveKind) -> bool,
        target: &str,
    ) {
        let mut seen = HashSet::new();
        for directive in directives {
            if !seen.insert(directive.kind) {
                self.error(
                    Diagnostic::error(
                        format!("duplicate directive {}", directive.kind.name()),
                        directive.span,
                    )
                    .with_code("E0204"),
                );
            } else if !allowed(directive.kind) {
                self.error(
                    Diagnostic::error(
                        format!("directive {} is not allowed on a {target}", directive.kind.name()),
                        directive.span,
                    )
                    .with_code("E0203"),
                );
            }
        }
    }
}

fn node_allows(kind: DirectiveKind, node: &Node<'_>) -> bool {
    match kind {
        DirectiveKind::CHeader => matches!(node.kind, NodeKind::PackageDecl { .. }),
        DirectiveKind::CFile => matches!(node.kind, NodeKind::Typedef { .. }),
        DirectiveKind::Unused => matches!(
            node.kind,
            NodeKind::VarDecl(_) | NodeKind::Function { .. } | NodeKind::FunctionHeader(_)
        ),
        DirectiveKind::Extern => {
            matches!(node.kind, NodeKind::FunctionHeader(_) | NodeKind::VarDecl(_))
        }
        DirectiveKind::CStr => matches!(
            node.kind,
            NodeKind::Literal(Literal::String(_) | Literal::Chars(_))
        ),
        DirectiveKind::StackBuf => matches!(node.kind, NodeKind::TemplateString { .. }),
        DirectiveKind::RangeUsize => matches!(node.kind, NodeKind::Range { .. }),
        DirectiveKind::Restrict => false,
    }
}

fn type_allows(kind: DirectiveKind, ty: &Type<'_>) -> bool {
    match kind {
        DirectiveKind::Restrict => matches!(ty.kind, TypeKind::Pointer(_) | TypeKind::MutPointer(_)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IdGen;
    use crate::parser::parse_source;
    use crate::span::FileId;

    fn codes(source: &str) -> Vec<&'static str> {
        let mut ids = IdGen::new();
        let parsed = parse_source(FileId(0), source, &mut ids);
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics);
        analyze(&parsed.root)
            .diagnostics
            .iter()
            .filter_map(|d| d.code)
            .collect()
    }

    #[test]
    fn accepts_well_formed_file() {
        let source = "@c_header(\"stdio.h\") package libc/stdio;\n\
                      @c_file typedef FILE;\n\
                      @extern int puts(@restrict char* s);\n\
                      @unused void f() { foreach i in @range_usize 0..3 { } let s = @cstr \"x\"; }";
        assert!(codes(source).is_empty());
    }

    #[test]
    fn package_after_separator_is_allowed() {
        assert!(codes("int x;\n---\npackage b;\nint y;").is_empty());
    }

    #[test]
    fn package_must_come_first() {
        assert_eq!(codes("import std/io;\npackage app;"), vec!["E0200"]);
    }

    #[test]
    fn only_one_package_per_file() {
        assert_eq!(codes("package a;\npackage b;"), vec!["E0201"]);
    }

    #[test]
    fn restrict_is_only_legal_on_pointers() {
        assert_eq!(codes("@restrict int x;"), vec!["E0203"]);
        assert_eq!(codes("void f(@restrict int x) {}"), vec!["E0203"]);
        assert!(codes("void f(@restrict int* mut* p) {}").is_empty());
    }

    #[test]
    fn literal_directives_check_the_literal_kind() {
        assert_eq!(codes("void f() { let x = @cstr 4; }"), vec!["E0203"]);
        assert_eq!(codes("void f() { let x = @stack_buf \"plain\"; }"), vec!["E0203"]);
    }

    #[test]
    fn duplicate_directives_are_rejected() {
        assert_eq!(codes("@unused @unused int x;"), vec!["E0204"]);
    }

    #[test]
    fn nested_statements_are_checked() {
        assert_eq!(codes("void f() { if true { @c_file int y; } }"), vec!["E0203"]);
    }
}
