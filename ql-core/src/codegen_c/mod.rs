//! C code generation.
//!
//! Packages are emitted in dependency order. Every named package becomes a
//! header (`std_io.h`, guarded by `QL_STD_IO_H`) holding its includes,
//! types, `extern` globals and prototypes, plus a source file holding the
//! definitions. The entry package becomes a single `main.c` that ends with
//! the C `main`, which calls the program's own `main` once. Packages bound
//! to a C header with `@c_header` produce no files; importers include the
//! header instead.
//!
//! Package-level names are mangled as `segments__name` (`std__io__print`);
//! the entry package uses the prefix `main`. Foreign and `@extern` names
//! keep their spelling. A generic struct instance is named after its
//! declaration and instance version (`main__Box__0`) and wrapped in include
//! guards, since every package using it defines it.

mod emit;
mod ir;
mod lower;

use crate::diagnostic::Diagnostic;
use crate::package::{PackagePath, PackageTable};
use crate::typecheck::Resolution;

use ir::{CExpr, CItem, CStmt, CType};
use lower::{Lowering, Stages};

pub use emit::emit;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// File name relative to the output directory.
    pub name: String,
    pub contents: String,
}

#[derive(Debug, Default)]
pub struct CodegenResult {
    pub files: Vec<GeneratedFile>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CodegenResult {
    pub fn has_errors(&self) -> bool {
        crate::diagnostic::has_errors(&self.diagnostics)
    }
}

/// Generate C for every package in `resolution.order`.
pub fn generate(table: &PackageTable<'_>, resolution: &Resolution<'_>) -> CodegenResult {
    let mut lowering = Lowering::new(table, resolution);
    let mut files = Vec::new();
    for &id in &resolution.order {
        let package = table.get(id);
        let Some(ast) = package.ast else { continue };
        if package.is_foreign() {
            tracing::trace!(package = %package.path, "skipping foreign package");
            continue;
        }
        let stages = lowering.lower_package(package, ast);
        if package.is_entry {
            let entry_main = lowering.mangle(id, "main");
            files.push(GeneratedFile {
                name: "main.c".to_string(),
                contents: emit(&entry_items(stages, entry_main)),
            });
        } else {
            let stem = file_stem(&package.path);
            let (header, source) = split(stages, &stem);
            files.push(GeneratedFile {
                name: format!("{stem}.h"),
                contents: emit(&header),
            });
            files.push(GeneratedFile {
                name: format!("{stem}.c"),
                contents: emit(&source),
            });
        }
    }
    tracing::debug!(
        files = files.len(),
        errors = lowering.diagnostics.len(),
        "generated C"
    );
    CodegenResult {
        files,
        diagnostics: lowering.diagnostics,
    }
}

/// Base name of a package's files: segments joined by `_`.
pub fn file_stem(path: &PackagePath<'_>) -> String {
    if path.is_anonymous() {
        "main".to_string()
    } else {
        path.segments.join("_")
    }
}

pub fn mangle(path: &PackagePath<'_>, name: &str) -> String {
    if path.is_anonymous() {
        format!("main__{name}")
    } else {
        format!("{}__{name}", path.segments.join("__"))
    }
}

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else", "enum",
    "extern", "float", "for", "goto", "if", "inline", "int", "long", "register", "restrict",
    "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef", "union",
    "unsigned", "void", "volatile", "while", "bool", "true", "false", "main",
];

/// A local name that cannot clash with C keywords.
pub fn c_ident(name: &str) -> String {
    if C_KEYWORDS.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

fn split(stages: Stages, stem: &str) -> (Vec<CItem>, Vec<CItem>) {
    let guard = format!("QL_{}_H", stem.to_ascii_uppercase());
    let mut header = vec![CItem::IfNotDef(guard.clone()), CItem::Define(guard)];
    header.extend(stages.includes);
    header.extend(stages.types);
    header.extend(stages.var_decls);
    header.extend(stages.prototypes);
    header.push(CItem::EndIf);

    let mut source = vec![CItem::Include {
        path: format!("{stem}.h"),
        system: false,
    }];
    source.extend(stages.var_defs);
    source.extend(stages.bodies);
    (header, source)
}

fn entry_items(stages: Stages, entry_main: String) -> Vec<CItem> {
    let mut items = stages.includes;
    items.extend(stages.types);
    items.extend(stages.var_defs);
    items.extend(stages.prototypes);
    items.extend(stages.bodies);
    items.push(CItem::Function {
        ret: CType::named("int"),
        name: "main".to_string(),
        params: Vec::new(),
        body: vec![
            CStmt::Expr(CExpr::call(entry_main, Vec::new())),
            CStmt::Return(Some(CExpr::literal("0"))),
        ],
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IdGen;
    use crate::package::{build_dependencies, topological_order};
    use crate::parser::parse_sources;
    use crate::source::SourceMap;
    use crate::span::FileId;
    use crate::typecheck::resolve;

    fn generate_sources(sources: &[&str]) -> CodegenResult {
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
        let resolved = resolve(&table, &order, ids.node_count());
        assert!(!resolved.has_errors(), "{:?}", resolved.diagnostics);
        generate(&table, &resolved.resolution)
    }

    fn file<'r>(result: &'r CodegenResult, name: &str) -> &'r str {
        result
            .files
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.contents.as_str())
            .unwrap_or_else(|| panic!("no file {name}"))
    }

    fn position(text: &str, needle: &str) -> usize {
        text.find(needle)
            .unwrap_or_else(|| panic!("{needle:?} not found in:\n{text}"))
    }

    #[test]
    fn prototypes_precede_bodies_and_main_runs_once() {
        let result = generate_sources(&["void main() { add(1, 2); }\nint add(int a, int b) { return a + b; }"]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.files.len(), 1);
        let text = file(&result, "main.c");
        assert!(position(text, "int main__add(int a, int b);") < position(text, "int main__add(int a, int b) {"));
        assert!(position(text, "void main__main(void);") < position(text, "void main__main(void) {"));
        assert!(text.contains("    return a + b;\n"));
        assert!(text.contains("int main(void) {\n    main__main();\n    return 0;\n}"));
        assert_eq!(text.matches("main__main();").count(), 1);
        assert!(text.starts_with("#include <stdint.h>\n#include <stdbool.h>\n"));
    }

    #[test]
    fn named_packages_get_a_header_and_a_source() {
        let result = generate_sources(&[
            "import std/io;\nvoid main() { io::print(\"hi\"); }",
            "package std/io;\nvoid print(char* s) { s; }",
        ]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let names: Vec<_> = result.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["std_io.h", "std_io.c", "main.c"]);
        let header = file(&result, "std_io.h");
        assert!(header.starts_with("#ifndef QL_STD_IO_H\n#define QL_STD_IO_H\n"));
        assert!(header.contains("void std__io__print(char* s);"));
        assert!(header.trim_end().ends_with("#endif"));
        let source = file(&result, "std_io.c");
        assert!(source.starts_with("#include \"std_io.h\"\n"));
        assert!(source.contains("void std__io__print(char* s) {"));
        let main = file(&result, "main.c");
        assert!(main.contains("#include \"std_io.h\""));
        assert!(main.contains("std__io__print(\"hi\");"));
    }

    #[test]
    fn foreign_packages_are_included_not_generated() {
        let result = generate_sources(&[
            "import libc/stdio;\nvoid main() { stdio::puts(\"hi\"); }",
            "@c_header(\"stdio.h\") package libc/stdio;\nint puts(char* s);",
        ]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.files.len(), 1);
        let main = file(&result, "main.c");
        assert!(main.contains("#include <stdio.h>"));
        assert!(main.contains("    puts(\"hi\");"));
    }

    #[test]
    fn structs_follow_the_structs_they_embed() {
        let result = generate_sources(&[
            "struct Line { Point a, Point b }\nstruct Point { int x, int y }\nvoid main() {}",
        ]);
        let text = file(&result, "main.c");
        assert!(text.contains("typedef struct main__Line main__Line;"));
        assert!(position(text, "struct main__Point {") < position(text, "struct main__Line {"));
        assert!(text.contains("    main__Point a;\n"));
    }

    #[test]
    fn generic_instances_are_guarded() {
        let result = generate_sources(&[
            "struct Box<T> { T value }\nvoid main() { Box<int> b = .{ .value = 1 }; b; }",
        ]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let text = file(&result, "main.c");
        assert!(text.contains("#ifndef QL_INSTANCE_main__Box__0\n#define QL_INSTANCE_main__Box__0\nstruct main__Box__0 {\n    int value;\n};\n#endif"));
        assert!(!text.contains("struct main__Box {"));
        assert!(text.contains("main__Box__0 b = (main__Box__0){ .value = 1 };"));
    }

    #[test]
    fn defers_run_before_every_exit() {
        let result = generate_sources(&[
            "int f(bool early) { defer g(); if early { return 1; } g(); return 2; }\n\
             void g() {}\n\
             void main() { f(true); }",
        ]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let text = file(&result, "main.c");
        assert!(text.contains("int __ql_ret_0 = 1;\n            main__g();\n            return __ql_ret_0;"));
        assert_eq!(text.matches("main__g();").count(), 3);
    }

    #[test]
    fn crash_messages_become_fprintf() {
        let result = generate_sources(&["void main() { i64 n = 3; crash `bad {n}%`; }"]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let text = file(&result, "main.c");
        assert!(text.contains("#include <stdio.h>\n#include <stdlib.h>\n"));
        assert!(text.contains("fprintf(stderr, \"bad %lld%%\\n\", (long long)n);\n    abort();"));
    }

    #[test]
    fn crash_arguments_are_converted_to_what_printf_reads() {
        let result = generate_sources(&["void main() { u32 a = 1; f32 b = 0.5; int c = 2; crash `{a} {b} {c}`; }"]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let text = file(&result, "main.c");
        assert!(text.contains("\"%u %f %d\\n\", (unsigned int)a, (double)b, c);"));
    }

    #[test]
    fn ranges_become_counting_loops() {
        let result = generate_sources(&["void main() { int mut total = 0; foreach i in 0..=3 { total += i; } }"]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let text = file(&result, "main.c");
        assert!(text.contains("int __ql_end_0 = 3;"));
        assert!(text.contains("for (int i = 0; i <= __ql_end_0; i++) {"));
        assert!(text.contains("total += i;"));
    }

    #[test]
    fn globals_split_between_header_and_source() {
        let result = generate_sources(&[
            "import lib;\nvoid main() { lib::count = 1; }",
            "package lib;\nint mut count = 0;\nstatic int hidden = 1;\n@extern int errno_value;",
        ]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let header = file(&result, "lib.h");
        assert!(header.contains("extern int lib__count;"));
        assert!(header.contains("extern int errno_value;"));
        assert!(!header.contains("hidden"));
        let source = file(&result, "lib.c");
        assert!(source.contains("int lib__count = 0;"));
        assert!(source.contains("static int lib__hidden = 1;"));
        assert!(file(&result, "main.c").contains("lib__count = 1;"));
    }

    #[test]
    fn array_initializers_outside_declarations_are_rejected() {
        let result = generate_sources(&["void main() { int[2] mut a = [2]{ 1, 2 }; a = [2]{ 3, 4 }; }"]);
        let codes: Vec<_> = result.diagnostics.iter().filter_map(|d| d.code).collect();
        assert_eq!(codes, vec!["E0500"]);
    }

    #[test]
    fn sizeof_lowers_variables_as_expressions() {
        let result = generate_sources(&[
            "struct Point { int x, int y }
             void main() { int x = 1; int[3] a = [3]{ 1, 2, 3 };              uptr s = sizeof(x); uptr t = sizeof(a[0]); uptr u = sizeof(Point); s; t; u; }",
        ]);
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let text = file(&result, "main.c");
        assert!(text.contains(" = sizeof(x);"));
        assert!(text.contains(" = sizeof(a[0]);"));
        assert!(text.contains(" = sizeof(main__Point);"));
    }

    #[test]
    fn keywords_are_renamed() {
        assert_eq!(c_ident("int"), "int_");
        assert_eq!(c_ident("count"), "count");
    }
}
