use ql_core::{CompileOptions, CoreError, FileId, SourceMap, compile, dump_ast};

fn sources(texts: &[(&str, &str)]) -> SourceMap {
    let mut map = SourceMap::new();
    for (name, text) in texts {
        map.add(*name, *text);
    }
    map
}

fn contents<'a>(artifact: &'a ql_core::CompilationArtifact, name: &str) -> &'a str {
    artifact
        .files
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.contents.as_str())
        .unwrap_or_else(|| panic!("missing {name}"))
}

const GEOMETRY: &str = "package app/geometry;\n\
    struct Point { int x, int y }\n\
    int dot(Point a, Point b) { return a.x * b.x + a.y * b.y; }\n";

const ENTRY: &str = "import app/geometry::*;\n\
    import libc/stdio;\n\
    void main() {\n\
        Point p = .{ .x = 1, .y = 2 };\n\
        int d = dot(p, p);\n\
        if d != 5 { crash `dot was {d}`; }\n\
        stdio::puts(\"ok\");\n\
    }\n";

const STDIO: &str = "@c_header(\"stdio.h\") package libc/stdio;\nint puts(char* s);\n";

#[test]
fn multi_package_program_compiles_to_c() {
    let map = sources(&[("main.ql", ENTRY), ("geometry.ql", GEOMETRY), ("stdio.ql", STDIO)]);
    let artifact = compile(&map, &CompileOptions::default()).expect("compiles");
    let names: Vec<_> = artifact.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["app_geometry.h", "app_geometry.c", "main.c"]);

    let header = contents(&artifact, "app_geometry.h");
    assert!(header.contains("#ifndef QL_APP_GEOMETRY_H"));
    assert!(header.contains("typedef struct app__geometry__Point app__geometry__Point;"));
    assert!(header.contains("int app__geometry__dot(app__geometry__Point a, app__geometry__Point b);"));

    let main = contents(&artifact, "main.c");
    assert!(main.contains("#include \"app_geometry.h\""));
    assert!(main.contains("#include <stdio.h>"));
    assert!(main.contains("app__geometry__Point p = (app__geometry__Point){ .x = 1, .y = 2 };"));
    assert!(main.contains("int d = app__geometry__dot(p, p);"));
    assert!(main.contains("fprintf(stderr, \"dot was %d\\n\", d);"));
    assert!(main.contains("puts(\"ok\");"));
    assert!(main.trim_end().ends_with("int main(void) {\n    main__main();\n    return 0;\n}"));
}

#[test]
fn files_may_hold_several_packages() {
    let map = sources(&[(
        "all.ql",
        "import util;\nvoid main() { util::tick(); }\n---\npackage util;\nvoid tick() {}\n",
    )]);
    let artifact = compile(&map, &CompileOptions::default()).expect("compiles");
    assert!(contents(&artifact, "util.c").contains("void util__tick(void) {"));
    assert!(contents(&artifact, "main.c").contains("util__tick();"));
}

#[test]
fn the_entry_can_be_any_file() {
    let map = sources(&[("lib.ql", "package lib;\nint one() { return 1; }"), ("app.ql", "import lib;\nvoid main() { lib::one(); }")]);
    let options = CompileOptions {
        entry: FileId(1),
        ..CompileOptions::default()
    };
    let artifact = compile(&map, &options).expect("compiles");
    assert!(contents(&artifact, "main.c").contains("lib__one();"));
}

#[test]
fn diagnostics_carry_lines() {
    let map = sources(&[("main.ql", "void main() {\n    int x = 1;\n    x = 2;\n}")]);
    let err = compile(&map, &CompileOptions::default()).expect_err("immutable");
    let errors: Vec<_> = err.diagnostics().iter().filter(|d| d.is_error()).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].line(), 3);
    assert_eq!(errors[0].to_string(), "line 3: error[E0404]: cannot assign to immutable variable 'x'");
}

#[test]
fn parse_errors_stop_before_resolution() {
    let map = sources(&[("main.ql", "void main( {}")]);
    match compile(&map, &CompileOptions::default()) {
        Err(CoreError::Diagnostics(diagnostics)) => {
            assert!(diagnostics.iter().all(|d| d.code.is_some_and(|c| c.starts_with("E01"))));
        }
        other => panic!("expected diagnostics, got {other:?}"),
    }
}

#[test]
fn ast_dump_shows_struct_init_fields_in_order() {
    let map = sources(&[("main.ql", "struct Point { int x, int y }\nvoid main() { Point p = .{ .x = 1, .y = 2 }; p; }")]);
    let dump = dump_ast(&map).expect("parses");
    let x = dump.find(".x").expect("field x");
    let y = dump.find(".y").expect("field y");
    assert!(x < y, "{dump}");
}
