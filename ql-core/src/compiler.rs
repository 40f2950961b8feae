//! Pipeline orchestration.
//!
//! [`compile`] runs every stage over a [`SourceMap`] and either returns the
//! generated C files or a [`CoreError`] holding the diagnostics that stopped
//! it. Stages that only report problems (the analyzer, package registration)
//! run together before the first check, so one run reports as much as
//! possible.

use crate::analyzer::analyze;
use crate::ast::IdGen;
use crate::codegen_c::{GeneratedFile, generate};
use crate::diagnostic::{Diagnostic, has_errors};
use crate::error::CoreError;
use crate::lexer::lex;
use crate::package::{DEFAULT_BUCKET_COUNT, PackageId, PackageTable, build_dependencies, topological_order};
use crate::parser::{ParseResult, parse_sources};
use crate::printer::print_tree;
use crate::source::SourceMap;
use crate::span::FileId;
use crate::typecheck::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// File whose first logical file is the entry package.
    pub entry: FileId,
    /// Size of the package hash table.
    pub bucket_count: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            entry: FileId(0),
            bucket_count: DEFAULT_BUCKET_COUNT,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct CompilationArtifact {
    /// Generated files in dependency order; `main.c` comes after everything
    /// it imports.
    pub files: Vec<GeneratedFile>,
    pub warnings: Vec<Diagnostic>,
}

pub fn compile(sources: &SourceMap, options: &CompileOptions) -> Result<CompilationArtifact, CoreError> {
    if sources.get(options.entry).is_none() {
        return Err(CoreError::MissingEntry);
    }
    let mut ids = IdGen::new();
    let ParseResult {
        root,
        mut diagnostics,
    } = parse_sources(sources, &mut ids);
    check(&mut diagnostics)?;

    diagnostics.extend(analyze(&root).diagnostics);
    let mut table = PackageTable::with_buckets(options.bucket_count);
    diagnostics.extend(table.register_files(&root, options.entry));
    let (graph, import_diagnostics) = build_dependencies(&mut table);
    diagnostics.extend(import_diagnostics);
    check(&mut diagnostics)?;
    if table.entry().is_none() {
        return Err(CoreError::MissingEntry);
    }

    let sourced: Vec<PackageId> = table.iter().filter(|p| p.ast.is_some()).map(|p| p.id).collect();
    let order = topological_order(&graph, &sourced).map_err(|cycle| {
        CoreError::ImportCycle(cycle.iter().map(|id| table.get(*id).path.to_string()).collect())
    })?;
    tracing::debug!(packages = order.len(), "ordered packages");

    let resolved = resolve(&table, &order, ids.node_count());
    diagnostics.extend(resolved.diagnostics);
    check(&mut diagnostics)?;

    let generated = generate(&table, &resolved.resolution);
    diagnostics.extend(generated.diagnostics);
    check(&mut diagnostics)?;

    tracing::info!(
        sources = sources.len(),
        packages = order.len(),
        files = generated.files.len(),
        warnings = diagnostics.len(),
        "compiled"
    );
    Ok(CompilationArtifact {
        files: generated.files,
        warnings: diagnostics,
    })
}

fn check(diagnostics: &mut Vec<Diagnostic>) -> Result<(), CoreError> {
    if has_errors(diagnostics) {
        return Err(CoreError::Diagnostics(std::mem::take(diagnostics)));
    }
    Ok(())
}

/// One line per token: line number, token kind, source text.
pub fn dump_tokens(sources: &SourceMap, file: FileId) -> Result<String, CoreError> {
    let source = sources.get(file).ok_or(CoreError::MissingEntry)?;
    let mut lexed = lex(file, &source.text);
    check(&mut lexed.diagnostics)?;
    let mut out = String::new();
    for token in &lexed.tokens {
        out.push_str(&format!("{}\t{}\t{}\n", token.line(), token.kind, token.text(&source.text)));
    }
    Ok(out)
}

/// The parsed tree of every source, as printed by [`print_tree`].
pub fn dump_ast(sources: &SourceMap) -> Result<String, CoreError> {
    let mut ids = IdGen::new();
    let ParseResult {
        root,
        mut diagnostics,
    } = parse_sources(sources, &mut ids);
    check(&mut diagnostics)?;
    Ok(print_tree(&root))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(texts: &[&str]) -> SourceMap {
        let mut map = SourceMap::new();
        for (i, text) in texts.iter().enumerate() {
            map.add(format!("src{i}.ql"), *text);
        }
        map
    }

    #[test]
    fn compiles_a_single_file() {
        let map = sources(&["void main() {}"]);
        let artifact = compile(&map, &CompileOptions::default()).expect("compiles");
        assert_eq!(artifact.files.len(), 1);
        assert_eq!(artifact.files[0].name, "main.c");
        assert!(artifact.warnings.is_empty());
    }

    #[test]
    fn warnings_do_not_fail_the_build() {
        let map = sources(&["void main() { int x = 1; }"]);
        let artifact = compile(&map, &CompileOptions::default()).expect("compiles");
        assert_eq!(artifact.warnings.len(), 1);
        assert_eq!(artifact.warnings[0].code, Some("W0001"));
    }

    #[test]
    fn stage_errors_are_collected() {
        let map = sources(&["import missing/pkg;\n@c_file int x;\nvoid main() {}"]);
        let err = compile(&map, &CompileOptions::default()).expect_err("fails");
        let codes: Vec<_> = err.diagnostics().iter().filter_map(|d| d.code).collect();
        assert_eq!(codes, vec!["E0203", "E0301"]);
    }

    #[test]
    fn cycles_name_the_packages() {
        let map = sources(&[
            "import a;\nvoid main() {}",
            "package a;\nimport b;",
            "package b;\nimport a;",
        ]);
        match compile(&map, &CompileOptions::default()) {
            Err(CoreError::ImportCycle(cycle)) => {
                assert_eq!(cycle, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_entry_is_reported() {
        let map = sources(&["void main() {}"]);
        let options = CompileOptions {
            entry: FileId(3),
            ..CompileOptions::default()
        };
        assert!(matches!(compile(&map, &options), Err(CoreError::MissingEntry)));
    }

    #[test]
    fn token_dump_lists_lines_and_kinds() {
        let map = sources(&["void main() {\n}"]);
        let dump = dump_tokens(&map, FileId(0)).expect("lexes");
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines[0], "1\tVOID\tvoid");
        assert_eq!(lines[4], "1\tLEFT_BRACE\t{");
        assert_eq!(lines[5], "2\tRIGHT_BRACE\t}");
    }
}
