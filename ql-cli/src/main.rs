use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use ql_core::{CompileOptions, CoreError, Diagnostic, FileId, Severity, SourceMap, compile, dump_ast, dump_tokens};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

mod paths;

/// Compile Quill sources to C.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Source files or directories (directories are searched for `*.ql`)
    #[arg(required = true, value_name = "PATH")]
    inputs: Vec<PathBuf>,

    #[arg(long = "main", value_name = "FILE", help = "Entry file (defaults to the first input)")]
    entry: Option<PathBuf>,

    #[arg(short, long, value_name = "DIR", default_value = "build")]
    out_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = Emit::C, help = "Output format")]
    emit: Emit,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Raise the log level (repeatable)")]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Emit {
    C,
    Tokens,
    Ast,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when running under a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn execute(cli: Cli) -> Result<()> {
    let mut files = discover(&cli.inputs)?;
    let entry = match &cli.entry {
        Some(path) => {
            let wanted = paths::normalize(&path.to_string_lossy());
            match files.iter().position(|f| paths::normalize(&f.to_string_lossy()) == wanted) {
                Some(index) => index,
                None => {
                    files.push(path.clone());
                    files.len() - 1
                }
            }
        }
        None => 0,
    };
    if files.is_empty() {
        bail!("no .ql sources found");
    }

    let mut sources = SourceMap::new();
    for file in &files {
        let text = fs::read_to_string(file).with_context(|| format!("failed to read input file {}", file.display()))?;
        sources.add(paths::normalize(&file.to_string_lossy()), text);
    }
    let entry = FileId(entry as u32);
    tracing::debug!(files = sources.len(), entry = ?entry, "loaded sources");

    match cli.emit {
        Emit::Tokens => print!("{}", checked(&sources, dump_tokens(&sources, entry))?),
        Emit::Ast => print!("{}", checked(&sources, dump_ast(&sources))?),
        Emit::C => {
            let options = CompileOptions {
                entry,
                ..CompileOptions::default()
            };
            let artifact = checked(&sources, compile(&sources, &options))?;
            report(&sources, &artifact.warnings);
            write_outputs(&cli.out_dir, &artifact.files)?;
        }
    }
    Ok(())
}

/// Print the diagnostics of a failed stage before turning it into an error.
fn checked<T>(sources: &SourceMap, result: Result<T, CoreError>) -> Result<T> {
    match result {
        Ok(value) => Ok(value),
        Err(err) => {
            report(sources, err.diagnostics());
            Err(err.into())
        }
    }
}

/// Expand directories into their `*.ql` files, sorted by path.
fn discover(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if !input.is_dir() {
            files.push(input.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry.with_context(|| format!("failed to walk {}", input.display()))?;
            if entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "ql") {
                found.push(entry.into_path());
            }
        }
        files.extend(found);
    }
    Ok(files)
}

fn write_outputs(out_dir: &Path, files: &[ql_core::GeneratedFile]) -> Result<()> {
    fs::create_dir_all(out_dir).with_context(|| format!("failed to create directory {}", out_dir.display()))?;
    for file in files {
        let path = out_dir.join(&file.name);
        fs::write(&path, &file.contents).with_context(|| format!("failed to write output file {}", path.display()))?;
        tracing::info!(path = %path.display(), "wrote");
    }
    Ok(())
}

fn report(sources: &SourceMap, diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{}", render(sources, diagnostic));
    }
}

fn render(sources: &SourceMap, diagnostic: &Diagnostic) -> String {
    let file = sources.get(diagnostic.span.file).map(|f| f.name.as_str()).unwrap_or("<unknown>");
    let level = match diagnostic.severity {
        Severity::Error => "error",
        Severity::Warning => "warning",
    };
    let code = diagnostic.code.map(|c| format!("[{c}]")).unwrap_or_default();
    format!("{file}:{}: {level}{code}: {}", diagnostic.line(), diagnostic.message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::tempdir;

    #[test]
    fn compiles_a_directory_into_c_files() {
        let dir = tempdir().expect("tempdir");
        let src = dir.path().join("src");
        fs::create_dir_all(&src).expect("create src");
        fs::write(src.join("main.ql"), "import util;\nvoid main() { util::tick(); }\n").expect("write main");
        fs::write(src.join("util.ql"), "package util;\nvoid tick() {}\n").expect("write util");
        let out = dir.path().join("out");

        Command::cargo_bin("ql-cli")
            .expect("binary exists")
            .arg(&src)
            .arg("--out-dir")
            .arg(&out)
            .assert()
            .success();

        let main = fs::read_to_string(out.join("main.c")).expect("read main.c");
        assert!(main.contains("util__tick();"));
        assert!(out.join("util.h").exists(), "header was not created");
        assert!(out.join("util.c").exists(), "source was not created");
    }

    #[test]
    fn the_main_flag_picks_the_entry() {
        let dir = tempdir().expect("tempdir");
        let lib = dir.path().join("lib.ql");
        let app = dir.path().join("app.ql");
        fs::write(&lib, "package lib;\nint one() { return 1; }\n").expect("write lib");
        fs::write(&app, "import lib;\nvoid main() { lib::one(); }\n").expect("write app");
        let out = dir.path().join("build");

        Command::cargo_bin("ql-cli")
            .expect("binary exists")
            .arg(&lib)
            .arg("--main")
            .arg(&app)
            .arg("-o")
            .arg(&out)
            .assert()
            .success();

        assert!(out.join("lib.c").exists());
        assert!(out.join("main.c").exists());
    }

    #[test]
    fn emits_tokens() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("main.ql");
        fs::write(&input, "void main() {}").expect("write input");

        Command::cargo_bin("ql-cli")
            .expect("binary exists")
            .arg(&input)
            .arg("--emit")
            .arg("tokens")
            .assert()
            .success()
            .stdout(predicate::str::contains("1\tVOID\tvoid"));
    }

    #[test]
    fn reports_diagnostics_with_file_and_line() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("main.ql");
        fs::write(&input, "void main() {\n    int x = 1;\n    x = 2;\n}\n").expect("write input");

        Command::cargo_bin("ql-cli")
            .expect("binary exists")
            .arg(&input)
            .arg("-o")
            .arg(dir.path().join("build"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("main.ql:3: error[E0404]"));
    }

    #[test]
    fn reports_missing_input() {
        let dir = tempdir().expect("tempdir");

        Command::cargo_bin("ql-cli")
            .expect("binary exists")
            .arg(dir.path().join("missing.ql"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed to read input file"));
    }

    #[test]
    fn renders_warnings_with_their_level() {
        let mut sources = SourceMap::new();
        let id = sources.add("./main.ql", "void main() {}");
        let span = ql_core::span::Span {
            file: id,
            start: 0,
            end: 4,
            line: 1,
        };
        let warning = Diagnostic::warning("unused variable 'x'", span).with_code("W0001");
        assert_eq!(render(&sources, &warning), "./main.ql:1: warning[W0001]: unused variable 'x'");
    }
}
