use thiserror::Error;

use crate::diagnostic::{Diagnostic, Severity};

#[derive(Debug, Error)]
pub enum CoreError {
    /// Every diagnostic of the failed compilation, warnings included.
    #[error("compilation failed with {} error(s)", count_errors(.0))]
    Diagnostics(Vec<Diagnostic>),
    #[error("import cycle: {}", .0.join(" -> "))]
    ImportCycle(Vec<String>),
    #[error("the entry file is not part of the compilation")]
    MissingEntry,
    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Diagnostics carried by the error, if any.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            CoreError::Diagnostics(diagnostics) => diagnostics,
            _ => &[],
        }
    }
}

fn count_errors(diagnostics: &[Diagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count()
}
