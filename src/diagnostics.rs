/// Error taxonomy and recoverable diagnostics.
///
/// Fatal errors abort the run; everything else is collected as a
/// `Diagnostic` on the interpreter context and the walk continues with a
/// placeholder value.
use serde::Serialize;
use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A file-agnostic observation produced by the value/scope models. The
/// interpreter stamps it with the current file and position.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub severity: Severity,
    pub message: String,
}

impl Note {
    pub fn info(message: impl Into<String>) -> Note {
        Note {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Note {
        Note {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// A recoverable diagnostic with its origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub file: Option<String>,
    pub span: Option<Span>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.file, &self.span) {
            (Some(file), Some(span)) => write!(f, "{}:{}: {}", file, span, self.message),
            (Some(file), None) => write!(f, "{}: {}", file, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

/// Fatal conditions. These signal either corrupt input (duplicate ids),
/// interpreter/scope desync (`this` assignment, stray `return`, stack
/// underflow) or a blown resource budget, and abort the whole run.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("duplicate module id '{0}'")]
    DuplicateModule(String),

    #[error("{file}:{span}: cannot assign to 'this'")]
    AssignToThis { file: String, span: Span },

    #[error("{file}:{span}: 'return' outside a function scope")]
    ReturnOutsideFunction { file: String, span: Span },

    #[error("recursion budget of {0} exceeded")]
    BudgetExceeded(usize),

    #[error("no source available for module '{0}'")]
    MissingSource(String),

    #[error("attempt to restore an environment state that does not exist")]
    StateUnderflow,

    #[error("there is no scope above the global scope")]
    ScopeUnderflow,
}
