//! Spectree error handling.
//!
//! Errors that surface synchronously to callers live here, following the
//! unified `thiserror` + `miette` diagnostic idiom. The abort signal raised
//! by `fail_now`/`skip_now`-style calls is deliberately NOT a variant of this
//! enum: it unwinds the current unit of execution as a panic payload and is
//! handled by [`crate::abort`], never by error propagation.

use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced by the variable store and the runner.
#[derive(Error, Diagnostic, Debug)]
pub enum SpecError {
    /// A variable was read that no enclosing scope declares.
    ///
    /// This is a programmer error in the test specification itself and is
    /// always fatal to the leaf that triggered it.
    #[error("undeclared variable `{name}`")]
    #[diagnostic(
        code(spectree::var::undeclared),
        help("declare it on a scope with `var`, or bind it at runtime with `T::set_var`")
    )]
    UndeclaredVariable { name: String },

    /// A run summary could not be serialized to JSON.
    #[error("failed to serialize run summary")]
    #[diagnostic(code(spectree::run::summary_json))]
    SummaryJson(#[from] serde_json::Error),
}

impl SpecError {
    pub fn undeclared_variable(name: impl Into<String>) -> Self {
        SpecError::UndeclaredVariable { name: name.into() }
    }
}
