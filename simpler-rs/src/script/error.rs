//! Failure taxonomy for a Simpler++ run.
//!
//! Every failure aborts the current run.  The engine never retries and never
//! clears its own state on the way out; the caller is expected to call
//! [`Interpreter::clear_memory`] and [`Interpreter::clear_cache`] before the
//! next run.
//!
//! [`Interpreter::clear_memory`]: super::Interpreter::clear_memory
//! [`Interpreter::clear_cache`]: super::Interpreter::clear_cache

use std::fmt;
use std::io;

use thiserror::Error;

/// What kind of name a [`ScriptError::Lookup`] failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKind {
    Variable,
    Macro,
    Label,
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LookupKind::Variable => "Variable",
            LookupKind::Macro => "Macro",
            LookupKind::Label => "Label",
        })
    }
}

/// How loudly the front end should report an error.
///
/// Both levels abort the run the same way; `Critical` only changes how the
/// failure is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Critical,
}

#[derive(Debug, Error)]
pub enum ScriptError {
    /// Malformed statement, redeclaration, invalid name or unknown operator.
    #[error("Syntax Error: {0}")]
    Syntax(String),

    /// The leading token is neither a keyword nor a bound name.
    #[error("Syntax Error: Unknown token: {0}")]
    UnknownStatement(String),

    #[error("{kind} {name} not found")]
    Lookup { kind: LookupKind, name: String },

    /// A label was traversed too often, or macro calls nested too deeply.
    #[error("Stack overflow: {what} exceeded {limit}")]
    RecursionLimit { what: String, limit: u32 },

    #[error("Arithmetic Error: {0}")]
    Arithmetic(String),

    #[error("output error: {0}")]
    Output(#[from] io::Error),

    /// External termination request observed between statements.
    #[error("terminated")]
    Terminated,
}

impl ScriptError {
    pub(crate) fn syntax(msg: impl Into<String>) -> Self {
        ScriptError::Syntax(msg.into())
    }

    pub(crate) fn missing_var(name: &str) -> Self {
        ScriptError::Lookup { kind: LookupKind::Variable, name: name.to_owned() }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ScriptError::UnknownStatement(_) | ScriptError::Terminated => Severity::Critical,
            _ => Severity::Error,
        }
    }

    /// `true` when the caller should end the whole process rather than just
    /// the current run.
    pub fn is_termination(&self) -> bool {
        matches!(self, ScriptError::Terminated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_message_names_kind() {
        let e = ScriptError::Lookup { kind: LookupKind::Macro, name: "greet".into() };
        assert_eq!(e.to_string(), "Macro greet not found");
    }

    #[test]
    fn unknown_statement_is_critical() {
        assert_eq!(ScriptError::UnknownStatement("x".into()).severity(), Severity::Critical);
        assert_eq!(ScriptError::syntax("bad").severity(), Severity::Error);
    }

    #[test]
    fn only_terminated_ends_process() {
        assert!(ScriptError::Terminated.is_termination());
        assert!(!ScriptError::missing_var("x").is_termination());
    }
}
