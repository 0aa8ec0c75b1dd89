//! Simpler++ scripting language.
//!
//! A Simpler++ program is a list of lines.  Each line is classified when it
//! is about to run (there is no parse tree), and blocks (`IF`, `FOR`,
//! `MACRO`) are located by scanning forward for their exact terminator line.
//!
//! - [`stmt`]: line classifier and statement records
//! - [`block`]: block materializer and the single-slot block cache
//! - [`interp`]: the execution engine
//! - [`error`]: failure taxonomy
//!
//! # Quick start
//!
//! ```rust
//! use simpler::script::{Interpreter, Program};
//!
//! let mut interp = Interpreter::new(Vec::new());
//! interp.run(&Program::parse("INT x = 6\nx *= 7\nPRINTVAR x endl")).unwrap();
//! assert_eq!(interp.output_text(), "42\n");
//! ```

pub mod block;
pub mod error;
pub mod interp;
pub mod program;
pub mod stmt;
pub mod value;

// Re-exports for convenience.
pub use error::{LookupKind, ScriptError, Severity};
pub use interp::Interpreter;
pub use program::Program;
pub use stmt::{classify, Stmt};
pub use value::Value;
