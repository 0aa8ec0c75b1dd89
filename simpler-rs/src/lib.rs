//! Simpler++: a line-oriented statement interpreter.
//!
//! The core lives in [`script`] with its stores in [`var`], [`macros`] and
//! [`label`].  [`console`], [`files`], [`config`], [`cli`] and [`logging`]
//! make up the `simpler` front end.

pub mod cli;
pub mod config;
pub mod console;
pub mod files;
pub mod label;
pub mod logging;
pub mod macros;
pub mod script;
pub mod var;
