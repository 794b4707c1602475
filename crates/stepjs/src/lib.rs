//! Compile the Python teaching dialect to steppable JavaScript.
//!
//! `stepjs` turns a synchronous teaching program into an ES module where
//! every call into the program's own code is awaited, so a host widget can
//! pause at `breakpoint(...)` hooks and single-step the algorithm.
//!
//! # Architecture
//!
//! ```text
//! source ─> stepjs_syntax::read_python ─> Module
//!                                           │
//!             classify (ours names, files) ─┤
//!             scope (hoisted lets)         ─┤
//!             stmt / expr (Translator)     ─┤─> tables, emit
//!                                           v
//!                                     CompiledModule { code, files }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use stepjs::{compile_source, CompileOptions, Context};
//!
//! let mut ctx = Context::new();
//! let out = compile_source("def f(x):\n    return g(x)\n", &mut ctx, &CompileOptions::default())?;
//! // async function f(x) {
//! //   return g(x);
//! // }
//! // export { f };
//! ```
//!
//! Calls to declarations the unit defines (or that were pre-registered on the
//! [`Context`]) are awaited; library calls go through the declaration tables
//! and are emitted synchronously unless the entry is marked as suspending.

mod classify;
pub mod config;
mod context;
pub mod emit;
mod error;
mod expr;
pub mod hints;
mod module;
mod scope;
mod stmt;
pub mod tables;
mod visit;

pub use classify::classify;
pub use config::{ConfigError, StepConfig};
pub use context::Context;
pub use error::{CompileError, ConstructKind, UnsupportedConstructError};
pub use hints::{Hints, HintsError};
pub use module::{CompileOptions, CompiledModule, compile_module, compile_source};

pub use stepjs_syntax::{Module, ReadError, read_python};
