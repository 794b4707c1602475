//! Syntax front end for the stepjs compiler.
//!
//! `stepjs-syntax` reads the Python teaching dialect into a closed syntax
//! tree. The tree keeps only what the compiler translates; anything outside
//! the dialect is rejected here with a [`ReadError`] naming the construct.
//!
//! # Example
//!
//! ```ignore
//! use stepjs_syntax::{read_python, StmtKind};
//!
//! let module = read_python("x = len(items)")?;
//! assert!(matches!(module.body[0].kind, StmtKind::Assign { .. }));
//! ```

pub mod ast;
pub mod error;
pub mod python;
mod unparse;

pub use ast::{
    Alias, BinOp, BoolOp, ClassDef, CmpOp, ComprehensionKind, Constant, ExceptHandler, Expr,
    FStringPart, FunctionDef, Generator, Keyword, Module, Param, ParamKind, Stmt, StmtKind,
    UnaryOp, WithItem,
};
pub use error::ReadError;
pub use python::read_python;
