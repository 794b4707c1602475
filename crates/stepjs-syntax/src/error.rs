//! Errors produced while reading source into the syntax tree.

/// Error that can occur when reading source code into the syntax tree.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("syntax error at line {line}")]
    Syntax { line: usize },

    #[error("line {line}: unsupported syntax: {what}")]
    Unsupported { line: usize, what: String },

    #[error("line {line}: {node} missing {field}")]
    MissingField {
        line: usize,
        node: &'static str,
        field: &'static str,
    },
}
