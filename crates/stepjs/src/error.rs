//! Compile errors.

use std::fmt;
use stepjs_syntax::ReadError;

/// Which family of construct stopped compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructKind {
    ChainedComparison,
    NonLiteralResource,
    Comprehension,
    ExceptionHandlers,
    Membership,
    /// A suspending call where the emitted code cannot `await`.
    SuspendInSyncContext,
    Subscript,
    KeywordArguments,
    Decorator,
    ResourceBlock,
    LoopElse,
    LibraryArity,
    Statement,
    Expression,
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstructKind::ChainedComparison => "chained comparison",
            ConstructKind::NonLiteralResource => "non-literal resource name",
            ConstructKind::Comprehension => "comprehension",
            ConstructKind::ExceptionHandlers => "exception handlers",
            ConstructKind::Membership => "membership test",
            ConstructKind::SuspendInSyncContext => "suspending call in synchronous code",
            ConstructKind::Subscript => "subscript",
            ConstructKind::KeywordArguments => "keyword arguments",
            ConstructKind::Decorator => "decorator",
            ConstructKind::ResourceBlock => "with block",
            ConstructKind::LoopElse => "loop else clause",
            ConstructKind::LibraryArity => "library call arity",
            ConstructKind::Statement => "statement",
            ConstructKind::Expression => "expression",
        };
        f.write_str(name)
    }
}

/// A construct outside the supported dialect. Compilation stops at the first one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: unsupported {kind}: {construct}")]
pub struct UnsupportedConstructError {
    pub kind: ConstructKind,
    pub construct: String,
    pub line: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedConstructError),
}

impl CompileError {
    pub fn unsupported(kind: ConstructKind, construct: impl Into<String>, line: usize) -> Self {
        CompileError::Unsupported(UnsupportedConstructError {
            kind,
            construct: construct.into(),
            line,
        })
    }

    /// The unsupported construct, if that is what failed.
    pub fn as_unsupported(&self) -> Option<&UnsupportedConstructError> {
        match self {
            CompileError::Unsupported(err) => Some(err),
            CompileError::Read(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_construct_and_line() {
        let err = CompileError::unsupported(ConstructKind::ChainedComparison, "a < b < c", 7);
        assert_eq!(
            err.to_string(),
            "line 7: unsupported chained comparison: a < b < c"
        );
        assert_eq!(
            err.as_unsupported().map(|e| e.kind),
            Some(ConstructKind::ChainedComparison)
        );
    }
}
