//! Errors surfaced by the method-body and guard APIs.

use thiserror::Error;

use crate::String;
use crate::compiler::CompileError;
use crate::emit::EmitError;
use crate::parser::ParseError;
use crate::vm::ExecutionError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Guard text could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The guard or body could not be compiled.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Runtime error while executing the finished code.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("unknown type `{keyword}`")]
    UnknownType { keyword: String },

    /// The body names an argument its signature does not declare.
    #[error("argument {index} is not declared (method takes {count})")]
    NoSuchArgument { index: u16, count: usize },

    #[error("expected {expected} arguments, got {found}")]
    ArgumentCount { expected: usize, found: usize },

    #[error("argument {index}: cannot read `{text}` as `{ty}`")]
    InvalidArgument {
        index: usize,
        text: String,
        ty: String,
    },

    /// The guard method finished without producing a bool.
    #[error("guard returned no value")]
    NoResult,
}

impl From<EmitError> for Error {
    fn from(err: EmitError) -> Self {
        Error::Compile(CompileError::Emit(err))
    }
}
