//! Runtime errors raised while executing finished code.

use thiserror::Error;

use crate::String;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// An instruction received operands of the wrong kind.
    #[error("type mismatch in `{instruction}`: {found}")]
    TypeMismatch { instruction: String, found: String },

    #[error("division by zero")]
    DivideByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("no host implementation registered for method `{name}`")]
    MissingHostMethod { name: String },

    /// A host method returned a value when none was declared, or vice versa.
    #[error("host method `{name}` returned an unexpected result")]
    BadHostReturn { name: String },

    #[error("argument {index} out of range (method has {count})")]
    ArgumentOutOfRange { index: u16, count: usize },

    #[error("local {index} out of range (method declares {count})")]
    LocalOutOfRange { index: u16, count: usize },

    #[error("field {index} out of range (object has {count})")]
    FieldOutOfRange { index: u16, count: usize },

    #[error("stack underflow at instruction {at}")]
    StackUnderflow { at: usize },

    /// Control ran past the last instruction without `ret`.
    #[error("execution fell off the end of the method")]
    FellOffEnd,

    #[error("execution exceeded {max_steps} steps")]
    StepLimitExceeded { max_steps: usize },
}
