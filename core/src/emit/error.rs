//! Instruction emission errors.

use thiserror::Error;

use super::refs::Label;

/// Errors raised while appending to or finishing an instruction stream.
///
/// Any of these leaves the stream unusable; callers abort the body being built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmitError {
    /// Label was not created by this builder.
    #[error("label {label} was not defined by this builder")]
    UnknownLabel { label: Label },

    #[error("label {label} is marked more than once")]
    LabelAlreadyMarked { label: Label },

    /// A branch targets a label that was never marked.
    #[error("label {label} is branched to but never marked")]
    UnmarkedLabel { label: Label },

    #[error("stack underflow at instruction {at}: needs {needed}, has {depth}")]
    StackUnderflow {
        at: usize,
        needed: u16,
        depth: usize,
    },

    /// Two paths reach the same label with different stack depths.
    #[error("stack depth mismatch at {label}: expected {expected}, found {found}")]
    StackMismatch {
        label: Label,
        expected: usize,
        found: usize,
    },

    /// A short branch was forced but its displacement does not fit in an i8.
    #[error("branch at instruction {at} to {label} needs {displacement} bytes (short form holds -128..=127)")]
    BranchOutOfRange {
        at: usize,
        label: Label,
        displacement: i64,
    },

    #[error("too many local variables (limit: 65536)")]
    TooManyLocals,
}
