//! Guard compilation errors.

use thiserror::Error;

use crate::String;
use crate::emit::EmitError;
use crate::expr::BinaryOp;

/// Errors that abort the compilation of a guard or an if/then/else block.
///
/// Nothing is retried: the first error is returned and the instruction stream
/// being written is left incomplete.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// The guard uses an operator outside `== != < <= > >= && || %`.
    #[error("operator `{op}` is not supported in a guard")]
    UnsupportedOperator { op: BinaryOp },

    /// A call cannot be mapped onto an instruction.
    #[error("cannot compile `{callee}`: {reason}")]
    UnsupportedOperation { callee: String, reason: String },

    /// A constant carries a host value with no instruction-level form.
    #[error("unsupported operand: {description}")]
    UnsupportedOperand { description: String },

    /// A staged operand was never consumed by a capability call.
    #[error("operand `{operand}` was staged but never consumed")]
    DanglingOperand { operand: String },

    #[error("guard nesting exceeds maximum depth of {max_depth}")]
    NestingTooDeep { max_depth: usize },

    #[error(transparent)]
    Emit(#[from] EmitError),
}

impl CompileError {
    pub(crate) fn unsupported_operation(callee: impl Into<String>, reason: impl Into<String>) -> Self {
        CompileError::UnsupportedOperation {
            callee: callee.into(),
            reason: reason.into(),
        }
    }
}
