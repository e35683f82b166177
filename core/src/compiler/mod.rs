//! Guard compiler for if/then/else blocks.
//!
//! This module translates a boolean guard tree into short-circuiting
//! stack-machine code written to any [`InstructionSink`](crate::emit::InstructionSink).
//!
//! ## Design
//!
//! - Recursive descent with an explicit [`ShortCircuit`] context per node
//! - Comparisons fuse with the branch their context needs (`ble`, `bne.un`, ...)
//! - Mixed `&&`/`||` nesting gets an intermediate skip label
//! - Capability calls map onto single primitives through an operand queue
//! - The harness normalizes the outcome into a `bool` local

mod condition;
mod dispatch;
mod error;
mod harness;
mod stager;

#[cfg(test)]
mod dispatch_test;
#[cfg(test)]
mod harness_test;

pub use condition::{Exits, GuardCompiler, ShortCircuit};
pub use error::CompileError;
pub use harness::{emit_if, IfLabels};
pub use stager::{push_literal, stage_carried, Operand, OperandQueue};
