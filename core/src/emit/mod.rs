//! Instruction emission: the instruction set, the sink trait the compiler
//! writes to, and an in-memory builder that produces finished [`Code`].

mod code;
mod code_builder;
mod error;
mod instruction_set;
mod refs;
mod sink;

#[cfg(test)]
mod code_builder_test;

pub use code::Code;
pub use code_builder::{BranchEncoding, CodeBuilder};
pub use error::EmitError;
pub use instruction_set::{BranchForm, BranchOp, Instruction};
pub use refs::{ArgRef, ClassRef, FieldRef, Label, LocalRef, MethodId, MethodRef, Type};
pub use sink::InstructionSink;
