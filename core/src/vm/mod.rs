//! Reference interpreter for finished [`Code`](crate::emit::Code).
//!
//! Executes the instruction set with CIL semantics so compiled guards can be
//! checked against their intended truth values.

mod error;
mod host;
mod runtime;
mod stack;
mod value;


pub use error::ExecutionError;
pub use host::{HostFn, HostMethods};
pub use runtime::VM;
pub use value::Value;
