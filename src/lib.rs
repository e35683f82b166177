//! ilchain - short-circuit guard compilation for a stack-machine instruction set
//!
//! # Overview
//!
//! ilchain builds method bodies for a CIL-like stack machine. Its core is a
//! guard compiler: a boolean expression made of comparisons, `&&`, `||`,
//! `%`, literals and capability calls becomes a branch sequence in which
//! every comparison is fused with the conditional jump its chain needs.
//!
//! # Quick Start
//!
//! ```
//! use bumpalo::Bump;
//! use ilchain::{CompilationOptions, HostMethods, Type, Value};
//!
//! let arena = Bump::new();
//! let guard = ilchain::compile_guard(
//!     &arena,
//!     "arg0 == 10 && arg1 != 10",
//!     &[Type::I32, Type::I32],
//!     CompilationOptions::default(),
//! )
//! .unwrap();
//!
//! let host = HostMethods::new();
//! assert!(guard.run(&host, &[Value::Int32(10), Value::Int32(1)]).unwrap());
//! assert!(!guard.run(&host, &[Value::Int32(10), Value::Int32(10)]).unwrap());
//! ```
//!
//! # Building bodies by hand
//!
//! [`MethodBody`] exposes one fluent method per instruction, plus
//! [`MethodBody::if_guard`] which compiles guard text into an if/then/else
//! block between hand-written instructions.

mod error;
mod error_renderer;

pub use error::Error;
pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};

// Re-export public API from ilchain_core
pub use ilchain_core::api::{
    CompilationOptions, CompiledGuard, ExecutionOptions, GuardContext, MethodBody, MethodSignature,
};
pub use ilchain_core::compiler::{CompileError, IfLabels, emit_if};
pub use ilchain_core::emit::{
    BranchEncoding, Code, CodeBuilder, EmitError, FieldRef, Instruction, InstructionSink,
    MethodRef, Type,
};
pub use ilchain_core::expr::{self, ExprBuilder};
pub use ilchain_core::parser::{GuardScope, ParseError, ParseErrorKind};
pub use ilchain_core::vm::{ExecutionError, HostMethods, VM, Value};

use bumpalo::Bump;

/// Compile guard text into a predicate, keeping the source for diagnostics.
pub fn compile_guard<'a>(
    arena: &'a Bump,
    source: &str,
    params: &[Type<'a>],
    options: CompilationOptions,
) -> Result<CompiledGuard<'a>, Error> {
    compile_guard_with(arena, source, params, &GuardContext::default(), options)
}

/// Like [`compile_guard`], with fields and host methods in scope.
pub fn compile_guard_with<'a>(
    arena: &'a Bump,
    source: &str,
    params: &[Type<'a>],
    context: &GuardContext<'a>,
    options: CompilationOptions,
) -> Result<CompiledGuard<'a>, Error> {
    CompiledGuard::compile_with(arena, source, params, context, options)
        .map_err(|err| Error::new(err, source))
}
