//! Public API: options, method signatures, the fluent method-body builder,
//! and compiled guard predicates.
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use ilchain_core::api::{CompilationOptions, MethodBody, MethodSignature};
//! use ilchain_core::emit::Type;
//!
//! let arena = Bump::new();
//! let signature = MethodSignature::new(&[Type::I32, Type::I32], Type::I32);
//! let mut body = MethodBody::new(signature, CompilationOptions::default());
//! body.if_guard(
//!     &arena,
//!     "arg0 == 10 && arg1 != 10",
//!     |then| {
//!         then.ldc_i4(1).ret();
//!     },
//!     |otherwise| {
//!         otherwise.ldc_i4(0).ret();
//!     },
//! );
//! let code = body.finish().unwrap();
//! println!("{:?}", code);
//! ```

pub mod error;
pub mod guard;
pub mod method_body;
pub mod options;
pub mod signature;

#[cfg(test)]
mod method_body_test;

pub use error::Error;
pub use guard::{CompiledGuard, GuardContext};
pub use method_body::MethodBody;
pub use options::{CompilationOptions, ExecutionOptions};
pub use signature::MethodSignature;
