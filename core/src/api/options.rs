//! Configuration options for compiling and running guards.

use crate::emit::BranchEncoding;

/// Configuration options for compilation.
///
/// # Example
///
/// ```
/// use ilchain_core::api::CompilationOptions;
/// use ilchain_core::emit::BranchEncoding;
///
/// let options = CompilationOptions {
///     branch_encoding: BranchEncoding::Long,
///     ..CompilationOptions::default()
/// };
/// assert_eq!(options.max_depth, 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilationOptions {
    /// How branch displacements are encoded when the body is finished.
    ///
    /// Default: `BranchEncoding::Auto`
    pub branch_encoding: BranchEncoding,

    /// Maximum nesting of `&&`/`||` inside one guard.
    ///
    /// Default: 256
    pub max_depth: usize,
}

impl Default for CompilationOptions {
    fn default() -> Self {
        Self {
            branch_encoding: BranchEncoding::Auto,
            max_depth: 256,
        }
    }
}

/// Configuration options for running finished code on the VM.
///
/// # Example
///
/// ```
/// use ilchain_core::api::ExecutionOptions;
///
/// let options = ExecutionOptions {
///     max_steps: Some(10_000),
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutionOptions {
    /// Maximum number of instructions executed (if Some).
    ///
    /// Set to `None` for no limit.
    ///
    /// Default: None
    pub max_steps: Option<usize>,
}
