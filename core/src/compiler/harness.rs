//! If/then/else scaffolding around a compiled guard.

use tracing::debug;

use super::condition::{Exits, GuardCompiler};
use super::error::CompileError;
use crate::api::CompilationOptions;
use crate::emit::{BranchOp, InstructionSink, Label, LocalRef, Type};
use crate::expr::Expr;

/// The labels one if/then/else block is built around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IfLabels {
    pub store_true: Label,
    pub store_false: Label,
    pub store_result: Label,
    pub if_body: Label,
    pub else_body: Label,
    pub end_if: Label,
}

impl IfLabels {
    pub fn define<'a, S: InstructionSink<'a> + ?Sized>(sink: &mut S) -> Self {
        Self {
            store_true: sink.define_label(),
            store_false: sink.define_label(),
            store_result: sink.define_label(),
            if_body: sink.define_label(),
            else_body: sink.define_label(),
            end_if: sink.define_label(),
        }
    }
}

/// Emit `if (guard) { then_body } else { else_body }`.
///
/// The guard's outcome is normalized into a fresh `bool` local before the
/// branch to the bodies:
///
/// ```text
///     <guard>            ; jumps to storeTrue/storeFalse, or leaves 0/1
///     br storeResult
/// storeTrue:
///     ldc.i4.1
///     br storeResult
/// storeFalse:
///     ldc.i4.0
/// storeResult:
///     stloc result
///     ldloc result
///     brfalse elseBody
/// ifBody:
///     <then_body>
///     br endIf
/// elseBody:
///     <else_body>
/// endIf:
/// ```
///
/// Callbacks receive the sink and may nest further blocks; each invocation
/// allocates its own labels and result local.
pub fn emit_if<'a, S, T, E>(
    sink: &mut S,
    guard: &Expr<'a>,
    then_body: T,
    else_body: E,
    options: &CompilationOptions,
) -> Result<IfLabels, CompileError>
where
    S: InstructionSink<'a> + ?Sized,
    T: FnOnce(&mut S) -> Result<(), CompileError>,
    E: FnOnce(&mut S) -> Result<(), CompileError>,
{
    let result = sink.declare_local(Type::Bool)?;
    let labels = IfLabels::define(sink);
    debug!(result = result.index, ?labels, "Emitting if block");

    let exits = Exits {
        on_true: labels.store_true,
        on_false: labels.store_false,
    };
    GuardCompiler::new(&mut *sink, options.max_depth).compile_guard(guard, exits)?;
    store_outcome(sink, &labels, result)?;

    sink.load_local(result)?;
    sink.branch_if(BranchOp::False, labels.else_body)?;
    sink.mark_label(labels.if_body)?;
    then_body(&mut *sink)?;
    sink.branch(labels.end_if)?;
    sink.mark_label(labels.else_body)?;
    else_body(&mut *sink)?;
    sink.mark_label(labels.end_if)?;
    Ok(labels)
}

fn store_outcome<'a, S: InstructionSink<'a> + ?Sized>(
    sink: &mut S,
    labels: &IfLabels,
    result: LocalRef<'a>,
) -> Result<(), CompileError> {
    sink.branch(labels.store_result)?;
    sink.mark_label(labels.store_true)?;
    sink.push_int(1)?;
    sink.branch(labels.store_result)?;
    sink.mark_label(labels.store_false)?;
    sink.push_int(0)?;
    sink.mark_label(labels.store_result)?;
    sink.store_local(result)?;
    Ok(())
}
