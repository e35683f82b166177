//! Call dispatch: maps each capability onto exactly one sink primitive and
//! forwards ordinary method calls to `call`.

use tracing::trace;

use super::condition::GuardCompiler;
use super::error::CompileError;
use super::stager::{stage_carried, Operand, OperandQueue};
use crate::emit::{InstructionSink, MethodRef};
use crate::expr::{Capability, Constant, Expr, ParamKind};
use crate::format;

impl<'s, 'a, S: InstructionSink<'a> + ?Sized> GuardCompiler<'s, 'a, S> {
    pub(crate) fn dispatch(
        &mut self,
        capability: Capability,
        args: &[Expr<'a>],
        depth: usize,
    ) -> Result<(), CompileError> {
        let params = capability.params();
        let callee = format!("@{}", capability);
        if args.len() != params.len() {
            return Err(CompileError::unsupported_operation(
                callee,
                format!("expects {} arguments, got {}", params.len(), args.len()),
            ));
        }
        trace!(%capability, args = args.len(), "Dispatch capability");

        let mut queue = OperandQueue::new();
        for (position, (arg, kind)) in args.iter().zip(params).enumerate() {
            match (kind, arg) {
                (ParamKind::Value, _) => self.value(arg, depth)?,
                (ParamKind::Target, Expr::Constant(Constant::Carried(carried))) => {
                    stage_carried(carried, &mut queue)?
                }
                (ParamKind::Target, _) => {
                    return Err(CompileError::unsupported_operation(
                        callee,
                        format!(
                            "argument {} must be a local, field, or argument reference, got `{}`",
                            position + 1,
                            arg
                        ),
                    ));
                }
            }
        }

        // Every capability takes at most one deferred target.
        let target = queue.pop();
        let sink = self.sink();
        match (capability, target) {
            (Capability::Load, Some(Operand::Local(local))) => sink.load_local(local)?,
            (Capability::Load, Some(Operand::Field(field))) => sink.load_field(field)?,
            (Capability::Load, Some(Operand::Arg(arg))) => sink.load_arg(arg)?,
            (Capability::Store, Some(Operand::Local(local))) => sink.store_local(local)?,
            (Capability::Store, Some(Operand::Field(field))) => sink.store_field(field)?,
            (Capability::Increment, Some(Operand::Local(local))) => sink.increment_local(local)?,
            (Capability::Decrement, Some(Operand::Local(local))) => sink.decrement_local(local)?,
            (Capability::Add, None) => sink.add()?,
            (Capability::Subtract, None) => sink.subtract()?,
            (Capability::Remainder, None) => sink.remainder()?,
            (_, Some(operand)) => {
                return Err(CompileError::unsupported_operation(
                    callee,
                    format!("no primitive accepts `{}` as its target", operand),
                ));
            }
            (_, None) => {
                return Err(CompileError::unsupported_operation(callee, "missing target operand"));
            }
        }
        queue.finish()
    }

    pub(crate) fn call_method(
        &mut self,
        method: MethodRef<'a>,
        args: &[Expr<'a>],
        depth: usize,
    ) -> Result<(), CompileError> {
        if args.len() != method.arity as usize {
            return Err(CompileError::unsupported_operation(
                method.name,
                format!("expects {} arguments, got {}", method.arity, args.len()),
            ));
        }
        for arg in args {
            self.value(arg, depth)?;
        }
        self.sink().call(method)?;
        Ok(())
    }
}
