//! The instruction sink: the emitter surface the guard compiler writes to.

use super::error::EmitError;
use super::instruction_set::{BranchOp, Instruction};
use super::refs::{ArgRef, FieldRef, Label, LocalRef, MethodRef, Type};

/// A stack-machine emitter.
///
/// Implementors supply the four required methods; every primitive the
/// compiler needs is provided on top of [`InstructionSink::emit`], so each
/// call appends exactly the instruction (or fixed sequence) it names.
pub trait InstructionSink<'a> {
    /// Append one instruction.
    fn emit(&mut self, instruction: Instruction<'a>) -> Result<(), EmitError>;

    /// Create a fresh, unmarked label.
    fn define_label(&mut self) -> Label;

    /// Bind `label` to the position of the next emitted instruction.
    fn mark_label(&mut self, label: Label) -> Result<(), EmitError>;

    /// Allocate a new local slot.
    fn declare_local(&mut self, ty: Type<'a>) -> Result<LocalRef<'a>, EmitError>;

    // === Constants ===

    fn push_null(&mut self) -> Result<(), EmitError> {
        self.emit(Instruction::LdNull)
    }

    fn push_bool(&mut self, value: bool) -> Result<(), EmitError> {
        self.push_int(value as i32)
    }

    /// Push an `int32`, using the most compact encoding for the value.
    fn push_int(&mut self, value: i32) -> Result<(), EmitError> {
        let instruction = match value {
            -1 => Instruction::LdcI4M1,
            0..=8 => Instruction::LdcI4Inline(value as u8),
            _ => Instruction::LdcI4(value),
        };
        self.emit(instruction)
    }

    fn push_long(&mut self, value: i64) -> Result<(), EmitError> {
        self.emit(Instruction::LdcI8(value))
    }

    fn push_float(&mut self, value: f32) -> Result<(), EmitError> {
        self.emit(Instruction::LdcR4(value))
    }

    fn push_double(&mut self, value: f64) -> Result<(), EmitError> {
        self.emit(Instruction::LdcR8(value))
    }

    fn push_string(&mut self, value: &'a str) -> Result<(), EmitError> {
        self.emit(Instruction::Ldstr(value))
    }

    /// Re-normalize the low 16 bits of the int32 on top of the stack.
    fn widen_16(&mut self, signed: bool) -> Result<(), EmitError> {
        self.emit(if signed {
            Instruction::ConvI2
        } else {
            Instruction::ConvU2
        })
    }

    // === Arguments, locals, fields ===

    fn load_arg(&mut self, arg: ArgRef<'a>) -> Result<(), EmitError> {
        self.emit(Instruction::Ldarg(arg.index))
    }

    fn load_local(&mut self, local: LocalRef<'a>) -> Result<(), EmitError> {
        self.emit(Instruction::Ldloc(local.index))
    }

    fn store_local(&mut self, local: LocalRef<'a>) -> Result<(), EmitError> {
        self.emit(Instruction::Stloc(local.index))
    }

    fn load_field(&mut self, field: FieldRef<'a>) -> Result<(), EmitError> {
        self.emit(Instruction::Ldsfld(field))
    }

    fn store_field(&mut self, field: FieldRef<'a>) -> Result<(), EmitError> {
        self.emit(Instruction::Stsfld(field))
    }

    // === Control flow ===

    fn branch(&mut self, label: Label) -> Result<(), EmitError> {
        self.emit(Instruction::branch(BranchOp::Always, label))
    }

    fn branch_if(&mut self, op: BranchOp, label: Label) -> Result<(), EmitError> {
        self.emit(Instruction::branch(op, label))
    }

    fn call(&mut self, method: MethodRef<'a>) -> Result<(), EmitError> {
        self.emit(Instruction::Call(method))
    }

    fn ret(&mut self) -> Result<(), EmitError> {
        self.emit(Instruction::Ret)
    }

    // === Comparison ===

    fn compare_equal(&mut self) -> Result<(), EmitError> {
        self.emit(Instruction::Ceq)
    }

    fn compare_greater(&mut self, unsigned: bool) -> Result<(), EmitError> {
        self.emit(if unsigned {
            Instruction::CgtUn
        } else {
            Instruction::Cgt
        })
    }

    fn compare_less(&mut self, unsigned: bool) -> Result<(), EmitError> {
        self.emit(if unsigned {
            Instruction::CltUn
        } else {
            Instruction::Clt
        })
    }

    // === Arithmetic ===

    fn add(&mut self) -> Result<(), EmitError> {
        self.emit(Instruction::Add)
    }

    fn subtract(&mut self) -> Result<(), EmitError> {
        self.emit(Instruction::Sub)
    }

    fn remainder(&mut self) -> Result<(), EmitError> {
        self.emit(Instruction::Rem)
    }

    /// `local = local + 1`
    fn increment_local(&mut self, local: LocalRef<'a>) -> Result<(), EmitError> {
        step_local(self, local, Instruction::Add)
    }

    /// `local = local - 1`
    fn decrement_local(&mut self, local: LocalRef<'a>) -> Result<(), EmitError> {
        step_local(self, local, Instruction::Sub)
    }
}

fn step_local<'a, S: InstructionSink<'a> + ?Sized>(
    sink: &mut S,
    local: LocalRef<'a>,
    op: Instruction<'a>,
) -> Result<(), EmitError> {
    sink.load_local(local)?;
    match local.ty {
        Type::I64 => sink.push_long(1)?,
        Type::F32 => sink.push_float(1.0)?,
        Type::F64 => sink.push_double(1.0)?,
        _ => sink.push_int(1)?,
    }
    sink.emit(op)?;
    match local.ty {
        Type::I16 => sink.widen_16(true)?,
        Type::U16 | Type::Char => sink.widen_16(false)?,
        _ => {}
    }
    sink.store_local(local)
}
