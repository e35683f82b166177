//! Operand staging: turns constant leaves into a push instruction or a
//! deferred operand for a later capability call.

use core::fmt;

use smallvec::SmallVec;
use tracing::trace;

use super::error::CompileError;
use crate::emit::{ArgRef, EmitError, FieldRef, InstructionSink, LocalRef};
use crate::expr::{Carried, Literal};
use crate::{ToString, format};

/// A reference waiting on the operand queue for the primitive that uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand<'a> {
    Local(LocalRef<'a>),
    Field(FieldRef<'a>),
    Arg(ArgRef<'a>),
}

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Local(local) => write!(f, "loc{}", local.index),
            Operand::Field(field) => write!(f, "{}", field.name),
            Operand::Arg(arg) => write!(f, "arg{}", arg.index),
        }
    }
}

/// LIFO of staged operands, one per capability dispatch.
#[derive(Debug, Default)]
pub struct OperandQueue<'a> {
    operands: SmallVec<[Operand<'a>; 2]>,
}

impl<'a> OperandQueue<'a> {
    pub fn new() -> Self {
        Self {
            operands: SmallVec::new(),
        }
    }

    pub fn push(&mut self, operand: Operand<'a>) {
        trace!(%operand, "Stage operand");
        self.operands.push(operand);
    }

    pub fn pop(&mut self) -> Option<Operand<'a>> {
        self.operands.pop()
    }

    pub fn len(&self) -> usize {
        self.operands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    /// Close the queue; anything left over is a staging defect.
    pub fn finish(mut self) -> Result<(), CompileError> {
        match self.operands.pop() {
            None => Ok(()),
            Some(operand) => Err(CompileError::DanglingOperand {
                operand: operand.to_string(),
            }),
        }
    }
}

/// Stage a carried reference onto `queue`. Nothing is emitted.
pub fn stage_carried<'a>(
    carried: &Carried<'a>,
    queue: &mut OperandQueue<'a>,
) -> Result<(), CompileError> {
    let operand = match *carried {
        Carried::Local(local) => Operand::Local(local),
        Carried::Field(field) => Operand::Field(field),
        Carried::Arg(arg) => Operand::Arg(arg),
        Carried::Opaque { type_name } => {
            return Err(CompileError::UnsupportedOperand {
                description: format!("value of type `{}` has no instruction form", type_name),
            });
        }
    };
    queue.push(operand);
    Ok(())
}

/// Push a literal with the instruction matching its declared type.
pub fn push_literal<'a, S>(sink: &mut S, literal: &Literal<'a>) -> Result<(), EmitError>
where
    S: InstructionSink<'a> + ?Sized,
{
    match *literal {
        Literal::Null => sink.push_null(),
        Literal::Bool(value) => sink.push_bool(value),
        Literal::U8(value) => sink.push_int(value as i32),
        Literal::I8(value) => sink.push_int(value as i32),
        Literal::I16(value) => {
            sink.push_int(value as i32)?;
            sink.widen_16(true)
        }
        Literal::U16(value) => {
            sink.push_int(value as i32)?;
            sink.widen_16(false)
        }
        Literal::I32(value) => sink.push_int(value),
        Literal::Char(value) => sink.push_int(value as u32 as i32),
        Literal::I64(value) => sink.push_long(value),
        Literal::F32(value) => sink.push_float(value),
        Literal::F64(value) => sink.push_double(value),
        Literal::Str(value) => sink.push_string(value),
    }
}
