use core::cmp::Ordering;

use tracing::{debug, trace};

use super::error::ExecutionError;
use super::host::HostMethods;
use super::stack::Stack;
use super::value::Value;
use crate::api::ExecutionOptions;
use crate::emit::{BranchOp, Code, Instruction};
use crate::{String, ToString, Vec, format};

/// Interpreter for finished [`Code`].
///
/// Arguments are read-only; fields belong to the caller so that stores stay
/// observable after the run; locals start at the zero value of their type.
pub struct VM<'c, 'a> {
    code: &'c Code<'a>,
    host: &'c HostMethods<'a>,
    options: ExecutionOptions,
    stack: Stack<Value<'a>>,
    locals: Vec<Value<'a>>,
}

impl<'c, 'a> VM<'c, 'a> {
    pub fn new(code: &'c Code<'a>, host: &'c HostMethods<'a>, options: ExecutionOptions) -> Self {
        VM {
            code,
            host,
            options,
            stack: Stack::new(code.max_stack_size),
            locals: code.locals.iter().map(Value::default_for).collect(),
        }
    }

    /// Run the method to its `ret`, returning the value it leaves, if any.
    pub fn run(
        &mut self,
        args: &[Value<'a>],
        fields: &mut [Value<'a>],
    ) -> Result<Option<Value<'a>>, ExecutionError> {
        let mut ip = 0;
        let mut steps = 0usize;
        loop {
            let Some(&instruction) = self.code.instructions.get(ip) else {
                return Err(ExecutionError::FellOffEnd);
            };
            if let Some(max_steps) = self.options.max_steps {
                if steps >= max_steps {
                    return Err(ExecutionError::StepLimitExceeded { max_steps });
                }
            }
            steps += 1;
            trace!(ip, ?instruction, depth = self.stack.len(), "Execute");

            let at = ip;
            ip += 1;

            use Instruction::*;
            match instruction {
                Nop => {}
                LdNull => self.stack.push(Value::Null),
                LdcI4M1 => self.stack.push(Value::Int32(-1)),
                LdcI4Inline(n) => self.stack.push(Value::Int32(n as i32)),
                LdcI4(n) => self.stack.push(Value::Int32(n)),
                LdcI8(n) => self.stack.push(Value::Int64(n)),
                LdcR4(x) => self.stack.push(Value::Float32(x)),
                LdcR8(x) => self.stack.push(Value::Float64(x)),
                Ldstr(s) => self.stack.push(Value::Str(s)),
                Dup => {
                    let top = *self.stack.peek().ok_or(ExecutionError::StackUnderflow { at })?;
                    self.stack.push(top);
                }
                Pop => {
                    self.pop(at)?;
                }
                Ldarg(index) => {
                    let value = args.get(index as usize).ok_or(ExecutionError::ArgumentOutOfRange {
                        index,
                        count: args.len(),
                    })?;
                    self.stack.push(*value);
                }
                Ldloc(index) => {
                    let value = *self.local(index)?;
                    self.stack.push(value);
                }
                Stloc(index) => {
                    let value = self.pop(at)?;
                    *self.local(index)? = value;
                }
                Ldsfld(field) => {
                    let count = fields.len();
                    let value = fields
                        .get(field.index as usize)
                        .ok_or(ExecutionError::FieldOutOfRange {
                            index: field.index,
                            count,
                        })?;
                    self.stack.push(*value);
                }
                Stsfld(field) => {
                    let value = self.pop(at)?;
                    let count = fields.len();
                    let slot = fields
                        .get_mut(field.index as usize)
                        .ok_or(ExecutionError::FieldOutOfRange {
                            index: field.index,
                            count,
                        })?;
                    *slot = value;
                }
                Add | Sub | Rem => {
                    let (a, b) = self.pop2(at)?;
                    self.stack.push(arithmetic(instruction, a, b)?);
                }
                ConvI2 | ConvU2 => {
                    let value = match self.pop(at)? {
                        Value::Int32(v) if instruction == ConvI2 => Value::Int32(v as i16 as i32),
                        Value::Int32(v) => Value::Int32(v as u16 as i32),
                        other => return Err(mismatch(&instruction, &[other])),
                    };
                    self.stack.push(value);
                }
                Ceq => {
                    let (a, b) = self.pop2(at)?;
                    self.stack.push(Value::bool(equal(&instruction, a, b)?));
                }
                Cgt | CgtUn | Clt | CltUn => {
                    let (a, b) = self.pop2(at)?;
                    let op = match instruction {
                        Cgt => BranchOp::Gt,
                        CgtUn => BranchOp::GtUn,
                        Clt => BranchOp::Lt,
                        _ => BranchOp::LtUn,
                    };
                    self.stack.push(Value::bool(holds(&instruction, op, a, b)?));
                }
                Branch { op, label, .. } => {
                    let taken = match op {
                        BranchOp::Always => true,
                        BranchOp::True => self.pop(at)?.is_truthy(),
                        BranchOp::False => !self.pop(at)?.is_truthy(),
                        _ => {
                            let (a, b) = self.pop2(at)?;
                            holds(&instruction, op, a, b)?
                        }
                    };
                    if taken {
                        ip = self.code.target(label);
                    }
                }
                Call(method) => {
                    let implementation =
                        self.host
                            .get(method.id)
                            .ok_or_else(|| ExecutionError::MissingHostMethod {
                                name: method.name.to_string(),
                            })?;
                    let call_args = self
                        .stack
                        .pop_n(method.arity as usize)
                        .ok_or(ExecutionError::StackUnderflow { at })?;
                    match (implementation(&call_args)?, method.returns_value) {
                        (Some(result), true) => self.stack.push(result),
                        (None, false) => {}
                        _ => {
                            return Err(ExecutionError::BadHostReturn {
                                name: method.name.to_string(),
                            });
                        }
                    }
                }
                Ret => {
                    let result = if self.code.returns_value {
                        Some(self.pop(at)?)
                    } else {
                        None
                    };
                    debug!(steps, ?result, "Returned");
                    return Ok(result);
                }
            }
        }
    }

    fn local(&mut self, index: u16) -> Result<&mut Value<'a>, ExecutionError> {
        let count = self.locals.len();
        self.locals
            .get_mut(index as usize)
            .ok_or(ExecutionError::LocalOutOfRange { index, count })
    }

    fn pop(&mut self, at: usize) -> Result<Value<'a>, ExecutionError> {
        self.stack.pop().ok_or(ExecutionError::StackUnderflow { at })
    }

    /// Pop two operands, returning them in push order.
    fn pop2(&mut self, at: usize) -> Result<(Value<'a>, Value<'a>), ExecutionError> {
        let b = self.pop(at)?;
        let a = self.pop(at)?;
        Ok((a, b))
    }
}

fn mismatch(instruction: &Instruction<'_>, operands: &[Value<'_>]) -> ExecutionError {
    let kinds: Vec<&str> = operands.iter().map(Value::kind).collect();
    ExecutionError::TypeMismatch {
        instruction: format!("{:?}", instruction),
        found: kinds.join(", "),
    }
}

/// `add`, `sub` wrap; `rem` traps on zero and on `MIN % -1`.
fn arithmetic<'a>(
    instruction: Instruction<'_>,
    a: Value<'a>,
    b: Value<'a>,
) -> Result<Value<'a>, ExecutionError> {
    let value = match (instruction, a, b) {
        (Instruction::Add, Value::Int32(x), Value::Int32(y)) => Value::Int32(x.wrapping_add(y)),
        (Instruction::Sub, Value::Int32(x), Value::Int32(y)) => Value::Int32(x.wrapping_sub(y)),
        (Instruction::Rem, Value::Int32(x), Value::Int32(y)) => Value::Int32(rem_i32(x, y)?),
        (Instruction::Add, Value::Int64(x), Value::Int64(y)) => Value::Int64(x.wrapping_add(y)),
        (Instruction::Sub, Value::Int64(x), Value::Int64(y)) => Value::Int64(x.wrapping_sub(y)),
        (Instruction::Rem, Value::Int64(x), Value::Int64(y)) => Value::Int64(rem_i64(x, y)?),
        (Instruction::Add, Value::Float32(x), Value::Float32(y)) => Value::Float32(x + y),
        (Instruction::Sub, Value::Float32(x), Value::Float32(y)) => Value::Float32(x - y),
        (Instruction::Rem, Value::Float32(x), Value::Float32(y)) => Value::Float32(x % y),
        (Instruction::Add, Value::Float64(x), Value::Float64(y)) => Value::Float64(x + y),
        (Instruction::Sub, Value::Float64(x), Value::Float64(y)) => Value::Float64(x - y),
        (Instruction::Rem, Value::Float64(x), Value::Float64(y)) => Value::Float64(x % y),
        _ => return Err(mismatch(&instruction, &[a, b])),
    };
    Ok(value)
}

fn rem_i32(x: i32, y: i32) -> Result<i32, ExecutionError> {
    if y == 0 {
        return Err(ExecutionError::DivideByZero);
    }
    x.checked_rem(y).ok_or(ExecutionError::Overflow)
}

fn rem_i64(x: i64, y: i64) -> Result<i64, ExecutionError> {
    if y == 0 {
        return Err(ExecutionError::DivideByZero);
    }
    x.checked_rem(y).ok_or(ExecutionError::Overflow)
}

fn equal(instruction: &Instruction<'_>, a: Value<'_>, b: Value<'_>) -> Result<bool, ExecutionError> {
    let result = match (a, b) {
        (Value::Int32(x), Value::Int32(y)) => x == y,
        (Value::Int64(x), Value::Int64(y)) => x == y,
        (Value::Float32(x), Value::Float32(y)) => x == y,
        (Value::Float64(x), Value::Float64(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => x == y,
        (Value::Null, Value::Null) => true,
        (x, y) if x.is_reference() && y.is_reference() => false,
        _ => return Err(mismatch(instruction, &[a, b])),
    };
    Ok(result)
}

/// Numeric ordering; `unsigned` reinterprets integers. `None` means unordered (NaN).
fn ordering(
    instruction: &Instruction<'_>,
    a: Value<'_>,
    b: Value<'_>,
    unsigned: bool,
) -> Result<Option<Ordering>, ExecutionError> {
    let ordering = match (a, b) {
        (Value::Int32(x), Value::Int32(y)) if unsigned => Some((x as u32).cmp(&(y as u32))),
        (Value::Int32(x), Value::Int32(y)) => Some(x.cmp(&y)),
        (Value::Int64(x), Value::Int64(y)) if unsigned => Some((x as u64).cmp(&(y as u64))),
        (Value::Int64(x), Value::Int64(y)) => Some(x.cmp(&y)),
        (Value::Float32(x), Value::Float32(y)) => x.partial_cmp(&y),
        (Value::Float64(x), Value::Float64(y)) => x.partial_cmp(&y),
        _ => return Err(mismatch(instruction, &[a, b])),
    };
    Ok(ordering)
}

/// Whether the two-operand condition `op` holds, with the semantics shared by
/// the compare instructions and the conditional branches.
///
/// The `.un` forms compare integers unsigned and treat unordered floats as
/// holding. On references, `cgt.un`/`clt.un` hold when the two differ.
fn holds(
    instruction: &Instruction<'_>,
    op: BranchOp,
    a: Value<'_>,
    b: Value<'_>,
) -> Result<bool, ExecutionError> {
    use Ordering::*;
    if matches!(op, BranchOp::Eq) {
        return equal(instruction, a, b);
    }
    if matches!(op, BranchOp::NeUn) {
        return Ok(!equal(instruction, a, b)?);
    }
    let unordered = matches!(
        op,
        BranchOp::GtUn | BranchOp::LtUn | BranchOp::GeUn | BranchOp::LeUn
    );
    if unordered && a.is_reference() && b.is_reference() {
        return Ok(!equal(instruction, a, b)?);
    }
    let result = match (op, ordering(instruction, a, b, unordered)?) {
        (_, None) => unordered,
        (BranchOp::Gt | BranchOp::GtUn, Some(o)) => o == Greater,
        (BranchOp::Lt | BranchOp::LtUn, Some(o)) => o == Less,
        (BranchOp::Ge | BranchOp::GeUn, Some(o)) => o != Less,
        (BranchOp::Le | BranchOp::LeUn, Some(o)) => o != Greater,
        (op, Some(_)) => {
            return Err(ExecutionError::TypeMismatch {
                instruction: format!("{:?}", instruction),
                found: String::from(op.mnemonic()),
            });
        }
    };
    Ok(result)
}
