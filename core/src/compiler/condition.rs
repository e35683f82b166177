//! Condition compiler: lowers a guard tree into short-circuiting jump code.

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::error::CompileError;
use super::stager::{push_literal, stage_carried, OperandQueue};
use crate::emit::{BranchOp, InstructionSink, Label, Type};
use crate::expr::{BinaryOp, Callee, Constant, Expr, Literal, Member};

/// Where control goes when a condition is decided before the end of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortCircuit {
    /// The condition is in last position: leave its 0/1 value on the stack.
    None,
    /// Branch to `on_false` when the condition fails, fall through otherwise.
    AndChain { on_false: Label },
    /// Branch to `on_true` when the condition holds, fall through otherwise.
    OrChain { on_true: Label },
}

/// Exits of a whole guard: where a chain jumps once its outcome is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exits {
    pub on_true: Label,
    pub on_false: Label,
}

/// Recursive-descent compiler over a guard tree, writing to an
/// [`InstructionSink`].
///
/// Each comparison is fused with the branch its context asks for, so a chain
/// of `&&`/`||` never materializes intermediate booleans.
pub struct GuardCompiler<'s, 'a, S: InstructionSink<'a> + ?Sized> {
    sink: &'s mut S,
    max_depth: usize,
    /// Labels some emitted branch targets.
    targeted: SmallVec<[Label; 8]>,
    _marker: core::marker::PhantomData<&'a ()>,
}

impl<'s, 'a, S: InstructionSink<'a> + ?Sized> GuardCompiler<'s, 'a, S> {
    pub fn new(sink: &'s mut S, max_depth: usize) -> Self {
        Self {
            sink,
            max_depth,
            targeted: SmallVec::new(),
            _marker: core::marker::PhantomData,
        }
    }

    pub fn sink(&mut self) -> &mut S {
        self.sink
    }

    /// Compile `guard` so that it either jumps to one of `exits` or falls
    /// through with its 0/1 value on the stack.
    pub fn compile_guard(&mut self, guard: &Expr<'a>, exits: Exits) -> Result<(), CompileError> {
        debug!(%guard, "Compiling guard");
        self.condition(guard, ShortCircuit::None, exits, 0)
    }

    fn enter(&self, depth: usize) -> Result<usize, CompileError> {
        if depth >= self.max_depth {
            return Err(CompileError::NestingTooDeep {
                max_depth: self.max_depth,
            });
        }
        Ok(depth + 1)
    }

    fn branch_to(&mut self, op: BranchOp, label: Label) -> Result<(), CompileError> {
        if !self.targeted.contains(&label) {
            self.targeted.push(label);
        }
        self.sink.branch_if(op, label)?;
        Ok(())
    }

    /// Compile `expr` as a condition under `context`.
    pub(crate) fn condition(
        &mut self,
        expr: &Expr<'a>,
        context: ShortCircuit,
        exits: Exits,
        depth: usize,
    ) -> Result<(), CompileError> {
        let depth = self.enter(depth)?;
        match expr {
            Expr::Binary {
                op: op @ (BinaryOp::And | BinaryOp::Or),
                left,
                right,
            } => self.chain(*op, left, right, context, exits, depth),
            Expr::Binary { op, left, right } if op.is_comparison() => {
                self.comparison(*op, left, right, context, depth)
            }
            _ => {
                // Any other boolean-valued operand is tested for truth.
                self.value(expr, depth)?;
                match context {
                    ShortCircuit::None => Ok(()),
                    ShortCircuit::AndChain { on_false } => self.branch_to(BranchOp::False, on_false),
                    ShortCircuit::OrChain { on_true } => self.branch_to(BranchOp::True, on_true),
                }
            }
        }
    }

    fn chain(
        &mut self,
        op: BinaryOp,
        left: &Expr<'a>,
        right: &Expr<'a>,
        context: ShortCircuit,
        exits: Exits,
        depth: usize,
    ) -> Result<(), CompileError> {
        let is_and = op == BinaryOp::And;
        trace!(%op, ?context, "Compile chain");
        match (is_and, context) {
            (true, ShortCircuit::None) => {
                let on_false = exits.on_false;
                self.condition(left, ShortCircuit::AndChain { on_false }, exits, depth)?;
                self.condition(right, ShortCircuit::None, exits, depth)
            }
            (false, ShortCircuit::None) => {
                let on_true = exits.on_true;
                self.condition(left, ShortCircuit::OrChain { on_true }, exits, depth)?;
                self.condition(right, ShortCircuit::None, exits, depth)
            }
            (true, ShortCircuit::AndChain { .. }) | (false, ShortCircuit::OrChain { .. }) => {
                self.condition(left, context, exits, depth)?;
                self.condition(right, context, exits, depth)
            }
            (false, ShortCircuit::AndChain { .. }) => {
                // `a || b` inside an AND chain: `a` holding skips `b`.
                let skip = self.sink.define_label();
                self.condition(left, ShortCircuit::OrChain { on_true: skip }, exits, depth)?;
                self.condition(right, context, exits, depth)?;
                self.sink.mark_label(skip)?;
                Ok(())
            }
            (true, ShortCircuit::OrChain { .. }) => {
                // `a && b` inside an OR chain: `a` failing skips `b`.
                let skip = self.sink.define_label();
                self.condition(left, ShortCircuit::AndChain { on_false: skip }, exits, depth)?;
                self.condition(right, context, exits, depth)?;
                self.sink.mark_label(skip)?;
                Ok(())
            }
        }
    }

    fn comparison(
        &mut self,
        op: BinaryOp,
        left: &Expr<'a>,
        right: &Expr<'a>,
        context: ShortCircuit,
        depth: usize,
    ) -> Result<(), CompileError> {
        let operand_ty = comparison_type(left, right);
        trace!(%op, %operand_ty, ?context, "Compile comparison");

        self.value(left, depth)?;
        self.value(right, depth)?;

        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            if let Some(equality) = operand_ty.equality_method() {
                self.sink.call(equality)?;
                let holds = op == BinaryOp::Eq;
                return match context {
                    ShortCircuit::None if holds => Ok(()),
                    ShortCircuit::None => self.negate(),
                    ShortCircuit::AndChain { on_false } => {
                        self.branch_to(if holds { BranchOp::False } else { BranchOp::True }, on_false)
                    }
                    ShortCircuit::OrChain { on_true } => {
                        self.branch_to(if holds { BranchOp::True } else { BranchOp::False }, on_true)
                    }
                };
            }
        }

        let float = operand_ty.is_float();
        let pick = |ordered: BranchOp, unordered: BranchOp| if float { unordered } else { ordered };

        match context {
            ShortCircuit::None => match op {
                BinaryOp::Eq => Ok(self.sink.compare_equal()?),
                BinaryOp::Ne if operand_ty.is_reference() => Ok(self.sink.compare_greater(true)?),
                BinaryOp::Ne => {
                    self.sink.compare_equal()?;
                    self.negate()
                }
                BinaryOp::Gt => Ok(self.sink.compare_greater(false)?),
                BinaryOp::Lt => Ok(self.sink.compare_less(false)?),
                BinaryOp::Ge => {
                    self.sink.compare_less(float)?;
                    self.negate()
                }
                BinaryOp::Le => {
                    self.sink.compare_greater(float)?;
                    self.negate()
                }
                _ => Err(CompileError::UnsupportedOperator { op }),
            },
            ShortCircuit::AndChain { on_false } => {
                let fail = match op {
                    BinaryOp::Eq => BranchOp::NeUn,
                    BinaryOp::Ne => BranchOp::Eq,
                    BinaryOp::Gt => pick(BranchOp::Le, BranchOp::LeUn),
                    BinaryOp::Lt => pick(BranchOp::Ge, BranchOp::GeUn),
                    BinaryOp::Ge => pick(BranchOp::Lt, BranchOp::LtUn),
                    BinaryOp::Le => pick(BranchOp::Gt, BranchOp::GtUn),
                    _ => return Err(CompileError::UnsupportedOperator { op }),
                };
                self.branch_to(fail, on_false)
            }
            ShortCircuit::OrChain { on_true } => {
                let success = match op {
                    BinaryOp::Eq => BranchOp::Eq,
                    BinaryOp::Ne => BranchOp::NeUn,
                    BinaryOp::Gt => BranchOp::Gt,
                    BinaryOp::Lt => BranchOp::Lt,
                    BinaryOp::Ge => BranchOp::Ge,
                    BinaryOp::Le => BranchOp::Le,
                    _ => return Err(CompileError::UnsupportedOperator { op }),
                };
                self.branch_to(success, on_true)
            }
        }
    }

    /// `ldc.i4.0; ceq`
    fn negate(&mut self) -> Result<(), CompileError> {
        self.sink.push_int(0)?;
        self.sink.compare_equal()?;
        Ok(())
    }

    /// Compile `expr` so that exactly its value ends up on the stack.
    pub(crate) fn value(&mut self, expr: &Expr<'a>, depth: usize) -> Result<(), CompileError> {
        let depth = self.enter(depth)?;
        match expr {
            Expr::Member(Member::Arg(arg)) => self.sink.load_arg(*arg)?,
            Expr::Member(Member::Local(local)) => self.sink.load_local(*local)?,
            Expr::Member(Member::Field(field)) => self.sink.load_field(*field)?,
            Expr::Constant(Constant::Literal(literal)) => push_literal(&mut *self.sink, literal)?,
            Expr::Constant(Constant::Carried(carried)) => {
                // Only a capability call can consume a carried reference.
                let mut queue = OperandQueue::new();
                stage_carried(carried, &mut queue)?;
                queue.finish()?;
            }
            Expr::Binary { op, left, right } => match op {
                BinaryOp::And | BinaryOp::Or => self.materialize(expr, depth)?,
                BinaryOp::Rem => {
                    self.value(left, depth)?;
                    self.value(right, depth)?;
                    self.sink.remainder()?;
                }
                _ if op.is_comparison() => {
                    self.comparison(*op, left, right, ShortCircuit::None, depth)?
                }
                _ => return Err(CompileError::UnsupportedOperator { op: *op }),
            },
            Expr::Call { callee, args, .. } => match callee {
                Callee::Capability(capability) => self.dispatch(*capability, args, depth)?,
                Callee::Method(method) => self.call_method(*method, args, depth)?,
            },
        }
        Ok(())
    }

    /// Turn a nested `&&`/`||` into a 0/1 value with private exit labels.
    fn materialize(&mut self, expr: &Expr<'a>, depth: usize) -> Result<(), CompileError> {
        let exits = Exits {
            on_true: self.sink.define_label(),
            on_false: self.sink.define_label(),
        };
        let join = self.sink.define_label();
        self.condition(expr, ShortCircuit::None, exits, depth)?;
        self.sink.branch(join)?;
        // An exit no branch targets would be dead code with an unknown depth.
        if self.targeted.contains(&exits.on_true) {
            self.sink.mark_label(exits.on_true)?;
            self.sink.push_int(1)?;
            self.sink.branch(join)?;
        }
        if self.targeted.contains(&exits.on_false) {
            self.sink.mark_label(exits.on_false)?;
            self.sink.push_int(0)?;
        }
        self.sink.mark_label(join)?;
        Ok(())
    }
}

/// The type a comparison is decided on. A `null` literal takes the type of
/// the other side.
fn comparison_type<'a>(left: &Expr<'a>, right: &Expr<'a>) -> Type<'a> {
    let is_null = |expr: &Expr<'_>| {
        matches!(expr, Expr::Constant(Constant::Literal(Literal::Null)))
    };
    if is_null(left) {
        return right.ty();
    }
    match (left.ty(), right.ty()) {
        (Type::Class(class), _) | (_, Type::Class(class)) => Type::Class(class),
        (ty, _) => ty,
    }
}
