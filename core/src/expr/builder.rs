use bumpalo::Bump;

use super::{BinaryOp, Callee, Capability, Carried, Constant, Expr, Literal, Member};
use crate::emit::{ArgRef, FieldRef, LocalRef, MethodRef, Type};

/// Allocates expression nodes in an arena.
///
/// ```
/// use bumpalo::Bump;
/// use ilchain_core::emit::Type;
/// use ilchain_core::expr::ExprBuilder;
///
/// let arena = Bump::new();
/// let b = ExprBuilder::new(&arena);
/// let guard = b.and(
///     b.eq(b.arg(1, Type::I32), b.int(10)),
///     b.ne(b.arg(2, Type::I32), b.int(10)),
/// );
/// assert_eq!(guard.to_string(), "arg1 == 10 && arg2 != 10");
/// ```
#[derive(Clone, Copy)]
pub struct ExprBuilder<'a> {
    arena: &'a Bump,
}

impl<'a> ExprBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self { arena }
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    pub fn alloc(&self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(expr)
    }

    pub fn binary(&self, op: BinaryOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.alloc(Expr::Binary { op, left, right })
    }

    pub fn eq(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Eq, left, right)
    }

    pub fn ne(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Ne, left, right)
    }

    pub fn lt(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Lt, left, right)
    }

    pub fn le(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Le, left, right)
    }

    pub fn gt(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Gt, left, right)
    }

    pub fn ge(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Ge, left, right)
    }

    pub fn and(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::And, left, right)
    }

    pub fn or(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Or, left, right)
    }

    pub fn rem(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Rem, left, right)
    }

    pub fn arg(&self, index: u16, ty: Type<'a>) -> &'a Expr<'a> {
        self.alloc(Expr::Member(Member::Arg(ArgRef { index, ty })))
    }

    pub fn local(&self, local: LocalRef<'a>) -> &'a Expr<'a> {
        self.alloc(Expr::Member(Member::Local(local)))
    }

    pub fn field(&self, field: FieldRef<'a>) -> &'a Expr<'a> {
        self.alloc(Expr::Member(Member::Field(field)))
    }

    pub fn literal(&self, literal: Literal<'a>) -> &'a Expr<'a> {
        self.alloc(Expr::Constant(Constant::Literal(literal)))
    }

    pub fn null(&self) -> &'a Expr<'a> {
        self.literal(Literal::Null)
    }

    pub fn bool(&self, value: bool) -> &'a Expr<'a> {
        self.literal(Literal::Bool(value))
    }

    pub fn int(&self, value: i32) -> &'a Expr<'a> {
        self.literal(Literal::I32(value))
    }

    pub fn long(&self, value: i64) -> &'a Expr<'a> {
        self.literal(Literal::I64(value))
    }

    pub fn double(&self, value: f64) -> &'a Expr<'a> {
        self.literal(Literal::F64(value))
    }

    /// String literal, copied into the arena.
    pub fn str(&self, value: &str) -> &'a Expr<'a> {
        let value = self.arena.alloc_str(value);
        self.literal(Literal::Str(value))
    }

    pub fn carried(&self, carried: Carried<'a>) -> &'a Expr<'a> {
        self.alloc(Expr::Constant(Constant::Carried(carried)))
    }

    pub fn capability(
        &self,
        capability: Capability,
        args: &[&'a Expr<'a>],
        ty: Type<'a>,
    ) -> &'a Expr<'a> {
        self.call_with(Callee::Capability(capability), args, ty)
    }

    /// Call an ordinary method; the result type follows `returns_value`.
    pub fn call(&self, method: MethodRef<'a>, args: &[&'a Expr<'a>], ty: Type<'a>) -> &'a Expr<'a> {
        self.call_with(Callee::Method(method), args, ty)
    }

    fn call_with(&self, callee: Callee<'a>, args: &[&'a Expr<'a>], ty: Type<'a>) -> &'a Expr<'a> {
        let args = self.arena.alloc_slice_fill_iter(args.iter().map(|arg| **arg));
        self.alloc(Expr::Call { callee, args, ty })
    }
}
