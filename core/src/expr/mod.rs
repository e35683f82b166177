//! Guard expression trees.
//!
//! Trees are immutable and arena-allocated: children are `&'a Expr<'a>`
//! borrowed from a [`bumpalo::Bump`]. They are produced once (by the
//! [`ExprBuilder`] or the guard parser) and only read by the compiler.

mod builder;
mod display;


pub use builder::ExprBuilder;

use crate::emit::{ArgRef, FieldRef, LocalRef, MethodRef, Type};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expr<'a> {
    Binary {
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    /// Read an argument, local, or field.
    Member(Member<'a>),
    Constant(Constant<'a>),
    Call {
        callee: Callee<'a>,
        args: &'a [Expr<'a>],
        /// Declared result type (`Void` for capabilities that leave nothing).
        ty: Type<'a>,
    },
}

impl<'a> Expr<'a> {
    /// Static type of the value this node produces.
    pub fn ty(&self) -> Type<'a> {
        match self {
            Expr::Binary { op, left, .. } => {
                if op.is_comparison() || op.is_logical() {
                    Type::Bool
                } else {
                    left.ty()
                }
            }
            Expr::Member(member) => member.ty(),
            Expr::Constant(Constant::Literal(literal)) => literal.ty(),
            Expr::Constant(Constant::Carried(carried)) => carried.ty(),
            Expr::Call { ty, .. } => *ty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Rem,
    Add,
    Sub,
    Mul,
    Div,
    BitAnd,
    BitOr,
    Xor,
    Shl,
    Shr,
}

impl BinaryOp {
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub const fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub const fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Rem => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }

    /// Binding strength, C-style. Higher binds tighter.
    pub const fn precedence(self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::BitOr => 3,
            BinaryOp::Xor => 4,
            BinaryOp::BitAnd => 5,
            BinaryOp::Eq | BinaryOp::Ne => 6,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 7,
            BinaryOp::Shl | BinaryOp::Shr => 8,
            BinaryOp::Add | BinaryOp::Sub => 9,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 10,
        }
    }
}

impl core::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Member<'a> {
    Arg(ArgRef<'a>),
    Local(LocalRef<'a>),
    Field(FieldRef<'a>),
}

impl<'a> Member<'a> {
    pub fn ty(&self) -> Type<'a> {
        match self {
            Member::Arg(arg) => arg.ty,
            Member::Local(local) => local.ty,
            Member::Field(field) => field.ty,
        }
    }
}

/// Payload of a constant leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Constant<'a> {
    /// A primitive value, pushed as an immediate.
    Literal(Literal<'a>),
    /// A reference handed to a capability call as a deferred operand.
    Carried(Carried<'a>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Null,
    Bool(bool),
    U8(u8),
    I8(i8),
    I16(i16),
    U16(u16),
    I32(i32),
    Char(char),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(&'a str),
}

impl<'a> Literal<'a> {
    pub fn ty(&self) -> Type<'a> {
        match self {
            Literal::Null => Type::Object,
            Literal::Bool(_) => Type::Bool,
            Literal::U8(_) => Type::U8,
            Literal::I8(_) => Type::I8,
            Literal::I16(_) => Type::I16,
            Literal::U16(_) => Type::U16,
            Literal::I32(_) => Type::I32,
            Literal::Char(_) => Type::Char,
            Literal::I64(_) => Type::I64,
            Literal::F32(_) => Type::F32,
            Literal::F64(_) => Type::F64,
            Literal::Str(_) => Type::String,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Carried<'a> {
    Local(LocalRef<'a>),
    Field(FieldRef<'a>),
    Arg(ArgRef<'a>),
    /// A host object with no instruction-level representation.
    Opaque { type_name: &'a str },
}

impl<'a> Carried<'a> {
    pub fn ty(&self) -> Type<'a> {
        match self {
            Carried::Local(local) => local.ty,
            Carried::Field(field) => field.ty,
            Carried::Arg(arg) => arg.ty,
            Carried::Opaque { .. } => Type::Object,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Callee<'a> {
    /// One primitive of the target stack machine.
    Capability(Capability),
    /// An ordinary method, forwarded to the sink's `call`.
    Method(MethodRef<'a>),
}

/// Stack-machine operations that may appear as calls inside a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `@load(target)`
    Load,
    /// `@store(value, target)`
    Store,
    /// `@inc(local)`
    Increment,
    /// `@dec(local)`
    Decrement,
    /// `@add(a, b)`
    Add,
    /// `@sub(a, b)`
    Subtract,
    /// `@rem(a, b)`
    Remainder,
}

/// How a capability receives one of its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Evaluated onto the stack before the primitive runs.
    Value,
    /// A carried reference, staged on the operand queue.
    Target,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::Load,
        Capability::Store,
        Capability::Increment,
        Capability::Decrement,
        Capability::Add,
        Capability::Subtract,
        Capability::Remainder,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Capability::Load => "load",
            Capability::Store => "store",
            Capability::Increment => "inc",
            Capability::Decrement => "dec",
            Capability::Add => "add",
            Capability::Subtract => "sub",
            Capability::Remainder => "rem",
        }
    }

    pub fn from_name(name: &str) -> Option<Capability> {
        Capability::ALL.into_iter().find(|cap| cap.name() == name)
    }

    /// Declared parameters, in the order the primitive consumes them.
    pub const fn params(self) -> &'static [ParamKind] {
        use ParamKind::*;
        match self {
            Capability::Load | Capability::Increment | Capability::Decrement => &[Target],
            Capability::Store => &[Value, Target],
            Capability::Add | Capability::Subtract | Capability::Remainder => &[Value, Value],
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
