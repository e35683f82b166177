//! Guard-syntax rendering of expression trees.

use core::fmt;

use super::{Callee, Carried, Constant, Expr, Literal, Member};

impl fmt::Display for Expr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Binary { op, left, right } => {
                write_operand(f, left, op.precedence(), false)?;
                write!(f, " {} ", op)?;
                write_operand(f, right, op.precedence(), true)
            }
            Expr::Member(member) => write!(f, "{}", member),
            Expr::Constant(Constant::Literal(literal)) => write!(f, "{}", literal),
            Expr::Constant(Constant::Carried(carried)) => write!(f, "{}", carried),
            Expr::Call { callee, args, .. } => {
                match callee {
                    Callee::Capability(capability) => write!(f, "@{}(", capability)?,
                    Callee::Method(method) => write!(f, "{}(", method.name)?,
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Operators are left-associative, so a right operand of equal precedence
/// needs parentheses too.
fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr<'_>, parent: u8, right: bool) -> fmt::Result {
    let parenthesize = match expr {
        Expr::Binary { op, .. } => {
            op.precedence() < parent || (right && op.precedence() == parent)
        }
        _ => false,
    };
    if parenthesize {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for Member<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Arg(arg) => write!(f, "arg{}", arg.index),
            Member::Local(local) => write!(f, "loc{}", local.index),
            Member::Field(field) => write!(f, "{}", field.name),
        }
    }
}

impl fmt::Display for Carried<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Carried::Arg(arg) => write!(f, "arg{}", arg.index),
            Carried::Local(local) => write!(f, "loc{}", local.index),
            Carried::Field(field) => write!(f, "{}", field.name),
            Carried::Opaque { type_name } => write!(f, "<{}>", type_name),
        }
    }
}

impl fmt::Display for Literal<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(value) => write!(f, "{}", value),
            Literal::U8(value) => write!(f, "{}b", value),
            Literal::I8(value) => write!(f, "{}", value),
            Literal::I16(value) => write!(f, "{}s", value),
            Literal::U16(value) => write!(f, "{}", value),
            Literal::I32(value) => write!(f, "{}", value),
            Literal::Char(value) => write!(f, "{:?}", value),
            Literal::I64(value) => write!(f, "{}L", value),
            Literal::F32(value) => write!(f, "{:?}f", value),
            Literal::F64(value) => write!(f, "{:?}", value),
            Literal::Str(value) => write!(f, "{:?}", value),
        }
    }
}
