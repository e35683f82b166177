//! ilchain instruction set
//!
//! A CIL-shaped instruction set for a stack machine. Every instruction pops
//! its operands from the evaluation stack and pushes its result back.
//!
//! # Encoding
//!
//! Instructions are kept symbolic while a body is being built. Each one still
//! has a definite encoded size (see [`Instruction::size`]) following the CIL
//! byte layout, which is what branch relaxation measures:
//!
//! ```text
//! ┌────────────┬──────────────────────┐
//! │   Opcode   │  Inline operand      │
//! │ (1-2 bytes)│  (0, 1, 2, 4, 8 B)   │
//! └────────────┴──────────────────────┘
//! ```
//!
//! # Compact forms
//!
//! - `ldc.i4.0` .. `ldc.i4.8` and `ldc.i4.m1` have no operand.
//! - `ldarg`/`ldloc`/`stloc` pick `.0`-`.3`, `.s` (u8) or the long (u16)
//!   form from the slot index.
//! - Branches come in a short form (i8 displacement) and a long form (i32
//!   displacement); the builder picks one per branch when the body is finished.
//!
//! # Stack Discipline
//!
//! Stack effect notation: `[..., operand1, operand2] -> [..., result]`

use core::fmt;

use super::refs::{FieldRef, Label, MethodRef};

/// A single instruction.
#[derive(Clone, Copy, PartialEq)]
pub enum Instruction<'a> {
    // ========================================================================
    // Stack & Constants
    // ========================================================================
    /// No operation
    Nop,

    /// Push a null reference
    /// Stack: [...] -> [..., null]
    LdNull,

    /// Push -1 (`ldc.i4.m1`)
    /// Stack: [...] -> [..., -1]
    LdcI4M1,

    /// Push 0 through 8 without an operand (`ldc.i4.0` .. `ldc.i4.8`)
    /// Stack: [...] -> [..., n]
    LdcI4Inline(u8),

    /// Push a 32-bit integer (`ldc.i4 <int32>`)
    /// Stack: [...] -> [..., n]
    LdcI4(i32),

    /// Push a 64-bit integer
    /// Stack: [...] -> [..., n]
    LdcI8(i64),

    /// Push a 32-bit float
    LdcR4(f32),

    /// Push a 64-bit float
    LdcR8(f64),

    /// Push a string
    /// Stack: [...] -> [..., str]
    Ldstr(&'a str),

    /// Duplicate the top value
    /// Stack: [..., a] -> [..., a, a]
    Dup,

    /// Pop top value
    /// Stack: [..., a] -> [...]
    Pop,

    // ========================================================================
    // Arguments, Locals & Fields
    // ========================================================================
    /// Load argument by position
    /// Stack: [...] -> [..., value]
    Ldarg(u16),

    /// Load local variable
    /// Stack: [...] -> [..., value]
    Ldloc(u16),

    /// Store to local variable
    /// Stack: [..., value] -> [...]
    Stloc(u16),

    /// Load field of the owning object
    /// Stack: [...] -> [..., value]
    Ldsfld(FieldRef<'a>),

    /// Store field of the owning object
    /// Stack: [..., value] -> [...]
    Stsfld(FieldRef<'a>),

    // ========================================================================
    // Arithmetic & Conversion
    // ========================================================================
    /// Stack: [..., a, b] -> [..., a + b]
    Add,

    /// Stack: [..., a, b] -> [..., a - b]
    Sub,

    /// Truncated remainder (sign follows the dividend)
    /// Stack: [..., a, b] -> [..., a % b]
    Rem,

    /// Sign-extend the low 16 bits
    /// Stack: [..., a] -> [..., (a as i16) as i32]
    ConvI2,

    /// Zero-extend the low 16 bits
    /// Stack: [..., a] -> [..., (a as u16) as i32]
    ConvU2,

    // ========================================================================
    // Comparison
    // ========================================================================
    /// Stack: [..., a, b] -> [..., a == b]
    Ceq,

    /// Signed (ints) or ordered (floats) greater-than
    /// Stack: [..., a, b] -> [..., a > b]
    Cgt,

    /// Unsigned (ints), unordered (floats) or non-identical (references)
    /// Stack: [..., a, b] -> [..., a > b]
    CgtUn,

    /// Stack: [..., a, b] -> [..., a < b]
    Clt,

    /// Stack: [..., a, b] -> [..., a < b]
    CltUn,

    // ========================================================================
    // Control Flow
    // ========================================================================
    /// Branch to `label`
    ///
    /// The operands popped depend on `op`. `form` is the encoding chosen by
    /// the builder; it starts out `Short` and is final once the code is built.
    Branch {
        op: BranchOp,
        label: Label,
        form: BranchForm,
    },

    /// Call a method
    /// Stack: [..., arg1, ..., argN] -> [..., result?]
    Call(MethodRef<'a>),

    /// Return from the method
    /// Stack: [..., retval?] -> []
    Ret,
}

static_assertions::assert_impl_all!(Instruction<'static>: Copy, Send, Sync);

/// Condition tested by a branch instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchOp {
    /// `br`: unconditional
    Always,
    /// `brtrue`: pops one value, branches if non-zero / non-null
    True,
    /// `brfalse`: pops one value, branches if zero / null
    False,
    /// `beq`
    Eq,
    /// `bne.un`
    NeUn,
    /// `bgt`
    Gt,
    /// `bgt.un`
    GtUn,
    /// `bge`
    Ge,
    /// `bge.un`
    GeUn,
    /// `blt`
    Lt,
    /// `blt.un`
    LtUn,
    /// `ble`
    Le,
    /// `ble.un`
    LeUn,
}

impl BranchOp {
    /// Number of stack values the branch consumes.
    pub const fn pops(self) -> u16 {
        match self {
            BranchOp::Always => 0,
            BranchOp::True | BranchOp::False => 1,
            _ => 2,
        }
    }

    pub const fn is_unconditional(self) -> bool {
        matches!(self, BranchOp::Always)
    }

    pub const fn mnemonic(self) -> &'static str {
        match self {
            BranchOp::Always => "br",
            BranchOp::True => "brtrue",
            BranchOp::False => "brfalse",
            BranchOp::Eq => "beq",
            BranchOp::NeUn => "bne.un",
            BranchOp::Gt => "bgt",
            BranchOp::GtUn => "bgt.un",
            BranchOp::Ge => "bge",
            BranchOp::GeUn => "bge.un",
            BranchOp::Lt => "blt",
            BranchOp::LtUn => "blt.un",
            BranchOp::Le => "ble",
            BranchOp::LeUn => "ble.un",
        }
    }
}

/// Encoding of a branch displacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BranchForm {
    /// 1-byte opcode + i8 displacement
    Short,
    /// 1-byte opcode + i32 displacement
    Long,
}

/// Encoded size of a slot reference (`ldarg`, `ldloc`, `stloc`).
const fn slot_size(index: u16) -> usize {
    match index {
        0..=3 => 1,
        4..=255 => 2,
        _ => 4,
    }
}

impl<'a> Instruction<'a> {
    /// Construct a branch with a provisional short encoding.
    pub const fn branch(op: BranchOp, label: Label) -> Self {
        Instruction::Branch {
            op,
            label,
            form: BranchForm::Short,
        }
    }

    /// Encoded size in bytes.
    pub const fn size(&self) -> usize {
        match self {
            Self::Nop
            | Self::LdNull
            | Self::LdcI4M1
            | Self::LdcI4Inline(_)
            | Self::Dup
            | Self::Pop
            | Self::Add
            | Self::Sub
            | Self::Rem
            | Self::ConvI2
            | Self::ConvU2
            | Self::Ret => 1,
            Self::LdcI4(_) | Self::LdcR4(_) | Self::Ldstr(_) => 5,
            Self::LdcI8(_) | Self::LdcR8(_) => 9,
            Self::Ldarg(index) | Self::Ldloc(index) | Self::Stloc(index) => slot_size(*index),
            Self::Ldsfld(_) | Self::Stsfld(_) | Self::Call(_) => 5,
            Self::Ceq | Self::Cgt | Self::CgtUn | Self::Clt | Self::CltUn => 2,
            Self::Branch { form, .. } => match form {
                BranchForm::Short => 2,
                BranchForm::Long => 5,
            },
        }
    }

    /// Values popped and pushed, given whether the enclosing method returns a value.
    pub const fn stack_effect(&self, returns_value: bool) -> (u16, u16) {
        match self {
            Self::Nop => (0, 0),
            Self::LdNull
            | Self::LdcI4M1
            | Self::LdcI4Inline(_)
            | Self::LdcI4(_)
            | Self::LdcI8(_)
            | Self::LdcR4(_)
            | Self::LdcR8(_)
            | Self::Ldstr(_)
            | Self::Ldarg(_)
            | Self::Ldloc(_)
            | Self::Ldsfld(_) => (0, 1),
            Self::Dup => (1, 2),
            Self::Pop | Self::Stloc(_) | Self::Stsfld(_) => (1, 0),
            Self::Add | Self::Sub | Self::Rem => (2, 1),
            Self::ConvI2 | Self::ConvU2 => (1, 1),
            Self::Ceq | Self::Cgt | Self::CgtUn | Self::Clt | Self::CltUn => (2, 1),
            Self::Branch { op, .. } => (op.pops(), 0),
            Self::Call(method) => (method.arity, method.returns_value as u16),
            Self::Ret => (returns_value as u16, 0),
        }
    }

    /// Whether control never falls through to the next instruction.
    pub const fn ends_block(&self) -> bool {
        matches!(
            self,
            Self::Ret
                | Self::Branch {
                    op: BranchOp::Always,
                    ..
                }
        )
    }

    pub const fn branch_label(&self) -> Option<Label> {
        match self {
            Self::Branch { label, .. } => Some(*label),
            _ => None,
        }
    }
}

/// Writes a slot instruction using its compact mnemonic.
fn write_slot(f: &mut fmt::Formatter<'_>, name: &str, index: u16) -> fmt::Result {
    match index {
        0..=3 => write!(f, "{}.{}", name, index),
        4..=255 => write!(f, "{}.s {}", name, index),
        _ => write!(f, "{} {}", name, index),
    }
}

impl fmt::Debug for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nop => write!(f, "nop"),
            Self::LdNull => write!(f, "ldnull"),
            Self::LdcI4M1 => write!(f, "ldc.i4.m1"),
            Self::LdcI4Inline(n) => write!(f, "ldc.i4.{}", n),
            Self::LdcI4(n) => write!(f, "ldc.i4 {}", n),
            Self::LdcI8(n) => write!(f, "ldc.i8 {}", n),
            Self::LdcR4(x) => write!(f, "ldc.r4 {:?}", x),
            Self::LdcR8(x) => write!(f, "ldc.r8 {:?}", x),
            Self::Ldstr(s) => write!(f, "ldstr {:?}", s),
            Self::Dup => write!(f, "dup"),
            Self::Pop => write!(f, "pop"),
            Self::Ldarg(index) => write_slot(f, "ldarg", *index),
            Self::Ldloc(index) => write_slot(f, "ldloc", *index),
            Self::Stloc(index) => write_slot(f, "stloc", *index),
            Self::Ldsfld(field) => write!(f, "ldsfld {}", field.name),
            Self::Stsfld(field) => write!(f, "stsfld {}", field.name),
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Rem => write!(f, "rem"),
            Self::ConvI2 => write!(f, "conv.i2"),
            Self::ConvU2 => write!(f, "conv.u2"),
            Self::Ceq => write!(f, "ceq"),
            Self::Cgt => write!(f, "cgt"),
            Self::CgtUn => write!(f, "cgt.un"),
            Self::Clt => write!(f, "clt"),
            Self::CltUn => write!(f, "clt.un"),
            Self::Branch { op, label, form } => match form {
                BranchForm::Short => write!(f, "{}.s {}", op.mnemonic(), label),
                BranchForm::Long => write!(f, "{} {}", op.mnemonic(), label),
            },
            Self::Call(method) => write!(f, "call {}", method.name),
            Self::Ret => write!(f, "ret"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_sizes() {
        assert_eq!(Instruction::LdcI4Inline(8).size(), 1);
        assert_eq!(Instruction::LdcI4M1.size(), 1);
        assert_eq!(Instruction::LdcI4(9).size(), 5);
        assert_eq!(Instruction::Ldarg(3).size(), 1);
        assert_eq!(Instruction::Ldarg(4).size(), 2);
        assert_eq!(Instruction::Ldloc(256).size(), 4);
        assert_eq!(Instruction::Ceq.size(), 2);
    }

    #[test]
    fn test_branch_forms() {
        let short = Instruction::branch(BranchOp::Le, Label(0));
        assert_eq!(short.size(), 2);
        let long = Instruction::Branch {
            op: BranchOp::Le,
            label: Label(0),
            form: BranchForm::Long,
        };
        assert_eq!(long.size(), 5);
        assert_eq!(format!("{:?}", short), "ble.s L0");
        assert_eq!(format!("{:?}", long), "ble L0");
    }

    #[test]
    fn test_stack_effects() {
        assert_eq!(Instruction::Ceq.stack_effect(false), (2, 1));
        assert_eq!(Instruction::branch(BranchOp::False, Label(1)).stack_effect(false), (1, 0));
        assert_eq!(Instruction::branch(BranchOp::Always, Label(1)).stack_effect(false), (0, 0));
        assert_eq!(Instruction::Ret.stack_effect(true), (1, 0));
        let call = Instruction::Call(MethodRef::new(0, "f", 2, true));
        assert_eq!(call.stack_effect(false), (2, 1));
    }

    #[test]
    fn test_debug_formatting() {
        assert_eq!(format!("{:?}", Instruction::Ldarg(1)), "ldarg.1");
        assert_eq!(format!("{:?}", Instruction::Ldloc(17)), "ldloc.s 17");
        assert_eq!(format!("{:?}", Instruction::LdcI4Inline(0)), "ldc.i4.0");
        assert_eq!(format!("{:?}", Instruction::LdcI4(10)), "ldc.i4 10");
        assert_eq!(format!("{:?}", Instruction::Ldstr("hi")), "ldstr \"hi\"");
    }

    #[test]
    fn test_ends_block() {
        assert!(Instruction::Ret.ends_block());
        assert!(Instruction::branch(BranchOp::Always, Label(0)).ends_block());
        assert!(!Instruction::branch(BranchOp::True, Label(0)).ends_block());
    }
}
