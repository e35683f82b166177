//! Tests for the code builder.

use indoc::indoc;
use pretty_assertions::assert_eq;

use super::*;

fn builder() -> CodeBuilder<'static> {
    CodeBuilder::new(true, BranchEncoding::Auto)
}

#[test]
fn test_push_int_picks_compact_forms() {
    let mut b = CodeBuilder::new(false, BranchEncoding::Auto);
    for value in [-1, 0, 8, 9, -2, 1000] {
        b.push_int(value).unwrap();
    }
    assert_eq!(
        b.instructions(),
        &[
            Instruction::LdcI4M1,
            Instruction::LdcI4Inline(0),
            Instruction::LdcI4Inline(8),
            Instruction::LdcI4(9),
            Instruction::LdcI4(-2),
            Instruction::LdcI4(1000),
        ]
    );
    assert_eq!(b.stack_depth(), 6);
    assert_eq!(b.max_stack_size(), 6);
}

#[test]
fn test_stack_underflow_is_rejected() {
    let mut b = builder();
    b.push_int(1).unwrap();
    let err = b.add().unwrap_err();
    assert_eq!(
        err,
        EmitError::StackUnderflow {
            at: 1,
            needed: 2,
            depth: 1
        }
    );
}

#[test]
fn test_joining_paths_must_agree_on_depth() {
    let mut b = builder();
    let join = b.define_label();
    b.push_int(1).unwrap();
    b.branch_if(BranchOp::True, join).unwrap(); // depth 0 at join
    b.push_int(2).unwrap();
    let err = b.mark_label(join).unwrap_err(); // falls through with depth 1
    assert_eq!(
        err,
        EmitError::StackMismatch {
            label: join,
            expected: 0,
            found: 1
        }
    );
}

#[test]
fn test_depth_restored_after_unconditional_branch() {
    let mut b = builder();
    let join = b.define_label();
    let other = b.define_label();
    b.push_int(1).unwrap();
    b.branch(join).unwrap();
    b.mark_label(other).unwrap();
    assert_eq!(b.stack_depth(), 0);
    b.push_int(2).unwrap();
    b.mark_label(join).unwrap();
    assert_eq!(b.stack_depth(), 1);
    b.ret().unwrap();
    let code = b.finish().unwrap();
    assert_eq!(code.target(join), 3);
    assert_eq!(code.target(other), 2);
}

#[test]
fn test_label_marked_twice() {
    let mut b = builder();
    let l = b.define_label();
    b.mark_label(l).unwrap();
    assert_eq!(
        b.mark_label(l).unwrap_err(),
        EmitError::LabelAlreadyMarked { label: l }
    );
}

#[test]
fn test_unknown_label() {
    let mut other = builder();
    let foreign = other.define_label();
    let mut b = builder();
    assert_eq!(
        b.branch(foreign).unwrap_err(),
        EmitError::UnknownLabel { label: foreign }
    );
}

#[test]
fn test_unmarked_branch_target_fails_finish() {
    let mut b = CodeBuilder::new(false, BranchEncoding::Auto);
    let l = b.define_label();
    b.branch(l).unwrap();
    assert_eq!(
        b.finish().unwrap_err(),
        EmitError::UnmarkedLabel { label: l }
    );
}

#[test]
fn test_unreferenced_label_may_stay_unmarked() {
    let mut b = CodeBuilder::new(false, BranchEncoding::Auto);
    let _unused = b.define_label();
    b.ret().unwrap();
    assert!(b.finish().is_ok());
}

fn forward_jump(nops: usize, encoding: BranchEncoding) -> Result<Code<'static>, EmitError> {
    let mut b = CodeBuilder::new(false, encoding);
    let end = b.define_label();
    b.branch(end)?;
    for _ in 0..nops {
        b.emit(Instruction::Nop)?;
    }
    b.mark_label(end)?;
    b.ret()?;
    b.finish()
}

#[test]
fn test_short_branch_when_in_range() {
    let code = forward_jump(127, BranchEncoding::Auto).unwrap();
    assert!(matches!(
        code.instructions[0],
        Instruction::Branch {
            form: BranchForm::Short,
            ..
        }
    ));
    assert_eq!(code.code_size(), 2 + 127 + 1);
}

#[test]
fn test_long_branch_when_out_of_range() {
    let code = forward_jump(128, BranchEncoding::Auto).unwrap();
    assert!(matches!(
        code.instructions[0],
        Instruction::Branch {
            form: BranchForm::Long,
            ..
        }
    ));
    assert_eq!(code.code_size(), 5 + 128 + 1);
}

#[test]
fn test_forced_short_branch_out_of_range() {
    let err = forward_jump(200, BranchEncoding::Short).unwrap_err();
    assert!(matches!(
        err,
        EmitError::BranchOutOfRange {
            at: 0,
            displacement: 200,
            ..
        }
    ));
}

#[test]
fn test_forced_long_branches() {
    let code = forward_jump(0, BranchEncoding::Long).unwrap();
    assert!(matches!(
        code.instructions[0],
        Instruction::Branch {
            form: BranchForm::Long,
            ..
        }
    ));
}

#[test]
fn test_promotion_cascades() {
    // The first branch only falls out of range once the second one grows.
    let mut b = CodeBuilder::new(false, BranchEncoding::Auto);
    let near = b.define_label();
    let far = b.define_label();
    b.branch(near).unwrap();
    for _ in 0..10 {
        b.emit(Instruction::Nop).unwrap();
    }
    b.branch(far).unwrap();
    for _ in 0..115 {
        b.emit(Instruction::Nop).unwrap();
    }
    b.mark_label(near).unwrap();
    for _ in 0..200 {
        b.emit(Instruction::Nop).unwrap();
    }
    b.mark_label(far).unwrap();
    b.ret().unwrap();
    let code = b.finish().unwrap();
    let forms: Vec<_> = code
        .instructions
        .iter()
        .filter_map(|i| match i {
            Instruction::Branch { form, .. } => Some(*form),
            _ => None,
        })
        .collect();
    assert_eq!(forms, vec![BranchForm::Long, BranchForm::Long]);
}

#[test]
fn test_increment_local_sequence() {
    let mut b = CodeBuilder::new(false, BranchEncoding::Auto);
    let counter = b.declare_local(Type::I32).unwrap();
    let wide = b.declare_local(Type::I64).unwrap();
    b.increment_local(counter).unwrap();
    b.decrement_local(wide).unwrap();
    assert_eq!(
        b.instructions(),
        &[
            Instruction::Ldloc(0),
            Instruction::LdcI4Inline(1),
            Instruction::Add,
            Instruction::Stloc(0),
            Instruction::Ldloc(1),
            Instruction::LdcI8(1),
            Instruction::Sub,
            Instruction::Stloc(1),
        ]
    );
    assert_eq!(b.stack_depth(), 0);
    assert_eq!(b.locals(), &[Type::I32, Type::I64]);
}

#[test]
fn test_local_indices_are_bounded() {
    let mut b = CodeBuilder::new(false, BranchEncoding::Auto);
    for _ in 0..=u16::MAX as usize {
        b.declare_local(Type::I32).unwrap();
    }
    assert_eq!(b.locals().len(), 65536);
    assert_eq!(b.declare_local(Type::I32), Err(EmitError::TooManyLocals));
    assert_eq!(b.locals().len(), 65536);
}

#[test]
fn test_debug_listing() {
    let mut b = builder();
    let otherwise = b.define_label();
    b.load_arg(ArgRef {
        index: 1,
        ty: Type::I32,
    })
    .unwrap();
    b.push_int(10).unwrap();
    b.branch_if(BranchOp::Le, otherwise).unwrap();
    b.push_int(1).unwrap();
    b.ret().unwrap();
    b.mark_label(otherwise).unwrap();
    b.push_int(0).unwrap();
    b.ret().unwrap();
    let code = b.finish().unwrap();

    let expected = indoc! {"
        Code {
          locals: []
          max_stack_size: 2
          instructions:
            IL_0000  ldarg.1
            IL_0001  ldc.i4 10
            IL_0006  ble.s L0
            IL_0008  ldc.i4.1
            IL_0009  ret
          L0:
            IL_000a  ldc.i4.0
            IL_000b  ret
        }"};
    assert_eq!(format!("{:?}", code), expected);
}
