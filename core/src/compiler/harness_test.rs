use bumpalo::Bump;
use indoc::indoc;
use pretty_assertions::assert_eq;

use super::*;
use crate::api::CompilationOptions;
use crate::emit::{BranchEncoding, BranchOp, CodeBuilder, Instruction, InstructionSink, Type};
use crate::expr::ExprBuilder;

fn returns<'a>(value: i32) -> impl FnOnce(&mut CodeBuilder<'a>) -> Result<(), CompileError> {
    move |sink| {
        sink.push_int(value)?;
        sink.ret()?;
        Ok(())
    }
}

#[test]
fn test_if_else_listing() {
    crate::test_utils::init_test_logging();
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let guard = b.and(
        b.eq(b.arg(1, Type::I32), b.int(10)),
        b.ne(b.arg(2, Type::I32), b.int(10)),
    );
    let mut sink = CodeBuilder::new(true, BranchEncoding::Auto);
    emit_if(
        &mut sink,
        guard,
        returns(1),
        returns(0),
        &CompilationOptions::default(),
    )
    .unwrap();
    let code = sink.finish().unwrap();

    let expected = indoc! {"
        Code {
          locals: [bool]
          max_stack_size: 2
          instructions:
            IL_0000  ldarg.1
            IL_0001  ldc.i4 10
            IL_0006  bne.un.s L1
            IL_0008  ldarg.2
            IL_0009  ldc.i4 10
            IL_000e  ceq
            IL_0010  ldc.i4.0
            IL_0011  ceq
            IL_0013  br.s L2
            IL_0015  ldc.i4.1
            IL_0016  br.s L2
          L1:
            IL_0018  ldc.i4.0
          L2:
            IL_0019  stloc.0
            IL_001a  ldloc.0
            IL_001b  brfalse.s L4
            IL_001d  ldc.i4.1
            IL_001e  ret
            IL_001f  br.s L5
          L4:
            IL_0021  ldc.i4.0
            IL_0022  ret
          L5:
        }"};
    assert_eq!(format!("{:?}", code), expected);
}

#[test]
fn test_labels_are_bound_in_order() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let guard = b.or(
        b.gt(b.arg(1, Type::I32), b.int(10)),
        b.lt(b.arg(2, Type::I32), b.int(0)),
    );
    let mut sink = CodeBuilder::new(false, BranchEncoding::Auto);
    let labels = emit_if(
        &mut sink,
        guard,
        |_| Ok(()),
        |_| Ok(()),
        &CompilationOptions::default(),
    )
    .unwrap();
    assert_eq!(
        sink.instructions()[2],
        Instruction::branch(BranchOp::Gt, labels.store_true)
    );
    let code = sink.finish().unwrap();
    let order = [
        labels.store_true,
        labels.store_false,
        labels.store_result,
        labels.if_body,
        labels.else_body,
        labels.end_if,
    ]
    .map(|label| code.target(label));
    assert!(order.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", order);
    assert_eq!(code.target(labels.if_body), code.target(labels.else_body) - 1);
}

#[test]
fn test_nested_blocks_get_fresh_labels_and_locals() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let outer = b.eq(b.arg(0, Type::I32), b.int(1));
    let inner = b.eq(b.arg(1, Type::I32), b.int(2));
    let options = CompilationOptions::default();

    let mut sink = CodeBuilder::new(false, BranchEncoding::Auto);
    let mut inner_labels = None;
    let outer_labels = emit_if(
        &mut sink,
        outer,
        |sink| {
            inner_labels = Some(emit_if(sink, inner, |_| Ok(()), |_| Ok(()), &options)?);
            Ok(())
        },
        |_| Ok(()),
        &options,
    )
    .unwrap();
    let inner_labels = inner_labels.unwrap();
    assert_ne!(outer_labels.store_true, inner_labels.store_true);
    assert_eq!(sink.locals(), &[Type::Bool, Type::Bool]);
    assert_eq!(sink.stack_depth(), 0);
    assert!(sink.finish().is_ok());
}

#[test]
fn test_callback_error_aborts() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let guard = b.eq(b.arg(0, Type::I32), b.int(1));
    let mut sink = CodeBuilder::new(false, BranchEncoding::Auto);
    let err = emit_if(
        &mut sink,
        guard,
        |sink| {
            sink.add()?;
            Ok(())
        },
        |_| panic!("else body must not be emitted"),
        &CompilationOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CompileError::Emit(crate::emit::EmitError::StackUnderflow { needed: 2, .. })
    ));
}

#[test]
fn test_guard_error_aborts_before_bodies() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let x = b.arg(0, Type::I32);
    let guard = b.binary(crate::expr::BinaryOp::Mul, x, x);
    let mut sink = CodeBuilder::new(false, BranchEncoding::Auto);
    let err = emit_if(
        &mut sink,
        guard,
        |_| panic!("then body must not be emitted"),
        |_| panic!("else body must not be emitted"),
        &CompilationOptions::default(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        CompileError::UnsupportedOperator {
            op: crate::expr::BinaryOp::Mul
        }
    );
}
