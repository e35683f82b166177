use bumpalo::Bump;
use pretty_assertions::assert_eq;

use super::*;
use crate::emit::{
    ArgRef, BranchEncoding, CodeBuilder, FieldRef, Instruction, InstructionSink, LocalRef,
    MethodRef, Type,
};
use crate::expr::{Capability, Carried, Expr, ExprBuilder};
use crate::Vec;

const COUNTER: LocalRef<'static> = LocalRef {
    index: 0,
    ty: Type::I32,
};
const TOTAL: FieldRef<'static> = FieldRef {
    index: 0,
    name: "total",
    ty: Type::I32,
};
const FIRST: ArgRef<'static> = ArgRef {
    index: 1,
    ty: Type::I32,
};

fn emit<'a>(expr: &Expr<'a>) -> Result<Vec<Instruction<'a>>, CompileError> {
    let mut b = CodeBuilder::new(false, BranchEncoding::Auto);
    b.declare_local(Type::I32)?;
    GuardCompiler::new(&mut b, 256).value(expr, 0)?;
    Ok(b.instructions().to_vec())
}

#[test]
fn test_load_each_target_kind() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let load = |target| b.capability(Capability::Load, &[b.carried(target)], Type::I32);
    assert_eq!(
        emit(load(Carried::Local(COUNTER))).unwrap(),
        vec![Instruction::Ldloc(0)]
    );
    assert_eq!(
        emit(load(Carried::Field(TOTAL))).unwrap(),
        vec![Instruction::Ldsfld(TOTAL)]
    );
    assert_eq!(
        emit(load(Carried::Arg(FIRST))).unwrap(),
        vec![Instruction::Ldarg(1)]
    );
}

#[test]
fn test_store_takes_value_then_target() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let store = |target| {
        b.capability(
            Capability::Store,
            &[b.int(5), b.carried(target)],
            Type::Void,
        )
    };
    assert_eq!(
        emit(store(Carried::Local(COUNTER))).unwrap(),
        vec![Instruction::LdcI4Inline(5), Instruction::Stloc(0)]
    );
    assert_eq!(
        emit(store(Carried::Field(TOTAL))).unwrap(),
        vec![Instruction::LdcI4Inline(5), Instruction::Stsfld(TOTAL)]
    );
    let err = emit(store(Carried::Arg(FIRST))).unwrap_err();
    assert_eq!(
        err,
        CompileError::UnsupportedOperation {
            callee: "@store".into(),
            reason: "no primitive accepts `arg1` as its target".into(),
        }
    );
}

#[test]
fn test_increment_and_decrement_locals_only() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let inc = b.capability(
        Capability::Increment,
        &[b.carried(Carried::Local(COUNTER))],
        Type::Void,
    );
    assert_eq!(
        emit(inc).unwrap(),
        vec![
            Instruction::Ldloc(0),
            Instruction::LdcI4Inline(1),
            Instruction::Add,
            Instruction::Stloc(0),
        ]
    );

    let dec = b.capability(
        Capability::Decrement,
        &[b.carried(Carried::Field(TOTAL))],
        Type::Void,
    );
    assert!(matches!(
        emit(dec).unwrap_err(),
        CompileError::UnsupportedOperation { .. }
    ));
}

#[test]
fn test_arithmetic_capabilities() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let x = b.arg(1, Type::I32);
    let cases = [
        (Capability::Add, Instruction::Add),
        (Capability::Subtract, Instruction::Sub),
        (Capability::Remainder, Instruction::Rem),
    ];
    for (capability, primitive) in cases {
        let call = b.capability(capability, &[x, b.int(3)], Type::I32);
        assert_eq!(
            emit(call).unwrap(),
            vec![Instruction::Ldarg(1), Instruction::LdcI4Inline(3), primitive]
        );
    }
}

#[test]
fn test_argument_count_mismatch() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let err = emit(b.capability(Capability::Load, &[], Type::I32)).unwrap_err();
    assert_eq!(
        err,
        CompileError::UnsupportedOperation {
            callee: "@load".into(),
            reason: "expects 1 arguments, got 0".into(),
        }
    );
}

#[test]
fn test_literal_where_target_expected() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let err = emit(b.capability(Capability::Increment, &[b.int(5)], Type::Void)).unwrap_err();
    assert_eq!(
        err,
        CompileError::UnsupportedOperation {
            callee: "@inc".into(),
            reason: "argument 1 must be a local, field, or argument reference, got `5`".into(),
        }
    );
}

#[test]
fn test_opaque_target_rejected() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let opaque = b.carried(Carried::Opaque { type_name: "Socket" });
    let err = emit(b.capability(Capability::Load, &[opaque], Type::Object)).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedOperand { .. }));
}

#[test]
fn test_method_call_forwards_to_call() {
    let arena = Bump::new();
    let b = ExprBuilder::new(&arena);
    let check = MethodRef::new(3, "check", 2, true);
    let call = b.call(check, &[b.arg(1, Type::I32), b.str("id")], Type::Bool);
    assert_eq!(
        emit(call).unwrap(),
        vec![
            Instruction::Ldarg(1),
            Instruction::Ldstr("id"),
            Instruction::Call(check),
        ]
    );

    let short = b.call(check, &[b.int(1)], Type::Bool);
    assert_eq!(
        emit(short).unwrap_err(),
        CompileError::UnsupportedOperation {
            callee: "check".into(),
            reason: "expects 2 arguments, got 1".into(),
        }
    );
}
