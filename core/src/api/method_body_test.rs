use bumpalo::Bump;
use pretty_assertions::assert_eq;

use super::*;
use crate::compiler::CompileError;
use crate::emit::{BranchOp, EmitError, FieldRef, Instruction, MethodRef, Type};
use crate::expr::{BinaryOp, ExprBuilder};
use crate::parser::ParseErrorKind;
use crate::vm::{ExecutionError, HostMethods, VM, Value};

fn body<'a>(params: &[Type<'a>], returns: Type<'a>) -> MethodBody<'a> {
    MethodBody::new(MethodSignature::new(params, returns), CompilationOptions::default())
}

#[test]
fn test_fluent_chain_appends_in_order() {
    let mut b = body(&[Type::I32], Type::I32);
    let done = b.label();
    b.ldarg(0).ldc_i4(3).rem().ldc_i4(0).br_if(BranchOp::Eq, done);
    b.ldc_i4(5).ret().mark(done).ldc_i4(7).ret();
    let code = b.finish().unwrap();
    assert_eq!(
        code.instructions,
        vec![
            Instruction::Ldarg(0),
            Instruction::LdcI4Inline(3),
            Instruction::Rem,
            Instruction::LdcI4Inline(0),
            Instruction::branch(BranchOp::Eq, done),
            Instruction::LdcI4Inline(5),
            Instruction::Ret,
            Instruction::LdcI4Inline(7),
            Instruction::Ret,
        ]
    );
}

#[test]
fn test_first_error_is_latched() {
    let mut b = body(&[Type::I32], Type::I32);
    b.ldarg(4).add().ldarg(0).ret();
    assert_eq!(b.error(), Some(&Error::NoSuchArgument { index: 4, count: 1 }));
    assert_eq!(
        b.finish().unwrap_err(),
        Error::NoSuchArgument { index: 4, count: 1 }
    );
}

#[test]
fn test_emit_errors_are_latched() {
    let mut b = body(&[], Type::I32);
    b.ldc_i4(1).add();
    assert_eq!(
        b.finish().unwrap_err(),
        Error::Compile(CompileError::Emit(EmitError::StackUnderflow {
            at: 1,
            needed: 2,
            depth: 1
        }))
    );
}

#[test]
fn test_if_guard_over_named_local() {
    let arena = Bump::new();
    let mut b = body(&[Type::I32], Type::I32);
    let count = b.local("count", Type::I32).unwrap();
    b.ldarg(0).stloc(count);
    b.if_guard(
        &arena,
        "count > 3 && count % 2 == 0",
        |then| {
            then.ldc_i4(1).ret();
        },
        |otherwise| {
            otherwise.ldc_i4(0).ret();
        },
    );
    let code = b.finish().unwrap();
    assert_eq!(code.locals, vec![Type::I32, Type::Bool]);

    let host = HostMethods::new();
    for (arg, expected) in [(4, 1), (5, 0), (2, 0), (10, 1)] {
        let mut vm = VM::new(&code, &host, ExecutionOptions::default());
        assert_eq!(
            vm.run(&[Value::Int32(arg)], &mut []),
            Ok(Some(Value::Int32(expected))),
            "arg = {}",
            arg
        );
    }
}

#[test]
fn test_if_then_nests() {
    crate::test_utils::init_test_logging();
    let arena = Bump::new();
    let e = ExprBuilder::new(&arena);
    let outer = e.gt(e.arg(0, Type::I32), e.int(0));
    let inner = e.gt(e.arg(1, Type::I32), e.int(0));

    let mut b = body(&[Type::I32, Type::I32], Type::I32);
    let result = b.local("result", Type::I32).unwrap();
    b.if_then(outer, |then| {
        then.if_then(inner, |then| {
            then.ldc_i4(2).stloc(result);
        });
    });
    b.ldloc(result).ret();
    let code = b.finish().unwrap();
    // One result local per block.
    assert_eq!(code.locals, vec![Type::I32, Type::Bool, Type::Bool]);

    let host = HostMethods::new();
    for (x, y, expected) in [(1, 1, 2), (1, 0, 0), (0, 1, 0)] {
        let mut vm = VM::new(&code, &host, ExecutionOptions::default());
        let args = [Value::Int32(x), Value::Int32(y)];
        assert_eq!(vm.run(&args, &mut []), Ok(Some(Value::Int32(expected))));
    }
}

#[test]
fn test_guard_parse_error_is_latched() {
    let arena = Bump::new();
    let mut b = body(&[Type::I32], Type::I32);
    b.if_guard(&arena, "arg0 == nope", |_| {}, |_| {});
    match b.finish() {
        Err(Error::Parse(err)) => assert_eq!(
            err.kind,
            ParseErrorKind::UnknownName {
                name: "nope".into()
            }
        ),
        other => panic!("expected a parse error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_guard_compile_error_is_latched() {
    let arena = Bump::new();
    let mut b = body(&[Type::I32], Type::I32);
    b.if_guard(&arena, "arg0 + 1", |_| {}, |_| {});
    assert_eq!(
        b.finish().unwrap_err(),
        Error::Compile(CompileError::UnsupportedOperator { op: BinaryOp::Add })
    );
}

#[test]
fn test_compiled_guard_runs() {
    let arena = Bump::new();
    let guard = CompiledGuard::compile(
        &arena,
        "arg0 == 10 && arg1 != 10",
        &[Type::I32, Type::I32],
        CompilationOptions::default(),
    )
    .unwrap();
    let host = HostMethods::new();
    let args = guard.parse_args(&["10", "1"]).unwrap();
    assert_eq!(guard.run(&host, &args), Ok(true));
    let args = guard.parse_args(&["10", "10"]).unwrap();
    assert_eq!(guard.run(&host, &args), Ok(false));
    assert_eq!(
        guard.run(&host, &[Value::Int32(1)]),
        Err(Error::ArgumentCount {
            expected: 2,
            found: 1
        })
    );
}

#[test]
fn test_parse_args_checks_types() {
    let arena = Bump::new();
    let guard = CompiledGuard::compile(
        &arena,
        "arg0 > 1",
        &[Type::U8],
        CompilationOptions::default(),
    )
    .unwrap();
    assert_eq!(
        guard.parse_args(&["300"]),
        Err(Error::InvalidArgument {
            index: 0,
            text: "300".into(),
            ty: "u8".into(),
        })
    );
}

#[test]
fn test_compiled_guard_with_fields_and_host_methods() {
    let arena = Bump::new();
    let limit = FieldRef {
        index: 0,
        name: "limit",
        ty: Type::I32,
    };
    let ready = MethodRef::new(3, "ready", 1, true);
    let context = GuardContext {
        fields: vec![limit],
        methods: vec![(ready, Type::Bool)],
    };
    let guard = CompiledGuard::compile_with(
        &arena,
        "arg0 < limit || ready(arg0)",
        &[Type::I32],
        &context,
        CompilationOptions::default(),
    )
    .unwrap();

    let mut host = HostMethods::new();
    host.register(ready, |args| match args {
        [Value::Int32(v)] => Ok(Some(Value::bool(*v == 99))),
        _ => Err(ExecutionError::BadHostReturn {
            name: "ready".into(),
        }),
    });
    let mut fields = [Value::Int32(50)];
    assert_eq!(
        guard.run_with_fields(&host, &[Value::Int32(10)], &mut fields),
        Ok(true)
    );
    assert_eq!(
        guard.run_with_fields(&host, &[Value::Int32(60)], &mut fields),
        Ok(false)
    );
    assert_eq!(
        guard.run_with_fields(&host, &[Value::Int32(99)], &mut fields),
        Ok(true)
    );
}

#[test]
fn test_step_limit_surfaces_as_execution_error() {
    let arena = Bump::new();
    let guard = CompiledGuard::compile(
        &arena,
        "arg0 > 0",
        &[Type::I32],
        CompilationOptions::default(),
    )
    .unwrap()
    .with_execution_options(ExecutionOptions { max_steps: Some(2) });
    let host = HostMethods::new();
    assert_eq!(
        guard.run(&host, &[Value::Int32(1)]),
        Err(Error::Execution(ExecutionError::StepLimitExceeded {
            max_steps: 2
        }))
    );
}

#[test]
fn test_guard_nesting_follows_max_depth_option() {
    let arena = Bump::new();
    let options = CompilationOptions {
        max_depth: 4,
        ..CompilationOptions::default()
    };
    let mut b = MethodBody::new(MethodSignature::new(&[Type::I32], Type::I32), options);
    b.if_guard(&arena, "(((((arg0 == 1)))))", |_| {}, |_| {});
    match b.finish() {
        Err(Error::Parse(err)) => {
            assert_eq!(err.kind, ParseErrorKind::MaxDepthExceeded { max_depth: 4 })
        }
        other => panic!("expected a parse error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_deeply_nested_guard_is_rejected() {
    let arena = Bump::new();
    let depth = 1000;
    let source = format!("{}arg0 == 1{}", "(".repeat(depth), ")".repeat(depth));
    let err = CompiledGuard::compile(&arena, &source, &[Type::I32], CompilationOptions::default())
        .unwrap_err();
    match err {
        Error::Parse(err) => {
            assert_eq!(err.kind, ParseErrorKind::MaxDepthExceeded { max_depth: 256 })
        }
        other => panic!("expected a parse error, got {:?}", other),
    }
}

#[test]
fn test_mismatched_guard_operands_fail_to_compile() {
    let arena = Bump::new();
    for source in ["arg0 == 10L", "arg0 == 1.5"] {
        let err = CompiledGuard::compile(&arena, source, &[Type::I32], CompilationOptions::default())
            .unwrap_err();
        assert!(
            matches!(err, Error::Parse(ref e) if matches!(e.kind, ParseErrorKind::TypeMismatch { .. })),
            "{}: {:?}",
            source,
            err
        );
    }
}

#[test]
fn test_void_code_reports_no_result() {
    let signature = MethodSignature::new(&[Type::I32], Type::Void);
    let mut b = MethodBody::new(signature.clone(), CompilationOptions::default());
    b.ret();
    let guard = CompiledGuard::from_code(b.finish().unwrap(), signature, &[]);
    let host = HostMethods::new();
    assert_eq!(guard.run(&host, &[Value::Int32(1)]), Err(Error::NoResult));
}
