//! Guards compiled into standalone predicate methods.

use bumpalo::Bump;

use super::error::Error;
use super::method_body::MethodBody;
use super::options::{CompilationOptions, ExecutionOptions};
use super::signature::MethodSignature;
use crate::emit::{Code, FieldRef, MethodRef, Type};
use crate::vm::{HostMethods, VM, Value};
use crate::{ToString, Vec, format};

/// A guard compiled as `bool guard(args) { if (guard) return true; else return false; }`.
///
/// # Example
///
/// ```
/// use bumpalo::Bump;
/// use ilchain_core::api::{CompiledGuard, CompilationOptions};
/// use ilchain_core::emit::Type;
/// use ilchain_core::vm::{HostMethods, Value};
///
/// let arena = Bump::new();
/// let guard = CompiledGuard::compile(
///     &arena,
///     "arg0 == 10 && arg1 != 10",
///     &[Type::I32, Type::I32],
///     CompilationOptions::default(),
/// )
/// .unwrap();
/// let host = HostMethods::new();
/// let taken = guard.run(&host, &[Value::Int32(10), Value::Int32(1)]).unwrap();
/// assert!(taken);
/// ```
#[derive(Debug, Clone)]
pub struct CompiledGuard<'a> {
    code: Code<'a>,
    signature: MethodSignature<'a>,
    fields: Vec<FieldRef<'a>>,
    options: ExecutionOptions,
}

/// Names a guard may use beyond its arguments.
#[derive(Debug, Clone, Default)]
pub struct GuardContext<'a> {
    pub fields: Vec<FieldRef<'a>>,
    pub methods: Vec<(MethodRef<'a>, Type<'a>)>,
}

impl<'a> CompiledGuard<'a> {
    /// Compile guard text over arguments of the given types.
    pub fn compile(
        arena: &'a Bump,
        source: &str,
        params: &[Type<'a>],
        options: CompilationOptions,
    ) -> Result<Self, Error> {
        Self::compile_with(arena, source, params, &GuardContext::default(), options)
    }

    /// Compile guard text that may also read fields and call host methods.
    pub fn compile_with(
        arena: &'a Bump,
        source: &str,
        params: &[Type<'a>],
        context: &GuardContext<'a>,
        options: CompilationOptions,
    ) -> Result<Self, Error> {
        let signature = MethodSignature::predicate(params);
        let mut body = MethodBody::new(signature.clone(), options);
        for field in &context.fields {
            body.field(*field);
        }
        for (method, returns) in &context.methods {
            body.host_method(*method, *returns);
        }
        body.if_guard(
            arena,
            source,
            |then| {
                then.ldc_i4(1).ret();
            },
            |otherwise| {
                otherwise.ldc_i4(0).ret();
            },
        );
        Ok(Self::from_code(body.finish()?, signature, &context.fields))
    }

    /// Wrap code assembled elsewhere, e.g. by a hand-written [`MethodBody`].
    pub fn from_code(code: Code<'a>, signature: MethodSignature<'a>, fields: &[FieldRef<'a>]) -> Self {
        Self {
            code,
            signature,
            fields: fields.to_vec(),
            options: ExecutionOptions::default(),
        }
    }

    pub fn with_execution_options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn code(&self) -> &Code<'a> {
        &self.code
    }

    pub fn signature(&self) -> &MethodSignature<'a> {
        &self.signature
    }

    /// Evaluate the guard. Fields start at their zero values.
    pub fn run(&self, host: &HostMethods<'a>, args: &[Value<'a>]) -> Result<bool, Error> {
        let mut fields: Vec<Value<'a>> =
            self.fields.iter().map(|field| Value::default_for(&field.ty)).collect();
        self.run_with_fields(host, args, &mut fields)
    }

    /// Evaluate the guard against caller-owned field storage.
    pub fn run_with_fields(
        &self,
        host: &HostMethods<'a>,
        args: &[Value<'a>],
        fields: &mut [Value<'a>],
    ) -> Result<bool, Error> {
        if args.len() != self.signature.params.len() {
            return Err(Error::ArgumentCount {
                expected: self.signature.params.len(),
                found: args.len(),
            });
        }
        let mut vm = VM::new(&self.code, host, self.options);
        match vm.run(args, fields)? {
            Some(value) => Ok(value.is_truthy()),
            None => Err(Error::NoResult),
        }
    }

    /// Read argument values from text, one per parameter.
    pub fn parse_args(&self, texts: &[&'a str]) -> Result<Vec<Value<'a>>, Error> {
        if texts.len() != self.signature.params.len() {
            return Err(Error::ArgumentCount {
                expected: self.signature.params.len(),
                found: texts.len(),
            });
        }
        texts
            .iter()
            .zip(&self.signature.params)
            .enumerate()
            .map(|(index, (text, ty))| {
                Value::parse(*text, ty).ok_or_else(|| Error::InvalidArgument {
                    index,
                    text: text.to_string(),
                    ty: format!("{}", ty),
                })
            })
            .collect()
    }
}
