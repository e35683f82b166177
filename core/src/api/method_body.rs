//! Fluent facade for assembling one method body.

use bumpalo::Bump;
use tracing::debug;

use super::error::Error;
use super::options::CompilationOptions;
use super::signature::MethodSignature;
use crate::compiler::emit_if;
use crate::emit::{
    BranchOp, Code, CodeBuilder, EmitError, FieldRef, Instruction, InstructionSink, Label,
    LocalRef, MethodRef, Type,
};
use crate::expr::Expr;
use crate::parser::{self, GuardScope};

/// A method body under construction.
///
/// Each single-instruction method appends exactly that instruction and
/// returns `&mut Self` for chaining. The first error is latched: every later
/// call becomes a no-op and [`MethodBody::finish`] reports it, so a partially
/// emitted body is never surfaced as usable.
///
/// ```
/// use ilchain_core::api::{CompilationOptions, MethodBody, MethodSignature};
/// use ilchain_core::emit::Type;
///
/// let signature = MethodSignature::new(&[Type::I32, Type::I32], Type::I32);
/// let mut body = MethodBody::new(signature, CompilationOptions::default());
/// body.ldarg(0).ldarg(1).add().ret();
/// let code = body.finish().unwrap();
/// assert_eq!(code.max_stack_size, 2);
/// ```
pub struct MethodBody<'a> {
    builder: CodeBuilder<'a>,
    signature: MethodSignature<'a>,
    scope: GuardScope<'a>,
    options: CompilationOptions,
    error: Option<Error>,
}

impl<'a> MethodBody<'a> {
    pub fn new(signature: MethodSignature<'a>, options: CompilationOptions) -> Self {
        let scope = GuardScope::new(&signature.params);
        Self {
            builder: CodeBuilder::new(signature.returns_value(), options.branch_encoding),
            signature,
            scope,
            options,
            error: None,
        }
    }

    pub fn signature(&self) -> &MethodSignature<'a> {
        &self.signature
    }

    /// Names visible to guards compiled into this body.
    pub fn scope(&self) -> &GuardScope<'a> {
        &self.scope
    }

    /// The first error raised so far, if any.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    fn latch<E: Into<Error>>(&mut self, result: Result<(), E>) -> &mut Self {
        if let Err(err) = result {
            if self.error.is_none() {
                let err = err.into();
                debug!(%err, "Method body failed");
                self.error = Some(err);
            }
        }
        self
    }

    // === Declarations ===

    /// Declare a local that guards can refer to by `name`.
    pub fn local(&mut self, name: &'a str, ty: Type<'a>) -> Result<LocalRef<'a>, Error> {
        let local = self.builder.declare_local(ty)?;
        self.scope.add_named_local(name, local);
        Ok(local)
    }

    /// Make a field of the owning object visible to guards.
    pub fn field(&mut self, field: FieldRef<'a>) -> &mut Self {
        self.scope.add_field(field);
        self
    }

    /// Make a host method callable from guards.
    pub fn host_method(&mut self, method: MethodRef<'a>, returns: Type<'a>) -> &mut Self {
        self.scope.add_method(method, returns);
        self
    }

    pub fn label(&mut self) -> Label {
        self.builder.define_label()
    }

    // === Single instructions ===

    pub fn mark(&mut self, label: Label) -> &mut Self {
        let result = self.mark_label(label);
        self.latch(result)
    }

    pub fn ldnull(&mut self) -> &mut Self {
        let result = self.push_null();
        self.latch(result)
    }

    pub fn ldc_i4(&mut self, value: i32) -> &mut Self {
        let result = self.push_int(value);
        self.latch(result)
    }

    pub fn ldc_i8(&mut self, value: i64) -> &mut Self {
        let result = self.push_long(value);
        self.latch(result)
    }

    pub fn ldc_r4(&mut self, value: f32) -> &mut Self {
        let result = self.push_float(value);
        self.latch(result)
    }

    pub fn ldc_r8(&mut self, value: f64) -> &mut Self {
        let result = self.push_double(value);
        self.latch(result)
    }

    pub fn ldstr(&mut self, value: &'a str) -> &mut Self {
        let result = self.push_string(value);
        self.latch(result)
    }

    pub fn ldarg(&mut self, index: u16) -> &mut Self {
        let result = match self.signature.arg(index) {
            Some(arg) => self.load_arg(arg).map_err(Error::from),
            None => Err(Error::NoSuchArgument {
                index,
                count: self.signature.params.len(),
            }),
        };
        self.latch(result)
    }

    pub fn ldloc(&mut self, local: LocalRef<'a>) -> &mut Self {
        let result = self.load_local(local);
        self.latch(result)
    }

    pub fn stloc(&mut self, local: LocalRef<'a>) -> &mut Self {
        let result = self.store_local(local);
        self.latch(result)
    }

    pub fn ldfld(&mut self, field: FieldRef<'a>) -> &mut Self {
        let result = self.load_field(field);
        self.latch(result)
    }

    pub fn stfld(&mut self, field: FieldRef<'a>) -> &mut Self {
        let result = self.store_field(field);
        self.latch(result)
    }

    pub fn add(&mut self) -> &mut Self {
        let result = InstructionSink::add(self);
        self.latch(result)
    }

    pub fn sub(&mut self) -> &mut Self {
        let result = self.subtract();
        self.latch(result)
    }

    pub fn rem(&mut self) -> &mut Self {
        let result = self.remainder();
        self.latch(result)
    }

    pub fn inc(&mut self, local: LocalRef<'a>) -> &mut Self {
        let result = self.increment_local(local);
        self.latch(result)
    }

    pub fn dec(&mut self, local: LocalRef<'a>) -> &mut Self {
        let result = self.decrement_local(local);
        self.latch(result)
    }

    pub fn ceq(&mut self) -> &mut Self {
        let result = self.compare_equal();
        self.latch(result)
    }

    pub fn cgt(&mut self) -> &mut Self {
        let result = self.compare_greater(false);
        self.latch(result)
    }

    pub fn cgt_un(&mut self) -> &mut Self {
        let result = self.compare_greater(true);
        self.latch(result)
    }

    pub fn clt(&mut self) -> &mut Self {
        let result = self.compare_less(false);
        self.latch(result)
    }

    pub fn clt_un(&mut self) -> &mut Self {
        let result = self.compare_less(true);
        self.latch(result)
    }

    pub fn br(&mut self, label: Label) -> &mut Self {
        let result = InstructionSink::branch(self, label);
        self.latch(result)
    }

    pub fn br_if(&mut self, op: BranchOp, label: Label) -> &mut Self {
        let result = self.branch_if(op, label);
        self.latch(result)
    }

    pub fn brtrue(&mut self, label: Label) -> &mut Self {
        self.br_if(BranchOp::True, label)
    }

    pub fn brfalse(&mut self, label: Label) -> &mut Self {
        self.br_if(BranchOp::False, label)
    }

    pub fn call_method(&mut self, method: MethodRef<'a>) -> &mut Self {
        let result = self.call(method);
        self.latch(result)
    }

    pub fn ret(&mut self) -> &mut Self {
        let result = InstructionSink::ret(self);
        self.latch(result)
    }

    // === Guards ===

    /// `if (guard) { then }`
    pub fn if_then<T>(&mut self, guard: &Expr<'a>, then: T) -> &mut Self
    where
        T: FnOnce(&mut MethodBody<'a>),
    {
        self.if_then_else(guard, then, |_| {})
    }

    /// `if (guard) { then } else { otherwise }`
    ///
    /// Errors raised inside either callback are latched like any other.
    pub fn if_then_else<T, E>(&mut self, guard: &Expr<'a>, then: T, otherwise: E) -> &mut Self
    where
        T: FnOnce(&mut MethodBody<'a>),
        E: FnOnce(&mut MethodBody<'a>),
    {
        let options = self.options;
        let result = emit_if(
            self,
            guard,
            |body| {
                then(body);
                Ok(())
            },
            |body| {
                otherwise(body);
                Ok(())
            },
            &options,
        );
        self.latch(result.map(|_| ()))
    }

    /// Parse `source` against this body's scope, then emit it as an if/else block.
    pub fn if_guard<T, E>(
        &mut self,
        arena: &'a Bump,
        source: &str,
        then: T,
        otherwise: E,
    ) -> &mut Self
    where
        T: FnOnce(&mut MethodBody<'a>),
        E: FnOnce(&mut MethodBody<'a>),
    {
        match parser::parse_with_max_depth(arena, source, &self.scope, self.options.max_depth) {
            Ok(guard) => self.if_then_else(guard, then, otherwise),
            Err(err) => self.latch(Err(err)),
        }
    }

    /// Resolve labels and return the finished code, or the first error.
    pub fn finish(self) -> Result<Code<'a>, Error> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(self.builder.finish()?)
    }
}

/// Emission is suppressed once an error has been latched.
impl<'a> InstructionSink<'a> for MethodBody<'a> {
    fn emit(&mut self, instruction: Instruction<'a>) -> Result<(), EmitError> {
        if self.error.is_some() {
            return Ok(());
        }
        self.builder.emit(instruction)
    }

    fn define_label(&mut self) -> Label {
        self.builder.define_label()
    }

    fn mark_label(&mut self, label: Label) -> Result<(), EmitError> {
        if self.error.is_some() {
            return Ok(());
        }
        self.builder.mark_label(label)
    }

    fn declare_local(&mut self, ty: Type<'a>) -> Result<LocalRef<'a>, EmitError> {
        self.builder.declare_local(ty)
    }
}
