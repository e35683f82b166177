use hashbrown::HashMap;

use super::error::ExecutionError;
use super::value::Value;
use crate::Box;
use crate::emit::{MethodId, MethodRef};

/// Native implementation of a method the code calls.
///
/// Receives the arguments in declaration order and returns the result, or
/// `None` for methods declared without one.
pub type HostFn<'a> =
    Box<dyn Fn(&[Value<'a>]) -> Result<Option<Value<'a>>, ExecutionError> + 'a>;

/// Table of host implementations, keyed by method id.
#[derive(Default)]
pub struct HostMethods<'a> {
    methods: HashMap<MethodId, HostFn<'a>>,
}

impl<'a> HostMethods<'a> {
    pub fn new() -> Self {
        Self {
            methods: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, method: MethodRef<'_>, implementation: F)
    where
        F: Fn(&[Value<'a>]) -> Result<Option<Value<'a>>, ExecutionError> + 'a,
    {
        self.methods.insert(method.id, Box::new(implementation));
    }

    pub fn get(&self, id: MethodId) -> Option<&HostFn<'a>> {
        self.methods.get(&id)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl core::fmt::Debug for HostMethods<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.methods.keys()).finish()
    }
}
