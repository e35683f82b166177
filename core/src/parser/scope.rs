use hashbrown::HashMap;

use crate::Vec;
use crate::emit::{ArgRef, FieldRef, LocalRef, MethodRef, Type};
use crate::expr::Member;

/// Names a guard may refer to.
///
/// Arguments are always addressed as `argN` and locals as `locN`. Locals,
/// fields and host methods may additionally be given names.
#[derive(Debug, Clone, Default)]
pub struct GuardScope<'a> {
    args: Vec<Type<'a>>,
    locals: Vec<LocalRef<'a>>,
    names: HashMap<&'a str, Member<'a>>,
    methods: HashMap<&'a str, (MethodRef<'a>, Type<'a>)>,
}

impl<'a> GuardScope<'a> {
    /// Scope for a method whose parameters have the given types.
    pub fn new(args: &[Type<'a>]) -> Self {
        Self {
            args: args.to_vec(),
            ..Self::default()
        }
    }

    pub fn add_local(&mut self, local: LocalRef<'a>) {
        self.locals.push(local);
    }

    pub fn add_named_local(&mut self, name: &'a str, local: LocalRef<'a>) {
        self.locals.push(local);
        self.names.insert(name, Member::Local(local));
    }

    pub fn add_field(&mut self, field: FieldRef<'a>) {
        self.names.insert(field.name, Member::Field(field));
    }

    /// Register a host method callable as `name(args)`, returning `returns`.
    pub fn add_method(&mut self, method: MethodRef<'a>, returns: Type<'a>) {
        self.methods.insert(method.name, (method, returns));
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Resolve an identifier to the member it names.
    pub fn resolve(&self, name: &str) -> Option<Member<'a>> {
        if let Some(member) = self.names.get(name) {
            return Some(*member);
        }
        if let Some(index) = slot_index(name, "arg") {
            let ty = *self.args.get(index as usize)?;
            return Some(Member::Arg(ArgRef { index, ty }));
        }
        if let Some(index) = slot_index(name, "loc") {
            return self
                .locals
                .iter()
                .find(|local| local.index == index)
                .map(|local| Member::Local(*local));
        }
        None
    }

    pub fn method(&self, name: &str) -> Option<(MethodRef<'a>, Type<'a>)> {
        self.methods.get(name).copied()
    }
}

/// `argN` / `locN` -> `N`, rejecting leading zeros.
fn slot_index(name: &str, prefix: &str) -> Option<u16> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || (digits.len() > 1 && digits.starts_with('0')) {
        return None;
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
