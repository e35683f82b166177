//! Handles to the things an instruction can name: labels, locals, arguments,
//! fields, methods, and the static types that flow between them.

use core::fmt;

/// Static type of a stack slot, local, argument, field, or expression.
///
/// Every integral type narrower than 64 bits (including `Bool` and `Char`)
/// occupies an `int32` slot on the evaluation stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Type<'a> {
    Void,
    Bool,
    U8,
    I8,
    I16,
    U16,
    I32,
    Char,
    I64,
    F32,
    F64,
    String,
    Object,
    Class(ClassRef<'a>),
}

impl<'a> Type<'a> {
    /// Reference types compare by identity unless they carry an equality method.
    pub const fn is_reference(&self) -> bool {
        matches!(self, Type::String | Type::Object | Type::Class(_))
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    /// Types that live in an `int32` stack slot.
    pub const fn is_int32_slot(&self) -> bool {
        matches!(
            self,
            Type::Bool | Type::U8 | Type::I8 | Type::I16 | Type::U16 | Type::I32 | Type::Char
        )
    }

    /// The overloaded `==` method, if this is a class type that declares one.
    pub fn equality_method(&self) -> Option<MethodRef<'a>> {
        match self {
            Type::Class(class) => class.equality,
            _ => None,
        }
    }

    /// Parse a type keyword as written in CLI parameter lists.
    pub fn from_keyword(keyword: &str) -> Option<Type<'static>> {
        let ty = match keyword {
            "void" => Type::Void,
            "bool" => Type::Bool,
            "u8" | "byte" => Type::U8,
            "i8" | "sbyte" => Type::I8,
            "i16" | "short" => Type::I16,
            "u16" | "ushort" => Type::U16,
            "i32" | "int" => Type::I32,
            "char" => Type::Char,
            "i64" | "long" => Type::I64,
            "f32" | "float" => Type::F32,
            "f64" | "double" => Type::F64,
            "string" => Type::String,
            "object" => Type::Object,
            _ => return None,
        };
        Some(ty)
    }
}

impl fmt::Display for Type<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Bool => write!(f, "bool"),
            Type::U8 => write!(f, "u8"),
            Type::I8 => write!(f, "i8"),
            Type::I16 => write!(f, "i16"),
            Type::U16 => write!(f, "u16"),
            Type::I32 => write!(f, "i32"),
            Type::Char => write!(f, "char"),
            Type::I64 => write!(f, "i64"),
            Type::F32 => write!(f, "f32"),
            Type::F64 => write!(f, "f64"),
            Type::String => write!(f, "string"),
            Type::Object => write!(f, "object"),
            Type::Class(class) => write!(f, "{}", class.name),
        }
    }
}

/// A reference type known to the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassRef<'a> {
    pub name: &'a str,
    /// `op_Equality`-style method taking two instances and returning bool.
    pub equality: Option<MethodRef<'a>>,
}

/// Symbolic jump target, resolved to an instruction index when the code is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl Label {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalRef<'a> {
    pub index: u16,
    pub ty: Type<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgRef<'a> {
    pub index: u16,
    pub ty: Type<'a>,
}

/// A field slot of the method's owning object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef<'a> {
    pub index: u16,
    pub name: &'a str,
    pub ty: Type<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef<'a> {
    pub id: MethodId,
    pub name: &'a str,
    pub arity: u16,
    pub returns_value: bool,
}

impl<'a> MethodRef<'a> {
    pub const fn new(id: u32, name: &'a str, arity: u16, returns_value: bool) -> Self {
        Self {
            id: MethodId(id),
            name,
            arity,
            returns_value,
        }
    }
}

static_assertions::assert_eq_size!(Label, u32);
static_assertions::assert_impl_all!(Type<'static>: Copy, Send, Sync);
