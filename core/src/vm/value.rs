use core::fmt;

use crate::emit::Type;

/// A value on the operand stack, in an argument, local, or field.
///
/// Every integral type narrower than 64 bits (including `bool` and `char`)
/// is held as `Int32`, the same widening the instruction set applies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'a> {
    Null,
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Str(&'a str),
    /// Opaque host object, compared by identity.
    Object(u32),
}

impl<'a> Value<'a> {
    pub const TRUE: Value<'static> = Value::Int32(1);
    pub const FALSE: Value<'static> = Value::Int32(0);

    pub fn bool(value: bool) -> Self {
        Value::Int32(value as i32)
    }

    /// The zero value a local of type `ty` starts with.
    pub fn default_for(ty: &Type<'_>) -> Self {
        match ty {
            Type::I64 => Value::Int64(0),
            Type::F32 => Value::Float32(0.0),
            Type::F64 => Value::Float64(0.0),
            Type::String | Type::Object | Type::Class(_) => Value::Null,
            _ => Value::Int32(0),
        }
    }

    /// `brtrue` semantics: non-zero numbers and non-null references hold.
    pub fn is_truthy(&self) -> bool {
        match *self {
            Value::Null => false,
            Value::Int32(v) => v != 0,
            Value::Int64(v) => v != 0,
            Value::Float32(v) => v != 0.0,
            Value::Float64(v) => v != 0.0,
            Value::Str(_) | Value::Object(_) => true,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Value::Null | Value::Str(_) | Value::Object(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
        }
    }

    /// Parse `text` as a value of type `ty`, with the range checks of the
    /// declared type.
    pub fn parse(text: &'a str, ty: &Type<'_>) -> Option<Self> {
        let text = text.trim();
        let value = match ty {
            Type::Bool => match text {
                "true" => Value::TRUE,
                "false" => Value::FALSE,
                _ => return None,
            },
            Type::U8 => Value::Int32(text.parse::<u8>().ok()? as i32),
            Type::I8 => Value::Int32(text.parse::<i8>().ok()? as i32),
            Type::I16 => Value::Int32(text.parse::<i16>().ok()? as i32),
            Type::U16 => Value::Int32(text.parse::<u16>().ok()? as i32),
            Type::I32 => Value::Int32(text.parse().ok()?),
            Type::Char => {
                let mut chars = text.chars();
                let c = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                Value::Int32(c as u32 as i32)
            }
            Type::I64 => Value::Int64(text.parse().ok()?),
            Type::F32 => Value::Float32(text.parse().ok()?),
            Type::F64 => Value::Float64(text.parse().ok()?),
            Type::String if text == "null" => Value::Null,
            Type::String => Value::Str(text),
            Type::Object | Type::Class(_) if text == "null" => Value::Null,
            Type::Object | Type::Class(_) => Value::Object(text.parse().ok()?),
            Type::Void => return None,
        };
        Some(value)
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}L", v),
            Value::Float32(v) => write!(f, "{:?}f", v),
            Value::Float64(v) => write!(f, "{:?}", v),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Object(id) => write!(f, "<object #{}>", id),
        }
    }
}
