use crate::{String, Vec};
use crate::api::Error;
use crate::emit::{ArgRef, Type};

/// Parameter and return types of the method being built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature<'a> {
    pub params: Vec<Type<'a>>,
    pub returns: Type<'a>,
}

impl<'a> MethodSignature<'a> {
    pub fn new(params: &[Type<'a>], returns: Type<'a>) -> Self {
        Self {
            params: params.to_vec(),
            returns,
        }
    }

    /// Signature of a guard predicate: the given parameters, returning `bool`.
    pub fn predicate(params: &[Type<'a>]) -> Self {
        Self::new(params, Type::Bool)
    }

    /// Parse a comma-separated list of type keywords such as `i32,f64,string`.
    pub fn parse_params(text: &str) -> Result<Vec<Type<'static>>, Error> {
        text.split(',')
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
            .map(|keyword| {
                Type::from_keyword(keyword).ok_or_else(|| Error::UnknownType {
                    keyword: String::from(keyword),
                })
            })
            .collect()
    }

    pub fn returns_value(&self) -> bool {
        self.returns != Type::Void
    }

    pub fn arg(&self, index: u16) -> Option<ArgRef<'a>> {
        let ty = *self.params.get(index as usize)?;
        Some(ArgRef { index, ty })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_params() {
        assert_eq!(
            MethodSignature::parse_params("i32, f64,string"),
            Ok(vec![Type::I32, Type::F64, Type::String])
        );
        assert_eq!(MethodSignature::parse_params(""), Ok(vec![]));
        assert_eq!(
            MethodSignature::parse_params("i32,decimal"),
            Err(Error::UnknownType {
                keyword: "decimal".into()
            })
        );
    }

    #[test]
    fn test_arg_lookup() {
        let signature = MethodSignature::predicate(&[Type::I32, Type::I64]);
        assert!(signature.returns_value());
        assert_eq!(
            signature.arg(1),
            Some(ArgRef {
                index: 1,
                ty: Type::I64
            })
        );
        assert_eq!(signature.arg(2), None);
        assert!(!MethodSignature::new(&[], Type::Void).returns_value());
    }
}
