//! The facade error type, carrying the guard source for rendering.

use ilchain_core::api;
use ilchain_core::expr::Capability;
use ilchain_core::parser::{ParseError, ParseErrorKind};
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use crate::{CompileError, ExecutionError};

#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    #[diagnostic(code(ilchain::parse))]
    #[error("{message}")]
    Parse {
        message: String,
        /// Short kind code, `P001` to `P006`.
        kind_code: &'static str,

        #[source_code]
        src: String,

        #[label("here")]
        span: SourceSpan,

        #[help]
        help: Option<String>,
    },

    #[diagnostic(code(ilchain::compile))]
    #[error("cannot compile guard: {error}")]
    Compile {
        error: CompileError,
        #[source_code]
        src: String,
    },

    #[diagnostic(code(ilchain::execution))]
    #[error("execution failed: {0}")]
    Execution(ExecutionError),

    #[diagnostic(code(ilchain::api))]
    #[error("{0}")]
    Api(api::Error),
}

impl Error {
    /// Attach `source` to an API error.
    pub fn new(err: api::Error, source: &str) -> Self {
        match err {
            api::Error::Parse(parse) => Self::parse(parse, source),
            api::Error::Compile(error) => Error::Compile {
                error,
                src: source.to_string(),
            },
            api::Error::Execution(error) => Error::Execution(error),
            other => Error::Api(other),
        }
    }

    fn parse(err: ParseError, source: &str) -> Self {
        let range = err.span.0.clone();
        Error::Parse {
            message: err.to_string(),
            kind_code: err.code(),
            src: source.to_string(),
            span: (range.start, range.len()).into(),
            help: help_for(&err.kind),
        }
    }

    /// Byte range in the source the error points at, if any.
    pub fn span(&self) -> Option<core::ops::Range<usize>> {
        match self {
            Error::Parse { span, .. } => Some(span.offset()..span.offset() + span.len()),
            _ => None,
        }
    }

    pub fn source_text(&self) -> Option<&str> {
        match self {
            Error::Parse { src, .. } | Error::Compile { src, .. } => Some(src),
            _ => None,
        }
    }
}

impl From<api::Error> for Error {
    fn from(err: api::Error) -> Self {
        match err {
            api::Error::Execution(error) => Error::Execution(error),
            other => Error::Api(other),
        }
    }
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        Error::Execution(err)
    }
}

fn help_for(kind: &ParseErrorKind) -> Option<String> {
    match kind {
        ParseErrorKind::UnknownName { .. } => {
            Some("arguments are named arg0, arg1, ...; locals loc0, loc1, ...".to_string())
        }
        ParseErrorKind::UnknownCapability { .. } => {
            let names: Vec<String> = Capability::ALL
                .iter()
                .map(|cap| format!("@{}", cap.name()))
                .collect();
            Some(format!("available capabilities: {}", names.join(", ")))
        }
        ParseErrorKind::TypeMismatch { .. } => {
            Some("give literals a matching suffix (`L`, `s`, `b`) or compare like types".to_string())
        }
        ParseErrorKind::MaxDepthExceeded { .. } => {
            Some("raise the limit with `CompilationOptions::max_depth`".to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CompilationOptions, Type};
    use bumpalo::Bump;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_error_keeps_span_and_code() {
        let arena = Bump::new();
        let err = crate::compile_guard(
            &arena,
            "arg0 == missing",
            &[Type::I32],
            CompilationOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.span(), Some(8..15));
        assert_eq!(err.source_text(), Some("arg0 == missing"));
        match err {
            Error::Parse {
                kind_code, help, ..
            } => {
                assert_eq!(kind_code, "P002");
                assert!(help.is_some());
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_capability_lists_alternatives() {
        let arena = Bump::new();
        let err = crate::compile_guard(
            &arena,
            "@load(arg0) == @frob(arg0)",
            &[Type::I32],
            CompilationOptions::default(),
        )
        .unwrap_err();
        let Error::Parse { help, .. } = err else {
            panic!("expected parse error");
        };
        let help = help.unwrap();
        assert!(help.contains("@load"));
        assert!(help.contains("@rem"));
    }

    #[test]
    fn test_compile_error_is_not_spanned() {
        let arena = Bump::new();
        let err = crate::compile_guard(
            &arena,
            "arg0 + 1",
            &[Type::I32],
            CompilationOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Compile { .. }));
        assert_eq!(err.span(), None);
    }
}
