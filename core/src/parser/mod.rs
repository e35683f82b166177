pub mod error;
pub mod parser;
mod scope;
mod syntax;

// Re-export the parser and rule enum for external use
pub use parser::GuardParser;
pub use parser::Rule;
pub use parser::{DEFAULT_MAX_PARSE_DEPTH, parse, parse_with_max_depth};

pub use error::{ParseError, ParseErrorKind};
pub use scope::GuardScope;
pub use syntax::Span;
