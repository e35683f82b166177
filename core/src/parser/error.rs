use thiserror::Error;

use crate::parser::{Rule, Span};
use crate::{String, Vec, format};

/// A guard that could not be turned into an expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    /// Input does not match the grammar.
    #[error("expected {expected}")]
    Syntax { expected: String },

    /// Identifier or method not declared in the guard scope.
    #[error("unknown name `{name}`")]
    UnknownName { name: String },

    #[error("unknown capability `@{name}`")]
    UnknownCapability { name: String },

    /// Literal text out of range, or not representable in the peer type.
    #[error("invalid literal `{text}`: {reason}")]
    InvalidLiteral { text: String, reason: String },

    #[error("nesting depth exceeds maximum of {max_depth} levels")]
    MaxDepthExceeded { max_depth: usize },

    /// Operands whose stack types cannot meet in one instruction.
    #[error("mismatched operand types `{left}` and `{right}`")]
    TypeMismatch { left: String, right: String },
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Short code identifying the error kind.
    pub fn code(&self) -> &'static str {
        match self.kind {
            ParseErrorKind::Syntax { .. } => "P001",
            ParseErrorKind::UnknownName { .. } => "P002",
            ParseErrorKind::UnknownCapability { .. } => "P003",
            ParseErrorKind::InvalidLiteral { .. } => "P004",
            ParseErrorKind::MaxDepthExceeded { .. } => "P005",
            ParseErrorKind::TypeMismatch { .. } => "P006",
        }
    }
}

/// Convert a pest error into a [`ParseError`] with a readable expectation.
pub fn convert_pest_error(err: pest::error::Error<Rule>) -> ParseError {
    use pest::error::{ErrorVariant, InputLocation};

    let span = match err.location {
        InputLocation::Pos(pos) => Span(pos..pos),
        InputLocation::Span((start, end)) => Span(start..end),
    };
    let expected = match err.variant {
        ErrorVariant::ParsingError { positives, .. } => format_expected_rules(&positives),
        ErrorVariant::CustomError { message } => message,
    };
    ParseError::new(ParseErrorKind::Syntax { expected }, span)
}

fn format_expected_rules(rules: &[Rule]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for rule in rules {
        let name = rule_name(*rule);
        if !names.contains(&name) {
            names.push(name);
        }
    }
    match names.as_slice() {
        [] => String::from("a valid guard"),
        [one] => String::from(*one),
        [init @ .., last] => format!("{} or {}", init.join(", "), last),
    }
}

fn rule_name(rule: Rule) -> &'static str {
    match rule {
        Rule::EOI => "end of input",
        Rule::expression | Rule::grouped => "expression",
        Rule::or
        | Rule::and
        | Rule::bit_or
        | Rule::xor
        | Rule::bit_and
        | Rule::eq
        | Rule::ne
        | Rule::shl
        | Rule::shr
        | Rule::le
        | Rule::ge
        | Rule::lt
        | Rule::gt
        | Rule::add
        | Rule::sub
        | Rule::mul
        | Rule::div
        | Rule::rem => "operator",
        Rule::null
        | Rule::boolean
        | Rule::float
        | Rule::integer
        | Rule::character
        | Rule::string => "literal",
        Rule::ident | Rule::method_call | Rule::capability_call => "identifier",
        _ => "expression",
    }
}
