use bumpalo::Bump;
use lazy_static::lazy_static;
use pest::Parser;
use pest::iterators::Pair;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest_derive::Parser;
use tracing::debug;

use super::error::{ParseError, ParseErrorKind, convert_pest_error};
use super::scope::GuardScope;
use super::syntax::Span;
use crate::emit::Type;
use crate::expr::{
    BinaryOp, Capability, Carried, Constant, Expr, ExprBuilder, Literal, Member, ParamKind,
};
use crate::{String, ToString, Vec, format};

lazy_static! {
    // Note: precedence is defined lowest to highest.
    static ref PRATT_PARSER: PrattParser<Rule> = PrattParser::new()
        .op(Op::infix(Rule::or, Assoc::Left))                // `||`
        .op(Op::infix(Rule::and, Assoc::Left))               // `&&`
        .op(Op::infix(Rule::bit_or, Assoc::Left))            // `|`
        .op(Op::infix(Rule::xor, Assoc::Left))               // `^`
        .op(Op::infix(Rule::bit_and, Assoc::Left))           // `&`
        .op(
            Op::infix(Rule::eq, Assoc::Left) |
            Op::infix(Rule::ne, Assoc::Left)
        )                                                    // `==`, `!=`
        .op(
            Op::infix(Rule::lt, Assoc::Left) |
            Op::infix(Rule::le, Assoc::Left) |
            Op::infix(Rule::gt, Assoc::Left) |
            Op::infix(Rule::ge, Assoc::Left)
        )                                                    // `<`, `<=`, `>`, `>=`
        .op(
            Op::infix(Rule::shl, Assoc::Left) |
            Op::infix(Rule::shr, Assoc::Left)
        )                                                    // `<<`, `>>`
        .op(
            Op::infix(Rule::add, Assoc::Left) |
            Op::infix(Rule::sub, Assoc::Left)
        )                                                    // `+`, `-`
        .op(
            Op::infix(Rule::mul, Assoc::Left) |
            Op::infix(Rule::div, Assoc::Left) |
            Op::infix(Rule::rem, Assoc::Left)
        )                                                    // `*`, `/`, `%`
        ;
}

#[derive(Parser)]
#[grammar = "parser/guard.pest"]
pub struct GuardParser;

/// Default nesting limit for [`parse`], matching the compiler's default.
pub const DEFAULT_MAX_PARSE_DEPTH: usize = 256;

/// Parse guard text into an expression tree allocated in `arena`.
///
/// Names are resolved through `scope`; string literals are copied into the
/// arena, so `source` may be dropped afterwards.
pub fn parse<'a>(
    arena: &'a Bump,
    source: &str,
    scope: &GuardScope<'a>,
) -> Result<&'a Expr<'a>, ParseError> {
    parse_with_max_depth(arena, source, scope, DEFAULT_MAX_PARSE_DEPTH)
}

/// Like [`parse`], rejecting parentheses nested deeper than `max_depth`.
pub fn parse_with_max_depth<'a>(
    arena: &'a Bump,
    source: &str,
    scope: &GuardScope<'a>,
    max_depth: usize,
) -> Result<&'a Expr<'a>, ParseError> {
    check_nesting(source, max_depth)?;
    let mut pairs = GuardParser::parse(Rule::main, source).map_err(|e| {
        debug!("Pest parser failed with: {:?}", e);
        convert_pest_error(e)
    })?;
    let main = pairs.next().ok_or_else(|| missing_pair(Span::new(0, source.len())))?;
    let span = Span::from(main.as_span());
    let expression = main
        .into_inner()
        .next()
        .ok_or_else(|| missing_pair(span))?;

    let lowering = Lowering {
        builder: ExprBuilder::new(arena),
        scope,
        source,
    };
    let node = lowering.expression(expression)?;
    debug!(guard = %node.expr, "Parsed guard");
    Ok(node.expr)
}

/// Every nesting construct of the grammar opens a parenthesis, so counting
/// them bounds the recursion of both the grammar and the lowering.
fn check_nesting(source: &str, max_depth: usize) -> Result<(), ParseError> {
    let mut depth = 0usize;
    let mut quote = None;
    let mut escaped = false;
    for (at, c) in source.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => {
                depth += 1;
                if depth > max_depth {
                    return Err(ParseError::new(
                        ParseErrorKind::MaxDepthExceeded { max_depth },
                        Span::new(at, at + 1),
                    ));
                }
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn missing_pair(span: Span) -> ParseError {
    ParseError::new(
        ParseErrorKind::Syntax {
            expected: String::from("expression"),
        },
        span,
    )
}

/// A numeric literal written without a type suffix, whose type may still be
/// adjusted to that of the operand it meets.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Loose {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone)]
struct Node<'a> {
    expr: &'a Expr<'a>,
    span: Span,
    loose: Option<Loose>,
}

struct Lowering<'s, 'a> {
    builder: ExprBuilder<'a>,
    scope: &'s GuardScope<'a>,
    source: &'s str,
}

impl<'s, 'a> Lowering<'s, 'a> {
    fn node(&self, expr: Expr<'a>, span: Span) -> Node<'a> {
        Node {
            expr: self.builder.alloc(expr),
            span,
            loose: None,
        }
    }

    fn expression(&self, pair: Pair<'_, Rule>) -> Result<Node<'a>, ParseError> {
        match pair.as_rule() {
            Rule::expression => PRATT_PARSER
                .map_primary(|primary| self.expression(primary))
                .map_infix(|lhs, op, rhs| {
                    let op = match op.as_rule() {
                        Rule::or => BinaryOp::Or,
                        Rule::and => BinaryOp::And,
                        Rule::bit_or => BinaryOp::BitOr,
                        Rule::xor => BinaryOp::Xor,
                        Rule::bit_and => BinaryOp::BitAnd,
                        Rule::eq => BinaryOp::Eq,
                        Rule::ne => BinaryOp::Ne,
                        Rule::lt => BinaryOp::Lt,
                        Rule::le => BinaryOp::Le,
                        Rule::gt => BinaryOp::Gt,
                        Rule::ge => BinaryOp::Ge,
                        Rule::shl => BinaryOp::Shl,
                        Rule::shr => BinaryOp::Shr,
                        Rule::add => BinaryOp::Add,
                        Rule::sub => BinaryOp::Sub,
                        Rule::mul => BinaryOp::Mul,
                        Rule::div => BinaryOp::Div,
                        Rule::rem => BinaryOp::Rem,
                        rule => {
                            return Err(unhandled(rule, Span::from(op.as_span())));
                        }
                    };
                    self.binary(op, lhs?, rhs?)
                })
                .parse(pair.into_inner()),

            Rule::grouped => {
                let span = Span::from(pair.as_span());
                let inner = pair.into_inner().next().ok_or_else(|| missing_pair(span.clone()))?;
                let mut node = self.expression(inner)?;
                node.span = span;
                Ok(node)
            }

            Rule::ident => {
                let span = Span::from(pair.as_span());
                let member = self.scope.resolve(pair.as_str()).ok_or_else(|| {
                    ParseError::new(
                        ParseErrorKind::UnknownName {
                            name: pair.as_str().to_string(),
                        },
                        span.clone(),
                    )
                })?;
                Ok(self.node(Expr::Member(member), span))
            }

            Rule::method_call => self.method_call(pair),
            Rule::capability_call => self.capability_call(pair),

            Rule::null
            | Rule::boolean
            | Rule::integer
            | Rule::float
            | Rule::character
            | Rule::string => self.literal(pair),

            rule => Err(unhandled(rule, Span::from(pair.as_span()))),
        }
    }

    fn binary(&self, op: BinaryOp, lhs: Node<'a>, rhs: Node<'a>) -> Result<Node<'a>, ParseError> {
        let (lhs, rhs) = if op.is_logical() {
            (lhs, rhs)
        } else {
            let (lhs, rhs) = self.unify(lhs, rhs)?;
            if !matches!(op, BinaryOp::Shl | BinaryOp::Shr) {
                check_operands(&lhs, &rhs)?;
            }
            (lhs, rhs)
        };
        let span = Span::combine(&lhs.span, &rhs.span);
        Ok(self.node(
            Expr::Binary {
                op,
                left: lhs.expr,
                right: rhs.expr,
            },
            span,
        ))
    }

    /// Give a loose literal on one side the type of the other side.
    fn unify(&self, lhs: Node<'a>, rhs: Node<'a>) -> Result<(Node<'a>, Node<'a>), ParseError> {
        match (lhs.loose, rhs.loose) {
            (Some(_), None) => {
                let ty = rhs.expr.ty();
                Ok((self.coerce(lhs, ty)?, rhs))
            }
            (None, Some(_)) => {
                let ty = lhs.expr.ty();
                Ok((lhs, self.coerce(rhs, ty)?))
            }
            _ => Ok((lhs, rhs)),
        }
    }

    fn coerce(&self, node: Node<'a>, ty: Type<'a>) -> Result<Node<'a>, ParseError> {
        let Some(loose) = node.loose else {
            return Ok(node);
        };
        let out_of_range = || {
            ParseError::new(
                ParseErrorKind::InvalidLiteral {
                    text: node.span.str_of(self.source).to_string(),
                    reason: format!("does not fit in `{}`", ty),
                },
                node.span.clone(),
            )
        };
        let literal = match (loose, ty) {
            (Loose::Int(v), Type::U8) => Literal::U8(u8::try_from(v).map_err(|_| out_of_range())?),
            (Loose::Int(v), Type::I8) => Literal::I8(i8::try_from(v).map_err(|_| out_of_range())?),
            (Loose::Int(v), Type::I16) => {
                Literal::I16(i16::try_from(v).map_err(|_| out_of_range())?)
            }
            (Loose::Int(v), Type::U16) => {
                Literal::U16(u16::try_from(v).map_err(|_| out_of_range())?)
            }
            (Loose::Int(v), Type::I32) => {
                Literal::I32(i32::try_from(v).map_err(|_| out_of_range())?)
            }
            (Loose::Int(v), Type::Char) => Literal::Char(
                u32::try_from(v)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(out_of_range)?,
            ),
            (Loose::Int(v), Type::I64) => Literal::I64(v),
            (Loose::Int(v), Type::F32) => Literal::F32(v as f32),
            (Loose::Int(v), Type::F64) => Literal::F64(v as f64),
            (Loose::Float(x), Type::F32) => Literal::F32(x as f32),
            _ => return Ok(node),
        };
        Ok(self.node(Expr::Constant(Constant::Literal(literal)), node.span))
    }

    fn arguments(&self, pairs: pest::iterators::Pairs<'_, Rule>) -> Result<Vec<Node<'a>>, ParseError> {
        pairs.map(|pair| self.expression(pair)).collect()
    }

    fn method_call(&self, pair: Pair<'_, Rule>) -> Result<Node<'a>, ParseError> {
        let span = Span::from(pair.as_span());
        let mut inner = pair.into_inner();
        let name = inner.next().ok_or_else(|| missing_pair(span.clone()))?;
        let (method, returns) = self.scope.method(name.as_str()).ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::UnknownName {
                    name: name.as_str().to_string(),
                },
                Span::from(name.as_span()),
            )
        })?;
        let args: Vec<&'a Expr<'a>> = self.arguments(inner)?.iter().map(|n| n.expr).collect();
        Ok(Node {
            expr: self.builder.call(method, &args, returns),
            span,
            loose: None,
        })
    }

    fn capability_call(&self, pair: Pair<'_, Rule>) -> Result<Node<'a>, ParseError> {
        let span = Span::from(pair.as_span());
        let mut inner = pair.into_inner();
        let name = inner.next().ok_or_else(|| missing_pair(span.clone()))?;
        let capability = Capability::from_name(name.as_str()).ok_or_else(|| {
            ParseError::new(
                ParseErrorKind::UnknownCapability {
                    name: name.as_str().to_string(),
                },
                Span::from(name.as_span()),
            )
        })?;
        let mut args = self.arguments(inner)?;

        // Loose literals take the type of their partner argument.
        if let [first, second] = args.as_mut_slice() {
            let (a, b) = self.unify(first.clone(), second.clone())?;
            if matches!(
                capability,
                Capability::Add | Capability::Subtract | Capability::Remainder
            ) {
                check_operands(&a, &b)?;
            }
            *first = a;
            *second = b;
        }

        let params = capability.params();
        let exprs: Vec<&'a Expr<'a>> = args
            .iter()
            .enumerate()
            .map(|(position, node)| match params.get(position) {
                Some(ParamKind::Target) => self.as_target(node.expr),
                _ => node.expr,
            })
            .collect();

        let ty = match capability {
            Capability::Load => exprs.first().map_or(Type::Void, |e| e.ty()),
            Capability::Store | Capability::Increment | Capability::Decrement => Type::Void,
            Capability::Add | Capability::Subtract | Capability::Remainder => {
                exprs.first().map_or(Type::Void, |e| e.ty())
            }
        };
        Ok(Node {
            expr: self.builder.capability(capability, &exprs, ty),
            span,
            loose: None,
        })
    }

    /// A member named in target position is carried as a reference rather
    /// than loaded; anything else is left for the compiler to reject.
    fn as_target(&self, expr: &'a Expr<'a>) -> &'a Expr<'a> {
        match *expr {
            Expr::Member(Member::Arg(arg)) => self.builder.carried(Carried::Arg(arg)),
            Expr::Member(Member::Local(local)) => self.builder.carried(Carried::Local(local)),
            Expr::Member(Member::Field(field)) => self.builder.carried(Carried::Field(field)),
            _ => expr,
        }
    }

    fn literal(&self, pair: Pair<'_, Rule>) -> Result<Node<'a>, ParseError> {
        let span = Span::from(pair.as_span());
        let text = pair.as_str();
        let invalid = |reason: &str| {
            ParseError::new(
                ParseErrorKind::InvalidLiteral {
                    text: text.to_string(),
                    reason: reason.to_string(),
                },
                span.clone(),
            )
        };

        let (literal, loose) = match pair.as_rule() {
            Rule::null => (Literal::Null, None),
            Rule::boolean => (Literal::Bool(text == "true"), None),
            Rule::integer => {
                let (digits, suffix) = match text.as_bytes().last() {
                    Some(b'L' | b's' | b'b') => text.split_at(text.len() - 1),
                    _ => (text, ""),
                };
                let value: i64 = digits
                    .parse()
                    .map_err(|_| invalid("out of range for a 64-bit integer"))?;
                match suffix {
                    "L" => (Literal::I64(value), None),
                    "s" => (
                        Literal::I16(
                            i16::try_from(value).map_err(|_| invalid("out of range for `i16`"))?,
                        ),
                        None,
                    ),
                    "b" => (
                        Literal::U8(
                            u8::try_from(value).map_err(|_| invalid("out of range for `u8`"))?,
                        ),
                        None,
                    ),
                    _ => match i32::try_from(value) {
                        Ok(narrow) => (Literal::I32(narrow), Some(Loose::Int(value))),
                        Err(_) => (Literal::I64(value), Some(Loose::Int(value))),
                    },
                }
            }
            Rule::float => match text.strip_suffix('f') {
                Some(digits) => {
                    let value: f32 = digits.parse().map_err(|_| invalid("malformed float"))?;
                    (Literal::F32(value), None)
                }
                None => {
                    let value: f64 = text.parse().map_err(|_| invalid("malformed float"))?;
                    (Literal::F64(value), Some(Loose::Float(value)))
                }
            },
            Rule::character => {
                let body = unescape(&text[1..text.len() - 1]).ok_or_else(|| invalid("bad escape"))?;
                let mut chars = body.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => (Literal::Char(c), None),
                    _ => return Err(invalid("expected exactly one character")),
                }
            }
            Rule::string => {
                let body = unescape(&text[1..text.len() - 1]).ok_or_else(|| invalid("bad escape"))?;
                let interned = self.builder.arena().alloc_str(&body);
                (Literal::Str(interned), None)
            }
            rule => return Err(unhandled(rule, span.clone())),
        };

        Ok(Node {
            expr: self.builder.literal(literal),
            span,
            loose,
        })
    }
}

/// Two operands can meet in one instruction when they share a stack type:
/// every `int32`-slot type together, and any two references.
fn check_operands(lhs: &Node<'_>, rhs: &Node<'_>) -> Result<(), ParseError> {
    let (left, right) = (lhs.expr.ty(), rhs.expr.ty());
    let compatible = left == right
        || (left.is_int32_slot() && right.is_int32_slot())
        || (left.is_reference() && right.is_reference());
    if compatible {
        return Ok(());
    }
    Err(ParseError::new(
        ParseErrorKind::TypeMismatch {
            left: left.to_string(),
            right: right.to_string(),
        },
        Span::combine(&lhs.span, &rhs.span),
    ))
}

fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        out.push(match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            other @ ('"' | '\\' | '\'') => other,
            _ => return None,
        });
    }
    Some(out)
}

fn unhandled(rule: Rule, span: Span) -> ParseError {
    ParseError::new(
        ParseErrorKind::Syntax {
            expected: format!("expression, found {:?}", rule),
        },
        span,
    )
}
