//! Parser implementation: converts pest output to AST

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use crate::ast::*;
use crate::error::{ParseError, ParseResult};

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct DilParser;

/// Parse a DIL program from source text
pub fn parse_program(source: &str) -> ParseResult<Program> {
    let mut pairs = DilParser::parse(Rule::program, source)?;
    let pair = next_pair(&mut pairs, "program")?;
    build_program(pair)
}

/// Parse a single expression (requires full input consumption)
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut pairs = DilParser::parse(Rule::standalone_expression, source)?;
    let pair = next_pair(&mut pairs, "expression")?;
    // The standalone_expression contains SOI ~ expression ~ EOI, extract the expression
    let inner = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::expression)
        .ok_or_else(|| ParseError::UnexpectedToken("expected expression".to_string()))?;
    build_expression(inner)
}

// =============================================================================
// Helper functions
// =============================================================================

fn span_from_pair(pair: &Pair<Rule>) -> Span {
    let pest_span = pair.as_span();
    Span::new(pest_span.start(), pest_span.end())
}

/// Take the next child pair; the grammar guarantees its presence, so a miss is a bug
/// in the grammar rather than in the input.
fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, what: &str) -> ParseResult<Pair<'i, Rule>> {
    pairs
        .next()
        .ok_or_else(|| ParseError::UnexpectedToken(format!("expected {}", what)))
}

// =============================================================================
// Statements
// =============================================================================

fn build_program(pair: Pair<Rule>) -> ParseResult<Program> {
    debug_assert_eq!(pair.as_rule(), Rule::program);
    let span = span_from_pair(&pair);

    let mut statements = Vec::new();
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::statement => statements.push(build_statement(inner)?),
            _ => {}
        }
    }

    Ok(Program { statements, span })
}

fn build_statement(pair: Pair<Rule>) -> ParseResult<Stmt> {
    debug_assert_eq!(pair.as_rule(), Rule::statement);
    let span = span_from_pair(&pair);

    let inner = next_pair(&mut pair.into_inner(), "statement")?;
    let kind = match inner.as_rule() {
        Rule::class_decl => StmtKind::Class(build_class_decl(inner)?),
        Rule::let_stmt => {
            let mut parts = inner.into_inner();
            let name = build_identifier(next_pair(&mut parts, "binding name")?);
            let value = build_expression(next_pair(&mut parts, "expression")?)?;
            StmtKind::Let { name, value }
        }
        Rule::get_stmt => {
            let expr = next_pair(&mut inner.into_inner(), "expression")?;
            StmtKind::Get(build_expression(expr)?)
        }
        Rule::assign_stmt => build_assignment(inner)?,
        Rule::if_stmt => build_if(inner)?,
        Rule::foreach_stmt => build_foreach(inner)?,
        Rule::for_stmt => build_for(inner)?,
        rule => return Err(ParseError::UnexpectedToken(format!("{:?}", rule))),
    };

    Ok(Stmt { kind, span })
}

fn build_block(pair: Pair<Rule>) -> ParseResult<Vec<Stmt>> {
    debug_assert_eq!(pair.as_rule(), Rule::block);
    pair.into_inner().map(build_statement).collect()
}

fn build_if(pair: Pair<Rule>) -> ParseResult<StmtKind> {
    debug_assert_eq!(pair.as_rule(), Rule::if_stmt);

    let mut inner = pair.into_inner();
    let condition = build_expression(next_pair(&mut inner, "condition")?)?;
    let then_branch = build_block(next_pair(&mut inner, "IF body")?)?;
    let else_branch = match inner.next() {
        Some(clause) => build_block(next_pair(&mut clause.into_inner(), "ELSE body")?)?,
        None => Vec::new(),
    };

    Ok(StmtKind::If {
        condition,
        then_branch,
        else_branch,
    })
}

fn build_foreach(pair: Pair<Rule>) -> ParseResult<StmtKind> {
    debug_assert_eq!(pair.as_rule(), Rule::foreach_stmt);

    let mut value = None;
    let mut key = None;
    let mut iterable = None;
    let mut body = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier if value.is_none() => value = Some(build_identifier(inner)),
            Rule::identifier => key = Some(build_identifier(inner)),
            Rule::expression => iterable = Some(build_expression(inner)?),
            Rule::block => body = Some(build_block(inner)?),
            _ => {}
        }
    }

    match (value, iterable, body) {
        (Some(value), Some(iterable), Some(body)) => Ok(StmtKind::ForEach {
            value,
            key,
            iterable,
            body,
        }),
        _ => Err(ParseError::UnexpectedToken("incomplete FOREACH".to_string())),
    }
}

fn build_for(pair: Pair<Rule>) -> ParseResult<StmtKind> {
    debug_assert_eq!(pair.as_rule(), Rule::for_stmt);

    let mut inner = pair.into_inner();
    let counter = build_identifier(next_pair(&mut inner, "loop variable")?);
    let condition = build_expression(next_pair(&mut inner, "condition")?)?;
    let body = build_block(next_pair(&mut inner, "FOR body")?)?;

    Ok(StmtKind::For {
        counter,
        condition,
        body,
    })
}

fn build_assignment(pair: Pair<Rule>) -> ParseResult<StmtKind> {
    debug_assert_eq!(pair.as_rule(), Rule::assign_stmt);

    let mut target = None;
    let mut segments = Vec::new();
    let mut value = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::identifier => target = Some(build_identifier(inner)),
            Rule::field_segment | Rule::index_segment => segments.push(build_segment(inner)?),
            Rule::expression => value = Some(build_expression(inner)?),
            _ => {}
        }
    }

    match (target, value) {
        (Some(target), Some(value)) => Ok(StmtKind::Assign {
            target,
            segments,
            value,
        }),
        _ => Err(ParseError::UnexpectedToken(
            "incomplete assignment".to_string(),
        )),
    }
}

fn build_class_decl(pair: Pair<Rule>) -> ParseResult<ClassDecl> {
    debug_assert_eq!(pair.as_rule(), Rule::class_decl);
    let span = span_from_pair(&pair);

    let mut inner = pair.into_inner();
    let name = build_identifier(next_pair(&mut inner, "class name")?);
    let fields = inner
        .filter(|p| p.as_rule() == Rule::field_decl)
        .map(build_field_decl)
        .collect::<ParseResult<Vec<_>>>()?;

    Ok(ClassDecl { name, fields, span })
}

fn build_field_decl(pair: Pair<Rule>) -> ParseResult<FieldDecl> {
    debug_assert_eq!(pair.as_rule(), Rule::field_decl);
    let span = span_from_pair(&pair);

    let mut inner = pair.into_inner();
    let name = build_identifier(next_pair(&mut inner, "field name")?);
    let default = build_arith_expr(next_pair(&mut inner, "field default")?)?;

    let mut ty = None;
    let mut overwrite = false;
    for part in inner {
        match part.as_rule() {
            Rule::type_suffix => ty = Some(build_type_suffix(part)?),
            Rule::overwrite_modifier => overwrite = true,
            _ => {}
        }
    }

    Ok(FieldDecl {
        name,
        default,
        ty,
        overwrite,
        span,
    })
}

// =============================================================================
// Expressions
// =============================================================================

fn build_expression(pair: Pair<Rule>) -> ParseResult<Expr> {
    debug_assert_eq!(pair.as_rule(), Rule::expression);
    let span = span_from_pair(&pair);

    let mut inner = pair.into_inner();
    let value = build_arith_expr(next_pair(&mut inner, "expression")?)?;

    match inner.next() {
        Some(suffix) => {
            let ty = build_type_suffix(suffix)?;
            Ok(Expr::new(
                ExprKind::As {
                    value: Box::new(value),
                    ty,
                },
                span,
            ))
        }
        None => Ok(value),
    }
}

fn build_type_suffix(pair: Pair<Rule>) -> ParseResult<Spanned<TypeTag>> {
    debug_assert_eq!(pair.as_rule(), Rule::type_suffix);

    let name = next_pair(&mut pair.into_inner(), "type name")?;
    let span = span_from_pair(&name);
    let text = name.as_str();
    TypeTag::from_name(text)
        .map(|tag| Spanned::new(tag, span))
        .ok_or_else(|| ParseError::UnknownType {
            name: text.to_string(),
            span,
        })
}

fn build_arith_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    debug_assert_eq!(pair.as_rule(), Rule::arith_expr);

    let mut inner = pair.into_inner();
    let left = build_prefix_expr(next_pair(&mut inner, "operand")?)?;

    // Collect all operators and operands
    let mut ops_and_exprs: Vec<(BinaryOp, Expr)> = Vec::new();
    while let Some(op_pair) = inner.next() {
        let op = parse_binary_op(&op_pair)?;
        let right = build_prefix_expr(next_pair(&mut inner, "operand")?)?;
        ops_and_exprs.push((op, right));
    }

    if ops_and_exprs.is_empty() {
        return Ok(left);
    }

    build_expr_with_precedence(left, ops_and_exprs)
}

/// Fold a flat `operand (op operand)*` list into a tree, highest precedence first
fn build_expr_with_precedence(
    left: Expr,
    ops_and_exprs: Vec<(BinaryOp, Expr)>,
) -> ParseResult<Expr> {
    let mut exprs: Vec<Expr> = vec![left];
    let mut ops: Vec<BinaryOp> = Vec::with_capacity(ops_and_exprs.len());

    for (op, expr) in ops_and_exprs {
        ops.push(op);
        exprs.push(expr);
    }

    for precedence in (1..=BinaryOp::MAX_PRECEDENCE).rev() {
        let mut i = 0;
        while i < ops.len() {
            let op = ops[i];
            if op.precedence() == precedence {
                let left_expr = exprs.remove(i);
                let right_expr = exprs.remove(i);
                let span = left_expr.span.merge(right_expr.span);

                let combined = Expr::new(
                    ExprKind::Binary {
                        op,
                        left: Box::new(left_expr),
                        right: Box::new(right_expr),
                    },
                    span,
                );
                exprs.insert(i, combined);
                ops.remove(i);
            } else {
                i += 1;
            }
        }
    }

    debug_assert!(ops.is_empty());
    exprs
        .pop()
        .ok_or_else(|| ParseError::UnexpectedToken("empty expression".to_string()))
}

fn parse_binary_op(pair: &Pair<Rule>) -> ParseResult<BinaryOp> {
    let op_str = pair.as_str().trim();
    let op = match op_str {
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        "%" => BinaryOp::Mod,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::Ne,
        "<" => BinaryOp::Lt,
        "<=" => BinaryOp::Le,
        ">" => BinaryOp::Gt,
        ">=" => BinaryOp::Ge,
        "&&" => BinaryOp::And,
        "||" => BinaryOp::Or,
        "&" => BinaryOp::BitAnd,
        "|" => BinaryOp::BitOr,
        _ => return Err(ParseError::UnknownOperator(op_str.to_string())),
    };
    Ok(op)
}

fn build_prefix_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    debug_assert_eq!(pair.as_rule(), Rule::prefix_expr);
    let span = span_from_pair(&pair);

    let mut ops = Vec::new();
    let mut expr = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::unary_op => ops.push(match inner.as_str() {
                "!" => UnaryOp::Not,
                _ => UnaryOp::Neg,
            }),
            Rule::postfix_expr => expr = Some(build_postfix_expr(inner)?),
            _ => {}
        }
    }

    let mut expr =
        expr.ok_or_else(|| ParseError::UnexpectedToken("expected operand".to_string()))?;
    // The operator nearest the operand applies first
    for op in ops.into_iter().rev() {
        expr = Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(expr),
            },
            span,
        );
    }

    Ok(expr)
}

fn build_postfix_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    debug_assert_eq!(pair.as_rule(), Rule::postfix_expr);
    let span = span_from_pair(&pair);

    let mut inner = pair.into_inner();
    let base = build_primary_expr(next_pair(&mut inner, "primary expression")?)?;
    let segments = inner.map(build_segment).collect::<ParseResult<Vec<_>>>()?;

    if segments.is_empty() {
        return Ok(base);
    }

    Ok(Expr::new(
        ExprKind::Path {
            base: Box::new(base),
            segments,
        },
        span,
    ))
}

fn build_segment(pair: Pair<Rule>) -> ParseResult<Segment> {
    match pair.as_rule() {
        Rule::field_segment => {
            let ident = next_pair(&mut pair.into_inner(), "field name")?;
            Ok(Segment::Field(build_identifier(ident)))
        }
        Rule::index_segment => {
            let expr = next_pair(&mut pair.into_inner(), "index expression")?;
            Ok(Segment::Index(build_expression(expr)?))
        }
        rule => Err(ParseError::UnexpectedToken(format!("{:?}", rule))),
    }
}

fn build_primary_expr(pair: Pair<Rule>) -> ParseResult<Expr> {
    debug_assert_eq!(pair.as_rule(), Rule::primary_expr);
    let span = span_from_pair(&pair);

    let inner = next_pair(&mut pair.into_inner(), "primary expression")?;
    let kind = match inner.as_rule() {
        Rule::null_literal => ExprKind::Null,
        Rule::bool_literal => ExprKind::Bool(inner.as_str().trim() == "true"),
        Rule::int_literal => ExprKind::Int(parse_int_literal(inner.as_str())?),
        Rule::float_literal => {
            let text = inner.as_str();
            let value = text
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| ParseError::InvalidNumber(text.to_string()))?;
            ExprKind::Float(value)
        }
        Rule::string_literal => ExprKind::String(build_string_literal(inner)?),
        Rule::map_literal => ExprKind::Map(build_map_literal(inner)?),
        Rule::array_literal => ExprKind::Array(
            inner
                .into_inner()
                .map(build_expression)
                .collect::<ParseResult<Vec<_>>>()?,
        ),
        Rule::new_expr => {
            let class = next_pair(&mut inner.into_inner(), "class name")?;
            ExprKind::New(build_identifier(class))
        }
        Rule::identifier => ExprKind::Identifier(inner.as_str().to_string()),
        Rule::paren_expr => {
            let expr = next_pair(&mut inner.into_inner(), "expression")?;
            ExprKind::Parenthesized(Box::new(build_expression(expr)?))
        }
        rule => return Err(ParseError::UnexpectedToken(format!("{:?}", rule))),
    };

    Ok(Expr::new(kind, span))
}

fn build_map_literal(pair: Pair<Rule>) -> ParseResult<Vec<MapEntry>> {
    debug_assert_eq!(pair.as_rule(), Rule::map_literal);

    let mut entries = Vec::new();
    for entry in pair.into_inner() {
        let mut parts = entry.into_inner();
        let key_pair = next_pair(&mut parts, "map key")?;
        let key_span = span_from_pair(&key_pair);
        let key_inner = next_pair(&mut key_pair.into_inner(), "map key")?;
        let key = match key_inner.as_rule() {
            Rule::string_literal => Spanned::new(build_string_literal(key_inner)?, key_span),
            _ => build_identifier(key_inner),
        };
        let value = build_expression(next_pair(&mut parts, "map value")?)?;
        entries.push(MapEntry { key, value });
    }

    Ok(entries)
}

// =============================================================================
// Literals
// =============================================================================

fn build_string_literal(pair: Pair<Rule>) -> ParseResult<String> {
    debug_assert_eq!(pair.as_rule(), Rule::string_literal);
    match pair.into_inner().next() {
        Some(inner) => unescape(inner.as_str()),
        None => Ok(String::new()),
    }
}

fn unescape(s: &str) -> ParseResult<String> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('0') => result.push('\0'),
                Some('u') => {
                    if chars.next() != Some('{') {
                        return Err(ParseError::InvalidEscape(s.to_string()));
                    }
                    let mut hex = String::new();
                    for c in chars.by_ref() {
                        if c == '}' {
                            break;
                        }
                        hex.push(c);
                    }
                    let code = u32::from_str_radix(&hex, 16)
                        .map_err(|_| ParseError::InvalidEscape(s.to_string()))?;
                    let ch = char::from_u32(code)
                        .ok_or_else(|| ParseError::InvalidEscape(s.to_string()))?;
                    result.push(ch);
                }
                _ => return Err(ParseError::InvalidEscape(s.to_string())),
            }
        } else {
            result.push(c);
        }
    }

    Ok(result)
}

fn build_identifier(pair: Pair<Rule>) -> Identifier {
    Spanned::new(pair.as_str().to_string(), span_from_pair(&pair))
}

fn parse_int_literal(text: &str) -> ParseResult<i64> {
    let text = text.replace('_', "");

    if text.starts_with("0x") || text.starts_with("0X") {
        i64::from_str_radix(&text[2..], 16).map_err(|_| ParseError::InvalidNumber(text.clone()))
    } else if text.starts_with("0b") || text.starts_with("0B") {
        i64::from_str_radix(&text[2..], 2).map_err(|_| ParseError::InvalidNumber(text.clone()))
    } else {
        text.parse::<i64>()
            .map_err(|_| ParseError::InvalidNumber(text.clone()))
    }
}
