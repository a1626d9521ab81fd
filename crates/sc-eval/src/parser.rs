use winnow::ascii::multispace0;
use winnow::combinator::{alt, cut_err, opt, separated};
use winnow::error::{ContextError, ErrMode, StrContext, StrContextValue};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

use crate::ast::{BinOp, Expr, FieldRef, Stmt};
use sc_core::EvalError;

// ---------------------------------------------------------------------------
// Lexical primitives
// ---------------------------------------------------------------------------

fn ident<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    if !input.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_').parse_next(input)
}

fn kw<'a>(keyword: &'static str) -> impl FnMut(&mut &'a str) -> ModalResult<()> {
    move |input: &mut &'a str| {
        let saved = *input;
        literal(keyword).parse_next(input)?;
        if input.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_') {
            *input = saved;
            return Err(ErrMode::Backtrack(ContextError::new()));
        }
        Ok(())
    }
}

fn ws_skip(input: &mut &str) -> ModalResult<()> {
    multispace0.void().parse_next(input)
}

fn quoted_string(input: &mut &str) -> ModalResult<String> {
    literal("\"").parse_next(input)?;
    let content = take_while(0.., |c: char| c != '"').parse_next(input)?;
    cut_err(literal("\""))
        .context(StrContext::Expected(StrContextValue::Description("closing quote")))
        .parse_next(input)?;
    Ok(content.to_string())
}

fn number_literal(input: &mut &str) -> ModalResult<f64> {
    let integer_part = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let has_dot = opt(literal(".")).parse_next(input)?.is_some();
    if has_dot {
        let frac_part = take_while(1.., |c: char| c.is_ascii_digit())
            .context(StrContext::Expected(StrContextValue::Description("digits after decimal point")))
            .parse_next(input)?;
        format!("{integer_part}.{frac_part}").parse().map_err(|_| ErrMode::Cut(ContextError::new()))
    } else {
        integer_part.parse().map_err(|_| ErrMode::Cut(ContextError::new()))
    }
}

// ---------------------------------------------------------------------------
// Expressions, lowest to highest precedence
// ---------------------------------------------------------------------------

fn or_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut left = and_expr.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        if opt(literal("||")).parse_next(input)?.is_some() {
            ws_skip.parse_next(input)?;
            let right = cut_err(and_expr).parse_next(input)?;
            left = Expr::BinOp { op: BinOp::Or, left: Box::new(left), right: Box::new(right) };
        } else {
            break;
        }
    }
    Ok(left)
}

fn and_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut left = cmp_expr.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        if opt(literal("&&")).parse_next(input)?.is_some() {
            ws_skip.parse_next(input)?;
            let right = cut_err(cmp_expr).parse_next(input)?;
            left = Expr::BinOp { op: BinOp::And, left: Box::new(left), right: Box::new(right) };
        } else {
            break;
        }
    }
    Ok(left)
}

fn cmp_op(input: &mut &str) -> ModalResult<BinOp> {
    alt((
        literal("==").value(BinOp::Eq),
        literal("!=").value(BinOp::Ne),
        literal("<=").value(BinOp::Le),
        literal(">=").value(BinOp::Ge),
        literal("<").value(BinOp::Lt),
        literal(">").value(BinOp::Gt),
    ))
    .parse_next(input)
}

fn cmp_expr(input: &mut &str) -> ModalResult<Expr> {
    let left = add_expr.parse_next(input)?;
    ws_skip.parse_next(input)?;
    if let Some(op) = opt(cmp_op).parse_next(input)? {
        ws_skip.parse_next(input)?;
        let right = cut_err(add_expr).parse_next(input)?;
        return Ok(Expr::BinOp { op, left: Box::new(left), right: Box::new(right) });
    }
    Ok(left)
}

fn add_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut left = mul_expr.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        let op = opt(alt((literal("+").value(BinOp::Add), literal("-").value(BinOp::Sub)))).parse_next(input)?;
        if let Some(op) = op {
            ws_skip.parse_next(input)?;
            let right = cut_err(mul_expr).parse_next(input)?;
            left = Expr::BinOp { op, left: Box::new(left), right: Box::new(right) };
        } else {
            break;
        }
    }
    Ok(left)
}

fn mul_expr(input: &mut &str) -> ModalResult<Expr> {
    let mut left = unary_expr.parse_next(input)?;
    loop {
        ws_skip.parse_next(input)?;
        let op = opt(alt((
            literal("*").value(BinOp::Mul),
            literal("/").value(BinOp::Div),
            literal("%").value(BinOp::Mod),
        )))
        .parse_next(input)?;
        if let Some(op) = op {
            ws_skip.parse_next(input)?;
            let right = cut_err(unary_expr).parse_next(input)?;
            left = Expr::BinOp { op, left: Box::new(left), right: Box::new(right) };
        } else {
            break;
        }
    }
    Ok(left)
}

fn unary_expr(input: &mut &str) -> ModalResult<Expr> {
    if opt(literal("-")).parse_next(input)?.is_some() {
        ws_skip.parse_next(input)?;
        return Ok(Expr::Neg(Box::new(primary.parse_next(input)?)));
    }
    if opt(alt((kw("not"), literal("!").void()))).parse_next(input)?.is_some() {
        ws_skip.parse_next(input)?;
        return Ok(Expr::Not(Box::new(unary_expr.parse_next(input)?)));
    }
    primary.parse_next(input)
}

fn primary(input: &mut &str) -> ModalResult<Expr> {
    alt((
        number_literal.map(Expr::Number),
        quoted_string.map(Expr::StringLit),
        kw("true").map(|_| Expr::Bool(true)),
        kw("false").map(|_| Expr::Bool(false)),
        paren_expr,
        ident_primary,
    ))
    .context(StrContext::Expected(StrContextValue::Description("expression")))
    .parse_next(input)
}

fn paren_expr(input: &mut &str) -> ModalResult<Expr> {
    literal("(").parse_next(input)?;
    ws_skip.parse_next(input)?;
    let inner = cut_err(expr).parse_next(input)?;
    ws_skip.parse_next(input)?;
    cut_err(literal(")")).parse_next(input)?;
    Ok(inner)
}

fn ident_primary(input: &mut &str) -> ModalResult<Expr> {
    let first = ident.parse_next(input)?;
    ws_skip.parse_next(input)?;

    if opt(literal("(")).parse_next(input)?.is_some() {
        ws_skip.parse_next(input)?;
        if opt(literal(")")).parse_next(input)?.is_some() {
            return Ok(Expr::FuncCall { name: first.to_string(), args: vec![] });
        }
        let args: Vec<Expr> = separated(1.., (ws_skip, expr).map(|(_, e)| e), literal(",")).parse_next(input)?;
        ws_skip.parse_next(input)?;
        cut_err(literal(")")).parse_next(input)?;
        return Ok(Expr::FuncCall { name: first.to_string(), args });
    }

    if opt(literal(".")).parse_next(input)?.is_some() {
        let second = cut_err(ident).parse_next(input)?;
        return Ok(Expr::Field(FieldRef::Qualified(first.to_string(), second.to_string())));
    }

    Ok(Expr::Field(FieldRef::Simple(first.to_string())))
}

/// Full expression, exposed for `parse_expr`/statement parsing.
pub(crate) fn expr(input: &mut &str) -> ModalResult<Expr> {
    or_expr.parse_next(input)
}

pub fn parse_expr(source: &str) -> Result<Expr, EvalError> {
    let mut input = source.trim();
    let parsed = expr
        .parse_next(&mut input)
        .map_err(|e| EvalError(format!("cannot parse expression {source:?}: {e}")))?;
    ws_skip.parse_next(&mut input).ok();
    if !input.is_empty() {
        return Err(EvalError(format!("unexpected trailing input in expression {source:?}: {input:?}")));
    }
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Statements: `ident = expr` or `send(name[, key=expr, ...])`
// ---------------------------------------------------------------------------

fn send_stmt(input: &mut &str) -> ModalResult<Stmt> {
    kw("send").parse_next(input)?;
    ws_skip.parse_next(input)?;
    literal("(").parse_next(input)?;
    ws_skip.parse_next(input)?;
    let event = cut_err(quoted_string).parse_next(input)?;
    ws_skip.parse_next(input)?;
    let mut data = Vec::new();
    loop {
        ws_skip.parse_next(input)?;
        if opt(literal(",")).parse_next(input)?.is_some() {
            ws_skip.parse_next(input)?;
            let key = cut_err(ident).parse_next(input)?.to_string();
            ws_skip.parse_next(input)?;
            cut_err(literal("=")).parse_next(input)?;
            ws_skip.parse_next(input)?;
            let value = cut_err(expr).parse_next(input)?;
            data.push((key, value));
        } else {
            break;
        }
    }
    ws_skip.parse_next(input)?;
    cut_err(literal(")")).parse_next(input)?;
    Ok(Stmt::Send { event, data })
}

fn assign_stmt(input: &mut &str) -> ModalResult<Stmt> {
    let name = ident.parse_next(input)?.to_string();
    ws_skip.parse_next(input)?;
    literal("=").parse_next(input)?;
    // Don't swallow `==`.
    if input.starts_with('=') {
        return Err(ErrMode::Backtrack(ContextError::new()));
    }
    ws_skip.parse_next(input)?;
    let value = cut_err(expr).parse_next(input)?;
    Ok(Stmt::Assign(name, value))
}

fn stmt(input: &mut &str) -> ModalResult<Stmt> {
    alt((send_stmt, assign_stmt)).parse_next(input)
}

/// Parse a `;`-separated list of statements (an action body, `on_entry`,
/// `on_exit`, or preamble). Empty segments (trailing `;`, blank source) are
/// skipped.
pub fn parse_statements(source: &str) -> Result<Vec<Stmt>, EvalError> {
    let mut out = Vec::new();
    for segment in source.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let mut input = segment;
        let parsed = stmt
            .parse_next(&mut input)
            .map_err(|e| EvalError(format!("cannot parse statement {segment:?}: {e}")))?;
        if !input.trim().is_empty() {
            return Err(EvalError(format!("unexpected trailing input in statement {segment:?}: {input:?}")));
        }
        out.push(parsed);
    }
    Ok(out)
}
