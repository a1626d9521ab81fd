use anyhow::{Context, Result};
use sc_core::{Event, Value};
use winnow::ascii::multispace0;
use winnow::combinator::{alt, opt};
use winnow::prelude::*;
use winnow::token::{literal, take_while};

/// Parse the CLI/BDD event wire form `name[:key=value[:key=value...]]`.
///
/// Each `value` is parsed as a literal: a number, `true`/`false`, a
/// double-quoted string, or (falling back) a bare token taken verbatim as a
/// string, matching `DynamicEvaluator`'s literal grammar without pulling in
/// its full expression parser (a wire-form value is never a variable
/// reference or a function call).
pub fn parse_event(wire: &str) -> Result<Event> {
    let mut parts = wire.split(':');
    let name = parts.next().filter(|s| !s.is_empty()).context("event wire form is missing a name")?;

    let mut event = Event::new(name);
    for field in parts {
        let (key, value) = field.split_once('=').with_context(|| format!("event field '{field}' is missing '='"))?;
        let value = parse_literal(value).with_context(|| format!("event field '{key}' has an invalid value '{value}'"))?;
        event = event.with_data(key, value);
    }
    Ok(event)
}

fn parse_literal(source: &str) -> Result<Value> {
    let trimmed = source.trim();
    let mut input = trimmed;
    match literal_value.parse_next(&mut input) {
        Ok(value) => {
            multispace0.void().parse_next(&mut input).ok();
            if input.is_empty() {
                Ok(value)
            } else {
                Ok(Value::Str(trimmed.to_string()))
            }
        }
        Err(_) => Ok(Value::Str(trimmed.to_string())),
    }
}

fn literal_value(input: &mut &str) -> ModalResult<Value> {
    alt((number_literal.map(Value::Number), quoted_string.map(Value::Str), bool_literal.map(Value::Bool))).parse_next(input)
}

fn bool_literal(input: &mut &str) -> ModalResult<bool> {
    alt((literal("true").value(true), literal("false").value(false))).parse_next(input)
}

fn quoted_string(input: &mut &str) -> ModalResult<String> {
    literal("\"").parse_next(input)?;
    let content = take_while(0.., |c: char| c != '"').parse_next(input)?;
    literal("\"").parse_next(input)?;
    Ok(content.to_string())
}

fn number_literal(input: &mut &str) -> ModalResult<f64> {
    let sign = opt(literal("-")).parse_next(input)?.is_some();
    let integer_part = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
    let has_dot = opt(literal(".")).parse_next(input)?.is_some();
    let text = if has_dot {
        let frac_part = take_while(1.., |c: char| c.is_ascii_digit()).parse_next(input)?;
        format!("{integer_part}.{frac_part}")
    } else {
        integer_part.to_string()
    };
    let mut value: f64 = text.parse().map_err(|_| winnow::error::ErrMode::Backtrack(winnow::error::ContextError::new()))?;
    if sign {
        value = -value;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_has_no_data() {
        let event = parse_event("tick").unwrap();
        assert_eq!(event.name, "tick");
        assert!(event.data.is_empty());
    }

    #[test]
    fn parses_number_bool_string_and_bare_fields() {
        let event = parse_event(r#"go:n=42:ok=true:label="hi there":mode=fast"#).unwrap();
        assert_eq!(event.data.get("n"), Some(&Value::Number(42.0)));
        assert_eq!(event.data.get("ok"), Some(&Value::Bool(true)));
        assert_eq!(event.data.get("label"), Some(&Value::Str("hi there".to_string())));
        assert_eq!(event.data.get("mode"), Some(&Value::Str("fast".to_string())));
    }

    #[test]
    fn parses_negative_numbers() {
        let event = parse_event("go:n=-3.5").unwrap();
        assert_eq!(event.data.get("n"), Some(&Value::Number(-3.5)));
    }

    #[test]
    fn rejects_field_without_equals() {
        assert!(parse_event("go:broken").is_err());
    }

    #[test]
    fn rejects_empty_name() {
        assert!(parse_event(":k=1").is_err());
    }
}
