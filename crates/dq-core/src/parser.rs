//! # Condition Parser
//!
//! Parses the console's condition syntax into [`Condition`]s.
//!
//! Syntax:
//! ```text
//! currency = "USD" AND amount > 100 AND tradeType IN A, B
//! ```
//!
//! Each clause is `field OP value` with `OP` one of `=`, `!=`, `>`, `<`,
//! `LIKE`, `IN`. Clauses are joined by `AND` (any case).

use crate::condition::{Condition, Operator};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("cannot parse condition '{0}'")]
    NoOperator(String),
    #[error("missing field name in '{0}'")]
    MissingField(String),
    #[error("unsupported operator in '{0}' (use =, !=, >, <, LIKE, IN)")]
    Unsupported(String),
}

/// Parse a full condition list. Blank input yields an empty list.
pub fn parse_conditions(input: &str) -> Result<Vec<Condition>, ParseError> {
    split_and(input)
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_condition)
        .collect()
}

/// Parse one `field OP value` clause.
pub fn parse_condition(part: &str) -> Result<Condition, ParseError> {
    let part = part.trim();
    let (pos, op, len) = find_operator(part).ok_or_else(|| ParseError::NoOperator(part.into()))?;

    let field = part[..pos].trim();
    if field.is_empty() {
        return Err(ParseError::MissingField(part.into()));
    }
    let raw_value = part[pos + len..].trim();
    if raw_value.starts_with('=') {
        return Err(ParseError::Unsupported(part.into()));
    }
    let value_str = raw_value.trim_matches('"').trim_matches('\'');

    Ok(Condition {
        field: field.to_string(),
        operator: op,
        value: parse_value(value_str),
    })
}

/// Earliest operator occurrence in `part`. Symbol operators are matched
/// anywhere, word operators only between spaces.
fn find_operator(part: &str) -> Option<(usize, Operator, usize)> {
    let upper = part.to_ascii_uppercase();
    let candidates: [(&str, Operator); 6] = [
        ("!=", Operator::Neq),
        ("=", Operator::Eq),
        (">", Operator::Gt),
        ("<", Operator::Lt),
        (" LIKE ", Operator::Like),
        (" IN ", Operator::In),
    ];

    let mut best: Option<(usize, Operator, usize)> = None;
    for (token, op) in candidates {
        if let Some(pos) = upper.find(token) {
            // `!=` and `=` can start at neighbouring offsets; the earlier one wins.
            if best.map_or(true, |(b, _, _)| pos < b) {
                best = Some((pos, op, token.len()));
            }
        }
    }
    best
}

fn split_and(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let upper = s.to_ascii_uppercase();
    let mut last = 0;
    let pattern = " AND ";
    let mut search_pos = 0;

    while let Some(pos) = upper[search_pos..].find(pattern) {
        let absolute_pos = search_pos + pos;
        parts.push(&s[last..absolute_pos]);
        last = absolute_pos + pattern.len();
        search_pos = last;
    }
    parts.push(&s[last..]);
    parts
}

fn parse_value(s: &str) -> serde_json::Value {
    if let Ok(n) = s.parse::<i64>() {
        serde_json::Value::Number(n.into())
    } else if let Some(n) = s
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(serde_json::Number::from_f64)
    {
        serde_json::Value::Number(n)
    } else if s == "true" {
        serde_json::Value::Bool(true)
    } else if s == "false" {
        serde_json::Value::Bool(false)
    } else {
        serde_json::Value::String(s.to_string())
    }
}
