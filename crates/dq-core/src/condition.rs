//! # Conditions
//!
//! A submission is a flat list of [`Condition`]s combined with AND. Operators
//! travel on the wire as the query-builder symbols (`=`, `!=`, `>`, `<`,
//! `LIKE`, `IN`).

use crate::row::stringify;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=", alias = "EQ")]
    Eq,
    #[serde(rename = "!=", alias = "NEQ")]
    Neq,
    #[serde(rename = ">", alias = "GT")]
    Gt,
    #[serde(rename = "<", alias = "LT")]
    Lt,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "IN")]
    In,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Eq,
        Operator::Neq,
        Operator::Gt,
        Operator::Lt,
        Operator::Like,
        Operator::In,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Like => "LIKE",
            Self::In => "IN",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "=" | "EQ" => Ok(Self::Eq),
            "!=" | "NEQ" => Ok(Self::Neq),
            ">" | "GT" => Ok(Self::Gt),
            "<" | "LT" => Ok(Self::Lt),
            "LIKE" => Ok(Self::Like),
            "IN" => Ok(Self::In),
            other => Err(format!("Unknown operator '{}'", other)),
        }
    }
}

/// One filter predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: serde_json::Value,
}

impl Condition {
    pub fn new(
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, stringify(&self.value))
    }
}

/// Human-readable summary of a submission, `None` when it has no conditions.
pub fn describe(conditions: &[Condition]) -> Option<String> {
    if conditions.is_empty() {
        return None;
    }
    Some(
        conditions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", "),
    )
}

/// Body of `POST <endpoint>/query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_wire_symbols() {
        let c: Condition =
            serde_json::from_value(json!({"field": "currency", "operator": "=", "value": "USD"}))
                .unwrap();
        assert_eq!(c.operator, Operator::Eq);

        let c: Condition =
            serde_json::from_value(json!({"field": "amount", "operator": "GT", "value": 10}))
                .unwrap();
        assert_eq!(c.operator, Operator::Gt);

        let out = serde_json::to_value(Condition::new("a", Operator::Neq, 1)).unwrap();
        assert_eq!(out["operator"], "!=");
    }

    #[test]
    fn test_operator_from_str_is_case_insensitive() {
        assert_eq!("like".parse::<Operator>(), Ok(Operator::Like));
        assert_eq!(" in ".parse::<Operator>(), Ok(Operator::In));
        assert!(">=".parse::<Operator>().is_err());
    }

    #[test]
    fn test_describe_joins_conditions() {
        let conds = vec![
            Condition::new("currency", Operator::Eq, "USD"),
            Condition::new("amount", Operator::Gt, 100),
        ];
        assert_eq!(
            describe(&conds).as_deref(),
            Some("currency = USD, amount > 100")
        );
        assert_eq!(describe(&[]), None);
    }
}
