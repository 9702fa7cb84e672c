//! # Rows
//!
//! Schema-free records. A [`Row`] is an insertion-ordered map from field
//! name to a JSON scalar; nothing about its shape is assumed beyond the
//! fields a condition, group-by or aggregate names.
//!
//! All loose-typing lives in the scalar helpers at the bottom of this file:
//! [`stringify`], [`numeric_view`] and [`coerce_number`]. Every comparison in
//! the evaluator and every sum in the aggregator goes through them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One record of a result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert, used to assemble rows before they enter the engine.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Value of `field`. JSON `null` is reported as missing.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    /// Numeric view of `field`, if it has one.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(numeric_view)
    }

    /// Display text of `field`, if present.
    pub fn text(&self, field: &str) -> Option<String> {
        self.get(field).map(stringify)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Row {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

// =============================================================================
// Scalar coercion
// =============================================================================

/// Text form of a scalar.
///
/// Strings are returned as-is, integral floats lose their fractional part
/// (`15.0` renders as `15`), `null` renders as the empty string.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
            (_, _, Some(f)) => f.to_string(),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

/// Numeric view used by comparisons.
///
/// Numbers map to themselves and strings that parse as a finite `f64` after
/// trimming map to that value. Booleans, arrays and objects have no numeric
/// view.
pub fn numeric_view(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Numeric coercion used by aggregation: anything without a usable number
/// becomes `0`. `true` counts as `1`, and blank strings count as `0`.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Bool(true)) => 1.0,
        Some(v) => numeric_view(v).unwrap_or(0.0),
        None => 0.0,
    }
}

/// JSON representation of an accumulated number. Integral values within the
/// exactly-representable range are emitted as integers.
pub fn number_value(n: f64) -> Value {
    const EXACT: f64 = 9_007_199_254_740_992.0;
    if n.is_finite() && n.fract() == 0.0 && n.abs() < EXACT {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
