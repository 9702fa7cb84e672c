//! # Aggregation Engine
//!
//! Groups rows by an ordered list of key fields and sums one numeric field
//! per group. Produces both the derived rows and the column descriptors of
//! the derived tab.

use crate::column::{label_for, ColumnDescriptor, ColumnKind};
use crate::row::{coerce_number, number_value, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Width cap applied to every synthesized column.
pub const AGGREGATE_COLUMN_MAX_WIDTH: u32 = 350;

/// Field receiving the sequential group number in derived rows.
pub const GROUP_ID_FIELD: &str = "id";

/// What the user confirmed in the aggregation dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationRequest {
    pub group_by: Vec<String>,
    pub aggregate_field: String,
}

impl AggregationRequest {
    pub fn new<I, S>(group_by: I, aggregate_field: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_by: group_by.into_iter().map(Into::into).collect(),
            aggregate_field: aggregate_field.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub rows: Vec<Row>,
    pub columns: Vec<ColumnDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("no group-by fields selected")]
    EmptyGroupBy,
}

struct Accumulator {
    sum: f64,
    key_values: Vec<Value>,
}

/// Integral floats key like the integers they equal, so `5.0` joins `5`.
fn canonical_key(value: &Value) -> Value {
    match value {
        Value::Number(n) if n.is_f64() => n.as_f64().map(number_value).unwrap_or(Value::Null),
        other => other.clone(),
    }
}

/// Group `rows` by `group_by` and sum `aggregate_field`.
///
/// Groups come out in first-encounter order. Labels are looked up in
/// `source_columns`. Repeated group-by names collapse to their first
/// occurrence.
pub fn aggregate(
    rows: &[Row],
    group_by: &[String],
    aggregate_field: &str,
    source_columns: &[ColumnDescriptor],
) -> Result<Aggregation, AggregateError> {
    let mut keys: Vec<&str> = Vec::with_capacity(group_by.len());
    for field in group_by {
        if !keys.contains(&field.as_str()) {
            keys.push(field);
        }
    }
    if keys.is_empty() {
        return Err(AggregateError::EmptyGroupBy);
    }

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Accumulator> = Vec::new();

    for row in rows {
        let key_values: Vec<Value> = keys
            .iter()
            .map(|k| row.get(k).cloned().unwrap_or(Value::Null))
            .collect();
        // JSON text keeps the tuple order-sensitive and tells 1 from "1".
        let composite =
            Value::Array(key_values.iter().map(canonical_key).collect()).to_string();
        let value = coerce_number(row.get(aggregate_field));

        match index.get(&composite) {
            Some(&slot) => groups[slot].sum += value,
            None => {
                index.insert(composite, groups.len());
                groups.push(Accumulator {
                    sum: value,
                    key_values,
                });
            }
        }
    }

    let rows = groups
        .into_iter()
        .enumerate()
        .map(|(i, group)| {
            let mut out = Row::new().with(GROUP_ID_FIELD, (i + 1) as u64);
            for (field, value) in keys.iter().zip(group.key_values) {
                out = out.with(*field, value);
            }
            out.with(aggregate_field, number_value(group.sum))
        })
        .collect();

    let mut columns: Vec<ColumnDescriptor> = keys
        .iter()
        .map(|field| {
            ColumnDescriptor::new(*field, label_for(source_columns, field), ColumnKind::Text)
                .with_max_width(AGGREGATE_COLUMN_MAX_WIDTH)
        })
        .collect();
    columns.push(
        ColumnDescriptor::new(
            aggregate_field,
            format!("Sum of {}", label_for(source_columns, aggregate_field)),
            ColumnKind::Number,
        )
        .with_max_width(AGGREGATE_COLUMN_MAX_WIDTH),
    );

    Ok(Aggregation { rows, columns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cols() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("id", "ID", ColumnKind::Number),
            ColumnDescriptor::new("amt", "Amount", ColumnKind::Number),
            ColumnDescriptor::new("cur", "Currency", ColumnKind::Text),
        ]
    }

    fn group(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_groups_in_first_seen_order() {
        let rows = vec![
            Row::new().with("amt", 10).with("cur", "USD"),
            Row::new().with("amt", 5).with("cur", "USD"),
            Row::new().with("amt", 3).with("cur", "EUR"),
        ];
        let agg = aggregate(&rows, &group(&["cur"]), "amt", &cols()).unwrap();
        assert_eq!(
            agg.rows,
            vec![
                Row::new().with("id", 1).with("cur", "USD").with("amt", 15),
                Row::new().with("id", 2).with("cur", "EUR").with("amt", 3),
            ]
        );
    }

    #[test]
    fn test_total_mass_is_preserved() {
        let rows: Vec<Row> = (0..40)
            .map(|i| {
                Row::new()
                    .with("cur", ["USD", "EUR", "GBP"][i % 3])
                    .with("kind", ["A", "B"][i % 2])
                    .with("amt", (i as f64) * 1.5)
            })
            .collect();
        let input_total: f64 = rows.iter().map(|r| r.number("amt").unwrap()).sum();
        let agg = aggregate(&rows, &group(&["cur", "kind"]), "amt", &cols()).unwrap();
        let output_total: f64 = agg.rows.iter().map(|r| r.number("amt").unwrap()).sum();
        assert!((input_total - output_total).abs() < 1e-9);
        assert_eq!(agg.rows.len(), 6);
    }

    #[test]
    fn test_columns_are_synthesized() {
        let agg = aggregate(&[], &group(&["cur", "desk"]), "amt", &cols()).unwrap();
        assert!(agg.rows.is_empty());
        assert_eq!(agg.columns.len(), 3);
        assert_eq!(agg.columns[0].header_label, "Currency");
        assert_eq!(agg.columns[0].kind, ColumnKind::Text);
        assert_eq!(agg.columns[1].header_label, "desk");
        assert_eq!(agg.columns[2].field, "amt");
        assert_eq!(agg.columns[2].header_label, "Sum of Amount");
        assert_eq!(agg.columns[2].kind, ColumnKind::Number);
        assert!(agg
            .columns
            .iter()
            .all(|c| c.max_width == Some(AGGREGATE_COLUMN_MAX_WIDTH)));
    }

    #[test]
    fn test_empty_group_by_is_refused() {
        let rows = vec![Row::new().with("amt", 1)];
        assert_eq!(
            aggregate(&rows, &[], "amt", &cols()),
            Err(AggregateError::EmptyGroupBy)
        );
    }

    #[test]
    fn test_non_numeric_values_count_as_zero() {
        let rows = vec![
            Row::new().with("cur", "USD").with("amt", "12.5"),
            Row::new().with("cur", "USD").with("amt", "n/a"),
            Row::new().with("cur", "USD"),
        ];
        let agg = aggregate(&rows, &group(&["cur"]), "amt", &cols()).unwrap();
        assert_eq!(agg.rows[0].get("amt"), Some(&json!(12.5)));
    }

    #[test]
    fn test_key_distinguishes_types_and_missing() {
        let rows = vec![
            Row::new().with("code", 1).with("amt", 1),
            Row::new().with("code", "1").with("amt", 2),
            Row::new().with("amt", 4),
            Row::new().with("code", Value::Null).with("amt", 8),
        ];
        let agg = aggregate(&rows, &group(&["code"]), "amt", &cols()).unwrap();
        let sums: Vec<f64> = agg.rows.iter().map(|r| r.number("amt").unwrap()).collect();
        assert_eq!(sums, vec![1.0, 2.0, 12.0]);
    }

    #[test]
    fn test_integral_float_keys_join_integer_group() {
        let rows = vec![
            Row::new().with("code", 1).with("amt", 1),
            Row::new().with("code", 1.0).with("amt", 2),
            Row::new().with("code", "1").with("amt", 4),
            Row::new().with("code", 1.5).with("amt", 8),
        ];
        let agg = aggregate(&rows, &group(&["code"]), "amt", &cols()).unwrap();
        assert_eq!(agg.rows.len(), 3);
        assert_eq!(
            agg.rows[0],
            Row::new().with("id", 1).with("code", 1).with("amt", 3)
        );
        assert_eq!(agg.rows[1].get("code"), Some(&json!("1")));
        assert_eq!(agg.rows[2].get("code"), Some(&json!(1.5)));
    }

    #[test]
    fn test_duplicate_group_by_fields_collapse() {
        let rows = vec![
            Row::new().with("cur", "USD").with("amt", 1),
            Row::new().with("cur", "USD").with("amt", 2),
        ];
        let agg = aggregate(&rows, &group(&["cur", "cur"]), "amt", &cols()).unwrap();
        assert_eq!(agg.rows.len(), 1);
        assert_eq!(agg.columns.len(), 2);
        assert_eq!(agg.rows[0].get("amt"), Some(&json!(3)));
    }

    #[test]
    fn test_grouping_by_id_keeps_source_id() {
        let rows = vec![
            Row::new().with("id", 7).with("amt", 1),
            Row::new().with("id", 7).with("amt", 2),
        ];
        let agg = aggregate(&rows, &group(&["id"]), "amt", &cols()).unwrap();
        assert_eq!(agg.rows[0], Row::new().with("id", 7).with("amt", 3));
    }
}
