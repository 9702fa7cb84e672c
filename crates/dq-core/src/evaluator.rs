//! # Local Predicate Evaluator
//!
//! Evaluates a condition list against in-memory rows. The query backend owns
//! the authoritative semantics; this is the fallback used when it cannot be
//! reached, and the demo backend uses it as its query engine.
//!
//! Coercion rule, applied uniformly:
//! - `=` / `!=`: numeric comparison when both sides have a numeric view,
//!   otherwise exact comparison of the text forms.
//! - `>` / `<`: numeric when both sides have a numeric view, otherwise
//!   lexicographic on the text forms (ISO dates order chronologically).
//! - `LIKE`: case-insensitive substring of the text form.
//! - `IN`: the condition value is a comma-separated list, each entry trimmed.
//! - A missing field fails every operator except `!=`.

use crate::condition::{Condition, Operator};
use crate::row::{numeric_view, stringify, Row};
use serde_json::Value;
use std::cmp::Ordering;

/// `true` when `row` satisfies every condition. An empty list matches.
pub fn evaluate(row: &Row, conditions: &[Condition]) -> bool {
    conditions
        .iter()
        .all(|cond| evaluate_condition(row, cond))
}

/// Rows of `rows` satisfying `conditions`, in their original order.
pub fn filter_rows(rows: &[Row], conditions: &[Condition]) -> Vec<Row> {
    rows.iter()
        .filter(|row| evaluate(row, conditions))
        .cloned()
        .collect()
}

fn evaluate_condition(row: &Row, cond: &Condition) -> bool {
    match row.get(&cond.field) {
        Some(actual) => compare(actual, cond.operator, &cond.value),
        None => cond.operator == Operator::Neq,
    }
}

fn compare(actual: &Value, op: Operator, expected: &Value) -> bool {
    match op {
        Operator::Eq => values_equal(actual, expected),
        Operator::Neq => !values_equal(actual, expected),
        Operator::Gt => ordering(actual, expected) == Some(Ordering::Greater),
        Operator::Lt => ordering(actual, expected) == Some(Ordering::Less),
        Operator::Like => {
            let haystack = stringify(actual).to_lowercase();
            let needle = stringify(expected).to_lowercase();
            haystack.contains(&needle)
        }
        Operator::In => {
            let candidate = stringify(actual);
            stringify(expected)
                .split(',')
                .map(str::trim)
                .any(|member| member == candidate)
        }
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(an), Some(bn)) = (numeric_view(a), numeric_view(b)) {
        return an == bn;
    }
    stringify(a) == stringify(b)
}

fn ordering(a: &Value, b: &Value) -> Option<Ordering> {
    match (numeric_view(a), numeric_view(b)) {
        (Some(an), Some(bn)) => an.partial_cmp(&bn),
        _ => Some(stringify(a).cmp(&stringify(b))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn trade(id: i64, trade_type: &str, currency: &str, amount: f64, date: &str) -> Row {
        Row::new()
            .with("id", id)
            .with("tradeType", trade_type)
            .with("tradeDate", date)
            .with("amount", amount)
            .with("currency", currency)
            .with("counterparty", "Goldman Sachs")
    }

    fn sample() -> Vec<Row> {
        vec![
            trade(1, "A", "USD", 100.0, "2024-01-01"),
            trade(2, "B", "EUR", 250.0, "2024-02-15"),
            trade(3, "C", "USD", 75.5, "2024-03-10"),
            trade(4, " A", "GBP", 10.0, "2023-12-31"),
            trade(5, "B", "usd", 500.0, "2024-01-20"),
        ]
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter()
            .map(|r| r.number("id").unwrap() as i64)
            .collect()
    }

    #[test]
    fn test_empty_conditions_match_everything() {
        let rows = sample();
        assert_eq!(filter_rows(&rows, &[]).len(), rows.len());
    }

    #[test]
    fn test_eq_is_case_sensitive_text() {
        let rows = sample();
        let out = filter_rows(&rows, &[Condition::new("currency", Operator::Eq, "USD")]);
        assert_eq!(ids(&out), vec![1, 3]);
    }

    #[test]
    fn test_eq_coerces_numeric_strings() {
        let row = Row::new().with("id", 10);
        assert!(evaluate(&row, &[Condition::new("id", Operator::Eq, "10")]));
        assert!(evaluate(&row, &[Condition::new("id", Operator::Eq, 10.0)]));
        assert!(!evaluate(&row, &[Condition::new("id", Operator::Neq, "10")]));
    }

    #[test]
    fn test_gt_lt_numeric() {
        let rows = sample();
        let out = filter_rows(&rows, &[Condition::new("amount", Operator::Gt, 99)]);
        assert_eq!(ids(&out), vec![1, 2, 5]);
        let out = filter_rows(&rows, &[Condition::new("amount", Operator::Lt, "100")]);
        assert_eq!(ids(&out), vec![3, 4]);
    }

    #[test]
    fn test_gt_lt_dates_compare_lexicographically() {
        let rows = sample();
        let conds = vec![
            Condition::new("tradeDate", Operator::Gt, "2023-12-31"),
            Condition::new("tradeDate", Operator::Lt, "2024-02-01"),
        ];
        assert_eq!(ids(&filter_rows(&rows, &conds)), vec![1, 5]);
    }

    #[test]
    fn test_like_is_case_insensitive_substring() {
        let rows = sample();
        let out = filter_rows(&rows, &[Condition::new("currency", Operator::Like, "us")]);
        assert_eq!(ids(&out), vec![1, 3, 5]);
        let out = filter_rows(&rows, &[Condition::new("counterparty", Operator::Like, "SACHS")]);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_in_trims_members() {
        let rows = sample();
        let out = filter_rows(&rows, &[Condition::new("tradeType", Operator::In, "A, B")]);
        // " A" is not trimmed on the row side, so trade 4 is excluded.
        assert_eq!(ids(&out), vec![1, 2, 5]);
    }

    #[test]
    fn test_in_matches_numbers_by_text() {
        let row = Row::new().with("id", 3);
        assert!(evaluate(&row, &[Condition::new("id", Operator::In, "1, 3,5")]));
        assert!(!evaluate(&row, &[Condition::new("id", Operator::In, "13")]));
    }

    #[test]
    fn test_missing_field_only_passes_neq() {
        let row = Row::new().with("id", 1).with("note", Value::Null);
        for op in Operator::ALL {
            let expected = op == Operator::Neq;
            assert_eq!(
                evaluate(&row, &[Condition::new("ghost", op, "x")]),
                expected,
                "operator {}",
                op
            );
            assert_eq!(evaluate(&row, &[Condition::new("note", op, "x")]), expected);
        }
    }

    #[test]
    fn test_conditions_are_conjunctive() {
        let rows = sample();
        let conds = vec![
            Condition::new("currency", Operator::Like, "usd"),
            Condition::new("amount", Operator::Gt, 90),
        ];
        assert_eq!(ids(&filter_rows(&rows, &conds)), vec![1, 5]);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let rows = sample();
        let conds = vec![Condition::new("amount", Operator::Gt, 50)];
        let once = filter_rows(&rows, &conds);
        let twice = filter_rows(&once, &conds);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_evaluation_is_order_independent() {
        let rows = sample();
        let conds = vec![
            Condition::new("amount", Operator::Gt, 50),
            Condition::new("currency", Operator::Neq, "EUR"),
            Condition::new("tradeType", Operator::In, "A,B,C"),
        ];
        let expected = filter_rows(&rows, &conds);
        let permutations = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for perm in permutations {
            let reordered: Vec<Condition> = perm.iter().map(|&i| conds[i].clone()).collect();
            assert_eq!(filter_rows(&rows, &reordered), expected);
        }
        assert_eq!(ids(&expected), vec![1, 3, 5]);
    }

    #[test]
    fn test_mixed_types_fall_back_to_text() {
        let row = Row::new().with("tradeDate", "2024-01-01");
        // A date string has no numeric view, so the comparison is textual.
        assert!(evaluate(
            &row,
            &[Condition::new("tradeDate", Operator::Gt, json!(100))]
        ));
    }
}
