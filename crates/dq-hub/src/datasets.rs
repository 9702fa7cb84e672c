//! # Sample Datasets
//!
//! Deterministic rows for every configured module, shaped by its `col_defs`.
//! The same seed always produces the same data.

use chrono::{Duration, NaiveDate};
use dq_core::{ColumnKind, DataQueryConfig, Row};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;

fn vocabulary(field: &str) -> Option<&'static [&'static str]> {
    let words: &'static [&'static str] = match field {
        "tradeType" => &["Buy", "Sell", "Swap", "Forward"],
        "currency" => &["USD", "EUR", "GBP", "JPY", "CHF"],
        "counterparty" => &[
            "Goldman Sachs",
            "JP Morgan",
            "Citi",
            "Barclays",
            "Deutsche Bank",
        ],
        "symbol" => &["BTC", "ETH", "SOL", "ADA", "XRP", "DOT"],
        _ => return None,
    };
    Some(words)
}

/// Request path a module's dataset is served at: its endpoint with a
/// leading slash and no trailing one, as the gateway requests it.
pub fn route_key(endpoint: &str) -> String {
    let path = endpoint.trim().trim_end_matches('/');
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

pub fn generate(module: &DataQueryConfig, count: usize, rng: &mut StdRng) -> Vec<Row> {
    let epoch = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN);
    (1..=count)
        .map(|i| {
            module.col_defs.iter().fold(Row::new(), |row, col| {
                if col.field == "id" {
                    return row.with("id", i as u64);
                }
                match col.kind {
                    ColumnKind::Number => {
                        // Market caps dwarf trade notionals.
                        let upper: u64 = if col.field == "marketCap" {
                            1_000_000_000
                        } else {
                            1_000_000
                        };
                        row.with(col.field.as_str(), rng.gen_range(100..upper))
                    }
                    ColumnKind::Date => {
                        let day = epoch + Duration::days(rng.gen_range(0..365));
                        row.with(col.field.as_str(), day.format("%Y-%m-%d").to_string())
                    }
                    ColumnKind::Text => {
                        let value = match vocabulary(&col.field) {
                            Some(words) => words[rng.gen_range(0..words.len())].to_string(),
                            None => format!("{}-{}", col.field, rng.gen_range(1..=5)),
                        };
                        row.with(col.field.as_str(), value)
                    }
                }
            })
        })
        .collect()
}

/// One dataset per distinct endpoint, keyed by [`route_key`]. Modules
/// sharing an endpoint share the first one's data.
pub fn generate_all(
    modules: &[DataQueryConfig],
    count: usize,
    seed: u64,
) -> HashMap<String, Arc<Vec<Row>>> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut datasets = HashMap::with_capacity(modules.len());
    for module in modules {
        let key = route_key(&module.api_endpoint);
        if datasets.contains_key(&key) {
            tracing::warn!(
                "Module '{}' shares endpoint {} with an earlier module",
                module.id,
                key
            );
            continue;
        }
        let rows = generate(module, count, &mut rng);
        tracing::info!("Dataset {} ready: {} rows", key, rows.len());
        datasets.insert(key, Arc::new(rows));
    }
    datasets
}

#[cfg(test)]
mod tests {
    use super::*;
    use dq_core::config::builtin_modules;

    #[test]
    fn test_route_keys_follow_endpoints() {
        assert_eq!(route_key("/api/trades"), "/api/trades");
        assert_eq!(route_key("data/desk/"), "/data/desk");
    }

    #[test]
    fn test_endpoints_with_same_last_segment_stay_apart() {
        let mut modules = builtin_modules();
        modules[1].api_endpoint = "/legacy/trades".into();
        let datasets = generate_all(&modules, 5, 3);
        assert_eq!(datasets.len(), 2);
        assert!(datasets["/api/trades"][0].get("currency").is_some());
        assert!(datasets["/legacy/trades"][0].get("symbol").is_some());
    }

    #[test]
    fn test_shared_endpoint_keeps_first_module() {
        let mut modules = builtin_modules();
        modules[1].api_endpoint = "/api/trades/".into();
        let datasets = generate_all(&modules, 5, 3);
        assert_eq!(datasets.len(), 1);
        assert!(datasets["/api/trades"][0].get("currency").is_some());
    }

    #[test]
    fn test_rows_follow_col_defs() {
        let modules = builtin_modules();
        let xms = &modules[0];
        let rows = generate(xms, 20, &mut StdRng::seed_from_u64(1));
        assert_eq!(rows.len(), 20);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.number("id"), Some((i + 1) as f64));
            assert!(row.number("amount").unwrap() >= 100.0);
            assert!(["USD", "EUR", "GBP", "JPY", "CHF"]
                .contains(&row.text("currency").unwrap().as_str()));
            assert_eq!(row.text("tradeDate").unwrap().len(), 10);
            assert_eq!(row.len(), xms.col_defs.len());
        }
    }

    #[test]
    fn test_same_seed_same_data() {
        let modules = builtin_modules();
        let a = generate_all(&modules, 10, 9);
        let b = generate_all(&modules, 10, 9);
        assert_eq!(a["/api/trades"], b["/api/trades"]);
        assert_eq!(a["/api/cryptoassets"], b["/api/cryptoassets"]);
    }
}
