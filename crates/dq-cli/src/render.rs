//! Table rendering with `tabled`.

use dq_core::row::stringify;
use dq_core::{ColumnDescriptor, ColumnKind, DataQueryConfig, QueryTab, Row, TabState};
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

/// Columns a tab is shown with: its own override, else the module's, else
/// whatever the first row carries.
pub fn columns_for(tab: &QueryTab, module: &DataQueryConfig) -> Vec<ColumnDescriptor> {
    if let Some(columns) = tab.columns() {
        return columns.to_vec();
    }
    if !module.col_defs.is_empty() {
        return module.col_defs.clone();
    }
    tab.rows()
        .first()
        .map(|row| {
            row.fields()
                .map(|f| ColumnDescriptor::new(f, f, ColumnKind::Text))
                .collect()
        })
        .unwrap_or_default()
}

/// Thousands-separated integers, two decimals otherwise. Magnitudes past
/// `u64` print unseparated.
pub fn format_number(n: f64) -> String {
    if n.fract() != 0.0 {
        return format!("{:.2}", n);
    }
    if !n.is_finite() || n.abs() >= u64::MAX as f64 {
        return format!("{}", n);
    }
    let digits = format!("{}", n.abs() as u64);
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0.0 {
        out.insert(0, '-');
    }
    out
}

fn cell(value: Option<&Value>, column: &ColumnDescriptor) -> String {
    match (value, column.kind) {
        (Some(Value::Number(n)), ColumnKind::Number) if column.field != "id" => {
            n.as_f64().map(format_number).unwrap_or_else(|| n.to_string())
        }
        (Some(v), _) => stringify(v),
        (None, _) => String::new(),
    }
}

/// Render `rows` (numbered by their position in the tab) under `columns`.
pub fn rows_table(columns: &[ColumnDescriptor], rows: &[(usize, &Row)]) -> String {
    let mut builder = Builder::default();
    builder.push_record(
        std::iter::once("#".to_string()).chain(columns.iter().map(|c| c.header_label.clone())),
    );
    for (pos, row) in rows {
        builder.push_record(
            std::iter::once((pos + 1).to_string())
                .chain(columns.iter().map(|c| cell(row.get(&c.field), c))),
        );
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn tabs_table(tabs: &[QueryTab], active: usize) -> String {
    let mut builder = Builder::default();
    builder.push_record(["", "#", "Title", "State", "Rows"]);
    for (i, tab) in tabs.iter().enumerate() {
        let state = match tab.state() {
            TabState::Pending => "pending",
            TabState::Succeeded => "ok",
            TabState::FallbackLocal => "local",
        };
        builder.push_record([
            if i == active { "*" } else { "" }.to_string(),
            (i + 1).to_string(),
            tab.title().to_string(),
            state.to_string(),
            tab.rows().len().to_string(),
        ]);
    }
    builder.build().with(Style::modern()).to_string()
}

pub fn modules_table(modules: &[DataQueryConfig], open: &[&str]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Name", "Endpoint", "Open", "Description"]);
    for module in modules {
        builder.push_record([
            module.id.clone(),
            module.name.clone(),
            module.api_endpoint.clone(),
            if open.contains(&module.id.as_str()) { "yes" } else { "" }.to_string(),
            module.description.clone(),
        ]);
    }
    builder.build().with(Style::modern()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dq_core::config::builtin_modules;
    use dq_core::session::TabSession;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(1000.0), "1,000");
        assert_eq!(format_number(-1234567.0), "-1,234,567");
        assert_eq!(format_number(12.5), "12.50");
    }

    #[test]
    fn test_format_number_beyond_u64() {
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(-3e19), "-30000000000000000000");
        assert_eq!(format_number(1e19), "10,000,000,000,000,000,000");
    }

    #[test]
    fn test_rows_table_uses_header_labels() {
        let modules = builtin_modules();
        let rows = vec![Row::new()
            .with("id", 7)
            .with("amount", 15000)
            .with("currency", "USD")];
        let tab = QueryTab::loaded(TabSession::new().allocate_id(), "All Data", rows);
        let columns = columns_for(&tab, &modules[0]);
        let refs: Vec<(usize, &Row)> = tab.rows().iter().enumerate().collect();
        let out = rows_table(&columns, &refs);
        assert!(out.contains("Trade Type"));
        assert!(out.contains("15,000"));
        assert!(out.contains("USD"));
    }

    #[test]
    fn test_columns_fall_back_to_row_fields() {
        let mut module = builtin_modules().remove(0);
        module.col_defs.clear();
        let rows = vec![Row::new().with("book", "A").with("pnl", 1)];
        let tab = QueryTab::loaded(TabSession::new().allocate_id(), "All Data", rows);
        let fields: Vec<String> = columns_for(&tab, &module)
            .into_iter()
            .map(|c| c.field)
            .collect();
        assert_eq!(fields, vec!["book", "pnl"]);
    }

    #[test]
    fn test_tabs_table_marks_active() {
        let mut s = TabSession::new();
        let a = s.allocate_id();
        s.push(QueryTab::loaded(a, "All Data", Vec::<Row>::new()));
        let b = s.allocate_id();
        s.push(QueryTab::pending(b, "Query 1 (Loading...)"));
        let out = tabs_table(s.tabs(), s.active_index());
        assert!(out.contains("Query 1 (Loading...)"));
        assert!(out.contains("pending"));
        assert!(out.contains('*'));
    }
}
