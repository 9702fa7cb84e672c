//! Terminal stand-in for the data grid: per-tab row selection and quick
//! filter, answered through [`GridView`].

use dq_core::row::stringify;
use dq_core::{GridView, QueryTab, Row};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridState {
    /// Selected row positions within the tab, 0-based and sorted.
    pub selected: Vec<usize>,
    pub quick_filter: Option<String>,
}

impl GridState {
    /// `(position, row)` pairs surviving the quick filter.
    pub fn visible<'a>(&self, tab: &'a QueryTab) -> Vec<(usize, &'a Row)> {
        let needle = self.quick_filter.as_deref().map(str::to_lowercase);
        tab.rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| match &needle {
                Some(needle) => row
                    .values()
                    .any(|v| stringify(v).to_lowercase().contains(needle.as_str())),
                None => true,
            })
            .collect()
    }
}

/// A tab seen through its grid state.
pub struct TabGrid<'a> {
    pub tab: &'a QueryTab,
    pub state: &'a GridState,
}

impl GridView for TabGrid<'_> {
    fn current_selection(&self) -> Vec<Row> {
        self.state
            .selected
            .iter()
            .filter_map(|&i| self.tab.rows().get(i).cloned())
            .collect()
    }

    fn currently_visible_rows(&self) -> Option<Vec<Row>> {
        self.state.quick_filter.as_ref()?;
        Some(
            self.state
                .visible(self.tab)
                .into_iter()
                .map(|(_, row)| row.clone())
                .collect(),
        )
    }
}

/// Parse `1-3,5` into sorted, de-duplicated 0-based positions below `len`.
pub fn parse_ranges(ranges: &str, len: usize) -> Result<Vec<usize>, String> {
    let mut out = Vec::new();
    for part in ranges.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = match part.split_once('-') {
            Some((a, b)) => (parse_position(a)?, parse_position(b)?),
            None => {
                let n = parse_position(part)?;
                (n, n)
            }
        };
        if start > end || end > len {
            return Err(format!("range '{}' outside 1..={}", part, len));
        }
        out.extend(start - 1..end);
    }
    out.sort_unstable();
    out.dedup();
    Ok(out)
}

fn parse_position(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(format!("'{}' is not a row number", s.trim())),
    }
}
