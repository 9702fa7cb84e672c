//! # Tab Session Store
//!
//! Ordered result tabs of one opened module plus the active-tab pointer.
//!
//! Invariant: `active_index < tabs.len()` whenever tabs exist, and
//! `active_index == 0` when there are none.

use crate::column::ColumnDescriptor;
use crate::row::Row;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a tab within its session. Never reused, so a late
/// response can find its tab even after other tabs were closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TabId(u64);

impl TabId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Tab lifecycle: `Pending` settles exactly once into one of the terminal
/// states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TabState {
    Pending,
    Succeeded,
    FallbackLocal,
}

impl TabState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One materialized result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryTab {
    id: TabId,
    title: String,
    rows: Arc<[Row]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<Vec<ColumnDescriptor>>,
    state: TabState,
}

impl QueryTab {
    /// A settled tab using the module's default schema.
    pub fn loaded(id: TabId, title: impl Into<String>, rows: impl Into<Arc<[Row]>>) -> Self {
        Self {
            id,
            title: title.into(),
            rows: rows.into(),
            columns: None,
            state: TabState::Succeeded,
        }
    }

    /// A tab waiting for its query to come back.
    pub fn pending(id: TabId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            rows: Arc::from(Vec::<Row>::new()),
            columns: None,
            state: TabState::Pending,
        }
    }

    /// A settled tab with its own column schema (aggregations).
    pub fn derived(
        id: TabId,
        title: impl Into<String>,
        rows: Vec<Row>,
        columns: Vec<ColumnDescriptor>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            rows: rows.into(),
            columns: Some(columns),
            state: TabState::Succeeded,
        }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Column override, `None` for tabs using the module defaults.
    pub fn columns(&self) -> Option<&[ColumnDescriptor]> {
        self.columns.as_deref()
    }

    pub fn state(&self) -> TabState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == TabState::Pending
    }

    /// Move a pending tab to a terminal state. Terminal tabs are frozen.
    fn settle(&mut self, state: TabState, title: String, rows: Vec<Row>) -> bool {
        if self.state.is_terminal() || !state.is_terminal() {
            return false;
        }
        self.state = state;
        self.title = title;
        self.rows = rows.into();
        true
    }
}

/// Active index after removing the tab at `closed`.
///
/// Closing the active tab selects its left neighbour (or stays at 0),
/// closing a tab to its left shifts the pointer down by one, closing a tab
/// to its right leaves it alone.
pub fn active_after_close(active: usize, closed: usize) -> usize {
    if closed == active {
        closed.saturating_sub(1)
    } else if closed < active {
        active - 1
    } else {
        active
    }
}

#[derive(Debug, Clone, Default)]
pub struct TabSession {
    tabs: Vec<QueryTab>,
    active_index: usize,
    next_id: u64,
}

impl TabSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tabs(&self) -> &[QueryTab] {
        &self.tabs
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_tab(&self) -> Option<&QueryTab> {
        self.tabs.get(self.active_index)
    }

    pub fn get(&self, index: usize) -> Option<&QueryTab> {
        self.tabs.get(index)
    }

    pub fn position(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Reserve the identity for the next tab.
    pub fn allocate_id(&mut self) -> TabId {
        self.next_id += 1;
        TabId(self.next_id)
    }

    /// Append `tab` and make it active. Returns its index.
    pub fn push(&mut self, tab: QueryTab) -> usize {
        self.tabs.push(tab);
        self.active_index = self.tabs.len() - 1;
        self.active_index
    }

    /// Remove the tab at `index`; out-of-range indices are ignored.
    pub fn close(&mut self, index: usize) -> Option<QueryTab> {
        if index >= self.tabs.len() {
            return None;
        }
        let removed = self.tabs.remove(index);
        self.active_index = if self.tabs.is_empty() {
            0
        } else {
            active_after_close(self.active_index, index)
        };
        Some(removed)
    }

    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.tabs.len() {
            return false;
        }
        self.active_index = index;
        true
    }

    /// Settle the pending tab `id`. Returns `false` if the tab is gone or
    /// already terminal.
    pub fn settle(&mut self, id: TabId, state: TabState, title: String, rows: Vec<Row>) -> bool {
        match self.tabs.iter_mut().find(|t| t.id == id) {
            Some(tab) => tab.settle(state, title, rows),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(n: usize) -> TabSession {
        let mut s = TabSession::new();
        for i in 0..n {
            let id = s.allocate_id();
            s.push(QueryTab::loaded(id, format!("tab {}", i), Vec::<Row>::new()));
        }
        s
    }

    fn titles(s: &TabSession) -> Vec<&str> {
        s.tabs().iter().map(|t| t.title()).collect()
    }

    #[test]
    fn test_push_activates_new_tab() {
        let s = session_with(3);
        assert_eq!(s.active_index(), 2);
        assert_eq!(s.active_tab().unwrap().title(), "tab 2");
    }

    #[test]
    fn test_close_active_tab_selects_left_neighbour() {
        for i in 0..3 {
            let mut s = session_with(3);
            assert!(s.set_active(i));
            s.close(i).unwrap();
            assert_eq!(s.active_index(), i.saturating_sub(1), "closing {}", i);
        }
    }

    #[test]
    fn test_close_before_active_decrements() {
        let mut s = session_with(3);
        s.set_active(2);
        s.close(0);
        assert_eq!(s.active_index(), 1);
        assert_eq!(s.active_tab().unwrap().title(), "tab 2");
    }

    #[test]
    fn test_close_after_active_is_unchanged() {
        let mut s = session_with(3);
        s.set_active(0);
        s.close(2);
        assert_eq!(s.active_index(), 0);
        assert_eq!(titles(&s), vec!["tab 0", "tab 1"]);
    }

    #[test]
    fn test_close_out_of_range_is_ignored() {
        let mut s = session_with(2);
        assert!(s.close(5).is_none());
        assert_eq!(s.len(), 2);
        assert_eq!(s.active_index(), 1);
    }

    #[test]
    fn test_close_last_tab_resets_pointer() {
        let mut s = session_with(1);
        s.close(0);
        assert!(s.is_empty());
        assert_eq!(s.active_index(), 0);
        assert!(s.active_tab().is_none());
    }

    #[test]
    fn test_settle_only_moves_pending_tabs() {
        let mut s = TabSession::new();
        let id = s.allocate_id();
        s.push(QueryTab::pending(id, "q (Loading...)"));
        let rows = vec![Row::new().with("id", 1)];

        assert!(!s.settle(id, TabState::Pending, "x".into(), Vec::new()));
        assert!(s.settle(id, TabState::Succeeded, "q".into(), rows.clone()));
        assert_eq!(s.active_tab().unwrap().rows(), rows.as_slice());
        assert_eq!(s.active_tab().unwrap().state(), TabState::Succeeded);

        // Frozen once terminal.
        assert!(!s.settle(id, TabState::FallbackLocal, "q (Local)".into(), Vec::new()));
        assert_eq!(s.active_tab().unwrap().title(), "q");
    }

    #[test]
    fn test_settle_unknown_tab() {
        let mut s = session_with(1);
        let ghost = s.allocate_id();
        assert!(!s.settle(ghost, TabState::Succeeded, "x".into(), Vec::new()));
    }

    #[test]
    fn test_ids_are_never_reused() {
        let mut s = session_with(2);
        let first = s.tabs()[0].id();
        s.close(0);
        let id = s.allocate_id();
        assert!(id > first);
        assert!(s.position(first).is_none());
    }
}
