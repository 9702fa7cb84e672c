//! # Selection Resolver
//!
//! Decides which rows feed an aggregation. The grid is never touched
//! directly: the rendering side answers the [`GridView`] pull queries with
//! row snapshots.

use crate::row::Row;
use crate::session::QueryTab;
use std::borrow::Cow;

/// Pull contract implemented by whatever renders a tab.
pub trait GridView {
    /// Rows the user explicitly selected, empty when there is no selection.
    fn current_selection(&self) -> Vec<Row>;

    /// Rows surviving grid-local filtering, `None` when the view has none to
    /// offer.
    fn currently_visible_rows(&self) -> Option<Vec<Row>>;
}

/// A fixed view, for callers that already hold the snapshots.
#[derive(Debug, Clone, Default)]
pub struct GridSnapshot {
    pub selection: Vec<Row>,
    pub visible: Option<Vec<Row>>,
}

impl GridView for GridSnapshot {
    fn current_selection(&self) -> Vec<Row> {
        self.selection.clone()
    }

    fn currently_visible_rows(&self) -> Option<Vec<Row>> {
        self.visible.clone()
    }
}

/// Where the aggregation input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Selection,
    Visible,
    FullTab,
}

impl InputSource {
    pub fn title_prefix(self) -> &'static str {
        match self {
            Self::Selection => "Sel. Agg",
            Self::Visible | Self::FullTab => "Agg",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedInput<'a> {
    pub rows: Cow<'a, [Row]>,
    pub source: InputSource,
}

/// Explicit selection first, then the post-filter visible rows, then the
/// whole tab. Empty snapshots count as absent.
pub fn resolve_input<'a>(
    tab: &'a QueryTab,
    explicit_selection: Option<&'a [Row]>,
    post_filter_visible: Option<&'a [Row]>,
) -> ResolvedInput<'a> {
    if let Some(selected) = explicit_selection.filter(|rows| !rows.is_empty()) {
        return ResolvedInput {
            rows: Cow::Borrowed(selected),
            source: InputSource::Selection,
        };
    }
    if let Some(visible) = post_filter_visible.filter(|rows| !rows.is_empty()) {
        return ResolvedInput {
            rows: Cow::Borrowed(visible),
            source: InputSource::Visible,
        };
    }
    ResolvedInput {
        rows: Cow::Borrowed(tab.rows()),
        source: InputSource::FullTab,
    }
}
