//! # Query Orchestrator
//!
//! [`QuerySession`] is the per-module façade: it owns the tab store, submits
//! queries through the gateway, falls back to local evaluation when the
//! gateway fails, and derives aggregated tabs.
//!
//! Gateway calls run as spawned tasks. Their results are never written into
//! the tab store from inside the task: they are queued and applied when the
//! owner calls [`QuerySession::apply_completions`] or
//! [`QuerySession::next_update`], i.e. between two update cycles of the
//! rendering side. A freshly submitted tab is therefore always observed in
//! its loading state at least once.
//!
//! Every mutation publishes a full [`SessionSnapshot`] on a watch channel.
//!
//! `submit` spawns onto the current tokio runtime and must be called from
//! within one.

use crate::gateway::{GatewayError, QueryGateway};
use dq_core::aggregate::{aggregate, AggregationRequest};
use dq_core::condition::{describe, Condition};
use dq_core::selection::{resolve_input, GridView};
use dq_core::session::{QueryTab, TabId, TabSession, TabState};
use dq_core::{evaluator, DataQueryConfig, Row};
use futures_util::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub const ALL_DATA_TITLE: &str = "All Data";
pub const LOADING_SUFFIX: &str = " (Loading...)";
pub const LOCAL_SUFFIX: &str = " (Local)";

/// What the rendering side sees after every mutation.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub tabs: Vec<QueryTab>,
    pub active_index: usize,
}

/// Pre-populated inputs for the aggregation dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationDialog {
    pub columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub group_by_fields: Vec<String>,
    pub default_request: AggregationRequest,
}

struct Completion {
    tab: TabId,
    title: String,
    conditions: Vec<Condition>,
    outcome: Result<Vec<Row>, GatewayError>,
}

pub struct QuerySession {
    config: DataQueryConfig,
    gateway: Arc<dyn QueryGateway>,
    all_data: Arc<[Row]>,
    tabs: TabSession,
    counter: u64,
    in_flight: usize,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl QuerySession {
    /// Load the module's full row set and open the "All Data" tab. A failed
    /// load leaves the session usable with no cached rows.
    pub async fn open(config: DataQueryConfig, gateway: Arc<dyn QueryGateway>) -> Self {
        let all_data = match gateway.load_all(&config.api_endpoint).await {
            Ok(rows) => {
                tracing::info!("Module '{}' loaded {} rows", config.id, rows.len());
                rows
            }
            Err(e) => {
                tracing::warn!("Module '{}' initial load failed: {}", config.id, e);
                Vec::new()
            }
        };
        Self::with_data(config, gateway, all_data)
    }

    /// Start a session over rows the caller already holds.
    pub fn with_data(
        config: DataQueryConfig,
        gateway: Arc<dyn QueryGateway>,
        all_data: Vec<Row>,
    ) -> Self {
        let all_data: Arc<[Row]> = all_data.into();
        let mut tabs = TabSession::new();
        let id = tabs.allocate_id();
        tabs.push(QueryTab::loaded(id, ALL_DATA_TITLE, all_data.clone()));

        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(SessionSnapshot {
            tabs: tabs.tabs().to_vec(),
            active_index: tabs.active_index(),
        });

        Self {
            config,
            gateway,
            all_data,
            tabs,
            counter: 1,
            in_flight: 0,
            completions_tx,
            completions_rx,
            snapshot_tx,
        }
    }

    pub fn config(&self) -> &DataQueryConfig {
        &self.config
    }

    /// The module's cached full row set.
    pub fn all_data(&self) -> &[Row] {
        &self.all_data
    }

    pub fn tabs(&self) -> &[QueryTab] {
        self.tabs.tabs()
    }

    pub fn active_index(&self) -> usize {
        self.tabs.active_index()
    }

    pub fn active_tab(&self) -> Option<&QueryTab> {
        self.tabs.active_tab()
    }

    /// Number of gateway calls whose results have not been applied yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            tabs: self.tabs.tabs().to_vec(),
            active_index: self.tabs.active_index(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn next_title(&mut self, conditions: &[Condition]) -> String {
        let title = describe(conditions).unwrap_or_else(|| format!("Query {}", self.counter));
        self.counter += 1;
        title
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Open a pending tab for `conditions` and send them to the gateway.
    pub fn submit(&mut self, conditions: Vec<Condition>) -> TabId {
        let title = self.next_title(&conditions);
        let id = self.tabs.allocate_id();
        self.tabs
            .push(QueryTab::pending(id, format!("{}{}", title, LOADING_SUFFIX)));
        self.in_flight += 1;
        self.publish();
        tracing::info!("Submitted {} '{}' to {}", id, title, self.config.api_endpoint);

        let gateway = self.gateway.clone();
        let endpoint = self.config.api_endpoint.clone();
        let tx = self.completions_tx.clone();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(gateway.query(&endpoint, &conditions))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(GatewayError::Transport("gateway call panicked".into())));
            // The receiver lives as long as the session; a dropped session
            // simply discards the result.
            let _ = tx.send(Completion {
                tab: id,
                title,
                conditions,
                outcome,
            });
        });
        id
    }

    /// Apply every completion that has already arrived. Never waits.
    /// Returns how many completions were processed.
    pub fn apply_completions(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(completion) = self.completions_rx.try_recv() {
            self.apply(completion);
            processed += 1;
        }
        processed
    }

    /// Wait for the next completion and apply it. Returns `false` right away
    /// when nothing is in flight.
    pub async fn next_update(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.completions_rx.recv().await {
            Some(completion) => {
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Wait until every submitted query has settled.
    pub async fn settle(&mut self) {
        while self.next_update().await {}
    }

    fn apply(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let Completion {
            tab,
            title,
            conditions,
            outcome,
        } = completion;

        if self.tabs.position(tab).is_none() {
            tracing::debug!("Discarding result for closed tab {}", tab);
            return;
        }

        let (state, title, rows) = match outcome {
            Ok(rows) => {
                tracing::info!("Query {} returned {} rows", tab, rows.len());
                (TabState::Succeeded, title, rows)
            }
            Err(e) => {
                tracing::warn!("Query {} failed ({}), evaluating locally", tab, e);
                let rows = evaluator::filter_rows(&self.all_data, &conditions);
                (
                    TabState::FallbackLocal,
                    format!("{}{}", title, LOCAL_SUFFIX),
                    rows,
                )
            }
        };

        if self.tabs.settle(tab, state, title, rows) {
            self.publish();
        }
    }

    // =========================================================================
    // Aggregation
    // =========================================================================

    pub fn aggregation_dialog(&self) -> AggregationDialog {
        let columns = self.config.column_fields();
        let group_by = self
            .config
            .group_by_fields
            .first()
            .or_else(|| columns.first())
            .cloned()
            .into_iter()
            .collect();
        let aggregate_field = self
            .config
            .numeric_columns
            .first()
            .cloned()
            .unwrap_or_default();
        AggregationDialog {
            columns,
            numeric_columns: self.config.numeric_columns.clone(),
            group_by_fields: self.config.group_by_fields.clone(),
            default_request: AggregationRequest {
                group_by,
                aggregate_field,
            },
        }
    }

    /// Aggregate the active tab (or the part of it `view` points at) into a
    /// new active tab. Empty group-by lists and empty sessions are ignored.
    pub fn run_aggregation(
        &mut self,
        request: &AggregationRequest,
        view: &dyn GridView,
    ) -> Option<TabId> {
        if request.group_by.is_empty() {
            tracing::debug!("Ignoring aggregation without group-by fields");
            return None;
        }

        let (aggregation, source) = {
            let tab = self.tabs.active_tab()?;
            let selection = view.current_selection();
            let visible = view.currently_visible_rows();
            let input = resolve_input(tab, Some(selection.as_slice()), visible.as_deref());
            let aggregation = match aggregate(
                &input.rows,
                &request.group_by,
                &request.aggregate_field,
                &self.config.col_defs,
            ) {
                Ok(aggregation) => aggregation,
                Err(e) => {
                    tracing::debug!("Ignoring aggregation: {}", e);
                    return None;
                }
            };
            (aggregation, input.source)
        };

        let title = format!(
            "{}: sum({}) by {}",
            source.title_prefix(),
            request.aggregate_field,
            request.group_by.join(", ")
        );
        self.counter += 1;
        let id = self.tabs.allocate_id();
        self.tabs.push(QueryTab::derived(
            id,
            title,
            aggregation.rows,
            aggregation.columns,
        ));
        self.publish();
        Some(id)
    }

    // =========================================================================
    // Tab strip
    // =========================================================================

    pub fn close_tab(&mut self, index: usize) -> Option<QueryTab> {
        let removed = self.tabs.close(index)?;
        self.publish();
        Some(removed)
    }

    pub fn set_active(&mut self, index: usize) -> bool {
        let changed = self.tabs.set_active(index);
        if changed {
            self.publish();
        }
        changed
    }
}
