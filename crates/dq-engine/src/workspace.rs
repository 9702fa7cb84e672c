//! # Module Workspace
//!
//! The outer tab strip: one [`QuerySession`] per opened module, at most one
//! per module id.

use crate::gateway::QueryGateway;
use crate::orchestrator::QuerySession;
use dq_core::DataQueryConfig;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkspaceError {
    #[error("unknown module '{0}'")]
    UnknownModule(String),
}

pub struct ModuleTab {
    pub id: String,
    pub title: String,
    pub session: QuerySession,
}

pub struct Workspace {
    modules: Vec<DataQueryConfig>,
    gateway: Arc<dyn QueryGateway>,
    open: Vec<ModuleTab>,
    active_index: usize,
}

impl Workspace {
    pub fn new(modules: Vec<DataQueryConfig>, gateway: Arc<dyn QueryGateway>) -> Self {
        Self {
            modules,
            gateway,
            open: Vec::new(),
            active_index: 0,
        }
    }

    /// Registered modules, opened or not.
    pub fn available(&self) -> &[DataQueryConfig] {
        &self.modules
    }

    pub fn open_tabs(&self) -> &[ModuleTab] {
        &self.open
    }

    pub fn open_tabs_mut(&mut self) -> &mut [ModuleTab] {
        &mut self.open
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active(&self) -> Option<&ModuleTab> {
        self.open.get(self.active_index)
    }

    pub fn active_mut(&mut self) -> Option<&mut ModuleTab> {
        self.open.get_mut(self.active_index)
    }

    /// Activate the module's tab, opening a session for it first if needed.
    /// Returns the tab index.
    pub async fn open_module(&mut self, id: &str) -> Result<usize, WorkspaceError> {
        if let Some(index) = self.open.iter().position(|m| m.id == id) {
            self.active_index = index;
            return Ok(index);
        }

        let config = self
            .modules
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| WorkspaceError::UnknownModule(id.to_string()))?;

        tracing::info!("Opening module '{}' ({})", config.id, config.name);
        let title = config.name.clone();
        let session = QuerySession::open(config, self.gateway.clone()).await;
        self.open.push(ModuleTab {
            id: id.to_string(),
            title,
            session,
        });
        self.active_index = self.open.len() - 1;
        Ok(self.active_index)
    }

    pub fn close_module(&mut self, index: usize) -> Option<ModuleTab> {
        if index >= self.open.len() {
            return None;
        }
        let removed = self.open.remove(index);
        if self.active_index >= self.open.len() {
            self.active_index = self.open.len().saturating_sub(1);
        }
        Some(removed)
    }

    pub fn set_active(&mut self, index: usize) -> bool {
        if index >= self.open.len() {
            return false;
        }
        self.active_index = index;
        true
    }
}
