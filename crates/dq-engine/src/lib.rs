//! # dq-engine — Query Sessions over a Remote Backend
//!
//! Drives [`dq_core`] against a live backend:
//!
//! - [`gateway`]: the `QueryGateway` seam and its error type.
//! - [`http`]: the `reqwest` implementation.
//! - [`orchestrator`]: `QuerySession`, one module's tabs, queries and
//!   aggregations.
//! - [`workspace`]: the strip of opened modules.

pub mod gateway;
pub mod http;
pub mod orchestrator;
pub mod workspace;

pub use gateway::{GatewayError, QueryGateway};
pub use http::HttpGateway;
pub use orchestrator::{AggregationDialog, QuerySession, SessionSnapshot};
pub use workspace::{ModuleTab, Workspace, WorkspaceError};
