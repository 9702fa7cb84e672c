//! # dq-core — The Model of TABQUERY
//!
//! Everything about query results that does not need a network or a clock:
//!
//! - [`condition`]: the flat AND-conjunction of filter predicates.
//! - [`evaluator`]: local evaluation of conditions, the degraded path when
//!   the backend is unavailable.
//! - [`aggregate`]: group-by / sum with synthesized column descriptors.
//! - [`selection`]: picks the aggregation input from grid snapshots.
//! - [`session`]: the ordered tab store with its active-tab pointer.
//! - [`config`]: `dq.toml` and the module registry.
//! - [`parser`]: the console's condition syntax.

pub mod aggregate;
pub mod column;
pub mod condition;
pub mod config;
pub mod evaluator;
pub mod parser;
pub mod row;
pub mod selection;
pub mod session;

pub use aggregate::{aggregate, Aggregation, AggregationRequest, AggregateError};
pub use column::{ColumnDescriptor, ColumnKind};
pub use condition::{Condition, Operator, QueryRequest};
pub use config::{Config, DataQueryConfig};
pub use row::Row;
pub use selection::{GridSnapshot, GridView, InputSource};
pub use session::{QueryTab, TabId, TabSession, TabState};
