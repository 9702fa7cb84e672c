//! # Remote Query Gateway
//!
//! The seam between a query session and the backend that owns the data.
//! `GET <endpoint>` returns a module's full row set, `POST <endpoint>/query`
//! returns the rows matching a condition list. Any failure is a
//! [`GatewayError`]; the session decides what to do with it.

use dq_core::{Condition, Row};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend answered HTTP {status}")]
    Status { status: u16 },
    #[error("malformed response: {0}")]
    Decode(String),
}

#[async_trait::async_trait]
pub trait QueryGateway: Send + Sync {
    /// Full row set of the module served at `endpoint`.
    async fn load_all(&self, endpoint: &str) -> Result<Vec<Row>, GatewayError>;

    /// Rows of `endpoint` matching every condition.
    async fn query(&self, endpoint: &str, conditions: &[Condition])
        -> Result<Vec<Row>, GatewayError>;
}
