//! # HTTP Gateway
//!
//! [`QueryGateway`] over plain JSON/HTTP with `reqwest`.

use crate::gateway::{GatewayError, QueryGateway};
use dq_core::config::GatewayConfig;
use dq_core::{Condition, Row};
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize)]
struct QueryBody<'a> {
    conditions: &'a [Condition],
}

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }
}

/// A 2xx body of `null` counts as no rows.
async fn read_rows(resp: reqwest::Response) -> Result<Vec<Row>, GatewayError> {
    let status = resp.status();
    if !status.is_success() {
        return Err(GatewayError::Status {
            status: status.as_u16(),
        });
    }
    let rows: Option<Vec<Row>> = resp
        .json()
        .await
        .map_err(|e| GatewayError::Decode(e.to_string()))?;
    Ok(rows.unwrap_or_default())
}

#[async_trait::async_trait]
impl QueryGateway for HttpGateway {
    async fn load_all(&self, endpoint: &str) -> Result<Vec<Row>, GatewayError> {
        let url = self.url(endpoint);
        tracing::debug!("GET {}", url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        read_rows(resp).await
    }

    async fn query(
        &self,
        endpoint: &str,
        conditions: &[Condition],
    ) -> Result<Vec<Row>, GatewayError> {
        let url = format!("{}/query", self.url(endpoint));
        tracing::debug!("POST {} ({} conditions)", url, conditions.len());
        let resp = self
            .client
            .post(&url)
            .json(&QueryBody { conditions })
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        read_rows(resp).await
    }
}
