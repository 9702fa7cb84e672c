//! # Configuration
//!
//! `dq.toml` drives both the console and the demo backend:
//!
//! ```toml
//! [gateway]
//! base_url = "http://127.0.0.1:3000"
//! timeout_ms = 10000
//!
//! [hub]
//! fail_rate = 0.25
//!
//! [[modules]]
//! id = "xms"
//! name = "XMS Module (Trades)"
//! api_endpoint = "/api/trades"
//! numeric_columns = ["amount", "id"]
//! group_by_fields = ["tradeType", "currency"]
//! col_defs = [{ field = "amount", header_label = "Amount", kind = "number" }]
//! ```
//!
//! Every section is optional. Without `[[modules]]` the builtin `xms` and
//! `libra` modules are registered.

use crate::column::{ColumnDescriptor, ColumnKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("duplicate module id '{0}'")]
    DuplicateModule(String),
}

/// A field offered by the module's filter form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterField {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub kind: ColumnKind,
}

/// Static description of one data module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQueryConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub api_endpoint: String,
    #[serde(default)]
    pub col_defs: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub filter_fields: Vec<FilterField>,
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    #[serde(default)]
    pub group_by_fields: Vec<String>,
}

impl DataQueryConfig {
    /// Fields shown in the grid, in column order.
    pub fn column_fields(&self) -> Vec<String> {
        self.col_defs.iter().map(|c| c.field.clone()).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Fraction of query calls answered with HTTP 503.
    #[serde(default)]
    pub fail_rate: f64,
    #[serde(default = "default_rows_per_dataset")]
    pub rows_per_dataset: usize,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            fail_rate: 0.0,
            rows_per_dataset: default_rows_per_dataset(),
            seed: default_seed(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".into()
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_bind() -> String {
    "127.0.0.1:3000".into()
}
fn default_rows_per_dataset() -> usize {
    200
}
fn default_seed() -> u64 {
    7
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default = "builtin_modules")]
    pub modules: Vec<DataQueryConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            hub: HubConfig::default(),
            modules: builtin_modules(),
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        let mut seen: Vec<&str> = Vec::new();
        for module in &config.modules {
            if seen.contains(&module.id.as_str()) {
                return Err(ConfigError::DuplicateModule(module.id.clone()));
            }
            seen.push(&module.id);
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("Config {:?} not found, using builtin modules", path);
            Ok(Self::default())
        }
    }

    pub fn module(&self, id: &str) -> Option<&DataQueryConfig> {
        self.modules.iter().find(|m| m.id == id)
    }
}

// =============================================================================
// Builtin modules
// =============================================================================

/// The registry shipped with the workspace: XMS trades and Libra assets.
pub fn builtin_modules() -> Vec<DataQueryConfig> {
    vec![
        DataQueryConfig {
            id: "xms".into(),
            name: "XMS Module (Trades)".into(),
            description: "Query and view XMS Trades data.".into(),
            api_endpoint: "/api/trades".into(),
            col_defs: vec![
                ColumnDescriptor::new("id", "ID", ColumnKind::Number).with_max_width(100),
                ColumnDescriptor::new("tradeType", "Trade Type", ColumnKind::Text),
                ColumnDescriptor::new("tradeDate", "Trade Date", ColumnKind::Date),
                ColumnDescriptor::new("amount", "Amount", ColumnKind::Number),
                ColumnDescriptor::new("currency", "Currency", ColumnKind::Text).with_max_width(150),
                ColumnDescriptor::new("counterparty", "Counterparty", ColumnKind::Text),
            ],
            filter_fields: vec![
                filter_field("tradeType", "Trade Type"),
                filter_field("currency", "Currency"),
                filter_field("counterparty", "Counterparty"),
            ],
            numeric_columns: vec!["amount".into(), "id".into()],
            group_by_fields: vec![
                "tradeType".into(),
                "currency".into(),
                "counterparty".into(),
            ],
        },
        DataQueryConfig {
            id: "libra".into(),
            name: "Libra Module (Assets)".into(),
            description: "Query and view CryptoAssets data.".into(),
            api_endpoint: "/api/cryptoassets".into(),
            col_defs: vec![
                ColumnDescriptor::new("id", "ID", ColumnKind::Number).with_max_width(100),
                ColumnDescriptor::new("symbol", "Symbol", ColumnKind::Text),
                ColumnDescriptor::new("marketCap", "Market Cap", ColumnKind::Number),
                ColumnDescriptor::new("listingDate", "Listing Date", ColumnKind::Date),
            ],
            filter_fields: vec![filter_field("symbol", "Symbol")],
            numeric_columns: vec!["marketCap".into(), "id".into()],
            group_by_fields: vec!["symbol".into()],
        },
    ]
}

fn filter_field(name: &str, label: &str) -> FilterField {
    FilterField {
        name: name.into(),
        label: label.into(),
        kind: ColumnKind::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.gateway.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.hub.fail_rate, 0.0);
        assert!(config.module("xms").is_some());
        assert!(config.module("libra").is_some());
    }

    #[test]
    fn test_custom_modules_replace_builtins() {
        let raw = r#"
            [gateway]
            base_url = "http://backend:8080"

            [[modules]]
            id = "desk"
            name = "Desk"
            api_endpoint = "/api/desk"
            numeric_columns = ["pnl"]
            group_by_fields = ["book"]
            col_defs = [
                { field = "book", header_label = "Book" },
                { field = "pnl", header_label = "P&L", kind = "number", max_width = 120 },
            ]
        "#;
        let config = Config::from_toml_str(raw).unwrap();
        assert_eq!(config.gateway.base_url, "http://backend:8080");
        assert_eq!(config.gateway.timeout_ms, 10_000);
        assert_eq!(config.modules.len(), 1);
        let desk = config.module("desk").unwrap();
        assert_eq!(desk.col_defs[0].kind, ColumnKind::Text);
        assert_eq!(desk.col_defs[1].max_width, Some(120));
        assert_eq!(desk.column_fields(), vec!["book", "pnl"]);
        assert!(config.module("xms").is_none());
    }

    #[test]
    fn test_duplicate_module_ids_are_rejected() {
        let raw = r#"
            [[modules]]
            id = "a"
            name = "A"
            api_endpoint = "/api/a"

            [[modules]]
            id = "a"
            name = "A again"
            api_endpoint = "/api/a2"
        "#;
        assert!(matches!(
            Config::from_toml_str(raw),
            Err(ConfigError::DuplicateModule(id)) if id == "a"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[hub]\nfail_rate = 0.5\nseed = 42").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.hub.fail_rate, 0.5);
        assert_eq!(config.hub.seed, 42);
        assert_eq!(config.hub.rows_per_dataset, 200);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.modules.len(), 2);
        assert!(Config::load(&dir.path().join("absent.toml")).is_err());
    }
}
