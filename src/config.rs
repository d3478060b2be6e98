//! Configuration: data file locations and per-file column remapping
//!
//! Everything is read from the environment (after `dotenv`), and column
//! mappings can also arrive as partial JSON with an API request.

use crate::error::CopilotError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "fixtures";
const DEFAULT_PORT: u16 = 8080;

/// The four input tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Actuals,
    Budget,
    Fx,
    Cash,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::Actuals,
        TableKind::Budget,
        TableKind::Fx,
        TableKind::Cash,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            TableKind::Actuals => "actuals.csv",
            TableKind::Budget => "budget.csv",
            TableKind::Fx => "fx.csv",
            TableKind::Cash => "cash.csv",
        }
    }

    fn env_prefix(&self) -> &'static str {
        match self {
            TableKind::Actuals => "COPILOT_ACTUALS",
            TableKind::Budget => "COPILOT_BUDGET",
            TableKind::Fx => "COPILOT_FX",
            TableKind::Cash => "COPILOT_CASH",
        }
    }

    /// Column holding the numeric value of each row
    fn default_amount_col(&self) -> &'static str {
        match self {
            TableKind::Actuals | TableKind::Budget => "amount",
            TableKind::Fx => "rate_to_usd",
            TableKind::Cash => "cash_balance",
        }
    }
}

/// Column-name remapping for one file. Unset fields fall back to the
/// standard schema names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub period_col: Option<String>,
    pub entity_col: Option<String>,
    pub account_col: Option<String>,
    pub amount_col: Option<String>,
    pub currency_col: Option<String>,
}

impl ColumnMapping {
    pub fn period(&self) -> &str {
        self.period_col.as_deref().unwrap_or("period")
    }

    pub fn entity(&self) -> &str {
        self.entity_col.as_deref().unwrap_or("entity")
    }

    pub fn account(&self) -> &str {
        self.account_col.as_deref().unwrap_or("account")
    }

    pub fn amount(&self, kind: TableKind) -> &str {
        self.amount_col
            .as_deref()
            .unwrap_or_else(|| kind.default_amount_col())
    }

    pub fn currency(&self) -> &str {
        self.currency_col.as_deref().unwrap_or("currency")
    }

    /// Read `COPILOT_<FILE>_<FIELD>_COL` overrides through `lookup`
    pub fn from_lookup<F>(kind: TableKind, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let field = |name: &str| {
            lookup(&format!("{}_{}_COL", kind.env_prefix(), name))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            period_col: field("PERIOD"),
            entity_col: field("ENTITY"),
            account_col: field("ACCOUNT"),
            amount_col: field("AMOUNT"),
            currency_col: field("CURRENCY"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub actuals: ColumnMapping,
    pub budget: ColumnMapping,
    pub fx: ColumnMapping,
    pub cash: ColumnMapping,
}

impl ColumnConfig {
    pub fn for_table(&self, kind: TableKind) -> &ColumnMapping {
        match kind {
            TableKind::Actuals => &self.actuals,
            TableKind::Budget => &self.budget,
            TableKind::Fx => &self.fx,
            TableKind::Cash => &self.cash,
        }
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            actuals: ColumnMapping::from_lookup(TableKind::Actuals, &lookup),
            budget: ColumnMapping::from_lookup(TableKind::Budget, &lookup),
            fx: ColumnMapping::from_lookup(TableKind::Fx, &lookup),
            cash: ColumnMapping::from_lookup(TableKind::Cash, &lookup),
        }
    }
}

/// File paths of the four input tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSources {
    pub actuals: PathBuf,
    pub budget: PathBuf,
    pub fx: PathBuf,
    pub cash: PathBuf,
}

impl DataSources {
    /// Standard file names inside one directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            actuals: dir.join(TableKind::Actuals.file_name()),
            budget: dir.join(TableKind::Budget.file_name()),
            fx: dir.join(TableKind::Fx.file_name()),
            cash: dir.join(TableKind::Cash.file_name()),
        }
    }

    pub fn path(&self, kind: TableKind) -> &PathBuf {
        match kind {
            TableKind::Actuals => &self.actuals,
            TableKind::Budget => &self.budget,
            TableKind::Fx => &self.fx,
            TableKind::Cash => &self.cash,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CopilotConfig {
    pub sources: DataSources,
    pub columns: ColumnConfig,
    pub port: u16,
}

impl CopilotConfig {
    /// Build from process environment. Call `dotenv::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("COPILOT_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
        let mut sources = DataSources::in_dir(data_dir);

        for kind in TableKind::ALL {
            if let Some(path) = lookup(&format!("{}_PATH", kind.env_prefix())) {
                let path = PathBuf::from(path);
                match kind {
                    TableKind::Actuals => sources.actuals = path,
                    TableKind::Budget => sources.budget = path,
                    TableKind::Fx => sources.fx = path,
                    TableKind::Cash => sources.cash = path,
                }
            }
        }

        let port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| CopilotError::Config(format!("invalid port '{}'", raw)))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            sources,
            columns: ColumnConfig::from_lookup(&lookup),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = CopilotConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.sources.fx, PathBuf::from("fixtures/fx.csv"));

        let fx = config.columns.for_table(TableKind::Fx);
        assert_eq!(fx.amount(TableKind::Fx), "rate_to_usd");
        assert_eq!(fx.period(), "period");
        assert_eq!(
            config.columns.cash.amount(TableKind::Cash),
            "cash_balance"
        );
    }

    #[test]
    fn test_env_overrides() {
        let config = CopilotConfig::from_lookup(lookup_from(&[
            ("COPILOT_DATA_DIR", "/data"),
            ("COPILOT_CASH_PATH", "/other/cash.csv"),
            ("COPILOT_ACTUALS_AMOUNT_COL", "value_local"),
            ("COPILOT_BUDGET_PERIOD_COL", " month "),
            ("API_PORT", "9000"),
        ]))
        .unwrap();

        assert_eq!(config.sources.actuals, PathBuf::from("/data/actuals.csv"));
        assert_eq!(config.sources.cash, PathBuf::from("/other/cash.csv"));
        assert_eq!(config.columns.actuals.amount(TableKind::Actuals), "value_local");
        assert_eq!(config.columns.budget.period(), "month");
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_invalid_port() {
        let err = CopilotConfig::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, CopilotError::Config(_)));
    }

    #[test]
    fn test_partial_json_mapping() {
        let columns: ColumnConfig =
            serde_json::from_str(r#"{"actuals": {"amount_col": "amt"}}"#).unwrap();
        assert_eq!(columns.actuals.amount(TableKind::Actuals), "amt");
        assert_eq!(columns.actuals.currency(), "currency");
        assert_eq!(columns.fx.amount(TableKind::Fx), "rate_to_usd");
    }
}
