//! Immutable data context
//!
//! Everything a question is answered from: the parsed tables, the fx
//! index and a fingerprint of the raw inputs. Built once, then shared by
//! reference (or `Arc`) across questions; nothing mutates it after load.

use crate::config::{ColumnConfig, DataSources, TableKind};
use crate::error::CopilotError;
use crate::fx::FxTable;
use crate::loader::{load_tables, LoadedTables, RawInputs};
use crate::models::{CashRow, Period, Row};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;

#[derive(Debug, Clone)]
pub struct DataContext {
    tables: LoadedTables,
    fx: FxTable,
    fingerprint: String,
    loaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextSummary {
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
    pub actuals_rows: usize,
    pub budget_rows: usize,
    pub fx_rates: usize,
    pub cash_rows: usize,
    pub first_period: Option<Period>,
    pub latest_period: Option<Period>,
}

impl DataContext {
    pub fn load(inputs: &RawInputs, columns: &ColumnConfig) -> Result<Self> {
        let tables = load_tables(inputs, columns)?;
        let fx = FxTable::new(&tables.fx);
        let context = Self {
            tables,
            fx,
            fingerprint: compute_fingerprint(inputs),
            loaded_at: Utc::now(),
        };

        info!(
            fingerprint = %context.fingerprint,
            actuals = context.tables.actuals.len(),
            budget = context.tables.budget.len(),
            cash = context.tables.cash.len(),
            "Data context loaded"
        );

        Ok(context)
    }

    pub fn from_sources(sources: &DataSources, columns: &ColumnConfig) -> Result<Self> {
        Self::load(&RawInputs::from_sources(sources)?, columns)
    }

    pub fn actuals(&self) -> &[Row] {
        &self.tables.actuals
    }

    pub fn budget(&self) -> &[Row] {
        &self.tables.budget
    }

    pub fn cash(&self) -> &[CashRow] {
        &self.tables.cash
    }

    pub fn fx(&self) -> &FxTable {
        &self.fx
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Distinct actuals periods, ascending
    pub fn actuals_periods(&self) -> Vec<Period> {
        let mut periods: Vec<Period> = self.tables.actuals.iter().map(|r| r.period).collect();
        periods.sort();
        periods.dedup();
        periods
    }

    pub fn latest_actuals_period(&self) -> Result<Period> {
        self.tables
            .actuals
            .iter()
            .map(|r| r.period)
            .max()
            .ok_or_else(|| CopilotError::NoData("actuals.csv has no rows".to_string()))
    }

    /// The requested period, or the latest actuals period when none was named
    pub fn resolve_period(&self, period: Option<Period>) -> Result<Period> {
        match period {
            Some(period) => Ok(period),
            None => self.latest_actuals_period(),
        }
    }

    pub fn summary(&self) -> ContextSummary {
        let periods = self.actuals_periods();
        ContextSummary {
            fingerprint: self.fingerprint.clone(),
            loaded_at: self.loaded_at,
            actuals_rows: self.tables.actuals.len(),
            budget_rows: self.tables.budget.len(),
            fx_rates: self.fx.len(),
            cash_rows: self.tables.cash.len(),
            first_period: periods.first().copied(),
            latest_period: periods.last().copied(),
        }
    }
}

/// SHA-256 over the four raw inputs, each prefixed with its file name and length
pub fn compute_fingerprint(inputs: &RawInputs) -> String {
    let mut hasher = Sha256::new();
    for kind in TableKind::ALL {
        let bytes = inputs.get(kind);
        hasher.update(kind.file_name().as_bytes());
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    hex::encode(hasher.finalize())
}
