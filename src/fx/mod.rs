//! Currency normalizer
//!
//! Converts monetary rows to USD using the fx table, keyed by
//! (period, currency). USD without an explicit rate converts at 1.0; any
//! other currency without a rate for its period is a data error.

use crate::error::CopilotError;
use crate::models::{FxRate, Monetary, Period, BASE_CURRENCY};
use crate::Result;
use std::collections::HashMap;

/// A row paired with its USD conversion
#[derive(Debug, Clone, Copy)]
pub struct Normalized<'a, M> {
    pub row: &'a M,
    pub rate_to_usd: f64,
    pub amount_usd: f64,
}

#[derive(Debug, Clone, Default)]
pub struct FxTable {
    rates: HashMap<(Period, String), f64>,
}

impl FxTable {
    /// Index rates by (period, currency); a later row for the same key wins
    pub fn new(rates: &[FxRate]) -> Self {
        let rates = rates
            .iter()
            .map(|r| ((r.period, r.currency.to_ascii_uppercase()), r.rate_to_usd))
            .collect();
        Self { rates }
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn rate(&self, period: Period, currency: &str) -> Result<f64> {
        let currency = currency.trim().to_ascii_uppercase();
        if let Some(rate) = self.rates.get(&(period, currency.clone())) {
            return Ok(*rate);
        }
        if currency == BASE_CURRENCY {
            return Ok(1.0);
        }
        Err(CopilotError::MissingFxRate {
            currency,
            period: period.to_string(),
        })
    }

    pub fn normalize_row<'a, M: Monetary>(&self, row: &'a M) -> Result<Normalized<'a, M>> {
        let rate_to_usd = self.rate(row.period(), row.currency())?;
        Ok(Normalized {
            row,
            rate_to_usd,
            amount_usd: row.amount() * rate_to_usd,
        })
    }

    /// Convert every row, failing on the first one without a rate
    pub fn normalize<'a, M, I>(&self, rows: I) -> Result<Vec<Normalized<'a, M>>>
    where
        M: Monetary + 'a,
        I: IntoIterator<Item = &'a M>,
    {
        rows.into_iter().map(|row| self.normalize_row(row)).collect()
    }

    pub fn sum_usd<'a, M, I>(&self, rows: I) -> Result<f64>
    where
        M: Monetary + 'a,
        I: IntoIterator<Item = &'a M>,
    {
        let mut total = 0.0;
        for row in rows {
            total += self.normalize_row(row)?.amount_usd;
        }
        Ok(total)
    }
}
