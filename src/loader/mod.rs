//! Data loader for the four CSV inputs
//!
//! Reads actuals, budget, fx and cash tables from files or in-memory
//! buffers, resolving columns through a [`ColumnMapping`]. Required
//! columns are validated up front; every numeric field is parsed strictly.

use crate::config::{ColumnConfig, ColumnMapping, DataSources, TableKind};
use crate::error::CopilotError;
use crate::models::{Account, CashRow, FxRate, Period, Row, BASE_CURRENCY};
use crate::Result;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs;
use tracing::debug;

/// Raw bytes of the four input files, exactly as read or uploaded
#[derive(Debug, Clone, Default)]
pub struct RawInputs {
    pub actuals: Vec<u8>,
    pub budget: Vec<u8>,
    pub fx: Vec<u8>,
    pub cash: Vec<u8>,
}

impl RawInputs {
    pub fn from_sources(sources: &DataSources) -> Result<Self> {
        let read = |kind: TableKind| -> Result<Vec<u8>> {
            let path = sources.path(kind);
            fs::read(path).map_err(|e| {
                CopilotError::IoError(std::io::Error::new(
                    e.kind(),
                    format!("failed to read {}: {}", path.display(), e),
                ))
            })
        };

        Ok(Self {
            actuals: read(TableKind::Actuals)?,
            budget: read(TableKind::Budget)?,
            fx: read(TableKind::Fx)?,
            cash: read(TableKind::Cash)?,
        })
    }

    pub fn from_text(actuals: &str, budget: &str, fx: &str, cash: &str) -> Self {
        Self {
            actuals: actuals.as_bytes().to_vec(),
            budget: budget.as_bytes().to_vec(),
            fx: fx.as_bytes().to_vec(),
            cash: cash.as_bytes().to_vec(),
        }
    }

    pub fn get(&self, kind: TableKind) -> &[u8] {
        match kind {
            TableKind::Actuals => &self.actuals,
            TableKind::Budget => &self.budget,
            TableKind::Fx => &self.fx,
            TableKind::Cash => &self.cash,
        }
    }
}

/// Parsed rows of all four inputs
#[derive(Debug, Clone, Default)]
pub struct LoadedTables {
    pub actuals: Vec<Row>,
    pub budget: Vec<Row>,
    pub fx: Vec<FxRate>,
    pub cash: Vec<CashRow>,
}

pub fn load_tables(inputs: &RawInputs, columns: &ColumnConfig) -> Result<LoadedTables> {
    let tables = LoadedTables {
        actuals: read_ledger(inputs.get(TableKind::Actuals), TableKind::Actuals, &columns.actuals)?,
        budget: read_ledger(inputs.get(TableKind::Budget), TableKind::Budget, &columns.budget)?,
        fx: read_fx(inputs.get(TableKind::Fx), &columns.fx)?,
        cash: read_cash(inputs.get(TableKind::Cash), &columns.cash)?,
    };

    debug!(
        actuals = tables.actuals.len(),
        budget = tables.budget.len(),
        fx = tables.fx.len(),
        cash = tables.cash.len(),
        "Tables loaded"
    );

    Ok(tables)
}

//
// ================= Header Resolution =================
//

struct Headers {
    file: &'static str,
    names: Vec<String>,
}

impl Headers {
    fn new(kind: TableKind, record: &StringRecord) -> Self {
        Self {
            file: kind.file_name(),
            names: record.iter().map(|h| h.trim().to_ascii_lowercase()).collect(),
        }
    }

    fn optional(&self, column: &str) -> Option<usize> {
        let wanted = column.trim().to_ascii_lowercase();
        self.names.iter().position(|name| *name == wanted)
    }

    fn require(&self, column: &str) -> Result<usize> {
        self.optional(column).ok_or_else(|| CopilotError::Schema {
            file: self.file.to_string(),
            column: column.to_string(),
        })
    }
}

/// Cursor over one record that reports parse failures with file, line and column
struct Cells<'a> {
    file: &'static str,
    line: usize,
    record: &'a StringRecord,
}

impl<'a> Cells<'a> {
    fn text(&self, idx: usize) -> &'a str {
        self.record.get(idx).unwrap_or("")
    }

    fn parse_error(&self, column: &str, value: &str) -> CopilotError {
        CopilotError::Parse {
            file: self.file.to_string(),
            line: self.line,
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    fn period(&self, idx: usize, column: &str) -> Result<Period> {
        let raw = self.text(idx);
        raw.parse().map_err(|_| self.parse_error(column, raw))
    }

    fn number(&self, idx: usize, column: &str) -> Result<f64> {
        let raw = self.text(idx);
        match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(value),
            _ => Err(self.parse_error(column, raw)),
        }
    }

    fn currency(&self, idx: Option<usize>) -> String {
        match idx.map(|i| self.text(i).trim()) {
            Some(code) if !code.is_empty() => code.to_ascii_uppercase(),
            _ => BASE_CURRENCY.to_string(),
        }
    }

    fn entity(&self, idx: Option<usize>) -> String {
        idx.map(|i| self.text(i).trim().to_string()).unwrap_or_default()
    }
}

/// Iterate the records of one CSV buffer, handing each to `visit`
fn for_each_record<F>(bytes: &[u8], kind: TableKind, mut visit: F) -> Result<()>
where
    F: FnMut(&Headers, &Cells<'_>) -> Result<()>,
{
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(bytes);

    let headers = Headers::new(kind, reader.headers()?);

    for (idx, result) in reader.records().enumerate() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);

        let cells = Cells {
            file: kind.file_name(),
            line,
            record: &record,
        };
        visit(&headers, &cells)?;
    }

    Ok(())
}

//
// ================= Table Readers =================
//

/// Read an actuals or budget table
pub fn read_ledger(bytes: &[u8], kind: TableKind, mapping: &ColumnMapping) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    let mut columns = None;

    for_each_record(bytes, kind, |headers, cells| {
        let (period, entity, account, amount, currency) = match columns {
            Some(cols) => cols,
            None => {
                let cols = (
                    headers.require(mapping.period())?,
                    headers.optional(mapping.entity()),
                    headers.require(mapping.account())?,
                    headers.require(mapping.amount(kind))?,
                    headers.optional(mapping.currency()),
                );
                columns = Some(cols);
                cols
            }
        };

        rows.push(Row {
            period: cells.period(period, mapping.period())?,
            entity: cells.entity(entity),
            account: Account::parse(cells.text(account)),
            amount: cells.number(amount, mapping.amount(kind))?,
            currency: cells.currency(currency),
        });
        Ok(())
    })?;

    // Header-only files still need their schema checked
    if columns.is_none() {
        validate_headers(bytes, kind, &[mapping.period(), mapping.account(), mapping.amount(kind)])?;
    }

    Ok(rows)
}

pub fn read_fx(bytes: &[u8], mapping: &ColumnMapping) -> Result<Vec<FxRate>> {
    let kind = TableKind::Fx;
    let mut rates = Vec::new();
    let mut columns = None;

    for_each_record(bytes, kind, |headers, cells| {
        let (period, currency, rate) = match columns {
            Some(cols) => cols,
            None => {
                let cols = (
                    headers.require(mapping.period())?,
                    headers.require(mapping.currency())?,
                    headers.require(mapping.amount(kind))?,
                );
                columns = Some(cols);
                cols
            }
        };

        let rate_to_usd = cells.number(rate, mapping.amount(kind))?;
        if rate_to_usd <= 0.0 {
            return Err(cells.parse_error(mapping.amount(kind), cells.text(rate)));
        }

        rates.push(FxRate {
            period: cells.period(period, mapping.period())?,
            currency: cells.currency(Some(currency)),
            rate_to_usd,
        });
        Ok(())
    })?;

    if columns.is_none() {
        validate_headers(bytes, kind, &[mapping.period(), mapping.currency(), mapping.amount(kind)])?;
    }

    Ok(rates)
}

pub fn read_cash(bytes: &[u8], mapping: &ColumnMapping) -> Result<Vec<CashRow>> {
    let kind = TableKind::Cash;
    let mut rows = Vec::new();
    let mut columns = None;

    for_each_record(bytes, kind, |headers, cells| {
        let (period, entity, balance, currency) = match columns {
            Some(cols) => cols,
            None => {
                let cols = (
                    headers.require(mapping.period())?,
                    headers.optional(mapping.entity()),
                    headers.require(mapping.amount(kind))?,
                    headers.optional(mapping.currency()),
                );
                columns = Some(cols);
                cols
            }
        };

        rows.push(CashRow {
            period: cells.period(period, mapping.period())?,
            entity: cells.entity(entity),
            cash_balance: cells.number(balance, mapping.amount(kind))?,
            currency: cells.currency(currency),
        });
        Ok(())
    })?;

    if columns.is_none() {
        validate_headers(bytes, kind, &[mapping.period(), mapping.amount(kind)])?;
    }

    Ok(rows)
}

fn validate_headers(bytes: &[u8], kind: TableKind, required: &[&str]) -> Result<()> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let headers = Headers::new(kind, reader.headers()?);
    for column in required {
        headers.require(column)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTUALS: &str = "\
period,entity,account,amount,currency
2025-06,ParentCo,Revenue,120000,USD
2025-06,EMEA,Opex:R&D,5000,eur
2025-06,ParentCo,COGS,30000,
";

    #[test]
    fn test_read_ledger() {
        let rows = read_ledger(ACTUALS.as_bytes(), TableKind::Actuals, &ColumnMapping::default()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].account, Account::Revenue);
        assert_eq!(rows[0].amount, 120000.0);
        assert_eq!(rows[1].currency, "EUR");
        assert_eq!(rows[1].account, Account::Opex("R&D".into()));
        // empty currency cell falls back to USD
        assert_eq!(rows[2].currency, "USD");
    }

    #[test]
    fn test_missing_currency_column_defaults_to_usd() {
        let csv = "period,account,amount\n2025-06,Revenue,10\n";
        let rows = read_ledger(csv.as_bytes(), TableKind::Budget, &ColumnMapping::default()).unwrap();
        assert_eq!(rows[0].currency, "USD");
        assert_eq!(rows[0].entity, "");
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let csv = "period,entity,account,value\n2025-06,A,Revenue,10\n";
        let err = read_ledger(csv.as_bytes(), TableKind::Actuals, &ColumnMapping::default()).unwrap_err();
        match err {
            CopilotError::Schema { file, column } => {
                assert_eq!(file, "actuals.csv");
                assert_eq!(column, "amount");
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_header_only_file_still_validated() {
        let err = read_fx(b"period,rate_to_usd\n", &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, CopilotError::Schema { ref column, .. } if column == "currency"));

        let rates = read_fx(b"period,currency,rate_to_usd\n", &ColumnMapping::default()).unwrap();
        assert!(rates.is_empty());
    }

    #[test]
    fn test_non_numeric_amount_is_parse_error() {
        let csv = "period,entity,account,amount\n2025-06,A,Revenue,10\n2025-06,A,COGS,abc\n";
        let err = read_ledger(csv.as_bytes(), TableKind::Actuals, &ColumnMapping::default()).unwrap_err();
        match err {
            CopilotError::Parse { line, column, value, .. } => {
                assert_eq!(line, 3);
                assert_eq!(column, "amount");
                assert_eq!(value, "abc");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_remapped_columns() {
        let csv = "Month,Line,Value,CCY\nJune 2025,Revenue,42,gbp\n";
        let mapping = ColumnMapping {
            period_col: Some("month".into()),
            account_col: Some("line".into()),
            amount_col: Some("value".into()),
            currency_col: Some("ccy".into()),
            ..Default::default()
        };
        let rows = read_ledger(csv.as_bytes(), TableKind::Actuals, &mapping).unwrap();
        assert_eq!(rows[0].period, Period::new(2025, 6).unwrap());
        assert_eq!(rows[0].currency, "GBP");
    }

    #[test]
    fn test_fx_rate_must_be_positive() {
        let csv = "period,currency,rate_to_usd\n2025-06,EUR,0\n";
        let err = read_fx(csv.as_bytes(), &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, CopilotError::Parse { .. }));
    }

    #[test]
    fn test_read_cash() {
        let csv = "period,entity,cash_balance,currency\n2025-06-30,ParentCo,450000,USD\n";
        let rows = read_cash(csv.as_bytes(), &ColumnMapping::default()).unwrap();
        assert_eq!(rows[0].period.to_string(), "2025-06");
        assert_eq!(rows[0].cash_balance, 450000.0);
    }

    #[test]
    fn test_bad_period_is_parse_error() {
        let csv = "period,cash_balance\nsoon,1\n";
        let err = read_cash(csv.as_bytes(), &ColumnMapping::default()).unwrap_err();
        assert!(matches!(err, CopilotError::Parse { ref column, .. } if column == "period"));
    }
}
