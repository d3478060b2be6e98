//! Core data models for the CFO copilot

use crate::error::CopilotError;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

//
// ================= Period =================
//

/// Calendar month, ordered chronologically and displayed as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) && (1900..=2999).contains(&year) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

const MONTH_NAMES: &[(&str, u32)] = &[
    ("jan", 1), ("january", 1),
    ("feb", 2), ("february", 2),
    ("mar", 3), ("march", 3),
    ("apr", 4), ("april", 4),
    ("may", 5),
    ("jun", 6), ("june", 6),
    ("jul", 7), ("july", 7),
    ("aug", 8), ("august", 8),
    ("sep", 9), ("sept", 9), ("september", 9),
    ("oct", 10), ("october", 10),
    ("nov", 11), ("november", 11),
    ("dec", 12), ("december", 12),
];

/// Month number for an English month name or abbreviation
pub fn month_from_name(name: &str) -> Option<u32> {
    let name = name.trim().trim_end_matches('.').to_ascii_lowercase();
    MONTH_NAMES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, month)| *month)
}

fn parse_year_month(year: &str, month: &str) -> Option<Period> {
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return None;
    }
    Period::new(year.parse().ok()?, month.parse().ok()?)
}

impl FromStr for Period {
    type Err = CopilotError;

    /// Accepts `YYYY-MM`, `YYYY/MM`, `YYYY-MM-DD`, `Month YYYY` and `Mon YYYY`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let invalid = || CopilotError::InvalidInput(format!("unrecognized period '{}'", raw));

        for format in ["%Y-%m-%d", "%Y/%m/%d"] {
            if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
                return Period::new(date.year(), date.month()).ok_or_else(invalid);
            }
        }

        let parts: Vec<&str> = raw.split(|c: char| c == '-' || c == '/').collect();
        if parts.len() == 2 {
            if let Some(period) = parse_year_month(parts[0], parts[1]) {
                return Ok(period);
            }
        }

        let words: Vec<&str> = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|w| !w.is_empty())
            .collect();
        if let [month, year] = words.as_slice() {
            if let (Some(month), Ok(year)) = (month_from_name(month), year.parse::<i32>()) {
                return Period::new(year, month).ok_or_else(invalid);
            }
        }

        Err(invalid())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

//
// ================= Ledger Rows =================
//

pub const BASE_CURRENCY: &str = "USD";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Account {
    Revenue,
    Cogs,
    /// Operating expense with its category suffix, e.g. `Opex:R&D`
    Opex(String),
    Other(String),
}

impl Account {
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("revenue") {
            return Account::Revenue;
        }
        if label.eq_ignore_ascii_case("cogs") {
            return Account::Cogs;
        }
        match label.split_once(':') {
            Some((prefix, category)) if prefix.trim().eq_ignore_ascii_case("opex") => {
                Account::Opex(category.trim().to_string())
            }
            _ => Account::Other(label.to_string()),
        }
    }

    pub fn opex_category(&self) -> Option<&str> {
        match self {
            Account::Opex(category) => Some(category.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Account::Revenue => write!(f, "Revenue"),
            Account::Cogs => write!(f, "COGS"),
            Account::Opex(category) => write!(f, "Opex:{}", category),
            Account::Other(label) => write!(f, "{}", label),
        }
    }
}

/// One actuals or budget line
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub period: Period,
    pub entity: String,
    pub account: Account,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FxRate {
    pub period: Period,
    pub currency: String,
    pub rate_to_usd: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CashRow {
    pub period: Period,
    pub entity: String,
    pub cash_balance: f64,
    pub currency: String,
}

/// A row carrying an amount in some currency for some period
pub trait Monetary {
    fn period(&self) -> Period;
    fn currency(&self) -> &str;
    fn amount(&self) -> f64;
}

impl Monetary for Row {
    fn period(&self) -> Period {
        self.period
    }

    fn currency(&self) -> &str {
        &self.currency
    }

    fn amount(&self) -> f64 {
        self.amount
    }
}

impl Monetary for CashRow {
    fn period(&self) -> Period {
        self.period
    }

    fn currency(&self) -> &str {
        &self.currency
    }

    fn amount(&self) -> f64 {
        self.cash_balance
    }
}

//
// ================= Intent & Plan =================
//

/// Parameter-free intent discriminant used by the classifier rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Revenue,
    Margin,
    Opex,
    Ebitda,
    Runway,
}

/// A classified question with its extracted parameters.
/// `period: None` means the latest period in the actuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    RevenueVsBudget { period: Option<Period> },
    #[serde(rename = "gm_trend")]
    GrossMarginTrend { last_n_months: usize },
    OpexBreakdown { period: Option<Period> },
    EbitdaProxy { period: Option<Period> },
    CashRunway,
}

impl Intent {
    /// Registry key of the tool that answers this intent
    pub fn name(&self) -> &'static str {
        match self {
            Intent::RevenueVsBudget { .. } => "revenue_vs_budget",
            Intent::GrossMarginTrend { .. } => "gm_trend",
            Intent::OpexBreakdown { .. } => "opex_breakdown",
            Intent::EbitdaProxy { .. } => "ebitda_proxy",
            Intent::CashRunway => "cash_runway",
        }
    }

    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::RevenueVsBudget { .. } => IntentKind::Revenue,
            Intent::GrossMarginTrend { .. } => IntentKind::Margin,
            Intent::OpexBreakdown { .. } => IntentKind::Opex,
            Intent::EbitdaProxy { .. } => IntentKind::Ebitda,
            Intent::CashRunway => IntentKind::Runway,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub plan_id: Uuid,
    pub question: String,
    pub intent: Intent,
    pub created_at: DateTime<Utc>,
}

//
// ================= Charts =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    /// `None` marks an undefined value (e.g. margin with zero revenue)
    pub value: Option<f64>,
}

impl ChartPoint {
    pub fn new(label: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDescriptor {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub points: Vec<ChartPoint>,
}

//
// ================= Tool I/O =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricOutput {
    pub text: String,
    pub chart: Option<ChartDescriptor>,
    pub data: serde_json::Value,
}

//
// ================= Final Answer =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub answer_id: Uuid,
    pub question: String,
    pub success: bool,
    /// Tool name of the classified intent, absent when classification failed
    pub intent: Option<String>,
    pub text: String,
    pub chart: Option<ChartDescriptor>,
    pub data: serde_json::Value,
    pub data_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub execution_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_formats() {
        let june = Period::new(2025, 6).unwrap();
        for raw in ["2025-06", "2025-6", "2025/06", "2025-06-30", "June 2025", "jun 2025", "Jun, 2025"] {
            assert_eq!(raw.parse::<Period>().unwrap(), june, "{}", raw);
        }
        assert_eq!(june.to_string(), "2025-06");
    }

    #[test]
    fn test_period_rejects_garbage() {
        for raw in ["", "2025-13", "June", "25-06", "next month"] {
            assert!(raw.parse::<Period>().is_err(), "{}", raw);
        }
    }

    #[test]
    fn test_period_ordering_and_serde() {
        let may = Period::new(2025, 5).unwrap();
        let jan_next = Period::new(2026, 1).unwrap();
        assert!(may < jan_next);

        let json = serde_json::to_string(&may).unwrap();
        assert_eq!(json, "\"2025-05\"");
        let back: Period = serde_json::from_str(&json).unwrap();
        assert_eq!(back, may);
    }

    #[test]
    fn test_account_parsing() {
        assert_eq!(Account::parse("Revenue"), Account::Revenue);
        assert_eq!(Account::parse(" cogs "), Account::Cogs);
        assert_eq!(Account::parse("Opex:R&D"), Account::Opex("R&D".into()));
        assert_eq!(Account::parse("opex: S&M"), Account::Opex("S&M".into()));
        assert_eq!(Account::parse("Interest"), Account::Other("Interest".into()));
        assert_eq!(Account::Opex("G&A".into()).to_string(), "Opex:G&A");
    }

    #[test]
    fn test_intent_serialization() {
        let intent = Intent::RevenueVsBudget {
            period: Period::new(2025, 6),
        };
        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(value["intent"], "revenue_vs_budget");
        assert_eq!(value["period"], "2025-06");
        assert_eq!(intent.name(), "revenue_vs_budget");
        assert_eq!(Intent::CashRunway.kind(), IntentKind::Runway);
    }
}
