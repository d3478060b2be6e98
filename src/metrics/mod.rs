//! Metric functions
//!
//! Pure functions over a [`DataContext`]. Each converts the rows it needs
//! to USD and aggregates; none of them mutate the context.

use crate::context::DataContext;
use crate::error::CopilotError;
use crate::models::{Account, Period, Row};
use crate::Result;
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of trailing month-over-month cash changes averaged for burn
pub const BURN_WINDOW: usize = 3;

pub const DEFAULT_MARGIN_MONTHS: usize = 3;

//
// ================= Result Types =================
//

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueVsBudget {
    pub period: Period,
    pub actual: f64,
    pub budget: f64,
    /// actual - budget
    pub variance: f64,
    /// `None` when the budget is zero
    pub variance_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarginPoint {
    pub period: Period,
    pub revenue: f64,
    pub cogs: f64,
    /// `None` when revenue is zero
    pub margin_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpexCategory {
    pub category: String,
    pub amount_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpexBreakdown {
    pub period: Period,
    /// Sorted by amount, largest first
    pub categories: Vec<OpexCategory>,
}

impl OpexBreakdown {
    pub fn total(&self) -> f64 {
        self.categories.iter().map(|c| c.amount_usd).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EbitdaProxy {
    pub period: Period,
    pub revenue: f64,
    pub cogs: f64,
    pub opex: f64,
    pub ebitda: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Runway {
    Finite { months: f64 },
    Infinite,
}

impl Runway {
    pub fn months(&self) -> Option<f64> {
        match self {
            Runway::Finite { months } => Some(*months),
            Runway::Infinite => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashPoint {
    pub period: Period,
    pub balance_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBurn {
    pub period: Period,
    /// Previous balance minus this balance; positive means cash went down
    pub burn: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashRunway {
    pub as_of: Period,
    pub cash_balance: f64,
    pub avg_monthly_burn: f64,
    pub runway: Runway,
    pub burns: Vec<MonthlyBurn>,
    pub balances: Vec<CashPoint>,
}

//
// ================= Helpers =================
//

fn sum_account<F>(ctx: &DataContext, rows: &[Row], period: Period, select: F) -> Result<f64>
where
    F: Fn(&Account) -> bool,
{
    ctx.fx()
        .sum_usd(rows.iter().filter(|r| r.period == period && select(&r.account)))
}

fn is_revenue(account: &Account) -> bool {
    *account == Account::Revenue
}

fn is_cogs(account: &Account) -> bool {
    *account == Account::Cogs
}

//
// ================= Metrics =================
//

pub fn revenue_vs_budget(ctx: &DataContext, period: Option<Period>) -> Result<RevenueVsBudget> {
    let period = ctx.resolve_period(period)?;
    let actual = sum_account(ctx, ctx.actuals(), period, is_revenue)?;
    let budget = sum_account(ctx, ctx.budget(), period, is_revenue)?;
    let variance = actual - budget;

    Ok(RevenueVsBudget {
        period,
        actual,
        budget,
        variance,
        variance_pct: (budget != 0.0).then(|| variance / budget * 100.0),
    })
}

/// Gross margin % for each of the last `last_n_months` actuals periods
pub fn gross_margin_trend(ctx: &DataContext, last_n_months: usize) -> Result<Vec<MarginPoint>> {
    if last_n_months == 0 {
        return Err(CopilotError::InvalidInput(
            "the margin trend needs at least one month".to_string(),
        ));
    }

    let periods = ctx.actuals_periods();
    if periods.is_empty() {
        return Err(CopilotError::NoData("actuals.csv has no rows".to_string()));
    }

    let start = periods.len().saturating_sub(last_n_months);
    periods[start..]
        .iter()
        .map(|&period| {
            let revenue = sum_account(ctx, ctx.actuals(), period, is_revenue)?;
            let cogs = sum_account(ctx, ctx.actuals(), period, is_cogs)?;
            Ok(MarginPoint {
                period,
                revenue,
                cogs,
                margin_pct: (revenue != 0.0).then(|| (revenue - cogs) / revenue * 100.0),
            })
        })
        .collect()
}

pub fn opex_breakdown(ctx: &DataContext, period: Option<Period>) -> Result<OpexBreakdown> {
    let period = ctx.resolve_period(period)?;
    let rows = ctx
        .actuals()
        .iter()
        .filter(|r| r.period == period && r.account.opex_category().is_some());

    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for converted in ctx.fx().normalize(rows)? {
        if let Some(category) = converted.row.account.opex_category() {
            *totals.entry(category.to_string()).or_insert(0.0) += converted.amount_usd;
        }
    }

    let mut categories: Vec<OpexCategory> = totals
        .into_iter()
        .map(|(category, amount_usd)| OpexCategory {
            category,
            amount_usd,
        })
        .collect();
    // stable sort keeps the name order of the BTreeMap for equal amounts
    categories.sort_by(|a, b| b.amount_usd.total_cmp(&a.amount_usd));

    Ok(OpexBreakdown { period, categories })
}

pub fn ebitda_proxy(ctx: &DataContext, period: Option<Period>) -> Result<EbitdaProxy> {
    let period = ctx.resolve_period(period)?;
    let revenue = sum_account(ctx, ctx.actuals(), period, is_revenue)?;
    let cogs = sum_account(ctx, ctx.actuals(), period, is_cogs)?;
    let opex = opex_breakdown(ctx, Some(period))?.total();

    Ok(EbitdaProxy {
        period,
        revenue,
        cogs,
        opex,
        ebitda: revenue - cogs - opex,
    })
}

/// Months of cash left at the average burn of the last [`BURN_WINDOW`] months
pub fn cash_runway(ctx: &DataContext) -> Result<CashRunway> {
    let mut by_period: BTreeMap<Period, f64> = BTreeMap::new();
    for converted in ctx.fx().normalize(ctx.cash())? {
        *by_period.entry(converted.row.period).or_insert(0.0) += converted.amount_usd;
    }

    let balances: Vec<CashPoint> = by_period
        .into_iter()
        .map(|(period, balance_usd)| CashPoint {
            period,
            balance_usd,
        })
        .collect();

    let latest = balances
        .last()
        .cloned()
        .ok_or_else(|| CopilotError::NoData("cash.csv has no rows".to_string()))?;

    let all_burns: Vec<MonthlyBurn> = balances
        .windows(2)
        .map(|pair| MonthlyBurn {
            period: pair[1].period,
            burn: pair[0].balance_usd - pair[1].balance_usd,
        })
        .collect();
    let burns = all_burns[all_burns.len().saturating_sub(BURN_WINDOW)..].to_vec();

    let positive: Vec<f64> = burns.iter().map(|b| b.burn).filter(|b| *b > 0.0).collect();
    let avg_monthly_burn = if positive.is_empty() {
        0.0
    } else {
        positive.iter().sum::<f64>() / positive.len() as f64
    };

    let runway = if avg_monthly_burn > 0.0 {
        Runway::Finite {
            months: (latest.balance_usd / avg_monthly_burn).max(0.0),
        }
    } else {
        Runway::Infinite
    };

    Ok(CashRunway {
        as_of: latest.period,
        cash_balance: latest.balance_usd,
        avg_monthly_burn,
        runway,
        burns,
        balances,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnConfig;
    use crate::loader::RawInputs;

    const ACTUALS: &str = "\
period,entity,account,amount,currency
2025-04,ParentCo,Revenue,100000,USD
2025-04,ParentCo,COGS,40000,USD
2025-04,ParentCo,Opex:S&M,10000,USD
2025-05,ParentCo,Revenue,0,USD
2025-05,ParentCo,COGS,5000,USD
2025-06,ParentCo,Revenue,100000,USD
2025-06,EMEA,Revenue,20000,EUR
2025-06,ParentCo,COGS,45000,USD
2025-06,ParentCo,Opex:S&M,12000,USD
2025-06,ParentCo,Opex:R&D,15000,USD
2025-06,EMEA,Opex:R&D,1000,EUR
2025-06,ParentCo,Opex:G&A,8000,USD
";
    const BUDGET: &str = "\
period,entity,account,amount,currency
2025-06,ParentCo,Revenue,100000,USD
2025-05,ParentCo,Revenue,0,USD
";
    const FX: &str = "\
period,currency,rate_to_usd
2025-06,EUR,1.0
";
    const CASH: &str = "\
period,entity,cash_balance,currency
2025-04,ParentCo,500000,USD
2025-05,ParentCo,480000,USD
2025-06,ParentCo,450000,USD
";

    fn ctx_with(actuals: &str, cash: &str) -> DataContext {
        let inputs = RawInputs::from_text(actuals, BUDGET, FX, cash);
        DataContext::load(&inputs, &ColumnConfig::default()).unwrap()
    }

    fn ctx() -> DataContext {
        ctx_with(ACTUALS, CASH)
    }

    fn june() -> Option<Period> {
        Period::new(2025, 6)
    }

    #[test]
    fn test_revenue_vs_budget_variance() {
        let result = revenue_vs_budget(&ctx(), june()).unwrap();
        assert_eq!(result.actual, 120000.0);
        assert_eq!(result.budget, 100000.0);
        assert_eq!(result.variance, 20000.0);
        assert_eq!(result.variance_pct, Some(20.0));
    }

    #[test]
    fn test_revenue_vs_budget_defaults_to_latest_period() {
        let result = revenue_vs_budget(&ctx(), None).unwrap();
        assert_eq!(result.period.to_string(), "2025-06");
    }

    #[test]
    fn test_zero_budget_has_undefined_variance_pct() {
        let result = revenue_vs_budget(&ctx(), Period::new(2025, 5)).unwrap();
        assert_eq!(result.variance_pct, None);
    }

    #[test]
    fn test_gross_margin_trend_flags_zero_revenue() {
        let trend = gross_margin_trend(&ctx(), 3).unwrap();
        assert_eq!(trend.len(), 3);
        assert_eq!(trend[0].margin_pct, Some(60.0));
        assert_eq!(trend[1].margin_pct, None);
        assert_eq!(trend[2].margin_pct, Some(62.5));
    }

    #[test]
    fn test_gross_margin_trend_window() {
        let trend = gross_margin_trend(&ctx(), 2).unwrap();
        let periods: Vec<String> = trend.iter().map(|p| p.period.to_string()).collect();
        assert_eq!(periods, vec!["2025-05", "2025-06"]);

        // asking for more months than exist returns what there is
        assert_eq!(gross_margin_trend(&ctx(), 12).unwrap().len(), 3);
        assert!(matches!(
            gross_margin_trend(&ctx(), 0),
            Err(CopilotError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_opex_breakdown_sorted_descending() {
        let breakdown = opex_breakdown(&ctx(), june()).unwrap();
        let names: Vec<&str> = breakdown.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["R&D", "S&M", "G&A"]);
        assert_eq!(breakdown.categories[0].amount_usd, 16000.0);
        assert_eq!(breakdown.total(), 36000.0);
    }

    #[test]
    fn test_opex_ties_break_by_name() {
        let actuals = "period,account,amount\n2025-06,Opex:B,5\n2025-06,Opex:A,5\n2025-06,Opex:C,9\n";
        let breakdown = opex_breakdown(&ctx_with(actuals, CASH), None).unwrap();
        let names: Vec<&str> = breakdown.categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_ebitda_opex_matches_breakdown_total() {
        let ctx = ctx();
        for period in [Period::new(2025, 4), Period::new(2025, 5), june()] {
            let ebitda = ebitda_proxy(&ctx, period).unwrap();
            let breakdown = opex_breakdown(&ctx, period).unwrap();
            assert_eq!(ebitda.opex, breakdown.total());
        }

        let june_ebitda = ebitda_proxy(&ctx, june()).unwrap();
        assert_eq!(june_ebitda.ebitda, 120000.0 - 45000.0 - 36000.0);
    }

    #[test]
    fn test_cash_runway_from_balances() {
        let runway = cash_runway(&ctx()).unwrap();
        assert_eq!(runway.avg_monthly_burn, 25000.0);
        assert_eq!(runway.cash_balance, 450000.0);
        assert_eq!(runway.runway, Runway::Finite { months: 18.0 });
        assert_eq!(runway.as_of.to_string(), "2025-06");
    }

    #[test]
    fn test_cash_runway_infinite_without_burn() {
        let growing = "period,cash_balance\n2025-04,100\n2025-05,150\n2025-06,200\n";
        let runway = cash_runway(&ctx_with(ACTUALS, growing)).unwrap();
        assert_eq!(runway.avg_monthly_burn, 0.0);
        assert_eq!(runway.runway, Runway::Infinite);
        assert!(runway.runway.months().is_none());

        let single = "period,cash_balance\n2025-06,200\n";
        assert_eq!(cash_runway(&ctx_with(ACTUALS, single)).unwrap().runway, Runway::Infinite);
    }

    #[test]
    fn test_cash_runway_uses_last_three_changes() {
        // the 1,000,000 drop in February falls outside the window
        let cash = "period,cash_balance\n2025-01,2000000\n2025-02,1000000\n2025-03,990000\n2025-04,960000\n2025-05,980000\n";
        let runway = cash_runway(&ctx_with(ACTUALS, cash)).unwrap();
        assert_eq!(runway.burns.len(), 3);
        // positive burns in window: 10,000 and 30,000
        assert_eq!(runway.avg_monthly_burn, 20000.0);
        assert_eq!(runway.runway, Runway::Finite { months: 49.0 });
    }

    #[test]
    fn test_missing_fx_rate_surfaces() {
        let actuals = "period,account,amount,currency\n2025-06,Revenue,10,GBP\n";
        let err = revenue_vs_budget(&ctx_with(actuals, CASH), None).unwrap_err();
        assert!(matches!(err, CopilotError::MissingFxRate { .. }));
    }

    #[test]
    fn test_empty_cash_is_no_data() {
        let err = cash_runway(&ctx_with(ACTUALS, "period,cash_balance\n")).unwrap_err();
        assert!(matches!(err, CopilotError::NoData(_)));
    }
}
