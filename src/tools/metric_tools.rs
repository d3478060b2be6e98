//! One tool per metric: run the metric, format the answer text and
//! describe the chart that goes with it.

use super::format::{format_pct, format_signed_pct, format_signed_usd, format_usd};
use super::Tool;
use crate::context::DataContext;
use crate::error::CopilotError;
use crate::metrics::{
    self, CashRunway, EbitdaProxy, MarginPoint, OpexBreakdown, RevenueVsBudget, Runway,
    BURN_WINDOW,
};
use crate::models::{ChartDescriptor, ChartKind, ChartPoint, Intent, MetricOutput};
use crate::Result;
use serde::Serialize;

fn intent_mismatch(tool: &str, intent: &Intent) -> CopilotError {
    CopilotError::InvalidInput(format!("{} cannot answer a {} question", tool, intent.name()))
}

fn output<T: Serialize>(text: String, chart: ChartDescriptor, data: &T) -> Result<MetricOutput> {
    Ok(MetricOutput {
        text,
        chart: Some(chart),
        data: serde_json::to_value(data)?,
    })
}

//
// ================= Revenue vs Budget =================
//

pub fn revenue_text(r: &RevenueVsBudget) -> String {
    format!(
        "Revenue in {}: Actual {} vs Budget {} ({}, {} vs budget).",
        r.period,
        format_usd(r.actual),
        format_usd(r.budget),
        format_signed_usd(r.variance),
        format_signed_pct(r.variance_pct),
    )
}

pub fn revenue_chart(r: &RevenueVsBudget) -> ChartDescriptor {
    ChartDescriptor {
        kind: ChartKind::Bar,
        title: format!("Revenue vs Budget ({})", r.period),
        x_label: "Metric".to_string(),
        y_label: "USD".to_string(),
        points: vec![
            ChartPoint::new("Actual Revenue", Some(r.actual)),
            ChartPoint::new("Budget Revenue", Some(r.budget)),
        ],
    }
}

pub struct RevenueVsBudgetTool;

impl Tool for RevenueVsBudgetTool {
    fn name(&self) -> &'static str {
        "revenue_vs_budget"
    }

    fn description(&self) -> &'static str {
        "Actual vs budgeted revenue in USD for one month"
    }

    fn execute(&self, ctx: &DataContext, intent: &Intent) -> Result<MetricOutput> {
        let Intent::RevenueVsBudget { period } = intent else {
            return Err(intent_mismatch(self.name(), intent));
        };
        let result = metrics::revenue_vs_budget(ctx, *period)?;
        output(revenue_text(&result), revenue_chart(&result), &result)
    }
}

//
// ================= Gross Margin Trend =================
//

pub fn margin_text(points: &[MarginPoint]) -> String {
    let series: Vec<String> = points
        .iter()
        .map(|p| match p.margin_pct {
            Some(_) => format!("{}: {}", p.period, format_pct(p.margin_pct)),
            None => format!("{}: n/a (no revenue)", p.period),
        })
        .collect();
    format!(
        "Gross margin % over the last {} month(s): {}.",
        points.len(),
        series.join(", ")
    )
}

pub fn margin_chart(points: &[MarginPoint]) -> ChartDescriptor {
    ChartDescriptor {
        kind: ChartKind::Line,
        title: "Gross Margin % Trend".to_string(),
        x_label: "Period".to_string(),
        y_label: "GM %".to_string(),
        points: points
            .iter()
            .map(|p| ChartPoint::new(p.period.to_string(), p.margin_pct))
            .collect(),
    }
}

pub struct GrossMarginTrendTool;

impl Tool for GrossMarginTrendTool {
    fn name(&self) -> &'static str {
        "gm_trend"
    }

    fn description(&self) -> &'static str {
        "Gross margin % for each of the last N months"
    }

    fn execute(&self, ctx: &DataContext, intent: &Intent) -> Result<MetricOutput> {
        let Intent::GrossMarginTrend { last_n_months } = intent else {
            return Err(intent_mismatch(self.name(), intent));
        };
        let points = metrics::gross_margin_trend(ctx, *last_n_months)?;
        output(margin_text(&points), margin_chart(&points), &points)
    }
}

//
// ================= Opex Breakdown =================
//

pub fn opex_text(b: &OpexBreakdown) -> String {
    if b.categories.is_empty() {
        return format!("No opex recorded for {}.", b.period);
    }
    let parts: Vec<String> = b
        .categories
        .iter()
        .map(|c| format!("{} {}", c.category, format_usd(c.amount_usd)))
        .collect();
    format!(
        "Opex by category for {} (total {}): {}.",
        b.period,
        format_usd(b.total()),
        parts.join(", ")
    )
}

pub fn opex_chart(b: &OpexBreakdown) -> ChartDescriptor {
    ChartDescriptor {
        kind: ChartKind::Pie,
        title: format!("Opex Breakdown ({})", b.period),
        x_label: "Category".to_string(),
        y_label: "USD".to_string(),
        points: b
            .categories
            .iter()
            .map(|c| ChartPoint::new(c.category.clone(), Some(c.amount_usd)))
            .collect(),
    }
}

pub struct OpexBreakdownTool;

impl Tool for OpexBreakdownTool {
    fn name(&self) -> &'static str {
        "opex_breakdown"
    }

    fn description(&self) -> &'static str {
        "Opex by category in USD for one month, largest first"
    }

    fn execute(&self, ctx: &DataContext, intent: &Intent) -> Result<MetricOutput> {
        let Intent::OpexBreakdown { period } = intent else {
            return Err(intent_mismatch(self.name(), intent));
        };
        let breakdown = metrics::opex_breakdown(ctx, *period)?;
        let data = serde_json::json!({
            "period": breakdown.period,
            "categories": breakdown.categories,
            "total": breakdown.total(),
        });
        Ok(MetricOutput {
            text: opex_text(&breakdown),
            chart: Some(opex_chart(&breakdown)),
            data,
        })
    }
}

//
// ================= EBITDA Proxy =================
//

pub fn ebitda_text(e: &EbitdaProxy) -> String {
    format!(
        "EBITDA proxy for {}: {} (revenue {} - COGS {} - opex {}).",
        e.period,
        format_usd(e.ebitda),
        format_usd(e.revenue),
        format_usd(e.cogs),
        format_usd(e.opex),
    )
}

pub fn ebitda_chart(e: &EbitdaProxy) -> ChartDescriptor {
    ChartDescriptor {
        kind: ChartKind::Bar,
        title: format!("EBITDA Proxy ({})", e.period),
        x_label: "Component".to_string(),
        y_label: "USD".to_string(),
        points: vec![
            ChartPoint::new("Revenue", Some(e.revenue)),
            ChartPoint::new("COGS", Some(e.cogs)),
            ChartPoint::new("Opex", Some(e.opex)),
            ChartPoint::new("EBITDA", Some(e.ebitda)),
        ],
    }
}

pub struct EbitdaProxyTool;

impl Tool for EbitdaProxyTool {
    fn name(&self) -> &'static str {
        "ebitda_proxy"
    }

    fn description(&self) -> &'static str {
        "Revenue minus COGS minus opex in USD for one month"
    }

    fn execute(&self, ctx: &DataContext, intent: &Intent) -> Result<MetricOutput> {
        let Intent::EbitdaProxy { period } = intent else {
            return Err(intent_mismatch(self.name(), intent));
        };
        let result = metrics::ebitda_proxy(ctx, *period)?;
        output(ebitda_text(&result), ebitda_chart(&result), &result)
    }
}

//
// ================= Cash Runway =================
//

pub fn runway_text(r: &CashRunway) -> String {
    match r.runway {
        Runway::Finite { months } => format!(
            "Cash runway: {:.1} months (current cash {}, avg monthly burn {}).",
            months,
            format_usd(r.cash_balance),
            format_usd(r.avg_monthly_burn),
        ),
        Runway::Infinite => format!(
            "Cash runway: infinite (no net burn over the last {} months). Current cash {}.",
            BURN_WINDOW,
            format_usd(r.cash_balance),
        ),
    }
}

pub fn runway_chart(r: &CashRunway) -> ChartDescriptor {
    ChartDescriptor {
        kind: ChartKind::Line,
        title: "Cash Balance".to_string(),
        x_label: "Period".to_string(),
        y_label: "USD".to_string(),
        points: r
            .balances
            .iter()
            .map(|b| ChartPoint::new(b.period.to_string(), Some(b.balance_usd)))
            .collect(),
    }
}

pub struct CashRunwayTool;

impl Tool for CashRunwayTool {
    fn name(&self) -> &'static str {
        "cash_runway"
    }

    fn description(&self) -> &'static str {
        "Months of cash left at the recent average monthly burn"
    }

    fn execute(&self, ctx: &DataContext, intent: &Intent) -> Result<MetricOutput> {
        if *intent != Intent::CashRunway {
            return Err(intent_mismatch(self.name(), intent));
        }
        let result = metrics::cash_runway(ctx)?;
        output(runway_text(&result), runway_chart(&result), &result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{CashPoint, OpexCategory};
    use crate::models::Period;

    fn june() -> Period {
        Period::new(2025, 6).unwrap()
    }

    #[test]
    fn test_revenue_text() {
        let r = RevenueVsBudget {
            period: june(),
            actual: 120000.0,
            budget: 100000.0,
            variance: 20000.0,
            variance_pct: Some(20.0),
        };
        assert_eq!(
            revenue_text(&r),
            "Revenue in 2025-06: Actual $120,000 vs Budget $100,000 (+$20,000, +20.0% vs budget)."
        );
        let chart = revenue_chart(&r);
        assert_eq!(chart.kind, ChartKind::Bar);
        assert_eq!(chart.points.len(), 2);
    }

    #[test]
    fn test_margin_text_marks_undefined() {
        let points = vec![
            MarginPoint {
                period: Period::new(2025, 5).unwrap(),
                revenue: 0.0,
                cogs: 10.0,
                margin_pct: None,
            },
            MarginPoint {
                period: june(),
                revenue: 100.0,
                cogs: 40.0,
                margin_pct: Some(60.0),
            },
        ];
        assert_eq!(
            margin_text(&points),
            "Gross margin % over the last 2 month(s): 2025-05: n/a (no revenue), 2025-06: 60.0%."
        );
        assert_eq!(margin_chart(&points).points[0].value, None);
    }

    #[test]
    fn test_opex_text() {
        let b = OpexBreakdown {
            period: june(),
            categories: vec![
                OpexCategory {
                    category: "R&D".into(),
                    amount_usd: 16000.0,
                },
                OpexCategory {
                    category: "S&M".into(),
                    amount_usd: 12000.0,
                },
            ],
        };
        assert_eq!(
            opex_text(&b),
            "Opex by category for 2025-06 (total $28,000): R&D $16,000, S&M $12,000."
        );
        let empty = OpexBreakdown {
            period: june(),
            categories: vec![],
        };
        assert_eq!(opex_text(&empty), "No opex recorded for 2025-06.");
    }

    #[test]
    fn test_runway_text() {
        let mut r = CashRunway {
            as_of: june(),
            cash_balance: 450000.0,
            avg_monthly_burn: 25000.0,
            runway: Runway::Finite { months: 18.0 },
            burns: vec![],
            balances: vec![CashPoint {
                period: june(),
                balance_usd: 450000.0,
            }],
        };
        assert_eq!(
            runway_text(&r),
            "Cash runway: 18.0 months (current cash $450,000, avg monthly burn $25,000)."
        );

        r.runway = Runway::Infinite;
        assert!(runway_text(&r).starts_with("Cash runway: infinite"));
        assert_eq!(runway_chart(&r).points.len(), 1);
    }

    #[test]
    fn test_tool_rejects_other_intents() {
        let inputs = crate::loader::RawInputs::from_text(
            "period,account,amount\n2025-06,Revenue,1\n",
            "period,account,amount\n",
            "period,currency,rate_to_usd\n",
            "period,cash_balance\n",
        );
        let ctx = DataContext::load(&inputs, &Default::default()).unwrap();
        let err = RevenueVsBudgetTool
            .execute(&ctx, &Intent::CashRunway)
            .unwrap_err();
        assert!(matches!(err, CopilotError::InvalidInput(_)));
    }
}
