//! Execution engine for deterministic plan execution
//!
//! Looks up the tool for a plan's intent and runs it over the data
//! context. No classification happens here.

use crate::context::DataContext;
use crate::error::CopilotError;
use crate::models::{MetricOutput, Plan};
use crate::tools::ToolRegistry;
use crate::Result;
use std::time::Instant;
use tracing::{debug, warn};

/// Executes a plan against a data context
pub struct ExecutionEngine {
    tool_registry: ToolRegistry,
}

impl ExecutionEngine {
    pub fn new(tool_registry: ToolRegistry) -> Self {
        Self { tool_registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    pub fn execute_plan(&self, plan: &Plan, ctx: &DataContext) -> Result<MetricOutput> {
        let tool_name = plan.intent.name();

        let tool = self.tool_registry.get(tool_name).ok_or_else(|| {
            warn!(tool_name, "Tool not registered");
            CopilotError::ToolNotFound(tool_name.to_string())
        })?;

        debug!(plan_id = ?plan.plan_id, tool_name, "Executing tool");
        let start = Instant::now();

        let result = tool.execute(ctx, &plan.intent);

        match &result {
            Ok(_) => debug!(
                plan_id = ?plan.plan_id,
                tool_name,
                elapsed_us = start.elapsed().as_micros() as u64,
                "Tool completed"
            ),
            Err(e) => warn!(
                plan_id = ?plan.plan_id,
                tool_name,
                error = %e,
                "Tool execution failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnConfig;
    use crate::loader::RawInputs;
    use crate::models::Intent;
    use crate::tools::create_default_registry;
    use chrono::Utc;
    use uuid::Uuid;

    fn plan(intent: Intent) -> Plan {
        Plan {
            plan_id: Uuid::new_v4(),
            question: "test".to_string(),
            intent,
            created_at: Utc::now(),
        }
    }

    fn ctx() -> DataContext {
        let inputs = RawInputs::from_text(
            "period,account,amount\n2025-06,Revenue,100\n2025-06,Opex:R&D,30\n",
            "period,account,amount\n2025-06,Revenue,80\n",
            "period,currency,rate_to_usd\n",
            "period,cash_balance\n2025-05,100\n2025-06,90\n",
        );
        DataContext::load(&inputs, &ColumnConfig::default()).unwrap()
    }

    #[test]
    fn test_execution_engine() {
        let engine = ExecutionEngine::new(create_default_registry());
        let output = engine
            .execute_plan(&plan(Intent::RevenueVsBudget { period: None }), &ctx())
            .unwrap();

        assert!(output.text.contains("Actual $100"));
        assert_eq!(output.data["variance_pct"], 25.0);
        assert!(output.chart.is_some());
    }

    #[test]
    fn test_missing_tool() {
        let engine = ExecutionEngine::new(ToolRegistry::new());
        let err = engine.execute_plan(&plan(Intent::CashRunway), &ctx()).unwrap_err();
        assert!(matches!(err, CopilotError::ToolNotFound(ref name) if name == "cash_runway"));
    }
}
