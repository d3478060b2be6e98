//! Main copilot - implements the question loop
//!
//! QUESTION → PLAN → EXECUTE → ANSWER
//!
//! Every failure along the way is recovered here into an answer the user
//! can read; no pipeline error escapes [`Copilot::answer`].

use crate::chart::{ChartRenderer, VegaLiteRenderer};
use crate::context::DataContext;
use crate::error::CopilotError;
use crate::execution::ExecutionEngine;
use crate::export::render_snapshot;
use crate::metrics;
use crate::models::{Answer, Period};
use crate::planner::{Planner, RuleBasedPlanner};
use crate::tools::create_default_registry;
use crate::Result;
use chrono::Utc;
use serde_json::Value;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

/// Coordinates planning, execution and chart rendering for one question at a time
pub struct Copilot {
    planner: Box<dyn Planner>,
    execution_engine: ExecutionEngine,
    renderer: Box<dyn ChartRenderer>,
}

impl Default for Copilot {
    fn default() -> Self {
        Self::new(
            Box::new(RuleBasedPlanner),
            ExecutionEngine::new(create_default_registry()),
            Box::new(VegaLiteRenderer),
        )
    }
}

impl Copilot {
    pub fn new(
        planner: Box<dyn Planner>,
        execution_engine: ExecutionEngine,
        renderer: Box<dyn ChartRenderer>,
    ) -> Self {
        Self {
            planner,
            execution_engine,
            renderer,
        }
    }

    /// Answer a question, propagating pipeline errors
    pub fn try_answer(&self, ctx: &DataContext, question: &str) -> Result<Answer> {
        let start = Instant::now();

        let plan = self.planner.create_plan(question)?;
        let output = self.execution_engine.execute_plan(&plan, ctx)?;

        let answer = Answer {
            answer_id: Uuid::new_v4(),
            question: plan.question.clone(),
            success: true,
            intent: Some(plan.intent.name().to_string()),
            text: output.text,
            chart: output.chart,
            data: output.data,
            data_fingerprint: ctx.fingerprint().to_string(),
            created_at: Utc::now(),
            execution_time_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            answer_id = ?answer.answer_id,
            intent = plan.intent.name(),
            "Answer produced"
        );

        Ok(answer)
    }

    /// Answer a question. Errors become an unsuccessful answer carrying the
    /// user-facing message and no chart.
    pub fn answer(&self, ctx: &DataContext, question: &str) -> Answer {
        let start = Instant::now();

        self.try_answer(ctx, question).unwrap_or_else(|e| {
            let mut answer = self.error_answer(ctx, question, &e);
            answer.execution_time_ms = start.elapsed().as_millis() as u64;
            answer
        })
    }

    /// The unsuccessful answer for a pipeline error
    pub fn error_answer(&self, ctx: &DataContext, question: &str, e: &CopilotError) -> Answer {
        warn!(question, error = %e, "Question could not be answered");

        Answer {
            answer_id: Uuid::new_v4(),
            question: question.trim().to_string(),
            success: false,
            intent: None,
            text: e.user_message(),
            chart: None,
            data: serde_json::json!({
                "error": e.to_string(),
                "data_error": e.is_data_error(),
            }),
            data_fingerprint: ctx.fingerprint().to_string(),
            created_at: Utc::now(),
            execution_time_ms: 0,
        }
    }

    /// Render the answer's chart for the plotting front end
    pub fn render_chart(&self, answer: &Answer) -> Result<Option<Value>> {
        answer
            .chart
            .as_ref()
            .map(|chart| self.renderer.render(chart))
            .transpose()
    }

    pub fn renderer_name(&self) -> &'static str {
        self.renderer.name()
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.execution_engine.registry().list()
    }

    /// Two-page PDF: revenue vs budget and opex breakdown for one period
    /// (the latest actuals period when `None`)
    pub fn snapshot_pdf(&self, ctx: &DataContext, period: Option<Period>) -> Result<Vec<u8>> {
        let period = ctx.resolve_period(period)?;
        let revenue = metrics::revenue_vs_budget(ctx, Some(period))?;
        let opex = metrics::opex_breakdown(ctx, Some(period))?;

        info!(%period, "Rendering snapshot PDF");
        render_snapshot(&revenue, &opex)
    }
}
