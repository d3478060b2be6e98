//! Planner trait and implementations
//!
//! The planner turns a question into a structured plan: which metric to
//! run and with which parameters. Planning is rule-based and deterministic.

use crate::classifier::IntentClassifier;
use crate::models::Plan;
use crate::Result;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

/// Trait for plan generation
pub trait Planner: Send + Sync {
    fn create_plan(&self, question: &str) -> Result<Plan>;
}

/// Keyword-rule planner backed by [`IntentClassifier`]
pub struct RuleBasedPlanner;

impl Planner for RuleBasedPlanner {
    fn create_plan(&self, question: &str) -> Result<Plan> {
        let intent = IntentClassifier::classify(question)?;

        let plan = Plan {
            plan_id: Uuid::new_v4(),
            question: question.trim().to_string(),
            intent,
            created_at: Utc::now(),
        };

        debug!(
            plan_id = ?plan.plan_id,
            intent = plan.intent.name(),
            "Plan created"
        );

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CopilotError;
    use crate::models::{Intent, Period};

    #[test]
    fn test_rule_based_plan() {
        let plan = RuleBasedPlanner
            .create_plan("  What was June 2025 revenue vs budget in USD?  ")
            .unwrap();
        assert_eq!(plan.question, "What was June 2025 revenue vs budget in USD?");
        assert_eq!(
            plan.intent,
            Intent::RevenueVsBudget {
                period: Period::new(2025, 6)
            }
        );
    }

    #[test]
    fn test_unknown_question_has_no_plan() {
        let err = RuleBasedPlanner.create_plan("what's the weather").unwrap_err();
        assert!(matches!(err, CopilotError::UnknownIntent(_)));
    }
}
