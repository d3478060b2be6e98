//! CFO Copilot
//!
//! Answers a fixed set of finance questions from four CSV inputs:
//! - Revenue vs budget for a month
//! - Gross margin % trend over the last N months
//! - Opex breakdown by category
//! - EBITDA proxy (revenue - COGS - opex)
//! - Cash runway from recent net burn
//!
//! Every amount is normalized to USD through the fx table before it is
//! aggregated. Questions are classified by a declarative keyword rule
//! table; nothing is generated by a model.
//!
//! QUESTION LOOP:
//! QUESTION → PLAN → EXECUTE (metric over DataContext) → TEXT + CHART

pub mod agent;
pub mod api;
pub mod chart;
pub mod classifier;
pub mod config;
pub mod context;
pub mod error;
pub mod execution;
pub mod export;
pub mod fx;
pub mod loader;
pub mod metrics;
pub mod models;
pub mod planner;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use agent::Copilot;
pub use classifier::{IntentClassifier, IntentRule, INTENT_RULES};
pub use context::DataContext;
pub use error::CopilotError;
pub use models::*;
