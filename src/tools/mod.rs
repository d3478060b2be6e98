//! Tool trait and registry
//!
//! Tools are deterministic, side-effect-free operations over an immutable
//! [`DataContext`]. Each metric is exposed as one tool, keyed by the name
//! of the intent it answers.

use crate::context::DataContext;
use crate::models::{Intent, MetricOutput};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;

pub mod format;
pub mod metric_tools;

pub use metric_tools::{
    CashRunwayTool, EbitdaProxyTool, GrossMarginTrendTool, OpexBreakdownTool,
    RevenueVsBudgetTool,
};

/// Trait for a single tool (deterministic execution)
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn execute(&self, ctx: &DataContext, intent: &Intent) -> Result<MetricOutput>;
}

/// Tool registry for looking up and executing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Registered tool names, sorted
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with every metric tool.
pub fn create_default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(RevenueVsBudgetTool));
    registry.register(Arc::new(GrossMarginTrendTool));
    registry.register(Arc::new(OpexBreakdownTool));
    registry.register(Arc::new(EbitdaProxyTool));
    registry.register(Arc::new(CashRunwayTool));

    registry
}
