//! Tool trait and registry
//!
//! Tools are deterministic, side-effect-free fact producers. Every
//! monetary value in a returned FactBundle is a canonical currency string
//! (never a raw float), and a tool that cannot compute a requested fact
//! signals a typed failure instead of estimating. Tools never narrate.

pub mod adviser_handoff;
pub mod budget_planner;
pub mod debt_savings;
pub mod financial_health;
pub mod knowledge_base;
pub mod life_events;
pub mod mortgage;
pub mod product_eligibility;
pub mod transaction_analyser;

use crate::data::CustomerProfile;
use crate::models::{FactBundle, ToolSchema};
use crate::Result;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for a single tool (deterministic execution)
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;

    /// JSON schema of accepted arguments, advertised to the model.
    fn parameters(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, args: &Value) -> Result<FactBundle>;
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

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Schemas for every registered tool, sorted by name so prompts are
    /// stable across runs.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .map(|tool| ToolSchema {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper shared by tools: pull an optional positive integer argument.
pub(crate) fn arg_u32(args: &Value, key: &str, default: u32) -> u32 {
    args.get(key)
        .and_then(Value::as_u64)
        .map(|v| v as u32)
        .unwrap_or(default)
}

/// Helper shared by tools: read a monetary argument (pounds, possibly
/// fractional) into pence. Absent or non-numeric returns None.
pub(crate) fn arg_pounds_as_pence(args: &Value, key: &str) -> Option<i64> {
    args.get(key)
        .and_then(Value::as_f64)
        .filter(|v| *v > 0.0)
        .map(|v| (v * 100.0).round() as i64)
}

/// Create the default registry with every deterministic coaching tool
/// bound to one customer's verified transaction data.
pub fn create_default_registry(
    profile: Arc<CustomerProfile>,
    knowledge: Arc<dyn knowledge_base::KnowledgeBase>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(transaction_analyser::SpendingInsightsTool::new(
        profile.clone(),
    )));
    registry.register(Arc::new(transaction_analyser::CategoryDetailTool::new(
        profile.clone(),
    )));
    registry.register(Arc::new(
        transaction_analyser::SavingsOpportunitiesTool::new(profile.clone()),
    ));
    registry.register(Arc::new(financial_health::HealthScoreTool::new(
        profile.clone(),
    )));
    registry.register(Arc::new(mortgage::MortgageAffordabilityTool::new(
        profile.clone(),
    )));
    registry.register(Arc::new(debt_savings::DebtVsSavingsTool::new(
        profile.clone(),
    )));
    registry.register(Arc::new(budget_planner::BudgetPlanTool::new(
        profile.clone(),
    )));
    registry.register(Arc::new(life_events::LifeEventsTool::new(profile.clone())));
    registry.register(Arc::new(product_eligibility::ProductEligibilityTool::new(
        profile.clone(),
    )));
    registry.register(Arc::new(adviser_handoff::EscalateToAdviserTool::new(
        profile,
    )));
    registry.register(Arc::new(knowledge_base::SearchGuidanceTool::new(knowledge)));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;

    #[test]
    fn test_default_registry_has_all_tools() {
        let profile = Arc::new(data::demo_customer());
        let knowledge = Arc::new(knowledge_base::StaticKnowledgeBase::new());
        let registry = create_default_registry(profile, knowledge);

        for name in [
            "get_spending_insights",
            "get_category_detail",
            "get_savings_opportunities",
            "get_financial_health_score",
            "assess_mortgage_affordability",
            "analyse_debt_vs_savings",
            "build_budget_plan",
            "detect_life_events",
            "check_product_eligibility",
            "escalate_to_adviser",
            "search_guidance",
        ] {
            assert!(registry.get(name).is_some(), "missing tool {}", name);
        }
        assert_eq!(registry.schemas().len(), 11);
    }
}
