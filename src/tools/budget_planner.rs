//! Goal-based budget planner
//!
//! Maps verified spending onto the 50/30/20 framework and plans monthly
//! contributions toward stated goals. All allocations and projections are
//! computed from transaction-derived figures.

use crate::data::{Category, CustomerProfile};
use crate::extract::{self, format_pence};
use crate::models::FactBundle;
use crate::tools::transaction_analyser::Analyser;
use crate::tools::Tool;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;

const ESSENTIAL_CATEGORIES: &[Category] = &[
    Category::Groceries,
    Category::Utilities,
    Category::Transport,
    Category::Health,
];

const DISCRETIONARY_CATEGORIES: &[Category] = &[
    Category::EatingOut,
    Category::Entertainment,
    Category::Shopping,
    Category::Subscriptions,
    Category::CashWithdrawal,
    Category::Other,
];

/// 50/30/20 reference allocation, in percent.
const FRAMEWORK: &[(&str, i64)] = &[("needs", 50), ("wants", 30), ("savings", 20)];

const MAX_GOALS: usize = 5;
const DEFAULT_GOAL_MONTHS: u32 = 12;

#[derive(Debug, Clone)]
pub struct BudgetAllocation {
    pub bucket: &'static str,
    pub recommended_monthly_pence: i64,
    pub actual_monthly_pence: i64,
    /// actual - recommended; positive means overspending
    pub variance_pence: i64,
    pub variance_pct: i64,
    pub status: &'static str,
}

#[derive(Debug, Clone)]
pub struct GoalPlan {
    pub goal_id: String,
    pub description: String,
    pub target_amount_pence: i64,
    pub monthly_required_pence: i64,
    pub months_to_target: u32,
    pub achievable: bool,
    pub shortfall_monthly_pence: i64,
}

#[derive(Debug, Clone)]
pub struct BudgetPlan {
    pub net_monthly_income_pence: i64,
    pub allocations: Vec<BudgetAllocation>,
    pub goal_plans: Vec<GoalPlan>,
    pub total_goal_monthly_required_pence: i64,
    pub discretionary_surplus_after_goals_pence: i64,
    pub budget_is_viable: bool,
    pub recommendations: Vec<String>,
}

/// Build a budget plan from verified income and per-category actuals.
pub fn build_budget_plan(
    net_monthly_income_pence: i64,
    category_monthly_actuals: &[(Category, i64)],
    goals: &[(String, i64)],
) -> BudgetPlan {
    let sum_for = |set: &[Category]| -> i64 {
        category_monthly_actuals
            .iter()
            .filter(|(category, _)| set.contains(category))
            .map(|(_, pence)| pence)
            .sum()
    };

    let needs_actual = sum_for(ESSENTIAL_CATEGORIES);
    let wants_actual = sum_for(DISCRETIONARY_CATEGORIES);
    let savings_actual = (net_monthly_income_pence - needs_actual - wants_actual).max(0);

    let actuals = [
        ("needs", needs_actual),
        ("wants", wants_actual),
        ("savings", savings_actual),
    ];

    let allocations: Vec<BudgetAllocation> = FRAMEWORK
        .iter()
        .map(|(bucket, pct)| {
            let recommended = net_monthly_income_pence * pct / 100;
            let actual = actuals
                .iter()
                .find(|(name, _)| name == bucket)
                .map(|(_, pence)| *pence)
                .unwrap_or(0);
            let variance = actual - recommended;
            let variance_pct = if recommended > 0 {
                variance * 100 / recommended
            } else {
                0
            };
            let status = if variance_pct.abs() <= 5 {
                "on_track"
            } else if variance > 0 {
                "over"
            } else {
                "under"
            };
            BudgetAllocation {
                bucket,
                recommended_monthly_pence: recommended,
                actual_monthly_pence: actual,
                variance_pence: variance,
                variance_pct,
                status,
            }
        })
        .collect();

    // Goal planning against what is actually left each month
    let mut goal_plans = Vec::new();
    let mut total_goal_required: i64 = 0;
    for (i, (description, target_pence)) in goals.iter().take(MAX_GOALS).enumerate() {
        if *target_pence <= 0 {
            continue;
        }
        let monthly_required = target_pence / DEFAULT_GOAL_MONTHS as i64;
        let achievable = monthly_required <= savings_actual;
        total_goal_required += monthly_required;
        goal_plans.push(GoalPlan {
            goal_id: format!("GOAL_{:03}", i + 1),
            description: description.clone(),
            target_amount_pence: *target_pence,
            monthly_required_pence: monthly_required,
            months_to_target: DEFAULT_GOAL_MONTHS,
            achievable,
            shortfall_monthly_pence: (monthly_required - savings_actual).max(0),
        });
    }

    let discretionary_surplus = savings_actual - total_goal_required;
    let budget_is_viable = discretionary_surplus >= 0;

    // Pre-computed recommendations — not model-generated
    let mut recommendations = Vec::new();
    let find = |bucket: &str| allocations.iter().find(|a| a.bucket == bucket);

    if let Some(wants) = find("wants") {
        if wants.status == "over" {
            recommendations.push(format!(
                "Discretionary spending is {}/mo over the 30% target. Reducing this would free \
                 up {} per year.",
                format_pence(wants.variance_pence),
                format_pence(wants.variance_pence * 12),
            ));
        }
    }
    if let Some(savings) = find("savings") {
        if savings.status == "under" {
            recommendations.push(format!(
                "Savings are {}/mo below the 20% target. Even a small standing order increase \
                 on payday would close this gap.",
                format_pence(savings.variance_pence.abs()),
            ));
        }
    }
    if !budget_is_viable {
        recommendations.push(format!(
            "Your goals require {}/mo but your current surplus is {}/mo. Consider extending \
             goal timelines or reducing discretionary spend.",
            format_pence(total_goal_required),
            format_pence(savings_actual),
        ));
    }
    if let Some(needs) = find("needs") {
        if needs.status == "over" && needs.variance_pct > 15 {
            recommendations.push(format!(
                "Essential spending is {}% above target. Review fixed costs like utilities and \
                 subscriptions for savings.",
                needs.variance_pct,
            ));
        }
    }
    if recommendations.is_empty() {
        recommendations.push("Your budget is well-balanced. Keep up the consistent approach.".to_string());
    }

    BudgetPlan {
        net_monthly_income_pence,
        allocations,
        goal_plans,
        total_goal_monthly_required_pence: total_goal_required,
        discretionary_surplus_after_goals_pence: discretionary_surplus,
        budget_is_viable,
        recommendations,
    }
}

pub fn plan_to_facts(plan: &BudgetPlan) -> Value {
    json!({
        "net_monthly_income": format_pence(plan.net_monthly_income_pence),
        "framework": "50/30/20",
        "budget_is_viable": plan.budget_is_viable,
        "allocations": plan
            .allocations
            .iter()
            .map(|a| json!({
                "bucket": a.bucket,
                "recommended_monthly": format_pence(a.recommended_monthly_pence),
                "actual_monthly": format_pence(a.actual_monthly_pence),
                "variance": format_pence(a.variance_pence),
                "status": a.status,
            }))
            .collect::<Vec<_>>(),
        "goal_plans": plan
            .goal_plans
            .iter()
            .map(|g| json!({
                "goal": g.description,
                "target_amount": format_pence(g.target_amount_pence),
                "monthly_required": format_pence(g.monthly_required_pence),
                "months_to_target": g.months_to_target,
                "achievable": g.achievable,
                "shortfall_monthly": format_pence(g.shortfall_monthly_pence),
            }))
            .collect::<Vec<_>>(),
        "total_goal_monthly_required": format_pence(plan.total_goal_monthly_required_pence),
        "discretionary_surplus_after_goals": format_pence(plan.discretionary_surplus_after_goals_pence),
        "recommendations": plan.recommendations,
    })
}

/// Parse a target amount out of a goal description, e.g.
/// "Save £5,000 for a holiday" → 500000 pence.
fn goal_target_pence(description: &str) -> i64 {
    extract::extract_amounts(description)
        .first()
        .map(|token| {
            let canonical = extract::canonicalize(token);
            let digits: String = canonical
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect();
            digits.parse::<i64>().unwrap_or(0)
        })
        .unwrap_or(0)
}

pub struct BudgetPlanTool {
    profile: Arc<CustomerProfile>,
}

impl BudgetPlanTool {
    pub fn new(profile: Arc<CustomerProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait::async_trait]
impl Tool for BudgetPlanTool {
    fn name(&self) -> &'static str {
        "build_budget_plan"
    }

    fn description(&self) -> &'static str {
        "Create a personalised 50/30/20 budget plan with goal tracking from verified spending data"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "goal_descriptions": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Goals with amounts, e.g. \"Save £5000 for a holiday\""
                }
            }
        })
    }

    async fn execute(&self, args: &Value) -> Result<FactBundle> {
        let insights = Analyser::new(&self.profile).full_insights(3);
        let months = insights.analysis_period_months as i64;

        let actuals: Vec<(Category, i64)> = insights
            .top_categories
            .iter()
            .map(|c| (c.category, c.total_spend_pence / months))
            .collect();

        let goals: Vec<(String, i64)> = args
            .get("goal_descriptions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|desc| (desc.to_string(), goal_target_pence(desc)))
                    .collect()
            })
            .unwrap_or_default();

        let plan = build_budget_plan(insights.average_monthly_income_pence, &actuals, &goals);
        Ok(FactBundle::new(plan_to_facts(&plan)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocations_follow_framework() {
        let plan = build_budget_plan(300_000, &[(Category::Groceries, 100_000)], &[]);
        let needs = plan.allocations.iter().find(|a| a.bucket == "needs").unwrap();
        assert_eq!(needs.recommended_monthly_pence, 150_000);
        assert_eq!(needs.actual_monthly_pence, 100_000);
        assert_eq!(needs.status, "under");
    }

    #[test]
    fn test_goal_feasibility() {
        // £3,000 income, £1,000 needs: savings bucket has £2,000/mo.
        let actuals = [(Category::Groceries, 100_000)];
        let goals = [
            ("Save £6,000 for a car".to_string(), 600_000),
            ("Build £60,000 deposit".to_string(), 6_000_000),
        ];
        let plan = build_budget_plan(300_000, &actuals, &goals);
        assert!(plan.goal_plans[0].achievable);
        assert!(!plan.goal_plans[1].achievable);
        assert!(plan.goal_plans[1].shortfall_monthly_pence > 0);
    }

    #[test]
    fn test_unviable_budget_flagged() {
        let goals = [("Save £100,000".to_string(), 10_000_000)];
        let plan = build_budget_plan(200_000, &[(Category::Groceries, 150_000)], &goals);
        assert!(!plan.budget_is_viable);
        assert!(plan
            .recommendations
            .iter()
            .any(|r| r.contains("extending")));
    }

    #[test]
    fn test_goal_target_parsing() {
        assert_eq!(goal_target_pence("Save £5,000 for a holiday"), 500_000);
        assert_eq!(goal_target_pence("Build £3000 emergency fund"), 300_000);
        assert_eq!(goal_target_pence("no amount here"), 0);
    }

    #[test]
    fn test_balanced_budget_gets_positive_note() {
        // Actuals close to 50/30/20 of £3,000
        let actuals = [
            (Category::Groceries, 148_000),
            (Category::EatingOut, 89_000),
        ];
        let plan = build_budget_plan(300_000, &actuals, &[]);
        assert!(!plan.recommendations.is_empty());
    }
}
