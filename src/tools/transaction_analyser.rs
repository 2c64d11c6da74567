//! Transaction analyser — deterministic spending analytics
//!
//! All monetary figures, percentages and trends are computed directly from
//! raw transaction records in integer pence. No model is involved in any
//! numerical calculation; the model only narrates the returned facts.

use crate::data::{months_ago, Category, CustomerProfile, Transaction};
use crate::error::CoachingError;
use crate::extract::format_pence;
use crate::models::FactBundle;
use crate::tools::{arg_u32, Tool};
use crate::Result;
use chrono::{Datelike, NaiveDate};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

//
// ================= Result types =================
//

#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: Category,
    pub total_spend_pence: i64,
    pub transaction_count: usize,
    pub average_per_transaction_pence: i64,
    pub largest_single_spend_pence: i64,
}

#[derive(Debug, Clone)]
pub struct MonthlySpendSummary {
    pub year: i32,
    pub month: u32,
    pub total_debit_pence: i64,
    pub total_credit_pence: i64,
    /// credit - debit
    pub net_pence: i64,
}

#[derive(Debug, Clone)]
pub struct SpendingInsights {
    pub customer_id: String,
    pub analysis_period_months: u32,
    pub average_monthly_spend_pence: i64,
    pub average_monthly_income_pence: i64,
    pub average_monthly_surplus_pence: i64,
    pub current_balance_pence: i64,
    pub top_categories: Vec<CategorySummary>,
    pub monthly_summaries: Vec<MonthlySpendSummary>,
    pub spend_trend: &'static str,
    pub highest_spend_month: String,
    pub lowest_spend_month: String,
    pub subscription_monthly_cost_pence: i64,
}

//
// ================= Core analyser =================
//

/// Deterministic financial analytics engine over one customer's records.
pub struct Analyser<'a> {
    profile: &'a CustomerProfile,
}

impl<'a> Analyser<'a> {
    pub fn new(profile: &'a CustomerProfile) -> Self {
        Self { profile }
    }

    fn debits_since(&self, cutoff: NaiveDate) -> impl Iterator<Item = &Transaction> {
        self.profile
            .transactions
            .iter()
            .filter(move |t| t.amount_pence < 0 && t.date >= cutoff)
    }

    /// Complete spending insights for the last `months` months.
    pub fn full_insights(&self, months: u32) -> SpendingInsights {
        let months = months.clamp(1, 12);
        let cutoff = months_ago(months);

        let monthly_summaries = self.monthly_summaries(cutoff);
        let category_summaries = self.category_summaries(cutoff);

        let month_count = monthly_summaries.len().max(1) as i64;
        let avg_spend =
            monthly_summaries.iter().map(|s| s.total_debit_pence).sum::<i64>() / month_count;
        let avg_income =
            monthly_summaries.iter().map(|s| s.total_credit_pence).sum::<i64>() / month_count;

        let trend = Self::spend_trend(&monthly_summaries);
        let (highest, lowest) = Self::min_max_months(&monthly_summaries);

        let subscription_total: i64 = self
            .debits_since(cutoff)
            .filter(|t| t.category == Category::Subscriptions)
            .map(|t| t.amount_pence.abs())
            .sum();

        let current_balance = self
            .profile
            .transactions
            .last()
            .map(|t| t.balance_after_pence)
            .unwrap_or(0);

        SpendingInsights {
            customer_id: self.profile.customer_id.clone(),
            analysis_period_months: months,
            average_monthly_spend_pence: avg_spend,
            average_monthly_income_pence: avg_income,
            average_monthly_surplus_pence: avg_income - avg_spend,
            current_balance_pence: current_balance,
            top_categories: category_summaries.into_iter().take(6).collect(),
            monthly_summaries,
            spend_trend: trend,
            highest_spend_month: highest,
            lowest_spend_month: lowest,
            subscription_monthly_cost_pence: subscription_total / months as i64,
        }
    }

    /// Granular breakdown for a single spending category.
    pub fn category_detail(&self, category: Category, months: u32) -> Value {
        let months = months.clamp(1, 12);
        let cutoff = months_ago(months);
        let txns: Vec<&Transaction> = self
            .debits_since(cutoff)
            .filter(|t| t.category == category)
            .collect();

        if txns.is_empty() {
            return json!({
                "category": category.as_str(),
                "transactions": [],
                "total_spend": format_pence(0),
                "transaction_count": 0,
            });
        }

        let total: i64 = txns.iter().map(|t| t.amount_pence.abs()).sum();

        let mut by_merchant: HashMap<&str, i64> = HashMap::new();
        for t in &txns {
            *by_merchant.entry(t.merchant.as_str()).or_insert(0) += t.amount_pence.abs();
        }
        let mut merchant_totals: Vec<(&str, i64)> = by_merchant.into_iter().collect();
        merchant_totals.sort_by(|a, b| b.1.cmp(&a.1));

        let mut recent: Vec<&&Transaction> = txns.iter().collect();
        recent.sort_by(|a, b| b.date.cmp(&a.date));

        json!({
            "category": category.as_str(),
            "period_months": months,
            "total_spend": format_pence(total),
            "transaction_count": txns.len(),
            "average_per_month": format_pence(total / months as i64),
            "top_merchants": merchant_totals
                .iter()
                .map(|(merchant, total)| json!({
                    "merchant": merchant,
                    "total": format_pence(*total),
                }))
                .collect::<Vec<_>>(),
            "transactions": recent
                .iter()
                .take(15)
                .map(|t| json!({
                    "date": t.date.to_string(),
                    "merchant": t.merchant,
                    "amount": format_pence(t.amount_pence.abs()),
                }))
                .collect::<Vec<_>>(),
        })
    }

    /// Concrete, data-backed savings opportunities. Specific amounts only —
    /// no estimates or guesses.
    pub fn savings_opportunities(&self) -> Value {
        let insights = self.full_insights(3);
        let months = insights.analysis_period_months as i64;
        let mut opportunities = Vec::new();

        let spend_for = |category: Category| -> Option<i64> {
            insights
                .top_categories
                .iter()
                .find(|c| c.category == category)
                .map(|c| c.total_spend_pence)
        };

        // Rule 1: eating out above 30% of grocery spend
        if let (Some(eating_out), Some(groceries)) =
            (spend_for(Category::EatingOut), spend_for(Category::Groceries))
        {
            if groceries > 0 && eating_out * 100 / groceries > 30 {
                let monthly = eating_out / months;
                let potential = monthly * 30 / 100;
                opportunities.push(json!({
                    "area": "Eating Out",
                    "monthly_spend": format_pence(monthly),
                    "potential_monthly_saving": format_pence(potential),
                    "annual_saving": format_pence(potential * 12),
                    "tip": "Reducing eating out by 30% could free up significant funds.",
                }));
            }
        }

        // Rule 2: subscriptions above £50/month
        if insights.subscription_monthly_cost_pence > 5_000 {
            let monthly = insights.subscription_monthly_cost_pence;
            opportunities.push(json!({
                "area": "Subscriptions",
                "monthly_spend": format_pence(monthly),
                "potential_monthly_saving": format_pence(monthly / 4),
                "annual_saving": format_pence(monthly * 3),
                "tip": "Review unused subscriptions — a common source of silent spending.",
            }));
        }

        // Rule 3: savings rate below 10% of income
        if insights.average_monthly_income_pence > 0 {
            let rate_pct =
                insights.average_monthly_surplus_pence * 100 / insights.average_monthly_income_pence;
            if rate_pct < 10 {
                let gap =
                    insights.average_monthly_income_pence * 20 / 100 - insights.average_monthly_surplus_pence;
                opportunities.push(json!({
                    "area": "Savings Rate",
                    "current_rate": format!("{}%", rate_pct),
                    "target_rate": "20%",
                    "gap_monthly": format_pence(gap),
                    "tip": "Aim to save at least 20% of take-home pay.",
                }));
            }
        }

        json!({
            "monthly_surplus": format_pence(insights.average_monthly_surplus_pence),
            "opportunity_count": opportunities.len(),
            "opportunities": opportunities,
        })
    }

    fn monthly_summaries(&self, cutoff: NaiveDate) -> Vec<MonthlySpendSummary> {
        let mut bucket: HashMap<(i32, u32), (i64, i64)> = HashMap::new();
        for t in &self.profile.transactions {
            if t.date < cutoff {
                continue;
            }
            let entry = bucket.entry((t.date.year(), t.date.month())).or_insert((0, 0));
            if t.amount_pence < 0 {
                entry.0 += t.amount_pence.abs();
            } else {
                entry.1 += t.amount_pence;
            }
        }

        let mut keys: Vec<(i32, u32)> = bucket.keys().cloned().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| {
                bucket.get(&key).map(|(debit, credit)| MonthlySpendSummary {
                    year: key.0,
                    month: key.1,
                    total_debit_pence: *debit,
                    total_credit_pence: *credit,
                    net_pence: credit - debit,
                })
            })
            .collect()
    }

    fn category_summaries(&self, cutoff: NaiveDate) -> Vec<CategorySummary> {
        let mut bucket: HashMap<Category, Vec<i64>> = HashMap::new();
        for t in self.debits_since(cutoff) {
            bucket.entry(t.category).or_default().push(t.amount_pence.abs());
        }

        let mut summaries: Vec<CategorySummary> = bucket
            .into_iter()
            .map(|(category, amounts)| {
                let total: i64 = amounts.iter().sum();
                CategorySummary {
                    category,
                    total_spend_pence: total,
                    transaction_count: amounts.len(),
                    average_per_transaction_pence: total / amounts.len().max(1) as i64,
                    largest_single_spend_pence: amounts.iter().max().cloned().unwrap_or(0),
                }
            })
            .collect();

        summaries.sort_by(|a, b| b.total_spend_pence.cmp(&a.total_spend_pence));
        summaries
    }

    fn spend_trend(summaries: &[MonthlySpendSummary]) -> &'static str {
        if summaries.len() < 2 {
            return "stable";
        }
        let diffs: Vec<i64> = summaries
            .windows(2)
            .map(|pair| pair[1].total_debit_pence - pair[0].total_debit_pence)
            .collect();
        let avg_diff = diffs.iter().sum::<i64>() / diffs.len() as i64;
        if avg_diff > 5_000 {
            "increasing"
        } else if avg_diff < -5_000 {
            "decreasing"
        } else {
            "stable"
        }
    }

    fn min_max_months(summaries: &[MonthlySpendSummary]) -> (String, String) {
        let highest = summaries.iter().max_by_key(|s| s.total_debit_pence);
        let lowest = summaries.iter().min_by_key(|s| s.total_debit_pence);
        let fmt = |s: Option<&MonthlySpendSummary>| {
            s.map(|s| format!("{}-{:02}", s.year, s.month))
                .unwrap_or_else(|| "N/A".to_string())
        };
        (fmt(highest), fmt(lowest))
    }
}

/// Render insights as a fact bundle of canonical currency strings.
pub fn insights_to_facts(insights: &SpendingInsights) -> Value {
    json!({
        "average_monthly_income": format_pence(insights.average_monthly_income_pence),
        "average_monthly_spend": format_pence(insights.average_monthly_spend_pence),
        "average_monthly_surplus": format_pence(insights.average_monthly_surplus_pence),
        "current_balance": format_pence(insights.current_balance_pence),
        "spend_trend": insights.spend_trend,
        "analysis_months": insights.analysis_period_months,
        "highest_spend_month": insights.highest_spend_month,
        "lowest_spend_month": insights.lowest_spend_month,
        "top_categories": insights
            .top_categories
            .iter()
            .map(|c| json!({
                "category": c.category.label(),
                "monthly_average": format_pence(
                    c.total_spend_pence / insights.analysis_period_months as i64
                ),
                "total_over_period": format_pence(c.total_spend_pence),
                "transaction_count": c.transaction_count,
            }))
            .collect::<Vec<_>>(),
    })
}

//
// ================= Tools =================
//

pub struct SpendingInsightsTool {
    profile: Arc<CustomerProfile>,
}

impl SpendingInsightsTool {
    pub fn new(profile: Arc<CustomerProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait::async_trait]
impl Tool for SpendingInsightsTool {
    fn name(&self) -> &'static str {
        "get_spending_insights"
    }

    fn description(&self) -> &'static str {
        "Retrieve verified spending insights: average monthly spend, income, surplus, top categories and trend"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "months": {"type": "integer", "description": "Months to analyse (1-12), default 3"}
            }
        })
    }

    async fn execute(&self, args: &Value) -> Result<FactBundle> {
        let months = arg_u32(args, "months", 3);
        let insights = Analyser::new(&self.profile).full_insights(months);
        Ok(FactBundle::new(insights_to_facts(&insights)))
    }
}

pub struct CategoryDetailTool {
    profile: Arc<CustomerProfile>,
}

impl CategoryDetailTool {
    pub fn new(profile: Arc<CustomerProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait::async_trait]
impl Tool for CategoryDetailTool {
    fn name(&self) -> &'static str {
        "get_category_detail"
    }

    fn description(&self) -> &'static str {
        "Detailed breakdown of spending in one category (merchants, transactions, totals)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {"type": "string", "description": "groceries, eating_out, transport, utilities, subscriptions, shopping, entertainment, health, cash_withdrawal or other"},
                "months": {"type": "integer", "description": "Months to analyse (1-12), default 3"}
            },
            "required": ["category"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<FactBundle> {
        let raw = args
            .get("category")
            .and_then(Value::as_str)
            .ok_or_else(|| CoachingError::InvalidToolInput("expected 'category'".to_string()))?;
        let category = Category::parse(raw).ok_or_else(|| {
            CoachingError::InvalidToolInput(format!("unknown category '{}'", raw))
        })?;
        let months = arg_u32(args, "months", 3);
        let detail = Analyser::new(&self.profile).category_detail(category, months);
        Ok(FactBundle::new(detail))
    }
}

pub struct SavingsOpportunitiesTool {
    profile: Arc<CustomerProfile>,
}

impl SavingsOpportunitiesTool {
    pub fn new(profile: Arc<CustomerProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait::async_trait]
impl Tool for SavingsOpportunitiesTool {
    fn name(&self) -> &'static str {
        "get_savings_opportunities"
    }

    fn description(&self) -> &'static str {
        "Identify concrete, data-backed savings opportunities with specific monthly amounts"
    }

    async fn execute(&self, _args: &Value) -> Result<FactBundle> {
        Ok(FactBundle::new(
            Analyser::new(&self.profile).savings_opportunities(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::extract;

    #[test]
    fn test_full_insights_balances() {
        let profile = data::demo_customer();
        let insights = Analyser::new(&profile).full_insights(3);

        assert!(insights.average_monthly_income_pence > 0);
        assert!(insights.average_monthly_spend_pence > 0);
        assert_eq!(
            insights.average_monthly_surplus_pence,
            insights.average_monthly_income_pence - insights.average_monthly_spend_pence
        );
        assert!(!insights.top_categories.is_empty());
    }

    #[test]
    fn test_top_categories_sorted_descending() {
        let profile = data::demo_customer();
        let insights = Analyser::new(&profile).full_insights(3);
        assert!(insights
            .top_categories
            .windows(2)
            .all(|pair| pair[0].total_spend_pence >= pair[1].total_spend_pence));
    }

    #[test]
    fn test_category_detail_empty_category() {
        let profile = data::demo_customer();
        let detail = Analyser::new(&profile).category_detail(Category::SavingsTransfer, 3);
        assert_eq!(detail["transaction_count"], 0);
        assert_eq!(detail["total_spend"], "£0.00");
    }

    #[test]
    fn test_all_fact_amounts_are_canonical() {
        let profile = data::demo_customer();
        let insights = Analyser::new(&profile).full_insights(3);
        let facts = insights_to_facts(&insights);
        for amount in extract::extract_from_facts(&facts) {
            assert_eq!(amount, extract::canonicalize(&amount));
        }
    }

    #[tokio::test]
    async fn test_spending_insights_tool() {
        let profile = Arc::new(data::demo_customer());
        let tool = SpendingInsightsTool::new(profile);
        let bundle = tool.execute(&json!({"months": 3})).await.unwrap();
        assert!(bundle.facts.get("average_monthly_spend").is_some());
    }

    #[tokio::test]
    async fn test_category_detail_tool_rejects_unknown_category() {
        let profile = Arc::new(data::demo_customer());
        let tool = CategoryDetailTool::new(profile);
        let result = tool.execute(&json!({"category": "lottery"})).await;
        assert!(matches!(
            result,
            Err(CoachingError::InvalidToolInput(_))
        ));
    }
}
