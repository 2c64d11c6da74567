//! Financial health score — fully deterministic, rules-based scoring
//!
//! Every score traces back to a specific transaction-derived metric, so
//! the whole report is auditable. The model narrates the report; it never
//! influences it.

use crate::data::{Category, CustomerProfile};
use crate::extract::format_pence;
use crate::models::FactBundle;
use crate::tools::transaction_analyser::{Analyser, SpendingInsights};
use crate::tools::Tool;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;

pub const MAX_SCORE: u32 = 100;

const ESSENTIAL_CATEGORIES: &[Category] = &[
    Category::Groceries,
    Category::Utilities,
    Category::Transport,
    Category::Health,
];

#[derive(Debug, Clone)]
pub struct HealthPillar {
    pub name: &'static str,
    pub score: u32,
    pub max_score: u32,
    pub grade: &'static str,
    pub explanation: String,
}

#[derive(Debug, Clone)]
pub struct FinancialHealthReport {
    pub customer_id: String,
    pub overall_score: u32,
    pub overall_grade: &'static str,
    pub summary: &'static str,
    pub pillars: Vec<HealthPillar>,
    pub savings_rate_pct: i64,
    pub essentials_pct: i64,
    pub subscription_pct: i64,
    pub months_buffer_tenths: i64,
}

fn grade(score: u32, max_score: u32) -> &'static str {
    let ratio = score as f64 / max_score as f64;
    if ratio >= 0.85 {
        "A"
    } else if ratio >= 0.70 {
        "B"
    } else if ratio >= 0.50 {
        "C"
    } else {
        "D"
    }
}

/// Compute the five-pillar health score from verified spending insights.
pub fn compute_health_score(insights: &SpendingInsights) -> FinancialHealthReport {
    let mut pillars = Vec::with_capacity(5);

    let income = insights.average_monthly_income_pence;
    let spend = insights.average_monthly_spend_pence;

    // 1. Savings rate (0-30)
    let savings_rate_pct = if income > 0 {
        (income - spend) * 100 / income
    } else {
        0
    };
    let (sr_score, sr_explanation) = if savings_rate_pct >= 20 {
        (30, format!("Excellent — saving {}% of income (target: 20% or more).", savings_rate_pct))
    } else if savings_rate_pct >= 10 {
        (20, format!("Good — saving {}% of income. Aim for 20% to score higher.", savings_rate_pct))
    } else if savings_rate_pct >= 5 {
        (10, format!("Fair — saving {}% of income. Small increases make a big difference.", savings_rate_pct))
    } else {
        (
            savings_rate_pct.max(0) as u32,
            format!("Needs attention — saving only {}% of income. Consider a savings pot.", savings_rate_pct),
        )
    };
    pillars.push(HealthPillar {
        name: "Savings Rate",
        score: sr_score,
        max_score: 30,
        grade: grade(sr_score, 30),
        explanation: sr_explanation,
    });

    // 2. Spend stability (0-20): coefficient of variation over monthly spend
    let monthly: Vec<i64> = insights
        .monthly_summaries
        .iter()
        .map(|s| s.total_debit_pence)
        .collect();
    let cv_pct = if monthly.len() >= 2 {
        let avg = monthly.iter().sum::<i64>() as f64 / monthly.len() as f64;
        if avg > 0.0 {
            let variance = monthly
                .iter()
                .map(|x| {
                    let d = *x as f64 - avg;
                    d * d
                })
                .sum::<f64>()
                / monthly.len() as f64;
            (variance.sqrt() / avg * 100.0).round() as i64
        } else {
            0
        }
    } else {
        0
    };
    let (ss_score, ss_explanation) = if cv_pct < 10 {
        (20, format!("Very stable spending (variation: {}%). Great budgeting consistency.", cv_pct))
    } else if cv_pct < 20 {
        (15, format!("Mostly stable (variation: {}%). Minor month-to-month swings.", cv_pct))
    } else if cv_pct < 35 {
        (8, format!("Moderate variation ({}%) — some months spend significantly more.", cv_pct))
    } else {
        (3, format!("High variation ({}%) — spending is unpredictable. A monthly budget could help.", cv_pct))
    };
    pillars.push(HealthPillar {
        name: "Spend Stability",
        score: ss_score,
        max_score: 20,
        grade: grade(ss_score, 20),
        explanation: ss_explanation,
    });

    // 3. Essentials balance (0-20)
    let total_spend: i64 = insights.top_categories.iter().map(|c| c.total_spend_pence).sum();
    let essentials: i64 = insights
        .top_categories
        .iter()
        .filter(|c| ESSENTIAL_CATEGORIES.contains(&c.category))
        .map(|c| c.total_spend_pence)
        .sum();
    let essentials_pct = if total_spend > 0 {
        essentials * 100 / total_spend
    } else {
        0
    };
    let (er_score, er_explanation) = if essentials_pct <= 60 {
        (20, format!("Healthy balance — {}% on essentials, leaving room for savings.", essentials_pct))
    } else if essentials_pct <= 75 {
        (13, format!("{}% of spend on essentials — limited discretionary headroom.", essentials_pct))
    } else {
        (5, format!("{}% on essentials is high. Review fixed costs where possible.", essentials_pct))
    };
    pillars.push(HealthPillar {
        name: "Essentials Balance",
        score: er_score,
        max_score: 20,
        grade: grade(er_score, 20),
        explanation: er_explanation,
    });

    // 4. Subscription load (0-15)
    let sub_pct = if income > 0 {
        insights.subscription_monthly_cost_pence * 100 / income
    } else {
        0
    };
    let sub_monthly = format_pence(insights.subscription_monthly_cost_pence);
    let (sub_score, sub_explanation) = if sub_pct <= 3 {
        (15, format!("Low subscription load ({}% of income = {}/mo).", sub_pct, sub_monthly))
    } else if sub_pct <= 6 {
        (10, format!("Moderate subscriptions ({}% of income = {}/mo). Worth an annual review.", sub_pct, sub_monthly))
    } else {
        (4, format!("High subscription load ({}% of income = {}/mo). Consider consolidating.", sub_pct, sub_monthly))
    };
    pillars.push(HealthPillar {
        name: "Subscription Load",
        score: sub_score,
        max_score: 15,
        grade: grade(sub_score, 15),
        explanation: sub_explanation,
    });

    // 5. Emergency buffer (0-15): months of spend covered by balance
    let buffer_tenths = if spend > 0 {
        insights.current_balance_pence * 10 / spend
    } else {
        0
    };
    let buffer_display = format!("{}.{}", buffer_tenths / 10, (buffer_tenths % 10).abs());
    let (buf_score, buf_explanation) = if buffer_tenths >= 30 {
        (15, format!("Strong buffer — {} months of expenses in account (target: 3 or more).", buffer_display))
    } else if buffer_tenths >= 10 {
        (8, format!("{} months buffer. Building to 3 months provides a solid safety net.", buffer_display))
    } else {
        (3, format!("Low buffer ({} months). Priority: build an emergency fund.", buffer_display))
    };
    pillars.push(HealthPillar {
        name: "Emergency Buffer",
        score: buf_score,
        max_score: 15,
        grade: grade(buf_score, 15),
        explanation: buf_explanation,
    });

    let overall: u32 = pillars.iter().map(|p| p.score).sum();
    let overall_grade = grade(overall, MAX_SCORE);
    let summary = match overall_grade {
        "A" => "Your finances are in great shape. Keep it up.",
        "B" => "Good financial health with a few areas to optimise.",
        "C" => "Some improvements could significantly boost your position.",
        _ => "Your finances need attention — let's identify quick wins.",
    };

    FinancialHealthReport {
        customer_id: insights.customer_id.clone(),
        overall_score: overall,
        overall_grade,
        summary,
        pillars,
        savings_rate_pct,
        essentials_pct,
        subscription_pct: sub_pct,
        months_buffer_tenths: buffer_tenths,
    }
}

pub fn report_to_facts(report: &FinancialHealthReport) -> Value {
    json!({
        "overall_score": report.overall_score,
        "overall_grade": report.overall_grade,
        "summary": report.summary,
        "savings_rate": format!("{}%", report.savings_rate_pct),
        "essentials_percentage": format!("{}%", report.essentials_pct),
        "months_emergency_buffer": format!(
            "{}.{}",
            report.months_buffer_tenths / 10,
            (report.months_buffer_tenths % 10).abs()
        ),
        "pillars": report
            .pillars
            .iter()
            .map(|p| json!({
                "name": p.name,
                "score": format!("{}/{}", p.score, p.max_score),
                "grade": p.grade,
                "explanation": p.explanation,
            }))
            .collect::<Vec<_>>(),
    })
}

pub struct HealthScoreTool {
    profile: Arc<CustomerProfile>,
}

impl HealthScoreTool {
    pub fn new(profile: Arc<CustomerProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait::async_trait]
impl Tool for HealthScoreTool {
    fn name(&self) -> &'static str {
        "get_financial_health_score"
    }

    fn description(&self) -> &'static str {
        "Calculate the customer's financial health score (0-100) across five pillars"
    }

    async fn execute(&self, _args: &Value) -> Result<FactBundle> {
        let insights = Analyser::new(&self.profile).full_insights(3);
        let report = compute_health_score(&insights);
        Ok(FactBundle::new(report_to_facts(&report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::tools::transaction_analyser::Analyser;

    #[test]
    fn test_score_within_bounds() {
        let profile = data::demo_customer();
        let insights = Analyser::new(&profile).full_insights(3);
        let report = compute_health_score(&insights);

        assert!(report.overall_score <= MAX_SCORE);
        assert_eq!(report.pillars.len(), 5);
        assert_eq!(
            report.overall_score,
            report.pillars.iter().map(|p| p.score).sum::<u32>()
        );
    }

    #[test]
    fn test_pillar_maxima_sum_to_hundred() {
        let profile = data::demo_customer();
        let insights = Analyser::new(&profile).full_insights(3);
        let report = compute_health_score(&insights);
        assert_eq!(report.pillars.iter().map(|p| p.max_score).sum::<u32>(), MAX_SCORE);
    }

    #[test]
    fn test_grades_are_consistent() {
        assert_eq!(grade(30, 30), "A");
        assert_eq!(grade(21, 30), "B");
        assert_eq!(grade(15, 30), "C");
        assert_eq!(grade(5, 30), "D");
    }

    #[tokio::test]
    async fn test_health_score_tool_reports_pillars() {
        let tool = HealthScoreTool::new(Arc::new(data::demo_customer()));
        let bundle = tool.execute(&serde_json::json!({})).await.unwrap();
        assert_eq!(bundle.facts["pillars"].as_array().map(|a| a.len()), Some(5));
    }
}
