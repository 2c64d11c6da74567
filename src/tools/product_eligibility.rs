//! Indicative product eligibility guidance
//!
//! Checks a verified financial profile against illustrative banking
//! product criteria. Outputs use "appears to meet" language only, and
//! every outcome carries the standard caveat — this is never an offer,
//! a Decision in Principle, or a credit decision.

use crate::data::CustomerProfile;
use crate::extract::format_pence;
use crate::models::FactBundle;
use crate::tools::transaction_analyser::Analyser;
use crate::tools::Tool;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;

pub const STANDARD_CAVEAT: &str = "This is indicative guidance only, based on your transaction \
data. It is not a product offer or guarantee of eligibility. Actual eligibility is subject to \
a full application, credit check and affordability assessment. Terms and conditions apply.";

#[derive(Debug, Clone)]
struct ProductRule {
    product_id: &'static str,
    name: &'static str,
    product_type: &'static str,
    description: &'static str,
    min_monthly_income_pence: Option<i64>,
    min_monthly_surplus_pence: Option<i64>,
    max_monthly_surplus_pence: Option<i64>,
    requires_credit_assessment: bool,
    benefit_summary: &'static str,
}

/// Illustrative eligibility rules. In production these are maintained by
/// product teams and versioned separately from agent code.
const PRODUCT_RULES: &[ProductRule] = &[
    ProductRule {
        product_id: "club_current_account",
        name: "Club Current Account",
        product_type: "current_account",
        description: "Earn lifestyle benefits and preferential savings rates",
        min_monthly_income_pence: Some(150_000),
        min_monthly_surplus_pence: None,
        max_monthly_surplus_pence: None,
        requires_credit_assessment: false,
        benefit_summary: "Lifestyle benefit plus preferential savings rates",
    },
    ProductRule {
        product_id: "easy_saver",
        name: "Easy Saver Account",
        product_type: "savings",
        description: "Flexible easy-access savings",
        min_monthly_income_pence: None,
        min_monthly_surplus_pence: Some(5_000),
        max_monthly_surplus_pence: None,
        requires_credit_assessment: false,
        benefit_summary: "Accessible savings pot for short-term goals and emergency funds",
    },
    ProductRule {
        product_id: "monthly_saver",
        name: "Monthly Saver",
        product_type: "savings",
        description: "Regular monthly savings with a preferential rate",
        min_monthly_income_pence: None,
        min_monthly_surplus_pence: Some(2_500),
        max_monthly_surplus_pence: Some(40_000),
        requires_credit_assessment: false,
        benefit_summary: "Save £25-£400/month at a preferential rate",
    },
    ProductRule {
        product_id: "cash_isa",
        name: "Cash ISA",
        product_type: "isa",
        description: "Tax-free savings up to £20,000 per tax year",
        min_monthly_income_pence: None,
        min_monthly_surplus_pence: Some(5_000),
        max_monthly_surplus_pence: None,
        requires_credit_assessment: false,
        benefit_summary: "Tax-free interest on savings",
    },
    ProductRule {
        product_id: "personal_loan",
        name: "Personal Loan",
        product_type: "credit",
        description: "Fixed-rate personal loan",
        min_monthly_income_pence: Some(100_000),
        min_monthly_surplus_pence: Some(10_000),
        max_monthly_surplus_pence: None,
        requires_credit_assessment: true,
        benefit_summary: "Fixed monthly repayments with predictable cost",
    },
];

#[derive(Debug, Clone)]
pub struct EligibilityOutcome {
    pub product_id: &'static str,
    pub product_name: &'static str,
    pub product_type: &'static str,
    pub description: &'static str,
    pub appears_eligible: bool,
    pub indicators: Vec<String>,
    pub gaps: Vec<String>,
    pub benefit_summary: &'static str,
}

/// Evaluate every product rule against verified figures.
pub fn check_eligibility(
    net_monthly_income_pence: i64,
    average_monthly_surplus_pence: i64,
) -> Vec<EligibilityOutcome> {
    let mut outcomes: Vec<EligibilityOutcome> = PRODUCT_RULES
        .iter()
        .map(|rule| {
            let mut indicators = Vec::new();
            let mut gaps = Vec::new();

            if let Some(threshold) = rule.min_monthly_income_pence {
                if net_monthly_income_pence >= threshold {
                    indicators.push(format!(
                        "Monthly income ({}) meets the {} minimum",
                        format_pence(net_monthly_income_pence),
                        format_pence(threshold)
                    ));
                } else {
                    gaps.push(format!(
                        "Monthly income ({}) is below the {} minimum",
                        format_pence(net_monthly_income_pence),
                        format_pence(threshold)
                    ));
                }
            }

            if let Some(threshold) = rule.min_monthly_surplus_pence {
                if average_monthly_surplus_pence >= threshold {
                    indicators.push(format!(
                        "Monthly surplus ({}) meets the {} minimum",
                        format_pence(average_monthly_surplus_pence),
                        format_pence(threshold)
                    ));
                } else {
                    gaps.push(format!(
                        "Monthly surplus ({}) is below the {} minimum",
                        format_pence(average_monthly_surplus_pence),
                        format_pence(threshold)
                    ));
                }
            }

            if let Some(ceiling) = rule.max_monthly_surplus_pence {
                if average_monthly_surplus_pence <= ceiling {
                    indicators.push(format!(
                        "Monthly surplus within the {} deposit limit",
                        format_pence(ceiling)
                    ));
                }
                // Over the ceiling is fine — the deposit amount is a choice.
            }

            if rule.requires_credit_assessment {
                gaps.push(
                    "Requires credit assessment — cannot be verified from transactions alone"
                        .to_string(),
                );
            }

            let appears_eligible = gaps.is_empty()
                || (!indicators.is_empty()
                    && gaps.iter().all(|g| g.contains("credit assessment")));

            EligibilityOutcome {
                product_id: rule.product_id,
                product_name: rule.name,
                product_type: rule.product_type,
                description: rule.description,
                appears_eligible,
                indicators,
                gaps,
                benefit_summary: rule.benefit_summary,
            }
        })
        .collect();

    outcomes.sort_by_key(|o| (!o.appears_eligible, o.product_type));
    outcomes
}

pub fn eligibility_to_facts(outcomes: &[EligibilityOutcome]) -> Value {
    let eligible: Vec<&EligibilityOutcome> =
        outcomes.iter().filter(|o| o.appears_eligible).collect();

    json!({
        "eligible_count": eligible.len(),
        "products": eligible
            .iter()
            .take(3)
            .map(|o| json!({
                "name": o.product_name,
                "type": o.product_type,
                "description": o.description,
                "benefit": o.benefit_summary,
                "why_eligible": o.indicators.iter().take(2).collect::<Vec<_>>(),
                "caveat": STANDARD_CAVEAT,
            }))
            .collect::<Vec<_>>(),
        "disclaimer": "Product suggestions are based on your spending profile only. They are \
            not personalised financial advice. Speak to an adviser for a full product assessment.",
    })
}

pub struct ProductEligibilityTool {
    profile: Arc<CustomerProfile>,
}

impl ProductEligibilityTool {
    pub fn new(profile: Arc<CustomerProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait::async_trait]
impl Tool for ProductEligibilityTool {
    fn name(&self) -> &'static str {
        "check_product_eligibility"
    }

    fn description(&self) -> &'static str {
        "Check indicative eligibility for banking products from the verified income and spending profile (guidance only)"
    }

    async fn execute(&self, _args: &Value) -> Result<FactBundle> {
        let insights = Analyser::new(&self.profile).full_insights(3);
        let outcomes = check_eligibility(
            insights.average_monthly_income_pence,
            insights.average_monthly_surplus_pence,
        );
        Ok(FactBundle::new(eligibility_to_facts(&outcomes)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_income_meets_current_account_criteria() {
        let outcomes = check_eligibility(300_000, 50_000);
        let account = outcomes
            .iter()
            .find(|o| o.product_id == "club_current_account")
            .unwrap();
        assert!(account.appears_eligible);
        assert!(account.gaps.is_empty());
    }

    #[test]
    fn test_low_surplus_fails_saver_criteria() {
        let outcomes = check_eligibility(100_000, 1_000);
        let saver = outcomes.iter().find(|o| o.product_id == "easy_saver").unwrap();
        assert!(!saver.appears_eligible);
        assert!(!saver.gaps.is_empty());
    }

    #[test]
    fn test_credit_products_flag_unverifiable_gap() {
        let outcomes = check_eligibility(300_000, 50_000);
        let loan = outcomes.iter().find(|o| o.product_id == "personal_loan").unwrap();
        // Gap present but eligibility still indicative when thresholds met.
        assert!(loan.gaps.iter().any(|g| g.contains("credit assessment")));
        assert!(loan.appears_eligible);
    }

    #[test]
    fn test_eligible_products_sort_first() {
        let outcomes = check_eligibility(100_000, 1_000);
        let first_ineligible = outcomes.iter().position(|o| !o.appears_eligible);
        if let Some(pos) = first_ineligible {
            assert!(outcomes[pos..].iter().all(|o| !o.appears_eligible));
        }
    }

    #[test]
    fn test_facts_cap_products_at_three() {
        let outcomes = check_eligibility(300_000, 30_000);
        let facts = eligibility_to_facts(&outcomes);
        assert!(facts["products"].as_array().unwrap().len() <= 3);
    }
}
