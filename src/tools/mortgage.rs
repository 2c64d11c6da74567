//! Mortgage affordability modeller — deterministic guidance only
//!
//! Stress rates, LTI multiples and thresholds follow FCA/PRA regulatory
//! guidelines, not model knowledge. Outputs are guidance — never a
//! mortgage offer or Decision in Principle — and the result bundle always
//! carries the mortgage disclaimer.

use crate::data::CustomerProfile;
use crate::extract::format_pence;
use crate::models::FactBundle;
use crate::tools::transaction_analyser::{Analyser, SpendingInsights};
use crate::tools::{arg_pounds_as_pence, arg_u32, Tool};
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;

/// PRA loan-to-income flow limit: 4.5x gross income standard upper bound.
const MAX_LTI_MULTIPLE_TENTHS: i64 = 45;

/// FCA stress test: affordability assessed at rate + 3%.
const STRESS_RATE_ADD_ON: f64 = 0.03;

const DEFAULT_TERM_YEARS: u32 = 25;

/// Indicative product rates. Guidance only, never quoted as an offer.
const INDICATIVE_RATES: &[(&str, f64)] = &[
    ("2yr_fixed", 0.0499),
    ("5yr_fixed", 0.0479),
    ("tracker", 0.0519),
];

pub const MORTGAGE_DISCLAIMER: &str = "These are indicative figures for guidance only. Not a \
mortgage offer or Decision in Principle. Actual affordability is determined by a full \
application and credit assessment. Speak to a qualified mortgage adviser for personalised \
advice.";

#[derive(Debug, Clone)]
pub struct AffordabilityScenario {
    pub rate_type: &'static str,
    pub annual_rate: f64,
    pub stressed_rate: f64,
    pub monthly_payment_pence: i64,
    pub stressed_monthly_payment_pence: i64,
    pub is_affordable: bool,
    pub ltv_pct: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct MortgageAffordability {
    pub gross_annual_income_pence: i64,
    pub net_monthly_income_pence: i64,
    pub max_loan_by_lti_pence: i64,
    pub max_affordable_payment_pence: i64,
    pub requested_loan_pence: Option<i64>,
    pub requested_affordable: Option<bool>,
    pub stress_pass: Option<bool>,
    pub surplus_after_mortgage_pence: Option<i64>,
    pub deposit_required_5pct_pence: Option<i64>,
    pub deposit_required_10pct_pence: Option<i64>,
    pub scenarios: Vec<AffordabilityScenario>,
}

/// Standard annuity repayment: M = P * r(1+r)^n / ((1+r)^n - 1).
fn monthly_repayment_pence(principal_pence: i64, annual_rate: f64, years: u32) -> i64 {
    let n = (years * 12) as i32;
    if annual_rate == 0.0 {
        return principal_pence / n as i64;
    }
    let monthly_rate = annual_rate / 12.0;
    let factor = (1.0 + monthly_rate).powi(n);
    let payment = principal_pence as f64 * (monthly_rate * factor) / (factor - 1.0);
    payment.round() as i64
}

/// Compute affordability from verified spending insights.
pub fn assess_affordability(
    insights: &SpendingInsights,
    requested_loan_pence: Option<i64>,
    property_value_pence: Option<i64>,
    term_years: u32,
) -> MortgageAffordability {
    let net_monthly = insights.average_monthly_income_pence;
    // Gross estimated from net for a typical income band; production would
    // take actual gross from payroll data.
    let gross_annual = (net_monthly as f64 * 12.0 / 0.72).round() as i64;

    let max_loan_lti = gross_annual * MAX_LTI_MULTIPLE_TENTHS / 10;
    // 35% of net income: widely used affordability benchmark.
    let max_affordable_payment = net_monthly * 35 / 100;

    let loan = requested_loan_pence.unwrap_or(max_loan_lti);

    let scenarios: Vec<AffordabilityScenario> = INDICATIVE_RATES
        .iter()
        .map(|(rate_type, rate)| {
            let stressed = rate + STRESS_RATE_ADD_ON;
            let monthly = monthly_repayment_pence(loan, *rate, term_years);
            let stressed_monthly = monthly_repayment_pence(loan, stressed, term_years);
            let ltv = property_value_pence
                .filter(|v| *v > 0)
                .map(|v| loan * 100 / v);
            AffordabilityScenario {
                rate_type,
                annual_rate: *rate,
                stressed_rate: stressed,
                monthly_payment_pence: monthly,
                stressed_monthly_payment_pence: stressed_monthly,
                is_affordable: stressed_monthly <= max_affordable_payment,
                ltv_pct: ltv,
            }
        })
        .collect();

    // 5yr fixed is the reference scenario for the requested-loan checks.
    let reference = scenarios.iter().find(|s| s.rate_type == "5yr_fixed");
    let (requested_affordable, surplus_after, stress_pass) = match (requested_loan_pence, reference)
    {
        (Some(_), Some(reference)) => (
            Some(reference.is_affordable),
            Some(net_monthly - insights.average_monthly_spend_pence - reference.monthly_payment_pence),
            Some(reference.stressed_monthly_payment_pence <= max_affordable_payment),
        ),
        _ => (None, None, None),
    };

    MortgageAffordability {
        gross_annual_income_pence: gross_annual,
        net_monthly_income_pence: net_monthly,
        max_loan_by_lti_pence: max_loan_lti,
        max_affordable_payment_pence: max_affordable_payment,
        requested_loan_pence,
        requested_affordable,
        stress_pass,
        surplus_after_mortgage_pence: surplus_after,
        deposit_required_5pct_pence: property_value_pence.map(|v| v * 5 / 100),
        deposit_required_10pct_pence: property_value_pence.map(|v| v * 10 / 100),
        scenarios,
    }
}

pub fn affordability_to_facts(result: &MortgageAffordability) -> Value {
    let optional_amount = |pence: Option<i64>| match pence {
        Some(p) => json!(format_pence(p)),
        None => json!("N/A"),
    };

    json!({
        "net_monthly_income": format_pence(result.net_monthly_income_pence),
        "estimated_gross_annual_income": format_pence(result.gross_annual_income_pence),
        "max_loan_by_income_multiple": format_pence(result.max_loan_by_lti_pence),
        "income_multiple_used": "4.5x (PRA guideline)",
        "max_affordable_monthly_payment": format_pence(result.max_affordable_payment_pence),
        "requested_loan": optional_amount(result.requested_loan_pence),
        "requested_loan_affordable": result.requested_affordable,
        "stress_test_pass": result.stress_pass,
        "surplus_after_mortgage": optional_amount(result.surplus_after_mortgage_pence),
        "deposit_required_5pct_ltv": optional_amount(result.deposit_required_5pct_pence),
        "deposit_required_10pct_ltv": optional_amount(result.deposit_required_10pct_pence),
        "scenarios": result
            .scenarios
            .iter()
            .map(|s| json!({
                "rate_type": s.rate_type,
                "indicative_rate": format!("{:.2}%", s.annual_rate * 100.0),
                "stressed_rate": format!("{:.2}%", s.stressed_rate * 100.0),
                "monthly_payment": format_pence(s.monthly_payment_pence),
                "stressed_monthly_payment": format_pence(s.stressed_monthly_payment_pence),
                "affordable_at_stress": s.is_affordable,
                "ltv": s.ltv_pct.map(|v| format!("{}%", v)).unwrap_or_else(|| "N/A".to_string()),
            }))
            .collect::<Vec<_>>(),
        "fca_disclaimer": MORTGAGE_DISCLAIMER,
    })
}

pub struct MortgageAffordabilityTool {
    profile: Arc<CustomerProfile>,
}

impl MortgageAffordabilityTool {
    pub fn new(profile: Arc<CustomerProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait::async_trait]
impl Tool for MortgageAffordabilityTool {
    fn name(&self) -> &'static str {
        "assess_mortgage_affordability"
    }

    fn description(&self) -> &'static str {
        "Model mortgage affordability from verified income and spending (PRA LTI rules, FCA stress test)"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "requested_loan_amount": {"type": "number", "description": "Loan amount in pounds (omit to use the LTI maximum)"},
                "property_value": {"type": "number", "description": "Property purchase price in pounds (omit to skip LTV)"},
                "term_years": {"type": "integer", "description": "Mortgage term in years, default 25"}
            }
        })
    }

    async fn execute(&self, args: &Value) -> Result<FactBundle> {
        let requested = arg_pounds_as_pence(args, "requested_loan_amount");
        let property = arg_pounds_as_pence(args, "property_value");
        let term_years = arg_u32(args, "term_years", DEFAULT_TERM_YEARS).clamp(5, 40);

        let insights = Analyser::new(&self.profile).full_insights(3);
        let result = assess_affordability(&insights, requested, property, term_years);
        Ok(FactBundle::new(affordability_to_facts(&result)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::tools::transaction_analyser::Analyser;

    #[test]
    fn test_annuity_formula_zero_rate() {
        // £120,000 over 10 years at 0% = £1,000/month
        assert_eq!(monthly_repayment_pence(12_000_000, 0.0, 10), 100_000);
    }

    #[test]
    fn test_annuity_formula_known_value() {
        // £200,000 at 5% over 25 years ≈ £1,169.18/month
        let payment = monthly_repayment_pence(20_000_000, 0.05, 25);
        assert!((116_800..=117_000).contains(&payment), "payment was {}", payment);
    }

    #[test]
    fn test_stressed_payment_exceeds_base() {
        let profile = data::demo_customer();
        let insights = Analyser::new(&profile).full_insights(3);
        let result = assess_affordability(&insights, Some(15_000_000), Some(20_000_000), 25);

        for scenario in &result.scenarios {
            assert!(scenario.stressed_monthly_payment_pence > scenario.monthly_payment_pence);
        }
        assert_eq!(result.deposit_required_10pct_pence, Some(2_000_000));
        assert!(result.requested_affordable.is_some());
    }

    #[test]
    fn test_no_requested_loan_omits_assessment() {
        let profile = data::demo_customer();
        let insights = Analyser::new(&profile).full_insights(3);
        let result = assess_affordability(&insights, None, None, 25);
        assert!(result.requested_affordable.is_none());
        assert!(result.stress_pass.is_none());
        assert_eq!(result.scenarios.len(), 3);
    }

    #[tokio::test]
    async fn test_tool_output_carries_disclaimer() {
        let tool = MortgageAffordabilityTool::new(Arc::new(data::demo_customer()));
        let bundle = tool
            .execute(&json!({"requested_loan_amount": 150000.0, "property_value": 200000.0}))
            .await
            .unwrap();
        assert_eq!(bundle.facts["fca_disclaimer"], MORTGAGE_DISCLAIMER);
    }
}
