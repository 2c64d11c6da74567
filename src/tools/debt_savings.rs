//! Savings vs debt trade-off modeller
//!
//! Deterministic amortisation and compound-interest projections, compared
//! side by side with a rate-differential recommendation. Comparative
//! guidance only — not regulated financial advice.

use crate::data::CustomerProfile;
use crate::error::CoachingError;
use crate::extract::format_pence;
use crate::models::FactBundle;
use crate::tools::transaction_analyser::Analyser;
use crate::tools::{arg_pounds_as_pence, Tool};
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;

/// 50-year safety cap on the amortisation simulation.
const MAX_AMORTISATION_MONTHS: u32 = 600;

pub const TRADEOFF_DISCLAIMER: &str = "This comparison is for guidance only and does not \
constitute regulated financial advice. Your optimal strategy depends on your full financial \
circumstances, tax position and risk appetite.";

#[derive(Debug, Clone)]
pub struct DebtPaydownProjection {
    pub extra_monthly_payment_pence: i64,
    pub months_to_payoff: u32,
    pub total_interest_paid_pence: i64,
    pub interest_saved_vs_minimum_pence: i64,
}

#[derive(Debug, Clone)]
pub struct SavingsProjection {
    pub monthly_amount_pence: i64,
    pub years: u32,
    pub final_balance_pence: i64,
    pub interest_earned_pence: i64,
}

#[derive(Debug, Clone)]
pub struct TradeOffResult {
    pub monthly_amount_available_pence: i64,
    pub debt_balance_pence: i64,
    pub debt_annual_rate: f64,
    pub savings_annual_rate: f64,
    pub overpay: DebtPaydownProjection,
    pub minimum_only: DebtPaydownProjection,
    pub savings: SavingsProjection,
    pub net_benefit_of_overpaying_pence: i64,
    pub rate_differential: f64,
    pub recommendation: &'static str,
    pub recommendation_reason: String,
    pub is_mortgage: bool,
}

/// Month-by-month amortisation. Returns (months_to_payoff, total_interest).
/// A payment that doesn't cover interest never terminates; the caller gets
/// the sentinel (9999, i64::MAX) and must treat the debt as unserviceable.
fn months_to_payoff(balance_pence: i64, annual_rate: f64, monthly_payment_pence: i64) -> (u32, i64) {
    if monthly_payment_pence <= 0 {
        return (9999, i64::MAX);
    }
    if annual_rate == 0.0 {
        let months = (balance_pence + monthly_payment_pence - 1) / monthly_payment_pence;
        return (months as u32, 0);
    }

    let monthly_rate = annual_rate / 12.0;
    let mut remaining = balance_pence;
    let mut total_interest: i64 = 0;
    let mut months: u32 = 0;

    while remaining > 0 && months < MAX_AMORTISATION_MONTHS {
        let interest = (remaining as f64 * monthly_rate).round() as i64;
        let principal = monthly_payment_pence - interest;
        if principal <= 0 {
            return (9999, i64::MAX);
        }
        total_interest += interest;
        remaining -= principal;
        months += 1;
    }

    (months, total_interest)
}

/// Future value of fixed monthly contributions with compound interest.
fn compound_savings_pence(monthly_pence: i64, annual_rate: f64, years: u32) -> i64 {
    let n = (years * 12) as i32;
    if annual_rate == 0.0 {
        return monthly_pence * n as i64;
    }
    let monthly_rate = annual_rate / 12.0;
    let fv = monthly_pence as f64 * (((1.0 + monthly_rate).powi(n) - 1.0) / monthly_rate);
    fv.round() as i64
}

/// Compare applying the monthly surplus to debt vs saving it.
pub fn analyse_tradeoff(
    debt_balance_pence: i64,
    debt_annual_rate: f64,
    current_minimum_payment_pence: i64,
    monthly_surplus_pence: i64,
    savings_annual_rate: f64,
    is_mortgage: bool,
) -> TradeOffResult {
    let (min_months, min_interest) =
        months_to_payoff(debt_balance_pence, debt_annual_rate, current_minimum_payment_pence);
    let minimum_only = DebtPaydownProjection {
        extra_monthly_payment_pence: 0,
        months_to_payoff: min_months,
        total_interest_paid_pence: min_interest,
        interest_saved_vs_minimum_pence: 0,
    };

    let overpay_payment = current_minimum_payment_pence + monthly_surplus_pence;
    let (op_months, op_interest) =
        months_to_payoff(debt_balance_pence, debt_annual_rate, overpay_payment);
    let interest_saved = min_interest.saturating_sub(op_interest);
    let overpay = DebtPaydownProjection {
        extra_monthly_payment_pence: monthly_surplus_pence,
        months_to_payoff: op_months,
        total_interest_paid_pence: op_interest,
        interest_saved_vs_minimum_pence: interest_saved,
    };

    // Savings scenario runs for the same period the overpaid debt takes.
    let years = (op_months / 12).max(1);
    let final_balance = compound_savings_pence(monthly_surplus_pence, savings_annual_rate, years);
    let contributed = monthly_surplus_pence * (years * 12) as i64;
    let interest_earned = final_balance - contributed;
    let savings = SavingsProjection {
        monthly_amount_pence: monthly_surplus_pence,
        years,
        final_balance_pence: final_balance,
        interest_earned_pence: interest_earned,
    };

    let rate_diff = debt_annual_rate - savings_annual_rate;
    let net_benefit = interest_saved.saturating_sub(interest_earned);

    let (recommendation, reason) = if rate_diff > 0.02 {
        (
            "pay_debt_first",
            format!(
                "Your debt rate ({:.1}%) is {:.1}% higher than the savings rate ({:.1}%). \
                 Overpaying saves {} in interest — more than the {} you'd earn saving the \
                 same amount.",
                debt_annual_rate * 100.0,
                rate_diff * 100.0,
                savings_annual_rate * 100.0,
                format_pence(interest_saved),
                format_pence(interest_earned.max(0)),
            ),
        )
    } else if rate_diff < -0.005 {
        (
            "save_first",
            format!(
                "The savings rate ({:.1}%) exceeds your debt rate ({:.1}%). Your money works \
                 harder in savings than paying down this debt early.",
                savings_annual_rate * 100.0,
                debt_annual_rate * 100.0,
            ),
        )
    } else {
        (
            "split",
            format!(
                "Rates are close ({:.1}% debt vs {:.1}% savings). A split approach — half to \
                 debt overpayment, half to savings — balances flexibility with cost reduction.",
                debt_annual_rate * 100.0,
                savings_annual_rate * 100.0,
            ),
        )
    };

    TradeOffResult {
        monthly_amount_available_pence: monthly_surplus_pence,
        debt_balance_pence,
        debt_annual_rate,
        savings_annual_rate,
        overpay,
        minimum_only,
        savings,
        net_benefit_of_overpaying_pence: net_benefit,
        rate_differential: rate_diff,
        recommendation,
        recommendation_reason: reason,
        is_mortgage,
    }
}

pub fn tradeoff_to_facts(result: &TradeOffResult) -> Value {
    json!({
        "monthly_surplus_available": format_pence(result.monthly_amount_available_pence),
        "debt_balance": format_pence(result.debt_balance_pence),
        "debt_rate": format!("{:.1}%", result.debt_annual_rate * 100.0),
        "savings_rate": format!("{:.1}%", result.savings_annual_rate * 100.0),
        "rate_differential": format!("{:.1}%", result.rate_differential * 100.0),
        "overpay_debt_scenario": {
            "extra_monthly_payment": format_pence(result.overpay.extra_monthly_payment_pence),
            "months_to_clear": result.overpay.months_to_payoff,
            "total_interest_paid": format_pence(result.overpay.total_interest_paid_pence),
            "interest_saved_vs_minimum": format_pence(result.overpay.interest_saved_vs_minimum_pence),
        },
        "minimum_payments_only_scenario": {
            "months_to_clear": result.minimum_only.months_to_payoff,
            "total_interest_paid": format_pence(result.minimum_only.total_interest_paid_pence),
        },
        "save_instead_scenario": {
            "monthly_saving": format_pence(result.savings.monthly_amount_pence),
            "over_years": result.savings.years,
            "final_savings_balance": format_pence(result.savings.final_balance_pence),
            "interest_earned": format_pence(result.savings.interest_earned_pence),
        },
        "recommendation": result.recommendation,
        "recommendation_reason": result.recommendation_reason,
        "net_benefit_of_overpaying": format_pence(result.net_benefit_of_overpaying_pence),
        "is_mortgage": result.is_mortgage,
        "fca_disclaimer": TRADEOFF_DISCLAIMER,
    })
}

pub struct DebtVsSavingsTool {
    profile: Arc<CustomerProfile>,
}

impl DebtVsSavingsTool {
    pub fn new(profile: Arc<CustomerProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait::async_trait]
impl Tool for DebtVsSavingsTool {
    fn name(&self) -> &'static str {
        "analyse_debt_vs_savings"
    }

    fn description(&self) -> &'static str {
        "Compare overpaying a debt vs saving the same amount each month, with a clear recommendation"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "debt_balance": {"type": "number", "description": "Outstanding debt balance in pounds"},
                "debt_annual_rate_pct": {"type": "number", "description": "Annual debt interest rate, e.g. 5.5"},
                "current_minimum_payment": {"type": "number", "description": "Current monthly minimum payment in pounds"},
                "savings_annual_rate_pct": {"type": "number", "description": "Indicative savings rate, default 4.5"},
                "is_mortgage": {"type": "boolean", "description": "True for mortgage overpayment scenarios"}
            },
            "required": ["debt_balance", "debt_annual_rate_pct", "current_minimum_payment"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<FactBundle> {
        let debt_balance = arg_pounds_as_pence(args, "debt_balance").ok_or_else(|| {
            CoachingError::InvalidToolInput("expected positive 'debt_balance'".to_string())
        })?;
        let minimum_payment =
            arg_pounds_as_pence(args, "current_minimum_payment").ok_or_else(|| {
                CoachingError::InvalidToolInput(
                    "expected positive 'current_minimum_payment'".to_string(),
                )
            })?;
        let debt_rate = args
            .get("debt_annual_rate_pct")
            .and_then(Value::as_f64)
            .filter(|v| *v >= 0.0)
            .ok_or_else(|| {
                CoachingError::InvalidToolInput("expected 'debt_annual_rate_pct'".to_string())
            })?
            / 100.0;
        let savings_rate = args
            .get("savings_annual_rate_pct")
            .and_then(Value::as_f64)
            .unwrap_or(4.5)
            / 100.0;
        let is_mortgage = args
            .get("is_mortgage")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let insights = Analyser::new(&self.profile).full_insights(3);
        let surplus = insights.average_monthly_surplus_pence.max(0);

        let result = analyse_tradeoff(
            debt_balance,
            debt_rate,
            minimum_payment,
            surplus,
            savings_rate,
            is_mortgage,
        );
        Ok(FactBundle::new(tradeoff_to_facts(&result)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_payoff_is_exact() {
        let (months, interest) = months_to_payoff(120_000, 0.0, 10_000);
        assert_eq!(months, 12);
        assert_eq!(interest, 0);
    }

    #[test]
    fn test_payment_below_interest_never_terminates() {
        // £10,000 at 20%: interest ≈ £166/month, paying £100 gets nowhere.
        let (months, interest) = months_to_payoff(1_000_000, 0.20, 10_000);
        assert_eq!(months, 9999);
        assert_eq!(interest, i64::MAX);
    }

    #[test]
    fn test_overpaying_clears_faster_and_saves_interest() {
        let result = analyse_tradeoff(500_000, 0.18, 15_000, 20_000, 0.045, false);
        assert!(result.overpay.months_to_payoff < result.minimum_only.months_to_payoff);
        assert!(result.overpay.total_interest_paid_pence < result.minimum_only.total_interest_paid_pence);
        assert!(result.overpay.interest_saved_vs_minimum_pence > 0);
    }

    #[test]
    fn test_high_debt_rate_recommends_paydown() {
        let result = analyse_tradeoff(500_000, 0.18, 15_000, 20_000, 0.045, false);
        assert_eq!(result.recommendation, "pay_debt_first");
    }

    #[test]
    fn test_higher_savings_rate_recommends_saving() {
        let result = analyse_tradeoff(500_000, 0.01, 15_000, 20_000, 0.05, false);
        assert_eq!(result.recommendation, "save_first");
    }

    #[test]
    fn test_close_rates_recommend_split() {
        let result = analyse_tradeoff(500_000, 0.05, 15_000, 20_000, 0.045, false);
        assert_eq!(result.recommendation, "split");
    }

    #[test]
    fn test_compound_savings_grows_beyond_contributions() {
        let balance = compound_savings_pence(10_000, 0.05, 5);
        assert!(balance > 10_000 * 60);
    }
}
