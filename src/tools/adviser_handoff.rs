//! Warm adviser handoff
//!
//! Assembles a full context package when a customer needs a human adviser,
//! so they never have to start over. All content is structured data built
//! from verified figures; the model does not generate the handoff.

use crate::data::CustomerProfile;
use crate::extract::format_pence;
use crate::models::FactBundle;
use crate::tools::transaction_analyser::Analyser;
use crate::tools::Tool;
use crate::Result;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Reason registry: code → description.
pub const HANDOFF_REASONS: &[(&str, &str)] = &[
    ("regulated_advice", "Customer requires regulated financial advice"),
    ("mortgage_enquiry", "Mortgage application or detailed mortgage advice"),
    ("investment_advice", "Investment portfolio or ISA advice"),
    ("pension_advice", "Pension planning or retirement advice"),
    ("complex_debt", "Complex debt restructuring or IVA enquiry"),
    ("financial_distress", "Customer showing signs of financial difficulty"),
    ("customer_requested", "Customer explicitly requested to speak to an adviser"),
    ("complaint", "Customer expressing dissatisfaction"),
];

const CALLBACK_CONTACT: &str = "Arrange a callback via the app or website";
const PHONE_CONTACT: &str = "0800 072 7000";

#[derive(Debug, Clone)]
pub struct HandoffPackage {
    pub handoff_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub reason_code: String,
    pub reason_description: String,
    pub customer_id: String,
    pub customer_name: String,
    pub net_monthly_income: String,
    pub average_monthly_spend: String,
    pub average_monthly_surplus: String,
    pub current_balance: String,
    pub triggering_question: String,
    pub recommended_channel: &'static str,
    pub contact_details: &'static str,
    pub priority: &'static str,
    pub adviser_notes: Vec<String>,
}

fn reason_description(code: &str) -> &'static str {
    HANDOFF_REASONS
        .iter()
        .find(|(reason, _)| *reason == code)
        .map(|(_, description)| *description)
        .unwrap_or("Adviser assistance required")
}

/// Assemble a complete handoff package from verified session context.
pub fn build_handoff_package(
    profile: &CustomerProfile,
    reason_code: &str,
    triggering_question: &str,
) -> HandoffPackage {
    let insights = Analyser::new(profile).full_insights(3);

    let (priority, channel, contact) = match reason_code {
        "financial_distress" | "complaint" => ("urgent", "phone", PHONE_CONTACT),
        _ => ("standard", "callback", CALLBACK_CONTACT),
    };

    let mut adviser_notes = vec![format!(
        "Customer has a monthly surplus of {} — financially active profile.",
        format_pence(insights.average_monthly_surplus_pence)
    )];
    if !triggering_question.is_empty() {
        adviser_notes.push(format!("Triggering question: {}", triggering_question));
    }

    HandoffPackage {
        handoff_id: Uuid::new_v4(),
        created_at: Utc::now(),
        reason_code: reason_code.to_string(),
        reason_description: reason_description(reason_code).to_string(),
        customer_id: profile.customer_id.clone(),
        customer_name: profile.name.clone(),
        net_monthly_income: format_pence(insights.average_monthly_income_pence),
        average_monthly_spend: format_pence(insights.average_monthly_spend_pence),
        average_monthly_surplus: format_pence(insights.average_monthly_surplus_pence),
        current_balance: format_pence(insights.current_balance_pence),
        triggering_question: triggering_question.to_string(),
        recommended_channel: channel,
        contact_details: contact,
        priority,
        adviser_notes,
    }
}

/// Customer-facing summary of the handoff — what they see in the chat.
pub fn package_to_facts(package: &HandoffPackage) -> Value {
    let reference: String = package
        .handoff_id
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase();

    json!({
        "handoff_created": true,
        "handoff_reference": reference,
        "reason": package.reason_description,
        "next_step": format!("Speak to a financial adviser via {}", package.recommended_channel),
        "contact": package.contact_details,
        "priority": package.priority,
        "context_shared_with_adviser": [
            "Your spending and income summary",
            "Your active financial goals",
            "The question that brought you here",
        ],
        "message_for_customer": "Your adviser will already have your financial summary, so you \
            won't need to repeat yourself.",
        "customer_snapshot": {
            "net_monthly_income": package.net_monthly_income,
            "average_monthly_spend": package.average_monthly_spend,
            "average_monthly_surplus": package.average_monthly_surplus,
            "current_balance": package.current_balance,
        },
    })
}

pub struct EscalateToAdviserTool {
    profile: Arc<CustomerProfile>,
}

impl EscalateToAdviserTool {
    pub fn new(profile: Arc<CustomerProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait::async_trait]
impl Tool for EscalateToAdviserTool {
    fn name(&self) -> &'static str {
        "escalate_to_adviser"
    }

    fn description(&self) -> &'static str {
        "Build a warm adviser handoff with full customer context so the customer doesn't repeat themselves"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "reason": {"type": "string", "description": "regulated_advice, mortgage_enquiry, investment_advice, pension_advice, complex_debt, customer_requested or complaint"},
                "triggering_question": {"type": "string", "description": "The question that prompted the escalation"}
            }
        })
    }

    async fn execute(&self, args: &Value) -> Result<FactBundle> {
        let reason = args
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("customer_requested");
        let question = args
            .get("triggering_question")
            .and_then(Value::as_str)
            .unwrap_or_default();

        let package = build_handoff_package(&self.profile, reason, question);
        Ok(FactBundle::new(package_to_facts(&package)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;

    #[test]
    fn test_package_carries_verified_snapshot() {
        let profile = data::demo_customer();
        let package = build_handoff_package(&profile, "regulated_advice", "Which ISA should I pick?");
        assert_eq!(package.reason_code, "regulated_advice");
        assert!(package.net_monthly_income.starts_with('£'));
        assert_eq!(package.priority, "standard");
        assert_eq!(package.recommended_channel, "callback");
    }

    #[test]
    fn test_distress_routes_urgent_phone() {
        let profile = data::demo_customer();
        let package = build_handoff_package(&profile, "financial_distress", "");
        assert_eq!(package.priority, "urgent");
        assert_eq!(package.recommended_channel, "phone");
    }

    #[test]
    fn test_unknown_reason_gets_default_description() {
        let profile = data::demo_customer();
        let package = build_handoff_package(&profile, "something_else", "");
        assert_eq!(package.reason_description, "Adviser assistance required");
    }

    #[test]
    fn test_customer_facts_include_reference() {
        let profile = data::demo_customer();
        let package = build_handoff_package(&profile, "customer_requested", "");
        let facts = package_to_facts(&package);
        assert_eq!(facts["handoff_reference"].as_str().map(str::len), Some(8));
        assert_eq!(facts["handoff_created"], true);
    }
}
