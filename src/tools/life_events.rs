//! Life event detection from transaction patterns
//!
//! All signal rules are explicit merchant-keyword and amount heuristics,
//! so every detection is explainable to the customer: the evidence lists
//! the exact transactions that triggered it. Detections are only surfaced
//! to the customer, never used for unsolicited marketing.

use crate::data::{Category, CustomerProfile, Transaction};
use crate::extract::format_pence;
use crate::models::FactBundle;
use crate::tools::Tool;
use crate::Result;
use chrono::{Duration, NaiveDate, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

const NURSERY_KEYWORDS: &[&str] = &["nursery", "daycare", "childcare", "child care"];

const BABY_EQUIPMENT_KEYWORDS: &[&str] =
    &["mamas and papas", "kiddicare", "pram", "bugaboo", "mothercare"];

const PROPERTY_KEYWORDS: &[&str] = &[
    "solicitor",
    "conveyanc",
    "surveyor",
    "stamp duty",
    "land registry",
    "valuation fee",
    "arrangement fee",
];

const RENT_KEYWORDS: &[&str] = &["rent", "letting", "landlord", "estate agent", "openrent"];

/// Detections below this confidence are discarded.
const MIN_CONFIDENCE: f64 = 0.40;

/// At or above this confidence an event is treated as seen, not hypothetical.
pub const HIGH_CONFIDENCE: f64 = 0.70;

#[derive(Debug, Clone)]
pub struct LifeEventSignal {
    pub event_type: &'static str,
    pub confidence: f64,
    pub detected_date: NaiveDate,
    pub evidence: Vec<String>,
    pub suggested_coaching: String,
    pub requires_confirmation: bool,
}

#[derive(Debug, Clone)]
pub struct LifeEventReport {
    pub customer_id: String,
    pub detected_events: Vec<LifeEventSignal>,
}

fn merchant_matches(merchant: &str, keywords: &[&str]) -> bool {
    let lower = merchant.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

fn recent_debits(profile: &CustomerProfile, days: i64) -> Vec<&Transaction> {
    let cutoff = Utc::now().date_naive() - Duration::days(days);
    profile
        .transactions
        .iter()
        .filter(|t| t.amount_pence < 0 && t.date >= cutoff)
        .collect()
}

fn detect_new_baby(profile: &CustomerProfile) -> Option<LifeEventSignal> {
    let recent = recent_debits(profile, 90);
    let nursery: Vec<&&Transaction> = recent
        .iter()
        .filter(|t| merchant_matches(&t.merchant, NURSERY_KEYWORDS))
        .collect();
    let equipment: Vec<&&Transaction> = recent
        .iter()
        .filter(|t| merchant_matches(&t.merchant, BABY_EQUIPMENT_KEYWORDS))
        .collect();

    let mut confidence = 0.0;
    let mut evidence = Vec::new();
    let mut first_date = Utc::now().date_naive();

    if nursery.len() >= 2 {
        confidence += 0.60;
        evidence.push(format!("{} nursery/childcare payments detected", nursery.len()));
        if let Some(earliest) = nursery.iter().map(|t| t.date).min() {
            first_date = earliest;
        }
    }
    if !equipment.is_empty() {
        confidence = (confidence + 0.25_f64).min(1.0);
        let total: i64 = equipment.iter().map(|t| t.amount_pence.abs()).sum();
        evidence.push(format!("Baby equipment purchases totalling {}", format_pence(total)));
        if let Some(earliest) = equipment.iter().map(|t| t.date).min() {
            first_date = first_date.min(earliest);
        }
    }

    if confidence < MIN_CONFIDENCE {
        return None;
    }

    Some(LifeEventSignal {
        event_type: "new_baby",
        confidence,
        detected_date: first_date,
        evidence,
        suggested_coaching: "Starting a family changes your financial picture significantly. \
            I can help you review your budget for childcare costs, check your emergency fund, \
            and explore whether any government support applies to your situation."
            .to_string(),
        requires_confirmation: true,
    })
}

fn detect_property_purchase(profile: &CustomerProfile) -> Option<LifeEventSignal> {
    let recent = recent_debits(profile, 120);
    let property: Vec<&&Transaction> = recent
        .iter()
        .filter(|t| merchant_matches(&t.merchant, PROPERTY_KEYWORDS))
        .collect();
    let large: Vec<&&Transaction> = recent
        .iter()
        .filter(|t| t.amount_pence.abs() > 500_000)
        .collect();

    let mut confidence = 0.0;
    let mut evidence = Vec::new();
    let mut first_date = Utc::now().date_naive();

    if !property.is_empty() {
        confidence += 0.55;
        let names: Vec<&str> = property.iter().take(3).map(|t| t.merchant.as_str()).collect();
        evidence.push(format!("Property-related payments: {}", names.join(", ")));
        if let Some(earliest) = property.iter().map(|t| t.date).min() {
            first_date = earliest;
        }
    }
    if !large.is_empty() {
        confidence = (confidence + 0.25_f64).min(1.0);
        evidence.push(format!("{} large payment(s) over £5,000 detected", large.len()));
    }

    if confidence < MIN_CONFIDENCE {
        return None;
    }

    Some(LifeEventSignal {
        event_type: "property_purchase",
        confidence,
        detected_date: first_date,
        evidence,
        suggested_coaching: "Buying a home is one of the biggest financial events in your life. \
            I can help you review your new monthly budget including mortgage, utility and \
            maintenance costs, and make sure your emergency fund accounts for homeownership."
            .to_string(),
        requires_confirmation: true,
    })
}

fn detect_income_change(profile: &CustomerProfile) -> Option<LifeEventSignal> {
    let mut credits: Vec<&Transaction> = profile
        .transactions
        .iter()
        .filter(|t| t.amount_pence > 0 && t.category == Category::Salary)
        .collect();
    if credits.len() < 4 {
        return None;
    }
    credits.sort_by_key(|t| t.date);

    let recent = &credits[credits.len() - 2..];
    let older = &credits[credits.len() - 4..credits.len() - 2];

    let recent_avg = recent.iter().map(|t| t.amount_pence).sum::<i64>() / 2;
    let older_avg = older.iter().map(|t| t.amount_pence).sum::<i64>() / 2;
    if older_avg == 0 {
        return None;
    }

    let change_pct = ((recent_avg - older_avg) * 100 / older_avg).abs();
    if change_pct < 5 {
        return None;
    }

    let direction = if recent_avg > older_avg { "increased" } else { "decreased" };
    let confidence = (change_pct as f64 / 20.0).min(0.90);

    let coaching = if direction == "increased" {
        "Your income appears to have increased recently. An increase is a great opportunity \
         to boost savings or pay down debt faster."
    } else {
        "Your income appears to have decreased recently. A drop in income may mean reviewing \
         your budget to protect essential spending."
    };

    Some(LifeEventSignal {
        event_type: "income_change",
        confidence,
        detected_date: recent[0].date,
        evidence: vec![
            format!("Income {} by approximately {}%", direction, change_pct),
            format!(
                "Previous average: {}, recent average: {}",
                format_pence(older_avg),
                format_pence(recent_avg)
            ),
        ],
        suggested_coaching: coaching.to_string(),
        requires_confirmation: true,
    })
}

fn detect_new_rent(profile: &CustomerProfile) -> Option<LifeEventSignal> {
    let today = Utc::now().date_naive();
    let cutoff = today - Duration::days(60);
    let older_cutoff = today - Duration::days(120);

    let recent_rent: Vec<&Transaction> = profile
        .transactions
        .iter()
        .filter(|t| {
            t.amount_pence < 0 && t.date >= cutoff && merchant_matches(&t.merchant, RENT_KEYWORDS)
        })
        .collect();
    if recent_rent.len() < 2 {
        return None;
    }

    let had_rent_before = profile.transactions.iter().any(|t| {
        t.date >= older_cutoff && t.date < cutoff && merchant_matches(&t.merchant, RENT_KEYWORDS)
    });
    if had_rent_before {
        return None;
    }

    let monthly_rent =
        recent_rent.iter().map(|t| t.amount_pence.abs()).sum::<i64>() / recent_rent.len() as i64;

    Some(LifeEventSignal {
        event_type: "new_rental",
        confidence: 0.75,
        detected_date: recent_rent[0].date,
        evidence: vec![
            format!("New recurring rent payment detected (~{}/month)", format_pence(monthly_rent)),
            "No rent payments in the previous period".to_string(),
        ],
        suggested_coaching: format!(
            "It looks like you've recently started renting. A monthly rent of ~{} is a \
             significant fixed cost. I can help you adjust your budget to account for this.",
            format_pence(monthly_rent)
        ),
        requires_confirmation: true,
    })
}

/// Run every detection rule against the customer's transaction history.
pub fn detect_life_events(profile: &CustomerProfile) -> LifeEventReport {
    let detectors: [fn(&CustomerProfile) -> Option<LifeEventSignal>; 4] = [
        detect_new_baby,
        detect_property_purchase,
        detect_income_change,
        detect_new_rent,
    ];

    let detected: Vec<LifeEventSignal> = detectors
        .iter()
        .filter_map(|detector| detector(profile))
        .collect();

    LifeEventReport {
        customer_id: profile.customer_id.clone(),
        detected_events: detected,
    }
}

pub fn report_to_facts(report: &LifeEventReport) -> Value {
    let high_confidence = report
        .detected_events
        .iter()
        .filter(|e| e.confidence >= HIGH_CONFIDENCE)
        .count();

    json!({
        "events_detected": report.detected_events.len(),
        "high_confidence_events": high_confidence,
        "detected_events": report
            .detected_events
            .iter()
            .map(|e| json!({
                "event_type": e.event_type,
                "confidence": format!("{:.0}%", e.confidence * 100.0),
                "detected_date": e.detected_date.to_string(),
                "evidence": e.evidence,
                "suggested_coaching": e.suggested_coaching,
                "requires_customer_confirmation": e.requires_confirmation,
            }))
            .collect::<Vec<_>>(),
    })
}

pub struct LifeEventsTool {
    profile: Arc<CustomerProfile>,
}

impl LifeEventsTool {
    pub fn new(profile: Arc<CustomerProfile>) -> Self {
        Self { profile }
    }
}

#[async_trait::async_trait]
impl Tool for LifeEventsTool {
    fn name(&self) -> &'static str {
        "detect_life_events"
    }

    fn description(&self) -> &'static str {
        "Scan recent transaction patterns for probable life events (new baby, property purchase, income change, new rental) with confidence scores and evidence"
    }

    async fn execute(&self, _args: &Value) -> Result<FactBundle> {
        let report = detect_life_events(&self.profile);
        Ok(FactBundle::new(report_to_facts(&report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;

    #[test]
    fn test_detects_injected_life_events() {
        let profile = data::demo_customer_with_life_events();
        let report = detect_life_events(&profile);

        let types: Vec<&str> = report.detected_events.iter().map(|e| e.event_type).collect();
        assert!(types.contains(&"new_baby"), "detected: {:?}", types);
        assert!(types.contains(&"property_purchase"), "detected: {:?}", types);
        assert!(types.contains(&"income_change"), "detected: {:?}", types);
    }

    #[test]
    fn test_plain_profile_has_no_baby_or_property_signal() {
        let profile = data::demo_customer();
        let report = detect_life_events(&profile);
        let types: Vec<&str> = report.detected_events.iter().map(|e| e.event_type).collect();
        assert!(!types.contains(&"new_baby"));
        assert!(!types.contains(&"property_purchase"));
    }

    #[test]
    fn test_every_detection_carries_evidence() {
        let profile = data::demo_customer_with_life_events();
        for event in detect_life_events(&profile).detected_events {
            assert!(!event.evidence.is_empty());
            assert!(event.confidence >= MIN_CONFIDENCE);
            assert!(event.requires_confirmation);
        }
    }

    #[test]
    fn test_facts_include_confidence_percent() {
        let profile = data::demo_customer_with_life_events();
        let facts = report_to_facts(&detect_life_events(&profile));
        let events = facts["detected_events"].as_array().unwrap();
        assert!(!events.is_empty());
        assert!(events[0]["confidence"].as_str().unwrap().ends_with('%'));
    }
}
