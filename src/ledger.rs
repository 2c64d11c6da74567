//! Per-turn grounding ledger
//!
//! The sole data structure behind the anti-hallucination guarantee. One
//! instance is created at the start of each turn, owned by the tool loop,
//! read by the output guard, and dropped when the turn completes. It is
//! never shared across sessions or reused across turns; a stale ledger
//! could falsely ground a newly hallucinated figure.
//!
//! Invariant: a figure is `contains`-true iff it was certified from a tool
//! result during the current turn. Narration text never certifies.

use crate::extract;
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct GroundingLedger {
    amounts: HashSet<String>,
}

impl GroundingLedger {
    pub fn new() -> Self {
        Self { amounts: HashSet::new() }
    }

    /// Certify every monetary value found in a tool fact bundle.
    /// Returns how many canonical amounts were recorded.
    pub fn certify_facts(&mut self, facts: &Value) -> usize {
        let found = extract::extract_from_facts(facts);
        let count = found.len();
        for amount in found {
            self.amounts.insert(amount);
        }
        count
    }

    /// Certify a single currency token (canonicalized on insert).
    pub fn certify_amount(&mut self, token: &str) {
        self.amounts.insert(extract::canonicalize(token));
    }

    /// Membership check against an already-canonical figure.
    pub fn contains(&self, canonical: &str) -> bool {
        self.amounts.contains(canonical)
    }

    /// Membership check for a raw token in any textual variant.
    pub fn contains_token(&self, token: &str) -> bool {
        self.amounts.contains(&extract::canonicalize(token))
    }

    pub fn len(&self) -> usize {
        self.amounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.amounts.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_certify_and_contains() {
        let mut ledger = GroundingLedger::new();
        let n = ledger.certify_facts(&json!({
            "average_monthly_spend": "£1,234.56",
            "current_balance": "£2500.00",
        }));
        assert_eq!(n, 2);
        assert!(ledger.contains("£1234.56"));
        assert!(ledger.contains("£2500.00"));
        assert!(!ledger.contains("£999.99"));
    }

    #[test]
    fn test_textual_variants_compare_equal() {
        let mut ledger = GroundingLedger::new();
        ledger.certify_amount("£1,234.56");
        assert!(ledger.contains_token("£1234.56"));
        assert!(ledger.contains_token("£1,234.56"));
    }

    #[test]
    fn test_fresh_ledger_is_empty() {
        let ledger = GroundingLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
    }

    #[test]
    fn test_deduplicates_same_amount() {
        let mut ledger = GroundingLedger::new();
        ledger.certify_facts(&json!({"a": "£100.00", "b": "£100.00"}));
        assert_eq!(ledger.len(), 1);
    }
}
