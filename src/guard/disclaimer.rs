//! Regulatory disclaimer injection
//!
//! Appends a fixed guidance-vs-advice notice when the narration, or the
//! turn's certified tool output, touches regulated-adjacent vocabulary.
//! Idempotent: injecting into already-annotated text is a no-op.

pub const FCA_DISCLAIMER: &str = "\n\n---\n*This is financial guidance based on your \
transaction data, not regulated financial advice. For personalised investment or \
borrowing advice, please speak to a qualified financial adviser.*";

/// Distinctive fragment used for the idempotence check.
const DISCLAIMER_MARKER: &str = "not regulated financial advice";

/// Regulated-adjacent vocabulary. Matching is plain lowercase substring,
/// same as the trigger-term convention elsewhere in the guard layer.
pub const TRIGGER_TERMS: &[&str] = &[
    "mortgage",
    "pension",
    "isa",
    "loan",
    "investment",
    "invest",
    "bond",
    "fund",
    "annuity",
    "borrow",
    "remortgage",
    "interest rate",
    "savings account",
    "credit card",
];

pub struct DisclaimerInjector;

impl DisclaimerInjector {
    /// True if the text touches any configured regulated-adjacent term.
    pub fn touches_regulated_topic(text: &str) -> bool {
        let lower = text.to_lowercase();
        TRIGGER_TERMS.iter().any(|term| lower.contains(term))
    }

    /// Append the notice exactly once when warranted. `tool_context` is the
    /// concatenated tool names and certified facts from this turn, so a
    /// mortgage calculation triggers the notice even if the narration
    /// avoids the word.
    pub fn inject(narration: &str, tool_context: &str) -> String {
        if narration.contains(DISCLAIMER_MARKER) {
            return narration.to_string();
        }
        if Self::touches_regulated_topic(narration) || Self::touches_regulated_topic(tool_context)
        {
            let mut annotated = String::with_capacity(narration.len() + FCA_DISCLAIMER.len());
            annotated.push_str(narration);
            annotated.push_str(FCA_DISCLAIMER);
            return annotated;
        }
        narration.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disclaimer_added_for_trigger_terms() {
        for term in ["mortgage", "ISA", "pension", "investment", "loan", "annuity", "bond"] {
            let narration = format!("You should consider a {} for your situation.", term);
            let result = DisclaimerInjector::inject(&narration, "");
            assert!(
                result.contains(DISCLAIMER_MARKER),
                "disclaimer not injected for term {:?}",
                term
            );
        }
    }

    #[test]
    fn test_no_disclaimer_for_plain_coaching_text() {
        for term in ["groceries", "budget", "spending", "emergency buffer", "monthly surplus"] {
            let narration = format!("Your {} this month looks good.", term);
            let result = DisclaimerInjector::inject(&narration, "");
            assert_eq!(result, narration);
        }
    }

    #[test]
    fn test_tool_usage_triggers_disclaimer() {
        let narration = "Based on your verified figures, your monthly payment would be manageable.";
        let result = DisclaimerInjector::inject(narration, "assess_mortgage_affordability");
        assert!(result.contains(DISCLAIMER_MARKER));
    }

    #[test]
    fn test_injection_is_idempotent() {
        let narration = "Consider an ISA for your savings.";
        let once = DisclaimerInjector::inject(narration, "");
        let twice = DisclaimerInjector::inject(&once, "");
        assert_eq!(once, twice);
        assert_eq!(twice.matches(DISCLAIMER_MARKER).count(), 1);
    }

    #[test]
    fn test_original_text_is_preserved_as_prefix() {
        let narration = "You might want to look into a pension.";
        let result = DisclaimerInjector::inject(narration, "");
        assert!(result.starts_with(narration));
    }
}
