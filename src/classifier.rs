//! Intent classifiers over declarative rule tables
//!
//! Each guard category is a versioned list of (id, pattern) rules compiled
//! once at startup. Adding a detection rule means adding a table entry;
//! the guard control flow never changes. Every classifier is a pure
//! predicate that reports which rule fired, so refusals stay auditable.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Which rule table a pattern belongs to. FinancialContext is not a user
/// intent — it is the affirmative signal the input guard combines with
/// OutOfScope in an explicit boolean expression.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    FinancialDistress,
    RegulatedAdvice,
    OutOfScope,
    FinancialContext,
}

/// One declarative detection rule.
#[derive(Debug)]
pub struct IntentRule {
    pub id: &'static str,
    pub category: RuleCategory,
    pub pattern: &'static str,
}

//
// ================= Rule tables =================
//

/// Financial distress — Consumer Duty proactive signposting.
/// Patterns must match both "can't" and the apostrophe-free "cant".
pub const DISTRESS_RULES: &[IntentRule] = &[
    IntentRule {
        id: "distress/unable-to-pay",
        category: RuleCategory::FinancialDistress,
        pattern: r"\b(can'?t|cannot|unable to|struggle to|struggling to)\b.{0,40}\b(pay|afford)\b",
    },
    IntentRule {
        id: "distress/enforcement",
        category: RuleCategory::FinancialDistress,
        pattern: r"\b(bailiffs?|debt collectors?|repossession|eviction|bankruptcy|bankrupt|insolvent|iva)\b",
    },
    IntentRule {
        id: "distress/overwhelmed",
        category: RuleCategory::FinancialDistress,
        pattern: r"\b(overwhelmed|drowning)\b.{0,40}\b(debts?|money|bills?|finances?)\b",
    },
    IntentRule {
        id: "distress/crisis",
        category: RuleCategory::FinancialDistress,
        pattern: r"\b(financial|money) (crisis|emergency)\b",
    },
    IntentRule {
        id: "distress/desperate",
        category: RuleCategory::FinancialDistress,
        pattern: r"\bdesperate\b.{0,60}\b(money|financial|cash)\b",
    },
    IntentRule {
        id: "distress/ends-meet",
        category: RuleCategory::FinancialDistress,
        pattern: r"\bcan'?t (make|meet) ends\b",
    },
];

/// Regulated advice — requests for a specific product, investment, legal
/// or tax recommendation. Routed to a human adviser, never answered.
pub const REGULATED_RULES: &[IntentRule] = &[
    IntentRule {
        id: "regulated/advice-verbs",
        category: RuleCategory::RegulatedAdvice,
        pattern: r"\b(should i|shall i|tell me to)\b.{0,60}\b(invest|buy|sell|stocks?|shares?|isa|pension|funds?)\b",
    },
    IntentRule {
        id: "regulated/what-to-buy",
        category: RuleCategory::RegulatedAdvice,
        pattern: r"\bwhat (stocks?|shares?|funds?|etfs?)\b.{0,40}\b(buy|invest|pick|choose)\b",
    },
    IntentRule {
        id: "regulated/which-product",
        category: RuleCategory::RegulatedAdvice,
        pattern: r"\bwhich (mortgage|loan|credit card|insurance|isa|fund|pension)\b.{0,40}\b(should i|best for me|recommend|pick|take|choose)\b",
    },
    IntentRule {
        id: "regulated/pick-me",
        category: RuleCategory::RegulatedAdvice,
        pattern: r"\bpick (me )?(a|an|the)\b.{0,30}\b(stocks?|shares?|funds?|isa|pension|mortgage|loan)\b",
    },
    IntentRule {
        id: "regulated/superlative",
        category: RuleCategory::RegulatedAdvice,
        pattern: r"\bbest (rate|deal|product|provider)\b",
    },
    IntentRule {
        id: "regulated/tax",
        category: RuleCategory::RegulatedAdvice,
        pattern: r"\b(tax advice|tax planning|inheritance tax|capital gains)\b",
    },
    IntentRule {
        id: "regulated/legal",
        category: RuleCategory::RegulatedAdvice,
        pattern: r"\b(legal advice|legal claim|sue|lawsuit)\b",
    },
    IntentRule {
        id: "regulated/borrowing",
        category: RuleCategory::RegulatedAdvice,
        pattern: r"\b(should i|can i afford to)\b.{0,40}\b(borrow|take out a loan|remortgage)\b",
    },
];

/// Clearly non-financial topics, caught before the model sees the message.
pub const OUT_OF_SCOPE_RULES: &[IntentRule] = &[
    IntentRule {
        id: "oos/geography",
        category: RuleCategory::OutOfScope,
        pattern: r"\b(capital (city|of)|largest (city|country|continent)|population of|where is)\b",
    },
    IntentRule {
        id: "oos/who-questions",
        category: RuleCategory::OutOfScope,
        pattern: r"\bwho (is|was|invented|discovered|wrote|directed|won)\b",
    },
    IntentRule {
        id: "oos/science",
        category: RuleCategory::OutOfScope,
        pattern: r"\b(periodic table|chemical|atom|molecule|planet|galaxy|evolution)\b",
    },
    IntentRule {
        id: "oos/history",
        category: RuleCategory::OutOfScope,
        pattern: r"\b(world war|history of|ancient|medieval|renaissance)\b",
    },
    IntentRule {
        id: "oos/culture",
        category: RuleCategory::OutOfScope,
        pattern: r"\b(novels?|films?|movies?|songs?|albums?|artists?|actors?|directors?|sport|team|match|score a goal)\b",
    },
    IntentRule {
        id: "oos/food-lifestyle",
        category: RuleCategory::OutOfScope,
        pattern: r"\b(recipes?|ingredients?|cook|bake|calories|workout|gym routine)\b",
    },
    IntentRule {
        id: "oos/technology",
        category: RuleCategory::OutOfScope,
        pattern: r"\b(programming language|javascript|python|html|css|linux|windows|android|iphone)\b",
    },
    IntentRule {
        id: "oos/travel",
        category: RuleCategory::OutOfScope,
        pattern: r"\bbest (place|country|city|hotel|restaurant|flight) to\b",
    },
    IntentRule {
        id: "oos/weather",
        category: RuleCategory::OutOfScope,
        pattern: r"\b(weather|forecast|temperature|climate)\b",
    },
    IntentRule {
        id: "oos/politics-religion",
        category: RuleCategory::OutOfScope,
        pattern: r"\b(politics|political party|election|prime minister|president|religion)\b",
    },
];

/// Affirmative financial-context signal. Deliberately broad: it only ever
/// widens what the agent will engage with, never what it refuses.
pub const FINANCIAL_CONTEXT_RULES: &[IntentRule] = &[
    IntentRule {
        id: "financial/spending",
        category: RuleCategory::FinancialContext,
        pattern: r"\b(spend|spending|spent)\b",
    },
    IntentRule {
        id: "financial/saving",
        category: RuleCategory::FinancialContext,
        pattern: r"\b(save|saving|savings)\b",
    },
    IntentRule {
        id: "financial/budget",
        category: RuleCategory::FinancialContext,
        pattern: r"\b(budget|budgeting)\b",
    },
    IntentRule {
        id: "financial/income",
        category: RuleCategory::FinancialContext,
        pattern: r"\b(income|salary|wage|earn)\b",
    },
    IntentRule {
        id: "financial/borrowing",
        category: RuleCategory::FinancialContext,
        pattern: r"\b(debt|loan|mortgage|credit)\b",
    },
    IntentRule {
        id: "financial/banking",
        category: RuleCategory::FinancialContext,
        pattern: r"\b(bank|account|balance|transactions?)\b",
    },
    IntentRule {
        id: "financial/money",
        category: RuleCategory::FinancialContext,
        pattern: r"\b(money|finances?|financial|cost|price|afford)\b",
    },
    IntentRule {
        id: "financial/products",
        category: RuleCategory::FinancialContext,
        pattern: r"\b(isa|pension|interest|insurance premium|subscriptions?|health score)\b",
    },
];

//
// ================= Compiled rule sets =================
//

/// A rule table compiled for matching. Built once at startup.
pub struct RuleSet {
    compiled: Vec<(Regex, &'static IntentRule)>,
}

impl RuleSet {
    fn compile(rules: &'static [IntentRule]) -> Self {
        let compiled = rules
            .iter()
            .map(|rule| {
                let regex = RegexBuilder::new(rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .expect("invalid built-in classifier pattern");
                (regex, rule)
            })
            .collect();
        Self { compiled }
    }

    /// First rule in table order that matches, if any. Pure predicate.
    pub fn first_match(&self, text: &str) -> Option<&'static IntentRule> {
        self.compiled
            .iter()
            .find(|(regex, _)| regex.is_match(text))
            .map(|(_, rule)| *rule)
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}

lazy_static! {
    static ref DISTRESS: RuleSet = RuleSet::compile(DISTRESS_RULES);
    static ref REGULATED: RuleSet = RuleSet::compile(REGULATED_RULES);
    static ref OUT_OF_SCOPE: RuleSet = RuleSet::compile(OUT_OF_SCOPE_RULES);
    static ref FINANCIAL_CONTEXT: RuleSet = RuleSet::compile(FINANCIAL_CONTEXT_RULES);
}

pub fn match_distress(text: &str) -> Option<&'static IntentRule> {
    DISTRESS.first_match(text)
}

pub fn match_regulated(text: &str) -> Option<&'static IntentRule> {
    REGULATED.first_match(text)
}

pub fn match_out_of_scope(text: &str) -> Option<&'static IntentRule> {
    OUT_OF_SCOPE.first_match(text)
}

pub fn match_financial_context(text: &str) -> Option<&'static IntentRule> {
    FINANCIAL_CONTEXT.first_match(text)
}
