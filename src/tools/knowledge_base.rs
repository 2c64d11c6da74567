//! Guidance knowledge retrieval
//!
//! The retrieval subsystem is a black box behind `KnowledgeBase`: given a
//! query it returns ranked snippets of reviewed guidance. The built-in
//! implementation scores a static snippet store by keyword overlap; a
//! production deployment swaps in a vector index behind the same trait.
//! The model must base general-guidance answers on retrieved chunks, not
//! its pre-training knowledge.

use crate::models::FactBundle;
use crate::tools::Tool;
use crate::Result;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct GuidanceChunk {
    pub topic: &'static str,
    pub content: &'static str,
    pub source: &'static str,
}

pub trait KnowledgeBase: Send + Sync {
    /// Return the top-k guidance chunks ranked by relevance to the query.
    fn retrieve(&self, query: &str, k: usize) -> Vec<GuidanceChunk>;
}

/// Reviewed guidance snippets shipped with the agent.
const GUIDANCE_DOCS: &[GuidanceChunk] = &[
    GuidanceChunk {
        topic: "budgeting",
        content: "The 50/30/20 rule splits take-home pay into 50% needs (housing, \
            utilities, groceries, transport), 30% wants (eating out, entertainment, \
            shopping) and 20% savings or debt repayment. It is a starting framework — \
            adjust the ratios to your circumstances rather than treating them as rules.",
        source: "guidance/budgeting.txt",
    },
    GuidanceChunk {
        topic: "emergency fund",
        content: "An emergency fund of three to six months of essential expenses in an \
            easy-access account protects you from unexpected costs without borrowing. \
            Build it gradually with a standing order on payday, before discretionary \
            spending happens.",
        source: "guidance/emergency_fund.txt",
    },
    GuidanceChunk {
        topic: "debt management",
        content: "Two common repayment strategies: the avalanche method pays the \
            highest-interest debt first and minimises total interest; the snowball \
            method clears the smallest balance first and builds momentum. Always keep \
            up minimum payments on every debt either way.",
        source: "guidance/debt.txt",
    },
    GuidanceChunk {
        topic: "savings habits",
        content: "Paying yourself first — moving money to savings on payday rather \
            than saving what is left over — is the most reliable savings habit. Even \
            small automatic transfers compound over time.",
        source: "guidance/savings.txt",
    },
    GuidanceChunk {
        topic: "subscriptions",
        content: "Audit recurring subscriptions at least once a year. Cancel anything \
            unused for two months, and check whether annual billing is cheaper for \
            services you keep.",
        source: "guidance/subscriptions.txt",
    },
    GuidanceChunk {
        topic: "compound interest",
        content: "Compound interest means you earn interest on previously earned \
            interest. Starting early matters more than the amount: regular saving over \
            long periods grows disproportionately.",
        source: "guidance/compound_interest.txt",
    },
    GuidanceChunk {
        topic: "credit score",
        content: "Paying bills on time, keeping credit utilisation low and avoiding \
            frequent credit applications are the main drivers of a healthy credit \
            record. Registering on the electoral roll also helps lenders verify you.",
        source: "guidance/credit.txt",
    },
];

/// Keyword-overlap scorer over the static snippet store.
pub struct StaticKnowledgeBase;

impl StaticKnowledgeBase {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StaticKnowledgeBase {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeBase for StaticKnowledgeBase {
    fn retrieve(&self, query: &str, k: usize) -> Vec<GuidanceChunk> {
        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|word| word.len() > 2)
            .collect();

        let mut scored: Vec<(usize, &GuidanceChunk)> = GUIDANCE_DOCS
            .iter()
            .map(|chunk| {
                let haystack = format!("{} {}", chunk.topic, chunk.content).to_lowercase();
                let score = terms.iter().filter(|term| haystack.contains(*term)).count();
                (score, chunk)
            })
            .filter(|(score, _)| *score > 0)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(k).map(|(_, chunk)| chunk.clone()).collect()
    }
}

pub struct SearchGuidanceTool {
    knowledge: Arc<dyn KnowledgeBase>,
}

impl SearchGuidanceTool {
    pub fn new(knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self { knowledge }
    }
}

#[async_trait::async_trait]
impl Tool for SearchGuidanceTool {
    fn name(&self) -> &'static str {
        "search_guidance"
    }

    fn description(&self) -> &'static str {
        "Search the reviewed financial guidance knowledge base for general money management topics"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "The financial topic or question to search for"}
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: &Value) -> Result<FactBundle> {
        let query = args
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let chunks = self.knowledge.retrieve(query, 3);

        Ok(FactBundle::new(json!({
            "guidance_retrieved": !chunks.is_empty(),
            "source": "Coaching Knowledge Base",
            "chunks": chunks
                .iter()
                .map(|chunk| json!({
                    "topic": chunk.topic,
                    "content": chunk.content,
                    "source": chunk.source,
                }))
                .collect::<Vec<_>>(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budgeting_query_ranks_budgeting_first() {
        let kb = StaticKnowledgeBase::new();
        let chunks = kb.retrieve("how does the 50/30/20 budgeting rule work", 3);
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].topic, "budgeting");
    }

    #[test]
    fn test_unrelated_query_returns_empty() {
        let kb = StaticKnowledgeBase::new();
        assert!(kb.retrieve("zzz qqq", 3).is_empty());
    }

    #[test]
    fn test_k_limits_results() {
        let kb = StaticKnowledgeBase::new();
        let chunks = kb.retrieve("savings interest debt", 2);
        assert!(chunks.len() <= 2);
    }

    #[tokio::test]
    async fn test_tool_reports_retrieval_flag() {
        let tool = SearchGuidanceTool::new(Arc::new(StaticKnowledgeBase::new()));
        let bundle = tool
            .execute(&json!({"query": "emergency fund size"}))
            .await
            .unwrap();
        assert_eq!(bundle.facts["guidance_retrieved"], true);
    }
}
