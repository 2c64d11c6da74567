//! Core data models for the guardrail and grounding engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Verdicts =================
//

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Proceed to the next pipeline stage.
    Pass,
    /// Refuse with a fixed message; no model call is made.
    Block,
    /// Refuse with a category-specific fixed message and trigger the
    /// escalation side effect for the matched category.
    Redirect,
    /// Output side only: ungrounded content detected.
    Fail,
}

/// User-message intent. Mutually exclusive per message; ties are broken by
/// the fixed precedence order in the input guard, never by pattern order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    FinancialDistress,
    RegulatedAdvice,
    OutOfScope,
    InScope,
}

/// Full outcome of a guard check, including which declarative rule fired
/// so refusals remain auditable.
#[derive(Debug, Clone, Serialize)]
pub struct GuardDecision {
    pub verdict: Verdict,
    pub intent: IntentCategory,
    pub reason: String,
    /// Rule id from the classifier table that produced this decision.
    pub matched_rule: Option<&'static str>,
    /// Pre-approved response when the verdict is Block or Redirect.
    pub safe_response: Option<String>,
}

//
// ================= Conversation =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    Tool,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Tool, content: content.into() }
    }
}

//
// ================= Tool I/O =================
//

/// Structured facts returned by a deterministic tool. Every monetary value
/// inside `facts` is a canonical currency string, never a raw float.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactBundle {
    pub facts: serde_json::Value,
}

impl FactBundle {
    pub fn new(facts: serde_json::Value) -> Self {
        Self { facts }
    }
}

/// Tool signature advertised to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// What the model returned: either a request to run a tool, or the final
/// narration for this turn.
#[derive(Debug, Clone)]
pub enum ModelReply {
    ToolCall(ToolRequest),
    Narration(String),
}

//
// ================= Audit =================
//

/// Immutable record of one tool execution inside the loop. Appended to the
/// audit trail, never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocationRecord {
    pub record_id: Uuid,
    pub tool_name: String,
    pub arguments: serde_json::Value,
    pub result_facts: serde_json::Value,
    pub succeeded: bool,
    pub timestamp: DateTime<Utc>,
}

impl ToolInvocationRecord {
    pub fn new(
        tool_name: impl Into<String>,
        arguments: serde_json::Value,
        result_facts: serde_json::Value,
        succeeded: bool,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            tool_name: tool_name.into(),
            arguments,
            result_facts,
            succeeded,
            timestamp: Utc::now(),
        }
    }
}

//
// ================= Turn Result =================
//

/// Final result of processing one user message through the full pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub reply: String,
    pub verdict: Verdict,
    pub intent: IntentCategory,
    pub tools_used: Vec<String>,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Pass => "pass",
            Verdict::Block => "block",
            Verdict::Redirect => "redirect",
            Verdict::Fail => "fail",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for IntentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentCategory::FinancialDistress => "financial_distress",
            IntentCategory::RegulatedAdvice => "regulated_advice",
            IntentCategory::OutOfScope => "out_of_scope",
            IntentCategory::InScope => "in_scope",
        };
        write!(f, "{}", s)
    }
}
