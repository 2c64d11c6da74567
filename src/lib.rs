//! Financial Coaching Agent
//!
//! A guardrailed coaching agent that narrates verified financial facts:
//! - Gates user input through declarative intent classifiers before any
//!   model call (distress signposting, regulated-advice redirect, scope)
//! - Collects facts through a bounded tool-orchestration loop backed by
//!   deterministic finance engines (the LLM never computes figures)
//! - Certifies every tool-produced monetary amount into a per-turn
//!   grounding ledger
//! - Verifies the final narration against the ledger and blocks or
//!   retries ungrounded output
//!
//! PIPELINE:
//! INPUT GUARD → TOOL LOOP → OUTPUT GUARD → DISCLAIMER → RESPONSE

pub mod agent;
pub mod api;
pub mod audit;
pub mod classifier;
pub mod data;
pub mod error;
pub mod escalation;
pub mod extract;
pub mod guard;
pub mod ledger;
pub mod llm;
pub mod models;
pub mod session;
pub mod tools;

pub use error::{CoachingError, Result};

// Re-export common types
pub use ledger::GroundingLedger;
pub use models::*;
