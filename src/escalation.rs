//! Escalation interface
//!
//! REDIRECT outcomes invoke this side-effecting contract with the correct
//! reason code and full turn context. The implementation is opaque to the
//! guard pipeline — production wires a CRM client here; the recording
//! implementation supports development and tests.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    FinancialDistress,
    RegulatedAdvice,
    CustomerRequested,
}

impl EscalationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EscalationReason::FinancialDistress => "financial_distress",
            EscalationReason::RegulatedAdvice => "regulated_advice",
            EscalationReason::CustomerRequested => "customer_requested",
        }
    }
}

/// Opaque handle returned by the escalation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffId(pub Uuid);

/// Full turn context shipped with an escalation.
#[derive(Debug, Clone, Serialize)]
pub struct TurnContext {
    pub session_id: Uuid,
    pub customer_id: String,
    pub user_message: String,
    pub matched_rule: Option<&'static str>,
}

#[async_trait]
pub trait Escalator: Send + Sync {
    async fn escalate(&self, reason: EscalationReason, context: &TurnContext) -> Result<HandoffId>;
}

/// Records escalations in memory. Development and test backend.
pub struct RecordingEscalator {
    handoffs: Arc<RwLock<Vec<(HandoffId, EscalationReason, TurnContext)>>>,
}

impl RecordingEscalator {
    pub fn new() -> Self {
        Self {
            handoffs: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn recorded(&self) -> Vec<(HandoffId, EscalationReason, TurnContext)> {
        self.handoffs.read().await.clone()
    }
}

impl Default for RecordingEscalator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Escalator for RecordingEscalator {
    async fn escalate(&self, reason: EscalationReason, context: &TurnContext) -> Result<HandoffId> {
        let handoff_id = HandoffId(Uuid::new_v4());
        let mut handoffs = self.handoffs.write().await;
        handoffs.push((handoff_id, reason, context.clone()));
        Ok(handoff_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_escalator_captures_context() {
        let escalator = RecordingEscalator::new();
        let context = TurnContext {
            session_id: Uuid::new_v4(),
            customer_id: "CUST_001".to_string(),
            user_message: "Which ISA should I pick?".to_string(),
            matched_rule: Some("regulated/which-product"),
        };

        let id = escalator
            .escalate(EscalationReason::RegulatedAdvice, &context)
            .await
            .unwrap();

        let recorded = escalator.recorded().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, id);
        assert_eq!(recorded[0].1, EscalationReason::RegulatedAdvice);
        assert_eq!(recorded[0].2.customer_id, "CUST_001");
    }
}
