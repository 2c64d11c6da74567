//! Audit trail for guarded turns
//!
//! Every tool execution inside the loop appends an immutable
//! ToolInvocationRecord; the completed turn is stored with a content hash
//! so tampering is detectable after the fact.

use crate::models::{ToolInvocationRecord, Verdict};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One fully processed turn, as stored in the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn_id: Uuid,
    pub session_id: Uuid,
    pub user_message: String,
    pub final_reply: String,
    pub verdict: Verdict,
    pub tool_invocations: Vec<ToolInvocationRecord>,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
}

impl TurnRecord {
    pub fn new(
        session_id: Uuid,
        user_message: impl Into<String>,
        final_reply: impl Into<String>,
        verdict: Verdict,
        tool_invocations: Vec<ToolInvocationRecord>,
    ) -> Self {
        let user_message = user_message.into();
        let final_reply = final_reply.into();
        let content_hash = compute_turn_hash(&user_message, &final_reply, &tool_invocations);
        Self {
            turn_id: Uuid::new_v4(),
            session_id,
            user_message,
            final_reply,
            verdict,
            tool_invocations,
            content_hash,
            created_at: Utc::now(),
        }
    }
}

/// Audit trail storage
pub struct AuditLog {
    records: Arc<RwLock<HashMap<Uuid, TurnRecord>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store a turn record
    pub async fn record(&self, record: TurnRecord) -> Result<Uuid> {
        let turn_id = record.turn_id;
        let mut records = self.records.write().await;
        records.insert(turn_id, record);
        Ok(turn_id)
    }

    /// Retrieve a record by turn ID
    pub async fn get(&self, turn_id: Uuid) -> Result<Option<TurnRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&turn_id).cloned())
    }

    /// List all turn IDs for a session (sorted by created_at)
    pub async fn list_for_session(&self, session_id: Uuid) -> Result<Vec<Uuid>> {
        let records = self.records.read().await;

        let mut items: Vec<_> = records
            .iter()
            .filter(|(_, record)| record.session_id == session_id)
            .map(|(id, record)| (*id, record.created_at))
            .collect();

        items.sort_by_key(|(_, created_at)| *created_at);

        Ok(items.into_iter().map(|(id, _)| id).collect())
    }

    /// Verify a record's integrity via its content hash
    pub async fn verify_integrity(&self, turn_id: Uuid) -> Result<bool> {
        let records = self.records.read().await;

        if let Some(record) = records.get(&turn_id) {
            let current = compute_turn_hash(
                &record.user_message,
                &record.final_reply,
                &record.tool_invocations,
            );
            Ok(current == record.content_hash)
        } else {
            Ok(false)
        }
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute SHA256 hash of a turn's content for integrity verification.
/// Streams serialization directly into the hasher.
pub fn compute_turn_hash(
    user_message: &str,
    final_reply: &str,
    invocations: &[ToolInvocationRecord],
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user_message.as_bytes());
    hasher.update(final_reply.as_bytes());

    if serde_json::to_writer(&mut HashWriter(&mut hasher), invocations).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_record() -> TurnRecord {
        TurnRecord::new(
            Uuid::new_v4(),
            "How much did I spend?",
            "You spent £120.00 on groceries.",
            Verdict::Pass,
            vec![ToolInvocationRecord::new(
                "get_spending_insights",
                json!({"months": 3}),
                json!({"average_monthly_spend": "£120.00"}),
                true,
            )],
        )
    }

    #[tokio::test]
    async fn test_record_and_retrieve() {
        let log = AuditLog::new();
        let record = sample_record();
        let turn_id = log.record(record).await.unwrap();

        let stored = log.get(turn_id).await.unwrap();
        assert!(stored.is_some());
        assert_eq!(stored.unwrap().tool_invocations.len(), 1);
    }

    #[tokio::test]
    async fn test_integrity_verification() {
        let log = AuditLog::new();
        let record = sample_record();
        let turn_id = log.record(record).await.unwrap();

        assert!(log.verify_integrity(turn_id).await.unwrap());
        assert!(!log.verify_integrity(Uuid::new_v4()).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_for_session_sorted() {
        let log = AuditLog::new();
        let session_id = Uuid::new_v4();

        for i in 0..3 {
            let record = TurnRecord::new(
                session_id,
                format!("message {}", i),
                "reply",
                Verdict::Pass,
                vec![],
            );
            log.record(record).await.unwrap();
        }

        let ids = log.list_for_session(session_id).await.unwrap();
        assert_eq!(ids.len(), 3);
    }
}
