//! Coaching agent — the guarded turn pipeline
//!
//! One user turn runs sequentially:
//! input guard → tool loop → output guard → disclaimer → session append.
//! The grounding ledger and loop state are created fresh per turn and
//! dropped when the turn completes; turns within a session are serialised
//! by a per-session lock so two ledgers can never coexist for one session.

pub mod tool_loop;

use crate::audit::{AuditLog, TurnRecord};
use crate::escalation::{EscalationReason, Escalator, TurnContext};
use crate::guard::disclaimer::DisclaimerInjector;
use crate::guard::output::{OutputGuard, SAFE_FALLBACK_RESPONSE};
use crate::guard::InputGuard;
use crate::ledger::GroundingLedger;
use crate::llm::LlmClient;
use crate::models::{ChatMessage, ChatRole, IntentCategory, ToolInvocationRecord, TurnResponse, Verdict};
use crate::session::{SessionState, SessionStore};
use crate::tools::ToolRegistry;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use self::tool_loop::{LoopState, ToolLoop};
use tracing::{info, warn};
use uuid::Uuid;

/// Instructs the model on its exact role: narrate verified facts, never
/// compute or recall figures.
pub const SYSTEM_PROMPT: &str = "You are a trusted, knowledgeable and empathetic financial \
coach that helps customers understand and improve their financial wellbeing.\n\
\n\
## YOUR ROLE\n\
You provide personalised financial GUIDANCE based on the customer's actual transaction data. \
You do NOT provide regulated financial advice.\n\
\n\
## CRITICAL ACCURACY RULES\n\
1. NEVER invent, estimate or round financial figures. Every monetary amount you mention MUST \
come directly from the tool outputs provided to you.\n\
2. When you call a tool, base your entire response on that tool's output. Do not supplement \
with figures from your training knowledge.\n\
3. If you are uncertain about a figure, call the appropriate tool again rather than guessing.\n\
4. NEVER recommend specific financial products, interest rates or investment options. Direct \
those questions to a qualified financial adviser via escalate_to_adviser.\n\
\n\
## TOOL CALLING\n\
- For spending or income questions, call get_spending_insights first.\n\
- For mortgage or affordability questions, call assess_mortgage_affordability first.\n\
- For \"save or pay debt\" questions, call analyse_debt_vs_savings first.\n\
- If the customer mentions a life event (baby, moving home, new job), call \
detect_life_events first and acknowledge what the scan actually found.\n\
- For general money-management guidance, call search_guidance and base your answer on the \
retrieved chunks.\n\
\n\
## YOUR TONE\n\
Warm, clear and jargon-free. Encouraging but honest. Concise — most responses should be 3-5 \
sentences unless detail is requested.";

/// Appended to history on the single grounding-failure retry. Asks for a
/// re-derivation from tools, not a rephrase of the same ungrounded text.
const CORRECTIVE_INSTRUCTION: &str = "Your previous answer contained monetary figures that did \
not come from a tool result. Call the appropriate data tool first, then answer citing only \
tool-provided figures.";

/// Main agent coordinating the guarded pipeline for every session.
pub struct CoachingAgent {
    model: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    store: Arc<dyn SessionStore>,
    escalator: Arc<dyn Escalator>,
    audit_log: AuditLog,
    turn_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl CoachingAgent {
    pub fn new(
        model: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        store: Arc<dyn SessionStore>,
        escalator: Arc<dyn Escalator>,
    ) -> Self {
        Self {
            model,
            registry,
            store,
            escalator,
            audit_log: AuditLog::new(),
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    /// Create and persist a new session for a customer.
    pub async fn new_session(&self, customer_id: &str) -> Result<SessionState> {
        let state = SessionState::new(customer_id);
        self.store.save(&state).await?;
        Ok(state)
    }

    async fn turn_lock(&self, session_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        locks
            .entry(session_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Process one user message and return a grounded, guardrailed reply.
    pub async fn chat(&self, session_id: Uuid, user_message: &str) -> Result<TurnResponse> {
        // Turns within a session are strictly serialised.
        let lock = self.turn_lock(session_id).await;
        let _turn = lock.lock().await;

        let mut session = self
            .store
            .load(session_id)
            .await?
            .ok_or_else(|| crate::CoachingError::SessionError(format!(
                "Session '{}' not found",
                session_id
            )))?;

        // ---- 1. Input guard: refusal needs no model call ----
        let decision = InputGuard::admit(user_message);
        if decision.verdict != Verdict::Pass {
            info!(
                verdict = %decision.verdict,
                intent = %decision.intent,
                rule = ?decision.matched_rule,
                "input guard short-circuit"
            );

            if decision.verdict == Verdict::Redirect {
                let reason = match decision.intent {
                    IntentCategory::FinancialDistress => EscalationReason::FinancialDistress,
                    _ => EscalationReason::RegulatedAdvice,
                };
                let context = TurnContext {
                    session_id,
                    customer_id: session.customer_id.clone(),
                    user_message: user_message.to_string(),
                    matched_rule: decision.matched_rule,
                };
                if let Err(error) = self.escalator.escalate(reason, &context).await {
                    warn!(error = %error, "escalation side effect failed");
                }
            }

            let reply = decision
                .safe_response
                .clone()
                .unwrap_or_else(|| "I'm unable to help with that request.".to_string());

            session.push(ChatRole::User, user_message);
            session.push(ChatRole::Assistant, reply.as_str());
            session.conversation_count += 1;
            self.store.save(&session).await?;

            self.audit_log
                .record(TurnRecord::new(
                    session_id,
                    user_message,
                    reply.as_str(),
                    decision.verdict,
                    vec![],
                ))
                .await?;

            return Ok(TurnResponse {
                reply,
                verdict: decision.verdict,
                intent: decision.intent,
                tools_used: vec![],
            });
        }

        // ---- 2. Tool loop over a fresh per-turn ledger ----
        session.push(ChatRole::User, user_message);
        let history = session.window();

        let mut ledger = GroundingLedger::new();
        let mut records: Vec<ToolInvocationRecord> = Vec::new();
        let schemas = self.registry.schemas();
        let tool_loop = ToolLoop::new(self.model.as_ref(), self.registry.as_ref());

        let outcome = tool_loop
            .run(
                SYSTEM_PROMPT,
                LoopState::new(history.clone()),
                &mut ledger,
                &mut records,
                &schemas,
            )
            .await?;
        let mut narration = outcome.narration;
        let mut verdict = Verdict::Pass;

        // ---- 3. Output guard with one bounded corrective retry ----
        let check = OutputGuard::verify(&narration, &ledger);
        if check.verdict == Verdict::Fail {
            warn!(reason = %check.reason, "output guard failed, re-running loop once");

            let mut retry_history = history;
            retry_history.push(ChatMessage::assistant(narration.as_str()));
            retry_history.push(ChatMessage::user(CORRECTIVE_INSTRUCTION));

            let retry = tool_loop
                .run(
                    SYSTEM_PROMPT,
                    LoopState::new(retry_history),
                    &mut ledger,
                    &mut records,
                    &schemas,
                )
                .await?;
            narration = retry.narration;

            if OutputGuard::verify(&narration, &ledger).verdict == Verdict::Fail {
                warn!("output guard failed twice; substituting safe response");
                narration = SAFE_FALLBACK_RESPONSE.to_string();
                verdict = Verdict::Fail;
            }
        }

        // ---- 4. Disclaimer when the turn touched regulated topics ----
        let tool_context = records
            .iter()
            .map(|record| format!("{} {}", record.tool_name, record.result_facts))
            .collect::<Vec<_>>()
            .join("\n");
        let reply = DisclaimerInjector::inject(&narration, &tool_context);

        // ---- 5. Persist and audit ----
        session.push(ChatRole::Assistant, reply.as_str());
        session.conversation_count += 1;
        self.store.save(&session).await?;

        let tools_used: Vec<String> = records.iter().map(|r| r.tool_name.clone()).collect();
        self.audit_log
            .record(TurnRecord::new(
                session_id,
                user_message,
                reply.as_str(),
                verdict,
                records,
            ))
            .await?;

        Ok(TurnResponse {
            reply,
            verdict,
            intent: IntentCategory::InScope,
            tools_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::escalation::RecordingEscalator;
    use crate::llm::ScriptedModel;
    use crate::models::{ModelReply, ToolRequest};
    use crate::session::InMemorySessionStore;
    use crate::tools::{create_default_registry, knowledge_base::StaticKnowledgeBase};
    use serde_json::json;

    fn agent_with(model: ScriptedModel) -> (CoachingAgent, Arc<RecordingEscalator>) {
        let registry = Arc::new(create_default_registry(
            Arc::new(data::demo_customer()),
            Arc::new(StaticKnowledgeBase::new()),
        ));
        let escalator = Arc::new(RecordingEscalator::new());
        let agent = CoachingAgent::new(
            Arc::new(model),
            registry,
            Arc::new(InMemorySessionStore::new()),
            escalator.clone(),
        );
        (agent, escalator)
    }

    fn spending_call() -> ModelReply {
        ModelReply::ToolCall(ToolRequest {
            name: "get_spending_insights".to_string(),
            arguments: json!({"months": 3}),
        })
    }

    #[tokio::test]
    async fn test_distress_message_redirects_and_escalates() {
        // Model must never be consulted: an empty script would make any
        // converse() call return the fallback narration, not a redirect.
        let (agent, escalator) = agent_with(ScriptedModel::new(vec![]));
        let session = agent.new_session("CUST_001").await.unwrap();

        let response = agent.chat(session.session_id, "I cant pay my rent").await.unwrap();

        assert_eq!(response.verdict, Verdict::Redirect);
        assert_eq!(response.intent, IntentCategory::FinancialDistress);
        assert!(response.reply.contains("MoneyHelper"));
        assert!(response.reply.contains("StepChange"));
        assert!(response.reply.contains("National Debtline"));
        assert!(response.tools_used.is_empty());

        let recorded = escalator.recorded().await;
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].1, EscalationReason::FinancialDistress);
    }

    #[tokio::test]
    async fn test_regulated_advice_redirects_without_model_call() {
        let (agent, escalator) = agent_with(ScriptedModel::with_fallback(
            vec![],
            ModelReply::Narration("MODEL WAS CALLED".to_string()),
        ));
        let session = agent.new_session("CUST_001").await.unwrap();

        let response = agent
            .chat(session.session_id, "Which ISA should I pick?")
            .await
            .unwrap();

        assert_eq!(response.verdict, Verdict::Redirect);
        assert_eq!(response.intent, IntentCategory::RegulatedAdvice);
        assert!(!response.reply.contains("MODEL WAS CALLED"));
        assert_eq!(escalator.recorded().await[0].1, EscalationReason::RegulatedAdvice);
    }

    #[tokio::test]
    async fn test_out_of_scope_blocks_without_escalation() {
        let (agent, escalator) = agent_with(ScriptedModel::new(vec![]));
        let session = agent.new_session("CUST_001").await.unwrap();

        let response = agent
            .chat(session.session_id, "What is the capital of France?")
            .await
            .unwrap();

        assert_eq!(response.verdict, Verdict::Block);
        assert!(escalator.recorded().await.is_empty());
    }

    #[tokio::test]
    async fn test_grounded_turn_passes_and_records_tools() {
        let (agent, _) = agent_with(ScriptedModel::new(vec![
            spending_call(),
            ModelReply::Narration(
                "Based on the data I just pulled, your finances look steady this quarter."
                    .to_string(),
            ),
        ]));
        let session = agent.new_session("CUST_001").await.unwrap();

        let response = agent
            .chat(session.session_id, "How is my spending looking?")
            .await
            .unwrap();

        assert_eq!(response.verdict, Verdict::Pass);
        assert_eq!(response.tools_used, vec!["get_spending_insights"]);

        let turns = agent.audit_log().list_for_session(session.session_id).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert!(agent.audit_log().verify_integrity(turns[0]).await.unwrap());
    }

    #[tokio::test]
    async fn test_ungrounded_figure_retries_then_safe_message() {
        // Both attempts cite a figure no tool produced; after the single
        // retry the fixed safe message is substituted, with no £ figures.
        let (agent, _) = agent_with(ScriptedModel::with_fallback(
            vec![],
            ModelReply::Narration("You spent £999.99 on avocados.".to_string()),
        ));
        let session = agent.new_session("CUST_001").await.unwrap();

        let response = agent
            .chat(session.session_id, "How much am I spending?")
            .await
            .unwrap();

        assert_eq!(response.verdict, Verdict::Fail);
        assert_eq!(response.reply, SAFE_FALLBACK_RESPONSE);
        assert!(crate::extract::extract_amounts(&response.reply).is_empty());
    }

    #[tokio::test]
    async fn test_retry_recovers_when_model_grounds_itself() {
        // First answer is ungrounded; the corrective retry calls the tool
        // and narrates without figures, which passes.
        let (agent, _) = agent_with(ScriptedModel::new(vec![
            ModelReply::Narration("You spent £123.45 last month.".to_string()),
            spending_call(),
            ModelReply::Narration("Your spending is stable month to month.".to_string()),
        ]));
        let session = agent.new_session("CUST_001").await.unwrap();

        let response = agent
            .chat(session.session_id, "How much am I spending?")
            .await
            .unwrap();

        assert_eq!(response.verdict, Verdict::Pass);
        assert_eq!(response.reply, "Your spending is stable month to month.");
    }

    #[tokio::test]
    async fn test_mortgage_tool_usage_appends_disclaimer_once() {
        let (agent, _) = agent_with(ScriptedModel::new(vec![
            ModelReply::ToolCall(ToolRequest {
                name: "assess_mortgage_affordability".to_string(),
                arguments: json!({}),
            }),
            ModelReply::Narration("Here's what your verified income supports.".to_string()),
        ]));
        let session = agent.new_session("CUST_001").await.unwrap();

        let response = agent
            .chat(session.session_id, "Could I afford a bigger home loan repayment?")
            .await
            .unwrap();

        assert_eq!(
            response.reply.matches("not regulated financial advice").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_unknown_session_is_an_error() {
        let (agent, _) = agent_with(ScriptedModel::new(vec![]));
        let result = agent.chat(Uuid::new_v4(), "hello").await;
        assert!(matches!(result, Err(crate::CoachingError::SessionError(_))));
    }

    #[tokio::test]
    async fn test_session_history_accumulates_across_turns() {
        let (agent, _) = agent_with(ScriptedModel::with_fallback(
            vec![],
            ModelReply::Narration("Happy to help with your budget.".to_string()),
        ));
        let store = agent.store.clone();
        let session = agent.new_session("CUST_001").await.unwrap();

        agent.chat(session.session_id, "Help me budget").await.unwrap();
        agent.chat(session.session_id, "And my savings?").await.unwrap();

        let state = store.load(session.session_id).await.unwrap().unwrap();
        assert_eq!(state.conversation_count, 2);
        assert_eq!(state.messages.len(), 4);
    }
}
