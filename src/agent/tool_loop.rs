//! Bounded tool-orchestration loop
//!
//! An explicit reason-act state machine: call the model, execute any
//! requested tool deterministically, certify the tool's monetary outputs
//! into the grounding ledger, append the result to history, repeat —
//! until the model narrates or the iteration cap is hit. The cap is a
//! bounded-liveness guarantee: some response always emerges within a
//! fixed number of external calls. Grounding-failure retries are a
//! separate mechanism owned by the pipeline, not this loop.

use crate::ledger::GroundingLedger;
use crate::llm::LlmClient;
use crate::models::{ChatMessage, ModelReply, ToolInvocationRecord, ToolSchema};
use crate::tools::ToolRegistry;
use crate::Result;
use serde_json::json;
use tracing::{debug, warn};

/// Fixed iteration cap for one loop invocation.
pub const MAX_LOOP_ITERATIONS: u32 = 5;

/// Fallback narration when the cap is reached while the model still
/// wants a tool.
pub const LOOP_EXHAUSTED_FALLBACK: &str = "I'm having trouble retrieving your data right now. \
Please try again in a moment or contact support.";

/// Per-turn loop state. Created at the start of a loop invocation and
/// discarded once a candidate narration is produced.
#[derive(Debug)]
pub struct LoopState {
    pub iteration: u32,
    pub messages: Vec<ChatMessage>,
    pub terminal: bool,
}

impl LoopState {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            iteration: 0,
            messages,
            terminal: false,
        }
    }
}

#[derive(Debug)]
pub struct LoopOutcome {
    pub narration: String,
    pub exhausted: bool,
    pub iterations: u32,
}

pub struct ToolLoop<'a> {
    model: &'a dyn LlmClient,
    registry: &'a ToolRegistry,
    max_iterations: u32,
}

impl<'a> ToolLoop<'a> {
    pub fn new(model: &'a dyn LlmClient, registry: &'a ToolRegistry) -> Self {
        Self {
            model,
            registry,
            max_iterations: MAX_LOOP_ITERATIONS,
        }
    }

    /// Run the loop to a candidate narration. Model transport failures
    /// propagate (fatal for the turn); tool failures are serialised
    /// honestly into history and never fabricate a figure.
    pub async fn run(
        &self,
        system_prompt: &str,
        mut state: LoopState,
        ledger: &mut GroundingLedger,
        audit: &mut Vec<ToolInvocationRecord>,
        tools: &[ToolSchema],
    ) -> Result<LoopOutcome> {
        while state.iteration < self.max_iterations {
            let reply = self
                .model
                .converse(system_prompt, &state.messages, tools)
                .await?;

            match reply {
                ModelReply::Narration(text) => {
                    state.terminal = true;
                    debug!(iterations = state.iteration, "loop terminal: narration");
                    return Ok(LoopOutcome {
                        narration: text,
                        exhausted: false,
                        iterations: state.iteration,
                    });
                }
                ModelReply::ToolCall(request) => {
                    state.messages.push(ChatMessage::assistant(
                        json!({
                            "function_call": {
                                "name": request.name,
                                "args": request.arguments,
                            }
                        })
                        .to_string(),
                    ));

                    let result = match self.registry.get(&request.name) {
                        None => {
                            warn!(tool = %request.name, "model requested unregistered tool");
                            audit.push(ToolInvocationRecord::new(
                                request.name.clone(),
                                request.arguments.clone(),
                                json!({"error": "unknown tool"}),
                                false,
                            ));
                            json!({"error": format!("Unknown tool: {}", request.name)})
                        }
                        Some(tool) => match tool.execute(&request.arguments).await {
                            Ok(bundle) => {
                                let certified = ledger.certify_facts(&bundle.facts);
                                debug!(
                                    tool = %request.name,
                                    certified_amounts = certified,
                                    "tool executed"
                                );
                                audit.push(ToolInvocationRecord::new(
                                    request.name.clone(),
                                    request.arguments.clone(),
                                    bundle.facts.clone(),
                                    true,
                                ));
                                bundle.facts
                            }
                            Err(error) => {
                                warn!(tool = %request.name, error = %error, "tool failed");
                                let honest = json!({"error": error.to_string()});
                                audit.push(ToolInvocationRecord::new(
                                    request.name.clone(),
                                    request.arguments.clone(),
                                    honest.clone(),
                                    false,
                                ));
                                honest
                            }
                        },
                    };

                    state.messages.push(ChatMessage::tool(
                        json!({"tool": request.name, "result": result}).to_string(),
                    ));
                    state.iteration += 1;
                }
            }
        }

        state.terminal = true;
        warn!(
            iterations = state.iteration,
            "loop cap reached with tool request outstanding"
        );
        Ok(LoopOutcome {
            narration: LOOP_EXHAUSTED_FALLBACK.to_string(),
            exhausted: true,
            iterations: state.iteration,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::llm::ScriptedModel;
    use crate::models::ToolRequest;
    use crate::tools::{create_default_registry, knowledge_base::StaticKnowledgeBase};
    use std::sync::Arc;

    fn registry() -> ToolRegistry {
        create_default_registry(
            Arc::new(data::demo_customer()),
            Arc::new(StaticKnowledgeBase::new()),
        )
    }

    fn spending_call() -> ModelReply {
        ModelReply::ToolCall(ToolRequest {
            name: "get_spending_insights".to_string(),
            arguments: serde_json::json!({"months": 3}),
        })
    }

    #[tokio::test]
    async fn test_tool_then_narration_certifies_ledger() {
        let registry = registry();
        let model = ScriptedModel::new(vec![
            spending_call(),
            ModelReply::Narration("Here's your spending summary.".to_string()),
        ]);
        let tool_loop = ToolLoop::new(&model, &registry);

        let mut ledger = GroundingLedger::new();
        let mut audit = Vec::new();
        let outcome = tool_loop
            .run("", LoopState::new(vec![]), &mut ledger, &mut audit, &[])
            .await
            .unwrap();

        assert!(!outcome.exhausted);
        assert_eq!(outcome.iterations, 1);
        assert!(!ledger.is_empty(), "tool facts must certify the ledger");
        assert_eq!(audit.len(), 1);
        assert!(audit[0].succeeded);
    }

    #[tokio::test]
    async fn test_adversarial_tool_requests_hit_cap() {
        let registry = registry();
        // Model that never stops asking for tools.
        let model = ScriptedModel::with_fallback(vec![], spending_call());
        let tool_loop = ToolLoop::new(&model, &registry);

        let mut ledger = GroundingLedger::new();
        let mut audit = Vec::new();
        let outcome = tool_loop
            .run("", LoopState::new(vec![]), &mut ledger, &mut audit, &[])
            .await
            .unwrap();

        assert!(outcome.exhausted);
        assert_eq!(outcome.iterations, MAX_LOOP_ITERATIONS);
        assert_eq!(outcome.narration, LOOP_EXHAUSTED_FALLBACK);
        assert_eq!(audit.len(), MAX_LOOP_ITERATIONS as usize);
    }

    #[tokio::test]
    async fn test_unknown_tool_gets_honest_error() {
        let registry = registry();
        let model = ScriptedModel::new(vec![
            ModelReply::ToolCall(ToolRequest {
                name: "no_such_tool".to_string(),
                arguments: serde_json::json!({}),
            }),
            ModelReply::Narration("Sorry, I couldn't fetch that.".to_string()),
        ]);
        let tool_loop = ToolLoop::new(&model, &registry);

        let mut ledger = GroundingLedger::new();
        let mut audit = Vec::new();
        let outcome = tool_loop
            .run("", LoopState::new(vec![]), &mut ledger, &mut audit, &[])
            .await
            .unwrap();

        assert!(!outcome.exhausted);
        assert!(ledger.is_empty(), "failed calls must not certify anything");
        assert!(!audit[0].succeeded);
    }

    #[tokio::test]
    async fn test_tool_failure_does_not_certify() {
        let registry = registry();
        // Invalid category → typed tool failure, serialised into history.
        let model = ScriptedModel::new(vec![
            ModelReply::ToolCall(ToolRequest {
                name: "get_category_detail".to_string(),
                arguments: serde_json::json!({"category": "lottery"}),
            }),
            ModelReply::Narration("I can't calculate that right now.".to_string()),
        ]);
        let tool_loop = ToolLoop::new(&model, &registry);

        let mut ledger = GroundingLedger::new();
        let mut audit = Vec::new();
        let outcome = tool_loop
            .run("", LoopState::new(vec![]), &mut ledger, &mut audit, &[])
            .await
            .unwrap();

        assert!(ledger.is_empty());
        assert!(!audit[0].succeeded);
        assert_eq!(outcome.narration, "I can't calculate that right now.");
    }
}
