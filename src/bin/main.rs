use financial_coaching_agent::{
    agent::CoachingAgent,
    data,
    escalation::RecordingEscalator,
    llm::{GeminiClient, LlmClient, ScriptedModel},
    models::{ModelReply, ToolRequest},
    session::InMemorySessionStore,
    tools::{create_default_registry, knowledge_base::StaticKnowledgeBase},
};
use std::env;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("Financial coaching agent starting");

    let profile = Arc::new(data::demo_customer());
    let registry = Arc::new(create_default_registry(
        profile.clone(),
        Arc::new(StaticKnowledgeBase::new()),
    ));

    // Use the real model when a key is configured; otherwise a scripted
    // model that exercises the full guarded pipeline offline.
    let model: Arc<dyn LlmClient> = match env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => {
            info!("Model: Gemini");
            Arc::new(GeminiClient::new(key))
        }
        _ => {
            info!("Model: scripted (set GEMINI_API_KEY for live narration)");
            Arc::new(ScriptedModel::with_fallback(
                vec![
                    ModelReply::ToolCall(ToolRequest {
                        name: "get_spending_insights".to_string(),
                        arguments: serde_json::json!({"months": 3}),
                    }),
                    ModelReply::Narration(
                        "I've pulled your verified spending summary — your income and spending \
                         are holding steady this quarter."
                            .to_string(),
                    ),
                ],
                ModelReply::Narration("Is there anything else about your finances I can help with?".to_string()),
            ))
        }
    };

    let agent = CoachingAgent::new(
        model,
        registry,
        Arc::new(InMemorySessionStore::new()),
        Arc::new(RecordingEscalator::new()),
    );

    let session = agent.new_session(&profile.customer_id).await?;
    println!("=== Session {} for {} ===\n", session.session_id, profile.name);

    let messages = [
        "How is my spending looking this month?",
        "Which ISA should I pick?",
        "I cant pay my rent",
        "What is the capital of France?",
    ];

    for message in messages {
        println!("> {}", message);
        match agent.chat(session.session_id, message).await {
            Ok(turn) => {
                println!(
                    "[{} | {} | tools: {:?}]\n{}\n",
                    turn.verdict, turn.intent, turn.tools_used, turn.reply
                );
            }
            Err(e) => {
                eprintln!("turn failed: {}\n", e);
            }
        }
    }

    Ok(())
}
