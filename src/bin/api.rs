use financial_coaching_agent::{
    agent::CoachingAgent,
    api,
    data,
    escalation::RecordingEscalator,
    llm::{GeminiClient, LlmClient, ScriptedModel},
    models::ModelReply,
    session,
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

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(8080);

    let profile = Arc::new(data::demo_customer());
    let registry = Arc::new(create_default_registry(
        profile.clone(),
        Arc::new(StaticKnowledgeBase::new()),
    ));

    let model: Arc<dyn LlmClient> = match env::var("GEMINI_API_KEY") {
        Ok(key) if !key.is_empty() => Arc::new(GeminiClient::new(key)),
        _ => {
            info!("GEMINI_API_KEY not set — serving with a scripted model");
            Arc::new(ScriptedModel::with_fallback(
                vec![],
                ModelReply::Narration(
                    "I can help with questions about your money, spending and savings.".to_string(),
                ),
            ))
        }
    };

    let agent = Arc::new(CoachingAgent::new(
        model,
        registry,
        session::build_store(),
        Arc::new(RecordingEscalator::new()),
    ));

    api::start_server(agent, profile, port).await
}
