//! REST API server for the coaching agent
//!
//! Exposes the guarded pipeline and the read-only insight endpoints over
//! HTTP. Transport security and authentication live in front of this
//! service; the handlers assume an already-authenticated customer.

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::agent::CoachingAgent;
use crate::data::CustomerProfile;
use crate::tools::financial_health::{compute_health_score, report_to_facts};
use crate::tools::transaction_analyser::{insights_to_facts, Analyser};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Uuid,
    pub message: String,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<CoachingAgent>,
    pub profile: Arc<CustomerProfile>,
}

/// =============================
/// Endpoints
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "financial-coaching-agent",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn new_session(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    match state.agent.new_session(&state.profile.customer_id).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "session_id": session.session_id,
                "customer_name": state.profile.name,
                "message": format!(
                    "Welcome back, {}! I'm your financial coach. How can I help you today?",
                    state.profile.name
                ),
            }))),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Failed to create session: {}", e))),
        ),
    }
}

async fn chat(
    State(state): State<ApiState>,
    Json(request): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!(session_id = %request.session_id, "chat request");

    if request.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Message must not be empty".to_string())),
        );
    }

    match state.agent.chat(request.session_id, &request.message).await {
        Ok(turn) => (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({
                "session_id": request.session_id,
                "response": turn.reply,
                "verdict": turn.verdict,
                "intent": turn.intent,
                "tools_used": turn.tools_used,
            }))),
        ),
        Err(crate::CoachingError::SessionError(message)) => {
            (StatusCode::NOT_FOUND, Json(ApiResponse::error(message)))
        }
        Err(crate::CoachingError::ModelUnavailable(message)) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error(format!("Model unavailable: {}", message))),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(format!("Chat failed: {}", e))),
        ),
    }
}

async fn health_score(State(state): State<ApiState>) -> Json<ApiResponse> {
    let insights = Analyser::new(&state.profile).full_insights(3);
    let report = compute_health_score(&insights);
    Json(ApiResponse::success(report_to_facts(&report)))
}

async fn spending_insights(State(state): State<ApiState>) -> Json<ApiResponse> {
    let insights = Analyser::new(&state.profile).full_insights(3);
    Json(ApiResponse::success(insights_to_facts(&insights)))
}

/// =============================
/// Router
/// =============================

pub fn create_router(agent: Arc<CoachingAgent>, profile: Arc<CustomerProfile>) -> Router {
    let state = ApiState { agent, profile };

    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(new_session))
        .route("/api/chat", post(chat))
        .route("/api/health-score", get(health_score))
        .route("/api/spending-insights", get(spending_insights))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    agent: Arc<CoachingAgent>,
    profile: Arc<CustomerProfile>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(agent, profile);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data;
    use crate::escalation::RecordingEscalator;
    use crate::llm::ScriptedModel;
    use crate::models::ModelReply;
    use crate::session::InMemorySessionStore;
    use crate::tools::{create_default_registry, knowledge_base::StaticKnowledgeBase};

    fn test_state() -> ApiState {
        let profile = Arc::new(data::demo_customer());
        let registry = Arc::new(create_default_registry(
            profile.clone(),
            Arc::new(StaticKnowledgeBase::new()),
        ));
        let agent = Arc::new(CoachingAgent::new(
            Arc::new(ScriptedModel::with_fallback(
                vec![],
                ModelReply::Narration("Happy to help.".to_string()),
            )),
            registry,
            Arc::new(InMemorySessionStore::new()),
            Arc::new(RecordingEscalator::new()),
        ));
        ApiState { agent, profile }
    }

    #[tokio::test]
    async fn test_chat_unknown_session_is_not_found() {
        let state = test_state();
        let (status, Json(body)) = chat(
            State(state),
            Json(ChatRequest {
                session_id: Uuid::new_v4(),
                message: "hello".to_string(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_session_then_chat_round_trip() {
        let state = test_state();
        let (status, Json(body)) = new_session(State(state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        let session_id: Uuid = serde_json::from_value(
            body.data.unwrap()["session_id"].clone(),
        )
        .unwrap();

        let (status, Json(body)) = chat(
            State(state),
            Json(ChatRequest {
                session_id,
                message: "Help me with my budget".to_string(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.success);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let state = test_state();
        let (status, _) = chat(
            State(state),
            Json(ChatRequest {
                session_id: Uuid::new_v4(),
                message: "   ".to_string(),
            }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_insight_endpoints_return_data() {
        let state = test_state();
        let Json(body) = spending_insights(State(state.clone())).await;
        assert!(body.success);
        let Json(body) = health_score(State(state)).await;
        assert!(body.success);
    }
}
