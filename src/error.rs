//! Error types for the coaching agent

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, CoachingError>;

#[derive(Error, Debug)]
pub enum CoachingError {

    // =============================
    // Guardrail & Pipeline Errors
    // =============================

    /// Two classifiers matched conflicting categories. Resolved by the
    /// fixed precedence order in the input guard; surfaced only when a
    /// caller bypasses the guard and asks for a raw classification.
    #[error("Ambiguous classification: {0}")]
    ClassificationAmbiguous(String),

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailure(String),

    #[error("Grounding violation: {0}")]
    GroundingViolation(String),

    #[error("Tool loop exhausted: {0}")]
    LoopExhausted(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidToolInput(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("Escalation error: {0}")]
    EscalationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Audit error: {0}")]
    AuditError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
