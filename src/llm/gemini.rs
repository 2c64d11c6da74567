//! Gemini API client
//!
//! Implements `LlmClient` over the generateContent endpoint with function
//! declarations, so the model can request deterministic tools instead of
//! inventing figures. Uses a long-lived reqwest::Client for connection
//! pooling; the request timeout surfaces as ModelUnavailable (fatal for
//! the turn — never silently answered from cached data).

use crate::error::CoachingError;
use crate::llm::LlmClient;
use crate::models::{ChatMessage, ChatRole, ModelReply, ToolRequest, ToolSchema};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info};

const MODEL_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(MODEL_CALL_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent".to_string(),
        }
    }

    fn build_request(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> GeminiRequest {
        let contents = history.iter().map(content_from_message).collect();

        let tool_block = if tools.is_empty() {
            None
        } else {
            Some(vec![ToolBlock {
                function_declarations: tools
                    .iter()
                    .map(|schema| FunctionDeclaration {
                        name: schema.name.clone(),
                        description: schema.description.clone(),
                        parameters: schema.parameters.clone(),
                    })
                    .collect(),
            }])
        };

        GeminiRequest {
            contents,
            tools: tool_block,
            generation_config: GenerationConfig {
                temperature: 0.1,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
            system_instruction: SystemInstruction {
                parts: vec![Part::text(system_prompt)],
            },
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn converse(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
        tools: &[ToolSchema],
    ) -> crate::Result<ModelReply> {
        if self.api_key.is_empty() {
            return Err(CoachingError::ModelUnavailable(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.base_url, self.api_key);
        let request = self.build_request(system_prompt, history, tools);

        info!(history_len = history.len(), tool_count = tools.len(), "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                CoachingError::ModelUnavailable(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(CoachingError::ModelUnavailable(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            CoachingError::ModelUnavailable(format!("Gemini parse error: {}", e))
        })?;

        let candidate = gemini_response.candidates.into_iter().next().ok_or_else(|| {
            CoachingError::ModelUnavailable("No response candidates from Gemini API".to_string())
        })?;

        // A function call anywhere in the parts wins over surrounding text.
        for part in &candidate.content.parts {
            if let Some(call) = &part.function_call {
                return Ok(ModelReply::ToolCall(ToolRequest {
                    name: call.name.clone(),
                    arguments: call.args.clone().unwrap_or(Value::Null),
                }));
            }
        }

        let narration: String = candidate
            .content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("");

        Ok(ModelReply::Narration(narration))
    }
}

/// Map a loop history message onto a Gemini content block.
///
/// Tool messages carry `{"tool": name, "result": facts}` as their content;
/// assistant messages that were tool requests carry
/// `{"function_call": {"name", "args"}}`. Both are re-expanded into the
/// structured parts the API expects; anything else rides as plain text.
fn content_from_message(message: &ChatMessage) -> Content {
    match message.role {
        ChatRole::User | ChatRole::System => Content {
            role: "user".to_string(),
            parts: vec![Part::text(&message.content)],
        },
        ChatRole::Assistant => {
            if let Ok(value) = serde_json::from_str::<Value>(&message.content) {
                if let Some(call) = value.get("function_call") {
                    let name = call
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let args = call.get("args").cloned();
                    return Content {
                        role: "model".to_string(),
                        parts: vec![Part {
                            text: None,
                            function_call: Some(FunctionCall { name, args }),
                            function_response: None,
                        }],
                    };
                }
            }
            Content {
                role: "model".to_string(),
                parts: vec![Part::text(&message.content)],
            }
        }
        ChatRole::Tool => {
            let parsed: Option<(String, Value)> = serde_json::from_str::<Value>(&message.content)
                .ok()
                .and_then(|value| {
                    let name = value.get("tool")?.as_str()?.to_string();
                    let result = value.get("result")?.clone();
                    Some((name, result))
                });

            match parsed {
                Some((name, result)) => Content {
                    role: "user".to_string(),
                    parts: vec![Part {
                        text: None,
                        function_call: None,
                        function_response: Some(FunctionResponse {
                            name,
                            response: result,
                        }),
                    }],
                },
                None => Content {
                    role: "user".to_string(),
                    parts: vec![Part::text(&message.content)],
                },
            }
        }
    }
}

//
// ================= Wire types =================
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolBlock>>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolBlock {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(content: &str) -> Self {
        Self {
            text: Some(content.to_string()),
            function_call: None,
            function_response: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization_includes_tools() {
        let client = GeminiClient::new("test-key".to_string());
        let tools = vec![ToolSchema {
            name: "get_spending_insights".to_string(),
            description: "Retrieve verified spending insights".to_string(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let history = vec![ChatMessage::user("How much am I spending?")];

        let request = client.build_request("system", &history, &tools);
        let serialized = serde_json::to_string(&request).expect("serializes");
        assert!(serialized.contains("functionDeclarations"));
        assert!(serialized.contains("get_spending_insights"));
        assert!(serialized.contains("How much am I spending?"));
    }

    #[test]
    fn test_tool_message_maps_to_function_response() {
        let message = ChatMessage::tool(
            json!({"tool": "get_spending_insights", "result": {"spend": "£100.00"}}).to_string(),
        );
        let content = content_from_message(&message);
        assert!(content.parts[0].function_response.is_some());
    }

    #[test]
    fn test_assistant_tool_request_maps_to_function_call() {
        let message = ChatMessage::assistant(
            json!({"function_call": {"name": "get_spending_insights", "args": {"months": 3}}})
                .to_string(),
        );
        let content = content_from_message(&message);
        assert_eq!(content.role, "model");
        let call = content.parts[0].function_call.as_ref().expect("call part");
        assert_eq!(call.name, "get_spending_insights");
    }

    #[test]
    fn test_response_function_call_parsing() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{"functionCall": {"name": "get_spending_insights", "args": {"months": 3}}}]
                },
                "finishReason": "STOP"
            }]
        });
        let parsed: GeminiResponse = serde_json::from_value(raw).expect("parses");
        let part = &parsed.candidates[0].content.parts[0];
        assert_eq!(
            part.function_call.as_ref().map(|c| c.name.as_str()),
            Some("get_spending_insights")
        );
    }
}
