use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion API key not configured")]
    MissingApiKey,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("completion API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("completion response contained no content")]
    EmptyResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
    pub schema: Value,
}

/// `response_format` payload of the chat-completions API. Either plain
/// `json_object` mode or a named JSON schema the model must conform to.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<JsonSchemaFormat>,
}

impl ResponseFormat {
    pub fn json_object() -> Self {
        Self {
            format_type: "json_object".to_string(),
            json_schema: None,
        }
    }

    pub fn json_schema(name: impl Into<String>, schema: Value) -> Self {
        Self {
            format_type: "json_schema".to_string(),
            json_schema: Some(JsonSchemaFormat {
                name: name.into(),
                strict: Some(true),
                schema,
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub response_format: Option<ResponseFormat>,
    pub temperature: f32,
    /// Extra attempts after the first, on transport/5xx failures only.
    pub max_retries: u32,
}

/// The one seam to the hosted language model. Implementations return the raw
/// content text of the first choice; callers parse and validate it.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client.
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: config.openai_api_key.clone(),
            base_url: config.openai_base_url.trim_end_matches('/').to_string(),
            model: config.openai_model.clone(),
        }
    }

    fn build_payload(&self, request: &CompletionRequest) -> Value {
        let mut payload = serde_json::json!({
            "model": &self.model,
            "messages": &request.messages,
            "temperature": request.temperature,
        });
        if let Some(format) = &request.response_format {
            payload["response_format"] = serde_json::to_value(format).unwrap_or(Value::Null);
        }
        payload
    }

    async fn call_once(&self, payload: &Value) -> Result<String, CompletionError> {
        let api_key = self.api_key.as_deref().ok_or(CompletionError::MissingApiKey)?;

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api { status, body });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}

fn retryable(err: &CompletionError) -> bool {
    match err {
        CompletionError::Network(_) => true,
        CompletionError::Api { status, .. } => status.is_server_error(),
        CompletionError::MissingApiKey | CompletionError::EmptyResponse => false,
    }
}

#[async_trait]
impl CompletionApi for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let payload = self.build_payload(request);

        let mut attempt = 0;
        loop {
            match self.call_once(&payload).await {
                Ok(content) => return Ok(content),
                Err(err) if attempt < request.max_retries && retryable(&err) => {
                    attempt += 1;
                    tracing::warn!("Completion attempt {} failed, retrying: {}", attempt, err);
                    tokio::time::sleep(Duration::from_millis(500 * u64::from(attempt))).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> OpenAiClient {
        OpenAiClient {
            client: Client::new(),
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
        }
    }

    #[test]
    fn payload_carries_model_messages_and_temperature() {
        let request = CompletionRequest {
            messages: vec![ChatMessage::system("be brief"), ChatMessage::user("hi")],
            response_format: None,
            temperature: 0.7,
            max_retries: 0,
        };
        let payload = test_client().build_payload(&request);

        assert_eq!(payload["model"], "gpt-4o");
        assert_eq!(payload["temperature"], 0.7);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "hi");
        assert!(payload.get("response_format").is_none());
    }

    #[test]
    fn payload_serializes_schema_constraint() {
        let schema = serde_json::json!({ "type": "object" });
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("go")],
            response_format: Some(ResponseFormat::json_schema("WeeklyMealPlan", schema)),
            temperature: 0.7,
            max_retries: 3,
        };
        let payload = test_client().build_payload(&request);

        assert_eq!(payload["response_format"]["type"], "json_schema");
        assert_eq!(
            payload["response_format"]["json_schema"]["name"],
            "WeeklyMealPlan"
        );
        assert_eq!(payload["response_format"]["json_schema"]["strict"], true);
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_network() {
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("go")],
            response_format: Some(ResponseFormat::json_object()),
            temperature: 0.7,
            max_retries: 3,
        };
        let err = test_client().complete(&request).await.unwrap_err();
        assert!(matches!(err, CompletionError::MissingApiKey));
    }
}
