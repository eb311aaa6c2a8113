//! OpenAI-compatible chat-completions oracle
//!
//! Works against any endpoint speaking the `/chat/completions` dialect
//! (OpenAI, vLLM, Ollama, LocalAI).

use super::{Oracle, OracleError};
use async_trait::async_trait;
use lern_common::config::OracleConfig;
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("lern-curriculum/", env!("CARGO_PKG_VERSION"));

/// Chat-completions client with a hard request timeout
pub struct OpenAiOracle {
    http_client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    timeout_secs: u64,
}

impl OpenAiOracle {
    pub fn new(config: &OracleConfig, api_key: Option<String>) -> Result<Self, OracleError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            timeout_secs: config.timeout_secs,
        })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
    refusal: Option<String>,
}

#[async_trait]
impl Oracle for OpenAiOracle {
    fn id(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, OracleError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let mut request = self.http_client.post(self.chat_completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", key));
        }

        tracing::debug!(model = %self.model, prompt_chars = user_prompt.len(), "Calling oracle");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout_secs)
            } else {
                OracleError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(OracleError::Api(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout_secs)
            } else {
                OracleError::Network(format!("Malformed completion body: {}", e))
            }
        })?;

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| OracleError::Refused("no choices returned".to_string()))?;

        if let Some(refusal) = choice.message.refusal {
            return Err(OracleError::Refused(refusal));
        }

        match choice.finish_reason.as_deref() {
            Some("content_filter") => {
                return Err(OracleError::Refused("content filtered".to_string()));
            }
            Some("length") => {
                return Err(OracleError::Refused("answer truncated at token limit".to_string()));
            }
            _ => {}
        }

        choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| OracleError::Refused("empty answer".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_trims_base_url() {
        let config = OracleConfig {
            base_url: "http://localhost:11434/v1/".to_string(),
            ..OracleConfig::default()
        };
        let oracle = OpenAiOracle::new(&config, None).unwrap();
        assert_eq!(oracle.chat_completions_url(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(oracle.id(), config.model);
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "system",
                content: "json only",
            }],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "system");
    }

    #[test]
    fn test_response_parsing() {
        let chat: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"{\"1\": 279}"},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(chat.choices[0].message.content.as_deref(), Some(r#"{"1": 279}"#));
        assert!(chat.choices[0].message.refusal.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let config = OracleConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            ..OracleConfig::default()
        };
        let oracle = OpenAiOracle::new(&config, None).unwrap();
        let result = oracle.complete("sys", "user").await;
        assert!(matches!(
            result,
            Err(OracleError::Network(_)) | Err(OracleError::Timeout(_))
        ));
    }
}
