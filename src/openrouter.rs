//! OpenRouter-backed turn generation
//!
//! The bundled production implementation of `TurnGenerator`: builds a
//! role-conditioned chat request from the shared conversation state and
//! calls the OpenRouter chat-completions API.

use crate::config::OpenRouterConfig;
use crate::error::{Error, Result};
use crate::generate::{TurnGenerator, TurnRequest};
use crate::roles::Role;
use crate::types::TokenUsage;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// OpenRouter chat-completions generator
pub struct OpenRouterGenerator {
    /// HTTP client
    client: Client,
    /// Configuration
    config: OpenRouterConfig,
}

impl OpenRouterGenerator {
    /// Create a generator from environment variables
    pub fn from_env() -> Result<Self> {
        let config = OpenRouterConfig::from_env()?;
        Self::new(config)
    }

    /// Create a generator with the given configuration
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Get the configuration
    pub fn config(&self) -> &OpenRouterConfig {
        &self.config
    }

    fn persona_prompt(role: Role) -> String {
        let colleagues = Role::ALL
            .iter()
            .filter(|r| **r != role)
            .map(|r| format!("{} (the {})", r.persona_name(), r.label()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "You are {name}, the {label} on a startup advisory board, focused on {focus}. \
             You are in a live board discussion with {colleagues}. Speak in first person, \
             address colleagues by first name when you want their input, and keep every \
             contribution concrete and grounded in the discussion so far.",
            name = role.persona_name(),
            label = role.label(),
            focus = role.focus(),
        )
    }

    fn build_messages(&self, request: &TurnRequest) -> Vec<ChatMessage> {
        let mut messages = vec![
            ChatMessage::system(Self::persona_prompt(request.role)),
            ChatMessage::user(format!(
                "Analyze the following business idea and provide comprehensive \
                 consultation. Business Idea: {}",
                request.business_idea
            )),
        ];
        for utterance in &request.transcript {
            if utterance.speaker == request.role {
                messages.push(ChatMessage::assistant(&utterance.text));
            } else {
                messages.push(ChatMessage::user(format!(
                    "{} ({}): {}",
                    utterance.speaker.label(),
                    utterance.speaker.persona_name(),
                    utterance.text
                )));
            }
        }
        if let Some(summary) = &request.context_summary {
            messages.push(ChatMessage::user(format!("Conversation context: {summary}")));
        }
        if let Some(context) = &request.fetched_context {
            messages.push(ChatMessage::user(format!("Background research: {context}")));
        }
        for directive in &request.directives {
            messages.push(ChatMessage::user(directive.instruction()));
        }
        messages
    }
}

#[async_trait]
impl TurnGenerator for OpenRouterGenerator {
    async fn generate(&self, request: &TurnRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: self.build_messages(request),
            temperature: Some(self.config.temperature),
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key()))
            .header("X-Title", &self.config.app_name)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::openrouter(format!(
                "Request failed with status {status}: {error_text}"
            )));
        }

        let completion: ChatCompletionResponse = response.json().await?;
        if let Some(usage) = completion.usage {
            let usage = TokenUsage::new(usage.prompt_tokens, usage.completion_tokens);
            debug!(
                role = %request.role,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "completion received"
            );
        }

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| Error::generation(request.role, "empty completion"))
    }
}

/// Chat message in the completions wire format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role: "system", "user", or "assistant"
    pub role: String,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completions request body
#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Chat-completions response body
#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::TurnDirective;
    use crate::types::Utterance;
    use url::Url;

    fn request() -> TurnRequest {
        TurnRequest {
            role: Role::Cto,
            business_idea: "AI bookkeeping for food trucks".into(),
            transcript: vec![
                Utterance::new(Role::Ceo, "I love the wedge here.", 0),
                Utterance::new(Role::Cto, "The ingestion pipeline worries me.", 1),
            ],
            context_summary: Some("Business: AI bookkeeping".into()),
            fetched_context: None,
            directives: vec![TurnDirective::BeDistinct],
        }
    }

    #[test]
    fn message_assembly_maps_speakers() {
        let generator =
            OpenRouterGenerator::new(OpenRouterConfig::new("test-key")).unwrap();
        let messages = generator.build_messages(&request());

        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("Mike"));
        // CEO turn arrives as user input, own turn as assistant history
        assert_eq!(messages[2].role, "user");
        assert!(messages[2].content.starts_with("CEO (Sarah):"));
        assert_eq!(messages[3].role, "assistant");
        // summary then directive close the request
        assert!(messages[4].content.starts_with("Conversation context:"));
        assert!(messages[5].content.contains("too similar"));
    }

    #[tokio::test]
    async fn generate_returns_completion_content() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "A measured take."}}],
            "usage": {"prompt_tokens": 42, "completion_tokens": 7}
        });
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let config = OpenRouterConfig::new("test-key")
            .with_base_url(Url::parse(&format!("{}/v1", server.url())).unwrap());
        let generator = OpenRouterGenerator::new(config).unwrap();
        let text = generator.generate(&request()).await.unwrap();

        assert_eq!(text, "A measured take.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn generate_maps_api_errors() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let config = OpenRouterConfig::new("test-key")
            .with_base_url(Url::parse(&format!("{}/v1", server.url())).unwrap());
        let generator = OpenRouterGenerator::new(config).unwrap();
        let err = generator.generate(&request()).await.unwrap_err();

        assert!(matches!(err, Error::OpenRouter(_)));
    }
}
