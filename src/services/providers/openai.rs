//! OpenAI chat completions provider
//!
//! Sends the system and human messages to `/v1/chat/completions` and returns
//! the first choice's message content.

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    services::providers::{ChatPrompt, LanguageModel},
};

const TEMPERATURE: f32 = 0.7;

#[derive(Clone)]
pub struct OpenAiProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub(crate) struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Converts a rendered prompt into the chat message list both providers share
pub(crate) fn chat_messages(prompt: &ChatPrompt) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: prompt.system.clone(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: prompt.human.clone(),
        },
    ]
}

impl OpenAiProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
        }
    }
}

#[async_trait::async_trait]
impl LanguageModel for OpenAiProvider {
    async fn invoke(&self, prompt: &ChatPrompt) -> AppResult<String> {
        let url = format!("{}/v1/chat/completions", self.api_url.trim_end_matches('/'));

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: chat_messages(prompt),
            temperature: TEMPERATURE,
        };

        tracing::debug!(model = %self.model, prompt_length = prompt.human.len(), "Calling OpenAI");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "OpenAI API returned status {}: {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::ExternalApi("OpenAI returned no choices".to_string()))
    }
}
