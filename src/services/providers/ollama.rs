//! Ollama chat provider for local development

use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    services::providers::{
        openai::{chat_messages, ChatMessage},
        ChatPrompt, LanguageModel,
    },
};

/// How long Ollama keeps the model loaded between requests
const KEEP_ALIVE: &str = "1h";

#[derive(Clone)]
pub struct OllamaProvider {
    http_client: HttpClient,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
    keep_alive: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ChatMessage,
}

impl OllamaProvider {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            base_url,
            model,
        }
    }
}

#[async_trait::async_trait]
impl LanguageModel for OllamaProvider {
    async fn invoke(&self, prompt: &ChatPrompt) -> AppResult<String> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));

        let request = OllamaChatRequest {
            model: &self.model,
            messages: chat_messages(prompt),
            stream: false,
            keep_alive: KEEP_ALIVE,
        };

        tracing::debug!(model = %self.model, prompt_length = prompt.human.len(), "Calling Ollama");

        let response = self.http_client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Ollama returned status {}: {}",
                status, body
            )));
        }

        let chat: OllamaChatResponse = response.json().await?;
        Ok(chat.message.content)
    }
}
