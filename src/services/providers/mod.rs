//! Language model provider abstraction
//!
//! The mapping and enrichment layers only ever see [`LanguageModel`]: a
//! single request/response call that turns a rendered chat prompt into text.
//! Providers are plain HTTP clients; retries, timeouts and fallbacks are the
//! caller's concern.

use std::sync::Arc;

use crate::{
    config::{Config, LlmProvider},
    error::AppResult,
};

pub mod ollama;
pub mod openai;

pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// A system + human message pair with placeholders like `{name}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub system: String,
    pub human: String,
}

/// A prompt with all variables interpolated, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub human: String,
}

impl PromptTemplate {
    pub fn new(system: impl Into<String>, human: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            human: human.into(),
        }
    }

    /// Replaces each `{key}` with its value. Unknown placeholders are left as-is.
    pub fn render(&self, variables: &[(&str, String)]) -> ChatPrompt {
        ChatPrompt {
            system: interpolate(&self.system, variables),
            human: interpolate(&self.human, variables),
        }
    }
}

/// Single pass over `template`; substituted values are never rescanned
fn interpolate(template: &str, variables: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let substitution = after.find('}').and_then(|close| {
            let key = &after[..close];
            variables
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (value, close))
        });

        match substitution {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Trait for language model providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends one prompt and returns the raw text content of the reply
    async fn invoke(&self, prompt: &ChatPrompt) -> AppResult<String>;
}

/// Builds the configured provider, or `None` when no model is usable
pub fn build_language_model(config: &Config) -> Option<Arc<dyn LanguageModel>> {
    let model_id = config.model_id();

    match config.llm_provider {
        LlmProvider::OpenAi => match config.openai_api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Some(Arc::new(OpenAiProvider::new(
                key.to_string(),
                config.openai_api_url.clone(),
                model_id,
            ))),
            _ => {
                tracing::warn!("OPENAI_API_KEY is required when LLM_PROVIDER is 'openai'; running without a language model");
                None
            }
        },
        LlmProvider::Ollama => Some(Arc::new(OllamaProvider::new(
            config.ollama_url.clone(),
            model_id,
        ))),
        LlmProvider::None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_substitutes_variables() {
        let template = PromptTemplate::new("You describe {kind}s.", "Tell me about {name} in {location}.");
        let prompt = template.render(&[
            ("kind", "event".to_string()),
            ("name", "Jazz Night".to_string()),
            ("location", "Indiranagar".to_string()),
        ]);

        assert_eq!(prompt.system, "You describe events.");
        assert_eq!(prompt.human, "Tell me about Jazz Night in Indiranagar.");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders_and_json() {
        let template = PromptTemplate::new(r#"Return ["comedy"] for {missing}"#, "{interests}");
        let prompt = template.render(&[("interests", "standup".to_string())]);

        assert_eq!(prompt.system, r#"Return ["comedy"] for {missing}"#);
        assert_eq!(prompt.human, "standup");
    }

    #[test]
    fn test_render_does_not_rescan_values() {
        let template = PromptTemplate::new("", "Name: {name}\nPrice: {price}\nLocation: {location}");
        let prompt = template.render(&[
            ("name", "The {price} Show".to_string()),
            ("price", "₹499".to_string()),
            ("location", "{location}".to_string()),
        ]);

        assert_eq!(prompt.human, "Name: The {price} Show\nPrice: ₹499\nLocation: {location}");
    }

    #[test]
    fn test_render_handles_nested_and_unclosed_braces() {
        let template = PromptTemplate::new("{{name}} and {name", "");
        let prompt = template.render(&[("name", "Jazz".to_string())]);

        assert_eq!(prompt.system, "{Jazz} and {name");
    }

    fn config_with(provider: &str, key: Option<&str>) -> Config {
        let mut vars = vec![("LLM_PROVIDER".to_string(), provider.to_string())];
        if let Some(key) = key {
            vars.push(("OPENAI_API_KEY".to_string(), key.to_string()));
        }
        envy::from_iter::<_, Config>(vars).unwrap()
    }

    #[test]
    fn test_openai_without_key_yields_no_model() {
        assert!(build_language_model(&config_with("openai", None)).is_none());
        assert!(build_language_model(&config_with("openai", Some("  "))).is_none());
    }

    #[test]
    fn test_provider_selection() {
        assert!(build_language_model(&config_with("openai", Some("sk-test"))).is_some());
        assert!(build_language_model(&config_with("ollama", None)).is_some());
        assert!(build_language_model(&config_with("none", None)).is_none());
    }
}
