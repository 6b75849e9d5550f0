//! Interest-to-category mapping.
//!
//! Free text is mapped onto a fixed taxonomy by asking the language model
//! first and falling back to keyword matching when the model is missing,
//! fails, or gives an answer that can't be trusted.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::services::providers::{LanguageModel, PromptTemplate};

pub mod keyword;
pub mod llm;
pub mod taxonomy;

pub use keyword::{KeywordTable, KEYWORD_MATCH_LIMIT};
pub use llm::MappingError;
pub use taxonomy::{CategoryDef, PromptExample, Taxonomy, TaxonomyConfig, TaxonomyError, TaxonomyVariant};

/// Model answers with more categories than this are discarded
pub const MAX_TRUSTED_MODEL_CATEGORIES: usize = 4;

/// Where a set of categories came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingMethod {
    Llm,
    KeywordFallback,
}

impl MappingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingMethod::Llm => "llm",
            MappingMethod::KeywordFallback => "keyword_fallback",
        }
    }
}

/// Deduplicated taxonomy labels in first-seen order, tagged with their source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingResult {
    pub categories: Vec<String>,
    pub method: MappingMethod,
}

impl MappingResult {
    /// False when neither path produced a category
    pub fn is_resolved(&self) -> bool {
        !self.categories.is_empty()
    }
}

/// Resolves free-text interests to taxonomy categories
pub struct CategoryMapper {
    config: Arc<TaxonomyConfig>,
    model: Option<Arc<dyn LanguageModel>>,
    prompt: PromptTemplate,
}

impl CategoryMapper {
    pub fn new(config: Arc<TaxonomyConfig>, model: Option<Arc<dyn LanguageModel>>) -> Self {
        let prompt = llm::category_prompt(&config);
        Self {
            config,
            model,
            prompt,
        }
    }

    pub fn config(&self) -> &TaxonomyConfig {
        &self.config
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Maps `text` onto the taxonomy.
    ///
    /// The model answer is kept only when it holds between 1 and
    /// [`MAX_TRUSTED_MODEL_CATEGORIES`] labels; otherwise the keyword table
    /// decides. An empty result is a normal outcome, not an error.
    pub async fn resolve(&self, text: &str) -> MappingResult {
        let from_model = match &self.model {
            Some(model) => {
                match llm::map_via_model(model.as_ref(), &self.prompt, text, &self.config.taxonomy)
                    .await
                {
                    Ok(categories) => categories,
                    Err(e) => {
                        tracing::warn!(error = %e, interests = %text, "Model category mapping failed");
                        Vec::new()
                    }
                }
            }
            None => Vec::new(),
        };

        if from_model.is_empty() || from_model.len() > MAX_TRUSTED_MODEL_CATEGORIES {
            let categories = self
                .config
                .keywords
                .match_categories(text, &self.config.taxonomy);

            tracing::info!(
                interests = %text,
                model_count = from_model.len(),
                categories = ?categories,
                "Using keyword fallback for category mapping"
            );

            return MappingResult {
                categories,
                method: MappingMethod::KeywordFallback,
            };
        }

        tracing::info!(interests = %text, categories = ?from_model, "Mapped categories via model");

        MappingResult {
            categories: from_model,
            method: MappingMethod::Llm,
        }
    }
}
