use serde_json::Value;

use super::taxonomy::{Taxonomy, TaxonomyConfig};
use crate::services::providers::{LanguageModel, PromptTemplate};

/// Largest category count the prompt asks the model for
pub const PROMPT_CATEGORY_LIMIT: usize = 3;

/// Trigger words quoted next to each category in the prompt
const PROMPT_TRIGGER_WORDS: usize = 5;

/// Why the model path produced no usable answer
#[derive(thiserror::Error, Debug)]
pub enum MappingError {
    #[error("language model call failed: {0}")]
    Model(String),

    #[error("malformed model output: {0}")]
    MalformedOutput(String),
}

/// Builds the category mapping prompt for a taxonomy variant
pub fn category_prompt(config: &TaxonomyConfig) -> PromptTemplate {
    let categories = config
        .taxonomy
        .categories()
        .iter()
        .map(|c| {
            let triggers = config
                .keywords
                .entries()
                .iter()
                .find(|(label, _)| *label == c.label)
                .map(|(_, words)| words.iter().take(PROMPT_TRIGGER_WORDS).cloned().collect::<Vec<_>>())
                .unwrap_or_default();

            if triggers.is_empty() {
                format!("- {} ({})", c.label, c.description)
            } else {
                format!("- {} ({}; e.g. {})", c.label, c.description, triggers.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let examples = config
        .examples
        .iter()
        .map(|e| {
            let labels = serde_json::to_string(&e.labels).unwrap_or_else(|_| "[]".to_string());
            format!("- \"{}\" → {}", e.input, labels)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let system = format!(
        r#"You are an intelligent category mapping system for {subject} discovery.

Your job is to map user interests to our predefined {subject} categories.

**Predefined Categories (ONLY use these exactly):**
{categories}

**CRITICAL RULES:**
1. Return ONLY categories that ACTUALLY match the user's interests
2. Do NOT return all categories - be selective!
3. Maximum {limit} categories per response
4. If only one category matches, return only that one
5. Return ONLY a JSON array of category names
6. Use EXACT category names from the list above

**Examples (Follow these patterns - BE SELECTIVE!):**
{examples}

**DO NOT return all {total} categories - only return what matches!**"#,
        subject = config.subject,
        categories = categories,
        limit = PROMPT_CATEGORY_LIMIT,
        examples = examples,
        total = config.taxonomy.len(),
    );

    let human = format!(
        "User interests: {{interests}}\n\nReturn ONLY the JSON array of matching categories (max {}):",
        PROMPT_CATEGORY_LIMIT
    );

    PromptTemplate::new(system, human)
}

/// Parses a raw model reply into taxonomy labels.
///
/// The reply must be a JSON array of strings once trimmed; any other
/// element makes the whole reply malformed. Elements are lower-cased,
/// labels outside the taxonomy are dropped and duplicates collapse to
/// their first occurrence. An empty list is a valid answer here.
pub fn parse_model_output(raw: &str, taxonomy: &Taxonomy) -> Result<Vec<String>, MappingError> {
    let parsed: Value = serde_json::from_str(raw.trim())
        .map_err(|e| MappingError::MalformedOutput(e.to_string()))?;

    let Value::Array(items) = parsed else {
        return Err(MappingError::MalformedOutput(
            "expected a JSON array".to_string(),
        ));
    };

    let mut labels: Vec<String> = Vec::new();
    for item in &items {
        let Some(text) = item.as_str() else {
            return Err(MappingError::MalformedOutput(format!(
                "expected string labels, got {}",
                item
            )));
        };
        let Some(label) = taxonomy.canonical(text) else {
            continue;
        };
        if !labels.iter().any(|l| l == label) {
            labels.push(label.to_string());
        }
    }

    tracing::debug!(
        returned = items.len(),
        kept = labels.len(),
        "Validated model categories"
    );

    Ok(labels)
}

/// Asks the model to map `text` onto the taxonomy
pub async fn map_via_model(
    model: &dyn LanguageModel,
    prompt: &PromptTemplate,
    text: &str,
    taxonomy: &Taxonomy,
) -> Result<Vec<String>, MappingError> {
    let rendered = prompt.render(&[("interests", text.to_string())]);

    let raw = model
        .invoke(&rendered)
        .await
        .map_err(|e| MappingError::Model(e.to_string()))?;

    tracing::debug!(interests = %text, raw = %raw, "Model category response");

    parse_model_output(&raw, taxonomy)
}
