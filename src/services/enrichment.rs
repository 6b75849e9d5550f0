use serde::Serialize;
use std::sync::Arc;

use crate::{
    db::redis::{Cache, CacheKey, SUGGESTION_TTL_SECS},
    mapping::TaxonomyVariant,
    models::Listing,
    services::providers::{LanguageModel, PromptTemplate},
};

/// A listing together with the sentence read out to the caller
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Suggestion {
    pub suggestion: String,
    pub details: Listing,
}

/// Prompt used to turn one listing into a short spoken blurb
pub fn suggestion_prompt(variant: TaxonomyVariant) -> PromptTemplate {
    match variant {
        TaxonomyVariant::Events => PromptTemplate::new(
            "You are Spotive, a friendly event discovery assistant talking to people over \
             the phone in Bangalore, India. You will be given details about a real event. \
             Present it in an exciting, conversational way.\n\n\
             Respond in exactly 20 words, the way you would chat with a friend on the phone: \
             introduce the event, say what makes it special, then mention location, timing \
             and price casually. Do not use JSON or lists.",
            "Tell me about this event in a friendly, conversational way:\n\n\
             Event Name: {name}\n\
             Category: {category}\n\
             Description: {description}\n\
             Location: {location}\n\
             Date: {date}\n\
             Time: {time}\n\
             Price: {price}",
        ),
        TaxonomyVariant::Packages => PromptTemplate::new(
            "You are Spotive, a friendly travel assistant talking to people over the phone. \
             You will be given details about a real travel package. Present it in an \
             exciting, conversational way.\n\n\
             Respond in exactly 20 words, the way you would chat with a friend on the phone: \
             name the trip, say what makes it special, then mention destination, duration \
             and price casually. Do not use JSON or lists.",
            "Tell me about this travel package in a friendly, conversational way:\n\n\
             Package Name: {name}\n\
             Category: {category}\n\
             Description: {description}\n\
             Destination: {destination}\n\
             Duration: {duration}\n\
             Price: {price}",
        ),
    }
}

/// Attaches a suggestion sentence to each listing.
///
/// Generation never fails: a missing model, a model error or an empty reply
/// all produce the listing's templated fallback. Generated text is cached
/// per listing when a cache is configured.
pub struct Enricher {
    variant: TaxonomyVariant,
    model: Option<Arc<dyn LanguageModel>>,
    cache: Option<Cache>,
    prompt: PromptTemplate,
}

impl Enricher {
    pub fn new(
        variant: TaxonomyVariant,
        model: Option<Arc<dyn LanguageModel>>,
        cache: Option<Cache>,
    ) -> Self {
        Self {
            variant,
            model,
            cache,
            prompt: suggestion_prompt(variant),
        }
    }

    /// True when suggestions may come from the model rather than the template
    pub fn is_generative(&self) -> bool {
        self.model.is_some()
    }

    /// One suggestion per listing, in input order
    pub async fn enrich(&self, listings: &[Listing]) -> Vec<Suggestion> {
        let mut suggestions = Vec::with_capacity(listings.len());
        for listing in listings {
            suggestions.push(Suggestion {
                suggestion: self.describe(listing).await,
                details: listing.clone(),
            });
        }
        suggestions
    }

    async fn describe(&self, listing: &Listing) -> String {
        let Some(model) = &self.model else {
            return listing.fallback_suggestion();
        };

        let key = CacheKey::Suggestion(self.variant, listing.id());
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get_text(&key).await {
                if !cached.trim().is_empty() {
                    tracing::debug!(listing_id = %listing.id(), "Suggestion cache hit");
                    return cached;
                }
            }
        }

        let prompt = self.prompt.render(&listing.prompt_variables());
        match model.invoke(&prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                if let Some(cache) = &self.cache {
                    cache.put_text_in_background(&key, &text, SUGGESTION_TTL_SECS);
                }
                text
            }
            Ok(_) => {
                tracing::warn!(listing_id = %listing.id(), "Model returned an empty suggestion");
                listing.fallback_suggestion()
            }
            Err(e) => {
                tracing::warn!(error = %e, listing_id = %listing.id(), "Suggestion generation failed");
                listing.fallback_suggestion()
            }
        }
    }
}
