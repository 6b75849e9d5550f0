use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    db::store::{CallLogStore, ListingStore},
    error::{AppError, AppResult},
    mapping::{CategoryMapper, MappingResult},
    models::CallLogRecord,
    services::enrichment::{Enricher, Suggestion},
};

/// Number of listings enriched and returned per call
pub const RESULT_WINDOW: usize = 5;

/// Where a discovery call came from, for the analytics row
#[derive(Debug, Clone)]
pub struct CallContext {
    pub endpoint: String,
    pub client_ip: String,
    pub user_agent: String,
    pub started: Instant,
}

impl CallContext {
    pub fn new(endpoint: &str, client_ip: &str, user_agent: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            client_ip: client_ip.to_string(),
            user_agent: user_agent.to_string(),
            started: Instant::now(),
        }
    }

    fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoveryOutcome {
    pub interests: String,
    pub mapping: MappingResult,
    /// Listings matched before the result window was applied
    pub total_matching: usize,
    pub results: Vec<Suggestion>,
}

/// Interests in, enriched listings out
pub struct DiscoveryService {
    mapper: Arc<CategoryMapper>,
    enricher: Arc<Enricher>,
    listings: Arc<dyn ListingStore>,
    call_logs: Arc<dyn CallLogStore>,
}

impl DiscoveryService {
    pub fn new(
        mapper: Arc<CategoryMapper>,
        enricher: Arc<Enricher>,
        listings: Arc<dyn ListingStore>,
        call_logs: Arc<dyn CallLogStore>,
    ) -> Self {
        Self {
            mapper,
            enricher,
            listings,
            call_logs,
        }
    }

    pub fn mapper(&self) -> &CategoryMapper {
        &self.mapper
    }

    pub fn enricher(&self) -> &Enricher {
        &self.enricher
    }

    /// Maps `interests`, queries listings and enriches the first
    /// [`RESULT_WINDOW`] of them.
    ///
    /// Every outcome, including failures, is written to the call log in the
    /// background.
    pub async fn discover(
        &self,
        interests: &str,
        scope: Option<&str>,
        context: &CallContext,
    ) -> AppResult<DiscoveryOutcome> {
        let mapping = self.mapper.resolve(interests).await;
        let outcome = self.search(interests, &mapping, scope).await;

        let record = match &outcome {
            Ok(found) => CallLogRecord::success(
                &context.endpoint,
                interests,
                &mapping,
                found.total_matching,
                found.results.first().map(|s| &s.details),
            ),
            Err(e) => {
                let method = match e {
                    AppError::NoCategoriesResolved { .. } | AppError::NoResults { .. } => {
                        mapping.method.as_str()
                    }
                    _ => "error",
                };
                CallLogRecord::failure(
                    &context.endpoint,
                    interests,
                    mapping.is_resolved().then(|| mapping.categories.clone()),
                    method,
                    e.to_string(),
                )
            }
        };

        self.log_in_background(
            record
                .with_client(&context.client_ip, &context.user_agent)
                .with_response_time(context.elapsed_ms()),
        );

        outcome
    }

    async fn search(
        &self,
        interests: &str,
        mapping: &MappingResult,
        scope: Option<&str>,
    ) -> AppResult<DiscoveryOutcome> {
        if !mapping.is_resolved() {
            let config = self.mapper.config();
            return Err(AppError::NoCategoriesResolved {
                interests: interests.to_string(),
                valid_categories: config.taxonomy.labels(),
                hint: config.hint.clone(),
            });
        }

        let listings = self
            .listings
            .find_by_categories(&mapping.categories, scope)
            .await?;

        if listings.is_empty() {
            return Err(AppError::NoResults {
                interests: interests.to_string(),
                mapped_categories: mapping.categories.clone(),
            });
        }

        let window = &listings[..listings.len().min(RESULT_WINDOW)];
        let results = self.enricher.enrich(window).await;

        tracing::info!(
            interests = %interests,
            categories = ?mapping.categories,
            total_matching = listings.len(),
            returned = results.len(),
            "Discovery completed"
        );

        Ok(DiscoveryOutcome {
            interests: interests.to_string(),
            mapping: mapping.clone(),
            total_matching: listings.len(),
            results,
        })
    }

    fn log_in_background(&self, record: CallLogRecord) {
        let call_logs = Arc::clone(&self.call_logs);
        tokio::spawn(async move {
            if let Err(e) = call_logs.record(&record).await {
                tracing::warn!(error = %e, endpoint = %record.endpoint, "Failed to write call log");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{InMemoryCallLogStore, InMemoryListingStore};
    use crate::mapping::{MappingMethod, TaxonomyConfig, TaxonomyVariant};
    use crate::models::{Event, Listing};
    use std::time::Duration;
    use uuid::Uuid;

    fn event(name: &str, category: &str) -> Listing {
        Listing::Event(Event {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: category.to_string(),
            description: None,
            location: Some("Koramangala".to_string()),
            date: None,
            time: None,
            price: None,
            image_url: None,
            booking_link: None,
        })
    }

    fn service(listings: Vec<Listing>) -> (DiscoveryService, Arc<InMemoryCallLogStore>) {
        let config = Arc::new(TaxonomyConfig::for_variant(TaxonomyVariant::Events).unwrap());
        let call_logs = Arc::new(InMemoryCallLogStore::new());
        let service = DiscoveryService::new(
            Arc::new(CategoryMapper::new(config, None)),
            Arc::new(Enricher::new(TaxonomyVariant::Events, None, None)),
            Arc::new(InMemoryListingStore::new(listings)),
            call_logs.clone(),
        );
        (service, call_logs)
    }

    fn context() -> CallContext {
        CallContext::new("/api/v1/discover", "10.0.0.1", "test-agent")
    }

    async fn logged(call_logs: &InMemoryCallLogStore) -> Vec<CallLogRecord> {
        for _ in 0..50 {
            let entries = call_logs.entries().await;
            if !entries.is_empty() {
                return entries;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        Vec::new()
    }

    #[tokio::test]
    async fn test_window_caps_results_at_five() {
        let listings = (0..7).map(|i| event(&format!("Gig {}", i), "concert")).collect();
        let (service, call_logs) = service(listings);

        let outcome = service.discover("live music", None, &context()).await.unwrap();

        assert_eq!(outcome.total_matching, 7);
        assert_eq!(outcome.results.len(), RESULT_WINDOW);
        assert_eq!(outcome.results[0].details.name(), "Gig 0");
        assert_eq!(outcome.mapping.method, MappingMethod::KeywordFallback);

        let entries = logged(&call_logs).await;
        assert_eq!(entries.len(), 1);
        assert!(entries[0].success);
        assert_eq!(entries[0].total_matching, 7);
        assert_eq!(entries[0].selected_name.as_deref(), Some("Gig 0"));
        assert_eq!(entries[0].client_ip, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_unmappable_interests_are_rejected() {
        let (service, call_logs) = service(vec![event("Gig", "concert")]);

        let result = service.discover("xyzzy", None, &context()).await;

        match result {
            Err(AppError::NoCategoriesResolved {
                valid_categories, ..
            }) => assert_eq!(valid_categories.len(), 9),
            other => panic!("expected NoCategoriesResolved, got {:?}", other.map(|o| o.interests)),
        }

        let entries = logged(&call_logs).await;
        assert!(!entries[0].success);
        assert_eq!(entries[0].mapped_categories, None);
        assert_eq!(entries[0].mapping_method, "keyword_fallback");
    }

    #[tokio::test]
    async fn test_no_listings_is_distinct_from_no_categories() {
        let (service, call_logs) = service(vec![event("Gig", "concert")]);

        let result = service.discover("standup comedy", None, &context()).await;

        match result {
            Err(AppError::NoResults {
                mapped_categories, ..
            }) => assert_eq!(mapped_categories, vec!["comedy"]),
            other => panic!("expected NoResults, got {:?}", other.map(|o| o.interests)),
        }

        let entries = logged(&call_logs).await;
        assert_eq!(entries[0].mapped_categories, Some(vec!["comedy".to_string()]));
        assert_eq!(entries[0].total_matching, 0);
    }

    #[tokio::test]
    async fn test_scope_narrows_listings() {
        let (service, _) = service(vec![event("Gig", "concert")]);

        let result = service.discover("music", Some("Whitefield"), &context()).await;
        assert!(matches!(result, Err(AppError::NoResults { .. })));

        let outcome = service.discover("music", Some("kora"), &context()).await.unwrap();
        assert_eq!(outcome.results.len(), 1);
    }

    #[tokio::test]
    async fn test_every_result_has_a_suggestion() {
        let (service, _) = service(vec![event("Gig", "concert"), event("Feast", "food")]);

        let outcome = service.discover("music and food", None, &context()).await.unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.results.iter().all(|s| !s.suggestion.is_empty()));
    }
}
