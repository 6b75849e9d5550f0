use std::sync::Arc;

use serde::Serialize;

use crate::{
    config::Config,
    db::{
        redis::Cache,
        store::{CallLogStore, ListingStore, UserStore},
        InMemoryCallLogStore, InMemoryListingStore, InMemoryUserStore,
    },
    mapping::{CategoryMapper, TaxonomyConfig, TaxonomyError, TaxonomyVariant},
    middleware::{AuditSink, RingBufferAuditLog},
    models::Listing,
    services::{providers::LanguageModel, DiscoveryService, Enricher, UserService},
};

/// What the root endpoint reports about this deployment
#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub variant: TaxonomyVariant,
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_available: bool,
    pub suggestion_cache: bool,
}

/// Storage collaborators chosen at startup
pub struct Backends {
    pub listings: Arc<dyn ListingStore>,
    pub users: Arc<dyn UserStore>,
    pub call_logs: Arc<dyn CallLogStore>,
    pub cache: Option<Cache>,
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub info: Arc<ServiceInfo>,
    pub discovery: Arc<DiscoveryService>,
    pub users: Arc<UserService>,
    pub audit_log: Arc<dyn AuditSink>,
}

impl AppState {
    /// Wires the services for `config`; fails only on an invalid taxonomy
    pub fn new(
        config: &Config,
        model: Option<Arc<dyn LanguageModel>>,
        backends: Backends,
    ) -> Result<Self, TaxonomyError> {
        let info = ServiceInfo {
            variant: config.taxonomy_variant,
            llm_provider: config.llm_provider.as_str().to_string(),
            llm_model: config.model_id(),
            llm_available: model.is_some(),
            suggestion_cache: backends.cache.is_some(),
        };

        Self::assemble(
            info,
            model,
            backends,
            Arc::new(RingBufferAuditLog::new(config.audit_log_capacity)),
        )
    }

    /// Fully in-process state for tests and local runs
    pub fn in_memory(
        variant: TaxonomyVariant,
        model: Option<Arc<dyn LanguageModel>>,
        listings: Vec<Listing>,
    ) -> Result<Self, TaxonomyError> {
        let info = ServiceInfo {
            variant,
            llm_provider: if model.is_some() { "custom" } else { "none" }.to_string(),
            llm_model: String::new(),
            llm_available: model.is_some(),
            suggestion_cache: false,
        };

        let backends = Backends {
            listings: Arc::new(InMemoryListingStore::new(listings)),
            users: Arc::new(InMemoryUserStore::new()),
            call_logs: Arc::new(InMemoryCallLogStore::new()),
            cache: None,
        };

        Self::assemble(info, model, backends, Arc::new(RingBufferAuditLog::new(1000)))
    }

    fn assemble(
        info: ServiceInfo,
        model: Option<Arc<dyn LanguageModel>>,
        backends: Backends,
        audit_log: Arc<dyn AuditSink>,
    ) -> Result<Self, TaxonomyError> {
        let taxonomy = Arc::new(TaxonomyConfig::for_variant(info.variant)?);
        let mapper = Arc::new(CategoryMapper::new(taxonomy, model.clone()));
        let enricher = Arc::new(Enricher::new(info.variant, model, backends.cache));

        let discovery = DiscoveryService::new(mapper, enricher, backends.listings, backends.call_logs);

        Ok(Self {
            info: Arc::new(info),
            discovery: Arc::new(discovery),
            users: Arc::new(UserService::new(backends.users)),
            audit_log,
        })
    }
}
