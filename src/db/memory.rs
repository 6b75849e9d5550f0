//! In-process store implementations.

use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    db::store::{CallLogStore, ListingStore, UserStore},
    error::{AppError, AppResult},
    models::{
        CallLogRecord, Listing, PreferencesUpdate, SearchHistoryEntry, SearchRecord, UserPreferences,
        UserProfile,
    },
};

/// Listings held in a vector, returned in insertion order
#[derive(Default)]
pub struct InMemoryListingStore {
    listings: RwLock<Vec<Listing>>,
}

impl InMemoryListingStore {
    pub fn new(listings: Vec<Listing>) -> Self {
        Self {
            listings: RwLock::new(listings),
        }
    }

    pub async fn insert(&self, listing: Listing) {
        self.listings.write().await.push(listing);
    }
}

#[async_trait::async_trait]
impl ListingStore for InMemoryListingStore {
    async fn find_by_category(&self, category: &str, scope: Option<&str>) -> AppResult<Vec<Listing>> {
        let listings = self.listings.read().await;
        Ok(listings
            .iter()
            .filter(|l| l.category() == category && l.in_scope(scope))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct UserTables {
    users: HashMap<String, UserProfile>,
    history: HashMap<Uuid, Vec<SearchHistoryEntry>>,
    preferences: HashMap<Uuid, UserPreferences>,
}

/// Users keyed by phone number; every mutation happens under one write lock
#[derive(Default)]
pub struct InMemoryUserStore {
    tables: RwLock<UserTables>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_or_create(&self, phone_number: &str, username: Option<&str>) -> AppResult<UserProfile> {
        let mut tables = self.tables.write().await;
        let user = tables
            .users
            .entry(phone_number.to_string())
            .and_modify(|u| u.last_active = Utc::now())
            .or_insert_with(|| {
                UserProfile::new(phone_number.to_string(), username.map(str::to_string))
            });
        Ok(user.clone())
    }

    async fn find_by_phone(&self, phone_number: &str) -> AppResult<Option<UserProfile>> {
        Ok(self.tables.read().await.users.get(phone_number).cloned())
    }

    async fn record_search(&self, user_id: Uuid, search: &SearchRecord) -> AppResult<()> {
        let mut tables = self.tables.write().await;

        let user = tables
            .users
            .values_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;
        user.accumulate(&search.categories);

        tables
            .history
            .entry(user_id)
            .or_default()
            .push(SearchHistoryEntry {
                query: search.query.clone(),
                categories: search.categories.clone(),
                timestamp: Utc::now(),
                results_count: search.results_count as i64,
            });

        Ok(())
    }

    async fn recent_searches(&self, user_id: Uuid, limit: usize) -> AppResult<Vec<SearchHistoryEntry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .history
            .get(&user_id)
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn preferences(&self, user_id: Uuid) -> AppResult<Option<UserPreferences>> {
        Ok(self.tables.read().await.preferences.get(&user_id).cloned())
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: &PreferencesUpdate,
    ) -> AppResult<UserPreferences> {
        let mut tables = self.tables.write().await;

        if !tables.users.values().any(|u| u.id == user_id) {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }

        let preferences = tables.preferences.entry(user_id).or_default();
        update.apply_to(preferences);
        Ok(preferences.clone())
    }
}

#[derive(Default)]
pub struct InMemoryCallLogStore {
    entries: RwLock<Vec<CallLogRecord>>,
}

impl InMemoryCallLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<CallLogRecord> {
        self.entries.read().await.clone()
    }
}

#[async_trait::async_trait]
impl CallLogStore for InMemoryCallLogStore {
    async fn record(&self, entry: &CallLogRecord) -> AppResult<()> {
        self.entries.write().await.push(entry.clone());
        Ok(())
    }
}
