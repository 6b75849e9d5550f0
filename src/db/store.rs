//! Storage traits the services depend on.
//!
//! PostgreSQL backs these in production; [`crate::db::memory`] provides
//! in-process versions for tests and the `memory` store backend.

use std::collections::HashSet;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        CallLogRecord, Listing, PreferencesUpdate, SearchHistoryEntry, SearchRecord, UserPreferences,
        UserProfile,
    },
};

/// Query collaborator for the deployed variant's records
#[async_trait::async_trait]
pub trait ListingStore: Send + Sync {
    /// Records whose category equals `category`, restricted to `scope` when given
    async fn find_by_category(&self, category: &str, scope: Option<&str>) -> AppResult<Vec<Listing>>;

    /// Union of [`find_by_category`](Self::find_by_category) over `categories`,
    /// in category order, keeping the first occurrence of each record id
    async fn find_by_categories(
        &self,
        categories: &[String],
        scope: Option<&str>,
    ) -> AppResult<Vec<Listing>> {
        let mut seen = HashSet::new();
        let mut listings = Vec::new();

        for category in categories {
            for listing in self.find_by_category(category, scope).await? {
                if seen.insert(listing.id()) {
                    listings.push(listing);
                }
            }
        }

        Ok(listings)
    }
}

/// Users and their search history
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the user for `phone_number`, creating it if needed; refreshes `last_active`
    async fn get_or_create(&self, phone_number: &str, username: Option<&str>) -> AppResult<UserProfile>;

    async fn find_by_phone(&self, phone_number: &str) -> AppResult<Option<UserProfile>>;

    /// Appends a history row and merges the search into the user's counters.
    ///
    /// The counter merge is a single conditional update so concurrent
    /// searches by the same user never lose increments.
    async fn record_search(&self, user_id: Uuid, search: &SearchRecord) -> AppResult<()>;

    /// Newest first
    async fn recent_searches(&self, user_id: Uuid, limit: usize) -> AppResult<Vec<SearchHistoryEntry>>;

    /// Stored manual preferences, `None` if never set
    async fn preferences(&self, user_id: Uuid) -> AppResult<Option<UserPreferences>>;

    /// Writes the fields present in `update`, creating the row on first use
    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: &PreferencesUpdate,
    ) -> AppResult<UserPreferences>;
}

/// Sink for per-call discovery analytics
#[async_trait::async_trait]
pub trait CallLogStore: Send + Sync {
    async fn record(&self, entry: &CallLogRecord) -> AppResult<()>;
}
