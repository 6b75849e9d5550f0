use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

use crate::{
    db::store::UserStore,
    error::{AppError, AppResult},
    models::{PreferencesUpdate, SearchHistoryEntry, SearchRecord, UserPreferences, UserProfile},
};

/// How many of a user's categories feed personalization and profile output
pub const TOP_CATEGORY_COUNT: usize = 3;

/// Searches shown on a profile
pub const RECENT_SEARCH_LIMIT: usize = 10;

lazy_static! {
    static ref PHONE_NUMBER: Regex = Regex::new(r"^\+91[6-9][0-9]{9}$").unwrap();
}

/// Indian mobile number in `+91XXXXXXXXXX` form
pub fn validate_phone_number(phone_number: &str) -> bool {
    PHONE_NUMBER.is_match(phone_number)
}

fn require_valid_phone(phone_number: &str) -> AppResult<()> {
    if validate_phone_number(phone_number) {
        Ok(())
    } else {
        Err(AppError::InvalidInput(
            "Invalid phone number format. Use: +91XXXXXXXXXX (10 digits after +91)".to_string(),
        ))
    }
}

/// Joins explicit interests with the user's top categories.
///
/// Returns `None` when there is nothing to search for.
pub fn combine_interests(interests: Option<&str>, top_categories: &[String]) -> Option<String> {
    let interests = interests.map(str::trim).filter(|s| !s.is_empty());

    match (interests, top_categories.is_empty()) {
        (None, true) => None,
        (None, false) => Some(top_categories.join(", ")),
        (Some(text), true) => Some(text.to_string()),
        (Some(text), false) => Some(format!("{}, {}", text, top_categories.join(", "))),
    }
}

/// A profile with the derived fields the API returns
#[derive(Debug, Clone)]
pub struct ProfileView {
    pub user: UserProfile,
    pub top_categories: Vec<String>,
    /// Empty defaults when nothing has been set
    pub preferences: UserPreferences,
    pub recent_searches: Vec<SearchHistoryEntry>,
}

pub struct UserService {
    store: Arc<dyn UserStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, phone_number: &str, username: Option<&str>) -> AppResult<UserProfile> {
        require_valid_phone(phone_number)?;
        let user = self.store.get_or_create(phone_number, username).await?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    async fn existing_user(&self, phone_number: &str) -> AppResult<UserProfile> {
        require_valid_phone(phone_number)?;

        self.store
            .find_by_phone(phone_number)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(
                    "User not found. Please register first at /api/v1/users/register".to_string(),
                )
            })
    }

    pub async fn profile(&self, phone_number: &str) -> AppResult<ProfileView> {
        let user = self.existing_user(phone_number).await?;

        let recent_searches = self
            .store
            .recent_searches(user.id, RECENT_SEARCH_LIMIT)
            .await?;
        let preferences = self.store.preferences(user.id).await?.unwrap_or_default();

        Ok(ProfileView {
            top_categories: user.top_categories(TOP_CATEGORY_COUNT),
            user,
            preferences,
            recent_searches,
        })
    }

    /// Applies a partial preference update for a registered user
    pub async fn update_preferences(
        &self,
        phone_number: &str,
        update: &PreferencesUpdate,
    ) -> AppResult<UserPreferences> {
        let user = self.existing_user(phone_number).await?;
        let preferences = self.store.update_preferences(user.id, update).await?;

        tracing::info!(user_id = %user.id, "User preferences updated");
        Ok(preferences)
    }

    /// Interests to search with for a known caller, creating the user if needed.
    ///
    /// Returns the combined text and the user's top categories.
    pub async fn personalized_interests(
        &self,
        phone_number: &str,
        interests: Option<&str>,
    ) -> AppResult<(String, Vec<String>)> {
        require_valid_phone(phone_number)?;

        let user = self.store.get_or_create(phone_number, None).await?;
        let top_categories = user.top_categories(TOP_CATEGORY_COUNT);

        let combined = combine_interests(interests, &top_categories).ok_or_else(|| {
            AppError::InvalidInput(
                "No interests provided and user has no search history. \
                 Please provide interests or make some searches first."
                    .to_string(),
            )
        })?;

        Ok((combined, top_categories))
    }

    /// Records a search against `phone_number`.
    ///
    /// Invalid numbers are ignored and storage failures are only logged, so
    /// tracking never affects the caller's response.
    pub async fn track_search(&self, phone_number: &str, search: SearchRecord) {
        if !validate_phone_number(phone_number) {
            tracing::debug!("Skipping search tracking for invalid phone number");
            return;
        }

        let result = async {
            let user = self.store.get_or_create(phone_number, None).await?;
            self.store.record_search(user.id, &search).await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(error = %e, query = %search.query, "Failed to track user search");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::InMemoryUserStore;

    const PHONE: &str = "+919876543210";

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryUserStore::new()))
    }

    fn search(query: &str, categories: &[&str]) -> SearchRecord {
        SearchRecord {
            query: query.to_string(),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            results_count: 1,
        }
    }

    #[test]
    fn test_validate_phone_number() {
        assert!(validate_phone_number("+919876543210"));
        assert!(validate_phone_number("+916000000000"));
        assert!(!validate_phone_number("+915876543210"));
        assert!(!validate_phone_number("9876543210"));
        assert!(!validate_phone_number("+91987654321"));
        assert!(!validate_phone_number("+9198765432100"));
        assert!(!validate_phone_number("+91 9876543210"));
    }

    #[test]
    fn test_combine_interests() {
        let top = vec!["comedy".to_string(), "food".to_string()];

        assert_eq!(combine_interests(Some("music"), &top).as_deref(), Some("music, comedy, food"));
        assert_eq!(combine_interests(Some("  "), &top).as_deref(), Some("comedy, food"));
        assert_eq!(combine_interests(None, &top).as_deref(), Some("comedy, food"));
        assert_eq!(combine_interests(Some("music"), &[]).as_deref(), Some("music"));
        assert_eq!(combine_interests(None, &[]), None);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_phone() {
        let result = service().register("12345", Some("Asha")).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_profile_of_unknown_user_is_not_found() {
        let result = service().profile(PHONE).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_tracked_searches_shape_the_profile() {
        let service = service();
        service.register(PHONE, Some("Asha")).await.unwrap();

        service.track_search(PHONE, search("standup", &["comedy"])).await;
        service.track_search(PHONE, search("comedy and food", &["comedy", "food"])).await;
        service.track_search(PHONE, search("temples", &["spiritual"])).await;

        let view = service.profile(PHONE).await.unwrap();
        assert_eq!(view.user.total_searches, 3);
        assert_eq!(view.top_categories, vec!["comedy", "food", "spiritual"]);
        assert_eq!(view.recent_searches.len(), 3);
        assert_eq!(view.recent_searches[0].query, "temples");
    }

    #[tokio::test]
    async fn test_update_preferences() {
        let service = service();
        let update = PreferencesUpdate {
            preferred_locations: Some(vec!["Indiranagar".to_string()]),
            ..Default::default()
        };

        let result = service.update_preferences("12345", &update).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        let result = service.update_preferences(PHONE, &update).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        service.register(PHONE, None).await.unwrap();
        assert_eq!(service.profile(PHONE).await.unwrap().preferences, UserPreferences::default());

        service.update_preferences(PHONE, &update).await.unwrap();
        let view = service.profile(PHONE).await.unwrap();
        assert_eq!(view.preferences.preferred_locations, vec!["Indiranagar"]);
        assert!(view.preferences.preferred_categories.is_empty());
    }

    #[tokio::test]
    async fn test_track_search_ignores_invalid_phone() {
        let service = service();
        service.track_search("not-a-phone", search("music", &["concert"])).await;
        assert!(matches!(service.profile(PHONE).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_personalized_interests() {
        let service = service();

        let result = service.personalized_interests(PHONE, None).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));

        service.track_search(PHONE, search("standup", &["comedy"])).await;

        let (combined, top) = service.personalized_interests(PHONE, Some("music")).await.unwrap();
        assert_eq!(combined, "music, comedy");
        assert_eq!(top, vec!["comedy"]);

        let (combined, _) = service.personalized_interests(PHONE, None).await.unwrap();
        assert_eq!(combined, "comedy");
    }
}
