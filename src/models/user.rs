use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A caller identified by phone number, with accumulated category counts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub phone_number: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub total_searches: i64,
    pub favorite_categories: HashMap<String, i64>,
}

impl UserProfile {
    pub fn new(phone_number: String, username: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            phone_number,
            username: username.unwrap_or_else(|| "User".to_string()),
            created_at: now,
            last_active: now,
            total_searches: 0,
            favorite_categories: HashMap::new(),
        }
    }

    /// Most searched categories, highest count first; ties broken by label
    pub fn top_categories(&self, limit: usize) -> Vec<String> {
        let mut counts: Vec<(&String, &i64)> = self.favorite_categories.iter().collect();
        counts.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        counts
            .into_iter()
            .take(limit)
            .map(|(label, _)| label.clone())
            .collect()
    }

    /// Adds one search worth of categories to the counters
    pub fn accumulate(&mut self, categories: &[String]) {
        for category in categories {
            *self.favorite_categories.entry(category.clone()).or_insert(0) += 1;
        }
        self.total_searches += 1;
        self.last_active = Utc::now();
    }
}

/// Inclusive price bounds a caller is comfortable with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PriceRange {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

/// Preferences a caller sets by hand, kept apart from the accumulated counters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserPreferences {
    pub preferred_categories: Vec<String>,
    pub preferred_locations: Vec<String>,
    /// e.g. morning, afternoon, evening, weekend
    pub preferred_time_slots: Vec<String>,
    pub price_range: Option<PriceRange>,
    pub avoid_categories: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial update; only the fields present are written
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct PreferencesUpdate {
    pub preferred_categories: Option<Vec<String>>,
    pub preferred_locations: Option<Vec<String>>,
    pub preferred_time_slots: Option<Vec<String>>,
    pub price_range: Option<PriceRange>,
    pub avoid_categories: Option<Vec<String>>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Overwrites the fields present in `self` and stamps `updated_at`
    pub fn apply_to(&self, preferences: &mut UserPreferences) {
        if let Some(categories) = &self.preferred_categories {
            preferences.preferred_categories = categories.clone();
        }
        if let Some(locations) = &self.preferred_locations {
            preferences.preferred_locations = locations.clone();
        }
        if let Some(slots) = &self.preferred_time_slots {
            preferences.preferred_time_slots = slots.clone();
        }
        if let Some(range) = self.price_range {
            preferences.price_range = Some(range);
        }
        if let Some(avoid) = &self.avoid_categories {
            preferences.avoid_categories = avoid.clone();
        }
        preferences.updated_at = Some(Utc::now());
    }
}

/// A search to be recorded against a user
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRecord {
    pub query: String,
    pub categories: Vec<String>,
    pub results_count: usize,
}

/// A past search as stored in the history table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct SearchHistoryEntry {
    #[sqlx(rename = "search_query")]
    pub query: String,
    #[sqlx(rename = "mapped_categories")]
    pub categories: Vec<String>,
    #[sqlx(rename = "search_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub results_count: i64,
}
