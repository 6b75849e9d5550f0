use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    db::store::{CallLogStore, ListingStore, UserStore},
    error::AppResult,
    mapping::TaxonomyVariant,
    models::{
        CallLogRecord, Event, Listing, PreferencesUpdate, PriceRange, SearchHistoryEntry,
        SearchRecord, TravelPackage, UserPreferences, UserProfile,
    },
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Reads events or travel packages depending on the deployed variant
#[derive(Clone)]
pub struct PgListingStore {
    pool: PgPool,
    variant: TaxonomyVariant,
}

impl PgListingStore {
    pub fn new(pool: PgPool, variant: TaxonomyVariant) -> Self {
        Self { pool, variant }
    }
}

#[async_trait::async_trait]
impl ListingStore for PgListingStore {
    async fn find_by_category(&self, category: &str, scope: Option<&str>) -> AppResult<Vec<Listing>> {
        let listings = match self.variant {
            TaxonomyVariant::Events => sqlx::query_as::<_, Event>(
                r#"
                SELECT id, name, category, description, location, event_date, event_time,
                       price, image_url, booking_link
                FROM events
                WHERE category = $1
                  AND ($2::text IS NULL OR location ILIKE '%' || $2 || '%')
                ORDER BY created_at, id
                "#,
            )
            .bind(category)
            .bind(scope)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Listing::Event)
            .collect::<Vec<_>>(),

            TaxonomyVariant::Packages => sqlx::query_as::<_, TravelPackage>(
                r#"
                SELECT id, name, category, description, destination, duration_days,
                       price, agent_id, image_url, booking_link
                FROM travel_packages
                WHERE category = $1
                  AND ($2::text IS NULL OR agent_id = $2)
                ORDER BY created_at, id
                "#,
            )
            .bind(category)
            .bind(scope)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Listing::Package)
            .collect::<Vec<_>>(),
        };

        tracing::debug!(category = %category, count = listings.len(), "Queried listings");

        Ok(listings)
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    phone_number: String,
    username: String,
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    total_searches: i64,
    favorite_categories: Json<HashMap<String, i64>>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            phone_number: row.phone_number,
            username: row.username,
            created_at: row.created_at,
            last_active: row.last_active,
            total_searches: row.total_searches,
            favorite_categories: row.favorite_categories.0,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PreferencesRow {
    preferred_categories: Vec<String>,
    preferred_locations: Vec<String>,
    preferred_time_slots: Vec<String>,
    price_range: Option<Json<PriceRange>>,
    avoid_categories: Vec<String>,
    updated_at: DateTime<Utc>,
}

impl From<PreferencesRow> for UserPreferences {
    fn from(row: PreferencesRow) -> Self {
        Self {
            preferred_categories: row.preferred_categories,
            preferred_locations: row.preferred_locations,
            preferred_time_slots: row.preferred_time_slots,
            price_range: row.price_range.map(|range| range.0),
            avoid_categories: row.avoid_categories,
            updated_at: Some(row.updated_at),
        }
    }
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserStore for PgUserStore {
    async fn get_or_create(&self, phone_number: &str, username: Option<&str>) -> AppResult<UserProfile> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (phone_number, username)
            VALUES ($1, COALESCE($2, 'User'))
            ON CONFLICT (phone_number) DO UPDATE SET last_active = NOW()
            RETURNING id, phone_number, username, created_at, last_active,
                      total_searches, favorite_categories
            "#,
        )
        .bind(phone_number)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn find_by_phone(&self, phone_number: &str) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, phone_number, username, created_at, last_active,
                   total_searches, favorite_categories
            FROM users
            WHERE phone_number = $1
            "#,
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserProfile::from))
    }

    async fn record_search(&self, user_id: Uuid, search: &SearchRecord) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO user_search_history (user_id, search_query, mapped_categories, results_count)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user_id)
        .bind(&search.query)
        .bind(&search.categories)
        .bind(search.results_count as i64)
        .execute(&mut *tx)
        .await?;

        // Merge +1 per category into the stored counters in one statement;
        // the row lock taken by UPDATE serializes concurrent searches.
        sqlx::query(
            r#"
            UPDATE users
            SET favorite_categories = (
                    SELECT COALESCE(jsonb_object_agg(key, total), '{}'::jsonb)
                    FROM (
                        SELECT key, SUM(value::bigint) AS total
                        FROM (
                            SELECT key, value FROM jsonb_each_text(users.favorite_categories)
                            UNION ALL
                            SELECT category, '1' FROM unnest($2::text[]) AS category
                        ) merged
                        GROUP BY key
                    ) totals
                ),
                total_searches = total_searches + 1,
                last_active = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(&search.categories)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(())
    }

    async fn recent_searches(&self, user_id: Uuid, limit: usize) -> AppResult<Vec<SearchHistoryEntry>> {
        let rows = sqlx::query_as::<_, SearchHistoryEntry>(
            r#"
            SELECT search_query, mapped_categories, search_timestamp, results_count
            FROM user_search_history
            WHERE user_id = $1
            ORDER BY search_timestamp DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn preferences(&self, user_id: Uuid) -> AppResult<Option<UserPreferences>> {
        let row = sqlx::query_as::<_, PreferencesRow>(
            r#"
            SELECT preferred_categories, preferred_locations, preferred_time_slots,
                   price_range, avoid_categories, updated_at
            FROM user_preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(UserPreferences::from))
    }

    async fn update_preferences(
        &self,
        user_id: Uuid,
        update: &PreferencesUpdate,
    ) -> AppResult<UserPreferences> {
        // NULL parameters leave the stored column untouched
        let row = sqlx::query_as::<_, PreferencesRow>(
            r#"
            INSERT INTO user_preferences (
                user_id, preferred_categories, preferred_locations, preferred_time_slots,
                price_range, avoid_categories
            )
            VALUES (
                $1,
                COALESCE($2::text[], '{}'),
                COALESCE($3::text[], '{}'),
                COALESCE($4::text[], '{}'),
                $5::jsonb,
                COALESCE($6::text[], '{}')
            )
            ON CONFLICT (user_id) DO UPDATE SET
                preferred_categories = COALESCE($2::text[], user_preferences.preferred_categories),
                preferred_locations = COALESCE($3::text[], user_preferences.preferred_locations),
                preferred_time_slots = COALESCE($4::text[], user_preferences.preferred_time_slots),
                price_range = COALESCE($5::jsonb, user_preferences.price_range),
                avoid_categories = COALESCE($6::text[], user_preferences.avoid_categories),
                updated_at = NOW()
            RETURNING preferred_categories, preferred_locations, preferred_time_slots,
                      price_range, avoid_categories, updated_at
            "#,
        )
        .bind(user_id)
        .bind(&update.preferred_categories)
        .bind(&update.preferred_locations)
        .bind(&update.preferred_time_slots)
        .bind(update.price_range.map(Json))
        .bind(&update.avoid_categories)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}

#[derive(Clone)]
pub struct PgCallLogStore {
    pool: PgPool,
}

impl PgCallLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CallLogStore for PgCallLogStore {
    async fn record(&self, entry: &CallLogRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO api_logs (
                logged_at, endpoint, interests, mapped_categories, mapping_method,
                total_matching, selected_id, selected_name, selected_category,
                success, error_message, response_time_ms, client_ip, user_agent
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(entry.timestamp)
        .bind(&entry.endpoint)
        .bind(&entry.interests)
        .bind(&entry.mapped_categories)
        .bind(&entry.mapping_method)
        .bind(entry.total_matching)
        .bind(entry.selected_id)
        .bind(&entry.selected_name)
        .bind(&entry.selected_category)
        .bind(entry.success)
        .bind(&entry.error_message)
        .bind(entry.response_time_ms)
        .bind(&entry.client_ip)
        .bind(&entry.user_agent)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
