use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    mapping::MappingMethod,
    middleware::audit::{client_ip, user_agent},
    models::{
        AuditEntry, PreferencesUpdate, SearchHistoryEntry, SearchRecord, UserPreferences, UserProfile,
    },
    services::{
        users::TOP_CATEGORY_COUNT, validate_phone_number, CallContext, DiscoveryOutcome, Suggestion,
    },
};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub success: bool,
    pub text: String,
    pub categories: Vec<String>,
    pub method: MappingMethod,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverRequest {
    pub interests: String,
    pub phone_number: Option<String>,
    /// Location substring for events, agent id for packages
    pub scope: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PersonalizedDiscoverRequest {
    pub interests: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiscoverResponse {
    pub success: bool,
    pub interests: String,
    pub mapped_categories: Vec<String>,
    pub mapping_method: MappingMethod,
    pub total_matching: usize,
    pub returned: usize,
    pub results: Vec<Suggestion>,
    pub ai_generated: bool,
    pub personalized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_top_categories: Option<Vec<String>>,
}

impl DiscoverResponse {
    fn new(outcome: DiscoveryOutcome, ai_generated: bool, personalized: bool) -> Self {
        Self {
            success: true,
            interests: outcome.interests,
            mapped_categories: outcome.mapping.categories,
            mapping_method: outcome.mapping.method,
            total_matching: outcome.total_matching,
            returned: outcome.results.len(),
            results: outcome.results,
            ai_generated,
            personalized,
            user_top_categories: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub phone_number: String,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(flatten)]
    pub user: UserProfile,
    pub top_3_interests: Vec<String>,
}

impl From<UserProfile> for UserResponse {
    fn from(user: UserProfile) -> Self {
        Self {
            top_3_interests: user.top_categories(TOP_CATEGORY_COUNT),
            user,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: UserResponse,
    pub preferences: UserPreferences,
    pub recent_searches: Vec<SearchHistoryEntry>,
}

#[derive(Debug, Serialize)]
pub struct PreferencesResponse {
    pub success: bool,
    pub message: String,
    pub preferences: UserPreferences,
}

#[derive(Debug, Deserialize)]
pub struct LogFilter {
    /// "success" or "error"
    pub status: Option<String>,
    /// Substring of the request path
    pub path: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LogSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub avg_duration_ms: f64,
}

impl LogSummary {
    fn of(entries: &[AuditEntry]) -> Self {
        let successful = entries.iter().filter(|e| e.success).count();
        let avg_duration_ms = if entries.is_empty() {
            0.0
        } else {
            entries.iter().map(|e| e.duration_ms).sum::<f64>() / entries.len() as f64
        };

        Self {
            total: entries.len(),
            successful,
            failed: entries.len() - successful,
            avg_duration_ms,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub total_logs: usize,
    pub summary: LogSummary,
    pub logs: Vec<AuditEntry>,
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": "Welcome to Spotive API!",
        "service": state.info.as_ref(),
        "endpoints": {
            "resolve_categories": "POST /api/v1/categories/resolve",
            "discover": "POST /api/v1/discover",
            "register_user": "POST /api/v1/users/register",
            "user_profile": "GET /api/v1/users/{phone_number}",
            "update_preferences": "PUT /api/v1/users/{phone_number}/preferences",
            "personalized_discover": "POST /api/v1/users/{phone_number}/discover",
            "logs": "GET /api/v1/logs",
        }
    }))
}

/// Maps text to categories without querying listings
pub async fn resolve_categories(
    State(state): State<AppState>,
    Json(payload): Json<ResolveRequest>,
) -> Json<ResolveResponse> {
    let mapping = state.discovery.mapper().resolve(&payload.text).await;

    Json(ResolveResponse {
        success: true,
        text: payload.text,
        categories: mapping.categories,
        method: mapping.method,
    })
}

fn call_context(endpoint: &str, headers: &HeaderMap, peer: Option<ConnectInfo<SocketAddr>>) -> CallContext {
    CallContext::new(
        endpoint,
        &client_ip(headers, peer.map(|info| info.0)),
        &user_agent(headers),
    )
}

/// Tracks successful and empty searches; other failures are not tracked
async fn track_outcome(
    state: &AppState,
    phone_number: &str,
    query: &str,
    result: &AppResult<DiscoveryOutcome>,
) {
    let search = match result {
        Ok(outcome) => SearchRecord {
            query: query.to_string(),
            categories: outcome.mapping.categories.clone(),
            results_count: outcome.total_matching,
        },
        Err(AppError::NoResults {
            mapped_categories, ..
        }) => SearchRecord {
            query: query.to_string(),
            categories: mapped_categories.clone(),
            results_count: 0,
        },
        Err(_) => return,
    };

    state.users.track_search(phone_number, search).await;
}

pub async fn discover(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<DiscoverRequest>,
) -> AppResult<Json<DiscoverResponse>> {
    let context = call_context("/api/v1/discover", &headers, peer);
    let scope = payload.scope.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let result = state
        .discovery
        .discover(&payload.interests, scope, &context)
        .await;

    let phone_number = payload
        .phone_number
        .as_deref()
        .filter(|p| validate_phone_number(p));
    if let Some(phone_number) = phone_number {
        track_outcome(&state, phone_number, &payload.interests, &result).await;
    }

    let outcome = result?;
    Ok(Json(DiscoverResponse::new(
        outcome,
        state.info.llm_available,
        phone_number.is_some(),
    )))
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<RegisterResponse>> {
    let user = state
        .users
        .register(&payload.phone_number, payload.username.as_deref())
        .await?;

    let message = if user.total_searches == 0 {
        "User registered successfully"
    } else {
        "Welcome back!"
    };

    Ok(Json(RegisterResponse {
        success: true,
        message: message.to_string(),
        user: user.into(),
    }))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(phone_number): Path<String>,
) -> AppResult<Json<ProfileResponse>> {
    let view = state.users.profile(&phone_number).await?;

    Ok(Json(ProfileResponse {
        success: true,
        user: UserResponse {
            user: view.user,
            top_3_interests: view.top_categories,
        },
        preferences: view.preferences,
        recent_searches: view.recent_searches,
    }))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    Path(phone_number): Path<String>,
    Json(payload): Json<PreferencesUpdate>,
) -> AppResult<Json<PreferencesResponse>> {
    let preferences = state
        .users
        .update_preferences(&phone_number, &payload)
        .await?;

    Ok(Json(PreferencesResponse {
        success: true,
        message: "Preferences updated successfully".to_string(),
        preferences,
    }))
}

/// Discovery using the caller's accumulated categories alongside any interests given
pub async fn personalized_discover(
    State(state): State<AppState>,
    Path(phone_number): Path<String>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Json(payload): Json<PersonalizedDiscoverRequest>,
) -> AppResult<Json<DiscoverResponse>> {
    let context = call_context("/api/v1/users/discover", &headers, peer);

    let (interests, top_categories) = state
        .users
        .personalized_interests(&phone_number, payload.interests.as_deref())
        .await?;
    let scope = payload.scope.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let result = state.discovery.discover(&interests, scope, &context).await;
    track_outcome(&state, &phone_number, &interests, &result).await;

    let mut response = DiscoverResponse::new(result?, state.info.llm_available, true);
    response.user_top_categories = Some(top_categories);
    Ok(Json(response))
}

pub async fn get_logs(
    State(state): State<AppState>,
    Query(filter): Query<LogFilter>,
) -> AppResult<Json<LogsResponse>> {
    let wanted_success = match filter.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some("success") => Some(true),
        Some("error") => Some(false),
        Some(other) => {
            return Err(AppError::InvalidInput(format!(
                "Unknown status filter '{}'. Use success, error or all",
                other
            )))
        }
    };

    let logs: Vec<AuditEntry> = state
        .audit_log
        .snapshot()
        .into_iter()
        .filter(|e| wanted_success.map_or(true, |s| e.success == s))
        .filter(|e| {
            filter
                .path
                .as_deref()
                .map_or(true, |p| e.path.contains(p))
        })
        .collect();

    Ok(Json(LogsResponse {
        total_logs: logs.len(),
        summary: LogSummary::of(&logs),
        logs,
    }))
}

pub async fn clear_logs(State(state): State<AppState>) -> Json<Value> {
    state.audit_log.clear();
    tracing::info!("Audit log cleared");
    Json(json!({ "success": true, "message": "All audit logs cleared" }))
}
