use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use uuid::Uuid;

use spotive_api::{
    api::{create_router, AppState},
    error::AppResult,
    mapping::TaxonomyVariant,
    models::{Event, Listing, TravelPackage},
    services::providers::{ChatPrompt, LanguageModel},
};

const PHONE: &str = "+919876543210";

/// Answers category prompts with a fixed reply and everything else with a blurb
struct ScriptedModel {
    categories: &'static str,
}

#[async_trait::async_trait]
impl LanguageModel for ScriptedModel {
    async fn invoke(&self, prompt: &ChatPrompt) -> AppResult<String> {
        if prompt.system.contains("category mapping") {
            Ok(self.categories.to_string())
        } else {
            Ok("You'll love this one, trust me!".to_string())
        }
    }
}

fn event(name: &str, category: &str, location: &str) -> Listing {
    Listing::Event(Event {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category: category.to_string(),
        description: Some(format!("{} in Bangalore.", name)),
        location: Some(location.to_string()),
        date: Some("2025-03-01".to_string()),
        time: Some("7 PM".to_string()),
        price: Some("₹499".to_string()),
        image_url: None,
        booking_link: None,
    })
}

fn package(name: &str, category: &str, agent_id: &str) -> Listing {
    Listing::Package(TravelPackage {
        id: Uuid::new_v4(),
        name: name.to_string(),
        category: category.to_string(),
        description: None,
        destination: Some("Goa".to_string()),
        duration_days: Some(4),
        price: Some("₹24,999".to_string()),
        agent_id: Some(agent_id.to_string()),
        image_url: None,
        booking_link: None,
    })
}

fn events() -> Vec<Listing> {
    vec![
        event("Laugh Riot", "comedy", "Indiranagar"),
        event("Jazz Night", "concert", "Koramangala"),
        event("Rock Fest", "concert", "Whitefield"),
        event("Biryani Trail", "food", "Koramangala"),
    ]
}

fn create_test_server(model: Option<Arc<dyn LanguageModel>>, listings: Vec<Listing>) -> TestServer {
    let state = AppState::in_memory(TaxonomyVariant::Events, model, listings).unwrap();
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

fn keyword_server() -> TestServer {
    create_test_server(None, events())
}

fn scripted(categories: &'static str) -> Option<Arc<dyn LanguageModel>> {
    Some(Arc::new(ScriptedModel { categories }))
}

#[tokio::test]
async fn test_health_check() {
    let server = keyword_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_root_reports_deployment() {
    let server = keyword_server();
    let body: Value = server.get("/").await.json();

    assert_eq!(body["service"]["variant"], "events");
    assert_eq!(body["service"]["llm_available"], false);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let server = keyword_server();
    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("call-123"),
        )
        .await;

    assert_eq!(response.header("x-request-id"), "call-123");
}

#[tokio::test]
async fn test_resolve_categories_with_keywords() {
    let server = keyword_server();
    let response = server
        .post("/api/v1/categories/resolve")
        .json(&json!({ "text": "I love standup and live music" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["categories"], json!(["concert", "comedy"]));
    assert_eq!(body["method"], "keyword_fallback");
}

#[tokio::test]
async fn test_discover_with_model() {
    let server = create_test_server(scripted(r#"["comedy"]"#), events());
    let response = server
        .post("/api/v1/discover")
        .json(&json!({ "interests": "something funny" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["mapped_categories"], json!(["comedy"]));
    assert_eq!(body["mapping_method"], "llm");
    assert_eq!(body["total_matching"], 1);
    assert_eq!(body["results"][0]["suggestion"], "You'll love this one, trust me!");
    assert_eq!(body["results"][0]["details"]["name"], "Laugh Riot");
    assert_eq!(body["ai_generated"], true);
    assert_eq!(body["personalized"], false);
}

#[tokio::test]
async fn test_discover_falls_back_when_model_overreaches() {
    let server = create_test_server(
        scripted(r#"["comedy", "concert", "food", "kids", "sports"]"#),
        events(),
    );
    let body: Value = server
        .post("/api/v1/discover")
        .json(&json!({ "interests": "biryani and food" }))
        .await
        .json();

    assert_eq!(body["mapping_method"], "keyword_fallback");
    assert_eq!(body["mapped_categories"], json!(["food"]));
    assert_eq!(body["results"][0]["details"]["name"], "Biryani Trail");
}

#[tokio::test]
async fn test_discover_without_model_uses_templated_suggestions() {
    let server = keyword_server();
    let body: Value = server
        .post("/api/v1/discover")
        .json(&json!({ "interests": "live music" }))
        .await
        .json();

    assert_eq!(body["total_matching"], 2);
    assert_eq!(body["returned"], 2);
    assert_eq!(
        body["results"][0]["suggestion"],
        "Check out Jazz Night at Koramangala! Jazz Night in Bangalore. It's on 2025-03-01 at 7 PM."
    );
}

#[tokio::test]
async fn test_discover_applies_scope() {
    let server = keyword_server();
    let body: Value = server
        .post("/api/v1/discover")
        .json(&json!({ "interests": "live music", "scope": "whitefield" }))
        .await
        .json();

    assert_eq!(body["total_matching"], 1);
    assert_eq!(body["results"][0]["details"]["name"], "Rock Fest");
}

#[tokio::test]
async fn test_discover_unmappable_interests() {
    let server = keyword_server();
    let response = server
        .post("/api/v1/discover")
        .json(&json!({ "interests": "quantum knitting" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["success"], false);
    assert_eq!(body["valid_categories"].as_array().unwrap().len(), 9);
    assert!(body["hint"].as_str().unwrap().contains("comedy"));
}

#[tokio::test]
async fn test_discover_no_results() {
    let server = keyword_server();
    let response = server
        .post("/api/v1/discover")
        .json(&json!({ "interests": "temple visits" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["mapped_categories"], json!(["spiritual"]));
}

#[tokio::test]
async fn test_register_rejects_invalid_phone() {
    let server = keyword_server();
    let response = server
        .post("/api/v1/users/register")
        .json(&json!({ "phone_number": "12345", "username": "Asha" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let server = keyword_server();
    let response = server.get(&format!("/api/v1/users/{}", PHONE)).await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_searches_accumulate_on_profile() {
    let server = keyword_server();

    let response = server
        .post("/api/v1/users/register")
        .json(&json!({ "phone_number": PHONE, "username": "Asha" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "User registered successfully");

    for interests in ["standup comedy", "comedy and live music", "temple visits"] {
        server
            .post("/api/v1/discover")
            .json(&json!({ "interests": interests, "phone_number": PHONE }))
            .await;
    }

    let response = server.get(&format!("/api/v1/users/{}", PHONE)).await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["user"]["username"], "Asha");
    assert_eq!(body["user"]["total_searches"], 3);
    assert_eq!(body["user"]["favorite_categories"]["comedy"], 2);
    assert_eq!(body["user"]["top_3_interests"], json!(["comedy", "concert", "spiritual"]));
    assert_eq!(body["recent_searches"].as_array().unwrap().len(), 3);
    assert_eq!(body["recent_searches"][0]["query"], "temple visits");
    assert_eq!(body["recent_searches"][0]["results_count"], 0);
}

#[tokio::test]
async fn test_update_preferences() {
    let server = keyword_server();
    let path = format!("/api/v1/users/{}/preferences", PHONE);

    let response = server
        .put("/api/v1/users/12345/preferences")
        .json(&json!({ "preferred_categories": ["comedy"] }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .put(&path)
        .json(&json!({ "preferred_categories": ["comedy"] }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    server
        .post("/api/v1/users/register")
        .json(&json!({ "phone_number": PHONE, "username": "Asha" }))
        .await
        .assert_status_ok();

    let body: Value = server.get(&format!("/api/v1/users/{}", PHONE)).await.json();
    assert_eq!(body["preferences"]["preferred_categories"], json!([]));
    assert_eq!(body["preferences"]["price_range"], Value::Null);

    let response = server
        .put(&path)
        .json(&json!({
            "preferred_categories": ["comedy", "outdoor"],
            "price_range": { "min": 0, "max": 1000 }
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["message"], "Preferences updated successfully");
    assert_eq!(body["preferences"]["preferred_categories"], json!(["comedy", "outdoor"]));

    server
        .put(&path)
        .json(&json!({ "preferred_time_slots": ["weekend"] }))
        .await
        .assert_status_ok();

    let body: Value = server.get(&format!("/api/v1/users/{}", PHONE)).await.json();
    let preferences = &body["preferences"];
    assert_eq!(preferences["preferred_categories"], json!(["comedy", "outdoor"]));
    assert_eq!(preferences["preferred_time_slots"], json!(["weekend"]));
    assert_eq!(preferences["price_range"], json!({ "min": 0, "max": 1000 }));
    assert_eq!(preferences["avoid_categories"], json!([]));
}

#[tokio::test]
async fn test_invalid_phone_on_discover_is_not_tracked() {
    let server = keyword_server();
    let body: Value = server
        .post("/api/v1/discover")
        .json(&json!({ "interests": "comedy", "phone_number": "555-0100" }))
        .await
        .json();

    assert_eq!(body["success"], true);
    assert_eq!(body["personalized"], false);
}

#[tokio::test]
async fn test_personalized_discover() {
    let server = keyword_server();
    let path = format!("/api/v1/users/{}/discover", PHONE);

    let response = server.post(&path).json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    server
        .post("/api/v1/discover")
        .json(&json!({ "interests": "standup", "phone_number": PHONE }))
        .await
        .assert_status_ok();

    let response = server.post(&path).json(&json!({ "interests": "street food" })).await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["interests"], "street food, comedy");
    assert_eq!(body["mapped_categories"], json!(["food", "comedy"]));
    assert_eq!(body["user_top_categories"], json!(["comedy"]));
    assert_eq!(body["personalized"], true);
}

#[tokio::test]
async fn test_audit_log_lists_filters_and_clears() {
    let server = keyword_server();

    server.get("/health").await;
    server
        .post("/api/v1/discover")
        .json(&json!({ "interests": "quantum knitting" }))
        .await;

    let body: Value = server.get("/api/v1/logs").await.json();
    assert_eq!(body["total_logs"], 2);
    assert_eq!(body["logs"][0]["path"], "/api/v1/discover");
    assert_eq!(body["logs"][0]["status_code"], 400);
    assert_eq!(body["logs"][0]["request_body"]["interests"], "quantum knitting");
    assert_eq!(body["logs"][1]["path"], "/health");
    assert_eq!(body["summary"]["failed"], 1);

    // The previous listing is itself audited once its response is sent
    let body: Value = server
        .get("/api/v1/logs")
        .add_query_param("status", "success")
        .await
        .json();
    assert_eq!(body["total_logs"], 2);
    assert_eq!(body["logs"][0]["path"], "/api/v1/logs");
    assert_eq!(body["logs"][1]["path"], "/health");

    let body: Value = server
        .get("/api/v1/logs")
        .add_query_param("path", "discover")
        .await
        .json();
    assert_eq!(body["logs"].as_array().unwrap().len(), 1);

    server.delete("/api/v1/logs").await.assert_status_ok();
    let body: Value = server.get("/api/v1/logs").await.json();
    assert_eq!(body["total_logs"], 1);
    assert_eq!(body["logs"][0]["method"], "DELETE");
}

#[tokio::test]
async fn test_packages_deployment_scopes_by_agent() {
    let state = AppState::in_memory(
        TaxonomyVariant::Packages,
        None,
        vec![
            package("Goa Escape", "beach", "agent-7"),
            package("Andaman Blue", "beach", "agent-9"),
        ],
    )
    .unwrap();
    let server = TestServer::new(create_router(state)).unwrap();

    let response = server
        .post("/api/v1/discover")
        .json(&json!({ "interests": "beach holiday", "scope": "agent-9" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["mapped_categories"], json!(["beach"]));
    assert_eq!(body["total_matching"], 1);
    assert_eq!(body["results"][0]["details"]["agent_id"], "agent-9");
    assert_eq!(
        body["results"][0]["suggestion"],
        "Explore Andaman Blue to Goa! A memorable trip. 4 days for ₹24,999."
    );
}
