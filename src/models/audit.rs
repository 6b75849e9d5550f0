use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mapping::MappingResult;

use super::Listing;

/// One HTTP request as seen by the audit middleware
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub request_id: Option<String>,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub status_code: u16,
    pub success: bool,
    pub duration_ms: f64,
    pub client_ip: String,
    pub user_agent: String,
    pub request_body: Option<serde_json::Value>,
}

/// Per-call analytics row for a discovery request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallLogRecord {
    pub timestamp: DateTime<Utc>,
    pub endpoint: String,
    pub interests: String,
    pub mapped_categories: Option<Vec<String>>,
    /// "llm", "keyword_fallback" or "error"
    pub mapping_method: String,
    pub total_matching: i64,
    pub selected_id: Option<Uuid>,
    pub selected_name: Option<String>,
    pub selected_category: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub response_time_ms: f64,
    pub client_ip: String,
    pub user_agent: String,
}

impl CallLogRecord {
    /// Record for a call that resolved categories and returned listings
    pub fn success(
        endpoint: &str,
        interests: &str,
        mapping: &MappingResult,
        total_matching: usize,
        first: Option<&Listing>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            endpoint: endpoint.to_string(),
            interests: interests.to_string(),
            mapped_categories: Some(mapping.categories.clone()),
            mapping_method: mapping.method.as_str().to_string(),
            total_matching: total_matching as i64,
            selected_id: first.map(Listing::id),
            selected_name: first.map(|l| l.name().to_string()),
            selected_category: first.map(|l| l.category().to_string()),
            success: true,
            error_message: None,
            response_time_ms: 0.0,
            client_ip: String::new(),
            user_agent: String::new(),
        }
    }

    /// Record for a call that failed or found nothing
    pub fn failure(
        endpoint: &str,
        interests: &str,
        mapped_categories: Option<Vec<String>>,
        mapping_method: &str,
        error_message: String,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            endpoint: endpoint.to_string(),
            interests: interests.to_string(),
            mapped_categories,
            mapping_method: mapping_method.to_string(),
            total_matching: 0,
            selected_id: None,
            selected_name: None,
            selected_category: None,
            success: false,
            error_message: Some(error_message),
            response_time_ms: 0.0,
            client_ip: String::new(),
            user_agent: String::new(),
        }
    }

    pub fn with_client(mut self, client_ip: &str, user_agent: &str) -> Self {
        self.client_ip = client_ip.to_string();
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_response_time(mut self, response_time_ms: f64) -> Self {
        self.response_time_ms = response_time_ms;
        self
    }
}
