//! Request audit trail.
//!
//! Every request passing through [`audit_middleware`] is appended to an
//! [`AuditSink`]. The default sink is a fixed-size ring buffer that keeps the
//! most recent entries in memory.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use axum::{
    body::{to_bytes, Body},
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;

use crate::models::AuditEntry;

use super::request_id::RequestId;

/// Largest request body buffered for the audit trail
pub const MAX_AUDITED_BODY_BYTES: usize = 1024 * 1024;

pub trait AuditSink: Send + Sync {
    fn append(&self, entry: AuditEntry);

    /// All retained entries, newest first
    fn snapshot(&self) -> Vec<AuditEntry>;

    fn clear(&self);
}

/// Keeps the last `capacity` entries, dropping the oldest first
pub struct RingBufferAuditLog {
    capacity: usize,
    entries: Mutex<VecDeque<AuditEntry>>,
}

impl RingBufferAuditLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // A panic while holding the lock cannot leave the deque half-updated
    fn lock(&self) -> MutexGuard<'_, VecDeque<AuditEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuditSink for RingBufferAuditLog {
    fn append(&self, entry: AuditEntry) {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    fn snapshot(&self) -> Vec<AuditEntry> {
        self.lock().iter().rev().cloned().collect()
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First hop of `x-forwarded-for`, then the socket peer, then "unknown"
pub fn client_ip(request_headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    header_text(request_headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
        .filter(|ip| !ip.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub fn user_agent(request_headers: &HeaderMap) -> String {
    header_text(request_headers, "user-agent").unwrap_or_else(|| "unknown".to_string())
}

fn body_value(bytes: &[u8]) -> Option<serde_json::Value> {
    if bytes.is_empty() {
        return None;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => Some(value),
        Err(_) => Some(serde_json::Value::String(
            String::from_utf8_lossy(bytes).into_owned(),
        )),
    }
}

/// Records method, path, status, timing and caller details of each request.
///
/// Bodies of POST, PUT and PATCH requests are buffered, stored as JSON when
/// they parse, and handed on unchanged.
pub async fn audit_middleware(
    State(sink): State<Arc<dyn AuditSink>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let timestamp = Utc::now();

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let request_id = request.extensions().get::<RequestId>().map(|id| id.to_string());
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let client_ip = client_ip(request.headers(), peer);
    let user_agent = user_agent(request.headers());

    let (request, request_body) = if matches!(method, Method::POST | Method::PUT | Method::PATCH) {
        let (parts, body) = request.into_parts();
        match to_bytes(body, MAX_AUDITED_BODY_BYTES).await {
            Ok(bytes) => {
                let value = body_value(&bytes);
                (Some(Request::from_parts(parts, Body::from(bytes))), value)
            }
            Err(e) => {
                tracing::warn!(error = %e, path = %path, "Request body rejected by audit layer");
                (None, None)
            }
        }
    } else {
        (Some(request), None)
    };

    let response = match request {
        Some(request) => next.run(request).await,
        None => StatusCode::PAYLOAD_TOO_LARGE.into_response(),
    };

    let status = response.status();
    sink.append(AuditEntry {
        timestamp,
        request_id,
        method: method.to_string(),
        path,
        query,
        status_code: status.as_u16(),
        success: status.is_success() || status.is_redirection(),
        duration_ms: started.elapsed().as_secs_f64() * 1000.0,
        client_ip,
        user_agent,
        request_body,
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn entry(path: &str) -> AuditEntry {
        AuditEntry {
            timestamp: Utc::now(),
            request_id: None,
            method: "GET".to_string(),
            path: path.to_string(),
            query: None,
            status_code: 200,
            success: true,
            duration_ms: 1.0,
            client_ip: "unknown".to_string(),
            user_agent: "unknown".to_string(),
            request_body: None,
        }
    }

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let log = RingBufferAuditLog::new(2);
        log.append(entry("/a"));
        log.append(entry("/b"));
        log.append(entry("/c"));

        let paths: Vec<String> = log.snapshot().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["/c", "/b"]);
    }

    #[test]
    fn test_clear_empties_log() {
        let log = RingBufferAuditLog::new(10);
        log.append(entry("/a"));
        log.clear();
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let log = RingBufferAuditLog::new(0);
        log.append(entry("/a"));
        log.append(entry("/b"));
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.snapshot().len(), 1);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "192.168.1.5:4000".parse().unwrap();

        assert_eq!(client_ip(&headers, None), "unknown");
        assert_eq!(client_ip(&headers, Some(peer)), "192.168.1.5");

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        assert_eq!(client_ip(&headers, Some(peer)), "203.0.113.9");
    }

    #[test]
    fn test_body_value_keeps_non_json_as_text() {
        assert_eq!(body_value(b""), None);
        assert_eq!(body_value(br#"{"a":1}"#), Some(serde_json::json!({"a": 1})));
        assert_eq!(body_value(b"plain"), Some(serde_json::json!("plain")));
    }
}
