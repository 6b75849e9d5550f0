pub mod audit;
pub mod request_id;

pub use audit::{audit_middleware, AuditSink, RingBufferAuditLog};
pub use request_id::{make_span_with_request_id, request_id_middleware, RequestId, REQUEST_ID_HEADER};
