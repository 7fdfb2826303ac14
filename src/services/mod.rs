//! Backend boundaries for the case assistant.
//!
//! The session talks to two services:
//!
//! - `CaseService` - fetches case records and runs the case analysis
//! - `ChatHistoryStore` - loads and mirrors transcript entries
//!
//! `HttpGateway` implements both against the REST gateway; `MemoryHistoryStore`
//! keeps transcripts in process.
mod http;
mod memory;

pub use http::HttpGateway;
pub use memory::MemoryHistoryStore;

use crate::types::{CaseRecord, ChatMessage, MessageType};
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Message reported by the backend itself.
    #[error("{0}")]
    Backend(String),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message", alias = "errorMessage")]
    error: String,
}

impl ServiceError {
    /// Human-readable detail for user-facing error strings, if there is any.
    pub fn detail(&self) -> Option<String> {
        let detail = match self {
            ServiceError::Backend(message) => message.trim().to_string(),
            ServiceError::Status { body, .. } => {
                match serde_json::from_str::<ErrorBody>(body) {
                    Ok(parsed) => parsed.error,
                    Err(_) => body.trim().to_string(),
                }
            }
            other => other.to_string(),
        };
        (!detail.trim().is_empty()).then_some(detail)
    }
}

#[async_trait]
pub trait CaseService: Send + Sync {
    async fn fetch_case_details(&self, case_id: &str) -> ServiceResult<CaseRecord>;

    /// Returns the raw JSON text of the analysis payload.
    async fn analyze_case(&self, case_id: &str, question: &str) -> ServiceResult<String>;
}

#[async_trait]
pub trait ChatHistoryStore: Send + Sync {
    async fn load_chat_history(&self, case_id: &str) -> ServiceResult<Vec<ChatMessage>>;

    async fn save_chat_message(
        &self,
        case_id: &str,
        text: &str,
        kind: MessageType,
    ) -> ServiceResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_from_status_body() {
        let err = ServiceError::Status {
            status: 500,
            body: r#"{"error": "Internal server error: boom"}"#.into(),
        };
        assert_eq!(err.detail().as_deref(), Some("Internal server error: boom"));

        let err = ServiceError::Status {
            status: 502,
            body: "Bad gateway".into(),
        };
        assert_eq!(err.detail().as_deref(), Some("Bad gateway"));

        let err = ServiceError::Status {
            status: 503,
            body: String::new(),
        };
        assert_eq!(err.detail(), None);
    }

    #[test]
    fn test_detail_from_backend_message() {
        assert_eq!(
            ServiceError::Backend("case not found".into()).detail().as_deref(),
            Some("case not found")
        );
        assert_eq!(ServiceError::Backend("   ".into()).detail(), None);
    }

    #[test]
    fn test_detail_from_parse_error() {
        let err: ServiceError = serde_json::from_str::<serde_json::Value>("{oops")
            .unwrap_err()
            .into();
        assert!(err.detail().unwrap().starts_with("malformed response"));
    }
}
