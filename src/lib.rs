//! Case support assistant: chat session state, analysis payload
//! normalization and the backend service boundaries it talks to.

pub mod config;
pub mod i18n;
pub mod normalize;
pub mod services;
pub mod session;
pub mod types;

pub use i18n::Locale;
pub use normalize::{ResponseNormalizer, normalize_response};
pub use services::{CaseService, ChatHistoryStore, ServiceError, ServiceResult};
pub use session::{CaseSession, PendingSend, ViewEvent};
pub use types::{ChatMessage, DisplayLists, MessageType};
