use super::{ChatHistoryStore, ServiceResult};
use crate::types::{ChatMessage, MessageType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-local transcript storage, keyed by case id.
#[derive(Default)]
pub struct MemoryHistoryStore {
    counter: AtomicU64,
    entries: Mutex<HashMap<String, Vec<ChatMessage>>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a case with existing history.
    pub fn with_history(self, case_id: &str, messages: Vec<ChatMessage>) -> Self {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(case_id.to_string(), messages);
        }
        self
    }

    pub fn messages(&self, case_id: &str) -> Vec<ChatMessage> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(case_id).cloned())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatHistoryStore for MemoryHistoryStore {
    async fn load_chat_history(&self, case_id: &str) -> ServiceResult<Vec<ChatMessage>> {
        Ok(self.messages(case_id))
    }

    async fn save_chat_message(
        &self,
        case_id: &str,
        text: &str,
        kind: MessageType,
    ) -> ServiceResult<()> {
        let id = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| super::ServiceError::Backend(e.to_string()))?;
        entries
            .entry(case_id.to_string())
            .or_default()
            .push(ChatMessage {
                id: format!("stored-{id}"),
                kind,
                text: text.to_string(),
                timestamp: String::new(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_load_are_isolated_per_case() {
        let store = MemoryHistoryStore::new();
        store
            .save_chat_message("case-a", "hello", MessageType::User)
            .await
            .unwrap();
        store
            .save_chat_message("case-b", "other", MessageType::Assistant)
            .await
            .unwrap();

        let a = store.load_chat_history("case-a").await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].text, "hello");
        assert_eq!(a[0].kind, MessageType::User);

        assert!(store.load_chat_history("case-c").await.unwrap().is_empty());
    }
}
