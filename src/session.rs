//! Chat session for one case.
//!
//! A session owns the transcript, the display lists and the loading flags.
//! Analysis requests are tagged with a sequence number so that a response
//! only replaces the display lists when no newer request has been issued.

use crate::i18n::Locale;
use crate::normalize::{DEFAULT_RECORD_URL, ResponseNormalizer, assistant_reply};
use crate::services::{CaseService, ChatHistoryStore, ServiceError, ServiceResult};
use crate::types::{
    CaseRecord, ChatMessage, DisplayLists, ExternalImageItem, ExternalInfoItem, MessageType,
    Recommendation, SimilarCase,
};
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const SCROLL_DELAY: Duration = Duration::from_millis(100);

static MESSAGE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Notifications for the rendering layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewEvent {
    ScrollToBottom,
}

/// An analysis request started by [`CaseSession::begin_send`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingSend {
    pub seq: u64,
    pub case_id: String,
    pub question: String,
}

impl PendingSend {
    pub async fn dispatch(&self, cases: &dyn CaseService) -> ServiceResult<String> {
        cases.analyze_case(&self.case_id, &self.question).await
    }
}

pub struct CaseSession {
    case_id: String,
    cases: Arc<dyn CaseService>,
    history: Arc<dyn ChatHistoryStore>,
    locale: Locale,
    record_url: String,

    case_record: Option<CaseRecord>,
    transcript: Vec<ChatMessage>,
    lists: DisplayLists,
    current_message: String,
    is_loading: bool,
    is_sending: bool,
    error: Option<String>,

    last_issued: u64,
    pending_saves: Vec<JoinHandle<()>>,
    view_events: Option<mpsc::UnboundedSender<ViewEvent>>,
}

impl CaseSession {
    pub fn new(
        case_id: impl Into<String>,
        cases: Arc<dyn CaseService>,
        history: Arc<dyn ChatHistoryStore>,
    ) -> Self {
        Self {
            case_id: case_id.into(),
            cases,
            history,
            locale: Locale::default(),
            record_url: DEFAULT_RECORD_URL.to_string(),
            case_record: None,
            transcript: Vec::new(),
            lists: DisplayLists::default(),
            current_message: String::new(),
            is_loading: true,
            is_sending: false,
            error: None,
            last_issued: 0,
            pending_saves: Vec::new(),
            view_events: None,
        }
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn with_record_url(mut self, template: impl Into<String>) -> Self {
        self.record_url = template.into();
        self
    }

    /// Receiver for post-render notifications. Replaces any earlier receiver.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ViewEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.view_events = Some(tx);
        rx
    }

    // ============================================
    // Bootstrap
    // ============================================

    /// Loads the transcript, then runs the initial case analysis.
    pub async fn activate(&mut self) {
        if self.case_id.is_empty() {
            debug!("activated without a case id");
            return;
        }
        info!(case_id = %self.case_id, "activating case assistant");
        self.load_chat_history().await;
        self.load_case_and_analyze().await;
    }

    pub async fn load_chat_history(&mut self) {
        match self.history.load_chat_history(&self.case_id).await {
            Ok(history) => {
                debug!(count = history.len(), "loaded chat history");
                self.transcript = history;
            }
            Err(err) => {
                warn!(case_id = %self.case_id, "failed to load chat history: {err}");
                self.transcript = Vec::new();
            }
        }
    }

    pub async fn load_case_and_analyze(&mut self) {
        self.is_loading = true;
        self.error = None;
        let was_empty = self.transcript.is_empty();
        let seq = self.next_seq();

        let outcome = self.initial_analysis().await;
        self.is_loading = false;

        match outcome {
            Ok(payload) => {
                self.apply_payload(seq, &payload);
                if was_empty {
                    match assistant_reply(&payload) {
                        Some(reply) => {
                            let reply = reply.to_string();
                            self.append_message(MessageType::Assistant, reply);
                        }
                        None => {
                            let notice = self.locale.strings().analysis_complete;
                            self.append_message(MessageType::System, notice);
                        }
                    }
                }
            }
            Err(err) => {
                error!(case_id = %self.case_id, "case analysis failed: {err}");
                let strings = self.locale.strings();
                self.error = Some(
                    strings.compose_error(strings.analysis_error_prefix, err.detail().as_deref()),
                );
            }
        }
    }

    async fn initial_analysis(&mut self) -> ServiceResult<Value> {
        let record = self.cases.fetch_case_details(&self.case_id).await?;
        let question = self.locale.default_question(record.description.as_deref());
        self.case_record = Some(record);

        let body = self.cases.analyze_case(&self.case_id, &question).await?;
        Ok(serde_json::from_str(&body)?)
    }

    // ============================================
    // Sending
    // ============================================

    /// Input buffer update from the composer.
    pub fn set_current_message(&mut self, text: impl Into<String>) {
        self.current_message = text.into();
    }

    /// Sends whatever is in the input buffer.
    pub async fn submit(&mut self) {
        let text = self.current_message.clone();
        self.send_message(&text).await;
    }

    pub async fn send_message(&mut self, text: &str) {
        let Some(pending) = self.begin_send(text) else {
            return;
        };
        let outcome = pending.dispatch(self.cases.as_ref()).await;
        self.finish_send(&pending, outcome);
    }

    /// First half of a send: appends the user message and issues a sequence
    /// number. Returns `None` for blank input, leaving all state untouched.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingSend> {
        if text.trim().is_empty() {
            return None;
        }

        self.current_message.clear();
        self.is_sending = true;
        self.error = None;
        self.append_message(MessageType::User, text);

        Some(PendingSend {
            seq: self.next_seq(),
            case_id: self.case_id.clone(),
            question: text.to_string(),
        })
    }

    /// Second half of a send. Always clears the sending flag.
    pub fn finish_send(&mut self, pending: &PendingSend, outcome: ServiceResult<String>) {
        let parsed = outcome
            .and_then(|body| serde_json::from_str::<Value>(&body).map_err(ServiceError::from));
        self.is_sending = false;

        match parsed {
            Ok(payload) => {
                self.apply_payload(pending.seq, &payload);
                if let Some(reply) = assistant_reply(&payload) {
                    let reply = reply.to_string();
                    self.append_message(MessageType::Assistant, reply);
                }
            }
            Err(err) => self.record_send_failure(pending.seq, &err),
        }
    }

    /// The error banner belongs to the latest request; the transcript notice
    /// is appended either way.
    fn record_send_failure(&mut self, seq: u64, err: &ServiceError) {
        error!(case_id = %self.case_id, seq, "sending message failed: {err}");
        let strings = self.locale.strings();
        if seq == self.last_issued {
            self.error =
                Some(strings.compose_error(strings.send_error_prefix, err.detail().as_deref()));
        }
        self.append_message(MessageType::Error, strings.send_failed_notice);
    }

    // ============================================
    // Transcript
    // ============================================

    /// Appends to the transcript, mirrors the message to the history store in
    /// the background and schedules a scroll notification.
    pub fn append_message(&mut self, kind: MessageType, text: impl Into<String>) -> &ChatMessage {
        let message = ChatMessage {
            id: next_message_id(),
            kind,
            text: text.into(),
            timestamp: self.locale.format_timestamp(current_time()),
        };
        self.mirror(&message);
        self.schedule_scroll();
        self.transcript.push(message);
        &self.transcript[self.transcript.len() - 1]
    }

    fn mirror(&mut self, message: &ChatMessage) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, chat message not mirrored");
            return;
        };
        let history = Arc::clone(&self.history);
        let case_id = self.case_id.clone();
        let text = message.text.clone();
        let kind = message.kind;

        self.pending_saves.retain(|handle| !handle.is_finished());
        self.pending_saves.push(runtime.spawn(async move {
            if let Err(err) = history.save_chat_message(&case_id, &text, kind).await {
                warn!(case_id = %case_id, "failed to save chat message: {err}");
            }
        }));
    }

    fn schedule_scroll(&self) {
        let Some(tx) = self.view_events.clone() else {
            return;
        };
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                tokio::time::sleep(SCROLL_DELAY).await;
                let _ = tx.send(ViewEvent::ScrollToBottom);
            });
        }
    }

    /// Waits for outstanding history writes.
    pub async fn flush(&mut self) {
        for handle in self.pending_saves.drain(..) {
            if let Err(err) = handle.await {
                warn!("chat history write did not complete: {err}");
            }
        }
    }

    // ============================================
    // Display state
    // ============================================

    fn next_seq(&mut self) -> u64 {
        self.last_issued += 1;
        self.last_issued
    }

    fn apply_payload(&mut self, seq: u64, payload: &Value) {
        if seq != self.last_issued {
            debug!(seq, latest = self.last_issued, "ignoring superseded analysis result");
            return;
        }
        self.lists = ResponseNormalizer::new(&self.case_id)
            .with_locale(self.locale)
            .with_record_url(&self.record_url)
            .normalize(payload);
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    pub fn case_record(&self) -> Option<&CaseRecord> {
        self.case_record.as_ref()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn display_lists(&self) -> &DisplayLists {
        &self.lists
    }

    pub fn similar_cases(&self) -> &[SimilarCase] {
        &self.lists.similar_cases
    }

    pub fn external_info(&self) -> &[ExternalInfoItem] {
        &self.lists.external_info
    }

    pub fn external_images(&self) -> &[ExternalImageItem] {
        &self.lists.external_images
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.lists.recommendations
    }

    pub fn current_message(&self) -> &str {
        &self.current_message
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_sending(&self) -> bool {
        self.is_sending
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn has_similar_cases(&self) -> bool {
        !self.lists.similar_cases.is_empty()
    }

    pub fn has_external_info(&self) -> bool {
        !self.lists.external_info.is_empty()
    }

    pub fn has_external_images(&self) -> bool {
        !self.lists.external_images.is_empty()
    }

    pub fn has_recommendations(&self) -> bool {
        !self.lists.recommendations.is_empty()
    }

    pub fn is_send_disabled(&self) -> bool {
        self.is_sending || self.current_message.trim().is_empty()
    }
}

fn current_time() -> OffsetDateTime {
    OffsetDateTime::now_utc()
}

fn next_message_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let n = MESSAGE_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{millis}-{n}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_message_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| next_message_id()).collect();
        assert_eq!(ids.len(), 1000);
    }
}
