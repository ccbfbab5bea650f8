//! The GlowAdvisor chat widget.
//!
//! A [`ChatWidget`] owns one conversation, the draft input, and a
//! single-flight request gate. A valid submission appends the user's message,
//! issues one request to the [`GenerationService`], and on settlement appends
//! exactly one assistant message.
//!
//! # Request lifecycle
//!
//! ```text
//! Idle ──submit──▶ Pending(id) ──settle──▶ Settled(outcome)
//!                       ▲                        │
//!                       └────────submit──────────┘
//! ```
//!
//! While a request is pending, further submissions are dropped, not queued.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use glow_advisor::widget::ChatWidget;
//!
//! let widget = ChatWidget::new("w1", Arc::new(client));
//! widget.submit(Some("Help with acne treatment")).await;
//! assert_eq!(widget.message_count(), 3);
//! ```

mod message;
mod store;

pub use message::{Conversation, Message, MessageId, Role, SEED_GREETING, clock_label};
pub use store::WidgetStore;

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::generation::GenerationService;

/// Reply used when the service answers without a usable `response`.
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't generate a response.";

/// Prefix of the assistant message shown when a request fails.
pub const ERROR_PREFIX: &str = "⚠️ Error talking to server: ";

/// One-click prompts shown under the conversation.
pub const QUICK_PROMPTS: [&str; 4] = [
    "What's my skin type?",
    "Help with acne treatment",
    "Anti-aging routine advice",
    "Sensitive skin care tips",
];

/// Identifies one submission within a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RequestId(u64);

/// How a request ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Settlement {
    /// The service produced a non-empty reply.
    Replied,
    /// The service answered but without a usable `response`.
    Fallback,
    /// Transport, status or decode failure, with its description.
    Failed(String),
}

/// State of the single-flight gate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum RequestState {
    /// Nothing submitted yet.
    #[default]
    Idle,
    /// A request is in flight.
    Pending(RequestId),
    /// The last request settled.
    Settled(Settlement),
}

impl RequestState {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// Point-in-time copy of everything needed to draw the widget.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetSnapshot {
    pub id: String,
    pub messages: Vec<Message>,
    pub input: String,
    pub awaiting_response: bool,
    pub request: RequestState,
    pub revision: u64,
}

impl WidgetSnapshot {
    /// Whether the send button accepts a click.
    #[must_use]
    pub fn can_send(&self) -> bool {
        !self.awaiting_response && !self.input.trim().is_empty()
    }

    /// Whether the quick-prompt buttons accept a click.
    #[must_use]
    pub fn quick_prompts_enabled(&self) -> bool {
        !self.awaiting_response
    }
}

/// A chat widget instance.
///
/// Cloning yields another handle to the same widget.
#[derive(Debug)]
pub struct ChatWidget {
    inner: Arc<WidgetInner>,
}

#[derive(Debug)]
struct WidgetInner {
    id: String,
    service: Arc<dyn GenerationService>,
    state: RwLock<WidgetState>,
    last_activity: RwLock<DateTime<Utc>>,
}

#[derive(Debug)]
struct WidgetState {
    conversation: Conversation,
    input: String,
    request: RequestState,
    next_request: u64,
    /// Bumped on every conversation append and every gate transition.
    revision: u64,
}

impl Clone for ChatWidget {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ChatWidget {
    /// Create a widget holding only the seed greeting.
    pub fn new(id: impl Into<String>, service: Arc<dyn GenerationService>) -> Self {
        Self {
            inner: Arc::new(WidgetInner {
                id: id.into(),
                service,
                state: RwLock::new(WidgetState {
                    conversation: Conversation::seeded(),
                    input: String::new(),
                    request: RequestState::Idle,
                    next_request: 1,
                    revision: 0,
                }),
                last_activity: RwLock::new(Utc::now()),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    /// Replace the draft text.
    pub fn set_input(&self, text: impl Into<String>) {
        self.write().input = text.into();
        self.touch();
    }

    #[must_use]
    pub fn input(&self) -> String {
        self.read().input.clone()
    }

    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.read().conversation.as_slice().to_vec()
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.read().conversation.len()
    }

    #[must_use]
    pub fn awaiting_response(&self) -> bool {
        self.read().request.is_pending()
    }

    #[must_use]
    pub fn request_state(&self) -> RequestState {
        self.read().request.clone()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.read().revision
    }

    #[must_use]
    pub fn snapshot(&self) -> WidgetSnapshot {
        self.touch();
        let state = self.read();
        WidgetSnapshot {
            id: self.inner.id.clone(),
            messages: state.conversation.as_slice().to_vec(),
            input: state.input.clone(),
            awaiting_response: state.request.is_pending(),
            request: state.request.clone(),
            revision: state.revision,
        }
    }

    /// Submit `text`, or the draft when `None`, and wait for the reply.
    ///
    /// Returns `None` when the submission was dropped: blank text, or a
    /// request already in flight.
    pub async fn submit(&self, text: Option<&str>) -> Option<Settlement> {
        let pending = self.begin_submit(text)?;
        Some(pending.complete().await)
    }

    /// Run the gate check and record the user's message.
    ///
    /// On success the widget is `Pending` and the returned handle must be
    /// driven with [`PendingSubmission::complete`]. Dropping the handle
    /// instead settles the request as failed so the gate is never left shut.
    pub fn begin_submit(&self, text: Option<&str>) -> Option<PendingSubmission> {
        let mut state = self.write();

        let content = match text {
            Some(t) => t.trim().to_string(),
            None => state.input.trim().to_string(),
        };
        if content.is_empty() {
            tracing::trace!(widget_id = %self.inner.id, "Ignoring blank submission");
            return None;
        }
        if let RequestState::Pending(in_flight) = &state.request {
            tracing::debug!(
                widget_id = %self.inner.id,
                in_flight = ?in_flight,
                "Dropping submission while a request is in flight"
            );
            return None;
        }

        state.conversation.push(Message::user(content.clone()));
        state.revision += 1;
        state.input.clear();

        let request_id = RequestId(state.next_request);
        state.next_request += 1;
        state.request = RequestState::Pending(request_id);
        state.revision += 1;
        drop(state);
        self.touch();

        tracing::info!(
            name: "widget.submit",
            widget_id = %self.inner.id,
            request_id = ?request_id,
            prompt_length = content.len(),
            "Submission accepted"
        );

        Some(PendingSubmission {
            widget: self.clone(),
            request_id,
            prompt: content,
            settled: false,
        })
    }

    /// Append the assistant message for `request_id` and reopen the gate.
    ///
    /// Only the currently pending request may settle, and only once.
    fn settle(&self, request_id: RequestId, text: String, outcome: Settlement) -> bool {
        let mut state = self.write();
        if state.request != RequestState::Pending(request_id) {
            tracing::warn!(
                widget_id = %self.inner.id,
                request_id = ?request_id,
                "Ignoring settlement for a request that is not pending"
            );
            return false;
        }

        state.conversation.push(Message::assistant(text));
        state.revision += 1;
        state.request = RequestState::Settled(outcome);
        state.revision += 1;
        drop(state);
        self.touch();
        true
    }

    fn read(&self) -> RwLockReadGuard<'_, WidgetState> {
        self.inner
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, WidgetState> {
        self.inner
            .state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn touch(&self) {
        let mut guard = self
            .inner
            .last_activity
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = Utc::now();
    }

    /// Check if the widget has been idle longer than `timeout`.
    #[must_use]
    pub fn is_expired_with_timeout(&self, timeout: Duration) -> bool {
        let last = *self
            .inner
            .last_activity
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        (Utc::now() - last)
            .to_std()
            .is_ok_and(|idle| idle > timeout)
    }
}

/// An accepted submission whose request has not settled yet.
#[derive(Debug)]
pub struct PendingSubmission {
    widget: ChatWidget,
    request_id: RequestId,
    prompt: String,
    settled: bool,
}

impl PendingSubmission {
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Issue the request and settle the widget with its result.
    pub async fn complete(mut self) -> Settlement {
        let result = self.widget.inner.service.generate(&self.prompt).await;

        let (text, outcome) = match result {
            Ok(reply) => match reply.text() {
                Some(text) => (text.to_string(), Settlement::Replied),
                None => (FALLBACK_REPLY.to_string(), Settlement::Fallback),
            },
            Err(e) => {
                tracing::error!(
                    widget_id = %self.widget.id(),
                    request_id = ?self.request_id,
                    error = %e,
                    "Generation request failed"
                );
                (format!("{ERROR_PREFIX}{e}"), Settlement::Failed(e.to_string()))
            }
        };

        self.widget.settle(self.request_id, text, outcome.clone());
        self.settled = true;

        tracing::info!(
            name: "widget.settled",
            widget_id = %self.widget.id(),
            request_id = ?self.request_id,
            outcome = ?outcome,
            "Request settled"
        );
        outcome
    }
}

impl Drop for PendingSubmission {
    fn drop(&mut self) {
        if !self.settled {
            let reason = "request abandoned before completion".to_string();
            self.widget.settle(
                self.request_id,
                format!("{ERROR_PREFIX}{reason}"),
                Settlement::Failed(reason),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerateResponse, GenerationError};
    use tokio::sync::Notify;

    /// Replies with a fixed body, optionally holding until released.
    #[derive(Debug)]
    struct Scripted {
        reply: fn() -> Result<GenerateResponse, GenerationError>,
        gate: Option<Arc<Notify>>,
        calls: std::sync::atomic::AtomicUsize,
    }

    impl Scripted {
        fn new(reply: fn() -> Result<GenerateResponse, GenerationError>) -> Self {
            Self {
                reply,
                gate: None,
                calls: std::sync::atomic::AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl GenerationService for Scripted {
        async fn generate(&self, _prompt: &str) -> Result<GenerateResponse, GenerationError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            (self.reply)()
        }
    }

    fn routine() -> Result<GenerateResponse, GenerationError> {
        Ok(GenerateResponse {
            response: Some("# Routine\n- Cleanse\n- Moisturize".to_string()),
        })
    }

    fn empty() -> Result<GenerateResponse, GenerationError> {
        Ok(GenerateResponse::default())
    }

    fn server_error() -> Result<GenerateResponse, GenerationError> {
        Err(GenerationError::Status(500))
    }

    fn widget(service: Scripted) -> (ChatWidget, Arc<Scripted>) {
        let service = Arc::new(service);
        let dyn_service: Arc<dyn GenerationService> = service.clone();
        (ChatWidget::new("test", dyn_service), service)
    }

    #[tokio::test]
    async fn test_submit_appends_pair() {
        let (w, service) = widget(Scripted::new(routine));

        let outcome = w.submit(Some("  Help with acne treatment ")).await;
        assert_eq!(outcome, Some(Settlement::Replied));
        assert_eq!(service.calls(), 1);

        let messages = w.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].text, "Help with acne treatment");
        assert_eq!(messages[2].role, Role::Assistant);
        assert_eq!(messages[2].text, "# Routine\n- Cleanse\n- Moisturize");
        assert!(!w.awaiting_response());
        assert_eq!(w.request_state(), RequestState::Settled(Settlement::Replied));
    }

    #[tokio::test]
    async fn test_blank_submission_is_ignored() {
        let (w, service) = widget(Scripted::new(routine));

        assert!(w.submit(Some("")).await.is_none());
        assert!(w.submit(Some("   \n\t")).await.is_none());
        w.set_input("   ");
        assert!(w.submit(None).await.is_none());

        assert_eq!(w.message_count(), 1);
        assert_eq!(service.calls(), 0);
        assert_eq!(w.request_state(), RequestState::Idle);
        assert_eq!(w.revision(), 0);
    }

    #[tokio::test]
    async fn test_submit_uses_and_clears_input() {
        let (w, _) = widget(Scripted::new(routine));

        w.set_input("Sensitive skin care tips");
        let pending = w.begin_submit(None).unwrap();
        assert_eq!(pending.prompt(), "Sensitive skin care tips");
        assert_eq!(w.input(), "");
        pending.complete().await;
    }

    #[tokio::test]
    async fn test_override_also_clears_input() {
        let (w, _) = widget(Scripted::new(routine));

        w.set_input("draft");
        w.submit(Some(QUICK_PROMPTS[0])).await.unwrap();
        assert_eq!(w.input(), "");
        assert_eq!(w.messages()[1].text, "What's my skin type?");
    }

    #[tokio::test]
    async fn test_missing_response_uses_fallback() {
        let (w, _) = widget(Scripted::new(empty));

        assert_eq!(w.submit(Some("hi")).await, Some(Settlement::Fallback));
        assert_eq!(w.messages().last().unwrap().text, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_failure_becomes_warning_message() {
        let (w, _) = widget(Scripted::new(server_error));

        let outcome = w.submit(Some("hi")).await;
        assert_eq!(outcome, Some(Settlement::Failed("HTTP 500".to_string())));

        let last = w.messages().pop().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert!(last.text.starts_with(ERROR_PREFIX));
        assert!(last.text.contains("HTTP 500"));
        assert!(!w.awaiting_response());
    }

    #[tokio::test]
    async fn test_gate_drops_concurrent_submission() {
        let gate = Arc::new(Notify::new());
        let mut scripted = Scripted::new(routine);
        scripted.gate = Some(Arc::clone(&gate));
        let (w, service) = widget(scripted);

        let pending = w.begin_submit(Some("first")).unwrap();
        assert!(w.awaiting_response());
        let snapshot = w.snapshot();
        assert!(!snapshot.quick_prompts_enabled());
        assert!(!snapshot.can_send());

        let task = tokio::spawn(pending.complete());

        assert!(w.begin_submit(Some("second")).is_none());
        assert!(w.submit(Some(QUICK_PROMPTS[1])).await.is_none());
        assert_eq!(w.message_count(), 2);

        gate.notify_one();
        task.await.unwrap();

        assert!(!w.awaiting_response());
        assert!(w.snapshot().quick_prompts_enabled());
        assert_eq!(w.message_count(), 3);
        assert_eq!(service.calls(), 1);

        // The gate reopens for the next cycle.
        gate.notify_one();
        assert!(w.submit(Some("third")).await.is_some());
        assert_eq!(w.message_count(), 5);
    }

    #[tokio::test]
    async fn test_dropped_submission_releases_gate() {
        let (w, service) = widget(Scripted::new(routine));

        let pending = w.begin_submit(Some("hi")).unwrap();
        drop(pending);

        assert!(!w.awaiting_response());
        assert_eq!(service.calls(), 0);
        let last = w.messages().pop().unwrap();
        assert!(last.text.starts_with(ERROR_PREFIX));
        assert_eq!(w.message_count(), 3);
    }

    #[tokio::test]
    async fn test_settle_only_once() {
        let (w, _) = widget(Scripted::new(routine));

        let pending = w.begin_submit(Some("hi")).unwrap();
        let id = pending.request_id();
        pending.complete().await;

        assert!(!w.settle(id, "again".to_string(), Settlement::Replied));
        assert_eq!(w.message_count(), 3);
    }

    #[tokio::test]
    async fn test_revision_tracks_mutations_and_transitions() {
        let (w, _) = widget(Scripted::new(routine));

        let pending = w.begin_submit(Some("hi")).unwrap();
        assert_eq!(w.revision(), 2);
        pending.complete().await;
        assert_eq!(w.revision(), 4);
    }

    #[tokio::test]
    async fn test_message_ids_increase() {
        let (w, _) = widget(Scripted::new(routine));
        w.submit(Some("a")).await;
        w.submit(Some("b")).await;

        let ids: Vec<MessageId> = w.messages().iter().map(|m| m.id).collect();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_expiry() {
        let (w, _) = widget(Scripted::new(routine));
        assert!(!w.is_expired_with_timeout(Duration::from_secs(60)));
        std::thread::sleep(Duration::from_millis(20));
        assert!(w.is_expired_with_timeout(Duration::from_millis(1)));
    }
}
