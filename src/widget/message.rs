//! Chat messages and the append-only conversation.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Local, Utc};
use serde::Serialize;

/// Greeting every conversation starts with.
pub const SEED_GREETING: &str = "Hello! I'm **GlowAdvisor AI**—your personal skincare assistant. \
Ask me for routines, ingredient breakdowns, or product tips. What would you like help with today?";

static LAST_MESSAGE_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique, strictly increasing message identifier.
///
/// Seeded from wall-clock milliseconds; two ids minted in the same
/// millisecond are still distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    /// Mint the next identifier.
    #[must_use]
    pub fn next() -> Self {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let prev = LAST_MESSAGE_ID
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        Self(now.max(prev + 1))
    }

    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who authored a message. Only affects how the bubble is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Typed by the person using the page. Rendered literally.
    User,
    /// Produced by the generation service. Rendered as markdown.
    Assistant,
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    /// Local `HH:MM`, display only.
    pub time: String,
}

impl Message {
    fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::next(),
            role,
            text: text.into(),
            time: clock_label(),
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// Current local time as shown under each bubble.
#[must_use]
pub fn clock_label() -> String {
    Local::now().format("%H:%M").to_string()
}

/// Ordered, append-only message history.
///
/// Insertion order is display order. Messages are never removed, reordered
/// or edited once pushed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::seeded()
    }
}

impl Conversation {
    /// A conversation holding only the greeting.
    #[must_use]
    pub fn seeded() -> Self {
        Self {
            messages: vec![Message::assistant(SEED_GREETING)],
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
