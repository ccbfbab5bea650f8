//! In-memory registry of live widgets.
//!
//! Every page load gets a fresh widget; nothing is persisted, and widgets
//! that go idle are swept by [`WidgetStore::cleanup_expired_with_timeout`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use uuid::Uuid;

use super::ChatWidget;
use crate::generation::GenerationService;

/// Thread-safe store for widgets, keyed by page-load id.
#[derive(Debug, Clone)]
pub struct WidgetStore {
    inner: Arc<WidgetStoreInner>,
}

#[derive(Debug)]
struct WidgetStoreInner {
    widgets: RwLock<HashMap<String, ChatWidget>>,
    service: Arc<dyn GenerationService>,
}

impl WidgetStore {
    /// Create an empty store whose widgets talk to `service`.
    #[must_use]
    pub fn new(service: Arc<dyn GenerationService>) -> Self {
        Self {
            inner: Arc::new(WidgetStoreInner {
                widgets: RwLock::new(HashMap::new()),
                service,
            }),
        }
    }

    /// Create a widget with a fresh id and return it.
    #[must_use]
    pub fn create(&self) -> ChatWidget {
        let id = Uuid::new_v4().to_string();
        let widget = ChatWidget::new(id.clone(), Arc::clone(&self.inner.service));
        self.widgets_mut().insert(id, widget.clone());
        widget
    }

    /// Get a widget by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<ChatWidget> {
        self.inner
            .widgets
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Remove a widget by id.
    pub fn remove(&self, id: &str) -> Option<ChatWidget> {
        self.widgets_mut().remove(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .widgets
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove widgets that have been inactive longer than the timeout.
    ///
    /// Returns the number of widgets removed.
    pub fn cleanup_expired_with_timeout(&self, timeout: Duration) -> usize {
        let mut guard = self.widgets_mut();
        let before = guard.len();
        guard.retain(|_, widget| !widget.is_expired_with_timeout(timeout));
        before - guard.len()
    }

    fn widgets_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ChatWidget>> {
        self.inner
            .widgets
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
