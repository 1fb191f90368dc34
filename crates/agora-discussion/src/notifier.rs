use std::sync::Arc;

use tokio::sync::broadcast;

use agora_types::events::{AlertKind, DiscussionEvent};

/// Fans discussion events out to every subscribed view.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    /// All subscribers receive all events
    tx: broadcast::Sender<DiscussionEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(NotifierInner { tx }),
        }
    }

    /// Subscribe to discussion events.
    pub fn subscribe(&self) -> broadcast::Receiver<DiscussionEvent> {
        self.inner.tx.subscribe()
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn emit(&self, event: DiscussionEvent) {
        let _ = self.inner.tx.send(event);
    }

    pub fn alert(&self, kind: AlertKind, message: impl Into<String>) {
        self.emit(DiscussionEvent::Alert {
            kind,
            message: message.into(),
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.tx.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
