//! Per-provider notification dispatch.
//!
//! Observers register a [`Handler`] per [`NotificationKind`]. Handlers run
//! in registration order; registering the same handler twice for a kind is
//! a no-op. A handler that fails (returns `Err` or panics) is logged and
//! the remaining handlers still run.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use timing_core::{Notification, NotificationKind};

/// What a handler returns. Errors are reported, never propagated.
pub type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Something that reacts to notifications.
pub trait NotificationHandler: Send + Sync {
    /// React to one notification.
    fn handle(&self, notification: &Notification) -> HandlerResult;
}

impl<F> NotificationHandler for F
where
    F: Fn(&Notification) -> HandlerResult + Send + Sync,
{
    fn handle(&self, notification: &Notification) -> HandlerResult {
        self(notification)
    }
}

/// A registered handler. Identity is the allocation, so keep the `Arc`
/// around to remove it later.
pub type Handler = Arc<dyn NotificationHandler>;

/// Wrap a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Notification) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

fn same_handler(a: &Handler, b: &Handler) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// Ordered handler lists, one per notification kind.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: RwLock<HashMap<NotificationKind, Vec<Handler>>>,
}

impl EventDispatcher {
    /// Create a new empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`.
    ///
    /// Returns `false` if it was already registered for that kind.
    pub fn on(&self, kind: NotificationKind, handler: Handler) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let list = handlers.entry(kind).or_default();
        if list.iter().any(|h| same_handler(h, &handler)) {
            return false;
        }
        list.push(handler);
        true
    }

    /// Remove `handler` from `kind`.
    ///
    /// Returns `false` if it was not registered.
    pub fn off(&self, kind: NotificationKind, handler: &Handler) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|h| !same_handler(h, handler));
        list.len() != before
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: NotificationKind) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Run every handler registered for the notification's kind.
    ///
    /// Returns how many handlers failed. Handlers may register or remove
    /// handlers while running; changes apply from the next dispatch.
    pub fn dispatch(&self, notification: &Notification) -> usize {
        let kind = notification.kind();
        let snapshot: Vec<Handler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default();

        let mut failures = 0;
        for (index, handler) in snapshot.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| handler.handle(notification))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    tracing::error!("{:?} handler #{} failed: {}", kind, index, e);
                }
                Err(_panic) => {
                    failures += 1;
                    tracing::error!("{:?} handler #{} panicked", kind, index);
                }
            }
        }
        failures
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let counts: HashMap<_, _> = handlers.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventDispatcher")
            .field("handlers", &counts)
            .finish()
    }
}
