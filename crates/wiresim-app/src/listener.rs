//! Status change subscriptions.

use std::fmt;

use wiresim_core::ConnectionStatus;

/// Callback invoked synchronously with every committed status.
pub type Listener = Box<dyn FnMut(ConnectionStatus) + Send>;

/// Handle returned by [`Listeners::subscribe`].
///
/// Not `Clone`: a subscription is released exactly once, by passing it back
/// to `unsubscribe`.
#[must_use = "a dropped Subscription can never be released; pass it to unsubscribe"]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: u64,
}

/// Registry of status listeners, notified in subscription order.
#[derive(Default)]
pub struct Listeners {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("len", &self.entries.len()).finish()
    }
}

impl Listeners {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener`.
    pub fn subscribe<F>(&mut self, listener: F) -> Subscription
    where
        F: FnMut(ConnectionStatus) + Send + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, Box::new(listener)));
        Subscription { id }
    }

    /// Release a subscription. Returns false if it was not registered here.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != subscription.id);
        self.entries.len() != before
    }

    /// Invoke every listener with `status`.
    pub fn notify(&mut self, status: ConnectionStatus) {
        for (_, listener) in &mut self.entries {
            listener(status);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nobody is listening.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
