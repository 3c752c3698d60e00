//! Change and error notification.
//!
//! Views subscribe to `ModelEvent`s to stay in step with the cache's row
//! order and contents, and to errors to surface failed operations.

use rowstage_core::{Error, Value};
use hashbrown::HashMap;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback type for change notifications.
pub type ChangeCallback = Box<dyn Fn(&ModelEvent)>;

/// Callback type for error reports (an error sink).
pub type ErrorSink = Box<dyn Fn(&Error)>;

/// A structural or content change of the cached rows.
///
/// Row ranges are inclusive and valid at the moment the event is emitted.
#[derive(Clone, Debug, PartialEq)]
pub enum ModelEvent {
    RowsInserted { start: usize, end: usize },
    RowsRemoved { start: usize, end: usize },
    CellChanged { row: usize, column: usize },
    /// Rows are about to be reordered or restaged in bulk.
    LayoutAboutToChange,
    LayoutChanged,
    /// The cache was emptied and rebound to a new layout.
    Reset,
    /// The store assigned `value` to the auto-value field of `row`.
    GeneratedKey { row: usize, value: Value },
}

/// Fans events and errors out to subscribers.
pub struct Notifier {
    listeners: HashMap<SubscriptionId, ChangeCallback>,
    error_sinks: HashMap<SubscriptionId, ErrorSink>,
    next_id: SubscriptionId,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            error_sinks: HashMap::new(),
            next_id: 1,
        }
    }

    fn allocate(&mut self) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Subscribes to change events.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&ModelEvent) + 'static,
    {
        let id = self.allocate();
        self.listeners.insert(id, Box::new(callback));
        id
    }

    /// Subscribes to error reports.
    pub fn subscribe_errors<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: Fn(&Error) + 'static,
    {
        let id = self.allocate();
        self.error_sinks.insert(id, Box::new(callback));
        id
    }

    /// Removes a change or error subscription.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some() || self.error_sinks.remove(&id).is_some()
    }

    pub fn emit(&self, event: &ModelEvent) {
        for callback in self.listeners.values() {
            callback(event);
        }
    }

    pub fn report(&self, error: &Error) {
        for callback in self.error_sinks.values() {
            callback(error);
        }
    }

    /// Returns the number of subscriptions of either kind.
    #[inline]
    pub fn len(&self) -> usize {
        self.listeners.len() + self.error_sinks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty() && self.error_sinks.is_empty()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
        self.error_sinks.clear();
    }
}
