//! Event history for a tab.

use serde_json::Value;

use crate::protocol::Event;

// ============================================================================
// EventQueue
// ============================================================================

/// Append-only, arrival-ordered record of protocol events observed
/// since the last reset.
///
/// Consumers search the history with predicates instead of removing
/// entries: several consumers may need to inspect the same window for
/// distinct signals (e.g. the two independent load-completion events).
/// Entries leave the queue only through [`EventQueue::reset`], called
/// at a protocol boundary such as the start of a navigation.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: Vec<Event>,
}

impl EventQueue {
    /// Creates an empty queue.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event, preserving wire arrival order.
    #[inline]
    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Clears the history.
    ///
    /// Called immediately before operations that must observe only
    /// events produced after this point, so stale events from a prior
    /// operation cannot produce false-positive matches.
    #[inline]
    pub fn reset(&mut self) {
        self.events.clear();
    }

    /// Read-only ordered view of the history.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Event] {
        &self.events
    }

    /// Returns the first event matching the predicate.
    pub fn find(&self, predicate: impl Fn(&Event) -> bool) -> Option<&Event> {
        self.events.iter().find(|e| predicate(e))
    }

    /// Returns the first event with the given method.
    #[inline]
    pub fn find_method(&self, method: &str) -> Option<&Event> {
        self.find(|e| e.method == method)
    }

    /// Returns `true` if any event with the given method is present.
    #[inline]
    #[must_use]
    pub fn contains_method(&self, method: &str) -> bool {
        self.find_method(method).is_some()
    }

    /// Number of recorded events.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if no events are recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
