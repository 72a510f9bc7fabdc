//! Request lifetimes.
//!
//! A view that issues requests owns a [`RequestScope`]; closing or dropping
//! the scope cancels everything still in flight. A [`LatestSlot`] holds the
//! result of repeated loads (e.g. the chart for the currently selected city)
//! and only accepts the response to the most recent load.

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Cancels all of its requests when closed or dropped.
#[derive(Debug, Default)]
pub struct RequestScope {
    token: CancellationToken,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for one request, cancelled together with the scope.
    pub fn token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Handle for one load into a [`LatestSlot`].
#[derive(Debug)]
pub struct Ticket {
    generation: u64,
    token: CancellationToken,
}

impl Ticket {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

struct SlotState<T> {
    generation: u64,
    in_flight: Option<CancellationToken>,
    value: Option<T>,
}

/// Holds the latest loaded value; responses to superseded loads are dropped.
pub struct LatestSlot<T> {
    parent: Option<CancellationToken>,
    state: Mutex<SlotState<T>>,
}

impl<T> Default for LatestSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LatestSlot<T> {
    pub fn new() -> Self {
        Self {
            parent: None,
            state: Mutex::new(SlotState {
                generation: 0,
                in_flight: None,
                value: None,
            }),
        }
    }

    /// A slot whose loads are also cancelled when `scope` closes.
    pub fn in_scope(scope: &RequestScope) -> Self {
        Self {
            parent: Some(scope.token()),
            ..Self::new()
        }
    }

    /// Start a new load, cancelling the previous one if still in flight.
    pub fn begin(&self) -> Ticket {
        let mut state = self.state.lock();
        if let Some(previous) = state.in_flight.take() {
            previous.cancel();
        }
        state.generation += 1;
        let token = match self.parent {
            Some(ref parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        state.in_flight = Some(token.clone());
        Ticket {
            generation: state.generation,
            token,
        }
    }

    /// Store the result of a load. Returns `false` and drops `value` if the
    /// ticket was superseded or cancelled.
    pub fn fulfil(&self, ticket: Ticket, value: T) -> bool {
        let mut state = self.state.lock();
        if ticket.generation != state.generation || ticket.token.is_cancelled() {
            debug!(
                ticket = ticket.generation,
                current = state.generation,
                "Discarding stale response"
            );
            return false;
        }
        state.in_flight = None;
        state.value = Some(value);
        true
    }

    /// Cancel the in-flight load, if any, keeping the current value.
    pub fn cancel(&self) {
        if let Some(token) = self.state.lock().in_flight.take() {
            token.cancel();
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().in_flight.is_some()
    }

    pub fn take(&self) -> Option<T> {
        self.state.lock().value.take()
    }
}

impl<T: Clone> LatestSlot<T> {
    pub fn get(&self) -> Option<T> {
        self.state.lock().value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_cancels_children_on_drop() {
        let scope = RequestScope::new();
        let token = scope.token();
        assert!(!token.is_cancelled());
        drop(scope);
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_stale_ticket_is_rejected() {
        let slot = LatestSlot::new();
        let first = slot.begin();
        let second = slot.begin();
        assert!(first.token().is_cancelled());

        assert!(slot.fulfil(second, "fresh"));
        assert!(!slot.fulfil(first, "stale"));
        assert_eq!(slot.get(), Some("fresh"));
        assert!(!slot.is_loading());
    }

    #[test]
    fn test_late_response_after_newer_value() {
        let slot = LatestSlot::new();
        let old = slot.begin();
        let new = slot.begin();
        assert!(slot.fulfil(new, 2));
        assert!(!slot.fulfil(old, 1));
        assert_eq!(slot.take(), Some(2));
        assert_eq!(slot.get(), None);
    }

    #[test]
    fn test_cancel_keeps_value() {
        let slot = LatestSlot::new();
        let t = slot.begin();
        assert!(slot.fulfil(t, 1));
        let t = slot.begin();
        slot.cancel();
        assert!(t.token().is_cancelled());
        assert!(!slot.fulfil(t, 2));
        assert_eq!(slot.get(), Some(1));
    }

    #[test]
    fn test_slot_in_closed_scope() {
        let scope = RequestScope::new();
        let slot = LatestSlot::in_scope(&scope);
        let ticket = slot.begin();
        scope.close();
        assert!(scope.is_closed());
        assert!(ticket.token().is_cancelled());
        assert!(!slot.fulfil(ticket, ()));
    }
}
