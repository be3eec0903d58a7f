//! The completion callback handed to a callback-style operation.

use crate::rejection;
use crate::value::{collapse, CallbackValue};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::oneshot;
use tracing::trace;

type Slot<V, E> = Mutex<Option<oneshot::Sender<std::result::Result<V, E>>>>;

/// Error-first completion callback for exactly one [`Deferred`](crate::Deferred).
///
/// Clones share a single settlement slot. The first call settles the
/// Deferred; every later call is a no-op and its arguments are dropped
/// without being stored or reported.
pub struct Completion<V, E> {
    slot: Arc<Slot<V, E>>,
}

impl<V, E> Completion<V, E> {
    pub(crate) fn new(tx: oneshot::Sender<std::result::Result<V, E>>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Whether some clone of this completion has already been called.
    pub fn is_settled(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl<V: CallbackValue, E: fmt::Display> Completion<V, E> {
    /// Node-style `(error, ...results)` completion.
    ///
    /// `Some(err)` rejects with `err`. `None` fulfils with the collapsed
    /// results: absent for none, the value itself for one, a sequence for more.
    pub fn call(&self, err: Option<E>, results: Vec<V>) {
        match err {
            Some(err) => self.settle(Err(err)),
            None => self.settle(Ok(collapse(results))),
        }
    }

    pub fn resolve(&self, value: V) {
        self.settle(Ok(value));
    }

    pub fn resolve_absent(&self) {
        self.settle(Ok(V::absent()));
    }

    pub fn reject(&self, err: E) {
        self.settle(Err(err));
    }

    fn settle(&self, outcome: std::result::Result<V, E>) {
        let sender = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(tx) = sender else {
            trace!("completion already settled; ignoring repeat call");
            return;
        };
        match tx.send(outcome) {
            Ok(()) => trace!("deferred settled"),
            Err(Err(err)) => rejection::report(&err),
            Err(Ok(_)) => trace!("deferred dropped before fulfilment"),
        }
    }
}

impl<V, E> Clone for Completion<V, E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<V, E> fmt::Debug for Completion<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("settled", &self.is_settled())
            .finish()
    }
}
