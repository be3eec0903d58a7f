//! Operations subject to adaptation.

use crate::adapter::Adapted;
use crate::completion::Completion;
use std::fmt;
use std::sync::Arc;

pub(crate) type CallbackFn<A, V, E, R> =
    dyn Fn(&R, A, Completion<V, E>) -> Result<(), E> + Send + Sync;

pub(crate) enum Body<A, V, E, R> {
    /// Completes through a trailing error-first callback.
    Callback(Arc<CallbackFn<A, V, E, R>>),
    /// Already returns a Deferred.
    Deferred(Adapted<A, V, E, R>),
}

/// A callable that can be handed to [`adapt`](crate::adapt).
///
/// `A` is the positional argument pack (usually a tuple), `R` the receiver
/// the operation runs against. An `Err` returned from a callback body stands
/// for a synchronous throw.
pub struct Operation<A, V, E, R = ()> {
    pub(crate) body: Body<A, V, E, R>,
    pub(crate) custom: Option<Adapted<A, V, E, R>>,
}

impl<A, V, E, R> Operation<A, V, E, R> {
    /// A callback-style operation.
    ///
    /// ```ignore
    /// let op = Operation::callback(|_: &(), (a, b): (i64, i64), done| {
    ///     done.resolve(json!(a + b));
    ///     Ok(())
    /// });
    /// ```
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&R, A, Completion<V, E>) -> Result<(), E> + Send + Sync + 'static,
    {
        Self {
            body: Body::Callback(Arc::new(f)),
            custom: None,
        }
    }

    /// An operation that already returns a Deferred; adapting it is the identity.
    pub fn deferred(adapted: Adapted<A, V, E, R>) -> Self {
        Self {
            body: Body::Deferred(adapted),
            custom: None,
        }
    }

    /// Attach a pre-built adaptation that [`adapt`](crate::adapt) returns as-is.
    pub fn with_custom(mut self, custom: Adapted<A, V, E, R>) -> Self {
        self.custom = Some(custom);
        self
    }

    pub fn custom(&self) -> Option<&Adapted<A, V, E, R>> {
        self.custom.as_ref()
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self.body, Body::Deferred(_))
    }
}

impl<A, V, E, R> From<Adapted<A, V, E, R>> for Operation<A, V, E, R> {
    fn from(adapted: Adapted<A, V, E, R>) -> Self {
        Self::deferred(adapted)
    }
}

impl<A, V, E, R> Clone for Operation<A, V, E, R> {
    fn clone(&self) -> Self {
        let body = match &self.body {
            Body::Callback(f) => Body::Callback(Arc::clone(f)),
            Body::Deferred(adapted) => Body::Deferred(adapted.clone()),
        };
        Self {
            body,
            custom: self.custom.clone(),
        }
    }
}

impl<A, V, E, R> fmt::Debug for Operation<A, V, E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match self.body {
            Body::Callback(_) => "callback",
            Body::Deferred(_) => "deferred",
        };
        f.debug_struct("Operation")
            .field("body", &body)
            .field("custom", &self.custom.is_some())
            .finish()
    }
}
