//! Turning operations into deferred-returning callables.

use crate::deferred::Deferred;
use crate::operation::{Body, Operation};
use crate::value::CallbackValue;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, trace};

type DeferFn<A, V, E, R> = dyn Fn(&R, A) -> Deferred<V, E> + Send + Sync;

/// A deferred-returning callable. Immutable once built; each call yields a
/// fresh [`Deferred`].
pub struct Adapted<A, V, E, R = ()> {
    inner: Arc<DeferFn<A, V, E, R>>,
}

impl<A, V, E, R> Adapted<A, V, E, R> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&R, A) -> Deferred<V, E> + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Invoke against `receiver`, which reaches the underlying operation unchanged.
    pub fn call_on(&self, receiver: &R, args: A) -> Deferred<V, E> {
        (self.inner)(receiver, args)
    }

    /// Reference identity: both handles share one underlying callable.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&a.inner) as *const (),
            Arc::as_ptr(&b.inner) as *const (),
        )
    }
}

impl<A, V, E: fmt::Display, R> Adapted<A, V, E, R> {
    /// Build from an async body, the natively deferred form.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(&R, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        Self::new(move |receiver: &R, args: A| Deferred::from_future(f(receiver, args)))
    }
}

impl<A, V, E> Adapted<A, V, E, ()> {
    pub fn call(&self, args: A) -> Deferred<V, E> {
        self.call_on(&(), args)
    }
}

impl<A, V, E, R> Clone for Adapted<A, V, E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, V, E, R> fmt::Debug for Adapted<A, V, E, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapted")
            .field("fn", &Arc::as_ptr(&self.inner))
            .finish()
    }
}

/// Produce the deferred-returning form of `op`.
///
/// Resolution order:
/// 1. a custom override is returned as-is;
/// 2. an operation that already returns a Deferred is returned as-is;
/// 3. otherwise a new wrapper appends a [`Completion`](crate::Completion),
///    routes an `Err` return into rejection and hands back the Deferred
///    before the operation necessarily completes.
pub fn adapt<A, V, E, R>(op: &Operation<A, V, E, R>) -> Adapted<A, V, E, R>
where
    A: 'static,
    V: CallbackValue + 'static,
    E: fmt::Display + 'static,
    R: 'static,
{
    if let Some(custom) = &op.custom {
        debug!("adapt: returning custom override");
        return custom.clone();
    }
    match &op.body {
        Body::Deferred(adapted) => {
            debug!("adapt: operation already returns a deferred");
            adapted.clone()
        }
        Body::Callback(f) => {
            let f = Arc::clone(f);
            Adapted::new(move |receiver: &R, args: A| {
                let (done, deferred) = Deferred::channel();
                if let Err(err) = f(receiver, args, done.clone()) {
                    trace!("operation failed synchronously");
                    done.reject(err);
                }
                deferred
            })
        }
    }
}

impl<A, V, E, R> Operation<A, V, E, R>
where
    A: 'static,
    V: CallbackValue + 'static,
    E: fmt::Display + 'static,
    R: 'static,
{
    pub fn adapt(&self) -> Adapted<A, V, E, R> {
        adapt(self)
    }
}
