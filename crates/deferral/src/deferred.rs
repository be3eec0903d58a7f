//! Single-assignment deferred values.

use crate::completion::Completion;
use crate::rejection;
use crate::value::CallbackValue;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::trace;

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A scheduled task whose result feeds a [`Deferred`], e.g. a timer.
pub trait ScheduledTask: fmt::Debug + Send + Sync {
    /// Short type name of the task, such as `"Timeout"`.
    fn kind(&self) -> &'static str;

    /// Stop the task before it runs. A no-op once it has run.
    fn cancel(&self);

    fn is_cancelled(&self) -> bool;
}

enum Source<V, E> {
    Channel(oneshot::Receiver<Result<V, E>>),
    Future(BoxFuture<Result<V, E>>),
    /// Every completion was dropped unsettled: pending forever.
    Abandoned,
    /// Already yielded its outcome.
    Done,
}

/// A value that transitions once from pending to fulfilled or rejected.
///
/// Awaiting yields `Ok(value)` or `Err(error)`. A Deferred whose completion
/// is dropped without being called never becomes ready.
pub struct Deferred<V, E> {
    source: Source<V, E>,
    task: Option<Arc<dyn ScheduledTask>>,
    report: fn(&E),
}

impl<V, E: fmt::Display> Deferred<V, E> {
    /// A pending Deferred and the completion that settles it.
    pub fn channel() -> (Completion<V, E>, Self) {
        let (tx, rx) = oneshot::channel();
        let deferred = Self {
            source: Source::Channel(rx),
            task: None,
            report: rejection::report::<E>,
        };
        (Completion::new(tx), deferred)
    }

    /// Wrap a future that already produces the outcome.
    pub fn from_future<F>(fut: F) -> Self
    where
        F: Future<Output = Result<V, E>> + Send + 'static,
    {
        Self {
            source: Source::Future(Box::pin(fut)),
            task: None,
            report: rejection::report::<E>,
        }
    }

    /// A Deferred that never settles.
    pub fn never() -> Self {
        Self {
            source: Source::Abandoned,
            task: None,
            report: rejection::report::<E>,
        }
    }
}

impl<V: CallbackValue, E: fmt::Display> Deferred<V, E> {
    pub fn resolved(value: V) -> Self {
        let (done, deferred) = Self::channel();
        done.resolve(value);
        deferred
    }

    pub fn rejected(err: E) -> Self {
        let (done, deferred) = Self::channel();
        done.reject(err);
        deferred
    }
}

impl<V, E> Deferred<V, E> {
    /// Attach the scheduled task producing this Deferred's outcome.
    pub fn with_task(mut self, task: Arc<dyn ScheduledTask>) -> Self {
        self.task = Some(task);
        self
    }

    pub fn task(&self) -> Option<&Arc<dyn ScheduledTask>> {
        self.task.as_ref()
    }

    /// Cancel the attached task, if any. Returns whether one was attached.
    pub fn cancel_task(&self) -> bool {
        match &self.task {
            Some(task) => {
                task.cancel();
                true
            }
            None => false,
        }
    }

    /// True once it is known the Deferred can never settle.
    pub fn is_abandoned(&self) -> bool {
        matches!(self.source, Source::Abandoned)
    }

    fn state(&self) -> &'static str {
        match self.source {
            Source::Channel(_) | Source::Future(_) => "pending",
            Source::Abandoned => "abandoned",
            Source::Done => "done",
        }
    }
}

impl<V, E> Unpin for Deferred<V, E> {}

impl<V, E> Future for Deferred<V, E> {
    type Output = Result<V, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        let polled = match &mut this.source {
            Source::Channel(rx) => Pin::new(rx).poll(cx).map(|r| r.ok()),
            Source::Future(fut) => fut.as_mut().poll(cx).map(Some),
            Source::Abandoned | Source::Done => return Poll::Pending,
        };
        match polled {
            Poll::Ready(Some(outcome)) => {
                this.source = Source::Done;
                Poll::Ready(outcome)
            }
            Poll::Ready(None) => {
                trace!("completion dropped unsettled; deferred stays pending");
                this.source = Source::Abandoned;
                Poll::Pending
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<V, E> Drop for Deferred<V, E> {
    fn drop(&mut self) {
        if let Source::Channel(rx) = &mut self.source {
            // closing first turns any later send into a reported orphan
            rx.close();
            if let Ok(Err(err)) = rx.try_recv() {
                (self.report)(&err);
            }
        }
    }
}

impl<V, E> fmt::Debug for Deferred<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &self.state())
            .field("task", &self.task)
            .finish()
    }
}
