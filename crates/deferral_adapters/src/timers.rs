//! Timers: callback-first primitives and their deferred forms.
//!
//! `set_timeout` / `set_immediate` schedule a plain callback on the ambient
//! tokio runtime and hand back a [`Timer`]. The operations built on top carry
//! a custom override so the adapted call returns a Deferred with that Timer
//! attached; cancelling it before it fires leaves the Deferred pending forever.

use crate::error::{AdapterError, Result};
use crate::runtime;
use crate::types::TimerKind;
use deferral::{Adapted, Completion, Deferred, Operation, ScheduledTask};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::trace;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

#[derive(Debug)]
struct TimerState {
    phase: AtomicU8,
    wake: Notify,
}

impl TimerState {
    /// Run `callback` unless the timer was cancelled first.
    fn fire<F: FnOnce()>(&self, callback: F) {
        if self
            .phase
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            callback();
        } else {
            trace!("timer cancelled before firing; dropping callback");
        }
    }
}

/// Handle to a scheduled callback.
#[derive(Debug, Clone)]
pub struct Timer {
    kind: TimerKind,
    delay: Duration,
    state: Arc<TimerState>,
}

impl Timer {
    fn new(kind: TimerKind, delay: Duration) -> Self {
        Self {
            kind,
            delay,
            state: Arc::new(TimerState {
                phase: AtomicU8::new(PENDING),
                wake: Notify::new(),
            }),
        }
    }

    pub fn kind(&self) -> TimerKind {
        self.kind
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn has_fired(&self) -> bool {
        self.state.phase.load(Ordering::Acquire) == FIRED
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.phase.load(Ordering::Acquire) == CANCELLED
    }

    /// Prevent the callback from running. No-op once it has fired.
    pub fn cancel(&self) {
        if self
            .state
            .phase
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            trace!(kind = %self.kind, "timer cancelled");
            self.state.wake.notify_one();
        }
    }
}

impl ScheduledTask for Timer {
    fn kind(&self) -> &'static str {
        self.kind.name()
    }

    fn cancel(&self) {
        Timer::cancel(self);
    }

    fn is_cancelled(&self) -> bool {
        Timer::is_cancelled(self)
    }
}

/// Run `callback` once `delay` has elapsed.
pub fn set_timeout<F>(callback: F, delay: Duration) -> Result<Timer>
where
    F: FnOnce() + Send + 'static,
{
    let handle = runtime("setTimeout")?;
    let timer = Timer::new(TimerKind::Timeout, delay);
    let state = Arc::clone(&timer.state);
    handle.spawn(async move {
        tokio::select! {
            biased;
            _ = state.wake.notified() => {}
            _ = tokio::time::sleep(delay) => state.fire(callback),
        }
    });
    Ok(timer)
}

/// Run `callback` on a later turn of the runtime.
pub fn set_immediate<F>(callback: F) -> Result<Timer>
where
    F: FnOnce() + Send + 'static,
{
    let handle = runtime("setImmediate")?;
    let timer = Timer::new(TimerKind::Immediate, Duration::ZERO);
    let state = Arc::clone(&timer.state);
    handle.spawn(async move { state.fire(callback) });
    Ok(timer)
}

pub fn clear_timeout(timer: &Timer) {
    timer.cancel();
}

pub fn clear_immediate(timer: &Timer) {
    timer.cancel();
}

/// Arguments of the timeout operation: delay and optional fulfilment value.
pub type TimeoutArgs = (Duration, Option<Value>);

pub type TimeoutOperation = Operation<TimeoutArgs, Value, AdapterError>;
pub type ImmediateOperation = Operation<Option<Value>, Value, AdapterError>;

fn settle(done: Completion<Value, AdapterError>, value: Option<Value>) {
    done.call(None, value.into_iter().collect());
}

/// Schedule through `schedule` and attach the resulting Timer to the Deferred.
fn timed<S>(schedule: S, value: Option<Value>) -> Deferred<Value, AdapterError>
where
    S: FnOnce(Box<dyn FnOnce() + Send>) -> Result<Timer>,
{
    let (done, deferred) = Deferred::channel();
    let fire = done.clone();
    match schedule(Box::new(move || settle(fire, value))) {
        Ok(timer) => deferred.with_task(Arc::new(timer)),
        Err(err) => {
            done.reject(err);
            deferred
        }
    }
}

static TIMEOUT: Lazy<TimeoutOperation> = Lazy::new(|| {
    Operation::callback(|_: &(), (delay, value): TimeoutArgs, done| {
        set_timeout(move || settle(done, value), delay)?;
        Ok(())
    })
    .with_custom(Adapted::new(|_: &(), (delay, value): TimeoutArgs| {
        timed(|cb| set_timeout(cb, delay), value)
    }))
});

static IMMEDIATE: Lazy<ImmediateOperation> = Lazy::new(|| {
    Operation::callback(|_: &(), value: Option<Value>, done| {
        set_immediate(move || settle(done, value))?;
        Ok(())
    })
    .with_custom(Adapted::new(|_: &(), value: Option<Value>| {
        timed(set_immediate, value)
    }))
});

/// The timeout primitive as an operation; adapting it yields Deferreds
/// carrying their [`Timer`].
pub fn timeout_operation() -> TimeoutOperation {
    TIMEOUT.clone()
}

pub fn immediate_operation() -> ImmediateOperation {
    IMMEDIATE.clone()
}

/// Fulfil with `value` (or absent) after `delay`.
pub fn timeout(delay: Duration, value: Option<Value>) -> Deferred<Value, AdapterError> {
    TIMEOUT.adapt().call((delay, value))
}

/// Fulfil with `value` (or absent) on a later turn.
pub fn immediate(value: Option<Value>) -> Deferred<Value, AdapterError> {
    IMMEDIATE.adapt().call(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use deferral::adapt;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&hits);
        (hits, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_runs_callback_after_delay() {
        let (hits, cb) = counter();
        let timer = set_timeout(cb, Duration::from_millis(50)).unwrap();
        assert_eq!(timer.kind(), TimerKind::Timeout);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(timer.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn cleared_timeout_never_runs() {
        let (hits, cb) = counter();
        let timer = set_timeout(cb, Duration::from_millis(5)).unwrap();
        clear_timeout(&timer);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(timer.is_cancelled());
        assert!(!timer.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_is_noop() {
        let (hits, cb) = counter();
        let timer = set_timeout(cb, Duration::from_millis(1)).unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        timer.cancel();
        assert!(timer.has_fired());
        assert!(!timer.is_cancelled());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn immediate_runs_on_a_later_turn() {
        let (hits, cb) = counter();
        let timer = set_immediate(cb).unwrap();
        assert_eq!(timer.delay(), Duration::ZERO);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cleared_immediate_never_runs() {
        let (hits, cb) = counter();
        let timer = set_immediate(cb).unwrap();
        clear_immediate(&timer);
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn primitives_need_a_runtime() {
        let err = set_timeout(|| {}, Duration::from_millis(1)).unwrap_err();
        assert!(matches!(err, AdapterError::NoRuntime { op: "setTimeout" }));
        let err = set_immediate(|| {}).unwrap_err();
        assert!(matches!(err, AdapterError::NoRuntime { op: "setImmediate" }));
    }

    #[test]
    fn adapted_operations_use_their_override() {
        let op = timeout_operation();
        let custom = op.custom().expect("timeout carries an override");
        assert!(Adapted::ptr_eq(&adapt(&op), custom));
        assert!(Adapted::ptr_eq(&adapt(&timeout_operation()), custom));
    }

    #[tokio::test(start_paused = true)]
    async fn callback_body_works_without_override() {
        // same body as TIMEOUT, minus the custom override
        let plain: TimeoutOperation =
            Operation::callback(|_: &(), (delay, value): TimeoutArgs, done| {
                set_timeout(move || settle(done, value), delay)?;
                Ok(())
            });
        let deferred = adapt(&plain).call((Duration::from_millis(3), Some(json!("plain"))));
        assert!(deferred.task().is_none());
        assert_eq!(deferred.await.unwrap(), json!("plain"));
    }
}
