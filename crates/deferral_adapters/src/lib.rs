//! Deferral adapters: runtime primitives behind deferred values.
//!
//! Timers and filesystem metadata are exposed twice: as the raw
//! callback-style primitive and as an [`Operation`](deferral::Operation)
//! ready for [`adapt`](deferral::adapt).
//!
//! ```text
//! set_timeout(cb, delay) ──► Timer            (callback-first primitive)
//! timeout_operation()    ──► Operation { callback body, custom override }
//!   │ adapt()
//!   ▼
//! Deferred<Value, AdapterError> + attached Timer (cancellable)
//! ```
//!
//! All primitives need an ambient tokio runtime. Without one the operation
//! fails synchronously and the Deferred rejects with
//! [`AdapterError::NoRuntime`].

pub mod error;
pub mod fs;
pub mod timers;
pub mod types;

pub use error::AdapterError;
pub use types::{Stats, TimerKind};

/// Handle to the ambient tokio runtime; `op` names the caller in the error.
pub(crate) fn runtime(op: &'static str) -> error::Result<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|_| AdapterError::NoRuntime { op })
}
