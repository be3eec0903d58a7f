//! Deferral: adapt callback-style operations into deferred values.
//!
//! An operation written in the `(error, ...results)` completion style is
//! wrapped once by [`adapt`] and afterwards returns a [`Deferred`] per call.
//!
//! # Architecture
//!
//! ```text
//! Operation { body: Callback(f) | Deferred(adapted), custom: Option<Adapted> }
//!   │
//!   ▼  adapt()   custom override ▸ deferred body ▸ new wrapper
//! Adapted::call_on(&receiver, args)
//!   │
//!   ▼  f(&receiver, args, Completion)   (Err return = synchronous throw)
//! Deferred ──► Ready(Ok(v)) | Ready(Err(e)) | pending forever
//! ```
//!
//! Each Deferred settles at most once. Late completions are dropped on the
//! floor, and rejections nobody observed are handed to [`rejection`].

pub mod adapter;
pub mod completion;
pub mod deferred;
pub mod error;
pub mod operation;
pub mod rejection;
pub mod value;

pub use adapter::{adapt, Adapted};
pub use completion::Completion;
pub use deferred::{Deferred, ScheduledTask};
pub use error::ConfigError;
pub use operation::Operation;
pub use rejection::{RejectionMode, UnhandledRejection};
pub use value::{collapse, CallbackValue};
