//! Unhandled-rejection reporting.
//!
//! A rejection is unhandled when no consumer ever receives it: the
//! [`Deferred`](crate::Deferred) was dropped while holding it, or was already
//! gone when the completion rejected. Reports go to an installed hook, or
//! else follow the configured [`RejectionMode`].
//!
//! The mode is read once from `DEFERRAL_UNHANDLED_REJECTIONS`
//! (`warn` | `strict` | `none`, default `warn`).
//! [`resolve_mode`] applies the same fallback to a value read elsewhere.

use crate::error::{ConfigError, Result};
use once_cell::sync::Lazy;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, warn};

/// Environment variable selecting the default [`RejectionMode`].
pub const MODE_ENV: &str = "DEFERRAL_UNHANDLED_REJECTIONS";

/// What happens to an unhandled rejection when no hook is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejectionMode {
    /// Log a warning and carry on.
    #[default]
    Warn,
    /// Log an error and exit the process with status 1.
    Strict,
    /// Drop silently.
    None,
}

impl FromStr for RejectionMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "strict" => Ok(Self::Strict),
            "none" => Ok(Self::None),
            _ => Err(ConfigError::InvalidRejectionMode(s.to_string())),
        }
    }
}

impl fmt::Display for RejectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Warn => "warn",
            Self::Strict => "strict",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

/// A rejection that reached no consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledRejection {
    /// `Display` rendering of the rejection value.
    pub error: String,
    /// Rust type name of the rejection value.
    pub error_type: &'static str,
}

type Hook = Arc<dyn Fn(&UnhandledRejection) + Send + Sync>;

struct Reporter {
    mode: RejectionMode,
    hook: Option<Hook>,
}

static REPORTER: Lazy<RwLock<Reporter>> = Lazy::new(|| {
    RwLock::new(Reporter {
        mode: mode_from_env(),
        hook: None,
    })
});

fn mode_from_env() -> RejectionMode {
    resolve_mode(std::env::var(MODE_ENV).ok().as_deref(), RejectionMode::default())
}

/// Resolve a raw mode setting such as the value of [`MODE_ENV`].
///
/// `None` yields `unset`; an unparseable value logs a warning and yields
/// [`RejectionMode::Warn`].
pub fn resolve_mode(raw: Option<&str>, unset: RejectionMode) -> RejectionMode {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|e: ConfigError| {
            warn!("{e}; falling back to {}", RejectionMode::Warn);
            RejectionMode::Warn
        }),
        None => unset,
    }
}

/// Install a process-wide hook; it replaces mode-based handling.
pub fn set_hook<F>(hook: F)
where
    F: Fn(&UnhandledRejection) + Send + Sync + 'static,
{
    let mut reporter = REPORTER.write().unwrap_or_else(PoisonError::into_inner);
    reporter.hook = Some(Arc::new(hook));
}

/// Remove the hook installed by [`set_hook`], if any.
pub fn clear_hook() {
    let mut reporter = REPORTER.write().unwrap_or_else(PoisonError::into_inner);
    reporter.hook = None;
}

/// Override the mode read from the environment.
pub fn set_mode(mode: RejectionMode) {
    let mut reporter = REPORTER.write().unwrap_or_else(PoisonError::into_inner);
    reporter.mode = mode;
}

pub fn mode() -> RejectionMode {
    REPORTER.read().unwrap_or_else(PoisonError::into_inner).mode
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Hook,
    Warn,
    Exit,
    Ignore,
}

/// A hook always wins over the mode.
fn action(mode: RejectionMode, hooked: bool) -> Action {
    if hooked {
        return Action::Hook;
    }
    match mode {
        RejectionMode::Warn => Action::Warn,
        RejectionMode::Strict => Action::Exit,
        RejectionMode::None => Action::Ignore,
    }
}

pub(crate) fn report<E: fmt::Display>(err: &E) {
    let rejection = UnhandledRejection {
        error: err.to_string(),
        error_type: std::any::type_name::<E>(),
    };
    // the hook runs without the lock held so it may call back into this module
    let (mode, hook) = {
        let reporter = REPORTER.read().unwrap_or_else(PoisonError::into_inner);
        (reporter.mode, reporter.hook.clone())
    };
    match (action(mode, hook.is_some()), hook) {
        (Action::Hook, Some(hook)) => hook(&rejection),
        (Action::Warn, _) => {
            warn!(error_type = rejection.error_type, "unhandled rejection: {}", rejection.error);
        }
        (Action::Exit, _) => {
            error!(error_type = rejection.error_type, "unhandled rejection: {}", rejection.error);
            std::process::exit(1);
        }
        _ => {}
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::{Mutex, Once};

    static INSTALL: Once = Once::new();
    static SEEN: Lazy<Mutex<Vec<UnhandledRejection>>> = Lazy::new(Default::default);

    /// Every test in this crate shares one collecting hook; filter by a
    /// marker unique to the test.
    pub(crate) fn reports_containing(marker: &str) -> Vec<UnhandledRejection> {
        install();
        SEEN.lock()
            .unwrap()
            .iter()
            .filter(|r| r.error.contains(marker))
            .cloned()
            .collect()
    }

    pub(crate) fn install() {
        INSTALL.call_once(|| set_hook(|r| SEEN.lock().unwrap().push(r.clone())));
    }
}
