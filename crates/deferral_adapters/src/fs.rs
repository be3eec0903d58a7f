//! Filesystem metadata as callback-style operations.
//!
//! `stat` follows symlinks, `lstat` does not. The blocking syscall runs on
//! the tokio blocking pool and completes through the operation's callback.

use crate::error::{AdapterError, Result};
use crate::runtime;
use crate::types::Stats;
use deferral::{Deferred, Operation};
use once_cell::sync::Lazy;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

pub type MetadataOperation = Operation<PathBuf, Value, AdapterError>;

pub fn stat_sync(path: impl AsRef<Path>) -> Result<Stats> {
    let path = path.as_ref();
    let meta = std::fs::metadata(path).map_err(|e| AdapterError::from_io(&e, "stat", path))?;
    Ok(Stats::from_metadata(&meta))
}

pub fn lstat_sync(path: impl AsRef<Path>) -> Result<Stats> {
    let path = path.as_ref();
    let meta =
        std::fs::symlink_metadata(path).map_err(|e| AdapterError::from_io(&e, "lstat", path))?;
    Ok(Stats::from_metadata(&meta))
}

fn metadata_operation(syscall: &'static str, read: fn(&Path) -> Result<Stats>) -> MetadataOperation {
    Operation::callback(move |_: &(), path: PathBuf, done| {
        let handle = runtime(syscall)?;
        handle.spawn_blocking(move || {
            debug!(syscall, path = %path.display(), "reading metadata");
            let outcome = read(&path).and_then(|stats| Ok(serde_json::to_value(stats)?));
            match outcome {
                Ok(value) => done.resolve(value),
                Err(err) => done.reject(err),
            }
        });
        Ok(())
    })
}

static STAT: Lazy<MetadataOperation> = Lazy::new(|| metadata_operation("stat", |p| stat_sync(p)));
static LSTAT: Lazy<MetadataOperation> =
    Lazy::new(|| metadata_operation("lstat", |p| lstat_sync(p)));

/// `stat` as a callback-style operation; fulfils with the [`Stats`] as JSON.
pub fn stat_operation() -> MetadataOperation {
    STAT.clone()
}

pub fn lstat_operation() -> MetadataOperation {
    LSTAT.clone()
}

pub fn stat(path: impl Into<PathBuf>) -> Deferred<Value, AdapterError> {
    STAT.adapt().call(path.into())
}

pub fn lstat(path: impl Into<PathBuf>) -> Deferred<Value, AdapterError> {
    LSTAT.adapt().call(path.into())
}
