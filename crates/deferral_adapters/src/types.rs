use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::Metadata;
use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

/// File metadata as reported by `stat`/`lstat`.
///
/// Times are milliseconds since the Unix epoch, fractional below the
/// millisecond. On non-Unix targets the inode-level fields are zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u64,
    pub size: u64,
    pub blksize: u64,
    pub blocks: u64,
    pub atime_ms: Option<f64>,
    pub mtime_ms: Option<f64>,
    pub ctime_ms: Option<f64>,
    /// Not every filesystem records creation time.
    pub birthtime_ms: Option<f64>,
    pub is_file: bool,
    pub is_dir: bool,
    pub is_symlink: bool,
}

impl Stats {
    #[cfg(unix)]
    pub fn from_metadata(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;

        let ms = |secs: i64, nsec: i64| Some(secs as f64 * 1e3 + nsec as f64 / 1e6);
        Self {
            dev: meta.dev(),
            ino: meta.ino(),
            mode: meta.mode(),
            nlink: meta.nlink(),
            uid: meta.uid(),
            gid: meta.gid(),
            rdev: meta.rdev(),
            size: meta.size(),
            blksize: meta.blksize(),
            blocks: meta.blocks(),
            atime_ms: ms(meta.atime(), meta.atime_nsec()),
            mtime_ms: ms(meta.mtime(), meta.mtime_nsec()),
            ctime_ms: ms(meta.ctime(), meta.ctime_nsec()),
            birthtime_ms: epoch_ms(meta.created()),
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
            is_symlink: meta.file_type().is_symlink(),
        }
    }

    #[cfg(not(unix))]
    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            dev: 0,
            ino: 0,
            mode: 0,
            nlink: 1,
            uid: 0,
            gid: 0,
            rdev: 0,
            size: meta.len(),
            blksize: 0,
            blocks: 0,
            atime_ms: epoch_ms(meta.accessed()),
            mtime_ms: epoch_ms(meta.modified()),
            ctime_ms: epoch_ms(meta.modified()),
            birthtime_ms: epoch_ms(meta.created()),
            is_file: meta.is_file(),
            is_dir: meta.is_dir(),
            is_symlink: meta.file_type().is_symlink(),
        }
    }
}

fn epoch_ms(time: io::Result<SystemTime>) -> Option<f64> {
    let since = time.ok()?.duration_since(UNIX_EPOCH).ok()?;
    Some(since.as_secs_f64() * 1e3)
}

/// The flavour of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Fires once after a delay.
    Timeout,
    /// Fires on a later turn of the runtime, without delay.
    Immediate,
}

impl TimerKind {
    pub fn name(self) -> &'static str {
        match self {
            TimerKind::Timeout => "Timeout",
            TimerKind::Immediate => "Immediate",
        }
    }
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
