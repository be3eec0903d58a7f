use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    /// Filesystem failure, rendered as `CODE: description, syscall 'path'`.
    #[error("{code}: {description}, {syscall} '{path}'")]
    Io {
        code: &'static str,
        description: String,
        syscall: &'static str,
        path: String,
    },

    #[error("runtime: {op} requires a tokio runtime")]
    NoRuntime { op: &'static str },

    #[error("serde: {0}")]
    Serde(#[from] serde_json::Error),
}

impl AdapterError {
    /// Name the failure the way libuv does: errno code plus its description.
    pub fn from_io(err: &io::Error, syscall: &'static str, path: &Path) -> Self {
        let (code, description) = match err.raw_os_error().and_then(errno_name) {
            Some((code, description)) => (code, description.to_string()),
            None => match err.kind() {
                io::ErrorKind::NotFound => ("ENOENT", "no such file or directory".to_string()),
                io::ErrorKind::PermissionDenied => ("EACCES", "permission denied".to_string()),
                io::ErrorKind::AlreadyExists => ("EEXIST", "file already exists".to_string()),
                io::ErrorKind::InvalidInput => ("EINVAL", "invalid argument".to_string()),
                _ => ("UNKNOWN", err.to_string()),
            },
        };
        AdapterError::Io {
            code,
            description,
            syscall,
            path: path.display().to_string(),
        }
    }

    /// True for failures caused by the path itself rather than the system.
    pub fn is_bad_path(&self) -> bool {
        matches!(
            self.code(),
            Some(
                "ENOENT" | "EACCES" | "EPERM" | "ENOTDIR" | "ENAMETOOLONG" | "ELOOP" | "EINVAL"
                    | "EISDIR"
            )
        )
    }

    /// Errno-style code for filesystem failures.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            AdapterError::Io { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(unix)]
fn errno_name(errno: i32) -> Option<(&'static str, &'static str)> {
    let named = match errno {
        libc::ENOENT => ("ENOENT", "no such file or directory"),
        libc::EACCES => ("EACCES", "permission denied"),
        libc::EPERM => ("EPERM", "operation not permitted"),
        libc::EEXIST => ("EEXIST", "file already exists"),
        libc::EINVAL => ("EINVAL", "invalid argument"),
        libc::ENOTDIR => ("ENOTDIR", "not a directory"),
        libc::EISDIR => ("EISDIR", "illegal operation on a directory"),
        libc::ENAMETOOLONG => ("ENAMETOOLONG", "name too long"),
        libc::ELOOP => ("ELOOP", "too many symbolic links encountered"),
        libc::EIO => ("EIO", "i/o error"),
        libc::EBADF => ("EBADF", "bad file descriptor"),
        libc::EMFILE => ("EMFILE", "too many open files"),
        libc::ENOSPC => ("ENOSPC", "no space left on device"),
        libc::EROFS => ("EROFS", "read-only file system"),
        libc::EBUSY => ("EBUSY", "resource busy or locked"),
        _ => return None,
    };
    Some(named)
}

#[cfg(not(unix))]
fn errno_name(_errno: i32) -> Option<(&'static str, &'static str)> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_has_stable_message() {
        let io = io::Error::from(io::ErrorKind::NotFound);
        let err = AdapterError::from_io(&io, "stat", Path::new("/does/not/exist"));
        assert_eq!(
            err.to_string(),
            "ENOENT: no such file or directory, stat '/does/not/exist'"
        );
        assert_eq!(err.code(), Some("ENOENT"));
    }

    #[test]
    fn permission_denied_maps_to_eacces() {
        let io = io::Error::from(io::ErrorKind::PermissionDenied);
        let err = AdapterError::from_io(&io, "lstat", Path::new("/root/secret"));
        assert_eq!(err.to_string(), "EACCES: permission denied, lstat '/root/secret'");
    }

    #[test]
    fn unmapped_kinds_are_unknown() {
        let io = io::Error::new(io::ErrorKind::Other, "disk on fire");
        let err = AdapterError::from_io(&io, "stat", Path::new("x"));
        assert_eq!(err.code(), Some("UNKNOWN"));
        assert_eq!(err.to_string(), "UNKNOWN: disk on fire, stat 'x'");
        assert!(!err.is_bad_path());
    }

    #[cfg(unix)]
    #[test]
    fn not_a_directory_maps_to_enotdir() {
        let io = io::Error::from_raw_os_error(libc::ENOTDIR);
        let err = AdapterError::from_io(&io, "stat", Path::new("/etc/hostname/child"));
        assert_eq!(
            err.to_string(),
            "ENOTDIR: not a directory, stat '/etc/hostname/child'"
        );
        assert!(err.is_bad_path());
    }

    #[cfg(unix)]
    #[test]
    fn long_name_maps_to_enametoolong() {
        let io = io::Error::from_raw_os_error(libc::ENAMETOOLONG);
        let err = AdapterError::from_io(&io, "lstat", Path::new("x"));
        assert_eq!(err.code(), Some("ENAMETOOLONG"));
        assert_eq!(err.to_string(), "ENAMETOOLONG: name too long, lstat 'x'");
    }

    #[cfg(unix)]
    #[test]
    fn real_eio_stays_eio_and_is_not_a_path_problem() {
        let io = io::Error::from_raw_os_error(libc::EIO);
        let err = AdapterError::from_io(&io, "stat", Path::new("/mnt/disk"));
        assert_eq!(err.to_string(), "EIO: i/o error, stat '/mnt/disk'");
        assert!(!err.is_bad_path());
    }

    #[cfg(unix)]
    #[test]
    fn raw_enoent_matches_kind_enoent() {
        let raw = io::Error::from_raw_os_error(libc::ENOENT);
        let kind = io::Error::from(io::ErrorKind::NotFound);
        let path = Path::new("/does/not/exist");
        assert_eq!(
            AdapterError::from_io(&raw, "stat", path).to_string(),
            AdapterError::from_io(&kind, "stat", path).to_string()
        );
    }

    #[test]
    fn runtime_error_has_no_code() {
        let err = AdapterError::NoRuntime { op: "setTimeout" };
        assert_eq!(err.code(), None);
        assert_eq!(err.to_string(), "runtime: setTimeout requires a tokio runtime");
    }
}
