//! Error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for bootstrap operations.
pub type Result<T> = std::result::Result<T, BootstrapError>;

/// Errors returned by bootstrap operations.
///
/// Every variant is fatal for the daemon: the binary prints it and exits
/// non-zero. Recoverable conditions (a missing timezone file) are logged
/// and never surface here.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Opening, reading, writing or stat-ing a named file failed.
    #[error("could not access `{}`: {source}", path.display())]
    Io {
        /// The file involved.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A configuration line names a variable outside the whitelist.
    #[error("{}: {line}: unknown variable `{key}`", path.display())]
    UnknownKey {
        /// The configuration file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// The offending key, trimmed.
        key: String,
    },

    /// A configuration line is not valid UTF-8.
    #[error("{}: {line}: line is not valid UTF-8", path.display())]
    InvalidUtf8 {
        /// The configuration file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
    },

    /// The timezone file does not start with a TZif header.
    #[error("invalid timezone file: {}, see tzfile(5)", path.display())]
    InvalidTimezoneFile {
        /// The timezone file.
        path: PathBuf,
    },

    /// Mapping the timezone file into memory failed.
    #[error("could not mmap(2) file: {}: {source}", path.display())]
    Map {
        /// The file being mapped.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// Duplicating the log file onto a standard stream failed.
    #[error("could not duplicate {stream}: {source}")]
    Redirect {
        /// `"stdout"` or `"stderr"`.
        stream: &'static str,
        /// The underlying error.
        source: std::io::Error,
    },
}

impl BootstrapError {
    /// Wraps an I/O error with the path it happened on.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the underlying I/O error is `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_message_names_file_line_and_key() {
        let e = BootstrapError::UnknownKey {
            path: PathBuf::from("/etc/dnscache.conf"),
            line: 3,
            key: "BOGUS".into(),
        };
        assert_eq!(e.to_string(), "/etc/dnscache.conf: 3: unknown variable `BOGUS`");
    }

    #[test]
    fn not_found_detection() {
        let e = BootstrapError::io("/nope", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(e.is_not_found());

        let e = BootstrapError::InvalidTimezoneFile {
            path: PathBuf::from("/etc/localtime"),
        };
        assert!(!e.is_not_found());
    }
}
