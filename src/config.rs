//! `KEY=VALUE` configuration loading.
//!
//! The file format is one directive per line:
//!
//! ```text
//! # comment
//! IP=127.0.0.1
//! CACHESIZE=1000000
//! HIDETTL
//! ```
//!
//! Keys must belong to [`ConfigKey`]. The first unknown key aborts the load;
//! entries before it stay published.

use crate::entropy::SeedPool;
use crate::environment::Environment;
use crate::error::{BootstrapError, Result};
use crate::text::{LineReader, trim};
use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Variables the daemon understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    Axfr,
    DataLimit,
    CacheSize,
    Ip,
    IpSend,
    Uid,
    Gid,
    Root,
    HideTtl,
    ForwardOnly,
    MergeQueries,
    DebugLevel,
    Base,
    TcpRemoteIp,
    TcpRemotePort,
}

impl ConfigKey {
    /// Every accepted key.
    pub const ALL: [Self; 15] = [
        Self::Axfr,
        Self::DataLimit,
        Self::CacheSize,
        Self::Ip,
        Self::IpSend,
        Self::Uid,
        Self::Gid,
        Self::Root,
        Self::HideTtl,
        Self::ForwardOnly,
        Self::MergeQueries,
        Self::DebugLevel,
        Self::Base,
        Self::TcpRemoteIp,
        Self::TcpRemotePort,
    ];

    /// Looks up a key by its exact, case-sensitive name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "AXFR" => Self::Axfr,
            "DATALIMIT" => Self::DataLimit,
            "CACHESIZE" => Self::CacheSize,
            "IP" => Self::Ip,
            "IPSEND" => Self::IpSend,
            "UID" => Self::Uid,
            "GID" => Self::Gid,
            "ROOT" => Self::Root,
            "HIDETTL" => Self::HideTtl,
            "FORWARDONLY" => Self::ForwardOnly,
            "MERGEQUERIES" => Self::MergeQueries,
            "DEBUG_LEVEL" => Self::DebugLevel,
            "BASE" => Self::Base,
            "TCPREMOTEIP" => Self::TcpRemoteIp,
            "TCPREMOTEPORT" => Self::TcpRemotePort,
            _ => return None,
        })
    }

    /// The environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Axfr => "AXFR",
            Self::DataLimit => "DATALIMIT",
            Self::CacheSize => "CACHESIZE",
            Self::Ip => "IP",
            Self::IpSend => "IPSEND",
            Self::Uid => "UID",
            Self::Gid => "GID",
            Self::Root => "ROOT",
            Self::HideTtl => "HIDETTL",
            Self::ForwardOnly => "FORWARDONLY",
            Self::MergeQueries => "MERGEQUERIES",
            Self::DebugLevel => "DEBUG_LEVEL",
            Self::Base => "BASE",
            Self::TcpRemoteIp => "TCPREMOTEIP",
            Self::TcpRemotePort => "TCPREMOTEPORT",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted configuration directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    /// The variable.
    pub key: ConfigKey,
    /// The trimmed value; `None` when the line has no `=` or nothing after it.
    pub value: Option<String>,
}

/// A directive line split into trimmed, not yet validated parts.
#[derive(Debug, PartialEq, Eq)]
pub struct Directive {
    /// Text before the first `=`.
    pub key: String,
    /// Text after the first `=`, if non-empty.
    pub value: Option<String>,
}

/// Splits one line into a [`Directive`].
///
/// Returns `None` for blank lines and `#` comments.
#[must_use]
pub fn parse_line(line: &str) -> Option<Directive> {
    let line = trim(line);
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = match line.split_once('=') {
        Some((k, v)) => (trim(k), Some(trim(v))),
        None => (line, None),
    };
    Some(Directive {
        key,
        value: value.filter(|v| !v.is_empty()),
    })
}

/// Loads `path` into `env`, stirring `pool` once per directive.
///
/// Returns the accepted entries in file order.
///
/// # Errors
///
/// Returns [`BootstrapError::Io`] if the file cannot be opened or read,
/// [`BootstrapError::InvalidUtf8`] for a non-UTF-8 line, and
/// [`BootstrapError::UnknownKey`] for the first key outside [`ConfigKey`].
/// Nothing from the failing line is published.
pub fn load(
    path: impl AsRef<Path>,
    env: &mut impl Environment,
    pool: &mut SeedPool,
) -> Result<Vec<ConfigEntry>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| BootstrapError::io(path, e))?;
    let mut reader = LineReader::new(BufReader::new(file));

    let mut entries = Vec::new();
    let mut lineno = 0;
    while let Some(raw) = reader.read_line().map_err(|e| BootstrapError::io(path, e))? {
        lineno += 1;

        let raw = raw
            .strip_suffix(b"\n")
            .or_else(|| raw.strip_suffix(b"\0"))
            .unwrap_or(raw);
        let text = std::str::from_utf8(raw).map_err(|_| BootstrapError::InvalidUtf8 {
            path: path.to_path_buf(),
            line: lineno,
        })?;

        let Some(directive) = parse_line(text) else {
            continue;
        };
        let Some(key) = ConfigKey::from_name(&directive.key) else {
            return Err(BootstrapError::UnknownKey {
                path: path.to_path_buf(),
                line: lineno,
                key: directive.key,
            });
        };

        if let Some(value) = &directive.value {
            tracing::debug!(key = %key, value = %value, "Publishing config variable");
            env.set_var(key.as_str(), value);
        }
        entries.push(ConfigEntry {
            key,
            value: directive.value,
        });

        pool.add_time();
    }

    tracing::info!(
        path = %path.display(),
        entries = entries.len(),
        "Loaded configuration"
    );
    Ok(entries)
}
