//! `TZ` resolution from the system timezone database.
//!
//! A TZif file (see tzfile(5)) from version 2 on ends with a newline
//! enclosed POSIX TZ string, e.g.
//!
//! ```text
//! \nCET-1CEST,M3.5.0,M10.5.0/3\n
//! ```
//!
//! [`TimezoneResolver`] publishes that footer as `TZ`, so later time
//! conversions behave the same inside a chroot where `/etc/localtime` is
//! out of reach. Without a usable footer it synthesizes a rule from the C
//! library's view of local time.

use crate::environment::Environment;
use crate::error::{BootstrapError, Result};
use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

/// Default local timezone definition.
const DEFAULT_TZ_FILE: &str = "/etc/localtime";

/// TZif magic.
const TZ_MAGIC: &[u8; 4] = b"TZif";

/// Magic plus version byte.
const TZ_HEADER_LEN: usize = 5;

/// Resolves and publishes the `TZ` environment variable.
///
/// # Example
///
/// ```
/// use dnscache_bootstrap::{MemoryEnvironment, TimezoneResolver};
///
/// let mut env: MemoryEnvironment = [("TZ", "UTC")].into_iter().collect();
/// let tz = TimezoneResolver::with_path("/nonexistent").resolve(&mut env).unwrap();
/// assert_eq!(tz, "UTC");
/// ```
#[derive(Debug, Clone)]
pub struct TimezoneResolver {
    path: PathBuf,
}

impl TimezoneResolver {
    /// Creates a resolver reading `/etc/localtime`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_TZ_FILE),
        }
    }

    /// Creates a resolver reading a custom TZif file (useful for testing).
    #[must_use]
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the timezone file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `TZ` from `env`, or derives and publishes it.
    ///
    /// An existing `TZ` is returned untouched without opening any file.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::InvalidTimezoneFile`] if the file exists
    /// but is not TZif, and [`BootstrapError::Io`] or
    /// [`BootstrapError::Map`] if it cannot be inspected or mapped.
    /// A missing or unreadable file is not an error.
    pub fn resolve(&self, env: &mut impl Environment) -> Result<String> {
        if let Some(tz) = env.var("TZ") {
            return Ok(tz);
        }

        let tz = match self.read_footer()? {
            Some(footer) => footer,
            None => {
                let synthesized = local_zone().to_posix();
                tracing::debug!(tz = %synthesized, "Synthesized TZ from local time");
                synthesized
            }
        };

        env.set_var("TZ", &tz);
        tracing::info!(tz = %tz, "Set timezone");
        Ok(tz)
    }

    /// Reads the POSIX TZ footer of the timezone file.
    ///
    /// Returns `Ok(None)` if the file cannot be opened, predates version 2,
    /// or carries no usable footer.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn read_footer(&self) -> Result<Option<String>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not access timezone file"
                );
                return Ok(None);
            }
        };

        let len = file
            .metadata()
            .map_err(|e| BootstrapError::io(&self.path, e))?
            .len();
        let len = usize::try_from(len).map_err(|_| BootstrapError::Map {
            path: self.path.clone(),
            source: io::Error::from(io::ErrorKind::FileTooLarge),
        })?;
        if len < TZ_HEADER_LEN {
            return Err(BootstrapError::InvalidTimezoneFile {
                path: self.path.clone(),
            });
        }

        let map = Mapping::new(&file, len).map_err(|source| BootstrapError::Map {
            path: self.path.clone(),
            source,
        })?;
        let data = map.bytes();

        if !data.starts_with(TZ_MAGIC) {
            return Err(BootstrapError::InvalidTimezoneFile {
                path: self.path.clone(),
            });
        }
        if !has_footer(data[4]) {
            tracing::warn!(
                path = %self.path.display(),
                version = data[4],
                "Timezone file predates POSIX TZ footers"
            );
            return Ok(None);
        }

        let footer = posix_footer(data).map(str::to_owned);
        if footer.is_none() {
            tracing::warn!(path = %self.path.display(), "No POSIX TZ footer in timezone file");
        }
        Ok(footer)
    }
}

impl Default for TimezoneResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// TZif versions that end with a POSIX TZ footer.
const fn has_footer(version: u8) -> bool {
    matches!(version, b'2' | b'3')
}

/// Extracts the text between the last two newlines of `data`.
///
/// `data` must end with `\n`; the footer must be non-empty UTF-8 without
/// control characters.
#[must_use]
pub fn posix_footer(data: &[u8]) -> Option<&str> {
    let body = data.strip_suffix(b"\n")?;
    let start = body.iter().rposition(|&b| b == b'\n')? + 1;
    let footer = &body[start..];
    if footer.is_empty() || footer.iter().any(u8::is_ascii_control) {
        return None;
    }
    std::str::from_utf8(footer).ok()
}

/// Formats a POSIX TZ rule without transition dates.
///
/// `west` is seconds *west* of UTC, the POSIX convention: Central European
/// Time is `-3600`, Eastern Standard Time `18000`. The sign is printed
/// separately and every field is two non-negative digits.
///
/// ```
/// use dnscache_bootstrap::timezone::format_posix_tz;
///
/// assert_eq!(format_posix_tz("CET", -3600, Some("CEST")), "CET-01:00:00CEST");
/// assert_eq!(format_posix_tz("EST", 18000, None), "EST+05:00:00");
/// ```
#[must_use]
pub fn format_posix_tz(name: &str, west: i64, dst_name: Option<&str>) -> String {
    let sign = if west < 0 { '-' } else { '+' };
    let secs = west.unsigned_abs();
    format!(
        "{name}{sign}{:02}:{:02}:{:02}{}",
        secs / 3600,
        secs % 3600 / 60,
        secs % 60,
        dst_name.unwrap_or("")
    )
}

// ---------------------------------------------------------------------------
// Read-only file mapping
// ---------------------------------------------------------------------------

/// A read-only private mapping, unmapped on drop.
struct Mapping {
    ptr: NonNull<libc::c_void>,
    len: usize,
}

impl Mapping {
    fn new(file: &File, len: usize) -> io::Result<Self> {
        // SAFETY: a fresh private read-only mapping of a valid descriptor;
        // the kernel picks the address.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ,
                libc::MAP_PRIVATE,
                file.as_raw_fd(),
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        NonNull::new(ptr)
            .map(|ptr| Self { ptr, len })
            .ok_or_else(|| io::Error::other("mmap returned a null mapping"))
    }

    fn bytes(&self) -> &[u8] {
        // SAFETY: the mapping covers `len` readable bytes and lives as long
        // as `self`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr().cast::<u8>(), self.len) }
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` describe a mapping created in `new` and not
        // yet unmapped.
        unsafe {
            libc::munmap(self.ptr.as_ptr(), self.len);
        }
    }
}

// ---------------------------------------------------------------------------
// Local time fallback
// ---------------------------------------------------------------------------

unsafe extern "C" {
    fn tzset();
}

/// Roughly half a year, to land in the other season.
const HALF_YEAR: libc::time_t = 183 * 24 * 60 * 60;

/// The C library's view of the local zone.
#[derive(Debug, Clone, PartialEq, Eq)]
struct LocalZone {
    std_name: String,
    /// Seconds east of UTC in standard time.
    std_offset: i64,
    /// Set only while daylight-saving time is in effect.
    dst_name: Option<String>,
}

impl LocalZone {
    fn to_posix(&self) -> String {
        format_posix_tz(&self.std_name, -self.std_offset, self.dst_name.as_deref())
    }
}

struct LocalTime {
    offset: i64,
    is_dst: bool,
    zone: Option<String>,
}

fn local_time(t: libc::time_t) -> Option<LocalTime> {
    // SAFETY: `tm` is plain data; all-zero is a valid value.
    let mut tm: libc::tm = unsafe { std::mem::zeroed() };
    // SAFETY: both pointers are valid for the duration of the call.
    if unsafe { libc::localtime_r(&t, &mut tm) }.is_null() {
        return None;
    }
    let zone = if tm.tm_zone.is_null() {
        None
    } else {
        // SAFETY: a non-null `tm_zone` points at a NUL-terminated name owned
        // by the C library's timezone state.
        let name = unsafe { std::ffi::CStr::from_ptr(tm.tm_zone) };
        Some(name.to_string_lossy().into_owned())
    };
    Some(LocalTime {
        offset: i64::from(tm.tm_gmtoff),
        is_dst: tm.tm_isdst > 0,
        zone,
    })
}

/// Samples local time now and half a year away.
///
/// Standard time comes from whichever sample is not in DST; the DST name
/// is reported only when DST applies right now.
fn local_zone() -> LocalZone {
    // SAFETY: tzset only initializes the C library's timezone state.
    unsafe { tzset() };
    // SAFETY: passing null asks time() for the return value only.
    let now = unsafe { libc::time(std::ptr::null_mut()) };

    let Some(current) = local_time(now) else {
        return LocalZone {
            std_name: "UTC".into(),
            std_offset: 0,
            dst_name: None,
        };
    };

    let standard = if current.is_dst {
        local_time(now.saturating_add(HALF_YEAR)).filter(|t| !t.is_dst)
    } else {
        None
    };
    let dst_name = if current.is_dst {
        current.zone.clone()
    } else {
        None
    };
    let standard = standard.unwrap_or(current);

    LocalZone {
        std_name: standard.zone.unwrap_or_else(|| "UTC".into()),
        std_offset: standard.offset,
        dst_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::MemoryEnvironment;

    fn tzif(version: u8, footer: &str) -> Vec<u8> {
        let mut data = b"TZif".to_vec();
        data.push(version);
        data.extend_from_slice(&[0u8; 15]);
        data.extend_from_slice(&[0, 0, 0, 1, 0xde, 0xad]);
        data.push(b'\n');
        data.extend_from_slice(footer.as_bytes());
        data.push(b'\n');
        data
    }

    fn write_tzif(data: &[u8]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), data).unwrap();
        file
    }

    #[test]
    fn footer_between_last_newlines() {
        assert_eq!(
            posix_footer(&tzif(b'2', "CET-1CEST,M3.5.0,M10.5.0/3")),
            Some("CET-1CEST,M3.5.0,M10.5.0/3")
        );
    }

    #[test]
    fn footer_absent_cases() {
        assert_eq!(posix_footer(b""), None);
        assert_eq!(posix_footer(b"\n"), None);
        assert_eq!(posix_footer(b"no newline at all"), None);
        assert_eq!(posix_footer(b"TZif2\nUTC0"), None);
        assert_eq!(posix_footer(b"TZif2 no earlier newline\n"), None);
        assert_eq!(posix_footer(b"TZif2\n\n"), None);
        assert_eq!(posix_footer(b"TZif2\n\xff\xfe\n"), None);
        assert_eq!(posix_footer(b"TZif2\0\0\0\n\0\0\n"), None);
        assert_eq!(posix_footer(b"TZif2\nUTC0\r\n"), None);
    }

    #[test]
    fn footer_versions() {
        assert!(has_footer(b'2'));
        assert!(has_footer(b'3'));
        assert!(!has_footer(0));
        assert!(!has_footer(b'1'));
    }

    #[test]
    fn format_sign_convention() {
        assert_eq!(format_posix_tz("UTC", 0, None), "UTC+00:00:00");
        assert_eq!(format_posix_tz("IST", -19800, None), "IST-05:30:00");
        assert_eq!(format_posix_tz("NST", 12600, Some("NDT")), "NST+03:30:00NDT");
        assert_eq!(format_posix_tz("LMT", -3661, None), "LMT-01:01:01");
        assert_eq!(format_posix_tz("X", 40 * 3600, None), "X+40:00:00");
    }

    #[test]
    fn local_zone_renders_std_and_dst() {
        let zone = LocalZone {
            std_name: "CET".into(),
            std_offset: 3600,
            dst_name: Some("CEST".into()),
        };
        assert_eq!(zone.to_posix(), "CET-01:00:00CEST");
    }

    #[test]
    fn existing_tz_short_circuits() {
        // Bad magic would be fatal, so success proves the file was never read.
        let file = write_tzif(b"XXXX2\n");
        let mut env: MemoryEnvironment = [("TZ", "UTC")].into_iter().collect();

        let tz = TimezoneResolver::with_path(file.path()).resolve(&mut env).unwrap();

        assert_eq!(tz, "UTC");
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn resolve_publishes_footer() {
        let file = write_tzif(&tzif(b'2', "CET-1CEST,M3.5.0,M10.5.0/3"));
        let mut env = MemoryEnvironment::new();

        let tz = TimezoneResolver::with_path(file.path()).resolve(&mut env).unwrap();

        assert_eq!(tz, "CET-1CEST,M3.5.0,M10.5.0/3");
        assert_eq!(env.var("TZ").as_deref(), Some("CET-1CEST,M3.5.0,M10.5.0/3"));
    }

    #[test]
    fn version_three_is_accepted() {
        let file = write_tzif(&tzif(b'3', "<+0330>-3:30"));
        let footer = TimezoneResolver::with_path(file.path()).read_footer().unwrap();
        assert_eq!(footer.as_deref(), Some("<+0330>-3:30"));
    }

    #[test]
    fn bad_magic_is_fatal() {
        let file = write_tzif(b"TZfi2 garbage\nUTC0\n");
        let err = TimezoneResolver::with_path(file.path())
            .resolve(&mut MemoryEnvironment::new())
            .unwrap_err();
        assert!(matches!(err, BootstrapError::InvalidTimezoneFile { .. }));
    }

    #[test]
    fn truncated_header_is_fatal() {
        for data in [&b""[..], b"TZ", b"TZif"] {
            let file = write_tzif(data);
            let err = TimezoneResolver::with_path(file.path()).read_footer().unwrap_err();
            assert!(matches!(err, BootstrapError::InvalidTimezoneFile { .. }));
        }
    }

    #[test]
    fn nul_footer_falls_back() {
        let file = write_tzif(b"TZif2\0\0\0\n\0\0\n");
        let mut env = MemoryEnvironment::new();

        let tz = TimezoneResolver::with_path(file.path()).resolve(&mut env).unwrap();

        assert!(!tz.contains('\0'));
        assert_eq!(tz, local_zone().to_posix());
    }

    #[test]
    fn legacy_version_skips_footer() {
        let file = write_tzif(&tzif(0, "UTC0"));
        assert_eq!(
            TimezoneResolver::with_path(file.path()).read_footer().unwrap(),
            None
        );
    }

    #[test]
    fn missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut env = MemoryEnvironment::new();

        let tz = TimezoneResolver::with_path(dir.path().join("localtime"))
            .resolve(&mut env)
            .unwrap();

        assert_eq!(env.var("TZ").as_deref(), Some(tz.as_str()));
        let zone = local_zone();
        assert!(!zone.std_name.is_empty());
        assert_eq!(tz, zone.to_posix());
    }

    #[test]
    fn default_path() {
        assert_eq!(TimezoneResolver::new().path(), Path::new("/etc/localtime"));
    }
}
