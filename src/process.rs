//! Process plumbing: log redirection, pid file, termination signal.

use crate::error::{BootstrapError, Result};
use std::fs::OpenOptions;
use std::io::Write;
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

/// Which standard streams [`redirect_to_log`] replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogStreams {
    Stdout,
    Stderr,
    #[default]
    Both,
}

impl LogStreams {
    fn targets(self) -> &'static [(libc::c_int, &'static str)] {
        match self {
            Self::Stdout => &[(libc::STDOUT_FILENO, "stdout")],
            Self::Stderr => &[(libc::STDERR_FILENO, "stderr")],
            Self::Both => &[
                (libc::STDOUT_FILENO, "stdout"),
                (libc::STDERR_FILENO, "stderr"),
            ],
        }
    }
}

/// Points stdout and/or stderr at `logfile`, opened for appending.
///
/// The file is created with mode `0600` if missing.
///
/// # Errors
///
/// Returns [`BootstrapError::Io`] if the file cannot be opened and
/// [`BootstrapError::Redirect`] if a descriptor cannot be duplicated.
pub fn redirect_to_log(logfile: impl AsRef<Path>, streams: LogStreams) -> Result<()> {
    let logfile = logfile.as_ref();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600)
        .open(logfile)
        .map_err(|e| BootstrapError::io(logfile, e))?;

    for &(fd, stream) in streams.targets() {
        // SAFETY: both descriptors are open; dup2 atomically replaces `fd`.
        if unsafe { libc::dup2(file.as_raw_fd(), fd) } == -1 {
            return Err(BootstrapError::Redirect {
                stream,
                source: std::io::Error::last_os_error(),
            });
        }
    }

    tracing::debug!(path = %logfile.display(), ?streams, "Redirected output to log file");
    Ok(())
}

/// Writes the current pid and a newline to `pidfile`, mode `0644`.
///
/// # Errors
///
/// Returns [`BootstrapError::Io`] if the file cannot be created or written.
pub fn write_pid(pidfile: impl AsRef<Path>) -> Result<()> {
    let pidfile = pidfile.as_ref();
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o644)
        .open(pidfile)
        .map_err(|e| BootstrapError::io(pidfile, e))?;

    let pid = std::process::id();
    writeln!(file, "{pid}").map_err(|e| BootstrapError::io(pidfile, e))?;

    tracing::debug!(path = %pidfile.display(), pid, "Wrote pid file");
    Ok(())
}

/// Installs a `SIGTERM` handler that reports the signal and exits with 0.
pub fn install_term_handler() {
    let handler = on_term as extern "C" fn(libc::c_int);
    // SAFETY: `on_term` only calls async-signal-safe functions.
    let previous = unsafe { libc::signal(libc::SIGTERM, handler as libc::sighandler_t) };
    if previous == libc::SIG_ERR {
        let err = std::io::Error::last_os_error();
        tracing::warn!("Could not install SIGTERM handler: {err}");
    }
}

extern "C" fn on_term(signal: libc::c_int) {
    let mut buf = [0u8; 64];
    let len = signal_message(signal, &mut buf);
    // SAFETY: write(2) and _exit(2) are async-signal-safe.
    unsafe {
        libc::write(libc::STDERR_FILENO, buf.as_ptr().cast(), len);
        libc::_exit(0);
    }
}

/// Formats `going down with signal: N\n` into `buf` without allocating.
#[allow(clippy::cast_possible_truncation)]
fn signal_message(signal: libc::c_int, buf: &mut [u8; 64]) -> usize {
    const PREFIX: &[u8] = b"going down with signal: ";
    buf[..PREFIX.len()].copy_from_slice(PREFIX);
    let mut len = PREFIX.len();

    let mut digits = [0u8; 12];
    let mut n = signal.unsigned_abs();
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    if signal < 0 {
        i -= 1;
        digits[i] = b'-';
    }

    let tail = &digits[i..];
    buf[len..len + tail.len()].copy_from_slice(tail);
    len += tail.len();
    buf[len] = b'\n';
    len + 1
}
