//! Ordered daemon bootstrap.

use crate::config::{self, ConfigEntry};
use crate::entropy::SeedPool;
use crate::environment::Environment;
use crate::error::Result;
use crate::process::{self, LogStreams};
use crate::timezone::TimezoneResolver;
use std::path::PathBuf;

/// What a successful [`Startup::run`] produced.
#[derive(Debug, Clone)]
pub struct Bootstrapped {
    /// Seed pool stirred with per-directive timestamps.
    pub seed: SeedPool,
    /// Accepted configuration directives, in file order.
    pub entries: Vec<ConfigEntry>,
    /// The `TZ` value in effect.
    pub timezone: String,
}

/// Startup sequence for the resolver daemon.
///
/// # Order
///
/// 1. Redirect output to the log file, if configured.
/// 2. Write the pid file, if configured.
/// 3. Resolve and publish `TZ`.
/// 4. Load the configuration file into the environment.
///
/// The first failure stops the sequence.
///
/// # Example
///
/// ```rust,ignore
/// use dnscache_bootstrap::{ProcessEnvironment, Startup};
///
/// let booted = Startup::new("/etc/dnscache.conf")
///     .with_pid_file("/var/run/dnscache.pid")
///     .run(&mut ProcessEnvironment)?;
/// ```
#[derive(Debug, Clone)]
pub struct Startup {
    config: PathBuf,
    log_file: Option<(PathBuf, LogStreams)>,
    pid_file: Option<PathBuf>,
    timezone: TimezoneResolver,
}

impl Startup {
    /// Creates a sequence loading `config`, using `/etc/localtime`.
    #[must_use]
    pub fn new(config: impl Into<PathBuf>) -> Self {
        Self {
            config: config.into(),
            log_file: None,
            pid_file: None,
            timezone: TimezoneResolver::new(),
        }
    }

    /// Redirects `streams` to `path` before anything else runs.
    #[must_use]
    pub fn with_log_file(mut self, path: impl Into<PathBuf>, streams: LogStreams) -> Self {
        self.log_file = Some((path.into(), streams));
        self
    }

    /// Writes the process id to `path`.
    #[must_use]
    pub fn with_pid_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.pid_file = Some(path.into());
        self
    }

    /// Overrides the timezone resolver.
    #[must_use]
    pub fn with_timezone(mut self, resolver: TimezoneResolver) -> Self {
        self.timezone = resolver;
        self
    }

    /// Runs the sequence against `env`.
    ///
    /// # Errors
    ///
    /// Returns the first error from any step.
    pub fn run(&self, env: &mut impl Environment) -> Result<Bootstrapped> {
        if let Some((path, streams)) = &self.log_file {
            process::redirect_to_log(path, *streams)?;
        }
        if let Some(path) = &self.pid_file {
            process::write_pid(path)?;
        }

        let timezone = self.timezone.resolve(env)?;

        let mut seed = SeedPool::new();
        let entries = config::load(&self.config, env, &mut seed)?;

        Ok(Bootstrapped {
            seed,
            entries,
            timezone,
        })
    }
}
