//! # dnscache-bootstrap
//!
//! Startup plumbing for a dnscache-style caching DNS resolver.
//!
//! Before the resolver answers its first query it needs three things from
//! its surroundings:
//!
//! - **Configuration**: a `KEY=VALUE` file whose keys are checked against a
//!   fixed whitelist and published into the environment, where the rest of
//!   the daemon reads them ([`config`]).
//! - **Local time**: a `TZ` value taken from the footer of the TZif
//!   database, so timestamps stay correct after the daemon chroots away
//!   from `/etc/localtime` ([`timezone`]).
//! - **Seed material**: a small pool stirred with timestamps taken while
//!   the configuration loads ([`entropy`]).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use dnscache_bootstrap::{ProcessEnvironment, Startup};
//!
//! let booted = Startup::new("/etc/dnscache.conf")
//!     .with_pid_file("/var/run/dnscache.pid")
//!     .run(&mut ProcessEnvironment)?;
//!
//! let seed = booted.seed.seed_bytes();
//! ```
//!
//! ## Testing without touching the process
//!
//! Every operation that publishes variables takes an [`Environment`].
//! [`MemoryEnvironment`] keeps them in a map instead of the process
//! environment:
//!
//! ```
//! use dnscache_bootstrap::{Environment, MemoryEnvironment, SeedPool, config};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("dnscache.conf");
//! std::fs::write(&path, "IP=127.0.0.1\n# comment\nCACHESIZE=1000000\n").unwrap();
//!
//! let mut env = MemoryEnvironment::new();
//! config::load(&path, &mut env, &mut SeedPool::new()).unwrap();
//! assert_eq!(env.var("CACHESIZE").as_deref(), Some("1000000"));
//! ```
//!
//! ## Thread safety
//!
//! Bootstrap is single-threaded. [`ProcessEnvironment`] writes the process
//! environment and must only be used before other threads exist.

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod entropy;
pub mod environment;
pub mod error;
pub mod process;
pub mod startup;
pub mod text;
pub mod timezone;

pub use config::{ConfigEntry, ConfigKey};
pub use entropy::SeedPool;
pub use environment::{Environment, MemoryEnvironment, ProcessEnvironment};
pub use error::{BootstrapError, Result};
pub use process::LogStreams;
pub use startup::{Bootstrapped, Startup};
pub use timezone::TimezoneResolver;
