//! `dnscache-bootstrap`: prepare the environment, then exec the resolver.
//!
//! ```bash
//! dnscache-bootstrap --config /etc/dnscache.conf \
//!     --pid-file /var/run/dnscache.pid -- /usr/sbin/dnscache
//! ```
//!
//! Without a command the accepted variables are printed instead.
//!
//! The binary only prepares the environment. The seed pool stirred during
//! configuration loading stays in this process and is not passed on; a
//! resolver that wants it embeds the library and reads
//! `Bootstrapped::seed` instead.

use clap::Parser;
use dnscache_bootstrap::{
    BootstrapError, LogStreams, ProcessEnvironment, Startup, TimezoneResolver, process,
};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{Command, ExitCode};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "dnscache-bootstrap", version, about)]
struct Cli {
    /// KEY=VALUE configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Append stdout and stderr to this file.
    #[arg(short, long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Write the process id here.
    #[arg(short, long, value_name = "FILE")]
    pid_file: Option<PathBuf>,

    /// TZif file used when TZ is unset.
    #[arg(long, value_name = "FILE", default_value = "/etc/localtime")]
    zoneinfo: PathBuf,

    /// Program to exec with the prepared environment.
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    process::install_term_handler();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("dnscache-bootstrap: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), BootstrapError> {
    let mut startup =
        Startup::new(&cli.config).with_timezone(TimezoneResolver::with_path(&cli.zoneinfo));
    if let Some(path) = &cli.log_file {
        startup = startup.with_log_file(path, LogStreams::Both);
    }
    if let Some(path) = &cli.pid_file {
        startup = startup.with_pid_file(path);
    }

    let booted = startup.run(&mut ProcessEnvironment)?;

    let Some((program, args)) = cli.command.split_first() else {
        for entry in &booted.entries {
            if let Some(value) = &entry.value {
                println!("{}={value}", entry.key);
            }
        }
        println!("TZ={}", booted.timezone);
        return Ok(());
    };

    tracing::info!(program = %program, "Handing over to resolver");
    let err = Command::new(program).args(args).exec();
    Err(BootstrapError::Io {
        path: PathBuf::from(program),
        source: err,
    })
}
