use clap::{Parser, Subcommand};
use colored::Colorize;
use deferral::rejection::{self, MODE_ENV};
use deferral::RejectionMode;
use deferral_adapters::AdapterError;
use std::process;
use tracing_subscriber::EnvFilter;

mod commands;

/// Exit codes: 0 = OK, 2 = input error (bad path, bad arguments), 1 = other.
#[allow(dead_code)]
const EXIT_OK: i32 = 0;
const EXIT_OTHER: i32 = 1;
const EXIT_INPUT: i32 = 2;

#[derive(Parser)]
#[command(name = "deferralx", version, about = "Deferral CLI: adapted stat and timers")]
struct Cli {
    /// Log filter (tracing env-filter syntax)
    #[arg(long, env = "DEFERRAL_LOG", default_value = "warn")]
    log_level: String,

    /// Unhandled-rejection mode: warn, strict or none. Overrides
    /// DEFERRAL_UNHANDLED_REJECTIONS; strict when neither is set.
    #[arg(long)]
    unhandled: Option<RejectionMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print file metadata as JSON
    Stat {
        /// Path to inspect
        path: String,
        /// Do not follow a trailing symlink
        #[arg(long)]
        lstat: bool,
    },
    /// Fulfil with a value after a delay
    Timeout {
        /// Delay in milliseconds
        ms: u64,
        /// Fulfilment value (JSON, or a bare string)
        #[arg(long)]
        value: Option<String>,
        /// Cancel the timer before it fires
        #[arg(long)]
        cancel: bool,
        /// How long to wait for a cancelled timer (default: twice the delay)
        #[arg(long)]
        grace_ms: Option<u64>,
    },
    /// Fulfil with a value on the next turn
    Immediate {
        /// Fulfilment value (JSON, or a bare string)
        #[arg(long)]
        value: Option<String>,
        /// Cancel before it runs
        #[arg(long)]
        cancel: bool,
        /// How long to wait for a cancelled immediate
        #[arg(long, default_value_t = 50)]
        grace_ms: u64,
    },
}

/// Bad paths are input errors; everything else, including EIO, is 1.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AdapterError>() {
        Some(e) if e.is_bad_path() => EXIT_INPUT,
        _ => EXIT_OTHER,
    }
}

/// Flag, then environment (invalid values fall back to warn), then strict.
fn unhandled_mode(flag: Option<RejectionMode>, env: Option<&str>) -> RejectionMode {
    flag.unwrap_or_else(|| rejection::resolve_mode(env, RejectionMode::Strict))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let env_mode = std::env::var(MODE_ENV).ok();
    let mode = unhandled_mode(cli.unhandled, env_mode.as_deref());
    rejection::set_mode(mode);
    tracing::debug!(%mode, "unhandled-rejection mode");

    let result = match cli.command {
        Commands::Stat { path, lstat } => commands::stat(&path, lstat).await,
        Commands::Timeout {
            ms,
            value,
            cancel,
            grace_ms,
        } => commands::timeout(ms, value.as_deref(), cancel, grace_ms).await,
        Commands::Immediate {
            value,
            cancel,
            grace_ms,
        } => commands::immediate(value.as_deref(), cancel, grace_ms).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        process::exit(exit_code_for(&e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_timeout_flags() {
        let cli = Cli::parse_from([
            "deferralx",
            "--unhandled",
            "none",
            "timeout",
            "25",
            "--value",
            "foobar",
            "--cancel",
        ]);
        assert_eq!(cli.unhandled, Some(RejectionMode::None));
        match cli.command {
            Commands::Timeout {
                ms, value, cancel, grace_ms,
            } => {
                assert_eq!(ms, 25);
                assert_eq!(value.as_deref(), Some("foobar"));
                assert!(cancel);
                assert_eq!(grace_ms, None);
            }
            _ => panic!("expected timeout"),
        }
    }

    #[test]
    fn rejects_unknown_unhandled_mode() {
        let parsed = Cli::try_parse_from(["deferralx", "--unhandled", "throw", "immediate"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn unhandled_mode_precedence() {
        assert_eq!(unhandled_mode(None, None), RejectionMode::Strict);
        assert_eq!(unhandled_mode(None, Some("none")), RejectionMode::None);
        assert_eq!(unhandled_mode(None, Some("bogus")), RejectionMode::Warn);
        assert_eq!(
            unhandled_mode(Some(RejectionMode::None), Some("strict")),
            RejectionMode::None
        );
    }

    #[test]
    fn exit_codes() {
        let missing = std::io::Error::from(std::io::ErrorKind::NotFound);
        let io = AdapterError::from_io(&missing, "stat", std::path::Path::new("/x"));
        assert_eq!(exit_code_for(&io.into()), EXIT_INPUT);

        let eio = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let eio = AdapterError::from_io(&eio, "stat", std::path::Path::new("/x"));
        assert_eq!(exit_code_for(&eio.into()), EXIT_OTHER);

        let no_rt = AdapterError::NoRuntime { op: "setTimeout" };
        assert_eq!(exit_code_for(&no_rt.into()), EXIT_OTHER);
        assert_eq!(exit_code_for(&anyhow::anyhow!("cancel")), EXIT_OTHER);
    }
}
