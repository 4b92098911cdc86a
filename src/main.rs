#![forbid(unsafe_code)]

//! `fifoline` — command-line front end for pipe-backed child sessions.
//!
//! Loads the session configuration, connects to the pipe pair, and either
//! sends a single command or runs an interactive shell over stdin.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::AsyncBufReadExt;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use fifoline::{AppError, Response, Result, Session, SessionConfig};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "fifoline", about = "Pipe-backed child process sessions", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the configured working directory for the child process.
    #[arg(long)]
    workspace: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send one command and print the response lines to stdout.
    ///
    /// Exits with status 1 when the response timed out before the sentinel.
    Send {
        /// Command line to send to the child.
        command: String,

        /// Per-line response timeout in seconds; 0 blocks until the
        /// sentinel. Defaults to the configured value.
        #[arg(long)]
        timeout_seconds: Option<u64>,
    },

    /// Interactive shell: each stdin line is sent as a command and its
    /// response printed, until end of input.
    Shell,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = SessionConfig::load_from_path(&args.config)?;

    // Override the working directory from the CLI if provided.
    if let Some(ws) = args.workspace {
        config.working_dir = ws
            .canonicalize()
            .map_err(|err| AppError::Config(format!("invalid workspace override: {err}")))?;
    }

    match args.command {
        Command::Send {
            command,
            timeout_seconds,
        } => {
            let timeout = resolve_timeout(timeout_seconds, &config);
            let mut session = Session::connect(config)?;
            session.ensure_running().await?;
            session.send(&command)?;
            let response = session.read_response(timeout).await?;
            print_response(&response);
            session.close().await?;

            if !response.complete {
                warn!("response incomplete: timed out waiting for sentinel");
                std::process::exit(1);
            }
        }
        Command::Shell => {
            let timeout = config.response_timeout();
            let mut session = Session::connect(config)?;
            let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();

            while let Some(line) = lines
                .next_line()
                .await
                .map_err(|err| AppError::Io(err.to_string()))?
            {
                if line.trim().is_empty() {
                    continue;
                }
                session.ensure_running().await?;
                session.send(&line)?;
                let response = session.read_response(timeout).await?;
                print_response(&response);
                if !response.complete {
                    warn!("response incomplete: timed out waiting for sentinel");
                }
            }

            // EOF before the first command means no child was ever
            // launched; closing would be a lifecycle error.
            match session.close().await {
                Ok(()) | Err(AppError::Session(_)) => {}
                Err(err) => return Err(err),
            }
        }
    }

    Ok(())
}

fn resolve_timeout(override_seconds: Option<u64>, config: &SessionConfig) -> Option<Duration> {
    match override_seconds {
        Some(0) => None,
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None => config.response_timeout(),
    }
}

fn print_response(response: &Response) {
    for line in &response.lines {
        // Lines carry their own terminators.
        print!("{line}");
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
