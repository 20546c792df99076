pub mod assessment;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod errors;
pub mod models;
pub mod policy;
pub mod session;

use crate::cli::Cli;
use crate::config::DashboardConfig;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;

pub fn run() -> ExitCode {
    let args = Cli::parse();

    let config = match DashboardConfig::load(args.config.as_deref(), args.data_dir.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{}", error);
            return ExitCode::from(2);
        }
    };

    let level = if args.verbose { "debug" } else { config.log_level.as_str() };
    // Dropping the guard flushes the log writer, so it lives until the command returns.
    let _log_guard = match init_tracing(&config.log_dir(), level) {
        Ok(guard) => Some(guard),
        Err(error) => {
            eprintln!("logging disabled: {}", error);
            None
        }
    };

    match cli::dispatch(args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "command failed");
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(log_dir: &Path, default_level: &str) -> Result<WorkerGuard, String> {
    std::fs::create_dir_all(log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())?;
    Ok(guard)
}
