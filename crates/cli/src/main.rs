mod args;
mod output;
mod runner;
mod validator;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, EnvFilter};

use args::{Cli, Commands};
use runner::{run_check_url, run_probe, run_scan};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json, cli.log_file.as_deref())?;

    match cli.command {
        Commands::Scan(args) => run_scan(args).await?,
        Commands::Probe(args) => run_probe(args).await?,
        Commands::CheckUrl(args) => run_check_url(args).await?,
    }

    Ok(())
}

/// Logs go to stderr (or `log_file`) so stdout carries only results.
fn init_logging(verbose: u8, json: bool, log_file: Option<&Path>) -> Result<()> {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = fmt().with_env_filter(filter);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            let builder = builder.with_ansi(false).with_writer(Mutex::new(file));
            if json {
                builder.json().init();
            } else {
                builder.init();
            }
        }
        None => {
            let builder = builder.with_writer(std::io::stderr);
            if json {
                builder.json().init();
            } else {
                builder.compact().init();
            }
        }
    }
    Ok(())
}
