use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playcheck::config::{Config, ProbeMethod};

mod commands;

use commands::{CheckParams, ServeParams};

#[derive(Parser)]
#[command(
    name = "playcheck",
    version,
    about = "Merge M3U playlists and keep one working stream per channel",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and skip the summary
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,

    /// TOML configuration file (defaults come from PLAYCHECK_* variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check playlists and write the working channels
    Check {
        /// Playlist file or directory of playlists
        input: PathBuf,

        /// Output playlist path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Maximum number of concurrent probes
        #[arg(short, long)]
        workers: Option<usize>,

        /// Timeout of one probe in seconds
        #[arg(short, long)]
        timeout: Option<f64>,

        /// Retries per location after the first attempt
        #[arg(short = 'r', long)]
        max_retries: Option<u32>,

        /// Backup locations of one channel probed at once
        #[arg(long)]
        lookahead: Option<usize>,

        /// HTTP method used for probing (head, get)
        #[arg(long)]
        method: Option<ProbeMethod>,

        /// Count a final redirect response as a failure
        #[arg(long, default_value = "false")]
        no_redirects_reachable: bool,

        /// Maximum probe attempts per second
        #[arg(long)]
        rate_limit: Option<u32>,

        /// Skip channels whose tvg-id appears in these playlists
        #[arg(long)]
        filter_duplicates: Option<PathBuf>,

        /// Write Prometheus metrics to this file after the run
        #[arg(long)]
        metrics_file: Option<PathBuf>,
    },

    /// Show how playlists group into channels without probing
    Inspect {
        /// Playlist file or directory of playlists
        input: PathBuf,
    },

    /// Serve the playlists of a directory to TVs and media players
    Serve {
        /// Directory holding the playlists
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,

        /// Server host
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Server port
        #[arg(short, long, default_value = "8081")]
        port: u16,

        /// Refuse to start unless this playlist exists in the directory
        #[arg(long)]
        playlist: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::from_env().context("Failed to read PLAYCHECK_* environment")?,
    };

    // Initialize tracing/logging
    let log_format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());
    setup_tracing(&log_format, &config.logging.level, cli.verbose, cli.quiet)?;

    match cli.command {
        Commands::Check {
            input,
            output,
            workers,
            timeout,
            max_retries,
            lookahead,
            method,
            no_redirects_reachable,
            rate_limit,
            filter_duplicates,
            metrics_file,
        } => {
            if let Some(workers) = workers {
                config.checker.workers = workers;
            }
            if let Some(timeout) = timeout {
                config.checker.timeout_secs = timeout;
            }
            if let Some(max_retries) = max_retries {
                config.retry.max_retries = max_retries;
            }
            if let Some(lookahead) = lookahead {
                config.checker.lookahead = lookahead;
            }
            if let Some(method) = method {
                config.probe.method = method;
            }
            if no_redirects_reachable {
                config.probe.redirects_are_reachable = false;
            }
            if rate_limit.is_some() {
                config.checker.rate_limit = rate_limit;
            }

            tracing::info!(
                input = %input.display(),
                workers = config.checker.workers,
                timeout_secs = config.checker.timeout_secs,
                max_retries = config.retry.max_retries,
                "Starting check command"
            );

            let params = CheckParams {
                input,
                output,
                filter_duplicates,
                metrics_file,
                quiet: cli.quiet,
            };
            commands::check(config, params).await?;
        }

        Commands::Inspect { input } => {
            tracing::info!(input = %input.display(), "Starting inspect command");
            commands::inspect(input)?;
        }

        Commands::Serve {
            dir,
            host,
            port,
            playlist,
        } => {
            tracing::info!(dir = %dir.display(), port, "Starting serve command");
            commands::serve(ServeParams {
                dir,
                host,
                port,
                playlist,
            })
            .await?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool, quiet: bool) -> Result<()> {
    let env_filter = if quiet {
        tracing_subscriber::EnvFilter::new("warn")
    } else if verbose {
        tracing_subscriber::EnvFilter::new("playcheck=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_new(format!("playcheck={level},warn"))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
