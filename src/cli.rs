//! Command-line interface implementation

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::error;

use crate::config::Config;
use crate::router::{CleanupOptions, FileRouter};

/// Exit codes
const EXIT_SUCCESS: u8 = 0;
const EXIT_ERROR: u8 = 1;
const EXIT_INVALID_ARGS: u8 = 2;

/// MCP server for driving the Aseprite sprite editor
#[derive(Parser)]
#[command(name = "aseprite-mcp")]
#[command(about = "MCP server for driving the Aseprite sprite editor")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the MCP server over stdio (the default)
    Serve,

    /// Delete old files from an output directory
    Clean {
        /// Directory to clean up
        directory: PathBuf,

        /// Glob pattern applied to file names
        #[arg(long, default_value = "*")]
        pattern: String,

        /// Only delete files older than this many days
        #[arg(long, default_value_t = 30)]
        max_age_days: u64,

        /// Report what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
}

/// Run the CLI application
pub async fn run() -> ExitCode {
    // Logs go to stderr; stdout belongs to the MCP transport.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(EXIT_INVALID_ARGS);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_serve(&config).await,
        Commands::Clean { directory, pattern, max_age_days, dry_run } => {
            run_clean(&config, &directory, pattern, max_age_days, dry_run)
        }
    }
}

async fn run_serve(config: &Config) -> ExitCode {
    match crate::mcp::run_server(config).await {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            error!(error = %e, "MCP server error");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn run_clean(
    config: &Config,
    directory: &PathBuf,
    pattern: String,
    max_age_days: u64,
    dry_run: bool,
) -> ExitCode {
    let router = FileRouter::from_config(config);
    let opts = CleanupOptions { pattern, max_age_days, dry_run };

    // Ctrl-C flips the flag; the scan checks it between entries.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        let _ = ctrlc_handler(move || cancel.store(true, Ordering::Relaxed));
    }

    match router.cleanup(directory, &opts, &cancel) {
        Ok(report) => {
            if report.dry_run {
                println!("{} file(s) would be deleted:", report.matched());
                for path in &report.candidates {
                    println!("  {}", path.display());
                }
            } else {
                println!(
                    "Deleted {} of {} file(s), reclaimed {} bytes",
                    report.deleted,
                    report.matched(),
                    report.bytes_reclaimed
                );
                for (path, reason) in &report.skipped {
                    println!("  skipped {}: {reason}", path.display());
                }
            }
            if report.cancelled {
                println!("(cancelled before finishing)");
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

fn ctrlc_handler<F: FnMut() + Send + 'static>(mut f: F) -> std::io::Result<()> {
    let runtime = tokio::runtime::Handle::try_current();
    if let Ok(handle) = runtime {
        handle.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                f();
            }
        });
    }
    Ok(())
}
