//! flashcopy - asynchronous copy and delete for image flashing workflows.
//!
//! Usage:
//!   fcp copy SRC DST [--temp-dir DIR]   Copy an image, then reclaim DIR
//!   fcp delete PATH                     Delete a file or directory
//!   fcp size PATH                       Print a file's size in bytes
//!   fcp space [PATH]                    Print free space on PATH's volume
//!   fcp --help                          Show help

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing_subscriber::EnvFilter;

use flashcopy_core::{CoordinatorConfig, ExclusionPolicy};
use flashcopy_ops::{FsWorker, Notification, TaskCoordinator, available_space, file_size};

#[derive(Parser)]
#[command(
    name = "flashcopy",
    version,
    about = "Copy and delete disk images without blocking",
    long_about = "flashcopy runs copy and delete operations on background tasks, \
                  reports progress as they go, and reclaims staging directories \
                  once a copy has finished."
)]
struct Cli {
    /// Log coordinator activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Let only one operation of any kind run at a time
    #[arg(long, global = true)]
    exclusive: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Copy a file, creating the destination directory if needed
    Copy {
        /// File to copy
        source: PathBuf,

        /// Destination file path
        destination: PathBuf,

        /// Staging directory to remove once the copy finishes
        #[arg(short, long)]
        temp_dir: Option<PathBuf>,
    },

    /// Delete a file or directory
    Delete {
        /// Path to delete
        path: PathBuf,
    },

    /// Print the size of a file in bytes
    Size {
        /// File to inspect
        path: PathBuf,
    },

    /// Print the free space on the volume containing a path
    Space {
        /// Path on the volume (defaults to the filesystem root)
        #[arg(default_value = "")]
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exclusion = if cli.exclusive {
        ExclusionPolicy::Exclusive
    } else {
        ExclusionPolicy::Compatible
    };
    let config = CoordinatorConfig::with_exclusion(exclusion);

    match cli.command {
        Command::Copy {
            source,
            destination,
            temp_dir,
        } => run_copy(config, source, destination, temp_dir).await?,
        Command::Delete { path } => run_delete(config, path).await?,
        Command::Size { path } => run_size(&path),
        Command::Space { path } => run_space(&path),
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run a copy and draw its progress.
async fn run_copy(
    config: CoordinatorConfig,
    source: PathBuf,
    destination: PathBuf,
    temp_dir: Option<PathBuf>,
) -> Result<()> {
    let source = source.canonicalize().context("Invalid source path")?;
    let mut coordinator = TaskCoordinator::new(Arc::new(FsWorker::new()), config);
    let mut notifications = coordinator.subscribe();

    coordinator
        .start_copy(&source, &destination, temp_dir)
        .context("Copy could not be started")?;

    eprintln!("Copying {} -> {}", source.display(), destination.display());

    let mut failure = None;
    while coordinator.process_next().await {
        draw_progress(
            coordinator.copied_bytes(),
            coordinator.total_bytes(),
            coordinator.progress_percent(),
        );
        for notification in drain(&mut notifications) {
            if let Notification::CopyFailed(message) = notification {
                failure = Some(message);
            }
        }
    }
    eprintln!();

    if let Some(message) = failure {
        bail!("Copy failed: {}", message);
    }

    println!(
        "Copied {} to {}",
        format_size(coordinator.total_bytes()),
        destination.display()
    );
    Ok(())
}

/// Run a delete and report the result.
async fn run_delete(config: CoordinatorConfig, path: PathBuf) -> Result<()> {
    let mut coordinator = TaskCoordinator::new(Arc::new(FsWorker::new()), config);
    let mut notifications = coordinator.subscribe();

    coordinator
        .start_delete(&path)
        .context("Delete could not be started")?;
    coordinator.run_until_idle().await;

    for notification in drain(&mut notifications) {
        match notification {
            Notification::DeleteSucceeded(path) => {
                println!("Deleted {}", path.display());
                return Ok(());
            }
            Notification::DeleteFailed(message) => bail!("Delete failed: {}", message),
            _ => {}
        }
    }

    bail!("Delete finished without a result")
}

fn run_size(path: &Path) {
    match file_size(path) {
        -1 => println!("{}: not found", path.display()),
        size => println!("{}: {} bytes ({})", path.display(), size, format_size(size as u64)),
    }
}

fn run_space(path: &Path) {
    let available = available_space(path);
    let shown = if path.as_os_str().is_empty() {
        "/".to_string()
    } else {
        path.display().to_string()
    };
    println!("{}: {} available", shown, format_size(available));
}

/// Collect every notification queued so far.
fn drain(rx: &mut broadcast::Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(notification) => out.push(notification),
            Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
    out
}

fn draw_progress(copied: u64, total: u64, percent: u8) {
    let filled = usize::from(percent) * 30 / 100;
    eprint!(
        "\r [{}{}] {:>3}%  {} / {}",
        "█".repeat(filled),
        " ".repeat(30 - filled),
        percent,
        format_size(copied),
        format_size(total)
    );
    let _ = std::io::stderr().flush();
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
