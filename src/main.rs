use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fstk::app::TaskEdit;
use fstk::model::ColorGroup;
use fstk::output::Format;
use fstk::store::workspace::{CONFIG_FOLDER_ENV, default_config_folder};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser)]
#[command(
    name = "fstk",
    version = fstk::build_info::long_version(),
    about = "Fast Switch Time Keeper: track time across tasks you switch between"
)]
struct Cli {
    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: Format,
    /// Shorthand for --format pretty
    #[arg(long, global = true, hide = true)]
    pretty: bool,
    /// Folder holding config.json, tasks.json and the instance lock
    #[arg(long, global = true, env = CONFIG_FOLDER_ENV)]
    config_folder: Option<PathBuf>,
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Log file (default: fstk.log in the temp directory)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tasks with their tracked time
    List,
    /// Add a task
    Add {
        /// Task name
        name: String,
        /// Issue tracker ticket number (a leading # is accepted)
        #[arg(long)]
        ticket: Option<String>,
        /// Color group
        #[arg(long, value_enum, default_value = "none")]
        color: ColorGroup,
        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Edit task fields
    Edit {
        /// Task index
        index: usize,
        /// New name
        #[arg(long)]
        name: Option<String>,
        /// New ticket number (empty string clears it)
        #[arg(long)]
        ticket: Option<String>,
        /// New color group
        #[arg(long, value_enum)]
        color: Option<ColorGroup>,
        /// New notes
        #[arg(long)]
        notes: Option<String>,
    },
    /// Delete a task
    Delete {
        /// Task index
        index: usize,
    },
    /// Add (or with a negative value, remove) tracked seconds
    Adjust {
        /// Task index
        index: usize,
        /// Seconds to add; negative values subtract
        #[arg(allow_negative_numbers = true)]
        seconds: i64,
    },
    /// Reset a task's tracked time to zero
    Clear {
        /// Task index
        index: usize,
    },
    /// Move a task to another position
    Move {
        /// Current index
        from: usize,
        /// Target index
        to: usize,
    },
    /// Track time on a task, one tick per second
    Run {
        /// Task index
        index: usize,
        /// Stop after this many seconds (default: run until stopped)
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Pause time tracking
    Pause,
    /// Resume time tracking
    Resume,
    /// Show usage counters
    Stats,
    /// Read or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the value at a dotted path (e.g. options.redmine.host)
    Get { path: String },
    /// Set the value at a dotted path; the value is parsed as JSON when possible
    Set {
        path: String,
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
}

/// Logs go to a file so that stdout stays machine-readable. The returned
/// guard must be held until exit to flush buffered entries.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("fstk.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

fn run(cli: Cli, format: Format) -> fstk::error::Result<()> {
    let folder = match cli.config_folder {
        Some(folder) => folder,
        None => default_config_folder()?,
    };
    let folder = folder.as_path();

    match cli.command {
        Commands::List => fstk::commands::list::run(folder, format),
        Commands::Add {
            name,
            ticket,
            color,
            notes,
        } => fstk::commands::create::run(folder, name, ticket, color, notes, format),
        Commands::Edit {
            index,
            name,
            ticket,
            color,
            notes,
        } => {
            let edit = TaskEdit {
                name,
                ticket,
                color_group: color,
                notes,
            };
            fstk::commands::edit::run(folder, index, edit, format)
        }
        Commands::Delete { index } => fstk::commands::delete::run(folder, index, format),
        Commands::Adjust { index, seconds } => {
            fstk::commands::time::adjust(folder, index, seconds, format)
        }
        Commands::Clear { index } => fstk::commands::time::clear(folder, index, format),
        Commands::Move { from, to } => fstk::commands::reorder::run(folder, from, to, format),
        Commands::Run { index, duration } => {
            fstk::commands::time::run(folder, index, duration, format)
        }
        Commands::Pause => fstk::commands::time::pause(folder, format),
        Commands::Resume => fstk::commands::time::resume(folder, format),
        Commands::Stats => fstk::commands::stats::run(folder, format),
        Commands::Config { action } => match action {
            ConfigAction::Get { path } => fstk::commands::config::get(folder, &path, format),
            ConfigAction::Set { path, value } => {
                fstk::commands::config::set(folder, &path, &value, format)
            }
        },
    }
}

fn main() {
    let cli = Cli::parse();
    let format = if cli.pretty {
        Format::Pretty
    } else {
        cli.format
    };
    let log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());
    tracing::info!(version = fstk::build_info::long_version(), "fstk starting");

    if let Err(e) = run(cli, format) {
        tracing::error!(error = %e, fatal = e.is_fatal(), "command failed");
        match format {
            Format::Json => {
                eprintln!(
                    "{}",
                    serde_json::json!({
                        "error": e.code(),
                        "message": e.to_string()
                    })
                );
            }
            Format::Pretty => eprintln!("error: {e}"),
        }
        // Dropping the guard flushes the log before exiting.
        drop(log_guard);
        std::process::exit(1);
    }
}
