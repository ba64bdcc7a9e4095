//! dirman - directory manager CLI
//!
//! Usage:
//!   dirman --root ~/inbox list          # List the root's children
//!   dirman walk --sizes                 # Recursive listing with sizes
//!   dirman compress reports /tmp/backup # Zip ./reports into /tmp/backup.zip
//!   dirman --init                       # Generate default config file

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{CommandFactory, Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dirman::config::{Config, ConfigError, CONFIG_FILE_NAME};
use dirman::{
    ArchiveFormat, CopyOptions, DateHelper, DirectoryManager, ItemComparer, ScriptRunner,
    TimeOffset,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "dirman")]
#[command(version)]
#[command(about = "Directory manager - list, copy, move, archive and clean up folders")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Generate a default configuration file
    #[arg(long)]
    init: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Root directory (defaults to the config's root, then ".")
    #[arg(short, long, global = true)]
    root: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether a path exists
    Exists { path: PathBuf },

    /// Check whether a path is a directory
    IsDir { path: PathBuf },

    /// List the root's immediate children
    List,

    /// Keep names matching a regex (searched, not fully matched)
    Filter {
        pattern: String,
        /// Names to filter; defaults to the root's children
        items: Vec<String>,
    },

    /// Create a directory under the root
    Mkdir { name: String },

    /// Copy files or folders into a destination folder
    Copy {
        #[arg(required = true)]
        items: Vec<PathBuf>,

        /// Destination folder
        #[arg(short, long)]
        to: PathBuf,

        /// Keep files that already exist at the destination
        #[arg(long)]
        no_overwrite: bool,

        /// Preserve access and modification times
        #[arg(long)]
        preserve: bool,
    },

    /// Move a folder into another folder
    Move { source: PathBuf, destination: PathBuf },

    /// Delete a file or folder tree
    Delete { path: PathBuf },

    /// Rename a file or folder
    Rename { path: PathBuf, new_name: PathBuf },

    /// List everything below a folder
    Walk {
        /// Folder to walk (defaults to the root)
        path: Option<PathBuf>,

        /// Include each entry's own size
        #[arg(long)]
        sizes: bool,
    },

    /// Total bytes of all files below a path
    Size { path: Option<PathBuf> },

    /// Archive a folder's contents
    Compress {
        path: PathBuf,

        /// Archive path without extension
        archive: PathBuf,

        /// zip, tar or tar.gz
        #[arg(long)]
        format: Option<ArchiveFormat>,
    },

    /// Unpack an archive into a folder
    Extract { archive: PathBuf, destination: PathBuf },

    /// Date helpers
    Date {
        #[command(subcommand)]
        action: DateCommand,
    },

    /// Check whether values are equal
    Compare {
        #[arg(num_args = 2.., required = true)]
        items: Vec<String>,
    },

    /// Run a Python script
    RunScript {
        path: PathBuf,

        /// Interpreter to use instead of the configured one
        #[arg(long)]
        interpreter: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum DateCommand {
    /// Current month number
    Month,
    /// Current date as M-D-YYYY
    Today,
    /// AM or PM
    Meridiem,
    /// Now plus offsets like days=3 hours=2 (months are 30 days)
    Add { offsets: Vec<String> },
    /// Now minus offsets like months=1 (calendar months)
    Subtract { offsets: Vec<String> },
}

/// Result of a command, rendered as text or JSON
struct Output {
    json: Value,
    lines: Vec<String>,
}

impl Output {
    fn new(json: Value, lines: Vec<String>) -> Self {
        Self { json, lines }
    }

    fn line(value: impl ToString) -> Self {
        let text = value.to_string();
        Self {
            json: Value::String(text.clone()),
            lines: vec![text],
        }
    }

    fn flag(value: bool) -> Self {
        Self {
            json: Value::Bool(value),
            lines: vec![value.to_string()],
        }
    }

    fn paths(paths: &[PathBuf]) -> Self {
        let lines: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
        Self {
            json: json!(lines),
            lines,
        }
    }

    fn print(&self, as_json: bool) -> Result<(), serde_json::Error> {
        if as_json {
            println!("{}", serde_json::to_string_pretty(&self.json)?);
        } else {
            for line in &self.lines {
                println!("{line}");
            }
        }
        Ok(())
    }
}

/// Explicit `--config` must load; discovered files fall through on error
fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    if let Some(path) = explicit {
        return Config::load(path);
    }

    let discovered = Config::default_locations()
        .into_iter()
        .filter(|path| path.exists())
        .find_map(|path| match Config::load(&path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("Warning: skipping config {}: {}", path.display(), e);
                None
            }
        });
    Ok(discovered.unwrap_or_default())
}

/// `RUST_LOG` wins over `level`. With a log file, output goes to both
/// stderr and the file.
fn init_logging(level: &str, log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let writer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            BoxMakeWriter::new(std::io::stderr.and(Mutex::new(file)))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(log_file.is_none()),
        )
        .init();
    Ok(())
}

fn run(
    command: Command,
    mut manager: DirectoryManager,
    config: &Config,
) -> Result<Output, Box<dyn std::error::Error>> {
    let output = match command {
        Command::Exists { path } => Output::flag(manager.exists(path)),
        Command::IsDir { path } => Output::flag(manager.is_directory(path)),
        Command::List => {
            let names = manager.list_top()?;
            Output::new(json!(names), names)
        }
        Command::Filter { pattern, items } => {
            let items = if items.is_empty() {
                manager.list_top()?
            } else {
                items
            };
            let matched = manager.filter_by_pattern(&pattern, &items)?;
            Output::new(json!(matched), matched)
        }
        Command::Mkdir { name } => Output::line(manager.create(name)?.display()),
        Command::Copy {
            items,
            to,
            no_overwrite,
            preserve,
        } => {
            let options = CopyOptions {
                overwrite: config.copy.overwrite && !no_overwrite,
                preserve_metadata: config.copy.preserve_metadata || preserve,
            };
            let report = manager.copy_into_with(&items, &to, &options)?;
            let mut lines: Vec<String> = report
                .copied
                .iter()
                .map(|p| format!("copied {}", p.display()))
                .collect();
            lines.extend(
                report
                    .errors
                    .iter()
                    .map(|f| format!("failed {}: {}", f.path.display(), f.error)),
            );
            Output::new(serde_json::to_value(&report)?, lines)
        }
        Command::Move {
            source,
            destination,
        } => Output::line(manager.move_folder(source, destination)?.display()),
        Command::Delete { path } => {
            manager.delete(&path)?;
            Output::line(format!("deleted {}", path.display()))
        }
        Command::Rename { path, new_name } => {
            Output::line(manager.rename(path, new_name)?.display())
        }
        Command::Walk { path, sizes } => {
            let path = path.unwrap_or_else(|| manager.root().to_path_buf());
            if sizes {
                let entries = manager.list_recursive_with_sizes(path)?;
                let lines = entries
                    .iter()
                    .map(|e| format!("{}\t{}", e.size, e.path.display()))
                    .collect();
                Output::new(serde_json::to_value(&entries)?, lines)
            } else {
                Output::paths(&manager.list_recursive(path)?)
            }
        }
        Command::Size { path } => {
            let path = path.unwrap_or_else(|| manager.root().to_path_buf());
            let total = manager.total_size(path)?;
            Output::new(json!(total), vec![total.to_string()])
        }
        Command::Compress {
            path,
            archive,
            format,
        } => {
            let format = format.unwrap_or(config.archive.format);
            Output::line(manager.compress_as(path, archive, format)?.display())
        }
        Command::Extract {
            archive,
            destination,
        } => Output::line(manager.extract(archive, destination)?.display()),
        Command::Date { action } => {
            let helper = DateHelper::now();
            match action {
                DateCommand::Month => Output::line(helper.current_month()),
                DateCommand::Today => Output::line(helper.current_full_date()),
                DateCommand::Meridiem => Output::line(helper.time_of_day()),
                DateCommand::Add { offsets } => {
                    let offset = TimeOffset::parse_assignments(&offsets)?;
                    Output::line(helper.add_time(&offset)?.format("%Y-%m-%d %H:%M:%S"))
                }
                DateCommand::Subtract { offsets } => {
                    let offset = TimeOffset::parse_assignments(&offsets)?;
                    Output::line(helper.subtract_time(&offset)?.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
        Command::Compare { items } => {
            let comparer = ItemComparer::new(items);
            let equal = comparer.compare_group()?;
            let unequal: Vec<String> = comparer.unequal_items()?.into_iter().cloned().collect();
            let mut lines = vec![equal.to_string()];
            lines.extend(unequal.iter().map(|item| format!("differs: {item}")));
            Output::new(json!({ "equal": equal, "unequal": unequal }), lines)
        }
        Command::RunScript { path, interpreter } => {
            let mut runner = ScriptRunner::new(manager.resolve(path));
            if let Some(interpreter) = interpreter.or_else(|| config.script.interpreter.clone()) {
                runner = runner.with_interpreter(interpreter);
            }
            let outcome = runner.run()?;
            let code = outcome
                .exit_code
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            Output::new(serde_json::to_value(outcome)?, vec![format!("exit {code}")])
        }
    };

    Ok(output)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        let config_path = args
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
        Config::default().save(&config_path)?;
        println!(
            "Created default configuration at: {}",
            config_path.display()
        );
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;
    let level = if args.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    init_logging(level, config.logging.file.as_deref())?;

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let root = args
        .root
        .or_else(|| config.root.clone())
        .unwrap_or_else(|| ".".to_string());
    tracing::debug!("Using root {}", root);
    let manager = DirectoryManager::new(root);

    match run(command, manager, &config) {
        Ok(output) => {
            output.print(args.json)?;
            Ok(())
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
