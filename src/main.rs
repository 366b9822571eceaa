//! ferry - cancellable, promptable file operations from the command line.
//!
//! Usage:
//!   ferry touch FILE...            Create empty files
//!   ferry mkdir DIR...             Create directories
//!   ferry rm PATH...               Delete recursively
//!   ferry cp SOURCE... DEST        Copy files and directories
//!   ferry mv SOURCE... DEST        Move files and directories
//!   ferry ls [DIR]                 List a directory
//!   ferry --help                   Show help

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail, eyre};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ferry_core::PERMISSION_BITS;
use ferry_ops::{
    EngineConfig, EntryKind, FileInfo, FileList, FileOperation, FileRef, Handoff, JobObserver,
    JobOutcome, JobProgress, JobRunner, ModeChange, OverwriteResponse, Ownership, PermissionSpec,
    SkipResponse,
};

#[derive(Parser)]
#[command(
    name = "ferry",
    version,
    about = "Cancellable, promptable file operations",
    long_about = "ferry runs file operations as background jobs with progress reporting.\n\n\
                  Conflicts and failures are asked about interactively unless \
                  --yes or --no is given."
)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Answer every prompt with yes (overwrite) or skip
    #[arg(short, long, global = true, conflicts_with = "no")]
    yes: bool,

    /// Answer every prompt with no (keep existing) or skip
    #[arg(short, long, global = true)]
    no: bool,

    /// Do not show progress
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create empty files
    Touch {
        #[arg(required = true)]
        files: Vec<String>,
    },

    /// Create directories
    Mkdir {
        #[arg(required = true)]
        dirs: Vec<String>,
    },

    /// Delete files and directories recursively
    Rm {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Create symbolic links to SOURCES in or at DEST
    Ln {
        #[arg(required = true, num_args = 2..)]
        paths: Vec<String>,
    },

    /// Move files to the trash
    Trash {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Move a trashed file back to its original location
    Restore {
        /// The file in the trash
        trashed: String,

        /// Where it should go back to
        original: String,
    },

    /// Change the owning user or group
    Chown {
        /// Numeric user id
        #[arg(short, long, conflicts_with = "group", required_unless_present = "group")]
        user: Option<u32>,

        /// Numeric group id
        #[arg(short, long)]
        group: Option<u32>,

        /// Change everything below directories too
        #[arg(short = 'R', long)]
        recursive: bool,

        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Change permission bits
    Chmod {
        /// Octal mode, e.g. 644
        mode: String,

        /// Different octal mode for directories, e.g. 755
        #[arg(short, long)]
        dir_mode: Option<String>,

        /// Change everything below directories too
        #[arg(short = 'R', long)]
        recursive: bool,

        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List the contents of a directory
    Ls {
        #[arg(default_value = ".")]
        dir: String,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Move SOURCES into or to DEST
    Mv {
        #[arg(required = true, num_args = 2..)]
        paths: Vec<String>,
    },

    /// Copy SOURCES into or to DEST
    Cp {
        #[arg(required = true, num_args = 2..)]
        paths: Vec<String>,
    },

    /// Give a file a new name in its directory
    Rename {
        file: String,
        new_name: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// How prompts are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerMode {
    Ask,
    Yes,
    No,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    let runner = JobRunner::new(config);

    let answers = if cli.yes {
        AnswerMode::Yes
    } else if cli.no {
        AnswerMode::No
    } else {
        AnswerMode::Ask
    };

    let (operation, format) = build_operation(cli.command)?;
    let mut observer = TerminalObserver::new(answers, !cli.quiet);

    let handle = runner.launch(operation)?;
    debug!(id = %handle.id(), kind = %handle.kind(), "Launched");

    let outcome = handle.run(&mut observer).await;
    observer.finish_progress();

    match outcome {
        JobOutcome::Succeeded => {
            if let Some(format) = format {
                print_listing(&observer.listing, format)?;
            }
            Ok(())
        }
        JobOutcome::Failed(err) => Err(eyre!(err)),
        JobOutcome::Cancelled => bail!("Cancelled"),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "ferry=info,ferry_ops=warn",
        1 => "ferry=debug,ferry_ops=debug,ferry_scan=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    EngineConfig::from_json(&json).map_err(|e| eyre!("Invalid config {}: {e}", path.display()))
}

/// Turn a subcommand into an operation. Listings also return their format.
fn build_operation(command: Command) -> Result<(FileOperation, Option<OutputFormat>)> {
    let operation = match command {
        Command::Touch { files } => FileOperation::Create {
            files: parse_all(&files),
        },
        Command::Mkdir { dirs } => FileOperation::Mkdir {
            files: parse_all(&dirs),
        },
        Command::Rm { paths } => FileOperation::Unlink {
            files: parse_all(&paths),
        },
        Command::Ln { paths } => {
            let (sources, targets) = pair_with_destination(&paths)?;
            FileOperation::Link { sources, targets }
        }
        Command::Trash { paths } => FileOperation::Trash {
            files: parse_all(&paths),
        },
        Command::Restore { trashed, original } => FileOperation::Restore {
            sources: vec![FileRef::parse(&trashed)],
            targets: vec![FileRef::parse(&original)],
        },
        Command::Chown {
            user,
            group,
            recursive,
            paths,
        } => FileOperation::Chown {
            files: parse_all(&paths),
            ownership: Ownership::from_ids(user, group)?,
            recursive,
        },
        Command::Chmod {
            mode,
            dir_mode,
            recursive,
            paths,
        } => {
            let files = ModeChange::new(PERMISSION_BITS, parse_mode(&mode)?);
            let directories = match dir_mode {
                Some(dir_mode) => ModeChange::new(PERMISSION_BITS, parse_mode(&dir_mode)?),
                None => files,
            };
            FileOperation::Chmod {
                files: parse_all(&paths),
                permissions: PermissionSpec { directories, files },
                recursive,
            }
        }
        Command::Ls { dir, format } => {
            return Ok((
                FileOperation::List {
                    directory: FileRef::parse(&dir),
                },
                Some(format),
            ));
        }
        Command::Mv { paths } => {
            let (sources, targets) = pair_with_destination(&paths)?;
            FileOperation::Move { sources, targets }
        }
        Command::Cp { paths } => {
            let (sources, targets) = pair_with_destination(&paths)?;
            FileOperation::Copy { sources, targets }
        }
        Command::Rename { file, new_name } => FileOperation::rename(FileRef::parse(&file), new_name),
    };

    Ok((operation, None))
}

fn parse_all(inputs: &[String]) -> FileList {
    inputs.iter().map(|input| FileRef::parse(input)).collect()
}

/// Split `SOURCE... DEST` into pairwise lists.
///
/// With several sources, or when DEST is an existing directory, every
/// source keeps its name inside DEST. Otherwise DEST is the target itself.
fn pair_with_destination(paths: &[String]) -> Result<(FileList, FileList)> {
    let Some((destination, sources)) = paths.split_last() else {
        bail!("Missing destination");
    };

    let destination = FileRef::parse(destination);
    let sources = parse_all(sources);
    let into_directory = sources.len() > 1
        || destination
            .local_path()
            .is_some_and(|path| path.is_dir());

    let targets = if into_directory {
        sources
            .iter()
            .map(|source| {
                source
                    .basename()
                    .map(|name| destination.join(name))
                    .ok_or_else(|| eyre!("Cannot determine the name of {source}"))
            })
            .collect::<Result<FileList>>()?
    } else {
        vec![destination]
    };

    Ok((sources, targets))
}

fn parse_mode(input: &str) -> Result<u32> {
    let mode = u32::from_str_radix(input, 8).with_context(|| format!("Invalid octal mode: {input}"))?;
    if mode & !PERMISSION_BITS != 0 {
        bail!("Mode out of range: {input}");
    }
    Ok(mode)
}

/// Reports progress on stderr and answers prompts from the terminal.
struct TerminalObserver {
    answers: AnswerMode,
    show_progress: bool,
    progress_shown: bool,
    listing: Vec<FileInfo>,
}

impl TerminalObserver {
    fn new(answers: AnswerMode, show_progress: bool) -> Self {
        Self {
            answers,
            show_progress,
            progress_shown: false,
            listing: Vec::new(),
        }
    }

    /// End the progress line so later output starts on a fresh line.
    fn finish_progress(&mut self) {
        if self.progress_shown {
            eprintln!();
            self.progress_shown = false;
        }
    }

    /// Print `message` and read a single-letter choice from stdin.
    ///
    /// End of input counts as the last choice, which is always cancel.
    fn ask(&mut self, message: &str, choices: &[(char, &str)]) -> char {
        self.finish_progress();

        let menu: Vec<String> = choices.iter().map(|(key, label)| format!("[{key}]{label}")).collect();
        let fallback = choices.last().map_or('c', |(key, _)| *key);

        let stdin = io::stdin();
        loop {
            eprint!("{message}\n  {} ? ", menu.join(" "));
            let _ = io::stderr().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => return fallback,
                Ok(_) => {}
            }

            if let Some(choice) = line.trim().chars().next().map(|c| c.to_ascii_lowercase()) {
                if choices.iter().any(|(key, _)| *key == choice) {
                    return choice;
                }
            }
        }
    }
}

impl JobObserver for TerminalObserver {
    fn on_progress(&mut self, progress: &JobProgress) {
        if !self.show_progress || !progress.has_total() {
            return;
        }

        let current = progress
            .current
            .as_ref()
            .map(FileRef::display_name)
            .unwrap_or_default();

        let bytes = if progress.bytes_total > 0 {
            format!(
                " {} / {}",
                format_size(progress.bytes_done),
                format_size(progress.bytes_total)
            )
        } else {
            String::new()
        };

        eprint!(
            "\r\x1b[2K{:>5.1}% {}/{}{bytes} {}",
            progress.percentage(),
            progress.processed,
            progress.total,
            truncate(&current, 40)
        );
        self.progress_shown = true;
    }

    fn on_ask_overwrite(&mut self, message: &str) -> OverwriteResponse {
        match self.answers {
            AnswerMode::Yes => OverwriteResponse::Yes,
            AnswerMode::No => OverwriteResponse::No,
            AnswerMode::Ask => match self.ask(message, &[('y', "es"), ('n', "o"), ('c', "ancel")]) {
                'y' => OverwriteResponse::Yes,
                'n' => OverwriteResponse::No,
                _ => OverwriteResponse::Cancel,
            },
        }
    }

    fn on_ask_skip(&mut self, message: &str) -> SkipResponse {
        match self.answers {
            AnswerMode::Yes | AnswerMode::No => {
                self.finish_progress();
                eprintln!("{message} (skipped)");
                SkipResponse::Skip
            }
            AnswerMode::Ask => match self.ask(message, &[('s', "kip"), ('r', "etry"), ('c', "ancel")]) {
                's' => SkipResponse::Skip,
                'r' => SkipResponse::Retry,
                _ => SkipResponse::Cancel,
            },
        }
    }

    fn on_info_message(&mut self, text: &str) {
        if self.show_progress {
            self.finish_progress();
            eprintln!("{text}");
        }
    }

    fn on_new_files(&mut self, files: FileList) {
        for file in files {
            info!(%file, "Created");
        }
    }

    fn on_files_ready(&mut self, files: Vec<FileInfo>) -> Handoff<Vec<FileInfo>> {
        self.listing = files;
        Handoff::Claimed
    }

    fn on_renamed(&mut self, from: &FileRef, to: &FileRef) {
        info!(%from, %to, "Renamed");
    }

    fn on_finished(&mut self, outcome: &JobOutcome) {
        debug!(%outcome, "Finished");
    }
}

fn print_listing(listing: &[FileInfo], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for info in listing {
                let kind = match info.kind {
                    EntryKind::Directory => 'd',
                    EntryKind::Symlink => 'l',
                    EntryKind::File => '-',
                    EntryKind::Other => '?',
                };
                println!(
                    "{kind}{:04o} {:>10} {:16} {}",
                    info.mode & PERMISSION_BITS,
                    format_size(info.size),
                    format_time(info.modified),
                    info.name
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(listing)?);
        }
    }
    Ok(())
}

fn format_time(time: Option<SystemTime>) -> String {
    time.map(|time| DateTime::<Local>::from(time).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Format bytes as human-readable size.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to the given number of characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
