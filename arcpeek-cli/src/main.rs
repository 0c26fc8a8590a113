//! arcpeek - inspect ZIP and GZIP files
//!
//! Lists, tests and extracts ZIP archives and GZIP files with a pure Rust
//! DEFLATE decoder.

mod commands;
mod utils;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use commands::{cmd_cat, cmd_detect, cmd_extract, cmd_info, cmd_list, cmd_test, cmd_tree};
use log::LevelFilter;
use std::path::PathBuf;
use utils::GlobalOptions;

#[derive(Parser)]
#[command(name = "arcpeek")]
#[command(author, version, about = "Inspect ZIP and GZIP files")]
#[command(long_about = "
arcpeek reads ZIP archives and GZIP files with its own DEFLATE decoder.
Every local file header is cross-checked against the central directory
and every CRC-32 is verified unless --no-verify is given.

Examples:
  arcpeek list -v archive.zip
  arcpeek tree archive.zip
  arcpeek cat archive.zip docs/readme.txt
  arcpeek cat data.gz
  arcpeek test --jobs 4 archive.zip
  arcpeek extract -o out archive.zip
  arcpeek info data.gz
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Accept stored blocks whose NLEN is not the complement of LEN
    #[arg(long, global = true)]
    lenient: bool,

    /// Skip CRC-32 and GZIP trailer verification
    #[arg(long, global = true)]
    no_verify: bool,

    /// Refuse to decode more than this many bytes per entry
    #[arg(long, global = true, value_name = "BYTES")]
    max_size: Option<usize>,

    /// Decode entries on this many threads
    #[arg(short, long, global = true)]
    jobs: Option<usize>,

    /// Increase log verbosity (-L debug, -LL trace)
    #[arg(long = "log", short = 'L', action = ArgAction::Count, global = true)]
    log_level: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "log_level")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the format of a file
    Detect {
        /// File to detect
        file: PathBuf,
    },

    /// List contents of an archive
    #[command(alias = "l")]
    List {
        /// Archive file to list
        archive: PathBuf,

        /// Show sizes, methods, CRCs and timestamps
        #[arg(short, long)]
        verbose: bool,

        /// Output as JSON (machine-readable)
        #[arg(long)]
        json: bool,
    },

    /// Show the directory tree of an archive
    Tree {
        /// Archive file to show
        archive: PathBuf,

        /// Output as JSON (machine-readable)
        #[arg(long)]
        json: bool,
    },

    /// Write a decoded entry to stdout
    Cat {
        /// Archive file to read
        archive: PathBuf,

        /// Path of the entry inside a ZIP archive
        entry: Option<String>,
    },

    /// Show information about an archive
    #[command(alias = "i")]
    Info {
        /// Archive file to inspect
        archive: PathBuf,
    },

    /// Test archive integrity
    #[command(alias = "t")]
    Test {
        /// Archive file to test
        archive: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Extract files from an archive
    #[command(alias = "x")]
    Extract {
        /// Archive file to extract
        archive: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Files or directories to extract (all if empty)
        files: Vec<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Generate shell completions
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(log_level: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::Error
    } else {
        match log_level {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.quiet);

    let options = GlobalOptions {
        lenient: cli.lenient,
        no_verify: cli.no_verify,
        max_size: cli.max_size,
        jobs: cli.jobs,
    };

    let result = match cli.command {
        Commands::Detect { file } => cmd_detect(&file),
        Commands::List {
            archive,
            verbose,
            json,
        } => cmd_list(&archive, verbose, json, &options),
        Commands::Tree { archive, json } => cmd_tree(&archive, json, &options),
        Commands::Cat { archive, entry } => cmd_cat(&archive, entry.as_deref(), &options),
        Commands::Info { archive } => cmd_info(&archive, &options),
        Commands::Test {
            archive,
            verbose,
            progress,
        } => cmd_test(&archive, verbose, progress, &options),
        Commands::Extract {
            archive,
            output,
            files,
            verbose,
            progress,
        } => cmd_extract(&archive, &output, &files, verbose, progress, &options),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
