use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Increase log verbosity (-v debug, -vv trace). Overrides MINITAR_LOG.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Create an archive from the contents of a directory.
    #[command(alias = "c")]
    Create {
        /// The directory to archive.
        #[arg(required = true)]
        input: PathBuf,

        /// The path for the output archive, or `-` for standard output.
        #[arg(short, long)]
        output: PathBuf,

        /// Sort entries by name so identical directories give identical archives.
        #[arg(long)]
        sort: bool,

        /// Store the input directory itself as the single top-level entry.
        #[arg(long)]
        include_root: bool,
    },

    /// Extract an archive into a directory.
    #[command(alias = "x")]
    Extract {
        /// The archive file to extract, or `-` for standard input.
        #[arg(required = true)]
        archive: PathBuf,

        /// The directory where entries will be extracted. Defaults to the current directory.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// What to do with files and symlinks that already exist.
        #[arg(long, value_enum, default_value_t = OverwriteMode::Never)]
        overwrite: OverwriteMode,
    },

    /// List the contents of an archive without extracting it.
    #[command(alias = "l")]
    List {
        /// The archive file to list, or `-` for standard input.
        #[arg(required = true)]
        archive: PathBuf,

        /// Print a JSON array instead of an indented tree.
        #[arg(long)]
        json: bool,
    },
}

/// Overwrite behaviour for `extract`.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum OverwriteMode {
    /// Keep anything that already exists.
    Never,
    /// Replace existing files and symlinks.
    Always,
    /// Replace only when the new content or link target differs.
    Changed,
}

/// Parses command-line arguments using `clap`.
pub fn run() -> Result<Args, Box<dyn std::error::Error>> {
    Ok(Args::try_parse()?)
}
