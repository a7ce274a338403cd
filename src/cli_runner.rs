//! CLI logic behind the `minitar` binary, kept in the library so it can be
//! exercised from tests.

use std::error::Error;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{self, Commands, OverwriteMode};
use crate::codec::stream::{read_archive, write_archive};
use crate::error::IoResultExt;
use crate::fsx::HostFs;
use crate::{ingest, ingest_dir, materialize, Entry, EntryKind, OverwritePolicy, Tree};

/// Path argument meaning standard input or standard output.
const STDIO: &str = "-";

/// Public entry for running CLI logic.
pub fn run_cli_app() -> Result<(), Box<dyn Error>> {
    let args = cli::run()?;
    init_logging(args.verbose);

    match args.command {
        Commands::Create { input, output, sort, include_root } => {
            let mut tree = if include_root {
                Tree::from(vec![ingest_dir(&HostFs, &input)?])
            } else {
                ingest(&HostFs, &input)?
            };
            if sort {
                tree.sort_by_name();
            }
            let written = if output == Path::new(STDIO) {
                write_archive(&tree, BufWriter::new(io::stdout().lock()))?
            } else {
                let file = File::create(&output).at(&output)?;
                let written = write_archive(&tree, BufWriter::new(file))?;
                println!(
                    "Created {} ({} entries, {} files, {} bytes)",
                    output.display(),
                    tree.walk().count(),
                    tree.file_count(),
                    written
                );
                written
            };
            info!(bytes = written, "archive created");
        }
        Commands::Extract { archive, output, overwrite } => {
            let tree = open_archive(&archive)?;
            let out_dir = match output {
                Some(dir) => dir,
                None => std::env::current_dir()?,
            };
            let mut policy = match overwrite {
                OverwriteMode::Never => OverwritePolicy::Never,
                OverwriteMode::Always => OverwritePolicy::Always,
                OverwriteMode::Changed => OverwritePolicy::if_changed(&HostFs),
            };
            materialize(&HostFs, &tree, &out_dir, &mut policy)?;
            info!(entries = tree.walk().count(), dir = %out_dir.display(), "archive extracted");
        }
        Commands::List { archive, json } => {
            let tree = open_archive(&archive)?;
            let mut stdout = io::stdout().lock();
            if json {
                serde_json::to_writer_pretty(&mut stdout, &listing(&tree))?;
                writeln!(stdout)?;
            } else {
                stdout.write_all(format_tree(&tree).as_bytes())?;
            }
        }
    }

    Ok(())
}

/// Installs the stderr log subscriber. `-v` flags win over `MINITAR_LOG`.
fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("MINITAR_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    // A subscriber may already be installed when run from tests.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();
}

fn open_archive(path: &Path) -> crate::Result<Tree> {
    if path == Path::new(STDIO) {
        read_archive(io::stdin().lock())
    } else {
        read_archive(BufReader::new(File::open(path).at(path)?))
    }
}

/// One row of `list --json`.
#[derive(Debug, Serialize)]
struct ListingEntry {
    path: String,
    kind: EntryKind,
    /// Octal, e.g. `"0755"`.
    mode: String,
    size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
}

fn listing(tree: &Tree) -> Vec<ListingEntry> {
    tree.walk()
        .map(|visit| ListingEntry {
            path: String::from_utf8_lossy(&visit.path).into_owned(),
            kind: visit.entry.kind(),
            mode: format!("{:04o}", visit.entry.permissions().to_wire()),
            size: match visit.entry {
                Entry::File { content, .. } => content.len() as u64,
                _ => 0,
            },
            target: match visit.entry {
                Entry::Symlink { target, .. } => Some(String::from_utf8_lossy(target).into_owned()),
                _ => None,
            },
        })
        .collect()
}

/// Indented `[D]` / `[F]` / `[L]` listing, two spaces per level.
fn format_tree(tree: &Tree) -> String {
    let mut out = String::new();
    for visit in tree.walk() {
        let indent = "  ".repeat(visit.depth);
        let perms = visit.entry.permissions();
        let name = String::from_utf8_lossy(visit.entry.name());
        let line = match visit.entry {
            Entry::Directory { .. } => format!("{indent}[D] {perms} {name}/\n"),
            Entry::File { content, .. } => format!("{indent}[F] {perms} {name} ({} bytes)\n", content.len()),
            Entry::Symlink { target, .. } => {
                format!("{indent}[L] {perms} {name} -> {}\n", String::from_utf8_lossy(target))
            }
        };
        out.push_str(&line);
    }
    out
}
