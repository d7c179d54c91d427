use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use fitsnav::options::MAX_HEADER_CARDS;
use fitsnav::{scan_with, ScanOptions};
use tracing::{debug, Level};

/// Print FITS headers, one card per line
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Turn debugging information on
    #[arg(long = "verbose", action = clap::ArgAction::Count)]
    verbosity: u8,

    /// Extension header to print; 0 prints the main header and all extensions
    #[arg(short = 'x', long)]
    xtnum: Option<usize>,

    /// Give up on a header after this many cards without END
    #[arg(long, default_value_t = MAX_HEADER_CARDS)]
    max_header_cards: usize,

    /// FITS files, or `-` to read one file from stdin
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

/// Which HDUs to print and how far to scan.
#[derive(Debug, Clone, Copy)]
enum Selection {
    Main,
    All,
    Extension(usize),
}

impl Selection {
    fn from_xtnum(xtnum: Option<usize>) -> Self {
        match xtnum {
            None => Selection::Main,
            Some(0) => Selection::All,
            Some(n) => Selection::Extension(n),
        }
    }

    fn limit(self) -> Option<usize> {
        match self {
            Selection::Main => Some(0),
            Selection::All => None,
            Selection::Extension(n) => Some(n),
        }
    }

    fn prints(self, index: usize) -> bool {
        match self {
            Selection::Main => index == 0,
            Selection::All => true,
            Selection::Extension(n) => index == n,
        }
    }
}

fn dump<R, W>(reader: &mut R, out: &mut W, selection: Selection, options: &ScanOptions) -> Result<()>
where
    R: Read + Seek,
    W: Write,
{
    let mut current = None;
    let mut write_error: Option<io::Error> = None;
    let scanned = scan_with(reader, options, selection.limit(), |index, card| {
        if !selection.prints(index) || write_error.is_some() {
            return;
        }
        let mut emit = || -> io::Result<()> {
            if current != Some(index) {
                current = Some(index);
                if index > 0 {
                    writeln!(out, "===> xtension {index}")?;
                }
            }
            writeln!(out, "{card}")
        };
        if let Err(e) = emit() {
            write_error = Some(e);
        }
    });
    if let Some(e) = write_error {
        return Err(e.into());
    }
    let layout = scanned?;
    debug!(hdus = layout.len(), "scan complete");
    Ok(())
}

fn dump_path(path: &Path, selection: Selection, options: &ScanOptions) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if path == Path::new("-") {
        let mut bytes = Vec::new();
        io::stdin()
            .read_to_end(&mut bytes)
            .context("reading stdin")?;
        return dump(&mut Cursor::new(bytes), &mut out, selection, options);
    }
    let mut file = std::fs::File::open(path)
        .with_context(|| format!("cannot open file [{}]", path.display()))?;
    writeln!(out, "====> file {} (main) <====", path.display())?;
    dump(&mut file, &mut out, selection, options)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let level = match cli.verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let selection = Selection::from_xtnum(cli.xtnum);
    let options = ScanOptions::default().max_header_cards(cli.max_header_cards);
    let mut errors = 0;
    for path in &cli.files {
        if let Err(e) = dump_path(path, selection, &options) {
            eprintln!("{}: {:#}", path.display(), e);
            errors += 1;
        }
    }
    if errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
