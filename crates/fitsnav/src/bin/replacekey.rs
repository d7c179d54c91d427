use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fitsnav::{replace_card_in_file, Replacement};
use tracing::Level;

/// Replace a card in the primary header of FITS files, in place
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Turn debugging information on
    #[arg(long = "verbose", action = clap::ArgAction::Count)]
    verbosity: u8,

    /// Keyword of the card to replace
    #[arg(short = 'p', long)]
    place: String,

    /// New keyword; defaults to the existing one
    #[arg(short = 'k', long)]
    key: Option<String>,

    /// New value text; defaults to the existing one
    #[arg(short = 'v', long)]
    value: Option<String>,

    /// New comment
    #[arg(short = 'c', long, conflicts_with = "keep_comment")]
    comment: Option<String>,

    /// Keep the existing comment
    #[arg(short = 'C', long)]
    keep_comment: bool,

    /// FITS files to modify
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

impl Cli {
    fn replacement(&self) -> Replacement {
        let mut r = Replacement::new(&self.place).keep_existing_comment(self.keep_comment);
        if let Some(key) = &self.key {
            r = r.keyword(key);
        }
        if let Some(value) = &self.value {
            r = r.value(value);
        }
        if let Some(comment) = &self.comment {
            r = r.comment(comment);
        }
        r
    }
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
        .with_writer(std::io::stderr)
        .init();

    let replacement = cli.replacement();
    let mut errors = 0;
    for path in &cli.files {
        match replace_card_in_file(path, &replacement) {
            Ok(outcome) => {
                println!("File {}", path.display());
                println!("\tcard  : \n\t\t{}", outcome.written);
                println!("\tplace : \n\t\t{}", replacement.target());
            }
            Err(e) => {
                eprintln!(
                    "{}: cannot replace the key {}: {}",
                    path.display(),
                    replacement.target(),
                    e
                );
                errors += 1;
            }
        }
    }
    if errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
