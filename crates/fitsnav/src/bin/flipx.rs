use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use fitsnav::flip_x_in_file;
use tracing::{info, Level};

/// Mirror FITS images along the x axis, in place
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Turn debugging information on
    #[arg(long = "verbose", action = clap::ArgAction::Count)]
    verbosity: u8,

    /// HDU whose data is flipped
    #[arg(long, default_value_t = 0)]
    hdu: usize,

    /// FITS files to modify
    #[arg(required = true)]
    files: Vec<PathBuf>,
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

    let mut errors = 0;
    for path in &cli.files {
        info!(file = %path.display(), "processing");
        match flip_x_in_file(path, cli.hdu) {
            Ok(segment) => info!(
                file = %path.display(),
                offset = segment.offset,
                length = segment.length,
                "flipped"
            ),
            Err(e) => {
                eprintln!("{}: {}", path.display(), e);
                errors += 1;
            }
        }
    }
    if errors > 0 {
        eprintln!("{errors} error(s) occurred");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
