//! pyicontract-lint CLI

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use icontract_lint::output::{self, LINE_SEP};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One human-readable line per error
    Verbose,
    /// Pretty-printed JSON array
    Json,
}

#[derive(Parser)]
#[command(
    name = "pyicontract-lint",
    about = "Lint contracts defined with the icontract library",
    disable_version_flag = true
)]
struct Cli {
    /// Paths to check (directories and files)
    paths: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Verbose)]
    format: Format,

    /// Return a zero code even if there were errors
    #[arg(long = "dont_panic")]
    dont_panic: bool,

    /// Display the version and return immediately
    #[arg(long)]
    version: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli, &mut io::stdout()) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli, stream: &mut impl Write) -> io::Result<i32> {
    if cli.version {
        write!(stream, "{}{}", env!("CARGO_PKG_VERSION"), LINE_SEP)?;
        return Ok(0);
    }

    let errors = icontract_lint::check_paths(&cli.paths);

    match cli.format {
        Format::Verbose => {
            if errors.is_empty() {
                write!(stream, "No errors detected.{LINE_SEP}")?;
            } else {
                output::output_verbose(&errors, stream)?;
            }
        }
        Format::Json => output::output_json(&errors, stream)?,
    }

    if !cli.dont_panic && !errors.is_empty() {
        return Ok(1);
    }

    Ok(0)
}
