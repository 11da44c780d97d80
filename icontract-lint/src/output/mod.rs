//! Rendering of lint errors

use std::io::{self, Write};

use crate::error::Error;

/// Platform line terminator
#[cfg(windows)]
pub const LINE_SEP: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEP: &str = "\n";

/// Write one human-readable line per error
pub fn output_verbose(errors: &[Error], writer: &mut impl Write) -> io::Result<()> {
    for err in errors {
        match err.lineno() {
            Some(lineno) => write!(
                writer,
                "{}:{}: {} ({}){}",
                err.filename(),
                lineno,
                err.description(),
                err.identifier(),
                LINE_SEP
            )?,
            None => write!(
                writer,
                "{}: {} ({}){}",
                err.filename(),
                err.description(),
                err.identifier(),
                LINE_SEP
            )?,
        }
    }
    Ok(())
}

/// Write the errors as a pretty-printed JSON array
pub fn output_json(errors: &[Error], writer: &mut impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(writer, errors)?;
    Ok(())
}
