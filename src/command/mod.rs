//! The subcommand implementations
//!
//! Each runs one tool end to end: read the input message, do one job, write
//! the result to standard output.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::Error;

pub mod attach;
pub mod compose;
pub mod dkim;
pub mod send;

/// Reads a message (or body) from a file, `-` meaning standard input
pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>, Error> {
    if path == Path::new("-") {
        let mut data = Vec::new();
        io::stdin().lock().read_to_end(&mut data)?;
        Ok(data)
    } else {
        Ok(fs::read(path)?)
    }
}

/// Writes the resulting message to standard output, without any trailing
/// newline of our own
pub(crate) fn write_output(data: &[u8]) -> Result<(), Error> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(data)?;
    stdout.flush()?;
    Ok(())
}
