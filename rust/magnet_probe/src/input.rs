//! Reading candidate identifiers from a newline-delimited file

use crate::keywords::KeywordSet;
use crate::magnet::Identifier;
use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("cannot read magnet list {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Trimmed, non-blank lines of `contents` that contain every keyword
pub fn filter_identifiers(contents: &str, keywords: &KeywordSet) -> Vec<Identifier> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && keywords.matches(line))
        .map(Identifier::from)
        .collect()
}

/// Read `path` and keep the lines that qualify
///
/// Bytes that are not valid UTF-8 are replaced with U+FFFD, so one badly
/// encoded line never hides the rest of the file.
///
/// # Errors
/// Fails if the file cannot be read.
pub fn read_identifiers(path: &Path, keywords: &KeywordSet) -> Result<Vec<Identifier>, InputError> {
    let bytes = std::fs::read(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let contents = String::from_utf8_lossy(&bytes);
    if let Cow::Owned(_) = contents {
        log::warn!(
            "{} is not valid UTF-8; undecodable bytes were replaced",
            path.display()
        );
    }
    let identifiers = filter_identifiers(&contents, keywords);
    log::debug!(
        "{} of {} lines in {} matched the keywords",
        identifiers.len(),
        contents.lines().count(),
        path.display()
    );
    Ok(identifiers)
}
