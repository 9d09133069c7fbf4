// src/pipeline/archive.rs

//! Extraction of the text file from the archive's ZIP downloads.

use std::io::{Cursor, Read};

use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{AppError, Result};

/// Largest entry accepted. Text downloads inflate to a few MiB at most.
const MAX_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

/// Return the contents of the archive's single entry.
///
/// Archives holding several entries are not rejected: the first entry in
/// central-directory order wins. Every text download in the corpus carries
/// exactly one file, so this is never validated.
pub fn extract_single_entry(archive_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(archive_bytes)).map_err(malformed)?;

    match archive.len() {
        0 => return Err(AppError::EmptyArchive),
        1 => {}
        n => log::debug!("Archive holds {} entries; using the first", n),
    }

    let entry = archive.by_index(0).map_err(malformed)?;
    read_capped(entry, MAX_ENTRY_BYTES)
}

/// Read at most `limit` bytes. The size an entry declares is not trusted.
fn read_capped(reader: impl Read, limit: u64) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut bytes)
        .map_err(AppError::malformed_archive)?;

    if bytes.len() as u64 > limit {
        return Err(AppError::malformed_archive(format!(
            "entry exceeds {limit} bytes"
        )));
    }
    Ok(bytes)
}

fn malformed(err: ZipError) -> AppError {
    AppError::malformed_archive(err)
}
