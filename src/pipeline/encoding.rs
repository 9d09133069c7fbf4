// src/pipeline/encoding.rs

//! Conversion between legacy encodings (Shift_JIS for most of the archive)
//! and UTF-8.
//!
//! Policy, fixed for every encoding:
//! - decoding rejects malformed input with [`AppError::Decode`]
//! - encoding writes unmappable characters as decimal numeric character
//!   references (`&#12354;`), which HTML consumers read back losslessly

use std::borrow::Cow;

use encoding_rs::Encoding;

use crate::error::{AppError, Result};

/// Resolve a WHATWG encoding label usable in both directions.
fn lookup(encoding_name: &str) -> Result<&'static Encoding> {
    let encoding = Encoding::for_label(encoding_name.trim().as_bytes())
        .ok_or_else(|| AppError::decode(encoding_name, "unknown encoding label"))?;

    // UTF-16 and `replacement` encode as UTF-8; refuse rather than mislabel
    if encoding.output_encoding() != encoding {
        return Err(AppError::decode(
            encoding_name,
            "encoding cannot be used for output",
        ));
    }
    Ok(encoding)
}

/// Decode `bytes` in the named encoding. A leading BOM is dropped.
pub fn decode(bytes: &[u8], encoding_name: &str) -> Result<String> {
    let encoding = lookup(encoding_name)?;
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        return Err(AppError::decode(
            encoding.name(),
            "input contains byte sequences that are not valid in this encoding",
        ));
    }
    Ok(text.into_owned())
}

/// Encode `text` into the named encoding.
pub fn encode(text: &str, encoding_name: &str) -> Result<Vec<u8>> {
    let encoding = lookup(encoding_name)?;
    let (bytes, _, had_unmappable) = encoding.encode(text);
    if had_unmappable {
        log::debug!(
            "Substituted character references for characters outside {}",
            encoding.name()
        );
    }
    Ok(match bytes {
        Cow::Borrowed(b) => b.to_vec(),
        Cow::Owned(b) => b,
    })
}
