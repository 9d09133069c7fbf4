//! Transformation stages applied to upstream artifacts.
//!
//! - `archive`: pull the text file out of a ZIP download
//! - `encoding`: legacy encoding <-> UTF-8
//! - `markup`: preview metadata injection and link rewriting

pub mod archive;
pub mod encoding;
pub mod markup;

pub use archive::extract_single_entry;
pub use markup::{LinkRoots, inject_preview_metadata, rewrite_relative_links};
