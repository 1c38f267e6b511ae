//! Image metadata input and capture-date resolution.
//!
//! # Responsibility
//! - Define the read-only collaborator that extracts raw metadata strings
//!   from an image resource.
//! - Resolve a capture date from those raw values (`resolve_date`).
//!
//! # Invariants
//! - Readers perform no interpretation; all date logic lives in
//!   `date_resolver`.

use crate::model::item::Image;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod date_resolver;

/// Raw metadata values of one image, as returned by the reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawImageMetadata {
    /// EXIF `DateTimeOriginal`, canonical form `YYYY:MM:DD HH:MM:SS`.
    pub date_time_original: Option<String>,
    /// EXIF `DateTime`.
    pub date_time: Option<String>,
    /// EXIF `DateTimeDigitized`.
    pub date_time_digitized: Option<String>,
    /// File name including extension, e.g. `20240701-sunset.jpg`.
    pub file_name: Option<String>,
    /// File path; used for the file name when `file_name` is absent.
    pub file_path: Option<String>,
    /// Generic creation timestamp (Unix seconds). Readers report `0` when the
    /// image carries none.
    pub created_timestamp: Option<i64>,
}

/// Failure reading metadata from an image resource.
#[derive(Debug)]
pub struct MetadataReadError {
    pub file_path: String,
    pub message: String,
}

impl Display for MetadataReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "failed to read metadata of `{}`: {}",
            self.file_path, self.message
        )
    }
}

impl Error for MetadataReadError {}

/// Reads raw metadata for an image reference. Pure read, no logic.
pub trait ImageMetadataReader {
    fn read_metadata(&self, image: &Image) -> Result<RawImageMetadata, MetadataReadError>;
}
