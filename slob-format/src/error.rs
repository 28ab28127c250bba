//! The error type surfaced by every fallible operation in this crate.

use std::io;

use slob_utils::byte_reader::ReadError;
use thiserror::Error;

/// Errors that may occur while opening or querying an archive.
///
/// The first three variants are fatal to opening an archive; the rest
/// are operational and leave the archive itself usable.
#[derive(Debug, Error)]
pub enum SlobError {
    /// The file does not start with the expected magic bytes.
    #[error("not a recognized archive file")]
    UnknownFileFormat,

    /// The header's declared file size does not match the actual file
    /// length, or a positional read ran past the end of the file.
    #[error("archive file is truncated")]
    TruncatedFile,

    /// A string field could not be decoded under the archive's declared
    /// encoding.
    #[error("invalid string encoding: {0}")]
    Encoding(String),

    /// The underlying byte source failed for a reason other than EOF.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// An operation was attempted on an archive that has been closed.
    #[error("archive has been closed")]
    Closed,

    /// A blob id did not have the `"binIndex-itemIndex"` shape.
    #[error("malformed blob id: {0}")]
    BlobIdMalformed(String),

    /// An ordinal index was out of range for the list being indexed.
    #[error("index {index} out of range (len {len})")]
    IndexOutOfRange { index: u64, len: u64 },

    /// Decompression of a bin's payload failed.
    #[error("failed to decompress content: {0}")]
    Decompress(String),

    /// The configured collation backend failed.
    #[error("collation failure: {0}")]
    Collation(String),
}

impl From<ReadError> for SlobError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::Truncated => SlobError::TruncatedFile,
            ReadError::Encoding(e) => SlobError::Encoding(e.to_string()),
            ReadError::Io(e) => SlobError::Io(e),
        }
    }
}
