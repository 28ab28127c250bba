//! Positional, big-endian reads of the primitive encodings archive
//! formats in this family are built from.
//!
//! Every read advances the underlying cursor; callers that need random
//! access (as the item-list reader does) drive that access themselves
//! via [`ByteReader::seek_to`] before decoding an item.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};
use thiserror::Error;

/// Errors that may occur while reading structured binary data.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Fewer bytes were available than the field required.
    #[error("unexpected end of input")]
    Truncated,

    /// A length-prefixed string was not valid UTF-8.
    #[error("invalid string encoding: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    /// The underlying byte source failed for a reason other than EOF.
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn map_io(e: io::Error) -> ReadError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        ReadError::Truncated
    } else {
        ReadError::Io(e)
    }
}

/// A cursor over a seekable byte source, exposing the fixed-width and
/// length-prefixed string encodings used throughout the archive format.
pub struct ByteReader<R> {
    inner: R,
}

impl<R: Read + Seek> ByteReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// The current stream position.
    pub fn position(&mut self) -> Result<u64, ReadError> {
        self.inner.stream_position().map_err(map_io)
    }

    /// Seeks to an absolute byte offset from the start of the source.
    pub fn seek_to(&mut self, pos: u64) -> Result<u64, ReadError> {
        self.inner.seek(SeekFrom::Start(pos)).map_err(map_io)
    }

    pub fn u8(&mut self) -> Result<u8, ReadError> {
        self.inner.read_u8().map_err(map_io)
    }

    pub fn u16(&mut self) -> Result<u16, ReadError> {
        self.inner.read_u16::<BigEndian>().map_err(map_io)
    }

    pub fn u32(&mut self) -> Result<u32, ReadError> {
        self.inner.read_u32::<BigEndian>().map_err(map_io)
    }

    pub fn u64(&mut self) -> Result<u64, ReadError> {
        self.inner.read_u64::<BigEndian>().map_err(map_io)
    }

    pub fn i64(&mut self) -> Result<i64, ReadError> {
        self.inner.read_i64::<BigEndian>().map_err(map_io)
    }

    /// Reads `len` raw bytes.
    pub fn bytes(&mut self, len: usize) -> Result<Vec<u8>, ReadError> {
        let mut buf = vec![0u8; len];
        self.inner.read_exact(&mut buf).map_err(map_io)?;
        Ok(buf)
    }

    /// Reads a magic value of `N` bytes and compares it against `expected`.
    pub fn magic<const N: usize>(&mut self, expected: [u8; N]) -> Result<bool, ReadError> {
        let mut buf = [0u8; N];
        match self.inner.read_exact(&mut buf) {
            Ok(()) => Ok(buf == expected),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(ReadError::Io(e)),
        }
    }

    /// Reads a `uuid`: 16 bytes, big-endian, read as two 64-bit halves
    /// and recombined into the raw byte array.
    pub fn uuid(&mut self) -> Result<[u8; 16], ReadError> {
        let hi = self.u64()?;
        let lo = self.u64()?;

        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&hi.to_be_bytes());
        bytes[8..].copy_from_slice(&lo.to_be_bytes());
        Ok(bytes)
    }

    /// Reads the raw bytes of a `tiny-text`: one length byte `L`, then
    /// `L` bytes.
    ///
    /// If `L == 255` and the payload contains a NUL byte, the returned
    /// bytes are truncated at the first NUL — a compatibility quirk of
    /// older writers. For `L < 255` no truncation occurs, even if the
    /// payload happens to contain a NUL.
    ///
    /// String decoding is left to the caller, since a `tiny-text`'s
    /// byte-to-`char` mapping depends on the archive's declared
    /// encoding, which is itself read as a `tiny-text`.
    pub fn tiny_text_raw(&mut self) -> Result<Vec<u8>, ReadError> {
        let len = self.u8()? as usize;
        let mut raw = self.bytes(len)?;

        if len == 255 {
            if let Some(nul) = raw.iter().position(|&b| b == 0) {
                raw.truncate(nul);
            }
        }

        Ok(raw)
    }

    /// Reads the raw bytes of a `text`: a signed 16-bit length (writers
    /// never emit lengths `>= 32768`, so we read it as unsigned), then
    /// that many bytes.
    pub fn text_raw(&mut self) -> Result<Vec<u8>, ReadError> {
        let len = self.u16()? as usize;
        self.bytes(len)
    }

    /// Convenience wrapper over [`ByteReader::tiny_text_raw`] for the one
    /// field that must be self-describing before any encoding is known:
    /// the header's own `encoding` name, always plain ASCII/UTF-8.
    pub fn tiny_text_utf8(&mut self) -> Result<String, ReadError> {
        String::from_utf8(self.tiny_text_raw()?).map_err(ReadError::from)
    }
}
