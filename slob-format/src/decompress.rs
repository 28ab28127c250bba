//! Decompressor registry: maps the header's declared compression
//! name to a concrete backend, resolved lazily on first bin access.

use std::io::Read;

use crate::error::SlobError;

/// A one-shot decompressor for a single bin's compressed payload.
///
/// The registry is the sole bridge between the core and a compression
/// backend; callers never reach for `libdeflater`/`xz2` directly.
pub(crate) trait Decompressor: Send + Sync {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, SlobError>;
}

/// Resolves a header-declared compression name to a backend.
///
/// An unrecognized name is not a header-parse failure — the header
/// merely records the declared string — it surfaces as a
/// [`SlobError::Decompress`] the first time a bin is actually decoded.
pub(crate) fn resolve(name: &str) -> Box<dyn Decompressor> {
    match name {
        "zlib" => Box::new(Zlib),
        "lzma2" => Box::new(Lzma2),
        other => Box::new(Unknown(other.to_owned())),
    }
}

/// zlib, backed by `libdeflater`'s one-shot decompressor.
///
/// The store doesn't record a bin's decompressed size up front, so the
/// exact-size contract `libdeflater` normally wants is unavailable here;
/// instead we grow a scratch buffer until decompression succeeds or a
/// sanity cap is exceeded.
struct Zlib;

/// Upper bound on a single decompressed bin, guarding against a
/// corrupt/hostile `compressedLength` driving unbounded allocation.
const MAX_DECOMPRESSED_BIN_BYTES: usize = 256 * 1024 * 1024;

impl Decompressor for Zlib {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, SlobError> {
        let mut decompressor = libdeflater::Decompressor::new();
        let mut guess = (data.len() * 4).max(4096);

        loop {
            let mut out = vec![0u8; guess];
            match decompressor.zlib_decompress(data, &mut out) {
                Ok(written) => {
                    out.truncate(written);
                    return Ok(out);
                }
                Err(libdeflater::DecompressionError::InsufficientSpace) if guess < MAX_DECOMPRESSED_BIN_BYTES => {
                    guess = (guess * 2).min(MAX_DECOMPRESSED_BIN_BYTES);
                }
                Err(e) => return Err(SlobError::Decompress(e.to_string())),
            }
        }
    }
}

/// lzma2, backed by `xz2`'s raw (headerless) LZMA2 stream decoder, since
/// the on-disk payload is a bare filter stream rather than a full `.xz`
/// container.
struct Lzma2;

impl Decompressor for Lzma2 {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, SlobError> {
        let mut filters = xz2::stream::Filters::new();
        let lzma_opts = xz2::stream::LzmaOptions::new_preset(9)
            .map_err(|e| SlobError::Decompress(e.to_string()))?;
        filters.lzma2(&lzma_opts);

        let stream = xz2::stream::Stream::new_raw_decoder(&filters)
            .map_err(|e| SlobError::Decompress(e.to_string()))?;

        let mut decoder = xz2::read::XzDecoder::new_stream(data, stream);
        let mut out = Vec::new();
        decoder
            .read_to_end(&mut out)
            .map_err(|e| SlobError::Decompress(e.to_string()))?;
        Ok(out)
    }
}

/// A compression name the header declared but this crate doesn't know.
struct Unknown(String);

impl Decompressor for Unknown {
    fn decompress(&self, _data: &[u8]) -> Result<Vec<u8>, SlobError> {
        Err(SlobError::Decompress(format!(
            "unknown compression scheme: {}",
            self.0
        )))
    }
}
