//! The header parser.

use std::{collections::HashMap, io::Cursor};

use slob_utils::byte_reader::ByteReader;

use crate::{error::SlobError, text::TextCodec};

/// The 8 magic bytes every archive must begin with.
pub(crate) const MAGIC: [u8; 8] = [0x21, 0x2d, 0x31, 0x53, 0x4c, 0x4f, 0x42, 0x1f];

/// The self-describing preamble of an archive.
#[derive(Debug, Clone)]
pub struct Header {
    pub(crate) id: [u8; 16],
    pub(crate) encoding: String,
    pub(crate) compression: String,
    pub(crate) tags: HashMap<String, String>,
    pub(crate) content_types: Vec<String>,
    pub(crate) blob_count: u32,
    pub(crate) store_offset: u64,
    pub(crate) ref_list_offset: u64,
    pub(crate) file_size: u64,
}

impl Header {
    /// Parses a header out of `bytes`, validating the magic and the
    /// declared-size-vs-actual-length invariant against `actual_len`.
    pub(crate) fn parse(bytes: &[u8], actual_len: u64) -> Result<Self, SlobError> {
        let mut reader = ByteReader::new(Cursor::new(bytes));

        if !reader.magic(MAGIC)? {
            log::warn!("rejected archive: magic bytes did not match");
            return Err(SlobError::UnknownFileFormat);
        }

        let id = reader.uuid()?;
        let encoding = reader.tiny_text_utf8()?;
        let codec = TextCodec::for_label(&encoding);
        let compression = codec.decode(&reader.tiny_text_raw()?)?;

        let tag_count = reader.u8()?;
        let mut tags = HashMap::with_capacity(tag_count as usize);
        for _ in 0..tag_count {
            let key = codec.decode(&reader.tiny_text_raw()?)?;
            let value = codec.decode(&reader.tiny_text_raw()?)?;
            // Last-wins on a duplicate key.
            tags.insert(key, value);
        }

        let content_type_count = reader.u8()?;
        let mut content_types = Vec::with_capacity(content_type_count as usize);
        for _ in 0..content_type_count {
            content_types.push(codec.decode(&reader.text_raw()?)?);
        }

        let blob_count = reader.u32()?;
        let store_offset = non_negative(reader.i64()?)?;
        let file_size = non_negative(reader.i64()?)?;
        let ref_list_offset = reader.position()?;

        if file_size != actual_len {
            log::warn!(
                "rejected archive: declared size {file_size} does not match actual length {actual_len}"
            );
            return Err(SlobError::TruncatedFile);
        }

        Ok(Self {
            id,
            encoding,
            compression,
            tags,
            content_types,
            blob_count,
            store_offset,
            ref_list_offset,
            file_size,
        })
    }

    pub(crate) fn codec(&self) -> TextCodec {
        TextCodec::for_label(&self.encoding)
    }

    /// The archive's content-identifying UUID.
    pub fn id(&self) -> uuid::Uuid {
        uuid::Uuid::from_bytes(self.id)
    }

    /// The declared compression algorithm name (`"zlib"`, `"lzma2"`, ...).
    pub fn compression(&self) -> &str {
        &self.compression
    }

    /// The declared text encoding name.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// The tag map, as declared in the header.
    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }

    /// The ordered content-type table, indexed by the per-bin content
    /// type IDs stored in the store.
    pub fn content_types(&self) -> &[String] {
        &self.content_types
    }

    /// The advisory total count of individual content items across all
    /// bins; not cross-checked against the decoded bins.
    pub fn blob_count(&self) -> u32 {
        self.blob_count
    }

    /// The archive's URI: tag `"uri"`, or `"slob:<uuid>"` if absent.
    pub fn uri(&self) -> String {
        self.tags
            .get("uri")
            .cloned()
            .unwrap_or_else(|| format!("slob:{}", self.id()))
    }
}

fn non_negative(value: i64) -> Result<u64, SlobError> {
    u64::try_from(value).map_err(|_| SlobError::TruncatedFile)
}
