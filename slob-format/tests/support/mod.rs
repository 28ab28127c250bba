//! Writes `slob` files byte-for-byte, for use as fixtures by the
//! integration tests in this directory. There is no public write path
//! in the crate itself, so tests assemble the on-disk layout directly.

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use uuid::Uuid;

const MAGIC: [u8; 8] = [0x21, 0x2d, 0x31, 0x53, 0x4c, 0x4f, 0x42, 0x1f];

fn write_tiny_text(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    assert!(bytes.len() < 255, "tiny-text fixture too long");
    out.push(bytes.len() as u8);
    out.extend_from_slice(bytes);
}

fn write_text(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    out.write_u16::<BigEndian>(bytes.len() as u16).unwrap();
    out.extend_from_slice(bytes);
}

/// One content item destined for a bin: its content-type table index and
/// raw body bytes.
pub struct Item {
    pub content_type_id: u8,
    pub bytes: Vec<u8>,
}

/// One ref-list entry.
pub struct RefEntry {
    pub key: String,
    pub bin_index: u32,
    pub item_index: u16,
    pub fragment: String,
}

/// Builds a `slob` archive file byte-for-byte and writes it to `path`.
///
/// `refs` must already be in ascending collation order (the engine
/// assumes, never re-verifies, this). `bins` is indexed by
/// `RefEntry::bin_index`.
pub struct ArchiveBuilder {
    pub id: Uuid,
    pub tags: Vec<(String, String)>,
    pub content_types: Vec<String>,
    pub blob_count: u32,
    pub refs: Vec<RefEntry>,
    pub bins: Vec<Vec<Item>>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self {
            // Distinct per builder so tests can tell archives apart by
            // id without every fixture having to set an explicit one.
            id: Uuid::new_v4(),
            tags: Vec::new(),
            content_types: vec!["text/plain".to_owned()],
            blob_count: 0,
            refs: Vec::new(),
            bins: Vec::new(),
        }
    }

    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_owned(), value.to_owned()));
        self
    }

    pub fn content_types(mut self, types: &[&str]) -> Self {
        self.content_types = types.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn push_ref(mut self, key: &str, bin_index: u32, item_index: u16, fragment: &str) -> Self {
        self.refs.push(RefEntry {
            key: key.to_owned(),
            bin_index,
            item_index,
            fragment: fragment.to_owned(),
        });
        self
    }

    pub fn push_bin(mut self, items: Vec<Item>) -> Self {
        self.blob_count += items.len() as u32;
        self.bins.push(items);
        self
    }

    fn encode_bin(items: &[Item]) -> Vec<u8> {
        let mut data_region = Vec::new();
        let mut positions = Vec::with_capacity(items.len());

        for item in items {
            positions.push(data_region.len() as u32);
            data_region
                .write_u32::<BigEndian>(item.bytes.len() as u32)
                .unwrap();
            data_region.extend_from_slice(&item.bytes);
        }

        let mut bin = Vec::new();
        for pos in &positions {
            bin.write_u32::<BigEndian>(*pos).unwrap();
        }
        bin.extend_from_slice(&data_region);
        bin
    }

    /// Compresses `bin` under `"zlib"` via `libdeflater`, the same
    /// backend [`crate`] resolves for that name.
    fn compress_zlib(bin: &[u8]) -> Vec<u8> {
        let mut compressor = libdeflater::Compressor::new(libdeflater::CompressionLvl::default());
        let bound = compressor.zlib_compress_bound(bin.len());
        let mut out = vec![0u8; bound];
        let written = compressor.zlib_compress(bin, &mut out).unwrap();
        out.truncate(written);
        out
    }

    fn encode_store_item(items: &[Item]) -> Vec<u8> {
        let decoded_bin = Self::encode_bin(items);
        let compressed = Self::compress_zlib(&decoded_bin);

        let mut out = Vec::new();
        out.write_u32::<BigEndian>(items.len() as u32).unwrap();
        for item in items {
            out.push(item.content_type_id);
        }
        out.write_u32::<BigEndian>(compressed.len() as u32).unwrap();
        out.extend_from_slice(&compressed);
        out
    }

    /// Lays out an item-list's count, position table, and data region
    /// from pre-encoded item byte strings.
    fn encode_item_list(items: &[Vec<u8>]) -> Vec<u8> {
        let mut data_region = Vec::new();
        let mut positions = Vec::with_capacity(items.len());

        for item in items {
            positions.push(data_region.len() as u64);
            data_region.extend_from_slice(item);
        }

        let mut out = Vec::new();
        out.write_u32::<BigEndian>(items.len() as u32).unwrap();
        for pos in &positions {
            out.write_u64::<BigEndian>(*pos).unwrap();
        }
        out.extend_from_slice(&data_region);
        out
    }

    fn encode_ref_entry(entry: &RefEntry) -> Vec<u8> {
        let mut out = Vec::new();
        write_text(&mut out, &entry.key);
        out.write_u32::<BigEndian>(entry.bin_index).unwrap();
        out.write_u16::<BigEndian>(entry.item_index).unwrap();
        write_tiny_text(&mut out, &entry.fragment);
        out
    }

    /// Assembles the full file.
    pub fn build(&self) -> Vec<u8> {
        self.build_with_ref_list_offset().0
    }

    /// Assembles the full file along with the absolute byte offset at
    /// which the ref-list (and key-list) begins, for tests that need to
    /// corrupt a specific position-table entry.
    pub fn build_with_ref_list_offset(&self) -> (Vec<u8>, usize) {
        let store_items: Vec<Vec<u8>> = self.bins.iter().map(|b| Self::encode_store_item(b)).collect();
        let store_bytes = Self::encode_item_list(&store_items);

        let ref_entries: Vec<Vec<u8>> = self.refs.iter().map(Self::encode_ref_entry).collect();
        let ref_list_bytes = Self::encode_item_list(&ref_entries);

        let mut header = Vec::new();
        header.extend_from_slice(&MAGIC);
        let (hi, lo) = self.id.as_u64_pair();
        header.write_u64::<BigEndian>(hi).unwrap();
        header.write_u64::<BigEndian>(lo).unwrap();
        write_tiny_text(&mut header, "UTF-8");
        write_tiny_text(&mut header, "zlib");

        header.push(self.tags.len() as u8);
        for (k, v) in &self.tags {
            write_tiny_text(&mut header, k);
            write_tiny_text(&mut header, v);
        }

        header.push(self.content_types.len() as u8);
        for ct in &self.content_types {
            write_text(&mut header, ct);
        }

        header.write_u32::<BigEndian>(self.blob_count).unwrap();

        let store_offset = header.len() as i64 + ref_list_bytes.len() as i64 + 8 + 8;
        header.write_i64::<BigEndian>(store_offset).unwrap();

        let file_size = store_offset as usize + store_bytes.len();
        header.write_i64::<BigEndian>(file_size as i64).unwrap();

        let ref_list_offset = header.len();

        let mut file = header;
        file.extend_from_slice(&ref_list_bytes);
        file.extend_from_slice(&store_bytes);

        assert_eq!(file.len(), file_size, "fixture file-size bookkeeping drifted");
        (file, ref_list_offset)
    }

    pub fn write_to(&self, path: &std::path::Path) {
        let bytes = self.build();
        let mut f = std::fs::File::create(path).unwrap();
        f.write_all(&bytes).unwrap();
    }
}
