//! The content store and its bins.

use std::{
    io::Cursor,
    sync::{Arc, Mutex},
};

use slob_utils::byte_reader::ByteReader;

use crate::{
    decompress::Decompressor,
    error::SlobError,
    item_list::{ItemDecode, ItemList, PosEntrySize},
};

/// One decompressed bin: a list of content items, indexed by an in-bin
/// offset table.
struct Bin {
    data: Arc<[u8]>,
    count: u32,
}

impl Bin {
    /// Locates the `(offset, length)` of item `item_index`'s content
    /// bytes within `self.data`.
    fn locate(&self, item_index: u16) -> Result<(usize, usize), SlobError> {
        if item_index as u32 >= self.count {
            return Err(SlobError::IndexOutOfRange {
                index: item_index as u64,
                len: self.count as u64,
            });
        }

        let mut reader = ByteReader::new(Cursor::new(&self.data[..]));
        let data_start = self.count as u64 * 4;

        reader.seek_to(item_index as u64 * 4)?;
        let pointer = reader.u32()? as u64;

        let item_start = data_start
            .checked_add(pointer)
            .ok_or(SlobError::TruncatedFile)?;
        reader.seek_to(item_start)?;
        let content_length = reader.u32()? as usize;
        let offset = item_start as usize + 4;

        if offset + content_length > self.data.len() {
            return Err(SlobError::TruncatedFile);
        }

        Ok((offset, content_length))
    }
}

/// The one-way `Compressed -> Decoded` transition a store item makes
/// on first content access.
enum StoreItemState {
    Compressed(Arc<[u8]>),
    Decoded(Bin),
}

/// A single store entry: the content-type IDs for its bin, and either
/// the still-compressed payload or the decoded [`Bin`].
#[derive(Clone)]
pub(crate) struct StoreItem {
    content_type_ids: Arc<[u8]>,
    state: Arc<Mutex<StoreItemState>>,
}

impl StoreItem {
    /// Decompresses on first access, then serves from the decoded bin.
    /// The compressed buffer is dropped once decoding succeeds.
    fn content(&self, item_index: u16, decompressor: &dyn Decompressor) -> Result<(Arc<[u8]>, usize, usize), SlobError> {
        let mut state = self.state.lock().unwrap();

        if let StoreItemState::Compressed(compressed) = &*state {
            let decoded = decompressor.decompress(compressed)?;
            *state = StoreItemState::Decoded(Bin {
                data: Arc::from(decoded.into_boxed_slice()),
                count: self.content_type_ids.len() as u32,
            });
        }

        match &*state {
            StoreItemState::Decoded(bin) => {
                let (offset, len) = bin.locate(item_index)?;
                Ok((Arc::clone(&bin.data), offset, len))
            }
            StoreItemState::Compressed(_) => unreachable!("decoded above"),
        }
    }

    fn content_type_id(&self, item_index: u16) -> Result<u8, SlobError> {
        self.content_type_ids
            .get(item_index as usize)
            .copied()
            .ok_or(SlobError::IndexOutOfRange {
                index: item_index as u64,
                len: self.content_type_ids.len() as u64,
            })
    }

    /// Whether this item's bin has already been decompressed, for the
    /// store's cache-eviction trace log: evicting a still-compressed
    /// item is not interesting, only a decoded one.
    pub(crate) fn is_decoded(&self) -> bool {
        matches!(&*self.state.lock().unwrap(), StoreItemState::Decoded(_))
    }
}

/// Decodes a store item: `u32` item count, that many content-type ID
/// bytes, then the compressed payload length-prefixed by a `u32`.
pub(crate) struct StoreItemDecoder;

impl ItemDecode for StoreItemDecoder {
    type Item = StoreItem;

    fn decode(&self, reader: &mut ByteReader<Cursor<&[u8]>>) -> Result<Self::Item, SlobError> {
        let bin_item_count = reader.u32()?;
        let content_type_ids = reader.bytes(bin_item_count as usize)?;
        let compressed_length = reader.u32()?;
        let compressed = reader.bytes(compressed_length as usize)?;

        Ok(StoreItem {
            content_type_ids: Arc::from(content_type_ids.into_boxed_slice()),
            state: Arc::new(Mutex::new(StoreItemState::Compressed(Arc::from(
                compressed.into_boxed_slice(),
            )))),
        })
    }
}

pub(crate) const STORE_POS_ENTRY_SIZE: PosEntrySize = PosEntrySize::U64;

/// The content store: an item-list of compressed bins, decoded and
/// indexed on demand.
pub(crate) struct Store {
    items: ItemList<StoreItemDecoder>,
    decompressor: Box<dyn Decompressor>,
}

impl Store {
    pub(crate) fn new(items: ItemList<StoreItemDecoder>, decompressor: Box<dyn Decompressor>) -> Self {
        Self {
            items,
            decompressor,
        }
    }

    /// Returns the raw content bytes for `(bin_index, item_index)`, as a
    /// slice into a reference-counted buffer owned by the decoded bin so
    /// that [`crate::blob::Content`] can outlive the next cache
    /// eviction without an unsafe borrow.
    pub(crate) fn get_content(
        &self,
        bin_index: u32,
        item_index: u16,
    ) -> Result<(Arc<[u8]>, usize, usize), SlobError> {
        let item = self.items.get(bin_index)?;
        item.content(item_index, self.decompressor.as_ref())
    }

    pub(crate) fn get_content_type_id(&self, bin_index: u32, item_index: u16) -> Result<u8, SlobError> {
        let item = self.items.get(bin_index)?;
        item.content_type_id(item_index)
    }
}
