//! Generic random-access reader over a count-prefixed position table and
//! a data region, shared by the ref-list, key-list, and store.
//!
//! Concrete item shapes are supplied by an [`ItemDecode`] implementation
//! so that the ref-list, key-list, and store each get a monomorphized
//! `ItemList` rather than paying for dynamic dispatch on every lookup.

use std::{
    io::Cursor,
    num::NonZeroUsize,
    sync::{Arc, Mutex},
};

use lru::LruCache;
use slob_utils::byte_reader::ByteReader;

use crate::{error::SlobError, mapping::Mapping};

/// Decodes one item of an item-list, given a reader already positioned
/// at the start of that item's data.
///
/// Decoders are instances rather than bare functions because the
/// ref-list/key-list decoders need the archive's [`TextCodec`] in hand
/// (`crate::text`) to turn raw bytes into `String`s.
pub(crate) trait ItemDecode {
    type Item: Clone;

    fn decode(&self, reader: &mut ByteReader<Cursor<&[u8]>>) -> Result<Self::Item, SlobError>;
}

/// Either an 8-byte (ref-list, store) or 4-byte (in-bin) position table
/// entry width.
#[derive(Clone, Copy)]
pub(crate) enum PosEntrySize {
    U32 = 4,
    U64 = 8,
}

pub(crate) struct ItemList<D: ItemDecode> {
    mapping: Arc<Mapping>,
    pos_start: u64,
    data_start: u64,
    pos_entry_size: PosEntrySize,
    count: u32,
    cache: Mutex<LruCache<u32, D::Item>>,
    decoder: D,
    /// Invoked with an evicted item when the cache drops it to make
    /// room for another. Only the store uses this, to log when a
    /// decoded bin is evicted; the ref-list and key-list pass `None`.
    on_evict: Option<Box<dyn Fn(&D::Item) + Send + Sync>>,
}

impl<D: ItemDecode> ItemList<D> {
    /// Opens an item-list whose `count` field lives at `offset` within
    /// `mapping`.
    pub(crate) fn open(
        mapping: Arc<Mapping>,
        offset: u64,
        pos_entry_size: PosEntrySize,
        cache_capacity: usize,
        decoder: D,
        on_evict: Option<Box<dyn Fn(&D::Item) + Send + Sync>>,
    ) -> Result<Self, SlobError> {
        let count = {
            let mut reader = ByteReader::new(Cursor::new(mapping.as_bytes()));
            reader.seek_to(offset)?;
            reader.u32()?
        };

        let pos_start = offset + 4;
        let data_start = pos_start + count as u64 * pos_entry_size as u64;

        Ok(Self {
            mapping,
            pos_start,
            data_start,
            pos_entry_size,
            count,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(cache_capacity.max(1)).unwrap(),
            )),
            decoder,
            on_evict,
        })
    }

    pub(crate) fn len(&self) -> u32 {
        self.count
    }

    /// Random-access read of the `i`-th item: check the cache, then
    /// seek into the position table, then seek into the data region
    /// and decode.
    pub(crate) fn get(&self, i: u32) -> Result<D::Item, SlobError> {
        if i >= self.count {
            return Err(SlobError::IndexOutOfRange {
                index: i as u64,
                len: self.count as u64,
            });
        }

        if let Some(item) = self.cache.lock().unwrap().get(&i) {
            return Ok(item.clone());
        }

        let bytes = self.mapping.as_bytes();
        let mut reader = ByteReader::new(Cursor::new(bytes));

        let pos_entry_offset = self.pos_start + i as u64 * self.pos_entry_size as u64;
        reader.seek_to(pos_entry_offset)?;

        let item_offset = match self.pos_entry_size {
            PosEntrySize::U32 => reader.u32()? as u64,
            PosEntrySize::U64 => reader.u64()?,
        };

        let absolute_offset = self
            .data_start
            .checked_add(item_offset)
            .ok_or(SlobError::TruncatedFile)?;
        reader.seek_to(absolute_offset)?;
        let item = self.decoder.decode(&mut reader)?;

        if let Some((evicted_key, evicted_item)) = self.cache.lock().unwrap().push(i, item.clone())
        {
            if evicted_key != i {
                if let Some(on_evict) = &self.on_evict {
                    on_evict(&evicted_item);
                }
            }
        }
        Ok(item)
    }
}
