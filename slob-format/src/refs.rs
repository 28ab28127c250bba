//! The reference list and its key-only projection.

use std::io::Cursor;

use slob_utils::byte_reader::ByteReader;

use crate::{
    error::SlobError,
    item_list::{ItemDecode, ItemList, PosEntrySize},
    text::TextCodec,
};

/// One entry of the ref-list: a lookup key and the location of the
/// content it resolves to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ref {
    /// The lookup string this entry is keyed on.
    pub key: String,
    /// The index of the bin holding this entry's content.
    pub bin_index: u32,
    /// The index of the content item within that bin.
    pub item_index: u16,
    /// An optional in-content anchor; may be empty.
    pub fragment: String,
}

/// The minimal shape used for comparisons during binary search.
#[derive(Clone, Debug)]
pub struct Keyed {
    pub key: String,
}

impl Keyed {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Decodes a full [`Ref`]: `text` key, `u32` bin index, `u16` item
/// index, `tiny-text` fragment.
///
/// Carries the archive's [`TextCodec`] since the ref-list's strings are
/// decoded under the declared header encoding, not assumed UTF-8.
pub(crate) struct RefDecoder(pub(crate) TextCodec);

impl ItemDecode for RefDecoder {
    type Item = Ref;

    fn decode(&self, reader: &mut ByteReader<Cursor<&[u8]>>) -> Result<Self::Item, SlobError> {
        let key = self.0.decode(&reader.text_raw()?)?;
        let bin_index = reader.u32()?;
        let item_index = reader.u16()?;
        let fragment = self.0.decode(&reader.tiny_text_raw()?)?;

        Ok(Ref {
            key,
            bin_index,
            item_index,
            fragment,
        })
    }
}

/// Decodes only the key of a ref-list entry, skipping the rest — used
/// to keep the binary-search working set small.
pub(crate) struct KeyDecoder(pub(crate) TextCodec);

impl ItemDecode for KeyDecoder {
    type Item = Keyed;

    fn decode(&self, reader: &mut ByteReader<Cursor<&[u8]>>) -> Result<Self::Item, SlobError> {
        let key = self.0.decode(&reader.text_raw()?)?;
        Ok(Keyed { key })
    }
}

pub(crate) type RefList = ItemList<RefDecoder>;
pub(crate) type KeyList = ItemList<KeyDecoder>;

/// The ref-list and key-list share the same 8-byte (u64) position table
/// width; only the in-bin position table uses the 4-byte width.
pub(crate) const REF_LIST_POS_ENTRY_SIZE: PosEntrySize = PosEntrySize::U64;
