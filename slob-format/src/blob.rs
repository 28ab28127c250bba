//! `Blob` and `Content`: the handle returned by every lookup, and
//! the typed byte view it dereferences to.

use std::sync::{Arc, Weak};

use uuid::Uuid;

use crate::{archive::ArchiveInner, error::SlobError};

/// Splits a `"binIndex-itemIndex"` blob id into its two indices.
pub(crate) fn parse_blob_id(id: &str) -> Result<(u32, u16), SlobError> {
    let (bin, item) = id
        .split_once('-')
        .ok_or_else(|| SlobError::BlobIdMalformed(id.to_owned()))?;

    let bin_index: u32 = bin
        .parse()
        .map_err(|_| SlobError::BlobIdMalformed(id.to_owned()))?;
    let item_index: u16 = item
        .parse()
        .map_err(|_| SlobError::BlobIdMalformed(id.to_owned()))?;

    Ok((bin_index, item_index))
}

pub(crate) fn format_blob_id(bin_index: u32, item_index: u16) -> String {
    format!("{bin_index}-{item_index}")
}

/// An opaque, stable handle for one content item.
///
/// `owner` is a non-owning back-reference:
/// dropping every [`crate::archive::Archive`] handle for an archive
/// drops its backing caches even if `Blob`s referencing it are still
/// alive, at which point those blobs fail their content accessors with
/// [`SlobError::Closed`] rather than keeping the archive pinned open.
#[derive(Clone)]
pub struct Blob {
    pub(crate) owner: Weak<ArchiveInner>,
    pub(crate) owner_id: Uuid,
    pub(crate) id: String,
    pub(crate) key: String,
    pub(crate) fragment: String,
}

impl Blob {
    /// The `"binIndex-itemIndex"` id this handle was constructed from.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The lookup key this blob was reached through.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The in-content anchor, if any; may be empty.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// The UUID of the archive that owns this blob.
    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    /// The dedup key used by the multi-archive merge:
    /// `"<archive-uuid>:<blob-id>#<fragment>"`.
    pub(crate) fn dedup_key(&self) -> String {
        format!("{}:{}#{}", self.owner_id, self.id, self.fragment)
    }

    /// Resolves this blob's content by dereferencing through its owning
    /// archive's store.
    pub fn content(&self) -> Result<Content, SlobError> {
        let owner = self.owner.upgrade().ok_or(SlobError::Closed)?;
        owner.content_for_blob(&self.id)
    }

    /// The content-type string for this blob, without decoding the body.
    pub fn content_type(&self) -> Result<String, SlobError> {
        let owner = self.owner.upgrade().ok_or(SlobError::Closed)?;
        owner.content_type_for_blob(&self.id)
    }
}

impl PartialEq for Blob {
    fn eq(&self, other: &Self) -> bool {
        self.owner_id == other.owner_id
            && self.id == other.id
            && self.key == other.key
            && self.fragment == other.fragment
    }
}

impl Eq for Blob {}

impl std::fmt::Debug for Blob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blob")
            .field("owner_id", &self.owner_id)
            .field("id", &self.id)
            .field("key", &self.key)
            .field("fragment", &self.fragment)
            .finish()
    }
}

/// A typed, read-only view of one blob's body.
///
/// `data` is backed by an `Arc` rather than a true borrow of the store's
/// bin cache, so a `Content` can safely outlive a subsequent cache
/// eviction of its backing bin; callers that want bounded memory use
/// should simply not retain `Content` values across unrelated archive
/// activity.
pub struct Content {
    content_type: String,
    data: Arc<[u8]>,
    offset: usize,
    len: usize,
}

impl Content {
    pub(crate) fn new(content_type: String, data: Arc<[u8]>, offset: usize, len: usize) -> Self {
        Self {
            content_type,
            data,
            offset,
            len,
        }
    }

    /// The MIME-ish content-type string from the archive's type table.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The raw content bytes.
    pub fn data(&self) -> &[u8] {
        &self.data[self.offset..self.offset + self.len]
    }
}
