//! The public `Archive` handle and its `OpenOptions` builder.

use std::{
    collections::HashMap,
    fs,
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use uuid::Uuid;

use crate::{
    blob::{format_blob_id, parse_blob_id, Blob, Content},
    collator::{Collator, Strength},
    decompress,
    error::SlobError,
    header::Header,
    item_list::ItemList,
    lookup::LookupIter,
    mapping::Mapping,
    refs::{KeyDecoder, KeyList, RefDecoder, RefList, REF_LIST_POS_ENTRY_SIZE},
    store::{Store, StoreItemDecoder, STORE_POS_ENTRY_SIZE},
};

const DEFAULT_REF_CACHE_CAPACITY: usize = 256;
const DEFAULT_KEY_CACHE_CAPACITY: usize = 256;
const DEFAULT_STORE_CACHE_CAPACITY: usize = 4;
const DEFAULT_COLLATION_CACHE_CAPACITY: usize = 4096;

/// File residency: mmap keeps one long-lived read handle, heap reads
/// the whole file up front and closes it immediately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Residency {
    Mmap,
    Heap,
}

/// Builder controlling file residency and cache capacities.
///
/// None of these knobs affect observable query results; every cache in
/// this crate is pure lookaside, so `OpenOptions` is purely a
/// resource/performance tuning surface.
#[derive(Clone, Debug)]
pub struct OpenOptions {
    residency: Residency,
    ref_cache_capacity: usize,
    key_cache_capacity: usize,
    store_cache_capacity: usize,
    collation_cache_capacity: usize,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            residency: Residency::Mmap,
            ref_cache_capacity: DEFAULT_REF_CACHE_CAPACITY,
            key_cache_capacity: DEFAULT_KEY_CACHE_CAPACITY,
            store_cache_capacity: DEFAULT_STORE_CACHE_CAPACITY,
            collation_cache_capacity: DEFAULT_COLLATION_CACHE_CAPACITY,
        }
    }
}

impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map the file into memory and keep the handle open for the
    /// archive's lifetime. The default.
    pub fn mmap(mut self) -> Self {
        self.residency = Residency::Mmap;
        self
    }

    /// Read the whole file into a heap buffer up front and close the
    /// file handle immediately.
    pub fn heap(mut self) -> Self {
        self.residency = Residency::Heap;
        self
    }

    pub fn ref_cache_capacity(mut self, capacity: usize) -> Self {
        self.ref_cache_capacity = capacity;
        self
    }

    pub fn key_cache_capacity(mut self, capacity: usize) -> Self {
        self.key_cache_capacity = capacity;
        self
    }

    pub fn store_cache_capacity(mut self, capacity: usize) -> Self {
        self.store_cache_capacity = capacity;
        self
    }

    /// Only takes effect for the first archive opened in the process:
    /// the collation-key cache is process-global, not per-archive.
    pub fn collation_cache_capacity(mut self, capacity: usize) -> Self {
        self.collation_cache_capacity = capacity;
        self
    }

    pub fn open<P: AsRef<Path>>(self, path: P) -> Result<Archive, SlobError> {
        Archive::open_with(path, self)
    }
}

pub(crate) struct ArchiveInner {
    header: Header,
    ref_list: Arc<RefList>,
    key_list: KeyList,
    store: Store,
    collator: &'static Collator,
    closed: AtomicBool,
    // Kept alive only to pin a memory mapping's backing file; unused
    // for heap residency.
    #[allow(dead_code)]
    file: Option<fs::File>,
}

impl ArchiveInner {
    fn check_open(&self) -> Result<(), SlobError> {
        if self.closed.load(Ordering::Acquire) {
            Err(SlobError::Closed)
        } else {
            Ok(())
        }
    }

    fn content_type_string(&self, type_id: u8) -> Result<String, SlobError> {
        self.header
            .content_types()
            .get(type_id as usize)
            .cloned()
            .ok_or(SlobError::IndexOutOfRange {
                index: type_id as u64,
                len: self.header.content_types().len() as u64,
            })
    }

    pub(crate) fn content_for_blob(&self, blob_id: &str) -> Result<Content, SlobError> {
        self.check_open()?;
        let (bin_index, item_index) = parse_blob_id(blob_id)?;
        let (data, offset, len) = self.store.get_content(bin_index, item_index)?;
        let type_id = self.store.get_content_type_id(bin_index, item_index)?;
        Ok(Content::new(
            self.content_type_string(type_id)?,
            data,
            offset,
            len,
        ))
    }

    pub(crate) fn content_type_for_blob(&self, blob_id: &str) -> Result<String, SlobError> {
        self.check_open()?;
        let (bin_index, item_index) = parse_blob_id(blob_id)?;
        let type_id = self.store.get_content_type_id(bin_index, item_index)?;
        self.content_type_string(type_id)
    }
}

/// A handle on an open archive.
///
/// Cheap to clone: internally an `Arc` over the parsed header, the two
/// item-lists, and the content store, so callers can pass `Archive`
/// values into [`crate::find`] or hand them to worker threads without
/// re-opening the file.
#[derive(Clone)]
pub struct Archive(Arc<ArchiveInner>);

impl Archive {
    /// Opens `path` with the default [`OpenOptions`] (mmap residency).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SlobError> {
        OpenOptions::default().open(path)
    }

    fn open_with<P: AsRef<Path>>(path: P, opts: OpenOptions) -> Result<Self, SlobError> {
        let (mapping, file) = match opts.residency {
            Residency::Mmap => {
                let (mapping, file) = Mapping::open_mmap(&path)?;
                (mapping, Some(file))
            }
            Residency::Heap => (Mapping::open_heap(&path)?, None),
        };

        let actual_len = mapping.len();
        let header = Header::parse(mapping.as_bytes(), actual_len)?;
        let codec = header.codec();
        let mapping = Arc::new(mapping);

        let ref_list = ItemList::open(
            Arc::clone(&mapping),
            header.ref_list_offset,
            REF_LIST_POS_ENTRY_SIZE,
            opts.ref_cache_capacity,
            RefDecoder(codec.clone()),
            None,
        )?;

        let key_list = ItemList::open(
            Arc::clone(&mapping),
            header.ref_list_offset,
            REF_LIST_POS_ENTRY_SIZE,
            opts.key_cache_capacity,
            KeyDecoder(codec),
            None,
        )?;

        let store_items = ItemList::open(
            Arc::clone(&mapping),
            header.store_offset,
            STORE_POS_ENTRY_SIZE,
            opts.store_cache_capacity,
            StoreItemDecoder,
            Some(Box::new(|item: &crate::store::StoreItem| {
                if item.is_decoded() {
                    log::trace!("evicted a decoded bin from the store cache");
                }
            })),
        )?;

        let decompressor = decompress::resolve(header.compression());
        let store = Store::new(store_items, decompressor);
        let collator = Collator::global(opts.collation_cache_capacity)?;

        Ok(Archive(Arc::new(ArchiveInner {
            header,
            ref_list: Arc::new(ref_list),
            key_list,
            store,
            collator,
            closed: AtomicBool::new(false),
            file,
        })))
    }

    /// The number of references (distinct `(key, target)` entries).
    pub fn size(&self) -> u32 {
        self.0.ref_list.len()
    }

    /// Ordinal access to the `i`-th reference.
    pub fn get(&self, i: u32) -> Result<Blob, SlobError> {
        self.0.check_open()?;
        let r = self.0.ref_list.get(i)?;
        Ok(Blob {
            owner: Arc::downgrade(&self.0),
            owner_id: self.id(),
            id: format_blob_id(r.bin_index, r.item_index),
            key: r.key,
            fragment: r.fragment,
        })
    }

    /// Resolves a `"binIndex-itemIndex"` blob id to its content.
    pub fn get_content(&self, blob_id: &str) -> Result<Content, SlobError> {
        self.0.content_for_blob(blob_id)
    }

    /// Resolves a `"binIndex-itemIndex"` blob id to its content-type
    /// string, without decoding the body.
    pub fn get_content_type(&self, blob_id: &str) -> Result<String, SlobError> {
        self.0.content_type_for_blob(blob_id)
    }

    /// Binary-searches the key-list and returns a lazy, single-pass
    /// iterator over matches at `strength`.
    pub fn find(&self, key: &str, strength: Strength) -> Result<LookupIter, SlobError> {
        self.find_at(key, strength)
    }

    /// The process-wide collator this archive resolved at open time;
    /// reused by the multi-archive merge so it never has to re-resolve
    /// (and potentially re-fail) the collation backend itself.
    pub(crate) fn collator(&self) -> &'static Collator {
        self.0.collator
    }

    pub(crate) fn find_at(&self, key: &str, strength: Strength) -> Result<LookupIter, SlobError> {
        self.0.check_open()?;
        LookupIter::new(
            Arc::downgrade(&self.0),
            self.id(),
            &self.0.key_list,
            Arc::clone(&self.0.ref_list),
            self.0.collator,
            key.to_owned(),
            strength,
        )
    }

    /// The archive's content-identifying UUID.
    pub fn id(&self) -> Uuid {
        self.0.header.id()
    }

    /// The tag map declared in the header.
    pub fn tags(&self) -> &HashMap<String, String> {
        self.0.header.tags()
    }

    /// Tag `"uri"`, or `"slob:<uuid>"` if absent; used by the
    /// multi-archive merge for preference ranking.
    pub fn uri(&self) -> String {
        self.0.header.uri()
    }

    /// The advisory total count of individual content items.
    pub fn blob_count(&self) -> u32 {
        self.0.header.blob_count()
    }

    /// Releases the archive's file handle; further operations fail with
    /// [`SlobError::Closed`]. Other clones of this `Archive` and
    /// any outstanding `Blob`s observe the same closed state, since they
    /// share the same underlying handle.
    pub fn close(&self) {
        self.0.closed.store(true, Ordering::Release);
    }
}
