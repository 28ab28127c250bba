//! A read-only engine for the `slob` content-addressed dictionary
//! archive format: a self-describing header, a key index sorted by
//! Unicode collation order, and a compressed content store in a single
//! file.
//!
//! [`Archive::open`] parses a file and exposes ordinal access
//! ([`Archive::get`]), collation-aware key lookup ([`Archive::find`]),
//! and typed content retrieval ([`Archive::get_content`]). [`find`] is
//! the secondary entry point: it merges, ranks, and deduplicates
//! lookup results across several open archives.
//!
//! Compression (`zlib`/`lzma2`) and Unicode collation are consumed as
//! narrow external capabilities; this crate never authors archives,
//! only reads them.

#![deny(rust_2018_idioms, rustdoc::broken_intra_doc_links)]

mod archive;
mod blob;
mod collator;
mod decompress;
mod error;
mod header;
mod item_list;
mod lookup;
mod mapping;
mod merge;
mod refs;
mod store;
mod text;

pub use archive::{Archive, OpenOptions};
pub use blob::{Blob, Content};
pub use collator::Strength;
pub use error::SlobError;
pub use header::Header;
pub use lookup::LookupIter;
pub use merge::MultiArchiveMerge;
pub use refs::{Keyed, Ref};

/// Merges lookup results for `key` across `archives`.
///
/// Results are deduplicated by `(archive-uuid, blob-id, fragment)` and
/// ranked: exact matches in `preferred` first, then exact matches from
/// archives sharing `preferred`'s `"uri"` tag, then the remaining exact
/// matches strongest-strength-first, then the same cascade over prefix
/// matches (where preference no longer reorders results). The cascade
/// descends through `up_to_strength` (default: the full ladder down to
/// `PRIMARY_PREFIX`).
pub fn find(
    key: &str,
    archives: &[Archive],
    preferred: Option<&Archive>,
    up_to_strength: Option<Strength>,
) -> MultiArchiveMerge {
    MultiArchiveMerge::new(key, archives, preferred, up_to_strength)
}
