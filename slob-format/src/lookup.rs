//! Single-archive lookup: binary search on the key projection,
//! then a forward scan while the stop comparator yields equal.

use std::{
    cmp::Ordering,
    sync::{Arc, Weak},
};

use uuid::Uuid;

use crate::{
    archive::ArchiveInner,
    blob::{format_blob_id, Blob},
    collator::{Collator, Strength},
    error::SlobError,
    refs::{KeyList, RefList},
};

fn lower_bound(
    key_list: &KeyList,
    collator: &Collator,
    target: &str,
    strength: Strength,
) -> Result<u32, SlobError> {
    let mut lo = 0u32;
    let mut hi = key_list.len();

    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let candidate = key_list.get(mid)?;
        if collator.compare_exact(&candidate.key, target, strength) == Ordering::Less {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }

    Ok(lo)
}

/// A single-pass, non-restartable iterator over one archive's matches
/// for a key at a given strength.
pub struct LookupIter {
    owner: Weak<ArchiveInner>,
    owner_id: Uuid,
    ref_list: Arc<RefList>,
    collator: &'static Collator,
    target_key: String,
    strength: Strength,
    next_index: u32,
    len: u32,
    done: bool,
}

impl LookupIter {
    pub(crate) fn new(
        owner: Weak<ArchiveInner>,
        owner_id: Uuid,
        key_list: &KeyList,
        ref_list: Arc<RefList>,
        collator: &'static Collator,
        target_key: String,
        strength: Strength,
    ) -> Result<Self, SlobError> {
        let next_index = lower_bound(key_list, collator, &target_key, strength)?;
        let len = ref_list.len();

        Ok(Self {
            owner,
            owner_id,
            ref_list,
            collator,
            target_key,
            strength,
            next_index,
            len,
            done: false,
        })
    }
}

impl Iterator for LookupIter {
    type Item = Result<Blob, SlobError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.next_index >= self.len {
            return None;
        }

        let r = match self.ref_list.get(self.next_index) {
            Ok(r) => r,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let matches = if self.strength.is_prefix() {
            self.collator
                .compare_prefix(&r.key, &self.target_key, self.strength)
                == Ordering::Equal
        } else {
            self.collator.compare_exact(&r.key, &self.target_key, self.strength) == Ordering::Equal
        };

        if !matches {
            self.done = true;
            return None;
        }

        self.next_index += 1;
        Some(Ok(Blob {
            owner: self.owner.clone(),
            owner_id: self.owner_id,
            id: format_blob_id(r.bin_index, r.item_index),
            key: r.key,
            fragment: r.fragment,
        }))
    }
}
