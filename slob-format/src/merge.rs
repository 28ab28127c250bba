//! The cross-archive match iterator: merges, ranks, and
//! deduplicates results across multiple archives.

use std::{cmp::Ordering, collections::HashSet};

use crate::{archive::Archive, blob::Blob, collator::Strength};

struct ArchiveState {
    archive: Archive,
    strength: Strength,
    current: Option<crate::lookup::LookupIter>,
    pending: Option<(Blob, Strength)>,
    finished: bool,
}

/// A peekable, single-pass iterator over the merged, deduplicated,
/// preference-ranked results of a lookup across several archives.
pub struct MultiArchiveMerge {
    key: String,
    up_to: Strength,
    preferred_index: Option<usize>,
    archives: Vec<ArchiveState>,
    seen: HashSet<String>,
}

impl MultiArchiveMerge {
    pub(crate) fn new(
        key: &str,
        archives: &[Archive],
        preferred: Option<&Archive>,
        up_to: Option<Strength>,
    ) -> Self {
        let preferred_index = preferred.and_then(|p| {
            let id = p.id();
            archives.iter().position(|a| a.id() == id)
        });

        let mut this = Self {
            key: key.to_owned(),
            up_to: up_to.unwrap_or(Strength::PrimaryPrefix),
            preferred_index,
            archives: archives
                .iter()
                .map(|a| ArchiveState {
                    archive: a.clone(),
                    strength: Strength::Quaternary,
                    current: None,
                    pending: None,
                    finished: false,
                })
                .collect(),
            seen: HashSet::new(),
        };

        for idx in 0..this.archives.len() {
            this.refill(idx);
        }

        this
    }

    /// Pulls the next not-yet-seen match for archive `idx`, advancing
    /// through the strength ladder (and skipping/logging any archive
    /// that errors) until one is found or the archive is exhausted
    /// through `up_to`.
    fn refill(&mut self, idx: usize) {
        loop {
            let state = &mut self.archives[idx];
            if state.finished {
                state.pending = None;
                return;
            }

            if state.current.is_none() {
                match state.archive.find_at(&self.key, state.strength) {
                    Ok(iter) => state.current = Some(iter),
                    Err(e) => {
                        log::warn!(
                            "lookup failed on archive {}, treating as empty at this strength: {e}",
                            state.archive.uri()
                        );
                        if !self.advance_strength(idx) {
                            return;
                        }
                        continue;
                    }
                }
            }

            let next = self.archives[idx].current.as_mut().unwrap().next();
            match next {
                Some(Ok(blob)) => {
                    let dedup_key = blob.dedup_key();
                    if self.seen.contains(&dedup_key) {
                        continue;
                    }
                    self.seen.insert(dedup_key);
                    let strength = self.archives[idx].strength;
                    self.archives[idx].pending = Some((blob, strength));
                    return;
                }
                Some(Err(e)) => {
                    log::warn!(
                        "lookup failed on archive {}, treating as empty at this strength: {e}",
                        self.archives[idx].archive.uri()
                    );
                    self.archives[idx].current = None;
                    if !self.advance_strength(idx) {
                        return;
                    }
                }
                None => {
                    self.archives[idx].current = None;
                    if !self.advance_strength(idx) {
                        return;
                    }
                }
            }
        }
    }

    /// Advances `idx` to the next rung of the ladder. Returns `false`
    /// if the archive is now finished (its iterator drained at
    /// `up_to`).
    fn advance_strength(&mut self, idx: usize) -> bool {
        let state = &mut self.archives[idx];
        if state.strength == self.up_to {
            state.finished = true;
            state.pending = None;
            return false;
        }
        state.strength = state
            .strength
            .next_in_ladder()
            .expect("up_to is reached before the ladder runs out");
        true
    }

    fn total_order(&self, a: usize, b: usize) -> Ordering {
        let (a_blob, a_strength) = self.archives[a].pending.as_ref().unwrap();
        let (b_blob, b_strength) = self.archives[b].pending.as_ref().unwrap();

        if !a_strength.is_prefix() && !b_strength.is_prefix() && a != b {
            if let Some(pref) = self.preferred_index {
                if a == pref {
                    return Ordering::Less;
                }
                if b == pref {
                    return Ordering::Greater;
                }

                let pref_uri = self.archives[pref].archive.uri();
                let a_is_pref_uri = self.archives[a].archive.uri() == pref_uri;
                let b_is_pref_uri = self.archives[b].archive.uri() == pref_uri;
                if a_is_pref_uri && !b_is_pref_uri {
                    return Ordering::Less;
                }
                if b_is_pref_uri && !a_is_pref_uri {
                    return Ordering::Greater;
                }
            }
        }

        if a_strength == b_strength {
            // The collation backend is process-global (§9), so any
            // archive's resolved collator is the same instance; reusing
            // one here avoids re-resolving (and re-risking failure on)
            // the collation backend for a merge that already has live
            // archives in hand.
            return self
                .archives[a]
                .archive
                .collator()
                .compare_exact(&a_blob.key, &b_blob.key, *a_strength);
        }

        // The stronger strength wins; `Strength`'s `Ord` puts the
        // stronger variant later, so reverse the comparison.
        b_strength.cmp(a_strength)
    }

    fn current_min_index(&self) -> Option<usize> {
        let candidates: Vec<usize> = self
            .archives
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.pending.as_ref().map(|_| i))
            .collect();

        candidates
            .into_iter()
            .min_by(|&a, &b| self.total_order(a, b))
    }

    /// Returns the current minimum without consuming it.
    pub fn peek(&self) -> Option<&Blob> {
        let idx = self.current_min_index()?;
        self.archives[idx].pending.as_ref().map(|(b, _)| b)
    }

    /// Whether there is a pending match to return.
    pub fn has_next(&self) -> bool {
        self.archives.iter().any(|s| s.pending.is_some())
    }
}

impl Iterator for MultiArchiveMerge {
    type Item = Blob;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.current_min_index()?;
        let (blob, _) = self.archives[idx].pending.take()?;
        self.refill(idx);
        Some(blob)
    }
}
