//! The collator adapter: wraps ICU collation and caches collation
//! keys per strength, exposing the exact and prefix comparators.

use std::{
    cmp::Ordering,
    collections::HashMap,
    num::NonZeroUsize,
    sync::{Arc, Mutex, OnceLock},
};

use lru::LruCache;
use rust_icu_sys as sys;
use rust_icu_ucol as ucol;

use crate::error::SlobError;

/// The nine states a lookup can run at: the five collation strengths,
/// four of which (all but `Identical`) also have a prefix variant.
/// Declared weakest-to-strongest so the derived [`Ord`] matches the
/// "stronger wins a tie" merge-order rule, and so every prefix variant
/// sorts below every exact strength.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strength {
    PrimaryPrefix,
    SecondaryPrefix,
    TertiaryPrefix,
    QuaternaryPrefix,
    Primary,
    Secondary,
    Tertiary,
    Quaternary,
    Identical,
}

impl Strength {
    /// The cascade order the multi-archive merge walks:
    /// `QUATERNARY` down to `PRIMARY`, then the prefix ladder in the
    /// same order. `IDENTICAL` is never used by the merge.
    pub(crate) const MERGE_LADDER: [Strength; 8] = [
        Strength::Quaternary,
        Strength::Tertiary,
        Strength::Secondary,
        Strength::Primary,
        Strength::QuaternaryPrefix,
        Strength::TertiaryPrefix,
        Strength::SecondaryPrefix,
        Strength::PrimaryPrefix,
    ];

    pub(crate) fn is_prefix(self) -> bool {
        matches!(
            self,
            Strength::PrimaryPrefix
                | Strength::SecondaryPrefix
                | Strength::TertiaryPrefix
                | Strength::QuaternaryPrefix
        )
    }

    /// The exact strength backing this (possibly prefix) variant; the
    /// ICU collation key only ever depends on this, never on whether
    /// the comparison is exact or prefix.
    fn exact(self) -> Strength {
        match self {
            Strength::PrimaryPrefix => Strength::Primary,
            Strength::SecondaryPrefix => Strength::Secondary,
            Strength::TertiaryPrefix => Strength::Tertiary,
            Strength::QuaternaryPrefix => Strength::Quaternary,
            other => other,
        }
    }

    fn icu_value(self) -> sys::UColAttributeValue {
        match self.exact() {
            Strength::Primary => sys::UColAttributeValue::UCOL_PRIMARY,
            Strength::Secondary => sys::UColAttributeValue::UCOL_SECONDARY,
            Strength::Tertiary => sys::UColAttributeValue::UCOL_TERTIARY,
            Strength::Quaternary => sys::UColAttributeValue::UCOL_QUATERNARY,
            Strength::Identical => sys::UColAttributeValue::UCOL_IDENTICAL,
            _ => unreachable!("exact() only returns non-prefix variants"),
        }
    }

    /// The next, weaker strength in the merge ladder, or `None` once
    /// `self` is the last rung (`PRIMARY_PREFIX`).
    pub(crate) fn next_in_ladder(self) -> Option<Strength> {
        let idx = Self::MERGE_LADDER.iter().position(|&s| s == self)?;
        Self::MERGE_LADDER.get(idx + 1).copied()
    }

    /// The five distinct exact strengths, used to size per-strength
    /// collator/cache tables.
    fn exact_variants() -> [Strength; 5] {
        [
            Strength::Primary,
            Strength::Secondary,
            Strength::Tertiary,
            Strength::Quaternary,
            Strength::Identical,
        ]
    }
}

/// One ICU collator configured for a single exact strength, with
/// `alternate handling = shifted` (punctuation-quaternary).
struct StrengthCollator {
    icu: Mutex<ucol::UCollator>,
    keys: Mutex<LruCache<String, Arc<[u8]>>>,
}

impl StrengthCollator {
    fn new(strength: Strength, cache_capacity: usize) -> Result<Self, SlobError> {
        let mut icu =
            ucol::UCollator::try_from("").map_err(|e| SlobError::Collation(e.to_string()))?;
        icu.set_strength(strength.icu_value());
        icu.set_attribute(
            sys::UColAttribute::UCOL_ALTERNATE_HANDLING,
            sys::UColAttributeValue::UCOL_SHIFTED,
        )
        .map_err(|e| SlobError::Collation(e.to_string()))?;

        Ok(Self {
            icu: Mutex::new(icu),
            keys: Mutex::new(LruCache::new(
                NonZeroUsize::new(cache_capacity.max(1)).unwrap(),
            )),
        })
    }

    fn sort_key(&self, s: &str) -> Arc<[u8]> {
        if let Some(key) = self.keys.lock().unwrap().get(s) {
            return Arc::clone(key);
        }

        let raw = self.icu.lock().unwrap().get_sort_key(s);
        let key: Arc<[u8]> = Arc::from(raw.into_boxed_slice());
        self.keys.lock().unwrap().put(s.to_owned(), Arc::clone(&key));
        key
    }
}

/// The process-wide collator adapter: one ICU collator plus one
/// collation-key cache per exact strength, shared process-wide across
/// every open archive.
pub(crate) struct Collator {
    by_strength: HashMap<Strength, StrengthCollator>,
}

impl Collator {
    fn new(cache_capacity: usize) -> Result<Self, SlobError> {
        let mut by_strength = HashMap::new();
        for strength in Strength::exact_variants() {
            by_strength.insert(strength, StrengthCollator::new(strength, cache_capacity)?);
        }
        Ok(Self { by_strength })
    }

    /// The process-wide instance, initialized with the default 4096
    /// capacity on first use. An `OpenOptions` override only takes
    /// effect for the first archive opened in the process, since the
    /// cache genuinely is process-global rather than per-archive.
    ///
    /// Initialization failure (the ICU backend refusing to construct a
    /// collator) is operational, not a reason to abort the process: it
    /// is cached too, so every caller sees the same `SlobError::Collation`
    /// rather than racing to retry a doomed construction.
    pub(crate) fn global(cache_capacity: usize) -> Result<&'static Collator, SlobError> {
        static INSTANCE: OnceLock<Result<Collator, String>> = OnceLock::new();
        match INSTANCE.get_or_init(|| Collator::new(cache_capacity).map_err(|e| e.to_string())) {
            Ok(collator) => Ok(collator),
            Err(message) => Err(SlobError::Collation(message.clone())),
        }
    }

    fn key(&self, s: &str, strength: Strength) -> Arc<[u8]> {
        self.by_strength
            .get(&strength.exact())
            .expect("all exact strengths are pre-populated")
            .sort_key(s)
    }

    /// The exact comparator: signed comparison of collation keys built
    /// at `strength`.
    pub(crate) fn compare_exact(&self, a: &str, b: &str, strength: Strength) -> Ordering {
        self.key(a, strength).cmp(&self.key(b, strength))
    }

    /// The prefix comparator: `candidate`'s collation key is compared
    /// byte-by-byte against `target`'s; running off the end of
    /// `target`'s key is a match.
    pub(crate) fn compare_prefix(&self, candidate: &str, target: &str, strength: Strength) -> Ordering {
        let candidate_key = self.key(candidate, strength);
        let target_key = self.key(target, strength);

        for i in 0.. {
            let left = candidate_key.get(i).copied().unwrap_or(0);
            let right = target_key.get(i).copied().unwrap_or(0);

            if right == 0 {
                return Ordering::Equal;
            }
            if left == 0 {
                return Ordering::Less;
            }
            if left != right {
                return left.cmp(&right);
            }
        }
        unreachable!()
    }
}
