//! Fixed-capacity fingerprint bucket used by Cuckoo and Vacuum.

use std::borrow::Cow;

use rand::Rng;

use crate::key::AmqKey;

/// Sentinel reserved to mean "empty slot". A raw hash of `0` is bumped to
/// `1` by [`crate::hash::fingerprint_nonzero`] to preserve this invariant.
pub const EMPTY_FINGERPRINT: Fingerprint = Fingerprint(0);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl AmqKey for Fingerprint {
    fn amq_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(self.0.to_be_bytes().to_vec())
    }
}

/// A fixed-capacity, ordered multiset of fingerprints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bucket {
    slots: Vec<Fingerprint>,
    capacity: usize,
}

impl Bucket {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.capacity
    }

    pub fn contains(&self, fp: Fingerprint) -> bool {
        self.slots.contains(&fp)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Fingerprint> {
        self.slots.iter()
    }

    /// Attempts to insert `fp`. Fails (returns `false`) if the bucket is full.
    pub fn try_insert(&mut self, fp: Fingerprint) -> bool {
        if self.is_full() {
            false
        } else {
            self.slots.push(fp);
            true
        }
    }

    /// Removes the first occurrence of `fp`, if any.
    pub fn try_delete(&mut self, fp: Fingerprint) -> bool {
        match self.slots.iter().position(|s| *s == fp) {
            Some(pos) => {
                self.slots.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Swaps `fp` in for a uniformly random occupant and returns the
    /// displaced fingerprint. Requires `len() > 0`.
    pub fn swap(&mut self, fp: Fingerprint, rng: &mut impl Rng) -> Fingerprint {
        debug_assert!(!self.is_empty());
        let idx = rng.gen_range(0..self.slots.len());
        let displaced = self.slots[idx];
        self.slots[idx] = fp;
        displaced
    }

    pub fn reset(&mut self) {
        self.slots.clear();
    }
}
