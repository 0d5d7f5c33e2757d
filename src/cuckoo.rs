//! # Cuckoo filter
//!
//! Partial-key cuckoo hashing: each key's fingerprint lives in one of two
//! candidate buckets, derived so that either bucket's index can be
//! recovered from the other and the fingerprint alone. Unlike Bloom,
//! supports deletion.

use std::cmp;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bucket::{Bucket, Fingerprint};
use crate::hash;
use crate::key::AmqKey;
use crate::{Filter, FilterError, FilterError::InvalidParameter};

const DEFAULT_BUCKET_SIZE: usize = 4;
const DEFAULT_MAX_DISPLACEMENTS: u32 = 500;

/// A Cuckoo filter: partial-key cuckoo hashing with random-victim eviction.
#[derive(Clone, Debug, PartialEq)]
pub struct CuckooFilter {
    buckets: Vec<Bucket>,
    bucket_size: usize,
    fingerprint_bits: u32,
    max_displacements: u32,
    size: usize,
    error_rate: f64,
    rng: StdRng,
}

impl CuckooFilter {
    /// Constructs a new `CuckooFilter` with the default bucket size (4) and
    /// displacement bound (500).
    pub fn new(capacity: usize, error_rate: f64) -> Result<Self, FilterError> {
        Self::with_params(
            capacity,
            error_rate,
            DEFAULT_BUCKET_SIZE,
            DEFAULT_MAX_DISPLACEMENTS,
        )
    }

    /// Constructs a new `CuckooFilter`, configuring the bucket size and the
    /// displacement cascade bound explicitly.
    pub fn with_params(
        capacity: usize,
        error_rate: f64,
        bucket_size: usize,
        max_displacements: u32,
    ) -> Result<Self, FilterError> {
        if capacity < 1 {
            return Err(InvalidParameter {
                name: "capacity",
                expected: "1 <= capacity",
                found: capacity.to_string(),
            });
        }
        if error_rate <= 0.0 || 1.0 <= error_rate {
            return Err(InvalidParameter {
                name: "error_rate",
                expected: "0.0 < error_rate < 1.0",
                found: error_rate.to_string(),
            });
        }
        if bucket_size < 1 {
            return Err(InvalidParameter {
                name: "bucket_size",
                expected: "1 <= bucket_size",
                found: bucket_size.to_string(),
            });
        }

        let num_buckets = cmp::max(1, capacity.div_ceil(bucket_size).next_power_of_two());
        let fingerprint_bits = ((1.0 / error_rate).log2() + (2.0 * bucket_size as f64).log2())
            .ceil()
            .max(1.0) as u32;
        let fingerprint_bits = fingerprint_bits.min(64);

        Ok(Self {
            buckets: vec![Bucket::new(bucket_size); num_buckets],
            bucket_size,
            fingerprint_bits,
            max_displacements,
            size: 0,
            error_rate,
            rng: StdRng::from_entropy(),
        })
    }

    /// Swaps in a seeded RNG so victim selection is reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Number of elements currently stored.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    pub fn fingerprint_bits(&self) -> u32 {
        self.fingerprint_bits
    }

    /// Primary bucket index for `key`.
    fn primary_index<K: AmqKey + ?Sized>(&self, key: &K) -> usize {
        hash::bucket_index(key, self.buckets.len())
    }

    /// Alternate bucket index given a primary index and a fingerprint.
    /// `alternate(alternate(i, fp), fp) == i` because XOR with the same
    /// value is its own inverse and `num_buckets` is a power of two.
    pub(crate) fn alternate_index(&self, index: usize, fp: Fingerprint) -> usize {
        index ^ hash::bucket_index(&fp, self.buckets.len())
    }

    fn fingerprint_of<K: AmqKey + ?Sized>(&self, key: &K) -> Fingerprint {
        Fingerprint(hash::fingerprint_nonzero(key, self.fingerprint_bits))
    }

    /// Inserts `key`. Tries both candidate buckets first; if both are full,
    /// evicts a random occupant and chases the displacement chain up to
    /// `max_displacements` times. Returns [`FilterError::Full`] if the
    /// cascade doesn't terminate — the evicted fingerprint is then lost.
    pub fn insert_key<K: AmqKey + ?Sized>(&mut self, key: &K) -> Result<(), FilterError> {
        let fp = self.fingerprint_of(key);
        let i = self.primary_index(key);
        let j = self.alternate_index(i, fp);

        if self.buckets[i].try_insert(fp) || self.buckets[j].try_insert(fp) {
            self.size += 1;
            return Ok(());
        }

        let choices = [i, j];
        let mut evict_index = choices[self.rng.gen_range(0..2)];
        let mut f = fp;
        for _ in 0..self.max_displacements {
            f = self.buckets[evict_index].swap(f, &mut self.rng);
            evict_index = self.alternate_index(evict_index, f);
            if self.buckets[evict_index].try_insert(f) {
                self.size += 1;
                return Ok(());
            }
        }

        Err(FilterError::Full {
            max_displacements: self.max_displacements,
        })
    }

    /// Indicates whether `key` might be a member.
    pub fn contains_key<K: AmqKey + ?Sized>(&self, key: &K) -> bool {
        let fp = self.fingerprint_of(key);
        let i = self.primary_index(key);
        let j = self.alternate_index(i, fp);
        self.buckets[i].contains(fp) || self.buckets[j].contains(fp)
    }

    /// Removes `key` if present. Deleting a key that was never inserted may
    /// erroneously remove a colliding item sharing the same fingerprint —
    /// this is the caller's responsibility to avoid.
    pub fn delete_key<K: AmqKey + ?Sized>(&mut self, key: &K) -> bool {
        let fp = self.fingerprint_of(key);
        let i = self.primary_index(key);
        let j = self.alternate_index(i, fp);
        if self.buckets[i].try_delete(fp) || self.buckets[j].try_delete(fp) {
            self.size -= 1;
            true
        } else {
            false
        }
    }

    pub fn reset_filter(&mut self) -> &mut Self {
        for bucket in &mut self.buckets {
            bucket.reset();
        }
        self.size = 0;
        self
    }
}

impl Filter for CuckooFilter {
    fn insert_key<K: AmqKey + ?Sized>(&mut self, key: &K) -> Result<(), FilterError> {
        self.insert_key(key)
    }

    fn contains_key<K: AmqKey + ?Sized>(&self, key: &K) -> bool {
        self.contains_key(key)
    }

    fn count_approx(&self) -> usize {
        self.size
    }

    fn reset(&mut self) -> &mut Self {
        self.reset_filter()
    }

    fn bit_count(&self) -> usize {
        self.buckets.len() * self.bucket_size * self.fingerprint_bits as usize
    }

    fn error_rate(&self) -> f64 {
        self.error_rate
    }

    fn hash_fn_count(&self) -> usize {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_bad_parameters() {
        assert!(CuckooFilter::new(0, 0.01).is_err());
        assert!(CuckooFilter::new(100, 0.0).is_err());
        assert!(CuckooFilter::new(100, 1.0).is_err());
    }

    #[test]
    fn fingerprint_sizing_is_nonzero() {
        let c = CuckooFilter::new(1_000_000, 0.99).unwrap();
        assert!(c.fingerprint_bits() >= 1);
    }

    #[test]
    fn num_buckets_is_power_of_two() {
        let c = CuckooFilter::new(1_000, 0.01).unwrap();
        assert!(c.num_buckets().is_power_of_two());
    }

    #[test]
    fn insert_then_contains() {
        let mut c = CuckooFilter::new(1_000, 0.01).unwrap().with_seed(1);
        for i in 0u64..500 {
            c.insert_key(&i).unwrap();
        }
        for i in 0u64..500 {
            assert!(c.contains_key(&i));
        }
        assert_eq!(c.len(), 500);
    }

    #[test]
    fn delete_then_not_contains() {
        let mut c = CuckooFilter::new(1_000, 0.01).unwrap().with_seed(2);
        c.insert_key(&"hello").unwrap();
        assert!(c.contains_key(&"hello"));
        assert!(c.delete_key(&"hello"));
        assert!(!c.contains_key(&"hello"));
    }

    #[test]
    fn delete_missing_key_fails() {
        let mut c = CuckooFilter::new(1_000, 0.01).unwrap();
        assert!(!c.delete_key(&"absent"));
    }

    #[test]
    fn alternate_index_is_involutive() {
        let c = CuckooFilter::new(1_000, 0.01).unwrap();
        for i in 0u64..200 {
            let key = i.to_string();
            let fp = c.fingerprint_of(key.as_str());
            let idx = c.primary_index(key.as_str());
            let alt = c.alternate_index(idx, fp);
            assert_eq!(c.alternate_index(alt, fp), idx);
        }
    }

    #[test]
    fn reset_clears_everything() {
        let mut c = CuckooFilter::new(1_000, 0.01).unwrap();
        c.insert_key(&"x").unwrap();
        c.reset_filter();
        assert_eq!(c.len(), 0);
        assert!(!c.contains_key(&"x"));
    }

    proptest::proptest! {
        #[test]
        fn alternate_index_is_involutive_for_any_key(n in 0u64..1_000_000) {
            let c = CuckooFilter::new(1_000, 0.01).unwrap();
            let fp = c.fingerprint_of(&n);
            let idx = c.primary_index(&n);
            let alt = c.alternate_index(idx, fp);
            proptest::prop_assert_eq!(c.alternate_index(alt, fp), idx);
        }
    }
}
