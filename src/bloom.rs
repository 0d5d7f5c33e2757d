//! # Bloom filter
//!
//! A space-efficient, insert-only probabilistic set: never a false
//! negative, a bounded rate of false positives, no deletion.

use std::{
    f64::consts::LN_2,
    hash::{Hash, Hasher},
};

use twox_hash::XxHash64;

use crate::bitarray::BitArray;
use crate::hash;
use crate::key::AmqKey;
use crate::{
    Filter,
    FilterError::{self, FilterTooLarge, Incompatible, InvalidParameter},
};

const MAX_FILTER_BIT_SIZE: usize = 200_000_000_000;

/// A Bloom filter is a space-efficient probabilistic data structure to test
/// whether an item is a member of a set.
///
/// It never returns false negatives but may return false positives.
/// Items can only be added, not deleted.
#[derive(Clone, Debug, PartialEq)]
pub struct BloomFilter {
    array: BitArray,
    false_positive_rate: f64,
    hash_fn_count: usize,
    bit_size: usize,
}

impl BloomFilter {
    /// Constructs a new `BloomFilter`.
    ///
    /// * `capacity`: Intended elements the Bloom filter shall be able to hold
    /// * `target_err_rate`: The Bloom filter's acceptable false positive rate
    ///
    /// Fails for invalid parameters or if the filter would be too large for
    /// the architecture.
    pub fn new(capacity: usize, target_err_rate: f64) -> Result<BloomFilter, FilterError> {
        if capacity < 1 {
            return Err(InvalidParameter {
                name: "capacity",
                expected: "1 <= capacity",
                found: capacity.to_string(),
            });
        }
        if target_err_rate <= 0.0 || 1.0 <= target_err_rate {
            return Err(InvalidParameter {
                name: "target_err_rate",
                expected: "0.0 < error rate < 1.0",
                found: target_err_rate.to_string(),
            });
        }

        let optimal_bit_size = optimal_bit_size(capacity, target_err_rate)?;
        let hash_fn_count = optimal_hash_fn_count(optimal_bit_size, capacity);
        let bit_size = match optimal_bit_size % hash_fn_count {
            0 => optimal_bit_size,
            _ => optimal_bit_size + (hash_fn_count - optimal_bit_size % hash_fn_count),
        };
        let false_positive_rate = false_positive_rate(bit_size, capacity, hash_fn_count);
        let array = BitArray::zeros(bit_size);

        Ok(BloomFilter {
            bit_size,
            hash_fn_count,
            array,
            false_positive_rate,
        })
    }

    /// Inserts a byte-sequence or fixed-width-integer key.
    pub fn insert_key<K: AmqKey + ?Sized>(&mut self, key: &K) {
        for idx in self.probe_indexes(hash::bloom_double_hash(key)) {
            self.array.set(idx);
        }
    }

    /// *Indicates* whether `key` is in the `BloomFilter`.
    ///
    /// Never yields false negatives. Yields false positives roughly up to
    /// the rate of `false_positive_rate` unless the filter's declared
    /// capacity has been exceeded.
    pub fn contains_key<K: AmqKey + ?Sized>(&self, key: &K) -> bool {
        self.probe_indexes(hash::bloom_double_hash(key))
            .into_iter()
            .all(|idx| self.array.is_set(idx))
    }

    /// Inserts any `impl Hash` item, mirroring the crate's original
    /// ergonomic surface.
    pub fn insert(&mut self, item: impl Hash) {
        for idx in self.probe_indexes(self.hash_pair(item)) {
            self.array.set(idx);
        }
    }

    /// *Indicates* whether `item` is in the `BloomFilter`.
    pub fn contains(&self, item: impl Hash) -> bool {
        self.probe_indexes(self.hash_pair(item))
            .into_iter()
            .all(|idx| self.array.is_set(idx))
    }

    /// Returns an *approximation* of the number of elements added to the
    /// `BloomFilter`.
    pub fn count_approx(&self) -> usize {
        let num_truthy_bits = self.array.count_ones();
        approximate_elems(self.bit_size, self.hash_fn_count, num_truthy_bits).round() as usize
    }

    /// Resets the `BloomFilter` to its empty state.
    pub fn reset(&mut self) -> &mut Self {
        self.array.reset();
        self
    }

    /// Number of bits backing the filter.
    pub fn bit_size(&self) -> usize {
        self.bit_size
    }

    /// The filter's theoretical error rate at its declared capacity.
    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }

    /// Number of hash probes performed per operation.
    pub fn hash_fn_count(&self) -> usize {
        self.hash_fn_count
    }

    /// Bitwise-ORs `other` into `self` in place. Both filters must share
    /// `(bit_size, hash_fn_count)`. The union upper-bounds the true
    /// union's false-positive rate.
    pub fn union_assign(&mut self, other: &BloomFilter) -> Result<(), FilterError> {
        self.check_compatible(other)?;
        self.array.or_assign(&other.array)
    }

    /// Bitwise-ANDs `other` into `self` in place. Both filters must share
    /// `(bit_size, hash_fn_count)`. This is a conservative overestimate of
    /// the true intersection, not the intersection itself.
    pub fn intersect_assign(&mut self, other: &BloomFilter) -> Result<(), FilterError> {
        self.check_compatible(other)?;
        self.array.and_assign(&other.array)
    }

    fn check_compatible(&self, other: &BloomFilter) -> Result<(), FilterError> {
        if self.bit_size != other.bit_size || self.hash_fn_count != other.hash_fn_count {
            Err(Incompatible {
                reason: format!(
                    "bloom filters must share (bit_size, hash_fn_count); got ({}, {}) vs ({}, {})",
                    self.bit_size, self.hash_fn_count, other.bit_size, other.hash_fn_count
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Kirsch-Mitzenmacher double hashing: the i-th probe (0-indexed here,
    /// 1-indexed in the math) is `(a + i*b) mod m`.
    fn probe_indexes(&self, (a, b): (u64, u64)) -> Vec<usize> {
        let mut acc = Vec::with_capacity(self.hash_fn_count);
        for i in 0..self.hash_fn_count as u64 {
            let idx = a.wrapping_add(i.wrapping_mul(b)) % self.bit_size as u64;
            acc.push(idx as usize);
        }
        acc
    }

    fn hash_pair(&self, item: impl Hash) -> (u64, u64) {
        let mut hasher_1 = XxHash64::default();
        let mut hasher_2 = XxHash64::with_seed(hash::SEED_BLOOM_H2 as u64);
        item.hash(&mut hasher_1);
        item.hash(&mut hasher_2);
        (hasher_1.finish(), hasher_2.finish())
    }
}

impl Filter for BloomFilter {
    fn insert_key<K: AmqKey + ?Sized>(&mut self, key: &K) -> Result<(), FilterError> {
        self.insert_key(key);
        Ok(())
    }

    fn contains_key<K: AmqKey + ?Sized>(&self, key: &K) -> bool {
        self.contains_key(key)
    }

    fn count_approx(&self) -> usize {
        self.count_approx()
    }

    fn reset(&mut self) -> &mut Self {
        self.reset()
    }

    fn bit_count(&self) -> usize {
        self.bit_size
    }

    fn error_rate(&self) -> f64 {
        self.false_positive_rate
    }

    fn hash_fn_count(&self) -> usize {
        self.hash_fn_count
    }
}

/// Calculates the false positive rate of a Bloom filter with the given
/// properties. Used in filter construction.
fn false_positive_rate(bit_size: usize, capacity: usize, hash_fn_count: usize) -> f64 {
    (1.0 - (-1.0 * hash_fn_count as f64 * (capacity as f64 + 0.5) / (bit_size as f64 - 1.0)).exp())
        .powf(hash_fn_count as f64)
}

/// Calculates the optimal bit size m = ceil(-n*ln(eps) / ln(2)^2).
fn optimal_bit_size(capacity: usize, target_err_rate: f64) -> Result<usize, FilterError> {
    let bit_size = (-1.0 * capacity as f64 * target_err_rate.ln() / LN_2.powi(2)).ceil();

    if bit_size == f64::INFINITY || bit_size.is_infinite() || bit_size as usize > 800_000_000_000 {
        return Err(FilterTooLarge {
            bit_size: bit_size as usize,
            max_size: MAX_FILTER_BIT_SIZE,
        });
    }

    Ok(bit_size as usize)
}

/// Calculates the optimal number of hash functions k = ceil((m/n)*ln(2)).
fn optimal_hash_fn_count(bit_size: usize, capacity: usize) -> usize {
    (((bit_size as f64 / capacity as f64) * LN_2).round() as usize).max(1)
}

/// Approximates the number of items in the filter from its set-bit count.
fn approximate_elems(bits: usize, hash_fns_count: usize, num_truthy_bits: usize) -> f64 {
    let m = bits as f64;
    let k = hash_fns_count as f64;
    let x = num_truthy_bits as f64;

    -1.0 * (m * (1.0 - x / m).log(std::f64::consts::E)) / k
}
