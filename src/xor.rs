//! # Xor filter
//!
//! A build-once, immutable AMQ filter over a known finite key set, from
//! <https://dl.acm.org/doi/fullHtml/10.1145/3376122>. Construction peels a
//! 3-uniform hypergraph (each key occupies three table cells) down to an
//! assignment order; querying XORs together the three cells a key maps to
//! and compares against its fingerprint. Smallest bits-per-element of the
//! four engines, at the cost of being immutable: no add, no delete, no
//! merge.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::hash;
use crate::key::AmqKey;
use crate::FilterError::{self, BuildFailed, InvalidParameter};

const MAX_BUILD_ATTEMPTS: u32 = 32;
const OVERCAPACITY_NUMERATOR: usize = 123;
const OVERCAPACITY_DENOMINATOR: usize = 100;
const OVERCAPACITY_SLACK: usize = 32;

#[derive(Clone, Debug, PartialEq)]
pub struct XorFilter {
    table: Box<[u64]>,
    seeds: [u32; 3],
    fingerprint_bits: u32,
}

impl XorFilter {
    /// Builds a `XorFilter` over `keys` targeting false-positive rate
    /// `err_rate`. `keys` must be non-empty; construction retries with
    /// freshly drawn seeds (bounded by [`MAX_BUILD_ATTEMPTS`]) whenever the
    /// 3-hypergraph fails to peel, returning
    /// [`FilterError::BuildFailed`] if the budget is exhausted.
    pub fn build<K: AmqKey>(
        err_rate: f64,
        keys: impl IntoIterator<Item = K>,
    ) -> Result<Self, FilterError> {
        if err_rate <= 0.0 || 1.0 <= err_rate {
            return Err(InvalidParameter {
                name: "err_rate",
                expected: "0.0 < err_rate < 1.0",
                found: err_rate.to_string(),
            });
        }
        let keys: Vec<K> = keys.into_iter().collect();
        if keys.is_empty() {
            return Err(InvalidParameter {
                name: "keys",
                expected: "at least one key",
                found: "0".to_string(),
            });
        }

        let size = (OVERCAPACITY_NUMERATOR * keys.len()) / OVERCAPACITY_DENOMINATOR
            + OVERCAPACITY_SLACK;
        let fingerprint_bits = ((-err_rate.log2()).ceil() as u32 + 1).clamp(1, 64);

        let mut rng = StdRng::from_entropy();
        for attempt in 1..=MAX_BUILD_ATTEMPTS {
            let seeds = draw_seeds(&mut rng);
            if let Some(stack) = try_peel(&keys, size, &seeds) {
                let table = assign_table(&keys, size, &seeds, fingerprint_bits, stack);
                return Ok(Self {
                    table: table.into_boxed_slice(),
                    seeds,
                    fingerprint_bits,
                });
            }
            let _ = attempt;
        }

        Err(BuildFailed {
            attempts: MAX_BUILD_ATTEMPTS,
        })
    }

    /// Number of table cells.
    pub fn size(&self) -> usize {
        self.table.len()
    }

    pub fn fingerprint_bits(&self) -> u32 {
        self.fingerprint_bits
    }

    /// Returns whether `key` was a member of the set the filter was built
    /// from. For keys in the original set this is always `true`; for keys
    /// outside it, `true` with probability bounded by the `err_rate` the
    /// filter was built with.
    pub fn contains<K: AmqKey + ?Sized>(&self, key: &K) -> bool {
        let positions = hash_positions(key, &self.seeds, self.table.len());
        let fp = hash::fingerprint_raw(key, self.fingerprint_bits);
        let expected = positions.iter().fold(0u64, |acc, &p| acc ^ self.table[p]);
        fp == expected
    }
}

/// Draws three seeds uniformly from `[0, 2^31)`, rejecting draws until all
/// three are pairwise distinct and none collides with the fixed fingerprint
/// seed.
fn draw_seeds(rng: &mut StdRng) -> [u32; 3] {
    loop {
        let seeds = [
            rng.gen_range(0..(1u32 << 31)),
            rng.gen_range(0..(1u32 << 31)),
            rng.gen_range(0..(1u32 << 31)),
        ];
        let pairwise_distinct = seeds[0] != seeds[1] && seeds[0] != seeds[2] && seeds[1] != seeds[2];
        if pairwise_distinct && seeds.iter().all(|&s| s != hash::SEED_FINGERPRINT) {
            return seeds;
        }
    }
}

/// Splits `[0, size)` into three disjoint ranges and hashes `key` into each
/// with its own seed.
fn hash_positions<K: AmqKey + ?Sized>(key: &K, seeds: &[u32; 3], size: usize) -> [usize; 3] {
    let r0_end = (size / 3).max(1);
    let r1_end = (2 * size / 3).max(r0_end + 1);
    let bytes = key.amq_bytes();

    let h0 = (hash::hash64(&bytes, seeds[0]) as usize) % r0_end;
    let h1 = r0_end + (hash::hash64(&bytes, seeds[1]) as usize) % (r1_end - r0_end);
    let h2 = r1_end + (hash::hash64(&bytes, seeds[2]) as usize) % (size - r1_end).max(1);
    [h0, h1, h2]
}

/// Peels the 3-uniform hypergraph formed by each key's three table cells.
/// Returns the assignment stack `(key_index, resolved_cell)` in discovery
/// order if peeling consumes every key, `None` if a cyclic core remains.
fn try_peel<K: AmqKey>(keys: &[K], size: usize, seeds: &[u32; 3]) -> Option<Vec<(usize, usize)>> {
    let positions: Vec<[usize; 3]> = keys.iter().map(|k| hash_positions(k, seeds, size)).collect();

    let mut count = vec![0u32; size];
    let mut xor_idx = vec![0u64; size];
    for (i, pos) in positions.iter().enumerate() {
        for &slot in pos {
            count[slot] += 1;
            xor_idx[slot] ^= i as u64;
        }
    }

    let mut queue: VecDeque<usize> = (0..size).filter(|&s| count[s] == 1).collect();
    let mut stack = Vec::with_capacity(keys.len());

    while let Some(slot) = queue.pop_front() {
        if count[slot] != 1 {
            continue;
        }
        let key_idx = xor_idx[slot] as usize;
        stack.push((key_idx, slot));
        for &s in &positions[key_idx] {
            count[s] -= 1;
            xor_idx[s] ^= key_idx as u64;
            if count[s] == 1 {
                queue.push_back(s);
            }
        }
    }

    if stack.len() == keys.len() {
        Some(stack)
    } else {
        None
    }
}

/// Assigns table cells by popping the peeling stack in LIFO order, setting
/// each resolved cell so the invariant `fp(k) = T[h0]^T[h1]^T[h2]` holds.
fn assign_table<K: AmqKey>(
    keys: &[K],
    size: usize,
    seeds: &[u32; 3],
    fingerprint_bits: u32,
    stack: Vec<(usize, usize)>,
) -> Vec<u64> {
    let mut table = vec![0u64; size];
    for (key_idx, slot) in stack.into_iter().rev() {
        let key = &keys[key_idx];
        let positions = hash_positions(key, seeds, size);
        table[slot] = 0;
        let fp = hash::fingerprint_raw(key, fingerprint_bits);
        table[slot] = positions.iter().fold(fp, |acc, &p| acc ^ table[p]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_key_set() {
        let empty: Vec<u64> = vec![];
        assert!(XorFilter::build(0.01, empty).is_err());
    }

    #[test]
    fn rejects_bad_error_rate() {
        assert!(XorFilter::build(0.0, vec![1u64]).is_err());
        assert!(XorFilter::build(1.0, vec![1u64]).is_err());
    }

    #[test]
    fn every_built_key_is_contained() {
        let keys: Vec<u64> = (0..2_000).collect();
        let filter = XorFilter::build(1e-4, keys.clone()).unwrap();
        for k in &keys {
            assert!(filter.contains(k));
        }
    }

    #[test]
    fn false_positive_rate_is_bounded() {
        let keys: Vec<String> = (0..1_000).map(|i| format!("member-{i}")).collect();
        let filter = XorFilter::build(1e-4, keys.clone()).unwrap();

        let mut false_positives = 0;
        let trials = 100_000;
        for i in 0..trials {
            let probe = format!("absent-{i}");
            if filter.contains(&probe) {
                false_positives += 1;
            }
        }
        let observed_rate = false_positives as f64 / trials as f64;
        assert!(observed_rate < 1e-3, "observed rate {observed_rate}");
    }

    proptest::proptest! {
        /// Invariant 5: after build, every key's fingerprint equals the XOR
        /// of its three table cells — `contains` is exactly this check, so
        /// this asserts it holds across arbitrary key sets.
        #[test]
        fn built_keys_satisfy_the_xor_invariant(
            keys in proptest::collection::hash_set(proptest::num::u64::ANY, 10..500)
        ) {
            let keys: Vec<u64> = keys.into_iter().collect();
            let filter = XorFilter::build(0.01, keys.clone()).unwrap();
            for k in &keys {
                proptest::prop_assert!(filter.contains(k));
            }
        }
    }
}
