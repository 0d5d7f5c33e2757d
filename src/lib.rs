//! # Gauze
//!
//! A collection of approximate membership query (AMQ) filters — probabilistic
//! sets that answer "is x in S?" with a bounded false-positive rate and, for
//! every engine but Xor, zero false negatives.
//!
//! Four engines are provided, each trading differently between insertion
//! cost, lookup cost, deletion support, mutability, and bits per element:
//!
//! * [`BloomFilter`] — classic k-probe bitmap, insert-only, supports
//!   `union`/`intersect`.
//! * [`CuckooFilter`] — partial-key cuckoo hashing, supports deletion.
//! * [`VacuumFilter`] — a cuckoo variant tuned for higher load factor via a
//!   multi-range alternate-bucket function, also supports deletion.
//! * [`XorFilter`] — built once from a known key set via peelable
//!   3-hypergraph construction; immutable, smallest bits-per-element.
//!
//! ## Gauze in Action
//!
//! ```rust
//! use gauze::BloomFilter;
//!
//! let capacity = 100_000;
//! let target_err_rate = 0.001;
//! let mut bloom =
//!     BloomFilter::new(capacity, target_err_rate).expect("couldn't construct Bloom filter.");
//!
//! // `BloomFilter`s can add any type that is `impl Hash`...
//! bloom.insert(1);
//! bloom.insert("a");
//!
//! // ...or an explicit byte-sequence/integer key via the `AmqKey` surface.
//! bloom.insert_key(&"b");
//! bloom.insert_key(&2u64);
//!
//! assert!(bloom.contains(1));
//! assert!(bloom.contains_key(&"b"));
//!
//! // Items can't be removed from a Bloom filter. But it can be reset.
//! bloom.reset();
//! ```
//!
//! Cuckoo and Vacuum filters support deletion and use the byte/integer
//! `AmqKey` surface directly:
//!
//! ```rust
//! use gauze::CuckooFilter;
//!
//! let mut cuckoo = CuckooFilter::new(1_000, 0.01).unwrap();
//! cuckoo.insert_key(&"city:Boston").unwrap();
//! assert!(cuckoo.contains_key(&"city:Boston"));
//! cuckoo.delete_key(&"city:Boston");
//! assert!(!cuckoo.contains_key(&"city:Boston"));
//! ```

pub mod bitarray;
pub mod bloom;
pub mod bucket;
pub mod cuckoo;
pub mod hash;
pub mod key;
pub mod vacuum;
pub mod xor;

pub use bloom::BloomFilter;
pub use cuckoo::CuckooFilter;
pub use key::AmqKey;
pub use vacuum::VacuumFilter;
pub use xor::XorFilter;

use thiserror::Error;

/// An error returned by a method provided by the filter engines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    /// A constructor or method is called with invalid parameters.
    #[error("invalid parameter {name}: expected {expected}, found {found}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Description of the expected value.
        expected: &'static str,
        /// The value that was provided, rendered for display.
        found: String,
    },
    /// The requested Bloom filter would need more bits than the crate is
    /// willing to allocate.
    #[error("requested filter is too large: {bit_size} bits exceeds the {max_size} bit ceiling")]
    FilterTooLarge {
        /// Bits the requested parameters would need.
        bit_size: usize,
        /// The ceiling enforced by this crate.
        max_size: usize,
    },
    /// Attempted to merge two Bloom filters with mismatched parameters.
    #[error("cannot merge filters with incompatible parameters: {reason}")]
    Incompatible {
        /// Human-readable description of the mismatch.
        reason: String,
    },
    /// A Cuckoo/Vacuum insert's displacement cascade did not terminate.
    #[error("filter is full: displacement cascade exceeded {max_displacements} attempts")]
    Full {
        /// The `max_displacements` bound that was exceeded.
        max_displacements: u32,
    },
    /// Xor filter construction exhausted its peeling-retry budget.
    #[error("xor filter construction failed after {attempts} peeling attempts")]
    BuildFailed {
        /// Number of seed redraws attempted before giving up.
        attempts: u32,
    },
}

/// The capability set shared by the mutable, insert-and-query engines
/// (Bloom, Cuckoo, Vacuum). Xor is build-once and immutable, so it does not
/// implement this trait — see [`XorFilter::build`] and
/// [`XorFilter::contains`] instead.
///
/// Mirroring the crate's original ergonomic `impl Hash` surface on
/// [`BloomFilter`], this trait's methods take the explicit byte-sequence /
/// fixed-width-integer [`AmqKey`] surface that `spec.md`'s data model calls
/// for. Because the methods are generic, this trait is not object-safe —
/// callers who need a single type to hold any engine should reach for
/// [`AmqFilter`] instead, which dispatches on a tagged variant rather than a
/// trait object.
pub trait Filter {
    /// Inserts `key`. Infallible for Bloom; may return
    /// [`FilterError::Full`] for Cuckoo/Vacuum once a displacement cascade
    /// fails to terminate.
    fn insert_key<K: AmqKey + ?Sized>(&mut self, key: &K) -> Result<(), FilterError>;
    /// Indicates whether `key` might be a member. Never a false negative
    /// for a key that was inserted and not subsequently deleted.
    fn contains_key<K: AmqKey + ?Sized>(&self, key: &K) -> bool;
    /// An approximation (Bloom) or exact count (Cuckoo/Vacuum) of inserted
    /// elements.
    fn count_approx(&self) -> usize;
    /// Clears the filter back to its empty state.
    fn reset(&mut self) -> &mut Self;
    /// Total bits occupied by the filter's backing storage.
    fn bit_count(&self) -> usize;
    /// The filter's configured or theoretical false-positive rate.
    fn error_rate(&self) -> f64;
    /// Number of hash probes performed per operation.
    fn hash_fn_count(&self) -> usize;
}

/// A single type able to hold any of the four engines, dispatching on a
/// tagged variant rather than a trait object — the polymorphic surface
/// spec.md's design notes ask for ("capability record plus tagged
/// variants"), chosen because [`Filter`]'s generic methods rule out a
/// trait-object-based `dyn Filter`.
#[derive(Clone, Debug, PartialEq)]
pub enum AmqFilter {
    Bloom(BloomFilter),
    Cuckoo(CuckooFilter),
    Vacuum(VacuumFilter),
    Xor(XorFilter),
}

impl AmqFilter {
    /// Indicates whether `key` might be a member, regardless of which
    /// engine is wrapped.
    pub fn contains_key<K: AmqKey + ?Sized>(&self, key: &K) -> bool {
        match self {
            AmqFilter::Bloom(f) => f.contains_key(key),
            AmqFilter::Cuckoo(f) => f.contains_key(key),
            AmqFilter::Vacuum(f) => f.contains_key(key),
            AmqFilter::Xor(f) => f.contains(key),
        }
    }

    /// Inserts `key`. Fails with [`FilterError::Incompatible`] if called on
    /// the immutable `Xor` variant, and with `Full` if a Cuckoo/Vacuum
    /// displacement cascade doesn't terminate.
    pub fn insert_key<K: AmqKey + ?Sized>(&mut self, key: &K) -> Result<(), FilterError> {
        match self {
            AmqFilter::Bloom(f) => f.insert_key(key),
            AmqFilter::Cuckoo(f) => f.insert_key(key),
            AmqFilter::Vacuum(f) => f.insert_key(key),
            AmqFilter::Xor(_) => Err(FilterError::Incompatible {
                reason: "XorFilter is immutable once built".to_string(),
            }),
        }
    }
}
