//! Packed mutable bitmap backend shared by the Bloom and Xor engines.

use bitvec::prelude::*;

use crate::FilterError;

/// Ordered sequence of `N` bits, packed into words.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitArray {
    bits: BitVec<usize, Lsb0>,
}

impl BitArray {
    /// Allocates a zeroed bit-array of `len` bits.
    pub fn zeros(len: usize) -> Self {
        Self {
            bits: bitvec![usize, Lsb0; 0; len],
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline]
    pub fn is_set(&self, i: usize) -> bool {
        self.bits[i]
    }

    #[inline]
    pub fn set(&mut self, i: usize) {
        self.bits.set(i, true);
    }

    #[inline]
    pub fn clear(&mut self, i: usize) {
        self.bits.set(i, false);
    }

    pub fn count_ones(&self) -> usize {
        self.bits.count_ones()
    }

    /// Clears every bit back to `0`.
    pub fn reset(&mut self) {
        self.bits.fill(false);
    }

    /// In-place bitwise OR. Fails if the two arrays don't share a length.
    pub fn or_assign(&mut self, other: &BitArray) -> Result<(), FilterError> {
        self.check_same_len(other)?;
        for i in 0..self.bits.len() {
            let v = self.bits[i] | other.bits[i];
            self.bits.set(i, v);
        }
        Ok(())
    }

    /// In-place bitwise AND. Fails if the two arrays don't share a length.
    pub fn and_assign(&mut self, other: &BitArray) -> Result<(), FilterError> {
        self.check_same_len(other)?;
        for i in 0..self.bits.len() {
            let v = self.bits[i] & other.bits[i];
            self.bits.set(i, v);
        }
        Ok(())
    }

    fn check_same_len(&self, other: &BitArray) -> Result<(), FilterError> {
        if self.bits.len() != other.bits.len() {
            Err(FilterError::Incompatible {
                reason: format!(
                    "bit-array length mismatch: {} vs {}",
                    self.bits.len(),
                    other.bits.len()
                ),
            })
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_test() {
        let mut a = BitArray::zeros(10);
        assert!(!a.is_set(3));
        a.set(3);
        assert!(a.is_set(3));
        a.clear(3);
        assert!(!a.is_set(3));
    }

    #[test]
    fn or_and_and() {
        let mut a = BitArray::zeros(4);
        let mut b = BitArray::zeros(4);
        a.set(0);
        a.set(1);
        b.set(1);
        b.set(2);

        let mut or_result = a.clone();
        or_result.or_assign(&b).unwrap();
        assert!(or_result.is_set(0));
        assert!(or_result.is_set(1));
        assert!(or_result.is_set(2));
        assert!(!or_result.is_set(3));

        let mut and_result = a.clone();
        and_result.and_assign(&b).unwrap();
        assert!(!and_result.is_set(0));
        assert!(and_result.is_set(1));
        assert!(!and_result.is_set(2));
    }

    #[test]
    fn mismatched_length_rejected() {
        let mut a = BitArray::zeros(4);
        let b = BitArray::zeros(5);
        assert!(a.or_assign(&b).is_err());
    }

    #[test]
    fn reset_clears_all_bits() {
        let mut a = BitArray::zeros(8);
        a.set(0);
        a.set(7);
        a.reset();
        assert_eq!(a.count_ones(), 0);
    }
}
