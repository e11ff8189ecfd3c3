//! Fixed-width component bitsets.
//!
//! A [`Signature`] records which component ids are present on an entity (or
//! required/forbidden by a filter). Bit `i` set means component id `i` is
//! present. All operations are pure; ids are range-checked when the
//! [`ComponentId`] is constructed, so nothing here can fail.

use serde::{Deserialize, Serialize};

use crate::component::ComponentId;

/// Number of 64-bit words in a signature.
pub const SIGNATURE_WORDS: usize = 4;

/// Number of distinct component ids a signature can hold.
pub const SIGNATURE_WIDTH: usize = SIGNATURE_WORDS * 64;

/// A fixed-capacity component bitset.
///
/// Equality compares every word. [`Signature::fingerprint`] is a cheap hash
/// for index lookups and may collide; a fingerprint match must always be
/// confirmed with `==`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    words: [u64; SIGNATURE_WORDS],
}

impl Signature {
    /// The empty signature.
    pub const EMPTY: Signature = Signature {
        words: [0; SIGNATURE_WORDS],
    };

    /// Builds a signature with exactly the given ids set.
    #[must_use]
    pub fn from_ids(ids: impl IntoIterator<Item = ComponentId>) -> Self {
        let mut signature = Self::EMPTY;
        for id in ids {
            signature.set(id);
        }
        signature
    }

    #[inline]
    const fn locate(id: ComponentId) -> (usize, u64) {
        let index = id.index();
        (index / 64, 1u64 << (index % 64))
    }

    /// Sets the bit for `id`.
    #[inline]
    pub fn set(&mut self, id: ComponentId) {
        let (word, mask) = Self::locate(id);
        self.words[word] |= mask;
    }

    /// Clears the bit for `id`.
    #[inline]
    pub fn clear(&mut self, id: ComponentId) {
        let (word, mask) = Self::locate(id);
        self.words[word] &= !mask;
    }

    /// Returns a copy with `id` set.
    #[must_use]
    pub fn with(mut self, id: ComponentId) -> Self {
        self.set(id);
        self
    }

    /// Returns a copy with `id` cleared.
    #[must_use]
    pub fn without(mut self, id: ComponentId) -> Self {
        self.clear(id);
        self
    }

    /// Returns `true` if `id` is present.
    #[inline]
    #[must_use]
    pub fn has(&self, id: ComponentId) -> bool {
        let (word, mask) = Self::locate(id);
        self.words[word] & mask != 0
    }

    /// Superset test: every bit set in `other` is also set in `self`.
    #[inline]
    #[must_use]
    pub fn contains_all(&self, other: &Signature) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .all(|(a, b)| a & b == *b)
    }

    /// Returns `true` if any bit is set in both signatures.
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &Signature) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    /// Bitwise union of two signatures.
    #[must_use]
    pub fn union(&self, other: &Signature) -> Signature {
        let mut words = self.words;
        for (word, extra) in words.iter_mut().zip(other.words.iter()) {
            *word |= extra;
        }
        Signature { words }
    }

    /// Number of ids present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns `true` if no id is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Cheap, collision-possible hash of the words.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        self.words
            .iter()
            .enumerate()
            .fold(0, |acc, (i, &word)| acc ^ word.rotate_left(i as u32 * 17))
    }

    /// Iterates the present ids in ascending order.
    #[must_use]
    pub fn indices(&self) -> Indices {
        Indices {
            words: self.words,
            word: 0,
        }
    }
}

impl FromIterator<ComponentId> for Signature {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        Self::from_ids(iter)
    }
}

/// Ascending iterator over the ids set in a [`Signature`].
#[derive(Debug, Clone)]
pub struct Indices {
    words: [u64; SIGNATURE_WORDS],
    word: usize,
}

impl Iterator for Indices {
    type Item = ComponentId;

    fn next(&mut self) -> Option<ComponentId> {
        while self.word < SIGNATURE_WORDS {
            let bits = self.words[self.word];
            if bits != 0 {
                let bit = bits.trailing_zeros() as usize;
                self.words[self.word] &= bits - 1;
                return Some(ComponentId::from_index(self.word * 64 + bit));
            }
            self.word += 1;
        }
        None
    }
}
