// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A compact string pool local to a single index.
//!
//! An `Interner` is single-writer while an index is being built and
//! read-only afterwards -- the same "build once, share freely" discipline
//! `guppy` applies to its `OnceCell`-backed derived data, just pushed down
//! to string storage instead of whole graphs.

use indexmap::IndexSet;
use std::fmt;

/// Index into an [`Interner`]'s string table.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct StringIdx(u32);

impl StringIdx {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Rebuilds a `StringIdx` from a raw table position, for decoding a
    /// persisted index. The caller must ensure `idx` is in bounds for
    /// the `Interner` it will be resolved against.
    #[inline]
    pub fn from_raw(idx: u32) -> Self {
        Self(idx)
    }
}

impl fmt::Display for StringIdx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A string table that deduplicates repeated filenames and package/object
/// paths. Interning the same string twice returns the same index.
#[derive(Clone, Debug, Default)]
pub struct Interner {
    strings: IndexSet<Box<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self {
            strings: IndexSet::new(),
        }
    }

    /// Interns `s`, returning its stable index within this table.
    pub fn intern(&mut self, s: &str) -> StringIdx {
        if let Some(idx) = self.strings.get_index_of(s) {
            return StringIdx(idx as u32);
        }
        let (idx, _) = self.strings.insert_full(s.into());
        StringIdx(idx as u32)
    }

    /// Resolves an index back to its string. Panics if the index was not
    /// produced by this table -- a cross-table index is a programming
    /// error, not a recoverable condition.
    pub fn resolve(&self, idx: StringIdx) -> &str {
        self.strings
            .get_index(idx.index())
            .unwrap_or_else(|| panic!("string index {} out of bounds for this interner", idx))
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterates strings in table order, matching the persisted `Strings[]`
    /// layout (§4.A / §6 of the design: deterministic element order).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(|s| s.as_ref())
    }

    /// Rebuilds an interner from an ordered list of strings (used when
    /// decoding a persisted index).
    pub fn from_ordered(strings: impl IntoIterator<Item = Box<str>>) -> Self {
        Self {
            strings: strings.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable_and_deduplicates() {
        let mut interner = Interner::new();
        let a = interner.intern("example.com/a");
        let b = interner.intern("example.com/b");
        let a2 = interner.intern("example.com/a");
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "example.com/a");
        assert_eq!(interner.resolve(b), "example.com/b");
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn from_raw_reconstructs_a_decoded_index() {
        let mut interner = Interner::new();
        let idx = interner.intern("foo");
        let decoded = StringIdx::from_raw(idx.index() as u32);
        assert_eq!(interner.resolve(decoded), "foo");
    }

    #[test]
    fn from_ordered_round_trips() {
        let mut interner = Interner::new();
        let idx = interner.intern("foo");
        let strings: Vec<Box<str>> = interner.iter().map(Into::into).collect();
        let rebuilt = Interner::from_ordered(strings);
        assert_eq!(rebuilt.resolve(idx), "foo");
    }
}
