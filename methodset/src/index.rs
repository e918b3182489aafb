// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use wscore::{Interner, Position, StringIdx};

/// One method of a [`MethodSet`].
///
/// `error.Error` is a recognized exception to navigation: it has no
/// declaring package or object path (both are `None`), and callers must
/// never report it as a navigable result (spec §4.C).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Method {
    pub id: String,
    pub fingerprint: String,
    /// `CRC32(ID || Fingerprint)`.
    pub sum: u32,
    pub tricky: bool,
    pub position: Position,
    pub pkg_path_idx: Option<StringIdx>,
    pub object_path_idx: Option<StringIdx>,
}

impl Method {
    /// The bit this method's `Sum` contributes to a [`MethodSet`]'s mask
    /// (spec §3 Mask invariant):
    /// `1 << (((Sum>>24) ^ (Sum>>16) ^ (Sum>>8) ^ Sum) & 0x3f)`.
    pub fn mask_bit(sum: u32) -> u64 {
        let folded = (sum >> 24) ^ (sum >> 16) ^ (sum >> 8) ^ sum;
        1u64 << (folded & 0x3f)
    }

    pub fn new(id: impl Into<String>, fingerprint: wscore::Fingerprint, position: Position) -> Self {
        let id = id.into();
        let sum = crc32fast::hash(format!("{id}{}", fingerprint.text).as_bytes());
        Self {
            id,
            fingerprint: fingerprint.text,
            sum,
            tricky: fingerprint.tricky,
            position,
            pkg_path_idx: None,
            object_path_idx: None,
        }
    }
}

/// The method set of one exported, package-level type (or, in a [`Key`],
/// of a query type with no position information attached).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodSet {
    pub position: Position,
    pub is_interface: bool,
    pub tricky: bool,
    pub mask: u64,
    pub methods: Vec<Method>,
}

impl MethodSet {
    /// Builds a method set from its methods, deriving `mask` and
    /// `tricky` per spec §3/§4.C. `Tricky == any method is tricky`.
    pub fn new(position: Position, is_interface: bool, methods: Vec<Method>) -> Self {
        let mut mask = 0u64;
        let mut tricky = false;
        for m in &methods {
            mask |= Method::mask_bit(m.sum);
            tricky |= m.tricky;
        }
        Self {
            position,
            is_interface,
            tricky,
            mask,
            methods,
        }
    }

    /// A position-free view of this method set, suitable for use as the
    /// `Key` in an implements-query over a *different* index (spec
    /// §4.C Search: "accepts a `Key` (the method set of the query type,
    /// without position data)").
    pub fn as_key(&self) -> Key<'_> {
        Key {
            is_interface: self.is_interface,
            tricky: self.tricky,
            mask: self.mask,
            methods: &self.methods,
        }
    }
}

/// The method set of a query type, with no position data -- see
/// [`MethodSet::as_key`].
#[derive(Clone, Copy, Debug)]
pub struct Key<'a> {
    pub is_interface: bool,
    pub tricky: bool,
    pub mask: u64,
    pub methods: &'a [Method],
}

/// `{Strings: [string], MethodSets: [MethodSet]}` (spec §3).
#[derive(Clone, Debug, Default)]
pub struct MethodSetIndex {
    pub strings: Interner,
    pub method_sets: Vec<MethodSet>,
}

impl MethodSetIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_bit_matches_sum_hash() {
        let sum = 0xDEAD_BEEFu32;
        let bit = Method::mask_bit(sum);
        let folded = (sum >> 24) ^ (sum >> 16) ^ (sum >> 8) ^ sum;
        assert_eq!(bit, 1u64 << (folded & 0x3f));
    }

    #[test]
    fn mask_invariant_holds_for_every_method() {
        let position = Position::default();
        let methods: Vec<Method> = (0..5)
            .map(|i| {
                Method::new(
                    format!("M{i}"),
                    wscore::Fingerprint::of(&wscore::TypeDesc::Signature {
                        params: vec![],
                        variadic: false,
                        results: vec![],
                    }),
                    position,
                )
            })
            .collect();
        let mset = MethodSet::new(position, false, methods);
        for m in &mset.methods {
            let bit = Method::mask_bit(m.sum);
            assert_eq!(mset.mask & bit, bit);
        }
    }

    #[test]
    fn tricky_reflects_any_tricky_method() {
        let position = Position::default();
        let plain = Method::new(
            "Plain",
            wscore::Fingerprint::of(&wscore::TypeDesc::Signature {
                params: vec![],
                variadic: false,
                results: vec![],
            }),
            position,
        );
        let tricky = Method::new(
            "Tricky",
            wscore::Fingerprint::of(&wscore::TypeDesc::Signature {
                params: vec![wscore::TypeDesc::TypeParam(0)],
                variadic: false,
                results: vec![],
            }),
            position,
        );
        let mset = MethodSet::new(position, false, vec![plain, tricky]);
        assert!(mset.tricky);
    }
}
