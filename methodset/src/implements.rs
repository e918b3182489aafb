// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The implements-query (spec §4.C) and the symmetric `Search` that
//! walks a collection of [`MethodSetIndex`]es looking for
//! implements-relationships with a query `Key`.

use wscore::FingerprintCache;

use crate::index::{Key, Method, MethodSet, MethodSetIndex};

/// "Does the type with method set `x` implement the interface with
/// method set `y`?" (spec §4.C).
///
/// The fast path is sufficient on its own whenever neither side is
/// tricky: fingerprinting guarantees that a matching `Sum` implies an
/// identical signature string, so the mask subset check alone decides
/// the answer. Either side being tricky falls back to a per-method scan
/// that also tries structural unification.
pub fn implements(x: &Key<'_>, y: &Key<'_>, cache: &FingerprintCache) -> bool {
    if !y.is_interface {
        return false;
    }
    if !x.tricky && !y.tricky {
        return x.mask & y.mask == y.mask;
    }
    y.methods.iter().all(|my| method_satisfied_by(x.methods, my, cache))
}

fn method_satisfied_by(candidates: &[Method], target: &Method, cache: &FingerprintCache) -> bool {
    candidates.iter().any(|mx| {
        if mx.id != target.id {
            return false;
        }
        if !mx.tricky && !target.tricky {
            return mx.sum == target.sum && mx.fingerprint == target.fingerprint;
        }
        match (cache.parse(&mx.fingerprint), cache.parse(&target.fingerprint)) {
            (Some(a), Some(b)) => wscore::unify(&a, &b),
            // A malformed fingerprint can only come from an internal bug;
            // treat it as non-matching rather than panicking mid-query.
            _ => false,
        }
    })
}

/// Direction of a confirmed implements-relationship between a candidate
/// method set in the index and the query `Key`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Direction {
    /// The candidate implements the query interface.
    CandidateImplementsKey,
    /// The query type implements the candidate interface.
    KeyImplementsCandidate,
}

/// Where a [`SearchResult`] points: either the whole candidate type's
/// declaration, or -- when the search was scoped to one method id -- the
/// declaring package/object path of that specific method.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ResultLocation {
    TypePosition(wscore::Position),
    Method {
        pkg_path: Option<String>,
        object_path: Option<String>,
    },
}

#[derive(Clone, Debug)]
pub struct SearchResult {
    pub candidate_index: usize,
    pub direction: Direction,
    pub location: ResultLocation,
}

/// Policy controlling `Search`'s output.
#[derive(Clone, Copy, Debug)]
pub struct Policy {
    /// When true, a candidate/key pair that are both interfaces is never
    /// reported, even if `implements` holds in one or both directions
    /// (spec §4.C: "A configuration policy elides interface/interface
    /// pairs").
    pub elide_interface_interface_pairs: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            elide_interface_interface_pairs: true,
        }
    }
}

/// Walks every method set in `index`, returning a [`SearchResult`] for
/// each side of the symmetric relation
/// `implements(candidate, key) ∨ implements(key, candidate)` that holds
/// (spec §4.C Search).
///
/// When `method_id` is `Some`, each result's location is the matching
/// method's declaring package/object path rather than the candidate
/// type's position; methods with no navigation info (the `error.Error`
/// exception, spec §4.C) are skipped rather than reported with an empty
/// location.
pub fn search(
    index: &MethodSetIndex,
    key: &Key<'_>,
    method_id: Option<&str>,
    policy: &Policy,
    cache: &FingerprintCache,
) -> Vec<SearchResult> {
    let mut results = Vec::new();
    for (candidate_index, candidate) in index.method_sets.iter().enumerate() {
        if policy.elide_interface_interface_pairs && candidate.is_interface && key.is_interface {
            continue;
        }
        let candidate_key = candidate.as_key();

        if implements(&candidate_key, key, cache) {
            push_result(
                &mut results,
                index,
                candidate,
                candidate_index,
                Direction::CandidateImplementsKey,
                method_id,
            );
        }
        if implements(key, &candidate_key, cache) {
            push_result(
                &mut results,
                index,
                candidate,
                candidate_index,
                Direction::KeyImplementsCandidate,
                method_id,
            );
        }
    }
    results
}

fn push_result(
    results: &mut Vec<SearchResult>,
    index: &MethodSetIndex,
    candidate: &MethodSet,
    candidate_index: usize,
    direction: Direction,
    method_id: Option<&str>,
) {
    let location = match method_id {
        None => ResultLocation::TypePosition(candidate.position),
        Some(id) => match candidate.methods.iter().find(|m| m.id == id) {
            Some(m) if m.pkg_path_idx.is_some() || m.object_path_idx.is_some() => {
                ResultLocation::Method {
                    pkg_path: m.pkg_path_idx.map(|idx| index.strings.resolve(idx).to_string()),
                    object_path: m
                        .object_path_idx
                        .map(|idx| index.strings.resolve(idx).to_string()),
                }
            }
            // Either the method wasn't part of the match (shouldn't
            // happen if `method_id` names a method on `y`) or it is the
            // `error.Error` exception with no navigation info -- never
            // report it as a result (spec §4.C).
            _ => return,
        },
    };
    results.push(SearchResult {
        candidate_index,
        direction,
        location,
    });
}
