// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contains types that describe errors this crate's methods can return.

use crate::ids::PackageId;
use std::error;
use std::fmt;

use Error::*;

/// Error type describing the sorts of errors a package-graph query can
/// return (spec §7: four error kinds). `Clone` so a derivation's error
/// can be memoized alongside its result and replayed to every later
/// caller within the snapshot (spec §7 "Propagation policy").
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The caller cancelled the operation. Always propagated; no
    /// partial result is returned alongside it.
    Cancelled,
    /// The loader emitted `Errors` on one or more package records. The
    /// records themselves are not removed from the graph; this variant
    /// is for callers that want to surface load errors as a failure.
    LoadError(PackageId, String),
    /// An internal invariant was violated: an acyclic-precondition
    /// check failed, a method-set entry is missing an object path, or
    /// an unexpected AST shape was seen. Reported through a side
    /// channel (`tracing::error!`) at the call site; this variant
    /// exists so a caller that needs a `Result` can still observe it.
    Bug(String),
    /// The query does not apply to the given input, e.g. "position is
    /// not inside a function".
    NotApplicable(String),
    /// A package ID was unknown to this `Graph`.
    UnknownPackageId(PackageId),
    /// An internal error occurred while constructing or updating a
    /// `Graph`.
    GraphInternalError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cancelled => write!(f, "operation was cancelled"),
            LoadError(id, msg) => write!(f, "load error for package {id}: {msg}"),
            Bug(msg) => write!(f, "internal invariant violation: {msg}"),
            NotApplicable(msg) => write!(f, "query not applicable: {msg}"),
            UnknownPackageId(id) => write!(f, "unknown package ID: {id}"),
            GraphInternalError(msg) => write!(f, "internal error in package graph: {msg}"),
        }
    }
}

impl error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_package_id() {
        let err = Error::UnknownPackageId(PackageId::new("example.com/a"));
        assert_eq!(err.to_string(), "unknown package ID: example.com/a");
    }
}
