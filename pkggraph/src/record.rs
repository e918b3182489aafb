// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The per-package datum stored in a [`crate::graph::Graph`] (spec §3).

use indexmap::IndexMap;

use crate::ids::{ImportPath, PackageId, PackageName, PackagePath};

/// The kind of a [`LoadError`]. `ListError` is the only kind the cycle
/// breaker itself ever introduces (spec §4.E, §7); `ParseError` and
/// `TypeError` cover what a real `PackageLoader` reports for files that
/// failed to parse or type-check, which the loader attaches to the
/// owning package's record rather than dropping the file silently.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoadErrorKind {
    ListError,
    ParseError,
    TypeError,
}

/// One entry in a [`PackageRecord`]'s `errors` list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoadError {
    pub msg: String,
    pub kind: LoadErrorKind,
}

impl LoadError {
    /// The synthetic error the cycle breaker appends to every updated
    /// node it had to cut an edge from (spec §4.E).
    pub fn detected_import_cycle() -> Self {
        Self {
            msg: "detected import cycle".to_string(),
            kind: LoadErrorKind::ListError,
        }
    }
}

/// The per-package datum the loader reports and the graph stores (spec
/// §3).
#[derive(Clone, Debug)]
pub struct PackageRecord {
    pub id: PackageId,
    pub pkg_path: PackagePath,
    pub name: PackageName,

    pub all_files: Vec<String>,
    pub compiled_files: Vec<String>,
    pub ignored_files: Vec<String>,

    /// Empty, or the `PackagePath` this package is a test variant of.
    pub for_test: Option<PackagePath>,

    /// Non-empty iff the package has load errors. Always non-empty
    /// after cycle breakage touches this record.
    pub errors: Vec<LoadError>,

    /// Duplicates allowed; a `None` target means "missing".
    pub deps_by_imp_path: Vec<(ImportPath, Option<PackageId>)>,
    /// Values are unique and non-empty.
    pub deps_by_pkg_path: IndexMap<PackagePath, PackageId>,

    /// True iff this record was synthesized for a single
    /// build-tag-ignored file.
    pub standalone: bool,
}

impl PackageRecord {
    /// An [intermediate test variant][glossary]: a record whose
    /// `for_test` is non-empty, distinct from its own `pkg_path`, and
    /// whose `pkg_path` does not equal `for_test + "_test"` (spec §3).
    ///
    /// [glossary]: https://en.wikipedia.org/wiki/Test_double
    pub fn is_intermediate_test_variant(&self) -> bool {
        match &self.for_test {
            Some(for_test) => {
                for_test.as_str() != self.pkg_path.as_str()
                    && self.pkg_path.as_str() != format!("{}_test", for_test.as_str())
            }
            None => false,
        }
    }

    /// Every URI in `all_files` that's also in `compiled_files`, plus
    /// anything in `compiled_files` not already counted -- i.e. the
    /// "compiled-or-total" file list spec §4.E's `IDs` derivation uses.
    pub fn compiled_or_total_files(&self) -> impl Iterator<Item = &str> {
        self.all_files
            .iter()
            .chain(self.compiled_files.iter())
            .map(String::as_str)
    }

    /// No self-edge exists in either deps map (spec §3 invariant).
    pub fn has_no_self_edges(&self) -> bool {
        !self
            .deps_by_pkg_path
            .values()
            .any(|target| *target == self.id)
            && !self
                .deps_by_imp_path
                .iter()
                .any(|(_, target)| target.as_ref() == Some(&self.id))
    }
}
