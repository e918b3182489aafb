// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The three external collaborator boundaries (spec §6): loader,
//! parser, and type checker. Each is an `async_trait` object-safe trait
//! so the snapshot lifecycle and its caching behavior are fully
//! testable with a fake implementation, the way `guppy::MetadataCommand`
//! is swappable for a pre-parsed `CargoMetadata` fixture in tests.

use std::sync::Arc;

use crate::ids::PackageId;
use crate::record::PackageRecord;

/// Input supplied to the core is a list of `PackageRecord`s describing
/// the packages reachable for a given build scope. The core does not
/// invoke the `go` tool directly (spec §6 "Loader boundary").
#[async_trait::async_trait]
pub trait PackageLoader: Send + Sync {
    async fn load(&self, scope: &str) -> Vec<PackageRecord>;
}

/// A parsed file plus a position/URI mapper, opaque to this crate (spec
/// §6 "Parser boundary"). The core consumes these but never constructs
/// them.
#[derive(Clone, Debug)]
pub struct ParsedFileHandle {
    pub uri: String,
    pub content_hash: u64,
    pub parsed: testindex::ast::ParsedFile,
}

#[async_trait::async_trait]
pub trait Parser: Send + Sync {
    async fn parse(&self, uri: &str, content: &str) -> ParsedFileHandle;
}

/// `{types.Package, types.Info, diagnostics}` (spec §6 "Type-checker
/// boundary"), reduced to exactly the data this crate's two indices
/// need to be built from it.
#[derive(Clone, Debug)]
pub struct TypeCheckedPackage {
    pub package_id: PackageId,
    pub exported_types: Vec<methodset::ExportedType>,
    pub parsed_files: Vec<testindex::ast::ParsedFile>,
    pub diagnostics: Vec<String>,
}

#[async_trait::async_trait]
pub trait TypeChecker: Send + Sync {
    /// Given a package record, the parse trees of its compiled files,
    /// and the type-checked direct deps, returns the checked package.
    /// The core memoizes the result per snapshot-key (spec §6).
    async fn check(
        &self,
        record: &PackageRecord,
        files: &[ParsedFileHandle],
        direct_deps: &[Arc<TypeCheckedPackage>],
    ) -> TypeCheckedPackage;
}
