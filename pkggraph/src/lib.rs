// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The immutable, cycle-tolerant package-metadata graph and the
//! snapshot/session lifecycle built on top of it (spec §3-§5).
//!
//! This crate is the core of a Go language server's workspace state: a
//! [`graph::Graph`] of [`record::PackageRecord`]s, an update algebra
//! that never mutates a previously-published graph, and a
//! [`session::Session`]/[`session::View`]/[`snapshot::Snapshot`]
//! lifecycle that gives every query a consistent, point-in-time view
//! while still sharing derived computations (method-set and
//! test-function indices, from [`methodset`] and [`testindex`]) across
//! requests that land on an unchanged package.

pub mod cycles;
pub mod errors;
pub mod graph;
pub mod ids;
pub mod record;
pub mod serialize;
pub mod session;
pub mod snapshot;
pub mod traits;

pub use cycles::Cycles;
pub use errors::Error;
pub use graph::{Graph, Updates};
pub use ids::{ImportPath, PackageId, PackageName, PackagePath, COMMAND_LINE_ARGUMENTS_PREFIX};
pub use record::{LoadError, LoadErrorKind, PackageRecord};
pub use session::{Session, View};
pub use snapshot::{FileContents, HandleKey, PackageCache, Snapshot};
pub use traits::{PackageLoader, Parser, ParsedFileHandle, TypeChecker, TypeCheckedPackage};
