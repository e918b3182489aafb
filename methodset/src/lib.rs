// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-package method-set index (spec §4.C).
//!
//! For each exported, non-alias, package-level type, the index records
//! its method set's fingerprinted signatures and a hashed bit mask that
//! lets [`implements`] reject most non-matches in constant time without
//! touching the (potentially tricky, unify-requiring) fingerprint text.

pub mod build;
pub mod implements;
pub mod index;

pub use build::{build_method_set_index, ExportedType, MethodInput};
pub use implements::{implements, Direction, Policy, ResultLocation, SearchResult};
pub use index::{Method, MethodSet, MethodSetIndex};
