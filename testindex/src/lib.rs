// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-package index of `Test`/`Benchmark`/`Fuzz`/`Example` functions and
//! their table-driven or directly-nested subtests (spec §4.D).

pub mod ast;
pub mod index;
pub mod naming;
pub mod recognize;
pub mod subtests;

pub use index::{build_test_index, FileTests, TestEntry, TestIndex};
pub use recognize::{recognize, DeclKind};
