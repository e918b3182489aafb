// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! String interning, byte-offset positions, and function-signature
//! fingerprints shared by the workspace-state crates.
//!
//! Nothing in this crate knows about packages or graphs -- it is the
//! leaf layer that `methodset`, `testindex`, and `pkggraph` all build on,
//! without depending on any of them in turn.

pub mod fingerprint;
pub mod intern;
pub mod position;

pub use fingerprint::{
    unify, BasicKind, ChanDir, FieldDesc, Fingerprint, FingerprintCache, ParseError, Sexpr,
    TypeDesc,
};
pub use intern::{Interner, StringIdx};
pub use position::{FileIdx, Position};
