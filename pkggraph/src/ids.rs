// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The four identifier newtypes of the data model (spec §3). They wrap
//! the same underlying `Arc<str>` representation but are distinct
//! types, so passing a `PackagePath` where a `PackageId` is expected is
//! a compiler error rather than a silent bug.

use std::fmt;
use std::sync::Arc;

macro_rules! interned_id {
    ($name:ident) => {
        #[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl Into<Arc<str>>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Opaque identifier assigned by the loader; may look like a path
/// (`"example.com/a"`) or a composite
/// (`"example.com/a [example.com/b.test]"`). Never used as a file path.
interned_id!(PackageId);

/// Linker-prefix path.
interned_id!(PackagePath);

/// Identifier in the `package` clause.
interned_id!(PackageName);

/// Literal used in an import declaration.
interned_id!(ImportPath);

/// Prefix the loader uses for ephemeral packages synthesized for files
/// outside any known module (spec glossary, "Command-line-arguments
/// package").
pub const COMMAND_LINE_ARGUMENTS_PREFIX: &str = "command-line-arguments";

impl PackageId {
    /// True if this ID was synthesized for a command-line-arguments
    /// package (spec §3, §4.E derivation rule for `IDs`).
    pub fn is_command_line_arguments(&self) -> bool {
        self.0.starts_with(COMMAND_LINE_ARGUMENTS_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_newtypes_do_not_compare_equal_across_types() {
        let id = PackageId::new("example.com/a");
        let path = PackagePath::new("example.com/a");
        assert_eq!(id.as_str(), path.as_str());
        // There is no `PartialEq<PackagePath> for PackageId` impl: this
        // would be a compile error if uncommented, which is the point.
        // assert_eq!(id, path);
    }

    #[test]
    fn recognizes_command_line_arguments_ids() {
        assert!(PackageId::new("command-line-arguments_1").is_command_line_arguments());
        assert!(!PackageId::new("example.com/a").is_command_line_arguments());
    }
}
