// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Constructs a [`MethodSetIndex`] from a package's exported types (spec
//! §4.C construction procedure). The real type-checker boundary (§6)
//! supplies `ExportedType` values; this module has no knowledge of how
//! they were produced.

use wscore::{Fingerprint, Position};

use crate::index::{Method, MethodSet, MethodSetIndex};

/// One method contributed to an [`ExportedType`]'s method set.
#[derive(Clone, Debug)]
pub struct MethodInput {
    pub id: String,
    pub fingerprint: Fingerprint,
    pub position: Position,
    /// Declaring package path, for navigation. `None` for the builtin
    /// `error.Error` exception (spec §4.C).
    pub pkg_path: Option<String>,
    /// Declaring object path, for navigation. `None` alongside
    /// `pkg_path` for the same exception.
    pub object_path: Option<String>,
}

/// One exported, non-alias, package-level type and the method set
/// computed for it (`methods(T) ∪ methods(*T)` unless `T` is an
/// interface -- that union is the caller's job, since it requires the
/// type-checker's own method-set resolution rules).
#[derive(Clone, Debug)]
pub struct ExportedType {
    pub position: Position,
    pub is_interface: bool,
    pub methods: Vec<MethodInput>,
}

/// Builds the method-set index for one package from its exported types,
/// following the four-step procedure in spec §4.C.
pub fn build_method_set_index(types: &[ExportedType]) -> MethodSetIndex {
    let mut index = MethodSetIndex::new();
    for ty in types {
        let methods = ty
            .methods
            .iter()
            .map(|m| {
                let mut method = Method::new(m.id.clone(), m.fingerprint.clone(), m.position);
                method.pkg_path_idx = m.pkg_path.as_deref().map(|s| index.strings.intern(s));
                method.object_path_idx = m.object_path.as_deref().map(|s| index.strings.intern(s));
                method
            })
            .collect();
        index
            .method_sets
            .push(MethodSet::new(ty.position, ty.is_interface, methods));
    }
    index
}

/// Builds the single [`MethodInput`] representing `error.Error`, the
/// built-in exception that carries no navigation information (spec
/// §4.C).
pub fn error_error_method(fingerprint: Fingerprint, position: Position) -> MethodInput {
    MethodInput {
        id: "Error".to_string(),
        fingerprint,
        position,
        pkg_path: None,
        object_path: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wscore::TypeDesc;

    fn string_to_string_fp() -> Fingerprint {
        Fingerprint::of(&TypeDesc::Signature {
            params: vec![],
            variadic: false,
            results: vec![TypeDesc::Basic(wscore::BasicKind::String)],
        })
    }

    #[test]
    fn error_error_has_no_navigation_info() {
        let method = error_error_method(string_to_string_fp(), Position::default());
        let types = vec![ExportedType {
            position: Position::default(),
            is_interface: true,
            methods: vec![method],
        }];
        let index = build_method_set_index(&types);
        let m = &index.method_sets[0].methods[0];
        assert!(m.pkg_path_idx.is_none());
        assert!(m.object_path_idx.is_none());
    }

    #[test]
    fn navigation_info_is_interned() {
        let method = MethodInput {
            id: "Foo".into(),
            fingerprint: string_to_string_fp(),
            position: Position::default(),
            pkg_path: Some("example.com/a".into()),
            object_path: Some("T.Foo".into()),
        };
        let types = vec![ExportedType {
            position: Position::default(),
            is_interface: false,
            methods: vec![method],
        }];
        let index = build_method_set_index(&types);
        let m = &index.method_sets[0].methods[0];
        assert_eq!(
            index.strings.resolve(m.pkg_path_idx.unwrap()),
            "example.com/a"
        );
        assert_eq!(index.strings.resolve(m.object_path_idx.unwrap()), "T.Foo");
    }
}
