// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Top-level test-function index construction (spec §4.D).

use std::collections::{HashMap, HashSet};

use wscore::Position;

use crate::ast::{FuncDecl, ParsedFile};
use crate::naming::NameRegistry;
use crate::recognize::{recognize, DeclKind};
use crate::subtests::extract_subtests;

/// One recognized test, benchmark, fuzz target, example, or subtest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestEntry {
    pub location: Position,
    pub name: String,
}

/// The recognized entries belonging to a single `_test.go` file.
#[derive(Clone, Debug, Default)]
pub struct FileTests {
    pub uri: String,
    pub tests: Vec<TestEntry>,
}

/// A package's full test-function index: one [`FileTests`] per
/// `_test.go` file that contributed at least one recognized
/// declaration.
#[derive(Clone, Debug, Default)]
pub struct TestIndex {
    pub files: Vec<FileTests>,
}

impl TestIndex {
    /// Total number of recognized entries across all files, including
    /// subtests.
    pub fn len(&self) -> usize {
        self.files.iter().map(|f| f.tests.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds a [`TestIndex`] over every `_test.go` file in `files`.
///
/// Named helper functions referenced from `t.Run(LIT, helper)` are
/// resolved against the full package-wide function table, not just the
/// declaring file's, since Go allows a test in one file to call a
/// helper declared in another file of the same package.
pub fn build_test_index(files: &[ParsedFile]) -> TestIndex {
    let mut functions: HashMap<String, FuncDecl> = HashMap::new();
    for file in files {
        for decl in &file.decls {
            functions.insert(decl.name.clone(), decl.clone());
        }
    }

    let top_level_test_names: HashSet<String> = files
        .iter()
        .flat_map(|f| f.decls.iter())
        .filter(|d| recognize(d) == Some(DeclKind::Test))
        .map(|d| d.name.clone())
        .collect();

    let mut out_files = Vec::new();
    for file in files {
        let mut tests = Vec::new();
        for decl in &file.decls {
            let Some(kind) = recognize(decl) else {
                continue;
            };
            tests.push(TestEntry {
                location: decl.position,
                name: decl.name.clone(),
            });
            if kind == DeclKind::Test {
                let mut registry = NameRegistry::new();
                let mut visited = HashSet::new();
                extract_subtests(
                    &decl.body,
                    &decl.body,
                    &decl.param_name,
                    &decl.name,
                    &functions,
                    &top_level_test_names,
                    &mut registry,
                    &mut visited,
                    &mut tests,
                );
            }
        }
        if !tests.is_empty() {
            out_files.push(FileTests {
                uri: file.uri.clone(),
                tests,
            });
        }
    }
    TestIndex { files: out_files }
}
