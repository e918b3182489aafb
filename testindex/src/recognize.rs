// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recognition of `Example`/`Test`/`Benchmark`/`Fuzz` declarations (spec
//! §4.D).

use crate::ast::{FuncDecl, TestingKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeclKind {
    Example,
    Test,
    Benchmark,
    Fuzz,
}

/// A rune immediately following a recognized prefix must be either
/// absent (exact match) or not lowercase (spec §4.D: "followed by empty
/// or a non-lowercase rune").
fn valid_suffix(rest: &str) -> bool {
    match rest.chars().next() {
        None => true,
        Some(c) => !c.is_lowercase(),
    }
}

fn strip_prefix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix).filter(|rest| valid_suffix(rest))
}

/// Classifies a candidate declaration, or `None` if it matches none of
/// the four recognized shapes. The caller is expected to have already
/// filtered to exported, non-nil-package declarations (spec §4.D
/// "Candidate decl").
pub fn recognize(decl: &FuncDecl) -> Option<DeclKind> {
    if decl.num_params == 0
        && decl.num_results == 0
        && decl.testing_param.is_none()
        && strip_prefix(&decl.name, "Example").is_some()
    {
        return Some(DeclKind::Example);
    }
    if decl.num_params == 1 && decl.num_results == 0 {
        if decl.testing_param == Some(TestingKind::T) && strip_prefix(&decl.name, "Test").is_some() {
            return Some(DeclKind::Test);
        }
        if decl.testing_param == Some(TestingKind::B) && strip_prefix(&decl.name, "Benchmark").is_some() {
            return Some(DeclKind::Benchmark);
        }
        if decl.testing_param == Some(TestingKind::F) && strip_prefix(&decl.name, "Fuzz").is_some() {
            return Some(DeclKind::Fuzz);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use wscore::Position;

    fn decl(name: &str, num_params: usize, num_results: usize, kind: Option<TestingKind>) -> FuncDecl {
        FuncDecl {
            name: name.to_string(),
            exported: true,
            num_params,
            num_results,
            testing_param: kind,
            param_name: if num_params > 0 { "t".to_string() } else { String::new() },
            position: Position::default(),
            body: vec![],
        }
    }

    #[test]
    fn recognizes_example_bare_and_suffixed() {
        assert_eq!(recognize(&decl("Example", 0, 0, None)), Some(DeclKind::Example));
        assert_eq!(
            recognize(&decl("ExampleFoo", 0, 0, None)),
            Some(DeclKind::Example)
        );
        assert_eq!(recognize(&decl("Exampleish", 0, 0, None)), None);
    }

    #[test]
    fn recognizes_test_benchmark_fuzz() {
        assert_eq!(
            recognize(&decl("TestFoo", 1, 0, Some(TestingKind::T))),
            Some(DeclKind::Test)
        );
        assert_eq!(
            recognize(&decl("BenchmarkFoo", 1, 0, Some(TestingKind::B))),
            Some(DeclKind::Benchmark)
        );
        assert_eq!(
            recognize(&decl("FuzzFoo", 1, 0, Some(TestingKind::F))),
            Some(DeclKind::Fuzz)
        );
        // lowercase suffix rune disqualifies.
        assert_eq!(recognize(&decl("Testfoo", 1, 0, Some(TestingKind::T))), None);
        // wrong parameter kind disqualifies.
        assert_eq!(recognize(&decl("TestFoo", 1, 0, Some(TestingKind::B))), None);
    }
}
