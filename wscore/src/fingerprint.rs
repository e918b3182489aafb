// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical S-expression encoding of function signatures.
//!
//! `fingerprint(x) == fingerprint(y)` implies the types are identical,
//! except when the returned `tricky` flag is set -- one of the types
//! involves a type parameter or a non-empty interface literal, both of
//! which are encoded lossily. The encoder is deterministic; tokenization
//! follows the classical Lisp lexer (identifiers, integers,
//! double-quoted strings).
//!
//! `TypeDesc` is the tagged-sum input representation a caller (the
//! type-checker boundary, §6) builds the fingerprint from. It mirrors the
//! "Polymorphism over types" design note: one tag per shape of the Go
//! type algebra, dispatched on by `to_sexpr`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A basic (built-in) type. `Uint8`/`Int32` are kept distinct from the
/// `Byte`/`Rune` aliases they have no separate existence for in this
/// model -- they normalize to the same identifier at encode time, which
/// is the whole point of scenario 4 in the design's testable properties.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum BasicKind {
    Bool,
    String,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    UnsafePointer,
    /// Untyped constants. Must never reach the encoder: passing one is a
    /// bug, not a recoverable error (spec §4.B).
    UntypedBool,
    UntypedInt,
    UntypedRune,
    UntypedFloat,
    UntypedComplex,
    UntypedString,
    UntypedNil,
}

impl BasicKind {
    fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedBool
                | BasicKind::UntypedInt
                | BasicKind::UntypedRune
                | BasicKind::UntypedFloat
                | BasicKind::UntypedComplex
                | BasicKind::UntypedString
                | BasicKind::UntypedNil
        )
    }

    /// The identifier the encoder emits for this kind. Panics on untyped
    /// kinds -- see the doc comment on `UntypedBool` and friends.
    fn ident(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::String => "string",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            // Normalized name, not the numeric alias.
            BasicKind::Int32 => "rune",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            // Normalized name, not the numeric alias.
            BasicKind::Uint8 => "byte",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::UnsafePointer => "Pointer",
            _ => fingerprint_untyped_basic_bug(),
        }
    }
}

/// Called when the encoder is handed an untyped basic kind. This is
/// always a caller bug (spec §4.B: "Untyped basic types must never be
/// passed to the encoder: this is a bug, not an error"), so it panics
/// rather than returning a `Result`.
#[track_caller]
pub fn fingerprint_untyped_basic_bug() -> ! {
    panic!("untyped basic type passed to fingerprint encoder -- this is a caller bug")
}

/// Channel direction, as encoded in a `(chan INT τ)` node.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChanDir {
    Both = 0,
    Send = 1,
    Recv = 2,
}

/// One field of a struct type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldDesc {
    pub name: String,
    pub embedded: bool,
    pub tag: String,
    pub ty: Box<TypeDesc>,
}

/// Tagged-sum input representation of a Go-like type, the shape the
/// type-checker boundary (§6) is expected to produce. This is the
/// "Polymorphism over types" design note made concrete: one variant per
/// Go type-algebra shape, dispatched on by `to_sexpr`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TypeDesc {
    Basic(BasicKind),
    /// The predeclared `any` / empty interface. Distinct from
    /// `Interface`, which models a *non-empty* interface literal.
    EmptyInterface,
    /// A named type with a package path, e.g. `(qual "example.com/a" T)`.
    Named { pkg_path: String, name: String },
    Array { len: u64, elem: Box<TypeDesc> },
    Slice(Box<TypeDesc>),
    Pointer(Box<TypeDesc>),
    Chan { dir: ChanDir, elem: Box<TypeDesc> },
    Map { key: Box<TypeDesc>, value: Box<TypeDesc> },
    Signature {
        params: Vec<TypeDesc>,
        variadic: bool,
        results: Vec<TypeDesc>,
    },
    Tuple(Vec<TypeDesc>),
    Struct(Vec<FieldDesc>),
    /// A non-empty interface literal. Encoding is lossy (method set is
    /// not recorded) and therefore always tricky.
    Interface,
    /// A type parameter, referenced by its index among the enclosing
    /// declaration's type parameters. Always tricky.
    TypeParam(u32),
    /// Instantiation of a generic named type with concrete arguments.
    Instance { base: Box<TypeDesc>, args: Vec<TypeDesc> },
}

/// A generic S-expression: the lexical shape fingerprints are encoded
/// into and parsed back out of. Deliberately untyped with respect to the
/// fingerprint grammar -- the grammar lives in how `to_sexpr`/`unify`
/// interpret the leading `Ident` of a `List`.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Sexpr {
    Ident(String),
    Int(i64),
    Str(String),
    List(Vec<Sexpr>),
}

impl Sexpr {
    fn ident(s: impl Into<String>) -> Sexpr {
        Sexpr::Ident(s.into())
    }

    fn tagged(tag: &'static str, rest: impl IntoIterator<Item = Sexpr>) -> Sexpr {
        let mut items = vec![Sexpr::ident(tag)];
        items.extend(rest);
        Sexpr::List(items)
    }

    fn is_tagged(&self, tag: &str) -> bool {
        matches!(self, Sexpr::List(items) if matches!(items.first(), Some(Sexpr::Ident(s)) if s == tag))
    }
}

impl fmt::Display for Sexpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sexpr::Ident(s) => write!(f, "{s}"),
            Sexpr::Int(n) => write!(f, "{n}"),
            Sexpr::Str(s) => write!(f, "\"{}\"", escape_str(s)),
            Sexpr::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
        }
    }
}

fn escape_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

/// Converts a type description into its canonical `Sexpr` tree.
pub fn to_sexpr(ty: &TypeDesc) -> Sexpr {
    match ty {
        TypeDesc::Basic(kind) => {
            if kind.is_untyped() {
                fingerprint_untyped_basic_bug();
            }
            if matches!(kind, BasicKind::UnsafePointer) {
                Sexpr::tagged("qual", [Sexpr::Str("unsafe".into()), Sexpr::ident("Pointer")])
            } else {
                Sexpr::ident(kind.ident())
            }
        }
        TypeDesc::EmptyInterface => Sexpr::ident("any"),
        TypeDesc::Named { pkg_path, name } => {
            Sexpr::tagged("qual", [Sexpr::Str(pkg_path.clone()), Sexpr::ident(name.clone())])
        }
        TypeDesc::Array { len, elem } => {
            Sexpr::tagged("array", [Sexpr::Int(*len as i64), to_sexpr(elem)])
        }
        TypeDesc::Slice(elem) => Sexpr::tagged("slice", [to_sexpr(elem)]),
        TypeDesc::Pointer(elem) => Sexpr::tagged("ptr", [to_sexpr(elem)]),
        TypeDesc::Chan { dir, elem } => {
            Sexpr::tagged("chan", [Sexpr::Int(*dir as i64), to_sexpr(elem)])
        }
        TypeDesc::Map { key, value } => Sexpr::tagged("map", [to_sexpr(key), to_sexpr(value)]),
        TypeDesc::Signature {
            params,
            variadic,
            results,
        } => {
            let params_tuple = Sexpr::tagged("tuple", params.iter().map(to_sexpr));
            let results_tuple = Sexpr::tagged("tuple", results.iter().map(to_sexpr));
            if *variadic {
                Sexpr::tagged("func", [params_tuple, Sexpr::ident("v"), results_tuple])
            } else {
                Sexpr::tagged("func", [params_tuple, results_tuple])
            }
        }
        TypeDesc::Tuple(elems) => Sexpr::tagged("tuple", elems.iter().map(to_sexpr)),
        TypeDesc::Struct(fields) => Sexpr::tagged("struct", fields.iter().map(field_to_sexpr)),
        TypeDesc::Interface => Sexpr::tagged("interface", []),
        TypeDesc::TypeParam(idx) => Sexpr::tagged("typeparam", [Sexpr::Int(*idx as i64)]),
        TypeDesc::Instance { base, args } => {
            let mut rest = vec![to_sexpr(base)];
            rest.extend(args.iter().map(to_sexpr));
            Sexpr::tagged("inst", rest)
        }
    }
}

fn field_to_sexpr(field: &FieldDesc) -> Sexpr {
    Sexpr::List(vec![
        Sexpr::ident(field.name.clone()),
        Sexpr::ident(if field.embedded { "yes" } else { "no" }),
        Sexpr::Str(field.tag.clone()),
        to_sexpr(&field.ty),
    ])
}

/// Returns true if `e`, or any node reachable from it, is a `(typeparam
/// N)` or `(interface)` node -- the two lossy encodings that force the
/// `tricky` flag (spec §4.B).
fn contains_tricky_node(e: &Sexpr) -> bool {
    if e.is_tagged("typeparam") || e.is_tagged("interface") {
        return true;
    }
    match e {
        Sexpr::List(items) => items.iter().any(contains_tricky_node),
        _ => false,
    }
}

/// A fingerprint: the canonical encoded text plus whether it is tricky.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Fingerprint {
    pub text: String,
    pub tricky: bool,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl Fingerprint {
    /// Encodes a type description into its fingerprint.
    pub fn of(ty: &TypeDesc) -> Self {
        let sexpr = to_sexpr(ty);
        Fingerprint {
            tricky: contains_tricky_node(&sexpr),
            text: sexpr.to_string(),
        }
    }

    /// Parses this fingerprint's text back into an `Sexpr` tree.
    pub fn parse(&self) -> Result<Sexpr, ParseError> {
        parse(&self.text)
    }
}

/// An error while lexing or parsing a fingerprint string.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    UnexpectedEof,
    UnexpectedChar(char),
    UnexpectedToken(String),
    UnterminatedString,
    TrailingInput,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedEof => write!(f, "unexpected end of fingerprint"),
            ParseError::UnexpectedChar(c) => write!(f, "unexpected character '{c}'"),
            ParseError::UnexpectedToken(t) => write!(f, "unexpected token '{t}'"),
            ParseError::UnterminatedString => write!(f, "unterminated string literal"),
            ParseError::TrailingInput => write!(f, "trailing input after fingerprint"),
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug, Eq, PartialEq)]
enum Token {
    LParen,
    RParen,
    Ident(String),
    Int(i64),
    Str(String),
}

fn lex(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(_, c)) = chars.peek() {
        match c {
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        None => return Err(ParseError::UnterminatedString),
                        Some((_, '"')) => break,
                        Some((_, '\\')) => match chars.next() {
                            Some((_, '"')) => s.push('"'),
                            Some((_, '\\')) => s.push('\\'),
                            Some((_, other)) => s.push(other),
                            None => return Err(ParseError::UnterminatedString),
                        },
                        Some((_, other)) => s.push(other),
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c == '-' || c.is_ascii_digit() => {
                let mut s = String::new();
                s.push(c);
                chars.next();
                while let Some(&(_, c2)) = chars.peek() {
                    if c2.is_ascii_digit() {
                        s.push(c2);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match s.parse::<i64>() {
                    Ok(n) => tokens.push(Token::Int(n)),
                    Err(_) => tokens.push(Token::Ident(s)),
                }
            }
            _ => {
                let mut s = String::new();
                while let Some(&(_, c2)) = chars.peek() {
                    if c2.is_whitespace() || c2 == '(' || c2 == ')' {
                        break;
                    }
                    s.push(c2);
                    chars.next();
                }
                if s.is_empty() {
                    return Err(ParseError::UnexpectedChar(c));
                }
                tokens.push(Token::Ident(s));
            }
        }
    }
    Ok(tokens)
}

/// Parses a fingerprint string into its `Sexpr` tree.
pub fn parse(input: &str) -> Result<Sexpr, ParseError> {
    let tokens = lex(input)?;
    let mut pos = 0;
    let sexpr = parse_one(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(ParseError::TrailingInput);
    }
    Ok(sexpr)
}

fn parse_one(tokens: &[Token], pos: &mut usize) -> Result<Sexpr, ParseError> {
    match tokens.get(*pos) {
        None => Err(ParseError::UnexpectedEof),
        Some(Token::LParen) => {
            *pos += 1;
            let mut items = Vec::new();
            loop {
                match tokens.get(*pos) {
                    None => return Err(ParseError::UnexpectedEof),
                    Some(Token::RParen) => {
                        *pos += 1;
                        break;
                    }
                    _ => items.push(parse_one(tokens, pos)?),
                }
            }
            Ok(Sexpr::List(items))
        }
        Some(Token::RParen) => Err(ParseError::UnexpectedToken(")".into())),
        Some(Token::Ident(s)) => {
            let s = s.clone();
            *pos += 1;
            Ok(Sexpr::Ident(s))
        }
        Some(Token::Int(n)) => {
            let n = *n;
            *pos += 1;
            Ok(Sexpr::Int(n))
        }
        Some(Token::Str(s)) => {
            let s = s.clone();
            *pos += 1;
            Ok(Sexpr::Str(s))
        }
    }
}

/// Returns true if `e` is a `(typeparam N)` node.
fn is_typeparam(e: &Sexpr) -> bool {
    e.is_tagged("typeparam")
}

/// Structural unification with a single rule: a `(typeparam N)` node
/// matches anything. This is *not* true unification -- there is no
/// substitution table, so it is symmetric but not transitive (spec
/// §4.B).
pub fn unify(x: &Sexpr, y: &Sexpr) -> bool {
    if is_typeparam(x) || is_typeparam(y) {
        return true;
    }
    match (x, y) {
        (Sexpr::Ident(a), Sexpr::Ident(b)) => a == b,
        (Sexpr::Int(a), Sexpr::Int(b)) => a == b,
        (Sexpr::Str(a), Sexpr::Str(b)) => a == b,
        (Sexpr::List(a), Sexpr::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(ai, bi)| unify(ai, bi))
        }
        _ => false,
    }
}

/// Memoizes parsed fingerprint trees, keyed by the fingerprint text.
/// Grounded on `guppy`'s `OnceCell`-per-derived-value idiom
/// (`PackageGraph::sccs: OnceCell<Sccs<_>>`), generalized from a
/// singleton cell to a keyed cache since the key space here is one entry
/// per method rather than one per graph.
#[derive(Default)]
pub struct FingerprintCache {
    parsed: RefCell<HashMap<Box<str>, Rc<Sexpr>>>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the memoized parse of `text`, parsing and caching it on
    /// first access. A malformed fingerprint indicates a bug upstream
    /// (fingerprints are always produced by `Fingerprint::of`), so this
    /// returns `None` rather than propagating a `ParseError` that no
    /// caller could meaningfully act on.
    pub fn parse(&self, text: &str) -> Option<Rc<Sexpr>> {
        if let Some(cached) = self.parsed.borrow().get(text) {
            return Some(Rc::clone(cached));
        }
        let parsed = Rc::new(parse(text).ok()?);
        self.parsed
            .borrow_mut()
            .insert(text.into(), Rc::clone(&parsed));
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(kind: BasicKind) -> TypeDesc {
        TypeDesc::Basic(kind)
    }

    fn sig(params: Vec<TypeDesc>, variadic: bool, results: Vec<TypeDesc>) -> TypeDesc {
        TypeDesc::Signature {
            params,
            variadic,
            results,
        }
    }

    #[test]
    fn byte_rune_aliases_are_equivalent() {
        // func(byte) rune
        let a = sig(vec![basic(BasicKind::Uint8)], false, vec![basic(BasicKind::Int32)]);
        // func(uint8) int32 -- same BasicKind values, so same fingerprint.
        let b = sig(vec![basic(BasicKind::Uint8)], false, vec![basic(BasicKind::Int32)]);
        let fa = Fingerprint::of(&a);
        let fb = Fingerprint::of(&b);
        assert_eq!(fa.text, fb.text);
        assert!(!fa.tricky);
        assert!(unify(&fa.parse().unwrap(), &fb.parse().unwrap()));

        // func(int8) uint32 differs.
        let c = sig(vec![basic(BasicKind::Int8)], false, vec![basic(BasicKind::Uint32)]);
        let fc = Fingerprint::of(&c);
        assert_ne!(fa.text, fc.text);
        assert!(!unify(&fa.parse().unwrap(), &fc.parse().unwrap()));
    }

    #[test]
    fn unsafe_pointer_is_qualified() {
        let fp = Fingerprint::of(&basic(BasicKind::UnsafePointer));
        assert_eq!(fp.text, "(qual \"unsafe\" Pointer)");
    }

    #[test]
    #[should_panic]
    fn untyped_basic_panics() {
        let _ = Fingerprint::of(&basic(BasicKind::UntypedInt));
    }

    #[test]
    fn type_param_unification() {
        // func[T any](int, T, ...string) T
        let t_param = TypeDesc::TypeParam(0);
        let f1 = sig(
            vec![basic(BasicKind::Int), t_param.clone()],
            true,
            vec![t_param.clone()],
        );
        // func[U any](int, int, ...U) bool
        let f2 = sig(
            vec![basic(BasicKind::Int), basic(BasicKind::Int)],
            true,
            vec![basic(BasicKind::Bool)],
        );
        let fp1 = Fingerprint::of(&f1);
        let fp2 = Fingerprint::of(&f2);
        assert!(fp1.tricky);
        assert!(fp2.tricky);
        assert!(unify(&fp1.parse().unwrap(), &fp2.parse().unwrap()));

        // func(int, bool, ...string) rune -- no type params, also unifies.
        let f3 = sig(
            vec![basic(BasicKind::Int), basic(BasicKind::Bool)],
            true,
            vec![basic(BasicKind::Int32)],
        );
        let fp3 = Fingerprint::of(&f3);
        assert!(!fp3.tricky);
        assert!(unify(&fp1.parse().unwrap(), &fp3.parse().unwrap()));

        // func(int, bool, ...string) -- no result -- does not unify.
        let f4 = sig(vec![basic(BasicKind::Int), basic(BasicKind::Bool)], true, vec![]);
        let fp4 = Fingerprint::of(&f4);
        assert!(!unify(&fp1.parse().unwrap(), &fp4.parse().unwrap()));
    }

    #[test]
    fn round_trip_matches_encoded_text() {
        let ty = TypeDesc::Struct(vec![FieldDesc {
            name: "Field".into(),
            embedded: false,
            tag: "json:\"field\"".into(),
            ty: Box::new(basic(BasicKind::String)),
        }]);
        let fp = Fingerprint::of(&ty);
        let parsed = fp.parse().unwrap();
        assert_eq!(parsed.to_string(), fp.text);
    }

    #[test]
    fn unify_is_reflexive() {
        let ty = TypeDesc::Map {
            key: Box::new(basic(BasicKind::String)),
            value: Box::new(TypeDesc::Slice(Box::new(basic(BasicKind::Int)))),
        };
        let fp = Fingerprint::of(&ty);
        let parsed = fp.parse().unwrap();
        assert!(unify(&parsed, &parsed));
    }

    #[test]
    fn fingerprint_cache_memoizes() {
        let cache = FingerprintCache::new();
        let fp = Fingerprint::of(&basic(BasicKind::Bool));
        let a = cache.parse(&fp.text).unwrap();
        let b = cache.parse(&fp.text).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }
}
