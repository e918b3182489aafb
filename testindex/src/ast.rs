// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A deliberately tiny, Go-shaped AST covering exactly the syntactic
//! patterns spec §4.D's recognition and subtest-extraction rules look
//! at: calls, range-for loops, assignments, and composite literals. This
//! is not a general AST -- the real parser boundary (§6) is out of
//! scope, and the syntactic parser producing full syntax trees is an
//! external collaborator this crate never constructs.

use wscore::Position;

/// The `*testing.{T,B,F}` parameter kind a declaration's sole parameter
/// was resolved to by the type-info table (spec §4.D input).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TestingKind {
    T,
    B,
    F,
}

/// A top-level function declaration in a `_test.go` file.
#[derive(Clone, Debug)]
pub struct FuncDecl {
    pub name: String,
    pub exported: bool,
    pub num_params: usize,
    pub num_results: usize,
    /// `Some` iff the sole parameter's type resolved to
    /// `*testing.{T,B,F}`.
    pub testing_param: Option<TestingKind>,
    /// Local name of the sole parameter (e.g. `"t"`), empty if there is
    /// none.
    pub param_name: String,
    pub position: Position,
    pub body: Vec<Stmt>,
}

/// One source file's top-level test-related declarations.
#[derive(Clone, Debug)]
pub struct ParsedFile {
    pub uri: String,
    pub decls: Vec<FuncDecl>,
}

#[derive(Clone, Debug)]
pub enum Stmt {
    Expr(Expr),
    /// `name := value` or `var name = value`.
    Assign { name: String, value: Expr },
    /// `for _, value_var := range range_expr { body }`.
    RangeFor {
        value_var: String,
        range_expr: Expr,
        body: Vec<Stmt>,
    },
    /// Any other statement that still carries nested statement lists
    /// worth walking into (`if`/`switch`/blocks/...).
    Nested(Vec<Stmt>),
}

#[derive(Clone, Debug)]
pub enum Expr {
    Ident(String),
    StringLit(String),
    /// `recv.field` -- used for the table-driven `v.F` selector.
    Field { recv: String, field: String },
    /// `recv.method(args...)`.
    MethodCall {
        recv: String,
        method: String,
        args: Vec<Expr>,
        position: Position,
    },
    /// `func(t *testing.T) { ... }`.
    FuncLit { body: Vec<Stmt> },
    /// A reference to a named function declared elsewhere in the
    /// package.
    FuncRef(String),
    /// `Type{Field: value, ...}`, the table's per-entry struct literal.
    CompositeLit {
        fields: Vec<(String, Expr)>,
        position: Position,
    },
    /// `[]T{ {...}, {...} }`, the table itself.
    CompositeSlice { elements: Vec<Expr> },
    Other,
}
