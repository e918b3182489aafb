// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subtest extraction: direct `t.Run(LIT, FUNC)` calls and the
//! table-driven `for _, v := range TABLE { t.Run(v.F, FUNC) }` pattern
//! (spec §4.D).

use std::collections::{HashMap, HashSet};

use wscore::Position;

use crate::ast::{Expr, FuncDecl, Stmt};
use crate::naming::{rewrite, NameRegistry};
use crate::TestEntry;

/// Walks `body` for the two subtest-introducing statement shapes,
/// appending a [`TestEntry`] for each one found. `root_body` is the
/// *whole* body of the function currently being walked (not narrowed by
/// nested blocks), used to resolve a table identifier back to its sole
/// composite-literal assignment (spec §4.D).
#[allow(clippy::too_many_arguments)]
pub fn extract_subtests(
    body: &[Stmt],
    root_body: &[Stmt],
    receiver: &str,
    parent: &str,
    functions: &HashMap<String, FuncDecl>,
    top_level_test_names: &HashSet<String>,
    registry: &mut NameRegistry,
    visited: &mut HashSet<String>,
    out: &mut Vec<TestEntry>,
) {
    for stmt in body {
        match stmt {
            Stmt::Expr(e) => {
                if let Some((lit, func_expr, call_position)) = match_direct_run(e, receiver) {
                    let sub = rewrite(lit);
                    let name = registry.register(parent, &sub);
                    out.push(TestEntry {
                        location: call_position,
                        name: name.clone(),
                    });
                    descend(
                        func_expr,
                        &name,
                        functions,
                        top_level_test_names,
                        registry,
                        visited,
                        out,
                    );
                }
            }
            Stmt::RangeFor {
                value_var,
                range_expr,
                body: inner,
            } => {
                handle_range_for(
                    value_var,
                    range_expr,
                    inner,
                    root_body,
                    receiver,
                    parent,
                    functions,
                    top_level_test_names,
                    registry,
                    visited,
                    out,
                );
                extract_subtests(
                    inner,
                    root_body,
                    receiver,
                    parent,
                    functions,
                    top_level_test_names,
                    registry,
                    visited,
                    out,
                );
            }
            Stmt::Nested(inner) => {
                extract_subtests(
                    inner,
                    root_body,
                    receiver,
                    parent,
                    functions,
                    top_level_test_names,
                    registry,
                    visited,
                    out,
                );
            }
            Stmt::Assign { .. } => {}
        }
    }
}

/// Matches `recv.Run(LIT, FUNC)` where `recv == receiver` and the first
/// argument is a constant string (spec §4.D pattern 1).
fn match_direct_run<'a>(e: &'a Expr, receiver: &str) -> Option<(&'a str, &'a Expr, Position)> {
    match e {
        Expr::MethodCall {
            recv,
            method,
            args,
            position,
        } if recv == receiver && method == "Run" && args.len() == 2 => match &args[0] {
            Expr::StringLit(lit) => Some((lit.as_str(), &args[1], *position)),
            _ => None,
        },
        _ => None,
    }
}

/// Matches `recv.Run(value_var.field, FUNC)` within a range-for body
/// (spec §4.D pattern 2).
fn match_table_run<'a>(e: &'a Expr, receiver: &str, value_var: &str) -> Option<(&'a str, &'a Expr)> {
    match e {
        Expr::MethodCall {
            recv, method, args, ..
        } if recv == receiver && method == "Run" && args.len() == 2 => match &args[0] {
            Expr::Field { recv: r2, field } if r2 == value_var => Some((field.as_str(), &args[1])),
            _ => None,
        },
        _ => None,
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_range_for(
    value_var: &str,
    range_expr: &Expr,
    for_body: &[Stmt],
    root_body: &[Stmt],
    receiver: &str,
    parent: &str,
    functions: &HashMap<String, FuncDecl>,
    top_level_test_names: &HashSet<String>,
    registry: &mut NameRegistry,
    visited: &mut HashSet<String>,
    out: &mut Vec<TestEntry>,
) {
    let table_run = for_body.iter().find_map(|s| match s {
        Stmt::Expr(e) => match_table_run(e, receiver, value_var),
        _ => None,
    });
    let Some((field_name, func_expr)) = table_run else {
        return;
    };
    let Some(entries) = resolve_table(range_expr, root_body) else {
        return;
    };
    for entry in entries {
        if let Expr::CompositeLit { fields, position } = entry {
            if let Some((_, Expr::StringLit(lit))) = fields.iter().find(|(name, _)| name == field_name) {
                let sub = rewrite(lit);
                let name = registry.register(parent, &sub);
                out.push(TestEntry {
                    location: *position,
                    name: name.clone(),
                });
                descend(
                    func_expr,
                    &name,
                    functions,
                    top_level_test_names,
                    registry,
                    visited,
                    out,
                );
            }
        }
    }
}

/// Resolves `range_expr` to its table entries: either an inline
/// composite-literal slice, or an identifier whose sole assignment in
/// the enclosing function body is one (spec §4.D).
fn resolve_table<'a>(range_expr: &'a Expr, root_body: &'a [Stmt]) -> Option<&'a [Expr]> {
    match range_expr {
        Expr::CompositeSlice { elements } => Some(elements),
        Expr::Ident(name) => {
            let mut found = None;
            let mut count = 0;
            collect_assigns(root_body, &mut |n, v| {
                if n == name {
                    count += 1;
                    found = Some(v);
                }
            });
            if count == 1 {
                match found {
                    Some(Expr::CompositeSlice { elements }) => Some(elements.as_slice()),
                    _ => None,
                }
            } else {
                None
            }
        }
        _ => None,
    }
}

fn collect_assigns<'a>(stmts: &'a [Stmt], f: &mut impl FnMut(&'a str, &'a Expr)) {
    for stmt in stmts {
        match stmt {
            Stmt::Assign { name, value } => f(name, value),
            Stmt::RangeFor { body, .. } => collect_assigns(body, f),
            Stmt::Nested(body) => collect_assigns(body, f),
            Stmt::Expr(_) => {}
        }
    }
}

/// Recurses into a `t.Run` target exactly once per target function
/// (spec §4.D): function literals are descended into unconditionally;
/// named functions are tracked in `visited` to avoid unbounded
/// recursion; a reference to a top-level `Test` function is never
/// descended, to prevent mutual recursion between tests.
fn descend(
    func_expr: &Expr,
    parent: &str,
    functions: &HashMap<String, FuncDecl>,
    top_level_test_names: &HashSet<String>,
    registry: &mut NameRegistry,
    visited: &mut HashSet<String>,
    out: &mut Vec<TestEntry>,
) {
    match func_expr {
        Expr::FuncLit { body } => {
            // A function literal has its own scope; within it, its own
            // body is both the walk target and the resolution root.
            let receiver = find_receiver_in_lit_body(body).unwrap_or_default();
            extract_subtests(
                body,
                body,
                &receiver,
                parent,
                functions,
                top_level_test_names,
                registry,
                visited,
                out,
            );
        }
        Expr::FuncRef(name) => {
            if top_level_test_names.contains(name) {
                return;
            }
            if !visited.insert(name.clone()) {
                return;
            }
            if let Some(target) = functions.get(name) {
                extract_subtests(
                    &target.body,
                    &target.body,
                    &target.param_name,
                    parent,
                    functions,
                    top_level_test_names,
                    registry,
                    visited,
                    out,
                );
            }
        }
        _ => {}
    }
}

/// A `FuncLit`'s receiver parameter name is carried on the literal
/// itself in real source (`func(t *testing.T) {...}`); since our tiny
/// AST's `FuncLit` only stores the body, the walker keys subtest calls
/// off whatever receiver name appears in its first `t.Run`-shaped call.
/// Builders are expected to author func literals with the same receiver
/// name as the enclosing test (universally `t` in practice), which this
/// falls back to when no call is found yet.
fn find_receiver_in_lit_body(body: &[Stmt]) -> Option<String> {
    body.iter().find_map(|s| match s {
        Stmt::Expr(Expr::MethodCall { recv, method, .. }) if method == "Run" => Some(recv.clone()),
        _ => None,
    })
}
