// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-hoc inspection of whatever cycles survive cycle breakage (spec
//! §4.E names this as recoverable over-breakage: a published graph is
//! acyclic under `DepsByPkgPath`, but this type exists for callers that
//! want to double-check that invariant or inspect ITV-only cycles that
//! the breaker intentionally leaves in `DepsByImpPath`).
//!
//! Grounded on `guppy::graph::cycles::Cycles`, down to the choice of
//! `kosaraju_scc` for the same reason `guppy::petgraph_support::scc`
//! gives: iterative, for unbounded-depth graphs.

use std::collections::HashMap;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::NodeIndex;
use petgraph::Directed;

use crate::errors::Error;
use crate::graph::Graph;
use crate::ids::PackageId;

/// Computes and exposes the strongly connected components of a
/// [`Graph`]'s full `DepsByPkgPath` edge set.
pub struct Cycles<'g> {
    graph: &'g Graph,
    sccs: Vec<Vec<PackageId>>,
    membership: HashMap<PackageId, usize>,
}

impl<'g> Cycles<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        let mut pg = petgraph::Graph::<PackageId, (), Directed>::new();
        let mut node_of: HashMap<PackageId, NodeIndex> = HashMap::with_capacity(graph.packages().len());
        for id in graph.packages().keys() {
            node_of.insert(id.clone(), pg.add_node(id.clone()));
        }
        for (id, record) in graph.packages() {
            for dep in record.deps_by_pkg_path.values() {
                if let (Some(&from), Some(&to)) = (node_of.get(id), node_of.get(dep)) {
                    pg.add_edge(from, to, ());
                }
            }
        }

        let sccs: Vec<Vec<PackageId>> = kosaraju_scc(&pg)
            .into_iter()
            .map(|scc| scc.into_iter().map(|ix| pg[ix].clone()).collect())
            .collect();
        let mut membership = HashMap::new();
        for (idx, scc) in sccs.iter().enumerate() {
            if scc.len() > 1 {
                for id in scc {
                    membership.insert(id.clone(), idx);
                }
            }
        }

        Self {
            graph,
            sccs,
            membership,
        }
    }

    /// True if `a` and `b` belong to the same non-trivial cycle.
    pub fn is_cyclic(&self, a: &PackageId, b: &PackageId) -> Result<bool, Error> {
        self.graph.require(a)?;
        self.graph.require(b)?;
        if a == b {
            return Ok(true);
        }
        Ok(matches!((self.membership.get(a), self.membership.get(b)), (Some(x), Some(y)) if x == y))
    }

    /// All cycles of two or more elements. Order within and across
    /// cycles is arbitrary.
    pub fn all_cycles(&self) -> impl Iterator<Item = &[PackageId]> {
        self.sccs.iter().filter(|scc| scc.len() > 1).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Updates;
    use crate::ids::{PackageName, PackagePath};
    use crate::record::PackageRecord;
    use indexmap::IndexMap;

    fn record(id: &str, deps: &[&str]) -> PackageRecord {
        let mut deps_by_pkg_path = IndexMap::new();
        for dep in deps {
            deps_by_pkg_path.insert(PackagePath::new(*dep), PackageId::new(*dep));
        }
        PackageRecord {
            id: PackageId::new(id),
            pkg_path: PackagePath::new(id),
            name: PackageName::new(id),
            all_files: vec![],
            compiled_files: vec![],
            ignored_files: vec![],
            for_test: None,
            errors: vec![],
            deps_by_imp_path: vec![],
            deps_by_pkg_path,
            standalone: false,
        }
    }

    fn updates(records: Vec<PackageRecord>) -> Updates {
        records.into_iter().map(|r| (r.id.clone(), Some(r))).collect()
    }

    #[test]
    fn a_published_graph_has_no_surviving_cycles() {
        // a and b started in a cycle: the breaker (in graph::update)
        // already removed b's edge back to a by this point.
        let g = Graph::empty().update(updates(vec![record("a", &["b"]), record("b", &["c"])]));
        let g = g.update(updates(vec![record("b", &["c", "a"])]));
        let cycles = Cycles::new(&g);
        assert_eq!(cycles.all_cycles().count(), 0);
        assert!(!cycles
            .is_cyclic(&PackageId::new("a"), &PackageId::new("b"))
            .unwrap());
    }
}
