// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The immutable, transitively closed package-metadata graph and its
//! cycle-tolerant update algebra (spec §3, §4.E).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use petgraph::algo::kosaraju_scc;
use petgraph::graph::NodeIndex;
use petgraph::Directed;
use tracing::debug;

use crate::errors::Error;
use crate::ids::PackageId;
use crate::record::{LoadError, PackageRecord};

/// An update batch for [`Graph::update`]: `None` means deletion.
pub type Updates = IndexMap<PackageId, Option<PackageRecord>>;

#[derive(Clone, Copy, Eq, PartialEq)]
enum PostOrderMark {
    Visiting,
    Done,
}

/// Immutable, transitively closed graph of package records (spec §3).
///
/// Cloning a `Graph` is cheap: the three maps are held behind `Arc`, so
/// `update` produces a genuinely new value without disturbing anything
/// observing the receiver (spec §5 "copy-on-update").
#[derive(Clone, Debug)]
pub struct Graph {
    packages: Arc<IndexMap<PackageId, PackageRecord>>,
    imported_by: Arc<IndexMap<PackageId, Vec<PackageId>>>,
    ids: Arc<IndexMap<String, Vec<PackageId>>>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::empty()
    }
}

impl Graph {
    /// An empty graph, the starting point of a View's snapshot
    /// sequence.
    pub fn empty() -> Self {
        Self {
            packages: Arc::new(IndexMap::new()),
            imported_by: Arc::new(IndexMap::new()),
            ids: Arc::new(IndexMap::new()),
        }
    }

    pub fn packages(&self) -> &IndexMap<PackageId, PackageRecord> {
        &self.packages
    }

    pub fn get(&self, id: &PackageId) -> Option<&PackageRecord> {
        self.packages.get(id)
    }

    pub fn imported_by(&self, id: &PackageId) -> &[PackageId] {
        self.imported_by.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The derived `IDs` map: URI to the package IDs that claim it,
    /// command-line-arguments IDs demoted and truncated away whenever a
    /// real ID is present (spec §3, §4.E step 5).
    pub fn ids_for_uri(&self, uri: &str) -> &[PackageId] {
        self.ids.get(uri).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Constructs a successor graph without mutating the receiver (spec
    /// §4.E). An empty `updates` returns the receiver unchanged (step
    /// 1), identical by `Arc` pointer to avoid needless rebuilding.
    pub fn update(&self, updates: Updates) -> Self {
        if updates.is_empty() {
            return self.clone();
        }

        let mut packages = (*self.packages).clone();
        let mut touched: HashSet<PackageId> = HashSet::new();
        for (id, record) in updates {
            touched.insert(id.clone());
            match record {
                Some(record) => {
                    packages.insert(id, record);
                }
                None => {
                    packages.shift_remove(&id);
                }
            }
        }

        break_cycles(&mut packages, &touched);

        let imported_by = derive_imported_by(&packages);
        let ids = derive_ids(&packages);

        Self {
            packages: Arc::new(packages),
            imported_by: Arc::new(imported_by),
            ids: Arc::new(ids),
        }
    }

    /// Reverse reflexive transitive closure: `seeds` plus every package
    /// that transitively imports any seed (spec §4.E).
    pub fn rrtc(&self, seeds: &[PackageId]) -> IndexSet<PackageId> {
        let mut result: IndexSet<PackageId> = seeds.iter().cloned().collect();
        let mut stack: Vec<PackageId> = seeds.to_vec();
        while let Some(id) = stack.pop() {
            for importer in self.imported_by(&id) {
                if result.insert(importer.clone()) {
                    stack.push(importer.clone());
                }
            }
        }
        result
    }

    /// Orders `ids` so that dependencies precede dependents, by DFS on
    /// `DepsByPkgPath` tolerating self- and back-edges (spec §4.E).
    pub fn sort_post_order(&self, ids: &[PackageId]) -> Vec<PackageId> {
        let mut marks: HashMap<PackageId, PostOrderMark> = HashMap::new();
        let mut order = Vec::new();
        for id in ids {
            self.visit_post_order(id, &mut marks, &mut order);
        }
        order
    }

    fn visit_post_order(
        &self,
        id: &PackageId,
        marks: &mut HashMap<PackageId, PostOrderMark>,
        order: &mut Vec<PackageId>,
    ) {
        // A back-edge (node already being visited) or a node already
        // emitted both break recursion here, tolerating cycles and
        // diamonds without the caller having to pre-clean the graph.
        if marks.contains_key(id) {
            return;
        }
        marks.insert(id.clone(), PostOrderMark::Visiting);
        if let Some(record) = self.packages.get(id) {
            for dep in record.deps_by_pkg_path.values() {
                if dep != id {
                    self.visit_post_order(dep, marks, order);
                }
            }
        }
        marks.insert(id.clone(), PostOrderMark::Done);
        order.push(id.clone());
    }

    /// Returns an error if `id` is absent from this graph.
    pub fn require(&self, id: &PackageId) -> Result<&PackageRecord, Error> {
        self.get(id).ok_or_else(|| Error::UnknownPackageId(id.clone()))
    }
}

/// Break cycles introduced by `touched` nodes (spec §4.E "Cycle
/// breakage"). Seeds the DFS only from updated nodes: sufficient
/// because pre-existing subgraphs are acyclic by induction, so any new
/// cycle must pass through a touched node's forward-reachable set.
/// Grounded on `guppy::petgraph_support::scc::Sccs`, which likewise uses
/// `kosaraju_scc` because it is iterative and package graphs have
/// unbounded depth.
fn break_cycles(packages: &mut IndexMap<PackageId, PackageRecord>, touched: &HashSet<PackageId>) {
    if touched.is_empty() {
        return;
    }

    let mut reachable: IndexSet<PackageId> = IndexSet::new();
    let mut stack: Vec<PackageId> = touched.iter().cloned().collect();
    reachable.extend(stack.iter().cloned());
    while let Some(id) = stack.pop() {
        if let Some(record) = packages.get(&id) {
            for dep in record.deps_by_pkg_path.values() {
                if reachable.insert(dep.clone()) {
                    stack.push(dep.clone());
                }
            }
        }
    }

    let mut subgraph = petgraph::Graph::<PackageId, (), Directed>::new();
    let mut node_of: HashMap<PackageId, NodeIndex> = HashMap::with_capacity(reachable.len());
    for id in &reachable {
        node_of.insert(id.clone(), subgraph.add_node(id.clone()));
    }
    for id in &reachable {
        if let Some(record) = packages.get(id) {
            for dep in record.deps_by_pkg_path.values() {
                if let (Some(&from), Some(&to)) = (node_of.get(id), node_of.get(dep)) {
                    subgraph.add_edge(from, to, ());
                }
            }
        }
    }

    for scc in kosaraju_scc(&subgraph) {
        if scc.len() <= 1 {
            continue;
        }
        let members: HashSet<PackageId> = scc.iter().map(|&ix| subgraph[ix].clone()).collect();
        for &ix in &scc {
            let member_id = subgraph[ix].clone();
            if !touched.contains(&member_id) {
                continue;
            }
            let Some(record) = packages.get_mut(&member_id) else {
                continue;
            };
            let pkg_before = record.deps_by_pkg_path.len();
            record.deps_by_pkg_path.retain(|_, target| !members.contains(target));
            let imp_before = record.deps_by_imp_path.len();
            record
                .deps_by_imp_path
                .retain(|(_, target)| target.as_ref().map_or(true, |t| !members.contains(t)));
            let removed =
                record.deps_by_pkg_path.len() != pkg_before || record.deps_by_imp_path.len() != imp_before;
            if removed && record.errors.is_empty() {
                debug!(package = %member_id, "breaking import cycle");
                record.errors.push(LoadError::detected_import_cycle());
            }
        }
    }
}

fn derive_imported_by(
    packages: &IndexMap<PackageId, PackageRecord>,
) -> IndexMap<PackageId, Vec<PackageId>> {
    let mut imported_by: IndexMap<PackageId, Vec<PackageId>> = IndexMap::new();
    for (id, record) in packages {
        for target in record.deps_by_pkg_path.values() {
            imported_by.entry(target.clone()).or_default().push(id.clone());
        }
    }
    imported_by
}

/// Derives the `IDs` URI index (spec §3, §4.E step 5): real IDs sort
/// before command-line-arguments IDs, then by ID string; if any real ID
/// remains, the list is truncated at the first command-line-arguments
/// ID so only real IDs survive for that URI.
fn derive_ids(packages: &IndexMap<PackageId, PackageRecord>) -> IndexMap<String, Vec<PackageId>> {
    let mut ids: IndexMap<String, Vec<PackageId>> = IndexMap::new();
    for record in packages.values() {
        let mut seen = HashSet::new();
        for uri in record.compiled_or_total_files() {
            if seen.insert(uri) {
                ids.entry(uri.to_string()).or_default().push(record.id.clone());
            }
        }
    }
    for list in ids.values_mut() {
        list.sort_by(|a, b| {
            a.is_command_line_arguments()
                .cmp(&b.is_command_line_arguments())
                .then_with(|| a.as_str().cmp(b.as_str()))
        });
        let has_real = list.iter().any(|id| !id.is_command_line_arguments());
        if has_real {
            if let Some(pos) = list.iter().position(PackageId::is_command_line_arguments) {
                list.truncate(pos);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{PackageName, PackagePath};
    use pretty_assertions::assert_eq;

    fn record(id: &str, deps: &[&str]) -> PackageRecord {
        let mut deps_by_pkg_path = IndexMap::new();
        for dep in deps {
            deps_by_pkg_path.insert(PackagePath::new(*dep), PackageId::new(*dep));
        }
        PackageRecord {
            id: PackageId::new(id),
            pkg_path: PackagePath::new(id),
            name: PackageName::new(id),
            all_files: vec![format!("file:///{id}.go")],
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
        records
            .into_iter()
            .map(|r| (r.id.clone(), Some(r)))
            .collect()
    }

    #[test]
    fn empty_update_returns_unchanged_graph() {
        let g = Graph::empty().update(updates(vec![record("a", &[])]));
        let g2 = g.update(IndexMap::new());
        assert_eq!(g2.packages().len(), g.packages().len());
    }

    #[test]
    fn update_derives_imported_by() {
        let g = Graph::empty().update(updates(vec![record("a", &["b"]), record("b", &[])]));
        assert_eq!(g.imported_by(&PackageId::new("b")), &[PackageId::new("a")]);
    }

    #[test]
    fn scenario_command_line_arguments_demotion() {
        let mut real = record("pkg", &[]);
        real.all_files = vec!["/tmp/x.go".to_string()];
        let mut cla = record("command-line-arguments_1", &[]);
        cla.all_files = vec!["/tmp/x.go".to_string()];
        let g = Graph::empty().update(updates(vec![real, cla]));
        assert_eq!(g.ids_for_uri("/tmp/x.go"), &[PackageId::new("pkg")]);
    }

    #[test]
    fn cycle_introduced_by_update_is_broken_on_updated_node_only() {
        // a depends on b, b depends on c (acyclic).
        let g = Graph::empty().update(updates(vec![
            record("a", &["b"]),
            record("b", &["c"]),
            record("c", &[]),
        ]));
        // Update only b's deps to add a back-edge to a, creating a 2-cycle {a, b}.
        let g = g.update(updates(vec![record("b", &["c", "a"])]));

        let b = g.get(&PackageId::new("b")).unwrap();
        assert!(!b.deps_by_pkg_path.contains_key(&PackagePath::new("a")));
        assert!(b.deps_by_pkg_path.contains_key(&PackagePath::new("c")));
        assert_eq!(b.errors.len(), 1);

        // a was not itself an updated node in this batch, so its edges survive untouched.
        let a = g.get(&PackageId::new("a")).unwrap();
        assert!(a.deps_by_pkg_path.contains_key(&PackagePath::new("b")));
        assert!(a.errors.is_empty());
    }

    #[test]
    fn sort_post_order_tolerates_cycles_and_self_edges() {
        let g = Graph::empty().update(updates(vec![
            record("a", &["b"]),
            record("b", &["a"]),
            record("c", &["c"]),
        ]));
        let order = g.sort_post_order(&[PackageId::new("a"), PackageId::new("c")]);
        let b_pos = order.iter().position(|id| id.as_str() == "b").unwrap();
        let a_pos = order.iter().position(|id| id.as_str() == "a").unwrap();
        assert!(b_pos < a_pos, "dependency b must precede dependent a");
        assert_eq!(order.iter().filter(|id| id.as_str() == "c").count(), 1);
    }

    #[test]
    fn rrtc_includes_transitive_importers() {
        let g = Graph::empty().update(updates(vec![
            record("a", &[]),
            record("b", &["a"]),
            record("c", &["b"]),
        ]));
        let mut closure: Vec<String> = g
            .rrtc(&[PackageId::new("a")])
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();
        closure.sort();
        assert_eq!(closure, vec!["a", "b", "c"]);
    }
}
