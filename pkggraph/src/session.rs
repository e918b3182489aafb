// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `Session` and `View`: the session owns open folders; each folder's
//! `View` produces a totally ordered sequence of `Snapshot`s (spec
//! §4.F, §5 "Ordering guarantees").

use std::sync::Arc;

use indexmap::IndexMap;
use progress::Tracker;
use tokio::sync::Mutex;

use crate::graph::Graph;
use crate::snapshot::{FileContents, HandleKey, Snapshot};
use crate::traits::PackageLoader;

/// A build configuration for one open folder. Produces an ordered
/// sequence of `Snapshot`s; holders of an older `Arc<Snapshot>` keep
/// observing it unmutated even after a newer one is published (spec §5:
/// "A Graph observed by a query is never mutated afterwards").
pub struct View {
    folder: String,
    current: Mutex<Arc<Snapshot>>,
}

impl View {
    pub fn new(folder: impl Into<String>, graph: Graph) -> Self {
        Self {
            folder: folder.into(),
            current: Mutex::new(Arc::new(Snapshot::new(graph))),
        }
    }

    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// The snapshot currently in effect for this view.
    pub async fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.lock().await)
    }

    /// Publishes a new snapshot in response to an edit (spec §4.F
    /// "Snapshot construction, on edit"). Returns the new snapshot;
    /// whoever already held the previous one via `current()` keeps
    /// observing it until they drop it.
    pub async fn publish_edit(
        &self,
        graph: Graph,
        file_updates: impl IntoIterator<Item = (String, FileContents)>,
        retained_keys: &[HandleKey],
    ) -> Arc<Snapshot> {
        let mut current = self.current.lock().await;
        let successor = current.successor(graph, file_updates, retained_keys).await;
        let successor = Arc::new(successor);
        *current = Arc::clone(&successor);
        successor
    }

    /// Re-describes this view's build via `loader` and publishes the
    /// resulting successor snapshot (spec §4.F "Snapshot construction,
    /// on edit", steps 2-4): asks the loader for updated records, folds
    /// them into the current graph, and carries over `file_updates` and
    /// `retained_keys` exactly as `publish_edit` does. When `tracker` is
    /// given, the reload is reported as a single piece of work (spec
    /// §4.G), so a caller doing a bulk folder (re)open gets visible
    /// progress without the snapshot lifecycle itself depending on any
    /// particular editor protocol.
    pub async fn reload(
        &self,
        loader: &dyn PackageLoader,
        scope: &str,
        tracker: Option<&Tracker>,
        file_updates: impl IntoIterator<Item = (String, FileContents)>,
        retained_keys: &[HandleKey],
    ) -> Arc<Snapshot> {
        let work = match tracker {
            Some(tracker) => Some(
                tracker
                    .start(format!("loading {scope}"), None, None, None)
                    .await,
            ),
            None => None,
        };

        let records = loader.load(scope).await;
        let base_graph = self.current().await.graph.clone();
        let updates = records
            .into_iter()
            .map(|record| (record.id.clone(), Some(record)))
            .collect();
        let graph = base_graph.update(updates);

        let snapshot = self.publish_edit(graph, file_updates, retained_keys).await;

        if let Some(work) = work {
            work.end(None).await;
        }
        snapshot
    }
}

/// Owns the set of open folders and their file overlays (spec §4.F).
#[derive(Default)]
pub struct Session {
    views: Mutex<IndexMap<String, Arc<View>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `folder` with its initial graph, or returns the existing
    /// view if it was already open.
    pub async fn open_folder(&self, folder: impl Into<String>, graph: Graph) -> Arc<View> {
        let folder = folder.into();
        let mut views = self.views.lock().await;
        Arc::clone(
            views
                .entry(folder.clone())
                .or_insert_with(|| Arc::new(View::new(folder, graph))),
        )
    }

    pub async fn view(&self, folder: &str) -> Option<Arc<View>> {
        self.views.lock().await.get(folder).cloned()
    }

    pub async fn close_folder(&self, folder: &str) {
        self.views.lock().await.shift_remove(folder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::PackageId;
    use crate::record::PackageRecord;
    use indexmap::IndexMap as Im;

    fn record(id: &str) -> PackageRecord {
        PackageRecord {
            id: PackageId::new(id),
            pkg_path: crate::ids::PackagePath::new(id),
            name: crate::ids::PackageName::new(id),
            all_files: vec![],
            compiled_files: vec![],
            ignored_files: vec![],
            for_test: None,
            errors: vec![],
            deps_by_imp_path: vec![],
            deps_by_pkg_path: Im::new(),
            standalone: false,
        }
    }

    #[tokio::test]
    async fn old_snapshot_survives_a_published_successor() {
        let g1 = Graph::empty().update([(PackageId::new("a"), Some(record("a")))].into_iter().collect());
        let view = View::new("/ws", g1.clone());

        let held = view.current().await;
        assert!(held.graph.get(&PackageId::new("a")).is_some());
        assert!(held.graph.get(&PackageId::new("b")).is_none());

        let g2 = g1.update([(PackageId::new("b"), Some(record("b")))].into_iter().collect());
        view.publish_edit(g2, [], &[]).await;

        // The handle taken before the edit still sees the pre-edit graph.
        assert!(held.graph.get(&PackageId::new("b")).is_none());
        // A fresh fetch sees the successor.
        let now = view.current().await;
        assert!(now.graph.get(&PackageId::new("b")).is_some());
    }

    struct FakeLoader {
        records: Vec<PackageRecord>,
    }

    #[async_trait::async_trait]
    impl PackageLoader for FakeLoader {
        async fn load(&self, _scope: &str) -> Vec<PackageRecord> {
            self.records.clone()
        }
    }

    #[tokio::test]
    async fn reload_folds_loader_output_into_a_new_snapshot() {
        let view = View::new("/ws", Graph::empty());
        let loader = FakeLoader {
            records: vec![record("a"), record("b")],
        };

        let snapshot = view.reload(&loader, "./...", None, [], &[]).await;
        assert!(snapshot.graph.get(&PackageId::new("a")).is_some());
        assert!(snapshot.graph.get(&PackageId::new("b")).is_some());

        // A fresh fetch from the view sees the same published snapshot.
        let now = view.current().await;
        assert!(Arc::ptr_eq(&snapshot, &now));
    }

    #[tokio::test]
    async fn session_reuses_the_same_view_for_a_folder() {
        let session = Session::new();
        let v1 = session.open_folder("/ws", Graph::empty()).await;
        let v2 = session.open_folder("/ws", Graph::empty()).await;
        assert!(Arc::ptr_eq(&v1, &v2));
        assert!(session.view("/nope").await.is_none());
    }
}
