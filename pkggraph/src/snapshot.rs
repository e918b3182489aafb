// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Snapshot lifecycle and per-package once-only derived caches (spec
//! §4.F).

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use indexmap::IndexMap;
use methodset::MethodSetIndex;
use testindex::TestIndex;
use tokio::sync::{Mutex, OnceCell};

use crate::errors::Error;
use crate::graph::Graph;
use crate::ids::PackageId;
use crate::traits::TypeCheckedPackage;

/// Either the file is read from disk, or an editor-owned overlay
/// supplies its content directly.
#[derive(Clone, Debug)]
pub enum FileContents {
    Disk,
    Overlay(Arc<str>),
}

/// A stable fingerprint of every input that could change a package's
/// derived computations: the package ID, its compiled files' content
/// hashes, and the fingerprint keys of its direct deps (spec §3, §4.F
/// "Package handle fingerprint").
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct HandleKey {
    pub package_id: PackageId,
    pub compiled_file_hashes: Vec<u64>,
    pub direct_dep_keys: Vec<HandleKey>,
}

/// The once-only derived computations for a single `HandleKey` (spec
/// §4.F: "computed at most once per snapshot per key"). Each field is a
/// completion latch rather than a global lock, per the "lazy once-only
/// computations" design note (spec §9) -- concurrent requests for the
/// same key block on the single in-flight `OnceCell::get_or_init` call.
#[derive(Default)]
pub struct PackageCache {
    type_checked: OnceCell<Result<Arc<TypeCheckedPackage>, Error>>,
    method_set_index: OnceCell<Result<Arc<MethodSetIndex>, Error>>,
    test_index: OnceCell<Result<Arc<TestIndex>, Error>>,
}

impl PackageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn type_checked<F, Fut>(&self, init: F) -> Result<Arc<TypeCheckedPackage>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TypeCheckedPackage, Error>>,
    {
        self.type_checked
            .get_or_init(|| async { init().await.map(Arc::new) })
            .await
            .clone()
    }

    pub async fn method_set_index<F, Fut>(&self, init: F) -> Result<Arc<MethodSetIndex>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<MethodSetIndex, Error>>,
    {
        self.method_set_index
            .get_or_init(|| async { init().await.map(Arc::new) })
            .await
            .clone()
    }

    pub async fn test_index<F, Fut>(&self, init: F) -> Result<Arc<TestIndex>, Error>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TestIndex, Error>>,
    {
        self.test_index
            .get_or_init(|| async { init().await.map(Arc::new) })
            .await
            .clone()
    }
}

/// Per-snapshot map of `HandleKey` to its `PackageCache` (spec §4.F).
#[derive(Default)]
struct DerivedCache {
    entries: Mutex<HashMap<HandleKey, Arc<PackageCache>>>,
}

/// An immutable view of a workspace at a point in time: a `Graph`, file
/// contents, and the derived caches built against it (spec §3, §4.F).
///
/// Frozen on creation; caches populate lazily but once-only. Released
/// when the session's successor exists and no in-flight query still
/// holds this one.
pub struct Snapshot {
    pub graph: Graph,
    files: IndexMap<String, FileContents>,
    cache: Arc<DerivedCache>,
}

impl Snapshot {
    pub fn new(graph: Graph) -> Self {
        Self {
            graph,
            files: IndexMap::new(),
            cache: Arc::new(DerivedCache::default()),
        }
    }

    pub fn file_contents(&self, uri: &str) -> Option<&FileContents> {
        self.files.get(uri)
    }

    /// Returns (creating if absent) the `PackageCache` for `key`.
    pub async fn package_cache(&self, key: HandleKey) -> Arc<PackageCache> {
        let mut entries = self.cache.entries.lock().await;
        Arc::clone(entries.entry(key).or_insert_with(|| Arc::new(PackageCache::new())))
    }

    /// Builds the successor snapshot for an edit (spec §4.F): merges in
    /// `file_updates`, installs `graph`, and carries over every cache
    /// entry in `retained_keys` whose key still exists in this
    /// snapshot's cache -- unchanged packages skip recomputation
    /// entirely, since an unchanged `HandleKey` can only arise from
    /// unchanged inputs.
    pub async fn successor(
        &self,
        graph: Graph,
        file_updates: impl IntoIterator<Item = (String, FileContents)>,
        retained_keys: &[HandleKey],
    ) -> Self {
        let mut files = self.files.clone();
        for (uri, contents) in file_updates {
            files.insert(uri, contents);
        }

        let new_cache = DerivedCache::default();
        {
            let old = self.cache.entries.lock().await;
            let mut fresh = new_cache.entries.lock().await;
            for key in retained_keys {
                if let Some(entry) = old.get(key) {
                    fresh.insert(key.clone(), Arc::clone(entry));
                }
            }
        }

        Self {
            graph,
            files,
            cache: Arc::new(new_cache),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(id: &str) -> HandleKey {
        HandleKey {
            package_id: PackageId::new(id),
            compiled_file_hashes: vec![1],
            direct_dep_keys: vec![],
        }
    }

    #[tokio::test]
    async fn concurrent_requests_for_same_key_compute_once() {
        let snapshot = Snapshot::new(Graph::empty());
        let cache = snapshot.package_cache(key("a")).await;
        let calls = AtomicUsize::new(0);

        let first = cache
            .type_checked(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(TypeCheckedPackage {
                    package_id: PackageId::new("a"),
                    exported_types: vec![],
                    parsed_files: vec![],
                    diagnostics: vec![],
                })
            })
            .await
            .unwrap();
        let second = cache
            .type_checked(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                unreachable!("must not be invoked twice")
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successor_inherits_retained_keys_only() {
        let snapshot = Snapshot::new(Graph::empty());
        let unchanged = key("unchanged");
        let changed = key("changed");

        let unchanged_cache = snapshot.package_cache(unchanged.clone()).await;
        unchanged_cache
            .test_index(|| async { Ok(TestIndex::default()) })
            .await
            .unwrap();
        snapshot.package_cache(changed.clone()).await;

        let successor = snapshot
            .successor(Graph::empty(), [], std::slice::from_ref(&unchanged))
            .await;

        let inherited = successor.package_cache(unchanged).await;
        assert!(Arc::ptr_eq(&inherited, &unchanged_cache));

        // `changed`'s key was not in `retained_keys`, so the successor
        // starts it fresh rather than sharing the stale entry.
        let fresh = successor.package_cache(changed).await;
        let calls = AtomicUsize::new(0);
        fresh
            .test_index(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(TestIndex::default())
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
