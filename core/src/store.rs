//! Snapshot loading with recovery.
//!
//! A snapshot that cannot be read is never fatal: the vectors are rebuilt from
//! the id list through the fetcher and the snapshot is written back.

use crate::builder::{Fetcher, VectorBuilder};
use crate::error::Result;
use crate::persist::{load_ids, load_snapshot, save_ids, save_snapshot_with_meta, SnapshotPaths, VectorMap};
use crate::vector::FrequencyVector;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct LoadedSnapshot {
    /// Ids in `urls.txt` order.
    pub ids: Vec<String>,
    pub vectors: VectorMap,
    /// True when the snapshot was unusable and rebuilt from the id list.
    pub rebuilt: bool,
}

impl LoadedSnapshot {
    /// Documents in id-list order, followed by any snapshot-only ids sorted.
    pub fn documents(&self) -> Vec<(String, FrequencyVector)> {
        let mut placed: HashSet<&str> = HashSet::with_capacity(self.vectors.len());
        let mut out = Vec::with_capacity(self.vectors.len());
        for id in &self.ids {
            if let Some(v) = self.vectors.get(id) {
                if placed.insert(id.as_str()) {
                    out.push((id.clone(), v.clone()));
                }
            }
        }
        let mut extra: Vec<&String> = self.vectors.keys().filter(|k| !placed.contains(k.as_str())).collect();
        extra.sort();
        for id in extra {
            out.push((id.clone(), self.vectors[id].clone()));
        }
        out
    }
}

/// Load `vectors.bin`, falling back to a full rebuild from `urls.txt` when it
/// is missing or corrupt. Ids listed but absent from a healthy snapshot are
/// fetched and merged in. An unreadable `urls.txt` falls back to the
/// snapshot's own ids and is rewritten from them.
pub async fn load_or_rebuild<F: Fetcher>(
    paths: &SnapshotPaths,
    builder: &VectorBuilder,
    fetcher: Arc<F>,
) -> Result<LoadedSnapshot> {
    let listed = match load_ids(paths) {
        Ok(ids) => Some(ids),
        Err(err) => {
            tracing::warn!(error = %err, "id list unreadable; falling back to snapshot ids");
            None
        }
    };
    let snapshot = load_snapshot(paths);
    let ids = match (listed, &snapshot) {
        (Some(ids), _) => ids,
        (None, Ok(vectors)) => {
            let mut ids: Vec<String> = vectors.keys().cloned().collect();
            ids.sort();
            if let Err(err) = save_ids(paths, &ids) {
                tracing::warn!(error = %err, "could not rewrite id list");
            }
            ids
        }
        (None, Err(_)) => Vec::new(),
    };

    let (vectors, rebuilt) = match snapshot {
        Ok(mut vectors) => {
            let missing: Vec<String> = ids.iter().filter(|id| !vectors.contains_key(*id)).cloned().collect();
            if !missing.is_empty() {
                tracing::info!(missing = missing.len(), "fetching ids absent from snapshot");
                let fetched = builder.build(fetcher, &missing).await;
                if !fetched.is_empty() {
                    vectors.extend(fetched);
                    persist_quietly(paths, &vectors);
                }
            }
            (vectors, false)
        }
        Err(err) => {
            tracing::warn!(error = %err, ids = ids.len(), "snapshot unusable; rebuilding from id list");
            let vectors = builder.build(fetcher, &ids).await;
            persist_quietly(paths, &vectors);
            (vectors, true)
        }
    };

    tracing::info!(documents = vectors.len(), rebuilt, "snapshot ready");
    Ok(LoadedSnapshot { ids, vectors, rebuilt })
}

fn persist_quietly(paths: &SnapshotPaths, vectors: &VectorMap) {
    if let Err(err) = save_snapshot_with_meta(paths, vectors) {
        tracing::warn!(error = %err, "could not write snapshot; continuing with in-memory vectors");
    }
}
