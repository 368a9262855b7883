use crate::error::FetchError;
use crate::vector::FrequencyVector;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// External source of tokenized words for a document id.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, id: &str) -> impl Future<Output = Result<Vec<String>, FetchError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Upper bound on fetches in flight at once.
    pub max_concurrency: usize,
}

impl Default for BuildConfig {
    fn default() -> Self { Self { max_concurrency: 16 } }
}

#[derive(Debug, Default)]
pub struct BuildReport {
    /// Only ids whose fetch succeeded.
    pub vectors: HashMap<String, FrequencyVector>,
    /// Ids that were requested but are absent from `vectors`, in request order.
    pub failed: Vec<String>,
}

/// Fans a batch of ids out over a bounded set of tasks and joins the results
/// into one map. A failing id is logged and left out; siblings are unaffected.
#[derive(Debug, Clone, Default)]
pub struct VectorBuilder {
    config: BuildConfig,
}

impl VectorBuilder {
    pub fn new(config: BuildConfig) -> Self { Self { config } }

    pub async fn build<F: Fetcher>(&self, fetcher: Arc<F>, ids: &[String]) -> HashMap<String, FrequencyVector> {
        self.build_report(fetcher, ids).await.vectors
    }

    pub async fn build_report<F: Fetcher>(&self, fetcher: Arc<F>, ids: &[String]) -> BuildReport {
        let mut seen = HashSet::new();
        let unique: Vec<&String> = ids.iter().filter(|id| seen.insert(id.as_str())).collect();

        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for id in &unique {
            let id = (*id).clone();
            let fetcher = Arc::clone(&fetcher);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok();
                let outcome = fetcher.fetch(&id).await.map(FrequencyVector::from_words);
                (id, outcome)
            });
        }

        let mut vectors = HashMap::with_capacity(unique.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(vector))) => {
                    tracing::debug!(%id, words = vector.len(), "built frequency vector");
                    vectors.insert(id, vector);
                }
                Ok((id, Err(err))) => {
                    tracing::warn!(%id, error = %err, "fetch failed; leaving document out");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "vector task aborted");
                }
            }
        }

        let failed: Vec<String> = unique
            .into_iter()
            .filter(|id| !vectors.contains_key(id.as_str()))
            .cloned()
            .collect();
        tracing::info!(requested = ids.len(), built = vectors.len(), failed = failed.len(), "vector build complete");
        BuildReport { vectors, failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Gate {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Fetcher for Gate {
        async fn fetch(&self, id: &str) -> Result<Vec<String>, FetchError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![id.to_string()])
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_is_bounded() {
        let gate = Arc::new(Gate { running: AtomicUsize::new(0), peak: AtomicUsize::new(0) });
        let ids: Vec<String> = (0..12).map(|i| format!("doc{i}")).collect();
        let builder = VectorBuilder::new(BuildConfig { max_concurrency: 3 });
        let out = builder.build(Arc::clone(&gate), &ids).await;
        assert_eq!(out.len(), 12);
        assert!(gate.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn duplicate_ids_fetch_once() {
        let gate = Arc::new(Gate { running: AtomicUsize::new(0), peak: AtomicUsize::new(0) });
        let ids = vec!["a".to_string(), "a".to_string(), "b".to_string()];
        let report = VectorBuilder::default().build_report(gate, &ids).await;
        assert_eq!(report.vectors.len(), 2);
        assert!(report.failed.is_empty());
    }
}
