use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use websim_core::persist::{load_ids, load_snapshot, save_ids, save_snapshot_with_meta, SnapshotPaths};
use websim_core::tokenizer::tokenize_non_word;
use websim_core::{load_or_rebuild, BuildConfig, FetchError, Fetcher, FrequencyVector, VectorBuilder};

struct FakeWeb {
    pages: HashMap<String, String>,
    calls: AtomicUsize,
}

impl FakeWeb {
    fn new(pages: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

impl Fetcher for FakeWeb {
    async fn fetch(&self, id: &str) -> Result<Vec<String>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // uneven latency so completion order differs from submission order
        let delay = (id.len() * 7 % 5) as u64;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        match self.pages.get(id) {
            Some(text) => Ok(tokenize_non_word(text)),
            None => Err(FetchError::Request { id: id.to_string(), reason: "connection refused".into() }),
        }
    }
}

fn five_ids() -> Vec<String> {
    ["https://a.test", "https://bb.test", "https://down.test", "https://dddd.test", "https://eeeee.test"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn web() -> Arc<FakeWeb> {
    FakeWeb::new(&[
        ("https://a.test", "rust crates and cargo"),
        ("https://bb.test", "Rust borrow checker; rust lifetimes"),
        ("https://dddd.test", "piano, violin and cello"),
        ("https://eeeee.test", "bread and soup and bread"),
    ])
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_fetch_is_absent_and_siblings_survive() {
    let fetcher = web();
    let builder = VectorBuilder::new(BuildConfig { max_concurrency: 2 });
    let report = builder.build_report(Arc::clone(&fetcher), &five_ids()).await;

    assert_eq!(report.vectors.len(), 4);
    assert!(!report.vectors.contains_key("https://down.test"));
    assert_eq!(report.failed, vec!["https://down.test".to_string()]);
    assert_eq!(report.vectors["https://bb.test"].frequency("rust"), 2);
    assert_eq!(report.vectors["https://eeeee.test"].frequency("bread"), 2);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_builds_agree() {
    let builder = VectorBuilder::default();
    let first = builder.build(web(), &five_ids()).await;
    for _ in 0..3 {
        let mut ids = five_ids();
        ids.reverse();
        assert_eq!(builder.build(web(), &ids).await, first);
    }
}

#[tokio::test]
async fn corrupt_snapshot_is_rebuilt_from_id_list() {
    let dir = tempdir().unwrap();
    let paths = SnapshotPaths::new(dir.path());
    save_ids(&paths, &five_ids()).unwrap();
    std::fs::write(paths.vectors(), b"\x07not bincode at all").unwrap();

    let loaded = load_or_rebuild(&paths, &VectorBuilder::default(), web()).await.unwrap();
    assert!(loaded.rebuilt);
    assert_eq!(loaded.vectors.len(), 4);
    assert_eq!(loaded.ids.len(), 5);

    let docs: Vec<String> = loaded.documents().into_iter().map(|(id, _)| id).collect();
    assert_eq!(docs, vec!["https://a.test", "https://bb.test", "https://dddd.test", "https://eeeee.test"]);

    // written back in a readable form
    assert_eq!(load_snapshot(&paths).unwrap(), loaded.vectors);
}

#[tokio::test]
async fn healthy_snapshot_only_fetches_missing_ids() {
    let dir = tempdir().unwrap();
    let paths = SnapshotPaths::new(dir.path());
    save_ids(&paths, &["https://a.test".to_string(), "https://dddd.test".to_string()]).unwrap();

    let mut stored = HashMap::new();
    stored.insert("https://a.test".to_string(), FrequencyVector::from_words(["cached"]));
    save_snapshot_with_meta(&paths, &stored).unwrap();

    let fetcher = web();
    let loaded = load_or_rebuild(&paths, &VectorBuilder::default(), Arc::clone(&fetcher)).await.unwrap();
    assert!(!loaded.rebuilt);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(loaded.vectors["https://a.test"].frequency("cached"), 1);
    assert_eq!(loaded.vectors["https://dddd.test"].frequency("cello"), 1);
    assert_eq!(load_snapshot(&paths).unwrap().len(), 2);
}

#[tokio::test]
async fn missing_everything_is_an_empty_graph_not_an_error() {
    let dir = tempdir().unwrap();
    let paths = SnapshotPaths::new(dir.path().join("fresh"));
    let loaded = load_or_rebuild(&paths, &VectorBuilder::default(), web()).await.unwrap();
    assert!(loaded.rebuilt);
    assert!(loaded.vectors.is_empty());
}

#[tokio::test]
async fn unreadable_id_list_falls_back_to_snapshot_ids() {
    let dir = tempdir().unwrap();
    let paths = SnapshotPaths::new(dir.path());
    let mut stored = HashMap::new();
    stored.insert("https://a.test".to_string(), FrequencyVector::from_words(["rust"]));
    stored.insert("https://bb.test".to_string(), FrequencyVector::from_words(["borrow"]));
    save_snapshot_with_meta(&paths, &stored).unwrap();
    std::fs::write(paths.ids(), b"https://a.test\n\xff\xfe garbage\n").unwrap();

    let fetcher = web();
    let loaded = load_or_rebuild(&paths, &VectorBuilder::default(), Arc::clone(&fetcher)).await.unwrap();
    assert!(!loaded.rebuilt);
    assert_eq!(loaded.ids, vec!["https://a.test", "https://bb.test"]);
    assert_eq!(loaded.vectors, stored);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    assert_eq!(load_ids(&paths).unwrap(), loaded.ids);
}
