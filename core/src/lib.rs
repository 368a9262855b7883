//! Document similarity engine: word-frequency vectors, a cosine-weighted
//! similarity graph with connectivity tracking, shortest paths, k-means
//! clustering and a bounded concurrent vector build.

pub mod builder;
pub mod cluster;
pub mod error;
pub mod graph;
pub mod path;
pub mod persist;
pub mod query;
pub mod similarity;
pub mod store;
pub mod tokenizer;
pub mod union_find;
pub mod vector;

pub use builder::{BuildConfig, BuildReport, Fetcher, VectorBuilder};
pub use cluster::{Cluster, ClusterConfig, ClusterRun, Clusterer};
pub use error::{FetchError, Result, SimError};
pub use graph::{Edge, SimilarityGraph, Site};
pub use path::{path_cost, path_steps, shortest_path, PathStep};
pub use query::{cluster_graph, most_similar, most_similar_in_cluster, rank_against, ClusterView, GraphClustering, RankedSite};
pub use similarity::{cosine_similarity, similarity_by_id};
pub use store::{load_or_rebuild, LoadedSnapshot};
pub use tokenizer::Tokenization;
pub use union_find::DisjointSetForest;
pub use vector::FrequencyVector;
