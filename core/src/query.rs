use crate::cluster::{ClusterRun, Clusterer};
use crate::error::Result;
use crate::graph::SimilarityGraph;
use crate::similarity::cosine_similarity;
use crate::vector::FrequencyVector;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSite {
    pub id: String,
    pub similarity: f64,
}

fn by_similarity_desc(a: &RankedSite, b: &RankedSite) -> Ordering {
    b.similarity.total_cmp(&a.similarity).then_with(|| a.id.cmp(&b.id))
}

/// Every site scored against `reference`, most similar first. The reference
/// itself is included with 1.0. Unknown reference gives an empty list.
pub fn rank_against(graph: &SimilarityGraph, reference: &str) -> Vec<RankedSite> {
    let Some(base) = graph.site(reference) else { return Vec::new() };
    let mut ranked: Vec<RankedSite> = graph
        .sites()
        .iter()
        .map(|s| RankedSite {
            similarity: if s.id == reference { 1.0 } else { cosine_similarity(&base.vector, &s.vector) },
            id: s.id.clone(),
        })
        .collect();
    ranked.sort_by(by_similarity_desc);
    ranked
}

/// Top `n` sites other than `reference`.
pub fn most_similar(graph: &SimilarityGraph, reference: &str, n: usize) -> Vec<RankedSite> {
    rank_against(graph, reference)
        .into_iter()
        .filter(|r| r.id != reference)
        .take(n)
        .collect()
}

/// Top `n` sites sharing `reference`'s cluster. `ids[i]` and `data[i]` name
/// and hold the vector at index `i` of the clustered slice.
pub fn most_similar_in_cluster(
    run: &ClusterRun,
    ids: &[String],
    data: &[FrequencyVector],
    reference: &str,
    n: usize,
) -> Vec<RankedSite> {
    let Some(point) = ids.iter().position(|id| id == reference) else { return Vec::new() };
    let Some(cluster) = run.cluster_of(point).map(|c| &run.clusters[c]) else { return Vec::new() };
    let base = &data[point];
    let mut ranked: Vec<RankedSite> = cluster
        .members
        .iter()
        .filter(|&&m| m != point)
        .map(|&m| RankedSite { id: ids[m].clone(), similarity: cosine_similarity(base, &data[m]) })
        .collect();
    ranked.sort_by(by_similarity_desc);
    ranked.truncate(n);
    ranked
}

/// A cluster named by document ids, with its heaviest centroid words.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterView {
    pub members: Vec<String>,
    pub top_words: Vec<(String, u32)>,
}

/// Clustering of every site in `graph`, in site order.
pub struct GraphClustering {
    pub ids: Vec<String>,
    pub data: Vec<FrequencyVector>,
    pub run: ClusterRun,
}

impl GraphClustering {
    pub fn views(&self, top_words: usize) -> Vec<ClusterView> {
        self.run
            .clusters
            .iter()
            .map(|c| {
                let mut words: Vec<(String, u32)> =
                    c.centroid.iter().filter(|(_, n)| *n > 0).map(|(w, n)| (w.to_string(), n)).collect();
                words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                words.truncate(top_words);
                ClusterView { members: c.members.iter().map(|&m| self.ids[m].clone()).collect(), top_words: words }
            })
            .collect()
    }

    pub fn most_similar(&self, reference: &str, n: usize) -> Vec<RankedSite> {
        most_similar_in_cluster(&self.run, &self.ids, &self.data, reference, n)
    }
}

pub fn cluster_graph(graph: &SimilarityGraph, clusterer: &Clusterer) -> Result<GraphClustering> {
    let (ids, data): (Vec<String>, Vec<FrequencyVector>) =
        graph.vectors().map(|(id, v)| (id.to_string(), v.clone())).unzip();
    let run = clusterer.run(&data)?;
    tracing::info!(
        sites = ids.len(),
        clusters = run.clusters.len(),
        iterations = run.iterations,
        converged = run.converged,
        "clustered graph"
    );
    Ok(GraphClustering { ids, data, run })
}
