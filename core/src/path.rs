//! Dijkstra search over a [`SimilarityGraph`].
//!
//! The cost of an edge is its raw similarity weight, summed along the path.
//! Higher-similarity edges therefore cost more; this is not a "most similar
//! route" search. Stale heap entries are skipped rather than decreased.
//! Edges with a negative or non-finite weight are not traversed.

use crate::graph::{Edge, SimilarityGraph};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// Heap entry ordered so that `BinaryHeap` pops the smallest distance first.
#[derive(Debug)]
struct Frontier<'g> {
    dist: f64,
    site: &'g str,
}

impl PartialEq for Frontier<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier<'_> {}

impl PartialOrd for Frontier<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        // reversed for min-heap
        other.dist.total_cmp(&self.dist)
    }
}

/// Edges from `from` to `to`, source first. Empty when either id is unknown,
/// when no path exists, or when `from == to`.
pub fn shortest_path(graph: &SimilarityGraph, from: &str, to: &str) -> Vec<Edge> {
    if !graph.contains(from) || !graph.contains(to) || from == to {
        return Vec::new();
    }

    let mut dist: HashMap<&str, f64> = graph
        .sites()
        .iter()
        .map(|s| (s.id.as_str(), f64::INFINITY))
        .collect();
    let mut came_by: HashMap<&str, &Edge> = HashMap::new();
    let mut heap = BinaryHeap::new();

    dist.insert(from, 0.0);
    heap.push(Frontier { dist: 0.0, site: from });

    while let Some(Frontier { dist: d, site }) = heap.pop() {
        if d > dist.get(site).copied().unwrap_or(f64::INFINITY) {
            continue;
        }
        for edge in graph.incident_edges(site) {
            if !traversable(edge) {
                tracing::debug!(a = %edge.a, b = %edge.b, weight = edge.weight, "skipping untraversable edge");
                continue;
            }
            let Some(next) = edge.other(site) else { continue };
            let candidate = d + edge.weight;
            if candidate < dist.get(next).copied().unwrap_or(f64::INFINITY) {
                dist.insert(next, candidate);
                came_by.insert(next, edge);
                heap.push(Frontier { dist: candidate, site: next });
            }
        }
    }

    let mut path = Vec::new();
    let mut at = to;
    while let Some(edge) = came_by.get(at) {
        path.push((*edge).clone());
        match edge.other(at) {
            Some(prev) => at = prev,
            None => break,
        }
    }
    path.reverse();
    path
}

fn traversable(edge: &Edge) -> bool {
    edge.weight.is_finite() && edge.weight >= 0.0
}

/// Sum of edge weights along `path`.
pub fn path_cost(path: &[Edge]) -> f64 {
    path.iter().map(|e| e.weight).sum()
}

/// One hop of a path oriented in travel direction, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    pub from: String,
    pub to: String,
    pub weight: f64,
    pub cumulative: f64,
}

/// Orient each edge of a source-first `path` starting at `from`.
pub fn path_steps(from: &str, path: &[Edge]) -> Vec<PathStep> {
    let mut at = from.to_string();
    let mut cumulative = 0.0;
    let mut steps = Vec::with_capacity(path.len());
    for edge in path {
        let to = edge.other(&at).unwrap_or(&edge.b).to_string();
        cumulative += edge.weight;
        steps.push(PathStep { from: at.clone(), to: to.clone(), weight: edge.weight, cumulative });
        at = to;
    }
    steps
}
