use crate::similarity::cosine_similarity;
use crate::union_find::DisjointSetForest;
use crate::vector::FrequencyVector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A document in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    pub vector: FrequencyVector,
    /// Free-form score carried for callers; the graph algorithms ignore it.
    #[serde(default)]
    pub score: f64,
}

impl Site {
    pub fn new(id: impl Into<String>, vector: FrequencyVector) -> Self {
        Self { id: id.into(), vector, score: 0.0 }
    }
}

/// Undirected edge weighted by the similarity at creation time. The weight is
/// a snapshot; it is not refreshed if either endpoint's vector changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub a: String,
    pub b: String,
    pub weight: f64,
}

impl Edge {
    pub fn new(a: impl Into<String>, b: impl Into<String>, weight: f64) -> Self {
        Self { a: a.into(), b: b.into(), weight }
    }

    /// The endpoint opposite `id`, or `None` if `id` is not on this edge.
    pub fn other(&self, id: &str) -> Option<&str> {
        if self.a == id {
            Some(&self.b)
        } else if self.b == id {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// Sites, edges and the structures derived from them.
///
/// The site index, adjacency lists and disjoint-set forest are recomputed from
/// scratch by [`rebuild`](Self::rebuild) after every topology change. The graph
/// has no internal locking; an embedding application must serialize writers.
#[derive(Debug, Clone, Default)]
pub struct SimilarityGraph {
    sites: Vec<Site>,
    edges: Vec<Edge>,
    site_index: HashMap<String, usize>,
    adjacency: HashMap<String, Vec<usize>>,
    forest: DisjointSetForest,
}

impl SimilarityGraph {
    pub fn new() -> Self { Self::default() }

    /// Insert every document in order, linking each to all documents before it.
    pub fn from_documents<I, S>(docs: I) -> Self
    where
        I: IntoIterator<Item = (S, FrequencyVector)>,
        S: Into<String>,
    {
        let mut graph = Self::new();
        for (id, vector) in docs {
            graph.link_document(id.into(), vector);
        }
        graph.rebuild();
        tracing::info!(sites = graph.sites.len(), edges = graph.edges.len(), "similarity graph built");
        graph
    }

    /// Append a site. Duplicates are not rejected; the later site wins in lookups.
    pub fn add_site(&mut self, site: Site) {
        self.sites.push(site);
        self.rebuild();
    }

    /// Append an edge. Parallel edges and self-loops are allowed.
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
        self.rebuild();
    }

    /// Add a site plus one edge to every site already present, then rebuild once.
    pub fn insert_document(&mut self, id: impl Into<String>, vector: FrequencyVector) {
        self.link_document(id.into(), vector);
        self.rebuild();
    }

    fn link_document(&mut self, id: String, vector: FrequencyVector) {
        for existing in &self.sites {
            let weight = cosine_similarity(&vector, &existing.vector);
            tracing::debug!(from = %id, to = %existing.id, weight, "edge");
            self.edges.push(Edge::new(id.clone(), existing.id.clone(), weight));
        }
        self.sites.push(Site::new(id, vector));
    }

    /// Recompute the site index, adjacency lists and forest from (sites, edges).
    pub fn rebuild(&mut self) {
        self.site_index = self
            .sites
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        let mut adjacency: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, edge) in self.edges.iter().enumerate() {
            adjacency.entry(edge.a.clone()).or_default().push(i);
            adjacency.entry(edge.b.clone()).or_default().push(i);
        }
        self.adjacency = adjacency;

        let mut forest = DisjointSetForest::new(self.sites.iter().map(|s| s.id.clone()));
        for edge in &self.edges {
            forest.union(&edge.a, &edge.b);
        }
        self.forest = forest;
    }

    pub fn sites(&self) -> &[Site] { &self.sites }

    pub fn edges(&self) -> &[Edge] { &self.edges }

    pub fn site(&self, id: &str) -> Option<&Site> {
        self.site_index.get(id).map(|&i| &self.sites[i])
    }

    pub fn contains(&self, id: &str) -> bool { self.site_index.contains_key(id) }

    pub fn len(&self) -> usize { self.site_index.len() }

    pub fn is_empty(&self) -> bool { self.site_index.is_empty() }

    /// Edges touching `id`, in insertion order. A self-loop appears twice.
    pub fn incident_edges(&self, id: &str) -> impl Iterator<Item = &Edge> {
        self.adjacency
            .get(id)
            .into_iter()
            .flatten()
            .map(move |&i| &self.edges[i])
    }

    /// (id, vector) pairs in site order, suitable for re-persisting.
    pub fn vectors(&self) -> impl Iterator<Item = (&str, &FrequencyVector)> {
        self.sites.iter().map(|s| (s.id.as_str(), &s.vector))
    }

    /// Number of connected components as of the latest rebuild.
    pub fn disjoint_set_count(&self) -> usize {
        self.forest.count_disjoint_sets()
    }

    /// Whether two sites share a component.
    pub fn connected(&self, a: &str, b: &str) -> bool {
        self.forest.connected(a, b)
    }

    /// Component representative of `id`.
    pub fn component_of(&self, id: &str) -> Option<&str> {
        self.forest.root(id)
    }

    /// Site ids grouped by component. Groups follow the order of their first
    /// site; ids within a group keep site order.
    pub fn components(&self) -> Vec<Vec<String>> {
        let mut slot: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Vec<String>> = Vec::new();
        for site in &self.sites {
            let Some(root) = self.forest.root(&site.id) else { continue };
            let i = *slot.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            if !groups[i].contains(&site.id) {
                groups[i].push(site.id.clone());
            }
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(words: &[&str]) -> FrequencyVector {
        FrequencyVector::from_words(words.iter().copied())
    }

    #[test]
    fn insert_document_links_to_existing_sites() {
        let mut g = SimilarityGraph::new();
        g.insert_document("a", doc(&["x"]));
        g.insert_document("b", doc(&["x"]));
        g.insert_document("c", doc(&["y"]));
        assert_eq!(g.edges().len(), 3);
        assert_eq!(g.incident_edges("c").count(), 2);
        assert_eq!(g.edges()[0].weight, 1.0);
        assert_eq!(g.disjoint_set_count(), 1);
    }

    #[test]
    fn rebuild_tracks_components() {
        let mut g = SimilarityGraph::new();
        for id in ["a", "b", "c", "d"] {
            g.add_site(Site::new(id, doc(&[id])));
        }
        assert_eq!(g.disjoint_set_count(), 4);
        g.add_edge(Edge::new("a", "b", 0.2));
        assert_eq!(g.disjoint_set_count(), 3);
        g.add_edge(Edge::new("b", "a", 0.2));
        assert_eq!(g.disjoint_set_count(), 3);
        assert!(g.connected("a", "b"));
        assert!(!g.connected("a", "c"));
        assert_eq!(
            g.components(),
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()], vec!["d".to_string()]]
        );
    }

    #[test]
    fn self_loop_other_endpoint() {
        let e = Edge::new("a", "a", 1.0);
        assert_eq!(e.other("a"), Some("a"));
        assert_eq!(Edge::new("a", "b", 0.0).other("z"), None);
    }
}
