//! Disjoint-set forest over document ids.
//!
//! Ids are interned to dense indices at construction. `union` always hangs
//! the first root under the second; there is no rank or size tracking, so
//! path compression alone bounds operations to amortized O(log n).

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct DisjointSetForest {
    index: HashMap<String, usize>,
    names: Vec<String>,
    parent: Vec<usize>,
}

impl DisjointSetForest {
    /// One singleton set per distinct id. Repeated ids are registered once.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut forest = Self::default();
        for id in ids {
            let id = id.into();
            if forest.index.contains_key(&id) { continue; }
            let slot = forest.names.len();
            forest.index.insert(id.clone(), slot);
            forest.names.push(id);
            forest.parent.push(slot);
        }
        forest
    }

    pub fn len(&self) -> usize { self.names.len() }

    pub fn is_empty(&self) -> bool { self.names.is_empty() }

    pub fn contains(&self, id: &str) -> bool { self.index.contains_key(id) }

    /// Root of the set holding `id`, or `None` if `id` was never registered.
    /// Every node visited on the way is repointed at the root.
    pub fn find(&mut self, id: &str) -> Option<String> {
        let slot = *self.index.get(id)?;
        let root = self.find_slot(slot);
        Some(self.names[root].clone())
    }

    fn find_slot(&mut self, mut node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Join the sets of `a` and `b`: root(a) becomes a child of root(b).
    /// Returns `true` when two distinct sets were merged. Unknown ids are a no-op.
    pub fn union(&mut self, a: &str, b: &str) -> bool {
        let (Some(&sa), Some(&sb)) = (self.index.get(a), self.index.get(b)) else {
            return false;
        };
        let ra = self.find_slot(sa);
        let rb = self.find_slot(sb);
        if ra == rb {
            return false;
        }
        self.parent[ra] = rb;
        true
    }

    /// Root of `id` without compressing, for shared-reference callers.
    pub fn root(&self, id: &str) -> Option<&str> {
        let mut node = *self.index.get(id)?;
        while self.parent[node] != node {
            node = self.parent[node];
        }
        Some(&self.names[node])
    }

    pub fn connected(&self, a: &str, b: &str) -> bool {
        match (self.root(a), self.root(b)) {
            (Some(ra), Some(rb)) => ra == rb,
            _ => false,
        }
    }

    /// Number of distinct roots. Every root is itself a registered element,
    /// so this is the count of self-parented slots.
    pub fn count_disjoint_sets(&self) -> usize {
        self.parent.iter().enumerate().filter(|(i, p)| *i == **p).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_id_is_none() {
        let mut f = DisjointSetForest::new(["a"]);
        assert_eq!(f.find("zzz"), None);
        assert!(!f.union("a", "zzz"));
    }

    #[test]
    fn union_attaches_first_root_under_second() {
        let mut f = DisjointSetForest::new(["a", "b", "c"]);
        assert!(f.union("a", "b"));
        assert_eq!(f.find("a").as_deref(), Some("b"));
        assert!(f.union("b", "c"));
        assert_eq!(f.find("a").as_deref(), Some("c"));
    }

    #[test]
    fn compression_flattens_chain() {
        let mut f = DisjointSetForest::new(["a", "b", "c", "d"]);
        f.union("a", "b");
        f.union("b", "c");
        f.union("c", "d");
        f.find("a");
        assert!(f.parent.iter().all(|&p| p == 3));
    }
}
