//! K-means over frequency vectors with cosine similarity as closeness.
//!
//! - Initialization: k samples drawn uniformly with replacement
//! - Assignment: highest similarity wins; ties go to the earlier centroid
//! - Update: merge members then integer-divide by member count; an empty
//!   cluster keeps its previous centroid
//! - Convergence: new centroids equal the previous ones, or `max_iterations`
//!
//! Truncating division quantizes centroids, so exact equality may never be
//! reached. The iteration cap is what guarantees termination.

use crate::error::{Result, SimError};
use crate::similarity::cosine_similarity;
use crate::vector::FrequencyVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const DEFAULT_K: usize = 10;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub k: usize,
    pub max_iterations: usize,
    /// Fixed seed for reproducible initialization.
    pub seed: Option<u64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self { k: DEFAULT_K, max_iterations: DEFAULT_MAX_ITERATIONS, seed: None }
    }
}

/// A centroid and the indices (into the clustered slice) of its members.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub centroid: FrequencyVector,
    pub members: Vec<usize>,
}

impl Cluster {
    pub fn member_vectors<'a>(&'a self, data: &'a [FrequencyVector]) -> impl Iterator<Item = &'a FrequencyVector> {
        self.members.iter().map(move |&i| &data[i])
    }
}

#[derive(Debug, Clone)]
pub struct ClusterRun {
    /// Non-empty clusters only.
    pub clusters: Vec<Cluster>,
    /// All k final centroids, usable to seed another run.
    pub centroids: Vec<FrequencyVector>,
    pub iterations: usize,
    pub converged: bool,
}

impl ClusterRun {
    fn empty() -> Self {
        Self { clusters: Vec::new(), centroids: Vec::new(), iterations: 0, converged: true }
    }

    /// Index into `clusters` of the cluster holding data point `point`.
    pub fn cluster_of(&self, point: usize) -> Option<usize> {
        self.clusters.iter().position(|c| c.members.contains(&point))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Clusterer {
    config: ClusterConfig,
}

impl Clusterer {
    pub fn new(config: ClusterConfig) -> Self { Self { config } }

    pub fn config(&self) -> &ClusterConfig { &self.config }

    /// Cluster `data` from k randomly sampled starting centroids.
    pub fn run(&self, data: &[FrequencyVector]) -> Result<ClusterRun> {
        self.validate()?;
        if data.is_empty() {
            return Ok(ClusterRun::empty());
        }
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let initial = (0..self.config.k)
            .map(|_| data[rng.random_range(0..data.len())].clone())
            .collect();
        self.run_from(initial, data)
    }

    /// Cluster `data` starting from explicit centroids.
    pub fn run_from(&self, mut centroids: Vec<FrequencyVector>, data: &[FrequencyVector]) -> Result<ClusterRun> {
        self.validate()?;
        if centroids.is_empty() || centroids.len() > self.config.k {
            return Err(SimError::invalid(format!(
                "expected between 1 and {} starting centroids, got {}",
                self.config.k,
                centroids.len()
            )));
        }
        if data.is_empty() {
            return Ok(ClusterRun::empty());
        }

        let mut assignment = Vec::new();
        let mut iterations = 0;
        let mut converged = false;
        while iterations < self.config.max_iterations {
            iterations += 1;
            assignment = assign(&centroids, data);
            let next = update(&centroids, &assignment, data)?;
            converged = next == centroids;
            centroids = next;
            if converged {
                break;
            }
        }

        if !converged {
            tracing::warn!(iterations, k = centroids.len(), "k-means stopped at iteration cap before converging");
        } else {
            tracing::debug!(iterations, k = centroids.len(), "k-means converged");
        }

        let clusters = centroids
            .iter()
            .zip(assignment)
            .filter(|(_, members)| !members.is_empty())
            .map(|(c, members)| Cluster { centroid: c.clone(), members })
            .collect();

        Ok(ClusterRun { clusters, centroids, iterations, converged })
    }

    fn validate(&self) -> Result<()> {
        if self.config.k == 0 {
            return Err(SimError::invalid("cluster count k must be at least 1"));
        }
        if self.config.max_iterations == 0 {
            return Err(SimError::invalid("max_iterations must be at least 1"));
        }
        Ok(())
    }
}

/// Member indices per centroid.
fn assign(centroids: &[FrequencyVector], data: &[FrequencyVector]) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); centroids.len()];
    for (i, point) in data.iter().enumerate() {
        let mut best = 0;
        let mut best_sim = f64::NEG_INFINITY;
        for (c, centroid) in centroids.iter().enumerate() {
            let sim = cosine_similarity(point, centroid);
            if sim > best_sim {
                best_sim = sim;
                best = c;
            }
        }
        groups[best].push(i);
    }
    groups
}

fn update(
    previous: &[FrequencyVector],
    groups: &[Vec<usize>],
    data: &[FrequencyVector],
) -> Result<Vec<FrequencyVector>> {
    previous
        .iter()
        .zip(groups)
        .map(|(prev, members)| {
            if members.is_empty() {
                return Ok(prev.clone());
            }
            let mut centroid = FrequencyVector::new();
            for &i in members {
                centroid.merge(&data[i]);
            }
            centroid.divide(members.len() as u32)?;
            Ok(centroid)
        })
        .collect()
}
