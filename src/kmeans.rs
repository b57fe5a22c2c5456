//! One-dimensional k-means over call durations
//!
//! Groups durations into latency tiers by magnitude. Initialization is seeded
//! k-means++ so a fixed input and seed always produce the same clustering.
//! Group ids are not ordered by magnitude; use `report::rank_by_centroid`
//! to order them.

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default bound on Lloyd iterations
pub const DEFAULT_MAX_ITERATIONS: usize = 300;

/// Errors for invalid clustering requests
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("Invalid cluster count: {0} (must be >= 1)")]
    InvalidClusterCount(usize),

    #[error("Cannot cluster an empty duration list")]
    EmptyInput,

    #[error("Cluster count {k} exceeds the number of durations ({durations})")]
    TooManyClusters { k: usize, durations: usize },

    #[error("Invalid iteration bound: {0} (must be >= 1)")]
    InvalidIterationBound(usize),
}

/// Result type for clustering operations
pub type Result<T> = std::result::Result<T, ClusterError>;

/// Outcome of a clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// Group id per input value, same order as the input
    pub assignments: Vec<usize>,
    /// Centroid (mean duration in ns) per group id
    pub centroids: Vec<f64>,
    /// Lloyd iterations performed
    pub iterations: usize,
    /// False when the iteration bound was hit before assignments settled
    pub converged: bool,
}

impl Clustering {
    /// Number of groups
    pub fn k(&self) -> usize {
        self.centroids.len()
    }
}

/// K-means estimator configuration
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    seed: u64,
    max_iterations: usize,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            seed: 0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Partition durations into k groups
    pub fn fit(&self, durations: &[u64]) -> Result<Clustering> {
        if self.k < 1 {
            return Err(ClusterError::InvalidClusterCount(self.k));
        }
        if durations.is_empty() {
            return Err(ClusterError::EmptyInput);
        }
        if self.k > durations.len() {
            return Err(ClusterError::TooManyClusters {
                k: self.k,
                durations: durations.len(),
            });
        }
        if self.max_iterations < 1 {
            return Err(ClusterError::InvalidIterationBound(self.max_iterations));
        }

        let values: Vec<f64> = durations.iter().map(|&d| d as f64).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut centroids = init_centroids(&values, self.k, &mut rng);
        let mut assignments = vec![0usize; values.len()];
        let mut iterations = 0;
        let mut converged = false;

        for iteration in 1..=self.max_iterations {
            iterations = iteration;
            let changed = assign(&values, &centroids, &mut assignments);
            if !changed && iteration > 1 {
                converged = true;
                break;
            }
            update_centroids(&values, &assignments, &mut centroids);
        }

        if converged {
            tracing::debug!(iterations, k = self.k, "k-means converged");
        } else {
            tracing::warn!(
                max_iterations = self.max_iterations,
                k = self.k,
                "k-means hit the iteration bound before converging"
            );
        }

        Ok(Clustering {
            assignments,
            centroids,
            iterations,
            converged,
        })
    }
}

/// Cluster durations into k groups with the default iteration bound
pub fn cluster(durations: &[u64], k: usize, seed: u64) -> Result<Clustering> {
    KMeans::new(k).with_seed(seed).fit(durations)
}

/// Seeded k-means++ initialization
///
/// `min_dist` holds each value's squared distance to its closest chosen
/// centroid and is only updated against the newest one. When every remaining
/// value coincides with a chosen centroid (fewer distinct values than k) the
/// last centroid fills the remaining slots; ties resolve to the lower id, so
/// those groups stay empty.
fn init_centroids(values: &[f64], k: usize, rng: &mut StdRng) -> Vec<f64> {
    let mut centroids = Vec::with_capacity(k);
    let first = values[rng.gen_range(0..values.len())];
    centroids.push(first);

    let mut min_dist: Vec<f64> = values.iter().map(|&v| (v - first) * (v - first)).collect();

    while centroids.len() < k {
        let dist = match WeightedIndex::new(&min_dist) {
            Ok(dist) => dist,
            Err(_) => {
                let last = centroids[centroids.len() - 1];
                centroids.resize(k, last);
                break;
            }
        };

        let next = values[dist.sample(rng)];
        centroids.push(next);
        for (d, &v) in min_dist.iter_mut().zip(values) {
            *d = d.min((v - next) * (v - next));
        }
    }

    centroids
}

/// Index of the closest centroid, lowest id on ties
fn nearest(value: f64, centroids: &[f64]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (id, &c) in centroids.iter().enumerate() {
        let dist = (value - c).abs();
        if dist < best_dist {
            best = id;
            best_dist = dist;
        }
    }
    best
}

/// Reassign every value; returns true if any assignment changed
fn assign(values: &[f64], centroids: &[f64], assignments: &mut [usize]) -> bool {
    let mut changed = false;
    for (slot, &v) in assignments.iter_mut().zip(values) {
        let group = nearest(v, centroids);
        if *slot != group {
            *slot = group;
            changed = true;
        }
    }
    changed
}

/// Move each centroid to the mean of its members; empty groups keep theirs
fn update_centroids(values: &[f64], assignments: &[usize], centroids: &mut [f64]) {
    let mut sums = vec![0.0; centroids.len()];
    let mut counts = vec![0usize; centroids.len()];

    for (&v, &group) in values.iter().zip(assignments) {
        sums[group] += v;
        counts[group] += 1;
    }

    for (group, centroid) in centroids.iter_mut().enumerate() {
        if counts[group] > 0 {
            *centroid = sums[group] / counts[group] as f64;
        }
    }
}

/// Sorted members of one group with prefix sums for O(log n) distance totals
struct SortedGroup {
    values: Vec<f64>,
    prefix: Vec<f64>,
}

impl SortedGroup {
    fn new(mut values: Vec<f64>) -> Self {
        values.sort_by(|a, b| a.total_cmp(b));
        let mut prefix = Vec::with_capacity(values.len() + 1);
        prefix.push(0.0);
        let mut acc = 0.0;
        for &v in &values {
            acc += v;
            prefix.push(acc);
        }
        Self { values, prefix }
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    /// Sum of |x - y| over all members y
    fn total_distance(&self, x: f64) -> f64 {
        let n = self.values.len();
        let idx = self.values.partition_point(|&v| v < x);
        let below = self.prefix[idx];
        let above = self.prefix[n] - below;
        (x * idx as f64 - below) + (above - x * (n - idx) as f64)
    }
}

/// Mean silhouette coefficient of a 1-D clustering, in [-1, 1]
///
/// Returns 0.0 when fewer than two groups are populated. Members of singleton
/// groups score 0.
pub fn silhouette_score(durations: &[u64], assignments: &[usize], k: usize) -> f64 {
    if durations.is_empty() || durations.len() != assignments.len() {
        return 0.0;
    }

    let mut members: Vec<Vec<f64>> = vec![Vec::new(); k];
    for (&d, &group) in durations.iter().zip(assignments) {
        if group < k {
            members[group].push(d as f64);
        }
    }
    if members.iter().filter(|m| !m.is_empty()).count() < 2 {
        return 0.0;
    }
    let groups: Vec<SortedGroup> = members.into_iter().map(SortedGroup::new).collect();

    let mut total = 0.0;
    let mut scored = 0usize;
    for (&d, &group) in durations.iter().zip(assignments) {
        if group >= k {
            continue;
        }
        scored += 1;
        let x = d as f64;
        let own = &groups[group];
        if own.len() < 2 {
            continue;
        }

        let a = own.total_distance(x) / (own.len() - 1) as f64;
        let b = groups
            .iter()
            .enumerate()
            .filter(|(id, g)| *id != group && g.len() > 0)
            .map(|(_, g)| g.total_distance(x) / g.len() as f64)
            .fold(f64::INFINITY, f64::min);

        let max_ab = a.max(b);
        if max_ab > 0.0 {
            total += (b - a) / max_ab;
        }
    }

    if scored == 0 {
        0.0
    } else {
        total / scored as f64
    }
}
