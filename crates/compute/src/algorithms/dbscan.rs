//! Density-based noise labeling for one-dimensional metric series.
//!
//! DBSCAN over scalar samples: points are sorted once so every
//! eps-neighborhood is a contiguous range, then clusters are grown from
//! core points breadth-first. Every clustered point is part of the bulk
//! distribution and gets label [`BULK`]; unclustered points get [`NOISE`].
//! A quantized metric forms several dense clusters, all of them bulk.
//!
//! The detector calibrates the tail model on `BULK` points only.

use std::collections::VecDeque;

use tracing::debug;

use super::stats;

/// Label for points inside a dense cluster.
pub const BULK: i32 = 0;
/// Label for points outside every dense cluster.
pub const NOISE: i32 = -1;

/// Lower bound on the number of neighbors (self included) of a core point.
const MIN_PTS_FLOOR: usize = 3;
/// A core point needs roughly this many minutes worth of close samples.
const DENSE_MINUTES: f64 = 2.0;
/// Neighborhood radius in robust standard deviations.
const EPS_SIGMAS: f64 = 3.0;
/// Radius floor in plain standard deviations; binds when the MAD is zero.
const EPS_STD_FLOOR: f64 = 0.5;
/// Radius floor relative to the median level.
const EPS_REL_FLOOR: f64 = 0.01;
const EPS_ABS_FLOOR: f64 = 1e-9;
/// Scales the median absolute deviation to a normal-consistent sigma.
const MAD_TO_SIGMA: f64 = 1.4826;

/// Result of labeling one sequence.
#[derive(Debug, Clone)]
pub struct DbscanResult {
    /// One label per input point, in input order.
    pub labels: Vec<i32>,
    /// Total number of clusters found.
    pub num_clusters: usize,
    pub eps: f64,
    pub min_pts: usize,
}

impl DbscanResult {
    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }
}

/// Stateless sequence labeler configured for one window shape.
#[derive(Debug, Clone, Copy)]
pub struct Dbscan {
    /// Minutes covered by the series.
    look_back: u32,
    /// Trailing points that will be scored; they must be core points to
    /// count as bulk.
    obs_size: usize,
}

impl Dbscan {
    pub fn new(look_back: u32, obs_size: usize) -> Self {
        Self { look_back, obs_size }
    }

    /// Label each value: `0` for bulk, [`NOISE`] otherwise.
    pub fn detect(&self, values: &[f64]) -> Vec<i32> {
        self.fit(values).labels
    }

    pub fn fit(&self, values: &[f64]) -> DbscanResult {
        let n = values.len();
        if n == 0 {
            return DbscanResult {
                labels: Vec::new(),
                num_clusters: 0,
                eps: 0.0,
                min_pts: MIN_PTS_FLOOR,
            };
        }

        let eps = neighborhood_radius(values);
        let min_pts = self.min_pts(n);
        let (clusters, is_core) = dbscan_1d(values, eps, min_pts);

        let num_clusters = clusters.iter().flatten().map(|&c| c + 1).max().unwrap_or(0);

        // Border points inside the scored window stay out of calibration.
        let tail_start = n.saturating_sub(self.obs_size);
        let labels: Vec<i32> = clusters
            .iter()
            .enumerate()
            .map(|(i, cluster)| match cluster {
                Some(_) if i < tail_start || is_core[i] => BULK,
                _ => NOISE,
            })
            .collect();

        debug!(
            points = n,
            eps,
            min_pts,
            clusters = num_clusters,
            noise = labels.iter().filter(|&&l| l != BULK).count(),
            "density labeling complete"
        );

        DbscanResult {
            labels,
            num_clusters,
            eps,
            min_pts,
        }
    }

    /// Core threshold scales with sampling density.
    fn min_pts(&self, n: usize) -> usize {
        let per_minute = n as f64 / f64::from(self.look_back.max(1));
        let wanted = (per_minute * DENSE_MINUTES).ceil() as usize;
        let cap = (n / 10).max(MIN_PTS_FLOOR);
        wanted.clamp(MIN_PTS_FLOOR, cap)
    }
}

/// Radius from the median absolute deviation, floored by the standard
/// deviation and the median level.
fn neighborhood_radius(values: &[f64]) -> f64 {
    let med = stats::median(values).unwrap_or(0.0);
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    let mad = stats::median(&deviations).unwrap_or(0.0);
    (EPS_SIGMAS * MAD_TO_SIGMA * mad)
        .max(EPS_STD_FLOOR * stats::std_dev(values))
        .max(EPS_REL_FLOOR * med.abs())
        .max(EPS_ABS_FLOOR)
}

/// Run DBSCAN on scalar values.
///
/// Returns the cluster of each point (`None` for noise) and whether the
/// point is a core point.
pub fn dbscan_1d(values: &[f64], eps: f64, min_pts: usize) -> (Vec<Option<usize>>, Vec<bool>) {
    let n = values.len();
    if n == 0 {
        return (Vec::new(), Vec::new());
    }

    // Sorted order makes every neighborhood a contiguous range [lo, hi].
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let sorted: Vec<f64> = order.iter().map(|&i| values[i]).collect();

    let mut ranges = vec![(0usize, 0usize); n];
    let mut lo = 0usize;
    let mut hi = 0usize;
    for p in 0..n {
        while sorted[p] - sorted[lo] > eps {
            lo += 1;
        }
        if hi < p {
            hi = p;
        }
        while hi + 1 < n && sorted[hi + 1] - sorted[p] <= eps {
            hi += 1;
        }
        ranges[p] = (lo, hi);
    }

    let core: Vec<bool> = ranges.iter().map(|&(l, h)| h - l + 1 >= min_pts).collect();

    let mut labels: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut current_cluster = 0usize;

    for p in 0..n {
        if visited[p] {
            continue;
        }
        visited[p] = true;

        if !core[p] {
            // Not a core point; tentatively noise (may be claimed by a cluster later).
            continue;
        }

        labels[p] = Some(current_cluster);
        let (l, h) = ranges[p];
        let mut queue: VecDeque<usize> = (l..=h).filter(|&q| q != p).collect();

        while let Some(q) = queue.pop_front() {
            if labels[q].is_none() {
                labels[q] = Some(current_cluster);
            }

            if visited[q] {
                continue;
            }
            visited[q] = true;

            if core[q] {
                let (l, h) = ranges[q];
                queue.extend((l..=h).filter(|&r| labels[r].is_none()));
            }
        }

        current_cluster += 1;
    }

    // Map back from sorted positions to input order.
    let mut clusters = vec![None; n];
    let mut is_core = vec![false; n];
    for (pos, &idx) in order.iter().enumerate() {
        clusters[idx] = labels[pos];
        is_core[idx] = core[pos];
    }
    (clusters, is_core)
}
