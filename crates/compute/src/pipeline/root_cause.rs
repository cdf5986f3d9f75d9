//! Correlation search over co-located series.
//!
//! Each candidate is paired with the victim over their common trailing
//! window, both columns are min-max scaled independently and the absolute
//! Pearson coefficient is the candidate's score.

use std::cmp::Ordering;

use disruptor_core::{RootCauseModel, TimeSeries};

use crate::algorithms::stats;

/// Ranking knobs.
#[derive(Debug, Clone, Copy)]
pub struct RootCauseParams {
    /// Scores must be strictly above this to be kept.
    pub min_corr: f64,
    pub top_k: usize,
}

impl Default for RootCauseParams {
    fn default() -> Self {
        Self {
            min_corr: 0.5,
            top_k: 3,
        }
    }
}

/// Absolute correlation of two series over their common trailing window.
///
/// `None` when fewer than two aligned points exist or either side is flat.
pub fn correlation(victim: &[f64], candidate: &[f64]) -> Option<f64> {
    let len = victim.len().min(candidate.len());
    if len < 2 {
        return None;
    }
    let a = stats::min_max_scale(&victim[victim.len() - len..]);
    let b = stats::min_max_scale(&candidate[candidate.len() - len..]);
    stats::pearson(&a, &b).map(f64::abs)
}

/// Rank `pool` against `victim`, best first.
///
/// The victim itself is skipped whether it appears in `pool` by reference
/// or as an equal entity. Ties keep pool order.
pub fn rank(victim: &TimeSeries, pool: &[TimeSeries], params: RootCauseParams) -> Vec<RootCauseModel> {
    let mut scored: Vec<(f64, &TimeSeries)> = pool
        .iter()
        .filter(|c| !std::ptr::eq(*c, victim) && !c.same_entity(victim))
        .filter_map(|c| correlation(&victim.values, &c.values).map(|r| (r, c)))
        .filter(|(r, _)| *r > params.min_corr)
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
    scored.truncate(params.top_k);

    scored
        .into_iter()
        .map(|(r, c)| RootCauseModel {
            metric: c.metric.clone(),
            labels: c.labels.clone(),
            score: stats::round_to(r, 3),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use disruptor_core::{labels, CONTAINER_NAME_LABEL, MACHINE_ID_LABEL};

    const X: [f64; 8] = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
    const Z: [f64; 8] = [1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0];

    fn container(name: &str, values: Vec<f64>) -> TimeSeries {
        TimeSeries::new(
            "cpu",
            labels([(MACHINE_ID_LABEL, "m1"), (CONTAINER_NAME_LABEL, name)]),
            values,
        )
    }

    /// Series whose correlation with `X` is exactly `r`.
    fn correlated(name: &str, r: f64) -> TimeSeries {
        let s = (1.0 - r * r).sqrt();
        container(name, X.iter().zip(Z.iter()).map(|(x, z)| 50.0 + r * x + s * z).collect())
    }

    #[test]
    fn ordering_and_cutoff() {
        let victim = container("victim", X.iter().map(|x| 10.0 + x).collect());
        let pool = vec![
            victim.clone(),
            correlated("a", 0.9),
            correlated("b", 0.6),
            correlated("c", 0.3),
            correlated("d", 0.55),
        ];
        let causes = rank(&pool[0], &pool, RootCauseParams::default());
        let scores: Vec<f64> = causes.iter().map(|c| c.score).collect();
        assert_eq!(scores, vec![0.9, 0.6, 0.55]);
        let names: Vec<_> = causes.iter().filter_map(|c| c.container_name()).collect();
        assert_eq!(names, vec!["a", "b", "d"]);
    }

    #[test]
    fn anti_correlation_counts() {
        let victim = container("victim", X.to_vec());
        let pool = vec![container("inv", X.iter().map(|x| 5.0 - 2.0 * x).collect())];
        let causes = rank(&victim, &pool, RootCauseParams::default());
        assert_eq!(causes.len(), 1);
        assert_eq!(causes[0].score, 1.0);
    }

    #[test]
    fn victim_excluded_by_entity() {
        let victim = container("victim", X.to_vec());
        let pool = vec![victim.clone()];
        assert!(rank(&victim, &pool, RootCauseParams::default()).is_empty());
    }

    #[test]
    fn below_custom_threshold_is_dropped() {
        let victim = container("victim", X.to_vec());
        let pool = vec![correlated("edge", 0.5)];
        let params = RootCauseParams {
            min_corr: 0.6,
            top_k: 3,
        };
        assert!(rank(&victim, &pool, params).is_empty());
    }

    #[test]
    fn unequal_lengths_use_trailing_overlap() {
        let long: Vec<f64> = [vec![100.0, -100.0, 7.0], X.to_vec()].concat();
        assert_eq!(correlation(&long, &X).map(|r| stats::round_to(r, 6)), Some(1.0));
    }

    #[test]
    fn flat_candidate_has_no_correlation() {
        assert_eq!(correlation(&X, &[3.0; 8]), None);
        assert_eq!(correlation(&[1.0], &[1.0]), None);
    }
}
