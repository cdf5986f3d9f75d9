//! Generalized Pareto fit of tail excesses.
//!
//! Maximum likelihood via Grimshaw's reduction: with `t = shape / scale`,
//! the likelihood equations collapse to one scalar equation
//! `w(t) = u(t) * v(t) - 1 = 0`, where
//! `u(t) = mean(1 / (1 + t*y))` and `v(t) = 1 + mean(ln(1 + t*y))`.
//! Every root yields a candidate `shape = v(t) - 1`, `scale = shape / t`;
//! the exponential tail (`shape = 0`, `scale = mean(y)`) is always a
//! candidate too. The candidate with the highest log-likelihood wins.

/// Shapes closer to zero than this are treated as the exponential tail.
pub const SHAPE_EPS: f64 = 1e-8;

/// Grid resolution per side when bracketing roots of `w`.
const GRID_POINTS: usize = 200;
const BISECT_ITERS: usize = 100;

/// Fitted tail parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpdFit {
    pub shape: f64,
    pub scale: f64,
    pub log_likelihood: f64,
}

impl GpdFit {
    /// No excesses observed: a zero-width tail.
    pub const EMPTY: GpdFit = GpdFit {
        shape: 0.0,
        scale: 0.0,
        log_likelihood: f64::NEG_INFINITY,
    };
}

/// Fit a GPD to strictly positive excesses.
pub fn fit(peaks: &[f64]) -> GpdFit {
    let peaks: Vec<f64> = peaks.iter().copied().filter(|y| *y > 0.0 && y.is_finite()).collect();
    if peaks.is_empty() {
        return GpdFit::EMPTY;
    }

    let y_mean = peaks.iter().sum::<f64>() / peaks.len() as f64;
    let mut best = GpdFit {
        shape: 0.0,
        scale: y_mean,
        log_likelihood: log_likelihood(&peaks, 0.0, y_mean),
    };

    if peaks.len() < 2 {
        return best;
    }

    let y_min = peaks.iter().copied().fold(f64::INFINITY, f64::min);
    let y_max = peaks.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if y_max - y_min <= f64::EPSILON * y_max {
        return best;
    }

    let w = |t: f64| {
        let mut u = 0.0;
        let mut v = 0.0;
        for y in &peaks {
            let s = 1.0 + t * y;
            u += 1.0 / s;
            v += s.ln();
        }
        let n = peaks.len() as f64;
        (u / n) * (1.0 + v / n) - 1.0
    };

    // Negative side: t in (-1/y_max, 0), dense near both ends.
    let neg: Vec<f64> = mirrored_unit_grid()
        .into_iter()
        .map(|s| -s / y_max)
        .collect();
    // Positive side: log-spaced up to Grimshaw's upper bound.
    let upper = (2.0 * (y_mean - y_min) / (y_min * y_min)).max(1e3 / y_min);
    let pos = log_grid(1e-8 / y_mean, upper, GRID_POINTS);

    let mut roots = scan_roots(&w, &neg);
    roots.extend(scan_roots(&w, &pos));

    for t in roots {
        if t.abs() < f64::MIN_POSITIVE {
            continue;
        }
        let shape = peaks.iter().map(|y| (1.0 + t * y).ln()).sum::<f64>() / peaks.len() as f64;
        let scale = shape / t;
        if !(scale > 0.0) || !scale.is_finite() {
            continue;
        }
        let ll = log_likelihood(&peaks, shape, scale);
        if ll > best.log_likelihood {
            best = GpdFit {
                shape,
                scale,
                log_likelihood: ll,
            };
        }
    }

    best
}

/// GPD log-likelihood; `-inf` outside the support.
pub fn log_likelihood(peaks: &[f64], shape: f64, scale: f64) -> f64 {
    if !(scale > 0.0) {
        return f64::NEG_INFINITY;
    }
    let n = peaks.len() as f64;
    if shape.abs() < SHAPE_EPS {
        let sum: f64 = peaks.iter().sum();
        return -n * scale.ln() - sum / scale;
    }
    let tau = shape / scale;
    let mut acc = 0.0;
    for y in peaks {
        let z = 1.0 + tau * y;
        if z <= 0.0 {
            return f64::NEG_INFINITY;
        }
        acc += z.ln();
    }
    -n * scale.ln() - (1.0 + 1.0 / shape) * acc
}

/// Points in (0, 1) packed geometrically towards both 0 and 1.
fn mirrored_unit_grid() -> Vec<f64> {
    let half = log_grid(1e-8, 0.5, GRID_POINTS / 2);
    let mut grid: Vec<f64> = half.clone();
    grid.extend(half.iter().rev().map(|s| 1.0 - s));
    grid.sort_by(|a, b| a.total_cmp(b));
    grid.dedup();
    grid
}

/// `count` geometrically spaced points from `lo` to `hi` (both > 0).
fn log_grid(lo: f64, hi: f64, count: usize) -> Vec<f64> {
    if count < 2 || !(hi > lo) || !(lo > 0.0) {
        return vec![lo];
    }
    let (llo, lhi) = (lo.ln(), hi.ln());
    (0..count)
        .map(|k| (llo + (lhi - llo) * k as f64 / (count - 1) as f64).exp())
        .collect()
}

/// Bracket sign changes on the grid and refine each by bisection.
fn scan_roots<F: Fn(f64) -> f64>(f: &F, grid: &[f64]) -> Vec<f64> {
    let mut roots = Vec::new();
    let mut prev: Option<(f64, f64)> = None;
    for &x in grid {
        let fx = f(x);
        if !fx.is_finite() {
            prev = None;
            continue;
        }
        if let Some((px, pf)) = prev {
            if pf == 0.0 {
                roots.push(px);
            } else if pf.signum() != fx.signum() {
                roots.push(bisect(f, px, x, pf));
            }
        }
        prev = Some((x, fx));
    }
    roots
}

fn bisect<F: Fn(f64) -> f64>(f: &F, mut lo: f64, mut hi: f64, mut f_lo: f64) -> f64 {
    for _ in 0..BISECT_ITERS {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if f_mid == 0.0 || !f_mid.is_finite() {
            return mid;
        }
        if f_mid.signum() == f_lo.signum() {
            lo = mid;
            f_lo = f_mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic GPD sample via the inverse CDF at mid-quantiles.
    fn gpd_sample(shape: f64, scale: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let u = (i as f64 + 0.5) / n as f64;
                if shape.abs() < SHAPE_EPS {
                    -scale * (1.0 - u).ln()
                } else {
                    scale / shape * ((1.0 - u).powf(-shape) - 1.0)
                }
            })
            .collect()
    }

    #[test]
    fn empty_peaks() {
        assert_eq!(fit(&[]), GpdFit::EMPTY);
    }

    #[test]
    fn single_peak_is_exponential() {
        let f = fit(&[2.5]);
        assert_eq!(f.shape, 0.0);
        assert_eq!(f.scale, 2.5);
    }

    #[test]
    fn identical_peaks_are_exponential() {
        let f = fit(&[1.0, 1.0, 1.0]);
        assert_eq!(f.shape, 0.0);
        assert!((f.scale - 1.0).abs() < 1e-12);
    }

    #[test]
    fn exponential_sample() {
        let f = fit(&gpd_sample(0.0, 2.0, 400));
        assert!(f.shape.abs() < 0.15, "shape = {}", f.shape);
        assert!((f.scale - 2.0).abs() < 0.4, "scale = {}", f.scale);
    }

    #[test]
    fn heavy_tail_sample() {
        let f = fit(&gpd_sample(0.5, 1.0, 500));
        assert!(f.shape > 0.3 && f.shape < 0.7, "shape = {}", f.shape);
        assert!(f.scale > 0.6 && f.scale < 1.4, "scale = {}", f.scale);
    }

    #[test]
    fn bounded_tail_sample() {
        let f = fit(&gpd_sample(-0.3, 1.0, 500));
        assert!(f.shape < -0.1, "shape = {}", f.shape);
    }

    #[test]
    fn best_candidate_beats_exponential() {
        let peaks = gpd_sample(0.5, 1.0, 300);
        let f = fit(&peaks);
        let mean = peaks.iter().sum::<f64>() / peaks.len() as f64;
        assert!(f.log_likelihood >= log_likelihood(&peaks, 0.0, mean));
    }

    #[test]
    fn log_likelihood_outside_support() {
        assert_eq!(log_likelihood(&[1.0, 5.0], -0.5, 1.0), f64::NEG_INFINITY);
        assert_eq!(log_likelihood(&[1.0], 0.2, 0.0), f64::NEG_INFINITY);
    }
}
