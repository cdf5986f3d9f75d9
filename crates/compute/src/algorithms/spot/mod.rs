//! Streaming Peaks-Over-Threshold detector (SPOT).
//!
//! Calibration picks an initial threshold `t1` at the `level` quantile of
//! the training sample, fits a Generalized Pareto tail to the excesses over
//! `t1` and derives the extreme threshold
//!
//! ```text
//! zq = t1 + (scale / shape) * ((q * n / Nt)^(-shape) - 1)     shape != 0
//! zq = t1 - scale * ln(q * n / Nt)                            shape == 0
//! ```
//!
//! Scoring walks the test window once. Points above `zq` alarm and are kept
//! out of the model; points in `(t1, zq]` become new peaks and trigger a
//! refit; anything else only grows `n`.
//!
//! Sub-modules:
//! - [`gpd`]: maximum-likelihood GPD fit

pub mod gpd;

use thiserror::Error;
use tracing::debug;

use super::stats;
use gpd::{GpdFit, SHAPE_EPS};

/// Default risk parameter.
pub const DEFAULT_Q: f64 = 1e-3;
/// Default calibration quantile.
pub const DEFAULT_LEVEL: f64 = 0.98;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpotError {
    #[error("calibration sample is empty")]
    EmptyCalibration,
    #[error("risk parameter q must be in (0, 1), got {0}")]
    InvalidRisk(f64),
    #[error("run called before initialize")]
    NotInitialized,
}

/// Output of [`Spot::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpotOutput {
    /// Threshold in effect when each test point was evaluated.
    pub thresholds: Vec<f64>,
    /// Indices of alarmed test points.
    pub alarms: Vec<usize>,
}

impl SpotOutput {
    pub fn alarm_count(&self) -> usize {
        self.alarms.len()
    }
}

/// Calibration state. Built per scoring call and never persisted.
#[derive(Debug, Clone)]
pub struct Spot {
    q: f64,
    level: f64,
    init_threshold: f64,
    extreme_quantile: f64,
    peaks: Vec<f64>,
    fit: GpdFit,
    /// Points seen so far (calibration plus in-model test points).
    n: usize,
    /// Excesses over `init_threshold` seen so far.
    nt: usize,
    initialized: bool,
}

impl Spot {
    pub fn new(q: f64) -> Result<Self, SpotError> {
        if !(q > 0.0 && q < 1.0) {
            return Err(SpotError::InvalidRisk(q));
        }
        Ok(Self {
            q,
            level: DEFAULT_LEVEL,
            init_threshold: f64::NAN,
            extreme_quantile: f64::NAN,
            peaks: Vec::new(),
            fit: GpdFit::EMPTY,
            n: 0,
            nt: 0,
            initialized: false,
        })
    }

    /// Level actually used for a calibration sample of size `n`.
    ///
    /// When fewer than one point would exceed the quantile, the level is
    /// lowered so that at least two calibration peaks exist.
    pub fn adjusted_level(n: usize, level: f64) -> f64 {
        if n == 0 {
            return level;
        }
        let n_f = n as f64;
        if (n_f * (1.0 - level)).floor() == 0.0 {
            1.0 - 2.0 / n_f - 1e-6
        } else {
            level
        }
    }

    /// Calibrate on a cleaned historical sample.
    pub fn initialize(&mut self, train_data: &[f64], level: f64) -> Result<(), SpotError> {
        if train_data.is_empty() {
            return Err(SpotError::EmptyCalibration);
        }

        let n = train_data.len();
        let requested = level;
        let level = Self::adjusted_level(n, requested);
        if level != requested {
            debug!(n, requested, level, "calibration level adjusted for short sample");
        }

        let mut sorted = train_data.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let t1 = stats::quantile_sorted(&sorted, level);

        self.peaks = sorted.iter().filter(|&&x| x > t1).map(|x| x - t1).collect();
        self.level = level;
        self.init_threshold = t1;
        self.n = n;
        self.nt = self.peaks.len();
        self.fit = gpd::fit(&self.peaks);
        self.extreme_quantile = self.threshold();
        self.initialized = true;

        debug!(
            n,
            level,
            t1,
            peaks = self.nt,
            shape = self.fit.shape,
            scale = self.fit.scale,
            zq = self.extreme_quantile,
            "spot calibrated"
        );
        Ok(())
    }

    /// Score a test window point by point, adapting as it goes.
    ///
    /// With `with_alarm = false`, points above `zq` are absorbed as peaks
    /// instead of alarming.
    pub fn run(&mut self, test_data: &[f64], with_alarm: bool) -> Result<SpotOutput, SpotError> {
        if !self.initialized {
            return Err(SpotError::NotInitialized);
        }

        let mut thresholds = Vec::with_capacity(test_data.len());
        let mut alarms = Vec::new();

        for (i, &x) in test_data.iter().enumerate() {
            thresholds.push(self.extreme_quantile);

            if x > self.extreme_quantile && with_alarm {
                alarms.push(i);
                continue;
            }

            if x > self.init_threshold {
                self.peaks.push(x - self.init_threshold);
                self.nt += 1;
                self.n += 1;
                self.fit = gpd::fit(&self.peaks);
                self.extreme_quantile = self.threshold();
            } else {
                self.n += 1;
            }
        }

        Ok(SpotOutput { thresholds, alarms })
    }

    /// POT threshold from the current fit.
    fn threshold(&self) -> f64 {
        let t1 = self.init_threshold;
        if self.nt == 0 || !(self.fit.scale > 0.0) {
            return t1;
        }
        let r = self.q * self.n as f64 / self.nt as f64;
        let (shape, scale) = (self.fit.shape, self.fit.scale);
        if shape.abs() < SHAPE_EPS {
            t1 - scale * r.ln()
        } else {
            t1 + (scale / shape) * (r.powf(-shape) - 1.0)
        }
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn init_threshold(&self) -> f64 {
        self.init_threshold
    }

    pub fn extreme_quantile(&self) -> f64 {
        self.extreme_quantile
    }

    pub fn peak_count(&self) -> usize {
        self.nt
    }

    pub fn sample_count(&self) -> usize {
        self.n
    }

    pub fn fit(&self) -> GpdFit {
        self.fit
    }
}
