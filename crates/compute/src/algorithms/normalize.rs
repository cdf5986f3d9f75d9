//! Observation-window conditioning.
//!
//! The Spot model is calibrated on raw training values, so the transform
//! applied to the scored window must stay in the same units: an optional
//! clamp into a configured band followed by a configured affine map
//! `(x - offset) / scale`. The identity map is the default.

use serde::Serialize;

use disruptor_core::NormalizerConfig;

/// Parameters actually used by one [`Normalizer::transform`] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizeParams {
    pub offset: f64,
    pub scale: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    /// `max - min` of the input window.
    pub spread: f64,
    /// Number of values moved by the clamp.
    pub clipped: usize,
    /// False when the input was returned unchanged.
    pub applied: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Transform a window. Pure; never fails.
    ///
    /// The affine map divides by `scale` only, so a constant window is mapped
    /// like any other. A zero scale returns the input unchanged with
    /// `applied = false`.
    pub fn transform(&self, values: &[f64], clip: bool) -> (Vec<f64>, NormalizeParams) {
        let (lo, hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let spread = if values.is_empty() { 0.0 } else { hi - lo };

        let mut params = NormalizeParams {
            offset: self.config.offset,
            scale: self.config.scale,
            lower: if clip { self.config.lower } else { None },
            upper: if clip { self.config.upper } else { None },
            spread,
            clipped: 0,
            applied: false,
        };

        if self.config.scale.abs() <= f64::EPSILON {
            return (values.to_vec(), params);
        }

        let mut clipped = 0usize;
        let out = values
            .iter()
            .map(|&v| {
                let mut x = v;
                if let Some(lower) = params.lower {
                    x = x.max(lower);
                }
                if let Some(upper) = params.upper {
                    x = x.min(upper);
                }
                if x != v {
                    clipped += 1;
                }
                (x - self.config.offset) / self.config.scale
            })
            .collect();

        params.clipped = clipped;
        params.applied = true;
        (out, params)
    }

    /// Undo the affine part of a transform. Clamped values stay clamped.
    pub fn inverse(values: &[f64], params: &NormalizeParams) -> Vec<f64> {
        if !params.applied {
            return values.to_vec();
        }
        values
            .iter()
            .map(|v| v * params.scale + params.offset)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banded(lower: f64, upper: f64) -> Normalizer {
        Normalizer::new(NormalizerConfig {
            lower: Some(lower),
            upper: Some(upper),
            ..NormalizerConfig::default()
        })
    }

    #[test]
    fn default_is_identity() {
        let n = Normalizer::default();
        let (out, params) = n.transform(&[10.0, 10.0, 50.0], false);
        assert_eq!(out, vec![10.0, 10.0, 50.0]);
        assert!(params.applied);
        assert_eq!(params.spread, 40.0);
    }

    #[test]
    fn constant_window_is_mapped_like_its_neighbors() {
        let n = Normalizer::new(NormalizerConfig {
            offset: 5.0,
            scale: 1.0,
            ..NormalizerConfig::default()
        });
        let (flat, flat_params) = n.transform(&[12.0, 12.0, 12.0], false);
        let (bumped, bumped_params) = n.transform(&[12.0, 12.0, 12.000001], false);

        assert_eq!(flat, vec![7.0, 7.0, 7.0]);
        assert!(flat_params.applied);
        assert_eq!(flat_params.spread, 0.0);
        assert!(bumped_params.applied);
        for (a, b) in flat.iter().zip(&bumped) {
            assert!((a - b).abs() < 1e-5, "{flat:?} vs {bumped:?}");
        }
    }

    #[test]
    fn clip_only_when_requested() {
        let n = banded(0.0, 100.0);
        let (out, params) = n.transform(&[-5.0, 50.0, 150.0], true);
        assert_eq!(out, vec![0.0, 50.0, 100.0]);
        assert_eq!(params.clipped, 2);

        let (out, params) = n.transform(&[-5.0, 50.0, 150.0], false);
        assert_eq!(out, vec![-5.0, 50.0, 150.0]);
        assert_eq!(params.clipped, 0);
        assert_eq!(params.lower, None);
    }

    #[test]
    fn affine_map_inverts() {
        let n = Normalizer::new(NormalizerConfig {
            offset: 1.0,
            scale: 4.0,
            ..NormalizerConfig::default()
        });
        let input = [1.0, 5.0, 9.0];
        let (out, params) = n.transform(&input, false);
        assert_eq!(out, vec![0.0, 1.0, 2.0]);
        assert_eq!(Normalizer::inverse(&out, &params), input.to_vec());
    }

    #[test]
    fn zero_scale_guarded() {
        let n = Normalizer::new(NormalizerConfig {
            scale: 0.0,
            ..NormalizerConfig::default()
        });
        let (out, params) = n.transform(&[1.0, 2.0], false);
        assert_eq!(out, vec![1.0, 2.0]);
        assert!(!params.applied);
    }
}
