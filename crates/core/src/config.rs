use std::env;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{DisruptorError, Result};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_parse<T: FromStr>(profile: &str, key: &str, default: T) -> T {
    profiled_env_opt(profile, key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Split a comma-separated metric list, dropping blanks.
pub fn parse_metric_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accept either `"a,b,c"` or `["a", "b", "c"]`.
fn deserialize_metric_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MetricList {
        Joined(String),
        List(Vec<String>),
    }

    Ok(match MetricList::deserialize(deserializer)? {
        MetricList::Joined(s) => parse_metric_list(&s),
        MetricList::List(v) => v
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    })
}

// ── Detector ──────────────────────────────────────────────────

/// Settings for the disruption detector, built once and handed to the facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Auxiliary metrics whose trend is attached to every finding.
    #[serde(default, deserialize_with = "deserialize_metric_list")]
    pub extra_metrics: Vec<String>,
    /// Spot risk parameter (target false-alarm rate).
    #[serde(default = "default_q")]
    pub q: f64,
    /// Spot calibration quantile.
    #[serde(default = "default_level")]
    pub level: f64,
    /// Reserved smoothing window; carried through but not applied.
    #[serde(default = "default_smooth_win")]
    pub smooth_win: usize,
    /// Minimum `len / expected_point_length` for a series to be scored.
    #[serde(default = "default_valid_length_ratio")]
    pub valid_length_ratio: f64,
    /// Candidates must correlate strictly above this to count as root causes.
    #[serde(default = "default_root_cause_min_corr")]
    pub root_cause_min_corr: f64,
    #[serde(default = "default_root_cause_top_k")]
    pub root_cause_top_k: usize,
    /// Rank co-located containers for every finding during detection.
    #[serde(default = "default_attach_root_causes")]
    pub attach_root_causes: bool,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
}

fn default_q() -> f64 { 1e-3 }
fn default_level() -> f64 { 0.98 }
fn default_smooth_win() -> usize { 3 }
fn default_valid_length_ratio() -> f64 { 0.6 }
fn default_root_cause_min_corr() -> f64 { 0.5 }
fn default_root_cause_top_k() -> usize { 3 }
fn default_attach_root_causes() -> bool { true }

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            extra_metrics: Vec::new(),
            q: default_q(),
            level: default_level(),
            smooth_win: default_smooth_win(),
            valid_length_ratio: default_valid_length_ratio(),
            root_cause_min_corr: default_root_cause_min_corr(),
            root_cause_top_k: default_root_cause_top_k(),
            attach_root_causes: default_attach_root_causes(),
            normalizer: NormalizerConfig::default(),
        }
    }
}

impl DetectorConfig {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `DISRUPTOR_PROFILE`; when set, every key is first
    /// looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("DISRUPTOR_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        let d = Self::default();
        Self {
            extra_metrics: profiled_env_opt(p, "DISRUPTOR_EXTRA_METRICS")
                .map(|s| parse_metric_list(&s))
                .unwrap_or(d.extra_metrics),
            q: profiled_env_parse(p, "DISRUPTOR_SPOT_Q", d.q),
            level: profiled_env_parse(p, "DISRUPTOR_SPOT_LEVEL", d.level),
            smooth_win: profiled_env_parse(p, "DISRUPTOR_SMOOTH_WIN", d.smooth_win),
            valid_length_ratio: profiled_env_parse(
                p,
                "DISRUPTOR_VALID_LENGTH_RATIO",
                d.valid_length_ratio,
            ),
            root_cause_min_corr: profiled_env_parse(
                p,
                "DISRUPTOR_ROOT_CAUSE_MIN_CORR",
                d.root_cause_min_corr,
            ),
            root_cause_top_k: profiled_env_parse(p, "DISRUPTOR_ROOT_CAUSE_TOP_K", d.root_cause_top_k),
            attach_root_causes: profiled_env_parse(
                p,
                "DISRUPTOR_ATTACH_ROOT_CAUSES",
                d.attach_root_causes,
            ),
            normalizer: NormalizerConfig {
                offset: profiled_env_parse(p, "DISRUPTOR_NORMALIZE_OFFSET", d.normalizer.offset),
                scale: profiled_env_parse(p, "DISRUPTOR_NORMALIZE_SCALE", d.normalizer.scale),
                lower: profiled_env_opt(p, "DISRUPTOR_NORMALIZE_LOWER").and_then(|v| v.parse().ok()),
                upper: profiled_env_opt(p, "DISRUPTOR_NORMALIZE_UPPER").and_then(|v| v.parse().ok()),
            },
        }
    }

    /// Apply a per-request override blob on top of this config.
    ///
    /// Only keys present in `extra` change; unknown keys are ignored.
    pub fn with_overrides(&self, extra: &Value) -> Result<Self> {
        let overrides = match extra {
            Value::Null => return Ok(self.clone()),
            Value::Object(map) => map,
            other => {
                return Err(DisruptorError::Configuration(format!(
                    "extra config must be an object, got {other}"
                )))
            }
        };

        let mut merged = serde_json::to_value(self)?;
        if let Value::Object(base) = &mut merged {
            for (k, v) in overrides {
                if base.contains_key(k) {
                    base.insert(k.clone(), v.clone());
                }
            }
        }
        let cfg: Self = serde_json::from_value(merged)
            .map_err(|e| DisruptorError::Configuration(format!("invalid extra config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.q > 0.0 && self.q < 1.0) {
            return Err(DisruptorError::Configuration(format!(
                "q must be in (0, 1), got {}",
                self.q
            )));
        }
        if !(self.level > 0.0 && self.level < 1.0) {
            return Err(DisruptorError::Configuration(format!(
                "level must be in (0, 1), got {}",
                self.level
            )));
        }
        if let (Some(lo), Some(hi)) = (self.normalizer.lower, self.normalizer.upper) {
            if lo > hi {
                return Err(DisruptorError::Configuration(format!(
                    "normalizer band is inverted: lower={lo} > upper={hi}"
                )));
            }
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Detector config loaded:");
        tracing::info!("  spot:        q={}, level={}", self.q, self.level);
        tracing::info!(
            "  window:      min_length_ratio={}, smooth_win={} (unused)",
            self.valid_length_ratio,
            self.smooth_win
        );
        tracing::info!(
            "  root_cause:  min_corr={}, top_k={}, attach={}",
            self.root_cause_min_corr,
            self.root_cause_top_k,
            self.attach_root_causes
        );
        tracing::info!("  extra:       {}", self.extra_metrics.join(","));
    }
}

// ── Normalizer ────────────────────────────────────────────────

/// Unit-preserving conditioning applied to the observation window.
///
/// `(x - offset) / scale`, optionally clamped to `[lower, upper]` first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    #[serde(default)]
    pub offset: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
}

fn default_scale() -> f64 { 1.0 }

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            offset: 0.0,
            scale: default_scale(),
            lower: None,
            upper: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = DetectorConfig::default();
        assert_eq!(cfg.q, 1e-3);
        assert_eq!(cfg.level, 0.98);
        assert_eq!(cfg.smooth_win, 3);
        assert!(cfg.extra_metrics.is_empty());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn extra_metrics_comma_separated() {
        let cfg: DetectorConfig = serde_json::from_value(serde_json::json!({
            "extra_metrics": "container_memory_usage, container_network_rx ,,"
        }))
        .unwrap();
        assert_eq!(
            cfg.extra_metrics,
            vec!["container_memory_usage", "container_network_rx"]
        );
        assert_eq!(cfg.level, 0.98);
    }

    #[test]
    fn extra_metrics_as_list() {
        let cfg: DetectorConfig = serde_json::from_value(serde_json::json!({
            "extra_metrics": ["a", " b "]
        }))
        .unwrap();
        assert_eq!(cfg.extra_metrics, vec!["a", "b"]);
    }

    #[test]
    fn overrides_merge_known_keys() {
        let base = DetectorConfig::default();
        let cfg = base
            .with_overrides(&serde_json::json!({"q": 0.01, "unknown": 1, "extra_metrics": "x"}))
            .unwrap();
        assert_eq!(cfg.q, 0.01);
        assert_eq!(cfg.level, base.level);
        assert_eq!(cfg.extra_metrics, vec!["x"]);

        assert_eq!(base.with_overrides(&Value::Null).unwrap(), base);
    }

    #[test]
    fn overrides_reject_bad_values() {
        let base = DetectorConfig::default();
        assert!(base.with_overrides(&serde_json::json!({"level": 1.5})).is_err());
        assert!(base.with_overrides(&serde_json::json!("nope")).is_err());
    }

    #[test]
    fn profiled_env_lookup() {
        env::set_var("CFGTEST_DISRUPTOR_SPOT_Q", "0.005");
        env::set_var("CFGTEST_DISRUPTOR_EXTRA_METRICS", "mem,net");
        let cfg = DetectorConfig::for_profile("cfgtest");
        assert_eq!(cfg.q, 0.005);
        assert_eq!(cfg.extra_metrics, vec!["mem", "net"]);
        env::remove_var("CFGTEST_DISRUPTOR_SPOT_Q");
        env::remove_var("CFGTEST_DISRUPTOR_EXTRA_METRICS");
    }

    #[test]
    fn parse_metric_list_trims() {
        assert_eq!(parse_metric_list(" a ,b,, c"), vec!["a", "b", "c"]);
        assert!(parse_metric_list("").is_empty());
    }
}
