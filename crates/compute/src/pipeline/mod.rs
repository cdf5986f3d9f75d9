//! Per-(machine, KPI) disruption detection.
//!
//! [`DisruptionDetector`] fetches one metric's series through a
//! [`MetricLoader`], scores every container independently and builds an
//! [`AnomalyModel`] for each one whose alarm ratio reaches the KPI threshold.
//!
//! Scoring one series:
//! 1. Reject short or degenerate series (score `0`).
//! 2. Label the whole series with the density denoiser; bulk points form
//!    the calibration sample.
//! 3. Take the raw trailing `obs_size` points as the observation window and
//!    condition them with the normalizer.
//! 4. Calibrate Spot on the calibration sample and stream the window through it.
//! 5. `score = alarms / obs_size`.
//!
//! Sub-modules:
//! - [`root_cause`]: correlation ranking of co-located series
//! - [`trend`]: relative change of auxiliary metrics

pub mod root_cause;
pub mod trend;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use disruptor_core::{
    AnomalyDetails, AnomalyModel, DetectorConfig, DisruptorError, Discovery, KpiParam, Result,
    RootCauseModel, TimeSeries, CONTAINER_ENTITY, SPOT_EVENT_SOURCE,
};

use crate::algorithms::dbscan::{Dbscan, BULK};
use crate::algorithms::normalize::Normalizer;
use crate::algorithms::spot::Spot;
use crate::loader::MetricLoader;
use crate::window::WindowContext;

use self::root_cause::RootCauseParams;

/// Values within this distance of zero count as zero for the validity gate.
const ZERO_TOLERANCE: f64 = 1e-9;

/// Outcome of scoring one series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesScore {
    /// Alarmed fraction of the observation window, in `[0, 1]`.
    pub score: f64,
    pub alarms: usize,
    /// False when the validity gate rejected the series.
    pub valid: bool,
}

impl SeriesScore {
    const REJECTED: SeriesScore = SeriesScore {
        score: 0.0,
        alarms: 0,
        valid: false,
    };
}

/// CPU side of detection: validity gate, denoise, Spot. Owns its settings
/// so it can run on the blocking pool.
#[derive(Debug, Clone)]
pub struct SeriesScorer {
    q: f64,
    level: f64,
    valid_length_ratio: f64,
    normalizer: Normalizer,
}

impl SeriesScorer {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            q: config.q,
            level: config.level,
            valid_length_ratio: config.valid_length_ratio,
            normalizer: Normalizer::new(config.normalizer.clone()),
        }
    }

    /// Score one series against its own history. Never fails: anything that
    /// prevents scoring yields `0`.
    pub fn score(&self, values: &[f64], window: &WindowContext, obs_size: usize) -> SeriesScore {
        if obs_size == 0 || !self.is_data_valid(values, window.expected_point_length) {
            debug!(
                len = values.len(),
                expected = window.expected_point_length,
                "series rejected by validity gate"
            );
            return SeriesScore::REJECTED;
        }

        let labels = Dbscan::new(window.look_back, obs_size).detect(values);
        let train: Vec<f64> = values
            .iter()
            .zip(&labels)
            .filter(|(_, &label)| label == BULK)
            .map(|(v, _)| *v)
            .collect();

        let test = &values[values.len().saturating_sub(obs_size)..];
        let (test, _) = self.normalizer.transform(test, false);

        let output = Spot::new(self.q).and_then(|mut spot| {
            spot.initialize(&train, self.level)?;
            spot.run(&test, true)
        });
        let output = match output {
            Ok(output) => output,
            Err(e) => {
                debug!(error = %e, train = train.len(), "spot scoring skipped");
                return SeriesScore {
                    valid: true,
                    ..SeriesScore::REJECTED
                };
            }
        };

        let alarms = output.alarm_count();
        SeriesScore {
            score: (alarms as f64 / obs_size as f64).min(1.0),
            alarms,
            valid: true,
        }
    }

    /// Long enough and not numerically degenerate.
    pub fn is_data_valid(&self, values: &[f64], expected_point_length: usize) -> bool {
        if values.is_empty() {
            return false;
        }
        if (values.len() as f64) < self.valid_length_ratio * expected_point_length as f64 {
            return false;
        }
        if values.iter().all(|v| v.abs() <= ZERO_TOLERANCE) {
            return false;
        }
        let (lo, hi) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        hi - lo >= f64::EPSILON
    }
}

/// Detection facade over one metric loader.
pub struct DisruptionDetector<'a> {
    loader: &'a dyn MetricLoader,
    config: DetectorConfig,
    scorer: SeriesScorer,
    /// Anchor for windows; `None` means "now" at each fetch.
    end_time: Option<DateTime<Utc>>,
}

impl<'a> DisruptionDetector<'a> {
    pub fn new(loader: &'a dyn MetricLoader, config: DetectorConfig) -> Self {
        let scorer = SeriesScorer::new(&config);
        Self {
            loader,
            config,
            scorer,
            end_time: None,
        }
    }

    /// Pin every window this detector builds to end at `end`.
    pub fn with_end_time(mut self, end: DateTime<Utc>) -> Self {
        self.end_time = Some(end);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Window of `look_back` minutes ending at the anchor (or now).
    pub fn window(&self, look_back: u32) -> WindowContext {
        let end = self.end_time.unwrap_or_else(Utc::now);
        WindowContext::ending_at(end, look_back, self.loader)
    }

    /// Machines active in the window.
    ///
    /// Asks the loader first; when it cannot answer, collects the
    /// `machine_id` label of every series of the first KPI's metric.
    /// An empty result is logged and returned as [`Discovery::Empty`].
    pub async fn get_unique_machine_ids(
        &self,
        look_back: u32,
        kpis: &[KpiParam],
    ) -> Result<Discovery<Vec<String>>> {
        let first = kpis.first().ok_or_else(|| {
            DisruptorError::Configuration("at least one KPI is required to discover machines".into())
        })?;
        let window = self.window(look_back);
        let metrics: Vec<String> = kpis.iter().map(|k| k.metric.clone()).collect();

        let machines = match self
            .loader
            .unique_machines(window.start, window.end, &metrics)
            .await?
        {
            Some(machines) => machines,
            None => {
                let series = self
                    .loader
                    .get_metric(window.start, window.end, &first.metric, None)
                    .await?;
                let mut seen = BTreeSet::new();
                series
                    .iter()
                    .filter_map(|ts| ts.machine_id())
                    .filter(|id| seen.insert(id.to_string()))
                    .map(str::to_string)
                    .collect()
            }
        };

        if machines.is_empty() {
            warn!(
                look_back,
                metrics = ?metrics,
                "no machines found in window"
            );
            return Ok(Discovery::Empty);
        }
        debug!(count = machines.len(), "machines discovered");
        Ok(Discovery::Found(machines))
    }

    /// Fetch `metric` for the window ending now. Returns the window so that
    /// later root-cause and trend calls reuse the same bounds.
    pub async fn get_kpi_ts_list(
        &self,
        metric: &str,
        machine_id: Option<&str>,
        look_back: u32,
    ) -> Result<(WindowContext, Vec<TimeSeries>)> {
        let window = self.window(look_back);
        let series = self.fetch(metric, machine_id, &window).await?;
        Ok((window, series))
    }

    /// Fetch `metric` over an existing window.
    pub async fn fetch(
        &self,
        metric: &str,
        machine_id: Option<&str>,
        window: &WindowContext,
    ) -> Result<Vec<TimeSeries>> {
        let series = self
            .loader
            .get_metric(window.start, window.end, metric, machine_id)
            .await?;
        debug!(
            metric,
            machine_id = machine_id.unwrap_or("*"),
            series = series.len(),
            expected_points = window.expected_point_length,
            "metric fetched"
        );
        Ok(series)
    }

    /// Score every container of `metric` on `machine_id` and return the
    /// ones at or above `outlier_ratio_th`.
    pub async fn detect_by_spot(
        &self,
        metric: &str,
        machine_id: &str,
        outlier_ratio_th: f64,
        look_back: u32,
        obs_size: usize,
    ) -> Result<Vec<AnomalyModel>> {
        let (window, series) = self.get_kpi_ts_list(metric, Some(machine_id), look_back).await?;
        self.detect_in_window(&series, machine_id, outlier_ratio_th, &window, obs_size)
            .await
    }

    /// Score already-fetched series. Output order follows `series`.
    pub async fn detect_in_window(
        &self,
        series: &[TimeSeries],
        machine_id: &str,
        outlier_ratio_th: f64,
        window: &WindowContext,
        obs_size: usize,
    ) -> Result<Vec<AnomalyModel>> {
        let scores = self.score_all(series, window, obs_size).await?;

        let mut anomalies = Vec::new();
        for (ts, scored) in series.iter().zip(&scores) {
            if scored.score < outlier_ratio_th {
                continue;
            }

            let info = match ts.container_name() {
                Some(container) => {
                    self.get_container_extra_info(machine_id, container, window, obs_size)
                        .await?
                }
                None => Map::new(),
            };

            let root_causes = if self.config.attach_root_causes {
                self.find_disruption_source(ts, series)
            } else {
                Vec::new()
            };

            anomalies.push(AnomalyModel {
                machine_id: ts.machine_id().unwrap_or(machine_id).to_string(),
                metric: ts.metric.clone(),
                labels: ts.labels.clone(),
                score: scored.score,
                entity_name: CONTAINER_ENTITY.to_string(),
                details: AnomalyDetails {
                    event_source: SPOT_EVENT_SOURCE.to_string(),
                    info: Value::Object(info),
                },
                root_causes,
            });
        }

        info!(
            machine_id,
            metric = series.first().map(|ts| ts.metric.as_str()).unwrap_or(""),
            series = series.len(),
            rejected = scores.iter().filter(|s| !s.valid).count(),
            anomalies = anomalies.len(),
            threshold = outlier_ratio_th,
            "spot detection complete"
        );
        Ok(anomalies)
    }

    /// Score every series on the blocking pool, fanned out with rayon.
    /// Output order follows `series`.
    pub async fn score_all(
        &self,
        series: &[TimeSeries],
        window: &WindowContext,
        obs_size: usize,
    ) -> Result<Vec<SeriesScore>> {
        let scorer = self.scorer.clone();
        let values: Vec<Vec<f64>> = series.iter().map(|ts| ts.values.clone()).collect();
        let window = *window;
        tokio::task::spawn_blocking(move || {
            values
                .par_iter()
                .map(|v| scorer.score(v, &window, obs_size))
                .collect()
        })
        .await
        .map_err(|e| DisruptorError::Scoring(e.to_string()))
    }

    pub fn score_series(&self, values: &[f64], window: &WindowContext, obs_size: usize) -> SeriesScore {
        self.scorer.score(values, window, obs_size)
    }

    pub fn is_data_valid(&self, values: &[f64], expected_point_length: usize) -> bool {
        self.scorer.is_data_valid(values, expected_point_length)
    }

    /// Co-located series that move with `victim`, best first.
    pub fn find_disruption_source(&self, victim: &TimeSeries, all: &[TimeSeries]) -> Vec<RootCauseModel> {
        let pool: Vec<TimeSeries> = all
            .iter()
            .filter(|c| c.machine_id() == victim.machine_id())
            .cloned()
            .collect();
        root_cause::rank(
            victim,
            &pool,
            RootCauseParams {
                min_corr: self.config.root_cause_min_corr,
                top_k: self.config.root_cause_top_k,
            },
        )
    }

    /// Trend of every configured auxiliary metric for one container.
    /// Metrics the container does not report are left out.
    pub async fn get_container_extra_info(
        &self,
        machine_id: &str,
        container_name: &str,
        window: &WindowContext,
        obs_size: usize,
    ) -> Result<Map<String, Value>> {
        let mut info = Map::new();
        for metric in &self.config.extra_metrics {
            let series = self.fetch(metric, Some(machine_id), window).await?;
            if let Some(ts) = series
                .iter()
                .find(|ts| ts.container_name() == Some(container_name))
            {
                info.insert(
                    metric.clone(),
                    Value::from(trend::relative_change(&ts.values, obs_size)),
                );
            }
        }
        Ok(info)
    }
}
