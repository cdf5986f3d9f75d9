use std::time::Instant;

use chrono::Utc;
use tracing::info;

use disruptor_core::{
    AnomalyModel, DetectorConfig, DisruptorError, Discovery, KpiParam, Result, RootCauseModel,
    WindowParam,
};

use crate::loader::MetricLoader;
use crate::pipeline::DisruptionDetector;

/// Request-level entry point: owns the loader and the detector settings.
pub struct DisruptionEngine {
    loader: Box<dyn MetricLoader>,
    config: DetectorConfig,
}

impl DisruptionEngine {
    pub fn new(loader: Box<dyn MetricLoader>, config: DetectorConfig) -> Self {
        Self { loader, config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// One detector per request, with every window pinned to the same end.
    fn detector(&self) -> DisruptionDetector<'_> {
        DisruptionDetector::new(self.loader.as_ref(), self.config.clone()).with_end_time(Utc::now())
    }

    /// Scan `machines x kpis`. Without `machine_id`, machines are discovered
    /// from the loader; finding none yields an empty list.
    pub async fn detect(
        &self,
        kpis: &[KpiParam],
        window: WindowParam,
        machine_id: Option<&str>,
    ) -> Result<Vec<AnomalyModel>> {
        window.validate()?;
        let start = Instant::now();
        let detector = self.detector();

        let machines = match machine_id {
            Some(id) => vec![id.to_string()],
            None => match detector.get_unique_machine_ids(window.look_back, kpis).await? {
                Discovery::Found(machines) => machines,
                Discovery::Empty => return Ok(Vec::new()),
            },
        };

        let mut anomalies = Vec::new();
        for machine in &machines {
            for kpi in kpis {
                let found = detector
                    .detect_by_spot(
                        &kpi.metric,
                        machine,
                        kpi.outlier_ratio_th(),
                        window.look_back,
                        window.obs_size,
                    )
                    .await?;
                anomalies.extend(found);
            }
        }

        info!(
            machines = machines.len(),
            kpis = kpis.len(),
            anomalies = anomalies.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "disruption scan complete"
        );
        Ok(anomalies)
    }

    /// Rank the containers on `machine_id` whose `metric` moves with
    /// `container_name`.
    pub async fn root_cause(
        &self,
        metric: &str,
        container_name: &str,
        window: WindowParam,
        machine_id: Option<&str>,
    ) -> Result<Vec<RootCauseModel>> {
        let machine_id = machine_id.ok_or_else(|| {
            DisruptorError::Configuration("machine_id is required for root-cause search".into())
        })?;
        window.validate()?;

        let detector = self.detector();
        let (_, series) = detector
            .get_kpi_ts_list(metric, Some(machine_id), window.look_back)
            .await?;

        let victim = series
            .iter()
            .find(|ts| ts.container_name() == Some(container_name))
            .ok_or_else(|| DisruptorError::ContainerNotFound {
                container: container_name.to_string(),
                machine_id: machine_id.to_string(),
            })?;

        let causes = detector.find_disruption_source(victim, &series);
        info!(
            machine_id,
            metric,
            container = container_name,
            candidates = series.len().saturating_sub(1),
            causes = causes.len(),
            "root-cause search complete"
        );
        Ok(causes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StaticMetricLoader;
    use disruptor_core::{labels, TimeSeries, CONTAINER_NAME_LABEL, MACHINE_ID_LABEL};

    fn container(machine: &str, name: &str, values: Vec<f64>) -> TimeSeries {
        TimeSeries::new(
            "cpu",
            labels([(MACHINE_ID_LABEL, machine), (CONTAINER_NAME_LABEL, name)]),
            values,
        )
    }

    fn engine(series: Vec<TimeSeries>) -> DisruptionEngine {
        DisruptionEngine::new(
            Box::new(StaticMetricLoader::new(series, 60)),
            DetectorConfig::default(),
        )
    }

    #[tokio::test]
    async fn invalid_window_fails_before_fetch() {
        let err = engine(Vec::new())
            .detect(&[KpiParam::new("cpu")], WindowParam::new(60, 0), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DisruptorError::Configuration(_)));
    }

    #[tokio::test]
    async fn discovery_without_kpis_is_configuration_error() {
        let err = engine(Vec::new())
            .detect(&[], WindowParam::new(60, 5), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DisruptorError::Configuration(_)));
    }

    #[tokio::test]
    async fn no_machines_is_empty_result() {
        let found = engine(Vec::new())
            .detect(&[KpiParam::new("cpu")], WindowParam::new(60, 5), None)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn root_cause_requires_machine() {
        let err = engine(Vec::new())
            .root_cause("cpu", "web", WindowParam::new(60, 5), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DisruptorError::Configuration(_)));
    }

    #[tokio::test]
    async fn root_cause_missing_container() {
        let err = engine(vec![container("m1", "db", vec![1.0, 2.0])])
            .root_cause("cpu", "web", WindowParam::new(60, 5), Some("m1"))
            .await
            .unwrap_err();
        match err {
            DisruptorError::ContainerNotFound {
                container,
                machine_id,
            } => {
                assert_eq!(container, "web");
                assert_eq!(machine_id, "m1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn root_cause_ranks_neighbours() {
        let victim: Vec<f64> = (0..20).map(|i| (i % 4) as f64).collect();
        let follower: Vec<f64> = victim.iter().map(|v| 100.0 + 3.0 * v).collect();
        let unrelated: Vec<f64> = (0..20).map(|i| if i < 10 { 1.0 } else { 2.0 }).collect();
        let engine = engine(vec![
            container("m1", "web", victim),
            container("m1", "worker", follower),
            container("m1", "cron", unrelated),
        ]);

        let causes = engine
            .root_cause("cpu", "web", WindowParam::new(60, 5), Some("m1"))
            .await
            .unwrap();
        assert_eq!(causes.len(), 1);
        assert_eq!(causes[0].container_name(), Some("worker"));
        assert_eq!(causes[0].score, 1.0);
    }
}
