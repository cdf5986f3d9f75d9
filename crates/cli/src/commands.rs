//! One-shot subcommands; each returns the text to print on stdout.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tracing::info;

use disruptor_compute::{build_loader, DisruptionEngine};
use disruptor_core::{DetectorConfig, KpiParam, WindowParam};
use disruptor_tool_runtime::{ReportRenderer, ReportType};

use crate::cli::{DetectArgs, RootCauseArgs, WindowArgs};

async fn engine(config: DetectorConfig, loader: &Value, base_dir: &Path) -> Result<DisruptionEngine> {
    let loader = build_loader(loader, base_dir)
        .await
        .context("failed to build metric loader")?;
    Ok(DisruptionEngine::new(loader, config))
}

fn window(args: &WindowArgs) -> WindowParam {
    WindowParam::new(args.look_back, args.obs_size)
}

pub async fn detect(
    config: DetectorConfig,
    loader: &Value,
    base_dir: &Path,
    args: &DetectArgs,
) -> Result<String> {
    let kpis: Vec<KpiParam> = args
        .metrics
        .iter()
        .map(|m| match args.threshold {
            Some(th) => KpiParam::new(m.as_str()).with_outlier_ratio_th(th),
            None => KpiParam::new(m.as_str()),
        })
        .collect();

    let found = engine(config, loader, base_dir)
        .await?
        .detect(&kpis, window(&args.window), args.machine_id.as_deref())
        .await
        .context("detection failed")?;
    info!(findings = found.len(), "detect finished");

    if args.report {
        let report_type = if found.is_empty() {
            ReportType::Normal
        } else {
            ReportType::Anomaly
        };
        return ReportRenderer::new()
            .render(&found, report_type, args.lang.into())
            .context("failed to render report");
    }
    Ok(serde_json::to_string_pretty(&found)?)
}

pub async fn root_cause(
    config: DetectorConfig,
    loader: &Value,
    base_dir: &Path,
    args: &RootCauseArgs,
) -> Result<String> {
    let causes = engine(config, loader, base_dir)
        .await?
        .root_cause(
            &args.metric,
            &args.container,
            window(&args.window),
            Some(args.machine_id.as_str()),
        )
        .await
        .with_context(|| format!("root-cause search for '{}' failed", args.container))?;
    info!(causes = causes.len(), "root-cause finished");
    Ok(serde_json::to_string_pretty(&causes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::ReportLanguage;
    use disruptor_core::{AnomalyModel, RootCauseModel};

    fn write_payload(dir: &Path) {
        let mut spiked = vec![10.0; 55];
        spiked.extend([10.0, 10.0, 10.0, 10.0, 50.0]);
        let follower: Vec<f64> = spiked.iter().map(|v| v * 2.0 + 1.0).collect();
        let payload = serde_json::json!({
            "series": [
                {"metric": "cpu", "labels": {"machine_id": "m1", "container_name": "web"}, "values": spiked},
                {"metric": "cpu", "labels": {"machine_id": "m1", "container_name": "batch"}, "values": follower}
            ]
        });
        std::fs::write(dir.join("metrics.json"), payload.to_string()).unwrap();
    }

    fn loader() -> Value {
        serde_json::json!({"kind": "file", "path": "metrics.json"})
    }

    fn window_args() -> WindowArgs {
        WindowArgs { look_back: 60, obs_size: 5 }
    }

    fn detect_args(report: bool) -> DetectArgs {
        DetectArgs {
            metrics: vec!["cpu".to_string()],
            threshold: Some(0.2),
            machine_id: Some("m1".to_string()),
            loader: None,
            report,
            lang: ReportLanguage::En,
            window: window_args(),
        }
    }

    #[tokio::test]
    async fn detect_prints_findings() {
        let dir = tempfile::tempdir().unwrap();
        write_payload(dir.path());

        let out = detect(DetectorConfig::default(), &loader(), dir.path(), &detect_args(false))
            .await
            .unwrap();
        let found: Vec<AnomalyModel> = serde_json::from_str(&out).unwrap();
        assert_eq!(found[0].container_name(), Some("web"));
        assert_eq!(found[0].score, 0.2);
        assert_eq!(found[0].root_causes[0].container_name(), Some("batch"));
        assert_eq!(found[0].root_causes[0].score, 1.0);
    }

    #[tokio::test]
    async fn detect_renders_report() {
        let dir = tempfile::tempdir().unwrap();
        write_payload(dir.path());

        let out = detect(DetectorConfig::default(), &loader(), dir.path(), &detect_args(true))
            .await
            .unwrap();
        assert!(out.contains("| m1 | cpu | 0.200 | web |"));
    }

    #[tokio::test]
    async fn root_cause_ranks_follower() {
        let dir = tempfile::tempdir().unwrap();
        write_payload(dir.path());

        let args = RootCauseArgs {
            metric: "cpu".to_string(),
            container: "web".to_string(),
            machine_id: "m1".to_string(),
            loader: None,
            window: window_args(),
        };
        let out = root_cause(DetectorConfig::default(), &loader(), dir.path(), &args)
            .await
            .unwrap();
        let causes: Vec<RootCauseModel> = serde_json::from_str(&out).unwrap();
        assert_eq!(causes.len(), 1);
        assert_eq!(causes[0].container_name(), Some("batch"));
    }

    #[tokio::test]
    async fn missing_payload_fails_with_context() {
        let dir = tempfile::tempdir().unwrap();
        let err = detect(DetectorConfig::default(), &loader(), dir.path(), &detect_args(false))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("failed to build metric loader"));
    }
}
