//! Markdown rendering of disruption findings.
//!
//! Every user-facing string comes from one message table keyed by
//! [`MessageKey`]; the table is resolved once per render for the requested
//! [`Language`]. The layout is a minijinja template with one row per
//! [`AnomalyModel`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use disruptor_core::{AnomalyModel, RootCauseModel};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Template error: {0}")]
    Template(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    /// Routine inspection report.
    Normal,
    /// Alert raised for detected disruptions.
    #[default]
    Anomaly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Zh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKey {
    NormalTitle,
    AnomalyTitle,
    Summary,
    NoAnomaly,
    Machine,
    Metric,
    Score,
    Container,
    Info,
    RootCause,
}

/// `(key, template name, en, zh)`
const MESSAGES: &[(MessageKey, &str, &str, &str)] = &[
    (MessageKey::NormalTitle, "normal_title", "Container disruption report", "容器干扰巡检报告"),
    (MessageKey::AnomalyTitle, "anomaly_title", "Container disruption alert", "容器干扰告警"),
    (MessageKey::Summary, "summary", "Disrupted containers", "受干扰容器数"),
    (MessageKey::NoAnomaly, "no_anomaly", "No container disruption detected.", "未检测到容器干扰。"),
    (MessageKey::Machine, "machine", "Machine", "机器"),
    (MessageKey::Metric, "metric", "Metric", "指标"),
    (MessageKey::Score, "score", "Score", "得分"),
    (MessageKey::Container, "container", "Container", "容器"),
    (MessageKey::Info, "info", "Info", "附加信息"),
    (MessageKey::RootCause, "root_cause", "Root cause", "根因"),
];

impl MessageKey {
    pub fn text(self, language: Language) -> &'static str {
        MESSAGES
            .iter()
            .find(|(key, ..)| *key == self)
            .map(|(_, _, en, zh)| match language {
                Language::En => *en,
                Language::Zh => *zh,
            })
            .unwrap_or_default()
    }
}

/// Every message for `language`, keyed by template name.
pub fn messages(language: Language) -> IndexMap<&'static str, &'static str> {
    MESSAGES
        .iter()
        .map(|(key, name, ..)| (*name, key.text(language)))
        .collect()
}

const REPORT_TEMPLATE: &str = r#"## {{ title }}

{{ msg.summary }}: {{ rows | length }}

{% if rows %}
| {{ msg.machine }} | {{ msg.metric }} | {{ msg.score }} | {{ msg.container }} | {{ msg.info }} | {{ msg.root_cause }} |
|---|---|---|---|---|---|
{% for row in rows %}
| {{ row.machine_id }} | {{ row.metric }} | {{ row.score | round(3) }} | {{ row.container }} | {{ row.info }} | {{ row.root_causes }} |
{% endfor %}
{% else %}
{{ msg.no_anomaly }}
{% endif %}
"#;

/// One table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub machine_id: String,
    pub metric: String,
    pub score: f64,
    pub container: String,
    /// Serialized `details.info`.
    pub info: String,
    pub root_causes: String,
}

impl From<&AnomalyModel> for ReportRow {
    fn from(a: &AnomalyModel) -> Self {
        Self {
            machine_id: cell(&a.machine_id),
            metric: cell(&a.metric),
            score: a.score,
            container: cell(a.container_name().unwrap_or("-")),
            info: cell(&a.details.info.to_string()),
            root_causes: cell(&root_cause_summary(&a.root_causes)),
        }
    }
}

/// `metric(container)=score; ...`, or `-` when there are none.
pub fn root_cause_summary(causes: &[RootCauseModel]) -> String {
    if causes.is_empty() {
        return "-".to_string();
    }
    causes
        .iter()
        .map(|c| format!("{}({})={:.3}", c.metric, c.container_name().unwrap_or("-"), c.score))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Keep table cells on one line and out of the column syntax.
fn cell(raw: &str) -> String {
    raw.replace('|', "\\|").replace('\n', " ")
}

#[derive(Serialize)]
struct ReportContext<'a> {
    title: &'static str,
    msg: IndexMap<&'static str, &'static str>,
    rows: &'a [ReportRow],
}

/// Renders disruption findings as markdown.
#[derive(Debug, Default)]
pub struct ReportRenderer {
    _private: (),
}

impl ReportRenderer {
    pub fn new() -> Self {
        Self { _private: () }
    }

    fn build_env() -> minijinja::Environment<'static> {
        let mut env = minijinja::Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_filter("round", round_filter);
        env
    }

    pub fn render(
        &self,
        anomalies: &[AnomalyModel],
        report_type: ReportType,
        language: Language,
    ) -> Result<String, ReportError> {
        let title = match report_type {
            ReportType::Normal => MessageKey::NormalTitle,
            ReportType::Anomaly => MessageKey::AnomalyTitle,
        }
        .text(language);
        let rows: Vec<ReportRow> = anomalies.iter().map(ReportRow::from).collect();
        let ctx = ReportContext {
            title,
            msg: messages(language),
            rows: &rows,
        };

        Self::build_env()
            .render_str(REPORT_TEMPLATE, &ctx)
            .map_err(|e| ReportError::Template(e.to_string()))
    }
}

/// Round a float to N decimal places.
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}
