use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use disruptor_tool_runtime::Language;

/// Container disruption detection.
///
/// Scores the trailing window of each container's KPI series against an
/// extreme-value threshold, and ranks co-located containers as likely sources.
#[derive(Parser, Debug)]
#[command(name = "disruptor", version, about = "Container disruption detection")]
pub struct CliArgs {
    /// Path to config file (default: ~/.config/disruptor/config.toml)
    #[arg(long, global = true, env = "DISRUPTOR_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the disruption tools over MCP on stdin/stdout
    Serve,
    /// Scan machines x KPIs for disrupted containers
    Detect(DetectArgs),
    /// Rank containers on a machine that move with a victim container
    RootCause(RootCauseArgs),
}

#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Minutes of history to fetch
    #[arg(long, default_value = "60")]
    pub look_back: u32,

    /// Trailing points to score
    #[arg(long, default_value = "5")]
    pub obs_size: usize,
}

#[derive(Args, Debug)]
pub struct DetectArgs {
    /// KPI metric to scan; repeat for several
    #[arg(long = "metric", required = true)]
    pub metrics: Vec<String>,

    /// Minimum alarmed fraction of the window to report
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Restrict the scan to one machine instead of discovering machines
    #[arg(long)]
    pub machine_id: Option<String>,

    /// JSON metric payload (overrides the config file's loader)
    #[arg(long)]
    pub loader: Option<PathBuf>,

    /// Print a markdown report instead of JSON
    #[arg(long)]
    pub report: bool,

    #[arg(long, value_enum, default_value = "en")]
    pub lang: ReportLanguage,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(Args, Debug)]
pub struct RootCauseArgs {
    #[arg(long)]
    pub metric: String,

    /// Victim container name
    #[arg(long)]
    pub container: String,

    #[arg(long)]
    pub machine_id: String,

    /// JSON metric payload (overrides the config file's loader)
    #[arg(long)]
    pub loader: Option<PathBuf>,

    #[command(flatten)]
    pub window: WindowArgs,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLanguage {
    En,
    Zh,
}

impl From<ReportLanguage> for Language {
    fn from(lang: ReportLanguage) -> Self {
        match lang {
            ReportLanguage::En => Language::En,
            ReportLanguage::Zh => Language::Zh,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detect() {
        let args = CliArgs::parse_from([
            "disruptor", "detect", "--metric", "cpu", "--metric", "mem", "--threshold", "0.2",
            "--look-back", "30", "--report", "--lang", "zh",
        ]);
        let Command::Detect(detect) = args.command else {
            panic!("expected detect");
        };
        assert_eq!(detect.metrics, vec!["cpu", "mem"]);
        assert_eq!(detect.threshold, Some(0.2));
        assert_eq!(detect.window.look_back, 30);
        assert_eq!(detect.window.obs_size, 5);
        assert!(detect.report);
        assert_eq!(detect.lang, ReportLanguage::Zh);
    }

    #[test]
    fn root_cause_requires_machine() {
        let err = CliArgs::try_parse_from([
            "disruptor", "root-cause", "--metric", "cpu", "--container", "web",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let args = CliArgs::parse_from(["disruptor", "serve", "--config", "/etc/disruptor.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/etc/disruptor.toml")));
        assert!(matches!(args.command, Command::Serve));
    }
}
