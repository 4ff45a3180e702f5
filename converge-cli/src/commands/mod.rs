//! Command handlers -- one module per subcommand

pub mod config;
pub mod delete;
pub mod scale;
pub mod wait;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use converge_core::config::HarnessConfig;
use converge_core::types::{ResourceRef, WorkloadKind};
use converge_poller::{Harness, HarnessBuilder, KubeResourceApi, PollerError};

use crate::cli::TargetArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Connect to the configured cluster and build a harness bound to `cancel`.
pub async fn connect(
    config: &HarnessConfig,
    cancel: CancellationToken,
) -> Result<Harness<KubeResourceApi>, CliError> {
    let api = KubeResourceApi::connect(&config.cluster, config.poll.request_timeout()).await?;
    let harness = HarnessBuilder::new()
        .config(config)
        .api(Arc::new(api))
        .cancellation_token(cancel)
        .build()?;
    Ok(harness)
}

/// Parse the positional target into a resource reference.
pub fn parse_target(kind: WorkloadKind, target: &str) -> Result<ResourceRef, CliError> {
    ResourceRef::parse(kind, target).map_err(|e| CliError::Command(e.to_string()))
}

impl TargetArgs {
    pub fn resource(&self) -> Result<ResourceRef, CliError> {
        parse_target(self.kind, &self.target)
    }
}

/// Result of one lifecycle operation as shown to the user.
#[derive(Debug, Serialize)]
pub struct OperationReport {
    pub operation: String,
    pub resource: String,
    pub result: &'static str,
    pub elapsed_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationReport {
    pub fn new(
        operation: &str,
        target: &ResourceRef,
        elapsed: Duration,
        outcome: &Result<(), PollerError>,
    ) -> Self {
        let (result, error) = match outcome {
            Ok(()) => ("success", None),
            Err(err) => (result_label(err), Some(err.to_string())),
        };
        Self {
            operation: operation.to_owned(),
            resource: target.to_string(),
            result,
            elapsed_secs: elapsed.as_secs_f64(),
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

fn result_label(err: &PollerError) -> &'static str {
    match err {
        PollerError::TimedOut { .. } => "timed_out",
        PollerError::Fatal { .. } => "fatal",
        PollerError::Cancelled { .. } => "cancelled",
        _ => "error",
    }
}

impl Render for OperationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        let status = if self.is_success() {
            "ok".green().bold()
        } else {
            self.result.red().bold()
        };
        writeln!(
            w,
            "{} {} {} ({:.1}s)",
            status, self.operation, self.resource, self.elapsed_secs
        )?;
        if let Some(error) = &self.error {
            writeln!(w, "  {}", error)?;
        }
        Ok(())
    }
}

/// Render the report and hand the outcome back as the command result.
pub fn finish(
    writer: &OutputWriter,
    operation: &str,
    target: &ResourceRef,
    elapsed: Duration,
    outcome: Result<(), PollerError>,
) -> Result<(), CliError> {
    let report = OperationReport::new(operation, target, elapsed, &outcome);
    writer.render(&report)?;
    outcome.map_err(CliError::from)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;

    fn web() -> ResourceRef {
        ResourceRef::new(WorkloadKind::Deployment, "default", "web")
    }

    #[test]
    fn test_report_success() {
        let report = OperationReport::new("wait_until_deleted", &web(), Duration::from_secs(10), &Ok(()));
        assert!(report.is_success());
        assert_eq!(report.result, "success");
        assert_eq!(report.resource, "deployment/default/web");
        assert_eq!(report.elapsed_secs, 10.0);
    }

    #[test]
    fn test_report_timed_out() {
        let outcome = Err(PollerError::TimedOut {
            operation: "wait_until_deleted".to_owned(),
            timeout: Duration::from_secs(60),
        });
        let report = OperationReport::new("wait_until_deleted", &web(), Duration::from_secs(60), &outcome);
        assert!(!report.is_success());
        assert_eq!(report.result, "timed_out");
        assert_eq!(
            report.error.as_deref(),
            Some("wait_until_deleted timed out after 60s")
        );
    }

    #[test]
    fn test_report_labels() {
        let fatal = PollerError::Fatal {
            operation: "op".to_owned(),
            reason: "forbidden".to_owned(),
        };
        let cancelled = PollerError::Cancelled {
            operation: "op".to_owned(),
        };
        assert_eq!(result_label(&fatal), "fatal");
        assert_eq!(result_label(&cancelled), "cancelled");
        assert_eq!(result_label(&PollerError::Api("x".to_owned())), "error");
    }

    #[test]
    fn test_report_json_omits_missing_error() {
        let report = OperationReport::new("scale_to_zero", &web(), Duration::ZERO, &Ok(()));
        let json = serde_json::to_value(&report).expect("serialize");
        assert_eq!(json["result"], "success");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_report_text_includes_error_line() {
        colored::control::set_override(false);
        let outcome = Err(PollerError::Cancelled {
            operation: "scale_to_zero".to_owned(),
        });
        let report = OperationReport::new("scale_to_zero", &web(), Duration::from_millis(1500), &outcome);
        let mut buffer = Vec::new();
        OutputWriter::new(OutputFormat::Text)
            .render_to(&mut buffer, &report)
            .expect("render");
        let text = String::from_utf8(buffer).expect("utf-8");
        assert!(text.starts_with("cancelled scale_to_zero deployment/default/web (1.5s)"));
        assert!(text.contains("scale_to_zero was cancelled"));
    }

    #[test]
    fn test_parse_target_rejects_malformed() {
        let err = parse_target(WorkloadKind::Deployment, "a/b/c").expect_err("too many segments");
        assert_eq!(err.exit_code(), 1);
        let target = parse_target(WorkloadKind::StatefulSet, "db/pg").expect("valid");
        assert_eq!(target.namespace, "db");
        assert_eq!(target.name, "pg");
    }
}
