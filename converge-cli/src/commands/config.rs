//! `converge config` command handler

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use tracing::info;

use converge_core::config::HarnessConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Section names accepted by `config show --section`.
const SECTIONS: [&str; 3] = ["general", "cluster", "poll"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration file, reporting any errors.
///
/// # Errors
///
/// Returns `CliError::Config` if the file is missing, malformed, or fails validation.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = match HarnessConfig::load(config_path).await {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Display the effective configuration (file + env overrides + defaults).
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = HarnessConfig::load(config_path).await?;
    let report = build_report(&config, &config_path.display().to_string(), section)?;
    writer.render(&report)?;
    Ok(())
}

/// Serialize the whole configuration or a single section to TOML.
fn build_report(
    config: &HarnessConfig,
    source: &str,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let serialized = match section.as_deref() {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("cluster") => toml::to_string_pretty(&config.cluster),
        Some("poll") => toml::to_string_pretty(&config.poll),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    Ok(ConfigReport {
        source: source.to_owned(),
        section,
        config_toml: serialized.unwrap_or_else(|e| format!("(serialization error: {})", e)),
    })
}

/// Output of `config validate`.
#[derive(Debug, Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        if self.valid {
            writeln!(w, "{} {} is valid", "ok".green().bold(), self.source)?;
        } else {
            writeln!(w, "{} {} is invalid", "error".red().bold(), self.source)?;
            for error in &self.errors {
                writeln!(w, "  - {}", error)?;
            }
        }
        Ok(())
    }
}

/// Output of `config show`.
#[derive(Debug, Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        match &self.section {
            Some(section) => writeln!(w, "# {} [{}]", self.source, section)?,
            None => writeln!(w, "# {}", self.source)?,
        }
        write!(w, "{}", self.config_toml)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;

    #[test]
    fn test_build_report_full_config() {
        let config = HarnessConfig::default();
        let report = build_report(&config, "converge.toml", None).expect("full report");
        assert!(report.section.is_none());
        assert!(report.config_toml.contains("[general]"));
        assert!(report.config_toml.contains("[poll]"));
        assert!(report.config_toml.contains("interval_secs = 5"));
    }

    #[test]
    fn test_build_report_poll_section() {
        let config = HarnessConfig::default();
        let report =
            build_report(&config, "converge.toml", Some("poll".to_owned())).expect("poll section");
        assert_eq!(report.section.as_deref(), Some("poll"));
        assert!(report.config_toml.contains("deletion_timeout_secs = 60"));
        assert!(!report.config_toml.contains("log_level"));
    }

    #[test]
    fn test_build_report_unknown_section() {
        let config = HarnessConfig::default();
        let err = build_report(&config, "converge.toml", Some("metrics".to_owned()))
            .expect_err("unknown section");
        let message = err.to_string();
        assert!(message.contains("unknown section: metrics"));
        assert!(message.contains("general, cluster, poll"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_validation_report_text() {
        colored::control::set_override(false);
        let report = ConfigValidationReport {
            source: "bad.toml".to_owned(),
            valid: false,
            errors: vec!["poll.interval_secs: must be 1-3600".to_owned()],
        };
        let mut buffer = Vec::new();
        OutputWriter::new(OutputFormat::Text)
            .render_to(&mut buffer, &report)
            .expect("render");
        let text = String::from_utf8(buffer).expect("utf-8");
        assert!(text.contains("error bad.toml is invalid"));
        assert!(text.contains("  - poll.interval_secs: must be 1-3600"));
    }

    #[tokio::test]
    async fn test_validate_missing_file_is_config_error() {
        let writer = OutputWriter::new(OutputFormat::Json);
        let err = execute_validate(Path::new("/nonexistent/converge.toml"), &writer)
            .await
            .expect_err("missing file is invalid");
        assert_eq!(err.exit_code(), 2);
    }
}
