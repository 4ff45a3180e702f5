//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use converge_core::types::{ReplicaField, WorkloadKind};

/// converge -- wait for Kubernetes workloads to converge.
///
/// Use `converge <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "converge", version, about, long_about = None)]
pub struct Cli {
    /// Path to the converge.toml configuration file.
    #[arg(short, long, global = true, default_value = "converge.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Override the kubeconfig path from the configuration file.
    #[arg(long, global = true)]
    pub kubeconfig: Option<String>,

    /// Override the kubeconfig context.
    #[arg(long, global = true)]
    pub context: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scale a workload to zero replicas and wait until it drains.
    ScaleToZero(ScaleArgs),

    /// Delete a workload and wait until it is gone.
    Delete(TargetArgs),

    /// Wait until a workload no longer exists, without deleting it.
    WaitAbsent(WaitAbsentArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- shared target ----

/// A workload addressed as `namespace/name`.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Workload kind (deployment, statefulset).
    #[arg(short, long, default_value = "deployment")]
    pub kind: WorkloadKind,

    /// Target as `namespace/name` (namespace defaults to `default`).
    pub target: String,
}

// ---- scale-to-zero ----

/// Scale a workload down to zero.
#[derive(Args, Debug)]
pub struct ScaleArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Status field that must reach zero (default depends on the kind).
    #[arg(long)]
    pub field: Option<FieldArg>,
}

/// Replica status field selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldArg {
    Replicas,
    Available,
    Current,
    Ready,
}

impl From<FieldArg> for ReplicaField {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::Replicas => Self::Replicas,
            FieldArg::Available => Self::Available,
            FieldArg::Current => Self::Current,
            FieldArg::Ready => Self::Ready,
        }
    }
}

// ---- wait-absent ----

/// Wait for a workload to disappear.
#[derive(Args, Debug)]
pub struct WaitAbsentArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Stop on configuration and cancellation errors instead of retrying everything.
    #[arg(long)]
    pub strict: bool,
}

// ---- config ----

/// Manage converge configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, cluster, poll).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse_scale_to_zero_defaults() {
        let cli = Cli::try_parse_from(["converge", "scale-to-zero", "kube-system/machine-controller"])
            .expect("parse succeeded");
        match cli.command {
            Commands::ScaleToZero(args) => {
                assert_eq!(args.target.kind, WorkloadKind::Deployment);
                assert_eq!(args.target.target, "kube-system/machine-controller");
                assert!(args.field.is_none(), "field should default to None");
            }
            _ => panic!("expected ScaleToZero command"),
        }
    }

    #[test]
    fn test_cli_parse_scale_to_zero_statefulset_field() {
        let cli = Cli::try_parse_from([
            "converge",
            "scale-to-zero",
            "--kind",
            "statefulset",
            "--field",
            "ready",
            "db/postgres",
        ])
        .expect("parse succeeded");
        match cli.command {
            Commands::ScaleToZero(args) => {
                assert_eq!(args.target.kind, WorkloadKind::StatefulSet);
                assert_eq!(args.field, Some(FieldArg::Ready));
                assert_eq!(ReplicaField::from(FieldArg::Ready), ReplicaField::Ready);
            }
            _ => panic!("expected ScaleToZero command"),
        }
    }

    #[test]
    fn test_cli_parse_kind_alias() {
        let cli = Cli::try_parse_from(["converge", "delete", "-k", "sts", "web"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Delete(args) => {
                assert_eq!(args.kind, WorkloadKind::StatefulSet);
                assert_eq!(args.target, "web");
            }
            _ => panic!("expected Delete command"),
        }
    }

    #[test]
    fn test_cli_parse_unknown_kind_fails() {
        let args = Cli::try_parse_from(["converge", "delete", "--kind", "daemonset", "web"]);
        assert!(args.is_err(), "unknown workload kind should be rejected");
    }

    #[test]
    fn test_cli_parse_wait_absent_strict() {
        let cli = Cli::try_parse_from(["converge", "wait-absent", "--strict", "default/web"])
            .expect("parse succeeded");
        match cli.command {
            Commands::WaitAbsent(args) => {
                assert!(args.strict, "strict should be true");
                assert_eq!(args.target.target, "default/web");
            }
            _ => panic!("expected WaitAbsent command"),
        }
    }

    #[test]
    fn test_cli_parse_config_show_section() {
        let cli = Cli::try_parse_from(["converge", "config", "show", "--section", "poll"])
            .expect("parse succeeded");
        match cli.command {
            Commands::Config(config_args) => match config_args.action {
                ConfigAction::Show { section } => {
                    assert_eq!(section, Some("poll".to_owned()));
                }
                _ => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn test_cli_parse_global_overrides() {
        let cli = Cli::try_parse_from([
            "converge",
            "delete",
            "web",
            "--config",
            "/etc/converge/ci.toml",
            "--kubeconfig",
            "/tmp/kubeconfig",
            "--context",
            "kind-ci",
            "--log-level",
            "debug",
            "--output",
            "json",
        ])
        .expect("parse succeeded");
        assert_eq!(cli.config, PathBuf::from("/etc/converge/ci.toml"));
        assert_eq!(cli.kubeconfig.as_deref(), Some("/tmp/kubeconfig"));
        assert_eq!(cli.context.as_deref(), Some("kind-ci"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.output, OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Delete(_)));
    }

    #[test]
    fn test_cli_parse_missing_target_fails() {
        let args = Cli::try_parse_from(["converge", "scale-to-zero"]);
        assert!(args.is_err(), "target is required");
    }

    #[test]
    fn test_cli_parse_missing_command_fails() {
        let args = Cli::try_parse_from(["converge"]);
        assert!(args.is_err(), "should fail when no command provided");
    }

    #[test]
    fn test_cli_verify_command_structure() {
        let cmd = Cli::command();
        assert_eq!(cmd.get_name(), "converge");

        let subcommands: Vec<_> = cmd.get_subcommands().map(|s| s.get_name()).collect();
        for expected in ["scale-to-zero", "delete", "wait-absent", "config"] {
            assert!(
                subcommands.contains(&expected),
                "should have '{expected}' subcommand"
            );
        }
    }
}
