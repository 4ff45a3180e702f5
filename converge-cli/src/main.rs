//! converge CLI -- 수렴 대기 명령줄 도구
//!
//! 설정 로딩, 로깅 초기화, Ctrl-C 취소 연결을 담당하고 실제 작업은
//! `commands` 모듈의 핸들러에 위임합니다.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::path::Path;

use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use converge_core::config::{GeneralConfig, HarnessConfig};
use converge_core::error::{ConfigError, ConvergeError};

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let writer = OutputWriter::new(cli.output);

    if let Err(e) = run(cli, &writer).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, writer: &OutputWriter) -> Result<(), CliError> {
    if let Commands::Config(args) = cli.command {
        // 설정 파일 자체를 검사하므로 로깅은 기본값으로 초기화합니다.
        let mut general = GeneralConfig::default();
        if let Some(level) = cli.log_level {
            general.log_level = level;
        }
        logging::init_tracing(&general).map_err(|e| CliError::Command(format!("{e:#}")))?;
        return commands::config::execute(args, &cli.config, writer).await;
    }

    let (mut config, from_file) = load_config(&cli.config).await?;
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(kubeconfig) = cli.kubeconfig {
        config.cluster.kubeconfig = Some(kubeconfig);
    }
    if let Some(context) = cli.context {
        config.cluster.context = Some(context);
    }
    config
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;

    logging::init_tracing(&config.general).map_err(|e| CliError::Command(format!("{e:#}")))?;
    converge_core::metrics::describe_all();

    if from_file {
        info!(path = %cli.config.display(), "configuration loaded");
    } else {
        info!(path = %cli.config.display(), "configuration file not found, using defaults");
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match cli.command {
        Commands::ScaleToZero(args) => {
            commands::scale::execute(args, &config, cancel, writer).await
        }
        Commands::Delete(args) => commands::delete::execute(args, &config, cancel, writer).await,
        Commands::WaitAbsent(args) => commands::wait::execute(args, &config, cancel, writer).await,
        Commands::Config(_) => Ok(()),
    }
}

/// 설정 파일을 로드합니다. 파일이 없으면 기본값에 환경변수만 적용합니다.
async fn load_config(path: &Path) -> Result<(HarnessConfig, bool), CliError> {
    match HarnessConfig::load(path).await {
        Ok(config) => Ok((config, true)),
        Err(ConvergeError::Config(ConfigError::FileNotFound { .. })) => {
            let mut config = HarnessConfig::default();
            config.apply_env_overrides();
            Ok((config, false))
        }
        Err(e) => Err(CliError::Config(e.to_string())),
    }
}

/// Ctrl-C를 받으면 진행 중인 대기를 취소합니다.
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received, cancelling");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "failed to listen for interrupt"),
        }
    });
}
