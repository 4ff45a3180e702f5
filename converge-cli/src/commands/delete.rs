//! `converge delete` command handler

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::info;

use converge_core::config::HarnessConfig;
use converge_poller::lifecycle::OP_WAIT_DELETED;
use converge_poller::{Harness, ResourceApi};

use crate::cli::TargetArgs;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Execute the `delete` command.
pub async fn execute(
    args: TargetArgs,
    config: &HarnessConfig,
    cancel: CancellationToken,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let harness = super::connect(config, cancel).await?;
    run(&harness, &args, writer).await
}

/// Request deletion and wait until reads report the target gone.
pub async fn run<A: ResourceApi>(
    harness: &Harness<A>,
    args: &TargetArgs,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let target = args.resource()?;

    info!(resource = %target, "deleting");
    let started = Instant::now();
    let outcome = harness.delete_and_wait(&target).await;
    super::finish(writer, OP_WAIT_DELETED, &target, started.elapsed(), outcome)
}
