//! `converge wait-absent` command handler

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::info;

use converge_core::config::HarnessConfig;
use converge_poller::lifecycle::OP_WAIT_ABSENT;
use converge_poller::{Harness, ResourceApi, RetryAllClassifier, StrictClassifier};

use crate::cli::WaitAbsentArgs;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Execute the `wait-absent` command.
pub async fn execute(
    args: WaitAbsentArgs,
    config: &HarnessConfig,
    cancel: CancellationToken,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let harness = super::connect(config, cancel).await?;
    run(&harness, &args, writer).await
}

/// Poll reads until the target is gone. Nothing is deleted.
pub async fn run<A: ResourceApi>(
    harness: &Harness<A>,
    args: &WaitAbsentArgs,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let target = args.target.resource()?;

    info!(resource = %target, strict = args.strict, "waiting for absence");
    let started = Instant::now();
    let outcome = if args.strict {
        harness.wait_until_absent(&target, &StrictClassifier).await
    } else {
        harness.wait_until_absent(&target, &RetryAllClassifier).await
    };
    super::finish(writer, OP_WAIT_ABSENT, &target, started.elapsed(), outcome)
}
