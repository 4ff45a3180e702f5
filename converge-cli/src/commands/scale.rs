//! `converge scale-to-zero` command handler

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::info;

use converge_core::config::HarnessConfig;
use converge_core::types::ReplicaField;
use converge_poller::lifecycle::OP_SCALE_TO_ZERO;
use converge_poller::{Harness, ResourceApi};

use crate::cli::ScaleArgs;
use crate::error::CliError;
use crate::output::OutputWriter;

/// Execute the `scale-to-zero` command.
pub async fn execute(
    args: ScaleArgs,
    config: &HarnessConfig,
    cancel: CancellationToken,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let harness = super::connect(config, cancel).await?;
    run(&harness, &args, writer).await
}

/// Scale the target down and wait until the chosen status field reads zero.
///
/// Without `--field` the kind's default field is used
/// (`available` for deployments, `current` for statefulsets).
pub async fn run<A: ResourceApi>(
    harness: &Harness<A>,
    args: &ScaleArgs,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let target = args.target.resource()?;
    let field = args
        .field
        .map(ReplicaField::from)
        .unwrap_or_else(|| target.kind.default_zero_field());

    info!(resource = %target, %field, "scaling to zero");
    let started = Instant::now();
    let outcome = harness.scale_to_zero(&target, field).await;
    super::finish(writer, OP_SCALE_TO_ZERO, &target, started.elapsed(), outcome)
}
