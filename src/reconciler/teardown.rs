use super::{update_status, Context};
use crate::{
    crds::{Game, Readiness},
    error::Result,
};
use kube::{runtime::controller::Action, ResourceExt};
use tracing::info;

/// Remove the workload of a game that should not run. Everything else the
/// workload owns is garbage collected by the API server.
pub async fn teardown(game: &Game, namespace: &str, ctx: &Context) -> Result<Action> {
    if ctx.client.delete_deployment(namespace, &game.name_any()).await? {
        info!("{} is removed", game.spec.game_name.to_lowercase());
        ctx.metrics.record_teardown();
    }

    update_status(game, ctx, Readiness::NotReady).await?;

    Ok(Action::await_change())
}
