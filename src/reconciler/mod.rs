use crate::{
    capacity::{CapacityProbe, LazyCapacity},
    client::GameClient,
    config::ControllerConfig,
    crds::{Game, GameStatus, Readiness},
    error::{Error, Result},
    resources,
    telemetry::Metrics,
};
use kube::{runtime::controller::Action, ResourceExt};
use std::{fmt, sync::Arc};
use tracing::{debug, error, instrument};

pub mod readiness;
pub mod teardown;

#[derive(Clone)]
pub struct Context {
    pub client: Arc<dyn GameClient>,
    pub probe: Arc<dyn CapacityProbe>,
    pub config: Arc<ControllerConfig>,
    pub metrics: Arc<Metrics>,
}

/// Namespace and name of a game
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GameKey {
    pub namespace: String,
    pub name: String,
}

impl GameKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn of(game: &Game) -> Result<Self> {
        let namespace = game
            .namespace()
            .ok_or_else(|| Error::MissingNamespace(format!("Game {}", game.name_any())))?;
        Ok(Self::new(namespace, game.name_any()))
    }
}

impl fmt::Display for GameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Entry point for the controller runtime
#[instrument(skip(game, ctx), fields(namespace = %game.namespace().unwrap_or_default(), game = %game.name_any()))]
pub async fn reconcile(game: Arc<Game>, ctx: Arc<Context>) -> Result<Action> {
    let key = GameKey::of(&game)?;
    reconcile_key(&key, &ctx).await
}

/// One reconcile pass for `key`, working on a fresh copy of the game
pub async fn reconcile_key(key: &GameKey, ctx: &Context) -> Result<Action> {
    ctx.metrics.record_reconcile();

    let Some(game) = ctx.client.get_game(&key.namespace, &key.name).await? else {
        debug!("Game {} is gone, nothing to do", key);
        return Ok(Action::await_change());
    };

    if !game.spec.deploy {
        return teardown::teardown(&game, &key.namespace, ctx).await;
    }

    deploy(&game, &key.namespace, ctx).await
}

async fn deploy(game: &Game, namespace: &str, ctx: &Context) -> Result<Action> {
    debug!("Converging resources of game {}", game.name_any());
    let mut capacity = LazyCapacity::new(ctx.probe.as_ref(), &game.spec.url);

    // strictly ordered, the workload owns everything created after it
    resources::pvc::ensure_shared(namespace, &mut capacity, ctx).await?;
    let workload = resources::deployment::ensure(game, namespace, ctx).await?;
    resources::configmap::ensure(game, namespace, &workload, ctx).await?;
    resources::pvc::ensure_dedicated(game, namespace, &workload, &mut capacity, ctx).await?;
    resources::service::ensure(game, namespace, &workload, ctx).await?;

    readiness::refresh_status(game, namespace, &workload, ctx).await
}

/// Merge patch moving `status` onto the snapshot. The snapshot's resource version
/// makes the write fail instead of overwriting a newer object.
pub fn status_patch(snapshot: &Game, status: &GameStatus) -> serde_json::Value {
    let mut patch = serde_json::json!({
        "status": {
            "ready": status.ready
        }
    });
    if let Some(ref version) = snapshot.metadata.resource_version {
        patch["metadata"] = serde_json::json!({ "resourceVersion": version });
    }
    patch
}

/// Helper to update status
pub async fn update_status(game: &Game, ctx: &Context, readiness: Readiness) -> Result<()> {
    let mut status = game.status.clone().unwrap_or_default();
    status.ready = readiness.to_wire();

    ctx.client
        .patch_game_status(game, &status_patch(game, &status))
        .await
}

/// Error handling for reconciliation
pub fn error_policy(_game: Arc<Game>, error: &Error, ctx: Arc<Context>) -> Action {
    error!("[*] Reconciliation error: {:?}", error);
    ctx.metrics.record_error();

    if error.is_retryable() {
        Action::requeue(ctx.config.requeue_interval())
    } else {
        Action::requeue(ctx.config.error_requeue())
    }
}
