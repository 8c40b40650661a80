//! Readiness of a deployed game.
//!
//! A game is ready when at least one of its pods has every init and main container
//! reporting ready. Every evaluation is written to `status.ready`; games that are
//! not ready yet are polled again after the configured requeue interval.

use super::{update_status, Context};
use crate::{
    config::ReadinessPolicy,
    crds::{Game, Readiness},
    error::Result,
    resources::labels,
};
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{ContainerStatus, Pod},
};
use kube::{runtime::controller::Action, ResourceExt};
use tracing::{debug, info, warn};

pub async fn refresh_status(
    game: &Game,
    namespace: &str,
    workload: &Deployment,
    ctx: &Context,
) -> Result<Action> {
    let app = labels::app_label(workload).unwrap_or_else(|| game.name_any());
    let interval = ctx.config.requeue_interval();

    let pods = match ctx.client.list_pods(namespace, &labels::app_selector(&app)).await {
        Ok(pods) => pods,
        Err(e) => {
            warn!("Unable to fetch pod status of {}: {}", app, e);
            if let Err(status_err) = update_status(game, ctx, Readiness::NotReady).await {
                warn!("Unable to patch status of {}: {}", game.name_any(), status_err);
            }
            return Err(e);
        }
    };

    let readiness = evaluate(&pods, ctx.config.readiness_policy);

    if !readiness.is_ready() {
        info!("{} not ready, requeue in {}s", game.name_any(), interval.as_secs());
        if let Err(e) = update_status(game, ctx, readiness).await {
            warn!("Unable to patch status of {}: {}", game.name_any(), e);
        }
        return Ok(Action::requeue(interval));
    }

    if let Err(e) = update_status(game, ctx, readiness).await {
        warn!("Unable to patch status of {}: {}", game.name_any(), e);
        return Ok(Action::requeue(interval));
    }

    if game.readiness().is_ready() {
        debug!("{} is still ready", game.name_any());
    } else {
        info!("{} is ready", game.name_any().to_lowercase());
        ctx.metrics.record_ready();
    }

    Ok(Action::await_change())
}

/// Ready if any pod is ready
pub fn evaluate(pods: &[Pod], policy: ReadinessPolicy) -> Readiness {
    pods.iter().any(|pod| pod_ready(pod, policy)).into()
}

pub fn pod_ready(pod: &Pod, policy: ReadinessPolicy) -> bool {
    let Some(status) = pod.status.as_ref() else {
        return false;
    };

    group_ready(status.init_container_statuses.as_deref(), policy)
        && group_ready(status.container_statuses.as_deref(), policy)
}

fn group_ready(statuses: Option<&[ContainerStatus]>, policy: ReadinessPolicy) -> bool {
    match (statuses, policy) {
        (None, _) | (Some([]), _) => false,
        (Some(all), ReadinessPolicy::AllContainers) => all.iter().all(|c| c.ready),
        (Some([first, ..]), ReadinessPolicy::FirstOfEachGroup) => first.ready,
    }
}
