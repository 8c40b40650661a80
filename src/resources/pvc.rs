use crate::{
    capacity::LazyCapacity,
    config::ControllerConfig,
    crds::Game,
    error::Result,
    reconciler::Context,
    resources::{created_or_exists, labels, owner},
    utils,
};
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        core::v1::{PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeResourceRequirements},
    },
    apimachinery::pkg::api::resource::Quantity,
};
use kube::{api::ObjectMeta, ResourceExt};
use std::collections::BTreeMap;

/// Create the namespace wide assets claim if it is missing.
/// It has no owner so it outlives every single game, its size comes from
/// whichever game creates it first.
pub async fn ensure_shared(
    namespace: &str,
    capacity: &mut LazyCapacity<'_>,
    ctx: &Context,
) -> Result<()> {
    let name = &ctx.config.shared_claim_name;

    if ctx.client.get_pvc(namespace, name).await?.is_some() {
        return Ok(());
    }

    let pvc = build_shared(namespace, name, capacity.get().await?, &ctx.config);

    created_or_exists(
        ctx.client.create_pvc(&pvc).await,
        "PersistentVolumeClaim",
        name,
        namespace,
    )
}

/// Create the claim the game bundle is downloaded into, owned by the workload.
/// The size is fixed at creation.
pub async fn ensure_dedicated(
    game: &Game,
    namespace: &str,
    workload: &Deployment,
    capacity: &mut LazyCapacity<'_>,
    ctx: &Context,
) -> Result<()> {
    let name = utils::pvc_name(&game.name_any());

    if ctx.client.get_pvc(namespace, &name).await?.is_some() {
        return Ok(());
    }

    let mut pvc = build_dedicated(namespace, &game.name_any(), capacity.get().await?, &ctx.config);
    owner::bind(workload, &mut pvc.metadata)?;

    created_or_exists(
        ctx.client.create_pvc(&pvc).await,
        "PersistentVolumeClaim",
        &name,
        namespace,
    )
}

pub fn build_dedicated(
    namespace: &str,
    game_name: &str,
    mib: u64,
    config: &ControllerConfig,
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(utils::pvc_name(game_name)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels::common_labels(game_name, "game-storage")),
            ..Default::default()
        },
        spec: Some(claim_spec("ReadWriteOnce", mib, config)),
        ..Default::default()
    }
}

pub fn build_shared(
    namespace: &str,
    claim_name: &str,
    mib: u64,
    config: &ControllerConfig,
) -> PersistentVolumeClaim {
    let mut claim_labels = BTreeMap::new();
    claim_labels.insert(labels::MANAGED_BY.to_string(), labels::MANAGER.to_string());
    claim_labels.insert(labels::COMPONENT.to_string(), "assets".to_string());

    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(claim_name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(claim_labels),
            ..Default::default()
        },
        spec: Some(claim_spec("ReadWriteMany", mib, config)),
        ..Default::default()
    }
}

fn claim_spec(access_mode: &str, mib: u64, config: &ControllerConfig) -> PersistentVolumeClaimSpec {
    let mut requests = BTreeMap::new();
    requests.insert("storage".to_string(), Quantity(format!("{}Mi", mib)));

    PersistentVolumeClaimSpec {
        access_modes: Some(vec![access_mode.to_string()]),
        resources: Some(VolumeResourceRequirements {
            requests: Some(requests),
            ..Default::default()
        }),
        storage_class_name: config.storage_class.clone(),
        ..Default::default()
    }
}
