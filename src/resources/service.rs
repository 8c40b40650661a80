use crate::{
    config::ControllerConfig,
    crds::Game,
    error::Result,
    reconciler::Context,
    resources::{created_or_exists, deployment::PORT_NAME, labels, owner},
};
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        core::v1::{Service, ServicePort, ServiceSpec},
    },
    apimachinery::pkg::util::intstr::IntOrString,
};
use kube::{api::ObjectMeta, ResourceExt};
use tracing::info;

/// Create the game Service if it is missing, otherwise keep its port in line with the spec.
/// The port is the only field reconciled after creation.
pub async fn ensure(game: &Game, namespace: &str, workload: &Deployment, ctx: &Context) -> Result<()> {
    let name = game.name_any();

    match ctx.client.get_service(namespace, &name).await? {
        Some(existing) => {
            if let Some(updated) = with_port(&existing, game.spec.port) {
                ctx.client.replace_service(&updated).await?;
                info!("Updated port of service {} to {}", name, game.spec.port);
            }
            Ok(())
        }
        None => {
            let mut svc = build(namespace, &name, game.spec.port, &ctx.config);
            owner::bind(workload, &mut svc.metadata)?;

            created_or_exists(ctx.client.create_service(&svc).await, "Service", &name, namespace)
        }
    }
}

pub fn build(namespace: &str, game_name: &str, port: i32, config: &ControllerConfig) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(game_name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels::common_labels(game_name, "game")),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(config.service_type.clone()),
            selector: Some(labels::pod_selector_labels(game_name)),
            ports: Some(vec![service_port(port)]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn service_port(port: i32) -> ServicePort {
    ServicePort {
        name: Some(PORT_NAME.to_string()),
        port,
        target_port: Some(IntOrString::String(PORT_NAME.to_string())),
        protocol: Some("TCP".to_string()),
        ..Default::default()
    }
}

/// Copy of `existing` with only the first port changed, `None` if it already matches
pub fn with_port(existing: &Service, port: i32) -> Option<Service> {
    let current = existing
        .spec
        .as_ref()
        .and_then(|s| s.ports.as_ref())
        .and_then(|p| p.first())
        .map(|p| p.port);

    if current == Some(port) {
        return None;
    }

    let mut updated = existing.clone();
    let ports = updated
        .spec
        .get_or_insert_with(Default::default)
        .ports
        .get_or_insert_with(Vec::new);
    match ports.first_mut() {
        Some(first) => first.port = port,
        None => ports.push(service_port(port)),
    }
    Some(updated)
}
