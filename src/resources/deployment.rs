use crate::{
    config::ControllerConfig,
    crds::Game,
    error::Result,
    reconciler::Context,
    resources::{
        configmap::{INDEX_KEY, JS_DOS_FILES},
        labels, owner,
    },
    utils,
};
use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{
            ConfigMapVolumeSource, Container, ContainerPort, EnvVar,
            PersistentVolumeClaimVolumeSource, PodSpec, PodTemplateSpec, Probe, TCPSocketAction,
            Volume, VolumeMount,
        },
    },
    apimachinery::pkg::{apis::meta::v1::LabelSelector, util::intstr::IntOrString},
};
use kube::{api::ObjectMeta, ResourceExt};
use tracing::info;

pub const PORT_NAME: &str = "http";

const HTML_ROOT: &str = "/usr/share/nginx/html";
const GAME_VOLUME: &str = "game";
const ASSETS_VOLUME: &str = "assets";
const INDEX_VOLUME: &str = "index";

/// Create the game Deployment if it does not exist yet and return the stored object.
/// The game becomes the controller of a newly created Deployment.
pub async fn ensure(game: &Game, namespace: &str, ctx: &Context) -> Result<Deployment> {
    let name = game.name_any();

    if let Some(existing) = ctx.client.get_deployment(namespace, &name).await? {
        return Ok(existing);
    }

    let mut deployment = build(game, namespace, &ctx.config);
    owner::bind(game, &mut deployment.metadata)?;

    match ctx.client.create_deployment(&deployment).await {
        Ok(created) => {
            info!("Created deployment {} in {}", name, namespace);
            Ok(created)
        }
        Err(e) if e.is_already_exists() => {
            info!("Deployment {} already exists", name);
            // the children need the stored uid
            ctx.client.get_deployment(namespace, &name).await?.ok_or(e)
        }
        Err(e) => Err(e),
    }
}

pub fn build(game: &Game, namespace: &str, config: &ControllerConfig) -> Deployment {
    let name = game.name_any();
    let bundle = utils::bundle_name(&game.spec.url);
    let port = game.spec.port;

    // skips the download when the claim already holds the bundle
    let download = Container {
        name: "downloader".to_string(),
        image: Some(config.init_image.clone()),
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"[ -f "/game/$BUNDLE" ] || curl -fsSL -o "/game/$BUNDLE" "$GAME_URL""#.to_string(),
        ]),
        env: Some(vec![
            EnvVar {
                name: "GAME_URL".to_string(),
                value: Some(game.spec.url.clone()),
                ..Default::default()
            },
            EnvVar {
                name: "BUNDLE".to_string(),
                value: Some(bundle),
                ..Default::default()
            },
        ]),
        volume_mounts: Some(vec![VolumeMount {
            name: GAME_VOLUME.to_string(),
            mount_path: "/game".to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    // several games fill the shared claim, files only appear once complete
    let assets = Container {
        name: "assets".to_string(),
        image: Some(config.init_image.clone()),
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"set -e; for f in $FILES; do [ -f "/assets/$f" ] && continue; curl -fsSL -o "/assets/.$f.$HOSTNAME" "$JS_DOS_URL/$f"; mv "/assets/.$f.$HOSTNAME" "/assets/$f"; done"#
                .to_string(),
        ]),
        env: Some(vec![
            EnvVar {
                name: "JS_DOS_URL".to_string(),
                value: Some(config.js_dos_url.trim_end_matches('/').to_string()),
                ..Default::default()
            },
            EnvVar {
                name: "FILES".to_string(),
                value: Some(JS_DOS_FILES.join(" ")),
                ..Default::default()
            },
        ]),
        volume_mounts: Some(vec![VolumeMount {
            name: ASSETS_VOLUME.to_string(),
            mount_path: "/assets".to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    let server = Container {
        name: "dosbox".to_string(),
        image: Some(config.server_image.clone()),
        command: Some(vec![
            "sh".to_string(),
            "-c".to_string(),
            r#"sed -i "s/listen  *80;/listen $PORT;/" /etc/nginx/conf.d/default.conf && exec nginx -g 'daemon off;'"#
                .to_string(),
        ]),
        env: Some(vec![EnvVar {
            name: "PORT".to_string(),
            value: Some(port.to_string()),
            ..Default::default()
        }]),
        ports: Some(vec![ContainerPort {
            name: Some(PORT_NAME.to_string()),
            container_port: port,
            protocol: Some("TCP".to_string()),
            ..Default::default()
        }]),
        readiness_probe: Some(Probe {
            tcp_socket: Some(TCPSocketAction {
                port: IntOrString::String(PORT_NAME.to_string()),
                ..Default::default()
            }),
            period_seconds: Some(5),
            ..Default::default()
        }),
        volume_mounts: Some(vec![
            VolumeMount {
                name: INDEX_VOLUME.to_string(),
                mount_path: format!("{}/{}", HTML_ROOT, INDEX_KEY),
                sub_path: Some(INDEX_KEY.to_string()),
                read_only: Some(true),
                ..Default::default()
            },
            VolumeMount {
                name: GAME_VOLUME.to_string(),
                mount_path: format!("{}/game", HTML_ROOT),
                read_only: Some(true),
                ..Default::default()
            },
            VolumeMount {
                name: ASSETS_VOLUME.to_string(),
                mount_path: format!("{}/assets", HTML_ROOT),
                read_only: Some(true),
                ..Default::default()
            },
        ]),
        ..Default::default()
    };

    let volumes = vec![
        Volume {
            name: GAME_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: utils::pvc_name(&name),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: ASSETS_VOLUME.to_string(),
            persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
                claim_name: config.shared_claim_name.clone(),
                ..Default::default()
            }),
            ..Default::default()
        },
        Volume {
            name: INDEX_VOLUME.to_string(),
            config_map: Some(ConfigMapVolumeSource {
                name: utils::config_map_name(&name),
                ..Default::default()
            }),
            ..Default::default()
        },
    ];

    Deployment {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels::common_labels(&name, "game")),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels::pod_selector_labels(&name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels::common_labels(&name, "game")),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    init_containers: Some(vec![download, assets]),
                    containers: vec![server],
                    volumes: Some(volumes),
                    enable_service_links: Some(false),
                    automount_service_account_token: Some(false),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}
