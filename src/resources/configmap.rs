use crate::{
    crds::Game,
    error::Result,
    reconciler::Context,
    resources::{created_or_exists, labels, owner},
    utils,
};
use k8s_openapi::api::{apps::v1::Deployment, core::v1::ConfigMap};
use kube::{api::ObjectMeta, ResourceExt};
use std::collections::BTreeMap;

pub const INDEX_KEY: &str = "index.html";

/// Emulator files the page loads from the shared assets claim
pub const JS_DOS_FILES: [&str; 2] = ["js-dos.js", "js-dos.css"];

/// Create the index page ConfigMap if it does not exist yet.
/// The page is rendered once, later url changes are not picked up.
pub async fn ensure(game: &Game, namespace: &str, workload: &Deployment, ctx: &Context) -> Result<()> {
    let name = utils::config_map_name(&game.name_any());

    if ctx.client.get_config_map(namespace, &name).await?.is_some() {
        return Ok(());
    }

    let mut cm = build(namespace, &game.name_any(), &utils::bundle_name(&game.spec.url));
    owner::bind(workload, &mut cm.metadata)?;

    created_or_exists(
        ctx.client.create_config_map(&cm).await,
        "ConfigMap",
        &name,
        namespace,
    )
}

pub fn build(namespace: &str, game_name: &str, bundle: &str) -> ConfigMap {
    let mut data = BTreeMap::new();
    data.insert(INDEX_KEY.to_string(), render_index(bundle));

    ConfigMap {
        metadata: ObjectMeta {
            name: Some(utils::config_map_name(game_name)),
            namespace: Some(namespace.to_string()),
            labels: Some(labels::common_labels(game_name, "index")),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    }
}

fn render_index(bundle: &str) -> String {
    format!(
        r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8">
  <title>{bundle}</title>
  <link rel="stylesheet" href="assets/js-dos.css">
  <script src="assets/js-dos.js"></script>
</head>
<body style="margin: 0">
  <div id="dos" style="width: 100vw; height: 100vh"></div>
  <script>Dos(document.getElementById("dos"), {{ url: "game/{bundle}" }});</script>
</body>
</html>
"#
    )
}
