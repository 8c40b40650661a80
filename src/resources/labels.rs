use k8s_openapi::api::apps::v1::Deployment;
use std::collections::BTreeMap;

pub const APP: &str = "app";
pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
pub const COMPONENT: &str = "app.kubernetes.io/component";
pub const MANAGER: &str = "dosbox-operator";

/// Generate standard labels for all resources of a game
pub fn common_labels(game_name: &str, component: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(MANAGED_BY.to_string(), MANAGER.to_string());
    labels.insert(COMPONENT.to_string(), component.to_string());
    labels.insert(APP.to_string(), game_name.to_string());
    labels
}

/// Labels identifying the pods of a game
pub fn pod_selector_labels(game_name: &str) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(APP.to_string(), game_name.to_string());
    labels
}

/// The `app` label the workload stamps on its pods
pub fn app_label(deployment: &Deployment) -> Option<String> {
    deployment
        .metadata
        .labels
        .as_ref()
        .and_then(|l| l.get(APP))
        .cloned()
}

pub fn app_selector(app: &str) -> String {
    format!("{}={}", APP, app)
}
