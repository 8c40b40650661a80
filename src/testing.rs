//! In-memory cluster used by the reconciler tests

use crate::{
    capacity::CapacityProbe,
    client::GameClient,
    config::ControllerConfig,
    crds::{Game, GameSpec, GameStatus},
    error::{Error, Result},
    reconciler::Context,
    telemetry::Metrics,
};
use async_trait::async_trait;
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{ConfigMap, ContainerStatus, PersistentVolumeClaim, Pod, PodStatus, Service},
};
use kube::{api::ObjectMeta, Resource, ResourceExt};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

type Key = (String, String);

#[derive(Default)]
struct State {
    games: BTreeMap<Key, Game>,
    deployments: BTreeMap<Key, Deployment>,
    config_maps: BTreeMap<Key, ConfigMap>,
    pvcs: BTreeMap<Key, PersistentVolumeClaim>,
    services: BTreeMap<Key, Service>,
    pods: Vec<Pod>,
    service_replacements: usize,
    fail_pod_list: bool,
    next_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Stamp server assigned fields the way the API server does on create
    fn persist<K: Resource>(&mut self, object: &K) -> K
    where
        K: Clone,
    {
        let id = self.next_id();
        let mut stored = object.clone();
        let meta = stored.meta_mut();
        meta.uid = Some(format!("uid-{}", id));
        meta.resource_version = Some(id.to_string());
        meta.generation = Some(1);
        stored
    }
}

fn key_of<K: Resource>(object: &K) -> Key {
    (object.namespace().unwrap_or_default(), object.name_any())
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

fn conflict(kind: &'static str, name: &str) -> Error {
    Error::AlreadyExists {
        kind,
        name: name.to_string(),
    }
}

pub fn transport_error(reason: &'static str) -> kube::Error {
    kube::Error::Service(reason.into())
}

#[derive(Default)]
pub struct FakeCluster {
    state: Mutex<State>,
}

impl FakeCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_game(&self, namespace: &str, name: &str, spec: GameSpec) -> Game {
        let mut game = Game::new(name, spec);
        game.metadata.namespace = Some(namespace.to_string());
        let mut state = self.state.lock().unwrap();
        let stored = state.persist(&game);
        state.games.insert(key(namespace, name), stored.clone());
        stored
    }

    /// Spec edit as done by a user, bumps generation and resource version
    pub fn edit_spec(&self, namespace: &str, name: &str, edit: impl FnOnce(&mut GameSpec)) {
        let mut state = self.state.lock().unwrap();
        let version = state.next_id();
        let game = state.games.get_mut(&key(namespace, name)).expect("game exists");
        edit(&mut game.spec);
        game.metadata.generation = game.metadata.generation.map(|g| g + 1);
        game.metadata.resource_version = Some(version.to_string());
    }

    pub fn add_pod(&self, namespace: &str, app: &str, ready: bool) {
        let mut labels = BTreeMap::new();
        labels.insert("app".to_string(), app.to_string());
        let pod = Pod {
            metadata: ObjectMeta {
                name: Some(format!("{}-pod", app)),
                namespace: Some(namespace.to_string()),
                labels: Some(labels),
                ..Default::default()
            },
            status: Some(PodStatus {
                init_container_statuses: Some(vec![ContainerStatus {
                    name: "downloader".to_string(),
                    ready,
                    ..Default::default()
                }]),
                container_statuses: Some(vec![ContainerStatus {
                    name: "dosbox".to_string(),
                    ready,
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };
        self.state.lock().unwrap().pods.push(pod);
    }

    pub fn fail_pod_list(&self) {
        self.state.lock().unwrap().fail_pod_list = true;
    }

    pub fn game(&self, namespace: &str, name: &str) -> Option<Game> {
        self.state.lock().unwrap().games.get(&key(namespace, name)).cloned()
    }

    pub fn ready(&self, namespace: &str, name: &str) -> Option<bool> {
        self.game(namespace, name)
            .and_then(|g| g.status)
            .and_then(|s| s.ready)
    }

    pub fn deployment(&self, namespace: &str, name: &str) -> Option<Deployment> {
        self.state.lock().unwrap().deployments.get(&key(namespace, name)).cloned()
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<ConfigMap> {
        self.state.lock().unwrap().config_maps.get(&key(namespace, name)).cloned()
    }

    pub fn pvc(&self, namespace: &str, name: &str) -> Option<PersistentVolumeClaim> {
        self.state.lock().unwrap().pvcs.get(&key(namespace, name)).cloned()
    }

    pub fn service(&self, namespace: &str, name: &str) -> Option<Service> {
        self.state.lock().unwrap().services.get(&key(namespace, name)).cloned()
    }

    /// Number of deployments, config maps, claims and services
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        let state = self.state.lock().unwrap();
        (
            state.deployments.len(),
            state.config_maps.len(),
            state.pvcs.len(),
            state.services.len(),
        )
    }

    pub fn service_replacements(&self) -> usize {
        self.state.lock().unwrap().service_replacements
    }
}

#[async_trait]
impl GameClient for FakeCluster {
    async fn get_game(&self, namespace: &str, name: &str) -> Result<Option<Game>> {
        tokio::task::yield_now().await;
        Ok(self.game(namespace, name))
    }

    async fn patch_game_status(&self, game: &Game, patch: &serde_json::Value) -> Result<()> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let version = state.next_id();

        let stored = state
            .games
            .get_mut(&key_of(game))
            .ok_or_else(|| Error::KubeError(transport_error("not found")))?;

        if let Some(expected) = patch.pointer("/metadata/resourceVersion").and_then(|v| v.as_str()) {
            if stored.metadata.resource_version.as_deref() != Some(expected) {
                return Err(Error::KubeError(transport_error("conflict")));
            }
        }

        let status = stored.status.get_or_insert_with(GameStatus::default);
        status.ready = patch.pointer("/status/ready").and_then(|v| v.as_bool());
        stored.metadata.resource_version = Some(version.to_string());
        Ok(())
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        tokio::task::yield_now().await;
        Ok(self.deployment(namespace, name))
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let k = key_of(deployment);
        if state.deployments.contains_key(&k) {
            return Err(conflict("Deployment", &k.1));
        }
        let stored = state.persist(deployment);
        state.deployments.insert(k, stored.clone());
        Ok(stored)
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<bool> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let Some(removed) = state.deployments.remove(&key(namespace, name)) else {
            return Ok(false);
        };

        // garbage collection of everything the deployment controls
        let uid = removed.metadata.uid.unwrap_or_default();
        let owned = |meta: &ObjectMeta| {
            meta.owner_references
                .as_ref()
                .map(|refs| refs.iter().any(|r| r.uid == uid))
                .unwrap_or(false)
        };
        state.config_maps.retain(|_, o| !owned(&o.metadata));
        state.pvcs.retain(|_, o| !owned(&o.metadata));
        state.services.retain(|_, o| !owned(&o.metadata));
        Ok(true)
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        tokio::task::yield_now().await;
        Ok(self.config_map(namespace, name))
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let k = key_of(config_map);
        if state.config_maps.contains_key(&k) {
            return Err(conflict("ConfigMap", &k.1));
        }
        let stored = state.persist(config_map);
        state.config_maps.insert(k, stored.clone());
        Ok(stored)
    }

    async fn get_pvc(&self, namespace: &str, name: &str) -> Result<Option<PersistentVolumeClaim>> {
        tokio::task::yield_now().await;
        Ok(self.pvc(namespace, name))
    }

    async fn create_pvc(&self, pvc: &PersistentVolumeClaim) -> Result<PersistentVolumeClaim> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let k = key_of(pvc);
        if state.pvcs.contains_key(&k) {
            return Err(conflict("PersistentVolumeClaim", &k.1));
        }
        let stored = state.persist(pvc);
        state.pvcs.insert(k, stored.clone());
        Ok(stored)
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>> {
        tokio::task::yield_now().await;
        Ok(self.service(namespace, name))
    }

    async fn create_service(&self, service: &Service) -> Result<Service> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let k = key_of(service);
        if state.services.contains_key(&k) {
            return Err(conflict("Service", &k.1));
        }
        let stored = state.persist(service);
        state.services.insert(k, stored.clone());
        Ok(stored)
    }

    async fn replace_service(&self, service: &Service) -> Result<Service> {
        tokio::task::yield_now().await;
        let mut state = self.state.lock().unwrap();
        let version = state.next_id();
        let mut stored = service.clone();
        stored.metadata.resource_version = Some(version.to_string());
        state.services.insert(key_of(service), stored.clone());
        state.service_replacements += 1;
        Ok(stored)
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        tokio::task::yield_now().await;
        let state = self.state.lock().unwrap();
        if state.fail_pod_list {
            return Err(Error::PodList(transport_error("connection reset")));
        }
        let (label, value) = label_selector.split_once('=').unwrap_or((label_selector, ""));
        Ok(state
            .pods
            .iter()
            .filter(|p| p.namespace().as_deref() == Some(namespace))
            .filter(|p| p.labels().get(label).map(String::as_str) == Some(value))
            .cloned()
            .collect())
    }
}

/// Probe answering with a fixed length
pub struct StaticProbe {
    length: Option<u64>,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticProbe {
    pub fn with_length(length: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            length,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            length: None,
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CapacityProbe for StaticProbe {
    async fn content_length(&self, url: &str) -> Result<Option<u64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Probe {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        Ok(self.length)
    }
}

pub fn context(client: Arc<dyn GameClient>, probe: Arc<dyn CapacityProbe>) -> Context {
    Context {
        client,
        probe,
        config: Arc::new(ControllerConfig::default()),
        metrics: Arc::new(Metrics::default()),
    }
}

pub fn spec(deploy: bool, port: i32) -> GameSpec {
    GameSpec {
        game_name: "Doom".to_string(),
        url: "https://cdn.example.com/games/doom.jsdos".to_string(),
        deploy,
        port,
    }
}
