//! Object store access used by the reconciler.
//!
//! Lookups return `Ok(None)` for missing objects and creates report a conflict as
//! [`Error::AlreadyExists`], so callers never match on raw API status codes.

use crate::{
    crds::Game,
    error::{Error, Result},
};
use async_trait::async_trait;
use k8s_openapi::api::{
    apps::v1::Deployment,
    core::v1::{ConfigMap, PersistentVolumeClaim, Pod, Service},
};
use kube::{
    api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams},
    Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

/// Kubernetes operations the reconciler depends on
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GameClient: Send + Sync {
    async fn get_game(&self, namespace: &str, name: &str) -> Result<Option<Game>>;

    /// Merge patch against the status subresource
    async fn patch_game_status(&self, game: &Game, patch: &serde_json::Value) -> Result<()>;

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>>;
    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment>;

    /// Returns false if there was nothing to delete
    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<bool>;

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>>;
    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap>;

    async fn get_pvc(&self, namespace: &str, name: &str) -> Result<Option<PersistentVolumeClaim>>;
    async fn create_pvc(&self, pvc: &PersistentVolumeClaim) -> Result<PersistentVolumeClaim>;

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>>;
    async fn create_service(&self, service: &Service) -> Result<Service>;
    async fn replace_service(&self, service: &Service) -> Result<Service>;

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>>;
}

/// [`GameClient`] backed by the API server
#[derive(Clone)]
pub struct KubeGameClient {
    client: Client,
}

impl KubeGameClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn object_namespace<K: Resource>(object: &K) -> Result<String> {
    object
        .meta()
        .namespace
        .clone()
        .ok_or_else(|| Error::MissingNamespace(object.name_any()))
}

async fn get_opt<K>(api: &Api<K>, name: &str) -> Result<Option<K>>
where
    K: Clone + DeserializeOwned + Debug,
{
    Ok(api.get_opt(name).await?)
}

async fn create<K>(api: &Api<K>, object: &K, kind: &'static str) -> Result<K>
where
    K: Resource + Clone + Serialize + DeserializeOwned + Debug,
{
    match api.create(&PostParams::default(), object).await {
        Ok(created) => Ok(created),
        Err(kube::Error::Api(ae)) if ae.code == 409 => Err(Error::AlreadyExists {
            kind,
            name: object.name_any(),
        }),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl GameClient for KubeGameClient {
    async fn get_game(&self, namespace: &str, name: &str) -> Result<Option<Game>> {
        get_opt(&self.api::<Game>(namespace), name).await
    }

    async fn patch_game_status(&self, game: &Game, patch: &serde_json::Value) -> Result<()> {
        let api: Api<Game> = self.api(&object_namespace(game)?);
        api.patch_status(&game.name_any(), &PatchParams::default(), &Patch::Merge(patch))
            .await?;
        Ok(())
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Option<Deployment>> {
        get_opt(&self.api::<Deployment>(namespace), name).await
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let api = self.api(&object_namespace(deployment)?);
        create(&api, deployment, "Deployment").await
    }

    async fn delete_deployment(&self, namespace: &str, name: &str) -> Result<bool> {
        let api: Api<Deployment> = self.api(namespace);
        match api.delete(name, &DeleteParams::background()).await {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_config_map(&self, namespace: &str, name: &str) -> Result<Option<ConfigMap>> {
        get_opt(&self.api::<ConfigMap>(namespace), name).await
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<ConfigMap> {
        let api = self.api(&object_namespace(config_map)?);
        create(&api, config_map, "ConfigMap").await
    }

    async fn get_pvc(&self, namespace: &str, name: &str) -> Result<Option<PersistentVolumeClaim>> {
        get_opt(&self.api::<PersistentVolumeClaim>(namespace), name).await
    }

    async fn create_pvc(&self, pvc: &PersistentVolumeClaim) -> Result<PersistentVolumeClaim> {
        let api = self.api(&object_namespace(pvc)?);
        create(&api, pvc, "PersistentVolumeClaim").await
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Option<Service>> {
        get_opt(&self.api::<Service>(namespace), name).await
    }

    async fn create_service(&self, service: &Service) -> Result<Service> {
        let api = self.api(&object_namespace(service)?);
        create(&api, service, "Service").await
    }

    async fn replace_service(&self, service: &Service) -> Result<Service> {
        let api: Api<Service> = self.api(&object_namespace(service)?);
        Ok(api
            .replace(&service.name_any(), &PostParams::default(), service)
            .await?)
    }

    async fn list_pods(&self, namespace: &str, label_selector: &str) -> Result<Vec<Pod>> {
        let api: Api<Pod> = self.api(namespace);
        let pods = api
            .list(&ListParams::default().labels(label_selector))
            .await
            .map_err(Error::PodList)?;
        Ok(pods.items)
    }
}
