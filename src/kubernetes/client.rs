//! Kubernetes API client
//!
//! Wraps the kube crate behind the [`Cluster`] trait: the read-only lookups
//! needed to turn a workload reference into a pod. Configuration and client
//! are created lazily so flag errors never touch kubeconfig or the network,
//! and the default namespace is taken from the same configuration the client
//! connects with.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{Pod, ReplicationController};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{Api, ApiResource, DynamicObject, GroupVersionKind, ListParams},
    config::{KubeConfigOptions, Kubeconfig},
    Client, Config, Resource,
};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::OnceCell;

use super::resolver::WorkloadKind;
use super::selector::{self, SelectorError};

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Kubernetes API error: {0}")]
    ClientError(#[from] kube::Error),
    #[error("Failed to load kubeconfig: {0}")]
    KubeconfigError(#[from] kube::config::KubeconfigError),
    #[error("Failed to infer config: {0}")]
    InferError(#[from] kube::config::InferConfigError),
    #[error(transparent)]
    InvalidSelector(#[from] SelectorError),
}

/// Read-only cluster lookups used during target resolution.
///
/// Implemented by [`KubeCluster`] against a live API server and by in-memory
/// fakes in tests.
#[async_trait]
pub trait Cluster: Send + Sync {
    /// Namespace a session runs in.
    async fn default_namespace(&self) -> Result<String, ClusterError>;

    /// Fetch a pod, `None` if it does not exist.
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ClusterError>;

    /// List pods matching a label selector.
    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, ClusterError>;

    /// Pod selector of a workload object, `None` if the object does not exist.
    async fn workload_selector(
        &self,
        namespace: &str,
        kind: WorkloadKind,
        name: &str,
    ) -> Result<Option<String>, ClusterError>;
}

/// Kubernetes API client built from kubeconfig or in-cluster configuration
pub struct KubeCluster {
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
    namespace: Option<String>,
    config: OnceCell<Config>,
    client: OnceCell<Client>,
}

impl KubeCluster {
    pub fn new(
        kubeconfig: Option<PathBuf>,
        context: Option<String>,
        namespace: Option<String>,
    ) -> Self {
        Self {
            kubeconfig,
            context,
            namespace,
            config: OnceCell::new(),
            client: OnceCell::new(),
        }
    }

    /// Get the client configuration, loading it on first use
    pub async fn config(&self) -> Result<&Config, ClusterError> {
        self.config.get_or_try_init(|| self.load_config()).await
    }

    /// Get the raw kube client, creating it on first use
    pub async fn client(&self) -> Result<Client, ClusterError> {
        self.client
            .get_or_try_init(|| async {
                let start = std::time::Instant::now();
                let client = Client::try_from(self.config().await?.clone())?;
                tracing::debug!("Client created in {:?}", start.elapsed());
                Ok::<_, ClusterError>(client)
            })
            .await
            .cloned()
    }

    async fn load_config(&self) -> Result<Config, ClusterError> {
        let start = std::time::Instant::now();

        // Without overrides, infer merges every KUBECONFIG entry and falls
        // back to the in-cluster service account
        let config = if self.kubeconfig.is_none() && self.context.is_none() {
            Config::infer().await?
        } else {
            let options = KubeConfigOptions {
                context: self.context.clone(),
                ..Default::default()
            };
            match &self.kubeconfig {
                Some(path) => {
                    let kubeconfig = Kubeconfig::read_from(path)?;
                    Config::from_custom_kubeconfig(kubeconfig, &options).await?
                }
                None => Config::from_kubeconfig(&options).await?,
            }
        };
        tracing::debug!(
            "Config loaded in {:?} (namespace: {})",
            start.elapsed(),
            config.default_namespace
        );
        Ok(config)
    }

    async fn get_namespaced<K>(&self, namespace: &str, name: &str) -> Result<Option<K>, ClusterError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client().await?, namespace);
        Ok(api.get_opt(name).await?)
    }

    async fn deployment_config_selector(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<String>, ClusterError> {
        let gvk = GroupVersionKind::gvk("apps.openshift.io", "v1", "DeploymentConfig");
        let resource = ApiResource::from_gvk_with_plural(&gvk, "deploymentconfigs");
        let api: Api<DynamicObject> =
            Api::namespaced_with(self.client().await?, namespace, &resource);

        let Some(dc) = api.get_opt(name).await? else {
            return Ok(None);
        };

        let labels: BTreeMap<String, String> = dc
            .data
            .pointer("/spec/selector")
            .and_then(|v| v.as_object())
            .map(|map| {
                map.iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Some(selector::from_labels(&labels)))
    }
}

fn render(label_selector: Option<&LabelSelector>) -> Result<String, SelectorError> {
    match label_selector {
        Some(s) => selector::from_label_selector(s),
        None => Ok(String::new()),
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn default_namespace(&self) -> Result<String, ClusterError> {
        if let Some(ns) = self.namespace.as_deref().filter(|ns| !ns.is_empty()) {
            return Ok(ns.to_string());
        }
        Ok(self.config().await?.default_namespace.clone())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ClusterError> {
        let start = std::time::Instant::now();
        let pod = self.get_namespaced::<Pod>(namespace, name).await?;
        tracing::debug!("get_pod({}/{}) API call took {:?}", namespace, name, start.elapsed());
        Ok(pod)
    }

    async fn list_pods(&self, namespace: &str, selector: &str) -> Result<Vec<Pod>, ClusterError> {
        let start = std::time::Instant::now();
        let pods: Api<Pod> = Api::namespaced(self.client().await?, namespace);
        let list = pods.list(&ListParams::default().labels(selector)).await?;
        tracing::debug!(
            "list_pods({}, {}) API call took {:?}",
            namespace,
            selector,
            start.elapsed()
        );
        Ok(list.items)
    }

    async fn workload_selector(
        &self,
        namespace: &str,
        kind: WorkloadKind,
        name: &str,
    ) -> Result<Option<String>, ClusterError> {
        let selector = match kind {
            WorkloadKind::ReplicationController => self
                .get_namespaced::<ReplicationController>(namespace, name)
                .await?
                .map(|rc| {
                    rc.spec
                        .and_then(|s| s.selector)
                        .map(|labels| selector::from_labels(&labels))
                        .unwrap_or_default()
                }),
            WorkloadKind::Deployment => self
                .get_namespaced::<Deployment>(namespace, name)
                .await?
                .map(|d| render(d.spec.map(|s| s.selector).as_ref()))
                .transpose()?,
            WorkloadKind::ReplicaSet => self
                .get_namespaced::<ReplicaSet>(namespace, name)
                .await?
                .map(|rs| render(rs.spec.map(|s| s.selector).as_ref()))
                .transpose()?,
            WorkloadKind::StatefulSet => self
                .get_namespaced::<StatefulSet>(namespace, name)
                .await?
                .map(|sts| render(sts.spec.map(|s| s.selector).as_ref()))
                .transpose()?,
            WorkloadKind::DaemonSet => self
                .get_namespaced::<DaemonSet>(namespace, name)
                .await?
                .map(|ds| render(ds.spec.map(|s| s.selector).as_ref()))
                .transpose()?,
            WorkloadKind::Job => self
                .get_namespaced::<Job>(namespace, name)
                .await?
                .map(|job| render(job.spec.and_then(|s| s.selector).as_ref()))
                .transpose()?,
            WorkloadKind::DeploymentConfig => {
                self.deployment_config_selector(namespace, name).await?
            }
        };

        tracing::debug!("{} {}/{} selects {:?}", kind, namespace, name, selector);
        Ok(selector)
    }
}
