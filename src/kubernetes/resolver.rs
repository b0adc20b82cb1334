//! Workload reference resolution
//!
//! Turns `NAME` or `TYPE/NAME` into the name of one pod a session can exec
//! into. Workloads are resolved through their pod selector to a ready pod,
//! waiting a bounded time for one to appear.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use k8s_openapi::api::core::v1::Pod;
use thiserror::Error;

use super::client::{Cluster, ClusterError};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{kind} \"{name}\" not found in namespace \"{namespace}\"")]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },
    #[error("unsupported resource type \"{0}\": must be one of pods, replicationcontrollers, deployments, replicasets, statefulsets, daemonsets, jobs, deploymentconfigs")]
    UnsupportedResourceType(String),
    #[error("timed out after {timeout:?} waiting for a ready pod for {reference}")]
    Timeout {
        reference: String,
        timeout: Duration,
    },
    #[error("invalid resource reference \"{0}\": expected NAME or TYPE/NAME")]
    InvalidReference(String),
    #[error("{kind} \"{name}\" has no pod selector")]
    EmptySelector { kind: WorkloadKind, name: String },
    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

/// Controller kinds that own pods and can be resolved to one of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    ReplicationController,
    Deployment,
    ReplicaSet,
    StatefulSet,
    DaemonSet,
    Job,
    DeploymentConfig,
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ReplicationController => "replicationcontroller",
            Self::Deployment => "deployment",
            Self::ReplicaSet => "replicaset",
            Self::StatefulSet => "statefulset",
            Self::DaemonSet => "daemonset",
            Self::Job => "job",
            Self::DeploymentConfig => "deploymentconfig",
        };
        f.write_str(name)
    }
}

/// What a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Pod,
    Workload(WorkloadKind),
}

impl FromStr for ResourceKind {
    type Err = ResolveError;

    /// Parse a type token. Case-insensitive; singular, plural and short
    /// names are accepted, and a `.group` suffix is ignored.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let kind = token.split('.').next().unwrap_or_default().to_ascii_lowercase();
        let kind = match kind.as_str() {
            "po" | "pod" | "pods" => Self::Pod,
            "rc" | "replicationcontroller" | "replicationcontrollers" => {
                Self::Workload(WorkloadKind::ReplicationController)
            }
            "deploy" | "deployment" | "deployments" => Self::Workload(WorkloadKind::Deployment),
            "rs" | "replicaset" | "replicasets" => Self::Workload(WorkloadKind::ReplicaSet),
            "sts" | "statefulset" | "statefulsets" => Self::Workload(WorkloadKind::StatefulSet),
            "ds" | "daemonset" | "daemonsets" => Self::Workload(WorkloadKind::DaemonSet),
            "job" | "jobs" => Self::Workload(WorkloadKind::Job),
            "dc" | "deploymentconfig" | "deploymentconfigs" => {
                Self::Workload(WorkloadKind::DeploymentConfig)
            }
            _ => return Err(ResolveError::UnsupportedResourceType(token.to_string())),
        };
        Ok(kind)
    }
}

/// A parsed workload reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceRef {
    pub fn parse(reference: &str) -> Result<Self, ResolveError> {
        let invalid = || ResolveError::InvalidReference(reference.to_string());

        let (kind, name) = match reference.split_once('/') {
            None => (ResourceKind::Pod, reference),
            Some((token, name)) => {
                if token.is_empty() {
                    return Err(invalid());
                }
                (token.parse()?, name)
            }
        };

        if name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self {
            kind,
            name: name.to_string(),
        })
    }
}

/// Whether a pod can accept exec requests: running, not terminating, and
/// reporting a `Ready` condition.
pub fn is_pod_ready(pod: &Pod) -> bool {
    if pod.metadata.deletion_timestamp.is_some() {
        return false;
    }
    let Some(status) = &pod.status else {
        return false;
    };
    if status.phase.as_deref() != Some("Running") {
        return false;
    }
    status
        .conditions
        .iter()
        .flatten()
        .any(|c| c.type_ == "Ready" && c.status == "True")
}

/// Pick the ready pod with the lexicographically smallest name
pub fn select_ready_pod(pods: &[Pod]) -> Option<String> {
    pods.iter()
        .filter(|pod| is_pod_ready(pod))
        .filter_map(|pod| pod.metadata.name.clone())
        .min()
}

/// Resolves workload references against a [`Cluster`]
pub struct ResourceResolver<'a> {
    cluster: &'a dyn Cluster,
    poll_interval: Duration,
}

impl<'a> ResourceResolver<'a> {
    pub fn new(cluster: &'a dyn Cluster, poll_interval: Duration) -> Self {
        Self {
            cluster,
            poll_interval,
        }
    }

    /// Resolve `reference` in `namespace` to a single pod name
    pub async fn resolve(
        &self,
        namespace: &str,
        reference: &str,
        timeout: Duration,
    ) -> Result<String, ResolveError> {
        let target = ResourceRef::parse(reference)?;

        let kind = match target.kind {
            ResourceKind::Pod => return self.existing_pod(namespace, &target.name).await,
            ResourceKind::Workload(kind) => kind,
        };

        let selector = self
            .cluster
            .workload_selector(namespace, kind, &target.name)
            .await?
            .ok_or_else(|| ResolveError::NotFound {
                kind: kind.to_string(),
                name: target.name.clone(),
                namespace: namespace.to_string(),
            })?;

        if selector.is_empty() {
            return Err(ResolveError::EmptySelector {
                kind,
                name: target.name,
            });
        }

        match tokio::time::timeout(timeout, self.wait_for_ready(namespace, &selector)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout {
                reference: reference.to_string(),
                timeout,
            }),
        }
    }

    async fn existing_pod(&self, namespace: &str, name: &str) -> Result<String, ResolveError> {
        match self.cluster.get_pod(namespace, name).await? {
            Some(_) => Ok(name.to_string()),
            None => Err(ResolveError::NotFound {
                kind: "pod".to_string(),
                name: name.to_string(),
                namespace: namespace.to_string(),
            }),
        }
    }

    async fn wait_for_ready(&self, namespace: &str, selector: &str) -> Result<String, ResolveError> {
        loop {
            let pods = self.cluster.list_pods(namespace, selector).await?;
            if let Some(name) = select_ready_pod(&pods) {
                return Ok(name);
            }
            tracing::debug!(
                "No ready pod among {} matching {}, retrying in {:?}",
                pods.len(),
                selector,
                self.poll_interval
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}
