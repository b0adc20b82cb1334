//! Kubernetes integration module
//!
//! Provides the cluster client, workload-to-pod resolution, and pod exec.

pub mod client;
pub mod exec;
pub mod resolver;
pub mod selector;

pub use client::{Cluster, ClusterError, KubeCluster};
pub use exec::{
    ExecRequest, KubeExecutor, RemoteExecutor, RemoteSession, SessionError, SessionStreams,
    ValidationError,
};
pub use resolver::{ResolveError, ResourceKind, ResourceRef, ResourceResolver, WorkloadKind};
pub use selector::SelectorError;
