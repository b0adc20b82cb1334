//! Session assembly and pre-flight validation

use thiserror::Error;

use super::policy::{PolicyError, ShellPolicy};
use super::request::{ResolvedTarget, SessionRequest};
use crate::config::{ConfigError, Settings};
use crate::kubernetes::{
    Cluster, ClusterError, ExecRequest, RemoteExecutor, ResolveError, ResourceResolver,
    SessionError, SessionStreams, ValidationError,
};
use crate::terminal::StreamKind;

/// Errors surfaced to the command line
#[derive(Debug, Error)]
pub enum RshError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error("a single pod or workload reference is required")]
    MissingTarget,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("session has already been run")]
    AlreadyRun,
}

impl From<ValidationError> for RshError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.0)
    }
}

impl RshError {
    /// Whether the error came from how the command was invoked
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Policy(_) | Self::MissingTarget)
    }

    /// Process exit status for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Session(e) => e.exit_code().unwrap_or(1),
            e if e.is_usage() => 2,
            _ => 1,
        }
    }
}

/// The generic half of a session: where to exec, what, and through whom
pub struct ExecSession {
    pub request: ExecRequest,
    pub executor: Box<dyn RemoteExecutor>,
}

/// A fully resolved shell session, ready to validate and run
pub struct SessionOptions {
    pub policy: ShellPolicy,
    pub exec: ExecSession,
}

impl SessionOptions {
    /// Resolve a request into runnable options.
    ///
    /// Flag conflicts and a missing target are rejected before the cluster is
    /// consulted. The target is resolved with the configured timeout.
    pub async fn complete(
        request: SessionRequest,
        cluster: &dyn Cluster,
        settings: &Settings,
        streams: SessionStreams,
        executor: Box<dyn RemoteExecutor>,
    ) -> Result<Self, RshError> {
        let policy = request.shell_policy();
        policy.check_flags()?;

        let reference = request
            .target
            .filter(|t| !t.is_empty())
            .ok_or(RshError::MissingTarget)?;
        let tty = policy.resolve_tty(streams.is_terminal(StreamKind::Stdin))?;

        let namespace = cluster.default_namespace().await?;
        let pod = ResourceResolver::new(cluster, settings.poll_interval)
            .resolve(&namespace, &reference, settings.pod_timeout)
            .await?;

        let command = policy.select_command(&request.args);

        Ok(Self {
            policy,
            exec: ExecSession {
                request: ExecRequest {
                    namespace,
                    pod,
                    container: request.container,
                    command,
                    tty,
                    streams,
                },
                executor,
            },
        })
    }

    pub fn target(&self) -> ResolvedTarget {
        ResolvedTarget {
            namespace: self.exec.request.namespace.clone(),
            pod: self.exec.request.pod.clone(),
            container: self.exec.request.container.clone(),
        }
    }

    pub fn command(&self) -> &[String] {
        &self.exec.request.command
    }

    pub fn tty(&self) -> bool {
        self.exec.request.tty
    }

    /// Check the invariants the executor relies on. No network I/O.
    pub fn validate(&self) -> Result<(), RshError> {
        let request = &self.exec.request;
        if request.command.is_empty() {
            return Err(RshError::Validation("you must specify at least one command".into()));
        }
        if request.pod.is_empty() {
            return Err(RshError::Validation("pod name must be specified".into()));
        }
        if request.namespace.is_empty() {
            return Err(RshError::Validation("namespace must be specified".into()));
        }
        self.exec.executor.validate(request)?;
        Ok(())
    }
}
