//! Kubernetes pod exec functionality
//!
//! [`RemoteExecutor`] is the capability a session is run through. The default
//! [`KubeExecutor`] opens a `pods/exec` stream with the kube crate's
//! websocket support and pumps the local standard streams through it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::SinkExt;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams, AttachedProcess};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use super::client::{ClusterError, KubeCluster};
use crate::terminal::{RawModeGuard, StdioProbe, StreamKind, TerminalProbe, TerminalSize};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Kube error: {0}")]
    KubeError(#[from] kube::Error),
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Remote command error: {0}")]
    RemoteCommandError(String),
    #[error("command terminated with exit code {code}")]
    RemoteExit { code: i32 },
}

impl SessionError {
    /// Exit status of the remote command, when it ran and failed
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::RemoteExit { code } => Some(*code),
            _ => None,
        }
    }
}

/// A structural precondition the executor cannot run with
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

pub type InputStream = Box<dyn AsyncRead + Send + Unpin>;
pub type OutputStream = Box<dyn AsyncWrite + Send + Unpin>;

/// Local ends of a session's standard streams
pub struct SessionStreams {
    pub input: InputStream,
    pub output: OutputStream,
    pub error: OutputStream,
    probe: Arc<dyn TerminalProbe>,
}

impl SessionStreams {
    pub fn new(
        input: InputStream,
        output: OutputStream,
        error: OutputStream,
        probe: Arc<dyn TerminalProbe>,
    ) -> Self {
        Self {
            input,
            output,
            error,
            probe,
        }
    }

    /// The process's own stdin, stdout and stderr
    pub fn stdio() -> Self {
        Self::new(
            Box::new(tokio::io::stdin()),
            Box::new(tokio::io::stdout()),
            Box::new(tokio::io::stderr()),
            Arc::new(StdioProbe),
        )
    }

    pub fn is_terminal(&self, stream: StreamKind) -> bool {
        self.probe.is_terminal(stream)
    }
}

impl fmt::Debug for SessionStreams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStreams")
            .field("stdin_is_terminal", &self.is_terminal(StreamKind::Stdin))
            .field("stdout_is_terminal", &self.is_terminal(StreamKind::Stdout))
            .finish_non_exhaustive()
    }
}

/// Everything needed to open one exec session
#[derive(Debug)]
pub struct ExecRequest {
    pub namespace: String,
    pub pod: String,
    pub container: Option<String>,
    pub command: Vec<String>,
    pub tty: bool,
    pub streams: SessionStreams,
}

/// Runs commands in pods.
///
/// Injected into a session at construction so tests can substitute a
/// recording implementation.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Check that the request can be run as given.
    ///
    /// A TTY is only attachable when stdin or stdout is a terminal.
    fn validate(&self, request: &ExecRequest) -> Result<(), ValidationError> {
        if request.tty
            && !request.streams.is_terminal(StreamKind::Stdin)
            && !request.streams.is_terminal(StreamKind::Stdout)
        {
            return Err(ValidationError(
                "unable to use a TTY: neither input nor output is a terminal".to_string(),
            ));
        }
        Ok(())
    }

    /// Open the exec stream. Returns once the server has accepted it.
    async fn start(&self, request: ExecRequest) -> Result<Box<dyn RemoteSession>, SessionError>;
}

/// A running exec session
#[async_trait]
pub trait RemoteSession: Send {
    /// Stream until the remote command exits
    async fn wait(self: Box<Self>) -> Result<(), SessionError>;
}

/// Default executor using the kube client of a [`KubeCluster`]
pub struct KubeExecutor {
    cluster: Arc<KubeCluster>,
}

impl KubeExecutor {
    pub fn new(cluster: Arc<KubeCluster>) -> Self {
        Self { cluster }
    }
}

#[async_trait]
impl RemoteExecutor for KubeExecutor {
    async fn start(&self, request: ExecRequest) -> Result<Box<dyn RemoteSession>, SessionError> {
        let pods: Api<Pod> = Api::namespaced(self.cluster.client().await?, &request.namespace);

        let mut attach_params = AttachParams::default()
            .stdin(true)
            .stdout(true)
            .stderr(!request.tty)
            .tty(request.tty);
        if let Some(ref c) = request.container {
            attach_params = attach_params.container(c);
        }

        tracing::debug!(
            "exec {:?} in {}/{} (tty: {})",
            request.command,
            request.namespace,
            request.pod,
            request.tty
        );
        let mut attached = pods
            .exec(&request.pod, request.command.clone(), &attach_params)
            .await?;

        let mut resize = None;
        let mut raw_mode = None;
        if request.tty {
            resize = attached.terminal_size();
            if let (Some(sender), Some(size)) = (resize.as_mut(), TerminalSize::current()) {
                let _ = sender.send(size.into()).await;
            }
            if request.streams.is_terminal(StreamKind::Stdin) {
                raw_mode = Some(RawModeGuard::enable()?);
            }
        }

        Ok(Box::new(KubeSession {
            attached,
            streams: request.streams,
            resize,
            _raw_mode: raw_mode,
        }))
    }
}

type ResizeSender = futures::channel::mpsc::Sender<kube::api::TerminalSize>;

struct KubeSession {
    attached: AttachedProcess,
    streams: SessionStreams,
    resize: Option<ResizeSender>,
    _raw_mode: Option<RawModeGuard>,
}

#[async_trait]
impl RemoteSession for KubeSession {
    async fn wait(self: Box<Self>) -> Result<(), SessionError> {
        let KubeSession {
            mut attached,
            streams,
            resize,
            _raw_mode,
        } = *self;
        let SessionStreams {
            mut input,
            output,
            error,
            ..
        } = streams;

        let status = attached.take_status();

        let stdin_task = attached.stdin().map(|mut remote| {
            tokio::spawn(async move {
                let _ = tokio::io::copy(&mut input, &mut remote).await;
                let _ = remote.shutdown().await;
            })
        });
        let stdout_task = attached.stdout().map(|remote| pump(remote, output));
        let stderr_task = attached.stderr().map(|remote| pump(remote, error));
        let resize_task = resize.map(|sender| tokio::spawn(forward_resizes(sender)));

        let status = match status {
            Some(status) => status.await,
            None => None,
        };

        for task in [stdout_task, stderr_task].into_iter().flatten() {
            match task.await {
                Ok(result) => result?,
                Err(e) => return Err(SessionError::RemoteCommandError(e.to_string())),
            }
        }
        for task in [stdin_task, resize_task].into_iter().flatten() {
            task.abort();
        }

        attached
            .join()
            .await
            .map_err(|e| SessionError::RemoteCommandError(e.to_string()))?;

        match status {
            Some(status) => {
                let value = serde_json::to_value(&status)
                    .map_err(|e| SessionError::RemoteCommandError(e.to_string()))?;
                check_status(&value)
            }
            None => Ok(()),
        }
    }
}

fn pump<R>(mut remote: R, mut local: OutputStream) -> JoinHandle<std::io::Result<()>>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        tokio::io::copy(&mut remote, &mut local).await?;
        local.flush().await
    })
}

#[cfg(unix)]
async fn forward_resizes(mut sender: ResizeSender) {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut window_changes) = signal(SignalKind::window_change()) else {
        return;
    };
    while window_changes.recv().await.is_some() {
        if let Some(size) = TerminalSize::current() {
            if sender.send(size.into()).await.is_err() {
                break;
            }
        }
    }
}

#[cfg(not(unix))]
async fn forward_resizes(_sender: ResizeSender) {}

/// Interpret the final status object sent on the exec error channel.
///
/// `Success` is a clean exit; a `Failure` carrying an `ExitCode` cause is the
/// remote command's non-zero exit status; anything else is a remote error.
pub fn check_status(status: &serde_json::Value) -> Result<(), SessionError> {
    if status.get("status").and_then(|s| s.as_str()) == Some("Success") {
        return Ok(());
    }

    let exit_code = status
        .pointer("/details/causes")
        .and_then(|causes| causes.as_array())
        .into_iter()
        .flatten()
        .filter(|cause| cause.get("reason").and_then(|r| r.as_str()) == Some("ExitCode"))
        .find_map(|cause| cause.get("message")?.as_str()?.trim().parse::<i32>().ok());

    if let Some(code) = exit_code {
        return Err(SessionError::RemoteExit { code });
    }

    let message = status
        .get("message")
        .and_then(|m| m.as_str())
        .filter(|m| !m.is_empty())
        .unwrap_or("remote command failed");
    Err(SessionError::RemoteCommandError(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_check_status_success() {
        assert!(check_status(&json!({ "status": "Success" })).is_ok());
    }

    #[test]
    fn test_check_status_exit_code() {
        let status = json!({
            "status": "Failure",
            "reason": "NonZeroExitCode",
            "message": "command terminated with non-zero exit code: error executing command [sh -c exit 3], exit code 3",
            "details": {
                "causes": [{ "reason": "ExitCode", "message": "3" }]
            }
        });

        let err = check_status(&status).unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
    }

    #[test]
    fn test_check_status_other_failure() {
        let status = json!({
            "status": "Failure",
            "message": "container not found (\"web\")"
        });

        let err = check_status(&status).unwrap_err();
        assert!(err.exit_code().is_none());
        assert!(err.to_string().contains("container not found"));
    }
}
