//! Test utilities for kubersh
//!
//! In-memory stand-ins for the cluster and the remote executor, plus pod
//! fixtures.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use kubersh::config::Settings;
use kubersh::kubernetes::{
    Cluster, ClusterError, ExecRequest, RemoteExecutor, RemoteSession, SessionError,
    SessionStreams, WorkloadKind,
};
use kubersh::terminal::{StreamKind, TerminalProbe};

/// Build a pod fixture
pub fn pod(name: &str, labels: &[(&str, &str)], ready: bool) -> Pod {
    let labels: serde_json::Map<String, serde_json::Value> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    serde_json::from_value(json!({
        "metadata": { "name": name, "labels": labels },
        "status": {
            "phase": "Running",
            "conditions": [
                { "type": "Ready", "status": if ready { "True" } else { "False" } }
            ]
        }
    }))
    .expect("valid pod fixture")
}

/// Settings with the default shell and timeouts
pub fn settings() -> Settings {
    Settings::default()
}

/// In-memory cluster counting every lookup it serves
pub struct FakeCluster {
    namespace: String,
    pods: Mutex<Vec<Pod>>,
    workloads: HashMap<(WorkloadKind, String), String>,
    /// Pod lists returned by successive `list_pods` calls before falling back to `pods`
    list_script: Mutex<VecDeque<Vec<Pod>>>,
    calls: AtomicUsize,
}

impl FakeCluster {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            pods: Mutex::new(Vec::new()),
            workloads: HashMap::new(),
            list_script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_pod(self, pod: Pod) -> Self {
        self.pods.lock().unwrap().push(pod);
        self
    }

    pub fn with_workload(mut self, kind: WorkloadKind, name: &str, selector: &str) -> Self {
        self.workloads
            .insert((kind, name.to_string()), selector.to_string());
        self
    }

    pub fn with_list_script(self, lists: Vec<Vec<Pod>>) -> Self {
        self.list_script.lock().unwrap().extend(lists);
        self
    }

    /// Number of cluster lookups made so far, including namespace resolution
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn matches_selector(pod: &Pod, selector: &str) -> bool {
    let labels = pod.metadata.labels.clone().unwrap_or_default();
    selector.split(',').all(|term| match term.split_once('=') {
        Some((k, v)) => labels.get(k).map(String::as_str) == Some(v),
        None => false,
    })
}

#[async_trait]
impl Cluster for FakeCluster {
    async fn default_namespace(&self) -> Result<String, ClusterError> {
        self.record();
        Ok(self.namespace.clone())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Option<Pod>, ClusterError> {
        self.record();
        if namespace != self.namespace {
            return Ok(None);
        }
        Ok(self
            .pods
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.metadata.name.as_deref() == Some(name))
            .cloned())
    }

    async fn list_pods(&self, _namespace: &str, selector: &str) -> Result<Vec<Pod>, ClusterError> {
        self.record();
        let pods = match self.list_script.lock().unwrap().pop_front() {
            Some(pods) => pods,
            None => self.pods.lock().unwrap().clone(),
        };
        Ok(pods
            .into_iter()
            .filter(|p| matches_selector(p, selector))
            .collect())
    }

    async fn workload_selector(
        &self,
        _namespace: &str,
        kind: WorkloadKind,
        name: &str,
    ) -> Result<Option<String>, ClusterError> {
        self.record();
        Ok(self.workloads.get(&(kind, name.to_string())).cloned())
    }
}

/// Terminal probe with fixed answers
pub struct FixedProbe {
    pub stdin: bool,
    pub stdout: bool,
}

impl TerminalProbe for FixedProbe {
    fn is_terminal(&self, stream: StreamKind) -> bool {
        match stream {
            StreamKind::Stdin => self.stdin,
            StreamKind::Stdout | StreamKind::Stderr => self.stdout,
        }
    }
}

/// Streams that read nothing and discard output
pub fn streams(stdin_is_terminal: bool, stdout_is_terminal: bool) -> SessionStreams {
    SessionStreams::new(
        Box::new(tokio::io::empty()),
        Box::new(tokio::io::sink()),
        Box::new(tokio::io::sink()),
        Arc::new(FixedProbe {
            stdin: stdin_is_terminal,
            stdout: stdout_is_terminal,
        }),
    )
}

/// What the executor was asked to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedExec {
    pub namespace: String,
    pub pod: String,
    pub container: Option<String>,
    pub command: Vec<String>,
    pub tty: bool,
}

/// Executor that records requests and echoes stdin to stdout
#[derive(Clone, Default)]
pub struct RecordingExecutor {
    pub started: Arc<Mutex<Vec<RecordedExec>>>,
    /// Remote exit code reported when the session ends
    pub exit_code: i32,
}

impl RecordingExecutor {
    pub fn exiting_with(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Default::default()
        }
    }

    pub fn started(&self) -> Vec<RecordedExec> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteExecutor for RecordingExecutor {
    async fn start(&self, request: ExecRequest) -> Result<Box<dyn RemoteSession>, SessionError> {
        self.started.lock().unwrap().push(RecordedExec {
            namespace: request.namespace.clone(),
            pod: request.pod.clone(),
            container: request.container.clone(),
            command: request.command.clone(),
            tty: request.tty,
        });
        Ok(Box::new(EchoSession {
            streams: request.streams,
            exit_code: self.exit_code,
        }))
    }
}

struct EchoSession {
    streams: SessionStreams,
    exit_code: i32,
}

#[async_trait]
impl RemoteSession for EchoSession {
    async fn wait(self: Box<Self>) -> Result<(), SessionError> {
        let EchoSession {
            mut streams,
            exit_code,
        } = *self;
        let mut buf = Vec::new();
        streams.input.read_to_end(&mut buf).await?;
        streams.output.write_all(&buf).await?;
        streams.output.flush().await?;
        match exit_code {
            0 => Ok(()),
            code => Err(SessionError::RemoteExit { code }),
        }
    }
}

/// Short timeouts for tests that wait on readiness
pub fn fast_settings(timeout: Duration) -> Settings {
    Settings {
        pod_timeout: timeout,
        poll_interval: Duration::from_millis(100),
        ..Settings::default()
    }
}
