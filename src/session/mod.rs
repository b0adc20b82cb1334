//! Remote shell sessions
//!
//! A [`SessionRequest`] from the command line is completed into
//! [`SessionOptions`] (TTY decision, resolved pod, command) and then driven
//! through its lifecycle by a [`SessionRunner`].

pub mod options;
pub mod policy;
pub mod request;
pub mod runner;

pub use options::{ExecSession, RshError, SessionOptions};
pub use policy::{resolve_tty, select_command, PolicyError, ShellPolicy};
pub use request::{ResolvedTarget, SessionRequest};
pub use runner::{SessionRunner, SessionState};

use crate::config::Settings;
use crate::kubernetes::{Cluster, RemoteExecutor, SessionStreams};

/// Complete, validate and run one session
pub async fn run_session(
    request: SessionRequest,
    cluster: &dyn Cluster,
    settings: &Settings,
    streams: SessionStreams,
    executor: Box<dyn RemoteExecutor>,
) -> Result<(), RshError> {
    let options = SessionOptions::complete(request, cluster, settings, streams, executor).await?;
    let mut runner = SessionRunner::new(options);
    runner.run().await
}
