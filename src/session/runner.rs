//! Session lifecycle

use super::options::{RshError, SessionOptions};

/// Lifecycle of a single session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Validated,
    Running,
    Completed,
    Failed,
}

/// Validates a session and hands it to its executor
pub struct SessionRunner {
    options: Option<SessionOptions>,
    state: SessionState,
}

impl SessionRunner {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options: Some(options),
            state: SessionState::Created,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion. Options are consumed on the first call.
    pub async fn run(&mut self) -> Result<(), RshError> {
        let options = self.options.take().ok_or(RshError::AlreadyRun)?;
        let result = self.drive(options).await;
        if result.is_err() {
            self.state = SessionState::Failed;
        }
        result
    }

    async fn drive(&mut self, options: SessionOptions) -> Result<(), RshError> {
        options.validate()?;
        self.state = SessionState::Validated;

        let SessionOptions { exec, .. } = options;
        let session = exec.executor.start(exec.request).await?;
        self.state = SessionState::Running;

        session.wait().await?;
        self.state = SessionState::Completed;
        Ok(())
    }
}
