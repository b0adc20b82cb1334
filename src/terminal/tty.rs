//! Local terminal handling
//!
//! Terminal detection for the session streams, raw mode while a remote TTY
//! is attached, and the local window size forwarded to the pod.

use std::io::IsTerminal;

/// One of the three standard streams of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdin,
    Stdout,
    Stderr,
}

/// Detects whether a session stream is attached to a terminal
pub trait TerminalProbe: Send + Sync {
    fn is_terminal(&self, stream: StreamKind) -> bool;
}

/// Probe backed by the process's real standard streams
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioProbe;

impl TerminalProbe for StdioProbe {
    fn is_terminal(&self, stream: StreamKind) -> bool {
        match stream {
            StreamKind::Stdin => std::io::stdin().is_terminal(),
            StreamKind::Stdout => std::io::stdout().is_terminal(),
            StreamKind::Stderr => std::io::stderr().is_terminal(),
        }
    }
}

/// Terminal size for the remote PTY
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

impl TerminalSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }

    /// Current size of the controlling terminal, if there is one
    pub fn current() -> Option<Self> {
        crossterm::terminal::size()
            .ok()
            .filter(|(cols, rows)| *cols > 0 && *rows > 0)
            .map(|(cols, rows)| Self { cols, rows })
    }
}

impl From<TerminalSize> for kube::api::TerminalSize {
    fn from(size: TerminalSize) -> Self {
        kube::api::TerminalSize {
            width: size.cols,
            height: size.rows,
        }
    }
}

/// Keeps the local terminal in raw mode until dropped
pub struct RawModeGuard(());

impl RawModeGuard {
    pub fn enable() -> std::io::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        Ok(Self(()))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            tracing::warn!("Failed to restore terminal mode: {}", e);
        }
    }
}
