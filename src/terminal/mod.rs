pub mod tty;

pub use tty::{RawModeGuard, StdioProbe, StreamKind, TerminalProbe, TerminalSize};
