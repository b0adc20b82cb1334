pub mod cli;
pub mod config;
pub mod kubernetes;
pub mod session;
pub mod terminal;

pub use config::{RshConfig, Settings};
pub use session::{run_session, RshError, SessionOptions, SessionRequest, SessionRunner};
