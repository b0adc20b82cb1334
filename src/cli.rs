//! Command-line interface

use std::path::PathBuf;

use clap::Parser;

use crate::config::Settings;
use crate::session::{resolve_tty, RshError, SessionRequest};

const LONG_ABOUT: &str = "\
Open a remote shell session to a container

This command will attempt to start a shell session in a pod for the specified resource.
It works with pods, deployments, deployment configs, replica sets, stateful sets, jobs,
daemon sets, and replication controllers. Any of the aforementioned resources (apart
from pods) will be resolved to a ready pod. It will default to the first container if
none is specified, and will use '/bin/sh' as the default shell. You may pass an optional
command after the resource name, which will be executed instead of a login shell. A TTY
will be automatically allocated if standard input is interactive - use -t and -T to
override.

Note, some containers may not include a shell.";

const EXAMPLES: &str = "\
Examples:
  # Open a shell session on the first container in pod 'foo'
  kubersh foo

  # Run the command 'cat /etc/resolv.conf' inside pod 'foo'
  kubersh foo cat /etc/resolv.conf

  # See the configuration of your internal registry
  kubersh dc/docker-registry cat config.yml

  # Open a shell session on the container named 'index' inside a pod of your job
  kubersh -c index job/scheduled";

#[derive(Debug, Parser)]
#[command(
    name = "kubersh",
    version,
    about = "Start a shell session in a pod",
    long_about = LONG_ABOUT,
    after_help = EXAMPLES
)]
pub struct Cli {
    /// Force a pseudo-terminal to be allocated
    #[arg(short = 't', long = "tty")]
    pub tty: bool,

    /// Disable pseudo-terminal allocation
    #[arg(short = 'T', long = "no-tty")]
    pub no_tty: bool,

    /// Path to the shell command [default: /bin/sh]
    #[arg(long, value_name = "PATH")]
    pub shell: Option<String>,

    /// Container name; defaults to first container
    #[arg(short = 'c', long, value_name = "NAME")]
    pub container: Option<String>,

    /// Namespace of the target; defaults to the context's namespace
    #[arg(short = 'n', long, value_name = "NAMESPACE")]
    pub namespace: Option<String>,

    /// Kubeconfig context to use
    #[arg(long, value_name = "NAME")]
    pub context: Option<String>,

    /// Path to the kubeconfig file
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Seconds to wait for a workload to have a ready pod [default: 10]
    #[arg(long, value_name = "SECONDS")]
    pub pod_timeout: Option<u64>,

    /// Pod or workload to connect to, followed by an optional command
    #[arg(value_name = "TARGET [COMMAND]", trailing_var_arg = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Reject invocation errors before any settings file or kubeconfig is read
    pub fn check_usage(&self) -> Result<(), RshError> {
        resolve_tty(self.tty, self.no_tty, false)?;
        if self.args.first().map_or(true, |target| target.is_empty()) {
            return Err(RshError::MissingTarget);
        }
        Ok(())
    }

    pub fn request(&self, settings: &Settings) -> SessionRequest {
        SessionRequest::new(self.args.clone(), settings.default_shell.clone())
            .with_tty_flags(self.tty, self.no_tty)
            .with_container(self.container.clone())
    }
}
