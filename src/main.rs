use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kubersh::cli::Cli;
use kubersh::kubernetes::{KubeCluster, KubeExecutor, SessionStreams};
use kubersh::{run_session, RshConfig, RshError};

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    // kube's rustls backend needs a process-wide crypto provider
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };
    let result = runtime.block_on(run(cli));
    // A blocked stdin read must not hold up exit
    runtime.shutdown_background();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(code) = remote_exit(&e) {
                return ExitCode::from(code);
            }
            eprintln!("error: {e}");
            if e.is_usage() {
                eprintln!("See 'kubersh --help' for usage.");
            }
            ExitCode::from(e.exit_code().clamp(1, 255) as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), RshError> {
    cli.check_usage()?;
    let settings = RshConfig::load()?.settings(cli.shell.clone(), cli.pod_timeout);
    let request = cli.request(&settings);

    let cluster = Arc::new(KubeCluster::new(
        cli.kubeconfig.clone(),
        cli.context.clone(),
        cli.namespace.clone(),
    ));
    let executor = Box::new(KubeExecutor::new(cluster.clone()));

    run_session(request, cluster.as_ref(), &settings, SessionStreams::stdio(), executor).await
}

/// Remote commands that exit non-zero pass their status through silently
fn remote_exit(e: &RshError) -> Option<u8> {
    match e {
        RshError::Session(session) => session.exit_code().map(|code| code.clamp(1, 255) as u8),
        _ => None,
    }
}
