use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::watch;

use activescale::config::{CliOverrides, Config};
use activescale::server::{ActivescaleServer, Listeners};

/// Activescale - Envoy active request gauges as Kubernetes custom metrics
#[derive(Parser, Debug)]
#[command(name = "activescale")]
#[command(version, about, long_about = None)]
struct Args {
    /// Optional YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Redis address (host:port or redis:// URL)
    #[arg(long)]
    redis_addr: Option<String>,

    /// Metric TTL (e.g. 20s)
    #[arg(long, value_parser = humantime::parse_duration)]
    ttl: Option<Duration>,

    /// Envoy metrics gRPC listen port
    #[arg(long)]
    grpc_port: Option<u16>,

    /// Validate configuration and exit
    #[arg(long)]
    test: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.as_deref())
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;
    config.apply_cli(&CliOverrides {
        redis_addr: args.redis_addr,
        ttl: args.ttl,
        grpc_port: args.grpc_port,
    });

    activescale::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Failed to initialize logging")?;

    config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    tracing::info!(
        config_file = args.config.as_ref().map(|p| p.display().to_string()).unwrap_or_default(),
        redis_addr = %config.store.redis_addr,
        redis_context = %config.store.context,
        redis_tls = config.store.tls.enabled,
        grpc_port = config.ingest.grpc_port,
        metric_name = %config.ingest.metric_name,
        ttl = %humantime::format_duration(config.store.ttl),
        summary_interval = %humantime::format_duration(config.ingest.summary_interval),
        log_verbosity = config.logging.verbosity,
        "Configuration loaded successfully"
    );

    if args.test {
        tracing::info!("Configuration test passed");
        return Ok(());
    }

    let server = ActivescaleServer::build(config)
        .await
        .context("Failed to initialize activescale")?;
    let listeners = Listeners::bind(server.config()).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.run(listeners, shutdown_rx).await?;
    tracing::info!("Activescale stopped");
    Ok(())
}

/// SIGINT or SIGTERM. If a handler cannot be installed, that signal is
/// never delivered rather than triggering a shutdown.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install SIGINT handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
