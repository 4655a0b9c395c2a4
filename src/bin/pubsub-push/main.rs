use anyhow::Context;
use clap::Parser;
use pubsub_push::config::{credentials_path, Cli};
use pubsub_push::subscription::GcpSubscription;
use pubsub_push::ForwarderBuilder;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

mod setup_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_tracing::register(cli.log_format);

    if let Err(e) = run(cli).await {
        error!("{e:?}");
        return Err(e);
    }
    info!("Exiting...");

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = cli.into_settings().context("Invalid configuration")?;
    let credentials = credentials_path(std::env::vars_os())?;
    info!(
        project = %settings.project_id,
        subscription = %settings.subscription,
        endpoint = %settings.endpoint,
        headers = %settings.headers,
        credentials = ?credentials,
        "Starting"
    );
    if credentials.is_none() {
        info!("No credentials file, using the Pub/Sub emulator");
    }

    let client = settings.delivery_client()?;
    let mut subscription = GcpSubscription::connect(&settings.project_id, &settings.subscription)
        .await
        .with_context(|| format!("Cannot open subscription '{}'", settings.subscription))?;

    let cln_token = CancellationToken::new();
    let forwarder = ForwarderBuilder::new(client, cln_token.clone())
        .max_outstanding(settings.max_outstanding)
        .build();

    let shutdown = tokio::spawn(async move {
        shutdown_signal().await;
        cln_token.cancel();
    });

    let stats = forwarder.run(&mut subscription).await?;
    shutdown.abort();

    info!(
        acked = stats.acked,
        nacked = stats.nacked,
        total = stats.total(),
        "Forwarding finished"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => {
                warn!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal");
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
