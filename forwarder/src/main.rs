use std::error::Error;
use std::time::Duration;

use forwarder_core::{Forwarder, Settings};
use forwarder_kinesis::sink::KinesisSinkBuilder;
use tokio::io::BufReader;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

mod setup_tracing;
mod source;

/// How long the runtime waits for leftover blocking work on exit. A pending read of stdin cannot
/// be cancelled and would otherwise hold the process until the next line arrives.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

fn main() -> Result<(), Box<dyn Error>> {
    setup_tracing::register();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run());
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);

    if let Err(e) = result {
        error!("{e:?}");
        return Err(e);
    }
    info!("Exiting...");
    Ok(())
}

/// Forwards newline-delimited JSON from stdin to the configured Kinesis stream until end of input
/// or SIG{INT,TERM}, then drains what is still buffered.
async fn run() -> Result<(), Box<dyn Error>> {
    let settings = Settings::load()?;
    settings.validate()?;

    let sink = KinesisSinkBuilder::new(settings.kinesis_config())
        .build()
        .await?;
    let forwarder = Forwarder::start(&settings, sink)?;

    let cln_token = CancellationToken::new();
    let shutdown_handle = tokio::spawn({
        let cln_token = cln_token.clone();
        async move {
            shutdown_signal().await;
            cln_token.cancel();
        }
    });

    let read_result = source::forward_lines(
        BufReader::new(tokio::io::stdin()),
        forwarder.handle(),
        cln_token,
    )
    .await;
    if !shutdown_handle.is_finished() {
        shutdown_handle.abort();
    }

    match &read_result {
        Ok(stats) => info!(
            records = stats.records,
            skipped = stats.skipped,
            "Input finished, draining"
        ),
        Err(e) => error!(?e, "Reading input failed, draining"),
    }

    // drain even when reading failed, the records already buffered are still owed
    forwarder.shutdown().await?;
    read_result?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C signal"),
            Err(e) => {
                error!(?e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received terminate signal");
            }
            Err(e) => {
                error!(?e, "Failed to install terminate signal handler");
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
