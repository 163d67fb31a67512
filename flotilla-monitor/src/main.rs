use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use flotilla_monitor::render::TracingRenderer;
use flotilla_monitor::report::run_report;
use flotilla_monitor::{AppState, Config, TransportConfig, api};
use flotilla_sync::transport::simulated::SimulatedFleet;
use flotilla_sync::transport::ws::WsConnector;
use flotilla_sync::{ConnectionManager, Connector, SyncEngine};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "flotilla-monitor")]
#[command(about = "Live drone fleet monitor")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "flotilla-monitor.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "flotilla_sync=info,flotilla_monitor=info".to_owned());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .init();

    let cli = Cli::parse();

    let config = if cli.config.exists() {
        info!(path = ?cli.config, "Loading configuration");
        Config::load(&cli.config)?
    } else {
        info!("No configuration file found, using defaults");
        Config::default()
    };

    info!(
        http_addr = %config.server.http_addr,
        trajectory_capacity = config.sync.trajectory_capacity.get(),
        ordering = ?config.sync.ordering,
        "Starting flotilla-monitor"
    );

    match config.transport.clone() {
        TransportConfig::WebSocket { url } => {
            info!(%url, "Using websocket transport");
            let connector =
                WsConnector::new(url).with_connect_timeout(config.sync.connect_timeout());
            run_monitor(connector, config).await?;
        }
        TransportConfig::Simulated {
            drone_count,
            interval_ms,
            session_secs,
        } => {
            info!(drone_count, interval_ms, "Using simulated fleet");
            let mut fleet = SimulatedFleet::new(drone_count, Duration::from_millis(interval_ms));
            if let Some(secs) = session_secs {
                fleet = fleet.with_session_length(Duration::from_secs(secs));
            }
            run_monitor(fleet, config).await?;
        }
    }

    Ok(())
}

async fn run_monitor<C: Connector>(connector: C, config: Config) -> color_eyre::Result<()> {
    let stale_after = config.report.stale_after()?;
    let cancel = CancellationToken::new();

    let (manager, events) =
        ConnectionManager::spawn_with_cancel(connector, config.sync.transport_settings(), &cancel);

    let engine = SyncEngine::new(&config.sync, events);
    let view = engine.view();
    let engine_handle = tokio::spawn(engine.run(TracingRenderer::default(), cancel.clone()));

    let report_handle = if config.report.interval_secs > 0 {
        Some(tokio::spawn(run_report(
            view.clone(),
            Duration::from_secs(config.report.interval_secs),
            stale_after,
            cancel.clone(),
        )))
    } else {
        None
    };

    let state = AppState {
        view,
        connection: manager.handle(),
    };
    let axum_app = api::router().with_state(state);
    let axum_listener = TcpListener::bind(config.server.http_addr).await?;
    info!(http_addr = %config.server.http_addr, "HTTP server listening");

    let server_cancel = cancel.clone();
    tokio::select! {
        result = axum::serve(axum_listener, axum_app).with_graceful_shutdown(async move {
            server_cancel.cancelled().await;
        }) => {
            if let Err(e) = result {
                error!(error = ?e, "HTTP server error");
            }
            info!("HTTP server shut down");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    cancel.cancel();
    manager.shutdown().await;
    let _ = engine_handle.await;
    if let Some(handle) = report_handle {
        let _ = handle.await;
    }

    info!("flotilla-monitor shut down complete");
    Ok(())
}
