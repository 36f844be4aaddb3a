//! Chore engine daemon (PRD-09).
//!
//! Process harness only: loads configuration and the persisted snapshot,
//! spawns the chore service with its sweep and reset timers, forwards the
//! event stream to the log (the external notification dispatcher attaches
//! to the same bus), and shuts everything down in order on SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chorewheel_engine::{ChoreService, ChoreStore, EngineConfig, PersistenceGateway};
use chorewheel_events::EventBus;

mod gateway;

use gateway::FileGateway;

/// Default path of the snapshot file.
const DEFAULT_STATE_PATH: &str = "chorewheel-state.json";

/// How long to wait for each task to finish during shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chorewheel=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = EngineConfig::from_env();
    tracing::info!(
        timezone = %config.timezone,
        sweep_interval_secs = config.sweep_interval_secs,
        "Loaded engine configuration"
    );

    // --- Persistence gateway ---
    let state_path =
        std::env::var("CHORE_STATE_PATH").unwrap_or_else(|_| DEFAULT_STATE_PATH.into());
    let gateway: Arc<dyn PersistenceGateway> = Arc::new(FileGateway::new(&state_path));

    let store = match gateway.load_snapshot().await {
        Ok(Some(snapshot)) => {
            tracing::info!(
                path = %state_path,
                chores = snapshot.chores.len(),
                assignments = snapshot.assignments.len(),
                "Loaded snapshot"
            );
            ChoreStore::from_snapshot(config.timezone, snapshot)
        }
        Ok(None) => {
            tracing::info!(path = %state_path, "No snapshot found, starting empty");
            ChoreStore::new(config.timezone)
        }
        Err(err) => {
            tracing::error!(error = %err, "Snapshot load failed, starting empty");
            ChoreStore::new(config.timezone)
        }
    };

    // --- Event bus ---
    let bus = Arc::new(EventBus::default());

    // --- Service + timers ---
    let cancel = CancellationToken::new();
    let (handle, service_handle) = ChoreService::spawn(
        store,
        Arc::clone(&bus),
        Arc::clone(&gateway),
        &config,
        cancel.clone(),
    );

    let sweep_handle = tokio::spawn(chorewheel_engine::sweep::run(
        handle.clone(),
        config.sweep_interval(),
        cancel.clone(),
    ));
    let reset_handle = tokio::spawn(chorewheel_engine::reset::run(
        handle.clone(),
        config.timezone,
        cancel.clone(),
    ));

    // --- Event log forwarder ---
    // Stand-in consumer: downstream points/badges/notification services
    // subscribe to the same bus and react on their own.
    let logger_cancel = cancel.clone();
    let mut events = bus.subscribe();
    let logger_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = logger_cancel.cancelled() => break,
                event = events.recv() => match event {
                    Ok(event) => tracing::info!(
                        chore_id = %event.chore_id,
                        person_id = ?event.person_id,
                        kind = ?event.kind,
                        "Chore event"
                    ),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "Event logger lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }
    });

    tracing::info!("Chore daemon running");

    // --- Shutdown ---
    shutdown_signal().await;

    // Cancel the timers first so no tick lands after the final flush.
    cancel.cancel();
    for (name, task) in [
        ("sweep", sweep_handle),
        ("reset", reset_handle),
        ("event logger", logger_handle),
        ("service", service_handle),
    ] {
        if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
            tracing::warn!(task = name, "Task did not stop within the grace period");
        }
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the daemon shuts
/// down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
