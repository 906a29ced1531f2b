//! # camlinkd — camlink gateway daemon
//!
//! Composition root that wires all adapters together and starts the gateway.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and install the tracing subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the services, injecting adapters via port traits
//! - Connect to the MQTT broker and feed the ingest worker pool
//! - Serve the SSE stream and status queries over HTTP
//! - Shut down gracefully on Ctrl-C: stop HTTP, disconnect from the broker,
//!   drain in-flight messages
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer, no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use camlink_adapter_http_axum::state::AppState;
use camlink_adapter_mqtt::MqttTransport;
use camlink_adapter_storage_sqlite_sqlx::{
    SqliteAutomationConfigRepository, SqliteHistoryStore, SqliteOperationLogRepository,
};
use camlink_app::automation_engine::AutomationEngine;
use camlink_app::event_bus::Broadcaster;
use camlink_app::ingest::IngestPool;
use camlink_app::ports::SystemClock;
use camlink_app::router::MessageRouter;
use camlink_app::services::command_dispatcher::CommandDispatcher;
use camlink_app::services::device_state_cache::DeviceStateCache;
use camlink_app::services::manual_override::ManualOverrides;

use crate::config::Config;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = camlink_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await?;
    let pool = db.pool().clone();

    // Broker
    let (inbound_tx, inbound_rx) = mpsc::channel(config.gateway.inbound_queue);
    let (transport, event_loop) = MqttTransport::new(&config.mqtt, inbound_tx);
    let transport = Arc::new(transport);

    // Services
    let broadcaster = Arc::new(Broadcaster::new(config.gateway.subscriber_queue));
    let cache = Arc::new(DeviceStateCache::new(
        SqliteHistoryStore::new(pool.clone()),
        Arc::clone(&broadcaster),
        SystemClock,
    ));
    let dispatcher = Arc::new(CommandDispatcher::new(
        Arc::clone(&transport),
        SqliteOperationLogRepository::new(pool.clone()),
        Arc::clone(&broadcaster),
        SystemClock,
        Arc::new(ManualOverrides::new()),
    ));
    let automation = Arc::new(AutomationEngine::new(
        SqliteAutomationConfigRepository::new(pool),
        Arc::clone(&dispatcher),
    ));
    let router = MessageRouter::new(Arc::clone(&cache), dispatcher, automation);

    let broker_task = tokio::spawn(event_loop.run());
    let ingest_task = tokio::spawn(
        IngestPool::new(Arc::new(router), config.gateway.ingest_workers).run(inbound_rx),
    );

    // HTTP
    let app = camlink_adapter_http_axum::router::build(AppState::new(broadcaster, cache));
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, broker = %config.mqtt.broker_host, "camlinkd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutting down");
    if let Err(err) = transport.disconnect().await {
        tracing::warn!(error = %err, "broker disconnect failed");
    }
    let broker_abort = broker_task.abort_handle();
    match tokio::time::timeout(SHUTDOWN_GRACE, broker_task).await {
        Ok(joined) => joined?,
        Err(_) => {
            tracing::warn!(grace = ?SHUTDOWN_GRACE, "broker loop still running, aborting it");
            broker_abort.abort();
        }
    }
    ingest_task.await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
