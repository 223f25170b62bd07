//! txnotify server
//!
//! Watches a bitcoind node for payments to registered addresses and for
//! registered transactions, and notifies by email, callback or chat webhook
//! once the requested number of confirmations is reached.

mod api;
mod config;
mod node;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use node::{BitcoindRpc, ZmqFeeder};
use server::{build_router, run_server};
use state::{AppState, RegistrationAlerts};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use txnotify_core::WatchRegistry;
use txnotify_core::events::{
    EventSenders, block_event_channel, notification_channel, transaction_event_channel,
};
use txnotify_core::notification::{Channel, ChannelTransport, NotificationDispatcher};
use txnotify_core::processors::{BlockListener, TransactionListener};

/// txnotify - Bitcoin payment and confirmation notifications
#[derive(Parser, Debug)]
#[command(name = "txnotify-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./txnotify.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:9002)
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// bitcoind RPC password, overriding the config file
    #[arg(long, env = "TXNOTIFY_RPC_PASSWORD", hide_env_values = true)]
    rpc_password: Option<String>,

    /// SMTP password, overriding the config file
    #[arg(long, env = "TXNOTIFY_SMTP_PASSWORD", hide_env_values = true)]
    smtp_password: Option<String>,
}

/// Startup tries against bitcoind before giving up.
const NODE_CONNECT_ATTEMPTS: u32 = 10;
const NODE_CONNECT_DELAY: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting txnotify-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_loader = ConfigLoader::new(
        &args.config,
        args.listen,
        args.rpc_password,
        args.smtp_password,
    );
    let config = config_loader.load().map_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
        e
    })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let network = config.node.network;
    let registry = WatchRegistry::new();

    let transport = Arc::new(ChannelTransport::new(config.notifications.transport_config())?);
    if !transport.supports(Channel::Email) {
        tracing::warn!("[notifications.smtp] not configured, email notifications will fail");
    }

    let rpc = Arc::new(BitcoindRpc::new(&config.node));
    let height = rpc
        .wait_until_ready(NODE_CONNECT_ATTEMPTS, NODE_CONNECT_DELAY)
        .await
        .map_err(|e| {
            tracing::error!(url = %config.node.rpc_url, error = %e, "Failed to connect to bitcoind");
            e
        })?;
    tracing::info!(height, %network, "Connected to bitcoind");

    // Wire the event pipeline
    let (tx_sender, tx_rx) = transaction_event_channel();
    let (block_sender, block_rx) = block_event_channel();
    let (notification_tx, notification_rx) = notification_channel();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let feeder = ZmqFeeder::new(
        &config.node,
        EventSenders::new(tx_sender, block_sender),
        shutdown_rx,
    );
    let feeder_handle = tokio::spawn(async move {
        if let Err(e) = feeder.run().await {
            tracing::error!(error = %e, "Failed to subscribe to bitcoind ZMQ");
        }
    });
    let tx_listener_handle = tokio::spawn(
        TransactionListener::new(registry.clone(), network, notification_tx.clone()).run(tx_rx),
    );
    let block_listener_handle = tokio::spawn(
        BlockListener::new(registry.clone(), rpc, notification_tx).run(block_rx),
    );
    let dispatcher_handle =
        tokio::spawn(NotificationDispatcher::new(transport.clone()).run(notification_rx));

    // Create application state
    let alerts = config
        .notifications
        .registration_alert_email
        .clone()
        .map(|email| RegistrationAlerts::new(transport.clone(), email));
    let state = AppState::new(registry, network, alerts);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", config.server.listen);
    let result = run_server(router, config.server.listen).await;

    // Stop the feeder; the listeners and the dispatcher drain behind it
    let _ = shutdown_tx.send(true);
    for (name, handle) in [
        ("ZmqFeeder", feeder_handle),
        ("TransactionListener", tx_listener_handle),
        ("BlockListener", block_listener_handle),
        ("NotificationDispatcher", dispatcher_handle),
    ] {
        if let Err(e) = handle.await {
            tracing::error!(task = name, error = %e, "Task failed during shutdown");
        }
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,txnotify_core=info,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
