//! # duolightd — duolight daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and initialise logging
//! - Build the bridge with its event bus and accessory settings
//! - Start the enabled integrations, which report fixtures to the bridge
//! - Build the axum router over the bridge
//! - Bind to a TCP port and serve
//! - Handle graceful shutdown (Ctrl-C): stop integrations, disconnect lamps
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use duolight_adapter_ble::BleIntegration;
use duolight_adapter_http_axum::state::AppState;
use duolight_adapter_virtual::VirtualIntegration;
use duolight_app::event_bus::InProcessEventBus;
use duolight_app::ports::{DiscoveryHandler, Integration};
use duolight_app::services::bridge::{Bridge, BridgeContext};
use duolight_domain::error::DuolightError;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Bridge
    let event_bus = Arc::new(InProcessEventBus::new(256));
    let context = config.bridge.accessories.iter().fold(
        BridgeContext::new(Arc::clone(&event_bus), config.accessory_settings()),
        |context, accessory| context.with_name(&accessory.address, accessory.name.clone()),
    );
    let bridge = Bridge::new(context);

    // Integrations
    let mut virtual_integration = config.integrations.virtual_enabled.then(|| {
        VirtualIntegration::with_addresses(
            config.bridge.accessories.iter().map(|a| a.address.clone()),
        )
    });
    let mut ble_integration = config
        .integrations
        .ble_enabled
        .then(|| BleIntegration::new(config.ble.clone()));

    if let Some(integration) = virtual_integration.as_mut() {
        start(integration, &bridge).await?;
    }
    if let Some(integration) = ble_integration.as_mut() {
        start(integration, &bridge).await?;
    }

    // HTTP
    let app = duolight_adapter_http_axum::router::build(AppState::new(bridge.clone(), event_bus));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "duolightd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Shutdown
    if let Some(integration) = ble_integration.as_mut() {
        stop(integration).await;
    }
    if let Some(integration) = virtual_integration.as_mut() {
        stop(integration).await;
    }
    bridge.shutdown().await;

    Ok(())
}

async fn start<I, H>(integration: &mut I, bridge: &H) -> Result<(), DuolightError>
where
    I: Integration,
    H: DiscoveryHandler + Clone + 'static,
{
    integration.setup(bridge).await?;
    integration.start_background(bridge.clone()).await?;
    tracing::info!(integration = integration.name(), "integration started");
    Ok(())
}

async fn stop<I: Integration>(integration: &mut I) {
    if let Err(err) = integration.teardown().await {
        tracing::warn!(integration = integration.name(), %err, "integration teardown failed");
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown requested"),
        Err(err) => {
            tracing::error!(%err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
