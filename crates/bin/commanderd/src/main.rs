//! # commanderd — commander daemon
//!
//! Composition root that wires all adapters together and runs the engine.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars) and install logging
//! - Connect to the message bus
//! - Build the rule deployers and the automation file reloader
//! - Load the automations, then poll the files for changes
//! - Serve the status API until SIGINT, then disconnect from the bus
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use commander_adapter_automations_yaml::YamlSource;
use commander_adapter_cron::CronDeployer;
use commander_adapter_http::{HttpActionHandler, HttpDeployer};
use commander_adapter_http_axum::state::AppState;
use commander_adapter_mqtt::{MqttBroker, MqttDeployer};
use commander_app::engine::Engine;
use commander_app::ports::AutomationSource;
use commander_app::reload::Reloader;
use commander_domain::error::describe;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    let timezone = commander_adapter_cron::timezone(&config.timezone)?;
    let engine = Engine::with_muted(config.muted);
    if config.muted {
        tracing::warn!("muted: automations are evaluated but no action runs");
    }

    // Message bus
    let (broker, bus_task) = MqttBroker::connect(&config.mqtt, engine.clone())?;

    // Collaborators
    let http = HttpActionHandler::new(&config.http)?;
    let mut reloader = Reloader::new(YamlSource::new(&config.automations.path), engine.clone())
        .with_deployer(Arc::new(MqttDeployer::new(broker.clone())))
        .with_deployer(Arc::new(CronDeployer::new(timezone)))
        .with_deployer(Arc::new(HttpDeployer::new(http)));

    let units = reloader.reload().await?;
    tracing::info!(
        path = %config.automations.path.display(),
        units,
        automations = engine.automations().all().len(),
        "automations loaded"
    );
    let reload_task = tokio::spawn(watch(reloader, config.poll_interval()));

    // HTTP
    let app = commander_adapter_http_axum::router::build(AppState::new(
        config.name.clone(),
        engine.clone(),
    ));
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!(name = %config.name, addr = %config.bind_addr(), "commanderd listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reload_task.abort();
    if let Err(err) = broker.disconnect().await {
        tracing::warn!(error = %err, "unable to disconnect from the message bus");
    }
    bus_task.abort();
    tracing::info!("commanderd stopped");

    Ok(())
}

/// Apply file changes every `interval`. A failed pass is logged and retried
/// on the next tick.
async fn watch<S: AutomationSource>(mut reloader: Reloader<S>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match reloader.reload().await {
            Ok(0) => {}
            Ok(units) => tracing::info!(units, "automations reloaded"),
            Err(err) => tracing::error!(error = %describe(&err), "unable to reload automations"),
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
