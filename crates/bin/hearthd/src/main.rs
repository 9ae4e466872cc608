//! # hearthd — hearth automation daemon
//!
//! Composition root that wires all adapters together and runs the
//! automation core.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the tracing subscriber
//! - Construct the in-memory stores (optionally seeded) and virtual devices
//! - Construct the executor, event bus and rule scheduler
//! - Run until SIGINT, then cancel delayed work and join the scheduler
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

use anyhow::Context;
use tokio::runtime::Handle;
use tracing_subscriber::EnvFilter;

use hearthd::{Config, Hearth};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    let hearth = Hearth::build(&config, Handle::current())?;
    let notifications = hearth.log_notifications();
    hearth.start()?;

    tracing::info!("hearthd running, press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("shutdown requested");

    let stopping = tokio::task::spawn_blocking(move || hearth.shutdown());
    stopping.await.context("shutdown task failed")?;
    notifications.abort();

    Ok(())
}
