//! Wiring of the hearth automation stack.
//!
//! [`Hearth::build`] constructs every adapter and service from a
//! [`Config`], connects the store change channels and the virtual devices
//! to the event bus and registers the rule scheduler as a bus handler.
//! The binary and the end-to-end tests share this wiring.

pub mod config;

use std::path::Path;
use std::sync::{Arc, Weak};

use anyhow::Context;
use tokio::runtime::Handle;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use hearth_adapter_memory::{InMemoryActionStore, InMemoryRuleStore, SeedSummary, load_seed};
use hearth_adapter_virtual::VirtualDeviceRegistry;
use hearth_app::delay::TokioDelayScheduler;
use hearth_app::event_bus::{EventBus, HandlerId};
use hearth_app::executor::ActionExecutor;
use hearth_app::notifier::BroadcastNotifier;
use hearth_app::rule_scheduler::RuleScheduler;
use hearth_domain::action::SubActionRegistry;
use hearth_domain::dispatch::DispatchResult;
use hearth_domain::event::{ActionChangeEvent, Event, RuleChangeEvent};

pub use config::{Config, ConfigError};

/// Fully wired automation stack.
pub struct Hearth {
    pub registry: SubActionRegistry,
    pub actions: Arc<InMemoryActionStore>,
    pub rules: Arc<InMemoryRuleStore>,
    pub devices: Arc<VirtualDeviceRegistry>,
    pub bus: Arc<EventBus>,
    pub notifier: Arc<BroadcastNotifier>,
    pub executor: ActionExecutor,
    pub scheduler: Arc<RuleScheduler>,
    scheduler_handler: HandlerId,
}

impl Hearth {
    /// Build the stack on `runtime`, loading the configured seed file.
    ///
    /// Nothing runs until [`start`](Self::start) is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the virtual devices cannot be described or the
    /// seed file cannot be read or loaded.
    pub fn build(config: &Config, runtime: Handle) -> anyhow::Result<Self> {
        let registry = SubActionRegistry::with_defaults();
        let actions = Arc::new(InMemoryActionStore::new());
        let rules = Arc::new(InMemoryRuleStore::new());
        let bus = Arc::new(EventBus::new());

        let devices = if config.integrations.virtual_enabled {
            VirtualDeviceRegistry::new()
        } else {
            VirtualDeviceRegistry::with_devices([])
        }
        .context("failed to create virtual devices")?;
        let devices = Arc::new(devices.with_event_bus(&bus));
        tracing::info!(count = devices.devices().len(), "virtual devices ready");

        let notifier = Arc::new(BroadcastNotifier::new(config.notifications.capacity));
        let delays = Arc::new(TokioDelayScheduler::new(runtime));
        let executor = ActionExecutor::new(
            actions.clone(),
            notifier.clone(),
            devices.clone(),
            delays,
        )
        .with_limits(config.execution_limits());

        let scheduler = Arc::new(RuleScheduler::new(executor.clone(), rules.clone()));
        let scheduler_handler = bus.add_handler(scheduler.clone());

        forward_action_changes(&actions, &bus);
        forward_rule_changes(&rules, &bus);

        let hearth = Self {
            registry,
            actions,
            rules,
            devices,
            bus,
            notifier,
            executor,
            scheduler,
            scheduler_handler,
        };
        if let Some(path) = &config.storage.seed_file {
            hearth.seed_from_file(path)?;
        }
        Ok(hearth)
    }

    /// Load a JSON seed document into the stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or a record is invalid.
    pub fn seed(&self, document: &str) -> anyhow::Result<SeedSummary> {
        let summary = load_seed(document, &self.registry, &self.actions, &self.rules)?;
        Ok(summary)
    }

    fn seed_from_file(&self, path: &Path) -> anyhow::Result<SeedSummary> {
        let document = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read seed file {}", path.display()))?;
        self.seed(&document)
            .with_context(|| format!("failed to load seed file {}", path.display()))
    }

    /// Start the rule scheduler worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the rules cannot be loaded or the worker thread
    /// cannot be spawned.
    pub fn start(&self) -> anyhow::Result<()> {
        self.scheduler
            .start()
            .context("failed to start rule scheduler")?;
        tracing::info!(queued = self.scheduler.queued().len(), "rule scheduler started");
        Ok(())
    }

    /// Spawn a task logging every notification broadcast.
    pub fn log_notifications(&self) -> JoinHandle<()> {
        let mut receiver = self.notifier.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(payload) => tracing::info!(%payload, "notification"),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "notification log lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Cancel delayed sub-actions, stop the scheduler and join its worker.
    pub fn shutdown(&self) {
        let cancelled = self.executor.cancel_pending();
        self.bus.remove_handler(self.scheduler_handler);
        self.scheduler.shutdown();
        tracing::info!(cancelled, "hearth stopped");
    }
}

fn forward_action_changes(actions: &InMemoryActionStore, bus: &Arc<EventBus>) {
    let bus = Arc::downgrade(bus);
    actions.subscribe(move |change: &ActionChangeEvent, _: &()| {
        forward(&bus, &Event::ActionChange(change.clone()))
    });
}

fn forward_rule_changes(rules: &InMemoryRuleStore, bus: &Arc<EventBus>) {
    let bus = Arc::downgrade(bus);
    rules.subscribe(move |change: &RuleChangeEvent, _: &()| {
        forward(&bus, &Event::RuleChange(change.clone()))
    });
}

fn forward(bus: &Weak<EventBus>, event: &Event) -> DispatchResult {
    match bus.upgrade() {
        Some(bus) => {
            bus.dispatch(event);
            DispatchResult::HANDLED
        }
        None => DispatchResult::SHOULD_REMOVE,
    }
}
