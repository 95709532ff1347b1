//! Composition root for the update coordinator.
//!
//! [`UpdaterService`] wires the coordinator, the periodic scheduler and the
//! request gateway together and owns their shutdown. `destroy` releases the
//! timer and every registered gateway handler exactly once.

use crate::config::UpdaterConfig;
use crate::error::Result;
use crate::host::gateway::RequestGateway;
use crate::platform::PlatformCapability;
use crate::scheduler::Scheduler;
use crate::update::{
    CheckOutcome, ExternalShell, MenuAction, TriggerKind, UpdateCoordinator, UpdateObserver,
    UpdateTransport,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

pub struct UpdaterService {
    coordinator: Arc<UpdateCoordinator>,
    scheduler: Scheduler,
    gateway: Arc<RequestGateway>,
    check_interval: Duration,
    destroyed: AtomicBool,
}

impl UpdaterService {
    /// Validate `config`, build the coordinator and register gateway handlers.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(
        config: &UpdaterConfig,
        capability: PlatformCapability,
        transport: Arc<dyn UpdateTransport>,
        observer: Arc<dyn UpdateObserver>,
        shell: Arc<dyn ExternalShell>,
    ) -> Result<Self> {
        config.validate()?;

        let coordinator = Arc::new(UpdateCoordinator::new(
            capability,
            config.release_base_url.clone(),
            transport,
            observer,
            shell,
        ));
        let gateway = Arc::new(RequestGateway::new(Arc::clone(&coordinator)));
        gateway.register_defaults(config.allow_manual_operations);

        info!(
            %capability,
            version = %config.current_version,
            "update service initialised"
        );
        coordinator.publish_menu();

        Ok(Self {
            coordinator,
            scheduler: Scheduler::new(),
            gateway,
            check_interval: config.check_interval(),
            destroyed: AtomicBool::new(false),
        })
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<UpdateCoordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn gateway(&self) -> &Arc<RequestGateway> {
        &self.gateway
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Start scheduled checks at the configured interval.
    pub fn start_periodic_checks(&self) {
        self.start_periodic_checks_every(self.check_interval);
    }

    /// Start scheduled checks at `interval`.
    pub fn start_periodic_checks_every(&self, interval: Duration) {
        if self.is_destroyed() {
            warn!("periodic checks requested after destroy; ignoring");
            return;
        }
        self.scheduler
            .start(interval, Arc::downgrade(&self.coordinator));
    }

    /// User-initiated check from the menu.
    pub async fn check_for_updates_manual(&self) -> CheckOutcome {
        self.coordinator
            .check_for_updates(TriggerKind::Manual)
            .await
    }

    /// Perform the action carried by the current menu item.
    pub async fn activate_menu(&self, action: MenuAction) {
        match action {
            MenuAction::CheckForUpdates => {
                self.check_for_updates_manual().await;
            }
            MenuAction::OpenRelease => {
                if let Err(e) = self.coordinator.request_open_release() {
                    warn!(error = %e, "menu open-release request failed");
                }
            }
            MenuAction::InstallAndRestart => self.coordinator.request_install().await,
            MenuAction::None => {}
        }
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Stop the schedule, remove gateway handlers and shut the coordinator down.
    ///
    /// Idempotent; returns `true` only on the call that did the work.
    pub fn destroy(&self) -> bool {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.scheduler.stop();
        self.gateway.remove_all();
        self.coordinator.shutdown();
        info!("update service destroyed");
        true
    }
}

impl Drop for UpdaterService {
    fn drop(&mut self) {
        self.destroy();
    }
}
