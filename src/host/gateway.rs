//! Inbound request gateway.
//!
//! The only path from the UI process into the coordinator. Operation names
//! are matched against the static allow-list in [`Operation::parse`]; a name
//! outside it is rejected with `InvalidChannel` and never reaches the
//! coordinator. Failures come back as structured [`GatewayResponse`]s.

use crate::error::{Result, UpdateError};
use crate::host::contract::{GatewayResponse, Operation};
use crate::update::{CheckOutcome, TriggerKind, UpdateCoordinator};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Routes allow-listed operations to the coordinator.
pub struct RequestGateway {
    coordinator: Arc<UpdateCoordinator>,
    handlers: Mutex<BTreeSet<Operation>>,
}

impl RequestGateway {
    /// Create a gateway with no registered handlers.
    pub fn new(coordinator: Arc<UpdateCoordinator>) -> Self {
        Self {
            coordinator,
            handlers: Mutex::new(BTreeSet::new()),
        }
    }

    /// Register the handlers for a deployment.
    ///
    /// `install` and `open-release` are always available; `check` and
    /// `download` only when the UI may trigger them.
    pub fn register_defaults(&self, allow_manual_operations: bool) {
        self.register(Operation::Install);
        self.register(Operation::OpenRelease);
        if allow_manual_operations {
            self.register(Operation::Check);
            self.register(Operation::Download);
        }
    }

    /// Register the handler for `operation`. Returns `false` if already registered.
    pub fn register(&self, operation: Operation) -> bool {
        let added = self.lock().insert(operation);
        if added {
            debug!(%operation, "gateway handler registered");
        }
        added
    }

    /// Remove the handler for `operation`.
    ///
    /// Removing a handler that was never registered is a no-op returning `false`.
    pub fn remove_handler(&self, operation: Operation) -> bool {
        let removed = self.lock().remove(&operation);
        if removed {
            debug!(%operation, "gateway handler removed");
        }
        removed
    }

    /// Remove every registered handler. Returns how many were removed.
    pub fn remove_all(&self) -> usize {
        let mut handlers = self.lock();
        let count = handlers.len();
        handlers.clear();
        if count > 0 {
            info!(count, "gateway handlers removed");
        }
        count
    }

    #[must_use]
    pub fn is_registered(&self, operation: Operation) -> bool {
        self.lock().contains(&operation)
    }

    #[must_use]
    pub fn registered(&self) -> Vec<Operation> {
        self.lock().iter().copied().collect()
    }

    /// Match a raw operation name against the allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidChannel`] for any other name.
    pub fn validate(name: &str) -> Result<Operation> {
        Operation::parse(name).ok_or_else(|| UpdateError::InvalidChannel(name.to_owned()))
    }

    /// Validate and execute one inbound request.
    pub async fn handle(&self, name: &str) -> GatewayResponse {
        let operation = match Self::validate(name) {
            Ok(operation) => operation,
            Err(e) => {
                warn!(operation = name, "rejected request outside the allow-list");
                return GatewayResponse::error(e.to_string());
            }
        };
        if !self.is_registered(operation) {
            warn!(%operation, "rejected request without a registered handler");
            return GatewayResponse::error(format!("no handler registered for `{operation}`"));
        }

        match self.dispatch(operation).await {
            Ok(value) => GatewayResponse::ok(value),
            Err(e) => {
                debug!(%operation, error = %e, "gateway request failed");
                GatewayResponse::error(e.to_string())
            }
        }
    }

    async fn dispatch(&self, operation: Operation) -> Result<Option<serde_json::Value>> {
        match operation {
            Operation::Check => {
                match self.coordinator.check_for_updates(TriggerKind::Manual).await {
                    CheckOutcome::Available(info) => Ok(Some(info.version.into())),
                    CheckOutcome::UpToDate { version } => Ok(Some(version.into())),
                    CheckOutcome::Skipped(_) => Ok(None),
                    CheckOutcome::Failed(message) => Err(UpdateError::Transport(message)),
                }
            }
            Operation::Download => {
                self.coordinator.request_download()?;
                Ok(None)
            }
            Operation::Install => {
                self.coordinator.request_install().await;
                Ok(None)
            }
            Operation::OpenRelease => {
                let url = self.coordinator.request_open_release()?;
                Ok(Some(url.into()))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeSet<Operation>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
