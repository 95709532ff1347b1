//! Updraft: application-update coordinator.
//!
//! Periodically or on demand checks a release source for a newer version,
//! downloads and installs it when the platform supports silent installs (or
//! hands off to the release page when it does not), and keeps the menu and
//! banner UI surfaces in sync with progress.
//!
//! # Architecture
//!
//! - **Coordinator** ([`update::UpdateCoordinator`]): the only stateful
//!   component; owns the update lifecycle state machine
//! - **Scheduler** ([`scheduler::Scheduler`]): recurring scheduled checks
//! - **Gateway** ([`host::gateway::RequestGateway`]): allow-listed inbound
//!   operations from the UI process
//! - **Transport** ([`update::UpdateTransport`]): network effects, with a
//!   GitHub releases implementation
//! - **Observer** ([`update::UpdateObserver`]): menu, banner and dialog effects

pub mod config;
pub mod error;
pub mod host;
pub mod platform;
pub mod scheduler;
pub mod service;
pub mod update;

pub use config::UpdaterConfig;
pub use error::{Result, UpdateError};
pub use platform::PlatformCapability;
pub use service::UpdaterService;
pub use update::{CheckOutcome, TriggerKind, UpdateCoordinator, UpdateState};
