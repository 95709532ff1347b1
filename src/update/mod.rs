//! Application update lifecycle.
//!
//! The [`UpdateCoordinator`] owns the update state machine and drives an
//! [`UpdateTransport`] (network effects) and an [`UpdateObserver`] (UI
//! effects). [`GithubReleaseTransport`] is the bundled transport.

pub mod checker;
pub mod coordinator;
pub mod installer;
pub mod observer;
pub mod state;
pub mod transport;

pub use checker::{GithubReleaseTransport, Release};
pub use coordinator::{CheckOutcome, UpdateCoordinator, release_url};
pub use observer::{
    DialogKind, MenuAction, MenuItemState, UpdateNotification, UpdateObserver, UserDialog,
};
pub use state::{CheckResult, DownloadProgress, TriggerKind, UpdateInfo, UpdateState};
pub use transport::{ExternalShell, InstallOptions, ProgressSink, UpdateTransport};
