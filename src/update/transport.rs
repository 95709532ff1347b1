//! Collaborator contracts for network and shell effects.
//!
//! The coordinator never talks to the network or the OS directly; it drives
//! an [`UpdateTransport`] and an [`ExternalShell`] injected at construction.

use crate::error::Result;
use crate::update::state::{CheckResult, DownloadProgress, UpdateInfo};
use async_trait::async_trait;

/// Callback receiving each progress snapshot of an in-flight download.
pub type ProgressSink<'a> = &'a (dyn Fn(DownloadProgress) + Send + Sync);

/// Options for the quit-and-install primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallOptions {
    /// Run the installer without UI.
    pub silent: bool,
    /// Relaunch the application once the installer finishes.
    pub force_run_after: bool,
}

impl InstallOptions {
    /// Visible installer that relaunches the app afterwards.
    pub const RESTART: Self = Self {
        silent: false,
        force_run_after: true,
    };
}

/// Performs the network side of an update.
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    /// Query the release source for a version newer than the running one.
    async fn check_for_updates(&self) -> Result<CheckResult>;

    /// Download the payload for `info`, reporting progress through `on_progress`.
    async fn download_update(
        &self,
        info: &UpdateInfo,
        on_progress: ProgressSink<'_>,
    ) -> Result<()>;

    /// Launch the downloaded installer and request application exit.
    async fn quit_and_install(&self, options: InstallOptions) -> Result<()>;
}

/// Hands a URL to the user's browser.
pub trait ExternalShell: Send + Sync {
    fn open_url(&self, url: &str) -> Result<()>;
}
