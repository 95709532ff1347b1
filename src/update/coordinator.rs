//! The update lifecycle state machine.
//!
//! [`UpdateCoordinator`] is the single owner of [`UpdateState`]. Scheduled
//! and manual checks, download/install/open-release requests all land here;
//! the platform capability decides which branch of the transition table is
//! taken, so callers never branch on platform themselves.
//!
//! The state guard is the only concurrency control: a check is accepted only
//! from `Idle` or `Available`, a download only from `Available`
//! (browser-redirect platforms) or straight out of `Checking` (silent-install
//! platforms). The lock is never held across an `.await`.

use crate::error::{Result, UpdateError};
use crate::platform::PlatformCapability;
use crate::update::observer::{
    MenuAction, MenuItemState, UpdateNotification, UpdateObserver, UserDialog,
};
use crate::update::state::{CheckResult, DownloadProgress, TriggerKind, UpdateInfo, UpdateState};
use crate::update::transport::{ExternalShell, InstallOptions, UpdateTransport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error, info, warn};

/// Advisory result of [`UpdateCoordinator::check_for_updates`].
///
/// UI effects are delivered through the observer; this value only feeds the
/// gateway's `check` response.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// Another operation owns the machine (or the coordinator is shut down).
    Skipped(UpdateState),
    /// The running version is current.
    UpToDate { version: String },
    /// A newer version was found.
    Available(UpdateInfo),
    /// The check failed.
    Failed(String),
}

/// Resolve the release page for `version`, or the bare base URL.
#[must_use]
pub fn release_url(base_url: &str, version: Option<&str>) -> String {
    let base = base_url.trim_end_matches('/');
    match version {
        Some(v) => format!("{base}/tag/v{}", v.trim_start_matches('v')),
        None => base.to_owned(),
    }
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: UpdateState,
    pending_version: Option<String>,
    available: Option<UpdateInfo>,
    downloaded_version: Option<String>,
    install_requested: bool,
}

/// Owns the update lifecycle and drives transport and observer effects.
pub struct UpdateCoordinator {
    capability: PlatformCapability,
    release_base_url: String,
    transport: Arc<dyn UpdateTransport>,
    observer: Arc<dyn UpdateObserver>,
    shell: Arc<dyn ExternalShell>,
    lifecycle: Mutex<Lifecycle>,
    destroyed: AtomicBool,
}

impl UpdateCoordinator {
    pub fn new(
        capability: PlatformCapability,
        release_base_url: impl Into<String>,
        transport: Arc<dyn UpdateTransport>,
        observer: Arc<dyn UpdateObserver>,
        shell: Arc<dyn ExternalShell>,
    ) -> Self {
        Self {
            capability,
            release_base_url: release_base_url.into(),
            transport,
            observer,
            shell,
            lifecycle: Mutex::new(Lifecycle::default()),
            destroyed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn capability(&self) -> PlatformCapability {
        self.capability
    }

    #[must_use]
    pub fn state(&self) -> UpdateState {
        self.lock().state
    }

    /// Version remembered from the last `available` result.
    #[must_use]
    pub fn pending_version(&self) -> Option<String> {
        self.lock().pending_version.clone()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Mark the coordinator as shut down.
    ///
    /// Returns `true` only for the first call. In-flight operations still run
    /// to completion but no longer reach the observer.
    pub fn shutdown(&self) -> bool {
        let first = !self.destroyed.swap(true, Ordering::SeqCst);
        if first {
            info!("update coordinator shut down");
        }
        first
    }

    /// Push the menu item for the current state.
    pub fn publish_menu(&self) {
        let item = {
            let lifecycle = self.lock();
            self.menu_for(&lifecycle)
        };
        self.emit_menu(item);
    }

    /// Check the release source for a newer version.
    ///
    /// A call while a check or download is in flight, or once an update is
    /// downloaded, only re-asserts the current menu item and returns
    /// [`CheckOutcome::Skipped`]. A check from `Available` drops the pending
    /// version; the result decides what replaces it.
    pub async fn check_for_updates(self: &Arc<Self>, trigger: TriggerKind) -> CheckOutcome {
        if self.is_destroyed() {
            debug!(?trigger, "check ignored after shutdown");
            return CheckOutcome::Skipped(self.state());
        }

        let item = {
            let mut lifecycle = self.lock();
            if !lifecycle.state.can_transition_to(UpdateState::Checking) {
                let state = lifecycle.state;
                let item = self.menu_for(&lifecycle);
                drop(lifecycle);
                debug!(?trigger, %state, "check already in progress or pending; ignoring");
                self.emit_menu(item);
                return CheckOutcome::Skipped(state);
            }
            self.transition(&mut lifecycle, UpdateState::Checking);
            lifecycle.pending_version = None;
            lifecycle.available = None;
            self.menu_for(&lifecycle)
        };
        self.emit_menu(item);

        info!(?trigger, capability = %self.capability, "checking for updates");
        match self.transport.check_for_updates().await {
            Ok(CheckResult::Available(info)) => self.on_available(info),
            Ok(CheckResult::NotAvailable { version }) => self.on_not_available(version, trigger),
            Err(e) => self.on_check_failed(&e, trigger),
        }
    }

    /// Start downloading the pending update (browser-redirect platforms only).
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidState`] on silent-install platforms, after
    /// shutdown, or when the machine is not `Available`. No transport call is
    /// made in that case.
    pub fn request_download(self: &Arc<Self>) -> Result<()> {
        if self.capability.supports_silent_install() {
            return Err(UpdateError::InvalidState(
                "updates download automatically on this platform".to_owned(),
            ));
        }
        if self.is_destroyed() {
            return Err(UpdateError::InvalidState(
                "update coordinator is shut down".to_owned(),
            ));
        }

        let (info, item) = {
            let mut lifecycle = self.lock();
            if lifecycle.state != UpdateState::Available {
                return Err(UpdateError::InvalidState(format!(
                    "cannot download while {}",
                    lifecycle.state
                )));
            }
            let info = lifecycle.available.clone().ok_or_else(|| {
                UpdateError::InvalidState("no release information for pending update".to_owned())
            })?;
            self.transition(&mut lifecycle, UpdateState::Downloading);
            (info, self.menu_for(&lifecycle))
        };
        self.emit_menu(item);
        self.spawn_download(info);
        Ok(())
    }

    /// Restart into the downloaded update.
    ///
    /// Only acts on silent-install platforms in `Downloaded`, and only once.
    /// On browser-redirect platforms installation happens outside the
    /// process and this is a no-op.
    pub async fn request_install(&self) {
        if !self.capability.supports_silent_install() {
            debug!("install requested on browser-redirect platform; nothing to do");
            return;
        }
        {
            let mut lifecycle = self.lock();
            if lifecycle.state != UpdateState::Downloaded {
                debug!(state = %lifecycle.state, "install requested without a downloaded update");
                return;
            }
            if lifecycle.install_requested {
                debug!("install already requested");
                return;
            }
            lifecycle.install_requested = true;
        }

        info!("quitting to install downloaded update");
        if let Err(e) = self.transport.quit_and_install(InstallOptions::RESTART).await {
            error!(error = %e, "quit-and-install failed");
            self.lock().install_requested = false;
            self.emit_notification(UpdateNotification::Error {
                message: e.to_string(),
            });
        }
    }

    /// Open the release page for the pending version in the user's browser.
    ///
    /// Falls back to the bare releases page when nothing is pending. Returns
    /// the URL that was opened.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidState`] on silent-install platforms, or
    /// the shell's error if the URL cannot be opened.
    pub fn request_open_release(&self) -> Result<String> {
        if self.capability.supports_silent_install() {
            return Err(UpdateError::InvalidState(
                "release page hand-off is not used on this platform".to_owned(),
            ));
        }
        let pending = self.pending_version();
        if pending.is_none() {
            debug!(reason = %UpdateError::NoPendingVersion, "opening releases index");
        }
        let url = release_url(&self.release_base_url, pending.as_deref());
        info!(%url, "opening release page");
        self.shell.open_url(&url)?;
        Ok(url)
    }

    fn on_available(self: &Arc<Self>, info: UpdateInfo) -> CheckOutcome {
        info!(version = %info.version, "update available");
        let silent = self.capability.supports_silent_install();

        let item = {
            let mut lifecycle = self.lock();
            if silent {
                if self.is_destroyed() {
                    self.transition(&mut lifecycle, UpdateState::Idle);
                    return CheckOutcome::Available(info);
                }
                self.transition(&mut lifecycle, UpdateState::Downloading);
            } else {
                self.transition(&mut lifecycle, UpdateState::Available);
                lifecycle.pending_version = Some(info.version.clone());
            }
            lifecycle.available = Some(info.clone());
            self.menu_for(&lifecycle)
        };
        self.emit_menu(item);

        if silent {
            self.spawn_download(info.clone());
        } else {
            self.emit_notification(UpdateNotification::Available(info.clone()));
        }
        CheckOutcome::Available(info)
    }

    fn on_not_available(&self, version: String, trigger: TriggerKind) -> CheckOutcome {
        info!(%version, "already up to date");
        let item = {
            let mut lifecycle = self.lock();
            self.transition(&mut lifecycle, UpdateState::Idle);
            self.menu_for(&lifecycle)
        };
        self.emit_menu(item);
        if trigger.is_manual() {
            self.emit_dialog(UserDialog::up_to_date(&version));
        }
        CheckOutcome::UpToDate { version }
    }

    fn on_check_failed(&self, e: &UpdateError, trigger: TriggerKind) -> CheckOutcome {
        let message = e.to_string();
        let item = {
            let mut lifecycle = self.lock();
            self.transition(&mut lifecycle, UpdateState::Failed);
            self.transition(&mut lifecycle, UpdateState::Idle);
            self.menu_for(&lifecycle)
        };
        self.emit_menu(item);

        if trigger.is_manual() {
            error!(error = %message, "manual update check failed");
            self.emit_dialog(UserDialog::check_failed(&message));
            self.emit_notification(UpdateNotification::Error {
                message: message.clone(),
            });
        } else {
            warn!(error = %message, "scheduled update check failed");
        }
        CheckOutcome::Failed(message)
    }

    fn spawn_download(self: &Arc<Self>, info: UpdateInfo) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run_download(info).await;
        });
    }

    async fn run_download(&self, info: UpdateInfo) {
        info!(version = %info.version, "downloading update");
        let on_progress = |progress: DownloadProgress| self.on_progress(progress);
        match self.transport.download_update(&info, &on_progress).await {
            Ok(()) => self.on_downloaded(info.version),
            Err(e) => self.on_download_failed(&e),
        }
    }

    fn on_progress(&self, progress: DownloadProgress) {
        if self.state() != UpdateState::Downloading {
            debug!("progress received outside of a download; dropping");
            return;
        }
        let progress = progress.normalized();
        debug!(percent = progress.percent, "download progress");
        self.emit_notification(UpdateNotification::DownloadProgress(progress));
    }

    fn on_downloaded(&self, version: String) {
        info!(%version, "update downloaded");
        let item = {
            let mut lifecycle = self.lock();
            self.transition(&mut lifecycle, UpdateState::Downloaded);
            lifecycle.downloaded_version = Some(version.clone());
            self.menu_for(&lifecycle)
        };
        self.emit_menu(item);
        self.emit_notification(UpdateNotification::Downloaded { version });
    }

    fn on_download_failed(&self, e: &UpdateError) {
        error!(error = %e, "update download failed");
        let item = {
            let mut lifecycle = self.lock();
            self.transition(&mut lifecycle, UpdateState::Idle);
            lifecycle.available = None;
            self.menu_for(&lifecycle)
        };
        self.emit_menu(item);
        self.emit_notification(UpdateNotification::Error {
            message: e.to_string(),
        });
    }

    fn transition(&self, lifecycle: &mut Lifecycle, next: UpdateState) -> bool {
        let from = lifecycle.state;
        if !from.can_transition_to(next) {
            error!(%from, to = %next, "refusing illegal update state transition");
            return false;
        }
        debug!(%from, to = %next, "update state transition");
        lifecycle.state = next;
        true
    }

    fn menu_for(&self, lifecycle: &Lifecycle) -> MenuItemState {
        match lifecycle.state {
            UpdateState::Idle | UpdateState::Failed => {
                MenuItemState::enabled("Check for Updates...", MenuAction::CheckForUpdates)
            }
            UpdateState::Checking => MenuItemState::disabled("Checking for Updates..."),
            UpdateState::Available => {
                let version = lifecycle.pending_version.as_deref().unwrap_or_default();
                MenuItemState::enabled(
                    format!("Open Release {version}..."),
                    MenuAction::OpenRelease,
                )
            }
            UpdateState::Downloading => MenuItemState::disabled("Downloading Update..."),
            UpdateState::Downloaded => {
                let version = lifecycle.downloaded_version.as_deref().unwrap_or_default();
                if self.capability.supports_silent_install() {
                    MenuItemState::enabled(
                        format!("Restart to Update to {version}"),
                        MenuAction::InstallAndRestart,
                    )
                } else {
                    MenuItemState::disabled(format!("Update {version} Downloaded"))
                }
            }
        }
    }

    fn ui_available(&self) -> bool {
        !self.is_destroyed() && self.observer.is_alive()
    }

    fn emit_menu(&self, item: MenuItemState) {
        if self.ui_available() {
            self.observer.update_menu(item);
        }
    }

    fn emit_notification(&self, notification: UpdateNotification) {
        if self.ui_available() {
            self.observer.notify(notification);
        }
    }

    fn emit_dialog(&self, dialog: UserDialog) {
        if self.ui_available() {
            self.observer.acknowledge(dialog);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn release_url_with_pending_version() {
        assert_eq!(
            release_url("https://example.com/project/releases", Some("2.3.0")),
            "https://example.com/project/releases/tag/v2.3.0"
        );
    }

    #[test]
    fn release_url_without_pending_version() {
        assert_eq!(
            release_url("https://example.com/project/releases", None),
            "https://example.com/project/releases"
        );
    }

    #[test]
    fn release_url_normalizes_slashes_and_prefix() {
        assert_eq!(
            release_url("https://x/releases/", Some("v1.2.0")),
            "https://x/releases/tag/v1.2.0"
        );
        assert_eq!(release_url("https://x/releases/", None), "https://x/releases");
    }
}
