//! UI observer port.
//!
//! The coordinator reports every user-visible effect through
//! [`UpdateObserver`]: the menu affordance, the notification channel that
//! feeds the banner, and blocking acknowledgments.

use crate::update::state::{DownloadProgress, UpdateInfo};
use serde::{Deserialize, Serialize};

/// Wire names of every notification the banner surface accepts.
pub const NOTIFICATION_NAMES: [&str; 4] = [
    UpdateNotification::AVAILABLE,
    UpdateNotification::DOWNLOAD_PROGRESS,
    UpdateNotification::DOWNLOADED,
    UpdateNotification::ERROR,
];

/// What activating the menu item should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    CheckForUpdates,
    OpenRelease,
    InstallAndRestart,
    None,
}

/// Full description of the update menu item at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItemState {
    pub label: String,
    pub enabled: bool,
    pub action: MenuAction,
}

impl MenuItemState {
    #[must_use]
    pub fn enabled(label: impl Into<String>, action: MenuAction) -> Self {
        Self {
            label: label.into(),
            enabled: true,
            action,
        }
    }

    #[must_use]
    pub fn disabled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled: false,
            action: MenuAction::None,
        }
    }
}

/// A push notification for the banner surface.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateNotification {
    Available(UpdateInfo),
    DownloadProgress(DownloadProgress),
    Downloaded { version: String },
    Error { message: String },
}

impl UpdateNotification {
    pub const AVAILABLE: &'static str = "update:available";
    pub const DOWNLOAD_PROGRESS: &'static str = "update:download-progress";
    pub const DOWNLOADED: &'static str = "update:downloaded";
    pub const ERROR: &'static str = "update:error";

    /// Wire name of the notification.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Available(_) => Self::AVAILABLE,
            Self::DownloadProgress(_) => Self::DOWNLOAD_PROGRESS,
            Self::Downloaded { .. } => Self::DOWNLOADED,
            Self::Error { .. } => Self::ERROR,
        }
    }

    /// JSON payload sent alongside the name.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        match self {
            Self::Available(info) => serde_json::json!({
                "version": info.version,
                "releaseDate": info.release_date.to_rfc3339(),
                "releaseNotes": info.release_notes,
            }),
            Self::DownloadProgress(p) => serde_json::json!({
                "percent": p.percent,
                "bytesPerSecond": p.bytes_per_second,
                "transferred": p.transferred,
                "total": p.total,
            }),
            Self::Downloaded { version } => serde_json::json!({ "version": version }),
            Self::Error { message } => serde_json::json!({ "message": message }),
        }
    }

    /// Returns `true` if `name` is one of the fixed notification names.
    #[must_use]
    pub fn is_known_name(name: &str) -> bool {
        NOTIFICATION_NAMES.contains(&name)
    }
}

/// Severity of an acknowledgment dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogKind {
    Info,
    Error,
}

/// A message the user has to acknowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDialog {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
    pub detail: String,
}

impl UserDialog {
    /// "You're up to date" acknowledgment after a manual check.
    #[must_use]
    pub fn up_to_date(version: &str) -> Self {
        Self {
            kind: DialogKind::Info,
            title: "No Updates Available".to_owned(),
            message: "You're up to date!".to_owned(),
            detail: format!("Version {version} is the latest version."),
        }
    }

    /// Error acknowledgment after a failed manual check.
    #[must_use]
    pub fn check_failed(detail: impl Into<String>) -> Self {
        Self {
            kind: DialogKind::Error,
            title: "Update Error".to_owned(),
            message: "Could not check for updates".to_owned(),
            detail: detail.into(),
        }
    }
}

/// Receives every UI effect of the coordinator.
///
/// Implementations must be cheap: progress notifications are forwarded one by
/// one without batching.
pub trait UpdateObserver: Send + Sync {
    /// Replace the update menu item.
    fn update_menu(&self, item: MenuItemState);

    /// Push a notification to the banner surface.
    fn notify(&self, notification: UpdateNotification);

    /// Show a blocking acknowledgment to the user.
    fn acknowledge(&self, dialog: UserDialog);

    /// Whether the UI surface behind this observer still exists.
    fn is_alive(&self) -> bool {
        true
    }
}
