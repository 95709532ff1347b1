//! Update lifecycle state and the values that flow through it.
//!
//! [`UpdateState`] is owned by the coordinator and only changes along the
//! edges accepted by [`UpdateState::can_transition_to`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of the update machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateState {
    /// Nothing in flight (initial state).
    #[default]
    Idle,
    /// A check against the release source is in flight.
    Checking,
    /// A newer version was found and waits for the user (browser-redirect
    /// platforms). Checks are still accepted so a newer release can replace it.
    Available,
    /// The update payload is being downloaded.
    Downloading,
    /// The update payload is ready to install.
    Downloaded,
    /// A check failed; reported and immediately reset to `Idle`.
    Failed,
}

impl UpdateState {
    /// Returns `true` if `next` is a legal successor of `self`.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use UpdateState::{Available, Checking, Downloaded, Downloading, Failed, Idle};
        matches!(
            (self, next),
            (Idle, Checking)
                | (Checking, Available)
                | (Checking, Downloading)
                | (Checking, Idle)
                | (Checking, Failed)
                | (Failed, Idle)
                | (Available, Checking)
                | (Available, Downloading)
                | (Downloading, Downloading)
                | (Downloading, Downloaded)
                | (Downloading, Idle)
        )
    }
}

impl std::fmt::Display for UpdateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Checking => write!(f, "checking"),
            Self::Available => write!(f, "available"),
            Self::Downloading => write!(f, "downloading"),
            Self::Downloaded => write!(f, "downloaded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// What started a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Periodic background check; failures and "up to date" stay silent.
    Scheduled,
    /// User-requested check; outcomes are acknowledged to the user.
    Manual,
}

impl TriggerKind {
    #[must_use]
    pub fn is_manual(self) -> bool {
        matches!(self, Self::Manual)
    }
}

/// Metadata about a release, as reported by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    /// Version without a leading `v` (e.g. `"1.2.0"`).
    pub version: String,
    /// Publication time of the release.
    pub release_date: DateTime<Utc>,
    /// Release notes (markdown, possibly empty).
    pub release_notes: String,
    /// Installer payload for this platform, when the release carries one.
    #[serde(skip)]
    pub download_url: Option<String>,
}

impl UpdateInfo {
    /// Build release info without a download payload.
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        release_date: DateTime<Utc>,
        release_notes: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            release_date,
            release_notes: release_notes.into(),
            download_url: None,
        }
    }

    /// Attach the installer payload URL.
    #[must_use]
    pub fn with_download_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = Some(url.into());
        self
    }
}

/// A snapshot of download progress.
///
/// Always satisfies `0 <= percent <= 100` and, when `total > 0`,
/// `transferred <= total`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadProgress {
    pub percent: f64,
    pub bytes_per_second: u64,
    pub transferred: u64,
    pub total: u64,
}

impl DownloadProgress {
    /// Build a normalized progress snapshot.
    ///
    /// Non-finite percentages become `0`, others are clamped into `[0, 100]`.
    /// `transferred` is capped at `total` when the total is known.
    #[must_use]
    pub fn new(percent: f64, bytes_per_second: u64, transferred: u64, total: u64) -> Self {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let transferred = if total > 0 {
            transferred.min(total)
        } else {
            transferred
        };
        Self {
            percent,
            bytes_per_second,
            transferred,
            total,
        }
    }

    /// Derive the percentage from byte counts.
    #[must_use]
    pub fn from_bytes(transferred: u64, total: u64, bytes_per_second: u64) -> Self {
        let percent = if total > 0 {
            transferred as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self::new(percent, bytes_per_second, transferred, total)
    }

    /// Re-apply the normalization rules (for values built field by field).
    #[must_use]
    pub fn normalized(self) -> Self {
        Self::new(
            self.percent,
            self.bytes_per_second,
            self.transferred,
            self.total,
        )
    }
}

/// Result of a transport-level check.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    /// A newer release exists.
    Available(UpdateInfo),
    /// The running version is the latest; carries the latest known version.
    NotAvailable { version: String },
}
