//! Host platform capability detection.
//!
//! The only platform fact the coordinator needs is whether the running OS can
//! download, apply and relaunch an update without routing the user through a
//! browser. It is decided once at startup and never changes afterwards.

/// Static install capability of the host platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapability {
    supports_silent_install: bool,
}

impl PlatformCapability {
    /// Capability of a platform that installs in place and restarts.
    pub const SILENT: Self = Self {
        supports_silent_install: true,
    };

    /// Capability of a platform that hands off to the release page.
    pub const BROWSER_REDIRECT: Self = Self {
        supports_silent_install: false,
    };

    /// Resolve the capability of the current operating system.
    ///
    /// Windows installers run unattended and relaunch the app; macOS and
    /// Linux builds are distributed as archives/images downloaded from the
    /// release page.
    #[must_use]
    pub fn detect() -> Self {
        Self::for_os(std::env::consts::OS)
    }

    /// Capability for an OS identifier as reported by `std::env::consts::OS`.
    #[must_use]
    pub fn for_os(os: &str) -> Self {
        match os {
            "windows" => Self::SILENT,
            _ => Self::BROWSER_REDIRECT,
        }
    }

    #[must_use]
    pub fn supports_silent_install(self) -> bool {
        self.supports_silent_install
    }
}

impl std::fmt::Display for PlatformCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.supports_silent_install {
            write!(f, "silent-install")
        } else {
            write!(f, "browser-redirect")
        }
    }
}
