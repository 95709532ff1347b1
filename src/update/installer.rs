//! Platform-specific installer hand-off.
//!
//! The transport downloads an installer payload; this module picks the right
//! release asset for the running OS and launches the payload once the user
//! asks to restart.

use crate::error::{Result, UpdateError};
use crate::update::transport::InstallOptions;
use std::path::Path;
use std::process::Stdio;

/// File suffix of the installer asset published for the current platform.
pub fn installer_asset_suffix() -> Option<&'static str> {
    asset_suffix_for(std::env::consts::OS)
}

fn asset_suffix_for(os: &str) -> Option<&'static str> {
    match os {
        "windows" => Some(".exe"),
        "macos" => Some(".dmg"),
        "linux" => Some(".AppImage"),
        _ => None,
    }
}

/// Last path segment of a download URL, used as the on-disk file name.
///
/// Segments that would resolve outside the download directory (`.`, `..`,
/// or anything carrying a backslash) fall back to a fixed name.
pub fn installer_file_name(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').find(|segment| !segment.is_empty()))
        .filter(|segment| !matches!(*segment, "." | "..") && !segment.contains('\\'))
        .unwrap_or("update-installer")
        .to_owned()
}

/// Command-line arguments for the installer.
///
/// Mirrors the NSIS conventions: `/S` for an unattended run and
/// `--force-run` to relaunch the app once installation completes.
pub fn installer_args(options: InstallOptions) -> Vec<&'static str> {
    let mut args = Vec::new();
    if options.silent {
        args.push("/S");
    }
    if options.force_run_after {
        args.push("--force-run");
    }
    args
}

/// Launch the installer detached from the current process.
///
/// # Errors
///
/// Returns an error if the installer is missing or cannot be spawned.
pub fn launch_installer(installer: &Path, options: InstallOptions) -> Result<()> {
    if !installer.exists() {
        return Err(UpdateError::Transport(format!(
            "installer not found at {}",
            installer.display()
        )));
    }
    set_executable(installer)?;

    let mut command = if cfg!(target_os = "macos") {
        let mut open = std::process::Command::new("open");
        open.arg(installer);
        open
    } else {
        let mut direct = std::process::Command::new(installer);
        direct.args(installer_args(options));
        direct
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| {
            UpdateError::Transport(format!(
                "cannot launch installer {}: {e}",
                installer.display()
            ))
        })?;

    tracing::info!(installer = %installer.display(), ?options, "installer launched");
    Ok(())
}

/// Set executable permission on Unix platforms.
fn set_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
            UpdateError::Transport(format!(
                "cannot set executable permission on {}: {e}",
                path.display()
            ))
        })?;
    }
    let _ = path;
    Ok(())
}
