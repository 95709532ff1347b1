//! GitHub release transport.
//!
//! Queries a GitHub-style `releases/latest` feed, compares the tag with the
//! running version using semver, streams the platform installer to a local
//! directory, and launches it on request.

use crate::config::UpdaterConfig;
use crate::error::{Result, UpdateError};
use crate::update::installer;
use crate::update::state::{CheckResult, DownloadProgress, UpdateInfo};
use crate::update::transport::{InstallOptions, ProgressSink, UpdateTransport};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

const USER_AGENT: &str = concat!("updraft/", env!("CARGO_PKG_VERSION"), " (update-check)");

/// A release as returned by the GitHub releases API.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Tag name (e.g. `"v1.2.0"`).
    pub tag_name: String,
    /// Publication time; drafts have none.
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// Release notes.
    #[serde(default)]
    pub body: Option<String>,
    /// Uploaded payloads.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Returns the version string (tag without leading `v`).
    pub fn version(&self) -> &str {
        self.tag_name.strip_prefix('v').unwrap_or(&self.tag_name)
    }

    /// First asset whose name ends with `suffix`.
    pub fn asset_with_suffix(&self, suffix: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name.ends_with(suffix))
    }
}

/// A single release asset.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// Parse a release tag or version string, tolerating a leading `v`.
///
/// # Errors
///
/// Returns [`UpdateError::Transport`] if the value is not semver.
pub fn parse_version(raw: &str) -> Result<semver::Version> {
    let trimmed = raw.trim();
    semver::Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))
        .map_err(|e| UpdateError::Transport(format!("invalid release version `{raw}`: {e}")))
}

/// [`UpdateTransport`] backed by a GitHub releases feed.
pub struct GithubReleaseTransport {
    client: reqwest::Client,
    feed_url: String,
    current_version: semver::Version,
    asset_suffix: Option<&'static str>,
    download_dir: PathBuf,
    downloaded: Mutex<Option<PathBuf>>,
    quit: CancellationToken,
}

impl GithubReleaseTransport {
    /// Build a transport from the updater config.
    ///
    /// `quit` is cancelled once the installer has been launched; the host is
    /// expected to exit when it fires.
    ///
    /// # Errors
    ///
    /// Returns an error if the running version is not semver or the HTTP
    /// client cannot be built.
    pub fn new(config: &UpdaterConfig, quit: CancellationToken) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .build()
            .map_err(|e| UpdateError::Transport(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client,
            feed_url: config.release_feed_url.clone(),
            current_version: parse_version(&config.current_version)?,
            asset_suffix: installer::installer_asset_suffix(),
            download_dir: default_download_dir(),
            downloaded: Mutex::new(None),
            quit,
        })
    }

    /// Store downloads under `dir` instead of the cache directory.
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Override the installer asset suffix (defaults to the host OS).
    #[must_use]
    pub fn with_asset_suffix(mut self, suffix: &'static str) -> Self {
        self.asset_suffix = Some(suffix);
        self
    }

    /// Path of the last completed download, if any.
    pub fn downloaded_installer(&self) -> Option<PathBuf> {
        self.downloaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn fetch_latest(&self) -> Result<Release> {
        let resp = self
            .client
            .get(&self.feed_url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| UpdateError::Transport(format!("release feed request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UpdateError::Transport(format!(
                "release feed returned status {status}"
            )));
        }

        resp.json::<Release>()
            .await
            .map_err(|e| UpdateError::Transport(format!("cannot parse release feed: {e}")))
    }
}

#[async_trait]
impl UpdateTransport for GithubReleaseTransport {
    async fn check_for_updates(&self) -> Result<CheckResult> {
        let release = self.fetch_latest().await?;
        let latest = parse_version(&release.tag_name)?;

        if latest <= self.current_version {
            tracing::debug!(%latest, current = %self.current_version, "no newer release");
            return Ok(CheckResult::NotAvailable {
                version: release.version().to_owned(),
            });
        }

        let mut info = UpdateInfo::new(
            release.version(),
            release.published_at.unwrap_or_else(Utc::now),
            release.body.clone().unwrap_or_default(),
        );
        if let Some(asset) = self
            .asset_suffix
            .and_then(|suffix| release.asset_with_suffix(suffix))
        {
            info = info.with_download_url(asset.browser_download_url.clone());
        }
        Ok(CheckResult::Available(info))
    }

    async fn download_update(
        &self,
        info: &UpdateInfo,
        on_progress: ProgressSink<'_>,
    ) -> Result<()> {
        let url = info.download_url.as_deref().ok_or_else(|| {
            UpdateError::Transport(format!(
                "release {} has no installer for this platform",
                info.version
            ))
        })?;

        tokio::fs::create_dir_all(&self.download_dir).await?;
        let dest = self.download_dir.join(installer::installer_file_name(url));

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpdateError::Transport(format!("download failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(UpdateError::Transport(format!(
                "download returned status {status}"
            )));
        }

        let total = resp.content_length().unwrap_or(0);
        let mut file = tokio::fs::File::create(&dest).await.map_err(|e| {
            UpdateError::Transport(format!("cannot create {}: {e}", dest.display()))
        })?;

        let started = Instant::now();
        let mut transferred: u64 = 0;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| UpdateError::Transport(format!("download interrupted: {e}")))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| UpdateError::Transport(format!("download write failed: {e}")))?;
            transferred += chunk.len() as u64;

            let elapsed = started.elapsed().as_secs_f64();
            let bytes_per_second = if elapsed > 0.0 {
                (transferred as f64 / elapsed) as u64
            } else {
                0
            };
            on_progress(DownloadProgress::from_bytes(
                transferred,
                total,
                bytes_per_second,
            ));
        }
        file.flush()
            .await
            .map_err(|e| UpdateError::Transport(format!("download flush failed: {e}")))?;

        tracing::info!(path = %dest.display(), bytes = transferred, "installer downloaded");
        *self.downloaded.lock().unwrap_or_else(PoisonError::into_inner) = Some(dest);
        Ok(())
    }

    async fn quit_and_install(&self, options: InstallOptions) -> Result<()> {
        let installer = self.downloaded_installer().ok_or_else(|| {
            UpdateError::InvalidState("no downloaded installer to launch".to_owned())
        })?;
        installer::launch_installer(&installer, options)?;
        self.quit.cancel();
        Ok(())
    }
}

fn default_download_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("updraft")
        .join("pending")
}
