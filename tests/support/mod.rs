//! Recording fakes shared by the integration suites.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use updraft::update::{
    CheckResult, DownloadProgress, ExternalShell, InstallOptions, MenuItemState, ProgressSink,
    UpdateCoordinator, UpdateInfo, UpdateNotification, UpdateObserver, UpdateState,
    UpdateTransport, UserDialog,
};
use updraft::{PlatformCapability, UpdateError};

pub const BASE_URL: &str = "https://x/releases";

pub fn info(version: &str) -> UpdateInfo {
    UpdateInfo::new(
        version,
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        "Bug fixes",
    )
}

#[derive(Debug, Clone)]
pub enum ScriptedCheck {
    Available(UpdateInfo),
    NotAvailable(String),
    Fail(String),
}

/// Transport whose check/download results are scripted by the test.
pub struct FakeTransport {
    checks: Mutex<VecDeque<ScriptedCheck>>,
    fallback: Option<ScriptedCheck>,
    check_gate: Option<Arc<Semaphore>>,
    download_gate: Option<Arc<Semaphore>>,
    progress: Vec<DownloadProgress>,
    download_error: Option<String>,
    pub check_calls: AtomicUsize,
    pub download_calls: AtomicUsize,
    pub installs: Mutex<Vec<InstallOptions>>,
}

impl Default for FakeTransport {
    fn default() -> Self {
        Self {
            checks: Mutex::new(VecDeque::new()),
            fallback: None,
            check_gate: None,
            download_gate: None,
            progress: Vec::new(),
            download_error: None,
            check_calls: AtomicUsize::new(0),
            download_calls: AtomicUsize::new(0),
            installs: Mutex::new(Vec::new()),
        }
    }
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checks(self, checks: impl IntoIterator<Item = ScriptedCheck>) -> Self {
        self.checks.lock().expect("lock checks").extend(checks);
        self
    }

    /// Result for every check once the script is exhausted (default: up to date).
    pub fn with_fallback(mut self, check: ScriptedCheck) -> Self {
        self.fallback = Some(check);
        self
    }

    /// Checks block until [`release_check`](Self::release_check) is called.
    pub fn gated_checks(mut self) -> Self {
        self.check_gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    /// Downloads block until [`release_download`](Self::release_download) is called.
    pub fn gated_downloads(mut self) -> Self {
        self.download_gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn with_progress(mut self, progress: Vec<DownloadProgress>) -> Self {
        self.progress = progress;
        self
    }

    pub fn failing_download(mut self, message: &str) -> Self {
        self.download_error = Some(message.to_owned());
        self
    }

    pub fn release_check(&self) {
        if let Some(gate) = &self.check_gate {
            gate.add_permits(1);
        }
    }

    pub fn release_download(&self) {
        if let Some(gate) = &self.download_gate {
            gate.add_permits(1);
        }
    }

    pub fn checks(&self) -> usize {
        self.check_calls.load(Ordering::SeqCst)
    }

    pub fn downloads(&self) -> usize {
        self.download_calls.load(Ordering::SeqCst)
    }

    pub fn install_calls(&self) -> Vec<InstallOptions> {
        self.installs.lock().expect("lock installs").clone()
    }
}

#[async_trait]
impl UpdateTransport for FakeTransport {
    async fn check_for_updates(&self) -> updraft::Result<CheckResult> {
        self.check_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.check_gate {
            gate.acquire().await.expect("check gate closed").forget();
        }
        let next = self
            .checks
            .lock()
            .expect("lock checks")
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| ScriptedCheck::NotAvailable("1.0.0".to_owned()));
        match next {
            ScriptedCheck::Available(info) => Ok(CheckResult::Available(info)),
            ScriptedCheck::NotAvailable(version) => Ok(CheckResult::NotAvailable { version }),
            ScriptedCheck::Fail(message) => Err(UpdateError::Transport(message)),
        }
    }

    async fn download_update(
        &self,
        _info: &UpdateInfo,
        on_progress: ProgressSink<'_>,
    ) -> updraft::Result<()> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        for progress in &self.progress {
            on_progress(*progress);
        }
        if let Some(gate) = &self.download_gate {
            gate.acquire().await.expect("download gate closed").forget();
        }
        match &self.download_error {
            Some(message) => Err(UpdateError::Transport(message.clone())),
            None => Ok(()),
        }
    }

    async fn quit_and_install(&self, options: InstallOptions) -> updraft::Result<()> {
        self.installs.lock().expect("lock installs").push(options);
        Ok(())
    }
}

/// Observer recording every UI effect.
pub struct RecordingObserver {
    pub menus: Mutex<Vec<MenuItemState>>,
    pub notifications: Mutex<Vec<UpdateNotification>>,
    pub dialogs: Mutex<Vec<UserDialog>>,
    pub alive: AtomicBool,
}

impl Default for RecordingObserver {
    fn default() -> Self {
        Self {
            menus: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            dialogs: Mutex::new(Vec::new()),
            alive: AtomicBool::new(true),
        }
    }
}

impl RecordingObserver {
    pub fn menus(&self) -> Vec<MenuItemState> {
        self.menus.lock().expect("lock menus").clone()
    }

    pub fn last_menu(&self) -> Option<MenuItemState> {
        self.menus().pop()
    }

    pub fn notifications(&self) -> Vec<UpdateNotification> {
        self.notifications.lock().expect("lock notifications").clone()
    }

    pub fn notification_names(&self) -> Vec<&'static str> {
        self.notifications().iter().map(|n| n.name()).collect()
    }

    pub fn count_notifications(&self, name: &str) -> usize {
        self.notification_names()
            .into_iter()
            .filter(|n| *n == name)
            .count()
    }

    pub fn dialogs(&self) -> Vec<UserDialog> {
        self.dialogs.lock().expect("lock dialogs").clone()
    }

    pub fn effect_count(&self) -> usize {
        self.menus().len() + self.notifications().len() + self.dialogs().len()
    }
}

impl UpdateObserver for RecordingObserver {
    fn update_menu(&self, item: MenuItemState) {
        self.menus.lock().expect("lock menus").push(item);
    }

    fn notify(&self, notification: UpdateNotification) {
        self.notifications
            .lock()
            .expect("lock notifications")
            .push(notification);
    }

    fn acknowledge(&self, dialog: UserDialog) {
        self.dialogs.lock().expect("lock dialogs").push(dialog);
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Shell recording every opened URL.
#[derive(Default)]
pub struct FakeShell {
    pub opened: Mutex<Vec<String>>,
}

impl FakeShell {
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().expect("lock opened").clone()
    }
}

impl ExternalShell for FakeShell {
    fn open_url(&self, url: &str) -> updraft::Result<()> {
        self.opened.lock().expect("lock opened").push(url.to_owned());
        Ok(())
    }
}

pub struct Harness {
    pub coordinator: Arc<UpdateCoordinator>,
    pub transport: Arc<FakeTransport>,
    pub observer: Arc<RecordingObserver>,
    pub shell: Arc<FakeShell>,
}

pub fn harness(capability: PlatformCapability, transport: FakeTransport) -> Harness {
    let transport = Arc::new(transport);
    let observer = Arc::new(RecordingObserver::default());
    let shell = Arc::new(FakeShell::default());
    let coordinator = Arc::new(UpdateCoordinator::new(
        capability,
        BASE_URL,
        transport.clone(),
        observer.clone(),
        shell.clone(),
    ));
    Harness {
        coordinator,
        transport,
        observer,
        shell,
    }
}

/// Poll `condition` until it holds, panicking after two seconds.
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub async fn wait_for_state(coordinator: &UpdateCoordinator, state: UpdateState) {
    wait_until(&format!("state {state}"), || coordinator.state() == state).await;
}
