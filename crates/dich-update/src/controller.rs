use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dich_config::update::UpdateConfig;
use dich_types::{AppEvent, UpdateEvent, UpdateNotice};
use kanal::AsyncSender;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{UpdateChannel, UpdateError, UpdateState};

#[derive(Default)]
struct Inner {
    state: UpdateState,
    /// UI-only: the transfer keeps running, only progress rendering stops
    paused: bool,
    /// Progress last shown to the user
    shown_progress: Option<u8>,
    dismissed: bool,
}

/// Drives [`UpdateState`] from user actions and channel events and reports
/// every visible change to the UI as [`AppEvent::Update`]
pub struct UpdateController {
    channel: Arc<dyn UpdateChannel>,
    inner: Mutex<Inner>,
    ui_tx: AsyncSender<AppEvent>,
    startup_checked: AtomicBool,
}

impl UpdateController {
    pub fn new(channel: Arc<dyn UpdateChannel>, ui_tx: AsyncSender<AppEvent>) -> Self {
        Self {
            channel,
            inner: Mutex::new(Inner::default()),
            ui_tx,
            startup_checked: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn state(&self) -> UpdateState {
        self.lock().state.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.lock().paused
    }

    /// What the update panel should display right now
    pub fn notice(&self) -> UpdateNotice {
        build_notice(&self.lock())
    }

    async fn publish(&self) {
        let notice = self.notice();
        if self.ui_tx.send(AppEvent::Update(notice)).await.is_err() {
            tracing::debug!("UI channel closed, dropping update notice");
        }
    }

    /// Applies a channel event and reports the result unless it is a
    /// progress tick hidden by the pause toggle
    async fn apply(&self, event: UpdateEvent) {
        let visible = transition(&mut self.lock(), &event);
        if visible {
            self.publish().await;
        }
    }

    pub async fn check_for_updates(&self) -> UpdateState {
        {
            let mut inner = self.lock();
            if inner.state.is_busy() {
                tracing::debug!("Update check skipped, {} in progress", inner.state.label());
                return inner.state.clone();
            }
            transition(&mut inner, &UpdateEvent::Checking);
        }
        self.publish().await;

        match self.channel.check().await {
            Ok(Some(info)) => {
                tracing::info!("Update {} available", info.version);
                self.apply(UpdateEvent::Available(info)).await;
            }
            Ok(None) => {
                self.apply(UpdateEvent::NotAvailable).await;
                self.lock().state = UpdateState::default();
            }
            Err(e) => {
                tracing::error!("Update check failed: {}", e);
                self.apply(UpdateEvent::Error(e.to_string())).await;
            }
        }
        self.state()
    }

    /// Downloads the available update, forwarding progress as it arrives
    pub async fn download_update(&self) -> Result<(), UpdateError> {
        let (info, visible) = {
            let mut inner = self.lock();
            let info = match &inner.state {
                UpdateState::Available(info) => info.clone(),
                other => {
                    return Err(UpdateError::InvalidState {
                        action: "download",
                        state: other.label(),
                    });
                }
            };
            (info, transition(&mut inner, &UpdateEvent::Progress(0.0)))
        };
        if visible {
            self.publish().await;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let result = {
            let download = self.channel.download(&info, tx);
            tokio::pin!(download);
            loop {
                tokio::select! {
                    biased;
                    Some(percent) = rx.recv() => self.apply(UpdateEvent::Progress(percent)).await,
                    result = &mut download => break result,
                }
            }
        };
        while let Ok(percent) = rx.try_recv() {
            self.apply(UpdateEvent::Progress(percent)).await;
        }

        match result {
            Ok(path) => {
                tracing::info!("Update {} saved to {}", info.version, path.display());
                self.apply(UpdateEvent::Downloaded(info)).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Update download failed: {}", e);
                self.apply(UpdateEvent::Error(e.to_string())).await;
                Err(e)
            }
        }
    }

    pub async fn install_update(&self) -> Result<(), UpdateError> {
        let info = {
            let mut inner = self.lock();
            let info = match &inner.state {
                UpdateState::Downloaded(info) => info.clone(),
                other => {
                    return Err(UpdateError::InvalidState {
                        action: "install",
                        state: other.label(),
                    });
                }
            };
            inner.state = UpdateState::Installing(info.clone());
            info
        };
        self.publish().await;

        if let Err(e) = self.channel.install(&info).await {
            tracing::error!("Update install failed: {}", e);
            self.apply(UpdateEvent::Error(e.to_string())).await;
            return Err(e);
        }
        Ok(())
    }

    /// Flips the pause label. The transfer itself is never touched; while
    /// paused, progress ticks update the state but are not shown.
    pub async fn toggle_pause(&self) -> Result<bool, UpdateError> {
        let paused = {
            let mut inner = self.lock();
            let percent = match &inner.state {
                UpdateState::Downloading { progress, .. } => progress.round() as u8,
                other => {
                    return Err(UpdateError::InvalidState {
                        action: "pause",
                        state: other.label(),
                    });
                }
            };
            inner.paused = !inner.paused;
            if !inner.paused {
                // Catch up with what happened while hidden
                inner.shown_progress = Some(percent);
            }
            inner.paused
        };

        tracing::info!("Update download {}", if paused { "paused" } else { "resumed" });
        self.publish().await;
        Ok(paused)
    }

    /// Hides the notification; a running download carries on
    pub async fn dismiss(&self) {
        self.lock().dismissed = true;
        self.publish().await;
    }

    /// Checks once, after the configured delay, unless startup checks are off
    pub fn schedule_startup_check(
        self: &Arc<Self>,
        config: &UpdateConfig,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        if !config.check_on_startup {
            tracing::debug!("Startup update check disabled");
            return None;
        }
        if self.startup_checked.swap(true, Ordering::SeqCst) {
            return None;
        }

        let delay = Duration::from_millis(config.startup_delay_ms);
        let controller = Arc::clone(self);
        Some(tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    controller.check_for_updates().await;
                }
            }
        }))
    }
}

/// Moves the state machine on by one event; true when the change should be
/// shown
fn transition(inner: &mut Inner, event: &UpdateEvent) -> bool {
    let state = std::mem::take(&mut inner.state);
    inner.state = state.on_event(event);
    let percent = match &inner.state {
        UpdateState::Downloading { progress, .. } => Some(progress.round() as u8),
        _ => None,
    };

    if let UpdateEvent::Progress(_) = event {
        return match percent {
            Some(p) if !inner.paused && inner.shown_progress != Some(p) => {
                inner.shown_progress = Some(p);
                !inner.dismissed
            }
            _ => false,
        };
    }

    if percent.is_none() {
        inner.paused = false;
        inner.shown_progress = None;
    }
    // New information brings a dismissed panel back
    if matches!(
        event,
        UpdateEvent::Checking
            | UpdateEvent::Available(_)
            | UpdateEvent::Downloaded(_)
            | UpdateEvent::Error(_)
    ) {
        inner.dismissed = false;
    }
    true
}

fn build_notice(inner: &Inner) -> UpdateNotice {
    let state = if inner.dismissed {
        "dismissed"
    } else if inner.paused {
        "paused"
    } else {
        inner.state.label()
    };

    let downloading = matches!(inner.state, UpdateState::Downloading { .. });
    let error = match &inner.state {
        UpdateState::Idle { last_error } => last_error.clone(),
        _ => None,
    };

    UpdateNotice {
        state: state.to_string(),
        version: inner.state.info().map(|info| info.version.clone()),
        progress: if downloading { inner.shown_progress } else { None },
        pause_label: downloading.then_some(if inner.paused { "Resume" } else { "Pause" }),
        error,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use async_trait::async_trait;
    use dich_types::UpdateInfo;
    use kanal::AsyncReceiver;
    use tokio::sync::Notify;

    use super::*;

    fn info() -> UpdateInfo {
        UpdateInfo {
            version: "1.2.0".to_string(),
            release_date: Some("2026-10-01".to_string()),
            release_notes: None,
            download_url: "https://example.test/dich.AppImage".to_string(),
            size: Some(1000),
        }
    }

    /// Sends 25%, waits for the gate, then 75% and 100%
    struct FakeChannel {
        available: bool,
        fail_check: bool,
        /// Checks wait for `check_gate` when set
        hold_check: bool,
        check_gate: Notify,
        gate: Notify,
        sent: Mutex<Vec<f64>>,
        checks: Mutex<u32>,
        downloads: Mutex<u32>,
        installs: Mutex<u32>,
    }

    impl FakeChannel {
        fn new(available: bool) -> Self {
            Self {
                available,
                fail_check: false,
                hold_check: false,
                check_gate: Notify::new(),
                gate: Notify::new(),
                sent: Mutex::new(Vec::new()),
                checks: Mutex::new(0),
                downloads: Mutex::new(0),
                installs: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl UpdateChannel for FakeChannel {
        async fn check(&self) -> Result<Option<UpdateInfo>, UpdateError> {
            *self.checks.lock().unwrap() += 1;
            if self.hold_check {
                self.check_gate.notified().await;
            }
            if self.fail_check {
                return Err(UpdateError::Status(502));
            }
            Ok(self.available.then(info))
        }

        async fn download(
            &self,
            _info: &UpdateInfo,
            progress: mpsc::UnboundedSender<f64>,
        ) -> Result<PathBuf, UpdateError> {
            *self.downloads.lock().unwrap() += 1;
            for (i, percent) in [25.0, 75.0, 100.0].into_iter().enumerate() {
                if i == 1 {
                    self.gate.notified().await;
                }
                self.sent.lock().unwrap().push(percent);
                let _ = progress.send(percent);
                tokio::task::yield_now().await;
            }
            Ok(PathBuf::from("/tmp/dich.AppImage"))
        }

        async fn install(&self, _info: &UpdateInfo) -> Result<(), UpdateError> {
            *self.installs.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn controller(
        channel: FakeChannel,
    ) -> (Arc<UpdateController>, Arc<FakeChannel>, AsyncReceiver<AppEvent>) {
        let channel = Arc::new(channel);
        let (tx, rx) = kanal::bounded_async(256);
        (Arc::new(UpdateController::new(channel.clone(), tx)), channel, rx)
    }

    fn drain(rx: &AsyncReceiver<AppEvent>) -> Vec<UpdateNotice> {
        let mut notices = Vec::new();
        while let Ok(Some(event)) = rx.try_recv() {
            if let AppEvent::Update(notice) = event {
                notices.push(notice);
            }
        }
        notices
    }

    /// Test 1: check reports checking, then available
    #[tokio::test]
    async fn check_finds_update() {
        let (controller, _, rx) = controller(FakeChannel::new(true));

        let state = controller.check_for_updates().await;

        assert_eq!(state, UpdateState::Available(info()));
        let states: Vec<_> = drain(&rx).into_iter().map(|n| n.state).collect();
        assert_eq!(states, ["checking", "available"]);
        assert_eq!(controller.notice().version.as_deref(), Some("1.2.0"));
    }

    /// Test 2: up to date goes back to idle after telling the UI
    #[tokio::test]
    async fn no_update_returns_to_idle() {
        let (controller, _, rx) = controller(FakeChannel::new(false));

        let state = controller.check_for_updates().await;

        assert_eq!(state, UpdateState::default());
        let states: Vec<_> = drain(&rx).into_iter().map(|n| n.state).collect();
        assert_eq!(states, ["checking", "not-available"]);
    }

    /// Test 3: check failure lands in idle carrying the message
    #[tokio::test]
    async fn failed_check_keeps_error() {
        let mut channel = FakeChannel::new(true);
        channel.fail_check = true;
        let (controller, _, rx) = controller(channel);

        controller.check_for_updates().await;

        let notices = drain(&rx);
        let last = notices.last().unwrap();
        assert_eq!(last.state, "error");
        assert_eq!(last.error.as_deref(), Some("Update server returned 502"));
    }

    /// Test 4: download reports progress and ends downloaded, then installs
    #[tokio::test]
    async fn download_then_install() {
        let (controller, channel, rx) = controller(FakeChannel::new(true));
        controller.check_for_updates().await;
        channel.gate.notify_one();

        controller.download_update().await.unwrap();

        let notices = drain(&rx);
        let progress: Vec<_> = notices.iter().filter_map(|n| n.progress).collect();
        assert_eq!(progress, [0, 25, 75, 100]);
        assert_eq!(notices.last().unwrap().state, "downloaded");
        assert_eq!(notices.last().unwrap().version.as_deref(), Some("1.2.0"));
        assert_eq!(controller.state(), UpdateState::Downloaded(info()));
        assert_eq!(*channel.downloads.lock().unwrap(), 1);

        controller.install_update().await.unwrap();
        assert_eq!(controller.state(), UpdateState::Installing(info()));
        assert_eq!(*channel.installs.lock().unwrap(), 1);
    }

    /// Test 5: pause hides progress but the transfer runs to completion
    #[tokio::test]
    async fn pause_is_display_only() {
        let (controller, channel, rx) = controller(FakeChannel::new(true));
        controller.check_for_updates().await;
        drain(&rx);

        let download = {
            let controller = controller.clone();
            tokio::spawn(async move { controller.download_update().await })
        };

        // Wait until 25% has been shown
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            if let AppEvent::Update(notice) = event {
                if notice.progress == Some(25) {
                    break;
                }
            }
        }

        assert!(controller.toggle_pause().await.unwrap());
        let paused = controller.notice();
        assert_eq!(paused.state, "paused");
        assert_eq!(paused.pause_label, Some("Resume"));

        channel.gate.notify_one();
        download.await.unwrap().unwrap();

        let after: Vec<_> = drain(&rx);
        assert!(after.iter().all(|n| n.progress != Some(75)));
        assert_eq!(after.last().unwrap().state, "downloaded");
        assert_eq!(*channel.sent.lock().unwrap(), [25.0, 75.0, 100.0]);
        assert!(!controller.is_paused());
    }

    /// Test 6: actions outside their state are rejected
    #[tokio::test]
    async fn invalid_transitions_are_rejected() {
        let (controller, _, _rx) = controller(FakeChannel::new(true));

        assert!(matches!(
            controller.download_update().await,
            Err(UpdateError::InvalidState { action: "download", .. })
        ));
        assert!(matches!(
            controller.install_update().await,
            Err(UpdateError::InvalidState { action: "install", .. })
        ));
        assert!(controller.toggle_pause().await.is_err());
    }

    /// Test 7: dismiss hides the panel until something new happens
    #[tokio::test]
    async fn dismiss_hides_until_next_event() {
        let (controller, channel, rx) = controller(FakeChannel::new(true));
        controller.check_for_updates().await;

        controller.dismiss().await;
        assert_eq!(controller.notice().state, "dismissed");

        channel.gate.notify_one();
        controller.download_update().await.unwrap();

        let notices = drain(&rx);
        assert_eq!(notices.last().unwrap().state, "downloaded");
        assert_eq!(controller.state(), UpdateState::Downloaded(info()));
    }

    /// Test 8: racing requests start a single check and a single download
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_requests_start_one_transfer() {
        let mut channel = FakeChannel::new(true);
        channel.hold_check = true;
        let (controller, channel, _rx) = controller(channel);

        let mut checks = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let controller = controller.clone();
            checks.spawn(async move { controller.check_for_updates().await });
        }
        // Everyone but the running check gives up straight away
        for _ in 0..7 {
            let state = tokio::time::timeout(Duration::from_secs(5), checks.join_next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            assert_eq!(state, UpdateState::Checking);
        }
        channel.check_gate.notify_one();
        while let Some(state) = checks.join_next().await {
            assert_eq!(state.unwrap(), UpdateState::Available(info()));
        }
        assert_eq!(*channel.checks.lock().unwrap(), 1);

        let mut downloads = tokio::task::JoinSet::new();
        for _ in 0..8 {
            let controller = controller.clone();
            downloads.spawn(async move { controller.download_update().await });
        }
        for _ in 0..7 {
            let result = tokio::time::timeout(Duration::from_secs(5), downloads.join_next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            assert!(matches!(
                result,
                Err(UpdateError::InvalidState { action: "download", .. })
            ));
        }
        channel.gate.notify_one();
        downloads.join_next().await.unwrap().unwrap().unwrap();

        assert_eq!(*channel.downloads.lock().unwrap(), 1);
        assert_eq!(controller.state(), UpdateState::Downloaded(info()));
    }

    /// Test 9: the startup check waits for its delay and only runs once
    #[tokio::test(start_paused = true)]
    async fn startup_check_is_delayed_and_single() {
        let (controller, _, rx) = controller(FakeChannel::new(true));
        let config = UpdateConfig {
            check_on_startup: true,
            startup_delay_ms: 3000,
            ..UpdateConfig::default()
        };

        let handle = controller
            .schedule_startup_check(&config, CancellationToken::new())
            .unwrap();
        assert!(controller
            .schedule_startup_check(&config, CancellationToken::new())
            .is_none());

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(controller.state(), UpdateState::default());

        handle.await.unwrap();
        assert_eq!(controller.state(), UpdateState::Available(info()));
        assert!(!drain(&rx).is_empty());
    }

    #[tokio::test]
    async fn startup_check_respects_config() {
        let (controller, _, _rx) = controller(FakeChannel::new(true));
        let config = UpdateConfig {
            check_on_startup: false,
            ..UpdateConfig::default()
        };
        assert!(controller
            .schedule_startup_check(&config, CancellationToken::new())
            .is_none());
    }
}
