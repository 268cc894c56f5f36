//! The explicitly constructed desktop session: state, drag coordinator, context menu,
//! collaborators, and the session clock, with boot and shutdown lifecycle.

use std::rc::Rc;
use std::time::Duration;

use futures::task::{LocalSpawn, SpawnError};
use futures::Stream;
use platform_host::{unix_time_ms_now, PrefsStore};
use tracing::{info, warn};

use crate::achievements::AchievementTracker;
use crate::clock::SessionClock;
use crate::config::DesktopConfig;
use crate::context_menu::ContextMenu;
use crate::drag::DragCoordinator;
use crate::error::SessionError;
use crate::model::{AppId, InteractionState, SessionSnapshot, WindowId};
use crate::preferences::Preferences;
use crate::reducer::DesktopAction;
use crate::session::SessionState;
use crate::toast::{Toast, ToastQueue};

#[derive(Debug)]
pub struct Desktop {
    pub(crate) config: DesktopConfig,
    pub(crate) session: SessionState,
    pub(crate) drag: DragCoordinator,
    pub(crate) context_menu: ContextMenu<DesktopAction>,
    pub(crate) interaction: InteractionState,
    pub(crate) toasts: ToastQueue,
    pub(crate) achievements: AchievementTracker,
    clock: SessionClock,
    next_window_seq: u64,
}

impl Desktop {
    /// Boots a desktop whose preferences and achievement counters share one store.
    pub fn boot(config: DesktopConfig, store: Rc<dyn PrefsStore>) -> Self {
        Self::boot_with_stores(config, Rc::clone(&store), store)
    }

    /// Boots a desktop with separate stores for preferences and achievement counters.
    pub fn boot_with_stores(
        config: DesktopConfig,
        prefs_store: Rc<dyn PrefsStore>,
        achievements_store: Rc<dyn PrefsStore>,
    ) -> Self {
        let preferences = Preferences::load(prefs_store, config.preferences_key.clone());
        let achievements =
            AchievementTracker::load(achievements_store, config.achievements_key.clone());
        let mut session = SessionState::new(preferences);
        session.set_directory(config.default_directory.clone());
        info!(
            policy = ?config.error_policy,
            width = config.viewport.width,
            height = config.viewport.height,
            "desktop session booted"
        );

        Self {
            context_menu: ContextMenu::new(config.viewport, config.menu),
            toasts: ToastQueue::new(config.toast_ttl_ms, config.max_visible_toasts),
            session,
            drag: DragCoordinator::default(),
            interaction: InteractionState::default(),
            achievements,
            clock: SessionClock::default(),
            next_window_seq: 1,
            config,
        }
    }

    pub fn config(&self) -> &DesktopConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn drag(&self) -> &DragCoordinator {
        &self.drag
    }

    pub fn drag_mut(&mut self) -> &mut DragCoordinator {
        &mut self.drag
    }

    pub fn context_menu(&self) -> &ContextMenu<DesktopAction> {
        &self.context_menu
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn achievements(&self) -> &AchievementTracker {
        &self.achievements
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// Starts session-time accounting driven by `ticks`.
    ///
    /// # Errors
    ///
    /// Returns the spawner's [`SpawnError`] when it has shut down.
    pub fn start_clock<S, T>(&mut self, spawner: &S, ticks: T) -> Result<(), SpawnError>
    where
        S: LocalSpawn + ?Sized,
        T: Stream<Item = Duration> + 'static,
    {
        self.clock.start(spawner, ticks)
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    /// Tears the session down: cancels the clock, records elapsed time, ends any drag, hides the
    /// menu, and drops every drop-target handler. Safe to call more than once.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] when elapsed time could not be recorded; teardown still
    /// completes.
    pub fn shutdown(&mut self) -> Result<(), SessionError> {
        self.clock.stop();
        self.drag.end_drag();
        self.drag.clear_drop_targets();
        self.context_menu.hide();
        self.interaction = InteractionState::default();

        let elapsed = self.clock.take_elapsed();
        if elapsed.is_zero() {
            return Ok(());
        }
        info!(elapsed_secs = elapsed.as_secs(), "desktop session shut down");
        self.achievements.record_session_time(elapsed).inspect_err(|err| {
            warn!("session time flush failed: {err}");
        })
    }

    pub(crate) fn push_toast(&mut self, title: impl Into<String>, body: impl Into<String>) -> Toast {
        self.toasts.push(title, body, unix_time_ms_now())
    }

    /// Next free `<app>-<n>` id.
    pub(crate) fn next_window_id(&mut self, app_id: &AppId) -> WindowId {
        loop {
            let candidate = WindowId(format!("{app_id}-{}", self.next_window_seq));
            self.next_window_seq = self.next_window_seq.saturating_add(1);
            if self.session.window(&candidate).is_none() {
                return candidate;
            }
        }
    }
}
