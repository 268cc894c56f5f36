//! Authoritative registry of open windows, focus, z-order, running apps, the shell working
//! directory, and preferences.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::error::SessionError;
use crate::model::{
    AppId, OpenWindowRequest, SessionSnapshot, Window, WindowId, WindowRect, DEFAULT_DIRECTORY,
};
use crate::preferences::Preferences;
use crate::window_manager;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// A broken session invariant, reported by [`SessionState::check_invariants`].
pub enum InvariantViolation {
    #[error("active window `{0}` is not registered")]
    DanglingActiveWindow(WindowId),
    #[error("no active window while {0} windows are open")]
    MissingActiveWindow(usize),
    #[error("running apps {tracked:?} differ from window apps {derived:?}")]
    RunningAppsDrift {
        tracked: Vec<AppId>,
        derived: Vec<AppId>,
    },
    #[error("window `{window_id}` has z-order {z_order} above counter {z_counter}")]
    ZOrderAheadOfCounter {
        window_id: WindowId,
        z_order: u64,
        z_counter: u64,
    },
}

#[derive(Debug)]
pub struct SessionState {
    windows: HashMap<WindowId, Window>,
    active_window_id: Option<WindowId>,
    /// Open window count per app, maintained on register/close.
    running_apps: BTreeMap<AppId, usize>,
    z_counter: u64,
    current_directory: String,
    preferences: Preferences,
}

impl SessionState {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            windows: HashMap::new(),
            active_window_id: None,
            running_apps: BTreeMap::new(),
            z_counter: 0,
            current_directory: DEFAULT_DIRECTORY.to_string(),
            preferences,
        }
    }

    /// Registers a window under `id`, makes it active, and raises it above every other window.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::DuplicateWindowId`] when `id` is already registered.
    pub fn register_window(
        &mut self,
        id: WindowId,
        request: OpenWindowRequest,
    ) -> Result<Window, SessionError> {
        if self.windows.contains_key(&id) {
            return Err(SessionError::DuplicateWindowId(id));
        }

        let z_order = self.next_z();
        let window = Window {
            id: id.clone(),
            title: request
                .title
                .unwrap_or_else(|| request.app_id.as_str().to_string()),
            app_id: request.app_id,
            rect: request.rect.unwrap_or_default(),
            z_order,
        };
        *self.running_apps.entry(window.app_id.clone()).or_insert(0) += 1;
        self.windows.insert(id.clone(), window.clone());
        self.active_window_id = Some(id);
        debug!(window_id = %window.id, app_id = %window.app_id, z_order, "window registered");
        Ok(window)
    }

    /// Removes a window. When it was active, focus passes to the front-most remaining window.
    ///
    /// Focus transfer does not consume a z-order value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WindowNotFound`] when `id` is not registered.
    pub fn close_window(&mut self, id: &WindowId) -> Result<Window, SessionError> {
        let window = self
            .windows
            .remove(id)
            .ok_or_else(|| SessionError::WindowNotFound(id.clone()))?;

        if let Some(count) = self.running_apps.get_mut(&window.app_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.running_apps.remove(&window.app_id);
            }
        }

        if self.active_window_id.as_ref() == Some(id) {
            self.active_window_id = window_manager::front_most(self.windows.values());
        }
        debug!(
            window_id = %id,
            next_active = ?self.active_window_id,
            "window closed"
        );
        Ok(window)
    }

    pub fn window(&self, id: &WindowId) -> Option<&Window> {
        self.windows.get(id)
    }

    /// Returns a snapshot of all windows ordered back to front.
    pub fn list_windows(&self) -> Vec<Window> {
        window_manager::stacking_order(self.windows.values())
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Activates `id` and assigns it a z-order greater than any previously issued.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WindowNotFound`] when `id` is not registered.
    pub fn focus(&mut self, id: &WindowId) -> Result<u64, SessionError> {
        if !self.windows.contains_key(id) {
            return Err(SessionError::WindowNotFound(id.clone()));
        }
        let z_order = self.next_z();
        if let Some(window) = self.windows.get_mut(id) {
            window.z_order = z_order;
        }
        self.active_window_id = Some(id.clone());
        Ok(z_order)
    }

    pub fn active_window_id(&self) -> Option<&WindowId> {
        self.active_window_id.as_ref()
    }

    pub fn active_window(&self) -> Option<&Window> {
        self.active_window_id
            .as_ref()
            .and_then(|id| self.windows.get(id))
    }

    pub fn z_counter(&self) -> u64 {
        self.z_counter
    }

    /// Dock hint that `app_id` has started. Window records stay the source of truth.
    pub fn mark_app_running(&mut self, app_id: &AppId) {
        if !self.running_apps.contains_key(app_id) {
            debug!(app_id = %app_id, "running hint ignored: app has no open windows");
        }
        self.reconcile_running_apps();
    }

    /// Dock hint that `app_id` has stopped. Window records stay the source of truth.
    pub fn mark_app_stopped(&mut self, app_id: &AppId) {
        if let Some(count) = self.running_apps.get(app_id) {
            debug!(app_id = %app_id, open_windows = count, "stopped hint ignored: app still has windows");
        }
        self.reconcile_running_apps();
    }

    /// Running apps in name order.
    pub fn running_apps(&self) -> Vec<AppId> {
        self.running_apps.keys().cloned().collect()
    }

    pub fn is_app_running(&self, app_id: &AppId) -> bool {
        self.running_apps.contains_key(app_id)
    }

    /// Number of open windows owned by `app_id`, for dock badges.
    pub fn window_count_for(&self, app_id: &AppId) -> usize {
        self.running_apps.get(app_id).copied().unwrap_or(0)
    }

    pub fn set_directory(&mut self, path: impl Into<String>) {
        self.current_directory = path.into();
    }

    pub fn directory(&self) -> &str {
        &self.current_directory
    }

    /// Writes a preference and flushes it to durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] when the flush fails.
    pub fn set_preference(&mut self, key: impl Into<String>, value: Value) -> Result<(), SessionError> {
        self.preferences.set(key, value)
    }

    pub fn preference(&self, key: &str) -> Option<Value> {
        self.preferences.get(key)
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Moves or resizes a window without touching focus.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::WindowNotFound`] when `id` is not registered.
    pub fn set_window_rect(&mut self, id: &WindowId, rect: WindowRect) -> Result<(), SessionError> {
        let window = self
            .windows
            .get_mut(id)
            .ok_or_else(|| SessionError::WindowNotFound(id.clone()))?;
        window.rect = rect;
        Ok(())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            windows: self.list_windows(),
            active_window_id: self.active_window_id.clone(),
            running_apps: self.running_apps(),
            current_directory: self.current_directory.clone(),
            z_counter: self.z_counter,
        }
    }

    /// Recomputes derived state from the window records and compares it with what is tracked.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        match &self.active_window_id {
            Some(id) if !self.windows.contains_key(id) => {
                return Err(InvariantViolation::DanglingActiveWindow(id.clone()));
            }
            None if !self.windows.is_empty() => {
                return Err(InvariantViolation::MissingActiveWindow(self.windows.len()));
            }
            _ => {}
        }

        let derived = derive_running_apps(self.windows.values());
        if derived != self.running_apps {
            return Err(InvariantViolation::RunningAppsDrift {
                tracked: self.running_apps(),
                derived: derived.into_keys().collect(),
            });
        }

        if let Some(window) = self.windows.values().find(|w| w.z_order > self.z_counter) {
            return Err(InvariantViolation::ZOrderAheadOfCounter {
                window_id: window.id.clone(),
                z_order: window.z_order,
                z_counter: self.z_counter,
            });
        }
        Ok(())
    }

    /// Distinct app names across open windows, recomputed from scratch.
    pub fn derived_running_apps(&self) -> BTreeSet<AppId> {
        derive_running_apps(self.windows.values()).into_keys().collect()
    }

    fn reconcile_running_apps(&mut self) {
        let derived = derive_running_apps(self.windows.values());
        if derived != self.running_apps {
            debug!("running app counts rebuilt from window records");
            self.running_apps = derived;
        }
    }

    fn next_z(&mut self) -> u64 {
        self.z_counter = self.z_counter.saturating_add(1);
        self.z_counter
    }
}

fn derive_running_apps<'a>(windows: impl Iterator<Item = &'a Window>) -> BTreeMap<AppId, usize> {
    let mut counts = BTreeMap::new();
    for window in windows {
        *counts.entry(window.app_id.clone()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use platform_host::{MemoryPrefsStore, NoopPrefsStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::preferences::DEFAULT_PREFERENCES_KEY;

    fn session() -> SessionState {
        SessionState::new(Preferences::load(
            Rc::new(NoopPrefsStore),
            DEFAULT_PREFERENCES_KEY,
        ))
    }

    fn open(state: &mut SessionState, id: &str, app: &str) -> Window {
        state
            .register_window(WindowId::from(id), OpenWindowRequest::new(app))
            .expect("register window")
    }

    #[test]
    fn register_activates_and_raises_new_window() {
        let mut state = session();
        let first = open(&mut state, "w1", "terminal");
        let second = open(&mut state, "w2", "notes");

        assert_eq!(state.active_window_id(), Some(&second.id));
        assert!(second.z_order > first.z_order);
        assert_eq!(second.title, "notes");
        assert_eq!(
            state
                .list_windows()
                .into_iter()
                .map(|w| w.id)
                .collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
        state.check_invariants().expect("invariants hold");
    }

    #[test]
    fn duplicate_registration_is_rejected_without_side_effects() {
        let mut state = session();
        open(&mut state, "w1", "terminal");
        let counter = state.z_counter();

        let err = state
            .register_window(WindowId::from("w1"), OpenWindowRequest::new("browser"))
            .expect_err("duplicate id");

        assert_eq!(err, SessionError::DuplicateWindowId(WindowId::from("w1")));
        assert_eq!(state.z_counter(), counter);
        assert!(!state.is_app_running(&AppId::from("browser")));
        assert_eq!(state.window_count(), 1);
    }

    #[test]
    fn closing_active_window_focuses_highest_remaining_z_order() {
        let mut state = session();
        open(&mut state, "a", "terminal");
        open(&mut state, "b", "notes");
        open(&mut state, "c", "browser");
        state.focus(&WindowId::from("a")).expect("focus a");
        state.focus(&WindowId::from("c")).expect("focus c");

        state.close_window(&WindowId::from("c")).expect("close c");

        assert_eq!(state.active_window_id(), Some(&WindowId::from("a")));
        state.check_invariants().expect("invariants hold");
    }

    #[test]
    fn closing_inactive_window_keeps_focus() {
        let mut state = session();
        open(&mut state, "a", "terminal");
        open(&mut state, "b", "notes");

        state.close_window(&WindowId::from("a")).expect("close a");
        assert_eq!(state.active_window_id(), Some(&WindowId::from("b")));
    }

    #[test]
    fn closing_last_window_clears_focus() {
        let mut state = session();
        open(&mut state, "a", "terminal");
        state.close_window(&WindowId::from("a")).expect("close a");

        assert_eq!(state.active_window(), None);
        state.check_invariants().expect("invariants hold");
    }

    #[test]
    fn closing_unknown_window_reports_not_found() {
        let mut state = session();
        let err = state
            .close_window(&WindowId::from("ghost"))
            .expect_err("unknown window");
        assert_eq!(err, SessionError::WindowNotFound(WindowId::from("ghost")));
    }

    #[test]
    fn focus_issues_strictly_increasing_values_across_windows() {
        let mut state = session();
        open(&mut state, "a", "terminal");
        open(&mut state, "b", "notes");

        let ids = ["a", "b", "a", "a", "b"];
        let values: Vec<u64> = ids
            .iter()
            .map(|id| state.focus(&WindowId::from(*id)).expect("focus"))
            .collect();

        assert!(values.windows(2).all(|pair| pair[1] > pair[0]));
        assert_eq!(state.active_window_id(), Some(&WindowId::from("b")));
        assert_eq!(
            state.window(&WindowId::from("b")).map(|w| w.z_order),
            values.last().copied()
        );
    }

    #[test]
    fn focus_on_unknown_window_does_not_advance_counter() {
        let mut state = session();
        open(&mut state, "a", "terminal");
        let counter = state.z_counter();

        assert!(state.focus(&WindowId::from("missing")).is_err());
        assert_eq!(state.z_counter(), counter);
    }

    #[test]
    fn running_apps_track_window_membership() {
        let mut state = session();
        open(&mut state, "a1", "A");
        open(&mut state, "a2", "A");
        open(&mut state, "b1", "B");

        state.close_window(&WindowId::from("a1")).expect("close a1");
        assert_eq!(state.running_apps(), vec![AppId::from("A"), AppId::from("B")]);
        assert_eq!(state.window_count_for(&AppId::from("A")), 1);

        state.close_window(&WindowId::from("a2")).expect("close a2");
        assert_eq!(state.running_apps(), vec![AppId::from("B")]);
        state.check_invariants().expect("invariants hold");
    }

    #[test]
    fn dock_hints_never_override_window_records() {
        let mut state = session();
        open(&mut state, "a1", "A");

        state.mark_app_stopped(&AppId::from("A"));
        state.mark_app_running(&AppId::from("ghost"));
        state.mark_app_running(&AppId::from("ghost"));

        assert_eq!(state.running_apps(), vec![AppId::from("A")]);
        assert_eq!(
            state.running_apps().into_iter().collect::<BTreeSet<_>>(),
            state.derived_running_apps()
        );
        state.check_invariants().expect("invariants hold");
    }

    #[test]
    fn directory_is_a_plain_label() {
        let mut state = session();
        assert_eq!(state.directory(), "~");
        state.set_directory("/does/not/exist");
        assert_eq!(state.directory(), "/does/not/exist");
    }

    #[test]
    fn preference_writes_go_through_to_store() {
        let store = MemoryPrefsStore::default();
        let mut state = SessionState::new(Preferences::load(
            Rc::new(store.clone()),
            DEFAULT_PREFERENCES_KEY,
        ));
        state
            .set_preference("soundVolume", json!(0.8))
            .expect("set preference");

        assert_eq!(state.preference("soundVolume"), Some(json!(0.8)));
        assert!(!store.is_empty());
    }

    #[test]
    fn snapshot_orders_windows_back_to_front() {
        let mut state = session();
        open(&mut state, "a", "terminal");
        open(&mut state, "b", "notes");
        state.focus(&WindowId::from("a")).expect("focus a");

        let snapshot = state.snapshot();
        assert_eq!(
            snapshot
                .windows
                .iter()
                .map(|w| w.id.as_str())
                .collect::<Vec<_>>(),
            vec!["b", "a"]
        );
        assert_eq!(snapshot.active_window_id, Some(WindowId::from("a")));
        assert_eq!(snapshot.z_counter, 3);
    }
}
