//! Cumulative usage counters and one-shot achievement unlocks, persisted across sessions.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use platform_host::{load_pref_with, save_pref_with, PrefsStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::SessionError;
use crate::model::AppId;

pub const DEFAULT_ACHIEVEMENTS_KEY: &str = "desktop.achievements.v1";
/// Distinct apps that must be opened to unlock [`AchievementId::Explorer`].
pub const EXPLORER_DISTINCT_APPS: usize = 5;
/// Files that must be created to unlock [`AchievementId::Creator`].
pub const CREATOR_FILES_CREATED: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementId {
    Explorer,
    Creator,
}

impl AchievementId {
    pub const ALL: [Self; 2] = [Self::Explorer, Self::Creator];

    pub fn title(self) -> &'static str {
        match self {
            Self::Explorer => "Explorer",
            Self::Creator => "Creator",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Explorer => "Opened 5 different apps",
            Self::Creator => "Created 10 files",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementProgress {
    pub apps_opened: u64,
    pub distinct_apps: BTreeSet<AppId>,
    pub files_created: u64,
    pub session_seconds: u64,
    pub unlocked: BTreeSet<AchievementId>,
}

impl AchievementProgress {
    fn threshold_reached(&self, id: AchievementId) -> bool {
        match id {
            AchievementId::Explorer => self.distinct_apps.len() >= EXPLORER_DISTINCT_APPS,
            AchievementId::Creator => self.files_created >= CREATOR_FILES_CREATED,
        }
    }
}

/// Outcome of recording progress.
///
/// Unlocks are reported even when the flush failed: they have already been applied in memory and
/// will not be reported again by this tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Recorded {
    pub unlocked: Vec<AchievementId>,
    pub flushed: Result<(), SessionError>,
}

impl Recorded {
    /// Collapses into the unlocks, or the flush error when progress did not reach the store.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] when progress cannot be flushed.
    pub fn into_result(self) -> Result<Vec<AchievementId>, SessionError> {
        self.flushed.map(|()| self.unlocked)
    }
}

pub struct AchievementTracker {
    store: Rc<dyn PrefsStore>,
    key: String,
    progress: AchievementProgress,
}

impl fmt::Debug for AchievementTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AchievementTracker")
            .field("key", &self.key)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

impl AchievementTracker {
    /// Loads progress stored under `key`; missing or unreadable progress starts from zero.
    pub fn load(store: Rc<dyn PrefsStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let progress = match load_pref_with::<_, AchievementProgress>(store.as_ref(), &key) {
            Ok(progress) => progress.unwrap_or_default(),
            Err(err) => {
                warn!("achievement progress load failed: {err}");
                AchievementProgress::default()
            }
        };
        Self {
            store,
            key,
            progress,
        }
    }

    /// Counts an app launch and reports any achievements it unlocked.
    pub fn record_app_opened(&mut self, app_id: &AppId) -> Recorded {
        self.progress.apps_opened = self.progress.apps_opened.saturating_add(1);
        self.progress.distinct_apps.insert(app_id.clone());
        self.commit()
    }

    /// Counts a created file and reports any achievements it unlocked.
    pub fn record_file_created(&mut self) -> Recorded {
        self.progress.files_created = self.progress.files_created.saturating_add(1);
        self.commit()
    }

    /// Adds elapsed session time, in whole seconds.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Storage`] when progress cannot be flushed.
    pub fn record_session_time(&mut self, elapsed: Duration) -> Result<(), SessionError> {
        self.progress.session_seconds = self
            .progress
            .session_seconds
            .saturating_add(elapsed.as_secs());
        self.flush()
    }

    pub fn progress(&self) -> &AchievementProgress {
        &self.progress
    }

    pub fn is_unlocked(&self, id: AchievementId) -> bool {
        self.progress.unlocked.contains(&id)
    }

    fn commit(&mut self) -> Recorded {
        let newly_unlocked: Vec<AchievementId> = AchievementId::ALL
            .into_iter()
            .filter(|id| !self.progress.unlocked.contains(id))
            .filter(|id| self.progress.threshold_reached(*id))
            .collect();
        for id in &newly_unlocked {
            info!(achievement = id.title(), "achievement unlocked");
            self.progress.unlocked.insert(*id);
        }
        let flushed = self.flush();
        if let Err(err) = &flushed {
            warn!("achievement progress flush failed: {err}");
        }
        Recorded {
            unlocked: newly_unlocked,
            flushed,
        }
    }

    fn flush(&self) -> Result<(), SessionError> {
        save_pref_with(self.store.as_ref(), &self.key, &self.progress).map_err(SessionError::Storage)
    }
}
