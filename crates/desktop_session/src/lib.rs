//! Headless desktop session core.
//!
//! A [`Desktop`] owns the window registry and focus ordering, the drag-and-drop coordinator, the
//! shared context menu, persisted preferences, achievement counters, and the session clock.
//! Presentation hosts drive it through [`reduce_desktop`] and execute the returned
//! [`RuntimeEffect`] values.

pub mod achievements;
pub mod clock;
pub mod config;
pub mod context_menu;
pub mod desktop;
pub mod drag;
pub mod error;
pub mod model;
pub mod preferences;
pub mod reducer;
pub mod session;
pub mod toast;
pub mod window_manager;

pub use achievements::{AchievementId, AchievementProgress, AchievementTracker, Recorded};
pub use clock::{spawn_scoped, ScopedTask, SessionClock};
pub use config::DesktopConfig;
pub use context_menu::{ContextMenu, MenuEntry, MenuItem, MenuMetrics};
pub use desktop::Desktop;
pub use drag::{
    DragCoordinator, DragPayload, DragSession, DragSource, DropContext, DropOutcome, DropZoneId,
};
pub use error::{ErrorDisposition, ErrorPolicy, SessionError};
pub use model::*;
pub use preferences::{DockPosition, Preferences, Theme};
pub use reducer::{reduce_desktop, DesktopAction, RuntimeEffect};
pub use session::{InvariantViolation, SessionState};
pub use toast::{Toast, ToastQueue};
