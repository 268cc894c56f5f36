//! Reducer actions, side-effect intents, and transition logic for the window lifecycle
//! controller.

use serde_json::Value;
use tracing::{debug, warn};

use crate::achievements::AchievementId;
use crate::context_menu::MenuEntry;
use crate::desktop::Desktop;
use crate::drag::{DragPayload, DragSource, DropOutcome, DropZoneId};
use crate::error::{ErrorDisposition, ErrorPolicy, SessionError};
use crate::model::{
    MoveSession, OpenWindowRequest, PointerPosition, WindowId, WindowRect, DEFAULT_WINDOW_HEIGHT,
    DEFAULT_WINDOW_WIDTH,
};
use crate::toast::Toast;
use crate::window_manager::moved_rect;

/// Source element recorded for drops whose payload arrived as serialized transfer data.
pub const EXTERNAL_DRAG_SOURCE: &str = "external-transfer";

const CASCADE_STEP: i32 = 24;
const CASCADE_SLOTS: i32 = 8;

#[derive(Debug, Clone, PartialEq)]
/// Actions accepted by [`reduce_desktop`] to mutate a [`Desktop`].
pub enum DesktopAction {
    /// Register and focus a new window.
    OpenWindow(OpenWindowRequest),
    /// Close a window by id.
    CloseWindow {
        /// Window to close.
        window_id: WindowId,
    },
    /// Focus (and raise) a window by id.
    FocusWindow {
        /// Window to focus.
        window_id: WindowId,
    },
    /// Begin dragging a window by its title bar.
    BeginMove {
        /// Window being dragged.
        window_id: WindowId,
        /// Pointer position at drag start.
        pointer: PointerPosition,
    },
    /// Update an in-progress window drag.
    UpdateMove {
        /// Current pointer position.
        pointer: PointerPosition,
    },
    /// End the active window drag.
    EndMove,
    /// Change the shell working directory label.
    SetDirectory {
        /// New directory label.
        path: String,
    },
    /// Write and persist a preference.
    SetPreference {
        /// Preference name.
        key: String,
        /// New value.
        value: Value,
    },
    /// Count a file created by an app.
    RecordFileCreated,
    /// Show the shared context menu, replacing any visible one.
    ShowContextMenu {
        /// Requested top-left corner.
        pointer: PointerPosition,
        /// Ordered entries.
        entries: Vec<MenuEntry<DesktopAction>>,
    },
    /// Activate a context menu entry by index.
    ActivateMenuItem {
        /// Entry index.
        index: usize,
    },
    /// Pointer press anywhere on the desktop.
    PointerDown {
        /// Press location.
        pointer: PointerPosition,
    },
    /// Hide the context menu.
    HideContextMenu,
    /// Start a widget drag.
    BeginDrag {
        /// Widget the drag started from.
        source: DragSource,
        /// Data carried by the drag.
        payload: DragPayload,
        /// Pointer position at drag start.
        pointer: PointerPosition,
    },
    /// Track the pointer of the widget drag.
    UpdateDrag {
        /// Current pointer position.
        pointer: PointerPosition,
    },
    /// Drop the in-flight drag onto a zone.
    DropOnZone {
        /// Target zone.
        zone_id: DropZoneId,
    },
    /// Drop serialized data that arrived from outside this desktop onto a zone.
    DropTransfer {
        /// Target zone.
        zone_id: DropZoneId,
        /// Serialized payload.
        raw: String,
        /// Drop location.
        pointer: PointerPosition,
    },
    /// Abandon the widget drag.
    CancelDrag,
    /// Drop toasts whose lifetime has ended.
    ExpireToasts {
        /// Current unix time in milliseconds.
        now_ms: u64,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// Side-effect intents emitted by [`reduce_desktop`] for the presentation host to execute.
pub enum RuntimeEffect {
    /// Move keyboard focus into the window's primary input.
    FocusWindowInput(WindowId),
    /// Show a toast notification.
    ShowToast(Toast),
    /// Play a named UI sound.
    PlaySound(&'static str),
    /// A drop handler accepted a drop.
    DropDelivered {
        /// Zone that received the drop.
        zone_id: DropZoneId,
        /// Handler result.
        result: Value,
    },
    /// A drop landed outside every registered zone.
    DropIgnored {
        /// Zone the pointer was over.
        zone_id: DropZoneId,
    },
    /// A preference was written to durable storage.
    PersistedPreference(String),
}

/// Applies a [`DesktopAction`] to the desktop and collects resulting side effects.
///
/// Errors are resolved by kind: stale window references are logged and ignored, caller defects
/// follow the configured [`ErrorPolicy`], and payload or storage failures become a toast.
///
/// # Errors
///
/// Returns [`SessionError::DuplicateWindowId`] or [`SessionError::AlreadyDragging`] under
/// [`ErrorPolicy::Strict`].
pub fn reduce_desktop(
    desktop: &mut Desktop,
    action: DesktopAction,
) -> Result<Vec<RuntimeEffect>, SessionError> {
    let mut effects = Vec::new();
    match apply(desktop, action, &mut effects) {
        Ok(()) => Ok(effects),
        Err(err) => resolve_error(desktop, err, effects),
    }
}

fn apply(
    desktop: &mut Desktop,
    action: DesktopAction,
    effects: &mut Vec<RuntimeEffect>,
) -> Result<(), SessionError> {
    match action {
        DesktopAction::OpenWindow(mut req) => {
            let window_id = match req.window_id.clone() {
                Some(window_id) => window_id,
                None => desktop.next_window_id(&req.app_id),
            };
            if req.rect.is_none() {
                req.rect = Some(cascade_rect(desktop.session.window_count()));
            }
            let app_id = req.app_id.clone();
            desktop.session.register_window(window_id.clone(), req)?;
            desktop.session.mark_app_running(&app_id);
            desktop.context_menu.hide();
            effects.push(RuntimeEffect::FocusWindowInput(window_id));

            let recorded = desktop.achievements.record_app_opened(&app_id);
            announce_unlocks(desktop, &recorded.unlocked, effects);
            recorded.flushed?;
        }
        DesktopAction::CloseWindow { window_id } => {
            if desktop
                .interaction
                .moving
                .as_ref()
                .is_some_and(|session| session.window_id == window_id)
            {
                desktop.interaction.moving = None;
            }
            let closed = desktop.session.close_window(&window_id)?;
            desktop.session.mark_app_stopped(&closed.app_id);
            if let Some(next) = desktop.session.active_window_id() {
                effects.push(RuntimeEffect::FocusWindowInput(next.clone()));
            }
        }
        DesktopAction::FocusWindow { window_id } => {
            desktop.session.focus(&window_id)?;
            desktop.context_menu.hide();
            effects.push(RuntimeEffect::FocusWindowInput(window_id));
        }
        DesktopAction::BeginMove { window_id, pointer } => {
            let rect_start = desktop
                .session
                .window(&window_id)
                .map(|w| w.rect)
                .ok_or_else(|| SessionError::WindowNotFound(window_id.clone()))?;
            desktop.session.focus(&window_id)?;
            desktop.context_menu.hide();
            desktop.interaction.moving = Some(MoveSession {
                window_id,
                pointer_start: pointer,
                rect_start,
            });
        }
        DesktopAction::UpdateMove { pointer } => {
            if let Some(session) = desktop.interaction.moving.clone() {
                let dx = pointer.x.saturating_sub(session.pointer_start.x);
                let dy = pointer.y.saturating_sub(session.pointer_start.y);
                let rect = moved_rect(session.rect_start, dx, dy, desktop.config.viewport);
                if let Err(err) = desktop.session.set_window_rect(&session.window_id, rect) {
                    desktop.interaction.moving = None;
                    return Err(err);
                }
            }
        }
        DesktopAction::EndMove => {
            desktop.interaction.moving = None;
        }
        DesktopAction::SetDirectory { path } => {
            desktop.session.set_directory(path);
        }
        DesktopAction::SetPreference { key, value } => {
            desktop.session.set_preference(key.clone(), value)?;
            effects.push(RuntimeEffect::PersistedPreference(key));
        }
        DesktopAction::RecordFileCreated => {
            let recorded = desktop.achievements.record_file_created();
            announce_unlocks(desktop, &recorded.unlocked, effects);
            recorded.flushed?;
        }
        DesktopAction::ShowContextMenu { pointer, entries } => {
            desktop.context_menu.show(pointer, entries);
        }
        DesktopAction::ActivateMenuItem { index } => {
            if let Some(action) = desktop.context_menu.activate(index) {
                effects.extend(reduce_desktop(desktop, action)?);
            }
        }
        DesktopAction::PointerDown { pointer } => {
            if desktop.context_menu.pointer_down(pointer) {
                debug!("context menu dismissed by outside press");
            }
        }
        DesktopAction::HideContextMenu => {
            desktop.context_menu.hide();
        }
        DesktopAction::BeginDrag {
            source,
            payload,
            pointer,
        } => {
            desktop.drag.begin_drag(source, payload, pointer)?;
            desktop.context_menu.hide();
        }
        DesktopAction::UpdateDrag { pointer } => {
            desktop.drag.update_position(pointer);
        }
        DesktopAction::DropOnZone { zone_id } => {
            drop_on_zone(desktop, zone_id, effects);
        }
        DesktopAction::DropTransfer {
            zone_id,
            raw,
            pointer,
        } => {
            let payload = DragPayload::from_transfer_text(&raw)?;
            desktop
                .drag
                .begin_drag(DragSource::element(EXTERNAL_DRAG_SOURCE), payload, pointer)?;
            drop_on_zone(desktop, zone_id, effects);
        }
        DesktopAction::CancelDrag => {
            desktop.drag.end_drag();
        }
        DesktopAction::ExpireToasts { now_ms } => {
            desktop.toasts.expire(now_ms);
        }
    }
    Ok(())
}

fn resolve_error(
    desktop: &mut Desktop,
    err: SessionError,
    mut effects: Vec<RuntimeEffect>,
) -> Result<Vec<RuntimeEffect>, SessionError> {
    match err.disposition() {
        ErrorDisposition::Recover => {
            warn!("ignored stale desktop action: {err}");
            Ok(effects)
        }
        ErrorDisposition::CallerDefect => match desktop.config.error_policy {
            ErrorPolicy::Strict => Err(err),
            ErrorPolicy::Lenient => {
                warn!("ignored invalid desktop action: {err}");
                Ok(effects)
            }
        },
        ErrorDisposition::Notify => {
            warn!("desktop action failed: {err}");
            let title = match &err {
                SessionError::PayloadDecode(_) => "Couldn't read the dropped item",
                _ => "Couldn't save your changes",
            };
            let toast = desktop.push_toast(title, err.to_string());
            effects.push(RuntimeEffect::ShowToast(toast));
            Ok(effects)
        }
    }
}

fn drop_on_zone(desktop: &mut Desktop, zone_id: DropZoneId, effects: &mut Vec<RuntimeEffect>) {
    match desktop.drag.attempt_drop(&zone_id) {
        DropOutcome::Delivered(result) => {
            effects.push(RuntimeEffect::DropDelivered { zone_id, result });
        }
        DropOutcome::NoHandler => {
            effects.push(RuntimeEffect::DropIgnored { zone_id });
        }
        DropOutcome::NotDragging => {
            debug!(zone = %zone_id, "drop without an active drag");
        }
    }
}

fn announce_unlocks(
    desktop: &mut Desktop,
    unlocked: &[AchievementId],
    effects: &mut Vec<RuntimeEffect>,
) {
    for id in unlocked {
        let toast = desktop.push_toast(
            format!("Achievement unlocked: {}", id.title()),
            id.description(),
        );
        effects.push(RuntimeEffect::ShowToast(toast));
        if desktop.session.preferences().sound_enabled() {
            effects.push(RuntimeEffect::PlaySound("achievement"));
        }
    }
}

fn cascade_rect(open_windows: usize) -> WindowRect {
    let offset = (open_windows as i32 % CASCADE_SLOTS) * CASCADE_STEP;
    WindowRect {
        x: 40 + offset,
        y: 48 + offset,
        w: DEFAULT_WINDOW_WIDTH,
        h: DEFAULT_WINDOW_HEIGHT,
    }
}
