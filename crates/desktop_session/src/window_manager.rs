//! Stacking and geometry helpers shared by the session registry and the lifecycle reducer.

use crate::model::{Viewport, Window, WindowId, WindowRect};

/// Pixels of a window's title bar that must stay on-screen while dragging.
pub const MIN_VISIBLE_TITLE_BAR: i32 = 48;

/// Returns the id of the window with the highest z-order, if any.
pub fn front_most<'a>(windows: impl Iterator<Item = &'a Window>) -> Option<WindowId> {
    windows.max_by_key(|w| w.z_order).map(|w| w.id.clone())
}

/// Clones `windows` into back-to-front order.
pub fn stacking_order<'a>(windows: impl Iterator<Item = &'a Window>) -> Vec<Window> {
    let mut ordered: Vec<Window> = windows.cloned().collect();
    ordered.sort_by_key(|w| w.z_order);
    ordered
}

/// Offsets `start` by the pointer delta, keeping part of the title bar reachable inside
/// `viewport`.
pub fn moved_rect(start: WindowRect, dx: i32, dy: i32, viewport: Viewport) -> WindowRect {
    let moved = start.offset(dx, dy);
    let min_x = MIN_VISIBLE_TITLE_BAR - moved.w;
    let max_x = (viewport.width - MIN_VISIBLE_TITLE_BAR).max(min_x);
    let max_y = (viewport.height - MIN_VISIBLE_TITLE_BAR).max(0);
    WindowRect {
        x: moved.x.clamp(min_x, max_x),
        y: moved.y.clamp(0, max_y),
        ..moved
    }
}
