//! The single shared context menu.
//!
//! At most one menu is visible; showing a new one replaces the old in place. The menu box is
//! clamped into the viewport so it is never clipped at the right or bottom edge.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{PointerPosition, Viewport, WindowRect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuMetrics {
    pub width: i32,
    pub item_height: i32,
    pub separator_height: i32,
    pub padding: i32,
}

impl Default for MenuMetrics {
    fn default() -> Self {
        Self {
            width: 220,
            item_height: 28,
            separator_height: 9,
            padding: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem<A> {
    pub label: String,
    pub shortcut: Option<String>,
    pub disabled: bool,
    pub action: A,
}

impl<A> MenuItem<A> {
    pub fn new(label: impl Into<String>, action: A) -> Self {
        Self {
            label: label.into(),
            shortcut: None,
            disabled: false,
            action,
        }
    }

    pub fn with_shortcut(mut self, shortcut: impl Into<String>) -> Self {
        self.shortcut = Some(shortcut.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MenuEntry<A> {
    Item(MenuItem<A>),
    Separator,
}

impl<A> MenuEntry<A> {
    fn is_actionable(&self) -> bool {
        matches!(self, Self::Item(item) if !item.disabled)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct VisibleMenu<A> {
    requested: WindowRect,
    bounds: WindowRect,
    entries: Vec<MenuEntry<A>>,
}

#[derive(Debug, Clone)]
pub struct ContextMenu<A> {
    visible: Option<VisibleMenu<A>>,
    viewport: Viewport,
    metrics: MenuMetrics,
}

impl<A> ContextMenu<A> {
    pub fn new(viewport: Viewport, metrics: MenuMetrics) -> Self {
        Self {
            visible: None,
            viewport,
            metrics,
        }
    }

    /// Shows `entries` at `point`, replacing any visible menu.
    ///
    /// The menu box is shifted left/up to stay inside the viewport. In a viewport smaller than the
    /// menu it is shrunk to the viewport and the host scrolls its entries.
    pub fn show(&mut self, point: PointerPosition, entries: Vec<MenuEntry<A>>) {
        let requested = WindowRect {
            x: point.x,
            y: point.y,
            w: self.metrics.width,
            h: self.menu_height(&entries),
        };
        let bounds = requested.clamped_into(self.viewport);
        if bounds != requested {
            debug!(?requested, ?bounds, "context menu shifted on-screen");
        }
        self.visible = Some(VisibleMenu {
            requested,
            bounds,
            entries,
        });
    }

    pub fn hide(&mut self) {
        self.visible = None;
    }

    pub fn is_visible(&self) -> bool {
        self.visible.is_some()
    }

    pub fn bounds(&self) -> Option<WindowRect> {
        self.visible.as_ref().map(|menu| menu.bounds)
    }

    pub fn entries(&self) -> &[MenuEntry<A>] {
        self.visible
            .as_ref()
            .map(|menu| menu.entries.as_slice())
            .unwrap_or_default()
    }

    /// Activates the entry at `index`, hiding the menu and returning the item's action.
    ///
    /// Disabled items, separators, and out-of-range indexes do nothing and leave the menu open.
    pub fn activate(&mut self, index: usize) -> Option<A> {
        let actionable = self
            .visible
            .as_ref()
            .and_then(|menu| menu.entries.get(index))
            .is_some_and(MenuEntry::is_actionable);
        if !actionable {
            return None;
        }

        let menu = self.visible.take()?;
        match menu.entries.into_iter().nth(index)? {
            MenuEntry::Item(item) => Some(item.action),
            MenuEntry::Separator => None,
        }
    }

    /// Handles a pointer press anywhere on screen. Presses outside the menu dismiss it.
    ///
    /// Returns `true` when the press dismissed the menu.
    pub fn pointer_down(&mut self, point: PointerPosition) -> bool {
        match self.bounds() {
            Some(bounds) if !bounds.contains(point) => {
                self.hide();
                true
            }
            _ => false,
        }
    }

    /// Index of the entry under `point`, if the menu is visible and the point is on an entry.
    pub fn entry_at(&self, point: PointerPosition) -> Option<usize> {
        let menu = self.visible.as_ref()?;
        if !menu.bounds.contains(point) {
            return None;
        }
        let mut top = menu.bounds.y + self.metrics.padding;
        for (index, entry) in menu.entries.iter().enumerate() {
            let bottom = top + self.entry_height(entry);
            if point.y >= top && point.y < bottom {
                return Some(index);
            }
            top = bottom;
        }
        None
    }

    /// Updates the viewport and keeps a visible menu on-screen.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let Some(menu) = self.visible.as_mut() {
            menu.bounds = menu.requested.clamped_into(viewport);
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn entry_height(&self, entry: &MenuEntry<A>) -> i32 {
        match entry {
            MenuEntry::Item(_) => self.metrics.item_height,
            MenuEntry::Separator => self.metrics.separator_height,
        }
    }

    fn menu_height(&self, entries: &[MenuEntry<A>]) -> i32 {
        let content: i32 = entries.iter().map(|entry| self.entry_height(entry)).sum();
        content + self.metrics.padding * 2
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Cmd {
        NewFolder,
        Paste,
        Refresh,
    }

    fn viewport() -> Viewport {
        Viewport {
            width: 1024,
            height: 768,
        }
    }

    fn entries() -> Vec<MenuEntry<Cmd>> {
        vec![
            MenuEntry::Item(MenuItem::new("New Folder", Cmd::NewFolder).with_shortcut("Ctrl+N")),
            MenuEntry::Item(MenuItem::new("Paste", Cmd::Paste).disabled()),
            MenuEntry::Separator,
            MenuEntry::Item(MenuItem::new("Refresh", Cmd::Refresh)),
        ]
    }

    fn menu() -> ContextMenu<Cmd> {
        ContextMenu::new(viewport(), MenuMetrics::default())
    }

    #[test]
    fn show_near_right_edge_shifts_menu_left() {
        let mut menu = menu();
        menu.show(PointerPosition::new(1024 + 50, 10), entries());

        let bounds = menu.bounds().expect("visible");
        assert!(bounds.right() <= 1024);
        assert_eq!(bounds.y, 10);
    }

    #[test]
    fn show_near_bottom_edge_shifts_menu_up() {
        let mut menu = menu();
        menu.show(PointerPosition::new(100, 760), entries());

        let bounds = menu.bounds().expect("visible");
        assert_eq!(bounds.bottom(), 768);
        assert_eq!(bounds.h, 28 * 3 + 9 + 8);
    }

    #[test]
    fn show_replaces_visible_menu_in_place() {
        let mut menu = menu();
        menu.show(PointerPosition::new(10, 10), entries());
        menu.show(
            PointerPosition::new(300, 300),
            vec![MenuEntry::Item(MenuItem::new("Refresh", Cmd::Refresh))],
        );

        assert_eq!(menu.entries().len(), 1);
        assert_eq!(menu.bounds().map(|b| (b.x, b.y)), Some((300, 300)));
    }

    #[test]
    fn activating_enabled_item_returns_action_and_hides() {
        let mut menu = menu();
        menu.show(PointerPosition::new(10, 10), entries());

        assert_eq!(menu.activate(3), Some(Cmd::Refresh));
        assert!(!menu.is_visible());
    }

    #[test]
    fn disabled_items_and_separators_are_inert() {
        let mut menu = menu();
        menu.show(PointerPosition::new(10, 10), entries());

        assert_eq!(menu.activate(1), None);
        assert_eq!(menu.activate(2), None);
        assert_eq!(menu.activate(99), None);
        assert!(menu.is_visible());
    }

    #[test]
    fn pointer_outside_dismisses_and_inside_keeps_menu() {
        let mut menu = menu();
        menu.show(PointerPosition::new(10, 10), entries());

        assert!(!menu.pointer_down(PointerPosition::new(20, 20)));
        assert!(menu.is_visible());
        assert!(menu.pointer_down(PointerPosition::new(900, 700)));
        assert!(!menu.is_visible());
        assert!(!menu.pointer_down(PointerPosition::new(900, 700)));
    }

    #[test]
    fn entry_at_maps_points_to_rows() {
        let mut menu = menu();
        menu.show(PointerPosition::new(0, 0), entries());

        assert_eq!(menu.entry_at(PointerPosition::new(5, 4)), Some(0));
        assert_eq!(menu.entry_at(PointerPosition::new(5, 4 + 28)), Some(1));
        assert_eq!(menu.entry_at(PointerPosition::new(5, 4 + 56)), Some(2));
        assert_eq!(menu.entry_at(PointerPosition::new(5, 4 + 56 + 9)), Some(3));
        assert_eq!(menu.entry_at(PointerPosition::new(500, 4)), None);
    }

    #[test]
    fn menu_larger_than_viewport_is_shrunk_to_fit() {
        let mut menu = ContextMenu::new(
            Viewport {
                width: 160,
                height: 90,
            },
            MenuMetrics::default(),
        );
        menu.show(PointerPosition::new(120, 40), entries());

        let bounds = menu.bounds().expect("visible");
        assert_eq!((bounds.x, bounds.y), (0, 0));
        assert_eq!((bounds.right(), bounds.bottom()), (160, 90));

        menu.set_viewport(viewport());
        let bounds = menu.bounds().expect("visible");
        assert_eq!((bounds.x, bounds.y), (120, 40));
        assert_eq!((bounds.w, bounds.h), (220, 28 * 3 + 9 + 8));
    }

    #[test]
    fn hide_is_idempotent_and_viewport_shrink_reclamps() {
        let mut menu = menu();
        menu.show(PointerPosition::new(800, 10), entries());
        menu.set_viewport(Viewport {
            width: 640,
            height: 480,
        });
        assert_eq!(menu.bounds().map(|b| b.right()), Some(640));

        menu.hide();
        menu.hide();
        assert!(!menu.is_visible());
        assert!(menu.entries().is_empty());
    }
}
