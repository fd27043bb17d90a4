//! Stacking-order allocation and focus tracking.
//!
//! [`FocusController`] owns the only z-index counter. Every raise takes the next value, so
//! z-indices stay pairwise distinct without ever renumbering other windows. `always_on_top` is
//! advisory and does not create a second ordering.

use leptos::logging;

use crate::{
    model::{DesktopId, WindowId},
    window_store::WindowEntityStore,
};

/// Result of [`FocusController::focus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOutcome {
    /// The window id is not in the store.
    Unknown,
    /// The window already was the focused top window; nothing changed.
    Unchanged,
    /// Focus or stacking changed.
    Changed {
        /// A new z-index was assigned.
        raised: bool,
        /// The window was minimized and is now visible again.
        restored: bool,
        /// The window is now the focused window (it lives on the active desktop).
        focused: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusController {
    next_z: u32,
    focused: Option<WindowId>,
}

impl FocusController {
    /// Creates a controller whose first allocated z-index is `z_base + 1`.
    pub fn new(z_base: u32) -> Self {
        Self {
            next_z: z_base,
            focused: None,
        }
    }

    /// Last z-index handed out (or the reserved base when none has been).
    pub fn next_z(&self) -> u32 {
        self.next_z
    }

    pub fn focused(&self) -> Option<&WindowId> {
        self.focused.as_ref()
    }

    pub fn is_focused(&self, window_id: &WindowId) -> bool {
        self.focused.as_ref() == Some(window_id)
    }

    pub fn allocate_z(&mut self) -> u32 {
        self.next_z = self.next_z.saturating_add(1);
        self.next_z
    }

    /// Raises, un-minimizes, and focuses `window_id`.
    ///
    /// Already-top windows keep their z-index. Windows on an inactive desktop are raised within
    /// that desktop but do not take focus.
    pub fn focus(
        &mut self,
        windows: &mut WindowEntityStore,
        active_desktop: DesktopId,
        window_id: &WindowId,
    ) -> FocusOutcome {
        let Some(window) = windows.get(window_id) else {
            logging::debug_warn!("focus ignored for unknown window {window_id}");
            return FocusOutcome::Unknown;
        };
        let desktop_id = window.desktop_id;
        let on_active = desktop_id == active_desktop;
        let already_top = !window.minimized
            && windows
                .top_visible_on(desktop_id)
                .map(|top| &top.id == window_id)
                .unwrap_or(false);

        if already_top {
            if on_active && !self.is_focused(window_id) {
                self.focused = Some(window_id.clone());
                return FocusOutcome::Changed {
                    raised: false,
                    restored: false,
                    focused: true,
                };
            }
            return FocusOutcome::Unchanged;
        }

        let z_index = self.allocate_z();
        let Some(window) = windows.get_mut(window_id) else {
            return FocusOutcome::Unknown;
        };
        let restored = window.minimized;
        window.minimized = false;
        window.z_index = z_index;
        if on_active {
            self.focused = Some(window_id.clone());
        }
        FocusOutcome::Changed {
            raised: true,
            restored,
            focused: on_active,
        }
    }

    /// Clears focus if `window_id` holds it. Returns whether focus was cleared.
    pub fn clear_if(&mut self, window_id: &WindowId) -> bool {
        if self.is_focused(window_id) {
            self.focused = None;
            true
        } else {
            false
        }
    }

    /// Focuses the top visible window on `active_desktop` without changing z-order.
    pub fn refocus_top(
        &mut self,
        windows: &WindowEntityStore,
        active_desktop: DesktopId,
    ) -> Option<WindowId> {
        self.focused = windows.top_visible_on(active_desktop).map(|w| w.id.clone());
        self.focused.clone()
    }

    /// Drops a focus pointer that no longer names the top visible window on the active desktop.
    ///
    /// A stale pointer (closed, minimized, or moved-away window) becomes `None`; a valid window
    /// that was stacked over hands focus to the new top.
    pub fn normalize(&mut self, windows: &WindowEntityStore, active_desktop: DesktopId) {
        let Some(focused) = self.focused.clone() else {
            return;
        };
        let valid = windows
            .get(&focused)
            .map(|w| w.is_visible_on(active_desktop))
            .unwrap_or(false);
        if !valid {
            self.focused = None;
            return;
        }
        if let Some(top) = windows.top_visible_on(active_desktop) {
            if top.id != focused {
                self.focused = Some(top.id.clone());
            }
        }
    }
}
