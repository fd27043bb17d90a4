//! Authoritative window entity storage.
//!
//! The store is plain CRUD over [`WindowRecord`]s kept in insertion order. Stacking, focus, and
//! capability policy live in the reducer and [`crate::focus::FocusController`].

use leptos::logging;

use crate::model::{DesktopId, WindowId, WindowPatch, WindowRecord};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct WindowEntityStore {
    records: Vec<WindowRecord>,
}

impl WindowEntityStore {
    /// Inserts `record`, replacing any existing record with the same id in place.
    pub fn insert(&mut self, record: WindowRecord) {
        match self.records.iter_mut().find(|w| w.id == record.id) {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    pub fn get(&self, window_id: &WindowId) -> Option<&WindowRecord> {
        self.records.iter().find(|w| &w.id == window_id)
    }

    pub fn get_mut(&mut self, window_id: &WindowId) -> Option<&mut WindowRecord> {
        self.records.iter_mut().find(|w| &w.id == window_id)
    }

    pub fn contains(&self, window_id: &WindowId) -> bool {
        self.get(window_id).is_some()
    }

    /// All windows in insertion order.
    pub fn all(&self) -> &[WindowRecord] {
        &self.records
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut WindowRecord> {
        self.records.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn remove(&mut self, window_id: &WindowId) -> Option<WindowRecord> {
        let index = self.records.iter().position(|w| &w.id == window_id)?;
        Some(self.records.remove(index))
    }

    /// Merges `patch` into the window. Unknown ids are a logged no-op.
    ///
    /// Returns whether a record was updated.
    pub fn update(&mut self, window_id: &WindowId, patch: &WindowPatch) -> bool {
        let Some(window) = self.get_mut(window_id) else {
            logging::debug_warn!("update ignored for unknown window {window_id}");
            return false;
        };
        patch.apply_to(window);
        true
    }

    /// Non-minimized windows on `desktop_id`, bottom to top.
    pub fn on_desktop(&self, desktop_id: DesktopId) -> Vec<&WindowRecord> {
        let mut visible = self
            .records
            .iter()
            .filter(|w| w.is_visible_on(desktop_id))
            .collect::<Vec<_>>();
        visible.sort_by_key(|w| w.z_index);
        visible
    }

    /// Every window assigned to `desktop_id`, minimized ones included.
    pub fn windows_on_desktop(&self, desktop_id: DesktopId) -> impl Iterator<Item = &WindowRecord> {
        self.records.iter().filter(move |w| w.desktop_id == desktop_id)
    }

    /// Highest-stacked non-minimized window on `desktop_id`.
    pub fn top_visible_on(&self, desktop_id: DesktopId) -> Option<&WindowRecord> {
        self.records
            .iter()
            .filter(|w| w.is_visible_on(desktop_id))
            .max_by_key(|w| w.z_index)
    }

    pub fn z_indices(&self) -> Vec<u32> {
        self.records.iter().map(|w| w.z_index).collect()
    }
}
