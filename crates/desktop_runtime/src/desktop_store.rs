//! Virtual desktop collection and the active-desktop pointer.
//!
//! Desktops are kept in insertion order; that order decides cycling and the fallback desktop used
//! when one is removed. The collection never becomes empty.

use leptos::logging;

use crate::{
    config::DesktopSeed,
    model::{CycleDirection, DesktopId, VirtualDesktop},
    reducer::ReducerError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopEntityStore {
    desktops: Vec<VirtualDesktop>,
    active: DesktopId,
    next_desktop_id: u64,
}

impl Default for DesktopEntityStore {
    fn default() -> Self {
        Self::seeded(&[DesktopSeed::default()])
    }
}

impl DesktopEntityStore {
    /// Builds a store from configured seeds; the first seed becomes active.
    pub fn seeded(seeds: &[DesktopSeed]) -> Self {
        let mut store = Self {
            desktops: Vec::new(),
            active: DesktopId(1),
            next_desktop_id: 1,
        };
        for seed in seeds {
            store.create(seed.name.clone(), seed.wallpaper_ref.clone());
        }
        if store.desktops.is_empty() {
            let seed = DesktopSeed::default();
            store.create(seed.name, seed.wallpaper_ref);
        }
        store.active = store.first_id();
        store
    }

    /// Rebuilds a store from persisted desktops. `desktops` must not be empty.
    pub(crate) fn from_parts(desktops: Vec<VirtualDesktop>, active: DesktopId) -> Self {
        let next_desktop_id = desktops
            .iter()
            .map(|d| d.id.0)
            .max()
            .unwrap_or(0)
            .saturating_add(1);
        let mut store = Self {
            desktops,
            active,
            next_desktop_id,
        };
        if !store.contains(active) {
            store.active = store.first_id();
        }
        store
    }

    pub fn create(&mut self, name: impl Into<String>, wallpaper_ref: impl Into<String>) -> DesktopId {
        let id = DesktopId(self.next_desktop_id);
        self.next_desktop_id = self.next_desktop_id.saturating_add(1);
        self.desktops.push(VirtualDesktop {
            id,
            name: name.into(),
            wallpaper_ref: wallpaper_ref.into(),
        });
        id
    }

    pub fn get(&self, desktop_id: DesktopId) -> Option<&VirtualDesktop> {
        self.desktops.iter().find(|d| d.id == desktop_id)
    }

    pub fn contains(&self, desktop_id: DesktopId) -> bool {
        self.get(desktop_id).is_some()
    }

    pub fn all(&self) -> &[VirtualDesktop] {
        &self.desktops
    }

    pub fn len(&self) -> usize {
        self.desktops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.desktops.is_empty()
    }

    pub fn active_id(&self) -> DesktopId {
        self.active
    }

    pub fn active(&self) -> Option<&VirtualDesktop> {
        self.get(self.active)
    }

    pub fn first_id(&self) -> DesktopId {
        self.desktops.first().map(|d| d.id).unwrap_or(self.active)
    }

    /// Moves the active pointer. Returns `false` for unknown or already-active desktops.
    pub fn set_active(&mut self, desktop_id: DesktopId) -> bool {
        if !self.contains(desktop_id) {
            logging::debug_warn!("switch ignored for unknown desktop {desktop_id}");
            return false;
        }
        if self.active == desktop_id {
            return false;
        }
        self.active = desktop_id;
        true
    }

    /// Desktop that windows of `desktop_id` move to when it is removed: the first remaining one.
    ///
    /// # Errors
    ///
    /// Returns [`ReducerError::LastDesktop`] when `desktop_id` is the only desktop.
    pub fn fallback_for(&self, desktop_id: DesktopId) -> Result<Option<DesktopId>, ReducerError> {
        if !self.contains(desktop_id) {
            return Ok(None);
        }
        if self.desktops.len() <= 1 {
            return Err(ReducerError::LastDesktop);
        }
        Ok(self.desktops.iter().map(|d| d.id).find(|id| *id != desktop_id))
    }

    /// Deletes a desktop, moving the active pointer to the fallback when needed.
    ///
    /// Callers reassign member windows first; see [`Self::fallback_for`].
    ///
    /// # Errors
    ///
    /// Returns [`ReducerError::LastDesktop`] when `desktop_id` is the only desktop; the store is
    /// left unchanged.
    pub fn remove(&mut self, desktop_id: DesktopId) -> Result<Option<VirtualDesktop>, ReducerError> {
        let Some(fallback) = self.fallback_for(desktop_id)? else {
            logging::debug_warn!("remove ignored for unknown desktop {desktop_id}");
            return Ok(None);
        };
        let Some(index) = self.desktops.iter().position(|d| d.id == desktop_id) else {
            return Ok(None);
        };
        let removed = self.desktops.remove(index);
        if self.active == desktop_id {
            self.active = fallback;
        }
        Ok(Some(removed))
    }

    /// Neighbor of the active desktop in insertion order, wrapping at both ends.
    pub fn neighbor(&self, direction: CycleDirection) -> DesktopId {
        let len = self.desktops.len();
        let Some(index) = self.desktops.iter().position(|d| d.id == self.active) else {
            return self.first_id();
        };
        let next = match direction {
            CycleDirection::Next => (index + 1) % len,
            CycleDirection::Previous => (index + len - 1) % len,
        };
        self.desktops[next].id
    }

    pub fn rename(&mut self, desktop_id: DesktopId, name: impl Into<String>) -> bool {
        match self.desktops.iter_mut().find(|d| d.id == desktop_id) {
            Some(desktop) => {
                desktop.name = name.into();
                true
            }
            None => false,
        }
    }

    pub fn set_wallpaper(&mut self, desktop_id: DesktopId, wallpaper_ref: impl Into<String>) -> bool {
        match self.desktops.iter_mut().find(|d| d.id == desktop_id) {
            Some(desktop) => {
                desktop.wallpaper_ref = wallpaper_ref.into();
                true
            }
            None => false,
        }
    }
}
