use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    config::WindowManagerConfig, desktop_store::DesktopEntityStore, features::FeatureCatalog,
    focus::FocusController, window_store::WindowEntityStore,
};

pub const DESKTOP_LAYOUT_SCHEMA_VERSION: u32 = 1;
pub const WINDOW_STATE_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_WINDOW_WIDTH: i32 = 800;
pub const DEFAULT_WINDOW_HEIGHT: i32 = 600;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub String);

impl WindowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WindowId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(pub String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesktopId(pub u64);

impl fmt::Display for DesktopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "desktop-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT)
    }
}

/// A window's `{position, size}` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub position: Position,
    pub size: Size,
}

impl WindowGeometry {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            position: Position::new(x, y),
            size: Size::new(width, height),
        }
    }

    pub fn right(&self) -> i32 {
        self.position.x.saturating_add(self.size.width)
    }

    pub fn bottom(&self) -> i32 {
        self.position.y.saturating_add(self.size.height)
    }
}

/// Dimensions of the desktop surface windows are laid out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    /// Full viewport area, used for fullscreen windows.
    pub fn full_area(self) -> WindowGeometry {
        WindowGeometry::new(0, 0, self.width, self.height)
    }

    /// Viewport minus the bottom taskbar strip, used for maximized windows.
    pub fn work_area(self, taskbar_height: i32) -> WindowGeometry {
        let height = self.height.saturating_sub(taskbar_height.max(0)).max(0);
        WindowGeometry::new(0, 0, self.width, height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 800)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowFlags {
    pub draggable: bool,
    pub resizable: bool,
    pub maximizable: bool,
}

impl Default for WindowFlags {
    fn default() -> Self {
        Self {
            draggable: true,
            resizable: true,
            maximizable: true,
        }
    }
}

/// Lifecycle state derived from a stored window record.
///
/// `Closed` is never observed on a record: closing removes the entity from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowLifecycle {
    Open,
    Minimized,
    Maximized,
    Fullscreen,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowRecord {
    pub id: WindowId,
    pub feature_id: FeatureId,
    pub title: String,
    pub position: Position,
    pub size: Size,
    pub z_index: u32,
    pub minimized: bool,
    pub maximized: bool,
    pub fullscreen: bool,
    pub last_known_geometry: Option<WindowGeometry>,
    pub desktop_id: DesktopId,
    pub pinned: bool,
    pub flags: WindowFlags,
    pub opacity: f32,
    pub always_on_top: bool,
}

impl WindowRecord {
    pub fn geometry(&self) -> WindowGeometry {
        WindowGeometry {
            position: self.position,
            size: self.size,
        }
    }

    pub fn set_geometry(&mut self, geometry: WindowGeometry) {
        self.position = geometry.position;
        self.size = geometry.size;
    }

    pub fn lifecycle(&self) -> WindowLifecycle {
        if self.minimized {
            WindowLifecycle::Minimized
        } else if self.fullscreen {
            WindowLifecycle::Fullscreen
        } else if self.maximized {
            WindowLifecycle::Maximized
        } else {
            WindowLifecycle::Open
        }
    }

    /// Whether the window takes part in stacking on `desktop_id`.
    pub fn is_visible_on(&self, desktop_id: DesktopId) -> bool {
        self.desktop_id == desktop_id && !self.minimized
    }

    /// Geometry overridden by maximize or fullscreen.
    pub fn has_geometry_override(&self) -> bool {
        self.maximized || self.fullscreen
    }

    /// The durable subset written through the persistence adapter.
    pub fn durable_state(&self) -> WindowPatch {
        let geometry = self
            .last_known_geometry
            .filter(|_| self.has_geometry_override())
            .unwrap_or_else(|| self.geometry());
        WindowPatch {
            title: Some(self.title.clone()),
            position: Some(PositionPatch::from(geometry.position)),
            size: Some(SizePatch::from(geometry.size)),
            minimized: None,
            opacity: Some(self.opacity),
            pinned: Some(self.pinned),
            always_on_top: Some(self.always_on_top),
            draggable: None,
            resizable: None,
            maximizable: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
}

impl From<Position> for PositionPatch {
    fn from(value: Position) -> Self {
        Self {
            x: Some(value.x),
            y: Some(value.y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SizePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
}

impl From<Size> for SizePatch {
    fn from(value: Size) -> Self {
        Self {
            width: Some(value.width),
            height: Some(value.height),
        }
    }
}

/// Partial window state.
///
/// `position` and `size` merge per axis; every other field replaces the stored value when set.
/// Stacking order, desktop membership, and maximize/fullscreen state are owned by the reducer and
/// cannot be patched directly.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PositionPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<SizePatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimized: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub always_on_top: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draggable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resizable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximizable: Option<bool>,
}

impl WindowPatch {
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            position: Some(PositionPatch::from(Position::new(x, y))),
            ..Self::default()
        }
    }

    pub fn sized(width: i32, height: i32) -> Self {
        Self {
            size: Some(SizePatch::from(Size::new(width, height))),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, record: &mut WindowRecord) {
        if let Some(title) = &self.title {
            record.title = title.clone();
        }
        if let Some(position) = self.position {
            record.position.x = position.x.unwrap_or(record.position.x);
            record.position.y = position.y.unwrap_or(record.position.y);
        }
        if let Some(size) = self.size {
            record.size.width = size.width.unwrap_or(record.size.width);
            record.size.height = size.height.unwrap_or(record.size.height);
        }
        if let Some(minimized) = self.minimized {
            record.minimized = minimized;
        }
        if let Some(opacity) = self.opacity {
            record.opacity = clamp_opacity(opacity);
        }
        if let Some(pinned) = self.pinned {
            record.pinned = pinned;
        }
        if let Some(always_on_top) = self.always_on_top {
            record.always_on_top = always_on_top;
        }
        if let Some(draggable) = self.draggable {
            record.flags.draggable = draggable;
        }
        if let Some(resizable) = self.resizable {
            record.flags.resizable = resizable;
        }
        if let Some(maximizable) = self.maximizable {
            record.flags.maximizable = maximizable;
        }
    }

    pub fn touches_geometry(&self) -> bool {
        self.position.is_some() || self.size.is_some()
    }
}

fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        1.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualDesktop {
    pub id: DesktopId,
    pub name: String,
    pub wallpaper_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenWindowRequest {
    pub feature_id: FeatureId,
    pub desktop_id: Option<DesktopId>,
    pub custom_state: Option<WindowPatch>,
}

impl OpenWindowRequest {
    pub fn new(feature_id: impl Into<String>) -> Self {
        Self {
            feature_id: FeatureId::new(feature_id),
            desktop_id: None,
            custom_state: None,
        }
    }

    pub fn on_desktop(mut self, desktop_id: DesktopId) -> Self {
        self.desktop_id = Some(desktop_id);
        self
    }

    pub fn with_custom_state(mut self, patch: WindowPatch) -> Self {
        self.custom_state = Some(patch);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerPosition {
    pub x: i32,
    pub y: i32,
}

impl PointerPosition {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResizeEdge {
    North,
    South,
    East,
    West,
    NorthEast,
    NorthWest,
    SouthEast,
    SouthWest,
}

impl ResizeEdge {
    /// Parses a compass handle name (`"n"`, `"se"`, ...).
    pub fn from_handle(handle: &str) -> Option<Self> {
        match handle {
            "n" => Some(Self::North),
            "s" => Some(Self::South),
            "e" => Some(Self::East),
            "w" => Some(Self::West),
            "ne" => Some(Self::NorthEast),
            "nw" => Some(Self::NorthWest),
            "se" => Some(Self::SouthEast),
            "sw" => Some(Self::SouthWest),
            _ => None,
        }
    }

    pub fn touches_north(self) -> bool {
        matches!(self, Self::North | Self::NorthEast | Self::NorthWest)
    }

    pub fn touches_south(self) -> bool {
        matches!(self, Self::South | Self::SouthEast | Self::SouthWest)
    }

    pub fn touches_east(self) -> bool {
        matches!(self, Self::East | Self::NorthEast | Self::SouthEast)
    }

    pub fn touches_west(self) -> bool {
        matches!(self, Self::West | Self::NorthWest | Self::SouthWest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleDirection {
    Next,
    Previous,
}

/// Authoritative window-manager state: entity stores plus the single z-order/focus owner.
#[derive(Debug, Clone, PartialEq)]
pub struct DesktopState {
    pub config: WindowManagerConfig,
    pub catalog: FeatureCatalog,
    pub windows: WindowEntityStore,
    pub desktops: DesktopEntityStore,
    pub focus: FocusController,
    pub next_instance_id: u64,
}

impl Default for DesktopState {
    fn default() -> Self {
        Self::new(WindowManagerConfig::default(), FeatureCatalog::builtin())
    }
}

impl DesktopState {
    pub fn new(config: WindowManagerConfig, catalog: FeatureCatalog) -> Self {
        let desktops = DesktopEntityStore::seeded(&config.initial_desktops);
        let focus = FocusController::new(config.z_index_base);
        Self {
            config,
            catalog,
            windows: WindowEntityStore::default(),
            desktops,
            focus,
            next_instance_id: 1,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.config.viewport
    }

    pub fn active_desktop_id(&self) -> DesktopId {
        self.desktops.active_id()
    }

    pub fn focused_window_id(&self) -> Option<&WindowId> {
        self.focus.focused()
    }

    /// Non-minimized windows on the active desktop, bottom to top.
    pub fn visible_windows(&self) -> Vec<&WindowRecord> {
        self.windows.on_desktop(self.active_desktop_id())
    }

    pub fn snapshot(&self) -> DesktopSnapshot {
        DesktopSnapshot {
            schema_version: DESKTOP_LAYOUT_SCHEMA_VERSION,
            desktops: self.desktops.all().to_vec(),
            active_desktop: self.desktops.active_id(),
            windows: self.windows.all().to_vec(),
            next_z: self.focus.next_z(),
        }
    }

    /// Rebuilds state from a snapshot, repairing anything that would break stacking, desktop, or
    /// maximize invariants.
    pub fn from_snapshot(
        config: WindowManagerConfig,
        catalog: FeatureCatalog,
        snapshot: DesktopSnapshot,
    ) -> Self {
        let mut state = Self::new(config, catalog);
        if !snapshot.desktops.is_empty() {
            state.desktops =
                DesktopEntityStore::from_parts(snapshot.desktops, snapshot.active_desktop);
        }
        let fallback = state.desktops.first_id();

        let mut windows = snapshot.windows;
        windows.sort_by_key(|w| w.z_index);
        state.focus = FocusController::new(state.config.z_index_base.max(snapshot.next_z));
        for mut window in windows {
            if state.windows.contains(&window.id) {
                continue;
            }
            if !state.desktops.contains(window.desktop_id) {
                window.desktop_id = fallback;
            }
            if window.maximized && window.fullscreen {
                window.fullscreen = false;
            }
            if window.has_geometry_override() && window.last_known_geometry.is_none() {
                window.maximized = false;
                window.fullscreen = false;
            }
            window.opacity = clamp_opacity(window.opacity);
            window.z_index = state.focus.allocate_z();
            if let Some(instance) = instance_suffix(&window.id) {
                state.next_instance_id = state.next_instance_id.max(instance.saturating_add(1));
            }
            state.windows.insert(window);
        }

        let active = state.desktops.active_id();
        state.focus.refocus_top(&state.windows, active);
        state
    }
}

/// Parses the numeric suffix of a multi-instance window id (`"explorer#3"` -> `3`).
pub(crate) fn instance_suffix(window_id: &WindowId) -> Option<u64> {
    window_id
        .as_str()
        .rsplit_once('#')
        .and_then(|(_, suffix)| suffix.parse().ok())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesktopSnapshot {
    pub schema_version: u32,
    pub desktops: Vec<VirtualDesktop>,
    pub active_desktop: DesktopId,
    pub windows: Vec<WindowRecord>,
    pub next_z: u32,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn record(id: &str) -> WindowRecord {
        WindowRecord {
            id: WindowId::from(id),
            feature_id: FeatureId::from(id),
            title: id.to_string(),
            position: Position::new(50, 50),
            size: Size::new(800, 600),
            z_index: 101,
            minimized: false,
            maximized: false,
            fullscreen: false,
            last_known_geometry: None,
            desktop_id: DesktopId(1),
            pinned: false,
            flags: WindowFlags::default(),
            opacity: 1.0,
            always_on_top: false,
        }
    }

    #[test]
    fn patch_merges_geometry_per_axis_and_replaces_other_fields() {
        let mut window = record("notepad");
        let patch = WindowPatch {
            position: Some(PositionPatch {
                x: Some(10),
                y: None,
            }),
            size: Some(SizePatch {
                width: None,
                height: Some(320),
            }),
            pinned: Some(true),
            opacity: Some(4.0),
            ..WindowPatch::default()
        };

        patch.apply_to(&mut window);

        assert_eq!(window.position, Position::new(10, 50));
        assert_eq!(window.size, Size::new(800, 320));
        assert!(window.pinned);
        assert_eq!(window.opacity, 1.0);
    }

    #[test]
    fn patch_deserializes_from_sparse_json() {
        let patch: WindowPatch =
            serde_json::from_value(serde_json::json!({"position": {"y": 7}, "title": "Notes"}))
                .expect("decode patch");
        assert_eq!(
            patch,
            WindowPatch {
                title: Some("Notes".to_string()),
                position: Some(PositionPatch { x: None, y: Some(7) }),
                ..WindowPatch::default()
            }
        );
    }

    #[test]
    fn lifecycle_prefers_minimized_over_geometry_overrides() {
        let mut window = record("terminal");
        assert_eq!(window.lifecycle(), WindowLifecycle::Open);
        window.maximized = true;
        assert_eq!(window.lifecycle(), WindowLifecycle::Maximized);
        window.minimized = true;
        assert_eq!(window.lifecycle(), WindowLifecycle::Minimized);
    }

    #[test]
    fn durable_state_of_maximized_window_uses_restore_geometry() {
        let mut window = record("explorer");
        window.last_known_geometry = Some(window.geometry());
        window.set_geometry(WindowGeometry::new(0, 0, 1280, 752));
        window.maximized = true;

        let durable = window.durable_state();
        assert_eq!(durable.position, Some(PositionPatch::from(Position::new(50, 50))));
        assert_eq!(durable.size, Some(SizePatch::from(Size::new(800, 600))));
    }

    #[test]
    fn work_area_reserves_taskbar_strip() {
        let viewport = Viewport::new(1280, 800);
        assert_eq!(viewport.work_area(48), WindowGeometry::new(0, 0, 1280, 752));
        assert_eq!(viewport.full_area(), WindowGeometry::new(0, 0, 1280, 800));
    }

    #[test]
    fn from_snapshot_repairs_duplicate_z_and_dangling_desktops() {
        let mut first = record("a");
        first.z_index = 7;
        let mut second = record("b#4");
        second.z_index = 7;
        second.desktop_id = DesktopId(99);
        let mut third = record("c");
        third.maximized = true;

        let snapshot = DesktopSnapshot {
            schema_version: DESKTOP_LAYOUT_SCHEMA_VERSION,
            desktops: vec![VirtualDesktop {
                id: DesktopId(1),
                name: "Main".to_string(),
                wallpaper_ref: "teal".to_string(),
            }],
            active_desktop: DesktopId(1),
            windows: vec![first, second, third],
            next_z: 0,
        };

        let state = DesktopState::from_snapshot(
            WindowManagerConfig::default(),
            FeatureCatalog::builtin(),
            snapshot,
        );

        let mut z = state.windows.z_indices();
        z.sort_unstable();
        z.dedup();
        assert_eq!(z.len(), 3);
        let b = state.windows.get(&WindowId::from("b#4")).expect("b");
        assert_eq!(b.desktop_id, DesktopId(1));
        let c = state.windows.get(&WindowId::from("c")).expect("c");
        assert!(!c.maximized);
        assert_eq!(state.next_instance_id, 5);
        assert!(state.focused_window_id().is_some());
    }
}
