//! Runtime configuration for geometry limits, stacking, persistence cadence, and seeded desktops.
//!
//! Every field has a default, so a TOML document only needs the keys it overrides:
//!
//! ```toml
//! snap_threshold = 20
//! taskbar_height = 40
//!
//! [viewport]
//! width = 1920
//! height = 1080
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    hotkeys::ModifierSet,
    model::{Position, Size, Viewport},
};

/// Minimum allowed managed window width.
pub const MIN_WINDOW_WIDTH: i32 = 200;
/// Minimum allowed managed window height.
pub const MIN_WINDOW_HEIGHT: i32 = 150;
/// Pointer distance (in px) at which a dragged edge snaps to the viewport edge.
pub const SNAP_EDGE_THRESHOLD: i32 = 15;
/// Height of the reserved taskbar strip along the bottom of the viewport.
pub const TASKBAR_HEIGHT: i32 = 48;
/// Top of the z-range reserved for system chrome; window stacking starts above it.
pub const Z_INDEX_BASE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopSeed {
    pub name: String,
    #[serde(default = "default_wallpaper_ref")]
    pub wallpaper_ref: String,
}

fn default_wallpaper_ref() -> String {
    "default".to_string()
}

impl Default for DesktopSeed {
    fn default() -> Self {
        Self {
            name: "Desktop 1".to_string(),
            wallpaper_ref: default_wallpaper_ref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowManagerConfig {
    pub viewport: Viewport,
    pub taskbar_height: i32,
    pub snap_threshold: i32,
    pub min_window_size: Size,
    pub cascade_origin: Position,
    pub cascade_step: i32,
    pub cascade_len: u32,
    pub z_index_base: u32,
    pub persist_debounce_ms: u64,
    /// Treat `resizable = false` as also disabling maximize and fullscreen.
    pub maximize_requires_resizable: bool,
    pub desktop_switch_modifiers: ModifierSet,
    pub initial_desktops: Vec<DesktopSeed>,
}

impl Default for WindowManagerConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            taskbar_height: TASKBAR_HEIGHT,
            snap_threshold: SNAP_EDGE_THRESHOLD,
            min_window_size: Size::new(MIN_WINDOW_WIDTH, MIN_WINDOW_HEIGHT),
            cascade_origin: Position::new(50, 50),
            cascade_step: 30,
            cascade_len: 8,
            z_index_base: Z_INDEX_BASE,
            persist_debounce_ms: 400,
            maximize_requires_resizable: true,
            desktop_switch_modifiers: ModifierSet::ctrl_meta(),
            initial_desktops: vec![DesktopSeed::default()],
        }
    }
}

#[derive(Debug, Error)]
/// Errors raised while loading runtime configuration or feature catalogs.
pub enum ConfigError {
    /// The TOML document could not be parsed into the expected shape.
    #[error("config parse failed: {0}")]
    Parse(#[from] toml::de::Error),
    /// The document parsed but violates a configuration constraint.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl WindowManagerConfig {
    /// Parses and validates a TOML configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and [`ConfigError::Invalid`] when a value
    /// is out of range.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks range constraints the runtime relies on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport.width <= 0 || self.viewport.height <= 0 {
            return Err(ConfigError::Invalid("viewport must be non-empty".to_string()));
        }
        if self.min_window_size.width <= 0 || self.min_window_size.height <= 0 {
            return Err(ConfigError::Invalid(
                "min_window_size must be positive".to_string(),
            ));
        }
        if self.snap_threshold < 0 {
            return Err(ConfigError::Invalid(
                "snap_threshold must not be negative".to_string(),
            ));
        }
        if self.taskbar_height < 0 || self.taskbar_height >= self.viewport.height {
            return Err(ConfigError::Invalid(
                "taskbar_height must fit inside the viewport".to_string(),
            ));
        }
        if self.cascade_len == 0 {
            return Err(ConfigError::Invalid("cascade_len must be at least 1".to_string()));
        }
        if self.initial_desktops.is_empty() {
            return Err(ConfigError::Invalid(
                "initial_desktops must name at least one desktop".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = WindowManagerConfig::from_toml_str("").expect("parse");
        assert_eq!(config, WindowManagerConfig::default());
    }

    #[test]
    fn partial_document_overrides_only_named_keys() {
        let config = WindowManagerConfig::from_toml_str(
            r#"
            snap_threshold = 24
            maximize_requires_resizable = false

            [viewport]
            width = 1920
            height = 1080

            [[initial_desktops]]
            name = "Work"

            [[initial_desktops]]
            name = "Play"
            wallpaper_ref = "stars"
            "#,
        )
        .expect("parse");

        assert_eq!(config.snap_threshold, 24);
        assert!(!config.maximize_requires_resizable);
        assert_eq!(config.viewport, Viewport::new(1920, 1080));
        assert_eq!(config.min_window_size, Size::new(200, 150));
        assert_eq!(config.initial_desktops.len(), 2);
        assert_eq!(config.initial_desktops[0].wallpaper_ref, "default");
        assert_eq!(config.initial_desktops[1].wallpaper_ref, "stars");
    }

    #[test]
    fn rejects_empty_desktop_seed_list() {
        let err = WindowManagerConfig::from_toml_str("initial_desktops = []")
            .expect_err("expected validation failure");
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn reports_type_errors_as_parse_failures() {
        let err = WindowManagerConfig::from_toml_str("snap_threshold = \"wide\"")
            .expect_err("expected parse failure");
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
