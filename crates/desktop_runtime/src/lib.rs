//! Window-manager runtime for the browser desktop shell.
//!
//! Windows and virtual desktops live in entity stores inside [`DesktopState`]; every mutation goes
//! through [`reduce_desktop`], and [`DesktopRuntime`] executes the resulting effects (event bus,
//! debounced persistence, session loads).

pub mod config;
pub mod desktop_store;
pub mod events;
pub mod features;
pub mod focus;
pub mod hotkeys;
pub mod interaction;
pub mod model;
pub mod persistence;
pub mod reducer;
pub mod runtime_context;
pub mod window_manager;
pub mod window_store;

pub use config::{ConfigError, DesktopSeed, WindowManagerConfig};
pub use events::{DesktopEvent, DesktopEventKind, EventBus, EventEnvelope, Subscription};
pub use features::{FeatureCatalog, FeatureDescriptor};
pub use hotkeys::{desktop_hotkey_action, KeyChord, ModifierSet};
pub use interaction::{CaptureListener, InteractionState, ListenerRegistry};
pub use model::*;
pub use persistence::PersistenceQueue;
pub use reducer::{open_window, reduce_desktop, DesktopAction, ReducerError, RuntimeEffect};
pub use runtime_context::DesktopRuntime;
