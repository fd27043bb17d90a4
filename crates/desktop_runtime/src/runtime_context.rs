//! Runtime owner for the window manager.
//!
//! [`DesktopRuntime`] holds the reducer state, interaction sessions, event bus, and persistence
//! queue for one desktop. It is constructed explicitly by the host; nothing here is global.
//! Dispatching an action runs [`reduce_desktop`] and then executes the returned effects in order:
//! events are published on the bus, window saves are queued, and session loads are recorded for
//! [`DesktopRuntime::hydrate_pending_sessions`].

use std::rc::Rc;

use leptos::logging;
use platform_host::{unix_time_ms_now, NoopWindowStateStore, WindowStateStore};

use crate::{
    config::WindowManagerConfig,
    events::EventBus,
    features::FeatureCatalog,
    hotkeys::{desktop_hotkey_action, KeyChord},
    interaction::{InteractionState, ListenerRegistry},
    model::{DesktopState, OpenWindowRequest, WindowId},
    persistence::{
        load_layout_snapshot, load_window_session, save_batch, save_layout_snapshot,
        PersistenceQueue,
    },
    reducer::{open_window, reduce_desktop, DesktopAction, ReducerError, RuntimeEffect},
};

pub struct DesktopRuntime {
    state: DesktopState,
    interaction: InteractionState,
    bus: EventBus,
    store: Rc<dyn WindowStateStore>,
    persistence: PersistenceQueue,
    pending_session_loads: Vec<WindowId>,
}

impl Default for DesktopRuntime {
    fn default() -> Self {
        Self::new(
            WindowManagerConfig::default(),
            FeatureCatalog::builtin(),
            Rc::new(NoopWindowStateStore),
        )
    }
}

impl std::fmt::Debug for DesktopRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopRuntime")
            .field("state", &self.state)
            .field("interaction", &self.interaction)
            .field("bus", &self.bus)
            .field("persistence", &self.persistence)
            .field("pending_session_loads", &self.pending_session_loads)
            .finish_non_exhaustive()
    }
}

impl DesktopRuntime {
    pub fn new(
        config: WindowManagerConfig,
        catalog: FeatureCatalog,
        store: Rc<dyn WindowStateStore>,
    ) -> Self {
        let persistence = PersistenceQueue::new(config.persist_debounce_ms);
        Self {
            state: DesktopState::new(config, catalog),
            interaction: InteractionState::new(ListenerRegistry::default()),
            bus: EventBus::new(),
            store,
            persistence,
            pending_session_loads: Vec::new(),
        }
    }

    pub fn state(&self) -> &DesktopState {
        &self.state
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn listener_registry(&self) -> &ListenerRegistry {
        self.interaction.registry()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn pending_persistence(&self) -> &PersistenceQueue {
        &self.persistence
    }

    /// Windows whose persisted session has been requested but not yet loaded.
    pub fn pending_session_loads(&self) -> &[WindowId] {
        &self.pending_session_loads
    }

    /// Applies `action` using the wall clock for persistence deadlines.
    ///
    /// # Errors
    ///
    /// Propagates [`ReducerError`]; state is unchanged and no effects run in that case.
    pub fn dispatch(&mut self, action: DesktopAction) -> Result<(), ReducerError> {
        self.dispatch_at(action, unix_time_ms_now())
    }

    /// Applies `action`, stamping queued saves relative to `now_ms`.
    ///
    /// # Errors
    ///
    /// Propagates [`ReducerError`]; state is unchanged and no effects run in that case.
    pub fn dispatch_at(&mut self, action: DesktopAction, now_ms: u64) -> Result<(), ReducerError> {
        let effects = reduce_desktop(&mut self.state, &mut self.interaction, action)?;
        self.run_effects(effects, now_ms);
        Ok(())
    }

    /// Opens a window and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ReducerError::UnknownFeature`] when the feature is not registered.
    pub fn open_window(&mut self, request: OpenWindowRequest) -> Result<WindowId, ReducerError> {
        let (window_id, effects) = open_window(&mut self.state, &mut self.interaction, request)?;
        self.run_effects(effects, unix_time_ms_now());
        Ok(window_id)
    }

    /// Opens a window and, for session-persisting features, applies its saved state before
    /// returning.
    ///
    /// # Errors
    ///
    /// Returns [`ReducerError::UnknownFeature`] when the feature is not registered.
    pub async fn open_window_with_session(
        &mut self,
        request: OpenWindowRequest,
    ) -> Result<WindowId, ReducerError> {
        let window_id = self.open_window(request)?;
        self.hydrate_pending_sessions().await;
        Ok(window_id)
    }

    /// Loads every requested window session once and applies the ones found.
    ///
    /// Returns how many sessions were applied. Windows closed before their load completes are
    /// skipped.
    pub async fn hydrate_pending_sessions(&mut self) -> usize {
        let store = Rc::clone(&self.store);
        let mut applied = 0;
        for window_id in std::mem::take(&mut self.pending_session_loads) {
            let Some(patch) = load_window_session(store.as_ref(), &window_id).await else {
                continue;
            };
            if !self.state.windows.contains(&window_id) {
                continue;
            }
            match self.dispatch(DesktopAction::ApplyWindowSession { window_id, patch }) {
                Ok(()) => applied += 1,
                Err(err) => logging::warn!("window session apply failed: {err}"),
            }
        }
        applied
    }

    /// Saves queued window states whose debounce deadline has passed. Returns the failure count.
    pub async fn flush_persistence(&mut self, now_ms: u64) -> usize {
        let due = self.persistence.take_due(now_ms);
        if due.is_empty() {
            return 0;
        }
        save_batch(self.store.as_ref(), &due).await
    }

    /// Saves every queued window state regardless of deadline. Returns the failure count.
    pub async fn flush_all_persistence(&mut self) -> usize {
        let all = self.persistence.take_all();
        if all.is_empty() {
            return 0;
        }
        save_batch(self.store.as_ref(), &all).await
    }

    /// Writes the current desktop layout snapshot to the store.
    ///
    /// # Errors
    ///
    /// Returns the store's error message when the write fails.
    pub async fn save_layout(&self) -> Result<(), String> {
        save_layout_snapshot(self.store.as_ref(), &self.state.snapshot()).await
    }

    /// Replaces state with the stored layout snapshot, if one exists. Returns whether it did.
    pub async fn restore_layout(&mut self) -> bool {
        let Some(snapshot) = load_layout_snapshot(self.store.as_ref()).await else {
            return false;
        };
        match self.dispatch(DesktopAction::HydrateSnapshot { snapshot }) {
            Ok(()) => true,
            Err(err) => {
                logging::warn!("desktop layout restore failed: {err}");
                false
            }
        }
    }

    /// Routes a key press through the desktop hotkeys. Returns whether the key was consumed.
    ///
    /// `Escape` is only consumed while a drag or resize is in progress.
    pub fn handle_key(&mut self, chord: &KeyChord, text_input_focused: bool) -> bool {
        let Some(action) = desktop_hotkey_action(
            chord,
            text_input_focused,
            self.state.config.desktop_switch_modifiers,
        ) else {
            return false;
        };
        if action == DesktopAction::CancelAllInteractions && self.interaction.is_empty() {
            return false;
        }
        if let Err(err) = self.dispatch(action) {
            logging::warn!("hotkey action failed: {err}");
        }
        true
    }

    fn run_effects(&mut self, effects: Vec<RuntimeEffect>, now_ms: u64) {
        for effect in effects {
            match effect {
                RuntimeEffect::Emit(event) => {
                    self.bus.publish(event);
                }
                RuntimeEffect::PersistWindow { window_id, state } => {
                    self.persistence.enqueue(window_id, state, now_ms);
                }
                RuntimeEffect::LoadWindowSession { window_id } => {
                    if !self.pending_session_loads.contains(&window_id) {
                        self.pending_session_loads.push(window_id);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::executor::block_on;
    use platform_host::MemoryWindowStateStore;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        events::{DesktopEvent, DesktopEventKind},
        hotkeys::ModifierSet,
        model::{PointerPosition, Position, WindowPatch},
    };

    fn runtime_with(store: MemoryWindowStateStore) -> DesktopRuntime {
        DesktopRuntime::new(
            WindowManagerConfig::default(),
            FeatureCatalog::builtin(),
            Rc::new(store),
        )
    }

    #[test]
    fn dispatch_publishes_events_to_subscribers() {
        let mut runtime = DesktopRuntime::default();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let _subscription = runtime.bus().subscribe_kind(DesktopEventKind::WindowOpened, move |e| {
            sink.borrow_mut().push(e.event.clone());
        });

        let id = runtime
            .open_window(OpenWindowRequest::new("paint"))
            .expect("open");

        assert_eq!(
            *seen.borrow(),
            vec![DesktopEvent::WindowOpened {
                window_id: id,
                desktop_id: runtime.state().active_desktop_id(),
            }]
        );
    }

    #[test]
    fn geometry_commits_are_debounced_into_the_store() {
        let store = MemoryWindowStateStore::default();
        let mut runtime = runtime_with(store.clone());
        let id = runtime
            .open_window(OpenWindowRequest::new("terminal"))
            .expect("open");

        runtime
            .dispatch_at(
                DesktopAction::MoveWindow {
                    window_id: id.clone(),
                    position: Position::new(300, 200),
                },
                1_000,
            )
            .expect("move");
        runtime
            .dispatch_at(
                DesktopAction::MoveWindow {
                    window_id: id.clone(),
                    position: Position::new(310, 210),
                },
                1_100,
            )
            .expect("move");

        assert_eq!(block_on(runtime.flush_persistence(1_200)), 0);
        assert!(store.window_ids().is_empty());

        assert_eq!(block_on(runtime.flush_persistence(1_500)), 0);
        assert_eq!(store.window_ids(), vec!["terminal".to_string()]);
        let saved: WindowPatch = serde_json::from_value(
            store.envelope("terminal").expect("envelope").payload,
        )
        .expect("decode");
        assert_eq!(saved.position, WindowPatch::at(310, 210).position);
    }

    #[test]
    fn open_with_session_applies_saved_geometry_once() {
        let store = MemoryWindowStateStore::default();
        let mut first = runtime_with(store.clone());
        let id = first
            .open_window(OpenWindowRequest::new("notepad"))
            .expect("open");
        first
            .dispatch(DesktopAction::ResizeWindow {
                window_id: id.clone(),
                size: crate::model::Size::new(500, 400),
            })
            .expect("resize");
        first
            .dispatch(DesktopAction::CloseWindow { window_id: id })
            .expect("close");
        assert_eq!(block_on(first.flush_all_persistence()), 0);

        let mut second = runtime_with(store);
        let id = block_on(second.open_window_with_session(OpenWindowRequest::new("notepad")))
            .expect("open");

        assert_eq!(id, WindowId::from("notepad#1"));
        let window = second.state().windows.get(&id).expect("window");
        assert_eq!(window.size, crate::model::Size::new(500, 400));
        assert!(second.pending_session_loads().is_empty());
        assert!(second.pending_persistence().is_empty());
    }

    #[test]
    fn escape_is_consumed_only_while_interacting() {
        let mut runtime = DesktopRuntime::default();
        let id = runtime
            .open_window(OpenWindowRequest::new("explorer"))
            .expect("open");
        let escape = KeyChord::new("Escape");

        assert!(!runtime.handle_key(&escape, false));

        runtime
            .dispatch(DesktopAction::BeginMove {
                window_id: id,
                pointer: PointerPosition::new(0, 0),
            })
            .expect("begin");
        assert_eq!(runtime.listener_registry().active_count(), 4);

        assert!(runtime.handle_key(&escape, false));
        assert_eq!(runtime.listener_registry().active_count(), 0);
    }

    #[test]
    fn desktop_hotkeys_cycle_and_respect_text_focus() {
        let mut runtime = DesktopRuntime::default();
        runtime
            .dispatch(DesktopAction::CreateDesktop {
                name: "Two".to_string(),
                wallpaper_ref: "default".to_string(),
            })
            .expect("create");
        let first = runtime.state().active_desktop_id();
        let next = KeyChord::new("ArrowRight").with_modifiers(ModifierSet::ctrl_meta());

        assert!(!runtime.handle_key(&next, true));
        assert_eq!(runtime.state().active_desktop_id(), first);

        assert!(runtime.handle_key(&next, false));
        assert_ne!(runtime.state().active_desktop_id(), first);
    }

    #[test]
    fn layout_save_and_restore_round_trips() {
        let store = MemoryWindowStateStore::default();
        let mut first = runtime_with(store.clone());
        let id = first
            .open_window(OpenWindowRequest::new("explorer"))
            .expect("open");
        block_on(first.save_layout()).expect("save layout");

        let mut second = runtime_with(store);
        assert!(block_on(second.restore_layout()));
        assert!(second.state().windows.contains(&id));
        assert_eq!(second.state().focused_window_id(), Some(&id));
    }
}
