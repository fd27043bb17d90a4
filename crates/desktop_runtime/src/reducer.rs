//! Reducer actions, side-effect intents, and transition logic for the window manager.
//!
//! [`reduce_desktop`] is the only place window lifecycle, geometry commits, and desktop switching
//! mutate [`DesktopState`]. It never performs I/O: events to publish and window state to persist
//! come back as [`RuntimeEffect`]s for [`crate::runtime_context::DesktopRuntime`] to execute.

use leptos::logging;
use thiserror::Error;

use crate::{
    events::DesktopEvent,
    focus::FocusOutcome,
    interaction::{DragSession, GeometrySession, InteractionState, ResizeSession},
    model::{
        CycleDirection, DesktopId, DesktopSnapshot, DesktopState, FeatureId, OpenWindowRequest,
        PointerPosition, Position, ResizeEdge, Size, Viewport, WindowGeometry, WindowId,
        WindowPatch, WindowRecord, DESKTOP_LAYOUT_SCHEMA_VERSION,
    },
    window_manager::{
        can_drag, can_maximize, can_resize, cascade_position, clamp_size, drag_position,
        resize_from_pointer, GeometryLimits,
    },
};

#[derive(Debug, Clone, PartialEq)]
/// Actions accepted by [`reduce_desktop`] to mutate [`DesktopState`].
pub enum DesktopAction {
    /// Open (or re-focus) a window for a catalog feature.
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
    /// Minimize a window.
    MinimizeWindow {
        /// Window to minimize.
        window_id: WindowId,
    },
    /// Maximize a window into the work area.
    MaximizeWindow {
        /// Window to maximize.
        window_id: WindowId,
    },
    /// Un-minimize a minimized window, otherwise leave maximize/fullscreen.
    RestoreWindow {
        /// Window to restore.
        window_id: WindowId,
    },
    /// Maximize a window, or restore it when already maximized.
    ToggleMaximize {
        /// Window to toggle.
        window_id: WindowId,
    },
    /// Cover the full viewport with a window.
    EnterFullscreen {
        /// Window to make fullscreen.
        window_id: WindowId,
    },
    /// Leave fullscreen, restoring the saved geometry.
    ExitFullscreen {
        /// Window to restore.
        window_id: WindowId,
    },
    /// Enter or leave fullscreen.
    ToggleFullscreen {
        /// Window to toggle.
        window_id: WindowId,
    },
    /// Taskbar button behavior: restore if minimized, minimize if focused, focus otherwise.
    ToggleTaskbarWindow {
        /// Window associated with the taskbar button.
        window_id: WindowId,
    },
    /// Merge a partial state patch into a window.
    UpdateWindow {
        /// Window to update.
        window_id: WindowId,
        /// Fields to merge.
        patch: WindowPatch,
    },
    /// Apply window state loaded from the persistence adapter.
    ApplyWindowSession {
        /// Window the session belongs to.
        window_id: WindowId,
        /// Loaded durable state.
        patch: WindowPatch,
    },
    /// Move a window programmatically.
    MoveWindow {
        /// Window to move.
        window_id: WindowId,
        /// New top-left corner.
        position: Position,
    },
    /// Resize a window programmatically.
    ResizeWindow {
        /// Window to resize.
        window_id: WindowId,
        /// Requested size, clamped to limits.
        size: Size,
    },
    /// Reassign a window to another desktop.
    MoveWindowToDesktop {
        /// Window to move.
        window_id: WindowId,
        /// Target desktop.
        desktop_id: DesktopId,
    },
    /// Begin dragging a window.
    BeginMove {
        /// Window being dragged.
        window_id: WindowId,
        /// Pointer position at drag start.
        pointer: PointerPosition,
    },
    /// Update an in-progress window drag.
    UpdateMove {
        /// Window being dragged.
        window_id: WindowId,
        /// Current pointer position.
        pointer: PointerPosition,
    },
    /// End the window's drag.
    EndMove {
        /// Window being dragged.
        window_id: WindowId,
    },
    /// Begin resizing a window.
    BeginResize {
        /// Window being resized.
        window_id: WindowId,
        /// Edge or corner being dragged.
        edge: ResizeEdge,
        /// Pointer position at resize start.
        pointer: PointerPosition,
    },
    /// Update an in-progress window resize.
    UpdateResize {
        /// Window being resized.
        window_id: WindowId,
        /// Current pointer position.
        pointer: PointerPosition,
    },
    /// End the window's resize.
    EndResize {
        /// Window being resized.
        window_id: WindowId,
    },
    /// End the window's drag or resize, keeping the last computed geometry.
    CancelInteraction {
        /// Window whose session ends.
        window_id: WindowId,
    },
    /// End every drag and resize session.
    CancelAllInteractions,
    /// Update viewport dimensions and re-lay out maximized and fullscreen windows.
    SetViewport {
        /// New viewport size.
        viewport: Viewport,
    },
    /// Append a virtual desktop.
    CreateDesktop {
        /// Display name.
        name: String,
        /// Wallpaper reference.
        wallpaper_ref: String,
    },
    /// Delete a virtual desktop, moving its windows to the fallback desktop.
    RemoveDesktop {
        /// Desktop to delete.
        desktop_id: DesktopId,
    },
    /// Make a desktop active.
    SwitchDesktop {
        /// Desktop to activate.
        desktop_id: DesktopId,
    },
    /// Activate the next or previous desktop, wrapping around.
    CycleDesktop {
        /// Cycle direction.
        direction: CycleDirection,
    },
    /// Rename a desktop.
    RenameDesktop {
        /// Desktop to rename.
        desktop_id: DesktopId,
        /// New name.
        name: String,
    },
    /// Change a desktop's wallpaper reference.
    SetDesktopWallpaper {
        /// Desktop to update.
        desktop_id: DesktopId,
        /// New wallpaper reference.
        wallpaper_ref: String,
    },
    /// Replace runtime state with a persisted layout snapshot.
    HydrateSnapshot {
        /// Snapshot payload to restore.
        snapshot: DesktopSnapshot,
    },
}

#[derive(Debug, Clone, PartialEq)]
/// Side-effect intents emitted by [`reduce_desktop`] for the runtime to execute.
pub enum RuntimeEffect {
    /// Publish an event on the bus.
    Emit(DesktopEvent),
    /// Queue the window's durable state for a debounced save.
    PersistWindow {
        /// Window whose state changed.
        window_id: WindowId,
        /// Durable subset to save.
        state: WindowPatch,
    },
    /// Load the window's persisted session once and apply it.
    LoadWindowSession {
        /// Newly created window.
        window_id: WindowId,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Request-level failures surfaced to the caller. Unknown window and desktop ids are not errors.
pub enum ReducerError {
    /// The only remaining desktop cannot be removed.
    #[error("cannot remove the last desktop")]
    LastDesktop,
    /// The open request named a feature missing from the catalog.
    #[error("unknown feature `{0}`")]
    UnknownFeature(String),
}

/// Applies a [`DesktopAction`] to the desktop runtime state and collects resulting side effects.
///
/// # Errors
///
/// Returns [`ReducerError::UnknownFeature`] for open requests naming an unregistered feature and
/// [`ReducerError::LastDesktop`] when removing the only desktop. State is unchanged in both cases.
pub fn reduce_desktop(
    state: &mut DesktopState,
    interaction: &mut InteractionState,
    action: DesktopAction,
) -> Result<Vec<RuntimeEffect>, ReducerError> {
    let mut effects = Vec::new();
    match action {
        DesktopAction::OpenWindow(request) => {
            let (_, opened) = open_window(state, interaction, request)?;
            effects.extend(opened);
        }
        DesktopAction::CloseWindow { window_id } => {
            close_window(state, interaction, &window_id, &mut effects);
        }
        DesktopAction::FocusWindow { window_id } => {
            if known_window(state, &window_id) {
                focus_window(state, &window_id, &mut effects);
            }
        }
        DesktopAction::MinimizeWindow { window_id } => {
            minimize_window(state, interaction, &window_id, &mut effects);
        }
        DesktopAction::MaximizeWindow { window_id } => {
            maximize_window(state, interaction, &window_id, &mut effects);
        }
        DesktopAction::RestoreWindow { window_id } => {
            restore_window(state, &window_id, &mut effects);
        }
        DesktopAction::ToggleMaximize { window_id } => {
            match state.windows.get(&window_id).map(|w| w.maximized) {
                Some(true) => {
                    leave_geometry_override(state, &window_id, &mut effects);
                    focus_window(state, &window_id, &mut effects);
                }
                Some(false) => maximize_window(state, interaction, &window_id, &mut effects),
                None => {
                    logging::debug_warn!("toggle maximize ignored for unknown window {window_id}");
                }
            }
        }
        DesktopAction::EnterFullscreen { window_id } => {
            enter_fullscreen(state, interaction, &window_id, &mut effects);
        }
        DesktopAction::ExitFullscreen { window_id } => {
            if state.windows.get(&window_id).map(|w| w.fullscreen).unwrap_or(false) {
                leave_geometry_override(state, &window_id, &mut effects);
                focus_window(state, &window_id, &mut effects);
            }
        }
        DesktopAction::ToggleFullscreen { window_id } => {
            match state.windows.get(&window_id).map(|w| w.fullscreen) {
                Some(true) => {
                    leave_geometry_override(state, &window_id, &mut effects);
                    focus_window(state, &window_id, &mut effects);
                }
                Some(false) => enter_fullscreen(state, interaction, &window_id, &mut effects),
                None => {
                    logging::debug_warn!("toggle fullscreen ignored for unknown window {window_id}");
                }
            }
        }
        DesktopAction::ToggleTaskbarWindow { window_id } => {
            let Some(minimized) = state.windows.get(&window_id).map(|w| w.minimized) else {
                logging::debug_warn!("taskbar toggle ignored for unknown window {window_id}");
                return Ok(effects);
            };
            if minimized {
                restore_window(state, &window_id, &mut effects);
            } else if state.focus.is_focused(&window_id) {
                minimize_window(state, interaction, &window_id, &mut effects);
            } else {
                focus_window(state, &window_id, &mut effects);
            }
        }
        DesktopAction::UpdateWindow { window_id, patch } => {
            update_window(state, interaction, &window_id, &patch, true, &mut effects);
        }
        DesktopAction::ApplyWindowSession { window_id, patch } => {
            update_window(state, interaction, &window_id, &patch, false, &mut effects);
        }
        DesktopAction::MoveWindow {
            window_id,
            position,
        } => {
            let Some(window) = state.windows.get_mut(&window_id) else {
                logging::debug_warn!("move ignored for unknown window {window_id}");
                return Ok(effects);
            };
            if can_drag(window) && window.position != position {
                window.position = position;
                effects.push(RuntimeEffect::Emit(DesktopEvent::WindowMoved {
                    window_id: window_id.clone(),
                    position,
                }));
                queue_persist(state, &window_id, &mut effects);
            }
        }
        DesktopAction::ResizeWindow { window_id, size } => {
            let min_size = state.config.min_window_size;
            let viewport = state.config.viewport;
            let Some(window) = state.windows.get_mut(&window_id) else {
                logging::debug_warn!("resize ignored for unknown window {window_id}");
                return Ok(effects);
            };
            let size = clamp_size(size, min_size, viewport);
            if can_resize(window) && window.size != size {
                window.size = size;
                effects.push(RuntimeEffect::Emit(DesktopEvent::WindowResized {
                    window_id: window_id.clone(),
                    geometry: window.geometry(),
                }));
                queue_persist(state, &window_id, &mut effects);
            }
        }
        DesktopAction::MoveWindowToDesktop {
            window_id,
            desktop_id,
        } => {
            move_window_to_desktop(state, interaction, &window_id, desktop_id, &mut effects);
        }
        DesktopAction::BeginMove { window_id, pointer } => {
            let Some(window) = state.windows.get(&window_id) else {
                logging::debug_warn!("drag ignored for unknown window {window_id}");
                return Ok(effects);
            };
            if !can_drag(window) {
                return Ok(effects);
            }
            let session = GeometrySession::Drag(DragSession {
                window_id: window_id.clone(),
                pointer_start: pointer,
                start_position: window.position,
                last_position: window.position,
            });
            if interaction.begin(session) {
                focus_window(state, &window_id, &mut effects);
            }
        }
        DesktopAction::UpdateMove { window_id, pointer } => {
            let limits = geometry_limits(state);
            let (Some(session), Some(window)) =
                (interaction.drag_mut(&window_id), state.windows.get_mut(&window_id))
            else {
                return Ok(effects);
            };
            if can_drag(window) {
                let position = drag_position(
                    session.start_position,
                    session.pointer_start,
                    pointer,
                    window.size,
                    limits,
                );
                window.position = position;
                session.last_position = position;
            }
        }
        DesktopAction::BeginResize {
            window_id,
            edge,
            pointer,
        } => {
            let Some(window) = state.windows.get(&window_id) else {
                logging::debug_warn!("resize ignored for unknown window {window_id}");
                return Ok(effects);
            };
            if !can_resize(window) {
                return Ok(effects);
            }
            let session = GeometrySession::Resize(ResizeSession {
                window_id: window_id.clone(),
                edge,
                pointer_start: pointer,
                start_geometry: window.geometry(),
                last_geometry: window.geometry(),
            });
            if interaction.begin(session) {
                focus_window(state, &window_id, &mut effects);
            }
        }
        DesktopAction::UpdateResize { window_id, pointer } => {
            let limits = geometry_limits(state);
            let (Some(session), Some(window)) =
                (interaction.resize_mut(&window_id), state.windows.get_mut(&window_id))
            else {
                return Ok(effects);
            };
            if can_resize(window) {
                let geometry = resize_from_pointer(
                    session.start_geometry,
                    session.edge,
                    session.pointer_start,
                    pointer,
                    limits,
                );
                window.set_geometry(geometry);
                session.last_geometry = geometry;
            }
        }
        DesktopAction::EndMove { window_id }
        | DesktopAction::EndResize { window_id }
        | DesktopAction::CancelInteraction { window_id } => {
            finish_session(state, interaction, &window_id, &mut effects);
        }
        DesktopAction::CancelAllInteractions => {
            for window_id in interaction.active_windows() {
                finish_session(state, interaction, &window_id, &mut effects);
            }
        }
        DesktopAction::SetViewport { viewport } => {
            set_viewport(state, viewport, &mut effects);
        }
        DesktopAction::CreateDesktop {
            name,
            wallpaper_ref,
        } => {
            let desktop_id = state.desktops.create(name, wallpaper_ref);
            effects.push(RuntimeEffect::Emit(DesktopEvent::DesktopCreated { desktop_id }));
        }
        DesktopAction::RemoveDesktop { desktop_id } => {
            remove_desktop(state, interaction, desktop_id, &mut effects)?;
        }
        DesktopAction::SwitchDesktop { desktop_id } => {
            switch_desktop(state, interaction, desktop_id, &mut effects);
        }
        DesktopAction::CycleDesktop { direction } => {
            let target = state.desktops.neighbor(direction);
            switch_desktop(state, interaction, target, &mut effects);
        }
        DesktopAction::RenameDesktop { desktop_id, name } => {
            if !state.desktops.rename(desktop_id, name) {
                logging::debug_warn!("rename ignored for unknown desktop {desktop_id}");
            }
        }
        DesktopAction::SetDesktopWallpaper {
            desktop_id,
            wallpaper_ref,
        } => {
            if !state.desktops.set_wallpaper(desktop_id, wallpaper_ref) {
                logging::debug_warn!("wallpaper change ignored for unknown desktop {desktop_id}");
            }
        }
        DesktopAction::HydrateSnapshot { snapshot } => {
            if snapshot.schema_version != DESKTOP_LAYOUT_SCHEMA_VERSION {
                logging::warn!(
                    "ignoring desktop snapshot with unsupported schema {}",
                    snapshot.schema_version
                );
                return Ok(effects);
            }
            interaction.end_all();
            *state = DesktopState::from_snapshot(state.config.clone(), state.catalog.clone(), snapshot);
        }
    }

    let active = state.desktops.active_id();
    state.focus.normalize(&state.windows, active);
    Ok(effects)
}

/// Opens a window for `request.feature_id`, returning the window id and resulting effects.
///
/// Single-instance features already open are un-minimized, moved to the requested desktop, and
/// focused instead of duplicated. Moving desktops ends the window's drag or resize.
///
/// # Errors
///
/// Returns [`ReducerError::UnknownFeature`] when the feature is not in the catalog.
pub fn open_window(
    state: &mut DesktopState,
    interaction: &mut InteractionState,
    request: OpenWindowRequest,
) -> Result<(WindowId, Vec<RuntimeEffect>), ReducerError> {
    let Some(feature) = state.catalog.get(&request.feature_id).cloned() else {
        return Err(ReducerError::UnknownFeature(request.feature_id.to_string()));
    };
    let desktop_id = resolve_desktop(state, request.desktop_id);
    let mut effects = Vec::new();

    if feature.single_instance {
        let window_id = WindowId::new(feature.id.as_str());
        if state.windows.contains(&window_id) {
            if reassign_desktop(state, &window_id, desktop_id, &mut effects) {
                interaction.end(&window_id);
            }
            focus_window(state, &window_id, &mut effects);
            let active = state.desktops.active_id();
            state.focus.normalize(&state.windows, active);
            return Ok((window_id, effects));
        }
    }

    let window_id = if feature.single_instance {
        WindowId::new(feature.id.as_str())
    } else {
        next_instance_id(state, &feature.id)
    };
    let config = &state.config;
    let cascade_index = state.windows.windows_on_desktop(desktop_id).count();
    let mut record = WindowRecord {
        id: window_id.clone(),
        feature_id: feature.id.clone(),
        title: feature.title.clone(),
        position: cascade_position(
            config.cascade_origin,
            config.cascade_step,
            config.cascade_len,
            cascade_index,
        ),
        size: clamp_size(feature.default_size, config.min_window_size, config.viewport),
        z_index: 0,
        minimized: false,
        maximized: false,
        fullscreen: false,
        last_known_geometry: None,
        desktop_id,
        pinned: false,
        flags: feature.flags,
        opacity: 1.0,
        always_on_top: false,
    };
    if let Some(patch) = &request.custom_state {
        patch.apply_to(&mut record);
        record.size = clamp_size(record.size, config.min_window_size, config.viewport);
    }
    record.z_index = state.focus.allocate_z();
    let minimized = record.minimized;
    state.windows.insert(record);

    effects.push(RuntimeEffect::Emit(DesktopEvent::WindowOpened {
        window_id: window_id.clone(),
        desktop_id,
    }));
    if !minimized {
        focus_window(state, &window_id, &mut effects);
    }
    if feature.persist_session {
        effects.push(RuntimeEffect::LoadWindowSession {
            window_id: window_id.clone(),
        });
    }
    let active = state.desktops.active_id();
    state.focus.normalize(&state.windows, active);
    Ok((window_id, effects))
}

fn geometry_limits(state: &DesktopState) -> GeometryLimits {
    GeometryLimits {
        min_size: state.config.min_window_size,
        viewport: state.config.viewport,
        snap_threshold: state.config.snap_threshold,
    }
}

fn known_window(state: &DesktopState, window_id: &WindowId) -> bool {
    if state.windows.contains(window_id) {
        true
    } else {
        logging::debug_warn!("action ignored for unknown window {window_id}");
        false
    }
}

fn resolve_desktop(state: &DesktopState, requested: Option<DesktopId>) -> DesktopId {
    match requested {
        Some(desktop_id) if state.desktops.contains(desktop_id) => desktop_id,
        Some(desktop_id) => {
            logging::debug_warn!("open requested unknown desktop {desktop_id}; using active");
            state.desktops.active_id()
        }
        None => state.desktops.active_id(),
    }
}

fn next_instance_id(state: &mut DesktopState, feature_id: &FeatureId) -> WindowId {
    loop {
        let candidate = WindowId::new(format!("{feature_id}#{}", state.next_instance_id));
        state.next_instance_id = state.next_instance_id.saturating_add(1);
        if !state.windows.contains(&candidate) {
            return candidate;
        }
    }
}

fn persists_session(state: &DesktopState, window: &WindowRecord) -> bool {
    state
        .catalog
        .get(&window.feature_id)
        .map(|feature| feature.persist_session)
        .unwrap_or(false)
}

fn queue_persist(state: &DesktopState, window_id: &WindowId, effects: &mut Vec<RuntimeEffect>) {
    if let Some(window) = state.windows.get(window_id) {
        if persists_session(state, window) {
            effects.push(RuntimeEffect::PersistWindow {
                window_id: window_id.clone(),
                state: window.durable_state(),
            });
        }
    }
}

fn focus_window(state: &mut DesktopState, window_id: &WindowId, effects: &mut Vec<RuntimeEffect>) {
    let active = state.desktops.active_id();
    if let FocusOutcome::Changed {
        restored, focused, ..
    } = state.focus.focus(&mut state.windows, active, window_id)
    {
        if restored {
            effects.push(RuntimeEffect::Emit(DesktopEvent::WindowRestored {
                window_id: window_id.clone(),
            }));
        }
        if focused {
            effects.push(RuntimeEffect::Emit(DesktopEvent::WindowFocused {
                window_id: window_id.clone(),
            }));
        }
    }
}

fn close_window(
    state: &mut DesktopState,
    interaction: &mut InteractionState,
    window_id: &WindowId,
    effects: &mut Vec<RuntimeEffect>,
) {
    let Some(window) = state.windows.remove(window_id) else {
        logging::debug_warn!("close ignored for unknown window {window_id}");
        return;
    };
    interaction.end(window_id);
    state.focus.clear_if(window_id);
    if persists_session(state, &window) {
        effects.push(RuntimeEffect::PersistWindow {
            window_id: window_id.clone(),
            state: window.durable_state(),
        });
    }
    effects.push(RuntimeEffect::Emit(DesktopEvent::WindowClosed {
        window_id: window_id.clone(),
        desktop_id: window.desktop_id,
    }));
}

fn minimize_window(
    state: &mut DesktopState,
    interaction: &mut InteractionState,
    window_id: &WindowId,
    effects: &mut Vec<RuntimeEffect>,
) {
    let Some(window) = state.windows.get_mut(window_id) else {
        logging::debug_warn!("minimize ignored for unknown window {window_id}");
        return;
    };
    if window.minimized {
        return;
    }
    window.minimized = true;
    interaction.end(window_id);
    state.focus.clear_if(window_id);
    effects.push(RuntimeEffect::Emit(DesktopEvent::WindowMinimized {
        window_id: window_id.clone(),
    }));
}

fn restore_window(state: &mut DesktopState, window_id: &WindowId, effects: &mut Vec<RuntimeEffect>) {
    let Some(window) = state.windows.get(window_id) else {
        logging::debug_warn!("restore ignored for unknown window {window_id}");
        return;
    };
    // A minimized window comes back in whatever mode it was minimized from.
    if !window.minimized && window.has_geometry_override() {
        leave_geometry_override(state, window_id, effects);
    }
    focus_window(state, window_id, effects);
}

fn maximize_window(
    state: &mut DesktopState,
    interaction: &mut InteractionState,
    window_id: &WindowId,
    effects: &mut Vec<RuntimeEffect>,
) {
    let requires_resizable = state.config.maximize_requires_resizable;
    let Some(window) = state.windows.get(window_id) else {
        logging::debug_warn!("maximize ignored for unknown window {window_id}");
        return;
    };
    if window.maximized || !can_maximize(window.flags, requires_resizable) {
        return;
    }
    if window.fullscreen {
        leave_geometry_override(state, window_id, effects);
    }
    let work_area = state
        .config
        .viewport
        .work_area(state.config.taskbar_height);
    if let Some(window) = state.windows.get_mut(window_id) {
        window.last_known_geometry = Some(window.geometry());
        window.set_geometry(work_area);
        window.maximized = true;
    }
    interaction.end(window_id);
    effects.push(RuntimeEffect::Emit(DesktopEvent::WindowMaximized {
        window_id: window_id.clone(),
        maximized: true,
    }));
    focus_window(state, window_id, effects);
}

fn enter_fullscreen(
    state: &mut DesktopState,
    interaction: &mut InteractionState,
    window_id: &WindowId,
    effects: &mut Vec<RuntimeEffect>,
) {
    let requires_resizable = state.config.maximize_requires_resizable;
    let Some(window) = state.windows.get(window_id) else {
        logging::debug_warn!("fullscreen ignored for unknown window {window_id}");
        return;
    };
    if window.fullscreen || !can_maximize(window.flags, requires_resizable) {
        return;
    }
    if window.maximized {
        leave_geometry_override(state, window_id, effects);
    }
    let full_area = state.config.viewport.full_area();
    if let Some(window) = state.windows.get_mut(window_id) {
        window.last_known_geometry = Some(window.geometry());
        window.set_geometry(full_area);
        window.fullscreen = true;
    }
    interaction.end(window_id);
    effects.push(RuntimeEffect::Emit(DesktopEvent::WindowFullscreened {
        window_id: window_id.clone(),
        fullscreen: true,
    }));
    focus_window(state, window_id, effects);
}

/// Writes back the geometry saved before maximize/fullscreen and clears both modes.
fn leave_geometry_override(
    state: &mut DesktopState,
    window_id: &WindowId,
    effects: &mut Vec<RuntimeEffect>,
) {
    let Some(window) = state.windows.get_mut(window_id) else {
        return;
    };
    if let Some(geometry) = window.last_known_geometry.take() {
        window.set_geometry(geometry);
    }
    if window.maximized {
        window.maximized = false;
        effects.push(RuntimeEffect::Emit(DesktopEvent::WindowMaximized {
            window_id: window_id.clone(),
            maximized: false,
        }));
    }
    if window.fullscreen {
        window.fullscreen = false;
        effects.push(RuntimeEffect::Emit(DesktopEvent::WindowFullscreened {
            window_id: window_id.clone(),
            fullscreen: false,
        }));
    }
}

fn update_window(
    state: &mut DesktopState,
    interaction: &mut InteractionState,
    window_id: &WindowId,
    patch: &WindowPatch,
    persist: bool,
    effects: &mut Vec<RuntimeEffect>,
) {
    let min_size = state.config.min_window_size;
    let viewport = state.config.viewport;
    let Some(window) = state.windows.get_mut(window_id) else {
        logging::debug_warn!("update ignored for unknown window {window_id}");
        return;
    };
    let before = window.clone();

    let mut patch = patch.clone();
    // Maximized and fullscreen geometry is derived from the viewport; patches update the
    // geometry restored afterwards.
    if window.has_geometry_override() && patch.touches_geometry() {
        if let Some(saved) = window.last_known_geometry.as_mut() {
            let mut shadow = before.clone();
            shadow.set_geometry(*saved);
            WindowPatch {
                position: patch.position,
                size: patch.size,
                ..WindowPatch::default()
            }
            .apply_to(&mut shadow);
            shadow.size = clamp_size(shadow.size, min_size, viewport);
            *saved = shadow.geometry();
        }
        patch.position = None;
        patch.size = None;
    }
    state.windows.update(window_id, &patch);
    let Some(window) = state.windows.get_mut(window_id) else {
        return;
    };
    window.size = clamp_size(window.size, min_size, viewport);

    let after = window.clone();
    if before.minimized != after.minimized {
        // Route visibility changes through the lifecycle so focus and events stay consistent.
        if let Some(window) = state.windows.get_mut(window_id) {
            window.minimized = before.minimized;
        }
        if after.minimized {
            minimize_window(state, interaction, window_id, effects);
        } else {
            focus_window(state, window_id, effects);
        }
    }
    if before.position != after.position {
        effects.push(RuntimeEffect::Emit(DesktopEvent::WindowMoved {
            window_id: window_id.clone(),
            position: after.position,
        }));
    }
    if before.size != after.size {
        effects.push(RuntimeEffect::Emit(DesktopEvent::WindowResized {
            window_id: window_id.clone(),
            geometry: after.geometry(),
        }));
    }
    if persist && before.durable_state() != after.durable_state() {
        queue_persist(state, window_id, effects);
    }
}

/// Closes the window's drag or resize session and reports the committed geometry.
fn finish_session(
    state: &mut DesktopState,
    interaction: &mut InteractionState,
    window_id: &WindowId,
    effects: &mut Vec<RuntimeEffect>,
) {
    let Some(session) = interaction.end(window_id) else {
        return;
    };
    let Some(window) = state.windows.get(window_id) else {
        return;
    };
    let changed = match session {
        GeometrySession::Drag(drag) => {
            let moved = window.position != drag.start_position;
            if moved {
                effects.push(RuntimeEffect::Emit(DesktopEvent::WindowMoved {
                    window_id: window_id.clone(),
                    position: window.position,
                }));
            }
            moved
        }
        GeometrySession::Resize(resize) => {
            let resized = window.geometry() != resize.start_geometry;
            if resized {
                effects.push(RuntimeEffect::Emit(DesktopEvent::WindowResized {
                    window_id: window_id.clone(),
                    geometry: window.geometry(),
                }));
            }
            resized
        }
    };
    if changed {
        queue_persist(state, window_id, effects);
    }
}

fn set_viewport(state: &mut DesktopState, viewport: Viewport, effects: &mut Vec<RuntimeEffect>) {
    if viewport.width <= 0 || viewport.height <= 0 {
        logging::debug_warn!("ignoring empty viewport {}x{}", viewport.width, viewport.height);
        return;
    }
    state.config.viewport = viewport;
    let work_area = viewport.work_area(state.config.taskbar_height);
    let full_area = viewport.full_area();
    for window in state.windows.iter_mut() {
        let target: Option<WindowGeometry> = if window.fullscreen {
            Some(full_area)
        } else if window.maximized {
            Some(work_area)
        } else {
            None
        };
        if let Some(geometry) = target.filter(|g| *g != window.geometry()) {
            window.set_geometry(geometry);
            effects.push(RuntimeEffect::Emit(DesktopEvent::WindowResized {
                window_id: window.id.clone(),
                geometry,
            }));
        }
    }
}

/// Moves a window's desktop membership without changing focus. Returns whether it moved.
fn reassign_desktop(
    state: &mut DesktopState,
    window_id: &WindowId,
    desktop_id: DesktopId,
    effects: &mut Vec<RuntimeEffect>,
) -> bool {
    let Some(window) = state.windows.get_mut(window_id) else {
        return false;
    };
    let from = window.desktop_id;
    if from == desktop_id {
        return false;
    }
    window.desktop_id = desktop_id;
    effects.push(RuntimeEffect::Emit(DesktopEvent::WindowDesktopChanged {
        window_id: window_id.clone(),
        from,
        to: desktop_id,
    }));
    true
}

fn move_window_to_desktop(
    state: &mut DesktopState,
    interaction: &mut InteractionState,
    window_id: &WindowId,
    desktop_id: DesktopId,
    effects: &mut Vec<RuntimeEffect>,
) {
    if !known_window(state, window_id) {
        return;
    }
    if !state.desktops.contains(desktop_id) {
        logging::debug_warn!("move ignored for unknown desktop {desktop_id}");
        return;
    }
    if reassign_desktop(state, window_id, desktop_id, effects) {
        interaction.end(window_id);
        state.focus.clear_if(window_id);
        let minimized = state.windows.get(window_id).map(|w| w.minimized).unwrap_or(true);
        if !minimized {
            focus_window(state, window_id, effects);
        }
    }
}

fn switch_desktop(
    state: &mut DesktopState,
    interaction: &mut InteractionState,
    desktop_id: DesktopId,
    effects: &mut Vec<RuntimeEffect>,
) {
    let from = state.desktops.active_id();
    if !state.desktops.set_active(desktop_id) {
        return;
    }
    for window_id in interaction.active_windows() {
        finish_session(state, interaction, &window_id, effects);
    }
    effects.push(RuntimeEffect::Emit(DesktopEvent::DesktopSwitched {
        from,
        to: desktop_id,
    }));
    if let Some(window_id) = state.focus.refocus_top(&state.windows, desktop_id) {
        effects.push(RuntimeEffect::Emit(DesktopEvent::WindowFocused { window_id }));
    }
}

fn remove_desktop(
    state: &mut DesktopState,
    interaction: &mut InteractionState,
    desktop_id: DesktopId,
    effects: &mut Vec<RuntimeEffect>,
) -> Result<(), ReducerError> {
    let Some(fallback) = state.desktops.fallback_for(desktop_id)? else {
        logging::debug_warn!("remove ignored for unknown desktop {desktop_id}");
        return Ok(());
    };
    let previous_active = state.desktops.active_id();

    let mut reassigned = Vec::new();
    for window in state.windows.iter_mut() {
        if window.desktop_id == desktop_id {
            window.desktop_id = fallback;
            reassigned.push(window.id.clone());
        }
    }
    state.desktops.remove(desktop_id)?;
    effects.push(RuntimeEffect::Emit(DesktopEvent::DesktopRemoved {
        desktop_id,
        fallback,
        reassigned,
    }));

    let active = state.desktops.active_id();
    if active != previous_active {
        for window_id in interaction.active_windows() {
            finish_session(state, interaction, &window_id, effects);
        }
        effects.push(RuntimeEffect::Emit(DesktopEvent::DesktopSwitched {
            from: previous_active,
            to: active,
        }));
        if let Some(window_id) = state.focus.refocus_top(&state.windows, active) {
            effects.push(RuntimeEffect::Emit(DesktopEvent::WindowFocused { window_id }));
        }
    }
    Ok(())
}
