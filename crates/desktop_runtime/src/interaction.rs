//! Modal pointer-capture sessions for window drag and resize.
//!
//! Beginning a drag or resize opens a [`CaptureSession`] for that window. The session registers
//! global pointer-move, pointer-up, pointer-cancel, and key-down listeners in the
//! [`ListenerRegistry`] and holds a [`CaptureGuard`] for each; ending, cancelling, or dropping the
//! session releases all of them. Hosts mirror the registry onto real DOM listeners.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fmt,
    rc::{Rc, Weak},
};

use crate::model::{PointerPosition, Position, ResizeEdge, WindowGeometry, WindowId};

/// Global listener kinds a capture session owns while active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CaptureListener {
    PointerMove,
    PointerUp,
    PointerCancel,
    KeyDown,
}

const SESSION_LISTENERS: [CaptureListener; 4] = [
    CaptureListener::PointerMove,
    CaptureListener::PointerUp,
    CaptureListener::PointerCancel,
    CaptureListener::KeyDown,
];

#[derive(Default)]
struct ListenerTable {
    next_id: u64,
    active: BTreeMap<u64, (WindowId, CaptureListener)>,
}

/// Shared table of currently registered global listeners.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Rc<RefCell<ListenerTable>>,
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("active", &self.active_count())
            .finish()
    }
}

impl ListenerRegistry {
    /// Registers a listener on behalf of `window_id`. The returned guard deregisters it on drop.
    pub fn register(&self, window_id: &WindowId, listener: CaptureListener) -> CaptureGuard {
        let mut table = self.inner.borrow_mut();
        table.next_id = table.next_id.saturating_add(1);
        let id = table.next_id;
        table.active.insert(id, (window_id.clone(), listener));
        CaptureGuard {
            table: Rc::downgrade(&self.inner),
            id,
        }
    }

    pub fn active_count(&self) -> usize {
        self.inner.borrow().active.len()
    }

    /// Listener kinds currently registered for `window_id`, sorted.
    pub fn active_for(&self, window_id: &WindowId) -> Vec<CaptureListener> {
        let mut listeners = self
            .inner
            .borrow()
            .active
            .values()
            .filter(|(owner, _)| owner == window_id)
            .map(|(_, listener)| *listener)
            .collect::<Vec<_>>();
        listeners.sort();
        listeners
    }
}

/// Registration handle for one global listener.
pub struct CaptureGuard {
    table: Weak<RefCell<ListenerTable>>,
    id: u64,
}

impl fmt::Debug for CaptureGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureGuard").field("id", &self.id).finish()
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if let Some(table) = self.table.upgrade() {
            table.borrow_mut().active.remove(&self.id);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub window_id: WindowId,
    pub pointer_start: PointerPosition,
    pub start_position: Position,
    pub last_position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeSession {
    pub window_id: WindowId,
    pub edge: ResizeEdge,
    pub pointer_start: PointerPosition,
    pub start_geometry: WindowGeometry,
    pub last_geometry: WindowGeometry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometrySession {
    Drag(DragSession),
    Resize(ResizeSession),
}

impl GeometrySession {
    pub fn window_id(&self) -> &WindowId {
        match self {
            Self::Drag(session) => &session.window_id,
            Self::Resize(session) => &session.window_id,
        }
    }
}

/// An in-progress geometry operation plus the listener registrations it owns.
#[derive(Debug)]
pub struct CaptureSession {
    pub session: GeometrySession,
    listeners: Vec<CaptureGuard>,
}

/// Per-window drag/resize sessions. At most one session exists per window; sessions on different
/// windows are independent.
#[derive(Debug, Default)]
pub struct InteractionState {
    registry: ListenerRegistry,
    sessions: BTreeMap<WindowId, CaptureSession>,
}

impl InteractionState {
    pub fn new(registry: ListenerRegistry) -> Self {
        Self {
            registry,
            sessions: BTreeMap::new(),
        }
    }

    pub fn registry(&self) -> &ListenerRegistry {
        &self.registry
    }

    pub fn is_active(&self, window_id: &WindowId) -> bool {
        self.sessions.contains_key(window_id)
    }

    pub fn session(&self, window_id: &WindowId) -> Option<&GeometrySession> {
        self.sessions.get(window_id).map(|capture| &capture.session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn active_windows(&self) -> Vec<WindowId> {
        self.sessions.keys().cloned().collect()
    }

    /// Opens a capture session. Refused (returns `false`) while the window already has one.
    pub fn begin(&mut self, session: GeometrySession) -> bool {
        let window_id = session.window_id().clone();
        if self.sessions.contains_key(&window_id) {
            return false;
        }
        let listeners = SESSION_LISTENERS
            .iter()
            .map(|listener| self.registry.register(&window_id, *listener))
            .collect();
        self.sessions.insert(window_id, CaptureSession { session, listeners });
        true
    }

    pub fn drag_mut(&mut self, window_id: &WindowId) -> Option<&mut DragSession> {
        match self.sessions.get_mut(window_id).map(|capture| &mut capture.session) {
            Some(GeometrySession::Drag(session)) => Some(session),
            _ => None,
        }
    }

    pub fn resize_mut(&mut self, window_id: &WindowId) -> Option<&mut ResizeSession> {
        match self.sessions.get_mut(window_id).map(|capture| &mut capture.session) {
            Some(GeometrySession::Resize(session)) => Some(session),
            _ => None,
        }
    }

    /// Closes the window's session and releases its listeners.
    pub fn end(&mut self, window_id: &WindowId) -> Option<GeometrySession> {
        let CaptureSession { session, listeners } = self.sessions.remove(window_id)?;
        drop(listeners);
        Some(session)
    }

    /// Closes every session, returning them in window-id order.
    pub fn end_all(&mut self) -> Vec<GeometrySession> {
        std::mem::take(&mut self.sessions)
            .into_values()
            .map(|capture| capture.session)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn drag(id: &str) -> GeometrySession {
        GeometrySession::Drag(DragSession {
            window_id: WindowId::from(id),
            pointer_start: PointerPosition::new(0, 0),
            start_position: Position::new(10, 10),
            last_position: Position::new(10, 10),
        })
    }

    #[test]
    fn begin_registers_listeners_and_end_releases_them() {
        let mut interaction = InteractionState::default();
        assert!(interaction.begin(drag("a")));
        assert_eq!(interaction.registry().active_count(), 4);
        assert_eq!(
            interaction.registry().active_for(&WindowId::from("a")),
            SESSION_LISTENERS.to_vec()
        );

        let ended = interaction.end(&WindowId::from("a"));
        assert_eq!(ended, Some(drag("a")));
        assert_eq!(interaction.registry().active_count(), 0);
    }

    #[test]
    fn second_session_for_same_window_is_refused() {
        let mut interaction = InteractionState::default();
        assert!(interaction.begin(drag("a")));
        assert!(!interaction.begin(drag("a")));
        assert_eq!(interaction.registry().active_count(), 4);
    }

    #[test]
    fn sessions_on_different_windows_are_independent() {
        let mut interaction = InteractionState::default();
        assert!(interaction.begin(drag("a")));
        assert!(interaction.begin(drag("b")));
        assert_eq!(interaction.len(), 2);

        interaction.end(&WindowId::from("a"));
        assert!(interaction.is_active(&WindowId::from("b")));
        assert_eq!(interaction.registry().active_count(), 4);
    }

    #[test]
    fn dropping_state_releases_outstanding_listeners() {
        let registry = ListenerRegistry::default();
        {
            let mut interaction = InteractionState::new(registry.clone());
            interaction.begin(drag("a"));
            interaction.begin(drag("b"));
            assert_eq!(registry.active_count(), 8);
        }
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn end_all_clears_every_session() {
        let mut interaction = InteractionState::default();
        interaction.begin(drag("b"));
        interaction.begin(drag("a"));

        let ended = interaction.end_all();
        assert_eq!(
            ended.iter().map(|s| s.window_id().as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert!(interaction.is_empty());
        assert_eq!(interaction.registry().active_count(), 0);
    }
}
