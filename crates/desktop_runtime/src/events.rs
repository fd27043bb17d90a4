//! Typed window-manager events and the in-process bus that delivers them.
//!
//! Subscribers receive every [`EventEnvelope`] (or only those of one [`DesktopEventKind`]) in
//! publish order. A [`Subscription`] unsubscribes when dropped or disposed.

use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use platform_host::next_monotonic_timestamp_ms;
use serde::{Deserialize, Serialize};

use crate::model::{DesktopId, Position, WindowGeometry, WindowId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// State transitions observed by external collaborators (taskbar, telemetry, assistants).
pub enum DesktopEvent {
    /// A window entity was created.
    WindowOpened {
        /// New window.
        window_id: WindowId,
        /// Desktop the window was placed on.
        desktop_id: DesktopId,
    },
    /// A minimized window became visible again.
    WindowRestored {
        /// Restored window.
        window_id: WindowId,
    },
    /// A window was minimized.
    WindowMinimized {
        /// Minimized window.
        window_id: WindowId,
    },
    /// A window entered or left the maximized state.
    WindowMaximized {
        /// Affected window.
        window_id: WindowId,
        /// Whether the window is now maximized.
        maximized: bool,
    },
    /// A window entered or left fullscreen.
    WindowFullscreened {
        /// Affected window.
        window_id: WindowId,
        /// Whether the window is now fullscreen.
        fullscreen: bool,
    },
    /// A window's position changed through a drag or a programmatic move.
    WindowMoved {
        /// Moved window.
        window_id: WindowId,
        /// New top-left corner.
        position: Position,
    },
    /// A window's size changed through a resize or a programmatic resize.
    WindowResized {
        /// Resized window.
        window_id: WindowId,
        /// Geometry after the resize.
        geometry: WindowGeometry,
    },
    /// A window became the focused window.
    WindowFocused {
        /// Focused window.
        window_id: WindowId,
    },
    /// A window entity was removed.
    WindowClosed {
        /// Closed window.
        window_id: WindowId,
        /// Desktop the window was on when it closed.
        desktop_id: DesktopId,
    },
    /// A window was reassigned to another desktop.
    WindowDesktopChanged {
        /// Reassigned window.
        window_id: WindowId,
        /// Previous desktop.
        from: DesktopId,
        /// New desktop.
        to: DesktopId,
    },
    /// A virtual desktop was created.
    DesktopCreated {
        /// New desktop.
        desktop_id: DesktopId,
    },
    /// The active desktop changed.
    DesktopSwitched {
        /// Previously active desktop.
        from: DesktopId,
        /// Newly active desktop.
        to: DesktopId,
    },
    /// A virtual desktop was deleted.
    DesktopRemoved {
        /// Deleted desktop.
        desktop_id: DesktopId,
        /// Desktop that received the deleted desktop's windows.
        fallback: DesktopId,
        /// Windows moved to `fallback`.
        reassigned: Vec<WindowId>,
    },
}

/// Discriminant of [`DesktopEvent`], used for filtered subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesktopEventKind {
    WindowOpened,
    WindowRestored,
    WindowMinimized,
    WindowMaximized,
    WindowFullscreened,
    WindowMoved,
    WindowResized,
    WindowFocused,
    WindowClosed,
    WindowDesktopChanged,
    DesktopCreated,
    DesktopSwitched,
    DesktopRemoved,
}

impl DesktopEvent {
    pub fn kind(&self) -> DesktopEventKind {
        match self {
            Self::WindowOpened { .. } => DesktopEventKind::WindowOpened,
            Self::WindowRestored { .. } => DesktopEventKind::WindowRestored,
            Self::WindowMinimized { .. } => DesktopEventKind::WindowMinimized,
            Self::WindowMaximized { .. } => DesktopEventKind::WindowMaximized,
            Self::WindowFullscreened { .. } => DesktopEventKind::WindowFullscreened,
            Self::WindowMoved { .. } => DesktopEventKind::WindowMoved,
            Self::WindowResized { .. } => DesktopEventKind::WindowResized,
            Self::WindowFocused { .. } => DesktopEventKind::WindowFocused,
            Self::WindowClosed { .. } => DesktopEventKind::WindowClosed,
            Self::WindowDesktopChanged { .. } => DesktopEventKind::WindowDesktopChanged,
            Self::DesktopCreated { .. } => DesktopEventKind::DesktopCreated,
            Self::DesktopSwitched { .. } => DesktopEventKind::DesktopSwitched,
            Self::DesktopRemoved { .. } => DesktopEventKind::DesktopRemoved,
        }
    }

    /// Window the event is about, if any.
    pub fn window_id(&self) -> Option<&WindowId> {
        match self {
            Self::WindowOpened { window_id, .. }
            | Self::WindowRestored { window_id }
            | Self::WindowMinimized { window_id }
            | Self::WindowMaximized { window_id, .. }
            | Self::WindowFullscreened { window_id, .. }
            | Self::WindowMoved { window_id, .. }
            | Self::WindowResized { window_id, .. }
            | Self::WindowFocused { window_id }
            | Self::WindowClosed { window_id, .. }
            | Self::WindowDesktopChanged { window_id, .. } => Some(window_id),
            Self::DesktopCreated { .. }
            | Self::DesktopSwitched { .. }
            | Self::DesktopRemoved { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A published event plus the time it was published.
pub struct EventEnvelope {
    /// Event payload.
    pub event: DesktopEvent,
    /// Unix milliseconds, strictly increasing within the process.
    pub timestamp_unix_ms: u64,
}

type Handler = Rc<dyn Fn(&EventEnvelope)>;

struct SubscriberEntry {
    id: u64,
    kind: Option<DesktopEventKind>,
    handler: Handler,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: Vec<SubscriberEntry>,
}

/// Single-threaded publish/subscribe channel for [`DesktopEvent`]s.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Rc<RefCell<BusInner>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for every event.
    pub fn subscribe(&self, handler: impl Fn(&EventEnvelope) + 'static) -> Subscription {
        self.add(None, Rc::new(handler))
    }

    /// Registers `handler` for events of one kind.
    pub fn subscribe_kind(
        &self,
        kind: DesktopEventKind,
        handler: impl Fn(&EventEnvelope) + 'static,
    ) -> Subscription {
        self.add(Some(kind), Rc::new(handler))
    }

    fn add(&self, kind: Option<DesktopEventKind>, handler: Handler) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        inner.next_id = inner.next_id.saturating_add(1);
        let id = inner.next_id;
        inner.subscribers.push(SubscriberEntry { id, kind, handler });
        Subscription {
            bus: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Stamps `event` and delivers it to matching subscribers.
    ///
    /// Handlers may subscribe, unsubscribe, or publish re-entrantly; the recipient list is fixed
    /// before the first handler runs.
    pub fn publish(&self, event: DesktopEvent) -> EventEnvelope {
        let envelope = EventEnvelope {
            event,
            timestamp_unix_ms: next_monotonic_timestamp_ms(),
        };
        let kind = envelope.event.kind();
        let handlers = self
            .inner
            .borrow()
            .subscribers
            .iter()
            .filter(|entry| entry.kind.map(|k| k == kind).unwrap_or(true))
            .map(|entry| Rc::clone(&entry.handler))
            .collect::<Vec<_>>();
        for handler in handlers {
            handler(&envelope);
        }
        envelope
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }
}

/// Handle returned by [`EventBus::subscribe`]; unsubscribes on drop.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    bus: Weak<RefCell<BusInner>>,
    id: u64,
}

impl Subscription {
    /// Unsubscribes now.
    pub fn dispose(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.borrow_mut().subscribers.retain(|entry| entry.id != self.id);
        }
    }
}
