//! Window-state persistence contracts, envelope types, and helpers.
//!
//! The window manager treats persistence as best-effort: adapters implementing
//! [`WindowStateStore`] may be backed by IndexedDB, a desktop bridge, or memory, and the runtime
//! never waits on them before mutating in-memory state.

use std::{cell::RefCell, collections::HashMap, future::Future, pin::Pin, rc::Rc};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Version for [`WindowStateEnvelope`] metadata serialization.
pub const WINDOW_STATE_ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Versioned envelope for a persisted window's durable state subset.
pub struct WindowStateEnvelope {
    /// Envelope schema version.
    pub envelope_version: u32,
    /// Window the payload belongs to.
    pub window_id: String,
    /// Runtime-defined schema version for the payload.
    pub schema_version: u32,
    /// Last update time in unix milliseconds.
    pub updated_at_unix_ms: u64,
    /// Serialized partial window state.
    pub payload: Value,
}

impl WindowStateEnvelope {
    /// Creates a new envelope stamped with a monotonic timestamp.
    pub fn new(window_id: impl Into<String>, schema_version: u32, payload: Value) -> Self {
        Self {
            envelope_version: WINDOW_STATE_ENVELOPE_VERSION,
            window_id: window_id.into(),
            schema_version,
            updated_at_unix_ms: crate::time::next_monotonic_timestamp_ms(),
            payload,
        }
    }
}

/// Object-safe boxed future used by [`WindowStateStore`] async methods.
pub type WindowStateStoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Storage service for loading and saving per-window state envelopes.
pub trait WindowStateStore {
    /// Loads the persisted envelope for a window, if any.
    fn load_window_state<'a>(
        &'a self,
        window_id: &'a str,
    ) -> WindowStateStoreFuture<'a, Result<Option<WindowStateEnvelope>, String>>;

    /// Saves (replaces) the envelope for `envelope.window_id`.
    fn save_window_state<'a>(
        &'a self,
        envelope: &'a WindowStateEnvelope,
    ) -> WindowStateStoreFuture<'a, Result<(), String>>;

    /// Deletes persisted state for a window.
    fn delete_window_state<'a>(
        &'a self,
        window_id: &'a str,
    ) -> WindowStateStoreFuture<'a, Result<(), String>>;
}

#[derive(Debug, Clone, Copy, Default)]
/// No-op window-state store for unsupported targets and baseline tests.
pub struct NoopWindowStateStore;

impl WindowStateStore for NoopWindowStateStore {
    fn load_window_state<'a>(
        &'a self,
        _window_id: &'a str,
    ) -> WindowStateStoreFuture<'a, Result<Option<WindowStateEnvelope>, String>> {
        Box::pin(async { Ok(None) })
    }

    fn save_window_state<'a>(
        &'a self,
        _envelope: &'a WindowStateEnvelope,
    ) -> WindowStateStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }

    fn delete_window_state<'a>(
        &'a self,
        _window_id: &'a str,
    ) -> WindowStateStoreFuture<'a, Result<(), String>> {
        Box::pin(async { Ok(()) })
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory window-state store keyed by window id.
///
/// Clones share the same backing map, so a test can keep one handle while the runtime owns
/// another.
pub struct MemoryWindowStateStore {
    inner: Rc<RefCell<HashMap<String, WindowStateEnvelope>>>,
}

impl MemoryWindowStateStore {
    /// Returns the sorted ids of all windows with persisted state.
    pub fn window_ids(&self) -> Vec<String> {
        let mut ids = self.inner.borrow().keys().cloned().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    /// Returns a copy of the stored envelope for `window_id`.
    pub fn envelope(&self, window_id: &str) -> Option<WindowStateEnvelope> {
        self.inner.borrow().get(window_id).cloned()
    }
}

impl WindowStateStore for MemoryWindowStateStore {
    fn load_window_state<'a>(
        &'a self,
        window_id: &'a str,
    ) -> WindowStateStoreFuture<'a, Result<Option<WindowStateEnvelope>, String>> {
        Box::pin(async move { Ok(self.inner.borrow().get(window_id).cloned()) })
    }

    fn save_window_state<'a>(
        &'a self,
        envelope: &'a WindowStateEnvelope,
    ) -> WindowStateStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner
                .borrow_mut()
                .insert(envelope.window_id.clone(), envelope.clone());
            Ok(())
        })
    }

    fn delete_window_state<'a>(
        &'a self,
        window_id: &'a str,
    ) -> WindowStateStoreFuture<'a, Result<(), String>> {
        Box::pin(async move {
            self.inner.borrow_mut().remove(window_id);
            Ok(())
        })
    }
}

/// Builds a versioned [`WindowStateEnvelope`] from a serializable payload.
///
/// # Errors
///
/// Returns an error when `payload` cannot be converted to JSON.
pub fn build_window_state_envelope<T: Serialize>(
    window_id: &str,
    schema_version: u32,
    payload: &T,
) -> Result<WindowStateEnvelope, String> {
    let payload = serde_json::to_value(payload).map_err(|e| e.to_string())?;
    Ok(WindowStateEnvelope::new(window_id, schema_version, payload))
}

/// Serializes `payload` and saves it through `store`.
///
/// # Errors
///
/// Returns an error when serialization fails or the store rejects the write.
pub async fn save_window_state_typed<S, T>(
    store: &S,
    window_id: &str,
    schema_version: u32,
    payload: &T,
) -> Result<(), String>
where
    S: WindowStateStore + ?Sized,
    T: Serialize,
{
    let envelope = build_window_state_envelope(window_id, schema_version, payload)?;
    store.save_window_state(&envelope).await
}

/// Loads and decodes the persisted payload for `window_id`.
///
/// Envelopes written with a different `schema_version` are treated as absent.
///
/// # Errors
///
/// Returns an error when the store fails or the payload does not decode into `T`.
pub async fn load_window_state_typed<S, T>(
    store: &S,
    window_id: &str,
    schema_version: u32,
) -> Result<Option<T>, String>
where
    S: WindowStateStore + ?Sized,
    T: DeserializeOwned,
{
    let Some(envelope) = store.load_window_state(window_id).await? else {
        return Ok(None);
    };
    if envelope.schema_version != schema_version {
        return Ok(None);
    }
    serde_json::from_value(envelope.payload)
        .map(Some)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Placement {
        x: i32,
        y: i32,
    }

    #[test]
    fn envelope_serialization_uses_snake_case_fields() {
        let envelope = WindowStateEnvelope {
            envelope_version: WINDOW_STATE_ENVELOPE_VERSION,
            window_id: "notepad".to_string(),
            schema_version: 3,
            updated_at_unix_ms: 99,
            payload: json!({"x": 1}),
        };

        let value = serde_json::to_value(&envelope).expect("serialize envelope");
        let object = value.as_object().expect("object");
        assert_eq!(object.get("window_id"), Some(&json!("notepad")));
        assert_eq!(object.get("schema_version"), Some(&json!(3)));
        assert_eq!(object.get("updated_at_unix_ms"), Some(&json!(99)));
        assert!(!object.contains_key("windowId"));
    }

    #[test]
    fn successive_envelopes_get_increasing_timestamps() {
        let first = WindowStateEnvelope::new("a", 1, json!(null));
        let second = WindowStateEnvelope::new("a", 1, json!(null));
        assert!(second.updated_at_unix_ms > first.updated_at_unix_ms);
    }

    #[test]
    fn typed_save_then_load_through_memory_store() {
        let store = MemoryWindowStateStore::default();
        block_on(save_window_state_typed(
            &store,
            "terminal",
            1,
            &Placement { x: 12, y: 40 },
        ))
        .expect("save");

        let loaded: Option<Placement> =
            block_on(load_window_state_typed(&store, "terminal", 1)).expect("load");
        assert_eq!(loaded, Some(Placement { x: 12, y: 40 }));
        assert_eq!(store.window_ids(), vec!["terminal".to_string()]);
    }

    #[test]
    fn typed_load_ignores_other_schema_versions() {
        let store = MemoryWindowStateStore::default();
        block_on(save_window_state_typed(
            &store,
            "terminal",
            1,
            &Placement { x: 1, y: 2 },
        ))
        .expect("save");

        let loaded: Option<Placement> =
            block_on(load_window_state_typed(&store, "terminal", 2)).expect("load");
        assert_eq!(loaded, None);
    }

    #[test]
    fn typed_load_reports_decode_failures() {
        let store = MemoryWindowStateStore::default();
        let envelope = WindowStateEnvelope::new("explorer", 1, json!({"x": "left"}));
        block_on(store.save_window_state(&envelope)).expect("save");

        let err = block_on(load_window_state_typed::<_, Placement>(&store, "explorer", 1))
            .expect_err("expected decode failure");
        assert!(!err.is_empty());
    }

    #[test]
    fn memory_store_clones_share_state_and_delete_removes() {
        let store = MemoryWindowStateStore::default();
        let handle = store.clone();
        let store_obj: &dyn WindowStateStore = &store;

        let envelope = WindowStateEnvelope::new("paint", 1, json!({"opacity": 0.5}));
        block_on(store_obj.save_window_state(&envelope)).expect("save");
        assert_eq!(handle.envelope("paint").map(|e| e.payload), Some(json!({"opacity": 0.5})));

        block_on(store_obj.delete_window_state("paint")).expect("delete");
        assert!(handle.window_ids().is_empty());
    }

    #[test]
    fn noop_store_is_empty_and_successful() {
        let store = NoopWindowStateStore;
        let store_obj: &dyn WindowStateStore = &store;
        let envelope = WindowStateEnvelope::new("noop", 1, json!({}));

        block_on(store_obj.save_window_state(&envelope)).expect("save");
        assert_eq!(block_on(store_obj.load_window_state("noop")).expect("load"), None);
        block_on(store_obj.delete_window_state("noop")).expect("delete");
    }
}
