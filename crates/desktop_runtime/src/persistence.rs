//! Debounced, best-effort persistence of window state through [`WindowStateStore`].
//!
//! In-memory state is always authoritative. Saves are coalesced per window in a
//! [`PersistenceQueue`] and flushed later; store failures are logged and dropped, never rolled
//! back into runtime state.

use std::collections::BTreeMap;

use futures::future::join_all;
use leptos::logging;
use platform_host::{load_window_state_typed, save_window_state_typed, WindowStateStore};

use crate::model::{
    DesktopSnapshot, WindowId, WindowPatch, DESKTOP_LAYOUT_SCHEMA_VERSION,
    WINDOW_STATE_SCHEMA_VERSION,
};

/// Store key under which the whole desktop layout snapshot is kept.
pub const LAYOUT_STATE_KEY: &str = "desktop.layout";

#[derive(Debug, Clone, PartialEq)]
pub struct PendingSave {
    pub state: WindowPatch,
    pub due_at_ms: u64,
}

/// Per-window save queue. Re-enqueueing a window replaces its pending state and re-arms its
/// deadline, so a burst of changes produces one write.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PersistenceQueue {
    debounce_ms: u64,
    pending: BTreeMap<WindowId, PendingSave>,
}

impl PersistenceQueue {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            debounce_ms,
            pending: BTreeMap::new(),
        }
    }

    pub fn enqueue(&mut self, window_id: WindowId, state: WindowPatch, now_ms: u64) {
        let due_at_ms = now_ms.saturating_add(self.debounce_ms);
        self.pending
            .insert(window_id, PendingSave { state, due_at_ms });
    }

    /// Removes and returns saves whose deadline is at or before `now_ms`, in window-id order.
    pub fn take_due(&mut self, now_ms: u64) -> Vec<(WindowId, WindowPatch)> {
        let due = self
            .pending
            .iter()
            .filter(|(_, save)| save.due_at_ms <= now_ms)
            .map(|(window_id, _)| window_id.clone())
            .collect::<Vec<_>>();
        due.into_iter()
            .filter_map(|window_id| {
                self.pending
                    .remove(&window_id)
                    .map(|save| (window_id, save.state))
            })
            .collect()
    }

    pub fn take_all(&mut self) -> Vec<(WindowId, WindowPatch)> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .map(|(window_id, save)| (window_id, save.state))
            .collect()
    }

    /// Earliest pending deadline, for hosts scheduling a flush timer.
    pub fn next_due_ms(&self) -> Option<u64> {
        self.pending.values().map(|save| save.due_at_ms).min()
    }

    pub fn is_pending(&self, window_id: &WindowId) -> bool {
        self.pending.contains_key(window_id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Saves one window's durable state.
///
/// # Errors
///
/// Returns the store's error message when the write fails.
pub async fn persist_window_state<S>(
    store: &S,
    window_id: &WindowId,
    state: &WindowPatch,
) -> Result<(), String>
where
    S: WindowStateStore + ?Sized,
{
    save_window_state_typed(store, window_id.as_str(), WINDOW_STATE_SCHEMA_VERSION, state).await
}

/// Saves a batch concurrently and returns how many writes failed. Failures are logged.
pub async fn save_batch<S>(store: &S, batch: &[(WindowId, WindowPatch)]) -> usize
where
    S: WindowStateStore + ?Sized,
{
    let results = join_all(
        batch
            .iter()
            .map(|(window_id, state)| persist_window_state(store, window_id, state)),
    )
    .await;

    let mut failures = 0;
    for ((window_id, _), result) in batch.iter().zip(results) {
        if let Err(err) = result {
            logging::warn!("window state save failed for {window_id}: {err}");
            failures += 1;
        }
    }
    failures
}

/// Loads a window's persisted session. Missing, stale-schema, and failed loads yield `None`.
pub async fn load_window_session<S>(store: &S, window_id: &WindowId) -> Option<WindowPatch>
where
    S: WindowStateStore + ?Sized,
{
    match load_window_state_typed::<S, WindowPatch>(
        store,
        window_id.as_str(),
        WINDOW_STATE_SCHEMA_VERSION,
    )
    .await
    {
        Ok(patch) => patch,
        Err(err) => {
            logging::warn!("window session load failed for {window_id}: {err}");
            None
        }
    }
}

/// Saves the desktop layout snapshot under [`LAYOUT_STATE_KEY`].
///
/// # Errors
///
/// Returns the store's error message when serialization or the write fails.
pub async fn save_layout_snapshot<S>(store: &S, snapshot: &DesktopSnapshot) -> Result<(), String>
where
    S: WindowStateStore + ?Sized,
{
    save_window_state_typed(store, LAYOUT_STATE_KEY, DESKTOP_LAYOUT_SCHEMA_VERSION, snapshot).await
}

/// Loads the desktop layout snapshot, logging and discarding failures.
pub async fn load_layout_snapshot<S>(store: &S) -> Option<DesktopSnapshot>
where
    S: WindowStateStore + ?Sized,
{
    match load_window_state_typed::<S, DesktopSnapshot>(
        store,
        LAYOUT_STATE_KEY,
        DESKTOP_LAYOUT_SCHEMA_VERSION,
    )
    .await
    {
        Ok(snapshot) => snapshot,
        Err(err) => {
            logging::warn!("desktop layout load failed: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use platform_host::{
        MemoryWindowStateStore, WindowStateEnvelope, WindowStateStoreFuture,
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::DesktopState;

    struct FailingStore;

    impl WindowStateStore for FailingStore {
        fn load_window_state<'a>(
            &'a self,
            _window_id: &'a str,
        ) -> WindowStateStoreFuture<'a, Result<Option<WindowStateEnvelope>, String>> {
            Box::pin(async { Err("disk unavailable".to_string()) })
        }

        fn save_window_state<'a>(
            &'a self,
            _envelope: &'a WindowStateEnvelope,
        ) -> WindowStateStoreFuture<'a, Result<(), String>> {
            Box::pin(async { Err("disk full".to_string()) })
        }

        fn delete_window_state<'a>(
            &'a self,
            _window_id: &'a str,
        ) -> WindowStateStoreFuture<'a, Result<(), String>> {
            Box::pin(async { Err("disk unavailable".to_string()) })
        }
    }

    #[test]
    fn queue_coalesces_and_rearms_deadline() {
        let mut queue = PersistenceQueue::new(400);
        let id = WindowId::from("notepad#1");
        queue.enqueue(id.clone(), WindowPatch::at(1, 1), 1_000);
        queue.enqueue(id.clone(), WindowPatch::at(2, 2), 1_300);

        assert_eq!(queue.len(), 1);
        assert!(queue.take_due(1_500).is_empty());
        assert_eq!(queue.next_due_ms(), Some(1_700));
        assert_eq!(queue.take_due(1_700), vec![(id, WindowPatch::at(2, 2))]);
        assert!(queue.is_empty());
    }

    #[test]
    fn take_due_leaves_later_saves_queued() {
        let mut queue = PersistenceQueue::new(100);
        queue.enqueue(WindowId::from("a"), WindowPatch::at(1, 1), 0);
        queue.enqueue(WindowId::from("b"), WindowPatch::at(2, 2), 500);

        let due = queue.take_due(200);
        assert_eq!(due.len(), 1);
        assert!(queue.is_pending(&WindowId::from("b")));
        assert_eq!(queue.take_all().len(), 1);
    }

    #[test]
    fn batch_save_round_trips_through_memory_store() {
        let store = MemoryWindowStateStore::default();
        let id = WindowId::from("terminal");
        let state = WindowPatch::at(10, 20);

        let failures = block_on(save_batch(&store, &[(id.clone(), state.clone())]));
        assert_eq!(failures, 0);
        assert_eq!(block_on(load_window_session(&store, &id)), Some(state));
        assert_eq!(
            store.envelope("terminal").map(|e| e.schema_version),
            Some(WINDOW_STATE_SCHEMA_VERSION)
        );
    }

    #[test]
    fn store_failures_are_counted_and_loads_become_none() {
        let batch = vec![
            (WindowId::from("a"), WindowPatch::at(1, 1)),
            (WindowId::from("b"), WindowPatch::at(2, 2)),
        ];
        assert_eq!(block_on(save_batch(&FailingStore, &batch)), 2);
        assert_eq!(block_on(load_window_session(&FailingStore, &WindowId::from("a"))), None);
        assert_eq!(block_on(load_layout_snapshot(&FailingStore)), None);
    }

    #[test]
    fn layout_snapshot_round_trips() {
        let store = MemoryWindowStateStore::default();
        let snapshot = DesktopState::default().snapshot();
        block_on(save_layout_snapshot(&store, &snapshot)).expect("save layout");
        assert_eq!(block_on(load_layout_snapshot(&store)), Some(snapshot));
    }
}
