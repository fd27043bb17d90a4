//! Typed host-domain contracts shared by the desktop runtime and its storage adapters.
//!
//! This crate is the API-first boundary for platform services the window manager depends on:
//! the per-window persistence contract with its in-memory and no-op adapters, and the clock
//! helpers used to stamp events and envelopes. Concrete browser or desktop adapters implement
//! these traits outside the runtime.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod storage;
pub mod time;

pub use storage::window_state::{
    build_window_state_envelope, load_window_state_typed, save_window_state_typed,
    MemoryWindowStateStore, NoopWindowStateStore, WindowStateEnvelope, WindowStateStore,
    WindowStateStoreFuture, WINDOW_STATE_ENVELOPE_VERSION,
};
pub use time::{next_monotonic_timestamp_ms, unix_time_ms_now};
