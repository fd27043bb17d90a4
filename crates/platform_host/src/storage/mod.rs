//! Durable storage contracts for window-manager state.

pub mod window_state;
