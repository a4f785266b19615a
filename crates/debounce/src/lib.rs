//! Debounce coordination for Quell
//!
//! This crate provides:
//! - Cancellable timers (tokio-backed and a simulated clock)
//! - The coordinator table with cancel-and-replace semantics per key
//! - Settlement handles so superseded callers can observe the winning call

pub mod coordinator;
pub mod timer;

pub use coordinator::{Coordinator, DebounceError, Pending, Settlement};
pub use quell_core::DebounceKey;
pub use timer::{ManualTimer, Timer, TimerHandle, TokioTimer};
