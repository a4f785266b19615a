//! Workflow integration tests
//!
//! Tests for complete workflows that exercise multiple commands
//! and validate end-to-end behavior.

pub mod classify;
pub mod config;
pub mod replay;
