//! Classification primitives for Quell
//!
//! This crate provides:
//! - Settings snapshots and providers (static and push-notified)
//! - Wildcard pattern matching for operation names
//! - GraphQL operation-name extraction
//! - Call descriptors and debounce keys
//! - The fail-open classifier that decides which calls get debounced

pub mod classify;
pub mod error;
pub mod key;
pub mod operation;
pub mod pattern;
pub mod settings;

// Re-exports
pub use classify::{classify, Classification, Classifier};
pub use error::ClassificationFailure;
pub use key::{CallDescriptor, CallKind, DebounceKey};
pub use operation::{
    extract_operation_name, is_graphql_body, parse_operation, OperationInfo, OperationKind,
};
pub use pattern::{matches, PatternSet};
pub use settings::{Settings, SettingsCell, SettingsProvider, StaticSettings, MAX_DEBOUNCE_DELAY_MS};
