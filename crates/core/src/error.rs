//! Classification errors
//!
//! These never reach the caller of an intercepted primitive. The classifier
//! logs them and falls back to forwarding the call undebounced.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassificationFailure {
    /// No settings snapshot has been delivered yet
    #[error("no settings snapshot available")]
    SettingsUnavailable,

    /// A configured operation pattern could not be compiled
    #[error("invalid operation pattern '{pattern}'")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
