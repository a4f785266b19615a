//! Debounce settings and the providers that hand them to the classifier
//!
//! A [`Settings`] value is an immutable snapshot. Providers swap whole
//! snapshots; readers only ever see one snapshot or the next, never a mix.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Upper bound accepted by [`Settings::validate`]
pub const MAX_DEBOUNCE_DELAY_MS: u64 = 60_000;

/// Configuration snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// URL substrings that make a REST call eligible for debouncing
    pub rest_patterns: Vec<String>,

    /// GraphQL operation-name patterns (exact names, `*`/`?` wildcards)
    pub graphql_operation_patterns: Vec<String>,

    /// Quiet period applied to every debounced call
    pub debounce_delay_ms: u64,
}

impl Settings {
    /// Quiet period as a [`Duration`]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    /// Trim every pattern and drop the empty ones
    pub fn normalized(mut self) -> Self {
        normalize_patterns(&mut self.rest_patterns);
        normalize_patterns(&mut self.graphql_operation_patterns);
        self
    }

    /// True when no call can ever be debounced with this snapshot
    pub fn is_inert(&self) -> bool {
        self.rest_patterns.is_empty() && self.graphql_operation_patterns.is_empty()
    }

    /// Check values are within accepted ranges
    pub fn validate(&self) -> Result<(), String> {
        if self.debounce_delay_ms > MAX_DEBOUNCE_DELAY_MS {
            return Err(format!(
                "debounce_delay_ms must be at most {} (got {})",
                MAX_DEBOUNCE_DELAY_MS, self.debounce_delay_ms
            ));
        }
        Ok(())
    }
}

fn normalize_patterns(patterns: &mut Vec<String>) {
    *patterns = patterns
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
}

/// Source of the latest settings snapshot
///
/// `None` means settings have not arrived yet; the classifier treats that as
/// "debounce nothing".
pub trait SettingsProvider: Send + Sync {
    fn snapshot(&self) -> Option<Arc<Settings>>;
}

/// Provider that always returns the same snapshot
#[derive(Debug, Clone)]
pub struct StaticSettings(Arc<Settings>);

impl StaticSettings {
    pub fn new(settings: Settings) -> Self {
        Self(Arc::new(settings.normalized()))
    }
}

impl SettingsProvider for StaticSettings {
    fn snapshot(&self) -> Option<Arc<Settings>> {
        Some(self.0.clone())
    }
}

/// Push-notified provider
///
/// Holders of a [`SettingsCell`] publish new snapshots; anyone interested in
/// changes can [`subscribe`](SettingsCell::subscribe).
#[derive(Debug, Clone)]
pub struct SettingsCell {
    tx: Arc<watch::Sender<Option<Arc<Settings>>>>,
}

impl SettingsCell {
    /// Create a cell with no snapshot yet
    pub fn empty() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Create a cell holding an initial snapshot
    pub fn new(settings: Settings) -> Self {
        let cell = Self::empty();
        cell.publish(settings);
        cell
    }

    /// Replace the current snapshot and notify subscribers
    pub fn publish(&self, settings: Settings) {
        self.tx.send_replace(Some(Arc::new(settings.normalized())));
    }

    /// Receive a notification whenever a new snapshot is published
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Settings>>> {
        self.tx.subscribe()
    }
}

impl SettingsProvider for SettingsCell {
    fn snapshot(&self) -> Option<Arc<Settings>> {
        self.tx.borrow().clone()
    }
}

impl<P: SettingsProvider + ?Sized> SettingsProvider for Arc<P> {
    fn snapshot(&self) -> Option<Arc<Settings>> {
        (**self).snapshot()
    }
}
