//! Debounce eligibility decisions
//!
//! Classification is fail-open: anything that goes wrong while deciding
//! (no settings yet, a pattern that will not compile) yields an ineligible
//! call, which is then forwarded untouched.

use crate::error::ClassificationFailure;
use crate::key::{CallDescriptor, CallKind, DebounceKey};
use crate::operation::extract_operation_name;
use crate::pattern::PatternSet;
use crate::settings::{Settings, SettingsProvider};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Outcome of classifying one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub eligible: bool,
    pub key: DebounceKey,
    pub delay: Duration,
    /// GraphQL operation name, when one was found
    pub operation: Option<String>,
}

impl Classification {
    /// Ineligible classification used when deciding failed
    fn passthrough(call: &CallDescriptor) -> Self {
        let operation = operation_of(call);
        Self {
            eligible: false,
            key: key_for(call, operation.as_deref()),
            delay: Duration::ZERO,
            operation,
        }
    }
}

/// Classify against a settings snapshot, compiling its patterns on the spot
pub fn classify(call: &CallDescriptor, settings: &Settings) -> Classification {
    match PatternSet::compile(&settings.graphql_operation_patterns) {
        Ok(patterns) => classify_with(call, settings, &patterns),
        Err(e) => {
            warn!("Classification failed, forwarding {} undebounced: {}", call.url, e);
            Classification::passthrough(call)
        }
    }
}

fn classify_with(call: &CallDescriptor, settings: &Settings, patterns: &PatternSet) -> Classification {
    let operation = operation_of(call);

    let eligible = match call.kind {
        CallKind::Rest => settings
            .rest_patterns
            .iter()
            .filter(|p| !p.is_empty())
            .any(|p| call.url.contains(p.as_str())),
        CallKind::Graphql => match operation.as_deref() {
            Some(name) => patterns.matches(name),
            None => patterns.has_global_wildcard(),
        },
    };

    Classification {
        eligible,
        key: key_for(call, operation.as_deref()),
        delay: settings.delay(),
        operation,
    }
}

fn operation_of(call: &CallDescriptor) -> Option<String> {
    match call.kind {
        CallKind::Graphql => call.body.as_deref().and_then(extract_operation_name),
        CallKind::Rest => None,
    }
}

fn key_for(call: &CallDescriptor, operation: Option<&str>) -> DebounceKey {
    let discriminator = match call.kind {
        CallKind::Rest => Some(call.method.as_str()),
        CallKind::Graphql => operation,
    };
    DebounceKey::new(call.kind, &call.url, discriminator)
}

/// Classifier bound to a settings provider
///
/// Operation patterns are compiled once per snapshot and reused until the
/// provider hands out a different one.
pub struct Classifier {
    provider: Arc<dyn SettingsProvider>,
    compiled: Mutex<Option<(Arc<Settings>, Arc<PatternSet>)>>,
}

impl Classifier {
    pub fn new(provider: Arc<dyn SettingsProvider>) -> Self {
        Self {
            provider,
            compiled: Mutex::new(None),
        }
    }

    /// Classify a call, reporting why it could not be classified
    pub fn try_classify(&self, call: &CallDescriptor) -> Result<Classification, ClassificationFailure> {
        let settings = self
            .provider
            .snapshot()
            .ok_or(ClassificationFailure::SettingsUnavailable)?;
        let patterns = self.patterns_for(&settings)?;

        let classification = classify_with(call, &settings, &patterns);
        debug!(
            "Classified {} {} as {} (eligible: {})",
            call.method, call.url, classification.key, classification.eligible
        );
        Ok(classification)
    }

    /// Classify a call, falling back to an ineligible result on failure
    pub fn classify(&self, call: &CallDescriptor) -> Classification {
        match self.try_classify(call) {
            Ok(classification) => classification,
            Err(e) => {
                warn!("Classification failed, forwarding {} undebounced: {}", call.url, e);
                Classification::passthrough(call)
            }
        }
    }

    fn patterns_for(&self, settings: &Arc<Settings>) -> Result<Arc<PatternSet>, ClassificationFailure> {
        let mut cache = self.compiled.lock();
        if let Some((cached_for, patterns)) = cache.as_ref() {
            if Arc::ptr_eq(cached_for, settings) {
                return Ok(patterns.clone());
            }
        }

        let patterns = Arc::new(PatternSet::compile(&settings.graphql_operation_patterns)?);
        *cache = Some((settings.clone(), patterns.clone()));
        Ok(patterns)
    }
}
