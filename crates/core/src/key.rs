//! Call descriptors and debounce keys

use crate::operation::is_graphql_body;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator used when none can be determined
pub const DEFAULT_DISCRIMINATOR: &str = "default";

/// Kind of intercepted call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Rest,
    Graphql,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rest => "rest",
            Self::Graphql => "graphql",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One intercepted call, as seen by the classifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescriptor {
    pub kind: CallKind,
    pub url: String,
    pub method: String,
    pub body: Option<String>,
}

impl CallDescriptor {
    /// Describe a call, detecting GraphQL from the body
    ///
    /// Non UTF-8 bodies are dropped; such a call is always REST.
    pub fn new(method: &str, url: &str, body: Option<&[u8]>) -> Self {
        let body = body.and_then(|b| std::str::from_utf8(b).ok()).map(str::to_string);
        let kind = match body.as_deref() {
            Some(text) if is_graphql_body(text) => CallKind::Graphql,
            _ => CallKind::Rest,
        };

        Self {
            kind,
            url: url.to_string(),
            method: method.to_ascii_uppercase(),
            body,
        }
    }

    pub fn rest(method: &str, url: &str) -> Self {
        Self {
            kind: CallKind::Rest,
            url: url.to_string(),
            method: method.to_ascii_uppercase(),
            body: None,
        }
    }

    pub fn graphql(url: &str, body: &str) -> Self {
        Self {
            kind: CallKind::Graphql,
            url: url.to_string(),
            method: "POST".to_string(),
            body: Some(body.to_string()),
        }
    }
}

/// Identity of "the same logical request": `kind:url:discriminator`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DebounceKey(String);

impl DebounceKey {
    /// Derive a key; an empty discriminator becomes `"default"`
    pub fn new(kind: CallKind, url: &str, discriminator: Option<&str>) -> Self {
        let discriminator = discriminator
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DISCRIMINATOR);
        Self(format!("{}:{}:{}", kind, url, discriminator))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DebounceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DebounceKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}
