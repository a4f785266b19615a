//! GraphQL operation-name extraction
//!
//! Only the operation name and keyword are recovered. Bodies are never
//! validated beyond the shallow checks in [`parse_operation`].

use serde::Deserialize;
use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};

/// Operation keyword of a GraphQL document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_lowercase().as_str() {
            "query" => Some(Self::Query),
            "mutation" => Some(Self::Mutation),
            "subscription" => Some(Self::Subscription),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

/// Shallow description of a query document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationInfo {
    pub name: Option<String>,
    pub kind: Option<OperationKind>,
    /// Braces present and the document opens with `{` or an operation keyword
    pub is_valid: bool,
}

/// JSON envelope of a GraphQL-over-HTTP request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlRequest {
    query: String,
    #[serde(default)]
    operation_name: Option<String>,
}

fn named_operation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(r"^\s*(query|mutation|subscription)\s+([A-Za-z0-9_]+)")
            .case_insensitive(true)
            .build()
            .expect("operation name pattern is valid")
    })
}

fn operation_keyword() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        RegexBuilder::new(r"^\s*(query|mutation|subscription)")
            .case_insensitive(true)
            .build()
            .expect("operation keyword pattern is valid")
    })
}

/// Parse a body as a GraphQL JSON request
///
/// Returns `None` if the body is not a JSON object with a string `query`.
fn parse_request(body: &str) -> Option<GraphqlRequest> {
    serde_json::from_str(body).ok()
}

/// True if the body looks like a GraphQL request
///
/// Either a JSON envelope with a `query` string, or raw query text that opens
/// with a named operation.
pub fn is_graphql_body(body: &str) -> bool {
    parse_request(body).is_some() || named_operation().is_match(body)
}

/// Extract the operation name from a raw request body
///
/// An explicit `operationName` in the JSON envelope wins over the name found
/// in the query text. Anonymous operations yield `None`.
pub fn extract_operation_name(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    let query = match parse_request(body) {
        Some(request) => {
            if let Some(name) = request.operation_name.filter(|n| !n.is_empty()) {
                return Some(name);
            }
            request.query
        }
        None => body.to_string(),
    };

    find_operation_name(&query)
}

fn find_operation_name(query: &str) -> Option<String> {
    named_operation()
        .captures(query)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Describe a query document: name, keyword, and a shallow validity flag
pub fn parse_operation(query: &str) -> OperationInfo {
    let trimmed = query.trim();
    if !trimmed.contains('{') || !trimmed.contains('}') {
        return OperationInfo {
            name: None,
            kind: None,
            is_valid: false,
        };
    }

    let kind = operation_keyword()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .and_then(|m| OperationKind::from_keyword(m.as_str()));

    OperationInfo {
        name: find_operation_name(trimmed),
        kind,
        is_valid: trimmed.starts_with('{') || kind.is_some(),
    }
}
