//! The host's network entry points
//!
//! [`Fetch`] is the stateless call-and-await-a-response shape. [`Channel`] is
//! the stateful shape: configure with [`open`](Channel::open), then
//! [`send`](Channel::send) a body. Requests pass through unmodified; these
//! types carry only what classification and forwarding need.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Outgoing request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub url: String,
    pub body: Option<Bytes>,
}

impl Request {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            body: None,
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: &str, body: impl Into<Bytes>) -> Self {
        Self::new("POST", url).with_body(body)
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Response as delivered to the caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, replacing invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Failure of the real network call
///
/// Cloneable so one forwarded outcome can be handed to every caller of a
/// burst.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request aborted")]
    Aborted,

    #[error("invalid state: {0}")]
    InvalidState(String),
}

/// Stateless call-and-await-a-response primitive
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, request: Request) -> Result<Response, FetchError>;
}

/// Stateful configure-then-send primitive
#[async_trait]
pub trait Channel: Send {
    /// Set the method and target of the next send
    fn open(&mut self, method: &str, url: &str);

    /// Transmit `body` to the opened target
    ///
    /// Fails with [`FetchError::InvalidState`] if the channel was never
    /// opened.
    async fn send(&mut self, body: Option<Bytes>) -> Result<Response, FetchError>;
}

/// Creates fresh [`Channel`] instances
pub trait ChannelFactory: Send + Sync {
    fn create(&self) -> Box<dyn Channel>;
}
