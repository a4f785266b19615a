//! The hosting environment's network entry points

use crate::transport::{Channel, ChannelFactory, Fetch, FetchError, Request, Response};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Slots holding the current fetch primitive and channel factory
///
/// Application code calls [`fetch`](Self::fetch) and
/// [`channel`](Self::channel) and never learns whether an interceptor sits in
/// front of the real network.
pub struct NetworkHost {
    fetch: RwLock<Arc<dyn Fetch>>,
    channels: RwLock<Arc<dyn ChannelFactory>>,
    intercepted: AtomicBool,
}

impl NetworkHost {
    pub fn new(fetch: Arc<dyn Fetch>, channels: Arc<dyn ChannelFactory>) -> Self {
        Self {
            fetch: RwLock::new(fetch),
            channels: RwLock::new(channels),
            intercepted: AtomicBool::new(false),
        }
    }

    /// Current fetch primitive
    pub fn fetcher(&self) -> Arc<dyn Fetch> {
        self.fetch.read().clone()
    }

    /// Issue a request through the current fetch primitive
    pub async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
        let fetcher = self.fetcher();
        fetcher.fetch(request).await
    }

    /// Current channel factory
    pub fn channel_factory(&self) -> Arc<dyn ChannelFactory> {
        self.channels.read().clone()
    }

    /// Create a channel from the current factory
    pub fn channel(&self) -> Box<dyn Channel> {
        self.channels.read().create()
    }

    pub fn is_intercepted(&self) -> bool {
        self.intercepted.load(Ordering::SeqCst)
    }

    /// Claim the slots for an interceptor; false if one is already installed
    pub(crate) fn claim(&self) -> bool {
        !self.intercepted.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn release(&self) {
        self.intercepted.store(false, Ordering::SeqCst);
    }

    /// Replace the fetch primitive, returning the previous one
    pub(crate) fn replace_fetch(&self, fetch: Arc<dyn Fetch>) -> Arc<dyn Fetch> {
        std::mem::replace(&mut *self.fetch.write(), fetch)
    }

    /// Replace the channel factory, returning the previous one
    pub(crate) fn replace_channels(&self, channels: Arc<dyn ChannelFactory>) -> Arc<dyn ChannelFactory> {
        std::mem::replace(&mut *self.channels.write(), channels)
    }
}
