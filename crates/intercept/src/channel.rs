//! Debouncing wrapper for the open/send-style primitive
//!
//! The wrapper owns an instance of the original channel instead of extending
//! it. `open` only records the target; the original is opened and sent in one
//! step when the (possibly delayed) forward runs, so it always transmits the
//! latest configuration. The original sees the method and URL exactly as the
//! caller passed them.

use crate::pipeline::Pipeline;
use crate::transport::{Channel, ChannelFactory, FetchError, Response};
use async_trait::async_trait;
use bytes::Bytes;
use quell_core::CallDescriptor;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct DebouncedChannel {
    inner: Arc<Mutex<Box<dyn Channel>>>,
    target: Option<(String, String)>,
    pipeline: Arc<Pipeline>,
}

impl DebouncedChannel {
    pub(crate) fn new(inner: Box<dyn Channel>, pipeline: Arc<Pipeline>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
            target: None,
            pipeline,
        }
    }
}

#[async_trait]
impl Channel for DebouncedChannel {
    fn open(&mut self, method: &str, url: &str) {
        self.target = Some((method.to_string(), url.to_string()));
    }

    async fn send(&mut self, body: Option<Bytes>) -> Result<Response, FetchError> {
        let Some((method, url)) = self.target.clone() else {
            return Err(FetchError::InvalidState("send called before open".to_string()));
        };

        let call = CallDescriptor::new(&method, &url, body.as_deref());
        let inner = self.inner.clone();

        self.pipeline
            .dispatch(call, move || {
                let inner = inner.clone();
                let method = method.clone();
                let url = url.clone();
                let body = body.clone();
                async move {
                    let mut channel = inner.lock().await;
                    channel.open(&method, &url);
                    channel.send(body).await
                }
            })
            .await
    }
}

/// Factory handing out [`DebouncedChannel`]s around the original factory's
/// channels
pub struct DebouncedChannelFactory {
    original: Arc<dyn ChannelFactory>,
    pipeline: Arc<Pipeline>,
}

impl DebouncedChannelFactory {
    pub(crate) fn new(original: Arc<dyn ChannelFactory>, pipeline: Arc<Pipeline>) -> Self {
        Self { original, pipeline }
    }
}

impl ChannelFactory for DebouncedChannelFactory {
    fn create(&self) -> Box<dyn Channel> {
        Box::new(DebouncedChannel::new(self.original.create(), self.pipeline.clone()))
    }
}
