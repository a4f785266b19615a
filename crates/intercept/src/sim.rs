//! In-process network used by replays and tests
//!
//! Every request is recorded and answered with `200` and a body naming the
//! request's sequence number, method and URL. URLs containing a configured
//! failure substring get a network error instead.

use crate::transport::{Channel, ChannelFactory, Fetch, FetchError, Request, Response};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
pub struct SimulatedNetwork {
    latency: Duration,
    requests: Arc<Mutex<Vec<Request>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl SimulatedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every request whose URL contains `url_fragment`
    pub fn fail_matching(&self, url_fragment: &str) {
        self.failing.lock().push(url_fragment.to_string());
    }

    /// Requests that reached the network, in arrival order
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    async fn transmit(&self, request: Request) -> Result<Response, FetchError> {
        let seq = {
            let mut requests = self.requests.lock();
            requests.push(request.clone());
            requests.len()
        };

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let failing = self
            .failing
            .lock()
            .iter()
            .any(|fragment| request.url.contains(fragment.as_str()));
        if failing {
            return Err(FetchError::Network(format!("connection refused: {}", request.url)));
        }

        Ok(Response::new(200, format!("#{} {} {}", seq, request.method, request.url)))
    }
}

#[async_trait]
impl Fetch for SimulatedNetwork {
    async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
        self.transmit(request).await
    }
}

impl ChannelFactory for SimulatedNetwork {
    fn create(&self) -> Box<dyn Channel> {
        Box::new(SimulatedChannel {
            network: self.clone(),
            target: None,
        })
    }
}

struct SimulatedChannel {
    network: SimulatedNetwork,
    target: Option<(String, String)>,
}

#[async_trait]
impl Channel for SimulatedChannel {
    fn open(&mut self, method: &str, url: &str) {
        self.target = Some((method.to_string(), url.to_string()));
    }

    async fn send(&mut self, body: Option<Bytes>) -> Result<Response, FetchError> {
        let (method, url) = self
            .target
            .clone()
            .ok_or_else(|| FetchError::InvalidState("send called before open".to_string()))?;

        let mut request = Request::new(&method, &url);
        request.body = body;
        self.network.transmit(request).await
    }
}
