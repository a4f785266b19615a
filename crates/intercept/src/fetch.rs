//! Debouncing wrapper for the fetch-style primitive

use crate::pipeline::Pipeline;
use crate::transport::{Fetch, FetchError, Request, Response};
use async_trait::async_trait;
use quell_core::CallDescriptor;
use std::sync::Arc;

/// Drop-in replacement for an original [`Fetch`]
///
/// Captures the request's method, URL and body for classification, then
/// hands the unmodified request to the original.
pub struct DebouncedFetch {
    original: Arc<dyn Fetch>,
    pipeline: Arc<Pipeline>,
}

impl DebouncedFetch {
    pub(crate) fn new(original: Arc<dyn Fetch>, pipeline: Arc<Pipeline>) -> Self {
        Self { original, pipeline }
    }
}

#[async_trait]
impl Fetch for DebouncedFetch {
    async fn fetch(&self, request: Request) -> Result<Response, FetchError> {
        let call = CallDescriptor::new(&request.method, &request.url, request.body.as_deref());
        let original = self.original.clone();

        self.pipeline
            .dispatch(call, move || {
                let original = original.clone();
                let request = request.clone();
                async move { original.fetch(request).await }
            })
            .await
    }
}
