//! Classify, then forward now or through the coordinator
//!
//! Shared by both wrapped primitives. A burst reaches the network at most
//! once and every caller in it receives that one outcome. When the latest
//! call is cancelled (including by uninstall) its caller sends it directly
//! and hands the outcome to the rest of the burst; superseded calls are never
//! sent.

use crate::history::{RequestLog, RequestRecord};
use crate::transport::{FetchError, Response};
use debounce::{Coordinator, DebounceError};
use futures::future::BoxFuture;
use quell_core::{CallDescriptor, Classification, Classifier};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub(crate) struct Pipeline {
    classifier: Classifier,
    coordinator: Coordinator<Response, FetchError>,
    log: Arc<RequestLog>,
    active: AtomicBool,
}

impl Pipeline {
    pub(crate) fn new(classifier: Classifier, coordinator: Coordinator<Response, FetchError>) -> Self {
        Self {
            classifier,
            coordinator,
            log: Arc::new(RequestLog::new()),
            active: AtomicBool::new(true),
        }
    }

    pub(crate) fn coordinator(&self) -> &Coordinator<Response, FetchError> {
        &self.coordinator
    }

    pub(crate) fn log(&self) -> &Arc<RequestLog> {
        &self.log
    }

    /// Stop debouncing; later calls are forwarded directly
    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub(crate) async fn dispatch<F, Fut>(&self, call: CallDescriptor, forward: F) -> Result<Response, FetchError>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, FetchError>> + Send + 'static,
    {
        let classification = if self.active.load(Ordering::SeqCst) {
            self.classifier.classify(&call)
        } else {
            debug!("Interceptor inactive, forwarding {} {}", call.method, call.url);
            return forward().await;
        };

        let forward = Arc::new(self.recorded(&call, &classification, forward));
        if !classification.eligible {
            return forward().await;
        }

        let mut pending = {
            let forward = forward.clone();
            self.coordinator
                .schedule(classification.key.clone(), classification.delay, move || forward())
        };
        let settlement = pending.settlement();

        match (&mut pending).await {
            Ok(response) => Ok(response),
            Err(DebounceError::Forward(e)) => Err(e),
            Err(DebounceError::Superseded) => match settlement.wait().await {
                Ok(response) => Ok(response),
                Err(DebounceError::Forward(e)) => Err(e),
                Err(_) => {
                    info!("Burst for {} ended without a forward", classification.key);
                    Err(FetchError::Aborted)
                }
            },
            Err(DebounceError::Cancelled) => {
                info!("Debounced call for {} cancelled, sending directly", classification.key);
                let outcome = forward().await;
                pending.settle(outcome.clone());
                outcome
            }
        }
    }

    /// Wrap `forward` so every physical call lands in the request log
    fn recorded<F, Fut>(
        &self,
        call: &CallDescriptor,
        classification: &Classification,
        forward: F,
    ) -> impl Fn() -> BoxFuture<'static, Result<Response, FetchError>> + Send + Sync + 'static
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, FetchError>> + Send + 'static,
    {
        let log = self.log.clone();
        let kind = call.kind;
        let method = call.method.clone();
        let url = call.url.clone();
        let operation = classification.operation.clone();
        let debounced = classification.eligible;

        move || -> BoxFuture<'static, Result<Response, FetchError>> {
            let log = log.clone();
            let record = RequestRecord::new(kind, &method, &url, operation.clone(), debounced);
            let request = forward();
            Box::pin(async move {
                let started = Instant::now();
                debug!("Forwarding {} {}", record.method, record.url);
                let outcome = request.await;
                log.record(record.finish(started.elapsed(), &outcome));
                outcome
            })
        }
    }
}
