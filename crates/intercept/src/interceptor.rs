//! Install and remove the debouncing wrappers on a [`NetworkHost`]

use crate::channel::DebouncedChannelFactory;
use crate::fetch::DebouncedFetch;
use crate::history::RequestLog;
use crate::host::NetworkHost;
use crate::pipeline::Pipeline;
use crate::transport::{ChannelFactory, Fetch};
use debounce::{Coordinator, Timer};
use quell_core::{Classifier, SettingsProvider};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InterceptError {
    #[error("an interceptor is already installed on this host")]
    AlreadyInstalled,
}

/// Live interception of a host's network entry points
///
/// Dropping the interceptor uninstalls it.
pub struct Interceptor {
    host: Arc<NetworkHost>,
    pipeline: Arc<Pipeline>,
    originals: Option<(Arc<dyn Fetch>, Arc<dyn ChannelFactory>)>,
}

impl Interceptor {
    /// Replace `host`'s primitives with debouncing wrappers
    pub fn install(
        host: Arc<NetworkHost>,
        settings: Arc<dyn SettingsProvider>,
        timer: Arc<dyn Timer>,
    ) -> Result<Self, InterceptError> {
        if !host.claim() {
            return Err(InterceptError::AlreadyInstalled);
        }

        let pipeline = Arc::new(Pipeline::new(Classifier::new(settings), Coordinator::new(timer)));

        let original_fetch = host.fetcher();
        let original_channels = host.channel_factory();
        host.replace_fetch(Arc::new(DebouncedFetch::new(original_fetch.clone(), pipeline.clone())));
        host.replace_channels(Arc::new(DebouncedChannelFactory::new(
            original_channels.clone(),
            pipeline.clone(),
        )));

        info!("Network interceptor installed");
        Ok(Self {
            host,
            pipeline,
            originals: Some((original_fetch, original_channels)),
        })
    }

    /// Restore the original primitives and release every pending call
    pub fn uninstall(mut self) {
        self.restore();
    }

    /// Number of calls waiting out their delay
    pub fn pending(&self) -> usize {
        self.pipeline.coordinator().pending_count()
    }

    /// Cancel every pending call; their callers forward directly instead
    pub fn cancel_all(&self) -> usize {
        self.pipeline.coordinator().cancel_all()
    }

    /// Physical requests forwarded through the wrappers
    pub fn history(&self) -> Arc<RequestLog> {
        self.pipeline.log().clone()
    }

    fn restore(&mut self) {
        let Some((fetch, channels)) = self.originals.take() else {
            return;
        };

        self.host.replace_fetch(fetch);
        self.host.replace_channels(channels);
        self.pipeline.deactivate();
        let cancelled = self.pipeline.coordinator().cancel_all();
        self.host.release();

        info!("Network interceptor removed ({} pending calls released)", cancelled);
    }
}

impl Drop for Interceptor {
    fn drop(&mut self) {
        self.restore();
    }
}
