//! Network interception for Quell
//!
//! This crate provides:
//! - The two network entry points a host exposes (fetch-style and
//!   open/send-style) as traits
//! - `NetworkHost`, the slots application code calls through
//! - `Interceptor`, which swaps those slots for debouncing wrappers
//! - A bounded log of physically forwarded requests
//! - A simulated network for replays and tests

pub mod channel;
pub mod fetch;
pub mod history;
pub mod host;
pub mod interceptor;
mod pipeline;
pub mod sim;
pub mod transport;

// Re-exports
pub use channel::{DebouncedChannel, DebouncedChannelFactory};
pub use fetch::DebouncedFetch;
pub use history::{RequestLog, RequestRecord, MAX_STORED_REQUESTS};
pub use host::NetworkHost;
pub use interceptor::{InterceptError, Interceptor};
pub use sim::SimulatedNetwork;
pub use transport::{Channel, ChannelFactory, Fetch, FetchError, Request, Response};
