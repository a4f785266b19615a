//! Replay a timed trace of calls through an installed interceptor
//!
//! The trace is a JSON array of calls:
//! - `at_ms`: offset from the start of the replay
//! - `shape`: `fetch` (default) or `channel`
//! - `method` (default `GET`), `url`, optional `body`
//!
//! Calls go through a simulated network with real timers, so the output shows
//! exactly which calls the current settings would collapse.

use crate::system_config::{self, FileSettings};
use anyhow::{Context, Result};
use bytes::Bytes;
use debounce::TokioTimer;
use intercept::{Channel, FetchError, Interceptor, NetworkHost, Request, Response, SimulatedNetwork};
use owo_colors::OwoColorize;
use quell_core::SettingsProvider;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    #[default]
    Fetch,
    Channel,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TraceCall {
    pub at_ms: u64,
    #[serde(default)]
    pub shape: Shape,
    #[serde(default = "default_method")]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub body: Option<String>,
}

fn default_method() -> String {
    "GET".to_string()
}

struct Settled {
    call: TraceCall,
    settled_ms: u128,
    outcome: Result<Response, FetchError>,
}

pub fn load_trace(path: &Path) -> Result<Vec<TraceCall>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read trace {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse trace {}", path.display()))
}

pub async fn run(trace: &Path, latency_ms: u64) -> Result<()> {
    let calls = load_trace(trace)?;
    let config_path = system_config::config_file_path()
        .context("Could not determine config file path")?;
    let settings = FileSettings::open(config_path)?;
    if settings.snapshot().map_or(true, |snapshot| snapshot.is_inert()) {
        println!(
            "{}",
            "No debounce patterns configured; every call is forwarded directly".yellow()
        );
    }

    let network = SimulatedNetwork::new().with_latency(Duration::from_millis(latency_ms));
    let host = Arc::new(NetworkHost::new(
        Arc::new(network.clone()),
        Arc::new(network.clone()),
    ));
    let interceptor = Interceptor::install(host.clone(), Arc::new(settings), Arc::new(TokioTimer::new()))
        .context("Failed to install interceptor")?;

    info!("Replaying {} calls from {}", calls.len(), trace.display());
    let total = calls.len();
    let start = Instant::now();

    let handles: Vec<_> = calls
        .into_iter()
        .map(|call| {
            let host = host.clone();
            tokio::spawn(async move {
                tokio::time::sleep_until(start + Duration::from_millis(call.at_ms)).await;
                let outcome = issue(&host, &call).await;
                Settled {
                    call,
                    settled_ms: start.elapsed().as_millis(),
                    outcome,
                }
            })
        })
        .collect();

    println!("{}", "Calls".bold());
    for handle in handles {
        let settled = handle.await.context("Replay task failed")?;
        print_settled(&settled);
    }

    println!("\n{}", "Forwarded".bold());
    let history = interceptor.history();
    for record in history.entries().iter().rev() {
        let status = match (record.status, &record.error) {
            (Some(status), _) => status.to_string().green().to_string(),
            (None, Some(error)) => error.red().to_string(),
            (None, None) => "-".dimmed().to_string(),
        };
        let via = if record.debounced { "debounced" } else { "direct" };
        println!(
            "  {:<7} {}  {}  {}",
            record.method,
            record.url.cyan(),
            via.dimmed(),
            status
        );
    }

    interceptor.uninstall();

    println!();
    println!("{} calls, {} forwarded", total, network.request_count());
    Ok(())
}

async fn issue(host: &NetworkHost, call: &TraceCall) -> Result<Response, FetchError> {
    match call.shape {
        Shape::Fetch => {
            let mut request = Request::new(&call.method, &call.url);
            if let Some(body) = &call.body {
                request = request.with_body(body.clone());
            }
            host.fetch(request).await
        }
        Shape::Channel => {
            let mut channel = host.channel();
            channel.open(&call.method, &call.url);
            channel.send(call.body.clone().map(Bytes::from)).await
        }
    }
}

fn print_settled(settled: &Settled) {
    let call = &settled.call;
    let result = match &settled.outcome {
        Ok(response) if response.is_success() => {
            format!("{} {}", response.status.green(), response.text().dimmed())
        }
        Ok(response) => format!("{} {}", response.status.yellow(), response.text().dimmed()),
        Err(e) => e.to_string().red().to_string(),
    };
    println!(
        "  {:>6}ms  {:<7} {}  -> {} (settled at {}ms)",
        call.at_ms,
        call.method,
        call.url.cyan(),
        result,
        settled.settled_ms
    );
}
