//! Log of physically forwarded requests
//!
//! One record per call that actually reached the network, most recent
//! first, capped at [`MAX_STORED_REQUESTS`].

use crate::transport::{FetchError, Response};
use parking_lot::Mutex;
use quell_core::CallKind;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use ulid::Ulid;

pub const MAX_STORED_REQUESTS: usize = 100;

/// One forwarded request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: Ulid,
    pub kind: CallKind,
    pub method: String,
    pub url: String,
    pub operation: Option<String>,
    /// Whether the call went through the coordinator
    pub debounced: bool,
    /// Unix milliseconds
    pub started_at_ms: u64,
    pub duration_ms: u64,
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl RequestRecord {
    pub(crate) fn new(
        kind: CallKind,
        method: &str,
        url: &str,
        operation: Option<String>,
        debounced: bool,
    ) -> Self {
        Self {
            id: Ulid::new(),
            kind,
            method: method.to_string(),
            url: url.to_string(),
            operation,
            debounced,
            started_at_ms: unix_ms(SystemTime::now()),
            duration_ms: 0,
            status: None,
            error: None,
        }
    }

    pub(crate) fn finish(mut self, elapsed: Duration, outcome: &Result<Response, FetchError>) -> Self {
        self.duration_ms = elapsed.as_millis() as u64;
        match outcome {
            Ok(response) => self.status = Some(response.status),
            Err(e) => self.error = Some(e.to_string()),
        }
        self
    }
}

fn unix_ms(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Bounded, most-recent-first request log
#[derive(Debug)]
pub struct RequestLog {
    records: Mutex<VecDeque<RequestRecord>>,
    capacity: usize,
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::with_capacity(MAX_STORED_REQUESTS)
    }
}

impl RequestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Add a record, evicting the oldest beyond capacity
    pub fn record(&self, record: RequestRecord) {
        let mut records = self.records.lock();
        records.push_front(record);
        records.truncate(self.capacity);
    }

    /// Snapshot of all records, most recent first
    pub fn entries(&self) -> Vec<RequestRecord> {
        self.records.lock().iter().cloned().collect()
    }

    pub fn get(&self, id: &Ulid) -> Option<RequestRecord> {
        self.records.lock().iter().find(|r| r.id == *id).cloned()
    }

    /// Delete one record, returning whether it existed
    pub fn remove(&self, id: &Ulid) -> bool {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| r.id != *id);
        records.len() != before
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}
