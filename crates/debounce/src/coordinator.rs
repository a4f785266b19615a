//! Per-key debounce coordination
//!
//! The coordinator keeps at most one pending invocation per [`DebounceKey`].
//! Scheduling a call for a key that already has one supersedes it: the older
//! caller's [`Pending`] completes with [`DebounceError::Superseded`] before the
//! new call is armed. When a timer expires the invocation leaves the table and
//! its forward function runs, driven by whoever awaits the [`Pending`].
//!
//! Every invocation in a burst (a run of supersessions on one key) shares a
//! [`Settlement`], which resolves to the outcome of the call that was finally
//! forwarded. The burst outlives its latest caller:
//! - a released call whose caller went away is forwarded on the runtime if
//!   anyone still waits on the settlement
//! - a cancelled call can publish the outcome of however its caller sent it
//!   instead, through [`Pending::settle`]

use crate::timer::{Timer, TimerHandle};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use quell_core::DebounceKey;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tracing::{debug, trace, warn};

/// Why a debounced call did not produce the forwarded outcome
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebounceError<E> {
    /// A newer call for the same key replaced this one
    #[error("superseded by a newer call for the same key")]
    Superseded,

    /// Cancelled through `cancel`/`cancel_all`, or the coordinator went away
    #[error("debounced call cancelled")]
    Cancelled,

    /// The forwarded call itself failed
    #[error("forwarded call failed: {0}")]
    Forward(E),
}

type ForwardFn<T, E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, E>> + Send>;
type Outcome<T, E> = Option<Result<T, E>>;
type Held<T, E> = Arc<Mutex<Option<watch::Sender<Outcome<T, E>>>>>;

enum Signal<T, E> {
    Release {
        forward: ForwardFn<T, E>,
        settle: watch::Sender<Outcome<T, E>>,
    },
    Superseded,
    Cancelled {
        settle: watch::Sender<Outcome<T, E>>,
    },
}

struct PendingInvocation<T, E> {
    id: u64,
    timer: TimerHandle,
    forward: ForwardFn<T, E>,
    notify: oneshot::Sender<Signal<T, E>>,
    settle: watch::Sender<Outcome<T, E>>,
}

struct Table<T, E> {
    entries: HashMap<DebounceKey, PendingInvocation<T, E>>,
    next_id: u64,
}

/// Table of pending invocations with cancel-and-replace semantics
pub struct Coordinator<T, E> {
    table: Arc<Mutex<Table<T, E>>>,
    timer: Arc<dyn Timer>,
}

impl<T, E> Clone for Coordinator<T, E> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            timer: self.timer.clone(),
        }
    }
}

impl<T, E> Coordinator<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new(timer: Arc<dyn Timer>) -> Self {
        Self {
            table: Arc::new(Mutex::new(Table {
                entries: HashMap::new(),
                next_id: 0,
            })),
            timer,
        }
    }

    /// Schedule `forward` to run after `delay`, superseding any pending call
    /// for `key`
    ///
    /// A zero delay goes through the same path: a second call for the key
    /// before the timer fires still supersedes the first.
    pub fn schedule<F, Fut>(&self, key: DebounceKey, delay: Duration, forward: F) -> Pending<T, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let forward: ForwardFn<T, E> =
            Box::new(move || -> BoxFuture<'static, Result<T, E>> { Box::pin(forward()) });
        let (notify, rx) = oneshot::channel();

        let mut table = self.table.lock();

        let settle = match table.entries.remove(&key) {
            Some(previous) => {
                debug!("Superseding pending call for {}", key);
                previous.timer.cancel();
                let _ = previous.notify.send(Signal::Superseded);
                previous.settle
            }
            None => watch::channel(None).0,
        };
        let settlement = Settlement {
            rx: settle.subscribe(),
        };

        let id = table.next_id;
        table.next_id += 1;

        let weak = Arc::downgrade(&self.table);
        let fire_key = key.clone();
        let timer = self
            .timer
            .arm(delay, Box::new(move || release(&weak, &fire_key, id)));

        table.entries.insert(
            key.clone(),
            PendingInvocation {
                id,
                timer,
                forward,
                notify,
                settle,
            },
        );
        trace!("Scheduled {} in {:?} ({} pending)", key, delay, table.entries.len());
        drop(table);

        let held: Held<T, E> = Arc::new(Mutex::new(None));
        Pending {
            key,
            settlement,
            held: held.clone(),
            inner: Box::pin(settle_pending(rx, held)),
        }
    }

    /// Cancel the pending call for `key`, if any
    pub fn cancel(&self, key: &DebounceKey) -> bool {
        let removed = self.table.lock().entries.remove(key);
        match removed {
            Some(entry) => {
                debug!("Cancelled pending call for {}", key);
                cancel_entry(entry);
                true
            }
            None => false,
        }
    }

    /// Cancel every pending call, returning how many were cancelled
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = {
            let mut table = self.table.lock();
            table.entries.drain().map(|(_, entry)| entry).collect()
        };

        let count = drained.len();
        for entry in drained {
            cancel_entry(entry);
        }
        if count > 0 {
            debug!("Cancelled {} pending calls", count);
        }
        count
    }

    pub fn pending_count(&self) -> usize {
        self.table.lock().entries.len()
    }

    pub fn is_pending(&self, key: &DebounceKey) -> bool {
        self.table.lock().entries.contains_key(key)
    }
}

impl<T, E> fmt::Debug for Coordinator<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("pending", &self.table.lock().entries.len())
            .finish()
    }
}

fn cancel_entry<T, E>(entry: PendingInvocation<T, E>) {
    entry.timer.cancel();
    let _ = entry.notify.send(Signal::Cancelled {
        settle: entry.settle,
    });
}

/// Timer callback: hand the forward function to the waiting caller
fn release<T, E>(table: &Weak<Mutex<Table<T, E>>>, key: &DebounceKey, id: u64)
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    let Some(table) = table.upgrade() else {
        return;
    };

    let entry = {
        let mut table = table.lock();
        if table.entries.get(key).map(|entry| entry.id) == Some(id) {
            table.entries.remove(key)
        } else {
            None
        }
    };

    let Some(entry) = entry else {
        trace!("Timer for {} fired after the call left the table", key);
        return;
    };

    debug!("Releasing debounced call for {}", key);
    let signal = Signal::Release {
        forward: entry.forward,
        settle: entry.settle,
    };
    if let Err(Signal::Release { forward, settle }) = entry.notify.send(signal) {
        forward_detached(key, forward, settle);
    }
}

/// Forward a released call whose caller went away, for the rest of its burst
fn forward_detached<T, E>(key: &DebounceKey, forward: ForwardFn<T, E>, settle: watch::Sender<Outcome<T, E>>)
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    if settle.receiver_count() == 0 {
        debug!("Caller for {} went away before release", key);
        return;
    }

    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            debug!("Caller for {} went away, forwarding for its burst", key);
            runtime.spawn(async move {
                let outcome = forward().await;
                settle.send_replace(Some(outcome));
            });
        }
        Err(_) => warn!("No runtime to forward abandoned call for {}", key),
    }
}

async fn settle_pending<T, E>(rx: oneshot::Receiver<Signal<T, E>>, held: Held<T, E>) -> Result<T, DebounceError<E>>
where
    T: Clone,
    E: Clone,
{
    match rx.await {
        Ok(Signal::Release { forward, settle }) => {
            let outcome = forward().await;
            settle.send_replace(Some(outcome.clone()));
            outcome.map_err(DebounceError::Forward)
        }
        Ok(Signal::Superseded) => Err(DebounceError::Superseded),
        Ok(Signal::Cancelled { settle }) => {
            *held.lock() = Some(settle);
            Err(DebounceError::Cancelled)
        }
        Err(_) => Err(DebounceError::Cancelled),
    }
}

/// Future for one scheduled call
///
/// Resolves once the call is superseded, cancelled, or forwarded. The
/// forward function runs inside this future. If it is dropped before release
/// the call is forwarded on the runtime only while the burst has other
/// waiters; dropping it mid-forward ends the burst without an outcome.
#[must_use = "a debounced call is only forwarded while its burst is awaited"]
pub struct Pending<T, E> {
    key: DebounceKey,
    settlement: Settlement<T, E>,
    held: Held<T, E>,
    inner: BoxFuture<'static, Result<T, DebounceError<E>>>,
}

impl<T, E> Pending<T, E> {
    pub fn key(&self) -> &DebounceKey {
        &self.key
    }

    /// Handle on the outcome of the burst this call belongs to
    pub fn settlement(&self) -> Settlement<T, E> {
        self.settlement.clone()
    }

    /// Publish the outcome for this call's burst after it was cancelled
    ///
    /// Only the call holding the burst when it was cancelled can settle it;
    /// returns false for any other call or once already settled.
    pub fn settle(&self, outcome: Result<T, E>) -> bool {
        match self.held.lock().take() {
            Some(settle) => {
                settle.send_replace(Some(outcome));
                true
            }
            None => false,
        }
    }
}

impl<T, E> Future for Pending<T, E> {
    type Output = Result<T, DebounceError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl<T, E> fmt::Debug for Pending<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending").field("key", &self.key).finish()
    }
}

/// Outcome of the one physical call a burst produced
pub struct Settlement<T, E> {
    rx: watch::Receiver<Outcome<T, E>>,
}

impl<T, E> Clone for Settlement<T, E> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T: Clone, E: Clone> Settlement<T, E> {
    /// Wait for the burst's forwarded outcome
    ///
    /// Resolves to [`DebounceError::Cancelled`] if the burst ends without a
    /// forward: cancelled, or its last caller dropped its [`Pending`].
    pub async fn wait(mut self) -> Result<T, DebounceError<E>> {
        loop {
            if let Some(outcome) = self.rx.borrow_and_update().clone() {
                return outcome.map_err(DebounceError::Forward);
            }
            if self.rx.changed().await.is_err() {
                return match self.rx.borrow().clone() {
                    Some(outcome) => outcome.map_err(DebounceError::Forward),
                    None => Err(DebounceError::Cancelled),
                };
            }
        }
    }

    /// Outcome if the burst already settled
    pub fn try_get(&self) -> Option<Result<T, E>> {
        self.rx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::{ManualTimer, TokioTimer};
    use futures::FutureExt;
    use quell_core::CallKind;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type TestCoordinator = Coordinator<u32, String>;

    fn key(discriminator: &str) -> DebounceKey {
        DebounceKey::new(CallKind::Rest, "https://api.test/search", Some(discriminator))
    }

    fn manual() -> (ManualTimer, TestCoordinator) {
        let timer = ManualTimer::new();
        let coordinator = Coordinator::new(Arc::new(timer.clone()));
        (timer, coordinator)
    }

    fn counting(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> futures::future::Ready<Result<u32, String>> + Send + 'static {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(value))
        }
    }

    const DELAY: Duration = Duration::from_millis(300);

    #[tokio::test]
    async fn test_single_call_forwards_after_delay() {
        let (timer, coordinator) = manual();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut pending = coordinator.schedule(key("GET"), DELAY, counting(&calls, 7));
        assert!(coordinator.is_pending(&key("GET")));
        assert!((&mut pending).now_or_never().is_none());

        timer.advance(Duration::from_millis(299));
        assert!(coordinator.is_pending(&key("GET")));

        timer.advance(Duration::from_millis(1));
        assert!(!coordinator.is_pending(&key("GET")));
        assert_eq!(pending.await, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_call_supersedes_first() {
        let (timer, coordinator) = manual();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = coordinator.schedule(key("GET"), DELAY, counting(&calls, 1));
        let settlement = first.settlement();
        timer.advance(Duration::from_millis(100));
        let second = coordinator.schedule(key("GET"), DELAY, counting(&calls, 2));

        // Rejected synchronously, before the newer call's timer runs
        assert_eq!(first.await, Err(DebounceError::Superseded));
        assert_eq!(coordinator.pending_count(), 1);
        assert!(settlement.try_get().is_none());

        // The first call's deadline passes without effect
        timer.advance(Duration::from_millis(200));
        assert_eq!(coordinator.pending_count(), 1);

        timer.advance(Duration::from_millis(100));
        assert_eq!(second.await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(settlement.wait().await, Ok(2));
    }

    #[tokio::test]
    async fn test_zero_delay_still_supersedes() {
        let (timer, coordinator) = manual();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = coordinator.schedule(key("GET"), Duration::ZERO, counting(&calls, 1));
        let second = coordinator.schedule(key("GET"), Duration::ZERO, counting(&calls, 2));

        timer.advance(Duration::ZERO);
        assert_eq!(first.await, Err(DebounceError::Superseded));
        assert_eq!(second.await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_same_tick_with_tokio_timer() {
        let coordinator: TestCoordinator = Coordinator::new(Arc::new(TokioTimer::new()));
        let calls = Arc::new(AtomicUsize::new(0));

        let first = coordinator.schedule(key("GET"), Duration::ZERO, counting(&calls, 1));
        let second = coordinator.schedule(key("GET"), Duration::ZERO, counting(&calls, 2));

        let (first, second) = tokio::join!(first, second);
        assert_eq!(first, Err(DebounceError::Superseded));
        assert_eq!(second, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_interfere() {
        let (timer, coordinator) = manual();
        let calls = Arc::new(AtomicUsize::new(0));

        let get = coordinator.schedule(key("GET"), DELAY, counting(&calls, 1));
        let post = coordinator.schedule(key("POST"), DELAY, counting(&calls, 2));
        assert_eq!(coordinator.pending_count(), 2);

        timer.advance(DELAY);
        assert_eq!(get.await, Ok(1));
        assert_eq!(post.await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_forward_failure_propagates_unchanged() {
        let (timer, coordinator) = manual();

        let pending = coordinator.schedule(key("GET"), DELAY, || async { Err::<u32, _>("503".to_string()) });
        let settlement = pending.settlement();

        timer.advance(DELAY);
        assert_eq!(pending.await, Err(DebounceError::Forward("503".to_string())));
        assert_eq!(settlement.wait().await, Err(DebounceError::Forward("503".to_string())));
    }

    #[tokio::test]
    async fn test_cancel_single_key() {
        let (timer, coordinator) = manual();
        let calls = Arc::new(AtomicUsize::new(0));

        let cancelled = coordinator.schedule(key("GET"), DELAY, counting(&calls, 1));
        let kept = coordinator.schedule(key("POST"), DELAY, counting(&calls, 2));

        assert!(coordinator.cancel(&key("GET")));
        assert!(!coordinator.cancel(&key("GET")));
        assert_eq!(cancelled.await, Err(DebounceError::Cancelled));

        timer.advance(DELAY);
        assert_eq!(kept.await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancel_all_rejects_everything() {
        let (timer, coordinator) = manual();
        let calls = Arc::new(AtomicUsize::new(0));

        let pendings: Vec<_> = ["GET", "POST", "PUT"]
            .iter()
            .map(|m| coordinator.schedule(key(m), DELAY, counting(&calls, 0)))
            .collect();
        let settlement = pendings[0].settlement();

        assert_eq!(coordinator.cancel_all(), 3);
        assert_eq!(coordinator.pending_count(), 0);
        assert_eq!(timer.armed(), 0);

        for pending in pendings {
            assert_eq!(pending.await, Err(DebounceError::Cancelled));
        }
        assert_eq!(settlement.wait().await, Err(DebounceError::Cancelled));

        timer.advance(DELAY);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dropped_latest_call_still_forwards_for_its_burst() {
        let (timer, coordinator) = manual();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = coordinator.schedule(key("GET"), DELAY, counting(&calls, 1));
        let settlement = first.settlement();
        let second = coordinator.schedule(key("GET"), DELAY, counting(&calls, 2));
        drop(second);

        timer.advance(DELAY);
        assert_eq!(first.await, Err(DebounceError::Superseded));
        assert_eq!(settlement.wait().await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_dropped_call_without_waiters_is_not_forwarded() {
        let (timer, coordinator) = manual();
        let calls = Arc::new(AtomicUsize::new(0));

        let pending = coordinator.schedule(key("GET"), DELAY, counting(&calls, 1));
        drop(pending);

        timer.advance(DELAY);
        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_call_settles_its_burst() {
        let (_timer, coordinator) = manual();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = coordinator.schedule(key("GET"), DELAY, counting(&calls, 1));
        let settlement = first.settlement();
        let mut second = coordinator.schedule(key("GET"), DELAY, counting(&calls, 2));

        assert!(coordinator.cancel(&key("GET")));
        assert_eq!((&mut second).await, Err(DebounceError::Cancelled));
        assert_eq!(first.await, Err(DebounceError::Superseded));

        assert!(second.settle(Ok(9)));
        assert!(!second.settle(Ok(10)));
        assert_eq!(settlement.wait().await, Ok(9));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_new_burst_after_release() {
        let (timer, coordinator) = manual();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = coordinator.schedule(key("GET"), DELAY, counting(&calls, 1));
        timer.advance(DELAY);

        let second = coordinator.schedule(key("GET"), DELAY, counting(&calls, 2));
        let second_settlement = second.settlement();

        // The released call is no longer in the table, so it is not superseded
        assert_eq!(first.await, Ok(1));

        timer.advance(DELAY);
        assert_eq!(second.await, Ok(2));
        assert_eq!(second_settlement.wait().await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_random_bursts_forward_one_call_per_quiet_period() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
        let (timer, coordinator) = manual();
        let calls = Arc::new(AtomicUsize::new(0));
        let methods = ["GET", "POST", "PUT", "DELETE"];

        let mut arrivals = Vec::new();
        let mut pendings = Vec::new();
        for value in 0..200u32 {
            let method = methods[rng.gen_range(0..methods.len())];
            arrivals.push((method, timer.now()));
            pendings.push(coordinator.schedule(key(method), DELAY, counting(&calls, value)));
            timer.advance(Duration::from_millis(rng.gen_range(0..40u64)));
        }
        timer.advance(DELAY);
        assert_eq!(coordinator.pending_count(), 0);

        // A call is forwarded iff the next call for its key arrived at or
        // after its deadline (or never arrived)
        let mut forwarded = 0;
        for (index, pending) in pendings.into_iter().enumerate() {
            let (method, at) = arrivals[index];
            let next = arrivals[index + 1..].iter().find(|(m, _)| *m == method);
            let released = next.map_or(true, |(_, next_at)| *next_at >= at + DELAY);

            let outcome = pending.await;
            if released {
                forwarded += 1;
                assert_eq!(outcome, Ok(index as u32));
            } else {
                assert_eq!(outcome, Err(DebounceError::Superseded));
            }
        }
        assert_eq!(calls.load(Ordering::SeqCst), forwarded);
        assert!(forwarded >= methods.len());
    }
}
