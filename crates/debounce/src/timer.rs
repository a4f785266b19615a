//! Cancellable one-shot timers
//!
//! The coordinator only needs "run this later" and "never mind". Two
//! implementations ship here: [`TokioTimer`] for real runtimes and
//! [`ManualTimer`], a simulated clock driven by [`ManualTimer::advance`].

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;

/// Callback run when a timer expires
pub type Fire = Box<dyn FnOnce() + Send + 'static>;

/// Source of cancellable one-shot timers
///
/// Implementations must never run `fire` from inside `arm`: the coordinator
/// arms timers while holding its table lock.
pub trait Timer: Send + Sync {
    fn arm(&self, delay: Duration, fire: Fire) -> TimerHandle;
}

/// Opaque handle to an armed timer
///
/// Dropping the handle leaves the timer armed; call [`cancel`](Self::cancel)
/// to disarm it.
pub struct TimerHandle {
    cancel: Box<dyn FnOnce() + Send + 'static>,
}

impl TimerHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Box::new(cancel),
        }
    }

    /// Disarm the timer; a no-op if it already fired
    pub fn cancel(self) {
        (self.cancel)();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle").finish_non_exhaustive()
    }
}

/// Timer backed by a tokio task per armed delay
#[derive(Debug, Clone)]
pub struct TokioTimer {
    runtime: Handle,
}

impl TokioTimer {
    /// Bind to the runtime of the calling context
    ///
    /// Panics outside a tokio runtime, like [`Handle::current`].
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    pub fn with_handle(runtime: Handle) -> Self {
        Self { runtime }
    }
}

impl Timer for TokioTimer {
    fn arm(&self, delay: Duration, fire: Fire) -> TimerHandle {
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            fire();
        });
        TimerHandle::new(move || task.abort())
    }
}

/// Simulated clock
///
/// Armed timers only fire when the clock is advanced past their deadline,
/// in deadline order (ties in arming order).
#[derive(Clone, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    seq: u64,
    armed: BTreeMap<(Duration, u64), Fire>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on the simulated clock
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of timers still armed
    pub fn armed(&self) -> usize {
        self.state.lock().armed.len()
    }

    /// Move the clock forward, firing every timer that comes due
    ///
    /// Callbacks run without the clock's lock held, so they may arm new
    /// timers; those fire in the same call if they fall within the window.
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().now + by;

        loop {
            let due = {
                let mut state = self.state.lock();
                match state.armed.first_key_value() {
                    Some((&(deadline, _), _)) if deadline <= target => {
                        state.now = deadline;
                        state.armed.pop_first().map(|(_, fire)| fire)
                    }
                    _ => None,
                }
            };

            match due {
                Some(fire) => fire(),
                None => break,
            }
        }

        self.state.lock().now = target;
    }
}

impl Timer for ManualTimer {
    fn arm(&self, delay: Duration, fire: Fire) -> TimerHandle {
        let mut state = self.state.lock();
        let slot = (state.now + delay, state.seq);
        state.seq += 1;
        state.armed.insert(slot, fire);

        let state: Weak<Mutex<ManualState>> = Arc::downgrade(&self.state);
        TimerHandle::new(move || {
            if let Some(state) = state.upgrade() {
                state.lock().armed.remove(&slot);
            }
        })
    }
}

impl fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualTimer")
            .field("now", &state.now)
            .field("armed", &state.armed.len())
            .finish()
    }
}
