//! One-shot commit token shared by every case of a single select.
//!
//! Whoever fires the signal first decides which case of the select won. A
//! counterpart that wants to pair with a parked case has to fire both its own
//! signal and the parked one in the same step, otherwise a select could end
//! up committed on two channels at once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

/// Case index recorded when the owner of the signal gave up waiting.
const CANCELLED: usize = usize::MAX;

/// Locks a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct State {
    fired: Option<usize>,
    waker: Option<Waker>,
}

impl State {
    fn fire(&mut self, case: usize) {
        self.fired = Some(case);
        if let Some(waker) = self.waker.take() {
            waker.wake();
        }
    }
}

/// Result of trying to commit two signals together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Pairing {
    /// Both signals fired.
    Fired,
    /// The claimant had already been fired by somebody else.
    Preempted,
    /// The parked counterpart is already done; its entry can be discarded.
    Stale,
}

#[derive(Default)]
pub(crate) struct Signal {
    state: Mutex<State>,
}

impl Signal {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fires the signal for `case` unless it already fired.
    pub(crate) fn try_fire(&self, case: usize) -> bool {
        let mut state = lock(&self.state);
        if state.fired.is_some() {
            return false;
        }
        state.fire(case);
        true
    }

    /// Fires `own` for `own_case` and `other` for `other_case`, or neither.
    ///
    /// The two mutexes are taken in address order so that two claimants
    /// pairing against each other cannot deadlock.
    pub(crate) fn pair(own: &Signal, own_case: usize, other: &Signal, other_case: usize) -> Pairing {
        debug_assert!(!std::ptr::eq(own, other), "a select cannot pair with itself");
        let own_first = (own as *const Signal) < (other as *const Signal);
        let (mut first, mut second) = if own_first {
            (lock(&own.state), lock(&other.state))
        } else {
            (lock(&other.state), lock(&own.state))
        };
        let (own_state, other_state) = if own_first {
            (&mut *first, &mut *second)
        } else {
            (&mut *second, &mut *first)
        };

        if own_state.fired.is_some() {
            return Pairing::Preempted;
        }
        if other_state.fired.is_some() {
            return Pairing::Stale;
        }
        own_state.fire(own_case);
        other_state.fire(other_case);
        Pairing::Fired
    }

    /// Marks the signal as abandoned. Returns the winning case if a
    /// counterpart committed one before the owner gave up.
    pub(crate) fn cancel(&self) -> Result<(), usize> {
        let mut state = lock(&self.state);
        match state.fired {
            Some(case) if case != CANCELLED => Err(case),
            Some(_) => Ok(()),
            None => {
                state.fired = Some(CANCELLED);
                state.waker = None;
                Ok(())
            }
        }
    }

    pub(crate) fn is_fired(&self) -> bool {
        lock(&self.state).fired.is_some()
    }

    /// Resolves to the winning case once the signal fires.
    pub(crate) fn poll_fired(&self, cx: &mut Context<'_>) -> Poll<usize> {
        let mut state = lock(&self.state);
        match state.fired {
            Some(case) => Poll::Ready(case),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
