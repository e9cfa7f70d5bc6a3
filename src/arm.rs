//! Single channel operations and the future that waits on a set of them.
//!
//! A select and a plain `send`/`recv` share the same machinery: every case is
//! an [`Arm`], and [`Wait`] drives a list of arms until exactly one commits.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rand::seq::SliceRandom;
use tracing::trace;

use crate::chan::{Chan, Offer, Payload, RecvHook, SendHook, Take};
use crate::queue::Hook;
use crate::signal::Signal;

/// Outcome of one attempt on one arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// The operation committed.
    Ready,
    /// Nothing to pair with and parking was not requested.
    Blocked,
    /// The operation now waits in the channel's queue.
    Parked,
    /// Another case of the same select committed first.
    Preempted,
}

pub(crate) trait Arm: Send {
    /// Tries to commit the operation as case `index` of `signal`. With
    /// `park` set, an operation that cannot commit is queued on its channel.
    fn attempt(&mut self, signal: &Arc<Signal>, index: usize, park: bool) -> Step;

    /// Collects the result left by the counterpart that fired this arm.
    fn settle(&mut self);

    /// Removes this arm's entry from its channel, if still queued.
    fn disarm(&mut self);
}

// =============================================================================
// Send
// =============================================================================

pub(crate) struct SendArm<'c, T> {
    chan: &'c Chan<T>,
    payload: Option<Payload<T>>,
    hook: Option<Arc<SendHook<T>>>,
    outcome: Option<Result<(), Payload<T>>>,
}

impl<'c, T> SendArm<'c, T> {
    pub(crate) fn new(chan: &'c Chan<T>, payload: Payload<T>) -> Self {
        Self {
            chan,
            payload: Some(payload),
            hook: None,
            outcome: None,
        }
    }

    /// `Err` carries the payload back when the channel was closed.
    pub(crate) fn finish(self) -> Result<(), Payload<T>> {
        match self.outcome {
            Some(outcome) => outcome,
            None => match self.payload {
                Some(payload) => Err(payload),
                None => Ok(()),
            },
        }
    }
}

impl<T: Send> Arm for SendArm<'_, T> {
    fn attempt(&mut self, signal: &Arc<Signal>, index: usize, park: bool) -> Step {
        let Some(payload) = self.payload.take() else {
            return Step::Blocked;
        };
        let mut state = self.chan.state();
        match state.offer(signal, index, payload) {
            Offer::Sent => {
                self.outcome = Some(Ok(()));
                Step::Ready
            }
            Offer::Closed(payload) => {
                self.outcome = Some(Err(payload));
                Step::Ready
            }
            Offer::Preempted(payload) => {
                self.payload = Some(payload);
                Step::Preempted
            }
            Offer::Full(payload) if park => {
                let hook = Hook::new(Arc::clone(signal), index);
                state.park_sender(Arc::clone(&hook), payload);
                self.hook = Some(hook);
                Step::Parked
            }
            Offer::Full(payload) => {
                self.payload = Some(payload);
                Step::Blocked
            }
        }
    }

    fn settle(&mut self) {
        if let Some(hook) = self.hook.take() {
            // the closer leaves the payload in the slot; a receiver leaves it empty
            let _state = self.chan.state();
            self.outcome = Some(match hook.take() {
                Some(payload) => Err(payload),
                None => Ok(()),
            });
        }
    }

    fn disarm(&mut self) {
        if let Some(hook) = self.hook.take() {
            self.chan.state().withdraw_sender(&hook);
        }
    }
}

// =============================================================================
// Receive
// =============================================================================

pub(crate) struct RecvArm<'c, T> {
    chan: &'c Chan<T>,
    hook: Option<Arc<RecvHook<T>>>,
    outcome: Option<Option<T>>,
}

impl<'c, T> RecvArm<'c, T> {
    pub(crate) fn new(chan: &'c Chan<T>) -> Self {
        Self {
            chan,
            hook: None,
            outcome: None,
        }
    }

    /// `None` when the channel was closed and drained.
    pub(crate) fn finish(self) -> Option<T> {
        self.outcome.flatten()
    }
}

impl<T: Send> Arm for RecvArm<'_, T> {
    fn attempt(&mut self, signal: &Arc<Signal>, index: usize, park: bool) -> Step {
        let mut state = self.chan.state();
        match state.take(signal, index) {
            Take::Value(value) => {
                self.outcome = Some(Some(value));
                Step::Ready
            }
            Take::Closed => {
                self.outcome = Some(None);
                Step::Ready
            }
            Take::Preempted => Step::Preempted,
            Take::Empty if park => {
                let hook = Hook::new(Arc::clone(signal), index);
                state.park_receiver(Arc::clone(&hook));
                self.hook = Some(hook);
                Step::Parked
            }
            Take::Empty => Step::Blocked,
        }
    }

    fn settle(&mut self) {
        if let Some(hook) = self.hook.take() {
            // the sender fills the slot while holding the channel lock
            let _state = self.chan.state();
            self.outcome = Some(hook.take());
        }
    }

    fn disarm(&mut self) {
        if let Some(hook) = self.hook.take() {
            self.chan.state().withdraw_receiver(&hook);
        }
    }
}

// =============================================================================
// Waiting on a set of arms
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    Parked,
    Done,
}

/// Resolves to the index of the arm that committed, or `None` when a
/// fallback was allowed and no arm could commit immediately.
pub(crate) struct Wait<'s> {
    arms: Vec<&'s mut (dyn Arm + 's)>,
    order: Vec<usize>,
    signal: Arc<Signal>,
    fallback: bool,
    phase: Phase,
}

impl<'s> Wait<'s> {
    pub(crate) fn new(arms: Vec<&'s mut (dyn Arm + 's)>, biased: bool, fallback: bool) -> Self {
        let mut order: Vec<usize> = (0..arms.len()).collect();
        if !biased {
            order.shuffle(&mut rand::thread_rng());
        }
        Self {
            arms,
            order,
            signal: Signal::new(),
            fallback,
            phase: Phase::Start,
        }
    }

    pub(crate) fn single(arm: &'s mut (dyn Arm + 's)) -> Self {
        Self::new(vec![arm], true, false)
    }

    /// Withdraws every arm except `winner`.
    fn release(&mut self, winner: Option<usize>) {
        for (index, arm) in self.arms.iter_mut().enumerate() {
            if Some(index) != winner {
                arm.disarm();
            }
        }
    }

    fn commit(&mut self, winner: usize) -> Poll<Option<usize>> {
        self.release(Some(winner));
        self.phase = Phase::Done;
        trace!(case = winner, "select committed");
        Poll::Ready(Some(winner))
    }

    /// Immediate pass followed by the parking pass.
    fn start(&mut self) -> Option<Poll<Option<usize>>> {
        let order = self.order.clone();

        for &index in &order {
            if self.arms[index].attempt(&self.signal, index, false) == Step::Ready {
                return Some(self.commit(index));
            }
        }

        if self.fallback {
            let _ = self.signal.cancel();
            self.phase = Phase::Done;
            return Some(Poll::Ready(None));
        }

        for &index in &order {
            match self.arms[index].attempt(&self.signal, index, true) {
                Step::Ready => return Some(self.commit(index)),
                Step::Preempted => break,
                Step::Parked | Step::Blocked => {}
            }
        }
        self.phase = Phase::Parked;
        None
    }
}

impl Future for Wait<'_> {
    type Output = Option<usize>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if this.phase == Phase::Start {
            if let Some(ready) = this.start() {
                return ready;
            }
        }

        match this.phase {
            Phase::Parked => match this.signal.poll_fired(cx) {
                Poll::Ready(winner) => {
                    this.arms[winner].settle();
                    this.commit(winner)
                }
                Poll::Pending => Poll::Pending,
            },
            Phase::Start | Phase::Done => panic!("`Wait` polled after completion"),
        }
    }
}

impl Drop for Wait<'_> {
    fn drop(&mut self) {
        if self.phase != Phase::Parked {
            return;
        }
        match self.signal.cancel() {
            Ok(()) => self.release(None),
            Err(winner) => {
                // committed just before being dropped; the result goes with the arm
                self.arms[winner].settle();
                self.release(Some(winner));
            }
        }
    }
}
