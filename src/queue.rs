//! FIFO of parked senders or receivers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::signal::{lock, Pairing, Signal};

/// Handle shared between a parked operation and the channel it waits on.
///
/// The slot carries the value that completes the operation: the received
/// value for a receiver, or the returned payload for a sender whose channel
/// was closed.
pub(crate) struct Hook<S> {
    signal: Arc<Signal>,
    case: usize,
    slot: Mutex<Option<S>>,
}

impl<S> Hook<S> {
    pub(crate) fn new(signal: Arc<Signal>, case: usize) -> Arc<Self> {
        Arc::new(Self {
            signal,
            case,
            slot: Mutex::new(None),
        })
    }

    pub(crate) fn fill(&self, value: S) {
        *lock(&self.slot) = Some(value);
    }

    pub(crate) fn take(&self) -> Option<S> {
        lock(&self.slot).take()
    }

    /// Fires the owning select for this case, with no counterpart involved.
    pub(crate) fn fire(&self) -> bool {
        self.signal.try_fire(self.case)
    }

    pub(crate) fn is_live(&self) -> bool {
        !self.signal.is_fired()
    }
}

/// Anything that can sit in a [`WaitQueue`].
pub(crate) trait Parked {
    type Slot;

    fn hook(&self) -> &Arc<Hook<Self::Slot>>;
}

impl<S> Parked for Arc<Hook<S>> {
    type Slot = S;

    fn hook(&self) -> &Arc<Hook<S>> {
        self
    }
}

pub(crate) enum Claim<E> {
    /// A live entry was found and both sides committed.
    Paired(E),
    /// The claimant's own select already committed elsewhere.
    Preempted,
    /// Nobody is waiting.
    Vacant,
}

pub(crate) struct WaitQueue<E> {
    entries: VecDeque<E>,
    peak: usize,
}

impl<E> Default for WaitQueue<E> {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            peak: 0,
        }
    }
}

impl<E: Parked> WaitQueue<E> {
    pub(crate) fn push(&mut self, entry: E) {
        self.entries.push_back(entry);
        self.peak = self.peak.max(self.entries.len());
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn peak_len(&self) -> usize {
        self.peak
    }

    pub(crate) fn has_live(&self) -> bool {
        self.entries.iter().any(|entry| entry.hook().is_live())
    }

    /// Withdraws the entry parked through `hook`, if it is still queued.
    pub(crate) fn remove(&mut self, hook: &Arc<Hook<E::Slot>>) -> Option<E> {
        let index = self
            .entries
            .iter()
            .position(|entry| Arc::ptr_eq(entry.hook(), hook))?;
        self.entries.remove(index)
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = E> + '_ {
        self.entries.drain(..)
    }

    /// Pops the oldest entry whose select is still waiting, firing it.
    pub(crate) fn pop_live(&mut self) -> Option<E> {
        while let Some(entry) = self.entries.pop_front() {
            if entry.hook().fire() {
                return Some(entry);
            }
        }
        None
    }

    /// Commits the claimant (`own`, `case`) together with the oldest live
    /// entry. Entries that belong to the claimant's own select are skipped,
    /// entries whose select already finished are dropped.
    pub(crate) fn claim(&mut self, own: &Arc<Signal>, case: usize) -> Claim<E> {
        let mut index = 0;
        while index < self.entries.len() {
            let hook = self.entries[index].hook();
            if Arc::ptr_eq(&hook.signal, own) {
                index += 1;
                continue;
            }
            match Signal::pair(own, case, &hook.signal, hook.case) {
                Pairing::Fired => {
                    return match self.entries.remove(index) {
                        Some(entry) => Claim::Paired(entry),
                        None => Claim::Vacant,
                    };
                }
                Pairing::Preempted => return Claim::Preempted,
                Pairing::Stale => {
                    self.entries.remove(index);
                }
            }
        }
        Claim::Vacant
    }
}
