//! Go-style channel: rendezvous, bounded or unbounded, closable.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Poll, Waker};

use futures::Stream;
use tracing::{debug, trace};

use crate::arm::{RecvArm, SendArm, Wait};
use crate::error::{ChanError, SendError, TryRecvError, TrySendError};
use crate::queue::{Claim, Hook, Parked, WaitQueue};
use crate::signal::{lock, Signal};

// =============================================================================
// Payloads and parked senders
// =============================================================================

/// Value carried by a send. `Deferred` is evaluated at the moment the send
/// commits, on whichever task completes the hand-off.
pub(crate) enum Payload<T> {
    Ready(T),
    Deferred(Box<dyn FnOnce() -> T + Send>),
}

impl<T> Payload<T> {
    pub(crate) fn resolve(self) -> T {
        match self {
            Payload::Ready(value) => value,
            Payload::Deferred(thunk) => thunk(),
        }
    }
}

pub(crate) type SendHook<T> = Hook<Payload<T>>;
pub(crate) type RecvHook<T> = Hook<T>;

/// A parked sender owns its payload while it waits in the queue.
pub(crate) struct ParkedSend<T> {
    hook: Arc<SendHook<T>>,
    payload: Payload<T>,
}

impl<T> Parked for ParkedSend<T> {
    type Slot = Payload<T>;

    fn hook(&self) -> &Arc<SendHook<T>> {
        &self.hook
    }
}

// =============================================================================
// Channel state
// =============================================================================

/// Peak occupancy observed over the lifetime of a channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChanStats {
    pub buffered_peak: usize,
    pub senders_peak: usize,
    pub receivers_peak: usize,
}

pub(crate) enum Offer<T> {
    Sent,
    Closed(Payload<T>),
    Full(Payload<T>),
    Preempted(Payload<T>),
}

pub(crate) enum Take<T> {
    Value(T),
    Closed,
    Empty,
    Preempted,
}

pub(crate) struct State<T> {
    buffer: VecDeque<T>,
    capacity: Option<usize>,
    closed: bool,
    senders: WaitQueue<ParkedSend<T>>,
    receivers: WaitQueue<Arc<RecvHook<T>>>,
    buffered_peak: usize,
    /// Tasks in `ready_send`, woken when room opens, a receiver parks or
    /// the channel closes.
    send_ready: Vec<Waker>,
}

impl<T> State<T> {
    fn new(capacity: Option<usize>) -> Self {
        Self {
            buffer: VecDeque::new(),
            capacity,
            closed: false,
            senders: WaitQueue::default(),
            receivers: WaitQueue::default(),
            buffered_peak: 0,
            send_ready: Vec::new(),
        }
    }

    fn has_room(&self) -> bool {
        self.capacity.map_or(true, |cap| self.buffer.len() < cap)
    }

    fn can_send(&self) -> bool {
        !self.closed && (self.receivers.has_live() || self.has_room())
    }

    fn wake_send_ready(&mut self) {
        for waker in self.send_ready.drain(..) {
            waker.wake();
        }
    }

    fn enqueue(&mut self, value: T) {
        self.buffer.push_back(value);
        self.buffered_peak = self.buffered_peak.max(self.buffer.len());
    }

    /// Attempts to deliver `payload` on behalf of case `case` of `own`.
    pub(crate) fn offer(&mut self, own: &Arc<Signal>, case: usize, payload: Payload<T>) -> Offer<T> {
        if self.closed {
            return if own.try_fire(case) {
                Offer::Closed(payload)
            } else {
                Offer::Preempted(payload)
            };
        }

        match self.receivers.claim(own, case) {
            Claim::Paired(hook) => {
                hook.fill(payload.resolve());
                trace!("send handed off to a parked receiver");
                return Offer::Sent;
            }
            Claim::Preempted => return Offer::Preempted(payload),
            Claim::Vacant => {}
        }

        if !self.has_room() {
            return Offer::Full(payload);
        }
        if !own.try_fire(case) {
            return Offer::Preempted(payload);
        }
        self.enqueue(payload.resolve());
        trace!(buffered = self.buffer.len(), "send queued");
        Offer::Sent
    }

    /// Attempts to receive on behalf of case `case` of `own`.
    pub(crate) fn take(&mut self, own: &Arc<Signal>, case: usize) -> Take<T> {
        if !self.buffer.is_empty() {
            if !own.try_fire(case) {
                return Take::Preempted;
            }
            let Some(value) = self.buffer.pop_front() else {
                return Take::Empty;
            };
            // a parked sender moves into the freed slot
            match self.senders.pop_live() {
                Some(parked) => self.enqueue(parked.payload.resolve()),
                None => self.wake_send_ready(),
            }
            trace!(buffered = self.buffer.len(), "recv from buffer");
            return Take::Value(value);
        }

        match self.senders.claim(own, case) {
            Claim::Paired(parked) => {
                trace!("recv took from a parked sender");
                return Take::Value(parked.payload.resolve());
            }
            Claim::Preempted => return Take::Preempted,
            Claim::Vacant => {}
        }

        if self.closed {
            return if own.try_fire(case) {
                Take::Closed
            } else {
                Take::Preempted
            };
        }
        Take::Empty
    }

    pub(crate) fn park_sender(&mut self, hook: Arc<SendHook<T>>, payload: Payload<T>) {
        self.senders.push(ParkedSend { hook, payload });
    }

    pub(crate) fn park_receiver(&mut self, hook: Arc<RecvHook<T>>) {
        self.receivers.push(hook);
        self.wake_send_ready();
    }

    pub(crate) fn withdraw_sender(&mut self, hook: &Arc<SendHook<T>>) {
        self.senders.remove(hook);
    }

    pub(crate) fn withdraw_receiver(&mut self, hook: &Arc<RecvHook<T>>) {
        self.receivers.remove(hook);
    }

    fn close(&mut self) -> Result<(), ChanError> {
        if self.closed {
            return Err(ChanError::Closed);
        }
        self.closed = true;

        let mut released = 0;
        for hook in self.receivers.drain() {
            if hook.fire() {
                released += 1;
            }
        }
        for parked in self.senders.drain() {
            if parked.hook.fire() {
                parked.hook.fill(parked.payload);
                released += 1;
            }
        }
        self.wake_send_ready();
        debug!(released, buffered = self.buffer.len(), "channel closed");
        Ok(())
    }
}

// =============================================================================
// Public handle
// =============================================================================

/// A channel handle. Clones share the same channel, like a Go `chan T`.
pub struct Chan<T> {
    shared: Arc<Mutex<State<T>>>,
}

impl<T> Clone for Chan<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Default for Chan<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> fmt::Debug for Chan<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Chan")
            .field("capacity", &state.capacity)
            .field("len", &state.buffer.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T> Chan<T> {
    /// Creates a channel holding up to `capacity` values. Zero gives a
    /// rendezvous channel where every send waits for a receiver.
    pub fn new(capacity: usize) -> Self {
        Self::with_capacity(Some(capacity))
    }

    pub fn unbounded() -> Self {
        Self::with_capacity(None)
    }

    fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(State::new(capacity))),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, State<T>> {
        lock(&self.shared)
    }

    /// `None` for unbounded channels.
    pub fn capacity(&self) -> Option<usize> {
        self.state().capacity
    }

    /// Number of buffered values.
    pub fn len(&self) -> usize {
        self.state().buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    pub fn stats(&self) -> ChanStats {
        let state = self.state();
        ChanStats {
            buffered_peak: state.buffered_peak,
            senders_peak: state.senders.peak_len(),
            receivers_peak: state.receivers.peak_len(),
        }
    }

    /// Whether a send would complete without waiting.
    pub fn can_send_now(&self) -> bool {
        self.state().can_send()
    }

    /// Waits until a send could complete without blocking, then returns
    /// without sending. Another sender may still take the room first, so
    /// pair it with [`Chan::try_send`] and retry on `Full`.
    pub async fn ready_send(&self) -> Result<(), ChanError> {
        futures::future::poll_fn(|cx| {
            let mut state = self.state();
            if state.closed {
                return Poll::Ready(Err(ChanError::Closed));
            }
            if state.can_send() {
                return Poll::Ready(Ok(()));
            }
            if !state.send_ready.iter().any(|waker| waker.will_wake(cx.waker())) {
                state.send_ready.push(cx.waker().clone());
            }
            Poll::Pending
        })
        .await
    }

    /// Whether a receive would produce a value without waiting.
    pub fn can_recv_now(&self) -> bool {
        let state = self.state();
        !state.buffer.is_empty() || state.senders.has_live()
    }

    /// Number of senders currently parked on the channel.
    pub fn waiting_senders(&self) -> usize {
        self.state().senders.len()
    }

    /// Number of receivers currently parked on the channel.
    pub fn waiting_receivers(&self) -> usize {
        self.state().receivers.len()
    }

    /// Closes the channel. Parked receivers wake up with `None`, parked
    /// senders get their value back. Values already buffered stay readable.
    pub fn close(&self) -> Result<(), ChanError> {
        self.state().close()
    }

    /// Sends without waiting.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let own = Signal::new();
        match self.state().offer(&own, 0, Payload::Ready(value)) {
            Offer::Sent => Ok(()),
            Offer::Closed(payload) => Err(TrySendError::Closed(payload.resolve())),
            Offer::Full(payload) | Offer::Preempted(payload) => {
                Err(TrySendError::Full(payload.resolve()))
            }
        }
    }

    /// Receives without waiting.
    pub fn try_recv(&self) -> Result<T, TryRecvError> {
        let own = Signal::new();
        match self.state().take(&own, 0) {
            Take::Value(value) => Ok(value),
            Take::Closed => Err(TryRecvError::Closed),
            Take::Empty | Take::Preempted => Err(TryRecvError::Empty),
        }
    }
}

impl<T: Send> Chan<T> {
    /// Sends a value, waiting for room or for a receiver.
    ///
    /// Dropping the future before it completes withdraws the value.
    pub async fn send(&self, value: T) -> Result<(), SendError<T>> {
        let mut arm = SendArm::new(self, Payload::Ready(value));
        Wait::single(&mut arm).await;
        arm.finish().map_err(|payload| SendError(payload.resolve()))
    }

    /// Receives a value, or `None` once the channel is closed and drained.
    ///
    /// Not cancel-safe. Dropping the future while it waits withdraws the
    /// receiver, but if a sender handed over a value just before the drop
    /// (for example when a `tokio::time::timeout` expires at that moment),
    /// the value is dropped with the future even though the send succeeded.
    /// Use [`Chan::try_recv`] or a select with a `default` case when values
    /// must not be lost on cancellation.
    pub async fn recv(&self) -> Option<T> {
        let mut arm = RecvArm::new(self);
        Wait::single(&mut arm).await;
        arm.finish()
    }

    pub fn send_blocking(&self, value: T) -> Result<(), SendError<T>> {
        futures::executor::block_on(self.send(value))
    }

    pub fn recv_blocking(&self) -> Option<T> {
        futures::executor::block_on(self.recv())
    }
}

impl<T: Send + 'static> Chan<T> {
    /// Stream of received values, ending when the channel is closed and
    /// drained.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send {
        futures::stream::unfold(self, |chan| async move {
            let value = chan.recv().await?;
            Some((value, chan))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    const LIMIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn push_close_and_read() {
        let ch = Chan::unbounded();
        ch.send(1).await.unwrap();
        ch.send(2).await.unwrap();
        ch.close().unwrap();

        let items: Vec<i32> = ch.clone().into_stream().collect().await;
        assert_eq!(items, vec![1, 2]);
        assert_eq!(ch.recv().await, None);
    }

    #[tokio::test]
    async fn buffered_values_come_out_in_order() {
        let ch = Chan::new(5);
        for i in 0..5 {
            ch.send(i).await.unwrap();
        }
        assert_eq!(ch.len(), 5);
        for i in 0..5 {
            assert_eq!(ch.recv().await, Some(i));
        }
    }

    #[tokio::test]
    async fn slow_writer_fast_reader() {
        let ch = Chan::new(5);
        let writer = {
            let ch = ch.clone();
            tokio::spawn(async move {
                for i in 0..20 {
                    sleep(Duration::from_millis(2)).await;
                    ch.send(i).await.unwrap();
                }
                ch.close().unwrap();
            })
        };

        let read: Vec<i32> = timeout(LIMIT, ch.clone().into_stream().collect())
            .await
            .expect("reader stalled");
        writer.await.unwrap();

        assert_eq!(read, (0..20).collect::<Vec<_>>());
        let stats = ch.stats();
        assert_eq!(stats.receivers_peak, 1);
        assert_eq!(stats.senders_peak, 0);
    }

    #[tokio::test]
    async fn late_reader_sees_full_buffer() {
        let ch = Chan::new(5);
        let writer = {
            let ch = ch.clone();
            tokio::spawn(async move {
                for i in 0..30 {
                    ch.send(i).await.unwrap();
                }
                ch.close().unwrap();
            })
        };

        sleep(Duration::from_millis(50)).await;
        let read: Vec<i32> = timeout(LIMIT, ch.clone().into_stream().collect())
            .await
            .expect("reader stalled");
        writer.await.unwrap();

        assert_eq!(read, (0..30).collect::<Vec<_>>());
        let stats = ch.stats();
        assert_eq!(stats.buffered_peak, 5);
        assert_eq!(stats.senders_peak, 1);
        assert_eq!(stats.receivers_peak, 0);
    }

    #[tokio::test]
    async fn one_writer_many_readers() {
        let ch = Chan::new(5);
        let readers: Vec<_> = (0..10)
            .map(|_| {
                let ch = ch.clone();
                tokio::spawn(async move { ch.into_stream().collect::<Vec<i32>>().await })
            })
            .collect();

        for i in 0..100 {
            ch.send(i).await.unwrap();
        }
        ch.close().unwrap();

        let mut all = Vec::new();
        for reader in readers {
            all.extend(timeout(LIMIT, reader).await.expect("reader stalled").unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..100).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn many_writers_one_reader() {
        let ch = Chan::unbounded();
        let writers: Vec<_> = (0..10)
            .map(|w| {
                let ch = ch.clone();
                tokio::spawn(async move {
                    for j in 0..100 {
                        ch.send(w * 100 + j).await.unwrap();
                    }
                })
            })
            .collect();

        let reader = tokio::spawn(ch.clone().into_stream().collect::<Vec<i32>>());
        for writer in writers {
            writer.await.unwrap();
        }
        ch.close().unwrap();

        let mut read = timeout(LIMIT, reader).await.expect("reader stalled").unwrap();
        assert_eq!(read.len(), 1000);
        read.sort_unstable();
        assert_eq!(read, (0..1000).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn send_on_closed_returns_value() {
        let ch = Chan::<i32>::unbounded();
        ch.close().unwrap();
        assert_eq!(ch.send(1).await, Err(SendError(1)));
        assert_eq!(ch.close(), Err(ChanError::Closed));
    }

    #[tokio::test]
    async fn recv_after_scheduled_send() {
        let ch = Chan::unbounded();
        let sender = ch.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(5)).await;
            sender.send(1).await.unwrap();
        });

        assert_eq!(timeout(LIMIT, ch.recv()).await.unwrap(), Some(1));
        ch.close().unwrap();
        assert_eq!(ch.recv().await, None);
    }

    #[tokio::test]
    async fn rendezvous_pairs_without_deadlock() {
        let ch = Chan::new(0);
        let reader = {
            let ch = ch.clone();
            tokio::spawn(async move { ch.into_stream().collect::<Vec<i32>>().await })
        };
        for i in 0..100 {
            ch.send(i).await.unwrap();
        }
        ch.close().unwrap();

        let read = timeout(LIMIT, reader).await.expect("reader stalled").unwrap();
        assert_eq!(read, (0..100).collect::<Vec<_>>());
        assert_eq!(ch.stats().buffered_peak, 0);
    }

    #[tokio::test]
    async fn rendezvous_many_to_many() {
        let ch = Chan::new(0);
        let readers: Vec<_> = (0..5)
            .map(|_| tokio::spawn(ch.clone().into_stream().collect::<Vec<i32>>()))
            .collect();
        let writers: Vec<_> = (0..5)
            .map(|w| {
                let ch = ch.clone();
                tokio::spawn(async move {
                    for i in 0..100 {
                        ch.send(w * 100 + i).await.unwrap();
                    }
                })
            })
            .collect();

        for writer in writers {
            timeout(LIMIT, writer).await.expect("writer stalled").unwrap();
        }
        ch.close().unwrap();

        let mut all = Vec::new();
        for reader in readers {
            all.extend(reader.await.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..500).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn close_releases_parked_operations() {
        let ch = Chan::<i32>::new(0);
        let receiver = tokio::spawn({
            let ch = ch.clone();
            async move { ch.recv().await }
        });
        let sender = tokio::spawn({
            let ch = ch.clone();
            async move {
                sleep(Duration::from_millis(20)).await;
                ch.send(7).await
            }
        });

        sleep(Duration::from_millis(5)).await;
        assert_eq!(ch.waiting_receivers(), 1);
        ch.close().unwrap();
        assert_eq!(timeout(LIMIT, receiver).await.unwrap().unwrap(), None);
        assert_eq!(timeout(LIMIT, sender).await.unwrap().unwrap(), Err(SendError(7)));
    }

    #[tokio::test]
    async fn close_hands_back_parked_sender_value() {
        let ch = Chan::new(0);
        let sender = tokio::spawn({
            let ch = ch.clone();
            async move { ch.send(String::from("kept")).await }
        });

        sleep(Duration::from_millis(5)).await;
        assert_eq!(ch.waiting_senders(), 1);
        ch.close().unwrap();
        let err = timeout(LIMIT, sender).await.unwrap().unwrap().unwrap_err();
        assert_eq!(err.into_inner(), "kept");
    }

    #[test]
    fn try_operations_respect_capacity() {
        let ch = Chan::new(2);
        assert!(ch.try_send(1).is_ok());
        assert!(ch.try_send(2).is_ok());
        assert_eq!(ch.try_send(3), Err(TrySendError::Full(3)));

        assert_eq!(ch.try_recv(), Ok(1));
        assert_eq!(ch.try_recv(), Ok(2));
        assert_eq!(ch.try_recv(), Err(TryRecvError::Empty));

        ch.close().unwrap();
        assert_eq!(ch.try_send(4), Err(TrySendError::Closed(4)));
        assert_eq!(ch.try_recv(), Err(TryRecvError::Closed));
    }

    #[test]
    fn try_send_on_rendezvous_without_receiver_is_full() {
        let ch = Chan::new(0);
        assert_eq!(ch.try_send(1), Err(TrySendError::Full(1)));
        assert_eq!(ch.waiting_senders(), 0);
    }

    #[tokio::test]
    async fn readiness_probes() {
        let ch = Chan::<i32>::new(0);
        assert!(!ch.can_send_now());
        assert!(!ch.can_recv_now());

        let receiver = tokio::spawn({
            let ch = ch.clone();
            async move { ch.recv().await }
        });
        sleep(Duration::from_millis(5)).await;
        assert!(ch.can_send_now());
        ch.send(1).await.unwrap();
        assert_eq!(receiver.await.unwrap(), Some(1));

        let sender = tokio::spawn({
            let ch = ch.clone();
            async move { ch.send(2).await }
        });
        sleep(Duration::from_millis(5)).await;
        assert!(ch.can_recv_now());
        assert_eq!(ch.recv().await, Some(2));
        sender.await.unwrap().unwrap();

        let buffered = Chan::new(1);
        assert!(buffered.can_send_now());
        buffered.send(1).await.unwrap();
        assert!(!buffered.can_send_now());
        assert!(buffered.can_recv_now());

        ch.close().unwrap();
        assert!(!ch.can_send_now());
        assert!(!ch.can_recv_now());
    }

    #[tokio::test]
    async fn dropped_recv_is_withdrawn() {
        let ch = Chan::<i32>::new(0);
        let pending = timeout(Duration::from_millis(10), ch.recv()).await;
        assert!(pending.is_err());
        assert_eq!(ch.waiting_receivers(), 0);
        assert_eq!(ch.try_send(1), Err(TrySendError::Full(1)));
    }

    #[tokio::test]
    async fn dropped_send_is_withdrawn() {
        let ch = Chan::new(0);
        let pending = timeout(Duration::from_millis(10), ch.send(9)).await;
        assert!(pending.is_err());
        assert_eq!(ch.waiting_senders(), 0);
        assert_eq!(ch.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn blocking_api_from_threads() {
        let ch = Chan::new(0);
        crossbeam::thread::scope(|s| {
            s.spawn(|_| {
                for i in 0..5 {
                    ch.send_blocking(i).unwrap();
                }
                ch.close().unwrap();
            });
            let mut read = Vec::new();
            while let Some(value) = ch.recv_blocking() {
                read.push(value);
            }
            assert_eq!(read, vec![0, 1, 2, 3, 4]);
        })
        .unwrap();
    }

    #[tokio::test]
    async fn cancelled_recv_leaves_next_value_for_others() {
        let ch: Chan<i32> = Chan::new(0);
        assert!(timeout(Duration::from_millis(10), ch.recv()).await.is_err());
        assert_eq!(ch.waiting_receivers(), 0);
        // nobody is left to pair with, so the value stays with the sender
        assert!(ch.try_send(1).unwrap_err().is_full());

        let reader = tokio::spawn({
            let ch = ch.clone();
            async move { ch.recv().await }
        });
        timeout(LIMIT, ch.send(2)).await.unwrap().unwrap();
        assert_eq!(reader.await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn ready_send_waits_for_receiver_on_rendezvous() {
        let ch: Chan<i32> = Chan::new(0);
        assert!(timeout(Duration::from_millis(10), ch.ready_send()).await.is_err());

        let reader = tokio::spawn({
            let ch = ch.clone();
            async move { ch.recv().await }
        });
        timeout(LIMIT, ch.ready_send()).await.unwrap().unwrap();
        ch.try_send(3).unwrap();
        assert_eq!(timeout(LIMIT, reader).await.unwrap().unwrap(), Some(3));
    }

    #[tokio::test]
    async fn ready_send_waits_for_room_in_full_buffer() {
        let ch = Chan::new(1);
        ch.try_send(1).unwrap();
        assert!(!ch.can_send_now());

        let waiter = tokio::spawn({
            let ch = ch.clone();
            async move { ch.ready_send().await }
        });
        sleep(Duration::from_millis(5)).await;
        assert!(!waiter.is_finished());

        assert_eq!(ch.try_recv(), Ok(1));
        timeout(LIMIT, waiter).await.unwrap().unwrap().unwrap();
        assert!(ch.try_send(2).is_ok());
    }

    #[tokio::test]
    async fn ready_send_fails_once_closed() {
        let ch: Chan<i32> = Chan::new(0);
        let waiter = tokio::spawn({
            let ch = ch.clone();
            async move { ch.ready_send().await }
        });
        sleep(Duration::from_millis(5)).await;
        ch.close().unwrap();
        assert_eq!(timeout(LIMIT, waiter).await.unwrap().unwrap(), Err(ChanError::Closed));
    }
}
