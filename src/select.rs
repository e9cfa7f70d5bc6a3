//! Multi-way select over channel operations.
//!
//! ```no_run
//! # async fn demo() -> Result<(), chanselect::SelectError> {
//! use chanselect::{Chan, Select};
//!
//! let values = Chan::new(0);
//! let quit = Chan::<()>::new(0);
//! let stop = Select::new()
//!     .send(&values, 1, || false)
//!     .recv(&quit, |_| true)
//!     .await?;
//! # let _ = stop;
//! # Ok(())
//! # }
//! ```
//!
//! Every case carries a handler; the handler of the case that committed runs
//! after the select completes and its return value becomes the result.

use std::future::IntoFuture;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::arm::{Arm, RecvArm, SendArm, Step, Wait};
use crate::chan::{Chan, Payload};
use crate::error::SelectError;
use crate::signal::Signal;

trait Branch<R>: Arm {
    fn as_arm(&mut self) -> &mut dyn Arm;

    /// Runs the handler of the committed case.
    fn fire(self: Box<Self>, case: usize) -> Result<R, SelectError>;
}

struct SendBranch<'a, T, F> {
    arm: SendArm<'a, T>,
    handler: F,
}

impl<T: Send, F: Send> Arm for SendBranch<'_, T, F> {
    fn attempt(&mut self, signal: &Arc<Signal>, index: usize, park: bool) -> Step {
        self.arm.attempt(signal, index, park)
    }

    fn settle(&mut self) {
        self.arm.settle()
    }

    fn disarm(&mut self) {
        self.arm.disarm()
    }
}

impl<R, T, F> Branch<R> for SendBranch<'_, T, F>
where
    T: Send,
    F: FnOnce() -> R + Send,
{
    fn as_arm(&mut self) -> &mut dyn Arm {
        self
    }

    fn fire(self: Box<Self>, case: usize) -> Result<R, SelectError> {
        let SendBranch { arm, handler } = *self;
        match arm.finish() {
            Ok(()) => Ok(handler()),
            Err(_) => Err(SelectError::Closed { case }),
        }
    }
}

struct RecvBranch<'a, T, F> {
    arm: RecvArm<'a, T>,
    handler: F,
}

impl<T: Send, F: Send> Arm for RecvBranch<'_, T, F> {
    fn attempt(&mut self, signal: &Arc<Signal>, index: usize, park: bool) -> Step {
        self.arm.attempt(signal, index, park)
    }

    fn settle(&mut self) {
        self.arm.settle()
    }

    fn disarm(&mut self) {
        self.arm.disarm()
    }
}

impl<R, T, F> Branch<R> for RecvBranch<'_, T, F>
where
    T: Send,
    F: FnOnce(Option<T>) -> R + Send,
{
    fn as_arm(&mut self) -> &mut dyn Arm {
        self
    }

    fn fire(self: Box<Self>, _case: usize) -> Result<R, SelectError> {
        let RecvBranch { arm, handler } = *self;
        Ok(handler(arm.finish()))
    }
}

/// Builder for a select. Await it to run the select.
pub struct Select<'a, R> {
    branches: Vec<Box<dyn Branch<R> + 'a>>,
    default: Option<Box<dyn FnOnce() -> R + Send + 'a>>,
    biased: bool,
}

/// Shorthand for [`Select::new`].
pub fn select<'a, R>() -> Select<'a, R> {
    Select::new()
}

impl<R> Default for Select<'_, R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R> Select<'a, R> {
    pub fn new() -> Self {
        Self {
            branches: Vec::new(),
            default: None,
            biased: false,
        }
    }

    /// Checks cases in the order they were added instead of at random.
    pub fn biased(mut self) -> Self {
        self.biased = true;
        self
    }

    /// Sends `value`, which the caller has already evaluated.
    pub fn send<T, F>(mut self, chan: &'a Chan<T>, value: T, handler: F) -> Self
    where
        T: Send + 'a,
        F: FnOnce() -> R + Send + 'a,
    {
        self.branches.push(Box::new(SendBranch {
            arm: SendArm::new(chan, Payload::Ready(value)),
            handler,
        }));
        self
    }

    /// Sends the value produced by `thunk`, evaluated only if this case
    /// commits. The thunk runs on whichever task completes the hand-off,
    /// while that channel is locked, so it must not touch the same channel.
    pub fn send_with<T, V, F>(mut self, chan: &'a Chan<T>, thunk: V, handler: F) -> Self
    where
        T: Send + 'a,
        V: FnOnce() -> T + Send + 'static,
        F: FnOnce() -> R + Send + 'a,
    {
        self.branches.push(Box::new(SendBranch {
            arm: SendArm::new(chan, Payload::Deferred(Box::new(thunk))),
            handler,
        }));
        self
    }

    /// Receives from `chan`. The handler gets `None` if the channel is
    /// closed and drained.
    pub fn recv<T, F>(mut self, chan: &'a Chan<T>, handler: F) -> Self
    where
        T: Send + 'a,
        F: FnOnce(Option<T>) -> R + Send + 'a,
    {
        self.branches.push(Box::new(RecvBranch {
            arm: RecvArm::new(chan),
            handler,
        }));
        self
    }

    /// Runs instead of waiting when no case can proceed immediately.
    pub fn default<F>(mut self, handler: F) -> Self
    where
        F: FnOnce() -> R + Send + 'a,
    {
        self.default = Some(Box::new(handler));
        self
    }

    async fn run(mut self) -> Result<R, SelectError> {
        if self.branches.is_empty() {
            return self
                .default
                .take()
                .map(|fallback| fallback())
                .ok_or(SelectError::NoCases);
        }

        let winner = {
            let arms: Vec<&mut dyn Arm> = self
                .branches
                .iter_mut()
                .map(|branch| branch.as_arm())
                .collect();
            Wait::new(arms, self.biased, self.default.is_some()).await
        };

        match winner {
            Some(case) => self.branches.swap_remove(case).fire(case),
            None => self
                .default
                .take()
                .map(|fallback| fallback())
                .ok_or(SelectError::NoCases),
        }
    }
}

impl<'a, R: Send + 'a> IntoFuture for Select<'a, R> {
    type Output = Result<R, SelectError>;
    type IntoFuture = BoxFuture<'a, Result<R, SelectError>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.run())
    }
}
