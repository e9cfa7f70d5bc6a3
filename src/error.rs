use std::fmt;
use thiserror::Error;

// =============================================================================
// Channel errors
// =============================================================================

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanError {
    #[error("channel is closed")]
    Closed,
}

/// Returned by `Chan::send` when the channel was closed before the value
/// could be delivered. The value is handed back to the caller.
#[derive(Error, PartialEq, Eq)]
#[error("sending on a closed channel")]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

#[derive(Error, PartialEq, Eq)]
pub enum TrySendError<T> {
    #[error("channel is full")]
    Full(T),

    #[error("sending on a closed channel")]
    Closed(T),
}

impl<T> TrySendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            TrySendError::Full(value) | TrySendError::Closed(value) => value,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, TrySendError::Full(_))
    }
}

impl<T> fmt::Debug for TrySendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrySendError::Full(_) => f.write_str("Full(..)"),
            TrySendError::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryRecvError {
    #[error("channel is empty")]
    Empty,

    #[error("channel is closed and drained")]
    Closed,
}

// =============================================================================
// Select errors
// =============================================================================

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectError {
    #[error("select case {case} sent on a closed channel")]
    Closed { case: usize },

    #[error("select has no cases and no default")]
    NoCases,
}
