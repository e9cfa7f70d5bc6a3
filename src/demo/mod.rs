//! The classic channel snippets, each as a function the binaries and the
//! tests share. Progress lines go through a [`Transcript`] so tests can
//! inspect what a run printed.

pub mod fibonacci;
pub mod rendezvous;
pub mod selector;
pub mod ticker;
pub mod tour;

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

use crate::config::ConfigError;
use crate::error::{ChanError, SelectError};
use crate::signal::lock;

#[derive(Error, Debug)]
pub enum DemoError {
    #[error("{what} made no progress within {after:?}")]
    Stalled { what: &'static str, after: Duration },

    #[error("{0} was closed while the demo still needed it")]
    Closed(&'static str),

    #[error(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    Chan(#[from] ChanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Runs `future`, turning a wait longer than `stall` into [`DemoError::Stalled`].
pub async fn guard<F>(what: &'static str, stall: Duration, future: F) -> Result<F::Output, DemoError>
where
    F: Future,
{
    tokio::time::timeout(stall, future)
        .await
        .map_err(|_| DemoError::Stalled { what, after: stall })
}

/// Ordered record of the lines a demo printed.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Arc<Mutex<Vec<String>>>,
    echo: bool,
}

impl Transcript {
    /// Records lines and prints them to stdout.
    pub fn stdout() -> Self {
        Self {
            lines: Arc::default(),
            echo: true,
        }
    }

    /// Records lines without printing.
    pub fn silent() -> Self {
        Self::default()
    }

    pub fn line(&self, line: impl Into<String>) {
        let line = line.into();
        // push under the lock so concurrent writers stay in print order
        let mut lines = lock(&self.lines);
        if self.echo {
            println!("{}", line);
        }
        lines.push(line);
    }

    pub fn lines(&self) -> Vec<String> {
        lock(&self.lines).clone()
    }

    pub fn count(&self, line: &str) -> usize {
        lock(&self.lines).iter().filter(|l| l.as_str() == line).count()
    }

    pub fn position(&self, line: &str) -> Option<usize> {
        lock(&self.lines).iter().position(|l| l == line)
    }
}
