//! # chanselect
//!
//! Go-style channels and `select` on top of tokio.
//!
//! ## Channels
//! - [`Chan::new(0)`](Chan::new) is a rendezvous: a send completes only when a
//!   receiver takes the value
//! - [`Chan::new(n)`](Chan::new) buffers up to `n` values,
//!   [`Chan::unbounded`] never blocks a sender
//! - closing wakes every waiter; receivers drain what is buffered, then see `None`
//!
//! ## Select
//! - [`Select`] waits on several sends and receives and commits exactly one
//! - ready cases are picked at random unless the select is `biased`
//! - a `default` case runs when nothing is ready
//! - `send_with` defers evaluating the value until the case commits
//!
//! ## Demos
//! The [`demo`] module holds the classic snippets (selector loop,
//! rendezvous pair, Fibonacci with quit, ticker) that the binaries run.

mod arm;
pub mod chan;
pub mod config;
pub mod demo;
pub mod error;
mod queue;
pub mod select;
mod signal;
pub mod timer;
pub mod trace;

pub use chan::{Chan, ChanStats};
pub use config::{ConfigError, DemoConfig, Evaluation};
pub use demo::{DemoError, Transcript};
pub use error::{ChanError, SelectError, SendError, TryRecvError, TrySendError};
pub use select::{select, Select};
pub use timer::Timer;
pub use trace::init_tracing;
