//! Two short warm-ups: summing the halves of a slice on two tasks, and
//! filling a buffered channel without any receiver.

use std::time::Duration;

use super::{guard, DemoError, Transcript};
use crate::chan::Chan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halves {
    pub first: i32,
    pub second: i32,
    pub total: i32,
}

fn spawn_sum(values: Vec<i32>, c: Chan<i32>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let sum = values.iter().sum();
        let _ = c.send(sum).await;
    })
}

/// Sums each half of `values` on its own task and combines the results.
/// The order of `first` and `second` depends on which task finishes first.
pub async fn sum_halves(values: &[i32], stall: Duration, out: &Transcript) -> Result<Halves, DemoError> {
    let c: Chan<i32> = Chan::new(0);
    let (left, right) = values.split_at(values.len() / 2);

    let workers = [spawn_sum(left.to_vec(), c.clone()), spawn_sum(right.to_vec(), c.clone())];

    let first = guard("sum of halves", stall, c.recv())
        .await?
        .ok_or(DemoError::Closed("sum channel"))?;
    let second = guard("sum of halves", stall, c.recv())
        .await?
        .ok_or(DemoError::Closed("sum channel"))?;

    for worker in workers {
        worker.await?;
    }

    let total = first + second;
    out.line(format!("{} {} {}", first, second, total));
    Ok(Halves { first, second, total })
}

/// Sends two values into a channel of capacity two, then reads them back on
/// the same task. A third send would block.
pub async fn buffered(out: &Transcript) -> Result<Vec<i32>, DemoError> {
    let ch: Chan<i32> = Chan::new(2);
    for value in [1, 2] {
        ch.try_send(value).map_err(|_| DemoError::Closed("buffered channel"))?;
    }

    let mut values = Vec::new();
    while let Ok(value) = ch.try_recv() {
        out.line(value.to_string());
        values.push(value);
    }
    Ok(values)
}
