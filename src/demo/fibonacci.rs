// =============================================================================
// Milestone 1: Fibonacci with a quit channel
// =============================================================================
//
// The producer loops on a select: hand the next number to `c`, or stop when
// `quit` delivers. The consumer prints `count` numbers and then signals quit.

use std::future::IntoFuture;
use std::time::Duration;

use futures::StreamExt;
use tracing::debug;

use super::{guard, DemoError, Transcript};
use crate::chan::Chan;
use crate::select::select;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuitReport {
    /// Numbers the consumer printed.
    pub received: Vec<u64>,
    /// Sends the producer completed before it saw quit.
    pub sent: usize,
}

enum Next {
    Sent,
    Quit,
}

async fn produce(c: &Chan<u64>, quit: &Chan<()>, out: &Transcript) -> Result<usize, DemoError> {
    let (mut x, mut y) = (0u64, 1u64);
    let mut sent = 0;
    loop {
        let next = select()
            .send(c, x, || Next::Sent)
            .recv(quit, |_| Next::Quit)
            .into_future()
            .await?;
        match next {
            Next::Sent => {
                (x, y) = (y, x.wrapping_add(y));
                sent += 1;
            }
            Next::Quit => {
                out.line("quit");
                debug!(sent, "fibonacci producer stopped");
                return Ok(sent);
            }
        }
    }
}

pub async fn with_quit(
    count: usize,
    capacity: usize,
    stall: Duration,
    out: &Transcript,
) -> Result<QuitReport, DemoError> {
    let c: Chan<u64> = Chan::new(capacity);
    let quit: Chan<()> = Chan::new(0);

    let consumer = {
        let c = c.clone();
        let quit = quit.clone();
        let out = out.clone();
        tokio::spawn(async move {
            let mut received = Vec::with_capacity(count);
            for _ in 0..count {
                let Some(value) = c.recv().await else { break };
                out.line(value.to_string());
                received.push(value);
            }
            let _ = quit.send(()).await;
            received
        })
    };

    let sent = guard("fibonacci producer", stall, produce(&c, &quit, out)).await??;
    let received = guard("fibonacci consumer", stall, consumer).await??;
    Ok(QuitReport { received, sent })
}

// =============================================================================
// Milestone 2: Fibonacci over range and close
// =============================================================================

/// The producer fills a channel sized to `count`, closes it, and the consumer
/// ranges over it until it is drained.
pub async fn with_range(count: usize, stall: Duration, out: &Transcript) -> Result<Vec<u64>, DemoError> {
    let c: Chan<u64> = Chan::new(count);

    let producer = {
        let c = c.clone();
        tokio::spawn(async move {
            let (mut x, mut y) = (0u64, 1u64);
            for _ in 0..count {
                c.send(x).await.map_err(|_| DemoError::Closed("fibonacci channel"))?;
                (x, y) = (y, x.wrapping_add(y));
            }
            c.close()?;
            Ok::<_, DemoError>(())
        })
    };

    let mut values = Vec::with_capacity(count);
    let mut stream = Box::pin(c.into_stream());
    while let Some(value) = guard("fibonacci range", stall, stream.next()).await? {
        out.line(value.to_string());
        values.push(value);
    }

    guard("fibonacci producer", stall, producer).await???;
    Ok(values)
}
