//! Blocking rendezvous: a reader task takes `count` values from an
//! unbuffered channel while the main task sends `0..count`. Each send
//! completes only once the matching receive has started.

use std::time::Duration;

use super::{guard, DemoError, Transcript};
use crate::chan::Chan;

pub async fn run(count: i32, stall: Duration, out: &Transcript) -> Result<Vec<i32>, DemoError> {
    let ch: Chan<i32> = Chan::new(0);

    let reader = {
        let ch = ch.clone();
        let out = out.clone();
        tokio::spawn(async move {
            let mut received = Vec::new();
            for _ in 0..count {
                out.line("receiving");
                match ch.recv().await {
                    Some(value) => {
                        out.line(format!("received {}", value));
                        received.push(value);
                    }
                    None => break,
                }
            }
            received
        })
    };

    for i in 0..count {
        guard("rendezvous send", stall, ch.send(i))
            .await?
            .map_err(|_| DemoError::Closed("rendezvous channel"))?;
        out.line(format!("sent {}", i));
    }

    let received = guard("rendezvous reader", stall, reader).await??;
    Ok(received)
}
