//! A ticking task races a one-shot timer. The loop prints `tick` for each
//! value on the tick channel until the timer fires.

use std::future::IntoFuture;
use std::time::Duration;

use super::{guard, DemoError, Transcript};
use crate::chan::Chan;
use crate::config::TimerConfig;
use crate::select::select;
use crate::timer::Timer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickerReport {
    pub ticks: usize,
    /// Whether the ticker closed its channel before the timeout.
    pub exhausted: bool,
}

enum Event {
    Tick,
    Exhausted,
    Timeout,
}

pub async fn run(config: &TimerConfig, stall: Duration, out: &Transcript) -> Result<TickerReport, DemoError> {
    let ch: Chan<()> = Chan::new(0);
    let ticker = {
        let ch = ch.clone();
        let (ticks, tick) = (config.ticks, config.tick());
        tokio::spawn(async move {
            for _ in 0..ticks {
                if ch.send(()).await.is_err() {
                    return;
                }
                tokio::time::sleep(tick).await;
            }
            let _ = ch.close();
        })
    };

    let timer = Timer::after(config.timeout());
    let mut report = TickerReport {
        ticks: 0,
        exhausted: false,
    };

    loop {
        let waiting = if report.exhausted {
            select().recv(&timer.c, |_| Event::Timeout)
        } else {
            select()
                .recv(&ch, |tick: Option<()>| match tick {
                    Some(()) => Event::Tick,
                    None => Event::Exhausted,
                })
                .recv(&timer.c, |_| Event::Timeout)
        };

        match guard("ticker", stall, waiting.into_future()).await?? {
            Event::Tick => {
                out.line("tick");
                report.ticks += 1;
            }
            Event::Exhausted => report.exhausted = true,
            Event::Timeout => {
                out.line("timeout");
                break;
            }
        }
    }

    ticker.abort();
    Ok(report)
}
