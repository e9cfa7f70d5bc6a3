//! The selector loop: every iteration races a send on a rendezvous channel
//! (`chToWrite`) against a receive from a buffered, preloaded channel
//! (`chToRead`). With nobody reading `chToWrite`, only the receive can
//! commit, so the loop drains the preloaded values in order.

use std::future::IntoFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{guard, DemoError, Transcript};
use crate::chan::Chan;
use crate::config::{Evaluation, SelectorConfig};
use crate::select::select;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorReport {
    /// Values received from `chToRead`, in order.
    pub reads: Vec<i32>,
    /// Number of iterations where the send case committed.
    pub writes: usize,
    /// How many times the send operand was evaluated.
    pub evaluations: usize,
    /// Values the optional reader task took from `chToWrite`.
    pub drained: Vec<i32>,
}

enum Picked {
    Wrote,
    Read(Option<i32>),
}

fn evaluate(value: i32, out: &Transcript, evaluations: &AtomicUsize) -> i32 {
    out.line("evaluating");
    evaluations.fetch_add(1, Ordering::SeqCst);
    value
}

pub async fn run(
    config: &SelectorConfig,
    stall: Duration,
    out: &Transcript,
) -> Result<SelectorReport, DemoError> {
    let to_write: Chan<i32> = Chan::new(0);
    let to_read: Chan<i32> = Chan::new(config.read_capacity);

    for &value in &config.preload {
        guard("preloading chToRead", stall, to_read.send(value))
            .await?
            .map_err(|_| DemoError::Closed("chToRead"))?;
    }

    let reader = config.with_reader.then(|| {
        let rx = to_write.clone();
        tokio::spawn(async move {
            let mut drained = Vec::new();
            while let Some(value) = rx.recv().await {
                drained.push(value);
            }
            drained
        })
    });

    let evaluations = Arc::new(AtomicUsize::new(0));
    let mut report = SelectorReport::default();

    for iteration in 0..config.iterations {
        let chosen = match config.evaluation {
            Evaluation::Eager => {
                let value = evaluate(config.evaluated, out, &evaluations);
                select()
                    .send(&to_write, value, || Picked::Wrote)
                    .recv(&to_read, Picked::Read)
            }
            Evaluation::Lazy => {
                let value = config.evaluated;
                let out = out.clone();
                let evaluations = Arc::clone(&evaluations);
                select()
                    .send_with(
                        &to_write,
                        move || evaluate(value, &out, &evaluations),
                        || Picked::Wrote,
                    )
                    .recv(&to_read, Picked::Read)
            }
        };

        match guard("selector loop", stall, chosen.into_future()).await?? {
            Picked::Wrote => {
                out.line("wrote to chToWrite");
                report.writes += 1;
            }
            Picked::Read(Some(value)) => {
                out.line(format!("read from chToRead {}", value));
                report.reads.push(value);
            }
            Picked::Read(None) => return Err(DemoError::Closed("chToRead")),
        }
        debug!(iteration, writes = report.writes, reads = report.reads.len(), "selector iteration done");
    }

    if let Some(reader) = reader {
        to_write.close()?;
        report.drained = guard("draining chToWrite", stall, reader).await??;
    }

    report.evaluations = evaluations.load(Ordering::SeqCst);
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn eager_loop_reads_preload_in_order() {
        let out = Transcript::silent();
        let report = run(&SelectorConfig::default(), LIMIT, &out).await.unwrap();

        assert_eq!(report.reads, vec![1, 2, 3]);
        assert_eq!(report.writes, 0);
        assert_eq!(report.evaluations, 3);
        assert_eq!(
            out.lines(),
            vec![
                "evaluating",
                "read from chToRead 1",
                "evaluating",
                "read from chToRead 2",
                "evaluating",
                "read from chToRead 3",
            ]
        );
    }

    #[tokio::test]
    async fn lazy_loop_never_evaluates_unchosen_send() {
        let config = SelectorConfig {
            evaluation: Evaluation::Lazy,
            ..SelectorConfig::default()
        };
        let out = Transcript::silent();
        let report = run(&config, LIMIT, &out).await.unwrap();

        assert_eq!(report.reads, vec![1, 2, 3]);
        assert_eq!(report.evaluations, 0);
        assert_eq!(out.count("evaluating"), 0);
        assert_eq!(out.count("wrote to chToWrite"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_reader_commits_one_case_per_iteration() {
        for evaluation in [Evaluation::Eager, Evaluation::Lazy] {
            let config = SelectorConfig {
                iterations: 20,
                evaluation,
                with_reader: true,
                ..SelectorConfig::default()
            };
            let out = Transcript::silent();
            let report = run(&config, LIMIT, &out).await.unwrap();

            assert_eq!(report.writes + report.reads.len(), 20);
            // each preloaded value is read at most once, in FIFO order
            assert_eq!(report.reads, config.preload[..report.reads.len()].to_vec());
            assert_eq!(report.drained, vec![42; report.writes]);
            assert_eq!(out.count("wrote to chToWrite"), report.writes);

            match evaluation {
                Evaluation::Eager => assert_eq!(report.evaluations, 20),
                Evaluation::Lazy => assert_eq!(report.evaluations, report.writes),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loop_without_reader_stalls_once_preload_runs_out() {
        let config = SelectorConfig {
            iterations: 4,
            ..SelectorConfig::default()
        };
        let out = Transcript::silent();
        let err = run(&config, Duration::from_millis(50), &out).await.unwrap_err();

        assert!(matches!(err, DemoError::Stalled { what: "selector loop", .. }));
        assert_eq!(out.count("evaluating"), 4);
    }
}
