//! A one-shot timer channel, close to Go's `time.Timer`.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

use crate::chan::Chan;

pub struct Timer {
    /// Receives a single `()` once the timer fires.
    pub c: Chan<()>,
    task: JoinHandle<()>,
}

impl Timer {
    /// Starts a timer on the current tokio runtime.
    pub fn after(delay: Duration) -> Self {
        let c = Chan::new(1);
        let tx = c.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            trace!(?delay, "timer fired");
            let _ = tx.send(()).await;
        });
        Self { c, task }
    }

    /// Stops the timer. Returns `false` if it already fired.
    pub fn stop(&self) -> bool {
        let pending = !self.task.is_finished();
        self.task.abort();
        pending
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, timeout};

    #[tokio::test]
    async fn fires_after_delay() {
        let timer = Timer::after(Duration::from_millis(10));
        assert!(timer.c.try_recv().is_err());
        let fired = timeout(Duration::from_secs(5), timer.c.recv()).await.unwrap();
        assert_eq!(fired, Some(()));
    }

    #[tokio::test]
    async fn stopped_timer_never_fires() {
        let timer = Timer::after(Duration::from_millis(20));
        assert!(timer.stop());
        sleep(Duration::from_millis(40)).await;
        assert!(timer.c.try_recv().is_err());
    }
}
