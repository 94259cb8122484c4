//! Cancellable periodic ticker.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Runs a callback every `period` on a background tokio task.
///
/// The first tick fires one full period after spawning. Ticks never
/// overlap: the next one is not scheduled until the callback returns.
#[derive(Debug)]
pub struct Ticker {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl Ticker {
    /// Spawn a ticker that calls `on_tick` each period.
    pub fn spawn<F, Fut>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        // A dropped sender counts as a shutdown request.
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        on_tick().await;
                    }
                }
            }
        });

        Self { shutdown_tx, join }
    }

    /// Stop ticking and wait for the background task to exit.
    ///
    /// A tick that is already running is allowed to finish; once this
    /// returns no further tick will fire.
    pub async fn stop(self) {
        // ignore send error: the loop may already have exited
        let _ = self.shutdown_tx.send(true);
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_ticker(period: Duration) -> (Ticker, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let ticker = Ticker::spawn(period, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (ticker, count)
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_period() {
        let (ticker, count) = counting_ticker(Duration::from_millis(100));

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        ticker.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_stop() {
        let (ticker, count) = counting_ticker(Duration::from_millis(10));

        time::sleep(Duration::from_millis(35)).await;
        ticker.stop().await;
        let seen = count.load(Ordering::SeqCst);
        assert_eq!(seen, 3);

        time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), seen);
    }
}
