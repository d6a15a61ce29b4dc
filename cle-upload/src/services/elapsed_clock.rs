//! Elapsed-time clock
//!
//! A single repeating timer owned by the orchestrator. While running it calls
//! the tick handler once per interval with the whole seconds elapsed since
//! `start()`. The timer task is tied to a cancellation token, so `stop()`
//! (or dropping the clock) tears it down immediately.

use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Repeating elapsed-time ticker
///
/// Requires a tokio runtime when started.
#[derive(Debug)]
pub struct ElapsedClock {
    interval: Duration,
    started_at: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl ElapsedClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            started_at: None,
            cancel: None,
        }
    }

    /// Record the start instant and begin ticking
    ///
    /// No-op while already running: the original start instant is kept.
    pub fn start<F>(&mut self, on_tick: F)
    where
        F: Fn(u64) + Send + 'static,
    {
        if self.is_running() {
            return;
        }

        let started_at = Instant::now();
        let token = CancellationToken::new();
        let period = self.interval;
        let task_token = token.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(started_at + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => on_tick(started_at.elapsed().as_secs()),
                }
            }
        });

        self.started_at = Some(started_at);
        self.cancel = Some(token);
    }

    /// Stop ticking. Idempotent; safe when never started.
    pub fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.started_at = None;
    }

    pub fn is_running(&self) -> bool {
        self.cancel.is_some()
    }

    /// Whole seconds since `start()`, 0 when stopped
    pub fn elapsed_secs(&self) -> u64 {
        self.started_at
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Drop for ElapsedClock {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_clock() -> (ElapsedClock, Arc<Mutex<Vec<u64>>>) {
        (ElapsedClock::new(Duration::from_secs(1)), Arc::new(Mutex::new(Vec::new())))
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second_with_elapsed_seconds() {
        let (mut clock, ticks) = recording_clock();
        let sink = Arc::clone(&ticks);
        clock.start(move |elapsed| sink.lock().unwrap().push(elapsed));

        tokio::time::sleep(Duration::from_millis(3500)).await;

        assert_eq!(*ticks.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(clock.elapsed_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_silences_ticks() {
        let (mut clock, ticks) = recording_clock();
        clock.stop();

        let sink = Arc::clone(&ticks);
        clock.start(move |elapsed| sink.lock().unwrap().push(elapsed));
        tokio::time::sleep(Duration::from_millis(1500)).await;
        clock.stop();
        clock.stop();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(*ticks.lock().unwrap(), vec![1]);
        assert!(!clock.is_running());
        assert_eq!(clock.elapsed_secs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_keeps_original_instant() {
        let (mut clock, ticks) = recording_clock();
        let sink = Arc::clone(&ticks);
        clock.start(move |elapsed| sink.lock().unwrap().push(elapsed));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        clock.start(|_| panic!("second handler must not be installed"));
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(*ticks.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(clock.elapsed_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_clock_stops_the_timer() {
        let (mut clock, ticks) = recording_clock();
        let sink = Arc::clone(&ticks);
        clock.start(move |elapsed| sink.lock().unwrap().push(elapsed));
        drop(clock);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(ticks.lock().unwrap().is_empty());
    }
}
