//! Periodic trigger source for `Scheduled` mode.
//!
//! While counting, two independent tasks run:
//!
//! ```text
//! countdown  every 1s   remaining -= 1, wraps back to the full interval
//! firing     every N s  sends TriggerRequest { Scheduled, generation }
//! ```
//!
//! The countdown is display-only. Both tasks are aborted together on stop
//! and restarted together, so a restart always discards prior progress.
//! Each start bumps `generation`; the orchestrator drops scheduled requests
//! whose generation is no longer current, so nothing fires after a stop even
//! if a request was already queued.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::types::SyncTriggerSource;

/// A request to run a sync, queued for the orchestrator's dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerRequest {
    pub source: SyncTriggerSource,
    /// Scheduler generation for `Scheduled` requests, `None` otherwise.
    pub generation: Option<u64>,
}

impl TriggerRequest {
    pub fn new(source: SyncTriggerSource) -> Self {
        Self {
            source,
            generation: None,
        }
    }

    pub fn scheduled(generation: u64) -> Self {
        Self {
            source: SyncTriggerSource::Scheduled,
            generation: Some(generation),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Inactive,
    Counting,
}

#[derive(Debug, Default)]
pub struct PeriodicScheduler {
    generation: u64,
    interval_seconds: Option<u32>,
    remaining: Arc<AtomicU32>,
    countdown: Option<JoinHandle<()>>,
    firing: Option<JoinHandle<()>>,
}

impl PeriodicScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        if self.interval_seconds.is_some() {
            SchedulerState::Counting
        } else {
            SchedulerState::Inactive
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `true` if `generation` belongs to the currently running timers.
    pub fn is_current(&self, generation: u64) -> bool {
        self.interval_seconds.is_some() && self.generation == generation
    }

    /// Seconds left on the display countdown, `None` when inactive.
    pub fn remaining(&self) -> Option<u32> {
        self.interval_seconds
            .map(|_| self.remaining.load(Ordering::SeqCst))
    }

    /// Enter `Counting` with a fresh interval. Any running timers are
    /// cancelled first. Must be called inside a Tokio runtime.
    pub fn start(
        &mut self,
        interval_seconds: u32,
        triggers: mpsc::UnboundedSender<TriggerRequest>,
        notify: broadcast::Sender<()>,
    ) {
        self.stop();

        let interval_seconds = interval_seconds.max(1);
        self.generation += 1;
        self.interval_seconds = Some(interval_seconds);
        self.remaining.store(interval_seconds, Ordering::SeqCst);

        let generation = self.generation;
        let period = Duration::from_secs(u64::from(interval_seconds));

        let remaining = self.remaining.clone();
        let tick_notify = notify.clone();
        self.countdown = Some(tokio::spawn(async move {
            let second = Duration::from_secs(1);
            let mut ticker = interval_at(Instant::now() + second, second);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let prev = remaining.load(Ordering::SeqCst);
                let next = if prev <= 1 { interval_seconds } else { prev - 1 };
                remaining.store(next, Ordering::SeqCst);
                let _ = tick_notify.send(());
            }
        }));

        self.firing = Some(tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                debug!(generation, "scheduler interval elapsed");
                if triggers.send(TriggerRequest::scheduled(generation)).is_err() {
                    break; // dispatch loop gone
                }
            }
        }));

        let _ = notify.send(());
        info!(interval_seconds, generation, "periodic scheduler started");
    }

    /// Leave `Counting`. Both timers are aborted; no-op when inactive.
    pub fn stop(&mut self) {
        if let Some(handle) = self.countdown.take() {
            handle.abort();
        }
        if let Some(handle) = self.firing.take() {
            handle.abort();
        }
        if self.interval_seconds.take().is_some() {
            info!(generation = self.generation, "periodic scheduler stopped");
        }
    }
}

impl Drop for PeriodicScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> (
        mpsc::UnboundedSender<TriggerRequest>,
        mpsc::UnboundedReceiver<TriggerRequest>,
        broadcast::Sender<()>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (notify, _) = broadcast::channel(16);
        (tx, rx, notify)
    }

    #[test]
    fn new_scheduler_is_inactive() {
        let s = PeriodicScheduler::new();
        assert_eq!(s.state(), SchedulerState::Inactive);
        assert_eq!(s.remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn first_fire_happens_after_one_full_interval() {
        let (tx, mut rx, notify) = channels();
        let mut s = PeriodicScheduler::new();
        s.start(10, tx, notify);
        assert_eq!(s.state(), SchedulerState::Counting);

        tokio::time::sleep(Duration::from_millis(9_500)).await;
        assert!(rx.try_recv().is_err(), "must not fire before the interval");

        tokio::time::sleep(Duration::from_millis(1_000)).await;
        let req = rx.try_recv().unwrap();
        assert_eq!(req.source, SyncTriggerSource::Scheduled);
        assert_eq!(req.generation, Some(s.generation()));
        assert!(rx.try_recv().is_err(), "exactly one fire per interval");
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_ticks_and_wraps() {
        let (tx, _rx, notify) = channels();
        let mut s = PeriodicScheduler::new();
        s.start(10, tx, notify);
        assert_eq!(s.remaining(), Some(10));

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(s.remaining(), Some(7));

        tokio::time::sleep(Duration::from_millis(7_000)).await;
        assert_eq!(s.remaining(), Some(10));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_discards_progress() {
        let (tx, mut rx, notify) = channels();
        let mut s = PeriodicScheduler::new();
        s.start(60, tx.clone(), notify.clone());
        let first_gen = s.generation();

        tokio::time::sleep(Duration::from_millis(45_500)).await;
        assert_eq!(s.remaining(), Some(15));

        s.start(20, tx, notify);
        assert_eq!(s.remaining(), Some(20));
        assert!(!s.is_current(first_gen));

        // The old 60s timer would have fired at t=60 (14.5s from now).
        tokio::time::sleep(Duration::from_millis(19_000)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let req = rx.try_recv().unwrap();
        assert_eq!(req.generation, Some(s.generation()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_both_timers() {
        let (tx, mut rx, notify) = channels();
        let mut s = PeriodicScheduler::new();
        s.start(10, tx, notify);
        let generation = s.generation();
        s.stop();

        assert_eq!(s.state(), SchedulerState::Inactive);
        assert!(!s.is_current(generation));
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert!(rx.try_recv().is_err());
    }
}
