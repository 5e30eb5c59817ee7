//! One-timer-at-a-time phase scheduler.
//!
//! The controller never touches `tokio::time` directly for its phase timers.
//! `PhaseScheduler` owns the single live interval task and forwards its ticks
//! over a channel tagged with a generation number. Starting a timer always
//! stops the previous one first, and ticks from an older generation are
//! recognised as stale and dropped by the receiver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use crate::practice::phase::TimerKind;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub generation: u64,
    pub kind: TimerKind,
}

/// Counts timer tasks that have not been dropped yet.
#[derive(Debug, Clone, Default)]
pub struct TimerProbe(Arc<AtomicUsize>);

impl TimerProbe {
    pub fn live(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ActiveTimer {
    kind: TimerKind,
    handle: JoinHandle<()>,
}

pub struct PhaseScheduler {
    sender: UnboundedSender<TimerTick>,
    period: Duration,
    generation: u64,
    active: Option<ActiveTimer>,
    /// Aborted tasks that may not have been dropped yet.
    retired: Vec<JoinHandle<()>>,
    probe: TimerProbe,
}

impl PhaseScheduler {
    /// Creates a scheduler and the receiver its ticks are delivered to.
    pub fn new(period: Duration) -> (Self, UnboundedReceiver<TimerTick>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            sender,
            period,
            generation: 0,
            active: None,
            retired: Vec::new(),
            probe: TimerProbe::default(),
        };
        (scheduler, receiver)
    }

    /// Stops whatever is running and starts `kind`. The first tick arrives
    /// one period from now. Returns the new generation.
    pub fn start(&mut self, kind: TimerKind) -> u64 {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let period = self.period;
        let sender = self.sender.clone();
        let guard = LiveGuard::new(&self.probe.0);

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if sender.send(TimerTick { generation, kind }).is_err() {
                    break;
                }
            }
        });

        debug!("Started {kind:?} timer (generation {generation})");
        self.active = Some(ActiveTimer { kind, handle });
        generation
    }

    /// Stops the running timer, if any. Ticks it already queued become stale.
    pub fn cancel(&mut self) {
        self.retired.retain(|handle| !handle.is_finished());
        if let Some(timer) = self.active.take() {
            timer.handle.abort();
            debug!("Cancelled {:?} timer (generation {})", timer.kind, self.generation);
            self.retired.push(timer.handle);
        }
    }

    /// Cancels and waits until every timer task has actually been dropped.
    pub async fn shutdown(&mut self) {
        self.cancel();
        for handle in self.retired.drain(..) {
            // An aborted task resolves to a cancellation error.
            let _ = handle.await;
        }
    }

    pub fn active(&self) -> Option<TimerKind> {
        self.active.as_ref().map(|timer| timer.kind)
    }

    /// True when `tick` was produced by the timer that is running right now.
    pub fn is_current(&self, tick: &TimerTick) -> bool {
        tick.generation == self.generation && self.active() == Some(tick.kind)
    }

    pub fn probe(&self) -> TimerProbe {
        self.probe.clone()
    }
}

impl Drop for PhaseScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_ticks_once_per_period() {
        let (mut scheduler, mut ticks) = PhaseScheduler::new(TICK_PERIOD);
        let generation = scheduler.start(TimerKind::Countdown);

        let started = Instant::now();
        let tick = ticks.recv().await.unwrap();
        assert_eq!(
            tick,
            TimerTick {
                generation,
                kind: TimerKind::Countdown
            }
        );
        assert_eq!(started.elapsed(), TICK_PERIOD);
        assert!(scheduler.is_current(&tick));

        ticks.recv().await.unwrap();
        assert_eq!(started.elapsed(), TICK_PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_makes_queued_ticks_stale() {
        let (mut scheduler, mut ticks) = PhaseScheduler::new(TICK_PERIOD);
        scheduler.start(TimerKind::Countdown);
        let old = ticks.recv().await.unwrap();

        scheduler.start(TimerKind::Stopwatch);
        assert!(!scheduler.is_current(&old));
        assert_eq!(scheduler.active(), Some(TimerKind::Stopwatch));

        let fresh = ticks.recv().await.unwrap();
        assert_eq!(fresh.kind, TimerKind::Stopwatch);
        assert!(scheduler.is_current(&fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_leaves_no_live_timer() {
        let (mut scheduler, mut ticks) = PhaseScheduler::new(TICK_PERIOD);
        let probe = scheduler.probe();
        scheduler.start(TimerKind::Stopwatch);
        assert_eq!(probe.live(), 1);

        scheduler.shutdown().await;
        assert_eq!(probe.live(), 0);
        assert_eq!(scheduler.active(), None);

        tokio::time::sleep(TICK_PERIOD * 5).await;
        assert!(ticks.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_tick_is_not_current() {
        let (mut scheduler, mut ticks) = PhaseScheduler::new(TICK_PERIOD);
        scheduler.start(TimerKind::Countdown);
        let tick = ticks.recv().await.unwrap();
        scheduler.cancel();
        assert!(!scheduler.is_current(&tick));
    }
}
