//! Progress tracking for export operations
//!
//! Each cursor publishes its counters into a [`SliceProgress`]. A
//! [`ProgressReporter`] polls every slice at a fixed interval, folds the
//! snapshots into one [`ProgressTick`] and hands it to a [`ProgressObserver`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Point-in-time view of one slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceState {
    /// The first response has not arrived yet
    NotStarted,
    /// Total is known and documents remain
    InProgress { total: u64, retrieved: u64 },
    /// Every document of the slice has been retrieved
    Done { total: u64, retrieved: u64 },
}

/// Counters of one slice, written by its cursor and read by the reporter.
///
/// Readers may observe a `retrieved` value one batch newer than `total`
/// was published with; `total` never changes after the first publish, so the
/// snapshot stays consistent enough for display.
#[derive(Debug, Default)]
pub struct SliceProgress {
    started: AtomicBool,
    done: AtomicBool,
    total: AtomicU64,
    retrieved: AtomicU64,
}

impl SliceProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish new counters. `started` is released last so a reader that
    /// sees it also sees the first total.
    pub fn publish(&self, total: u64, retrieved: u64, done: bool) {
        self.total.store(total, Ordering::Relaxed);
        self.retrieved.store(retrieved, Ordering::Relaxed);
        self.done.store(done, Ordering::Relaxed);
        self.started.store(true, Ordering::Release);
    }

    pub fn snapshot(&self) -> SliceState {
        if !self.started.load(Ordering::Acquire) {
            return SliceState::NotStarted;
        }

        let total = self.total.load(Ordering::Relaxed);
        let retrieved = self.retrieved.load(Ordering::Relaxed);

        if self.done.load(Ordering::Relaxed) {
            SliceState::Done { total, retrieved }
        } else {
            SliceState::InProgress { total, retrieved }
        }
    }
}

/// Aggregate progress across every slice
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressTick {
    pub current: u64,
    pub total: u64,
    pub percent: f64,
}

impl ProgressTick {
    pub fn new(current: u64, total: u64) -> Self {
        let percent = if total > 0 {
            current as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            current,
            total,
            percent,
        }
    }

    /// Same counts, reported as finished
    pub fn completed(self) -> Self {
        Self {
            percent: 100.0,
            ..self
        }
    }
}

/// Fold slice snapshots into one tick.
///
/// Returns `None` until every slice has answered its first request, since
/// the grand total is meaningless before that.
pub fn aggregate<I>(states: I) -> Option<ProgressTick>
where
    I: IntoIterator<Item = SliceState>,
{
    let mut current = 0u64;
    let mut total = 0u64;
    let mut seen = false;

    for state in states {
        match state {
            SliceState::NotStarted => return None,
            SliceState::InProgress {
                total: t,
                retrieved: r,
            }
            | SliceState::Done {
                total: t,
                retrieved: r,
            } => {
                total += t;
                current += r;
                seen = true;
            }
        }
    }

    seen.then(|| ProgressTick::new(current, total))
}

/// Receives aggregate progress from the reporter
pub trait ProgressObserver: Send + Sync {
    /// Called on every poll once all totals are known
    fn on_tick(&self, tick: &ProgressTick);

    /// Called once when the export ends, with `percent` at 100
    fn on_complete(&self, tick: &ProgressTick);
}

/// Terminal progress bar
///
/// Renders `Progress: [current/total] percent%` along with the export speed.
pub struct ProgressBarObserver {
    bar: ProgressBar,
    start_time: Instant,
}

impl ProgressBarObserver {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("Progress: [{pos}/{len}] {percent}% [{bar:40.cyan/blue}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );

        Self {
            bar,
            start_time: Instant::now(),
        }
    }
}

impl Default for ProgressBarObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for ProgressBarObserver {
    fn on_tick(&self, tick: &ProgressTick) {
        self.bar.set_length(tick.total);
        self.bar.set_position(tick.current);

        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            let speed = tick.current as f64 / elapsed;
            self.bar.set_message(format!("({:.0} docs/sec)", speed));
        }
    }

    fn on_complete(&self, tick: &ProgressTick) {
        self.bar.set_length(tick.total);
        self.bar.set_position(tick.total);
        self.bar.finish();
    }
}

/// Progress as log events, for when no terminal bar is wanted
#[derive(Debug, Default)]
pub struct LogProgressObserver;

impl ProgressObserver for LogProgressObserver {
    fn on_tick(&self, tick: &ProgressTick) {
        info!(
            "Progress: [{}/{}] {:.0}%",
            tick.current, tick.total, tick.percent
        );
    }

    fn on_complete(&self, tick: &ProgressTick) {
        info!(
            "Progress: [{}/{}] {:.0}%",
            tick.current, tick.total, tick.percent
        );
    }
}

/// Reporter lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    WaitingForTotals,
    Reporting,
    Stopped,
}

/// What the reporter emitted before it stopped
#[derive(Debug, Clone, PartialEq)]
pub struct ReporterSummary {
    pub state: ReporterState,
    pub ticks: usize,
    pub final_tick: Option<ProgressTick>,
}

/// Polls every slice and forwards aggregate progress
pub struct ProgressReporter {
    slices: Vec<Arc<SliceProgress>>,
    observer: Arc<dyn ProgressObserver>,
    interval: Duration,
}

impl ProgressReporter {
    pub fn new(
        slices: Vec<Arc<SliceProgress>>,
        observer: Arc<dyn ProgressObserver>,
        interval: Duration,
    ) -> Self {
        Self {
            slices,
            observer,
            interval,
        }
    }

    /// Current aggregate, if every slice has a total
    pub fn snapshot(&self) -> Option<ProgressTick> {
        aggregate(self.slices.iter().map(|s| s.snapshot()))
    }

    /// Poll until `stop` is cancelled
    ///
    /// Ticks where some slice has no total yet are skipped silently. After
    /// the stop signal one final tick at 100% is emitted if an aggregate was
    /// ever available.
    pub async fn run(self, stop: CancellationToken) -> ReporterSummary {
        let mut state = ReporterState::WaitingForTotals;
        let mut ticks = 0usize;
        let mut last = None;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of an interval completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = ticker.tick() => {
                    let Some(tick) = self.snapshot() else {
                        continue;
                    };

                    if state == ReporterState::WaitingForTotals {
                        debug!("All slices reported totals, reporting progress");
                        state = ReporterState::Reporting;
                    }

                    self.observer.on_tick(&tick);
                    ticks += 1;
                    last = Some(tick);
                }
            }
        }

        let final_tick = self.snapshot().or(last).map(ProgressTick::completed);
        if let Some(tick) = &final_tick {
            self.observer.on_complete(tick);
        }

        ReporterSummary {
            state: ReporterState::Stopped,
            ticks,
            final_tick,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        ticks: Mutex<Vec<ProgressTick>>,
        completed: Mutex<Vec<ProgressTick>>,
    }

    impl ProgressObserver for RecordingObserver {
        fn on_tick(&self, tick: &ProgressTick) {
            self.ticks.lock().unwrap().push(*tick);
        }

        fn on_complete(&self, tick: &ProgressTick) {
            self.completed.lock().unwrap().push(*tick);
        }
    }

    #[test]
    fn test_aggregate_waits_for_every_total() {
        let states = [
            SliceState::InProgress {
                total: 10,
                retrieved: 5,
            },
            SliceState::NotStarted,
        ];
        assert_eq!(aggregate(states), None);
    }

    #[test]
    fn test_aggregate_sums_slices() {
        let states = [
            SliceState::InProgress {
                total: 10,
                retrieved: 5,
            },
            SliceState::InProgress {
                total: 20,
                retrieved: 10,
            },
        ];
        let tick = aggregate(states).unwrap();
        assert_eq!(tick.current, 15);
        assert_eq!(tick.total, 30);
        assert_eq!(tick.percent, 50.0);
    }

    #[test]
    fn test_aggregate_counts_done_slices() {
        let states = [
            SliceState::Done {
                total: 4,
                retrieved: 4,
            },
            SliceState::InProgress {
                total: 4,
                retrieved: 0,
            },
        ];
        assert_eq!(aggregate(states), Some(ProgressTick::new(4, 8)));
    }

    #[test]
    fn test_zero_total_is_zero_percent() {
        let tick = aggregate([SliceState::Done {
            total: 0,
            retrieved: 0,
        }])
        .unwrap();
        assert_eq!(tick.percent, 0.0);
        assert_eq!(tick.completed().percent, 100.0);
    }

    #[test]
    fn test_aggregate_of_nothing() {
        assert_eq!(aggregate(Vec::<SliceState>::new()), None);
    }

    #[test]
    fn test_slice_progress_snapshot() {
        let progress = SliceProgress::new();
        assert_eq!(progress.snapshot(), SliceState::NotStarted);

        progress.publish(3, 1, false);
        assert_eq!(
            progress.snapshot(),
            SliceState::InProgress {
                total: 3,
                retrieved: 1
            }
        );

        progress.publish(3, 3, true);
        assert_eq!(progress.snapshot(), SliceState::Done { total: 3, retrieved: 3 });
    }

    #[tokio::test]
    async fn test_reporter_skips_until_all_totals_known() {
        let first = Arc::new(SliceProgress::new());
        let second = Arc::new(SliceProgress::new());
        first.publish(10, 5, false);

        let observer = Arc::new(RecordingObserver::default());
        let reporter = ProgressReporter::new(
            vec![first.clone(), second.clone()],
            observer.clone(),
            Duration::from_millis(10),
        );
        let stop = CancellationToken::new();
        let handle = tokio::spawn(reporter.run(stop.clone()));

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(observer.ticks.lock().unwrap().is_empty());

        second.publish(20, 10, false);
        tokio::time::sleep(Duration::from_millis(60)).await;

        stop.cancel();
        let summary = handle.await.unwrap();

        let ticks = observer.ticks.lock().unwrap();
        assert!(!ticks.is_empty());
        assert_eq!(ticks[0], ProgressTick::new(15, 30));
        assert_eq!(ticks[0].percent, 50.0);

        assert_eq!(summary.state, ReporterState::Stopped);
        assert_eq!(summary.ticks, ticks.len());

        let completed = observer.completed.lock().unwrap();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].percent, 100.0);
        assert_eq!(completed[0].total, 30);
    }

    #[tokio::test]
    async fn test_reporter_without_totals_emits_nothing() {
        let slice = Arc::new(SliceProgress::new());
        let observer = Arc::new(RecordingObserver::default());
        let reporter = ProgressReporter::new(vec![slice], observer.clone(), Duration::from_millis(5));

        let stop = CancellationToken::new();
        let handle = tokio::spawn(reporter.run(stop.clone()));
        tokio::time::sleep(Duration::from_millis(30)).await;
        stop.cancel();

        let summary = handle.await.unwrap();
        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.final_tick, None);
        assert!(observer.ticks.lock().unwrap().is_empty());
        assert!(observer.completed.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bar_observer_accepts_ticks() {
        let observer = ProgressBarObserver::new();
        observer.on_tick(&ProgressTick::new(5, 10));
        observer.on_complete(&ProgressTick::new(10, 10).completed());
    }
}
