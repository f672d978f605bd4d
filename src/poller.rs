//! Live mode: current values, over and over.

use std::time::Duration;

use chrono::{DateTime, FixedOffset};

use crate::board::Board;
use crate::dashboard::Dashboard;
use crate::frame::Snapshot;
use crate::metric::Metric;
use crate::pacing::{Clock, Hold, Pacer};
use crate::source::DataSource;
use crate::timeline::Timeline;

/// Polls current values and shows them through the same projections as replay.
///
/// Failed fetches are logged and counted; they never end the loop.
#[derive(Debug)]
pub struct LivePoller {
    metrics: Vec<Metric>,
    interval: Duration,
    ticks: usize,
    failures: usize,
}

impl LivePoller {
    pub fn new(metrics: &[Metric], interval: Duration) -> Self {
        LivePoller {
            metrics: metrics.to_vec(),
            interval,
            ticks: 0,
            failures: 0,
        }
    }

    /// Number of polls made.
    pub fn ticks(&self) -> usize {
        self.ticks
    }

    /// Number of polls that failed.
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Poll once. Returns the snapshot shown, if the fetch succeeded.
    pub fn tick<D: Dashboard>(
        &mut self,
        source: &mut impl DataSource,
        board: &mut Board<D>,
        timeline: &Timeline,
        now: DateTime<FixedOffset>,
    ) -> Option<Snapshot> {
        self.ticks += 1;
        let values = match source.fetch_snapshot(&self.metrics) {
            Ok(values) => values,
            Err(e) => {
                self.failures += 1;
                tracing::warn!("live poll failed ({} so far): {}", self.failures, e);
                return None;
            }
        };

        let today = timeline.day(timeline.local_date(&now)).cloned();
        if today.is_none() {
            tracing::debug!("no summary for {}", timeline.local_date(&now));
        }
        let snapshot = Snapshot {
            time: now,
            values,
            today,
        };
        board.show(&snapshot.reading());
        board.show_day(snapshot.today.as_ref());
        board.flush();
        Some(snapshot)
    }

    /// Poll until the pacer reports cancellation.
    pub fn run<D: Dashboard>(
        &mut self,
        source: &mut impl DataSource,
        board: &mut Board<D>,
        timeline: &Timeline,
        pacer: &mut impl Pacer,
        clock: &impl Clock,
    ) {
        tracing::info!("polling every {:?}", self.interval);
        loop {
            self.tick(source, board, timeline, clock.now());
            if pacer.hold(self.interval) == Hold::Cancelled {
                break;
            }
        }
        tracing::info!(
            "stopped polling after {} polls, {} failed",
            self.ticks,
            self.failures
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetLibrary;
    use crate::dashboard::Recorder;
    use crate::frame::Values;
    use crate::pacing::{CountingPacer, FixedClock};
    use crate::projection::ProjectionSet;
    use crate::source::{FakeSource, MetricSeries, SourceError};
    use crate::timeline::tests::hour;

    fn board(dir: &tempfile::TempDir) -> Board<Recorder> {
        Board::new(
            Recorder::new(),
            ProjectionSet::standard(),
            AssetLibrary::new(dir.path()),
        )
    }

    fn timeline() -> Timeline {
        Timeline::merge(&[MetricSeries {
            metric: Metric::Temperature,
            points: vec![(hour(1, 6), Some(-4.0)), (hour(1, 14), Some(2.5))],
        }])
    }

    fn values(pm10: f64) -> Values {
        [(Metric::Pm10, pm10)].into_iter().collect()
    }

    #[test]
    fn failed_poll_does_not_end_loop() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FakeSource::new().with_fallback(values(9.0));
        source.push_snapshot(Ok(values(7.0)));
        source.push_snapshot(Err(SourceError::Unavailable("timed out".to_owned())));

        let mut board = board(&dir);
        let mut pacer = CountingPacer::cancel_after(2);
        let mut poller = LivePoller::new(&Metric::ALL, Duration::from_millis(100));
        poller.run(
            &mut source,
            &mut board,
            &timeline(),
            &mut pacer,
            &FixedClock(hour(1, 15)),
        );

        assert_eq!(poller.ticks(), 3);
        assert_eq!(poller.failures(), 1);
        assert_eq!(pacer.holds, vec![Duration::from_millis(100); 2]);
        assert_eq!(
            board.dashboard().texts("pm10_text"),
            vec!["PM10: 7.0 µg/m³", "PM10: 9.0 µg/m³"]
        );
    }

    #[test]
    fn live_reading_shows_today() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FakeSource::new().with_fallback(values(1.0));
        let mut board = board(&dir);
        let mut poller = LivePoller::new(&Metric::ALL, Duration::from_millis(100));

        let snapshot = poller
            .tick(&mut source, &mut board, &timeline(), hour(1, 15))
            .expect("fetch succeeds");
        assert!(snapshot.today.is_some());
        let r = board.dashboard();
        assert_eq!(r.last_text("hour_text").as_deref(), Some("15:00:00"));
        assert_eq!(r.last_text("high_temp_text").as_deref(), Some("High: 2.5°C"));
        assert_eq!(r.last_text("low_temp_text").as_deref(), Some("Low: -4.0°C"));
        assert_eq!(r.flushes(), 1);
    }

    #[test]
    fn no_summary_outside_timeline() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FakeSource::new().with_fallback(values(1.0));
        let mut board = board(&dir);
        let mut poller = LivePoller::new(&Metric::ALL, Duration::from_millis(100));

        let snapshot = poller
            .tick(&mut source, &mut board, &timeline(), hour(3, 15))
            .expect("fetch succeeds");
        assert!(snapshot.today.is_none());
        assert_eq!(
            board.dashboard().last_text("high_temp_text").as_deref(),
            Some("High: --°C")
        );
    }
}
