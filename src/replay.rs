//! Stepping through the recent past, one hour per step.

use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::board::Board;
use crate::dashboard::Dashboard;
use crate::frame::Frame;
use crate::pacing::{Hold, Pacer};
use crate::timeline::Timeline;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ReplayState {
    /// Not started.
    Idle,
    /// Working through rows before the start time.
    Replaying,
    /// Every row before the start time has been shown.
    CaughtUp,
    /// Cancelled while holding.
    Stopped,
}

/// Replays the rows of a timeline that lie before the moment replay started.
///
/// Each row is projected, flushed, held for one step, then its transient
/// artifacts are released. Hours missing from the timeline cost one extra
/// step each, so the replay keeps the rhythm of the hours it skips.
pub struct ReplayScheduler<'t> {
    timeline: &'t Timeline,
    step: Duration,
    state: ReplayState,
    until: Option<DateTime<FixedOffset>>,
    next: usize,
    previous: Option<DateTime<FixedOffset>>,
}

impl<'t> ReplayScheduler<'t> {
    pub fn new(timeline: &'t Timeline, step: Duration) -> Self {
        ReplayScheduler {
            timeline,
            step,
            state: ReplayState::Idle,
            until: None,
            next: 0,
            previous: None,
        }
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    /// Number of rows shown so far.
    pub fn replayed(&self) -> usize {
        self.next
    }

    /// Begin replaying rows earlier than `now`.
    pub fn start(&mut self, now: DateTime<FixedOffset>) {
        if self.state != ReplayState::Idle {
            return;
        }
        self.until = Some(now);
        self.state = if self.timeline.is_empty() {
            tracing::info!("nothing to replay");
            ReplayState::CaughtUp
        } else {
            tracing::info!(
                "replaying {} rows up to {}",
                self.timeline.len(),
                now.format("%Y-%m-%d %H:%M:%S")
            );
            ReplayState::Replaying
        };
    }

    /// Show the next row, if it is due.
    pub fn advance<D: Dashboard>(&mut self, board: &mut Board<D>, pacer: &mut impl Pacer) -> ReplayState {
        if self.state != ReplayState::Replaying {
            return self.state;
        }
        let timeline = self.timeline;
        let Some(row) = timeline.rows().get(self.next) else {
            tracing::info!("replayed all {} rows", self.next);
            self.state = ReplayState::CaughtUp;
            return self.state;
        };
        if self.until.is_some_and(|until| row.time >= until) {
            tracing::info!("caught up at {}", row.time.format("%Y-%m-%d %H:%M"));
            self.state = ReplayState::CaughtUp;
            return self.state;
        }

        if let Some(previous) = self.previous {
            let skipped = (row.time - previous).num_hours() - 1;
            if skipped > 0 {
                tracing::debug!("{} hours missing before {}", skipped, row.time);
            }
            for _ in 0..skipped {
                if pacer.hold(self.step) == Hold::Cancelled {
                    return self.stop(board);
                }
            }
        }

        let date = row.time.date_naive();
        let day = timeline.day(date);
        if self.previous_date() != Some(date) {
            tracing::info!("replaying {}", date);
            board.show_day(day);
        }

        let frame = Frame { row, day };
        tracing::debug!(
            "row {} at {} (day low {:?}, high {:?})",
            self.next,
            row.time,
            frame.day_low(),
            frame.day_high()
        );
        board.show(&frame.reading());
        board.flush();
        self.next += 1;
        self.previous = Some(row.time);

        if pacer.hold(self.step) == Hold::Cancelled {
            return self.stop(board);
        }
        board.release_transient();
        self.state
    }

    /// Advance until caught up or stopped.
    pub fn run<D: Dashboard>(&mut self, board: &mut Board<D>, pacer: &mut impl Pacer) -> ReplayState {
        while self.advance(board, pacer) == ReplayState::Replaying {}
        self.state
    }

    fn previous_date(&self) -> Option<NaiveDate> {
        self.previous.map(|t| t.date_naive())
    }

    fn stop<D: Dashboard>(&mut self, board: &mut Board<D>) -> ReplayState {
        tracing::info!("replay cancelled after {} rows", self.next);
        board.release_transient();
        self.state = ReplayState::Stopped;
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetLibrary;
    use crate::dashboard::{Call, Recorder};
    use crate::metric::Metric;
    use crate::pacing::CountingPacer;
    use crate::projection::ProjectionSet;
    use crate::source::MetricSeries;
    use crate::timeline::tests::hour;

    const STEP: Duration = Duration::from_secs(1);

    /// A timeline with temperature, PM2.5 and wind at the given (day, hour)s.
    fn timeline(hours: &[(u32, u32)]) -> Timeline {
        let points = |f: fn(u32) -> f64| -> Vec<_> {
            hours
                .iter()
                .map(|&(d, h)| (hour(d, h), Some(f(h))))
                .collect()
        };
        Timeline::merge(&[
            MetricSeries {
                metric: Metric::Temperature,
                points: points(|h| h as f64 - 10.0),
            },
            MetricSeries {
                metric: Metric::Pm2_5,
                points: points(|h| h as f64),
            },
            MetricSeries {
                metric: Metric::WindDirection,
                points: points(|_| 50.0),
            },
        ])
    }

    fn board(dir: &tempfile::TempDir) -> Board<Recorder> {
        Board::new(
            Recorder::new(),
            ProjectionSet::standard(),
            AssetLibrary::new(dir.path()),
        )
    }

    #[test]
    fn empty_timeline_is_caught_up() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = timeline(&[]);
        let mut replay = ReplayScheduler::new(&timeline, STEP);
        assert_eq!(replay.state(), ReplayState::Idle);
        replay.start(hour(2, 0));
        assert_eq!(replay.state(), ReplayState::CaughtUp);
        let mut pacer = CountingPacer::unlimited();
        assert_eq!(replay.run(&mut board(&dir), &mut pacer), ReplayState::CaughtUp);
        assert!(pacer.holds.is_empty());
    }

    #[test]
    fn stops_before_start_time() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = timeline(&[(1, 22), (1, 23), (2, 0), (2, 1), (2, 2)]);
        let mut board = board(&dir);
        let mut pacer = CountingPacer::unlimited();
        let mut replay = ReplayScheduler::new(&timeline, STEP);
        replay.start(hour(2, 1));

        assert_eq!(replay.run(&mut board, &mut pacer), ReplayState::CaughtUp);
        assert_eq!(replay.replayed(), 3);
        assert_eq!(
            board.dashboard().texts("hour_text"),
            vec!["22:00", "23:00", "00:00"]
        );
        assert_eq!(pacer.holds, vec![STEP; 3]);
    }

    #[test]
    fn start_time_between_rows() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = timeline(&[(1, 0), (1, 1), (1, 2)]);
        let mut board = board(&dir);
        let mut replay = ReplayScheduler::new(&timeline, STEP);
        replay.start(hour(1, 1) + chrono::Duration::minutes(30));
        replay.run(&mut board, &mut CountingPacer::unlimited());
        assert_eq!(board.dashboard().texts("hour_text"), vec!["00:00", "01:00"]);
    }

    #[test]
    fn whole_timeline_in_the_past() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = timeline(&[(1, 0), (1, 1)]);
        let mut replay = ReplayScheduler::new(&timeline, STEP);
        replay.start(hour(3, 0));
        let state = replay.run(&mut board(&dir), &mut CountingPacer::unlimited());
        assert_eq!(state, ReplayState::CaughtUp);
        assert_eq!(replay.replayed(), 2);
    }

    #[test]
    fn day_summary_once_per_day() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = timeline(&[(1, 21), (1, 22), (1, 23), (2, 0), (2, 1)]);
        let mut board = board(&dir);
        let mut replay = ReplayScheduler::new(&timeline, STEP);
        replay.start(hour(3, 0));
        replay.run(&mut board, &mut CountingPacer::unlimited());

        let r = board.dashboard();
        assert_eq!(r.texts("high_temp_text"), vec!["High: 13.0°C", "High: -9.0°C"]);
        assert_eq!(r.texts("low_temp_text"), vec!["Low: 11.0°C", "Low: -10.0°C"]);

        // The day's summary precedes the first row of the day.
        let order: Vec<_> = r
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::SetText(k, t) if k == "high_temp_text" || k == "hour_text" => Some(t.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            order,
            vec!["High: 13.0°C", "21:00", "22:00", "23:00", "High: -9.0°C", "00:00", "01:00"]
        );
    }

    #[test]
    fn gaps_cost_extra_steps() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = timeline(&[(1, 0), (1, 1), (1, 4)]);
        let mut pacer = CountingPacer::unlimited();
        let mut replay = ReplayScheduler::new(&timeline, STEP);
        replay.start(hour(2, 0));
        replay.run(&mut board(&dir), &mut pacer);
        assert_eq!(pacer.holds.len(), 3 + 2);
    }

    #[test]
    fn replay_sector_cleared_each_step() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = timeline(&[(1, 0), (1, 1)]);
        let mut board = board(&dir);
        let mut replay = ReplayScheduler::new(&timeline, STEP);
        replay.start(hour(2, 0));
        replay.run(&mut board, &mut CountingPacer::unlimited());

        let sector: Vec<_> = board.dashboard().calls_to("pm2_5_sector").collect();
        assert_eq!(sector.len(), 4);
        assert!(matches!(sector[0], Call::SetSector(..)));
        assert_eq!(*sector[1], Call::Clear("pm2_5_sector".to_owned()));
        assert!(matches!(sector[2], Call::SetSector(..)));
        assert_eq!(*sector[3], Call::Clear("pm2_5_sector".to_owned()));
        assert!(!board.has_transient());
    }

    #[test]
    fn cancellation_stops_and_releases() {
        let dir = tempfile::tempdir().unwrap();
        let timeline = timeline(&[(1, 0), (1, 1), (1, 2)]);
        let mut board = board(&dir);
        let mut pacer = CountingPacer::cancel_after(1);
        let mut replay = ReplayScheduler::new(&timeline, STEP);
        replay.start(hour(2, 0));

        assert_eq!(replay.run(&mut board, &mut pacer), ReplayState::Stopped);
        assert_eq!(replay.replayed(), 2);
        assert!(!board.has_transient());
        assert_eq!(board.dashboard().calls.last(), Some(&Call::Flush));
        // Further advances do nothing.
        assert_eq!(replay.advance(&mut board, &mut pacer), ReplayState::Stopped);
        assert_eq!(replay.replayed(), 2);
    }
}
