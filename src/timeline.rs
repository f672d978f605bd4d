//! The merged, time-ordered table the replay walks.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, TimeZone, Utc};

use crate::frame::Values;
use crate::metric::Metric;
use crate::source::MetricSeries;

/// One hour with a value for every merged metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub time: DateTime<FixedOffset>,
    pub values: Values,
}

/// Minimum, maximum and mean of one metric over a day.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Per-metric statistics of one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    stats: BTreeMap<Metric, Stats>,
}

impl DaySummary {
    pub fn stats(&self, metric: Metric) -> Option<Stats> {
        self.stats.get(&metric).copied()
    }

    /// Lowest temperature of the day.
    pub fn low(&self) -> Option<f64> {
        self.stats(Metric::Temperature).map(|s| s.min)
    }

    /// Highest temperature of the day.
    pub fn high(&self) -> Option<f64> {
        self.stats(Metric::Temperature).map(|s| s.max)
    }

    fn from_rows<'a>(date: NaiveDate, rows: impl Iterator<Item = &'a Row>) -> Self {
        let mut acc: BTreeMap<Metric, (Stats, usize)> = BTreeMap::new();
        for row in rows {
            for (metric, v) in row.values.iter() {
                acc.entry(metric)
                    .and_modify(|(s, n)| {
                        s.min = s.min.min(v);
                        s.max = s.max.max(v);
                        s.mean += v;
                        *n += 1;
                    })
                    .or_insert((
                        Stats {
                            min: v,
                            max: v,
                            mean: v,
                        },
                        1,
                    ));
            }
        }
        let stats = acc
            .into_iter()
            .map(|(metric, (mut s, n))| {
                s.mean /= n as f64;
                (metric, s)
            })
            .collect();
        DaySummary { date, stats }
    }
}

/// Rows shared by every input series, ascending, plus a summary of each day.
#[derive(Debug, Clone)]
pub struct Timeline {
    rows: Vec<Row>,
    days: BTreeMap<NaiveDate, DaySummary>,
    offset: FixedOffset,
}

impl Timeline {
    /// Inner-join the series on timestamp.
    ///
    /// A timestamp survives only if every series has a present value at it.
    /// Any empty input series (or no series at all) yields an empty timeline.
    pub fn merge(series: &[MetricSeries]) -> Timeline {
        let offset = series
            .iter()
            .flat_map(|s| s.points.first())
            .map(|(t, _)| *t.offset())
            .next()
            .unwrap_or_else(|| Utc.fix());

        let Some((first, rest)) = series.split_first() else {
            return Timeline::empty(offset);
        };

        let mut joined: BTreeMap<DateTime<FixedOffset>, Values> = first
            .present()
            .map(|(t, v)| (t, [(first.metric, v)].into_iter().collect()))
            .collect();
        for s in rest {
            let present: BTreeMap<_, _> = s.present().collect();
            joined.retain(|t, values| match present.get(t) {
                Some(v) => {
                    values.insert(s.metric, *v);
                    true
                }
                None => false,
            });
        }

        let rows: Vec<Row> = joined
            .into_iter()
            .map(|(time, values)| Row {
                time: time.with_timezone(&offset),
                values,
            })
            .collect();

        let mut by_day: BTreeMap<NaiveDate, Vec<&Row>> = BTreeMap::new();
        for row in &rows {
            by_day.entry(row.time.date_naive()).or_default().push(row);
        }
        let days = by_day
            .into_iter()
            .map(|(date, rows)| (date, DaySummary::from_rows(date, rows.into_iter())))
            .collect();

        tracing::debug!("merged {} series into {} rows", series.len(), rows.len());
        Timeline { rows, days, offset }
    }

    fn empty(offset: FixedOffset) -> Timeline {
        Timeline {
            rows: Vec::new(),
            days: BTreeMap::new(),
            offset,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The local offset the rows are expressed in.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Summary of a calendar day, if any row falls on it.
    pub fn day(&self, date: NaiveDate) -> Option<&DaySummary> {
        self.days.get(&date)
    }

    /// Calendar date of an instant, in the timeline's local offset.
    pub fn local_date<Tz: TimeZone>(&self, instant: &DateTime<Tz>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::BTreeSet;

    pub fn hour(day: u32, hour: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 3, day, hour, 0, 0)
            .unwrap()
    }

    pub fn series(metric: Metric, points: &[(DateTime<FixedOffset>, Option<f64>)]) -> MetricSeries {
        MetricSeries {
            metric,
            points: points.to_vec(),
        }
    }

    #[test]
    fn merge_is_intersection_of_present_timestamps() {
        let a = series(
            Metric::Pm10,
            &[
                (hour(1, 0), Some(1.0)),
                (hour(1, 1), Some(2.0)),
                (hour(1, 2), None),
                (hour(1, 3), Some(4.0)),
            ],
        );
        let b = series(
            Metric::Temperature,
            &[
                (hour(1, 3), Some(-1.0)),
                (hour(1, 0), Some(-3.0)),
                (hour(1, 2), Some(-2.0)),
                (hour(1, 4), Some(0.0)),
            ],
        );
        let timeline = Timeline::merge(&[a.clone(), b.clone()]);

        let expected: BTreeSet<_> = a
            .present()
            .map(|(t, _)| t)
            .collect::<BTreeSet<_>>()
            .intersection(&b.present().map(|(t, _)| t).collect::<BTreeSet<_>>())
            .copied()
            .collect();
        let got: Vec<_> = timeline.rows().iter().map(|r| r.time).collect();
        assert_eq!(got, expected.into_iter().collect::<Vec<_>>());
        assert_eq!(got, vec![hour(1, 0), hour(1, 3)]);

        let last = &timeline.rows()[1];
        assert_eq!(last.values.get(Metric::Pm10), Some(4.0));
        assert_eq!(last.values.get(Metric::Temperature), Some(-1.0));
    }

    #[test]
    fn instants_match_across_offsets() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let a = series(Metric::Pm10, &[(hour(1, 5), Some(1.0))]);
        let b = series(
            Metric::Ozone,
            &[(hour(1, 5).with_timezone(&utc), Some(9.0))],
        );
        let timeline = Timeline::merge(&[a, b]);
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline.rows()[0].time.offset().local_minus_utc(), 7200);
    }

    #[test]
    fn empty_series_empties_timeline() {
        let a = series(Metric::Pm10, &[(hour(1, 0), Some(1.0))]);
        let b = series(Metric::Ozone, &[]);
        assert!(Timeline::merge(&[a, b]).is_empty());
        assert!(Timeline::merge(&[]).is_empty());
    }

    #[test]
    fn day_summaries() {
        let t = series(
            Metric::Temperature,
            &[
                (hour(1, 22), Some(1.0)),
                (hour(1, 23), Some(3.0)),
                (hour(2, 0), Some(-2.0)),
                (hour(2, 1), Some(4.0)),
                (hour(2, 2), Some(1.0)),
            ],
        );
        let timeline = Timeline::merge(&[t]);
        let first = timeline
            .day(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
            .expect("day 1");
        assert_eq!(first.low(), Some(1.0));
        assert_eq!(first.high(), Some(3.0));
        assert_eq!(first.stats(Metric::Temperature).unwrap().mean, 2.0);

        let second = timeline
            .day(NaiveDate::from_ymd_opt(2025, 3, 2).unwrap())
            .expect("day 2");
        assert_eq!(second.low(), Some(-2.0));
        assert_eq!(second.high(), Some(4.0));
        assert_eq!(second.stats(Metric::Temperature).unwrap().mean, 1.0);
        assert!(second.stats(Metric::Pm10).is_none());

        assert!(timeline
            .day(NaiveDate::from_ymd_opt(2025, 3, 3).unwrap())
            .is_none());
    }

    #[test]
    fn local_date_uses_timeline_offset() {
        let timeline = Timeline::merge(&[series(Metric::Pm10, &[(hour(1, 0), Some(1.0))])]);
        let utc = FixedOffset::east_opt(0).unwrap();
        // 23:30 UTC on the 1st is 01:30 on the 2nd at +02:00.
        let late = utc.with_ymd_and_hms(2025, 3, 1, 23, 30, 0).unwrap();
        assert_eq!(
            timeline.local_date(&late),
            NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()
        );
    }
}
