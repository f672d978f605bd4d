//! The two-week outlook: one bar per day for each daily metric.
//!
//! Bars show each calendar day's mean over the past and coming week. While
//! polling, today's bar follows the live value instead
//! (see [Projection::TodayBar](crate::projection::Projection::TodayBar)).

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::metric::Metric;
use crate::projection::{metric_key, Update, WidgetUpdate};
use crate::source::MetricSeries;
use crate::tier::Tier;

/// Prefix of the daily bar widget keys.
pub const DAILY_BAR: &str = "daily_bar";

/// The bar for one metric on one day, colored by its tier.
pub fn daily_bar(metric: Metric, date: NaiveDate, value: f64) -> Update {
    let color = metric
        .info()
        .thresholds
        .map(|t| t.classify(value))
        .unwrap_or(Tier::Good)
        .color();
    Update::new(
        metric_key(DAILY_BAR, metric),
        WidgetUpdate::SetBar {
            label: date.format("%m-%d").to_string(),
            value,
            color,
        },
    )
}

/// Daily means of each metric, keyed by local date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyOutlook {
    means: BTreeMap<Metric, BTreeMap<NaiveDate, f64>>,
}

impl DailyOutlook {
    /// Average each series by the local date of its timestamps.
    ///
    /// Unlike the timeline, series are not joined: every present value counts
    /// toward its own day. Days without a value get no bar.
    pub fn from_series(series: &[MetricSeries]) -> Self {
        let mut means = BTreeMap::new();
        for s in series {
            let mut sums: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
            for (t, v) in s.present().filter(|(_, v)| v.is_finite()) {
                let (sum, n) = sums.entry(t.date_naive()).or_insert((0.0, 0));
                *sum += v;
                *n += 1;
            }
            if sums.is_empty() {
                tracing::debug!("{}: no daily means", s.metric);
                continue;
            }
            let days = sums
                .into_iter()
                .map(|(date, (sum, n))| (date, sum / n as f64))
                .collect();
            means.insert(s.metric, days);
        }
        DailyOutlook { means }
    }

    pub fn mean(&self, metric: Metric, date: NaiveDate) -> Option<f64> {
        self.means.get(&metric)?.get(&date).copied()
    }

    /// Number of days with a mean, across all metrics.
    pub fn len(&self) -> usize {
        self.means.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.means.is_empty()
    }

    /// Every bar, oldest day first within each metric.
    pub fn updates(&self) -> Vec<Update> {
        self.means
            .iter()
            .flat_map(|(&metric, days)| {
                days.iter()
                    .map(move |(&date, &mean)| daily_bar(metric, date, mean))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::{GREEN, RED, YELLOW};
    use crate::timeline::tests::hour;

    fn series(metric: Metric, points: &[(u32, u32, Option<f64>)]) -> MetricSeries {
        MetricSeries {
            metric,
            points: points.iter().map(|&(d, h, v)| (hour(d, h), v)).collect(),
        }
    }

    #[test]
    fn means_group_by_local_day() {
        let outlook = DailyOutlook::from_series(&[series(
            Metric::Pm2_5,
            &[
                (1, 0, Some(10.0)),
                (1, 23, Some(20.0)),
                (2, 0, Some(50.0)),
                (2, 1, None),
                (3, 5, Some(f64::NAN)),
            ],
        )]);
        let day = |d| NaiveDate::from_ymd_opt(2025, 3, d).unwrap();
        assert_eq!(outlook.mean(Metric::Pm2_5, day(1)), Some(15.0));
        assert_eq!(outlook.mean(Metric::Pm2_5, day(2)), Some(50.0));
        assert_eq!(outlook.mean(Metric::Pm2_5, day(3)), None);
        assert_eq!(outlook.len(), 2);
    }

    #[test]
    fn series_are_not_joined() {
        let outlook = DailyOutlook::from_series(&[
            series(Metric::Pm2_5, &[(1, 0, Some(10.0))]),
            series(Metric::Ozone, &[(1, 5, Some(80.0)), (2, 5, Some(120.0))]),
            MetricSeries::empty(Metric::UvIndex),
        ]);
        assert_eq!(outlook.len(), 3);
        assert!(outlook
            .updates()
            .iter()
            .all(|u| u.widget != "daily_bar[uv_index]"));
    }

    #[test]
    fn bars_are_labelled_and_colored() {
        let outlook = DailyOutlook::from_series(&[
            series(Metric::Pm2_5, &[(1, 0, Some(5.0)), (2, 0, Some(20.0))]),
            series(Metric::Ozone, &[(1, 0, Some(120.0))]),
        ]);
        let bars: Vec<_> = outlook
            .updates()
            .into_iter()
            .map(|u| (u.widget, u.change))
            .collect();
        let bar = |label: &str, value, color| WidgetUpdate::SetBar {
            label: label.to_owned(),
            value,
            color,
        };
        assert_eq!(
            bars,
            vec![
                ("daily_bar[pm2_5]".to_owned(), bar("03-01", 5.0, GREEN)),
                ("daily_bar[pm2_5]".to_owned(), bar("03-02", 20.0, YELLOW)),
                ("daily_bar[ozone]".to_owned(), bar("03-01", 120.0, RED)),
            ]
        );
    }

    #[test]
    fn empty_history_has_no_bars() {
        let outlook = DailyOutlook::from_series(&[]);
        assert!(outlook.is_empty());
        assert!(outlook.updates().is_empty());
    }
}
