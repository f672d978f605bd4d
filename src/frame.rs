//! What the projections consume: readings of metric values at a point in time.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::metric::Metric;
use crate::timeline::{DaySummary, Row};

/// Mapping from metric to value. Absent metrics are simply not present.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Values(BTreeMap<Metric, f64>);

impl Values {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.0.get(&metric).copied()
    }

    pub fn insert(&mut self, metric: Metric, value: f64) {
        self.0.insert(metric, value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.0.iter().map(|(m, v)| (*m, *v))
    }
}

impl FromIterator<(Metric, f64)> for Values {
    fn from_iter<I: IntoIterator<Item = (Metric, f64)>>(iter: I) -> Self {
        Values(iter.into_iter().collect())
    }
}

/// Which loop produced a reading.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Replay,
    Live,
}

/// Borrowed view of a Frame or Snapshot.
#[derive(Debug, Copy, Clone)]
pub struct Reading<'a> {
    pub time: DateTime<FixedOffset>,
    pub values: &'a Values,
    pub phase: Phase,
}

impl Reading<'_> {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(metric)
    }
}

/// One replayed hour.
#[derive(Debug, Copy, Clone)]
pub struct Frame<'t> {
    pub row: &'t Row,
    /// Summary of the calendar day the row falls on.
    pub day: Option<&'t DaySummary>,
}

impl<'t> Frame<'t> {
    pub fn reading(&self) -> Reading<'t> {
        Reading {
            time: self.row.time,
            values: &self.row.values,
            phase: Phase::Replay,
        }
    }

    pub fn day_low(&self) -> Option<f64> {
        self.day.and_then(DaySummary::low)
    }

    pub fn day_high(&self) -> Option<f64> {
        self.day.and_then(DaySummary::high)
    }
}

/// Current values from one live poll.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub time: DateTime<FixedOffset>,
    pub values: Values,
    /// Summary of today from the replayed timeline, if it covers today.
    pub today: Option<DaySummary>,
}

impl Snapshot {
    pub fn reading(&self) -> Reading<'_> {
        Reading {
            time: self.time,
            values: &self.values,
            phase: Phase::Live,
        }
    }
}

/// The placeholder shown in place of an absent value.
pub const PLACEHOLDER: &str = "--";

/// Format a value to `precision` decimals; absent and non-finite values
/// render as the placeholder, never as zero.
pub fn format_value(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.precision$}"),
        _ => PLACEHOLDER.to_owned(),
    }
}
