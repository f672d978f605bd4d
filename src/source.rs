//! Where metric values come from.
//!
//! The [DataSource] trait is the boundary to the upstream service.
//! [OpenMeteoSource] talks to Open-Meteo; [FakeSource] serves canned data.

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, FixedOffset};
use openmeteo::{Api, Client, Hourly};

use crate::frame::Values;
use crate::metric::{Feed, Metric};

/// An error in fetching data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SourceError {
    /// The service could not be reached or refused the request.
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    /// The service answered, but not with what was asked for.
    #[error("data source response did not match the expected schema: {0}")]
    SchemaMismatch(String),
}

impl From<openmeteo::Error> for SourceError {
    fn from(e: openmeteo::Error) -> Self {
        use openmeteo::Error::*;
        match e {
            Transport(_) | Status { .. } => SourceError::Unavailable(e.to_string()),
            Decode(_) | Missing(_) | Malformed(_) => SourceError::SchemaMismatch(e.to_string()),
        }
    }
}

/// Days of history and forecast to request around today.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Window {
    pub past_days: u32,
    pub forecast_days: u32,
}

impl Default for Window {
    fn default() -> Self {
        Window {
            past_days: 1,
            forecast_days: 1,
        }
    }
}

/// Hourly values of one metric, in the order the source returned them.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub metric: Metric,
    pub points: Vec<(DateTime<FixedOffset>, Option<f64>)>,
}

impl MetricSeries {
    pub fn empty(metric: Metric) -> Self {
        MetricSeries {
            metric,
            points: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points with a value.
    pub fn present(&self) -> impl Iterator<Item = (DateTime<FixedOffset>, f64)> + '_ {
        self.points.iter().filter_map(|(t, v)| v.map(|v| (*t, v)))
    }
}

/// Access to historical and current metric values.
///
/// Implementations make a single attempt per call.
pub trait DataSource {
    /// Hourly values of one metric over the window.
    fn fetch_historical(&mut self, metric: Metric, window: Window)
        -> Result<MetricSeries, SourceError>;

    /// The current value of one metric; `None` if the source has no value.
    fn fetch_current(&mut self, metric: Metric) -> Result<Option<f64>, SourceError>;

    /// Hourly values of several metrics, in the order requested.
    fn fetch_history(
        &mut self,
        metrics: &[Metric],
        window: Window,
    ) -> Result<Vec<MetricSeries>, SourceError> {
        metrics
            .iter()
            .map(|&m| self.fetch_historical(m, window))
            .collect()
    }

    /// Current values of several metrics. Metrics without a value are left
    /// out; any failed fetch fails the whole snapshot.
    fn fetch_snapshot(&mut self, metrics: &[Metric]) -> Result<Values, SourceError> {
        let mut values = Values::new();
        for &metric in metrics {
            if let Some(v) = self.fetch_current(metric)? {
                values.insert(metric, v);
            }
        }
        Ok(values)
    }
}

fn api(feed: Feed) -> Api {
    match feed {
        Feed::AirQuality => Api::AirQuality,
        Feed::Weather => Api::Forecast,
    }
}

/// Group metrics by the feed that serves them, keeping request order within a feed.
fn by_feed(metrics: &[Metric]) -> BTreeMap<Feed, Vec<Metric>> {
    let mut groups: BTreeMap<Feed, Vec<Metric>> = BTreeMap::new();
    for &m in metrics {
        groups.entry(m.feed()).or_default().push(m);
    }
    groups
}

/// Extract one metric's series from an hourly table.
/// A column with no values at all becomes an empty series.
fn series_from_hourly(hourly: &Hourly, metric: Metric) -> Result<MetricSeries, SourceError> {
    let points: Vec<_> = hourly
        .series(metric.name())
        .ok_or_else(|| SourceError::SchemaMismatch(format!("no column for {metric}")))?
        .collect();
    if points.iter().all(|(_, v)| v.is_none()) {
        tracing::warn!("{}: no values in the requested window", metric);
        return Ok(MetricSeries::empty(metric));
    }
    Ok(MetricSeries { metric, points })
}

/// Open-Meteo, one request per feed.
pub struct OpenMeteoSource {
    client: Client,
}

impl OpenMeteoSource {
    pub fn new(settings: openmeteo::Settings) -> Result<Self, SourceError> {
        Ok(OpenMeteoSource {
            client: Client::new(settings)?,
        })
    }
}

impl DataSource for OpenMeteoSource {
    fn fetch_historical(
        &mut self,
        metric: Metric,
        window: Window,
    ) -> Result<MetricSeries, SourceError> {
        let hourly = self.client.hourly(
            api(metric.feed()),
            &[metric.name()],
            window.past_days,
            window.forecast_days,
        )?;
        series_from_hourly(&hourly, metric)
    }

    fn fetch_current(&mut self, metric: Metric) -> Result<Option<f64>, SourceError> {
        let current = self.client.current(api(metric.feed()), &[metric.name()])?;
        Ok(current.get(metric.name()))
    }

    fn fetch_history(
        &mut self,
        metrics: &[Metric],
        window: Window,
    ) -> Result<Vec<MetricSeries>, SourceError> {
        let mut fetched: BTreeMap<Metric, MetricSeries> = BTreeMap::new();
        for (feed, group) in by_feed(metrics) {
            let names: Vec<&str> = group.iter().map(|m| m.name()).collect();
            let hourly =
                self.client
                    .hourly(api(feed), &names, window.past_days, window.forecast_days)?;
            tracing::info!("{}: {} hours of history", api(feed), hourly.len());
            for metric in group {
                fetched.insert(metric, series_from_hourly(&hourly, metric)?);
            }
        }
        metrics
            .iter()
            .map(|m| {
                fetched
                    .get(m)
                    .cloned()
                    .ok_or_else(|| SourceError::SchemaMismatch(format!("no series for {m}")))
            })
            .collect()
    }

    fn fetch_snapshot(&mut self, metrics: &[Metric]) -> Result<Values, SourceError> {
        let mut values = Values::new();
        for (feed, group) in by_feed(metrics) {
            let names: Vec<&str> = group.iter().map(|m| m.name()).collect();
            let current = self.client.current(api(feed), &names)?;
            for metric in group {
                if let Some(v) = current.get(metric.name()) {
                    values.insert(metric, v);
                }
            }
        }
        Ok(values)
    }
}

/// A source serving canned history and a scripted sequence of snapshots.
#[derive(Debug, Default)]
pub struct FakeSource {
    history: BTreeMap<Metric, MetricSeries>,
    history_error: Option<SourceError>,
    window_errors: Vec<(Window, SourceError)>,
    snapshots: VecDeque<Result<Values, SourceError>>,
    fallback: Option<Values>,
    /// Number of snapshot fetches served so far.
    pub snapshot_requests: usize,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve this series for its metric. Metrics without a series are empty.
    pub fn with_series(mut self, series: MetricSeries) -> Self {
        self.history.insert(series.metric, series);
        self
    }

    /// Fail every history fetch with this error.
    pub fn with_history_error(mut self, error: SourceError) -> Self {
        self.history_error = Some(error);
        self
    }

    /// Fail history fetches over this window only.
    pub fn with_window_error(mut self, window: Window, error: SourceError) -> Self {
        self.window_errors.push((window, error));
        self
    }

    /// Queue the result of the next unscripted snapshot fetch.
    pub fn push_snapshot(&mut self, result: Result<Values, SourceError>) {
        self.snapshots.push_back(result);
    }

    /// Values served once the scripted snapshots run out.
    pub fn with_fallback(mut self, values: Values) -> Self {
        self.fallback = Some(values);
        self
    }
}

impl DataSource for FakeSource {
    fn fetch_historical(
        &mut self,
        metric: Metric,
        window: Window,
    ) -> Result<MetricSeries, SourceError> {
        if let Some(e) = &self.history_error {
            return Err(e.clone());
        }
        if let Some((_, e)) = self.window_errors.iter().find(|(w, _)| *w == window) {
            return Err(e.clone());
        }
        Ok(self
            .history
            .get(&metric)
            .cloned()
            .unwrap_or_else(|| MetricSeries::empty(metric)))
    }

    /// Consumes one scripted snapshot.
    fn fetch_current(&mut self, metric: Metric) -> Result<Option<f64>, SourceError> {
        self.fetch_snapshot(&[metric]).map(|v| v.get(metric))
    }

    fn fetch_snapshot(&mut self, metrics: &[Metric]) -> Result<Values, SourceError> {
        self.snapshot_requests += 1;
        let all = match self.snapshots.pop_front() {
            Some(result) => result?,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| SourceError::Unavailable("no snapshot scripted".to_owned()))?,
        };
        Ok(all.iter().filter(|(m, _)| metrics.contains(m)).collect())
    }
}
