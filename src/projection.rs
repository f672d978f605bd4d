//! Projections: pure functions from readings to widget updates.
//!
//! A projection never reads widget state; it turns a [Reading] (or a
//! [DaySummary]) into a list of [Update]s, and the [Board](crate::board::Board)
//! applies them. The standard set is a table, not code per widget.

use chrono::{Duration, Timelike};
use embedded_graphics::pixelcolor::Rgb888;

use crate::assets::{resolve, AssetCategory, AssetKey};
use crate::dashboard::SectorShape;
use crate::frame::{format_value, Phase, Reading, PLACEHOLDER};
use crate::metric::Metric;
use crate::outlook::daily_bar;
use crate::tier::Tier;
use crate::timeline::DaySummary;

/// Replayed sectors; removed again after each step.
pub const REPLAY_SECTOR: Rgb888 = Rgb888::new(0, 207, 255);
/// The live sector.
pub const LIVE_SECTOR: Rgb888 = Rgb888::new(255, 0, 0);

/// Number of hours in the forecast strip.
pub const FORECAST_SLOTS: usize = 6;

/// A change to one widget.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetUpdate {
    SetValue(f64),
    AppendPoint { time_ms: i64, value: f64 },
    SetText(String),
    ReplaceModel { asset: AssetKey, color: Rgb888 },
    SetColor(Rgb888),
    SetSector(SectorShape),
    SetBar { label: String, value: f64, color: Rgb888 },
    Clear,
}

/// A change addressed to a widget.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub widget: String,
    pub change: WidgetUpdate,
    /// The artifact lasts only until the end of the current replay step.
    pub transient: bool,
}

impl Update {
    pub fn new(widget: impl Into<String>, change: WidgetUpdate) -> Self {
        Update {
            widget: widget.into(),
            change,
            transient: false,
        }
    }

    fn text(widget: impl Into<String>, text: String) -> Self {
        Self::new(widget, WidgetUpdate::SetText(text))
    }
}

/// Key of a per-metric widget, e.g. `line_series[pm2_5]`.
pub fn metric_key(prefix: &str, metric: Metric) -> String {
    format!("{prefix}[{}]", metric.name())
}

/// Key of a forecast strip widget, e.g. `forecast_hour[3]`.
pub fn slot_key(prefix: &str, slot: usize) -> String {
    format!("{prefix}[{slot}]")
}

/// Sector angles for a wind direction, in degrees.
///
/// Directions under 100° map to `[260 + d, 290 + d]`, which may run past 360;
/// the rest to `[d - 100, d - 80]`.
pub fn sector_angles(direction: f64) -> (f64, f64) {
    if direction < 100.0 {
        (260.0 + direction, 290.0 + direction)
    } else {
        (direction - 100.0, direction - 80.0)
    }
}

/// "label: value unit", with the placeholder for absent values.
fn labelled(label: &str, value: Option<f64>, precision: usize, unit: &str) -> String {
    let value = format_value(value, precision);
    if unit.is_empty() {
        format!("{label}: {value}")
    } else {
        format!("{label}: {value} {unit}")
    }
}

/// "value unit", with the placeholder for absent values.
fn with_unit(value: Option<f64>, precision: usize, unit: &str) -> String {
    format!("{} {unit}", format_value(value, precision))
}

/// A projection of one reading.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Date, weekday and time of the reading.
    Clock,
    /// A labelled value.
    Text {
        widget: &'static str,
        metric: Metric,
        label: &'static str,
    },
    /// A point on a series chart, keyed `<prefix>[<metric>]`.
    Series { prefix: &'static str, metric: Metric },
    /// A radar spoke, keyed `radar[<metric>]`.
    Radar { metric: Metric },
    /// A gauge value, colored by tier.
    Gauge { widget: &'static str, metric: Metric },
    /// A block in the tier color of its value; cleared while the value is absent.
    Tile { widget: &'static str, metric: Metric },
    /// While polling, today's daily bar follows the live value.
    TodayBar { metric: Metric },
    /// A sector whose angle follows `direction` and whose size follows `amplitude`.
    Sector {
        widget: &'static str,
        amplitude: Metric,
        direction: Metric,
    },
    /// A 3D icon chosen by a categorical code.
    Model {
        widget: &'static str,
        metric: Metric,
        category: AssetCategory,
    },
    /// The hours following the reading.
    ForecastStrip { slots: usize },
}

impl Projection {
    pub fn project(&self, reading: &Reading) -> Vec<Update> {
        match self {
            Projection::Clock => {
                let hour = match reading.phase {
                    Phase::Replay => "%H:%M",
                    Phase::Live => "%H:%M:%S",
                };
                vec![
                    Update::text("date_text", reading.time.format("%Y-%m-%d").to_string()),
                    Update::text("day_text", reading.time.format("%A").to_string()),
                    Update::text("hour_text", reading.time.format(hour).to_string()),
                ]
            }
            Projection::Text {
                widget,
                metric,
                label,
            } => {
                let info = metric.info();
                vec![Update::text(
                    *widget,
                    labelled(label, reading.get(*metric), info.precision, info.unit),
                )]
            }
            Projection::Series { prefix, metric } => match reading.get(*metric) {
                Some(value) if value.is_finite() => vec![Update::new(
                    metric_key(prefix, *metric),
                    WidgetUpdate::AppendPoint {
                        time_ms: reading.time.timestamp_millis(),
                        value,
                    },
                )],
                _ => Vec::new(),
            },
            Projection::Radar { metric } => match reading.get(*metric) {
                Some(value) if value.is_finite() => vec![Update::new(
                    metric_key("radar", *metric),
                    WidgetUpdate::SetValue(value),
                )],
                _ => Vec::new(),
            },
            Projection::Gauge { widget, metric } => match reading.get(*metric) {
                Some(value) if value.is_finite() => {
                    let mut updates = vec![Update::new(*widget, WidgetUpdate::SetValue(value))];
                    if let Some(thresholds) = metric.info().thresholds {
                        updates.push(Update::new(
                            *widget,
                            WidgetUpdate::SetColor(thresholds.classify(value).color()),
                        ));
                    }
                    updates
                }
                _ => Vec::new(),
            },
            Projection::Tile { widget, metric } => match reading.get(*metric) {
                Some(value) if value.is_finite() => {
                    let tier = metric
                        .info()
                        .thresholds
                        .map(|t| t.classify(value))
                        .unwrap_or(Tier::Good);
                    vec![
                        Update::new(*widget, WidgetUpdate::SetValue(value)),
                        Update::new(*widget, WidgetUpdate::SetColor(tier.color())),
                    ]
                }
                _ => vec![Update::new(*widget, WidgetUpdate::Clear)],
            },
            Projection::TodayBar { metric } => match (reading.phase, reading.get(*metric)) {
                (Phase::Live, Some(value)) if value.is_finite() => {
                    vec![daily_bar(*metric, reading.time.date_naive(), value)]
                }
                _ => Vec::new(),
            },
            Projection::Sector {
                widget,
                amplitude,
                direction,
            } => {
                let (Some(amplitude), Some(direction)) =
                    (reading.get(*amplitude), reading.get(*direction))
                else {
                    return Vec::new();
                };
                if !amplitude.is_finite() || !direction.is_finite() {
                    return Vec::new();
                }
                let (start, end) = sector_angles(direction);
                let (color, transient) = match reading.phase {
                    Phase::Replay => (REPLAY_SECTOR, true),
                    Phase::Live => (LIVE_SECTOR, false),
                };
                vec![Update {
                    widget: (*widget).to_owned(),
                    change: WidgetUpdate::SetSector(SectorShape {
                        start,
                        end,
                        amplitude: amplitude / 5.0,
                        color,
                    }),
                    transient,
                }]
            }
            Projection::Model {
                widget,
                metric,
                category,
            } => match reading.get(*metric) {
                Some(code) => {
                    let (asset, color) = resolve(*category, code);
                    vec![Update::new(
                        *widget,
                        WidgetUpdate::ReplaceModel { asset, color },
                    )]
                }
                None => Vec::new(),
            },
            Projection::ForecastStrip { slots } => forecast_strip(reading, *slots),
        }
    }
}

fn forecast_strip(reading: &Reading, slots: usize) -> Vec<Update> {
    let time = reading.time;
    let base = time
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time);
    let temperature = with_unit(reading.get(Metric::Temperature), 1, "°C");
    let humidity = with_unit(reading.get(Metric::RelativeHumidity), 1, "%");
    let pm10 = with_unit(reading.get(Metric::Pm10), 1, Metric::Pm10.info().unit);
    let pm2_5 = with_unit(reading.get(Metric::Pm2_5), 1, Metric::Pm2_5.info().unit);
    let model = reading
        .get(Metric::EuropeanAqi)
        .map(|aqi| resolve(AssetCategory::AirQuality, aqi));

    let mut updates = Vec::new();
    for i in 0..slots {
        let hour = base + Duration::hours(i as i64 + 1);
        updates.push(Update::text(
            slot_key("forecast_hour", i),
            hour.format("%H:%M").to_string(),
        ));
        if let Some((asset, color)) = model {
            updates.push(Update::new(
                slot_key("forecast_aqi_model", i),
                WidgetUpdate::ReplaceModel { asset, color },
            ));
        }
        updates.push(Update::text(slot_key("forecast_temperature", i), temperature.clone()));
        updates.push(Update::text(slot_key("forecast_humidity", i), humidity.clone()));
        updates.push(Update::text(slot_key("forecast_pm10", i), pm10.clone()));
        updates.push(Update::text(slot_key("forecast_pm2_5", i), pm2_5.clone()));
    }
    updates
}

/// A projection of one day's summary.
#[derive(Debug, Clone, PartialEq)]
pub enum DayProjection {
    /// The day's temperature extremes.
    HighLow,
    /// The day's extremes of a metric.
    MinMax(Metric),
}

impl DayProjection {
    pub fn project(&self, day: Option<&DaySummary>) -> Vec<Update> {
        match self {
            DayProjection::HighLow => {
                let high = format_value(day.and_then(DaySummary::high), 1);
                let low = format_value(day.and_then(DaySummary::low), 1);
                vec![
                    Update::text("high_temp_text", format!("High: {high}°C")),
                    Update::text("low_temp_text", format!("Low: {low}°C")),
                ]
            }
            DayProjection::MinMax(metric) => {
                let precision = metric.info().precision;
                let stats = day.and_then(|d| d.stats(*metric));
                let (min, max) = match stats {
                    Some(s) => (
                        format_value(Some(s.min), precision),
                        format_value(Some(s.max), precision),
                    ),
                    None => (PLACEHOLDER.to_owned(), PLACEHOLDER.to_owned()),
                };
                vec![Update::text(
                    metric_key("minmax", *metric),
                    format!("Min: {min}\nMax: {max}"),
                )]
            }
        }
    }
}

/// Every projection the dashboard applies.
#[derive(Debug, Clone)]
pub struct ProjectionSet {
    pub readings: Vec<Projection>,
    pub days: Vec<DayProjection>,
}

impl ProjectionSet {
    /// The projections backing the standard layout.
    pub fn standard() -> Self {
        let mut readings = vec![
            Projection::Clock,
            Projection::Text {
                widget: "pm10_text",
                metric: Metric::Pm10,
                label: "PM10",
            },
            Projection::Text {
                widget: "pm2_5_text",
                metric: Metric::Pm2_5,
                label: "PM2.5",
            },
            Projection::Text {
                widget: "aqi_text",
                metric: Metric::EuropeanAqi,
                label: "European AQI",
            },
            Projection::Text {
                widget: "current_temp_text",
                metric: Metric::Temperature,
                label: "Current",
            },
        ];
        readings.extend(Metric::POLLUTANTS.iter().map(|&metric| Projection::Series {
            prefix: "line_series",
            metric,
        }));
        readings.extend(Metric::AQI_COMPONENTS.iter().map(|&metric| Projection::Series {
            prefix: "aqi_area",
            metric,
        }));
        readings.extend(
            Metric::AQI_COMPONENTS
                .iter()
                .map(|&metric| Projection::Radar { metric }),
        );
        readings.extend([
            Projection::Gauge {
                widget: "uv_gauge",
                metric: Metric::UvIndex,
            },
            Projection::Tile {
                widget: "aqi_box",
                metric: Metric::EuropeanAqi,
            },
            Projection::Sector {
                widget: "pm2_5_sector",
                amplitude: Metric::Pm2_5,
                direction: Metric::WindDirection,
            },
            Projection::Model {
                widget: "weather_model",
                metric: Metric::WeatherCode,
                category: AssetCategory::Weather,
            },
            Projection::Model {
                widget: "aqi_model",
                metric: Metric::EuropeanAqi,
                category: AssetCategory::AirQuality,
            },
            Projection::ForecastStrip {
                slots: FORECAST_SLOTS,
            },
        ]);
        readings.extend(
            Metric::DAILY
                .iter()
                .map(|&metric| Projection::TodayBar { metric }),
        );

        let mut days = vec![DayProjection::HighLow];
        days.extend(Metric::DAILY.iter().map(|&m| DayProjection::MinMax(m)));

        ProjectionSet { readings, days }
    }

    /// Updates for one reading, in projection order.
    pub fn project(&self, reading: &Reading) -> Vec<Update> {
        self.readings
            .iter()
            .flat_map(|p| p.project(reading))
            .collect()
    }

    /// Updates for a day, or placeholders when there is no summary.
    pub fn project_day(&self, day: Option<&DaySummary>) -> Vec<Update> {
        self.days.iter().flat_map(|p| p.project(day)).collect()
    }
}
