//! The tracked metrics, and everything the dashboard knows about each one.
//!
//! One row per metric in [`TABLE`]; projections, the data source, and the
//! threshold coloring all read from here rather than special-casing metrics.

use crate::tier::Thresholds;

/// Which upstream feed a metric comes from.
/// Metrics from the same feed are fetched in one request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Feed {
    AirQuality,
    Weather,
}

/// A tracked variable.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Pm10,
    Pm2_5,
    NitrogenDioxide,
    Ozone,
    CarbonMonoxide,
    SulphurDioxide,
    UvIndex,
    EuropeanAqi,
    EuropeanAqiPm2_5,
    EuropeanAqiPm10,
    EuropeanAqiNitrogenDioxide,
    EuropeanAqiOzone,
    EuropeanAqiSulphurDioxide,
    Temperature,
    RelativeHumidity,
    WeatherCode,
    WindDirection,
}

/// Static description of a metric.
#[derive(Debug)]
pub struct MetricInfo {
    pub metric: Metric,
    /// Variable name in the upstream API, also used in widget keys.
    pub name: &'static str,
    pub feed: Feed,
    /// Human-readable label.
    pub label: &'static str,
    /// Display unit; may be empty.
    pub unit: &'static str,
    /// Decimal places when displayed.
    pub precision: usize,
    /// Tier boundaries, for metrics that are color-coded.
    pub thresholds: Option<Thresholds>,
}

const MICROGRAMS: &str = "µg/m³";

/// Indexed by `Metric as usize`.
static TABLE: [MetricInfo; 17] = [
    MetricInfo {
        metric: Metric::Pm10,
        name: "pm10",
        feed: Feed::AirQuality,
        label: "PM10",
        unit: MICROGRAMS,
        precision: 1,
        thresholds: Some(Thresholds::new(12.0, 35.0)),
    },
    MetricInfo {
        metric: Metric::Pm2_5,
        name: "pm2_5",
        feed: Feed::AirQuality,
        label: "PM2.5",
        unit: MICROGRAMS,
        precision: 1,
        thresholds: Some(Thresholds::new(12.0, 35.0)),
    },
    MetricInfo {
        metric: Metric::NitrogenDioxide,
        name: "nitrogen_dioxide",
        feed: Feed::AirQuality,
        label: "NO2",
        unit: MICROGRAMS,
        precision: 1,
        thresholds: Some(Thresholds::new(40.0, 100.0)),
    },
    MetricInfo {
        metric: Metric::Ozone,
        name: "ozone",
        feed: Feed::AirQuality,
        label: "O3",
        unit: MICROGRAMS,
        precision: 1,
        thresholds: Some(Thresholds::new(70.0, 100.0)),
    },
    MetricInfo {
        metric: Metric::CarbonMonoxide,
        name: "carbon_monoxide",
        feed: Feed::AirQuality,
        label: "CO",
        unit: "ppm",
        precision: 1,
        thresholds: Some(Thresholds::new(10_000.0, 40_000.0)),
    },
    MetricInfo {
        metric: Metric::SulphurDioxide,
        name: "sulphur_dioxide",
        feed: Feed::AirQuality,
        label: "SO2",
        unit: MICROGRAMS,
        precision: 1,
        thresholds: Some(Thresholds::new(10.0, 30.0)),
    },
    MetricInfo {
        metric: Metric::UvIndex,
        name: "uv_index",
        feed: Feed::AirQuality,
        label: "UV Index",
        unit: "",
        precision: 1,
        thresholds: Some(Thresholds::new(2.0, 5.0)),
    },
    MetricInfo {
        metric: Metric::EuropeanAqi,
        name: "european_aqi",
        feed: Feed::AirQuality,
        label: "European AQI",
        unit: "",
        precision: 0,
        // Integral index: 0..=20 good, 21..=40 moderate.
        thresholds: Some(Thresholds::new(21.0, 40.0)),
    },
    MetricInfo {
        metric: Metric::EuropeanAqiPm2_5,
        name: "european_aqi_pm2_5",
        feed: Feed::AirQuality,
        label: "PM2.5",
        unit: "",
        precision: 0,
        thresholds: None,
    },
    MetricInfo {
        metric: Metric::EuropeanAqiPm10,
        name: "european_aqi_pm10",
        feed: Feed::AirQuality,
        label: "PM10",
        unit: "",
        precision: 0,
        thresholds: None,
    },
    MetricInfo {
        metric: Metric::EuropeanAqiNitrogenDioxide,
        name: "european_aqi_nitrogen_dioxide",
        feed: Feed::AirQuality,
        label: "NO2",
        unit: "",
        precision: 0,
        thresholds: None,
    },
    MetricInfo {
        metric: Metric::EuropeanAqiOzone,
        name: "european_aqi_ozone",
        feed: Feed::AirQuality,
        label: "O3",
        unit: "",
        precision: 0,
        thresholds: None,
    },
    MetricInfo {
        metric: Metric::EuropeanAqiSulphurDioxide,
        name: "european_aqi_sulphur_dioxide",
        feed: Feed::AirQuality,
        label: "SO2",
        unit: "",
        precision: 0,
        thresholds: None,
    },
    MetricInfo {
        metric: Metric::Temperature,
        name: "temperature_2m",
        feed: Feed::Weather,
        label: "Temperature",
        unit: "°C",
        precision: 1,
        thresholds: None,
    },
    MetricInfo {
        metric: Metric::RelativeHumidity,
        name: "relative_humidity_2m",
        feed: Feed::Weather,
        label: "Humidity",
        unit: "%",
        precision: 1,
        thresholds: None,
    },
    MetricInfo {
        metric: Metric::WeatherCode,
        name: "weather_code",
        feed: Feed::Weather,
        label: "Weather",
        unit: "",
        precision: 0,
        thresholds: None,
    },
    MetricInfo {
        metric: Metric::WindDirection,
        name: "wind_direction_10m",
        feed: Feed::Weather,
        label: "Wind direction",
        unit: "°",
        precision: 0,
        thresholds: None,
    },
];

impl Metric {
    /// Every tracked metric, in table order.
    pub const ALL: [Metric; 17] = [
        Metric::Pm10,
        Metric::Pm2_5,
        Metric::NitrogenDioxide,
        Metric::Ozone,
        Metric::CarbonMonoxide,
        Metric::SulphurDioxide,
        Metric::UvIndex,
        Metric::EuropeanAqi,
        Metric::EuropeanAqiPm2_5,
        Metric::EuropeanAqiPm10,
        Metric::EuropeanAqiNitrogenDioxide,
        Metric::EuropeanAqiOzone,
        Metric::EuropeanAqiSulphurDioxide,
        Metric::Temperature,
        Metric::RelativeHumidity,
        Metric::WeatherCode,
        Metric::WindDirection,
    ];

    /// Pollutant concentrations, as charted on the trend lines.
    pub const POLLUTANTS: [Metric; 5] = [
        Metric::Pm10,
        Metric::Pm2_5,
        Metric::NitrogenDioxide,
        Metric::Ozone,
        Metric::CarbonMonoxide,
    ];

    /// Per-pollutant components of the European AQI.
    pub const AQI_COMPONENTS: [Metric; 5] = [
        Metric::EuropeanAqiPm2_5,
        Metric::EuropeanAqiPm10,
        Metric::EuropeanAqiNitrogenDioxide,
        Metric::EuropeanAqiOzone,
        Metric::EuropeanAqiSulphurDioxide,
    ];

    /// Metrics with a daily bar and min/max box.
    pub const DAILY: [Metric; 7] = [
        Metric::Pm2_5,
        Metric::Pm10,
        Metric::NitrogenDioxide,
        Metric::Ozone,
        Metric::CarbonMonoxide,
        Metric::SulphurDioxide,
        Metric::UvIndex,
    ];

    pub fn info(self) -> &'static MetricInfo {
        &TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn feed(self) -> Feed {
        self.info().feed
    }
}

impl core::fmt::Display for Metric {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_discriminant() {
        for (i, metric) in Metric::ALL.iter().enumerate() {
            assert_eq!(*metric as usize, i);
            assert_eq!(metric.info().metric, *metric);
        }
    }

    #[test]
    fn names_are_unique() {
        let names: std::collections::HashSet<_> = Metric::ALL.iter().map(|m| m.name()).collect();
        assert_eq!(names.len(), Metric::ALL.len());
    }

    #[test]
    fn units() {
        assert_eq!(Metric::CarbonMonoxide.info().unit, "ppm");
        assert_eq!(Metric::SulphurDioxide.info().unit, "µg/m³");
        assert_eq!(Metric::EuropeanAqi.info().unit, "");
    }

    #[test]
    fn feeds() {
        assert_eq!(Metric::Pm2_5.feed(), Feed::AirQuality);
        assert_eq!(Metric::UvIndex.feed(), Feed::AirQuality);
        assert_eq!(Metric::WindDirection.feed(), Feed::Weather);
        assert_eq!(Metric::WeatherCode.feed(), Feed::Weather);
    }

    #[test]
    fn daily_metrics_are_color_coded() {
        for metric in Metric::DAILY {
            assert!(metric.info().thresholds.is_some(), "{metric}");
        }
    }
}
