//! Client for the [Open-Meteo](https://open-meteo.com/) forecast and air-quality APIs.
//!
//! Both APIs share one query shape:
//!
//! - `latitude`, `longitude`: the location to sample
//! - `timezone=auto`: timestamps come back in the location's local time, with
//!   the offset reported as `utc_offset_seconds`
//! - either `hourly=<vars>` with `past_days` / `forecast_days`,
//!   or `current=<vars>` for a single reading.
//!
//! Requests are made exactly once; callers decide whether to try again.

use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;

mod response;

pub use response::{Current, Hourly};

/// Which Open-Meteo service to query.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Api {
    /// Weather forecast (and recent history): temperature, humidity, wind, weather codes.
    Forecast,
    /// CAMS air-quality model: particulates, gases, UV, European AQI.
    AirQuality,
}

impl Api {
    fn url<'a>(&self, settings: &'a Settings) -> &'a str {
        match self {
            Api::Forecast => &settings.forecast_url,
            Api::AirQuality => &settings.air_quality_url,
        }
    }
}

impl core::fmt::Display for Api {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Api::Forecast => write!(f, "forecast"),
            Api::AirQuality => write!(f, "air-quality"),
        }
    }
}

/// An error in talking to Open-Meteo.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request never produced a response (DNS, connect, timeout, TLS...).
    #[error("request to Open-Meteo failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("Open-Meteo returned HTTP {status}: {reason}")]
    Status { status: u16, reason: String },

    /// The body was not JSON of the expected shape.
    #[error("could not decode Open-Meteo response: {0}")]
    Decode(#[from] serde_json::Error),

    /// An expected field was not present.
    #[error("Open-Meteo response is missing {0}")]
    Missing(String),

    /// A field was present, but held something unusable.
    #[error("Open-Meteo response has malformed {0}")]
    Malformed(String),
}

/// Settings for talking to Open-Meteo.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Settings {
    /// Latitude of the sampled location, in degrees.
    pub latitude: f64,
    /// Longitude of the sampled location, in degrees.
    pub longitude: f64,
    /// Upper bound on a single request, connect to last byte.
    pub timeout: Duration,
    pub forecast_url: String,
    pub air_quality_url: String,
}

impl Settings {
    /// Settings for the given location, with the public endpoints.
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Settings {
            latitude,
            longitude,
            ..Default::default()
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        // Helsinki, Finland
        Self {
            latitude: 60.1699,
            longitude: 24.9384,
            timeout: Duration::from_secs(30),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_owned(),
            air_quality_url: "https://air-quality-api.open-meteo.com/v1/air-quality".to_owned(),
        }
    }
}

/// Handle to the Open-Meteo APIs for one location.
pub struct Client {
    http: HttpClient,
    settings: Settings,
}

/// Error body returned alongside a 4xx.
#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    reason: String,
}

impl Client {
    /// Create a client for the configured location.
    pub fn new(settings: Settings) -> Result<Self, Error> {
        let http = HttpClient::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("airdash/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Client { http, settings })
    }

    /// Fetch hourly values of the given variables over a window around today.
    pub fn hourly(
        &self,
        api: Api,
        variables: &[&str],
        past_days: u32,
        forecast_days: u32,
    ) -> Result<Hourly, Error> {
        let body = self.get(
            api,
            &[
                ("hourly", variables.join(",")),
                ("past_days", past_days.to_string()),
                ("forecast_days", forecast_days.to_string()),
            ],
        )?;
        Hourly::parse(&body, variables)
    }

    /// Fetch the current value of each of the given variables.
    pub fn current(&self, api: Api, variables: &[&str]) -> Result<Current, Error> {
        let body = self.get(api, &[("current", variables.join(","))])?;
        Current::parse(&body, variables)
    }

    fn get(&self, api: Api, query: &[(&str, String)]) -> Result<String, Error> {
        let url = api.url(&self.settings);
        tracing::debug!("GET {} {:?}", url, query);
        let response = self
            .http
            .get(url)
            .query(&[
                ("latitude", self.settings.latitude.to_string()),
                ("longitude", self.settings.longitude.to_string()),
                ("timezone", "auto".to_owned()),
            ])
            .query(query)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            let reason = serde_json::from_str::<ErrorBody>(&body)
                .map(|e| e.reason)
                .unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                reason,
            });
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_urls_follow_settings() {
        let mut settings = Settings::default();
        settings.forecast_url = "http://localhost:1/forecast".to_owned();
        assert_eq!(Api::Forecast.url(&settings), "http://localhost:1/forecast");
        assert!(Api::AirQuality
            .url(&settings)
            .starts_with("https://air-quality-api.open-meteo.com"));
    }
}
