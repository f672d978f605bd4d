//! Decoding of Open-Meteo response bodies.
//!
//! Bodies look like:
//!
//! ```json
//! {
//!   "utc_offset_seconds": 7200,
//!   "hourly": { "time": ["2025-03-01T00:00", ...], "pm10": [11.2, null, ...] }
//! }
//! ```
//!
//! or, for current values, `"current": { "time": "...", "pm10": 11.2 }`.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::Error;

/// Timestamps are local time at minute resolution.
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Deserialize)]
struct HourlyBody {
    #[serde(default)]
    utc_offset_seconds: i32,
    hourly: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct CurrentBody {
    #[serde(default)]
    utc_offset_seconds: i32,
    current: Option<Map<String, Value>>,
}

/// Hourly values: a time axis plus one column per requested variable.
///
/// Columns are exactly as long as the time axis; absent readings are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Hourly {
    pub time: Vec<DateTime<FixedOffset>>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl Hourly {
    /// Decode an hourly response, requiring a column for each of `variables`.
    pub fn parse(body: &str, variables: &[&str]) -> Result<Self, Error> {
        let body: HourlyBody = serde_json::from_str(body)?;
        let offset = offset(body.utc_offset_seconds)?;
        let mut hourly = body
            .hourly
            .ok_or_else(|| Error::Missing("hourly".to_owned()))?;

        let time = match hourly.remove("time") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| match v.as_str() {
                    Some(s) => timestamp(s, offset),
                    None => Err(Error::Malformed(format!("hourly.time entry {v}"))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Some(_) => return Err(Error::Malformed("hourly.time".to_owned())),
            None => return Err(Error::Missing("hourly.time".to_owned())),
        };

        let mut columns = BTreeMap::new();
        for &variable in variables {
            let field = format!("hourly.{variable}");
            let column = match hourly.remove(variable) {
                Some(Value::Array(items)) => items
                    .into_iter()
                    .map(|v| number(v, &field))
                    .collect::<Result<Vec<_>, _>>()?,
                Some(_) => return Err(Error::Malformed(field)),
                None => return Err(Error::Missing(field)),
            };
            if column.len() != time.len() {
                return Err(Error::Malformed(format!(
                    "{field}: {} values for {} timestamps",
                    column.len(),
                    time.len()
                )));
            }
            columns.insert(variable.to_owned(), column);
        }

        Ok(Hourly { time, columns })
    }

    /// Number of hours covered.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// (timestamp, value) pairs of one variable, in the order the API returned them.
    pub fn series<'a>(
        &'a self,
        variable: &str,
    ) -> Option<impl Iterator<Item = (DateTime<FixedOffset>, Option<f64>)> + 'a> {
        let column = self.columns.get(variable)?;
        Some(self.time.iter().copied().zip(column.iter().copied()))
    }
}

/// Current values of the requested variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Current {
    /// Start of the interval the values describe.
    pub time: DateTime<FixedOffset>,
    values: BTreeMap<String, Option<f64>>,
}

impl Current {
    /// Decode a current-values response, requiring each of `variables`.
    pub fn parse(body: &str, variables: &[&str]) -> Result<Self, Error> {
        let body: CurrentBody = serde_json::from_str(body)?;
        let offset = offset(body.utc_offset_seconds)?;
        let mut current = body
            .current
            .ok_or_else(|| Error::Missing("current".to_owned()))?;

        let time = match current.remove("time") {
            Some(Value::String(s)) => timestamp(&s, offset)?,
            Some(_) => return Err(Error::Malformed("current.time".to_owned())),
            None => return Err(Error::Missing("current.time".to_owned())),
        };

        let mut values = BTreeMap::new();
        for &variable in variables {
            let field = format!("current.{variable}");
            let value = current
                .remove(variable)
                .ok_or_else(|| Error::Missing(field.clone()))?;
            values.insert(variable.to_owned(), number(value, &field)?);
        }
        Ok(Current { time, values })
    }

    /// The current value of a variable; `None` if it was requested but null.
    pub fn get(&self, variable: &str) -> Option<f64> {
        self.values.get(variable).copied().flatten()
    }
}

fn number(value: Value, field: &str) -> Result<Option<f64>, Error> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| Error::Malformed(field.to_owned())),
        other => Err(Error::Malformed(format!("{field}: {other}"))),
    }
}

fn offset(seconds: i32) -> Result<FixedOffset, Error> {
    FixedOffset::east_opt(seconds)
        .ok_or_else(|| Error::Malformed(format!("utc_offset_seconds {seconds}")))
}

fn timestamp(s: &str, offset: FixedOffset) -> Result<DateTime<FixedOffset>, Error> {
    NaiveDateTime::parse_from_str(s, TIME_FORMAT)
        .ok()
        .and_then(|naive| offset.from_local_datetime(&naive).single())
        .ok_or_else(|| Error::Malformed(format!("timestamp {s:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const HOURLY: &str = r#"{
        "latitude": 60.17,
        "longitude": 24.94,
        "utc_offset_seconds": 7200,
        "timezone": "Europe/Helsinki",
        "hourly_units": { "time": "iso8601", "pm10": "μg/m³" },
        "hourly": {
            "time": ["2025-03-01T00:00", "2025-03-01T01:00", "2025-03-01T02:00"],
            "pm10": [11.5, null, 9],
            "european_aqi": [18, 22, 25]
        }
    }"#;

    #[test]
    fn hourly_applies_reported_offset() {
        let hourly = Hourly::parse(HOURLY, &["pm10"]).expect("should parse");
        assert_eq!(hourly.len(), 3);
        let first = hourly.time[0];
        assert_eq!(first.offset().local_minus_utc(), 7200);
        assert_eq!(
            first.with_timezone(&Utc).to_rfc3339(),
            "2025-02-28T22:00:00+00:00"
        );
    }

    #[test]
    fn hourly_keeps_nulls_as_absent() {
        let hourly = Hourly::parse(HOURLY, &["pm10", "european_aqi"]).expect("should parse");
        let pm10: Vec<_> = hourly
            .series("pm10")
            .expect("requested column")
            .map(|(_, v)| v)
            .collect();
        assert_eq!(pm10, vec![Some(11.5), None, Some(9.0)]);
        let aqi: Vec<_> = hourly
            .series("european_aqi")
            .expect("requested column")
            .map(|(_, v)| v)
            .collect();
        assert_eq!(aqi, vec![Some(18.0), Some(22.0), Some(25.0)]);
        assert!(hourly.series("ozone").is_none());
    }

    #[test]
    fn hourly_missing_variable() {
        let err = Hourly::parse(HOURLY, &["ozone"]).expect_err("ozone was not returned");
        assert!(matches!(err, Error::Missing(ref f) if f == "hourly.ozone"), "{err}");
    }

    #[test]
    fn hourly_missing_block() {
        let err = Hourly::parse(r#"{"utc_offset_seconds": 0}"#, &["pm10"])
            .expect_err("no hourly block");
        assert!(matches!(err, Error::Missing(ref f) if f == "hourly"), "{err}");
    }

    #[test]
    fn hourly_length_mismatch() {
        let body = r#"{"hourly": {"time": ["2025-03-01T00:00"], "pm10": [1, 2]}}"#;
        let err = Hourly::parse(body, &["pm10"]).expect_err("ragged columns");
        assert!(matches!(err, Error::Malformed(_)), "{err}");
    }

    #[test]
    fn hourly_non_numeric_value() {
        let body = r#"{"hourly": {"time": ["2025-03-01T00:00"], "pm10": ["high"]}}"#;
        let err = Hourly::parse(body, &["pm10"]).expect_err("string value");
        assert!(matches!(err, Error::Malformed(_)), "{err}");
    }

    #[test]
    fn hourly_bad_timestamp() {
        let body = r#"{"hourly": {"time": ["yesterday"], "pm10": [1]}}"#;
        let err = Hourly::parse(body, &["pm10"]).expect_err("unparseable time");
        assert!(matches!(err, Error::Malformed(_)), "{err}");
    }

    #[test]
    fn not_json() {
        let err = Hourly::parse("<html>", &["pm10"]).expect_err("not json");
        assert!(matches!(err, Error::Decode(_)), "{err}");
    }

    #[test]
    fn current_values() {
        let body = r#"{
            "utc_offset_seconds": 7200,
            "current": {
                "time": "2025-03-01T13:15",
                "interval": 900,
                "pm2_5": 4.2,
                "uv_index": null
            }
        }"#;
        let current = Current::parse(body, &["pm2_5", "uv_index"]).expect("should parse");
        assert_eq!(current.get("pm2_5"), Some(4.2));
        assert_eq!(current.get("uv_index"), None);
        assert_eq!(current.time.to_rfc3339(), "2025-03-01T13:15:00+02:00");
    }

    #[test]
    fn current_missing_variable() {
        let body = r#"{"current": {"time": "2025-03-01T13:15", "pm2_5": 4.2}}"#;
        let err = Current::parse(body, &["pm2_5", "ozone"]).expect_err("ozone missing");
        assert!(matches!(err, Error::Missing(ref f) if f == "current.ozone"), "{err}");
    }

    #[test]
    fn current_missing_block() {
        let err = Current::parse("{}", &["pm2_5"]).expect_err("no current block");
        assert!(matches!(err, Error::Missing(ref f) if f == "current"), "{err}");
    }
}
