//! Runtime settings, from an optional JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use embedded_graphics::geometry::Size;
use serde::Deserialize;

use crate::layout::{COLUMNS, ROWS};
use crate::source::Window;

/// Names the settings file, if any.
pub const SETTINGS_ENV: &str = "AIRDASH_SETTINGS";

/// Largest panel width or height, in pixels.
const MAX_PANEL_SIDE: u32 = 8192;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("could not read settings from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Settings for a dashboard run. Every field is optional in the file.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Shown in the header.
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Days of history to replay.
    pub past_days: u32,
    /// Days of forecast to fetch alongside the history.
    pub forecast_days: u32,
    /// Days either side of today covered by the daily bars.
    pub outlook_past_days: u32,
    pub outlook_forecast_days: u32,
    /// Time each replayed hour is shown for.
    pub replay_step_ms: u64,
    /// Pause between live polls.
    pub poll_interval_ms: u64,
    /// Directory holding the "weather" and "air quality" model directories.
    pub asset_root: PathBuf,
    pub request_timeout_secs: u64,
    /// Size of one grid cell, in pixels.
    pub cell_width: u32,
    pub cell_height: u32,
    /// PNG rewritten on every flush when the panel has no window.
    pub frame_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            location: "Helsinki, Finland".to_owned(),
            latitude: 60.1699,
            longitude: 24.9384,
            past_days: 1,
            forecast_days: 1,
            outlook_past_days: 7,
            outlook_forecast_days: 7,
            replay_step_ms: 1000,
            poll_interval_ms: 100,
            asset_root: PathBuf::from("Objects"),
            request_timeout_secs: 30,
            cell_width: 48,
            cell_height: 40,
            frame_path: PathBuf::from("airdash.png"),
        }
    }
}

impl Settings {
    /// Read settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text).map_err(|e| match e {
            SettingsError::Parse { source, .. } => SettingsError::Parse {
                path: path.to_owned(),
                source,
            },
            e => e,
        })
    }

    /// Settings from the file named by `AIRDASH_SETTINGS`, or the defaults.
    pub fn from_env() -> Result<Self, SettingsError> {
        match std::env::var_os(SETTINGS_ENV) {
            Some(path) => {
                tracing::info!("reading settings from {:?}", path);
                Self::load(Path::new(&path))
            }
            None => Ok(Self::default()),
        }
    }

    fn parse(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings =
            serde_json::from_str(text).map_err(|source| SettingsError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |s: String| Err(SettingsError::Invalid(s));
        if !(-90.0..=90.0).contains(&self.latitude) {
            return invalid(format!("latitude {} is outside [-90, 90]", self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return invalid(format!("longitude {} is outside [-180, 180]", self.longitude));
        }
        if self.replay_step_ms == 0 {
            return invalid("replay_step_ms must be positive".to_owned());
        }
        if self.poll_interval_ms == 0 {
            return invalid("poll_interval_ms must be positive".to_owned());
        }
        if self.request_timeout_secs == 0 {
            return invalid("request_timeout_secs must be positive".to_owned());
        }
        if self.cell_width == 0 || self.cell_height == 0 {
            return invalid("cell size must be positive".to_owned());
        }
        let width = self.cell_width.checked_mul(COLUMNS as u32);
        let height = self.cell_height.checked_mul(ROWS as u32);
        if !width.zip(height).is_some_and(|(w, h)| w <= MAX_PANEL_SIDE && h <= MAX_PANEL_SIDE) {
            return invalid(format!(
                "a {}x{} cell makes the panel larger than {MAX_PANEL_SIDE} pixels a side",
                self.cell_width, self.cell_height
            ));
        }
        Ok(())
    }

    /// The window the daily bars are fetched over.
    pub fn outlook_window(&self) -> Window {
        Window {
            past_days: self.outlook_past_days,
            forecast_days: self.outlook_forecast_days,
        }
    }

    pub fn replay_step(&self) -> Duration {
        Duration::from_millis(self.replay_step_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn cell_size(&self) -> Size {
        Size::new(self.cell_width, self.cell_height)
    }

    /// Size of the whole panel.
    pub fn panel_size(&self) -> Size {
        Size::new(
            self.cell_width * COLUMNS as u32,
            self.cell_height * ROWS as u32,
        )
    }
}

impl From<&Settings> for openmeteo::Settings {
    fn from(settings: &Settings) -> Self {
        let mut s = openmeteo::Settings::at(settings.latitude, settings.longitude);
        s.timeout = Duration::from_secs(settings.request_timeout_secs);
        s
    }
}

impl From<&Settings> for Window {
    fn from(settings: &Settings) -> Self {
        Window {
            past_days: settings.past_days,
            forecast_days: settings.forecast_days,
        }
    }
}
