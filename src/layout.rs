//! Where each widget sits on the grid.

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use crate::dashboard::{GridCell, Slot, WidgetKind, WidgetSpec};
use crate::metric::Metric;
use crate::outlook::DAILY_BAR;
use crate::projection::{metric_key, slot_key, FORECAST_SLOTS, LIVE_SECTOR};

pub const COLUMNS: u16 = 19;
pub const ROWS: u16 = 16;

/// Series colors, in the order of the metrics they chart.
const PALETTE: [Rgb888; 7] = [
    Rgb888::new(255, 99, 71),
    Rgb888::new(255, 215, 0),
    Rgb888::new(50, 205, 50),
    Rgb888::new(30, 144, 255),
    Rgb888::new(238, 130, 238),
    Rgb888::new(255, 165, 0),
    Rgb888::new(0, 206, 209),
];

/// A fixed arrangement of widgets on a `COLUMNS` x `ROWS` grid.
#[derive(Debug, Clone)]
pub struct Layout {
    pub columns: u16,
    pub rows: u16,
    pub widgets: Vec<WidgetSpec>,
}

struct Builder(Vec<WidgetSpec>);

impl Builder {
    fn add(&mut self, key: impl Into<String>, kind: WidgetKind, cell: GridCell) -> &mut WidgetSpec {
        self.0.push(WidgetSpec {
            key: key.into(),
            kind,
            cell,
            slot: Slot::WHOLE,
            title: String::new(),
            initial_text: None,
            range: (0.0, 100.0),
            color: Rgb888::WHITE,
        });
        let last = self.0.len() - 1;
        &mut self.0[last]
    }

    fn text(&mut self, key: impl Into<String>, cell: GridCell, slot: Slot, initial: &str) {
        let spec = self.add(key, WidgetKind::Text, cell);
        spec.slot = slot;
        spec.initial_text = Some(initial.to_owned());
    }
}

impl Layout {
    /// The dashboard for one location.
    pub fn standard(location: &str) -> Self {
        let mut b = Builder(Vec::new());

        // Header.
        b.text("location_text", GridCell::new(0, 0, 6, 1), Slot::WHOLE, location);
        b.text("date_text", GridCell::new(6, 0, 4, 1), Slot::WHOLE, "");
        b.text("day_text", GridCell::new(10, 0, 4, 1), Slot::WHOLE, "");
        b.text("hour_text", GridCell::new(14, 0, 5, 1), Slot::WHOLE, "");

        // Current conditions.
        b.add("weather_model", WidgetKind::Model, GridCell::new(0, 1, 4, 4))
            .title = "Weather".to_owned();
        let temps = GridCell::new(4, 1, 4, 2);
        b.text("current_temp_text", temps, Slot::band(0, 3), "Current: -- °C");
        b.text("high_temp_text", temps, Slot::band(1, 3), "High: --°C");
        b.text("low_temp_text", temps, Slot::band(2, 3), "Low: --°C");
        b.add("aqi_box", WidgetKind::Tile, GridCell::new(4, 3, 4, 2))
            .title = "European AQI".to_owned();
        b.add("aqi_model", WidgetKind::Model, GridCell::new(8, 1, 3, 3))
            .title = "Air quality".to_owned();
        b.text("aqi_text", GridCell::new(8, 4, 3, 1), Slot::WHOLE, "European AQI: --");
        let particulates = GridCell::new(11, 1, 4, 2);
        b.text("pm10_text", particulates, Slot::band(0, 2), "PM10: -- µg/m³");
        b.text("pm2_5_text", particulates, Slot::band(1, 2), "PM2.5: -- µg/m³");
        {
            let sector = b.add("pm2_5_sector", WidgetKind::Polar, GridCell::new(11, 3, 4, 2));
            sector.title = "PM2.5 by wind".to_owned();
            sector.range = (0.0, 20.0);
            sector.color = LIVE_SECTOR;
        }
        {
            let gauge = b.add("uv_gauge", WidgetKind::Gauge, GridCell::new(15, 1, 4, 4));
            gauge.title = "UV Index".to_owned();
            gauge.range = (0.0, 11.0);
        }

        // Trends.
        for (i, metric) in Metric::POLLUTANTS.iter().enumerate() {
            let line = b.add(
                metric_key("line_series", *metric),
                WidgetKind::Line,
                GridCell::new(0, 5, 10, 4),
            );
            line.title = metric.info().label.to_owned();
            line.color = PALETTE[i];
        }
        for (i, metric) in Metric::AQI_COMPONENTS.iter().enumerate() {
            let area = b.add(
                metric_key("aqi_area", *metric),
                WidgetKind::Area,
                GridCell::new(10, 5, 9, 4),
            );
            area.title = metric.info().label.to_owned();
            area.color = PALETTE[i];
        }
        for (i, metric) in Metric::AQI_COMPONENTS.iter().enumerate() {
            let spoke = b.add(
                metric_key("radar", *metric),
                WidgetKind::Radar,
                GridCell::new(0, 9, 5, 4),
            );
            spoke.title = metric.info().label.to_owned();
            spoke.color = PALETTE[i];
        }

        // Daily means, a week either side of today.
        for (i, metric) in Metric::DAILY.iter().enumerate() {
            let col = 5 + 2 * i as u16;
            let bar = b.add(
                metric_key(DAILY_BAR, *metric),
                WidgetKind::Bar,
                GridCell::new(col, 9, 2, 3),
            );
            bar.title = metric.info().label.to_owned();
            bar.color = PALETTE[i];
            b.text(
                metric_key("minmax", *metric),
                GridCell::new(col, 12, 2, 1),
                Slot::WHOLE,
                "Min: --\nMax: --",
            );
        }

        // The next hours.
        for i in 0..FORECAST_SLOTS {
            let cell = GridCell::new(3 * i as u16, 13, 3, 3);
            b.text(slot_key("forecast_hour", i), cell, Slot::band(0, 6), "--:--");
            b.add(slot_key("forecast_aqi_model", i), WidgetKind::Model, cell)
                .slot = Slot::band(1, 6);
            b.text(slot_key("forecast_temperature", i), cell, Slot::band(2, 6), "-- °C");
            b.text(slot_key("forecast_humidity", i), cell, Slot::band(3, 6), "-- %");
            b.text(slot_key("forecast_pm10", i), cell, Slot::band(4, 6), "-- µg/m³");
            b.text(slot_key("forecast_pm2_5", i), cell, Slot::band(5, 6), "-- µg/m³");
        }

        Layout {
            columns: COLUMNS,
            rows: ROWS,
            widgets: b.0,
        }
    }

    pub fn get(&self, key: &str) -> Option<&WidgetSpec> {
        self.widgets.iter().find(|w| w.key == key)
    }
}
