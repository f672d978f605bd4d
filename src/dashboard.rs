//! The rendering sink: where widget updates end up.

use std::sync::Arc;

use embedded_graphics::pixelcolor::Rgb888;

use crate::assets::{AssetKey, Geometry};

/// What a widget draws.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    /// A line of text.
    Text,
    /// A time series, drawn as a line.
    Line,
    /// A time series, drawn as a filled area.
    Area,
    /// One spoke of a radar chart.
    Radar,
    /// A value on a fixed scale.
    Gauge,
    /// A sector of a polar chart.
    Polar,
    /// A 3D icon.
    Model,
    /// Bars, one per labelled entry.
    Bar,
    /// A value as a whole number on a block of color.
    Tile,
}

/// A rectangle of the layout grid, in whole cells.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub col: u16,
    pub row: u16,
    pub col_span: u16,
    pub row_span: u16,
}

impl GridCell {
    pub const fn new(col: u16, row: u16, col_span: u16, row_span: u16) -> Self {
        GridCell {
            col,
            row,
            col_span,
            row_span,
        }
    }
}

/// A horizontal band of a grid cell: band `index` of `count` equal bands,
/// top to bottom. Several widgets can share a cell this way.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Slot {
    pub index: u16,
    pub count: u16,
}

impl Slot {
    pub const WHOLE: Slot = Slot { index: 0, count: 1 };

    pub const fn band(index: u16, count: u16) -> Self {
        Slot { index, count }
    }
}

/// Everything needed to create a widget.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetSpec {
    pub key: String,
    pub kind: WidgetKind,
    pub cell: GridCell,
    pub slot: Slot,
    /// Caption drawn with the widget; may be empty.
    pub title: String,
    /// Text shown before the first update.
    pub initial_text: Option<String>,
    /// Value range of charts, gauges and sectors.
    pub range: (f64, f64),
    pub color: Rgb888,
}

/// A polar sector, in degrees clockwise from north.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SectorShape {
    pub start: f64,
    pub end: f64,
    pub amplitude: f64,
    pub color: Rgb888,
}

/// A write-only sink of widget changes.
///
/// Keys name widgets created with `create_widget`; updates to unknown keys
/// are ignored. Nothing is guaranteed visible before `flush`.
pub trait Dashboard {
    fn create_widget(&mut self, spec: &WidgetSpec);

    fn set_value(&mut self, key: &str, value: f64);

    /// Add a point to a series; `time_ms` is milliseconds since the epoch.
    fn append_point(&mut self, key: &str, time_ms: i64, value: f64);

    fn set_text(&mut self, key: &str, text: &str);

    /// Swap the widget's model for another.
    fn replace_model(&mut self, key: &str, asset: AssetKey, geometry: Arc<Geometry>, color: Rgb888);

    fn set_color(&mut self, key: &str, color: Rgb888);

    fn set_sector(&mut self, key: &str, sector: SectorShape);

    /// Set the bar labelled `label`, adding it if it is new.
    fn set_bar(&mut self, key: &str, label: &str, value: f64, color: Rgb888);

    /// Remove whatever the widget currently shows.
    fn clear(&mut self, key: &str);

    /// Make pending changes visible.
    fn flush(&mut self);
}

/// One call made on a [Recorder].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(WidgetSpec),
    SetValue(String, f64),
    AppendPoint(String, i64, f64),
    SetText(String, String),
    ReplaceModel(String, AssetKey, Rgb888),
    SetColor(String, Rgb888),
    SetSector(String, SectorShape),
    SetBar(String, String, f64, Rgb888),
    Clear(String),
    Flush,
}

impl Call {
    /// The widget the call addresses; `None` for flushes.
    pub fn key(&self) -> Option<&str> {
        match self {
            Call::Create(spec) => Some(&spec.key),
            Call::SetValue(k, ..)
            | Call::AppendPoint(k, ..)
            | Call::SetText(k, ..)
            | Call::ReplaceModel(k, ..)
            | Call::SetColor(k, ..)
            | Call::SetSector(k, ..)
            | Call::SetBar(k, ..)
            | Call::Clear(k) => Some(k),
            Call::Flush => None,
        }
    }
}

/// A dashboard that keeps a log of every call.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub calls: Vec<Call>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls addressed to one widget, in order.
    pub fn calls_to<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a Call> + 'a {
        self.calls.iter().filter(move |c| c.key() == Some(key))
    }

    /// Texts set on a widget, in order.
    pub fn texts(&self, key: &str) -> Vec<String> {
        self.calls_to(key)
            .filter_map(|c| match c {
                Call::SetText(_, t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    /// The most recent text set on a widget.
    pub fn last_text(&self, key: &str) -> Option<String> {
        self.texts(key).pop()
    }

    pub fn flushes(&self) -> usize {
        self.calls.iter().filter(|c| **c == Call::Flush).count()
    }
}

impl Dashboard for Recorder {
    fn create_widget(&mut self, spec: &WidgetSpec) {
        self.calls.push(Call::Create(spec.clone()));
    }

    fn set_value(&mut self, key: &str, value: f64) {
        self.calls.push(Call::SetValue(key.to_owned(), value));
    }

    fn append_point(&mut self, key: &str, time_ms: i64, value: f64) {
        self.calls
            .push(Call::AppendPoint(key.to_owned(), time_ms, value));
    }

    fn set_text(&mut self, key: &str, text: &str) {
        self.calls
            .push(Call::SetText(key.to_owned(), text.to_owned()));
    }

    fn replace_model(&mut self, key: &str, asset: AssetKey, _geometry: Arc<Geometry>, color: Rgb888) {
        self.calls
            .push(Call::ReplaceModel(key.to_owned(), asset, color));
    }

    fn set_color(&mut self, key: &str, color: Rgb888) {
        self.calls.push(Call::SetColor(key.to_owned(), color));
    }

    fn set_sector(&mut self, key: &str, sector: SectorShape) {
        self.calls.push(Call::SetSector(key.to_owned(), sector));
    }

    fn set_bar(&mut self, key: &str, label: &str, value: f64, color: Rgb888) {
        self.calls.push(Call::SetBar(
            key.to_owned(),
            label.to_owned(),
            value,
            color,
        ));
    }

    fn clear(&mut self, key: &str) {
        self.calls.push(Call::Clear(key.to_owned()));
    }

    fn flush(&mut self) {
        self.calls.push(Call::Flush);
    }
}
