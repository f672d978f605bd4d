//! Drawing the dashboard with embedded-graphics.
//!
//! A [Panel] keeps the state of every widget and redraws the grid cells that
//! changed on each flush, onto any [Surface].

use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::sync::Arc;

use embedded_graphics::{
    draw_target::DrawTargetExt,
    geometry::Angle,
    mono_font::{iso_8859_1::FONT_6X10, MonoTextStyle},
    primitives::{
        Arc as ArcPrimitive, Circle, Line, Polyline, Primitive, PrimitiveStyle, Rectangle, Sector,
        Triangle,
    },
    text::{Baseline, Text},
};
use embedded_graphics_core::{
    draw_target::DrawTarget,
    geometry::{Point, Size},
    pixelcolor::{Rgb888, RgbColor},
    Drawable,
};

use crate::assets::{AssetKey, Geometry};
use crate::dashboard::{Dashboard, GridCell, SectorShape, Slot, WidgetKind, WidgetSpec};
use crate::frame::format_value;

/// Points kept per series; older points scroll off.
const MAX_POINTS: usize = 24 * 14;
/// Bars kept per bar chart (a week either side of today); older bars scroll off.
const MAX_BARS: usize = 15;
/// Height of a line of text.
const LINE_HEIGHT: i32 = 10;

const GRAY: Rgb888 = Rgb888::new(96, 96, 96);

/// Something the panel can draw onto.
pub trait Surface {
    type Target: DrawTarget<Color = Rgb888, Error = Infallible>;

    /// Access the underlying drawable of this surface.
    fn target(&mut self) -> &mut Self::Target;

    /// Flush any pending pixels (i.e. v-sync)
    fn flush(&mut self);
}

/// A widget and what it currently shows.
struct Widget {
    spec: WidgetSpec,
    color: Rgb888,
    text: String,
    points: VecDeque<(i64, f64)>,
    value: Option<f64>,
    sector: Option<SectorShape>,
    model: Option<Arc<Geometry>>,
    bars: VecDeque<(String, f64, Rgb888)>,
}

impl Widget {
    fn new(spec: &WidgetSpec) -> Self {
        Widget {
            spec: spec.clone(),
            color: spec.color,
            text: String::new(),
            points: VecDeque::new(),
            value: None,
            sector: None,
            model: None,
            bars: VecDeque::new(),
        }
    }
}

/// Renders widgets onto a grid of equal cells.
pub struct Panel<S> {
    surface: S,
    cell: Size,
    widgets: Vec<Widget>,
    index: HashMap<String, usize>,
    dirty: Vec<GridCell>,
}

impl<S: Surface> Panel<S> {
    pub fn new(surface: S, cell: Size) -> Self {
        Panel {
            surface,
            cell,
            widgets: Vec::new(),
            index: HashMap::new(),
            dirty: Vec::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn cell_area(&self, cell: GridCell) -> Rectangle {
        Rectangle::new(
            Point::new(
                cell.col as i32 * self.cell.width as i32,
                cell.row as i32 * self.cell.height as i32,
            ),
            Size::new(
                cell.col_span as u32 * self.cell.width,
                cell.row_span as u32 * self.cell.height,
            ),
        )
    }

    fn mark(&mut self, cell: GridCell) {
        if !self.dirty.contains(&cell) {
            self.dirty.push(cell);
        }
    }

    fn update(&mut self, key: &str, f: impl FnOnce(&mut Widget)) {
        let Some(&i) = self.index.get(key) else {
            tracing::debug!("no widget {}", key);
            return;
        };
        let widget = &mut self.widgets[i];
        f(widget);
        let cell = widget.spec.cell;
        self.mark(cell);
    }

    /// Clear a cell and draw every widget in it, in creation order.
    fn redraw(&mut self, cell: GridCell) {
        let area = self.cell_area(cell);
        let members: Vec<&Widget> = self.widgets.iter().filter(|w| w.spec.cell == cell).collect();
        let target = self.surface.target();
        target.fill_solid(&area, Rgb888::BLACK).expect("infallible");
        let mut canvas = target.clipped(&area);

        let scale = SeriesScale::of(&members);
        let mut ordinals: HashMap<WidgetKind, usize> = HashMap::new();
        let count = |kind: WidgetKind| members.iter().filter(|w| w.spec.kind == kind).count();
        for w in &members {
            let ordinal = ordinals.entry(w.spec.kind).or_insert(0);
            let n = *ordinal;
            *ordinal += 1;

            let area = slot_area(area, w.spec.slot);
            match w.spec.kind {
                WidgetKind::Text => draw_text(&mut canvas, area.top_left, &w.text, w.color),
                WidgetKind::Line | WidgetKind::Area => {
                    draw_series(&mut canvas, area, w, &scale);
                    draw_legend(&mut canvas, area, &w.spec.title, w.color, n);
                }
                WidgetKind::Radar => {
                    draw_spoke(&mut canvas, area, w, n, count(WidgetKind::Radar));
                    draw_legend(&mut canvas, area, &w.spec.title, w.color, n);
                }
                WidgetKind::Gauge => {
                    draw_gauge(&mut canvas, area, w);
                    draw_text(&mut canvas, area.top_left, &w.spec.title, GRAY);
                }
                WidgetKind::Polar => {
                    draw_polar(&mut canvas, area, w);
                    draw_text(&mut canvas, area.top_left, &w.spec.title, GRAY);
                }
                WidgetKind::Model => {
                    if let Some(geometry) = &w.model {
                        draw_wireframe(&mut canvas, area, geometry, w.color);
                    }
                    draw_text(&mut canvas, area.top_left, &w.spec.title, GRAY);
                }
                WidgetKind::Bar => {
                    draw_bars(&mut canvas, area, w);
                    draw_text(&mut canvas, area.top_left, &w.spec.title, w.color);
                }
                WidgetKind::Tile => {
                    draw_tile(&mut canvas, area, w);
                    draw_text(&mut canvas, area.top_left, &w.spec.title, GRAY);
                }
            }
        }
    }
}

impl<S: Surface> Dashboard for Panel<S> {
    fn create_widget(&mut self, spec: &WidgetSpec) {
        let widget = Widget::new(spec);
        match self.index.get(&spec.key) {
            Some(&i) => self.widgets[i] = widget,
            None => {
                self.index.insert(spec.key.clone(), self.widgets.len());
                self.widgets.push(widget);
            }
        }
        self.mark(spec.cell);
    }

    fn set_value(&mut self, key: &str, value: f64) {
        self.update(key, |w| w.value = Some(value));
    }

    fn append_point(&mut self, key: &str, time_ms: i64, value: f64) {
        self.update(key, |w| {
            if w.points.len() == MAX_POINTS {
                w.points.pop_front();
            }
            w.points.push_back((time_ms, value));
        });
    }

    fn set_text(&mut self, key: &str, text: &str) {
        self.update(key, |w| text.clone_into(&mut w.text));
    }

    fn replace_model(&mut self, key: &str, asset: AssetKey, geometry: Arc<Geometry>, color: Rgb888) {
        tracing::debug!("{}: showing {}", key, asset);
        self.update(key, |w| {
            w.model = Some(geometry);
            w.color = color;
        });
    }

    fn set_color(&mut self, key: &str, color: Rgb888) {
        self.update(key, |w| w.color = color);
    }

    fn set_sector(&mut self, key: &str, sector: SectorShape) {
        self.update(key, |w| w.sector = Some(sector));
    }

    fn set_bar(&mut self, key: &str, label: &str, value: f64, color: Rgb888) {
        self.update(key, |w| {
            if let Some(bar) = w.bars.iter_mut().find(|(l, ..)| l == label) {
                bar.1 = value;
                bar.2 = color;
                return;
            }
            if w.bars.len() == MAX_BARS {
                w.bars.pop_front();
            }
            w.bars.push_back((label.to_owned(), value, color));
        });
    }

    fn clear(&mut self, key: &str) {
        self.update(key, |w| {
            w.text.clear();
            w.points.clear();
            w.value = None;
            w.sector = None;
            w.model = None;
            w.bars.clear();
            w.color = w.spec.color;
        });
    }

    fn flush(&mut self) {
        for cell in std::mem::take(&mut self.dirty) {
            self.redraw(cell);
        }
        self.surface.flush();
    }
}

fn slot_area(cell: Rectangle, slot: Slot) -> Rectangle {
    let count = slot.count.max(1) as u32;
    let height = cell.size.height / count;
    Rectangle::new(
        cell.top_left + Point::new(0, (slot.index as u32 * height) as i32),
        Size::new(cell.size.width, height),
    )
}

fn draw_text<T>(canvas: &mut T, at: Point, text: &str, color: Rgb888)
where
    T: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    if text.is_empty() {
        return;
    }
    let style = MonoTextStyle::new(&FONT_6X10, color);
    Text::with_baseline(text, at + Point::new(2, 1), style, Baseline::Top)
        .draw(canvas)
        .expect("infallible");
}

/// A title in the top-right corner, one line per chart sharing the cell.
fn draw_legend<T>(canvas: &mut T, area: Rectangle, title: &str, color: Rgb888, ordinal: usize)
where
    T: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    let width = 6 * title.chars().count() as i32 + 4;
    let at = Point::new(
        area.top_left.x + area.size.width as i32 - width,
        area.top_left.y + ordinal as i32 * LINE_HEIGHT,
    );
    draw_text(canvas, at, title, color);
}

/// Common axes of the series charts in one cell.
struct SeriesScale {
    t_min: i64,
    t_max: i64,
    v_min: f64,
    v_max: f64,
}

impl SeriesScale {
    fn of(widgets: &[&Widget]) -> Self {
        let points = widgets
            .iter()
            .filter(|w| matches!(w.spec.kind, WidgetKind::Line | WidgetKind::Area))
            .flat_map(|w| w.points.iter());
        let mut scale = SeriesScale {
            t_min: i64::MAX,
            t_max: i64::MIN,
            v_min: 0.0,
            v_max: 0.0,
        };
        for &(t, v) in points {
            scale.t_min = scale.t_min.min(t);
            scale.t_max = scale.t_max.max(t);
            scale.v_min = scale.v_min.min(v);
            scale.v_max = scale.v_max.max(v);
        }
        if scale.v_max - scale.v_min < f64::EPSILON {
            scale.v_max = scale.v_min + 1.0;
        }
        scale
    }

    fn point(&self, area: Rectangle, t: i64, v: f64) -> Point {
        let span = self.t_max.saturating_sub(self.t_min).max(1) as f64;
        let w = area.size.width.saturating_sub(1) as f64;
        let h = area.size.height.saturating_sub(1) as f64;
        let x = t.saturating_sub(self.t_min).max(0) as f64 / span * w;
        let y = h - (v - self.v_min) / (self.v_max - self.v_min) * h;
        area.top_left + Point::new(x as i32, y as i32)
    }
}

fn draw_series<T>(canvas: &mut T, area: Rectangle, w: &Widget, scale: &SeriesScale)
where
    T: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    if w.points.is_empty() {
        return;
    }
    let points: Vec<Point> = w
        .points
        .iter()
        .map(|&(t, v)| scale.point(area, t, v))
        .collect();
    if w.spec.kind == WidgetKind::Area {
        let base = scale.point(area, scale.t_min, scale.v_min.max(0.0)).y;
        for p in &points {
            Line::new(*p, Point::new(p.x, base))
                .into_styled(PrimitiveStyle::with_stroke(w.color, 1))
                .draw(canvas)
                .expect("infallible");
        }
    }
    match points.as_slice() {
        [] => {}
        [p] => Circle::with_center(*p, 3)
            .into_styled(PrimitiveStyle::with_fill(w.color))
            .draw(canvas)
            .expect("infallible"),
        _ => Polyline::new(&points)
            .into_styled(PrimitiveStyle::with_stroke(w.color, 1))
            .draw(canvas)
            .expect("infallible"),
    }
}

fn polar(center: Point, radius: f64, degrees: f64) -> Point {
    let r = degrees.to_radians();
    center + Point::new((radius * r.cos()) as i32, (radius * r.sin()) as i32)
}

/// One spoke of `count`, starting at 12 o'clock and going clockwise.
fn draw_spoke<T>(canvas: &mut T, area: Rectangle, w: &Widget, ordinal: usize, count: usize)
where
    T: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    let center = area.center();
    let radius = (area.size.width.min(area.size.height) / 2).saturating_sub(4) as f64;
    let angle = ordinal as f64 * 360.0 / count.max(1) as f64 - 90.0;
    Line::new(center, polar(center, radius, angle))
        .into_styled(PrimitiveStyle::with_stroke(GRAY, 1))
        .draw(canvas)
        .expect("infallible");
    if let Some(v) = w.value {
        let frac = (v / w.spec.range.1.max(f64::EPSILON)).clamp(0.0, 1.0);
        let tip = polar(center, radius * frac, angle);
        Line::new(center, tip)
            .into_styled(PrimitiveStyle::with_stroke(w.color, 2))
            .draw(canvas)
            .expect("infallible");
        Circle::with_center(tip, 5)
            .into_styled(PrimitiveStyle::with_fill(w.color))
            .draw(canvas)
            .expect("infallible");
    }
}

fn draw_gauge<T>(canvas: &mut T, area: Rectangle, w: &Widget)
where
    T: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    let center = area.center();
    let diameter = area.size.width.min(area.size.height).saturating_sub(12);
    // Angles run counter-clockwise from east: lower right, over the top, to lower left.
    ArcPrimitive::with_center(center, diameter, Angle::from_degrees(315.0), Angle::from_degrees(270.0))
        .into_styled(PrimitiveStyle::with_stroke(GRAY, 4))
        .draw(canvas)
        .expect("infallible");
    let (lo, hi) = w.spec.range;
    if let Some(v) = w.value {
        let sweep = 270.0 * ((v - lo) / (hi - lo).max(f64::EPSILON)).clamp(0.0, 1.0);
        ArcPrimitive::with_center(
            center,
            diameter,
            Angle::from_degrees((225.0 - sweep) as f32),
            Angle::from_degrees(sweep as f32),
        )
        .into_styled(PrimitiveStyle::with_stroke(w.color, 4))
        .draw(canvas)
        .expect("infallible");
    }
    let label = format_value(w.value, 1);
    let at = center - Point::new(3 * label.chars().count() as i32 + 2, LINE_HEIGHT / 2 + 1);
    draw_text(canvas, at, &label, w.color);
}

fn draw_polar<T>(canvas: &mut T, area: Rectangle, w: &Widget)
where
    T: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    let center = area.center();
    let diameter = area.size.width.min(area.size.height).saturating_sub(4);
    Circle::with_center(center, diameter)
        .into_styled(PrimitiveStyle::with_stroke(GRAY, 1))
        .draw(canvas)
        .expect("infallible");
    let Some(s) = w.sector else {
        return;
    };
    let frac = (s.amplitude / w.spec.range.1.max(f64::EPSILON)).clamp(0.05, 1.0);
    // Compass degrees run clockwise from north, primitive angles counter-clockwise from east.
    Sector::with_center(
        center,
        (diameter as f64 * frac) as u32,
        Angle::from_degrees((90.0 - s.end).rem_euclid(360.0) as f32),
        Angle::from_degrees((s.end - s.start) as f32),
    )
    .into_styled(PrimitiveStyle::with_fill(s.color))
    .draw(canvas)
    .expect("infallible");
}

/// Triangle edges of a model, turned a little to show its depth.
fn draw_wireframe<T>(canvas: &mut T, area: Rectangle, geometry: &Geometry, color: Rgb888)
where
    T: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    let (lo, hi) = geometry.bounds();
    let mid = [
        (lo[0] + hi[0]) / 2.0,
        (lo[1] + hi[1]) / 2.0,
        (lo[2] + hi[2]) / 2.0,
    ];
    let extent = (0..3).map(|a| hi[a] - lo[a]).fold(f32::EPSILON, f32::max);
    let scale = area.size.width.min(area.size.height) as f32 * 0.8 / extent;
    let (yaw_sin, yaw_cos) = 30f32.to_radians().sin_cos();
    let (pitch_sin, pitch_cos) = 20f32.to_radians().sin_cos();
    let center = area.center();
    let project = |i: u32| {
        let [x, y, z] = geometry.vertex(i);
        let (x, y, z) = (x - mid[0], y - mid[1], z - mid[2]);
        let (x, z) = (x * yaw_cos + z * yaw_sin, z * yaw_cos - x * yaw_sin);
        let y = y * pitch_cos - z * pitch_sin;
        center + Point::new((x * scale) as i32, (-y * scale) as i32)
    };

    let style = PrimitiveStyle::with_stroke(color, 1);
    for [a, b, c] in geometry.triangles() {
        Triangle::new(project(a), project(b), project(c))
            .into_styled(style)
            .draw(canvas)
            .expect("infallible");
    }
}

fn draw_bars<T>(canvas: &mut T, area: Rectangle, w: &Widget)
where
    T: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    if w.bars.is_empty() {
        return;
    }
    let top = LINE_HEIGHT + 2;
    let height = (area.size.height as i32 - top).max(1);
    let slot = (area.size.width / w.bars.len() as u32).max(1);
    let max = w
        .bars
        .iter()
        .map(|(_, v, _)| *v)
        .fold(f64::EPSILON, f64::max);
    for (i, (_, v, color)) in w.bars.iter().enumerate() {
        let h = ((v / max).clamp(0.0, 1.0) * height as f64) as u32;
        let x = area.top_left.x + (i as u32 * slot) as i32 + 1;
        let y = area.top_left.y + area.size.height as i32 - h as i32;
        Rectangle::new(Point::new(x, y), Size::new(slot.saturating_sub(2).max(1), h))
            .into_styled(PrimitiveStyle::with_fill(*color))
            .draw(canvas)
            .expect("infallible");
    }
}

/// Below the title: a block of the widget's color, or gray with the
/// placeholder while there is no value.
fn draw_tile<T>(canvas: &mut T, area: Rectangle, w: &Widget)
where
    T: DrawTarget<Color = Rgb888, Error = Infallible>,
{
    let top = LINE_HEIGHT as u32 + 2;
    let block = Rectangle::new(
        area.top_left + Point::new(2, top as i32),
        Size::new(
            area.size.width.saturating_sub(4),
            area.size.height.saturating_sub(top + 2),
        ),
    );
    let (fill, ink) = match w.value {
        Some(_) => (w.color, Rgb888::BLACK),
        None => (GRAY, Rgb888::WHITE),
    };
    block
        .into_styled(PrimitiveStyle::with_fill(fill))
        .draw(canvas)
        .expect("infallible");
    let label = format_value(w.value, 0);
    let at = block.center() - Point::new(3 * label.chars().count() as i32 + 2, LINE_HEIGHT / 2 + 1);
    draw_text(canvas, at, &label, ink);
}
