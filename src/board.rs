//! The board: projections, models and a dashboard, bound together.

use crate::assets::AssetLibrary;
use crate::dashboard::Dashboard;
use crate::frame::Reading;
use crate::layout::Layout;
use crate::projection::{ProjectionSet, Update, WidgetUpdate};
use crate::timeline::DaySummary;

/// Applies projected updates to a dashboard, in order.
///
/// Widgets are addressed by key only; the board holds no handles to them.
/// Changes become visible on [Board::flush].
pub struct Board<D> {
    dashboard: D,
    projections: ProjectionSet,
    assets: AssetLibrary,
    /// Widgets holding artifacts to remove at the end of the step.
    transient: Vec<String>,
    model_failures: usize,
}

impl<D: Dashboard> Board<D> {
    pub fn new(dashboard: D, projections: ProjectionSet, assets: AssetLibrary) -> Self {
        Board {
            dashboard,
            projections,
            assets,
            transient: Vec::new(),
            model_failures: 0,
        }
    }

    /// Create every widget of the layout and show its initial text.
    pub fn build(&mut self, layout: &Layout) {
        for spec in &layout.widgets {
            self.dashboard.create_widget(spec);
            if let Some(text) = &spec.initial_text {
                self.dashboard.set_text(&spec.key, text);
            }
        }
        tracing::info!("created {} widgets", layout.widgets.len());
        self.dashboard.flush();
    }

    /// Apply every reading projection.
    pub fn show(&mut self, reading: &Reading) {
        let updates = self.projections.project(reading);
        self.apply(updates);
    }

    /// Apply every day projection.
    pub fn show_day(&mut self, day: Option<&DaySummary>) {
        let updates = self.projections.project_day(day);
        self.apply(updates);
    }

    pub fn flush(&mut self) {
        self.dashboard.flush();
    }

    /// Remove the artifacts of transient updates, and flush.
    pub fn release_transient(&mut self) {
        if self.transient.is_empty() {
            return;
        }
        for key in self.transient.drain(..) {
            self.dashboard.clear(&key);
        }
        self.dashboard.flush();
    }

    /// Whether transient artifacts are waiting to be released.
    pub fn has_transient(&self) -> bool {
        !self.transient.is_empty()
    }

    pub fn apply(&mut self, updates: Vec<Update>) {
        for update in updates {
            let key = update.widget.as_str();
            match update.change {
                WidgetUpdate::SetValue(v) => self.dashboard.set_value(key, v),
                WidgetUpdate::AppendPoint { time_ms, value } => {
                    self.dashboard.append_point(key, time_ms, value)
                }
                WidgetUpdate::SetText(ref text) => self.dashboard.set_text(key, text),
                WidgetUpdate::ReplaceModel { asset, color } => match self.assets.load(asset) {
                    Ok(geometry) => self.dashboard.replace_model(key, asset, geometry, color),
                    Err(e) => {
                        // Keep whatever model is showing.
                        self.model_failures += 1;
                        tracing::warn!("{}: {}", key, e);
                    }
                },
                WidgetUpdate::SetColor(color) => self.dashboard.set_color(key, color),
                WidgetUpdate::SetSector(sector) => self.dashboard.set_sector(key, sector),
                WidgetUpdate::SetBar {
                    ref label,
                    value,
                    color,
                } => self.dashboard.set_bar(key, label, value, color),
                WidgetUpdate::Clear => self.dashboard.clear(key),
            }
            if update.transient && !self.transient.contains(&update.widget) {
                self.transient.push(update.widget);
            }
        }
    }

    /// Number of model swaps skipped because the model could not be loaded.
    pub fn model_failures(&self) -> usize {
        self.model_failures
    }

    pub fn dashboard(&self) -> &D {
        &self.dashboard
    }

    pub fn into_dashboard(self) -> D {
        self.dashboard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetKey;
    use crate::dashboard::{Call, Recorder};
    use crate::frame::{Phase, Values};
    use crate::metric::Metric;
    use crate::timeline::tests::hour;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn board(dir: &std::path::Path) -> Board<Recorder> {
        Board::new(
            Recorder::new(),
            ProjectionSet::standard(),
            AssetLibrary::new(dir),
        )
    }

    fn install(library_root: &std::path::Path, file: &str) {
        let key = AssetKey::ALL
            .into_iter()
            .find(|k| k.file == file)
            .expect("known model");
        let path = AssetLibrary::new(library_root).path(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, TRIANGLE).unwrap();
    }

    #[test]
    fn build_creates_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = board(dir.path());
        let layout = Layout::standard("Helsinki, Finland");
        board.build(&layout);
        let r = board.dashboard();
        let created = r
            .calls
            .iter()
            .filter(|c| matches!(c, Call::Create(_)))
            .count();
        assert_eq!(created, layout.widgets.len());
        assert_eq!(r.last_text("location_text").as_deref(), Some("Helsinki, Finland"));
        assert_eq!(r.flushes(), 1);
    }

    #[test]
    fn missing_model_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        install(dir.path(), "rainy.obj");
        let mut board = board(dir.path());

        let rainy: Values = [(Metric::WeatherCode, 61.0)].into_iter().collect();
        let clear: Values = [(Metric::WeatherCode, 0.0)].into_iter().collect();
        for values in [&rainy, &clear] {
            board.show(&Reading {
                time: hour(1, 0),
                values,
                phase: Phase::Replay,
            });
        }

        let swaps: Vec<_> = board
            .dashboard()
            .calls_to("weather_model")
            .cloned()
            .collect();
        assert_eq!(swaps.len(), 1);
        assert!(matches!(&swaps[0], Call::ReplaceModel(_, key, _) if key.file == "rainy.obj"));
        assert_eq!(board.model_failures(), 1);
    }

    #[test]
    fn transient_sector_is_released() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = board(dir.path());
        let values: Values = [(Metric::Pm2_5, 10.0), (Metric::WindDirection, 50.0)]
            .into_iter()
            .collect();

        board.show(&Reading {
            time: hour(1, 0),
            values: &values,
            phase: Phase::Replay,
        });
        assert!(board.has_transient());
        board.release_transient();
        assert!(!board.has_transient());
        assert_eq!(
            board.dashboard().calls.last(),
            Some(&Call::Flush),
        );
        assert!(board
            .dashboard()
            .calls
            .contains(&Call::Clear("pm2_5_sector".to_owned())));

        board.show(&Reading {
            time: hour(1, 1),
            values: &values,
            phase: Phase::Live,
        });
        assert!(!board.has_transient());
    }
}
