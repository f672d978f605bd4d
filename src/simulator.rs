use std::path::PathBuf;

use embedded_graphics::{geometry::Size, pixelcolor::Rgb888};
use embedded_graphics_simulator::{OutputImage, OutputSettingsBuilder, SimulatorDisplay};
#[cfg(feature = "simulator")]
use embedded_graphics_simulator::{SimulatorEvent, Window};

#[cfg(feature = "simulator")]
use crate::pacing::Context;
use crate::panel::Surface;

/// A simulated panel: a desktop window, a PNG file rewritten on every
/// flush, or (hidden) neither.
pub struct SimSurface {
    display: SimulatorDisplay<Rgb888>,
    #[cfg(feature = "simulator")]
    window: Option<Window>,
    #[cfg(feature = "simulator")]
    ctx: Option<Context>,
    png: Option<PathBuf>,
}

impl SimSurface {
    /// Opens a window; closing it cancels `ctx`.
    #[cfg(feature = "simulator")]
    pub fn new(title: &str, size: Size, ctx: Context) -> Self {
        let settings = OutputSettingsBuilder::new().scale(1).build();
        let window = Window::new(title, &settings);
        SimSurface {
            window: Some(window),
            ctx: Some(ctx),
            ..Self::new_hidden(size)
        }
    }

    /// Creates a new SimSurface that saves each flushed frame to `path`.
    pub fn headless(size: Size, path: impl Into<PathBuf>) -> Self {
        SimSurface {
            png: Some(path.into()),
            ..Self::new_hidden(size)
        }
    }

    /// Creates a new SimSurface, but without generating a window.
    pub fn new_hidden(size: Size) -> Self {
        SimSurface {
            display: SimulatorDisplay::new(size),
            #[cfg(feature = "simulator")]
            window: None,
            #[cfg(feature = "simulator")]
            ctx: None,
            png: None,
        }
    }

    /// Flush to a screenshot instead of a display.
    pub fn screenshot(&self) -> OutputImage<Rgb888> {
        let settings = OutputSettingsBuilder::new().scale(1).build();
        self.display.to_rgb_output_image(&settings)
    }

    pub fn display(&self) -> &SimulatorDisplay<Rgb888> {
        &self.display
    }
}

impl Surface for SimSurface {
    type Target = SimulatorDisplay<Rgb888>;

    fn target(&mut self) -> &mut SimulatorDisplay<Rgb888> {
        &mut self.display
    }

    fn flush(&mut self) {
        if let Some(path) = &self.png {
            if let Err(e) = self.screenshot().save_png(path) {
                tracing::warn!("could not save frame to {}: {}", path.display(), e);
            }
        }

        #[cfg(feature = "simulator")]
        if let Some(window) = &mut self.window {
            window.update(&self.display);
            if window.events().any(|e| matches!(e, SimulatorEvent::Quit)) {
                tracing::info!("window closed, closing context");
                if let Some(ctx) = &self.ctx {
                    ctx.cancel();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::{Dashboard, GridCell, Slot, WidgetKind, WidgetSpec};
    use crate::panel::Panel;
    use embedded_graphics::geometry::Point;
    use embedded_graphics::pixelcolor::RgbColor;

    fn text_panel(surface: SimSurface) -> Panel<SimSurface> {
        let mut panel = Panel::new(surface, Size::new(48, 40));
        panel.create_widget(&WidgetSpec {
            key: "t".to_owned(),
            kind: WidgetKind::Text,
            cell: GridCell::new(0, 0, 2, 1),
            slot: Slot::WHOLE,
            title: String::new(),
            initial_text: None,
            range: (0.0, 1.0),
            color: Rgb888::WHITE,
        });
        panel.set_text("t", "12:00");
        panel.flush();
        panel
    }

    #[test]
    fn hidden_surface_renders() {
        let panel = text_panel(SimSurface::new_hidden(Size::new(96, 40)));
        let display = panel.surface().display();
        let lit = (0..96)
            .flat_map(|x| (0..40).map(move |y| Point::new(x, y)))
            .filter(|p| display.get_pixel(*p) == Rgb888::WHITE)
            .count();
        assert!(lit > 0);
    }

    #[test]
    fn headless_surface_saves_each_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("airdash.png");
        let mut panel = text_panel(SimSurface::headless(Size::new(96, 40), &path));
        let first = std::fs::metadata(&path).expect("frame saved").len();
        assert!(first > 0);

        std::fs::remove_file(&path).unwrap();
        panel.set_text("t", "13:00");
        panel.flush();
        assert!(path.exists());
    }

    #[test]
    fn unwritable_frame_path_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("airdash.png");
        text_panel(SimSurface::headless(Size::new(96, 40), &path));
        assert!(!path.exists());
    }
}
