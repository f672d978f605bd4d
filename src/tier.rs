//! Threshold tiers and their colors.

use embedded_graphics::pixelcolor::Rgb888;

/// Quality band of a reading.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Tier {
    Good,
    Moderate,
    Poor,
}

/// Band boundaries: below `moderate_from` is good; up to and including
/// `poor_above` is moderate; anything higher is poor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Thresholds {
    pub moderate_from: f64,
    pub poor_above: f64,
}

impl Thresholds {
    pub const fn new(moderate_from: f64, poor_above: f64) -> Self {
        Thresholds {
            moderate_from,
            poor_above,
        }
    }

    /// Tier of a value. NaN compares as neither below nor within a band,
    /// and so is poor.
    pub fn classify(&self, value: f64) -> Tier {
        if value < self.moderate_from {
            Tier::Good
        } else if value <= self.poor_above {
            Tier::Moderate
        } else {
            Tier::Poor
        }
    }
}

pub const GREEN: Rgb888 = Rgb888::new(0, 128, 0);
pub const YELLOW: Rgb888 = Rgb888::new(255, 255, 0);
pub const RED: Rgb888 = Rgb888::new(255, 0, 0);

impl Tier {
    pub fn color(self) -> Rgb888 {
        match self {
            Tier::Good => GREEN,
            Tier::Moderate => YELLOW,
            Tier::Poor => RED,
        }
    }
}
