//! Three-stop color ramp for heatmap cells.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub const REAL: Rgb = Rgb::new(34, 197, 94);
pub const UNCERTAIN: Rgb = Rgb::new(234, 179, 8);
pub const AI: Rgb = Rgb::new(239, 68, 68);

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    let value = a as f64 + (b as f64 - a as f64) * t;
    value.round().clamp(0.0, 255.0) as u8
}

fn mix(from: Rgb, to: Rgb, t: f64) -> Rgb {
    Rgb {
        r: lerp(from.r, to.r, t),
        g: lerp(from.g, to.g, t),
        b: lerp(from.b, to.b, t),
    }
}

/// Color for a score in `[0, 1]`: green for real, amber at 0.5, red for AI.
pub fn score_to_rgb(score: f64) -> Rgb {
    let s = crate::stats::clamp_unit(score);
    if s <= 0.5 {
        mix(REAL, UNCERTAIN, s / 0.5)
    } else {
        mix(UNCERTAIN, AI, (s - 0.5) / 0.5)
    }
}

pub fn score_to_hex(score: f64) -> String {
    score_to_rgb(score).to_hex()
}
