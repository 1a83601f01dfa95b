//! Transition mask parameters.

use serde::{Deserialize, Serialize};

use super::MaskError;

/// Shape family of a transition mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskStyle {
    /// Square teeth.
    #[default]
    Blocky,
    Sawtooth,
    /// Interlocking L-shaped steps.
    Interlocking,
    Sine,
    Stairs,
    /// Thresholded noise with high-frequency crunch along the seam.
    Fractal,
    Clouds,
    /// Error-diffused binary dither.
    Dither,
    /// Noise quantised into bands.
    Cellular,
    /// Thin interference traces.
    Plasma,
    /// Noise-warped distance from the bottom-right corner.
    Radial,
}

/// Which generator builds a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskEngine {
    /// Jittered polygon, rasterised solid.
    Vertex,
    /// Gradient field warped by noise, then thresholded.
    Field,
}

impl MaskStyle {
    pub const fn all() -> [MaskStyle; 11] {
        [
            MaskStyle::Blocky,
            MaskStyle::Sawtooth,
            MaskStyle::Interlocking,
            MaskStyle::Sine,
            MaskStyle::Stairs,
            MaskStyle::Fractal,
            MaskStyle::Clouds,
            MaskStyle::Dither,
            MaskStyle::Cellular,
            MaskStyle::Plasma,
            MaskStyle::Radial,
        ]
    }

    pub const fn engine(self) -> MaskEngine {
        match self {
            MaskStyle::Blocky
            | MaskStyle::Sawtooth
            | MaskStyle::Interlocking
            | MaskStyle::Sine
            | MaskStyle::Stairs => MaskEngine::Vertex,
            MaskStyle::Fractal
            | MaskStyle::Clouds
            | MaskStyle::Dither
            | MaskStyle::Cellular
            | MaskStyle::Plasma
            | MaskStyle::Radial => MaskEngine::Field,
        }
    }
}

/// Seam template a mask represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskMode {
    /// Horizontal seam at three quarters of the tile height.
    Cap,
    /// Seam along the bottom-left to top-right diagonal.
    Diag,
}

impl MaskMode {
    pub const fn name(self) -> &'static str {
        match self {
            MaskMode::Cap => "cap",
            MaskMode::Diag => "diag",
        }
    }
}

/// Parameters of one transition mask (shared by its cap and diag variants).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskParams {
    pub style: MaskStyle,
    /// Side length of the square mask in pixels.
    pub resolution: u32,
    /// Tooth depth as a fraction of the resolution.
    pub depth: f64,
    /// Tooth count (vertex styles) or noise frequency (field styles).
    pub density: u32,
    /// Vertex styles: offset noise in pixels. Field styles: noise influence in percent.
    pub jitter: f64,
    /// Gaussian feather sigma in pixels (0 = hard edge).
    pub feather: f32,
    pub seed: u64,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            style: MaskStyle::Blocky,
            resolution: 512,
            depth: 0.10,
            density: 12,
            jitter: 0.0,
            feather: 0.0,
            seed: 0,
        }
    }
}

impl MaskParams {
    /// Creates default parameters with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Soft organic edge between natural ground materials.
    pub fn organic(seed: u64) -> Self {
        Self {
            style: MaskStyle::Clouds,
            density: 6,
            jitter: 40.0,
            feather: 2.0,
            seed,
            ..Default::default()
        }
    }

    /// Ragged rocky edge.
    pub fn rocky(seed: u64) -> Self {
        Self {
            style: MaskStyle::Sawtooth,
            depth: 0.06,
            density: 20,
            jitter: 8.0,
            seed,
            ..Default::default()
        }
    }

    /// Effective tooth count / noise frequency (never zero).
    pub fn count(&self) -> u32 {
        self.density.max(1)
    }

    pub fn validate(&self) -> Result<(), MaskError> {
        if self.resolution < 2 {
            return Err(MaskError::InvalidResolution(self.resolution));
        }
        if !self.depth.is_finite() || !(0.0..=1.0).contains(&self.depth) {
            return Err(MaskError::InvalidParameter(format!("depth {} outside [0, 1]", self.depth)));
        }
        if !self.jitter.is_finite() || self.jitter < 0.0 {
            return Err(MaskError::InvalidParameter(format!("jitter {} must be >= 0", self.jitter)));
        }
        if !self.feather.is_finite() || self.feather < 0.0 {
            return Err(MaskError::InvalidParameter(format!("feather {} must be >= 0", self.feather)));
        }
        Ok(())
    }
}
