//! Zone geometry, bit depths and the in-memory heightfield grid.

use serde::{Deserialize, Serialize};

use super::codec::HeightfieldError;
use crate::grid::Grid;

/// Largest zone size exponent representable with 16-bit sample indexing.
pub const MAX_ZONE_SIZE_LOG2: u16 = 15;

/// Format version written into new headers.
pub const DEFAULT_FORMAT_VERSION: u16 = 1;

/// Number of meaningful bits per height sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitDepth {
    /// Legacy 12-bit range (header-less files, legacy raster bridge).
    Twelve,
    /// 13-bit range used by the versioned format.
    Thirteen,
}

impl Default for BitDepth {
    fn default() -> Self {
        BitDepth::Thirteen
    }
}

impl BitDepth {
    pub const fn bits(self) -> u32 {
        match self {
            BitDepth::Twelve => 12,
            BitDepth::Thirteen => 13,
        }
    }

    /// Mask selecting the used bits of a sample.
    pub const fn mask(self) -> u16 {
        ((1u32 << self.bits()) - 1) as u16
    }

    /// Multiplier that spreads a sample over the full 16-bit raster range.
    pub const fn raster_scale(self) -> u16 {
        match self {
            BitDepth::Twelve => 16,
            BitDepth::Thirteen => 8,
        }
    }
}

/// Zone arrangement of a heightfield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneLayout {
    pub zones_wide: u16,
    pub zones_long: u16,
    pub zone_size_log2: u16,
}

impl ZoneLayout {
    /// Creates a layout from explicit zone counts and zone size exponent.
    pub fn new(zones_wide: u16, zones_long: u16, zone_size_log2: u16) -> Result<Self, HeightfieldError> {
        if zones_wide == 0 || zones_long == 0 {
            return Err(HeightfieldError::ZeroZones(zones_wide, zones_long));
        }
        if zone_size_log2 > MAX_ZONE_SIZE_LOG2 {
            return Err(HeightfieldError::ZoneSizeTooLarge(zone_size_log2));
        }
        Ok(Self {
            zones_wide,
            zones_long,
            zone_size_log2,
        })
    }

    /// Derives the layout of a `width` x `height` image split into the given zone counts.
    ///
    /// The zone size is `width / zones_wide`; it must divide both dimensions
    /// exactly, give square zones, and be a power of two.
    pub fn derive(width: usize, height: usize, zones_wide: u16, zones_long: u16) -> Result<Self, HeightfieldError> {
        if zones_wide == 0 || zones_long == 0 {
            return Err(HeightfieldError::ZeroZones(zones_wide, zones_long));
        }
        let zone_size = width / zones_wide as usize;
        if zone_size == 0 || zone_size * zones_wide as usize != width {
            return Err(HeightfieldError::NotDivisible {
                dimension: width,
                zones: zones_wide,
            });
        }
        if height % zone_size != 0 {
            return Err(HeightfieldError::NotDivisible {
                dimension: height,
                zones: zones_long,
            });
        }
        if zone_size * zones_long as usize != height {
            return Err(HeightfieldError::NonSquareZones {
                width,
                height,
                zones_wide,
                zones_long,
            });
        }
        if !zone_size.is_power_of_two() {
            return Err(HeightfieldError::NotPowerOfTwo(zone_size));
        }
        Self::new(zones_wide, zones_long, zone_size.trailing_zeros() as u16)
    }

    /// Side length of one zone in samples.
    pub fn zone_size(&self) -> usize {
        1usize << self.zone_size_log2
    }

    pub fn width(&self) -> usize {
        self.zones_wide as usize * self.zone_size()
    }

    pub fn height(&self) -> usize {
        self.zones_long as usize * self.zone_size()
    }

    pub fn zone_count(&self) -> usize {
        self.zones_wide as usize * self.zones_long as usize
    }

    pub fn samples_per_zone(&self) -> usize {
        self.zone_size() * self.zone_size()
    }

    /// Byte length of the zone payload (excluding any header).
    pub fn payload_len(&self) -> usize {
        self.zone_count() * self.samples_per_zone() * 2
    }

    /// Pixel origin of zone `index` (zone-row-major).
    pub fn zone_origin(&self, index: usize) -> (usize, usize) {
        let zx = index % self.zones_wide as usize;
        let zy = index / self.zones_wide as usize;
        (zx * self.zone_size(), zy * self.zone_size())
    }
}

/// A zoned grid of unsigned height samples.
///
/// Samples are stored row-major over the whole image (not per zone); the
/// zone arrangement only matters to the binary codec.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightfieldGrid {
    layout: ZoneLayout,
    bit_depth: BitDepth,
    version: u16,
    samples: Grid<u16>,
}

impl HeightfieldGrid {
    /// Creates an all-zero grid.
    pub fn new(layout: ZoneLayout, bit_depth: BitDepth) -> Self {
        Self {
            layout,
            bit_depth,
            version: DEFAULT_FORMAT_VERSION,
            samples: Grid::new(layout.width(), layout.height()),
        }
    }

    /// Builds a grid from row-major samples, deriving the layout from zone counts.
    ///
    /// Samples are masked to `bit_depth`.
    pub fn from_samples(
        width: usize,
        height: usize,
        samples: Vec<u16>,
        zones_wide: u16,
        zones_long: u16,
        bit_depth: BitDepth,
    ) -> Result<Self, HeightfieldError> {
        let layout = ZoneLayout::derive(width, height, zones_wide, zones_long)?;
        let actual = samples.len();
        let mut samples = Grid::from_vec(width, height, samples).ok_or(HeightfieldError::SampleCount {
            expected: width * height,
            actual,
        })?;
        let mask = bit_depth.mask();
        samples.as_mut_slice().iter_mut().for_each(|s| *s &= mask);
        Ok(Self {
            layout,
            bit_depth,
            version: DEFAULT_FORMAT_VERSION,
            samples,
        })
    }

    /// Builds a grid from heights in the 16-bit raster domain.
    ///
    /// Values are clipped to `[0, 65535]`, divided by the bit depth's raster
    /// scale (floor) and masked.
    pub fn from_raster_heights(
        heights: &Grid<f32>,
        zones_wide: u16,
        zones_long: u16,
        bit_depth: BitDepth,
    ) -> Result<Self, HeightfieldError> {
        let scale = bit_depth.raster_scale() as f32;
        let mask = bit_depth.mask();
        let samples = heights
            .as_slice()
            .iter()
            .map(|&v| {
                let clipped = if v.is_nan() { 0.0 } else { v.clamp(0.0, 65535.0) };
                ((clipped / scale).floor() as u16) & mask
            })
            .collect();
        Self::from_samples(heights.width(), heights.height(), samples, zones_wide, zones_long, bit_depth)
    }

    /// Heights spread over the 16-bit raster domain as floats.
    pub fn to_raster_heights(&self) -> Grid<f32> {
        let scale = self.bit_depth.raster_scale() as f32;
        self.samples.map(|&s| s as f32 * scale)
    }

    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    pub fn layout(&self) -> ZoneLayout {
        self.layout
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    pub fn version(&self) -> u16 {
        self.version
    }

    pub fn width(&self) -> usize {
        self.samples.width()
    }

    pub fn height(&self) -> usize {
        self.samples.height()
    }

    pub fn samples(&self) -> &Grid<u16> {
        &self.samples
    }

    pub fn get(&self, x: usize, y: usize) -> u16 {
        *self.samples.get(x, y)
    }

    /// Sets a sample, masking it to the grid's bit depth.
    pub fn set(&mut self, x: usize, y: usize, value: u16) {
        let mask = self.bit_depth.mask();
        self.samples.set(x, y, value & mask);
    }

    /// Returns `(min, max)` sample values.
    pub fn sample_range(&self) -> (u16, u16) {
        self.samples
            .as_slice()
            .iter()
            .fold((u16::MAX, 0), |(lo, hi), &s| (lo.min(s), hi.max(s)))
    }
}
