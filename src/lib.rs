//! Terrain asset toolkit for a 3D strategy game.
//!
//! This crate converts between the zoned heightfield format and raster
//! images, projects equirectangular panoramas onto six-face skyboxes,
//! generates procedural tile-transition masks, and paints heightfields into
//! packed per-tile material codes.

pub mod autopaint;
pub mod grid;
pub mod heightfield;
pub mod logging;
pub mod mask;
pub mod raster;
pub mod skybox;

pub use autopaint::{AutoPainter, MaterialTileCode, PaintRule, RuleSet};
pub use grid::Grid;
pub use heightfield::{BitDepth, HeightfieldGrid, ZoneLayout};
pub use mask::{MaskMode, MaskParams, MaskStyle};
pub use skybox::{CubeFaceId, Panorama, ProjectionOptions};
