//! Marching-squares reduction of vertex materials to packed tile codes.
//!
//! Each tile covers a 2x2 block of vertices. Corners are visited in the
//! fixed order top-left, top-right, bottom-right, bottom-left, which are
//! bits 0..3 of the corner mask.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::AutoPaintError;
use crate::grid::Grid;

pub const CORNER_TL: u8 = 1;
pub const CORNER_TR: u8 = 2;
pub const CORNER_BR: u8 = 4;
pub const CORNER_BL: u8 = 8;

/// Packed per-tile material code.
///
/// Layout: `[15:12]` base, `[11:8]` next, `[7]` cap, `[6]` flip,
/// `[5:4]` rotation, `[3:2]` unused, `[1:0]` variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialTileCode(pub u16);

impl MaterialTileCode {
    pub const fn pack(base: u8, next: u8, cap: bool, flip: bool, rotation: u8, variant: u8) -> Self {
        Self(
            ((base as u16 & 0xF) << 12)
                | ((next as u16 & 0xF) << 8)
                | ((cap as u16) << 7)
                | ((flip as u16) << 6)
                | ((rotation as u16 & 0x3) << 4)
                | (variant as u16 & 0x3),
        )
    }

    /// A tile of a single material.
    pub const fn solid(material: u8) -> Self {
        Self::pack(material, material, false, false, 0, 0)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn base(self) -> u8 {
        (self.0 >> 12) as u8 & 0xF
    }

    pub const fn next(self) -> u8 {
        (self.0 >> 8) as u8 & 0xF
    }

    pub const fn cap(self) -> bool {
        self.0 & 0x80 != 0
    }

    pub const fn flip(self) -> bool {
        self.0 & 0x40 != 0
    }

    pub const fn rotation(self) -> u8 {
        (self.0 >> 4) as u8 & 0x3
    }

    pub const fn variant(self) -> u8 {
        self.0 as u8 & 0x3
    }

    /// Tile shape implied by the flags (solid when base equals next).
    pub fn shape(self) -> TileShape {
        if self.base() == self.next() {
            TileShape::Solid
        } else if self.cap() {
            TileShape::Diagonal
        } else if self.flip() {
            TileShape::Side
        } else {
            TileShape::Corner
        }
    }
}

/// Boundary shape drawn by a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileShape {
    Solid,
    /// One corner of `next` material.
    Corner,
    /// Two adjacent corners of `next` material.
    Side,
    /// Two opposite corners of `next` material.
    Diagonal,
}

/// One entry of the corner-mask table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCase {
    pub shape: TileShape,
    pub cap: bool,
    pub flip: bool,
    pub rotation: u8,
    /// Swap base and next and treat the single remaining corner as `next`.
    pub swap: bool,
}

const fn case(shape: TileShape, cap: bool, flip: bool, rotation: u8, swap: bool) -> TileCase {
    TileCase {
        shape,
        cap,
        flip,
        rotation,
        swap,
    }
}

use TileShape::{Corner, Diagonal, Side, Solid};

/// Tile case for every corner mask (bit set where the corner holds `next`).
///
/// Rotations follow the existing tile art and must stay bit-compatible.
pub const TILE_CASES: [TileCase; 16] = [
    case(Solid, false, false, 0, false),   // 0: all base
    case(Corner, false, false, 0, false),  // 1: TL
    case(Corner, false, false, 3, false),  // 2: TR
    case(Side, false, true, 0, false),     // 3: TL+TR (top)
    case(Corner, false, false, 2, false),  // 4: BR
    case(Diagonal, true, false, 0, false), // 5: TL+BR
    case(Side, false, true, 3, false),     // 6: TR+BR (right)
    case(Corner, false, false, 1, true),   // 7: all but BL
    case(Corner, false, false, 1, false),  // 8: BL
    case(Side, false, true, 1, false),     // 9: TL+BL (left)
    case(Diagonal, true, true, 0, false),  // 10: TR+BL
    case(Corner, false, false, 2, true),   // 11: all but BR
    case(Side, false, true, 2, false),     // 12: BR+BL (bottom)
    case(Corner, false, false, 3, true),   // 13: all but TR
    case(Corner, false, false, 0, true),   // 14: all but TL
    case(Solid, false, false, 0, false),   // 15: all next
];

/// Encodes one 2x2 block given its corners in TL, TR, BR, BL order.
///
/// Blocks with more than two materials are reduced to their lowest and
/// highest: every corner other than the lowest counts as `next`.
pub fn classify_corners(corners: [u8; 4]) -> MaterialTileCode {
    let base = corners.iter().copied().min().unwrap_or(0);
    let next = corners.iter().copied().max().unwrap_or(0);
    if base == next {
        return MaterialTileCode::solid(base);
    }

    let mask = corners
        .iter()
        .enumerate()
        .fold(0u8, |m, (i, &c)| if c != base { m | (1 << i) } else { m });

    let entry = TILE_CASES[mask as usize];
    match (entry.shape, entry.swap) {
        (Solid, _) if mask == 0xF => MaterialTileCode::solid(next),
        (Solid, _) => MaterialTileCode::solid(base),
        (_, true) => MaterialTileCode::pack(next, base, entry.cap, entry.flip, entry.rotation, 0),
        _ => MaterialTileCode::pack(base, next, entry.cap, entry.flip, entry.rotation, 0),
    }
}

/// Number of distinct materials among four corners.
fn distinct(corners: &[u8; 4]) -> usize {
    let mut seen = 0u32;
    for &c in corners {
        seen |= 1 << (c & 0x1F);
    }
    seen.count_ones() as usize
}

/// Reduces a vertex material grid to tile codes.
///
/// The output is `width / 2` x `height / 2`; a trailing odd row or column of
/// vertices is dropped.
pub fn encode_tiles(materials: &Grid<u8>) -> Grid<MaterialTileCode> {
    encode_tiles_with_progress(materials, |_| {})
}

/// [`encode_tiles`] reporting the fraction of tile rows done.
pub fn encode_tiles_with_progress<F: FnMut(f32)>(materials: &Grid<u8>, mut on_progress: F) -> Grid<MaterialTileCode> {
    let tw = materials.width() / 2;
    let th = materials.height() / 2;
    let mut tiles = Grid::new(tw, th);
    let mut mixed = 0usize;

    for ty in 0..th {
        for tx in 0..tw {
            let (x, y) = (tx * 2, ty * 2);
            let corners = [
                *materials.get(x, y),
                *materials.get(x + 1, y),
                *materials.get(x + 1, y + 1),
                *materials.get(x, y + 1),
            ];
            if distinct(&corners) > 2 {
                mixed += 1;
            }
            tiles.set(tx, ty, classify_corners(corners));
        }
        on_progress((ty + 1) as f32 / th as f32);
    }

    if mixed > 0 {
        log::warn!(
            "{} tiles had more than two materials; reduced to their lowest and highest",
            mixed
        );
    }
    tiles
}

/// Writes tile codes as raw little-endian `u16`, row-major, no header.
pub fn write_tile_file(tiles: &Grid<MaterialTileCode>, path: &Path) -> Result<(), AutoPaintError> {
    let bytes: Vec<u8> = tiles.as_slice().iter().flat_map(|c| c.raw().to_le_bytes()).collect();
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    writer.write_all(&bytes)?;
    writer.flush()?;
    log::info!(
        "Wrote {}x{} tile codes ({} bytes) to {}",
        tiles.width(),
        tiles.height(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Reads a tile file written by [`write_tile_file`].
pub fn read_tile_file(path: &Path, width: usize, height: usize) -> Result<Grid<MaterialTileCode>, AutoPaintError> {
    let bytes = std::fs::read(path)?;
    let expected = width * height * 2;
    if bytes.len() != expected {
        return Err(AutoPaintError::TileFileSize {
            expected,
            actual: bytes.len(),
        });
    }
    let codes = bytes
        .chunks_exact(2)
        .map(|b| MaterialTileCode(u16::from_le_bytes([b[0], b[1]])))
        .collect();
    Grid::from_vec(width, height, codes).ok_or(AutoPaintError::TileFileSize {
        expected,
        actual: bytes.len(),
    })
}
